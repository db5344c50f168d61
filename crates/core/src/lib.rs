//! Core of the browser coordinator: browser detection and lifecycle,
//! the CDP reverse proxy, rendezvous state, editor-host IPC, and the
//! in-browser operation runner. The CLI crate is a thin shell around
//! [`controller::Controller`].

pub mod cdp;
pub mod config;
pub mod control_server;
pub mod controller;
pub mod detector;
pub mod error;
pub mod ipc;
pub mod launcher;
pub mod proxy;
pub mod rendezvous;
pub mod types;

pub use controller::Controller;
pub use error::{CoreError, Result};
