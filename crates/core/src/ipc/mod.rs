pub mod client;
#[cfg(unix)]
pub mod fixture;
pub mod path;

pub use client::{discover, probe, send};
