//! Wire types shared between the coordinator core, the CLI, and the
//! editor-host IPC fixture. Kept dependency-light (serde only) so that
//! anything speaking the wire protocol can depend on it without pulling
//! in tokio or networking crates.

mod control;
mod error_code;
mod ipc;
mod rendezvous;

pub use control::{ControlRequest, ControlResponse};
pub use error_code::ErrorCode;
pub use ipc::{EditorState, IpcRequest, IpcRequestPayload, IpcResponse, IpcResponsePayload};
pub use rendezvous::RendezvousRecord;
