use serde::{Deserialize, Serialize};

/// The rendezvous file contents: `{"port": ..., "pid": ...}`.
///
/// This is a discovery hint, not an authority — a reader that finds a
/// record still has to confirm the port actually accepts connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RendezvousRecord {
    pub port: u16,
    pub pid: i32,
}

impl RendezvousRecord {
    pub fn new(port: u16, pid: i32) -> Self {
        Self { port, pid }
    }
}
