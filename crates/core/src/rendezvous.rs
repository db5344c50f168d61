use std::path::PathBuf;

use bcd_protocol::RendezvousRecord;
use tracing::warn;

fn state_path() -> PathBuf {
    std::env::temp_dir().join("browser-coordinator").join("state.json")
}

/// Writes the rendezvous file. Failure is logged and swallowed: the
/// coordinator keeps running even if sibling processes can't discover
/// it via this file (they can still probe the proxy port directly).
pub fn write(record: RendezvousRecord) {
    let path = state_path();
    if let Some(parent) = path.parent() {
        if let Err(err) = std::fs::create_dir_all(parent) {
            warn!(target = "bcd.rendezvous", %err, "failed to create rendezvous directory");
            return;
        }
    }
    match serde_json::to_vec(&record) {
        Ok(bytes) => {
            if let Err(err) = std::fs::write(&path, bytes) {
                warn!(target = "bcd.rendezvous", %err, path = %path.display(), "failed to write rendezvous file");
            }
        }
        Err(err) => warn!(target = "bcd.rendezvous", %err, "failed to serialize rendezvous record"),
    }
}

/// Returns `None` for a missing file, invalid JSON, or a record missing
/// either field — all treated identically as "not running".
pub fn read() -> Option<RendezvousRecord> {
    let bytes = std::fs::read(state_path()).ok()?;
    serde_json::from_slice(&bytes).ok()
}

pub fn clear() {
    let _ = std::fs::remove_file(state_path());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Serialize tests since they all touch the same real temp-dir path.
    static LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn round_trips_through_write_read_clear() {
        let _guard = LOCK.lock().unwrap();
        clear();
        assert!(read().is_none());
        write(RendezvousRecord::new(4321, 999));
        let record = read().expect("record present after write");
        assert_eq!(record.port, 4321);
        assert_eq!(record.pid, 999);
        clear();
        assert!(read().is_none());
    }

    #[test]
    fn malformed_contents_read_as_none() {
        let _guard = LOCK.lock().unwrap();
        let path = state_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"not json").unwrap();
        assert!(read().is_none());
        clear();
    }
}
