use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Browser family. Controls which flag set the launcher builds and
/// which readiness regex it waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    Chrome,
    Edge,
    Chromium,
    Brave,
    Firefox,
}

impl BrowserKind {
    pub fn engine(self) -> Engine {
        match self {
            BrowserKind::Firefox => Engine::Firefox,
            _ => Engine::Chromium,
        }
    }
}

impl fmt::Display for BrowserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrowserKind::Chrome => "chrome",
            BrowserKind::Edge => "edge",
            BrowserKind::Chromium => "chromium",
            BrowserKind::Brave => "brave",
            BrowserKind::Firefox => "firefox",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Chromium,
    Firefox,
}

/// A browser the detector found on this machine.
#[derive(Debug, Clone)]
pub struct BrowserDescriptor {
    pub kind: BrowserKind,
    pub name: &'static str,
    pub executable: PathBuf,
    pub speaks_cdp: bool,
    pub speaks_bidi: bool,
}

/// Options the caller passes to `launch`.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub kind: Option<BrowserKind>,
    pub headless: Option<bool>,
}
