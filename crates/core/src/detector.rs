use std::path::{Path, PathBuf};

use crate::types::BrowserDescriptor;
use crate::types::BrowserKind;

/// Enumerates installed browsers by walking a platform-keyed candidate
/// table, falling back to PATH resolution on POSIX when none of the
/// well-known install locations exist. Never fails: an empty result
/// just means no compatible browser was found.
pub fn enumerate() -> Vec<BrowserDescriptor> {
    let mut found = Vec::new();
    for &(kind, name, cdp, bidi) in KIND_TABLE {
        if let Some(executable) = first_existing(candidates(kind)) {
            found.push(BrowserDescriptor { kind, name, executable, speaks_cdp: cdp, speaks_bidi: bidi });
            continue;
        }
        #[cfg(unix)]
        if let Some(executable) = which_any(path_names(kind)) {
            found.push(BrowserDescriptor { kind, name, executable, speaks_cdp: cdp, speaks_bidi: bidi });
        }
    }
    found
}

/// Picks a browser by explicit kind preference, or the priority order
/// chrome > edge > chromium > brave if none is given. Firefox is never
/// auto-picked; it must be requested explicitly, since it speaks BiDi
/// rather than CDP and most callers implicitly want CDP.
pub fn pick(preferred: Option<BrowserKind>, browsers: &[BrowserDescriptor]) -> Option<BrowserDescriptor> {
    if let Some(kind) = preferred {
        return browsers.iter().find(|b| b.kind == kind && (b.speaks_cdp || b.speaks_bidi)).cloned();
    }
    const PRIORITY: [BrowserKind; 4] = [BrowserKind::Chrome, BrowserKind::Edge, BrowserKind::Chromium, BrowserKind::Brave];
    PRIORITY.iter().find_map(|kind| browsers.iter().find(|b| b.kind == *kind).cloned())
}

const KIND_TABLE: &[(BrowserKind, &str, bool, bool)] = &[
    (BrowserKind::Chrome, "Google Chrome", true, false),
    (BrowserKind::Edge, "Microsoft Edge", true, false),
    (BrowserKind::Chromium, "Chromium", true, false),
    (BrowserKind::Brave, "Brave", true, false),
    (BrowserKind::Firefox, "Firefox", false, true),
];

fn first_existing(paths: Vec<PathBuf>) -> Option<PathBuf> {
    paths.into_iter().find(|p| p.exists())
}

fn candidates(kind: BrowserKind) -> Vec<PathBuf> {
    #[cfg(target_os = "macos")]
    {
        macos_candidates(kind)
    }
    #[cfg(target_os = "windows")]
    {
        windows_candidates(kind)
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        linux_candidates(kind)
    }
}

#[cfg(target_os = "macos")]
fn macos_candidates(kind: BrowserKind) -> Vec<PathBuf> {
    let apps: &[&str] = match kind {
        BrowserKind::Chrome => &["/Applications/Google Chrome.app/Contents/MacOS/Google Chrome"],
        BrowserKind::Edge => &["/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge"],
        BrowserKind::Chromium => &["/Applications/Chromium.app/Contents/MacOS/Chromium"],
        BrowserKind::Brave => &["/Applications/Brave Browser.app/Contents/MacOS/Brave Browser"],
        BrowserKind::Firefox => &["/Applications/Firefox.app/Contents/MacOS/firefox"],
    };
    apps.iter().map(PathBuf::from).collect()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn linux_candidates(kind: BrowserKind) -> Vec<PathBuf> {
    path_names(kind).into_iter().map(|n| Path::new("/usr/bin").join(n)).collect()
}

#[cfg(target_os = "windows")]
fn windows_candidates(kind: BrowserKind) -> Vec<PathBuf> {
    let program_files = std::env::var("ProgramFiles").unwrap_or_else(|_| "C:\\Program Files".into());
    let program_files_x86 = std::env::var("ProgramFiles(x86)").unwrap_or_else(|_| "C:\\Program Files (x86)".into());
    let local_app_data = std::env::var("LOCALAPPDATA").unwrap_or_default();
    let suffix: &[&str] = match kind {
        BrowserKind::Chrome => &["Google\\Chrome\\Application\\chrome.exe"],
        BrowserKind::Edge => &["Microsoft\\Edge\\Application\\msedge.exe"],
        BrowserKind::Chromium => &["Chromium\\Application\\chrome.exe"],
        BrowserKind::Brave => &["BraveSoftware\\Brave-Browser\\Application\\brave.exe"],
        BrowserKind::Firefox => &["Mozilla Firefox\\firefox.exe"],
    };
    let mut out = Vec::new();
    for s in suffix {
        out.push(Path::new(&program_files).join(s));
        out.push(Path::new(&program_files_x86).join(s));
        if !local_app_data.is_empty() {
            out.push(Path::new(&local_app_data).join(s));
        }
    }
    out
}

fn path_names(kind: BrowserKind) -> Vec<&'static str> {
    match kind {
        BrowserKind::Chrome => vec!["google-chrome", "google-chrome-stable"],
        BrowserKind::Edge => vec!["microsoft-edge", "microsoft-edge-stable"],
        BrowserKind::Chromium => vec!["chromium", "chromium-browser"],
        BrowserKind::Brave => vec!["brave-browser", "brave"],
        BrowserKind::Firefox => vec!["firefox"],
    }
}

#[cfg(unix)]
fn which_any(names: Vec<&str>) -> Option<PathBuf> {
    names.into_iter().find_map(|n| which::which(n).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_honors_explicit_kind() {
        let browsers = vec![
            BrowserDescriptor { kind: BrowserKind::Firefox, name: "Firefox", executable: "/bin/firefox".into(), speaks_cdp: false, speaks_bidi: true },
            BrowserDescriptor { kind: BrowserKind::Chrome, name: "Google Chrome", executable: "/bin/chrome".into(), speaks_cdp: true, speaks_bidi: false },
        ];
        let picked = pick(Some(BrowserKind::Firefox), &browsers).unwrap();
        assert_eq!(picked.kind, BrowserKind::Firefox);
    }

    #[test]
    fn pick_falls_back_to_priority_order() {
        let browsers = vec![
            BrowserDescriptor { kind: BrowserKind::Brave, name: "Brave", executable: "/bin/brave".into(), speaks_cdp: true, speaks_bidi: false },
            BrowserDescriptor { kind: BrowserKind::Chrome, name: "Google Chrome", executable: "/bin/chrome".into(), speaks_cdp: true, speaks_bidi: false },
        ];
        let picked = pick(None, &browsers).unwrap();
        assert_eq!(picked.kind, BrowserKind::Chrome);
    }

    #[test]
    fn pick_returns_none_when_empty() {
        assert!(pick(None, &[]).is_none());
    }
}
