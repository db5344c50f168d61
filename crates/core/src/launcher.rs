use std::io::{BufRead, BufReader};
use std::net::TcpListener as StdTcpListener;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};

use regex_lite::Regex;
use tracing::{debug, info, warn};

use crate::error::{CoreError, Result};
use crate::types::{BrowserDescriptor, Engine, LaunchOptions};

const READINESS_TIMEOUT: Duration = Duration::from_secs(15);
const STOP_GRACE: Duration = Duration::from_secs(5);
const DEBUG_HTTP_POLL_TIMEOUT: Duration = Duration::from_secs(5);
const DEBUG_HTTP_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A spawned, owned browser process. Dropping this does not kill the
/// child; callers must call `stop` explicitly so shutdown ordering stays
/// under the controller's control.
pub struct BrowserInstance {
    pub descriptor: BrowserDescriptor,
    pub engine: Engine,
    pub port: u16,
    pub ws_endpoint: String,
    pub profile_dir: PathBuf,
    child: Child,
}

/// Binds an ephemeral listener on loopback, reads the OS-assigned port,
/// and closes it. The caller accepts the race window between this call
/// returning and the browser actually binding the same port.
pub fn allocate_free_port() -> Result<u16> {
    let listener = StdTcpListener::bind(("127.0.0.1", 0))?;
    let port = listener.local_addr()?.port();
    drop(listener);
    Ok(port)
}

pub fn launch(descriptor: &BrowserDescriptor, port: u16, opts: &LaunchOptions) -> Result<BrowserInstance> {
    let engine = descriptor.kind.engine();
    let profile_dir = std::env::temp_dir().join(format!("browser-coordinator-profile-{}-{}", std::process::id(), port));
    std::fs::create_dir_all(&profile_dir)?;

    let headless = opts.headless.unwrap_or(true);
    let mut command = Command::new(&descriptor.executable);
    match engine {
        Engine::Chromium => configure_chromium(&mut command, port, &profile_dir, headless),
        Engine::Firefox => configure_firefox(&mut command, port, &profile_dir, headless),
    }
    command.stdin(Stdio::null()).stdout(Stdio::null()).stderr(Stdio::piped());

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        unsafe {
            command.pre_exec(|| {
                libc_setsid();
                Ok(())
            });
        }
    }

    info!(target = "bcd.launcher", executable = %descriptor.executable.display(), port, "spawning browser");
    let mut child = command.spawn().map_err(|e| CoreError::SpawnFailed(e.to_string()))?;

    let stderr = child.stderr.take().expect("stderr piped above");
    let pattern = match engine {
        Engine::Chromium => Regex::new(r"DevTools listening on (ws://\S+)").expect("valid regex"),
        Engine::Firefox => Regex::new(r"WebDriver BiDi listening on (ws://\S+)").expect("valid regex"),
    };

    let ws_endpoint = match wait_for_readiness(&mut child, stderr, &pattern, READINESS_TIMEOUT) {
        Ok(url) => url,
        Err(err) => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = std::fs::remove_dir_all(&profile_dir);
            return Err(err);
        }
    };

    if matches!(engine, Engine::Chromium) {
        poll_debug_http_endpoint(port, DEBUG_HTTP_POLL_TIMEOUT);
    }

    Ok(BrowserInstance { descriptor: descriptor.clone(), engine, port, ws_endpoint, profile_dir, child })
}

fn configure_chromium(command: &mut Command, port: u16, profile_dir: &std::path::Path, headless: bool) {
    command
        .arg(format!("--remote-debugging-port={port}"))
        .arg(format!("--user-data-dir={}", profile_dir.display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--disable-background-networking")
        .arg("--disable-default-apps")
        .arg("--disable-extensions")
        .arg("--disable-sync")
        .arg("--disable-translate")
        .arg("--metrics-recording-only")
        .arg("--mute-audio");
    if headless {
        command.arg("--headless=new");
    }
    if running_as_root_or_ci() {
        command.arg("--no-sandbox");
    }
    command.arg("about:blank");
}

fn configure_firefox(command: &mut Command, port: u16, profile_dir: &std::path::Path, headless: bool) {
    command.arg("--remote-debugging-port").arg(port.to_string()).arg("--profile").arg(profile_dir).arg("--no-remote");
    if headless {
        command.arg("--headless");
    }
    command.arg("about:blank");
}

fn running_as_root_or_ci() -> bool {
    std::env::var("CI").is_ok_and(|v| !v.is_empty())
        || {
            #[cfg(unix)]
            {
                unsafe { libc_geteuid() == 0 }
            }
            #[cfg(not(unix))]
            {
                false
            }
        }
}

#[cfg(unix)]
unsafe fn libc_setsid() {
    unsafe {
        libc::setsid();
    }
}

#[cfg(unix)]
unsafe fn libc_geteuid() -> u32 {
    unsafe { libc::geteuid() }
}

fn wait_for_readiness(child: &mut Child, stderr: std::process::ChildStderr, pattern: &Regex, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut reader = BufReader::new(stderr);
    let mut line = String::new();
    loop {
        if Instant::now() >= deadline {
            return Err(CoreError::ReadinessTimeout { secs: timeout.as_secs() });
        }
        if let Some(status) = child.try_wait()? {
            return Err(CoreError::ProcessExited.tap_status(status));
        }
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Err(CoreError::ProcessExited),
            Ok(_) => {
                debug!(target = "bcd.launcher", line = line.trim(), "browser stderr");
                if let Some(caps) = pattern.captures(&line) {
                    let url = caps.get(1).expect("group 1 present").as_str().to_string();
                    return Ok(url);
                }
            }
            Err(err) => return Err(err.into()),
        }
    }
}

/// Polls `/json/version` on the debugging HTTP endpoint for up to
/// `timeout`, confirming the browser's HTTP surface (not just the
/// stderr-advertised WebSocket) is actually serving requests. A timeout
/// here is logged as a warning, not an error: the stderr readiness line
/// is the authoritative signal, this is an extra sanity check on top.
fn poll_debug_http_endpoint(port: u16, timeout: Duration) {
    let url = format!("http://127.0.0.1:{port}/json/version");
    let client = match reqwest::blocking::Client::builder().timeout(DEBUG_HTTP_POLL_INTERVAL).build() {
        Ok(client) => client,
        Err(err) => {
            warn!(target = "bcd.launcher", %err, "failed to build debug http poll client");
            return;
        }
    };
    let deadline = Instant::now() + timeout;
    loop {
        if client.get(&url).send().is_ok_and(|r| r.status().is_success()) {
            return;
        }
        if Instant::now() >= deadline {
            warn!(target = "bcd.launcher", port, "debug http endpoint did not respond within poll timeout");
            return;
        }
        std::thread::sleep(DEBUG_HTTP_POLL_INTERVAL);
    }
}

impl CoreError {
    fn tap_status(self, status: std::process::ExitStatus) -> Self {
        warn!(target = "bcd.launcher", ?status, "browser exited before readiness");
        self
    }
}

/// SIGTERM, wait up to 5s, then SIGKILL. Blocking by design: callers that
/// want non-blocking shutdown spawn this on a blocking task.
pub fn stop(instance: &mut BrowserInstance) -> Result<()> {
    terminate_gracefully(&mut instance.child)?;
    let _ = std::fs::remove_dir_all(&instance.profile_dir);
    Ok(())
}

#[cfg(unix)]
fn terminate_gracefully(child: &mut Child) -> Result<()> {
    use std::os::unix::process::ExitStatusExt;
    let pid = child.id() as i32;
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    let deadline = Instant::now() + STOP_GRACE;
    loop {
        if let Some(status) = child.try_wait()? {
            let _ = status.signal();
            return Ok(());
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(windows)]
fn terminate_gracefully(child: &mut Child) -> Result<()> {
    // Windows has no SIGTERM equivalent that Child exposes; go straight
    // to a hard kill but still honour the same grace window so a slow
    // exit is not mistaken for a hang.
    let deadline = Instant::now() + STOP_GRACE;
    loop {
        if let Some(_status) = child.try_wait()? {
            return Ok(());
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(50));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_free_port_returns_nonzero() {
        let port = allocate_free_port().unwrap();
        assert_ne!(port, 0);
    }

    #[test]
    fn chromium_readiness_pattern_matches_sample_line() {
        let re = Regex::new(r"DevTools listening on (ws://\S+)").unwrap();
        let line = "DevTools listening on ws://127.0.0.1:9222/devtools/browser/abc-123\n";
        let caps = re.captures(line).unwrap();
        assert_eq!(&caps[1], "ws://127.0.0.1:9222/devtools/browser/abc-123");
    }

    #[test]
    fn firefox_readiness_pattern_matches_sample_line() {
        let re = Regex::new(r"WebDriver BiDi listening on (ws://\S+)").unwrap();
        let line = "WebDriver BiDi listening on ws://127.0.0.1:9222/session\n";
        let caps = re.captures(line).unwrap();
        assert_eq!(&caps[1], "ws://127.0.0.1:9222/session");
    }
}
