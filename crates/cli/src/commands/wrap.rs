use std::time::{Duration, Instant};

use bcd_core::rendezvous;

use crate::cli::WrapArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub async fn run(args: WrapArgs, format: OutputFormat) -> Result<()> {
    let (program, rest) = args.program.split_first().ok_or_else(|| CliError::InvalidArgument("wrap requires a program to run after --".into()))?;

    let deadline = Instant::now() + Duration::from_millis(args.timeout_ms);
    let record = loop {
        if let Some(record) = rendezvous::read() {
            break record;
        }
        if Instant::now() >= deadline {
            return Err(CliError::InvalidArgument("timed out waiting for the coordinator's rendezvous file".into()));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    };

    let cdp_endpoint = format!("http://localhost:{}", record.port);
    let substitute = |arg: &str| arg.replace("{cdp_port}", &record.port.to_string()).replace("{cdp_endpoint}", &cdp_endpoint);
    let substituted: Vec<String> = rest.iter().map(|a| substitute(a)).collect();

    if format != OutputFormat::Json {
        // wrap's own output is whatever the wrapped program prints; we
        // only note what we resolved before handing off.
        eprintln!("bcd wrap: cdp_port={} cdp_endpoint={}", record.port, cdp_endpoint);
    }

    let mut command = tokio::process::Command::new(program);
    command.args(&substituted);
    let mut child = command.spawn()?;

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let pid = child.id().map(|p| p as i32);
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let status = loop {
            tokio::select! {
                status = child.wait() => break status?,
                _ = sigterm.recv() => forward_signal(pid, libc::SIGTERM),
                _ = sigint.recv() => forward_signal(pid, libc::SIGINT),
            }
        };
        std::process::exit(status.code().unwrap_or(1));
    }

    #[cfg(windows)]
    {
        let status = child.wait().await?;
        std::process::exit(status.code().unwrap_or(1));
    }
}

#[cfg(unix)]
fn forward_signal(pid: Option<i32>, sig: i32) {
    if let Some(pid) = pid {
        unsafe {
            libc::kill(pid, sig);
        }
    }
}
