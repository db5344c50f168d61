use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// `-v` tiers: 0 = warnings and errors only, 1 = info, 2+ = debug
/// across the whole coordinator.
pub fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn,bcd=info",
        1 => "info,bcd=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr.with_max_level(tracing::Level::TRACE)).with_target(true).with_ansi(std::io::IsTerminal::is_terminal(&std::io::stderr())).compact().init();
}
