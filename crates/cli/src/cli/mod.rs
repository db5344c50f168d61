use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "bcd", version, about = "Browser coordinator: stable CDP proxy + lifecycle manager")]
pub struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format: toon (default), json, ndjson, or text
    #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Toon, global = true)]
    pub format: OutputFormat,

    #[arg(long, global = true)]
    pub workspace: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the coordinator in the foreground until a shutdown signal arrives.
    Serve,
    /// Report whether a browser is running and the proxy's state.
    Status,
    /// List browsers visible to the detector, plus the editor-hosted one if live.
    ListBrowsers,
    /// Launch (or replace) the managed browser.
    Launch(LaunchArgs),
    /// Stop the managed browser, if any.
    Stop,
    /// Stop and relaunch the managed browser with the same options.
    Restart(LaunchArgs),
    /// Navigate the active page to a URL.
    Navigate(NavigateArgs),
    /// Start an interactive element-selection session.
    SelectElement(SelectElementArgs),
    /// Extract DOM HTML from the active page.
    Dom(DomArgs),
    /// Capture a screenshot of the active page.
    Screenshot(ScreenshotArgs),
    /// Perform an in-page `fetch()` carrying cookies for its origin.
    Fetch(FetchArgs),
    /// Poll the rendezvous file, substitute template variables, and exec a program.
    Wrap(WrapArgs),
}

#[derive(Debug, Args)]
pub struct LaunchArgs {
    #[arg(long)]
    pub kind: Option<String>,
    #[arg(long)]
    pub headless: Option<bool>,
}

#[derive(Debug, Args)]
pub struct NavigateArgs {
    pub url: String,
}

#[derive(Debug, Args)]
pub struct SelectElementArgs {
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,
}

#[derive(Debug, Args)]
pub struct DomArgs {
    #[arg(long)]
    pub selector: Option<String>,
    #[arg(long)]
    pub depth: Option<u32>,
}

#[derive(Debug, Args)]
pub struct ScreenshotArgs {
    #[arg(long)]
    pub selector: Option<String>,
    #[arg(long)]
    pub full_page: bool,
    #[arg(long)]
    pub format: Option<String>,
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct FetchArgs {
    pub url: String,
    #[arg(long, default_value = "GET")]
    pub method: String,
    #[arg(long)]
    pub headers: Option<String>,
    #[arg(long)]
    pub body: Option<String>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct WrapArgs {
    #[arg(long, default_value_t = 10_000)]
    pub timeout_ms: u64,
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub program: Vec<String>,
}
