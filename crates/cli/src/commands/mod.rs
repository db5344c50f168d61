mod dom;
mod fetch;
mod launch;
mod list_browsers;
mod navigate;
mod screenshot;
mod select_element;
mod serve;
mod status;
mod stop;
mod wrap;

use std::path::Path;
use std::time::Duration;

use bcd_core::config::CoordinatorConfig;
use serde_json::Value;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::output::{OutputFormat, ResultBuilder, print_result};

const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::from_secs(30);

pub async fn dispatch(cli: Cli, config: CoordinatorConfig) -> Result<()> {
    let format = cli.format;
    let workspace = cli.workspace.clone();
    match cli.command {
        Commands::Serve => serve::run(workspace, config).await,
        Commands::Wrap(args) => wrap::run(args, format).await,
        Commands::Status => status::run(workspace.as_deref(), format).await,
        Commands::ListBrowsers => list_browsers::run(workspace.as_deref(), format).await,
        Commands::Launch(args) => launch::run(workspace.as_deref(), "launch", args, format).await,
        Commands::Restart(args) => launch::run(workspace.as_deref(), "restart", args, format).await,
        Commands::Stop => stop::run(workspace.as_deref(), format).await,
        Commands::Navigate(args) => navigate::run(workspace.as_deref(), args, format).await,
        Commands::SelectElement(args) => select_element::run(workspace.as_deref(), args, format).await,
        Commands::Dom(args) => dom::run(workspace.as_deref(), args, format).await,
        Commands::Screenshot(args) => screenshot::run(workspace.as_deref(), args, format).await,
        Commands::Fetch(args) => fetch::run(workspace.as_deref(), args, format).await,
    }
}

/// Sends one control request to the running `serve` process and returns
/// its `data` payload, or a `CliError` classified from the response.
async fn call(workspace: Option<&Path>, op: &str, payload: Value) -> Result<Value> {
    let response = bcd_core::control_server::call(workspace, op, payload, DEFAULT_CONTROL_TIMEOUT).await?;
    if response.ok {
        Ok(response.data.unwrap_or(Value::Null))
    } else {
        Err(CliError::InvalidArgument(response.error.unwrap_or_else(|| "coordinator returned an error".into())))
    }
}

/// Prints on success; on failure the error is left unprinted and
/// propagated so `main` can render it once, uniformly, for every
/// command (including ones that never call `emit`, like `serve`).
fn emit<T: serde::Serialize>(command: &'static str, format: OutputFormat, outcome: Result<T>, text: impl FnOnce(&T) -> String) -> Result<()> {
    let data = outcome?;
    let rendered_text = text(&data);
    let result = ResultBuilder::new(command).data(data).build();
    print_result(&result, format, |_| rendered_text.clone());
    Ok(())
}
