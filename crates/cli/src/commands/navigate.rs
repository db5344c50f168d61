use std::path::Path;

use serde_json::json;

use crate::cli::NavigateArgs;
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, args: NavigateArgs, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "navigate", json!({ "url": args.url })).await;
    super::emit("navigate", format, outcome, |_| "navigated".to_string())
}
