use std::path::Path;

use serde_json::json;

use crate::cli::SelectElementArgs;
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, args: SelectElementArgs, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "select_element", json!({ "timeout_ms": args.timeout_ms })).await;
    super::emit("select-element", format, outcome, |data| data.to_string())
}
