use std::path::Path;

use serde_json::{Value, json};

use crate::cli::DomArgs;
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, args: DomArgs, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "dom", json!({ "selector": args.selector, "depth": args.depth })).await;
    super::emit("dom", format, outcome, |data| data.get("html").and_then(Value::as_str).unwrap_or_default().to_string())
}
