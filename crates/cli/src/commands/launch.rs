use std::path::Path;

use serde_json::{Value, json};

use crate::cli::LaunchArgs;
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, op: &'static str, args: LaunchArgs, format: OutputFormat) -> Result<()> {
    let payload = json!({ "kind": args.kind, "headless": args.headless });
    let outcome = super::call(workspace, op, payload).await;
    super::emit(op, format, outcome, |data| format!("port={}", data.get("port").and_then(Value::as_u64).unwrap_or(0)))
}
