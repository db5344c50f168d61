use std::path::Path;

use serde_json::Value;

use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "stop", Value::Null).await;
    super::emit("stop", format, outcome, |_| "stopped".to_string())
}
