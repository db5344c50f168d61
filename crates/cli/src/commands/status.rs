use std::path::Path;

use serde_json::Value;

use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "status", Value::Null).await;
    super::emit("status", format, outcome, |data| {
        format!(
            "running={} proxy_port={} editor_live={}",
            data.get("running").and_then(Value::as_bool).unwrap_or(false),
            data.get("proxy_port").and_then(Value::as_u64).unwrap_or(0),
            data.get("editor_live").and_then(Value::as_bool).unwrap_or(false),
        )
    })
}
