use std::path::Path;

use serde_json::Value;

use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, format: OutputFormat) -> Result<()> {
    let outcome = super::call(workspace, "list_browsers", Value::Null).await;
    super::emit("list-browsers", format, outcome, |data| {
        data.as_array()
            .map(|items| {
                items
                    .iter()
                    .map(|b| format!("{} ({})", b.get("name").and_then(Value::as_str).unwrap_or("?"), b.get("source").and_then(Value::as_str).unwrap_or("?")))
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default()
    })
}
