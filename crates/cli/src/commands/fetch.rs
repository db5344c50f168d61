use std::path::Path;

use serde_json::{Value, json};

use crate::cli::FetchArgs;
use crate::error::{CliError, Result};
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, args: FetchArgs, format: OutputFormat) -> Result<()> {
    let headers: Option<Value> = match args.headers {
        Some(raw) => Some(serde_json::from_str(&raw).map_err(|e| CliError::InvalidArgument(format!("--headers must be a JSON object: {e}")))?),
        None => None,
    };
    let payload = json!({
        "url": args.url,
        "method": args.method,
        "headers": headers,
        "body": args.body,
        "timeout_ms": args.timeout_ms,
    });
    let outcome = super::call(workspace, "fetch", payload).await;
    super::emit("fetch", format, outcome, |data| data.get("body").and_then(Value::as_str).unwrap_or_default().to_string())
}
