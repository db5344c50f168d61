use std::path::Path;

use serde_json::{Value, json};

use crate::cli::ScreenshotArgs;
use crate::error::Result;
use crate::output::OutputFormat;

pub async fn run(workspace: Option<&Path>, args: ScreenshotArgs, format: OutputFormat) -> Result<()> {
    let payload = json!({
        "selector": args.selector,
        "full_page": args.full_page,
        "format": args.format,
        "output_dir": args.output_dir.map(|p| p.display().to_string()),
    });
    let outcome = super::call(workspace, "screenshot", payload).await;
    super::emit("screenshot", format, outcome, |data| data.get("path").and_then(Value::as_str).unwrap_or_default().to_string())
}
