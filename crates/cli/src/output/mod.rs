use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use bcd_protocol::ErrorCode;
use serde::Serialize;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Toon,
    Json,
    Ndjson,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toon" => Ok(Self::Toon),
            "json" => Ok(Self::Json),
            "ndjson" => Ok(Self::Ndjson),
            "text" => Ok(Self::Text),
            other => Err(format!("unknown output format: {other}")),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::Toon => "toon",
            OutputFormat::Json => "json",
            OutputFormat::Ndjson => "ndjson",
            OutputFormat::Text => "text",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize)]
pub struct CommandError {
    pub code: ErrorCode,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResult<T: Serialize> {
    pub schema_version: u32,
    pub ok: bool,
    pub command: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CommandError>,
    pub timings_ms: u128,
}

pub struct ResultBuilder<T: Serialize> {
    command: &'static str,
    data: Option<T>,
    error: Option<CommandError>,
    started: std::time::Instant,
}

impl<T: Serialize> ResultBuilder<T> {
    pub fn new(command: &'static str) -> Self {
        Self { command, data: None, error: None, started: std::time::Instant::now() }
    }

    pub fn data(mut self, data: T) -> Self {
        self.data = Some(data);
        self
    }

    pub fn error(mut self, code: ErrorCode, message: impl Into<String>) -> Self {
        self.error = Some(CommandError { code, message: message.into() });
        self
    }

    pub fn build(self) -> CommandResult<T> {
        CommandResult {
            schema_version: SCHEMA_VERSION,
            ok: self.error.is_none(),
            command: self.command,
            data: self.data,
            error: self.error,
            timings_ms: self.started.elapsed().as_millis(),
        }
    }
}

pub fn elapsed_ms(since: std::time::Instant) -> u128 {
    since.elapsed().as_millis()
}

/// Prints the result in the requested format. `Text` falls back to a
/// minimal human summary; callers that need a richer text rendering
/// pass a `text_fn`.
pub fn print_result<T: Serialize>(result: &CommandResult<T>, format: OutputFormat, text_fn: impl FnOnce(&CommandResult<T>) -> String) {
    match format {
        OutputFormat::Toon => {
            if let Ok(json_value) = serde_json::to_value(result) {
                println!("{}", toon::encode(&json_value, None));
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string()));
        }
        OutputFormat::Ndjson => {
            println!("{}", serde_json::to_string(result).unwrap_or_else(|_| "{}".to_string()));
        }
        OutputFormat::Text => {
            println!("{}", text_fn(result));
        }
    }
}

pub fn timeout_from_ms(ms: Option<u64>, default: Duration) -> Duration {
    ms.map(Duration::from_millis).unwrap_or(default)
}
