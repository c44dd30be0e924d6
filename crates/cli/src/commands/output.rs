//! Output format selection and shared printing helpers.

use anyhow::{anyhow, Result};
use serde::Serialize;

/// Output format for command reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    /// Parses an output format from string.
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(anyhow!(
                "Unknown format: '{}'. Valid formats: text, json",
                s
            )),
        }
    }
}

/// Prints `value` as pretty JSON, or the text report produced by `text`.
pub fn emit<T: Serialize>(format: OutputFormat, value: &T, text: impl FnOnce(&T) -> String) -> Result<()> {
    match format {
        OutputFormat::Text => println!("{}", text(value)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
    }
    Ok(())
}

/// Report banner with a generation timestamp.
pub fn header(title: &str) -> String {
    let rule = "=".repeat(60);
    format!(
        "{rule}\n{title}\nGenerated {}\n{rule}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}

pub fn pct(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}
