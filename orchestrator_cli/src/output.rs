//! Terminal output helpers.

use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::error::{CliError, Result};

/// Format for structured documents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Raw command output, indented under the message it belongs to.
pub fn detail(text: &str) {
    for line in text.lines() {
        println!("  {}", line.dimmed());
    }
}

pub fn render<T: Serialize>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).map_err(|e| CliError::Decode(e.to_string()))
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(value).map_err(|e| CliError::Decode(e.to_string()))
        }
    }
}
