use console::style;
use serde::Serialize;
use std::fmt::Display;
use tabled::{settings::Style, Table, Tabled};

/// Output format mode
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    Human,
    Json,
}

pub struct OutputWriter {
    format: OutputFormat,
}

impl OutputWriter {
    pub fn new(json: bool) -> Self {
        Self {
            format: if json { OutputFormat::Json } else { OutputFormat::Human },
        }
    }

    pub fn success(&self, message: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("{} {}", style("✓").green().bold(), message);
        }
    }

    pub fn info(&self, message: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("{} {}", style("ℹ").blue().bold(), message);
        }
    }

    /// Warnings go to stderr in both modes so JSON on stdout stays parseable
    pub fn warning(&self, message: impl Display) {
        match self.format {
            OutputFormat::Human => {
                eprintln!("{} {}", style("⚠").yellow().bold(), message);
            }
            OutputFormat::Json => {
                let output = serde_json::json!({
                    "status": "warning",
                    "message": message.to_string(),
                });
                eprintln!("{}", output);
            }
        }
    }

    pub fn table<T: Tabled>(&self, data: Vec<T>) {
        if let OutputFormat::Human = self.format {
            if data.is_empty() {
                println!("{}", style("(no data)").dim());
            } else {
                let mut table = Table::new(data);
                table.with(Style::rounded());
                println!("{}", table);
            }
        }
    }

    /// Emit the command result; only JSON mode prints anything
    pub fn result<T: Serialize>(&self, data: T) -> anyhow::Result<()> {
        if let OutputFormat::Json = self.format {
            let output = serde_json::json!({
                "status": "success",
                "data": data,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Ok(())
    }

    pub fn kv(&self, key: impl Display, value: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("{}: {}", style(key).bold(), value);
        }
    }

    pub fn section(&self, title: impl Display) {
        if let OutputFormat::Human = self.format {
            println!("\n{}", style(title).bold().underlined());
        }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.format, OutputFormat::Json)
    }
}

/// `N, E, S, W` with fixed precision
pub fn format_nesw(edges: [f64; 4]) -> String {
    format!("N {:.5}, E {:.5}, S {:.5}, W {:.5}", edges[0], edges[1], edges[2], edges[3])
}

/// `✓` or an empty cell
pub fn check_mark(value: bool) -> String {
    if value { "✓".to_string() } else { String::new() }
}

/// Shorten long cell text to `max` characters
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{}…", kept)
    }
}
