//! Terminal output for install and link progress.

use std::io::Write;

use crossterm::style::Stylize;
use mason_core::{PackageName, Reporter, Version};

/// Format a byte count with a binary unit suffix.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{size:.1} {}", UNITS[unit])
    }
}

/// Line-oriented reporter writing to stdout, failures to stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    pub fn new() -> Self {
        Self
    }

    fn line(name: &PackageName, version: &Version, status: &str) -> String {
        format!("  {:<24} {:<12} {status}", name.as_str(), version.as_str())
    }
}

impl Reporter for ConsoleReporter {
    fn section(&self, title: &str) {
        println!();
        println!("{}", title.dark_grey());
    }

    fn downloading(&self, name: &PackageName, version: &Version, current: u64, total: Option<u64>) {
        // One line per package; chunk updates would flood a plain terminal.
        if current != 0 {
            return;
        }
        let status = match total {
            Some(total) => format!("fetching {}", format_size(total)),
            None => "fetching".to_string(),
        };
        println!("{}", Self::line(name, version, &status).dark_grey());
    }

    fn extracting(&self, name: &PackageName, version: &Version, entries: usize) {
        tracing::debug!(%name, %version, entries, "extracted");
    }

    fn done(&self, name: &PackageName, version: &Version, detail: &str) {
        println!("{}", Self::line(name, version, detail).green());
    }

    fn failed(&self, name: &PackageName, version: &Version, reason: &str) {
        let _ = std::io::stdout().flush();
        eprintln!("{}", Self::line(name, version, reason).red());
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        let noun = if count == 1 { "package" } else { "packages" };
        println!();
        if elapsed_secs > 0.0 {
            println!(
                "{}",
                format!("{count} {noun} {action} in {elapsed_secs:.1}s").dark_grey()
            );
        } else {
            println!("{}", format!("{count} {noun} {action}").dark_grey());
        }
    }
}
