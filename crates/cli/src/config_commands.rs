use std::path::Path;

use {
    anyhow::{Result, bail},
    clap::Subcommand,
};

use felis_config::{Severity, ValidationResult};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration (file plus environment) and report
    /// errors and warnings.
    Check,
}

pub fn handle_config(action: ConfigAction, config_path: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Check => check(config_path),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

fn check(config_path: Option<&Path>) -> Result<()> {
    // Print which file we're checking
    match config_path
        .map(Path::to_path_buf)
        .or_else(felis_config::find_config_file)
    {
        Some(path) => eprintln!("Checking {}\n", path.display()),
        None => eprintln!("No config file found; checking defaults and environment.\n"),
    }

    let config = felis_config::discover_and_load(config_path)?;
    let result = felis_config::validate(&config);

    for line in render(&result) {
        eprintln!("{line}");
    }

    let errors = result.count(Severity::Error);
    if errors > 0 {
        bail!("configuration has {errors} error(s)");
    }

    Ok(())
}

fn render(result: &ValidationResult) -> Vec<String> {
    let mut lines: Vec<String> = result
        .diagnostics
        .iter()
        .map(|d| {
            let color = match d.severity {
                Severity::Error => RED,
                Severity::Warning => YELLOW,
            };
            format!("  {BOLD}{color}{}{RESET} {}: {}", d.severity, d.path, d.message)
        })
        .collect();

    let errors = result.count(Severity::Error);
    let warnings = result.count(Severity::Warning);

    if !lines.is_empty() {
        lines.push(String::new());
    }

    if errors == 0 && warnings == 0 {
        lines.push("No issues found.".to_string());
    } else {
        lines.push(format!("{errors} error(s), {warnings} warning(s)"));
    }
    lines
}
