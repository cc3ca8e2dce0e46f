//! Config command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use biblion_core::{Config, Style};

use crate::output::{Output, OutputFormat};

const KEYS: &str = "library_dir, template, lookup_enabled, lookup_timeout_secs, mailto, style, log_file";

/// Show current configuration
pub fn show(config_path: Option<&PathBuf>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "library_dir": config.library_dir,
                    "template": config.template,
                    "lookup_enabled": config.lookup_enabled,
                    "lookup_timeout_secs": config.lookup_timeout_secs,
                    "mailto": config.mailto,
                    "style": config.style,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.library_dir.display());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .cloned()
                .unwrap_or_else(Config::config_file_path);
            println!("Configuration:");
            println!("  library_dir:         {}", config.library_dir.display());
            println!("  template:            {}", display_path(&config.template));
            println!("  lookup_enabled:      {}", config.lookup_enabled);
            println!("  lookup_timeout_secs: {}", config.lookup_timeout_secs);
            println!(
                "  mailto:              {}",
                config.mailto.as_deref().unwrap_or("(not set)")
            );
            println!("  style:               {}", config.style);
            println!("  log_file:            {}", display_path(&config.log_file));
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(
    key: String,
    value: String,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    apply_setting(&mut config, &key, &value)?;

    let save_path = config_path
        .cloned()
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    output.success(&format!("Set {} = {}", key, value));

    Ok(())
}

fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "library_dir" => config.library_dir = value.into(),
        "template" => config.template = optional(value).map(PathBuf::from),
        "lookup_enabled" => {
            config.lookup_enabled = value
                .parse()
                .context("Invalid value for lookup_enabled. Use 'true' or 'false'.")?;
        }
        "lookup_timeout_secs" => {
            config.lookup_timeout_secs = value
                .parse()
                .context("Invalid value for lookup_timeout_secs. Use a whole number of seconds.")?;
        }
        "mailto" => config.mailto = optional(value).map(str::to_string),
        "style" => {
            let lowered = value.to_lowercase();
            if !Style::ALL.iter().any(|s| s.as_str() == lowered) {
                let names: Vec<&str> = Style::ALL.iter().map(|s| s.as_str()).collect();
                bail!(
                    "Unknown citation style: '{}'\nValid styles: {}",
                    value,
                    names.join(", ")
                );
            }
            config.style = lowered;
        }
        "log_file" => config.log_file = optional(value).map(PathBuf::from),
        _ => {
            bail!(
                "Unknown configuration key: '{}'\nValid keys: {}",
                key,
                KEYS
            );
        }
    }
    Ok(())
}

/// Empty and "none" clear an optional setting
fn optional(value: &str) -> Option<&str> {
    if value.is_empty() || value == "none" {
        None
    } else {
        Some(value)
    }
}

fn display_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(not set)".to_string())
}
