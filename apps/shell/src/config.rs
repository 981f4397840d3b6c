use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use shared::protocol::DEFAULT_API_BASE_URL;

const DEFAULT_CONFIG_FILE: &str = "shell.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub log_filter: String,
    pub start_path: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.into(),
            log_filter: "warn".into(),
            start_path: "/".into(),
        }
    }
}

/// Defaults, then `shell.toml` (or the explicit file), then environment.
/// An explicit file that cannot be read or parsed is an error; the implicit
/// `shell.toml` is optional, and a broken one only produces a warning for the
/// caller to report once logging is up.
pub fn load_settings(explicit_file: Option<&Path>) -> anyhow::Result<(Settings, Vec<String>)> {
    load_settings_from(explicit_file, Path::new(DEFAULT_CONFIG_FILE))
}

fn load_settings_from(
    explicit_file: Option<&Path>,
    default_file: &Path,
) -> anyhow::Result<(Settings, Vec<String>)> {
    let mut settings = Settings::default();
    let mut warnings = Vec::new();

    match explicit_file {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("failed to parse config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(default_file) {
                if let Err(err) = apply_file(&mut settings, &raw) {
                    warnings.push(format!(
                        "ignoring config file '{}': {err}",
                        default_file.display()
                    ));
                }
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    Ok((settings, warnings))
}

fn apply_file(settings: &mut Settings, raw: &str) -> anyhow::Result<()> {
    let file_cfg = toml::from_str::<HashMap<String, String>>(raw)?;
    if let Some(v) = file_cfg.get("api_base_url") {
        settings.api_base_url = v.clone();
    }
    if let Some(v) = file_cfg.get("log_filter") {
        settings.log_filter = v.clone();
    }
    if let Some(v) = file_cfg.get("start_path") {
        settings.start_path = v.clone();
    }
    Ok(())
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__LOG_FILTER") {
        settings.log_filter = v;
    }

    if let Some(v) = lookup("APP__START_PATH") {
        settings.start_path = v;
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
