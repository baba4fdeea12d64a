use std::fs;

use anyhow::Context;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub api_url: String,
    pub per_page: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "https://api.punkapi.com/v2".into(),
            per_page: 32,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    api_url: Option<String>,
    per_page: Option<u32>,
}

/// Defaults, then `catalog.toml` if present, then env overrides.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("catalog.toml") {
        apply_file_overrides(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("CATALOG_API_URL") {
        settings.api_url = v;
    }
    if let Ok(v) = std::env::var("CATALOG_PER_PAGE") {
        if let Ok(parsed) = v.parse::<u32>() {
            settings.per_page = parsed;
        }
    }

    settings
}

fn apply_file_overrides(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<FileSettings>(raw) {
        if let Some(v) = file_cfg.api_url {
            settings.api_url = v;
        }
        if let Some(v) = file_cfg.per_page {
            settings.per_page = v;
        }
    }
}

pub fn validate_api_url(raw: &str) -> anyhow::Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid API base URL: {raw}"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
