use std::{collections::HashMap, fs};

use anyhow::{bail, Context, Result};
use url::Url;

/// Client configuration: where the posts API lives and which owner identity
/// the management commands act as. Read once at startup; the core receives
/// plain values and never touches this module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub owner_id: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:5000".into(),
            owner_id: String::new(),
        }
    }
}

pub fn load_settings() -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string("postdeck.toml") {
        apply_file_config(&mut settings, &raw);
    }

    if let Ok(v) = std::env::var("POSTDECK_API_URL") {
        settings.api_base_url = v;
    }
    if let Ok(v) = std::env::var("POSTDECK_OWNER_ID") {
        settings.owner_id = v;
    }

    settings
}

fn apply_file_config(settings: &mut Settings, raw: &str) {
    if let Ok(file_cfg) = toml::from_str::<HashMap<String, String>>(raw) {
        if let Some(v) = file_cfg.get("api_base_url") {
            settings.api_base_url = v.clone();
        }
        if let Some(v) = file_cfg.get("owner_id") {
            settings.owner_id = v.clone();
        }
    }
}

pub fn normalize_base_url(raw: &str) -> Result<String> {
    let url = Url::parse(raw).with_context(|| format!("invalid api base url '{raw}'"))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        bail!("api base url must use http or https, got '{raw}'");
    }
    Ok(raw.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_config_overrides_defaults() {
        let mut settings = Settings::default();
        apply_file_config(
            &mut settings,
            "api_base_url = \"https://posts.example\"\nowner_id = \"owner-9\"\n",
        );
        assert_eq!(settings.api_base_url, "https://posts.example");
        assert_eq!(settings.owner_id, "owner-9");
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let mut settings = Settings::default();
        apply_file_config(&mut settings, "theme = \"dark\"\n");
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn base_url_scheme_is_enforced_and_trailing_slash_trimmed() {
        assert_eq!(
            normalize_base_url("http://127.0.0.1:5000/").expect("valid"),
            "http://127.0.0.1:5000"
        );
        assert!(normalize_base_url("ftp://posts.example").is_err());
        assert!(normalize_base_url("not a url").is_err());
    }
}
