//! Loading settings from TOML and the environment.
//!
//! Load order:
//!
//! 1. Parse the TOML document (or start from defaults when no file is given).
//! 2. Apply environment overrides (`COPILOT_MODEL`, then `OPENAI_MODEL`;
//!    `COPILOT_BASE_URL`).
//! 3. Validate the result.

use std::path::Path;

use tracing::debug;

use copilot_contracts::{
    error::{CopilotError, CopilotResult},
    settings::Settings,
};

use crate::validate::validate;

/// Model override variables, highest precedence first.
pub const MODEL_ENV_VARS: [&str; 2] = ["COPILOT_MODEL", "OPENAI_MODEL"];

/// Base URL override variable.
pub const BASE_URL_ENV_VAR: &str = "COPILOT_BASE_URL";

/// Parse `s` as a TOML settings document.
///
/// Missing sections and fields take their defaults. Returns
/// `CopilotError::Config` if the TOML is malformed or a field has the wrong
/// type. Does not validate or apply overrides.
pub fn from_toml_str(s: &str) -> CopilotResult<Settings> {
    toml::from_str(s).map_err(|e| CopilotError::Config {
        reason: format!("failed to parse settings TOML: {}", e),
    })
}

/// Read the file at `path` and parse it as a TOML settings document.
pub fn from_file(path: &Path) -> CopilotResult<Settings> {
    let contents = std::fs::read_to_string(path).map_err(|e| CopilotError::Config {
        reason: format!("failed to read settings file '{}': {}", path.display(), e),
    })?;
    from_toml_str(&contents)
}

/// Overlay environment overrides onto `settings`.
///
/// `lookup` resolves a variable name to its value; blank values are ignored.
/// Production callers pass `|k| std::env::var(k).ok()`.
pub fn apply_env_overrides<F>(mut settings: Settings, lookup: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let non_blank = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some((key, model)) = MODEL_ENV_VARS.iter().find_map(|k| non_blank(*k).map(|v| (*k, v))) {
        debug!(var = key, model = %model, "model overridden from environment");
        settings.generation.model = model;
    }
    if let Some(base_url) = non_blank(BASE_URL_ENV_VAR) {
        debug!(base_url = %base_url, "base URL overridden from environment");
        settings.generation.base_url = base_url;
    }
    settings
}

/// Load settings the way the CLI does: file (or defaults), process
/// environment overrides, then validation.
pub fn load(path: Option<&Path>) -> CopilotResult<Settings> {
    let settings = match path {
        Some(path) => from_file(path)?,
        None => Settings::default(),
    };
    let settings = apply_env_overrides(settings, |key| std::env::var(key).ok());
    validate(&settings)?;
    Ok(settings)
}
