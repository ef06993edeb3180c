//! Reads a JSON config file, checks it against the bundled JSON Schema,
//! then applies the checks the schema cannot express.

use std::path::Path;
use std::sync::OnceLock;

use jsonschema::Validator;
use regex::Regex;
use serde_json::Value;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

const SUPPORTED_VERSION: &str = "1.0";

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        message: message.into(),
    }
}

fn validator() -> Result<&'static Validator, ConfigError> {
    static VALIDATOR: OnceLock<Validator> = OnceLock::new();
    if let Some(validator) = VALIDATOR.get() {
        return Ok(validator);
    }
    let schema: Value = serde_json::from_str(SCHEMA_JSON)
        .map_err(|e| invalid(format!("Bundled config schema is not JSON: {}", e)))?;
    let compiled = jsonschema::validator_for(&schema)
        .map_err(|e| invalid(format!("Bundled config schema does not compile: {}", e)))?;
    Ok(VALIDATOR.get_or_init(|| compiled))
}

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let document: Value = serde_json::from_str(content)?;

    let violations: Vec<String> = validator()?
        .iter_errors(&document)
        .map(|error| format!("{} at '{}'", error, error.instance_path()))
        .collect();
    if !violations.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: violations.join("; "),
        });
    }

    let config: Config = serde_json::from_value(document)?;
    validate_config(&config)?;
    Ok(config)
}

/// Checks a config built in code or loaded from disk.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    static METADATA_KEY: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

    if config.version != SUPPORTED_VERSION {
        return Err(invalid(format!(
            "Config version {} is not supported (expected {})",
            config.version, SUPPORTED_VERSION
        )));
    }

    let key_pattern = METADATA_KEY
        .get_or_init(|| Regex::new(r"^[a-z0-9_-]+$"))
        .as_ref()
        .map_err(|e| invalid(e.to_string()))?;
    if !key_pattern.is_match(&config.metadata_key) {
        return Err(invalid(format!(
            "metadata_key '{}' may only use lowercase letters, digits, '-' and '_'",
            config.metadata_key
        )));
    }

    match config.ocr.endpoint.as_deref() {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            return Err(invalid(format!(
                "ocr.endpoint '{}' is not an http(s) URL",
                url
            )));
        }
        _ => {}
    }

    if config.ocr.max_pages == 0 {
        return Err(invalid("ocr.max_pages must be at least 1"));
    }

    Ok(())
}
