//! Configuration loading
//!
//! Loads gateway configuration from YAML, TOML or JSON files, with
//! environment variable substitution inside the file and environment
//! overrides layered on top.
//!
//! ## Layering
//!
//! 1. File contents (format detected from the extension), after `${VAR}` /
//!    `$VAR` substitution
//! 2. Environment variables with a prefix, using `__` for nesting
//!    (`PIDIMA_JWT__SECRET` → `jwt.secret`)

use config::{Config as Cfg, Environment, File};

pub use config::FileFormat;
use regex::{Captures, Regex};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::LazyLock;

static BRACED_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("braced env var pattern is valid")
});

static BARE_VAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$([A-Za-z_][A-Za-z0-9_]*)\b").expect("bare env var pattern is valid")
});

/// Configuration loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parsing error: {0}")]
    Parse(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type for config operations
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Detect configuration format from file extension
///
/// # Supported Extensions
///
/// - YAML: `.yaml`, `.yml`
/// - TOML: `.toml`
/// - JSON: `.json`
pub fn detect_format(path: &str) -> ConfigResult<FileFormat> {
    let ext = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| ConfigError::UnsupportedFormat("No file extension found".to_string()))?;

    match ext.to_lowercase().as_str() {
        "yaml" | "yml" => Ok(FileFormat::Yaml),
        "toml" => Ok(FileFormat::Toml),
        "json" => Ok(FileFormat::Json),
        _ => Err(ConfigError::UnsupportedFormat(ext.to_string())),
    }
}

/// Substitute environment variables in a string
///
/// Supports both `${VAR_NAME}` and `$VAR_NAME`. References to unset
/// variables are left untouched so validation can report them.
pub fn substitute_env_vars(content: &str) -> String {
    substitute_with(content, |name| std::env::var(name).ok())
}

fn substitute_with<F>(content: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let braced = BRACED_VAR.replace_all(content, |caps: &Captures| {
        lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
    });

    BARE_VAR
        .replace_all(&braced, |caps: &Captures| {
            lookup(&caps[1]).unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Load configuration from a string with explicit format
pub fn from_str<T>(content: &str, format: FileFormat) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let substituted_content = substitute_env_vars(content);

    let config = Cfg::builder()
        .add_source(File::from_str(&substituted_content, format))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration from a file with environment variable overrides
///
/// Environment variables are prefixed with `env_prefix` and use double
/// underscores `__` to represent nesting.
pub fn load_with_env<T>(path: &str, env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    let substituted = substitute_env_vars(&content);

    let config = Cfg::builder()
        .add_source(File::from_str(&substituted, format))
        .add_source(env_source(env_prefix))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

/// Load configuration purely from prefixed environment variables
///
/// Used when no config file is supplied; serde defaults fill in the rest.
pub fn load_from_env<T>(env_prefix: &str) -> ConfigResult<T>
where
    T: DeserializeOwned,
{
    let config = Cfg::builder()
        .add_source(env_source(env_prefix))
        .build()
        .map_err(|e| ConfigError::Parse(e.to_string()))?;

    config
        .try_deserialize()
        .map_err(|e| ConfigError::Serialization(e.to_string()))
}

fn env_source(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("access.public_paths")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[derive(serde::Deserialize, Debug, PartialEq)]
    struct Sample {
        name: String,
        port: u16,
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format("gateway.yaml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("gateway.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(detect_format("gateway.toml").unwrap(), FileFormat::Toml);
        assert_eq!(detect_format("gateway.json").unwrap(), FileFormat::Json);
        assert!(detect_format("gateway.txt").is_err());
        assert!(detect_format("gateway").is_err());
    }

    #[test]
    fn test_substitution_leaves_unknown_vars() {
        let lookup = |name: &str| (name == "KNOWN").then(|| "value".to_string());
        assert_eq!(
            substitute_with("a=${KNOWN} b=$KNOWN c=${MISSING}", lookup),
            "a=value b=value c=${MISSING}"
        );
    }

    #[test]
    fn test_from_str_toml() {
        let toml = r#"
name = "gateway"
port = 8080
"#;
        let config: Sample = from_str(toml, FileFormat::Toml).unwrap();
        assert_eq!(
            config,
            Sample {
                name: "gateway".into(),
                port: 8080
            }
        );
    }

    #[test]
    fn test_from_str_yaml() {
        let yaml = "name: gateway\nport: 9090\n";
        let config: Sample = from_str(yaml, FileFormat::Yaml).unwrap();
        assert_eq!(config.port, 9090);
    }

    #[test]
    fn test_load_with_env_reads_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{ "name": "from-file", "port": 7000 }}"#).unwrap();

        let path = file.path().to_str().unwrap();
        let config: Sample = load_with_env(path, "PIDIMA_CONFIG_TEST_UNUSED").unwrap();
        assert_eq!(config.name, "from-file");
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_load_with_env_rejects_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        let path = file.path().to_str().unwrap();
        let result: ConfigResult<Sample> = load_with_env(path, "PIDIMA");
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(_))));
    }
}
