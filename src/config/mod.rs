use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use toml::Value;

pub const DEFAULT_CONFIG_FILE: &str = "msgspool.toml";

const BUILTIN_CONFIG_TOML: &str = r#"
[logging]
level = "info"
human_friendly = false

[storage]
engine = "sled"
path = "~/.msgspool/data"

[storage.sled]

[envelope]
format = "extended"
"#;

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub envelope: EnvelopeConfig,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub human_friendly: bool,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct StorageConfig {
    pub engine: String,
    pub path: String,
    #[serde(default)]
    pub sled: SledConfig,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct SledConfig {
    pub cache_capacity: Option<u64>,
    pub mode: Option<String>,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct EnvelopeConfig {
    /// Writer layout for newly persisted records: `extended` or `legacy`.
    pub format: String,
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            format: "extended".to_owned(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse TOML config '{path}': {source}")]
    TomlParse {
        path: String,
        source: toml::de::Error,
    },
    #[error("failed to deserialize config: {0}")]
    Deserialize(toml::de::Error),
    #[error("missing value for CLI override '--{key}'")]
    MissingValueForArg { key: String },
    #[error("invalid CLI argument format '{arg}', expected '--section.key value'")]
    InvalidArgFormat { arg: String },
    #[error("invalid override key path '{key}'")]
    InvalidPath { key: String },
    #[error("unknown override key path '{key}'")]
    UnknownPath { key: String },
    #[error("override not supported for complex TOML type at '{key}'")]
    UnsupportedOverrideType { key: String },
    #[error("invalid value '{value}' for '{key}', expected type {expected}")]
    InvalidValueForType {
        key: String,
        expected: &'static str,
        value: String,
    },
}

impl AppConfig {
    /// Resolves the config source, then applies `--section.key value` overrides.
    ///
    /// Order: `--config <path>`, `./msgspool.toml`, built-in defaults.
    pub fn load_with_discovery(args: impl IntoIterator<Item = String>) -> Result<Self, ConfigError> {
        let (config_path, overrides) = take_config_path(args)?;

        if let Some(path) = config_path {
            return Self::load_from_toml_with_args(path, overrides);
        }

        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.is_file() {
            return Self::load_from_toml_with_args(local, overrides);
        }

        Self::load_from_str_with_args(BUILTIN_CONFIG_TOML, "<builtin>", overrides)
    }

    pub fn load_from_toml_with_args(
        path: impl AsRef<Path>,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        let label = path.as_ref().to_string_lossy().to_string();
        let toml_content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: label.clone(),
            source,
        })?;

        Self::load_from_str_with_args(&toml_content, &label, args)
    }

    fn load_from_str_with_args(
        toml_content: &str,
        label: &str,
        args: impl IntoIterator<Item = String>,
    ) -> Result<Self, ConfigError> {
        let mut root_value: Value =
            toml_content
                .parse()
                .map_err(|source| ConfigError::TomlParse {
                    path: label.to_owned(),
                    source,
                })?;

        let overrides = parse_cli_overrides(args)?;
        for (key_path, raw_value) in overrides {
            apply_override(&mut root_value, &key_path, &raw_value)?;
        }

        root_value.try_into().map_err(ConfigError::Deserialize)
    }
}

fn take_config_path(
    args: impl IntoIterator<Item = String>,
) -> Result<(Option<String>, Vec<String>), ConfigError> {
    let mut config_path = None;
    let mut rest = Vec::new();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter.next().ok_or_else(|| ConfigError::MissingValueForArg {
                key: "config".to_owned(),
            })?;
            config_path = Some(path);
        } else {
            rest.push(arg);
        }
    }

    Ok((config_path, rest))
}

fn parse_cli_overrides(
    args: impl IntoIterator<Item = String>,
) -> Result<Vec<(String, String)>, ConfigError> {
    let mut parsed = Vec::new();
    let mut iter = args.into_iter();

    while let Some(arg) = iter.next() {
        let Some(stripped) = arg.strip_prefix("--") else {
            return Err(ConfigError::InvalidArgFormat { arg });
        };

        if stripped.is_empty() {
            return Err(ConfigError::InvalidArgFormat { arg });
        }

        let value = iter.next().ok_or_else(|| ConfigError::MissingValueForArg {
            key: stripped.to_owned(),
        })?;

        parsed.push((stripped.to_owned(), value));
    }

    Ok(parsed)
}

fn apply_override(root: &mut Value, key_path: &str, raw_value: &str) -> Result<(), ConfigError> {
    let parts: Vec<&str> = key_path.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return Err(ConfigError::InvalidPath {
            key: key_path.to_owned(),
        });
    }
    let unknown = || ConfigError::UnknownPath {
        key: key_path.to_owned(),
    };

    let (final_key, sections) = parts.split_last().ok_or_else(|| ConfigError::InvalidPath {
        key: key_path.to_owned(),
    })?;

    let mut current = root;
    for section in sections {
        current = current
            .as_table_mut()
            .and_then(|table| table.get_mut(*section))
            .ok_or_else(unknown)?;
    }

    let current_value = current
        .as_table_mut()
        .and_then(|table| table.get_mut(*final_key))
        .ok_or_else(unknown)?;

    *current_value = parse_value_using_current_type(key_path, raw_value, current_value)?;
    Ok(())
}

fn parse_value_using_current_type(
    key_path: &str,
    raw_value: &str,
    current_value: &Value,
) -> Result<Value, ConfigError> {
    let invalid = |expected: &'static str| ConfigError::InvalidValueForType {
        key: key_path.to_owned(),
        expected,
        value: raw_value.to_owned(),
    };

    match current_value {
        Value::String(_) => Ok(Value::String(raw_value.to_owned())),
        Value::Integer(_) => raw_value
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| invalid("integer")),
        Value::Float(_) => raw_value
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| invalid("float")),
        Value::Boolean(_) => raw_value
            .parse::<bool>()
            .map(Value::Boolean)
            .map_err(|_| invalid("boolean")),
        Value::Datetime(_) | Value::Array(_) | Value::Table(_) => {
            Err(ConfigError::UnsupportedOverrideType {
                key: key_path.to_owned(),
            })
        }
    }
}
