//! Connection settings for the platform REST API
//!
//! Credentials come from a dotenv-style environment file layered under the
//! process environment. Variables already present in the process environment
//! win over the file, so a CI job can override a checked-in `.env`.

use std::collections::HashMap;
use std::path::Path;

use secrecy::SecretString;
use thiserror::Error;
use tracing::{debug, warn};

/// Server URL variable
pub const SERVER_URL_VAR: &str = "TS_SERVER_URL";
/// Username variable
pub const USERNAME_VAR: &str = "TS_USERNAME";
/// Password variable
pub const PASSWORD_VAR: &str = "TS_PASSWORD";
/// GUID of the usage-statistics logical table queried for impressions
pub const LOGICAL_TABLE_ID_VAR: &str = "TS_LOGICAL_TABLE_ID";
/// GUID of the object whose permissions are previewed and exported each run
pub const SAMPLE_GUID_VAR: &str = "TS_SAMPLE_GUID";

/// Errors raised while resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Environment file could not be read
    #[error("Failed to read environment file {path}: {message}")]
    Read { path: String, message: String },

    /// Malformed line in the environment file
    #[error("Invalid line {line} in environment file: {reason}")]
    Parse { line: usize, reason: String },

    /// Required variable missing from both the file and the environment
    #[error("Required variable {0} is not set")]
    MissingVariable(&'static str),

    /// A value failed validation
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

impl ConfigError {
    /// Get a user-friendly error message for CLI output
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::MissingVariable(name) => format!(
                "{name} is not set.\n\n\
                Hints:\n\
                - Add {name}=... to your .env file\n\
                - Or point --env-file at the file holding your credentials"
            ),
            _ => self.to_string(),
        }
    }
}

/// Parsed contents of a dotenv-style file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvFile {
    vars: HashMap<String, String>,
}

impl EnvFile {
    /// Parse `KEY=VALUE` lines.
    ///
    /// Supports `#` comments, blank lines, an optional `export ` prefix and
    /// single or double quoted values. Unquoted values lose any trailing
    /// ` #comment`.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut vars = HashMap::new();

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            let (key, value) = line.split_once('=').ok_or_else(|| ConfigError::Parse {
                line: line_no,
                reason: "expected KEY=VALUE".to_string(),
            })?;

            let key = key.trim();
            if key.is_empty()
                || !key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
            {
                return Err(ConfigError::Parse {
                    line: line_no,
                    reason: format!("invalid variable name '{}'", key),
                });
            }

            let value = parse_value(value.trim(), line_no)?;
            vars.insert(key.to_string(), value);
        }

        Ok(Self { vars })
    }

    /// Load an environment file from disk.
    ///
    /// A missing file yields an empty set of variables so that credentials can
    /// come entirely from the process environment.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let file = Self::parse(&text)?;
                debug!(path = %path.display(), vars = file.len(), "Loaded environment file");
                Ok(file)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "Environment file not found, using process environment only");
                Ok(Self::default())
            }
            Err(e) => Err(ConfigError::Read {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Look up a variable
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Number of variables defined
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the file defined no variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

fn parse_value(value: &str, line_no: usize) -> Result<String, ConfigError> {
    let unterminated = || ConfigError::Parse {
        line: line_no,
        reason: "unterminated quoted value".to_string(),
    };

    if let Some(rest) = value.strip_prefix('"') {
        let end = find_closing_quote(rest).ok_or_else(unterminated)?;
        return Ok(unescape(&rest[..end]));
    }

    if let Some(rest) = value.strip_prefix('\'') {
        let end = rest.find('\'').ok_or_else(unterminated)?;
        return Ok(rest[..end].to_string());
    }

    let value = match value.find(" #") {
        Some(pos) => &value[..pos],
        None => value,
    };
    Ok(value.trim_end().to_string())
}

/// Expand `\n`, `\t`, `\"` and `\\` in a double-quoted value.
///
/// Unknown escapes are kept as written.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Index of the first unescaped `"` in `s`
fn find_closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

/// Resolved connection settings
#[derive(Debug)]
pub struct Settings {
    /// Base server URL without trailing slash
    pub server_url: String,
    /// Login name
    pub username: String,
    /// Login password, redacted in `Debug` output
    pub password: SecretString,
    /// Usage-statistics logical table
    pub logical_table_id: Option<String>,
    /// Object previewed and exported at the end of an archive run
    pub sample_guid: Option<String>,
}

impl Settings {
    /// Resolve settings from an environment file and a variable lookup.
    ///
    /// `lookup` is consulted first (normally the process environment), then
    /// the file. Empty values count as unset.
    pub fn resolve<F>(file: &EnvFile, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| -> Option<String> {
            lookup(key)
                .or_else(|| file.get(key).map(str::to_string))
                .filter(|v| !v.trim().is_empty())
        };

        let server_url = get(SERVER_URL_VAR).ok_or(ConfigError::MissingVariable(SERVER_URL_VAR))?;
        let server_url = normalize_server_url(&server_url)?;

        Ok(Self {
            server_url,
            username: get(USERNAME_VAR).ok_or(ConfigError::MissingVariable(USERNAME_VAR))?,
            password: get(PASSWORD_VAR)
                .map(SecretString::from)
                .ok_or(ConfigError::MissingVariable(PASSWORD_VAR))?,
            logical_table_id: get(LOGICAL_TABLE_ID_VAR),
            sample_guid: get(SAMPLE_GUID_VAR),
        })
    }

    /// Load the file at `path` and resolve against the process environment
    pub fn from_env_file(path: &Path) -> Result<Self, ConfigError> {
        let file = EnvFile::load(path)?;
        Self::resolve(&file, |key| std::env::var(key).ok())
    }

    /// The usage table GUID, required for impression lookups
    pub fn require_logical_table_id(&self) -> Result<&str, ConfigError> {
        self.logical_table_id
            .as_deref()
            .ok_or(ConfigError::MissingVariable(LOGICAL_TABLE_ID_VAR))
    }
}

fn normalize_server_url(url: &str) -> Result<String, ConfigError> {
    let url = url.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        return Err(ConfigError::InvalidValue {
            name: SERVER_URL_VAR,
            reason: format!("'{}' must start with http:// or https://", url),
        });
    }
    Ok(url.trim_end_matches('/').to_string())
}
