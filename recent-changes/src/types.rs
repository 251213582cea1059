use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;
// Use the interfaces crate for the shapes exchanged with the org
pub use interfaces::defs::{ItemDescriptor, ListQuery, MetadataTypeInfo, UserIdentity, UserRecord};

pub const DEFAULT_API_VERSION: &str = "60.0";

/// Which timestamp (and which author) drives the filter and the tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChangeMode {
    Created,
    #[default]
    Modified,
}

impl ChangeMode {
    pub fn from_created_flag(created: bool) -> Self {
        if created {
            ChangeMode::Created
        } else {
            ChangeMode::Modified
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    /// `None` (JSON `null`) when the timestamp could not be read.
    pub modification_age: Option<i64>,
    pub creation_age: Option<i64>,
    pub last_modified_date: String,
    pub created_date: String,
    pub last_modified_by_name: String,
    pub created_by_name: String,
}

impl ChangeRecord {
    pub fn effective_age(&self, mode: ChangeMode) -> Option<i64> {
        match mode {
            ChangeMode::Created => self.creation_age,
            ChangeMode::Modified => self.modification_age,
        }
    }

    pub fn effective_date(&self, mode: ChangeMode) -> &str {
        match mode {
            ChangeMode::Created => &self.created_date,
            ChangeMode::Modified => &self.last_modified_date,
        }
    }

    pub fn effective_author(&self, mode: ChangeMode) -> &str {
        match mode {
            ChangeMode::Created => &self.created_by_name,
            ChangeMode::Modified => &self.last_modified_by_name,
        }
    }
}

/// Parameters of one scan, as taken from the command line.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub days: i64,
    pub mode: ChangeMode,
    pub types: String,
    pub mine: bool,
    pub output_dir: PathBuf,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            days: 15,
            mode: ChangeMode::Modified,
            types: String::new(),
            mine: false,
            output_dir: PathBuf::from("output"),
        }
    }
}

/// Everything a finished scan hands back to its caller.
#[derive(Debug, Clone, Default)]
pub struct ChangeReport {
    pub records: Vec<ChangeRecord>,
    pub manifest_path: Option<PathBuf>,
    pub warnings: Vec<String>,
    pub author_filter: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: "sf-recent-changes/0.1".to_string(),
            timeout_seconds: 120,
            max_retries: 3,
            retry_delay_ms: 2000,
        }
    }
}

/// Connection details for the target org.
#[derive(Clone)]
pub struct OrgConfig {
    pub alias: String,
    pub instance_url: Url,
    pub access_token: String,
    pub api_version: String,
}

impl std::fmt::Debug for OrgConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrgConfig")
            .field("alias", &self.alias)
            .field("instance_url", &self.instance_url.as_str())
            .field("access_token", &"***")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl OrgConfig {
    pub fn from_env(alias: &str) -> Result<Self> {
        Self::from_lookup(alias, |key| std::env::var(key).ok())
    }

    /// Resolves the org from `SF_<ALIAS>_*` variables, falling back to the
    /// unscoped `SF_*` ones.
    pub fn from_lookup<F>(alias: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let scope = env_scope(alias);
        let read = |name: &str| {
            lookup(&format!("SF_{}_{}", scope, name))
                .or_else(|| lookup(&format!("SF_{}", name)))
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let raw_url = read("INSTANCE_URL").ok_or_else(|| {
            ChangesError::Config(format!(
                "no instance URL for org '{}' (set SF_{}_INSTANCE_URL or SF_INSTANCE_URL)",
                alias, scope
            ))
        })?;
        let instance_url = Url::parse(&raw_url)?;
        if instance_url.scheme() != "https" && instance_url.scheme() != "http" {
            return Err(ChangesError::Config(format!(
                "instance URL must be http(s): {}",
                raw_url
            )));
        }

        let access_token = read("ACCESS_TOKEN").ok_or_else(|| {
            ChangesError::Config(format!(
                "no access token for org '{}' (set SF_{}_ACCESS_TOKEN or SF_ACCESS_TOKEN)",
                alias, scope
            ))
        })?;

        let api_version = read("API_VERSION").unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        Ok(Self {
            alias: alias.to_string(),
            instance_url,
            access_token,
            api_version,
        })
    }
}

fn env_scope(alias: &str) -> String {
    alias
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

#[derive(Debug, thiserror::Error)]
pub enum ChangesError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("SOAP fault {code}: {message}")]
    Soap { code: String, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid user id: {0}")]
    InvalidUserId(String),

    #[error("Failed to fetch metadata types: {0}")]
    TypeDiscovery(String),

    #[error("Invalid timestamp: {0}")]
    Timestamp(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ChangesError>;
