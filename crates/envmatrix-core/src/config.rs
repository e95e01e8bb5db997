use crate::circleci::{CREATED_AT_COLUMN, VALUE_COLUMN};
use crate::error::{EnvMatrixError, Result};
use crate::local::LOCAL_COLUMN;
use crate::matrix::REQUIRED_COLUMN;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_REQUIRED_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_DEFAULT_REGION",
    "AWS_SECRET_ACCESS_KEY",
    "API_HOST",
    "CLOUDCONVERT_API_KEY",
    "CURRENT_ENV",
    "FORCE_LOCAL_JOBS",
    "HEROKU_API_KEY",
    "JOB_DEFINITION_ARN",
    "JOB_QUEUE_NAME",
    "MONGODB_ATLAS_CLUSTERNAME",
    "MONGODB_DBNAME",
    "MONGODB_URI",
    "NODE_ENV",
    "NODE_OPTIONS",
    "PORT",
    "REDIS_URL",
    "S3_BUCKET_NAME",
    "SELENIUM_USERID",
    "SELENIUM_PASSWORD",
    "SENDGRID_PASSWORD",
    "SENDGRID_SURFACEOWL_API_KEY",
    "SENDGRID_USERNAME",
    "SURFACE_OWL_API_PREFIX",
    "SURFACE_OWL_API_VERSION",
    "SURFACE_OWL_PYTHON_PATH",
    "SQS_QUEUE_URL",
    "WEB_CONCURRENCY",
    "DAEMON_CONCURRENCY",
];

pub const DEFAULT_HEROKU_APPS: &[&str] = &["urban-robot-dev", "urban-robot-staging", "urban-robot"];

fn default_required_vars() -> Vec<String> {
    DEFAULT_REQUIRED_VARS.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// HerokuConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HerokuConfig {
    #[serde(default = "default_heroku_api_url")]
    pub api_url: String,
    #[serde(default = "default_heroku_apps")]
    pub apps: Vec<String>,
}

fn default_heroku_api_url() -> String {
    "https://api.heroku.com".to_string()
}

fn default_heroku_apps() -> Vec<String> {
    DEFAULT_HEROKU_APPS.iter().map(|s| s.to_string()).collect()
}

impl Default for HerokuConfig {
    fn default() -> Self {
        Self {
            api_url: default_heroku_api_url(),
            apps: default_heroku_apps(),
        }
    }
}

// ---------------------------------------------------------------------------
// CircleCiConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircleCiConfig {
    #[serde(default = "default_circleci_api_url")]
    pub api_url: String,
    #[serde(default = "default_vcs")]
    pub vcs: String,
    #[serde(default = "default_org")]
    pub org: String,
    #[serde(default = "default_project")]
    pub project: String,
}

fn default_circleci_api_url() -> String {
    "https://circleci.com".to_string()
}

fn default_vcs() -> String {
    "gh".to_string()
}

fn default_org() -> String {
    "surfaceowl-ai".to_string()
}

fn default_project() -> String {
    "urban-robot".to_string()
}

impl Default for CircleCiConfig {
    fn default() -> Self {
        Self {
            api_url: default_circleci_api_url(),
            vcs: default_vcs(),
            org: default_org(),
            project: default_project(),
        }
    }
}

impl CircleCiConfig {
    /// Project slug as the CI API expects it, e.g. `gh/surfaceowl-ai/urban-robot`.
    pub fn slug(&self) -> String {
        format!("{}/{}/{}", self.vcs, self.org, self.project)
    }
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_required_vars")]
    pub required_vars: Vec<String>,
    #[serde(default)]
    pub heroku: HerokuConfig,
    #[serde(default)]
    pub circleci: CircleCiConfig,
    /// Per-request timeout. Unset means requests wait indefinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            required_vars: default_required_vars(),
            heroku: HerokuConfig::default(),
            circleci: CircleCiConfig::default(),
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EnvMatrixError::ConfigNotFound(path.to_path_buf()));
        }
        let data = std::fs::read_to_string(path)?;
        // An empty file is a valid "all defaults" config.
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(&data)?)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Load `path` when given, otherwise fall back to the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.required_vars.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "required_vars is empty; nothing is marked required".to_string(),
            });
        }
        for name in duplicates(&self.required_vars) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("required variable '{name}' is listed more than once"),
            });
        }
        if self.required_vars.iter().any(|v| v.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "required_vars contains an empty name".to_string(),
            });
        }

        if self.heroku.apps.is_empty() {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: "heroku.apps is empty; no remote app columns will be fetched"
                    .to_string(),
            });
        }
        for app in duplicates(&self.heroku.apps) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Warning,
                message: format!("heroku app '{app}' is listed more than once"),
            });
        }
        if self.heroku.apps.iter().any(|a| a.trim().is_empty()) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "heroku.apps contains an empty app name".to_string(),
            });
        }
        for app in &self.heroku.apps {
            if BUILTIN_COLUMNS.contains(&app.as_str()) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Warning,
                    message: format!(
                        "heroku app '{app}' has the same name as a built-in column; \
                         lookups by column name will only see the first one"
                    ),
                });
            }
        }

        if self.timeout_secs == Some(0) {
            warnings.push(ConfigWarning {
                level: WarnLevel::Error,
                message: "timeout_secs is 0; every request would time out".to_string(),
            });
        }

        for (field, value) in [
            ("circleci.vcs", &self.circleci.vcs),
            ("circleci.org", &self.circleci.org),
            ("circleci.project", &self.circleci.project),
        ] {
            if value.trim().is_empty() {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} is empty"),
                });
            }
        }

        for (field, url) in [
            ("heroku.api_url", &self.heroku.api_url),
            ("circleci.api_url", &self.circleci.api_url),
        ] {
            if !(url.starts_with("https://") || url.starts_with("http://")) {
                warnings.push(ConfigWarning {
                    level: WarnLevel::Error,
                    message: format!("{field} '{url}' is not an http(s) URL"),
                });
            }
        }

        warnings
    }
}

/// Columns the matrix always carries ahead of the app columns.
const BUILTIN_COLUMNS: &[&str] = &[REQUIRED_COLUMN, LOCAL_COLUMN, CREATED_AT_COLUMN, VALUE_COLUMN];

/// Names appearing more than once, in first-repeat order, each reported once.
fn duplicates(items: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    let mut dupes = Vec::new();
    for item in items {
        let item = item.as_str();
        if !seen.insert(item) && !dupes.contains(&item) {
            dupes.push(item);
        }
    }
    dupes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
