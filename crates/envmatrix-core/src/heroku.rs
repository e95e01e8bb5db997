//! Heroku Platform API: config vars for one app.
//!
//! `GET {api_url}/apps/{app}/config-vars` with a bearer token returns a flat
//! JSON object of name → value. A 401 carries `{"id": "unauthorized", ...}`.

use crate::error::{EnvMatrixError, Result};
use crate::http;
use crate::table::VariableTable;
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const HEROKU_API_KEY_ENV: &str = "HEROKU_API_KEY";
pub const HEROKU_ACCEPT: &str = "application/vnd.heroku+json; version=3";

const UNAUTHORIZED_ID: &str = "unauthorized";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    id: String,
    #[serde(default)]
    message: String,
}

/// A fetched app: its one-column table plus the parsed payload.
#[derive(Debug, Clone)]
pub struct RemoteVars {
    pub table: VariableTable,
    pub raw: Map<String, Value>,
}

#[derive(Debug, Clone)]
pub struct HerokuClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl HerokuClient {
    /// `token` is trimmed; a blank token counts as missing.
    pub fn new(http: Client, api_url: impl Into<String>, token: Option<String>) -> Self {
        let token = token
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self {
            http,
            api_url: api_url.into(),
            token,
        }
    }

    pub fn has_credential(&self) -> bool {
        self.token.is_some()
    }

    pub fn config_vars_url(&self, app: &str) -> String {
        http::join(&self.api_url, &format!("apps/{app}/config-vars"))
    }

    pub fn fetch(&self, app: &str) -> Result<RemoteVars> {
        let token = self
            .token
            .as_deref()
            .ok_or(EnvMatrixError::MissingCredential(HEROKU_API_KEY_ENV))?;

        let url = self.config_vars_url(app);
        tracing::debug!(%url, "fetching heroku config vars");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header(ACCEPT, HEROKU_ACCEPT)
            .send()?;

        let status = response.status();
        let body = response.text()?;

        if status == StatusCode::OK {
            let vars = parse_config_vars(app, &body)?;
            tracing::info!(app, vars = vars.table.len(), "fetched heroku config vars");
            return Ok(vars);
        }

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(err) = serde_json::from_str::<ErrorBody>(&body) {
                if err.id == UNAUTHORIZED_ID {
                    return Err(EnvMatrixError::Unauthorized {
                        app: app.to_string(),
                        id: err.id,
                        message: err.message,
                    });
                }
            }
        }

        Err(EnvMatrixError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    /// Log why `app` produced no column. Unauthorized responses also get a
    /// curl command for checking the key by hand.
    pub fn report_failure(&self, app: &str, err: &EnvMatrixError) {
        match err {
            EnvMatrixError::Unauthorized { id, message, .. } => {
                tracing::error!(app, "heroku rejected credentials: 401 - {id}: {message}");
                tracing::error!(app, "verify the key manually:\n{}", self.curl_hint(app));
            }
            EnvMatrixError::UnexpectedStatus { status, body } => {
                tracing::error!(app, status, body = %body, "failed to retrieve heroku config vars");
            }
            other => tracing::error!(app, error = %other, "failed to retrieve heroku config vars"),
        }
    }

    pub fn curl_hint(&self, app: &str) -> String {
        format!(
            "curl -nX GET {} -H \"Accept: {HEROKU_ACCEPT}\" -H \"Authorization: Bearer ${HEROKU_API_KEY_ENV}\"",
            self.config_vars_url(app)
        )
    }
}

/// Parse a config-vars body into a table whose single column is `app`.
/// `null` values become empty cells; other non-string scalars keep their JSON
/// text.
pub fn parse_config_vars(app: &str, body: &str) -> Result<RemoteVars> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| EnvMatrixError::MalformedBody(format!("config vars for '{app}': {e}")))?;
    let Value::Object(raw) = value else {
        return Err(EnvMatrixError::MalformedBody(format!(
            "config vars for '{app}' is not a JSON object"
        )));
    };

    let mut table = VariableTable::single(app);
    for (name, v) in &raw {
        let cell = match v {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        };
        table.insert(name.clone(), vec![cell]);
    }
    Ok(RemoteVars { table, raw })
}
