//! CircleCI v2 API: project environment variables.
//!
//! `GET {api_url}/api/v2/project/{vcs}/{org}/{project}/envvar` returns
//! `{"items": [{"name", "created_at", "value"}], "next_page_token"}`. Values
//! come back masked by CircleCI and are passed through untouched.

use crate::config::CircleCiConfig;
use crate::error::{EnvMatrixError, Result};
use crate::http;
use crate::table::VariableTable;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

pub const CIRCLECI_TOKEN_ENV: &str = "CIRCLECI_PERSONAL_API_TOKEN";
pub const CREATED_AT_COLUMN: &str = "CIRCLECI_created_at";
pub const VALUE_COLUMN: &str = "CIRCLECI_value";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CiEnvVar {
    pub name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EnvVarPage {
    #[serde(default)]
    items: Vec<CiEnvVar>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// The project's variables as a two-column table plus the raw records.
#[derive(Debug, Clone)]
pub struct CiVars {
    pub table: VariableTable,
    pub items: Vec<CiEnvVar>,
}

#[derive(Debug, Clone)]
pub struct CircleCiClient {
    http: Client,
    api_url: String,
    token: Option<String>,
}

impl CircleCiClient {
    /// A missing token is not checked here; the request is sent without the
    /// `Circle-Token` header and CircleCI's rejection is handled like any
    /// other HTTP failure.
    pub fn new(http: Client, api_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            token,
        }
    }

    pub fn envvar_url(&self, project: &CircleCiConfig) -> String {
        http::join(
            &self.api_url,
            &format!("api/v2/project/{}/envvar", project.slug()),
        )
    }

    pub fn fetch(&self, project: &CircleCiConfig) -> Result<CiVars> {
        let url = self.envvar_url(project);
        tracing::debug!(%url, "fetching circleci env vars");

        let mut request = self
            .http
            .get(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json");
        if let Some(token) = &self.token {
            request = request.header("Circle-Token", token.as_str());
        }

        let response = request.send()?.error_for_status()?;
        let body = response.text()?;
        let page: EnvVarPage = serde_json::from_str(&body)
            .map_err(|e| EnvMatrixError::MalformedBody(format!("circleci env vars: {e}")))?;

        if page.next_page_token.is_some() {
            tracing::warn!(
                project = %project.slug(),
                "circleci returned more pages of env vars; only the first page is shown"
            );
        }

        let table = items_to_table(&page.items);
        tracing::info!(project = %project.slug(), vars = table.len(), "fetched circleci env vars");
        Ok(CiVars {
            table,
            items: page.items,
        })
    }

    pub fn report_failure(&self, project: &CircleCiConfig, err: &EnvMatrixError) {
        tracing::error!(project = %project.slug(), error = %err, "failed to retrieve circleci env vars");
    }
}

/// Index records by name into the created-at and value columns. A repeated
/// name keeps its last record.
pub fn items_to_table(items: &[CiEnvVar]) -> VariableTable {
    let mut table = VariableTable::new([CREATED_AT_COLUMN, VALUE_COLUMN]);
    for item in items {
        table.insert(
            item.name.clone(),
            vec![item.created_at.clone(), item.value.clone()],
        );
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> CircleCiConfig {
        CircleCiConfig {
            api_url: String::new(),
            vcs: "gh".into(),
            org: "acme".into(),
            project: "widget".into(),
        }
    }

    fn client(server: &mockito::ServerGuard, token: Option<&str>) -> CircleCiClient {
        CircleCiClient::new(
            http::client().unwrap(),
            server.url(),
            token.map(str::to_string),
        )
    }

    #[test]
    fn fetch_success_builds_two_column_table() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/v2/project/gh/acme/widget/envvar")
            .match_header("circle-token", "tok")
            .match_header("accept", "application/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"items":[
                    {"name":"A","created_at":"2024-03-01T00:00:00Z","value":"xxxx1234"},
                    {"name":"B","created_at":"2024-03-02T00:00:00Z","value":null}
                ],"next_page_token":null}"#,
            )
            .create();

        let vars = client(&server, Some("tok")).fetch(&project()).unwrap();
        mock.assert();

        assert_eq!(
            vars.table.columns(),
            &[CREATED_AT_COLUMN.to_string(), VALUE_COLUMN.to_string()]
        );
        assert_eq!(vars.table.get("A", VALUE_COLUMN), Some("xxxx1234"));
        assert_eq!(
            vars.table.get("A", CREATED_AT_COLUMN),
            Some("2024-03-01T00:00:00Z")
        );
        assert_eq!(vars.table.get("B", VALUE_COLUMN), None);
        assert_eq!(vars.items.len(), 2);
    }

    #[test]
    fn fetch_empty_items() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/api/v2/project/gh/acme/widget/envvar")
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create();

        let vars = client(&server, Some("tok")).fetch(&project()).unwrap();
        assert!(vars.table.is_empty());
        assert_eq!(vars.table.columns().len(), 2);
    }

    #[test]
    fn fetch_non_2xx_is_http_error() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/api/v2/project/gh/acme/widget/envvar")
            .with_status(404)
            .with_body(r#"{"message":"Project not found"}"#)
            .create();

        let err = client(&server, Some("tok")).fetch(&project()).unwrap_err();
        assert!(matches!(err, EnvMatrixError::Http(_)));
    }

    #[test]
    fn fetch_without_token_omits_header() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/api/v2/project/gh/acme/widget/envvar")
            .match_header("circle-token", mockito::Matcher::Missing)
            .with_status(401)
            .with_body(r#"{"message":"You must log in first."}"#)
            .create();

        let err = client(&server, None).fetch(&project()).unwrap_err();
        mock.assert();
        assert!(matches!(err, EnvMatrixError::Http(_)));
    }

    #[test]
    fn fetch_malformed_body() {
        let mut server = mockito::Server::new();
        let _mock = server
            .mock("GET", "/api/v2/project/gh/acme/widget/envvar")
            .with_status(200)
            .with_body("not json")
            .create();

        let err = client(&server, Some("tok")).fetch(&project()).unwrap_err();
        assert!(matches!(err, EnvMatrixError::MalformedBody(_)));
    }

    #[test]
    fn fetch_connection_refused_is_http_error() {
        let circleci = CircleCiClient::new(
            http::client().unwrap(),
            "http://127.0.0.1:1",
            Some("tok".into()),
        );
        let err = circleci.fetch(&project()).unwrap_err();
        assert!(matches!(err, EnvMatrixError::Http(_)));
    }

    #[test]
    fn items_to_table_last_duplicate_wins() {
        let items = vec![
            CiEnvVar {
                name: "A".into(),
                created_at: Some("t1".into()),
                value: Some("v1".into()),
            },
            CiEnvVar {
                name: "A".into(),
                created_at: Some("t2".into()),
                value: None,
            },
        ];
        let table = items_to_table(&items);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("A", CREATED_AT_COLUMN), Some("t2"));
        assert_eq!(table.get("A", VALUE_COLUMN), None);
    }
}
