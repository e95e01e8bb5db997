//! Builds the comparison matrix: required flags, local env, CircleCI, then
//! one column per Heroku app, merged on variable name.
//!
//! Sources are fetched one after another in that order. A source that fails
//! is logged and left out; the run itself never fails.

use crate::circleci::CircleCiClient;
use crate::config::{CircleCiConfig, Config};
use crate::heroku::{HerokuClient, HEROKU_API_KEY_ENV};
use crate::local::{self, EnvSource};
use crate::table::{self, Matrix, MissingReport, VariableTable};

pub const REQUIRED_COLUMN: &str = "REQUIRED_ENV_VARS";
pub const REQUIRED_MARKER: &str = "Yes";

/// The seed table: every required name flagged with [`REQUIRED_MARKER`].
pub fn required_table(required: &[String]) -> VariableTable {
    let mut table = VariableTable::single(REQUIRED_COLUMN);
    for name in required {
        table.insert(name.clone(), vec![Some(REQUIRED_MARKER.to_string())]);
    }
    table
}

/// Merge already-collected source tables behind the required seed and order
/// the rows required-first.
pub fn assemble(required: &[String], sources: Vec<VariableTable>) -> Matrix {
    let mut tables = Vec::with_capacity(sources.len() + 1);
    tables.push(required_table(required));
    tables.extend(sources);
    let mut matrix = table::outer_join(&tables);
    matrix.group_first_by(REQUIRED_COLUMN, REQUIRED_MARKER);
    matrix
}

/// Required names reading `not_set`, per source column.
pub fn missing_required(matrix: &Matrix) -> Vec<MissingReport> {
    matrix.missing(REQUIRED_COLUMN, REQUIRED_MARKER)
}

pub struct MatrixBuilder<'a> {
    env: &'a dyn EnvSource,
    circleci: &'a CircleCiClient,
    heroku: &'a HerokuClient,
}

impl<'a> MatrixBuilder<'a> {
    pub fn new(
        env: &'a dyn EnvSource,
        circleci: &'a CircleCiClient,
        heroku: &'a HerokuClient,
    ) -> Self {
        Self {
            env,
            circleci,
            heroku,
        }
    }

    /// Build the matrix for `config`'s required names, CI project, and apps.
    pub fn build_for(&self, config: &Config) -> Matrix {
        self.build(&config.required_vars, &config.circleci, &config.heroku.apps)
    }

    pub fn build(
        &self,
        required: &[String],
        ci_project: &CircleCiConfig,
        apps: &[String],
    ) -> Matrix {
        let mut sources = vec![local::read_local(self.env, required)];

        match self.circleci.fetch(ci_project) {
            Ok(ci) => sources.push(ci.table),
            Err(e) => self.circleci.report_failure(ci_project, &e),
        }

        if !apps.is_empty() && !self.heroku.has_credential() {
            tracing::error!(
                apps = apps.len(),
                "{HEROKU_API_KEY_ENV} environment variable is not set; skipping all heroku apps"
            );
        } else {
            for app in apps {
                match self.heroku.fetch(app) {
                    Ok(vars) => sources.push(vars.table),
                    Err(e) => {
                        self.heroku.report_failure(app, &e);
                        if e.is_credential_failure() {
                            tracing::warn!(app = %app, "no column for heroku app; check heroku API login credentials");
                        } else {
                            tracing::warn!(app = %app, "no column for heroku app");
                        }
                    }
                }
            }
        }

        assemble(required, sources)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circleci::{CREATED_AT_COLUMN, VALUE_COLUMN};
    use crate::http;
    use crate::local::LOCAL_COLUMN;
    use crate::table::NOT_SET;
    use std::collections::HashMap;

    const CI_PATH: &str = "/api/v2/project/gh/acme/widget/envvar";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn ci_project() -> CircleCiConfig {
        CircleCiConfig {
            api_url: String::new(),
            vcs: "gh".into(),
            org: "acme".into(),
            project: "widget".into(),
        }
    }

    struct Fixture {
        server: mockito::ServerGuard,
        env: HashMap<String, String>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                server: mockito::Server::new(),
                env: HashMap::new(),
            }
        }

        fn build(&self, token: Option<&str>, required: &[&str], apps: &[&str]) -> Matrix {
            let http = http::client().unwrap();
            let ci = CircleCiClient::new(http.clone(), self.server.url(), Some("ci".into()));
            let heroku =
                HerokuClient::new(http, self.server.url(), token.map(str::to_string));
            MatrixBuilder::new(&self.env, &ci, &heroku).build(
                &strings(required),
                &ci_project(),
                &strings(apps),
            )
        }
    }

    #[test]
    fn scenario_single_app() {
        let mut fx = Fixture::new();
        fx.env.insert("A".into(), "1".into());
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/app1/config-vars")
            .with_status(200)
            .with_body(r#"{"A":"x","C":"y"}"#)
            .create();

        let m = fx.build(Some("tok"), &["A", "B"], &["app1"]);

        assert_eq!(
            m.columns,
            vec![REQUIRED_COLUMN, LOCAL_COLUMN, CREATED_AT_COLUMN, VALUE_COLUMN, "app1"]
        );
        let names: Vec<&str> = m.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        assert_eq!(
            m.row("A").unwrap().cells,
            vec!["Yes", "1", NOT_SET, NOT_SET, "x"]
        );
        assert_eq!(
            m.row("B").unwrap().cells,
            vec!["Yes", NOT_SET, NOT_SET, NOT_SET, NOT_SET]
        );
        assert_eq!(
            m.row("C").unwrap().cells,
            vec![NOT_SET, NOT_SET, NOT_SET, NOT_SET, "y"]
        );
    }

    #[test]
    fn required_rows_sort_before_extras() {
        let mut fx = Fixture::new();
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(
                r#"{"items":[{"name":"AAA_EXTRA","created_at":"t","value":"xxxx"}]}"#,
            )
            .create();

        let m = fx.build(Some("tok"), &["ZED", "MID"], &[]);
        let names: Vec<&str> = m.rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["MID", "ZED", "AAA_EXTRA"]);
        assert_eq!(m.cell("AAA_EXTRA", VALUE_COLUMN), Some("xxxx"));
        assert_eq!(m.cell("AAA_EXTRA", REQUIRED_COLUMN), Some(NOT_SET));
    }

    #[test]
    fn unauthorized_app_is_skipped_others_kept() {
        let mut fx = Fixture::new();
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/locked/config-vars")
            .with_status(401)
            .with_body(r#"{"id":"unauthorized","message":"Invalid credentials provided."}"#)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/open/config-vars")
            .with_status(200)
            .with_body(r#"{"A":"ok"}"#)
            .create();

        let m = fx.build(Some("tok"), &["A"], &["locked", "open"]);
        assert!(m.column_index("locked").is_none());
        assert_eq!(m.cell("A", "open"), Some("ok"));
        assert_eq!(m.cell("A", REQUIRED_COLUMN), Some(REQUIRED_MARKER));
    }

    #[test]
    fn ci_failure_drops_ci_columns_only() {
        let mut fx = Fixture::new();
        fx.env.insert("A".into(), "local-a".into());
        let _ci = fx.server.mock("GET", CI_PATH).with_status(500).create();
        let _app = fx
            .server
            .mock("GET", "/apps/app1/config-vars")
            .with_status(200)
            .with_body(r#"{"A":"x"}"#)
            .create();

        let m = fx.build(Some("tok"), &["A"], &["app1"]);
        assert_eq!(m.columns, vec![REQUIRED_COLUMN, LOCAL_COLUMN, "app1"]);
        assert_eq!(m.cell("A", LOCAL_COLUMN), Some("local-a"));
    }

    #[test]
    fn unreachable_hosts_leave_only_local_column() {
        let mut env = HashMap::new();
        env.insert("A".to_string(), "local-a".to_string());
        let client = http::client().unwrap();
        let circleci =
            CircleCiClient::new(client.clone(), "http://127.0.0.1:1", Some("tok".into()));
        let heroku = HerokuClient::new(client, "http://127.0.0.1:1", Some("tok".into()));

        let m = MatrixBuilder::new(&env, &circleci, &heroku).build(
            &strings(&["A", "B"]),
            &ci_project(),
            &strings(&["app1"]),
        );

        assert_eq!(m.columns, vec![REQUIRED_COLUMN, LOCAL_COLUMN]);
        assert_eq!(m.cell("A", LOCAL_COLUMN), Some("local-a"));
        assert_eq!(m.cell("B", LOCAL_COLUMN), Some(NOT_SET));
        assert!(m.column_index(CREATED_AT_COLUMN).is_none());
        assert!(m.column_index("app1").is_none());
    }

    #[test]
    fn malformed_app_body_is_skipped() {
        let mut fx = Fixture::new();
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[]}"#)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/app1/config-vars")
            .with_status(200)
            .with_body("{truncated")
            .create();

        let m = fx.build(Some("tok"), &["A"], &["app1"]);
        assert!(m.column_index("app1").is_none());
        assert_eq!(m.rows.len(), 1);
    }

    #[test]
    fn missing_heroku_credential_skips_apps_but_keeps_local_and_ci() {
        let mut fx = Fixture::new();
        fx.env.insert("A".into(), "1".into());
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[{"name":"A","created_at":"t","value":"xxxx"}]}"#)
            .create();
        let app_mock = fx
            .server
            .mock("GET", mockito::Matcher::Regex("^/apps/".into()))
            .expect(0)
            .create();

        let m = fx.build(None, &["A"], &["app1", "app2"]);
        app_mock.assert();
        assert_eq!(
            m.columns,
            vec![REQUIRED_COLUMN, LOCAL_COLUMN, CREATED_AT_COLUMN, VALUE_COLUMN]
        );
        assert_eq!(m.cell("A", VALUE_COLUMN), Some("xxxx"));
    }

    #[test]
    fn every_cell_is_populated() {
        let mut fx = Fixture::new();
        fx.env.insert("A".into(), String::new());
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[{"name":"Q","created_at":null,"value":null}]}"#)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/app1/config-vars")
            .with_status(200)
            .with_body(r#"{"Z":null}"#)
            .create();

        let m = fx.build(Some("tok"), &["A", "B"], &["app1"]);
        for row in &m.rows {
            assert_eq!(row.cells.len(), m.columns.len());
        }
        assert_eq!(m.cell("A", LOCAL_COLUMN), Some(""));
        assert_eq!(m.cell("Q", CREATED_AT_COLUMN), Some(NOT_SET));
        assert_eq!(m.cell("Z", "app1"), Some(NOT_SET));
    }

    #[test]
    fn repeated_runs_are_identical() {
        let mut fx = Fixture::new();
        fx.env.insert("A".into(), "1".into());
        let _ci = fx
            .server
            .mock("GET", CI_PATH)
            .with_status(200)
            .with_body(r#"{"items":[{"name":"B","created_at":"t","value":"v"}]}"#)
            .expect(2)
            .create();
        let _app = fx
            .server
            .mock("GET", "/apps/app1/config-vars")
            .with_status(200)
            .with_body(r#"{"C":"c","A":"a"}"#)
            .expect(2)
            .create();

        let first = fx.build(Some("tok"), &["A", "B"], &["app1"]);
        let second = fx.build(Some("tok"), &["A", "B"], &["app1"]);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn required_names_appear_once_each() {
        let m = assemble(&strings(&["A", "B", "A"]), vec![]);
        assert_eq!(m.rows.len(), 2);
        for row in &m.rows {
            assert_eq!(row.cells[0], REQUIRED_MARKER);
        }
    }

    #[test]
    fn missing_required_lists_unset_per_column() {
        let mut local = VariableTable::single(LOCAL_COLUMN);
        local.insert("A", vec![Some("1".into())]);
        local.insert("B", vec![None]);
        let m = assemble(&strings(&["A", "B"]), vec![local]);

        let missing = missing_required(&m);
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].column, LOCAL_COLUMN);
        assert_eq!(missing[0].names, vec!["B"]);
    }
}
