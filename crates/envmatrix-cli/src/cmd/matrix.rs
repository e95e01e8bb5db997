use crate::output::{print_json, print_matrix, print_missing};
use anyhow::Context;
use envmatrix_core::circleci::CircleCiClient;
use envmatrix_core::config::Config;
use envmatrix_core::heroku::HerokuClient;
use envmatrix_core::http;
use envmatrix_core::local::ProcessEnv;
use envmatrix_core::matrix::{self, MatrixBuilder};

/// Credentials come from the command line or environment, never from the
/// config file.
pub struct Credentials {
    pub heroku_api_key: Option<String>,
    pub circleci_token: Option<String>,
}

pub fn run(
    config: &Config,
    credentials: Credentials,
    missing: bool,
    json: bool,
) -> anyhow::Result<()> {
    let client = http::with_timeout(config.timeout()).context("failed to build HTTP client")?;
    let circleci = CircleCiClient::new(
        client.clone(),
        config.circleci.api_url.clone(),
        credentials.circleci_token,
    );
    let heroku = HerokuClient::new(
        client,
        config.heroku.api_url.clone(),
        credentials.heroku_api_key,
    );

    let matrix = MatrixBuilder::new(&ProcessEnv, &circleci, &heroku).build_for(config);

    if missing {
        let reports = matrix::missing_required(&matrix);
        if json {
            return print_json(&reports);
        }
        print_missing(&reports);
        return Ok(());
    }

    if json {
        return print_json(&matrix);
    }
    print_matrix(&matrix);
    Ok(())
}
