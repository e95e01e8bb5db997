pub mod circleci;
pub mod config;
pub mod error;
pub mod heroku;
pub mod http;
pub mod local;
pub mod matrix;
pub mod paths;
pub mod table;

pub use error::{EnvMatrixError, Result};
