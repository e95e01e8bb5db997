pub mod config;
pub mod matrix;
