use envmatrix_core::paths;
use std::path::{Path, PathBuf};

/// Resolve which config file to load.
///
/// Priority:
/// 1. `--config` flag / `ENVMATRIX_CONFIG` env var (passed in as `explicit`)
/// 2. Walk upward from `cwd` looking for `envmatrix.yaml`
/// 3. None: use the built-in defaults
pub fn resolve_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    paths::find_config(&cwd)
}
