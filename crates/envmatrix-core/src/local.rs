//! Local-environment reader.

use crate::table::VariableTable;
use std::collections::HashMap;

pub const LOCAL_COLUMN: &str = "local";

/// Source of environment values. The process environment in production, a
/// plain map in tests.
pub trait EnvSource {
    fn get(&self, name: &str) -> Option<String>;
}

/// Reads the live process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn get(&self, name: &str) -> Option<String> {
        // Non-UTF-8 values are reported as present, lossily decoded.
        std::env::var_os(name).map(|v| v.to_string_lossy().into_owned())
    }
}

impl EnvSource for HashMap<String, String> {
    fn get(&self, name: &str) -> Option<String> {
        HashMap::get(self, name).cloned()
    }
}

/// One `local` column holding each required name's value, or no value when
/// the variable is unset. Never fails.
pub fn read_local(env: &dyn EnvSource, required: &[String]) -> VariableTable {
    let mut table = VariableTable::single(LOCAL_COLUMN);
    for name in required {
        table.insert(name.clone(), vec![env.get(name)]);
    }
    table
}
