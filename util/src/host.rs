//! Host platform utility functions

use std::path::PathBuf;

/// Name of the environment variable pointing at the root of the software tree.
///
/// Parameter files are loaded from `$NAV_SW_ROOT/params` and sessions are
/// created under `$NAV_SW_ROOT/sessions`.
pub const SW_ROOT_ENV_VAR: &str = "NAV_SW_ROOT";

/// Get the root directory of the navigation software.
pub fn get_nav_sw_root() -> Result<PathBuf, std::env::VarError> {
    std::env::var(SW_ROOT_ENV_VAR).map(PathBuf::from)
}

/// Get the name of the machine we're running on, if it can be determined.
pub fn get_hostname() -> Option<String> {
    std::env::var("HOSTNAME")
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
