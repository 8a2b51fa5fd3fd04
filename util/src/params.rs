//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::{fs::read_to_string, path::Path};
use thiserror::Error;
use toml;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("The software root environment variable (NAV_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot load the parmeter file: {0}")]
    FileLoadError(std::io::Error),

    #[error("Cannot read the parameter file: {0}")]
    DeserialiseError(toml::de::Error),

    #[error("Parameter `{0}` has an invalid value")]
    InvalidParam(&'static str),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file
///
/// The file path is relative to the "$NAV_SW_ROOT/params" directory
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    // Get the params dir
    let mut path = crate::host::get_nav_sw_root()
        .map_err(|_| LoadError::SwRootNotSet)?;
    path.push("params");
    path.push(param_file_path);

    load_path(path)
}

/// Load a parameter file from an explicit path.
pub fn load_path<P, Q>(path: Q) -> Result<P, LoadError>
where
    P: DeserializeOwned,
    Q: AsRef<Path>
{
    // Load the file into a string
    let params_str = match read_to_string(path) {
        Ok(s) => s,
        Err(e) => return Err(LoadError::FileLoadError(e))
    };

    load_str(params_str.as_str())
}

/// Parse parameters from a TOML string.
pub fn load_str<P>(params_str: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned
{
    toml::from_str(params_str).map_err(LoadError::DeserialiseError)
}

/// Check that a parameter is finite and strictly positive.
pub fn require_positive(value: f64, name: &'static str) -> Result<(), LoadError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    }
    else {
        Err(LoadError::InvalidParam(name))
    }
}

/// Check that a parameter is finite and not negative.
pub fn require_non_negative(value: f64, name: &'static str) -> Result<(), LoadError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    }
    else {
        Err(LoadError::InvalidParam(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Dummy {
        gain: f64,
        name: String,
    }

    #[test]
    fn test_load_str() {
        let p: Dummy = load_str("gain = 1.5\nname = \"map\"\n").unwrap();
        assert_eq!(p.gain, 1.5);
        assert_eq!(p.name, "map");
    }

    #[test]
    fn test_missing_field_is_error() {
        let r: Result<Dummy, _> = load_str("gain = 1.5\n");
        assert!(matches!(r, Err(LoadError::DeserialiseError(_))));
    }

    #[test]
    fn test_require_positive() {
        assert!(require_positive(1.0, "a").is_ok());
        assert!(matches!(require_positive(0.0, "a"), Err(LoadError::InvalidParam("a"))));
        assert!(require_positive(f64::INFINITY, "a").is_err());
        assert!(require_non_negative(0.0, "b").is_ok());
        assert!(require_non_negative(-0.1, "b").is_err());
    }
}
