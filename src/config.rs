//! Environment configuration for the handler.

use std::env;

use crate::{error::OnboardError, registrar::Dome9Region};

/// Environment variable naming the Secrets Manager secret that holds the
/// Dome9 API credentials.
pub const API_SECRET_NAME_VAR: &str = "DOME9_API_SECRET_NAME";

/// Environment variable selecting the Dome9 data-center region.
///
/// Optional; defaults to the primary (US) region. An unrecognized value is a
/// configuration error, surfaced before any remote call.
pub const API_REGION_VAR: &str = "DOME9_API_REGION";

/// Resolved environment configuration.
#[derive(Clone, Debug)]
pub struct Config {
    /// The name of the secret holding the Dome9 API credentials.
    pub api_secret_name: String,

    /// The Dome9 region whose API endpoint is used.
    pub api_region: Dome9Region,
}

impl Config {
    /// Resolve the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Config`] if the secret name is missing or the
    /// region selector is unrecognized.
    pub fn from_env() -> Result<Self, OnboardError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, OnboardError> {
        let api_secret_name = lookup(API_SECRET_NAME_VAR)
            .ok_or_else(|| OnboardError::Config(format!("{API_SECRET_NAME_VAR} is not set")))?;

        let api_region = match lookup(API_REGION_VAR) {
            None => Dome9Region::default(),
            Some(value) => value.parse().map_err(|_| {
                OnboardError::Config(format!(
                    "unrecognized {API_REGION_VAR} value {value:?}"
                ))
            })?,
        };

        Ok(Self {
            api_secret_name,
            api_region,
        })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_to_the_primary_region() {
        let config = Config::from_lookup(|name| {
            (name == API_SECRET_NAME_VAR).then(|| "dome9-api-keys".to_string())
        })
        .unwrap();
        assert_eq!(config.api_secret_name, "dome9-api-keys");
        assert_eq!(config.api_region, Dome9Region::Us);
    }

    #[test]
    fn reads_the_region_selector() {
        let config = Config::from_lookup(|name| match name {
            API_SECRET_NAME_VAR => Some("dome9-api-keys".to_string()),
            API_REGION_VAR => Some("ap2".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.api_region, Dome9Region::Ap2);
    }

    #[test]
    fn missing_secret_name_is_an_error() {
        assert_matches!(
            Config::from_lookup(|_| None),
            Err(OnboardError::Config(message)) if message.contains(API_SECRET_NAME_VAR)
        );
    }

    #[test]
    fn unknown_region_selector_is_an_error() {
        let result = Config::from_lookup(|name| match name {
            API_SECRET_NAME_VAR => Some("dome9-api-keys".to_string()),
            API_REGION_VAR => Some("moonbase".to_string()),
            _ => None,
        });
        assert_matches!(
            result,
            Err(OnboardError::Config(message)) if message.contains("moonbase")
        );
    }
}
