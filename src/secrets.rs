//! Resolution of Dome9 API credentials from AWS Secrets Manager.

use aws_sdk_secretsmanager::primitives::Blob;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::Deserialize;
use tracing::info;

use crate::error::OnboardError;

/// Dome9 API credentials, as stored in Secrets Manager.
///
/// The secret value is a JSON document with `AccessId`/`Secret` keys,
/// regardless of whether it was stored as a string or as (base64-encoded)
/// binary.
#[derive(Clone, Deserialize)]
pub struct ApiCredentials {
    #[serde(rename = "AccessId")]
    pub access_id: String,

    #[serde(rename = "Secret")]
    pub secret: String,
}

// Manual Debug so the secret half never ends up in a log line.
impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("access_id", &self.access_id)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// Fetch and decode the Dome9 API credentials stored under `secret_name`.
///
/// There is no local retry; a Secrets Manager failure fails the invocation.
///
/// # Errors
///
/// Returns [`OnboardError::SecretResolution`] if the secret cannot be fetched
/// or its payload cannot be decoded.
pub async fn resolve_api_credentials(
    client: &aws_sdk_secretsmanager::Client,
    secret_name: &str,
) -> Result<ApiCredentials, OnboardError> {
    info!(secret_name, "resolving Dome9 API credentials");
    let output = client
        .get_secret_value()
        .secret_id(secret_name)
        .send()
        .await
        .map_err(OnboardError::secret_resolution)?;

    parse_secret_payload(output.secret_string(), output.secret_binary())
}

/// Decode whichever payload the secret carries: a UTF-8 JSON string, or
/// base64-encoded JSON binary.
pub(crate) fn parse_secret_payload(
    secret_string: Option<&str>,
    secret_binary: Option<&Blob>,
) -> Result<ApiCredentials, OnboardError> {
    if let Some(secret_string) = secret_string {
        return serde_json::from_str(secret_string).map_err(OnboardError::secret_resolution);
    }
    if let Some(secret_binary) = secret_binary {
        let decoded = BASE64
            .decode(secret_binary.as_ref())
            .map_err(OnboardError::secret_resolution)?;
        return serde_json::from_slice(&decoded).map_err(OnboardError::secret_resolution);
    }
    Err(OnboardError::secret_resolution(
        "secret has neither a string nor a binary payload",
    ))
}
