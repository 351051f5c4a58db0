//! Registration of the new account with the Dome9 API.

use std::str::FromStr;

use serde::Serialize;
use serde_plain::forward_display_to_serde;
use tracing::info;

use crate::{error::OnboardError, secrets::ApiCredentials};

/// An error marker returned when trying to parse an unknown region selector.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidRegion;

/// Dome9 data-center regions, each with its own API base URL.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dome9Region {
    /// United States (the primary region).
    #[default]
    Us,
    /// Ireland.
    Eu1,
    /// Singapore.
    Ap1,
    /// Sydney.
    Ap2,
}

impl Dome9Region {
    /// The API base URL for this region.
    #[must_use]
    pub fn base_url(self) -> &'static str {
        match self {
            Self::Us => "https://api.dome9.com/v2",
            Self::Eu1 => "https://api.eu1.dome9.com/v2",
            Self::Ap1 => "https://api.ap1.dome9.com/v2",
            Self::Ap2 => "https://api.ap2.dome9.com/v2",
        }
    }
}

forward_display_to_serde!(Dome9Region);

impl FromStr for Dome9Region {
    type Err = InvalidRegion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_plain::from_str(s).map_err(|_| InvalidRegion)
    }
}

/// The request body for creating a protected cloud account.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccount {
    /// The display name of the account in Dome9.
    pub name: String,

    pub credentials: CloudAccountCredentials,
}

/// The trust material Dome9 uses to assume the onboarding role.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccountCredentials {
    /// The ARN of the role to assume.
    pub arn: String,

    /// The external id verified on assume.
    pub secret: String,

    #[serde(rename = "type")]
    credential_type: &'static str,
}

impl CloudAccount {
    /// Build a role-based registration request.
    #[must_use]
    pub fn role_based(
        name: impl Into<String>,
        arn: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            credentials: CloudAccountCredentials {
                arn: arn.into(),
                secret: secret.into(),
                credential_type: "RoleBased",
            },
        }
    }
}

/// The single registration operation the workflow performs against Dome9.
///
/// One shot, fail-fast: there is no retry here, and a failure triggers the
/// caller's compensating rollback.
#[allow(async_fn_in_trait)]
pub trait Registrar {
    /// Register `account` as a protected cloud account.
    ///
    /// Returns the provider's response verbatim; Dome9 is the source of truth
    /// for the registration thereafter.
    async fn create_cloud_account(
        &self,
        account: &CloudAccount,
    ) -> Result<serde_json::Value, OnboardError>;
}

/// A thin Dome9 REST API client bound to one regional base URL.
#[derive(Clone, Debug)]
pub struct Dome9Client {
    http: reqwest::Client,
    base_url: String,
    credentials: ApiCredentials,
}

impl Dome9Client {
    #[must_use]
    pub fn new(region: Dome9Region, credentials: ApiCredentials) -> Self {
        Self::with_base_url(region.base_url().to_string(), credentials)
    }

    pub(crate) fn with_base_url(base_url: String, credentials: ApiCredentials) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            credentials,
        }
    }
}

impl Registrar for Dome9Client {
    async fn create_cloud_account(
        &self,
        account: &CloudAccount,
    ) -> Result<serde_json::Value, OnboardError> {
        info!(
            name = %account.name,
            arn = %account.credentials.arn,
            "registering cloud account with Dome9"
        );
        let response = self
            .http
            .post(format!("{}/CloudAccounts", self.base_url))
            .basic_auth(&self.credentials.access_id, Some(&self.credentials.secret))
            .json(account)
            .send()
            .await
            .map_err(OnboardError::registration)?;

        let status = response.status();
        if !status.is_success() {
            // keep the provider's diagnostic message, it is usually the only
            // clue to why a registration was rejected
            let body = response.text().await.unwrap_or_default();
            return Err(OnboardError::registration(format!(
                "Dome9 returned {status}: {}",
                body.trim()
            )));
        }

        response.json().await.map_err(OnboardError::registration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_base_urls() {
        assert_eq!(Dome9Region::Us.base_url(), "https://api.dome9.com/v2");
        assert_eq!(Dome9Region::Eu1.base_url(), "https://api.eu1.dome9.com/v2");
        assert_eq!(Dome9Region::Ap1.base_url(), "https://api.ap1.dome9.com/v2");
        assert_eq!(Dome9Region::Ap2.base_url(), "https://api.ap2.dome9.com/v2");
    }

    #[test]
    fn region_parsing() {
        assert_eq!("us".parse(), Ok(Dome9Region::Us));
        assert_eq!("eu1".parse(), Ok(Dome9Region::Eu1));
        assert_eq!("antarctica".parse::<Dome9Region>(), Err(InvalidRegion));
    }

    #[tokio::test]
    async fn rejected_registration_keeps_the_response_body() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let body = r#"{"message":"role arn is not assumable"}"#;
            let response = format!(
                "HTTP/1.1 400 Bad Request\r\n\
                 content-type: application/json\r\n\
                 content-length: {}\r\n\
                 connection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });

        let client = Dome9Client::with_base_url(
            format!("http://{addr}"),
            ApiCredentials {
                access_id: "some-access-id".to_string(),
                secret: "some-secret".to_string(),
            },
        );
        let account = CloudAccount::role_based(
            "workload-a",
            "arn:aws:iam::123456789012:role/Dome9Role-111111111111-123456789012",
            "abcd1234",
        );

        let error = client.create_cloud_account(&account).await.unwrap_err();
        let message = error.to_string();
        assert!(message.contains("400"), "message was: {message}");
        assert!(
            message.contains("role arn is not assumable"),
            "message was: {message}"
        );
    }

    #[test]
    fn cloud_account_wire_shape() {
        let account = CloudAccount::role_based(
            "workload-a",
            "arn:aws:iam::123456789012:role/Dome9Role-111111111111-123456789012",
            "abcd1234",
        );
        let body = serde_json::to_value(&account).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "name": "workload-a",
                "credentials": {
                    "arn": "arn:aws:iam::123456789012:role/Dome9Role-111111111111-123456789012",
                    "secret": "abcd1234",
                    "type": "RoleBased"
                }
            })
        );
    }
}
