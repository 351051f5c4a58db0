//! The Control Tower account-factory event envelope.
//!
//! The handler is triggered by the `CreateManagedAccount` lifecycle event
//! emitted when Control Tower finishes vending a new managed account. Only the
//! fields the workflow depends on are modelled; a missing field is a
//! deserialization error that fails the invocation before any remote call.

use serde::Deserialize;

/// The inbound account-factory lifecycle event.
#[derive(Clone, Debug, Deserialize)]
pub struct AccountFactoryEvent {
    pub detail: EventDetail,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    /// The region the lifecycle event was recorded in, and the region the
    /// stack instance is created in.
    pub aws_region: String,

    pub service_event_details: ServiceEventDetails,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceEventDetails {
    pub create_managed_account_status: CreateManagedAccountStatus,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateManagedAccountStatus {
    /// The reported provisioning state, e.g. `SUCCEEDED`.
    pub state: String,

    pub account: ManagedAccount,
}

/// The newly vended account, as reported by the account factory.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedAccount {
    pub account_id: String,
    pub account_name: String,
}

/// The distilled onboarding request for one invocation.
///
/// Immutable for the lifetime of the invocation; everything else the workflow
/// needs is derived from these three fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OnboardingRequest {
    /// The region to create the stack instance in.
    pub region: String,

    /// The id of the newly vended account.
    pub account_id: String,

    /// The human-readable name of the newly vended account.
    pub account_name: String,
}

impl AccountFactoryEvent {
    /// The provisioning state reported by the account factory.
    #[must_use]
    pub fn state(&self) -> &str {
        &self
            .detail
            .service_event_details
            .create_managed_account_status
            .state
    }

    /// Distill the envelope into an [`OnboardingRequest`].
    #[must_use]
    pub fn into_request(self) -> OnboardingRequest {
        let status = self.detail.service_event_details.create_managed_account_status;
        OnboardingRequest {
            region: self.detail.aws_region,
            account_id: status.account.account_id,
            account_name: status.account.account_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EVENT: &str = r#"{
        "version": "0",
        "detail-type": "AWS Service Event via CloudTrail",
        "source": "aws.controltower",
        "detail": {
            "eventName": "CreateManagedAccount",
            "awsRegion": "eu-west-1",
            "serviceEventDetails": {
                "createManagedAccountStatus": {
                    "state": "SUCCEEDED",
                    "account": {
                        "accountId": "123456789012",
                        "accountName": "workload-a"
                    },
                    "organizationalUnit": {
                        "organizationalUnitName": "Sandbox"
                    }
                }
            }
        }
    }"#;

    #[test]
    fn parses_account_factory_event() {
        let event: AccountFactoryEvent = serde_json::from_str(EVENT).unwrap();
        assert_eq!(event.state(), "SUCCEEDED");

        let request = event.into_request();
        assert_eq!(
            request,
            OnboardingRequest {
                region: "eu-west-1".to_string(),
                account_id: "123456789012".to_string(),
                account_name: "workload-a".to_string(),
            }
        );
    }

    #[test]
    fn missing_account_id_is_an_error() {
        let event = serde_json::json!({
            "detail": {
                "awsRegion": "eu-west-1",
                "serviceEventDetails": {
                    "createManagedAccountStatus": {
                        "state": "SUCCEEDED",
                        "account": { "accountName": "workload-a" }
                    }
                }
            }
        });
        assert!(serde_json::from_value::<AccountFactoryEvent>(event).is_err());
    }
}
