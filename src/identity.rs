//! Deterministic naming for the cross-account role, plus its trust secret.

use uuid::Uuid;

use crate::{error::OnboardError, event::OnboardingRequest};

/// The identity material derived once at the start of an invocation.
///
/// The role name and ARN are pure functions of the master and target account
/// ids; the external id is freshly generated per invocation and shared only
/// with Dome9 via the registration call (it is also embedded in the trust
/// policy deployed into the target account).
#[derive(Clone, Debug)]
pub struct DerivedIdentity {
    /// The account running this handler (the Control Tower management
    /// account).
    pub master_account_id: String,

    /// The name of the role created in the target account.
    pub role_name: String,

    /// The ARN of the role created in the target account.
    pub role_arn: String,

    /// The trust secret Dome9 must present when assuming the role.
    ///
    /// Not cryptographically strong (8 hex chars), which is acceptable because
    /// it only supplements a freshly created, narrowly scoped trust role.
    pub external_id: String,
}

impl DerivedIdentity {
    /// Derive the role identity for `request`.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::Validation`] if the target account id is not a
    /// purely numeric string. This is checked before any remote call is made.
    pub fn derive(
        master_account_id: impl Into<String>,
        request: &OnboardingRequest,
    ) -> Result<Self, OnboardError> {
        if request.account_id.is_empty()
            || !request.account_id.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(OnboardError::Validation(request.account_id.clone()));
        }

        let master_account_id = master_account_id.into();
        let role_name = format!("Dome9Role-{}-{}", master_account_id, request.account_id);
        let role_arn = format!(
            "arn:aws:iam::{}:role/{}",
            request.account_id, role_name
        );
        Ok(Self {
            master_account_id,
            role_name,
            role_arn,
            external_id: generate_external_id(),
        })
    }
}

/// Generate the external id embedded in the new account's trust role.
fn generate_external_id() -> String {
    Uuid::new_v4().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn request(account_id: &str) -> OnboardingRequest {
        OnboardingRequest {
            region: "eu-west-1".to_string(),
            account_id: account_id.to_string(),
            account_name: "workload-a".to_string(),
        }
    }

    #[test]
    fn derives_deterministic_names() {
        let identity = DerivedIdentity::derive("111111111111", &request("123456789012")).unwrap();
        assert_eq!(identity.role_name, "Dome9Role-111111111111-123456789012");
        assert_eq!(
            identity.role_arn,
            "arn:aws:iam::123456789012:role/Dome9Role-111111111111-123456789012"
        );
    }

    #[test]
    fn external_ids_are_fresh_per_derivation() {
        let request = request("123456789012");
        let a = DerivedIdentity::derive("111111111111", &request).unwrap();
        let b = DerivedIdentity::derive("111111111111", &request).unwrap();

        // names are deterministic, the trust secret is not
        assert_eq!(a.role_name, b.role_name);
        assert_eq!(a.role_arn, b.role_arn);
        assert_ne!(a.external_id, b.external_id);
        assert_eq!(a.external_id.len(), 8);
    }

    #[test]
    fn rejects_non_numeric_account_ids() {
        for account_id in ["", "12345678901a", "not-an-account", "123 456"] {
            assert_matches!(
                DerivedIdentity::derive("111111111111", &request(account_id)),
                Err(OnboardError::Validation(id)) if id == account_id
            );
        }
    }
}
