//! The top-level onboarding workflow.

use tracing::{error, info};

use crate::{
    error::OnboardError,
    event::OnboardingRequest,
    identity::DerivedIdentity,
    operation::wait_for_operation,
    registrar::{CloudAccount, Registrar},
    stack_set::{
        create_stack_instance, delete_stack_instance, ensure_stack_set, StackSetOps,
        STACK_SET_NAME,
    },
};

/// Run the whole onboarding flow for one vended account.
///
/// 1. Ensure the singleton stack set exists (a pre-existing one is reused,
///    after clearing any stale instance for the target account).
/// 2. Instantiate it into the target (account, region) and poll the operation
///    to completion. A failure in this phase propagates as-is; there is no
///    compensating action for it.
/// 3. Register the account with Dome9. On failure the just-created stack
///    instance is rolled back (best-effort) and the registration error is
///    re-raised so the invoking platform observes the failure.
///
/// The stack set itself is left in place on failure, ready for reuse by a
/// retried event.
///
/// # Errors
///
/// Any error from the phases above; see [`OnboardError`] for the taxonomy.
pub async fn run_onboarding<Ops: StackSetOps, R: Registrar>(
    ops: &Ops,
    registrar: &R,
    request: &OnboardingRequest,
    identity: &DerivedIdentity,
) -> Result<serde_json::Value, OnboardError> {
    ensure_stack_set(ops, &identity.master_account_id, request).await?;

    let operation_id = create_stack_instance(ops, request, identity).await?;
    wait_for_operation(ops, STACK_SET_NAME, &operation_id, "create stack instance").await?;

    let account = CloudAccount::role_based(
        request.account_name.clone(),
        identity.role_arn.clone(),
        identity.external_id.clone(),
    );
    match registrar.create_cloud_account(&account).await {
        Ok(response) => {
            info!(
                account_id = %request.account_id,
                account_name = %request.account_name,
                "account onboarded to Dome9"
            );
            Ok(response)
        }
        Err(error) => {
            error!(
                error = %error,
                account_id = %request.account_id,
                "registration failed; rolling back the stack instance"
            );
            delete_stack_instance(ops, &request.account_id, &request.region).await;
            Err(error)
        }
    }
}
