//! The error taxonomy for the onboarding workflow.

use crate::status::StackSetOperationStatus;

/// Convenience alias for boxed source errors from collaborating services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while onboarding a newly vended account.
///
/// Variants are deliberately coarse: each one corresponds to a phase of the
/// workflow that callers may want to distinguish (validation, stack set
/// conflict, operation outcome, registration), while the underlying service
/// errors are carried as boxed sources.
#[derive(Debug, thiserror::Error)]
pub enum OnboardError {
    /// The target account id was not a purely numeric string.
    #[error("invalid target account id {0:?}: expected a purely numeric string")]
    Validation(String),

    /// The environment configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),

    /// A CloudFormation API call failed.
    ///
    /// This is likely to be due to invalid input parameters or missing
    /// CloudFormation permissions. The inner error should have a descriptive
    /// message.
    #[error("CloudFormation API error: {0}")]
    CloudFormationApi(#[source] BoxError),

    /// A stack set with the requested name already exists.
    ///
    /// This is a recoverable condition for the onboarding flow: the existing
    /// stack set is reusable infrastructure and only a stale stack instance
    /// for the target account needs clearing.
    #[error("stack set {stack_set_name} already exists")]
    StackSetConflict {
        /// The name of the conflicting stack set.
        stack_set_name: String,
    },

    /// A stack set operation settled in a failed status.
    #[error(
        "operation {operation_id} on stack set {stack_set_name} settled in terminal status {status}"
    )]
    OperationFailed {
        /// The name of the stack set the operation ran against.
        stack_set_name: String,

        /// The id of the failed operation.
        operation_id: String,

        /// The terminal status the operation settled in.
        status: StackSetOperationStatus,
    },

    /// A stack set operation did not settle within the polling budget.
    #[error(
        "operation {operation_id} on stack set {stack_set_name} did not settle within {attempts} polls"
    )]
    OperationTimedOut {
        /// The name of the stack set the operation ran against.
        stack_set_name: String,

        /// The id of the operation that was still in progress.
        operation_id: String,

        /// The number of polls performed before giving up.
        attempts: u32,
    },

    /// The Dome9 API credentials could not be resolved from Secrets Manager.
    #[error("failed to resolve Dome9 API credentials: {0}")]
    SecretResolution(#[source] BoxError),

    /// The Dome9 registration call failed.
    #[error("Dome9 registration failed: {0}")]
    Registration(#[source] BoxError),
}

impl OnboardError {
    pub(crate) fn cloudformation_api(error: impl Into<BoxError>) -> Self {
        Self::CloudFormationApi(error.into())
    }

    pub(crate) fn secret_resolution(error: impl Into<BoxError>) -> Self {
        Self::SecretResolution(error.into())
    }

    pub(crate) fn registration(error: impl Into<BoxError>) -> Self {
        Self::Registration(error.into())
    }
}
