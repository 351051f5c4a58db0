//! Polling of asynchronous stack set operations.

use std::time::Duration;

use tracing::{info, warn};

use crate::{error::OnboardError, stack_set::StackSetOps};

/// Maximum number of status polls before giving up on an operation.
pub const WAIT_RETRIES: u32 = 12;

/// Fixed sleep between non-terminal polls.
///
/// Together with [`WAIT_RETRIES`] this bounds the wait at two minutes.
pub const WAIT_INTERVAL: Duration = Duration::from_secs(10);

/// Poll a stack set operation until it reaches a terminal status.
///
/// A transient describe failure (or an unparsable status) is logged and
/// counted as an inconclusive iteration rather than aborting: a control-plane
/// read hiccup says nothing about an operation that may still be in progress.
///
/// # Errors
///
/// - [`OnboardError::OperationFailed`] if the operation settles in `FAILED`
///   or `STOPPED`.
/// - [`OnboardError::OperationTimedOut`] if the polling budget is exhausted
///   without reaching a terminal status.
pub async fn wait_for_operation<Ops: StackSetOps>(
    ops: &Ops,
    stack_set_name: &str,
    operation_id: &str,
    label: &str,
) -> Result<(), OnboardError> {
    for attempt in 1..=WAIT_RETRIES {
        match ops.describe_operation(stack_set_name, operation_id).await {
            Ok(status) if status.is_success() => {
                info!(operation_id, label, attempt, "operation succeeded");
                return Ok(());
            }
            Ok(status) if status.is_terminal() => {
                return Err(OnboardError::OperationFailed {
                    stack_set_name: stack_set_name.to_string(),
                    operation_id: operation_id.to_string(),
                    status,
                });
            }
            Ok(status) => {
                info!(
                    operation_id,
                    label,
                    attempt,
                    status = %status,
                    "operation still in progress"
                );
            }
            Err(error) => {
                warn!(
                    operation_id,
                    label,
                    attempt,
                    error = %error,
                    "failed to fetch operation status; treating as inconclusive"
                );
            }
        }

        if attempt < WAIT_RETRIES {
            tokio::time::sleep(WAIT_INTERVAL).await;
        }
    }

    Err(OnboardError::OperationTimedOut {
        stack_set_name: stack_set_name.to_string(),
        operation_id: operation_id.to_string(),
        attempts: WAIT_RETRIES,
    })
}
