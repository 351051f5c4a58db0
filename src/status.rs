//! Types and values representing stack set operation statuses.

use std::str::FromStr;

use serde_plain::forward_display_to_serde;

/// An error marker returned when trying to parse an invalid status.
#[derive(Debug, Eq, PartialEq)]
pub struct InvalidStatus;

/// Possible stack set operation statuses.
///
/// Stack set operations (creating or deleting stack instances) are
/// asynchronous: the API returns an operation id and the status is polled via
/// `DescribeStackSetOperation` until it settles.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackSetOperationStatus {
    Queued,
    Running,
    Stopping,
    Succeeded,
    Failed,
    Stopped,
}

impl StackSetOperationStatus {
    /// Indicates whether or not a status is terminal.
    ///
    /// A terminal status is one that won't change again for the operation.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        match self {
            Self::Queued | Self::Running | Self::Stopping => false,
            Self::Succeeded | Self::Failed | Self::Stopped => true,
        }
    }

    /// Indicates whether the operation settled successfully.
    #[must_use]
    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

forward_display_to_serde!(StackSetOperationStatus);

impl FromStr for StackSetOperationStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_plain::from_str(s).map_err(|_| InvalidStatus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stack_set_operation_status() {
        // there's no point testing every variant, but we should check one to be sure.
        assert_eq!(
            format!("{}", StackSetOperationStatus::Succeeded).as_str(),
            "SUCCEEDED"
        );
        assert_eq!("SUCCEEDED".parse(), Ok(StackSetOperationStatus::Succeeded));
        assert_eq!(
            "oh no".parse::<StackSetOperationStatus>(),
            Err(InvalidStatus)
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(StackSetOperationStatus::Succeeded.is_terminal());
        assert!(StackSetOperationStatus::Failed.is_terminal());
        assert!(StackSetOperationStatus::Stopped.is_terminal());
        assert!(!StackSetOperationStatus::Queued.is_terminal());
        assert!(!StackSetOperationStatus::Running.is_terminal());
        assert!(!StackSetOperationStatus::Stopping.is_terminal());
    }
}
