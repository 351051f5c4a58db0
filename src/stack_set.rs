//! Stack set provisioning for the onboarding role.
//!
//! The cross-account role Dome9 assumes is deployed through a CloudFormation
//! stack set owned by the master account, with one stack instance per
//! onboarded (account, region) pair. The stack set itself is a singleton with
//! a fixed name; it may pre-exist from an earlier invocation, and only its
//! existence matters. Stack instances are the idempotency boundary: creating
//! one conflicts if an instance for the same (account, region) already exists.

use serde_plain::forward_display_to_serde;
use tracing::{info, warn};

use crate::{
    error::OnboardError,
    event::OnboardingRequest,
    identity::DerivedIdentity,
    operation::wait_for_operation,
    status::StackSetOperationStatus,
};

/// The fixed name of the singleton onboarding stack set.
pub const STACK_SET_NAME: &str = "Dome9AutomaticOnboardingStackSet";

/// The Control Tower execution role assumed in the target account.
pub const EXECUTION_ROLE_NAME: &str = "AWSControlTowerExecution";

/// The stack set administration role in the master account.
pub const ADMINISTRATION_ROLE: &str = "service-role/AWSControlTowerStackSetRole";

/// The AWS account Dome9 assumes the onboarding role from.
pub const DOME9_AWS_ACCOUNT_ID: &str = "634729597623";

pub(crate) const PARAM_EXTERNAL_ID: &str = "Externalid";
pub(crate) const PARAM_ROLE_NAME: &str = "AccountRoleName";
pub(crate) const PARAM_DOME9_ACCOUNT_ID: &str = "Dome9AwsAccountId";

const STACK_SET_DESCRIPTION: &str = "Dome9 auto onboarding stack set";

/// The packaged template for the cross-account role.
///
/// Parameterized by `Externalid`, `AccountRoleName` and `Dome9AwsAccountId`;
/// real values are supplied as per-instance overrides, the stack set itself
/// carries placeholders.
const ONBOARDING_TEMPLATE: &str = include_str!("../templates/onboarding_role.yaml");

/// An input parameter for a stack set or stack instance.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Parameter {
    /// The key associated with the parameter.
    pub key: String,

    /// The value associated with the parameter.
    pub value: String,
}

impl Parameter {
    pub(crate) fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    fn into_sdk(self) -> aws_sdk_cloudformation::types::Parameter {
        aws_sdk_cloudformation::types::Parameter::builder()
            .parameter_key(self.key)
            .parameter_value(self.value)
            .build()
    }
}

/// Capabilities that must be explicitly acknowledged because the template
/// creates IAM resources.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum Capability {
    /// Acknowledge IAM resources (*without* custom names only).
    #[serde(rename = "CAPABILITY_IAM")]
    Iam,

    /// Acknowledge IAM resources (with or without custom names).
    #[serde(rename = "CAPABILITY_NAMED_IAM")]
    NamedIam,

    /// Acknowledge macro expansion.
    #[serde(rename = "CAPABILITY_AUTO_EXPAND")]
    AutoExpand,
}

forward_display_to_serde!(Capability);

/// The input for [`StackSetOps::create_stack_set`].
#[derive(Clone, Debug)]
pub struct CreateStackSetInput {
    /// The name of the stack set; must be unique in the master account.
    pub stack_set_name: String,

    /// A user-defined description for the stack set.
    pub description: Option<String>,

    /// The template body deployed to each stack instance.
    pub template_body: String,

    /// Default parameter values (placeholders; real values are supplied as
    /// per-instance overrides).
    pub parameters: Vec<Parameter>,

    /// Capabilities to explicitly acknowledge.
    pub capabilities: Vec<Capability>,

    /// The ARN of the administration role used to perform stack set
    /// operations from the master account.
    pub administration_role_arn: Option<String>,

    /// The name of the execution role assumed in target accounts.
    pub execution_role_name: Option<String>,
}

/// The input for [`StackSetOps::create_stack_instances`].
#[derive(Clone, Debug)]
pub struct CreateStackInstancesInput {
    pub stack_set_name: String,

    /// The target account to instantiate the stack set into.
    pub account_id: String,

    /// The target region to instantiate the stack set into.
    pub region: String,

    /// Per-instance parameter overrides.
    pub parameter_overrides: Vec<Parameter>,
}

/// The input for [`StackSetOps::delete_stack_instances`].
#[derive(Clone, Debug)]
pub struct DeleteStackInstancesInput {
    pub stack_set_name: String,
    pub account_id: String,
    pub region: String,

    /// Whether to keep the deployed stacks in the target account when the
    /// instance binding is removed.
    pub retain_stacks: bool,
}

/// The stack set operations the workflow depends on.
///
/// This is the seam between the workflow and the CloudFormation control
/// plane; the workflow only relies on stack set name uniqueness, per-instance
/// idempotency, and async operation ids with a polled status.
#[allow(async_fn_in_trait)]
pub trait StackSetOps {
    /// Create a stack set.
    ///
    /// # Errors
    ///
    /// Returns [`OnboardError::StackSetConflict`] if a stack set of that name
    /// already exists, and [`OnboardError::CloudFormationApi`] for any other
    /// API failure.
    async fn create_stack_set(&self, input: CreateStackSetInput) -> Result<(), OnboardError>;

    /// Create a stack instance, returning the id of the resulting operation.
    async fn create_stack_instances(
        &self,
        input: CreateStackInstancesInput,
    ) -> Result<String, OnboardError>;

    /// Delete a stack instance, returning the id of the resulting operation.
    async fn delete_stack_instances(
        &self,
        input: DeleteStackInstancesInput,
    ) -> Result<String, OnboardError>;

    /// Fetch the current status of a stack set operation.
    async fn describe_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<StackSetOperationStatus, OnboardError>;

    /// Delete a stack set.
    ///
    /// The stack set must have no remaining stack instances. The onboarding
    /// workflow never calls this; it is exposed for operator-driven teardown.
    async fn delete_stack_set(&self, stack_set_name: &str) -> Result<(), OnboardError>;
}

impl StackSetOps for aws_sdk_cloudformation::Client {
    async fn create_stack_set(&self, input: CreateStackSetInput) -> Result<(), OnboardError> {
        use aws_sdk_cloudformation::{
            error::DisplayErrorContext, operation::create_stack_set::CreateStackSetError,
        };

        let stack_set_name = input.stack_set_name;
        let mut request = self
            .create_stack_set()
            .stack_set_name(stack_set_name.clone())
            .template_body(input.template_body);
        if let Some(description) = input.description {
            request = request.description(description);
        }
        for parameter in input.parameters {
            request = request.parameters(parameter.into_sdk());
        }
        for capability in input.capabilities {
            request = request.capabilities(aws_sdk_cloudformation::types::Capability::from(
                capability.to_string().as_str(),
            ));
        }
        if let Some(administration_role_arn) = input.administration_role_arn {
            request = request.administration_role_arn(administration_role_arn);
        }
        if let Some(execution_role_name) = input.execution_role_name {
            request = request.execution_role_name(execution_role_name);
        }

        request.send().await.map_err(|error| {
            // Prefer the typed error; fall back to a substring heuristic for
            // client versions whose conflict surfaces as an unmodelled error.
            let conflict = error
                .as_service_error()
                .is_some_and(CreateStackSetError::is_name_already_exists_exception)
                || is_already_exists(&DisplayErrorContext(&error).to_string());
            if conflict {
                OnboardError::StackSetConflict {
                    stack_set_name: stack_set_name.clone(),
                }
            } else {
                OnboardError::cloudformation_api(error)
            }
        })?;
        Ok(())
    }

    async fn create_stack_instances(
        &self,
        input: CreateStackInstancesInput,
    ) -> Result<String, OnboardError> {
        let output = self
            .create_stack_instances()
            .stack_set_name(input.stack_set_name)
            .accounts(input.account_id)
            .regions(input.region)
            .set_parameter_overrides(Some(
                input
                    .parameter_overrides
                    .into_iter()
                    .map(Parameter::into_sdk)
                    .collect(),
            ))
            .operation_preferences(operation_preferences())
            .send()
            .await
            .map_err(OnboardError::cloudformation_api)?;

        Ok(output
            .operation_id()
            .expect("CreateStackInstancesOutput without operation_id")
            .to_string())
    }

    async fn delete_stack_instances(
        &self,
        input: DeleteStackInstancesInput,
    ) -> Result<String, OnboardError> {
        let output = self
            .delete_stack_instances()
            .stack_set_name(input.stack_set_name)
            .accounts(input.account_id)
            .regions(input.region)
            .retain_stacks(input.retain_stacks)
            .send()
            .await
            .map_err(OnboardError::cloudformation_api)?;

        Ok(output
            .operation_id()
            .expect("DeleteStackInstancesOutput without operation_id")
            .to_string())
    }

    async fn describe_operation(
        &self,
        stack_set_name: &str,
        operation_id: &str,
    ) -> Result<StackSetOperationStatus, OnboardError> {
        let output = self
            .describe_stack_set_operation()
            .stack_set_name(stack_set_name)
            .operation_id(operation_id)
            .send()
            .await
            .map_err(OnboardError::cloudformation_api)?;

        let status = output
            .stack_set_operation()
            .and_then(|operation| operation.status())
            .expect("DescribeStackSetOperationOutput without status");
        status.as_str().parse().map_err(|_| {
            OnboardError::cloudformation_api(format!(
                "unexpected stack set operation status: {}",
                status.as_str()
            ))
        })
    }

    async fn delete_stack_set(&self, stack_set_name: &str) -> Result<(), OnboardError> {
        self.delete_stack_set()
            .stack_set_name(stack_set_name)
            .send()
            .await
            .map_err(OnboardError::cloudformation_api)?;
        Ok(())
    }
}

/// Operation preferences for instance creation and deletion.
///
/// Zero failure tolerance; the concurrency cap is irrelevant for
/// single-account calls but bounds the blast radius if a call is ever batched.
fn operation_preferences() -> aws_sdk_cloudformation::types::StackSetOperationPreferences {
    aws_sdk_cloudformation::types::StackSetOperationPreferences::builder()
        .failure_tolerance_count(0)
        .max_concurrent_count(3)
        .build()
}

/// Loose conflict classification on the error text.
///
/// Last resort only: the typed `NameAlreadyExistsException` check runs first.
pub(crate) fn is_already_exists(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("already") && message.contains("exists")
}

/// Build the creation input for the singleton onboarding stack set.
#[must_use]
pub fn stack_set_input(master_account_id: &str) -> CreateStackSetInput {
    CreateStackSetInput {
        stack_set_name: STACK_SET_NAME.to_string(),
        description: Some(STACK_SET_DESCRIPTION.to_string()),
        template_body: ONBOARDING_TEMPLATE.to_string(),
        parameters: vec![
            Parameter::new(PARAM_EXTERNAL_ID, "Placeholder"),
            Parameter::new(PARAM_ROLE_NAME, "Placeholder"),
            Parameter::new(PARAM_DOME9_ACCOUNT_ID, DOME9_AWS_ACCOUNT_ID),
        ],
        capabilities: vec![Capability::Iam, Capability::NamedIam, Capability::AutoExpand],
        administration_role_arn: Some(format!(
            "arn:aws:iam::{master_account_id}:role/{ADMINISTRATION_ROLE}"
        )),
        execution_role_name: Some(EXECUTION_ROLE_NAME.to_string()),
    }
}

/// Ensure the onboarding stack set exists.
///
/// Creates the stack set; if one of that name already exists it is treated as
/// reusable infrastructure, and any stale stack instance bound to the target
/// (account, region) is deleted instead so a fresh instance can be created.
/// Any other creation failure is fatal.
///
/// # Errors
///
/// Returns [`OnboardError::CloudFormationApi`] if stack set creation fails
/// for a reason other than a name conflict.
pub async fn ensure_stack_set<Ops: StackSetOps>(
    ops: &Ops,
    master_account_id: &str,
    request: &OnboardingRequest,
) -> Result<(), OnboardError> {
    info!(
        stack_set = STACK_SET_NAME,
        master_account_id, "creating stack set"
    );
    match ops.create_stack_set(stack_set_input(master_account_id)).await {
        Ok(()) => Ok(()),
        Err(OnboardError::StackSetConflict { stack_set_name }) => {
            info!(
                stack_set = %stack_set_name,
                "stack set already exists; clearing any stale instance for the target account"
            );
            delete_stack_instance(ops, &request.account_id, &request.region).await;
            Ok(())
        }
        Err(error) => Err(error),
    }
}

/// Instantiate the onboarding stack set into the target account and region.
///
/// Returns the id of the resulting async operation; the caller must poll it
/// to completion.
///
/// # Errors
///
/// Returns [`OnboardError::CloudFormationApi`] if the API call fails.
pub async fn create_stack_instance<Ops: StackSetOps>(
    ops: &Ops,
    request: &OnboardingRequest,
    identity: &DerivedIdentity,
) -> Result<String, OnboardError> {
    info!(
        stack_set = STACK_SET_NAME,
        account_id = %request.account_id,
        region = %request.region,
        role_name = %identity.role_name,
        "creating stack instance"
    );
    ops.create_stack_instances(CreateStackInstancesInput {
        stack_set_name: STACK_SET_NAME.to_string(),
        account_id: request.account_id.clone(),
        region: request.region.clone(),
        parameter_overrides: vec![
            Parameter::new(PARAM_ROLE_NAME, identity.role_name.clone()),
            Parameter::new(PARAM_EXTERNAL_ID, identity.external_id.clone()),
            Parameter::new(PARAM_DOME9_ACCOUNT_ID, DOME9_AWS_ACCOUNT_ID),
        ],
    })
    .await
}

/// Delete the stack instance for (account, region), best-effort.
///
/// Deletion is idempotent from the caller's perspective: an API failure
/// (typically "instance does not exist") is logged and swallowed. On success
/// the delete operation is polled to completion, and a polling failure is
/// also only a warning, since cleanup must not introduce a new failure path.
pub async fn delete_stack_instance<Ops: StackSetOps>(ops: &Ops, account_id: &str, region: &str) {
    info!(
        stack_set = STACK_SET_NAME,
        account_id, region, "deleting stack instance"
    );
    let input = DeleteStackInstancesInput {
        stack_set_name: STACK_SET_NAME.to_string(),
        account_id: account_id.to_string(),
        region: region.to_string(),
        retain_stacks: true,
    };
    match ops.delete_stack_instances(input).await {
        Ok(operation_id) => {
            if let Err(error) =
                wait_for_operation(ops, STACK_SET_NAME, &operation_id, "delete stack instance")
                    .await
            {
                warn!(
                    error = %error,
                    account_id, region, "stack instance deletion did not settle cleanly"
                );
            }
        }
        Err(error) => {
            warn!(
                error = %error,
                account_id, region, "failed to delete stack instance"
            );
        }
    }
}
