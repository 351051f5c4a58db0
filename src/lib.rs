#![warn(clippy::pedantic)]

//! Automatic Dome9 onboarding for accounts vended by AWS Control Tower.
//!
//! When the account factory reports that a new managed account finished
//! provisioning, this crate deploys a cross-account trust role into the new
//! account (via a CloudFormation stack set owned by the master account) and
//! registers the account with the Dome9 API as a protected cloud account.
//!
//! The flow is linear and runs once per invocation: derive the role identity,
//! ensure the singleton stack set exists, create a stack instance for the
//! target (account, region), poll the stack set operation until it settles,
//! and register with Dome9 — rolling the stack instance back if registration
//! fails.

mod config;
mod error;
mod event;
mod identity;
mod operation;
mod registrar;
mod secrets;
mod stack_set;
mod status;
mod workflow;

pub use config::{Config, API_REGION_VAR, API_SECRET_NAME_VAR};
pub use error::{BoxError, OnboardError};
pub use event::{
    AccountFactoryEvent, CreateManagedAccountStatus, EventDetail, ManagedAccount,
    OnboardingRequest, ServiceEventDetails,
};
pub use identity::DerivedIdentity;
pub use operation::{wait_for_operation, WAIT_INTERVAL, WAIT_RETRIES};
pub use registrar::{
    CloudAccount, CloudAccountCredentials, Dome9Client, Dome9Region, InvalidRegion, Registrar,
};
pub use secrets::{resolve_api_credentials, ApiCredentials};
pub use stack_set::{
    create_stack_instance, delete_stack_instance, ensure_stack_set, stack_set_input, Capability,
    CreateStackInstancesInput, CreateStackSetInput, DeleteStackInstancesInput, Parameter,
    StackSetOps, ADMINISTRATION_ROLE, DOME9_AWS_ACCOUNT_ID, EXECUTION_ROLE_NAME, STACK_SET_NAME,
};
pub use status::{InvalidStatus, StackSetOperationStatus};
pub use workflow::run_onboarding;
