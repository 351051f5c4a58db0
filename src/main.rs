//! AWS Lambda entrypoint for the Dome9 auto-onboarding handler.

use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, tracing, Error, LambdaEvent};
use serde::Serialize;

use dome9_onboarding::{
    resolve_api_credentials, run_onboarding, AccountFactoryEvent, Config, DerivedIdentity,
    Dome9Client,
};

/// The invocation response.
///
/// Only produced on success; any failure propagates to the runtime so the
/// invoking platform can observe it and retry or alert.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Response {
    status_code: u16,
    body: serde_json::Value,
}

struct AppState {
    config: Config,
    cloudformation: aws_sdk_cloudformation::Client,
    secrets: aws_sdk_secretsmanager::Client,
    sts: aws_sdk_sts::Client,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing::init_default_subscriber();

    let config = Config::from_env()?;
    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let state = AppState {
        config,
        cloudformation: aws_sdk_cloudformation::Client::new(&sdk_config),
        secrets: aws_sdk_secretsmanager::Client::new(&sdk_config),
        sts: aws_sdk_sts::Client::new(&sdk_config),
    };
    let state = &state;

    run(service_fn(move |event| async move {
        handle(state, event).await
    }))
    .await
}

async fn handle(
    state: &AppState,
    event: LambdaEvent<AccountFactoryEvent>,
) -> Result<Response, Error> {
    let event = event.payload;
    tracing::info!(
        reported_state = event.state(),
        "received account factory event"
    );
    let request = event.into_request();

    let master_account_id = state
        .sts
        .get_caller_identity()
        .send()
        .await?
        .account()
        .expect("GetCallerIdentityOutput without account")
        .to_string();

    let identity = DerivedIdentity::derive(master_account_id, &request)?;
    let credentials =
        resolve_api_credentials(&state.secrets, &state.config.api_secret_name).await?;
    let registrar = Dome9Client::new(state.config.api_region, credentials);

    let outcome = run_onboarding(&state.cloudformation, &registrar, &request, &identity).await?;
    Ok(Response {
        status_code: 200,
        body: outcome,
    })
}
