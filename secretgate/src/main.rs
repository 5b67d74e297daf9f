//! SecretGate - CGI proxy for AWS Secrets Manager
//!
//! Each invocation reads one secret task from the CGI environment, runs it
//! against Secrets Manager and writes the JSON result to stdout.

mod cgi;
mod config;
mod router;

use std::sync::Arc;

use secretgate_secretsmanager::{AwsStoreFactory, SecretsProxyState};
use tower::ServiceExt;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let (config, load_error) = match config::Config::load() {
        Ok(config) => (config, None),
        Err(e) => (config::Config::default(), Some(e)),
    };

    // stdout carries the CGI response, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "secretgate={level},secretgate_secretsmanager={level},secretgate_core={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Some(e) = load_error {
        warn!("Failed to load configuration, using defaults: {}", e);
    }

    let defaults = config.secrets_defaults();
    let factory = Arc::new(AwsStoreFactory::new(defaults.default_region.clone()));
    let app = router::create_router(SecretsProxyState::new(factory, defaults));

    let cgi_request = cgi::CgiRequest::from_env();
    debug!(
        "CGI request: {} {}",
        cgi_request.method, cgi_request.path_info
    );
    let body = cgi_request.read_body(tokio::io::stdin()).await?;
    let request = cgi_request.into_request(body)?;

    let response = app.oneshot(request).await?;
    debug!("Responding with status {}", response.status());

    let mut stdout = tokio::io::stdout();
    cgi::write_response(response, &mut stdout).await?;

    Ok(())
}
