pub mod config;
pub mod errors;
pub mod github;
pub mod http;
pub mod metrics_defs;
pub mod payload;
pub mod publisher;
pub mod service;
pub mod testutils;

use crate::config::Config;
use crate::errors::PublishError;
use crate::service::PublisherService;

/// Builds the publish service from loaded config and serves until the
/// process is stopped.
pub async fn run(config: Config) -> Result<(), PublishError> {
    let service = PublisherService::from_config(&config);
    http::serve(&config.listener.host, config.listener.port, service).await
}
