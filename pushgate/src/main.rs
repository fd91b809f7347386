use clap::Parser;
use metrics_exporter_statsd::StatsdBuilder;
use publisher::config::Config;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pushgate", about = "Publishes JSON payloads to a GitHub repository")]
struct Cli {
    /// Path to the YAML config file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = match Config::from_file(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %cli.config.display(), error = %err, "could not load config");
            return ExitCode::FAILURE;
        }
    };
    config.apply_env();

    // Sentry wants to be initialized before the async runtime starts
    let _sentry_guard = config.logging.as_ref().map(|logging| {
        sentry::init((
            logging.sentry_dsn.clone(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                ..Default::default()
            },
        ))
    });

    if let Some(metrics_config) = &config.metrics {
        match StatsdBuilder::from(&metrics_config.statsd_host, metrics_config.statsd_port)
            .build(Some("pushgate"))
        {
            Ok(recorder) => {
                if let Err(err) = metrics::set_global_recorder(recorder) {
                    tracing::warn!(error = %err, "metrics recorder already installed");
                }
            }
            Err(err) => tracing::warn!(error = %err, "could not set up statsd exporter"),
        }
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "could not start runtime");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(publisher::run(config)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %err, "server exited");
            ExitCode::FAILURE
        }
    }
}
