use anyhow::Context;
use clap::Parser;
use sensor_historian::{Config, Historian};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "sensor-historian")]
#[command(about = "Kafka to PostgreSQL sensor reading historian", long_about = None)]
struct Args {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Optional TOML config file, overlaid by HISTORIAN_* environment variables"
    )]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    info!("Starting sensor-historian");
    if let Some(path) = &args.config {
        info!("Loading configuration from {:?}", path);
    }

    let config = Config::load(args.config.as_deref()).context("Failed to load configuration")?;
    config.validate()?;

    info!(
        sink_host = %config.sink.host,
        sink_port = config.sink.port,
        sink_table = %format!("{}.{}", config.sink.schema, config.sink.table),
        kafka_brokers = ?config.kafka.brokers,
        kafka_group_id = %config.kafka.group_id,
        kafka_topics = ?config.kafka.topics,
        max_batch_size = config.writer.max_batch_size,
        flush_interval_secs = config.writer.flush_interval_secs,
        "Configuration summary"
    );

    if let Err(e) = Historian::new(config).run().await {
        error!("Historian terminated: {}", e);
        return Err(e.into());
    }

    Ok(())
}

/// `RUST_LOG` wins when set; otherwise `--verbose` picks the default level.
fn init_logging(json: bool, verbose: bool) {
    let default_directives = if verbose {
        "sensor_historian=debug,info"
    } else {
        "sensor_historian=info,warn"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}
