use std::{env, path::PathBuf, process};

use clap::Parser;
use fauxmetrics::{
    config::{self, Config, Telemetry},
    emitter::{self, Emitter},
    generator,
    supervisor::Supervisor,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::{
    runtime::Builder,
    signal,
    time::{Duration, sleep},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, util::SubscriberInitExt};

#[derive(thiserror::Error, Debug)]
enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(#[from] config::Error),
    #[error("Emitter setup failed: {0}")]
    Emitter(#[from] emitter::Error),
    #[error("Failed to install prometheus recorder: {0}")]
    Prometheus(#[from] metrics_exporter_prometheus::BuildError),
}

#[derive(Parser)]
#[clap(version, about, long_about = None)]
struct Args {
    /// path on disk to the configuration file, the built-in default is used
    /// when absent
    #[clap(long)]
    config_path: Option<PathBuf>,
    /// validate the configuration and exit
    #[clap(long)]
    config_check: bool,
    /// stop after this many seconds, run until killed when absent
    #[clap(long)]
    duration_seconds: Option<u64>,
    /// the maximum time to wait, in seconds, for controlled shutdown
    #[clap(long, default_value_t = 5)]
    max_shutdown_delay: u16,
}

fn load_config(args: &Args) -> Result<Config, Error> {
    if let Ok(env_var_value) = env::var("FAUXMETRICS_CONFIG") {
        debug!("Using config from env var 'FAUXMETRICS_CONFIG'");
        Ok(Config::from_yaml(&env_var_value)?)
    } else if let Some(ref path) = args.config_path {
        debug!("Attempting to open configuration file at: {}", path.display());
        Ok(Config::load(path).inspect_err(|err| error!("{err}"))?)
    } else {
        debug!("No configuration given, using the built-in default");
        Ok(Config::default())
    }
}

async fn inner_main(config: Config, duration: Option<Duration>) -> Result<(), Error> {
    let (shutdown_watcher, shutdown_broadcast) = fauxmetrics_signal::signal();

    if let Some(Telemetry::Prometheus {
        addr,
        global_labels,
    }) = config.telemetry
    {
        let mut builder = PrometheusBuilder::new().with_http_listener(addr);
        for (k, v) in global_labels {
            builder = builder.add_global_label(k, v);
        }
        builder.install()?;
        info!("serving self-telemetry on {addr}");
    }

    // Socket creation failure is fatal before any generator starts.
    let emitter = Emitter::bind(config.destination).await?;
    info!("emitting to {}", emitter.destination());

    let mut supervisor = Supervisor::new();
    for cfg in config.generator {
        let label = generator::label(&cfg);
        if !cfg.general.enabled {
            debug!("{label} is disabled");
            continue;
        }
        let server = generator::Server::new(cfg, emitter.clone(), shutdown_watcher.clone());
        supervisor.spawn(label, server.run());
    }
    if supervisor.running() == 0 {
        warn!("no generators enabled, idling");
    }

    // Any watcher left alive here keeps `signal_and_wait` from returning.
    drop(shutdown_watcher);

    let deadline = sleep(duration.unwrap_or(Duration::MAX));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = signal::ctrl_c() => {
                info!("received ctrl-c");
                break;
            },
            () = &mut deadline, if duration.is_some() => {
                info!("run duration exceeded, signaling for shutdown");
                break;
            },
            Some(label) = supervisor.reap(), if supervisor.running() > 0 => {
                info!("{label} has stopped, {} generators remain", supervisor.running());
            },
        }
    }
    shutdown_broadcast.signal_and_wait().await;
    Ok(())
}

fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish()
        .init();

    let args = Args::parse();

    let version = env!("CARGO_PKG_VERSION");
    info!("Starting fauxmetrics {version} run.");

    let config = load_config(&args);
    if args.config_check {
        match config {
            Ok(_) => {
                info!("Configuration is valid");
                process::exit(0)
            }
            Err(err) => {
                error!("Configuration validation failed: {err}");
                process::exit(1)
            }
        }
    }

    let duration = args.duration_seconds.map(Duration::from_secs);
    let max_shutdown_delay = Duration::from_secs(args.max_shutdown_delay.into());

    let runtime = Builder::new_multi_thread()
        .enable_io()
        .enable_time()
        .build()?;
    let res = runtime.block_on(inner_main(config?, duration));
    info!(
        "Shutting down runtime with a {} second delay. May leave orphaned tasks.",
        max_shutdown_delay.as_secs(),
    );
    runtime.shutdown_timeout(max_shutdown_delay);
    info!("Bye. :)");
    res
}
