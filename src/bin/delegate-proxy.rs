use chrono::{DateTime, Utc};
use clap::{command, Parser};
use delegate_proxy::{config::ProxyConfig, Error, Event, EventSink, Proxy};
use futures::future::join_all;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "proxy.json")]
    config: PathBuf,

    /// Number of single-location requests to issue
    #[arg(short, long, default_value_t = 3)]
    requests: usize,

    /// Report a failure instead of a fix on every n-th update (0 disables failures)
    #[arg(long, default_value_t = 0)]
    fail_every: usize,

    /// Delay between simulated delegate callbacks
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,

    /// Enable debug mode
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
enum LocationKind {
    AuthorizationChanged,
    SingleLocation,
    LocationFailure,
}

#[derive(Debug, Clone, PartialEq)]
struct Fix {
    latitude: f64,
    longitude: f64,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
enum LocationEvent {
    AuthorizationChanged { authorized: bool },
    SingleLocation(Fix),
    LocationFailure { reason: String },
}

impl Event for LocationEvent {
    type Kind = LocationKind;

    fn kind(&self) -> LocationKind {
        match self {
            LocationEvent::AuthorizationChanged { .. } => LocationKind::AuthorizationChanged,
            LocationEvent::SingleLocation(_) => LocationKind::SingleLocation,
            LocationEvent::LocationFailure { .. } => LocationKind::LocationFailure,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum LocationError {
    #[error("location unavailable: {0}")]
    Unavailable(String),
    #[error("location access denied")]
    Denied,
    #[error("unexpected {0} event")]
    Unexpected(LocationKind),
}

/// Stand-in for a platform location manager that reports through delegate callbacks.
struct SimulatedLocationManager {
    delegate: Arc<dyn EventSink<LocationEvent>>,
    interval: Duration,
    fail_every: usize,
}

impl SimulatedLocationManager {
    async fn run(self, updates: usize) {
        self.delegate
            .notify(LocationEvent::AuthorizationChanged { authorized: true });

        let mut ticker = tokio::time::interval(self.interval);
        for n in 1..=updates {
            ticker.tick().await;
            let event = if self.fail_every > 0 && n % self.fail_every == 0 {
                LocationEvent::LocationFailure {
                    reason: format!("no fix on update {}", n),
                }
            } else {
                LocationEvent::SingleLocation(Fix {
                    latitude: 35.6812 + n as f64 * 0.001,
                    longitude: 139.7671,
                    timestamp: Utc::now(),
                })
            };
            debug!(update = n, kind = %event.kind(), "delegate callback");
            self.delegate.notify(event);
        }
    }
}

fn to_fix(event: LocationEvent) -> Result<Fix, LocationError> {
    match event {
        LocationEvent::SingleLocation(fix) => Ok(fix),
        LocationEvent::LocationFailure { reason } => Err(LocationError::Unavailable(reason)),
        other => Err(LocationError::Unexpected(other.kind())),
    }
}

async fn run(cli: &Cli) -> Result<(), Error> {
    // Load config
    let config = if cli.config.exists() {
        ProxyConfig::from_file(&cli.config)?
    } else {
        // Default config
        ProxyConfig::default()
    };

    info!("config loaded.");
    debug!("config: {:?}", config);

    let proxy = Arc::new(Proxy::<LocationEvent>::with_config(config));

    // Requests must be pending before the delegate starts reporting.
    let authorization = proxy.request([LocationKind::AuthorizationChanged], |event| match event {
        LocationEvent::AuthorizationChanged { authorized: true } => Ok(()),
        _ => Err(LocationError::Denied),
    });
    let locations: Vec<_> = (0..cli.requests)
        .map(|_| {
            proxy.request(
                [LocationKind::SingleLocation, LocationKind::LocationFailure],
                to_fix,
            )
        })
        .collect();

    let manager = SimulatedLocationManager {
        delegate: proxy.clone(),
        interval: Duration::from_millis(cli.interval_ms),
        fail_every: cli.fail_every,
    };
    let delegate_task = tokio::spawn(manager.run(cli.requests));

    match authorization.wait().await {
        Ok(()) => println!("Location access authorized."),
        Err(e) => println!("Authorization failed: {}", e),
    }

    let outcomes = join_all(locations.into_iter().map(|pending| pending.wait())).await;
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(fix) => println!(
                "#{}: {:.4}, {:.4} at {}",
                i + 1,
                fix.latitude,
                fix.longitude,
                fix.timestamp.to_rfc3339()
            ),
            Err(e) => println!("#{}: {}", i + 1, e),
        }
    }

    delegate_task
        .await
        .map_err(|e| Error::internal(format!("Delegate task failed: {}", e)))?;

    let cancelled = proxy.cancel_all("shutdown");
    info!(count = cancelled.len(), "proxy shut down.");

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
