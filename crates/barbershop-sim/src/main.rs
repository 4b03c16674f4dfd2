//! barbershop-sim: run one sleeping-barber simulation and print the report.

mod args;

use std::process;

use anyhow::Context;
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use barbershop::{ShopConfig, Simulation};

use crate::args::{Args, USAGE, parse_args};

/// Initialize tracing with BARBERSHOP_LOG and LOG_FORMAT support.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match std::env::var("BARBERSHOP_LOG").as_deref() {
            Ok("debug") => "debug",
            Ok("warn") | Ok("warning") => "warn",
            Ok("error") => "error",
            _ => "info",
        };
        EnvFilter::new(format!("barbershop={level},barbershop_sim={level}"))
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

/// Merge command-line overrides into the file (or default) config.
fn build_config(args: &Args) -> anyhow::Result<ShopConfig> {
    let mut config = match &args.config {
        Some(path) => ShopConfig::from_path(path)?,
        None => ShopConfig::default(),
    };

    if let Some(seats) = args.seats {
        config.seats = seats;
    }
    if let Some(count) = args.clients {
        config = config.with_client_count(count);
    }
    if let Some(names) = &args.names {
        config.clients = names.clone();
    }
    if let Some(service) = args.service {
        config.service = service;
    }
    if let Some(arrival) = args.arrival {
        config.arrival = arrival;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = build_config(&args)?;
    debug!(?config, "Resolved configuration");

    let simulation = Simulation::from_config(&config)?;
    let report = simulation.run().await;

    if args.json {
        let json =
            serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{json}");
    } else {
        println!("{}", report.summary());
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let argv: Vec<String> = std::env::args().collect();

    let args = match parse_args(&argv) {
        Ok(args) => args,
        Err(msg) => {
            if !msg.is_empty() {
                eprintln!("error: {msg}");
                eprintln!();
            }
            eprintln!("{USAGE}");
            process::exit(2);
        }
    };

    init_tracing();
    info!("barbershop-sim {}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(args).await {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barbershop::Delay;

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let args = Args {
            seats: Some(1),
            clients: Some(4),
            service: Some(Delay::fixed(10)),
            seed: Some(7),
            ..Default::default()
        };

        let config = build_config(&args).unwrap();
        assert_eq!(config.seats, 1);
        assert_eq!(config.clients.len(), 4);
        assert_eq!(config.service, Delay::fixed(10));
        assert_eq!(config.arrival, ShopConfig::default().arrival);
        assert_eq!(config.seed, Some(7));
    }

    #[test]
    fn invalid_override_is_rejected() {
        let args = Args {
            seats: Some(0),
            ..Default::default()
        };
        let err = build_config(&args).unwrap_err();
        assert_eq!(err.to_string(), "invalid configuration");
    }
}
