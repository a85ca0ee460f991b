//! Collector Factory Binary Entry Point
//!
//! Checks collector configuration documents against the built-in component
//! factories, and optionally builds the configured components.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use collector_factory::{
    AnyConfig, Component, ComponentKind, CreateSettings, FactoryRegistry,
    component::StabilityLevel, components, config::CollectorConfig,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Collector Factory - typed component configuration
#[derive(Parser, Debug)]
#[command(name = "collector-factory", version, about, long_about = None)]
struct Cli {
    /// Drop unknown configuration keys with a warning instead of failing
    #[arg(long, global = true, env = "COLLECTOR_LENIENT")]
    lenient: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and validate every component of a configuration file
    Validate {
        /// Path to configuration file
        #[arg(default_value = "configs/collector.yaml", env = "COLLECTOR_CONFIG")]
        config: PathBuf,
    },
    /// Validate, then build, start and stop the configured components
    Build {
        /// Path to configuration file
        #[arg(default_value = "configs/collector.yaml", env = "COLLECTOR_CONFIG")]
        config: PathBuf,
    },
    /// List registered component types
    Components,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,collector_factory=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let registry = components()?;
    let strict = !cli.lenient;

    match cli.command {
        Command::Validate { config } => {
            tracing::info!("Validating configuration: {}", config.display());
            let loaded = CollectorConfig::load(&config, &registry, strict)?;
            print_config(&loaded)?;
        }
        Command::Build { config } => {
            tracing::info!("Loading configuration: {}", config.display());
            let loaded = CollectorConfig::load(&config, &registry, strict)?;
            build(&registry, &loaded).await?;
        }
        Command::Components => list_components(&registry),
    }

    Ok(())
}

/// Print the effective configuration of every component as JSON.
fn print_config(config: &CollectorConfig) -> Result<(), Box<dyn std::error::Error>> {
    let extensions = section_json(&config.extensions)?;
    let receivers = section_json(&config.receivers)?;
    let document = serde_json::json!({
        "extensions": extensions,
        "receivers": receivers,
        "service": { "extensions": config.service.extensions },
    });
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn section_json(configs: &[AnyConfig]) -> serde_json::Result<serde_json::Value> {
    let mut section = serde_json::Map::new();
    for config in configs {
        section.insert(config.id().to_string(), config.to_json()?);
    }
    Ok(serde_json::Value::Object(section))
}

fn list_components(registry: &FactoryRegistry) {
    for kind in [ComponentKind::Extension, ComponentKind::Receiver] {
        for component_type in registry.types(kind) {
            let stability = registry
                .lookup(kind, &component_type)
                .map(|f| f.stability())
                .unwrap_or(StabilityLevel::Development);
            println!("{kind:<10} {component_type:<12} {stability}");
        }
    }
}

/// Build and start every enabled extension and every receiver, then shut
/// them down in reverse order.
async fn build(
    registry: &FactoryRegistry,
    config: &CollectorConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel = CancellationToken::new();
    let signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl+C signal, cancelling");
            signal.cancel();
        }
    });

    let planned = config
        .enabled_extensions()
        .into_iter()
        .map(|c| (ComponentKind::Extension, c))
        .chain(config.receivers.iter().map(|c| (ComponentKind::Receiver, c)));

    let mut started: Vec<(String, Box<dyn Component>)> = Vec::new();
    let mut failure = None;

    for (kind, loaded) in planned {
        match build_one(registry, &cancel, kind, loaded).await {
            Ok(component) => started.push((format!("{kind} '{}'", loaded.id()), component)),
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    tracing::info!("Shutting down {} components...", started.len());
    for (name, component) in started.into_iter().rev() {
        if let Err(e) = component.shutdown().await {
            tracing::error!("Failed to shutdown {}: {}", name, e);
        }
    }

    match failure {
        Some(e) => Err(e),
        None => {
            tracing::info!("Build complete");
            Ok(())
        }
    }
}

async fn build_one(
    registry: &FactoryRegistry,
    cancel: &CancellationToken,
    kind: ComponentKind,
    config: &AnyConfig,
) -> Result<Box<dyn Component>, Box<dyn std::error::Error>> {
    let id = config.id().clone();
    let factory = registry.lookup(kind, id.component_type())?;

    let component = factory
        .create_component(cancel, CreateSettings::new(kind, id.clone()), config)
        .await
        .inspect_err(|e| {
            tracing::error!(retryable = e.is_retryable(), "Failed to create {} '{}': {}", kind, id, e);
        })?;
    component.start().await?;
    tracing::info!("Started {} '{}'", kind, id);
    Ok(component)
}
