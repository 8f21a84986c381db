mod board;
mod connection_handler;
mod responders;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use meter_connector::{
    ConsoleServerConfig, DeviceManagementResponder, DeviceManager, Endpoint, Options,
    OptionsBuilder, PassphraseAuthenticator,
};
use meter_core::constants::{
    BEACON_OBJECT, BEACON_RESOURCE, HOURGLASS_OBJECT, HOURGLASS_RESOURCE, LCD_OBJECT,
    LCD_RESOURCE, SERIAL_BAUD_RATE,
};
use meter_core::{MeterConfig, ResourcePath};
use meter_resources::meter::lock_meter;
use meter_resources::{BeaconSwitchResource, HourGlassResource, LcdResource};
use tokio::sync::watch;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use crate::board::Board;
use crate::connection_handler::LoggingConnectionHandler;

#[derive(Parser)]
#[command(name = "parking-meter")]
#[command(about = "Parking meter endpoint with LCD, hourglass and beacon switch resources")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "parking-meter.toml")]
    config: PathBuf,

    /// Console bind address (overrides the configuration)
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// Log level filter (overrides the configuration)
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = resolve_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.console.bind = bind;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .init();

    info!("Parking Meter ({})", config.endpoint.node_name);
    debug!(baud = SERIAL_BAUD_RATE, "Console serial settings");

    let board = Board::emulated(config.meter.led);
    let meter = board.meter.clone();
    lock_meter(&meter)
        .write_title(&config.device.firmware_version)
        .context("failed to write LCD title")?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);

    // Device manager (if enabled)
    let device_manager = config.device_manager.enabled.then(|| {
        let authenticator = PassphraseAuthenticator::new(config.device_manager.passphrase.clone());
        let mut responder = DeviceManagementResponder::new(authenticator);
        responders::install(&mut responder, Arc::clone(&shutdown_tx));
        Arc::new(DeviceManager::new(config.device.clone(), responder))
    });

    // Resources
    let lcd = Arc::new(LcdResource::new(
        ResourcePath::with_default_instance(LCD_OBJECT, LCD_RESOURCE)?,
        meter.clone(),
    ));
    let hourglass = Arc::new(HourGlassResource::new(
        ResourcePath::with_default_instance(HOURGLASS_OBJECT, HOURGLASS_RESOURCE)?,
        meter.clone(),
        config.meter.initial_seconds,
    ));
    hourglass.render().context("failed to draw parking time")?;
    let beacon = Arc::new(
        BeaconSwitchResource::new(
            ResourcePath::with_default_instance(BEACON_OBJECT, BEACON_RESOURCE)?,
            board.beacon_switch,
            board.beacon_led,
            meter,
        )
        .context("failed to switch the beacon on")?,
    );

    let options = configure_endpoint(&config, lcd, Arc::clone(&hourglass), beacon)?;
    let mut endpoint = Endpoint::new(options)?;
    if let Some(manager) = device_manager {
        endpoint = endpoint.with_device_manager(manager)?;
    }
    if config.endpoint.connection_handler {
        endpoint = endpoint.with_connection_status(Arc::new(LoggingConnectionHandler));
    }
    let endpoint = Arc::new(endpoint);

    // Countdown ticks and observation
    let countdown = tokio::spawn(hourglass.run_countdown(
        Duration::from_millis(config.meter.tick_ms),
        shutdown_rx.clone(),
        Some(Arc::clone(&endpoint)),
    ));

    let ctrl_c = Arc::clone(&shutdown_tx);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl+C received");
                ctrl_c.send_replace(true);
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    let console = ConsoleServerConfig {
        bind_addr: config.console.bind,
        max_connections: config.console.max_connections,
    };
    info!("Endpoint running. Press Ctrl+C to stop.");
    Arc::clone(&endpoint).start(console, shutdown_rx).await?;

    shutdown_tx.send_replace(true);
    countdown.await?;

    for (y, row) in board.screen.rows() {
        debug!("LCD[{:2}] {}", y, row);
    }
    info!("Shutting down...");

    Ok(())
}

/// Load the configuration file, falling back to defaults only when it is absent.
///
/// A file that exists but does not parse or validate is an error, so a typo
/// never silently restores the default passphrase.
fn resolve_config(path: &Path) -> anyhow::Result<MeterConfig> {
    match MeterConfig::load(path) {
        Ok(config) => Ok(config),
        Err(meter_core::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            eprintln!("Warning: config file {} not found", path.display());
            eprintln!("Using default configuration");
            Ok(MeterConfig::default())
        }
        Err(e) => {
            Err(e).with_context(|| format!("failed to load config from {}", path.display()))
        }
    }
}

/// Build the endpoint options: identity, credentials and the meter resources.
fn configure_endpoint(
    config: &MeterConfig,
    lcd: Arc<LcdResource>,
    hourglass: Arc<HourGlassResource>,
    beacon: Arc<BeaconSwitchResource>,
) -> anyhow::Result<Options> {
    let endpoint = &config.endpoint;
    info!("Customizing endpoint configuration...");

    let mut builder = OptionsBuilder::new()
        .endpoint_nodename(&endpoint.node_name)
        .domain(&endpoint.domain)
        .endpoint_type(&endpoint.endpoint_type)
        .lifetime(Duration::from_secs(endpoint.lifetime_secs));

    if let Some(path) = &endpoint.server_certificate {
        builder = builder.server_certificate(read_credential(path)?);
    }
    if let Some(path) = &endpoint.client_certificate {
        builder = builder.client_certificate(read_credential(path)?);
    }
    if let Some(path) = &endpoint.client_key {
        builder = builder.client_key(read_credential(path)?);
    }

    let options = builder
        .add_resource(lcd)
        .add_resource_with_observation(hourglass, config.meter.hourglass_observable)
        .add_resource(beacon)
        .build()?;

    if !options.credentials().is_provisioned() {
        info!("No provisioning credentials configured");
    }
    Ok(options)
}

fn read_credential(path: &Path) -> anyhow::Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("failed to read credential {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use meter_core::Passphrase;
    use std::io::Write;

    fn config_file(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{content}").unwrap();
        file
    }

    #[test]
    fn test_missing_config_uses_defaults() {
        let config = resolve_config(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.endpoint.node_name, MeterConfig::default().endpoint.node_name);
    }

    #[test]
    fn test_config_keeps_custom_passphrase() {
        let file = config_file("[device_manager]\npassphrase = \"s3cret-op\"\n");
        let config = resolve_config(file.path()).unwrap();
        assert_eq!(config.device_manager.passphrase, Passphrase::new("s3cret-op"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let file = config_file(
            "[device_manager]\npassphrase = \"s3cret-op\"\n[meter]\ntick_ms = 0\n",
        );
        let error = resolve_config(file.path()).unwrap_err();
        assert!(error.to_string().starts_with("failed to load config from"));
        assert!(matches!(
            error.downcast_ref::<meter_core::Error>(),
            Some(meter_core::Error::Config(_))
        ));
    }

    #[test]
    fn test_unparseable_config_is_fatal() {
        let file = config_file("[device_manager\npassphrase = ");
        let error = resolve_config(file.path()).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<meter_core::Error>(),
            Some(meter_core::Error::ConfigParse(_))
        ));
    }
}
