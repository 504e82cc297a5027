use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use comfy_table::{presets::UTF8_FULL, Table};

use keepkey_device_registry::config::RegistryConfig;
use keepkey_device_registry::networks::NetworkTable;
use keepkey_device_registry::{logging, selectors, DeviceAction, DeviceRecord, DeviceRegistry};

/// Replays device events through the registry and shows the result
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// network support table, overrides the config
    #[arg(short, long, global = true)]
    networks: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// apply a JSON array of device events in order
    Replay {
        events: PathBuf,
    },
    /// list the network support table
    Networks,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::default(),
    };
    if cli.networks.is_some() {
        config.networks_file = cli.networks.clone();
    }
    logging::init(&config.log_filter);

    let networks = config.network_table()?;
    match cli.command {
        Command::Replay { events } => replay(&events, &networks),
        Command::Networks => {
            render_networks(&networks);
            Ok(())
        }
    }
}

fn replay(events: &Path, networks: &NetworkTable) -> Result<()> {
    let content = std::fs::read_to_string(events)
        .with_context(|| format!("Failed to read event log {:?}", events))?;
    let actions: Vec<DeviceAction> = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event log {:?}", events))?;
    tracing::info!("replaying {} events from {:?}", actions.len(), events);

    let mut registry = DeviceRegistry::new();
    registry.dispatch_all(actions);
    let state = registry.state();

    render_devices(selectors::devices(state));

    match selectors::selected_device(state) {
        Some(selected) => {
            println!(
                "Selected: {} (instance {}) - {:?}",
                selected.id.as_deref().unwrap_or("<unacquired>"),
                selected.instance.map_or_else(|| "-".to_string(), |i| i.to_string()),
                selected.status(),
            );
            println!("Ready for discovery: {}", selectors::is_device_ready_for_discovery(state));
            let supported = selectors::supported_networks(state, networks);
            println!("Supported networks: {}", supported.join(", "));
        }
        None if selectors::is_pending_transport_event(state) => println!("Waiting for devices"),
        None => println!("No device selected"),
    }
    Ok(())
}

fn render_devices(devices: &[DeviceRecord]) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header([
        "Id",
        "Path",
        "Instance",
        "Wallet",
        "Connected",
        "Available",
        "Remember",
        "Status",
    ]);

    for d in devices {
        table.add_row([
            d.id.clone().unwrap_or_else(|| "<unacquired>".to_string()),
            if d.path.is_empty() { "-".to_string() } else { d.path.clone() },
            d.instance.map_or_else(|| "-".to_string(), |i| i.to_string()),
            match d.wallet_number {
                Some(n) => format!("hidden #{}", n),
                None if d.use_empty_passphrase => "standard".to_string(),
                None => "-".to_string(),
            },
            yes_no(d.connected),
            yes_no(d.available),
            yes_no(d.remember),
            format!("{:?}", d.status()),
        ]);
    }

    println!("{}", table);
}

fn render_networks(networks: &NetworkTable) {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(["Symbol", "Name", "Testnet", "Minimum firmware"]);

    for n in networks.iter() {
        let support = n
            .support
            .iter()
            .map(|(model, version)| format!("{} {}", model, version))
            .collect::<Vec<_>>()
            .join(", ");
        table.add_row([n.symbol.clone(), n.name.clone(), yes_no(n.testnet), support]);
    }

    println!("{}", table);
}

fn yes_no(value: bool) -> String {
    String::from(if value { "Yes" } else { "No" })
}
