//! Burrow - Kademlia DHT node over discrete-message transports

use anyhow::Result;
use burrow_core::transport::mock::MessageBus;
use burrow_core::{BinaryKey, PeerAddress, Transport};
use burrow_dht::RequestOutcome;
use burrow_node::{Config, Session};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "burrow")]
#[command(about = "Kademlia DHT routing and lookup engine", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "~/.burrow/config.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an in-memory network of nodes and walk a resource through
    /// store and lookup
    Demo {
        /// Number of nodes
        #[arg(short, long, default_value = "5")]
        nodes: usize,

        /// Name of the resource to store
        #[arg(long, default_value = "demo-note")]
        name: String,

        /// Value of the resource to store
        #[arg(long, default_value = "hello from burrow")]
        value: String,
    },

    /// Print the binary key for a peer address or resource name
    Key {
        /// The address or name to hash
        #[arg(required = true)]
        input: String,

        /// Key width in bits
        #[arg(short, long, default_value = "128")]
        bits: usize,

        /// Use the synthetic string hash instead of the cryptographic
        /// one (width must be a multiple of 64)
        #[arg(long)]
        synthetic: bool,
    },

    /// Initialize configuration
    Init,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Demo { nodes, name, value } => {
            let config = load_config(&cli.config);
            run_demo(nodes, &name, &value, &config).await?;
        }
        Commands::Key { input, bits, synthetic } => {
            let key = if synthetic {
                BinaryKey::hash_str(&input, bits)?
            } else {
                BinaryKey::hash_bytes(input.as_bytes(), bits)?
            };
            println!("{}", key.to_hex());
        }
        Commands::Init => {
            init_config()?;
        }
    }

    Ok(())
}

/// Load the config file if present, defaults otherwise
fn load_config(path: &str) -> Config {
    let path = expand_path(path);
    match Config::load(&path) {
        Ok(config) => config,
        Err(error) => {
            tracing::debug!(%error, "using default configuration");
            Config::default()
        }
    }
}

fn expand_path(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

async fn run_demo(nodes: usize, name: &str, value: &str, config: &Config) -> Result<()> {
    if nodes < 2 {
        anyhow::bail!("the demo needs at least 2 nodes");
    }

    let bus = MessageBus::new();
    let mut sessions = Vec::with_capacity(nodes);
    let mut endpoints = Vec::with_capacity(nodes);
    for i in 0..nodes {
        let address = PeerAddress::new(format!("node-{i}"))?;
        endpoints.push(bus.endpoint(address.clone()));
        sessions.push(Session::new(address, config.dht())?);
    }

    // Bootstrap: every node pings every other, meshing the tables.
    let addresses: Vec<PeerAddress> = sessions.iter().map(|s| s.address().clone()).collect();
    for session in sessions.iter_mut() {
        for address in &addresses {
            if address != session.address() && session.ping(address).is_none() {
                anyhow::bail!("operation id space exhausted during bootstrap");
            }
        }
    }
    pump(&mut sessions, &endpoints).await;
    for session in &sessions {
        tracing::info!(
            node = %session.address(),
            peers = session.known_peers(),
            "bootstrap finished"
        );
    }

    // Store the resource from the second node.
    let resource = burrow_core::Resource::new(name, value)?;
    if sessions[1].store(resource).is_none() {
        anyhow::bail!("operation id space exhausted");
    }
    pump(&mut sessions, &endpoints).await;
    for (id, outcome) in sessions[1].take_outcomes() {
        if let RequestOutcome::Store { resource, new_owner } = outcome {
            match new_owner {
                Some(owner) => println!(
                    "[{id}] stored '{}' at {}",
                    resource.name(),
                    owner.address()
                ),
                None => println!("[{id}] no node accepted '{}'", resource.name()),
            }
        }
    }

    // Look the resource up from the last node.
    let target = BinaryKey::hash_bytes(name.as_bytes(), config.key_bits)?;
    let last = sessions.len() - 1;
    if sessions[last].find_value(target).is_none() {
        anyhow::bail!("operation id space exhausted");
    }
    pump(&mut sessions, &endpoints).await;
    for (id, outcome) in sessions[last].take_outcomes() {
        if let RequestOutcome::FindValue { found, .. } = outcome {
            match found {
                Some((owner, resource)) => println!(
                    "[{id}] found '{}' = '{}' at {}",
                    resource.name(),
                    resource.value(),
                    owner.address()
                ),
                None => println!("[{id}] resource not found"),
            }
        }
    }

    Ok(())
}

/// Move messages between sessions until the network goes quiet
async fn pump(
    sessions: &mut [Session],
    endpoints: &[burrow_core::transport::mock::BusEndpoint],
) {
    loop {
        let mut progressed = false;
        for (session, endpoint) in sessions.iter_mut().zip(endpoints) {
            for (to, body) in session.flush() {
                progressed = true;
                if let Err(error) = endpoint.send(&to, body).await {
                    tracing::warn!(%error, "message lost in transit");
                }
            }
            while let Some(message) = endpoint.try_receive() {
                progressed = true;
                session.handle_message(&message.from, &message.body);
            }
        }
        if !progressed {
            break;
        }
    }
}

fn init_config() -> Result<()> {
    let config_dir = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine home directory"))?
        .join(".burrow");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        tracing::info!("created config directory: {}", config_dir.display());
    }

    let config_path = config_dir.join("config.toml");
    if config_path.exists() {
        println!("Config already exists at: {}", config_path.display());
        return Ok(());
    }

    let config = Config::default();
    let toml = toml::to_string_pretty(&config)?;
    std::fs::write(&config_path, toml)?;

    println!("Initialized Burrow at: {}", config_dir.display());

    Ok(())
}
