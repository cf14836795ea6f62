use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;
use vpn_provision::{Config, KeyPair, ProvisioningParams};

#[derive(Parser)]
#[command(name = "vpn-provision")]
#[command(about = "Provision a VPN tunnel config from a vpn:// subscription link")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./vpn-provision.toml or ~/.vpn-provision/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Request a tunnel config and print it (or write it to a file)
    Provision {
        /// Subscription link (vpn://...)
        #[arg(short, long)]
        key: String,
        /// Write the config to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show the endpoint encoded in a subscription link
    Decode {
        /// Subscription link (vpn://...)
        #[arg(short, long)]
        key: String,
    },
    /// Build a subscription link from an endpoint and API key
    Encode {
        #[arg(long)]
        endpoint: String,
        #[arg(long)]
        api_key: String,
    },
    /// Generate an X25519 key pair
    Keygen,
    /// Generate default config file
    Init,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the config
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Provision { key, output } => {
            let config = load_config(cli.config)?;
            let provisioned = vpn_provision::provision_from_link(&key, &config).await?;
            info!("Registered public key: {}", provisioned.public_key);

            match output {
                Some(path) => {
                    std::fs::write(&path, &provisioned.config)?;
                    info!("Wrote config to {}", path.display());
                }
                None => print!("{}", provisioned.config),
            }
        }
        Commands::Decode { key } => {
            let params = ProvisioningParams::from_link(&key)?;
            println!("Endpoint: {}", params.endpoint);
            println!("API key:  {}", mask(&params.credential));
        }
        Commands::Encode { endpoint, api_key } => {
            println!("{}", vpn_provision::link::encode_link(&endpoint, &api_key)?);
        }
        Commands::Keygen => {
            let keys = KeyPair::generate()?;
            println!("Private key: {}", keys.private_key_base64().as_str());
            println!("Public key:  {}", keys.public_key_base64());
        }
        Commands::Init => {
            let path = cli
                .config
                .unwrap_or_else(|| PathBuf::from("vpn-provision.toml"));
            Config::default().save(&path)?;
            println!("Created default config: {}", path.display());
        }
    }

    Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<Config, vpn_provision::ConfigError> {
    match path {
        Some(path) => Config::load(&path),
        None => Config::discover(),
    }
}

/// Keep only the last four characters of a secret
fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(chars.len() - 4), tail)
}
