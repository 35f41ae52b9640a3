//! Binary entrypoint for the plantmon CLI.
//!
//! Commands:
//! - `monitor [--port <path>] [--baud <rate>]` - connect and run the interactive monitor (default)
//! - `init` - write a starter `config.toml` and plant profile file
//! - `profiles` - list the stored plant profiles
//! - `ports` - list serial ports visible to the system
//!
//! See the library crate docs for module-level details: `plantmon::`.
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use plantmon::config::Config;
use plantmon::device::{self, SerialConnector};
use plantmon::profiles::{self, JsonProfileStore, ProfileStore};
use plantmon::session::runner::{render_profiles, Monitor, RunnerOptions};
use plantmon::session::{SessionController, SessionSettings};

#[derive(Parser)]
#[command(name = "plantmon")]
#[command(about = "Serial environmental monitor and plant matcher for an Arduino sensor board")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the sensor board and start the interactive monitor
    Monitor {
        /// Serial port (e.g., /dev/ttyACM0)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,
    },
    /// Write a default configuration and starter plant profiles
    Init,
    /// List stored plant profiles
    Profiles,
    /// List available serial ports
    Ports,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Monitor {
        port: None,
        baud: None,
    });

    let (config, load_error) = match Config::load(&cli.config).await {
        Ok(cfg) => (cfg, None),
        // A missing file is normal before `init`; anything else is fatal.
        Err(e) if !std::path::Path::new(&cli.config).exists() => (Config::default(), Some(e)),
        Err(e) => return Err(e),
    };
    init_logging(&config, cli.verbose);
    if let Some(e) = load_error {
        warn!("{}; using defaults", e);
    }

    match command {
        Commands::Init => init(&cli.config).await?,
        Commands::Monitor { port, baud } => monitor(config, port, baud).await?,
        Commands::Profiles => {
            let mut store = JsonProfileStore::new(&config.profiles.path);
            let list = store.load()?;
            debug!("Read {} profiles from {}", list.len(), store.path().display());
            let current = if list.is_empty() { None } else { Some(0) };
            for line in render_profiles(list.iter().map(|p| p.name.as_str()), current) {
                println!("{}", line);
            }
        }
        Commands::Ports => {
            let ports = device::list_ports()?;
            if ports.is_empty() {
                println!("No serial ports found.");
            }
            for p in ports {
                println!("{}\t{}", p.name, p.description);
            }
        }
    }

    Ok(())
}

async fn init(config_path: &str) -> Result<()> {
    info!("Initializing plantmon configuration");
    if std::path::Path::new(config_path).exists() {
        println!("{} already exists; leaving it unchanged.", config_path);
    } else {
        Config::create_default(config_path).await?;
        println!("Created default configuration at {}", config_path);
    }
    let config = Config::load(config_path).await?;
    let profile_path = std::path::Path::new(&config.profiles.path);
    if profile_path.exists() {
        println!("{} already exists; leaving it unchanged.", profile_path.display());
    } else {
        let mut store = JsonProfileStore::new(profile_path);
        store.save(&profiles::starter_profiles())?;
        println!("Wrote starter plant profiles to {}", profile_path.display());
    }
    println!("Edit [device] port in {} then run: plantmon monitor", config_path);
    Ok(())
}

async fn monitor(mut config: Config, port: Option<String>, baud: Option<u32>) -> Result<()> {
    if let Some(port) = port {
        config.device.port = port;
    }
    if let Some(baud) = baud {
        if !device::is_supported_baud(baud) {
            return Err(anyhow!(
                "Unsupported baud rate {} (expected one of {:?})",
                baud,
                device::SUPPORTED_BAUD_RATES
            ));
        }
        config.device.baud_rate = baud;
    }

    let connector = SerialConnector::new(config.device.read_timeout(), config.device.settle());
    let store = JsonProfileStore::new(&config.profiles.path);
    let profile_path = store.path().display().to_string();
    let controller = SessionController::new(connector, store, SessionSettings::from(&config))?;
    info!(
        "Loaded {} plant profiles from {}",
        controller.profiles().len(),
        profile_path
    );

    let options = RunnerOptions {
        port: config.device.port.clone(),
        baud_rate: config.device.baud_rate,
        poll_interval: config.device.poll_interval(),
        resample_factor: config.display.resample_factor,
    };
    let mut monitor = Monitor::new(controller, options);
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    monitor.run(stdin).await
}

fn init_logging(config: &Config, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config.logging.level_filter(),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);
    let opened = config.logging.file.as_ref().and_then(|file| {
        std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(file)
            .ok()
    });
    if let Some(f) = opened {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Echo to the console only when attached to a terminal
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
