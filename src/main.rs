//! ecc_control command line tool.
//!
//! ```bash
//! ecc_control list
//! ecc_control amplitude --axis 0 --value 30000
//! ecc_control step --axis 0 --backward --count 10
//! ecc_control run scripts/scan.rhai
//! ecc_control --mock 2 step --axis 1      # no hardware needed
//! ```

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use ecc_control::config::{EccConfig, DEFAULT_CONFIG_PATH};
use ecc_control::driver::MockDriver;
use ecc_control::scripting::RhaiEngine;
use ecc_control::select::select_device;
use ecc_control::{ConnectionHandle, DeviceBinding};

#[derive(Parser)]
#[command(name = "ecc_control", version)]
#[command(about = "Control an attocube ECC100 motion controller through its vendor driver")]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Driver library path (overrides the config file)
    #[arg(long, global = true)]
    library: Option<PathBuf>,

    /// Simulate COUNT devices instead of loading the driver
    #[arg(long, global = true, value_name = "COUNT")]
    mock: Option<usize>,

    /// Device slot to connect to (skips the selection prompt)
    #[arg(short, long, global = true)]
    device: Option<i32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List attached devices
    List,
    /// Set the step amplitude of an axis (mV)
    Amplitude {
        /// Axis number (0-based)
        #[arg(long)]
        axis: i32,
        /// Amplitude in mV
        #[arg(long)]
        value: i32,
    },
    /// Set the step frequency of an axis (mHz)
    Frequency {
        /// Axis number (0-based)
        #[arg(long)]
        axis: i32,
        /// Frequency in mHz
        #[arg(long)]
        value: i32,
    },
    /// Issue single steps on an axis
    Step {
        /// Axis number (0-based)
        #[arg(long)]
        axis: i32,
        /// Step backward instead of forward
        #[arg(long)]
        backward: bool,
        /// Number of steps
        #[arg(long, default_value_t = 1)]
        count: u32,
    },
    /// Run a Rhai script with the `ecc` global bound to the driver
    Run {
        /// Script file
        script: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EccConfig::load_from(&cli.config)
        .with_context(|| format!("Loading config from {}", cli.config.display()))?;
    if let Some(library) = cli.library.clone() {
        config.driver.library_path = library;
    }
    if cli.device.is_some() {
        config.device.index = cli.device;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
    debug!(?config, "Configuration loaded");

    let binding = match cli.mock {
        Some(count) => {
            info!(count, "Using simulated driver");
            DeviceBinding::new(MockDriver::new(count))
        }
        None => DeviceBinding::load(&config.driver.library_path).with_context(|| {
            format!(
                "Opening driver library {}",
                config.driver.library_path.display()
            )
        })?,
    };

    match cli.command {
        Command::List => {
            for device in binding.list_devices()? {
                println!("{}", device);
            }
            Ok(())
        }
        Command::Amplitude { axis, value } => with_device(&binding, &config, |handle| {
            binding.set_amplitude(handle, axis, value)?;
            println!("Amplitude value updated correctly");
            Ok(())
        }),
        Command::Frequency { axis, value } => with_device(&binding, &config, |handle| {
            binding.set_frequency(handle, axis, value)?;
            println!("Frequency value updated correctly");
            Ok(())
        }),
        Command::Step {
            axis,
            backward,
            count,
        } => with_device(&binding, &config, |handle| {
            for _ in 0..count {
                binding.step(handle, axis, backward)?;
            }
            println!(
                "{} {} step(s) on axis {}",
                if backward { "Backward:" } else { "Forward:" },
                count,
                axis
            );
            Ok(())
        }),
        Command::Run { script } => {
            let mut engine =
                RhaiEngine::with_device(Arc::new(binding), config.scripting.max_operations);
            let result = engine
                .run_file(&script)
                .with_context(|| format!("Script {} failed", script.display()))?;
            if !result.is_unit() {
                println!("{}", result);
            }
            Ok(())
        }
    }
}

/// Pick a device, connect, run `op`, then disconnect whatever `op` returned.
fn with_device<F>(binding: &DeviceBinding, config: &EccConfig, op: F) -> Result<()>
where
    F: FnOnce(ConnectionHandle) -> Result<()>,
{
    let index = match config.device.index {
        Some(index) => index,
        None => {
            let devices = binding.list_devices()?;
            for device in &devices {
                println!("{}", device);
            }
            let stdin = io::stdin();
            select_device(devices.len() as i32, stdin.lock(), io::stdout())?
        }
    };

    let handle = binding
        .connect(index)
        .with_context(|| format!("Connecting to device {}", index))?;
    let result = op(handle);
    binding.disconnect(handle);
    println!("Device disconnected");
    result
}
