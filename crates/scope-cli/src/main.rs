use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};

use scope_mount::{mount_factory, Direction, GotoRequest, Mount, MountConfig, SlewRequest, WorkMode};
use synscan::client::exit_on_fatal;
use synscan::commands::MAX_SLEW_RATE;
use synscan::{MountClient, SerialConfig, WatchdogConfig, SYNSCAN_BAUD};

#[derive(Debug, Parser)]
#[command(name = "scope", version, about = "Uniscope - SynScan telescope mount control")]
struct Cli {
    /// TOML config; built-in defaults when omitted.
    #[arg(long)]
    config: Option<String>,

    /// Serial device of the mount; overrides config and autodetect.
    #[arg(long)]
    port: Option<String>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List serial ports the OS reports.
    Ports,
    /// Sanity-check the config.
    Doctor,
    /// Model, firmware, clock, site and alignment.
    Info,
    /// Current RA/Dec and Azm/Alt.
    Position,
    /// Slew one axis until --secs elapse or Ctrl-C.
    Slew {
        #[arg(long, value_enum)]
        axis: AxisArg,
        #[arg(long, allow_hyphen_values = true)]
        speed: i8,
        #[arg(long)]
        secs: Option<f32>,
    },
    Stop,
    /// Goto e.g. --ra "5h 35m 17s" --dec "22° 0’ 52”".
    Goto {
        #[arg(long)]
        ra: String,
        #[arg(long)]
        dec: String,
    },
    Cancel,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AxisArg {
    Ra,
    Dec,
}

impl From<AxisArg> for Direction {
    fn from(a: AxisArg) -> Self {
        match a {
            AxisArg::Ra => Direction::Ra,
            AxisArg::Dec => Direction::Dec,
        }
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct Config {
    mount: MountConfig,
    serial: SerialConfig,
    watchdog: WatchdogConfig,
}

fn load_config(path: Option<&str>) -> Result<Config> {
    let Some(path) = path else { return Ok(Config::default()); };
    if !std::path::Path::new(path).exists() {
        warn!("config {} not found, using defaults", path);
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path))?;
    toml::from_str(&s).context("parse config toml")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = load_config(cli.config.as_deref())?;

    match cli.cmd {
        Command::Ports => ports(),
        Command::Doctor => doctor(&cfg),
        cmd => {
            let mount: Arc<dyn Mount> = Arc::from(mount_factory(
                &cfg.mount,
                &cfg.serial,
                &cfg.watchdog,
                cli.port.as_deref(),
                exit_on_fatal(),
            )?);
            drive(mount, cmd).await
        }
    }
}

fn ports() -> Result<()> {
    let ports = MountClient::available_ports().context("list serial ports")?;
    if ports.is_empty() {
        println!("no serial ports found");
    }
    for p in ports {
        println!("{}", p);
    }
    Ok(())
}

fn doctor(cfg: &Config) -> Result<()> {
    info!("doctor: starting");

    let serial = &cfg.serial;
    anyhow::ensure!(serial.baud == SYNSCAN_BAUD, "serial.baud must be {}", SYNSCAN_BAUD);
    anyhow::ensure!(
        (1..=100).contains(&serial.poll_interval_ms),
        "serial.poll_interval_ms should be 1..100"
    );
    anyhow::ensure!(serial.exchange_timeout_ms > serial.poll_interval_ms, "serial.exchange_timeout_ms too small");

    let wd = &cfg.watchdog;
    if wd.enable {
        anyhow::ensure!(wd.ping_timeout_ms > serial.poll_interval_ms, "watchdog.ping_timeout_ms must exceed poll interval");
        anyhow::ensure!(wd.interval_ms >= wd.ping_timeout_ms, "watchdog.interval_ms shorter than its deadline");
    } else {
        warn!("doctor: watchdog disabled, a frozen mount will not be detected");
    }

    anyhow::ensure!(!cfg.mount.slew_speeds.is_empty(), "mount.slew_speeds is empty");
    for s in &cfg.mount.slew_speeds {
        anyhow::ensure!(s.unsigned_abs() <= MAX_SLEW_RATE, "mount.slew_speeds: {} above rate {}", s, MAX_SLEW_RATE);
    }

    if cfg.mount.workmode == WorkMode::Real {
        if serial.autodetect {
            match MountClient::available_ports() {
                Ok(p) => info!("doctor: autodetect sees {} port(s)", p.len()),
                Err(e) => warn!("doctor: cannot list serial ports: {:#}", e),
            }
        } else {
            anyhow::ensure!(
                serial.serial_dev.as_ref().map(|s| !s.is_empty()).unwrap_or(false),
                "serial.serial_dev missing"
            );
        }
    }

    info!("doctor: OK");
    Ok(())
}

/// Run a blocking mount call off the async runtime.
async fn blocking<T, F>(mount: &Arc<dyn Mount>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Mount) -> Result<T> + Send + 'static,
{
    let mount = mount.clone();
    tokio::task::spawn_blocking(move || f(mount.as_ref()))
        .await
        .context("mount task failed")?
}

async fn drive(mount: Arc<dyn Mount>, cmd: Command) -> Result<()> {
    match cmd {
        Command::Info => {
            let info = blocking(&mount, |m| m.describe()).await?;
            println!("port={}", info.port);
            println!("model={}", info.model);
            println!("version={}", info.version);
            println!("time={}", info.time);
            println!("location={}", info.location);
            println!("tracking={} aligned={}", info.tracking, info.aligned);
        }
        Command::Position => {
            let (ra, dec) = blocking(&mount, |m| m.get_coordinates()).await?;
            let (azm, alt) = blocking(&mount, |m| m.get_azm_alt()).await?;
            println!("ra={} dec={}", ra, dec);
            println!("azm={} alt={}", azm, alt);
        }
        Command::Slew { axis, speed, secs } => {
            let req = SlewRequest { direction: axis.into(), speed };
            blocking(&mount, move |m| m.start_slew(&req)).await?;

            match secs {
                Some(s) => {
                    tokio::select! {
                        _ = tokio::time::sleep(Duration::from_secs_f32(s.max(0.0))) => {}
                        _ = tokio::signal::ctrl_c() => info!("slew: interrupted"),
                    }
                }
                None => {
                    println!("slewing, Ctrl-C to stop");
                    tokio::signal::ctrl_c().await.context("wait for ctrl-c")?;
                }
            }
            blocking(&mount, |m| m.stop_slew()).await?;
            info!("slew: stopped");
        }
        Command::Stop => blocking(&mount, |m| m.stop_slew()).await?,
        Command::Goto { ra, dec } => {
            let req = GotoRequest { ra, dec };
            blocking(&mount, move |m| m.goto_coordinates(&req)).await?;
        }
        Command::Cancel => blocking(&mount, |m| m.cancel_goto()).await?,
        Command::Ports | Command::Doctor => unreachable!("handled before the mount is opened"),
    }
    Ok(())
}
