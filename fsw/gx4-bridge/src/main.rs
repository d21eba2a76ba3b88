use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gx4::config::DriverConfig;
use gx4::session::Session;

mod sim;
mod sink;

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    /// Driver configuration TOML; defaults apply when the file is absent.
    #[clap(default_value = "gx4.toml")]
    config_path: PathBuf,
    /// Directory for the CSV channel logs.
    #[clap(long, default_value = "gx4-logs")]
    out_dir: PathBuf,
    /// Seconds to stream before disconnecting.
    #[clap(long, default_value_t = 10.0)]
    duration: f64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config: DriverConfig = match std::fs::read_to_string(&args.config_path) {
        Ok(raw) => toml::from_str(&raw)?,
        Err(_) => {
            info!(path = %args.config_path.display(), "no config file, using defaults");
            DriverConfig::default()
        }
    };

    let transport = sim::SimTransport::new();
    let publisher = sink::CsvSink::create(&args.out_dir)?;
    let mut session = Session::new(transport, publisher, config);
    session.connect()?;
    session.configure()?;
    session.stream()?;

    let deadline = Instant::now() + Duration::from_secs_f64(args.duration.max(0.0));
    session.run(|| Instant::now() < deadline)?;
    info!("session closed");
    Ok(())
}
