//! Light Meter binary
//!
//! Shows ambient-light or camera-exposure telemetry in the terminal or in a
//! browser.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use light_meter::readings::camera::CameraInfo;
use light_meter::readings::light::LightSensorInfo;
use light_meter::{
    start_web_server, Activation, DisplayFrame, DisplayMode, DisplayState, IioLightSensor, Meter,
    MeterConfig, TelemetrySource, V4l2ExposureReader, WebConfig, DEFAULT_WEB_PORT,
};
use sysinfo::System;
use tracing::{info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "light_meter")]
#[command(about = "Ambient light and camera exposure meter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Reads lux from the ambient-light sensor or ISO, shutter speed and aperture from the camera")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// What to display (overrides the config file)
    #[arg(short, long, value_enum)]
    mode: Option<DisplayMode>,

    /// Hardware polling interval in milliseconds (overrides the config file)
    #[arg(short, long)]
    interval: Option<u64>,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show live readings in the terminal until Ctrl-C (default)
    Watch,

    /// Serve the display over HTTP and WebSocket
    Serve(ServeArgs),

    /// Take a single reading and exit
    Read(ReadArgs),

    /// List detected cameras and light sensors
    Devices,
}

#[derive(Args)]
struct ServeArgs {
    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Directory with a custom index.html
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum simultaneous viewers
    #[arg(long, default_value_t = 16)]
    max_viewers: usize,
}

#[derive(Args)]
struct ReadArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;
    let config = load_config(&cli)?;

    match &cli.command {
        None | Some(Commands::Watch) => watch_command(&config).await,
        Some(Commands::Serve(args)) => serve_command(&config, args).await,
        Some(Commands::Read(args)) => read_command(&config, args).await,
        Some(Commands::Devices) => devices_command(&config),
    }
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), directives.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install the log subscriber")?;

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` directives win; without them the flag-selected level applies.
fn log_filter(level: Level, directives: Option<&str>) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .parse_lossy(directives.unwrap_or_default())
}

fn load_config(cli: &Cli) -> anyhow::Result<MeterConfig> {
    let mut config = match &cli.config {
        Some(path) => MeterConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MeterConfig::default(),
    };

    if let Some(mode) = cli.mode {
        config = config.with_mode(mode);
    }
    if let Some(interval) = cli.interval {
        config = config.with_interval_ms(interval);
    }
    config.validate()?;
    Ok(config)
}

async fn watch_command(config: &MeterConfig) -> anyhow::Result<()> {
    let mut meter = Meter::from_config(config);
    let panel = meter.panel();
    let mut frames = panel.subscribe();

    match meter.on_visible().await? {
        Activation::Started | Activation::AlreadyActive => {}
        Activation::CapabilityMissing | Activation::PermissionPending => {
            print_frame(&panel.current());
            return Ok(());
        }
    }
    info!("Watching {} readings, press Ctrl-C to stop", config.mode);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            changed = frames.changed() => {
                if changed.is_err() {
                    break;
                }
                let frame = frames.borrow_and_update().clone();
                if !frame.lines.is_empty() {
                    print_frame(&frame);
                }
                // The subscription ended on its own: the hardware went away.
                if frame.state == DisplayState::Inactive {
                    break;
                }
            }
        }
    }

    meter.on_hidden().await;
    Ok(())
}

async fn serve_command(config: &MeterConfig, args: &ServeArgs) -> anyhow::Result<()> {
    let web_config = WebConfig::new(&args.host, args.port)
        .with_static_path(args.static_dir.clone())
        .with_cors(!args.no_cors)
        .with_max_viewers(args.max_viewers);

    info!("Web server configuration:");
    info!("  - Bind address: {}", web_config.bind_address());
    info!("  - Mode: {}", config.mode);
    info!("  - CORS enabled: {}", web_config.enable_cors);
    info!("  - Max viewers: {}", web_config.max_viewers);
    info!("  - Polling interval: {}ms", config.interval_ms);

    start_web_server(web_config, Meter::from_config(config)).await?;
    Ok(())
}

async fn read_command(config: &MeterConfig, args: &ReadArgs) -> anyhow::Result<()> {
    let mut meter = Meter::from_config(config);
    let frame = meter.read_once().await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&frame)?),
        "pretty" => print_frame(&frame),
        other => anyhow::bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }
    Ok(())
}

fn devices_command(config: &MeterConfig) -> anyhow::Result<()> {
    println!("Host:");
    println!(
        "  {} ({} {}, kernel {})",
        System::host_name().unwrap_or_else(|| "unknown".to_string()),
        System::name().unwrap_or_else(|| "unknown".to_string()),
        System::os_version().unwrap_or_default(),
        System::kernel_version().unwrap_or_else(|| "unknown".to_string())
    );
    println!();

    let sensors = IioLightSensor::enumerate(&config.iio_root);
    println!("Light sensors:");
    if sensors.is_empty() {
        println!("  none");
    }
    for LightSensorInfo { path, name } in &sensors {
        println!(
            "  {} ({})",
            path.display(),
            name.as_deref().unwrap_or("unnamed")
        );
    }
    println!();

    let cameras = V4l2ExposureReader::enumerate(&config.video_root, &config.dev_root);
    println!("Cameras:");
    if cameras.is_empty() {
        println!("  none");
    }
    for CameraInfo { node, name, .. } in &cameras {
        println!("  {} ({})", node.display(), name.as_deref().unwrap_or("unnamed"));
    }
    println!();

    let camera_access = V4l2ExposureReader::new(config).probe();
    println!("Default camera access: {}", serde_json::to_string(&camera_access)?);
    Ok(())
}

fn print_frame(frame: &DisplayFrame) {
    let time = chrono::DateTime::from_timestamp_millis(frame.timestamp as i64)
        .unwrap_or_default()
        .format("%H:%M:%S");
    println!("[{}] {}", time, frame.lines.join("  |  "));
}
