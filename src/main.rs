use anyhow::Result;
use clap::Parser;
use log::{info, warn};
use rg_kiosk::config::{KioskConfig, StartupParams};
use rg_kiosk::console::{parse_line, ConsoleCommand, HELP};
use rg_kiosk::KioskApp;
use rg_kiosk_core::{ChannelTransport, ChannelTransportHandle, Credential, DisplaySnapshot};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// rg-Kiosk - An always-on display that rotates self-contained content modules
#[derive(Parser, Debug, Clone)]
#[command(name = "rg-kiosk")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Module to show at start-up, matched by name. Pins the display.
    #[arg(long, value_name = "NAME")]
    app: Option<String>,

    /// Running on the physical display (no preview scaling)
    #[arg(long = "on-device")]
    on_device: bool,

    /// Credential token for modules that call authenticated services
    #[arg(long, value_name = "TOKEN")]
    credential: Option<String>,

    /// Pin clock modules to a fixed time
    #[arg(long, value_name = "HH:MM")]
    time: Option<String>,

    /// URL-style start-up parameters (e.g. "app=Clock&onDevice=true&fccApiKey=...")
    #[arg(short = 'q', long = "query", value_name = "QUERY")]
    query: Option<String>,

    /// Configuration file to load instead of the default location
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Debug verbosity level (0=quiet, 1=info, 2=debug, 3=trace)
    #[arg(short = 'd', long = "debug", value_name = "LEVEL", default_value = "0")]
    debug: u8,
}

impl Cli {
    /// Query-string parameters overlaid with explicit flags
    fn startup_params(&self) -> StartupParams {
        let from_query = self
            .query
            .as_deref()
            .map(StartupParams::from_query)
            .unwrap_or_default();
        let from_flags = StartupParams {
            app: self.app.clone(),
            on_device: self.on_device,
            credential: self.credential.as_deref().and_then(Credential::new),
            time: self.time.clone(),
        };
        from_query.overridden_by(from_flags)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Level 0 (default): warn only
    // Level 1: info
    // Level 2: debug
    // Level 3+: trace
    let log_level = match cli.debug {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    warn!("Starting rg-Kiosk v{}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => KioskConfig::load_from_path(path)?,
        None => KioskConfig::load().unwrap_or_else(|e| {
            warn!("Failed to load config, using defaults: {:#}", e);
            KioskConfig::default()
        }),
    };

    let params = cli.startup_params();
    if params.on_device {
        info!("Running on device");
    }

    let mut app = KioskApp::start(&config, params)?;

    // Console notifications go through the same client as pushed ones
    let (transport, notifier) = ChannelTransport::new();
    app.attach_notifications(transport)?;

    let printer = spawn_snapshot_printer(app.session().subscribe());
    println!("{}", HELP);

    tokio::select! {
        result = run_console(&app, &notifier) => result?,
        _ = tokio::signal::ctrl_c() => info!("Interrupted"),
    }

    printer.abort();
    app.shutdown().await
}

/// Print every snapshot change as one JSON line
fn spawn_snapshot_printer(mut snapshots: watch::Receiver<DisplaySnapshot>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let line = serde_json::to_string(&*snapshots.borrow_and_update());
            match line {
                Ok(line) => println!("{}", line),
                Err(e) => warn!("Failed to serialize snapshot: {}", e),
            }
        }
    })
}

async fn run_console(app: &KioskApp, notifier: &ChannelTransportHandle) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        match parse_line(&line) {
            Ok(None) => {}
            Ok(Some(ConsoleCommand::Quit)) => break,
            Ok(Some(command)) => handle_command(app, notifier, command).await?,
            Err(e) => eprintln!("{}", e),
        }
    }
    Ok(())
}

async fn handle_command(
    app: &KioskApp,
    notifier: &ChannelTransportHandle,
    command: ConsoleCommand,
) -> Result<()> {
    match command {
        ConsoleCommand::Notify(notification) => {
            if !notifier.notify(notification.clone()) {
                warn!("Notification client is disconnected, showing directly");
                app.session().notify(notification).await?;
            }
        }
        ConsoleCommand::Dismiss(id) => app.session().dismiss(&id).await?,
        ConsoleCommand::Resize { width, height } => app.resize(width, height).await?,
        ConsoleCommand::Render => match app.render_current() {
            Some(view) => println!("{}", serde_json::to_string_pretty(&view)?),
            None => eprintln!("nothing to render"),
        },
        ConsoleCommand::Status => {
            println!("{}", serde_json::to_string_pretty(&app.session().snapshot())?)
        }
        ConsoleCommand::Help => println!("{}", HELP),
        command => {
            for display_command in command.display_commands() {
                app.session().command(display_command).await?;
            }
        }
    }
    Ok(())
}
