// Multipeer terminal host: console UI over the loopback hub with simulated neighbours.

mod config;
mod console;
mod neighbours;

use std::time::Duration;

use anyhow::Context;
use multipeer_core::{
    event_queue, FileSettings, IdentityStore, LoopbackHub, SessionController, UiCommand,
};
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("multipeer-linux {}", VERSION);
            return Ok(());
        }
    }

    let cfg = config::load()?;
    init_logging(&cfg.log_filter);

    let tag = cfg.service_tag.clone();
    let device_name = cfg.device_name();
    let settings_path = cfg.settings_file();
    let identity = IdentityStore::new(FileSettings::open(&settings_path))
        .get_or_create_identity(&device_name)
        .with_context(|| format!("saving identity to {}", settings_path.display()))?;

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async move {
        let hub = LoopbackHub::new();
        neighbours::spawn(&hub, &tag, cfg.neighbours);

        let (tx, queue) = event_queue();
        let transport = hub.attach(&identity, tx.clone());
        let surface = console::ConsoleSurface::new(hub.clone());
        let controller =
            SessionController::new(identity, tag, Box::new(transport), Box::new(surface));

        println!(
            "{} on {}: type a message, /browse to find peers, /clear, /quit",
            controller.identity().display_name(),
            controller.service_tag()
        );
        tokio::spawn(console::read_commands(tx.clone()));
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(()) => {
                    tx.command(UiCommand::Shutdown);
                }
                Err(e) => tracing::warn!(error = %e, "cannot listen for shutdown signals"),
            }
        });
        queue.run(controller).await;
        anyhow::Ok(())
    });
    // stdin reads sit on a blocking thread that never finishes on its own.
    rt.shutdown_timeout(Duration::from_millis(100));
    result
}

fn init_logging(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Wait for Ctrl+C or SIGTERM (Unix).
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            r = tokio::signal::ctrl_c() => r?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
