//! eventlink diagnostic client.
//!
//! Usage: `eventlink-client [config.yaml] [event_type | room=<id>]...`
//!
//! - Token from `EVENTLINK_TOKEN`
//! - Logs every subscribed event and each state transition until Ctrl-C

use std::sync::Arc;

use tracing_subscriber::{fmt, EnvFilter};

use eventlink_client::{config, EnvToken, RealtimeClient};

#[tokio::main]
async fn main() -> eventlink_core::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let mut args = std::env::args().skip(1).peekable();
    let path = match args.peek() {
        Some(a) if a.ends_with(".yaml") || a.ends_with(".yml") => args.next().unwrap_or_default(),
        _ => "eventlink.yaml".to_string(),
    };
    let cfg = if std::path::Path::new(&path).exists() {
        config::load_from_file(&path)?
    } else {
        tracing::info!(%path, "config file not found; using defaults");
        config::ClientConfig::default()
    };

    let client = RealtimeClient::websocket(cfg, Arc::new(EnvToken::new("EVENTLINK_TOKEN")));

    for arg in args {
        match arg.strip_prefix("room=") {
            Some(room) => client.join(room),
            None => {
                client.subscribe(&arg, None, |env| {
                    tracing::info!(event_type = %env.event_type, room = ?env.room(), payload = %env.payload, "event");
                    Ok(())
                });
            }
        }
    }

    let mut states = client.watch_state();
    client.connect()?;

    loop {
        tokio::select! {
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                tracing::info!(%state, "connection state");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    client.disconnect();
    println!("{}", client.render_stats());
    Ok(())
}
