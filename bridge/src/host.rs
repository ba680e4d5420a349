use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

use pifire_common::{CommandIntent, ServerConfig, ServerSelection};

use crate::{
    console::{self, ConsoleCommand},
    poller::{Bridge, BridgeEvent, BridgeHandle},
    store::ConfigStore,
};

/// Runs the bridge with stdin as the command source and stdout as the event
/// sink, one JSON object per line. Logs go to stderr.
pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let store = ConfigStore::new();
    let mut runtime = store.load_runtime_config().await.unwrap_or_else(|err| {
        warn!("failed to load runtime config from store: {err:#}");
        Default::default()
    });
    runtime.bridge.sanitize();
    apply_server_overrides(
        &mut runtime.server,
        std::env::var("PIFIRE_SERVER").ok().as_deref(),
        std::env::var("PIFIRE_CUSTOM_IP").ok().as_deref(),
    );

    let (bridge, handle, mut events) = Bridge::new(runtime.bridge.clone(), runtime.server.clone())
        .context("failed to set up device client")?;
    info!(
        "mirroring {} ({})",
        runtime.server.base_url(),
        runtime.server.server_selection.as_str()
    );
    let bridge_task = tokio::spawn(bridge.run());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                if let BridgeEvent::ServerChanged { selection, custom_ip, .. } = &event {
                    let server = ServerConfig {
                        server_selection: *selection,
                        custom_ip: custom_ip.clone(),
                    };
                    if let Err(err) = store.save_server(&server).await {
                        warn!("failed to persist server selection: {err:#}");
                    }
                }
                println!("{}", event_line(&event)?);
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => handle_line(&handle, &line).await?,
                    None => {
                        info!("stdin closed, still mirroring until interrupted");
                        stdin_open = false;
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }

    drop(handle);
    bridge_task.await.context("bridge task panicked")?;
    Ok(())
}

async fn handle_line(handle: &BridgeHandle, line: &str) -> anyhow::Result<()> {
    let command = match console::parse_line(line) {
        Ok(command) => command,
        Err(err) => {
            warn!("{err}");
            return Ok(());
        }
    };

    let accepted = match command {
        ConsoleCommand::Power(power) => handle.command(CommandIntent::Power(power)),
        ConsoleCommand::Prime { amount, next_mode } => {
            handle.command(CommandIntent::Prime { amount, next_mode })
        }
        ConsoleCommand::ToggleSmokePlus => match handle.snapshot().await {
            Some(snapshot) => handle.command(CommandIntent::ToggleSmokePlus {
                current: snapshot.smoke_plus,
            }),
            None => false,
        },
        ConsoleCommand::SetTargetTemp(temp) => handle.command(CommandIntent::SetTargetTemp(temp)),
        ConsoleCommand::SetPMode(mode) => handle.command(CommandIntent::SetPMode(mode)),
        ConsoleCommand::FetchHistory { minutes } => handle.fetch_history(minutes),
        ConsoleCommand::Stream(active) => handle.set_history_stream(active),
        ConsoleCommand::SetServer(server) => handle.set_server(server),
        ConsoleCommand::Show => match handle.snapshot().await {
            Some(snapshot) => {
                println!("{}", serde_json::to_string(&snapshot)?);
                true
            }
            None => false,
        },
    };

    if !accepted {
        warn!("bridge is no longer running, dropped '{}'", line.trim());
    }
    Ok(())
}

fn apply_server_overrides(
    server: &mut ServerConfig,
    selection: Option<&str>,
    custom_ip: Option<&str>,
) {
    if let Some(selection) = selection {
        server.server_selection = ServerSelection::parse(selection);
    }
    if let Some(custom_ip) = custom_ip {
        server.custom_ip = custom_ip.to_string();
    }
}

fn event_line(event: &BridgeEvent) -> anyhow::Result<String> {
    serde_json::to_string(event).context("failed to encode event")
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use super::*;
    use pifire_common::{HistoryPoint, StateChange};

    fn decoded(event: &BridgeEvent) -> Value {
        serde_json::from_str(&event_line(event).unwrap()).unwrap()
    }

    #[test]
    fn state_events_carry_field_and_value() {
        assert_eq!(
            decoded(&BridgeEvent::State(StateChange::Mode("Hold".to_string()))),
            json!({"event": "state", "data": {"field": "mode", "value": "Hold"}})
        );
        assert_eq!(
            decoded(&BridgeEvent::State(StateChange::GrillTemp(225))),
            json!({"event": "state", "data": {"field": "grillTemp", "value": 225}})
        );
    }

    #[test]
    fn history_points_and_server_changes_encode_flat() {
        let point = HistoryPoint {
            x: 1_700_000_000_000,
            temps: BTreeMap::from([("Grill".to_string(), 225)]),
        };
        assert_eq!(
            decoded(&BridgeEvent::HistoryPoint(point)),
            json!({"event": "historyPoint", "data": {"x": 1_700_000_000_000_i64, "temps": {"Grill": 225}}})
        );
        assert_eq!(
            decoded(&BridgeEvent::ServerChanged {
                selection: ServerSelection::Localhost,
                custom_ip: String::new(),
                base_url: "http://localhost".to_string(),
            }),
            json!({
                "event": "serverChanged",
                "data": {"selection": "localhost", "customIp": "", "baseUrl": "http://localhost"}
            })
        );
    }

    #[test]
    fn environment_overrides_the_stored_server() {
        let mut server = ServerConfig::default();

        apply_server_overrides(&mut server, None, None);
        assert_eq!(server, ServerConfig::default());

        apply_server_overrides(&mut server, Some("Custom"), Some("10.0.0.7"));
        assert_eq!(server.server_selection, ServerSelection::Custom);
        assert_eq!(server.base_url(), "http://10.0.0.7");
    }
}
