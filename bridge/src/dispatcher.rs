use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use pifire_common::{CommandIntent, CommandPlan};

use crate::client::DeviceClient;

/// Sends `intent` on its own task. Nothing waits on it; the next poll shows
/// whether the device took the change.
pub fn dispatch(client: Arc<DeviceClient>, intent: CommandIntent) -> JoinHandle<()> {
    tokio::spawn(async move { execute(&client, &intent).await })
}

pub async fn execute(client: &DeviceClient, intent: &CommandIntent) {
    info!("sending command {intent:?} to {}", client.base_url());
    match intent.plan() {
        CommandPlan::Single(request) => client.send_command(&request).await,
        CommandPlan::SettingsThenTrigger { settings, trigger } => {
            client.send_settings_then_trigger(&settings, &trigger).await
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::testing::DeviceStub;
    use pifire_common::{BridgeConfig, PowerCommand, API_CONTROL, API_SETTINGS};

    #[tokio::test]
    async fn dispatched_commands_reach_the_device() {
        let stub = DeviceStub::default();
        let base_url = stub.spawn().await;
        let client = Arc::new(DeviceClient::new(base_url, &BridgeConfig::default()).unwrap());

        dispatch(client.clone(), CommandIntent::Power(PowerCommand::Startup))
            .await
            .unwrap();
        dispatch(
            client.clone(),
            CommandIntent::Prime {
                amount: 25,
                next_mode: "Startup".to_string(),
            },
        )
        .await
        .unwrap();
        dispatch(client.clone(), CommandIntent::ToggleSmokePlus { current: false })
            .await
            .unwrap();
        dispatch(client, CommandIntent::SetPMode(7)).await.unwrap();

        let received: Vec<(String, serde_json::Value)> = stub
            .received()
            .await
            .into_iter()
            .map(|request| (request.path, request.body))
            .collect();
        assert_eq!(
            received,
            vec![
                (API_CONTROL.to_string(), json!({"updated": true, "mode": "Startup"})),
                (
                    API_CONTROL.to_string(),
                    json!({"updated": true, "mode": "Prime", "prime_amount": 25, "next_mode": "Startup"})
                ),
                (API_CONTROL.to_string(), json!({"s_plus": true})),
                (API_SETTINGS.to_string(), json!({"cycle_data": {"PMode": 7}})),
                (API_CONTROL.to_string(), json!({"settings_update": true})),
            ]
        );
    }
}
