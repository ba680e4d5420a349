use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::endpoints::{API_CONTROL, API_SETTINGS};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerCommand {
    Startup,
    Shutdown,
    Smoke,
    Hold,
    Stop,
    Monitor,
}

impl PowerCommand {
    /// Mode name as the device expects it.
    pub fn as_mode(self) -> &'static str {
        match self {
            Self::Startup => "Startup",
            Self::Shutdown => "Shutdown",
            Self::Smoke => "Smoke",
            Self::Hold => "Hold",
            Self::Stop => "Stop",
            Self::Monitor => "Monitor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown power command '{0}'")]
pub struct UnknownCommand(pub String);

impl FromStr for PowerCommand {
    type Err = UnknownCommand;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "startup" => Ok(Self::Startup),
            "shutdown" => Ok(Self::Shutdown),
            "smoke" => Ok(Self::Smoke),
            "hold" => Ok(Self::Hold),
            "stop" => Ok(Self::Stop),
            "monitor" => Ok(Self::Monitor),
            _ => Err(UnknownCommand(raw.to_string())),
        }
    }
}

/// User intents relayed to the device. History fetches are handled separately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandIntent {
    Power(PowerCommand),
    Prime { amount: i64, next_mode: String },
    ToggleSmokePlus { current: bool },
    SetTargetTemp(i64),
    SetPMode(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceRequest {
    pub endpoint: &'static str,
    pub body: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandPlan {
    Single(DeviceRequest),
    /// Settings write followed by a control-endpoint trigger. The trigger is
    /// sent whether or not the settings write succeeded.
    SettingsThenTrigger {
        settings: DeviceRequest,
        trigger: DeviceRequest,
    },
}

impl CommandIntent {
    pub fn plan(&self) -> CommandPlan {
        match self {
            Self::Power(command) => {
                control(json!({"updated": true, "mode": command.as_mode()}))
            }
            Self::Prime { amount, next_mode } => control(json!({
                "updated": true,
                "mode": "Prime",
                "prime_amount": amount,
                "next_mode": next_mode
            })),
            Self::ToggleSmokePlus { current } => control(json!({"s_plus": !current})),
            Self::SetTargetTemp(temp) => control(json!({
                "updated": true,
                "mode": "Hold",
                "primary_setpoint": temp
            })),
            Self::SetPMode(p_mode) => CommandPlan::SettingsThenTrigger {
                settings: DeviceRequest {
                    endpoint: API_SETTINGS,
                    body: json!({"cycle_data": {"PMode": p_mode}}),
                },
                trigger: DeviceRequest {
                    endpoint: API_CONTROL,
                    body: json!({"settings_update": true}),
                },
            },
        }
    }
}

fn control(body: Value) -> CommandPlan {
    CommandPlan::Single(DeviceRequest {
        endpoint: API_CONTROL,
        body,
    })
}
