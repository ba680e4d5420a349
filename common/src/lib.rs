pub mod commands;
pub mod config;
pub mod endpoints;
pub mod history;
pub mod hopper;
pub mod mock;
pub mod reconcile;
pub mod types;
pub mod value;

pub use commands::{CommandIntent, CommandPlan, DeviceRequest, PowerCommand};
pub use config::{BridgeConfig, RuntimeConfig, ServerConfig, ServerSelection};
pub use endpoints::*;
pub use history::{normalize_history, HistoryPoint, HistorySampler, HistorySeries, SeriesPoint};
pub use hopper::{HopperCache, HopperDetails};
pub use mock::mock_device_payload;
pub use reconcile::{phase_progress, reconcile, Reconciliation};
pub use types::{Field, Probe, Snapshot, StateChange, Units};
