pub mod client;
pub mod console;
pub mod dispatcher;
pub mod host;
pub mod poller;
pub mod store;

#[cfg(test)]
mod testing;

pub use client::{ClientError, DeviceClient, FetchError, PollOutcome};
pub use poller::{Bridge, BridgeEvent, BridgeHandle, BridgeRequest};
pub use store::ConfigStore;
