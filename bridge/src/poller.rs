use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tokio::{
    sync::{mpsc, oneshot},
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use pifire_common::{
    mock_device_payload, normalize_history, reconcile, BridgeConfig, CommandIntent, Field,
    HistoryPoint, HistorySampler, HistorySeries, HopperCache, ServerConfig, ServerSelection,
    Snapshot, StateChange,
};
use serde_json::Value;

use crate::{
    client::{ClientError, DeviceClient, PollOutcome},
    dispatcher,
};

/// Everything the presentation layer is told about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum BridgeEvent {
    State(StateChange),
    HistoryPoint(HistoryPoint),
    History(Vec<HistorySeries>),
    #[serde(rename_all = "camelCase")]
    ServerChanged {
        selection: ServerSelection,
        custom_ip: String,
        base_url: String,
    },
}

/// Everything the presentation layer can ask for.
#[derive(Debug)]
pub enum BridgeRequest {
    Command(CommandIntent),
    FetchHistory { minutes: u32 },
    StartHistoryStream,
    StopHistoryStream,
    SetServer(ServerConfig),
    Snapshot(oneshot::Sender<Snapshot>),
}

#[derive(Debug)]
enum WorkerResult {
    Poll(PollOutcome),
    History(Vec<HistorySeries>),
}

#[derive(Debug, Clone)]
pub struct BridgeHandle {
    requests: mpsc::UnboundedSender<BridgeRequest>,
}

impl BridgeHandle {
    /// Returns `false` once the bridge has stopped.
    pub fn request(&self, request: BridgeRequest) -> bool {
        self.requests.send(request).is_ok()
    }

    pub fn command(&self, intent: CommandIntent) -> bool {
        self.request(BridgeRequest::Command(intent))
    }

    pub fn fetch_history(&self, minutes: u32) -> bool {
        self.request(BridgeRequest::FetchHistory { minutes })
    }

    pub fn set_history_stream(&self, active: bool) -> bool {
        if active {
            self.request(BridgeRequest::StartHistoryStream)
        } else {
            self.request(BridgeRequest::StopHistoryStream)
        }
    }

    pub fn set_server(&self, server: ServerConfig) -> bool {
        self.request(BridgeRequest::SetServer(server))
    }

    pub async fn snapshot(&self) -> Option<Snapshot> {
        let (reply, response) = oneshot::channel();
        if !self.request(BridgeRequest::Snapshot(reply)) {
            return None;
        }
        response.await.ok()
    }
}

/// Sole owner of the snapshot. Network work happens on spawned tasks whose
/// results come back through `results` and are applied here, one at a time.
pub struct Bridge {
    state: BridgeState,
    requests: mpsc::UnboundedReceiver<BridgeRequest>,
    results: mpsc::UnboundedReceiver<WorkerResult>,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        server: ServerConfig,
    ) -> Result<(Self, BridgeHandle, mpsc::UnboundedReceiver<BridgeEvent>), ClientError> {
        let client = DeviceClient::new(server.base_url(), &config)?;
        let (requests_tx, requests) = mpsc::unbounded_channel();
        let (results_tx, results) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();

        let state = BridgeState {
            sampler: HistorySampler::new(config.history_sample_interval_ms),
            config,
            server,
            client: Arc::new(client),
            snapshot: Snapshot::default(),
            hopper: HopperCache::default(),
            in_flight: false,
            offline: false,
            events: events_tx,
            results: results_tx,
        };

        let bridge = Self {
            state,
            requests,
            results,
        };
        let handle = BridgeHandle {
            requests: requests_tx,
        };
        Ok((bridge, handle, events))
    }

    /// Runs until every [`BridgeHandle`] has been dropped.
    pub async fn run(self) {
        let Self {
            mut state,
            mut requests,
            mut results,
        } = self;

        let mut interval =
            tokio::time::interval(Duration::from_millis(state.config.poll_interval_ms));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("polling {} every {:?}", state.client.base_url(), interval.period());

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    state.on_tick();
                }
                Some(result) = results.recv() => match result {
                    WorkerResult::Poll(outcome) => state.apply_poll(outcome, now_ms()),
                    WorkerResult::History(series) => state.emit(BridgeEvent::History(series)),
                },
                request = requests.recv() => match request {
                    Some(request) => state.handle_request(request),
                    None => break,
                },
            }
        }

        info!("bridge stopped");
    }
}

struct BridgeState {
    config: BridgeConfig,
    server: ServerConfig,
    client: Arc<DeviceClient>,
    snapshot: Snapshot,
    hopper: HopperCache,
    sampler: HistorySampler,
    in_flight: bool,
    offline: bool,
    events: mpsc::UnboundedSender<BridgeEvent>,
    results: mpsc::UnboundedSender<WorkerResult>,
}

impl BridgeState {
    /// Starts a poll unless one is still outstanding. Skipped ticks are not
    /// queued.
    fn on_tick(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;

        let client = Arc::clone(&self.client);
        let results = self.results.clone();
        tokio::spawn(async move {
            let outcome = client.poll().await;
            let _ = results.send(WorkerResult::Poll(outcome));
        });
        true
    }

    fn apply_poll(&mut self, outcome: PollOutcome, now_ms: i64) {
        self.in_flight = false;

        match outcome {
            PollOutcome::Fetched { device, hopper } => {
                if self.offline {
                    info!("device at {} is reachable again", self.client.base_url());
                    self.offline = false;
                }
                if let Some(raw) = hopper {
                    self.hopper.update(&raw);
                }

                self.apply_payload(&device);

                if let Some(point) = self.sampler.sample(&self.snapshot, now_ms) {
                    self.emit(BridgeEvent::HistoryPoint(point));
                }
            }
            PollOutcome::Unreachable => {
                if !self.offline {
                    warn!(
                        "connection to {} failed, using mock data",
                        self.client.base_url()
                    );
                    self.offline = true;
                }
                self.apply_payload(&mock_device_payload());
            }
            PollOutcome::Failed(message) => {
                warn!("device update error: {message}");
                if self.snapshot.display_mode != message {
                    self.snapshot.display_mode = message;
                    self.emit_change(Field::DisplayMode);
                }
            }
        }
    }

    fn apply_payload(&mut self, device: &Value) {
        let result = reconcile(&self.snapshot, device, self.hopper.get());
        self.snapshot = result.snapshot;
        for field in result.changes {
            self.emit_change(field);
        }
    }

    fn handle_request(&mut self, request: BridgeRequest) {
        match request {
            BridgeRequest::Command(intent) => {
                dispatcher::dispatch(Arc::clone(&self.client), intent);
            }
            BridgeRequest::FetchHistory { minutes } => self.spawn_history_fetch(minutes),
            BridgeRequest::StartHistoryStream => {
                debug!("history stream enabled");
                self.sampler.start();
            }
            BridgeRequest::StopHistoryStream => {
                debug!("history stream disabled");
                self.sampler.stop();
            }
            BridgeRequest::SetServer(server) => self.set_server(server),
            BridgeRequest::Snapshot(reply) => {
                let _ = reply.send(self.snapshot.clone());
            }
        }
    }

    fn spawn_history_fetch(&self, minutes: u32) {
        let client = Arc::clone(&self.client);
        let results = self.results.clone();
        tokio::spawn(async move {
            info!("fetching {minutes} minutes of history");
            match client.fetch_history(minutes).await {
                Ok(raw) => match normalize_history(&raw) {
                    Some(series) => {
                        let _ = results.send(WorkerResult::History(series));
                    }
                    None => warn!("ignoring history payload in an unsupported shape"),
                },
                Err(err) => warn!("history fetch failed: {err}"),
            }
        });
    }

    fn set_server(&mut self, server: ServerConfig) {
        let base_url = server.base_url();
        match DeviceClient::new(base_url.clone(), &self.config) {
            Ok(client) => {
                info!("base url updated to {base_url}");
                self.client = Arc::new(client);
                self.offline = false;
                self.emit(BridgeEvent::ServerChanged {
                    selection: server.server_selection,
                    custom_ip: server.custom_ip.clone(),
                    base_url,
                });
                self.server = server;
            }
            Err(err) => warn!("keeping {}: {err}", self.server.base_url()),
        }
    }

    fn emit_change(&self, field: Field) {
        self.emit(BridgeEvent::State(self.snapshot.change_for(field)));
    }

    fn emit(&self, event: BridgeEvent) {
        if self.events.send(event).is_err() {
            debug!("no event consumer attached");
        }
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
