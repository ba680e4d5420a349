use std::collections::{BTreeMap, HashMap};

use serde_json::{Map, Value};

use crate::{
    hopper::HopperDetails,
    types::{Field, Probe, Snapshot, Units},
    value,
};

/// Probe label the device uses for the pit itself; its target is the set-point.
pub const GRILL_LABEL: &str = "Grill";

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub snapshot: Snapshot,
    pub changes: Vec<Field>,
}

/// Derives a new snapshot from a `/api/current` payload and diffs it against
/// `previous`. Missing or malformed keys fall back to defaults; this never fails.
pub fn reconcile(
    previous: &Snapshot,
    device: &Value,
    hopper: Option<&HopperDetails>,
) -> Reconciliation {
    let status = value::object(device, "status");
    let current = value::object(device, "current");
    let grill_readings = value::object(current, "P");
    let food_readings = value::object(current, "F");

    let start_duration = value::float_or(status, "start_duration", 0.0);
    let startup_timestamp = value::float_or(status, "startup_timestamp", 0.0);
    let prime_duration = value::float_or(status, "prime_duration", 0.0);
    let mode_start_time = value::float_or(status, "start_time", 0.0);
    let device_now = device_seconds(value::float_or(current, "TS", 0.0));

    let notify = NotifySummary::collect(device.get("notify_data"));

    let set_point = [
        value::int_or(current, "PSP", 0),
        value::int_or(status, "primary_setpoint", 0),
        value::int_or(status, "set_point", 0),
        notify.grill_target,
    ]
    .into_iter()
    .find(|candidate| *candidate != 0)
    .unwrap_or(0);

    let probe_status = value::object(value::object(status, "probe_status"), "F");
    let probes = materialize_probes(food_readings, probe_status, &notify);

    let hopper = match hopper {
        Some(details) => details.merge_into(notify.hopper.clone()),
        None => notify.hopper.clone(),
    };

    let snapshot = Snapshot {
        mode: value::text_or(status, "mode", "Unknown"),
        display_mode: value::text_or(status, "display_mode", "Unknown"),
        outpins: outpins(status),
        lid_open: value::bool_or(status, "lid_open_detected", false),
        smoke_plus: value::bool_or(status, "s_plus", false),
        p_mode: value::text_or(status, "p_mode", "--"),
        units: Units::from_device(&value::text_or(status, "units", "C")),
        grill_temp: value::int_or(grill_readings, GRILL_LABEL, 0),
        set_point,
        probes,
        timers: notify.timers,
        hopper,
        start_duration: value::truncate(start_duration),
        start_time: startup_timestamp,
        startup_progress: phase_progress(start_duration, startup_timestamp, device_now),
        prime_duration: value::truncate(prime_duration),
        mode_start_time,
        prime_progress: phase_progress(prime_duration, mode_start_time, device_now),
    };

    let changes = previous.diff(&snapshot);
    Reconciliation { snapshot, changes }
}

/// Fraction of a timed phase that has elapsed, in `[0.0, 1.0]`. All inputs
/// are seconds; any non-positive input yields `0.0`.
pub fn phase_progress(duration: f64, reference: f64, now: f64) -> f64 {
    if !(duration > 0.0 && reference > 0.0 && now > 0.0) {
        return 0.0;
    }
    ((now - reference) / duration).clamp(0.0, 1.0)
}

/// The device reports its tick time in milliseconds.
fn device_seconds(ts_ms: f64) -> f64 {
    if ts_ms > 0.0 {
        ts_ms / 1000.0
    } else {
        0.0
    }
}

fn outpins(status: &Value) -> BTreeMap<String, bool> {
    status
        .get("outpins")
        .and_then(Value::as_object)
        .map(|pins| {
            pins.iter()
                .map(|(pin, state)| (pin.clone(), value::truthy(state)))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Default)]
struct NotifySummary {
    grill_target: i64,
    targets: HashMap<String, i64>,
    names: HashMap<String, String>,
    timers: Vec<Value>,
    hopper: Map<String, Value>,
}

impl NotifySummary {
    fn collect(notify_data: Option<&Value>) -> Self {
        let mut summary = Self::default();
        let Some(items) = notify_data.and_then(Value::as_array) else {
            return summary;
        };

        for item in items {
            let Some(record) = item.as_object() else {
                continue;
            };

            match record.get("type").and_then(Value::as_str) {
                Some("probe") => summary.add_probe(item),
                Some("timer") => summary.timers.push(item.clone()),
                Some("hopper") => summary.hopper = record.clone(),
                _ => {}
            }
        }

        summary
    }

    fn add_probe(&mut self, item: &Value) {
        let Some(label) = item.get("label").and_then(Value::as_str) else {
            return;
        };
        let target = value::int_or(item, "target", 0);

        if label == GRILL_LABEL {
            if self.grill_target == 0 {
                self.grill_target = target;
            }
            return;
        }

        self.targets.insert(label.to_string(), target);
        if item.get("name").is_some() {
            self.names
                .insert(label.to_string(), value::text_or(item, "name", label));
        }
    }
}

fn materialize_probes(
    readings: &Value,
    probe_status: &Value,
    notify: &NotifySummary,
) -> Vec<Probe> {
    let mut keys: Vec<&String> = match readings.as_object() {
        Some(readings) => readings.keys().collect(),
        None => return Vec::new(),
    };
    keys.sort();

    keys.into_iter()
        .filter(|key| value::bool_or(value::object(probe_status, key), "enabled", false))
        .map(|key| Probe {
            key: key.clone(),
            name: notify.names.get(key).cloned().unwrap_or_else(|| key.clone()),
            temp: value::int_or(readings, key, 0),
            target: notify.targets.get(key).copied().unwrap_or(0),
        })
        .collect()
}
