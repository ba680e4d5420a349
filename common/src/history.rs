use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{reconcile::GRILL_LABEL, types::Snapshot, value};

pub const SET_POINT_SERIES: &str = "SetPoint";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub name: String,
    pub points: Vec<SeriesPoint>,
}

/// One synthetic sample taken from a live snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Wall-clock epoch milliseconds.
    pub x: i64,
    pub temps: BTreeMap<String, i64>,
}

impl HistoryPoint {
    pub fn from_snapshot(snapshot: &Snapshot, now_ms: i64) -> Self {
        let mut temps = BTreeMap::new();
        temps.insert(GRILL_LABEL.to_string(), snapshot.grill_temp);
        temps.insert(SET_POINT_SERIES.to_string(), snapshot.set_point);
        // Keyed by device key so a probe named "Grill" cannot replace the pit reading.
        for probe in &snapshot.probes {
            temps.entry(probe.key.clone()).or_insert(probe.temp);
        }

        Self { x: now_ms, temps }
    }
}

/// Normalizes a `/history/refresh` response into named series.
///
/// Only the `chart_data` shape (optionally wrapped in a top-level `data`
/// object) is understood; anything else returns `None` and is ignored.
pub fn normalize_history(raw: &Value) -> Option<Vec<HistorySeries>> {
    let body = match raw.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    };
    let datasets = body.get("chart_data")?.as_array()?;

    let series = datasets
        .iter()
        .filter(|dataset| dataset.is_object())
        .map(|dataset| HistorySeries {
            name: value::text_or(dataset, "label", "Unknown"),
            points: normalize_points(dataset.get("data")),
        })
        .collect();

    Some(series)
}

fn normalize_points(raw: Option<&Value>) -> Vec<SeriesPoint> {
    let Some(points) = raw.and_then(Value::as_array) else {
        return Vec::new();
    };

    points
        .iter()
        .enumerate()
        .filter_map(|(index, point)| {
            let fallback_x = index as f64;
            if point.is_object() {
                // Points without a reading are dropped rather than zero-filled.
                let y = point.get("y").and_then(value::number)?;
                let x = point.get("x").and_then(value::number).unwrap_or(fallback_x);
                Some(SeriesPoint { x, y })
            } else {
                value::number(point).map(|y| SeriesPoint { x: fallback_x, y })
            }
        })
        .collect()
}

/// Emits at most one [`HistoryPoint`] per interval while streaming is on.
#[derive(Debug, Clone)]
pub struct HistorySampler {
    active: bool,
    interval_ms: i64,
    last_emit_ms: Option<i64>,
}

impl HistorySampler {
    pub fn new(interval_ms: u64) -> Self {
        Self {
            active: false,
            interval_ms: i64::try_from(interval_ms).unwrap_or(i64::MAX),
            last_emit_ms: None,
        }
    }

    pub fn start(&mut self) {
        self.active = true;
    }

    pub fn stop(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Call after each successful reconciliation with the fresh snapshot.
    pub fn sample(&mut self, snapshot: &Snapshot, now_ms: i64) -> Option<HistoryPoint> {
        if !self.active {
            return None;
        }

        if let Some(last) = self.last_emit_ms {
            if now_ms.saturating_sub(last) < self.interval_ms {
                return None;
            }
        }

        self.last_emit_ms = Some(now_ms);
        Some(HistoryPoint::from_snapshot(snapshot, now_ms))
    }
}
