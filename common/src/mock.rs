use serde_json::{json, Value};

/// Canned `/api/current` payload applied while the device is unreachable.
pub fn mock_device_payload() -> Value {
    json!({
        "current": {
            "AUX": {},
            "F": {"Probe1": 85, "Probe2": 90},
            "NT": {"Grill": 0, "Probe1": 0, "Probe2": 0},
            "P": {"Grill": 24},
            "PSP": 0
        },
        "notify_data": [
            {"condition": "equal_above", "label": "Grill", "target": 110, "type": "probe"},
            {"condition": "equal_above", "label": "Probe1", "target": 95, "type": "probe"},
            {
                "keep_warm": false,
                "label": "Timer",
                "req": false,
                "shutdown": false,
                "type": "timer",
                "time_remaining": 300
            },
            {
                "keep_warm": false,
                "label": "Hopper",
                "last_check": 0,
                "req": true,
                "shutdown": false,
                "type": "hopper",
                "level": 80,
                "name": "Hickory"
            }
        ],
        "status": {
            "critical_error": false,
            "display_mode": "Startup",
            "lid_open_detected": true,
            "mode": "Startup",
            "outpins": {"auger": true, "fan": true, "igniter": false, "power": true},
            "s_plus": true,
            "p_mode": "4",
            "units": "C"
        }
    })
}
