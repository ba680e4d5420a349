pub const API_CURRENT: &str = "/api/current";
pub const API_HOPPER: &str = "/api/hopper";
pub const API_CONTROL: &str = "/api/control";
pub const API_SETTINGS: &str = "/api/settings";
pub const HISTORY_REFRESH: &str = "/history/refresh";

pub const REFERER_EVENTS: &str = "/events/";
pub const REFERER_DASH: &str = "/dash/";
pub const REFERER_HISTORY: &str = "/history/";
