use chrono::{SecondsFormat, Utc};

/// Current UTC time as fixed-width RFC 3339, so string order is time order.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
