// Time zone access and date-time parsing
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// Supplies the zone used for "now" and for parsing zone-less input.
pub trait TimeZoneProvider: Send + Sync {
    fn time_zone(&self) -> FixedOffset;

    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().with_timezone(&self.time_zone())
    }
}

const ZONED_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%dT%H:%M:%S%.f%:z"];
const LOCAL_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a caller supplied date-time.
///
/// Accepts RFC 3339, ISO date-times with a numeric offset, zone-less
/// date-times and plain dates. Zone-less input is read in `zone`.
pub fn parse_date_time(raw: &str, zone: FixedOffset) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed);
    }
    for format in ZONED_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }
    for format in LOCAL_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return zone.from_local_datetime(&naive).single();
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .and_then(|naive| zone.from_local_datetime(&naive).single())
}

/// Whether a time lies within the first second of the epoch, which callers
/// use to mean "unset".
pub fn is_zero_epoch(time: &DateTime<FixedOffset>) -> bool {
    time.timestamp() == 0
}
