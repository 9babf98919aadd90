// Fixed-offset time zone provider
use crate::application::time_zone::TimeZoneProvider;
use anyhow::Context;
use chrono::{FixedOffset, Offset, Utc};

#[derive(Debug, Clone, Copy)]
pub struct FixedTimeZoneProvider {
    offset: FixedOffset,
}

impl FixedTimeZoneProvider {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// Parse an offset such as `+01:00`, `-0530` or `Z`.
    pub fn from_setting(setting: Option<&str>) -> anyhow::Result<Self> {
        match setting.map(str::trim) {
            None | Some("") | Some("Z") | Some("UTC") => Ok(Self::utc()),
            Some(raw) => {
                let offset = raw
                    .parse::<FixedOffset>()
                    .with_context(|| format!("Invalid time zone offset '{}'", raw))?;
                Ok(Self::new(offset))
            }
        }
    }
}

impl TimeZoneProvider for FixedTimeZoneProvider {
    fn time_zone(&self) -> FixedOffset {
        self.offset
    }
}
