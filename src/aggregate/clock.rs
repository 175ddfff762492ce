use chrono::{DateTime, FixedOffset, Local, Offset, Utc};
use chrono_tz::Tz;

/// Timezone report timestamps are rendered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportTimezone {
    /// IANA zone such as `Europe/Moscow`; daylight-saving changes apply.
    Named(Tz),
    /// Constant offset from UTC.
    Fixed(FixedOffset),
}

impl ReportTimezone {
    /// Converts `instant` into this zone using the offset in effect at that
    /// instant.
    pub fn localize(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            Self::Named(zone) => {
                let local = instant.with_timezone(zone);
                local.with_timezone(&local.offset().fix())
            }
            Self::Fixed(offset) => instant.with_timezone(offset),
        }
    }
}

impl From<Tz> for ReportTimezone {
    fn from(zone: Tz) -> Self {
        Self::Named(zone)
    }
}

impl From<FixedOffset> for ReportTimezone {
    fn from(offset: FixedOffset) -> Self {
        Self::Fixed(offset)
    }
}

/// Wall-clock source for report timestamps, pinned to a [`ReportTimezone`]
/// when the store expects one and following the local zone otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WallClock {
    zone: Option<ReportTimezone>,
}

impl WallClock {
    pub fn local() -> Self {
        Self { zone: None }
    }

    pub fn with_zone(zone: Option<ReportTimezone>) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> Option<ReportTimezone> {
        self.zone
    }

    /// Renders `instant` in the configured zone, or the local one.
    pub fn at(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self.zone {
            Some(zone) => zone.localize(instant),
            None => {
                let local = instant.with_timezone(&Local);
                local.with_timezone(local.offset())
            }
        }
    }

    pub fn now(&self) -> DateTime<FixedOffset> {
        self.at(Utc::now())
    }
}
