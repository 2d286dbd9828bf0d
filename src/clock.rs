use chrono::{DateTime, Local, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::error::ZoneError;

/// Source of wall-clock time.
///
/// `DateTime<Utc>` carries no monotonic reading, so every deadline compared
/// against it follows system time changes such as suspend/resume.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Timezone used to read and render clock times.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Local,
    Named(Tz),
}

impl Zone {
    /// Resolves an IANA name; `None` or an empty name means the local zone.
    pub fn resolve(name: Option<&str>) -> Result<Self, ZoneError> {
        match name.map(str::trim) {
            None | Some("") => Ok(Zone::Local),
            Some(name) => name
                .parse::<Tz>()
                .map(Zone::Named)
                .map_err(|_| ZoneError::Unknown(name.to_string())),
        }
    }

    pub fn short_time(&self, instant: DateTime<Utc>) -> String {
        match self {
            Zone::Local => short_time(&instant.with_timezone(&Local)),
            Zone::Named(tz) => short_time(&instant.with_timezone(tz)),
        }
    }
}

/// Renders a clock time as `130p`, `9a` or `12a`; the minute field is
/// omitted when it is zero.
pub fn short_time<Z: TimeZone>(t: &DateTime<Z>) -> String {
    let (pm, hour) = t.hour12();
    let period = if pm { 'p' } else { 'a' };
    match t.minute() {
        0 => format!("{hour}{period}"),
        min => format!("{hour}{min:02}{period}"),
    }
}
