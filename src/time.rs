//! Capture timestamps, rendered in the timezone of the capture location.

use crate::session::LocationCoords;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tzf_rs::DefaultFinder;

const DISPLAY_FORMAT: &str = "%d/%m/%Y, %H:%M:%S %Z";

static FINDER: std::sync::LazyLock<DefaultFinder> = std::sync::LazyLock::new(DefaultFinder::new);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureTime {
    pub utc: DateTime<Utc>,
    /// Local wall-clock time with zone abbreviation, e.g. `15/01/2024, 10:30:00 WIB`.
    pub display: String,
    /// IANA name when resolved from coordinates, otherwise `"Local"`.
    pub timezone: String,
}

impl CaptureTime {
    /// Stamps `utc`, resolving the display zone from `location` when known
    /// and falling back to the system zone otherwise.
    pub fn at(utc: DateTime<Utc>, location: Option<&LocationCoords>) -> Self {
        if let Some(tz) = location.and_then(timezone_for) {
            return Self {
                utc,
                display: utc.with_timezone(&tz).format(DISPLAY_FORMAT).to_string(),
                timezone: tz.name().to_string(),
            };
        }

        Self {
            utc,
            display: utc.with_timezone(&Local).format(DISPLAY_FORMAT).to_string(),
            timezone: "Local".to_string(),
        }
    }

    pub fn now(location: Option<&LocationCoords>) -> Self {
        Self::at(Utc::now(), location)
    }

    /// ISO-8601 UTC with millisecond precision, as written to `DateTimeOriginal`.
    pub fn iso8601(&self) -> String {
        self.utc.to_rfc3339_opts(SecondsFormat::Millis, true)
    }
}

pub fn timezone_for(coords: &LocationCoords) -> Option<Tz> {
    Tz::from_str(FINDER.get_tz_name(coords.longitude, coords.latitude)).ok()
}
