use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Time of day at second precision. Every time that enters the crate goes
/// through [`SlotTime::parse`] or [`SlotTime::from_time`], so `"09:00"` and
/// `"09:00:00"` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(NaiveTime);

impl SlotTime {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        let s = s.trim();
        let parts: Vec<&str> = s.split(':').collect();
        if parts.len() != 2 && parts.len() != 3 {
            return Err(anyhow::anyhow!("invalid time format: {s}"));
        }
        // u32::from_str takes a leading '+', so digits are checked first
        let number = |part: &str, what: &str| -> anyhow::Result<u32> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(anyhow::anyhow!("invalid {what} in: {s}"));
            }
            part.parse().map_err(|_| anyhow::anyhow!("invalid {what} in: {s}"))
        };
        let hour = number(parts[0], "hour")?;
        let minute = number(parts[1], "minute")?;
        // Fractional seconds ("00.000") are dropped.
        let second = match parts.get(2) {
            Some(sec) => number(sec.split('.').next().unwrap_or_default(), "second")?,
            None => 0,
        };
        NaiveTime::from_hms_opt(hour, minute, second)
            .map(SlotTime)
            .ok_or_else(|| anyhow::anyhow!("time out of range: {s}"))
    }

    pub fn from_time(time: NaiveTime) -> Self {
        Self(time.with_nanosecond(0).unwrap_or(time))
    }

    pub fn as_naive(&self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M:%S"))
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        SlotTime::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// A grid cell address: the teacher's local calendar day plus time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalSlot {
    pub date: NaiveDate,
    pub time: SlotTime,
}

impl LocalSlot {
    pub fn new(date: NaiveDate, time: SlotTime) -> Self {
        Self { date, time }
    }

    /// Places a UTC instant on the teacher's local calendar. The day key comes
    /// from the local date, never from the UTC date.
    pub fn from_instant(at: DateTime<Utc>, tz: &Tz) -> Self {
        let local = at.with_timezone(tz);
        Self {
            date: local.date_naive(),
            time: SlotTime::from_time(local.time()),
        }
    }

    /// Returns `None` when the local time falls in a DST gap. Ambiguous times
    /// resolve to the earlier instant.
    pub fn to_utc(&self, tz: &Tz) -> Option<DateTime<Utc>> {
        tz.from_local_datetime(&self.date.and_time(self.time.as_naive()))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Day-of-week index as the backend encodes it: 0 = Sunday .. 6 = Saturday.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

pub fn weekday_label(date: NaiveDate) -> String {
    date.format("%a").to_string().to_lowercase()
}

/// One entry of an academy's recurring weekly template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperatingSlot {
    pub academy_id: Option<String>,
    pub day_of_week: u8,
    pub time: SlotTime,
    pub is_available: bool,
}
