use chrono::{NaiveDate, NaiveDateTime, NaiveTime, SubsecRound, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const PARSE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A point in time without an offset, as audit fields carry it on the wire.
///
/// The zero value is `0001-01-01T00:00:00`, not the unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// `0001-01-01T00:00:00`
    pub fn min() -> Self {
        let date = NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN);
        Self(date.and_time(NaiveTime::default()))
    }

    /// Current UTC time, truncated to whole seconds so it survives a trip over the wire.
    pub fn now() -> Self {
        Self(Utc::now().naive_utc().trunc_subsecs(0))
    }

    pub fn is_min(&self) -> bool {
        *self == Self::min()
    }

    pub fn inner(&self) -> NaiveDateTime {
        self.0
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::min()
    }
}

impl From<NaiveDateTime> for Timestamp {
    fn from(value: NaiveDateTime) -> Self {
        Self(value)
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format(WIRE_FORMAT))
    }
}

impl FromStr for Timestamp {
    type Err = chrono::ParseError;

    /// Fractions are dropped so a parsed value prints back as it compares.
    /// A bare date is midnight.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        NaiveDateTime::parse_from_str(s, PARSE_FORMAT)
            .or_else(|err| {
                NaiveDate::parse_from_str(s, DATE_FORMAT)
                    .map(|date| date.and_time(NaiveTime::default()))
                    .map_err(|_| err)
            })
            .map(|inner| Self(inner.trunc_subsecs(0)))
    }
}

impl Serialize for Timestamp {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_year_one() {
        assert_eq!("0001-01-01T00:00:00", Timestamp::default().to_string());
    }

    #[test]
    fn fraction_is_accepted_but_not_written() {
        let ts: Timestamp = "2024-03-05T10:11:12.345".parse().unwrap();
        assert_eq!("2024-03-05T10:11:12", ts.to_string());
    }

    #[test]
    fn fraction_is_dropped_so_display_parses_back_equal() {
        let ts: Timestamp = "2024-03-05T10:11:12.5".parse().unwrap();
        let shown: Timestamp = ts.to_string().parse().unwrap();
        assert_eq!(shown, ts);

        let from_json: Timestamp = serde_json::from_str("\"2024-03-05T10:11:12.999\"").unwrap();
        assert_eq!(shown, from_json);
    }

    #[test]
    fn bare_date_is_midnight() {
        let ts: Timestamp = "2020-01-01".parse().unwrap();
        assert_eq!("2020-01-01T00:00:00", ts.to_string());
        assert!("2020-13-01".parse::<Timestamp>().is_err());
    }

    #[test]
    fn serializes_as_plain_string() {
        let ts: Timestamp = "2024-03-05T10:11:12".parse().unwrap();
        assert_eq!(
            "\"2024-03-05T10:11:12\"",
            serde_json::to_string(&ts).unwrap()
        );
        let back: Timestamp = serde_json::from_str("\"2024-03-05T10:11:12\"").unwrap();
        assert_eq!(ts, back);
    }

    #[test]
    fn offset_is_rejected() {
        assert!("2024-03-05T10:11:12+02:00".parse::<Timestamp>().is_err());
    }

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(0, Timestamp::now().inner().and_utc().timestamp_subsec_nanos());
    }
}
