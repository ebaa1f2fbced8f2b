//! Timestamps written as fixed-width RFC 3339 (microseconds, `Z` suffix) so
//! stored values order correctly as text.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Micros, true))
}

pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    DateTime::<Utc>::deserialize(deserializer)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Stamp {
        #[serde(with = "super")]
        at: chrono::DateTime<Utc>,
    }

    fn written(at: chrono::DateTime<Utc>) -> String {
        serde_json::to_value(Stamp { at }).unwrap()["at"].as_str().unwrap().to_string()
    }

    #[test]
    fn width_does_not_depend_on_the_fraction() {
        let base = Utc.with_ymd_and_hms(2025, 6, 1, 10, 0, 0).unwrap();
        assert_eq!(written(base), "2025-06-01T10:00:00.000000Z");
        assert_eq!(
            written(base + Duration::microseconds(120_500)),
            "2025-06-01T10:00:00.120500Z"
        );
        assert!(written(base + Duration::milliseconds(120)) < written(base + Duration::microseconds(120_500)));
    }
}
