//! Timestamp and duration rendering used by monitoring reports.

use chrono::{DateTime, SecondsFormat, Utc};
use std::time::Duration;

const MILLIS_PER_SECOND: u128 = 1_000;
const MILLIS_PER_MINUTE: u128 = 60 * MILLIS_PER_SECOND;
const MILLIS_PER_HOUR: u128 = 60 * MILLIS_PER_MINUTE;
const MILLIS_PER_DAY: u128 = 24 * MILLIS_PER_HOUR;

/// Format an instant as ISO-8601 with millisecond precision, e.g.
/// `2024-05-01T10:15:30.042Z`.
#[must_use]
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Elapsed time between `start` and `now`, clamped at zero when the wall
/// clock stepped backwards.
#[must_use]
pub fn elapsed_between(start: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (now - start).to_std().unwrap_or_default()
}

/// Format a duration as an XML Schema `xs:duration`, millisecond precision.
///
/// Zero-valued components are omitted: `PT0S`, `PT1.5S`, `PT2M`, `P1DT3H`.
#[must_use]
pub fn format_xml_duration(elapsed: Duration) -> String {
    let total = elapsed.as_millis();
    let days = total / MILLIS_PER_DAY;
    let hours = (total % MILLIS_PER_DAY) / MILLIS_PER_HOUR;
    let minutes = (total % MILLIS_PER_HOUR) / MILLIS_PER_MINUTE;
    let seconds = (total % MILLIS_PER_MINUTE) / MILLIS_PER_SECOND;
    let millis = total % MILLIS_PER_SECOND;

    let mut output = String::from("P");
    if days > 0 {
        output.push_str(&format!("{days}D"));
    }

    let has_time = hours > 0 || minutes > 0 || seconds > 0 || millis > 0;
    if !has_time && days > 0 {
        return output;
    }

    output.push('T');
    if hours > 0 {
        output.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        output.push_str(&format!("{minutes}M"));
    }
    if millis > 0 {
        let fraction = format!("{millis:03}");
        output.push_str(&format!("{seconds}.{}S", fraction.trim_end_matches('0')));
    } else if seconds > 0 || !has_time {
        output.push_str(&format!("{seconds}S"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn xml_duration_examples() {
        let cases = [
            (0, "PT0S"),
            (1, "PT0.001S"),
            (1_500, "PT1.5S"),
            (120_000, "PT2M"),
            (3_723_450, "PT1H2M3.45S"),
            (86_400_000, "P1D"),
            (97_200_000, "P1DT3H"),
        ];
        for (millis, expected) in cases {
            assert_eq!(
                format_xml_duration(Duration::from_millis(millis)),
                expected,
                "{millis}ms"
            );
        }
    }

    #[test]
    fn timestamp_uses_millisecond_precision() {
        let at = Utc
            .timestamp_millis_opt(1_714_558_530_042)
            .single()
            .unwrap_or_default();
        assert_eq!(format_timestamp(at), "2024-05-01T10:15:30.042Z");
    }

    #[test]
    fn elapsed_clamps_negative_intervals() {
        let now = Utc::now();
        let later = now + chrono::Duration::milliseconds(5);
        assert_eq!(elapsed_between(later, now), Duration::ZERO);
        assert_eq!(elapsed_between(now, later), Duration::from_millis(5));
    }
}
