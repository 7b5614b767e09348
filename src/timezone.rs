//! Conversions between UTC timestamps and the server's local timezone.

use time::{
    Date, OffsetDateTime, format_description::BorrowedFormatItem,
    macros::format_description,
};
use time_tz::{Offset, TimeZone, Tz};

/// Look up a timezone by its canonical name, e.g. "Pacific/Auckland".
pub fn get_timezone(canonical_timezone: &str) -> Option<&'static Tz> {
    time_tz::timezones::get_by_name(canonical_timezone)
}

/// Convert `timestamp` to the local time in `timezone`, using the offset that
/// was in effect at that moment.
pub fn to_local_time(timestamp: OffsetDateTime, timezone: &Tz) -> OffsetDateTime {
    let offset = timezone.get_offset_utc(&timestamp).to_utc();

    timestamp.to_offset(offset)
}

/// The calendar date of `timestamp` in `timezone`.
pub fn local_date(timestamp: OffsetDateTime, timezone: &Tz) -> Date {
    to_local_time(timestamp, timezone).date()
}

/// Date time format for showing timestamps to users, e.g. "2025-10-05 14:03".
const DISPLAY_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Format `timestamp` for display in `timezone`.
pub fn format_local_timestamp(timestamp: OffsetDateTime, timezone: &Tz) -> String {
    to_local_time(timestamp, timezone)
        .format(DISPLAY_FORMAT)
        .unwrap_or_else(|error| {
            tracing::error!("could not format timestamp {timestamp}: {error}");
            timestamp.to_string()
        })
}

#[cfg(test)]
mod tests {
    use time::macros::{date, datetime};

    use super::{format_local_timestamp, get_timezone, local_date};

    #[test]
    fn unknown_timezone_is_not_found() {
        assert!(get_timezone("Not/A_Timezone").is_none());
    }

    #[test]
    fn late_utc_time_is_next_day_in_auckland() {
        let timezone = get_timezone("Pacific/Auckland").unwrap();
        let timestamp = datetime!(2025-01-10 20:00 UTC);

        assert_eq!(local_date(timestamp, timezone), date!(2025 - 01 - 11));
    }

    #[test]
    fn utc_date_is_unchanged() {
        let timezone = get_timezone("Etc/UTC").unwrap();
        let timestamp = datetime!(2025-01-10 23:59 UTC);

        assert_eq!(local_date(timestamp, timezone), date!(2025 - 01 - 10));
    }

    #[test]
    fn formats_in_local_time() {
        let timezone = get_timezone("Etc/UTC").unwrap();
        let timestamp = datetime!(2025-10-05 14:03:59 UTC);

        assert_eq!(format_local_timestamp(timestamp, timezone), "2025-10-05 14:03");
    }
}
