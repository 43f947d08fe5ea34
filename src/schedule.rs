//! Scheduled-time conversion.
//!
//! The operator enters a start date/time in their own local clock. The
//! platform wants UTC as `"YYYY-MM-DD HH:MM:SS"`. The ad group's display
//! timezone is metadata only and never shifts the submitted value.

use crate::error::{CampaignError, Result};
use chrono::{FixedOffset, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Wire format for every scheduled time sent to the platform.
pub const PLATFORM_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const LOCAL_INPUT_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
];

/// Parses a local date/time as produced by a `datetime-local` input.
pub fn parse_local(value: &str) -> Result<NaiveDateTime> {
    let value = value.trim();
    LOCAL_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .ok_or_else(|| {
            CampaignError::validation(
                "schedule_start",
                format!("'{value}' is not a valid date and time"),
            )
        })
}

/// Converts a local date/time entered at `entry_offset` into the platform's UTC string.
pub fn to_platform_utc(local: NaiveDateTime, entry_offset: FixedOffset) -> Result<String> {
    let utc = entry_offset
        .from_local_datetime(&local)
        .single()
        .ok_or_else(|| {
            CampaignError::validation("schedule_start", "does not map to a single instant")
        })?
        .with_timezone(&Utc);
    Ok(utc.format(PLATFORM_TIME_FORMAT).to_string())
}

/// Parses a value in the platform's wire format back into a UTC timestamp.
pub fn parse_platform(value: &str) -> Result<chrono::DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value, PLATFORM_TIME_FORMAT).map_err(|e| {
        CampaignError::validation("schedule_time", format!("'{value}' is malformed: {e}"))
    })?;
    Ok(Utc.from_utc_datetime(&naive))
}

/// Checks that the display timezone is a known IANA name.
pub fn validate_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>().map_err(|_| {
        CampaignError::validation("timezone", format!("'{name}' is not a known timezone"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_local_formats() {
        let expected = NaiveDateTime::parse_from_str("2024-01-02 00:00:00", PLATFORM_TIME_FORMAT)
            .unwrap();
        assert_eq!(parse_local("2024-01-02T00:00").unwrap(), expected);
        assert_eq!(parse_local("2024-01-02 00:00:00").unwrap(), expected);
        assert!(parse_local("02/01/2024").is_err());
        assert!(parse_local("").is_err());
    }

    #[test]
    fn test_to_platform_utc_without_offset() {
        let local = parse_local("2024-01-02T00:00").unwrap();
        let utc = FixedOffset::east_opt(0).unwrap();
        assert_eq!(to_platform_utc(local, utc).unwrap(), "2024-01-02 00:00:00");
    }

    #[test]
    fn test_to_platform_utc_shifts_by_entry_offset() {
        let local = parse_local("2024-01-02T00:00").unwrap();
        let new_york_winter = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            to_platform_utc(local, new_york_winter).unwrap(),
            "2024-01-02 05:00:00"
        );

        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        assert_eq!(to_platform_utc(local, tokyo).unwrap(), "2024-01-01 15:00:00");
    }

    #[test]
    fn test_parse_platform() {
        let ts = parse_platform("2024-01-02 05:00:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-01-02T05:00:00+00:00");
        assert!(parse_platform("2024-01-02T05:00:00").is_err());
    }

    #[test]
    fn test_validate_timezone() {
        assert!(validate_timezone("America/New_York").is_ok());
        assert!(validate_timezone("UTC").is_ok());
        assert!(validate_timezone("Mars/Olympus_Mons").is_err());
    }
}
