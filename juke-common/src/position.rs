//! Seek position parsing and duration display formatting
//!
//! Accepted position formats: a bare number of seconds (`260`) or a
//! colon-delimited `mm:ss` / `hh:mm:ss` (`10:02`, `1:10:02`). Malformed
//! input is rejected with `Error::InvalidPosition` before it can reach a
//! session.

use std::time::Duration;

use crate::error::{Error, Result};

/// Parse a user-supplied seek position
pub fn parse_position(spec: &str) -> Result<Duration> {
    let spec = spec.trim();
    if spec.is_empty() {
        return Err(Error::InvalidPosition("empty position".to_string()));
    }

    let parts: Vec<&str> = spec.split(':').collect();
    if parts.len() > 3 {
        return Err(Error::InvalidPosition(format!(
            "too many fields in '{}'",
            spec
        )));
    }

    let mut fields = Vec::with_capacity(parts.len());
    for part in &parts {
        let value: u64 = part
            .parse()
            .map_err(|_| Error::InvalidPosition(format!("'{}' is not a number", part)))?;
        fields.push(value);
    }

    // Every field after the leading one is a minutes/seconds digit pair
    for &value in &fields[1..] {
        if value >= 60 {
            return Err(Error::InvalidPosition(format!(
                "'{}' must be below 60",
                value
            )));
        }
    }

    let seconds = fields.iter().fold(0u64, |acc, &v| acc * 60 + v);
    Ok(Duration::from_secs(seconds))
}

/// Format a duration for display: `m:ss` below one hour, `h:mm:ss` above
pub fn format_duration(duration: Duration) -> String {
    let total = duration.as_secs();
    let secs = total % 60;
    let mins = (total / 60) % 60;
    let hours = total / 3600;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!(parse_position("260").unwrap(), Duration::from_secs(260));
        assert_eq!(parse_position("0").unwrap(), Duration::from_secs(0));
    }

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse_position("10:02").unwrap(), Duration::from_secs(602));
        assert_eq!(parse_position("1:05").unwrap(), Duration::from_secs(65));
    }

    #[test]
    fn test_parse_hours_minutes_seconds() {
        assert_eq!(
            parse_position("1:10:02").unwrap(),
            Duration::from_secs(4202)
        );
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(parse_position(" 1:05 ").unwrap(), Duration::from_secs(65));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(matches!(
            parse_position("abc"),
            Err(Error::InvalidPosition(_))
        ));
        assert!(matches!(
            parse_position("1:xx"),
            Err(Error::InvalidPosition(_))
        ));
        assert!(matches!(parse_position(""), Err(Error::InvalidPosition(_))));
        assert!(matches!(
            parse_position("-5"),
            Err(Error::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_parse_rejects_overflowing_fields() {
        // Trailing fields are digit pairs and must stay below 60
        assert!(matches!(
            parse_position("1:75"),
            Err(Error::InvalidPosition(_))
        ));
        assert!(matches!(
            parse_position("1:02:90"),
            Err(Error::InvalidPosition(_))
        ));
        // A bare leading field has no such bound
        assert_eq!(parse_position("75").unwrap(), Duration::from_secs(75));
    }

    #[test]
    fn test_parse_rejects_too_many_fields() {
        assert!(matches!(
            parse_position("1:02:03:04"),
            Err(Error::InvalidPosition(_))
        ));
    }

    #[test]
    fn test_format_below_one_hour() {
        assert_eq!(format_duration(Duration::from_secs(65)), "1:05");
        assert_eq!(format_duration(Duration::from_secs(0)), "0:00");
        assert_eq!(format_duration(Duration::from_secs(185)), "3:05");
    }

    #[test]
    fn test_format_above_one_hour() {
        assert_eq!(format_duration(Duration::from_secs(3661)), "1:01:01");
        assert_eq!(format_duration(Duration::from_secs(4202)), "1:10:02");
    }
}
