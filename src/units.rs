//! Size and duration parsing for configuration values (§3 "A3 Configuration
//! block" of the expanded spec), built on `byte-unit` and `humantime` the
//! way the rest of the crate's ambient stack leans on small, focused
//! crates instead of hand-rolled parsers.

use byte_unit::Byte;

use crate::error::{ParseError, Result, UserError};

/// Parses a size string (`"1K"`, `"1M"`, `"1G"`, `"1T"`, or a bare integer
/// meaning bytes) into a byte count (§8 "Size parser").
pub fn parse_size(input: &str) -> Result<u64> {
    Byte::parse_str(input, true)
        .map(|b| b.as_u64())
        .map_err(|e| UserError::Parse(ParseError::new("size", e.to_string())).into())
}

/// Parses a duration string into microseconds (§8 "time parser"): `"1s" =
/// 1_000_000`, `"1ms" = 1000`, `"1us" = 1`, `"1m" = 60_000_000`, `"1h" =
/// 3_600_000_000`; a bare integer means seconds.
pub fn parse_duration_micros(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    if let Ok(secs) = trimmed.parse::<u64>() {
        return Ok(secs * 1_000_000);
    }
    let d = humantime::parse_duration(trimmed).map_err(|e| UserError::Parse(ParseError::new("duration", e.to_string())))?;
    Ok(d.as_micros() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_units_kmgt() {
        assert_eq!(parse_size("1K").unwrap(), 1024);
        assert_eq!(parse_size("1M").unwrap(), 1024 * 1024);
        assert_eq!(parse_size("1G").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_size("1T").unwrap(), 1024u64 * 1024 * 1024 * 1024);
    }

    #[test]
    fn bare_integer_size_means_bytes() {
        assert_eq!(parse_size("512").unwrap(), 512);
    }

    #[test]
    fn duration_units() {
        assert_eq!(parse_duration_micros("1s").unwrap(), 1_000_000);
        assert_eq!(parse_duration_micros("1ms").unwrap(), 1_000);
        assert_eq!(parse_duration_micros("1us").unwrap(), 1);
        assert_eq!(parse_duration_micros("1m").unwrap(), 60_000_000);
        assert_eq!(parse_duration_micros("1h").unwrap(), 3_600_000_000);
    }

    #[test]
    fn bare_integer_duration_means_seconds() {
        assert_eq!(parse_duration_micros("7").unwrap(), 7_000_000);
    }

    #[test]
    fn malformed_size_is_a_user_error() {
        assert!(parse_size("not a size").is_err());
    }
}
