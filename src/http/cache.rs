//! HTTP conditional request module
//!
//! `Last-Modified` formatting and `If-Modified-Since` evaluation.

use chrono::{DateTime, Utc};
use std::time::SystemTime;

/// IMF-fixdate layout used by `Last-Modified` and `Date`
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Format a timestamp as an HTTP date, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
pub fn format_http_date(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format(HTTP_DATE_FORMAT)
        .to_string()
}

/// Parse an HTTP date header value
///
/// Returns None for anything that is not a valid RFC 2822 / IMF-fixdate.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Check whether the client's cached copy is still fresh
///
/// The file's modification time is truncated to whole seconds, since HTTP
/// dates carry no sub-second precision.
///
/// # Arguments
/// * `modified` - File modification time
/// * `if_modified_since` - Client-sent If-Modified-Since header
///
/// # Returns
/// Returns true if the response should be 304 Not Modified
pub fn is_not_modified(modified: SystemTime, if_modified_since: Option<&str>) -> bool {
    let Some(since) = if_modified_since.and_then(parse_http_date) else {
        return false;
    };
    DateTime::<Utc>::from(modified).timestamp() <= since.timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn test_format_http_date() {
        let time = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert_eq!(format_http_date(time), "Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT").unwrap();
        assert_eq!(parsed.timestamp(), 784_111_777);
        assert!(parse_http_date("yesterday").is_none());
    }

    #[test]
    fn test_not_modified() {
        let modified = UNIX_EPOCH + Duration::from_millis(784_111_777_500);
        let same_second = Some("Sun, 06 Nov 1994 08:49:37 GMT");
        let later = Some("Sun, 06 Nov 1994 09:00:00 GMT");
        let earlier = Some("Sun, 06 Nov 1994 08:49:36 GMT");
        assert!(is_not_modified(modified, same_second));
        assert!(is_not_modified(modified, later));
        assert!(!is_not_modified(modified, earlier));
    }

    #[test]
    fn test_missing_or_invalid_header() {
        let modified = UNIX_EPOCH + Duration::from_secs(784_111_777);
        assert!(!is_not_modified(modified, None));
        assert!(!is_not_modified(modified, Some("not a date")));
    }
}
