//! Access log line rendering
//!
//! `common` is the Common Log Format and the default, `combined` appends
//! referer and user agent, `json` emits one object per line. Unknown
//! names fall back to `common`.

use chrono::{DateTime, Local};
use serde::Serialize;

/// Access log output format, selected by `logging.access_log_format`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Common,
    Combined,
    Json,
}

impl LogFormat {
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "combined" => Self::Combined,
            "json" => Self::Json,
            _ => Self::Common,
        }
    }
}

/// One served request, captured when its response is ready
#[derive(Debug, Clone)]
pub struct AccessLogEntry {
    pub remote_addr: String,
    pub time: DateTime<Local>,
    pub method: String,
    pub path: String,
    /// Query string without the leading `?`
    pub query: Option<String>,
    pub http_version: String,
    pub status: u16,
    /// Bytes in the response body (0 for HEAD and 304)
    pub body_bytes: u64,
    pub referer: Option<String>,
    pub user_agent: Option<String>,
    pub request_time_us: u64,
}

#[derive(Serialize)]
struct JsonLine<'a> {
    remote_addr: &'a str,
    time: String,
    method: &'a str,
    path: &'a str,
    query: Option<&'a str>,
    http_version: &'a str,
    status: u16,
    body_bytes: u64,
    referer: Option<&'a str>,
    user_agent: Option<&'a str>,
    request_time_us: u64,
}

impl AccessLogEntry {
    /// Start an entry stamped with the current local time
    pub fn new(remote_addr: String, method: String, path: String) -> Self {
        Self {
            remote_addr,
            time: Local::now(),
            method,
            path,
            query: None,
            http_version: "1.1".to_string(),
            status: 200,
            body_bytes: 0,
            referer: None,
            user_agent: None,
            request_time_us: 0,
        }
    }

    pub fn render(&self, format: LogFormat) -> String {
        match format {
            LogFormat::Common => self.common_line(),
            LogFormat::Combined => format!(
                "{} \"{}\" \"{}\"",
                self.common_line(),
                self.referer.as_deref().unwrap_or("-"),
                self.user_agent.as_deref().unwrap_or("-"),
            ),
            LogFormat::Json => self.json_line(),
        }
    }

    /// `METHOD /path?query HTTP/x.y`
    fn request_line(&self) -> String {
        match self.query {
            Some(ref query) => format!(
                "{} {}?{query} HTTP/{}",
                self.method, self.path, self.http_version
            ),
            None => format!("{} {} HTTP/{}", self.method, self.path, self.http_version),
        }
    }

    fn common_line(&self) -> String {
        format!(
            "{} - - [{}] \"{}\" {} {}",
            self.remote_addr,
            self.time.format("%d/%b/%Y:%H:%M:%S %z"),
            self.request_line(),
            self.status,
            self.body_bytes,
        )
    }

    fn json_line(&self) -> String {
        let line = JsonLine {
            remote_addr: &self.remote_addr,
            time: self.time.to_rfc3339(),
            method: &self.method,
            path: &self.path,
            query: self.query.as_deref(),
            http_version: &self.http_version,
            status: self.status,
            body_bytes: self.body_bytes,
            referer: self.referer.as_deref(),
            user_agent: self.user_agent.as_deref(),
            request_time_us: self.request_time_us,
        };
        // Only strings and integers: serialisation cannot fail
        serde_json::to_string(&line).unwrap_or_else(|_| self.common_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wasm_fetch() -> AccessLogEntry {
        let mut entry = AccessLogEntry::new(
            "192.168.1.1".to_string(),
            "GET".to_string(),
            "/pkg/app.wasm".to_string(),
        );
        entry.query = Some("v=2".to_string());
        entry.body_bytes = 1234;
        entry.referer = Some("http://localhost:8000/".to_string());
        entry.user_agent = Some("Mozilla/5.0".to_string());
        entry.request_time_us = 1500;
        entry
    }

    #[test]
    fn test_format_names() {
        assert_eq!(LogFormat::from_name("common"), LogFormat::Common);
        assert_eq!(LogFormat::from_name("Combined"), LogFormat::Combined);
        assert_eq!(LogFormat::from_name(" json "), LogFormat::Json);
        assert_eq!(LogFormat::from_name("nonsense"), LogFormat::Common);
    }

    #[test]
    fn test_common_line() {
        let log = wasm_fetch().render(LogFormat::Common);
        assert!(log.starts_with("192.168.1.1 - - ["));
        assert!(log.ends_with("\"GET /pkg/app.wasm?v=2 HTTP/1.1\" 200 1234"));
        assert!(!log.contains("Mozilla/5.0"));
    }

    #[test]
    fn test_combined_line_appends_referer_and_agent() {
        let entry = wasm_fetch();
        let log = entry.render(LogFormat::Combined);
        assert!(log.starts_with(&entry.render(LogFormat::Common)));
        assert!(log.ends_with("\"http://localhost:8000/\" \"Mozilla/5.0\""));

        let mut bare = entry;
        bare.referer = None;
        bare.user_agent = None;
        assert!(bare.render(LogFormat::Combined).ends_with(" \"-\" \"-\""));
    }

    #[test]
    fn test_json_line() {
        let mut entry = wasm_fetch();
        entry.path = "/quote\"d".to_string();
        entry.referer = None;

        let value: serde_json::Value =
            serde_json::from_str(&entry.render(LogFormat::Json)).unwrap();
        assert_eq!(value["remote_addr"], "192.168.1.1");
        assert_eq!(value["path"], "/quote\"d");
        assert_eq!(value["status"], 200);
        assert_eq!(value["body_bytes"], 1234);
        assert_eq!(value["query"], "v=2");
        assert!(value["referer"].is_null());
    }
}
