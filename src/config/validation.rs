//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use chrono::NaiveDate;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("server.name is required")]
    MissingServerName,
    #[error("server.node_id must be exactly 3 characters, got {0}")]
    InvalidNodeId(usize),
    #[error("server.node_id must match pattern [0-9][A-Z0-9][A-Z0-9], got '{0}'")]
    InvalidNodeIdFormat(String),
    #[error("server.idle_timeouts.{0} must be greater than zero")]
    ZeroIdleTimeout(&'static str),
    #[error("tls.cert_path does not exist: {0}")]
    TlsCertNotFound(String),
    #[error("tls.key_path does not exist: {0}")]
    TlsKeyNotFound(String),
    #[error("http.internal_token must not be empty when set")]
    EmptyInternalToken,
    #[error("limits.{0} must be greater than zero")]
    ZeroLimit(&'static str),
    #[error("schedule.interval_secs must be between 1 and 86400, got {0}")]
    ScheduleInterval(u64),
    #[error("schedule.notices[{index}]: {month}/{day} is not a calendar date")]
    InvalidNoticeDate { index: usize, month: u32, day: u32 },
    #[error("schedule.notices[{0}] has no users")]
    NoticeWithoutUsers(usize),
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.name.is_empty() {
        errors.push(ValidationError::MissingServerName);
    }

    let node_id = &config.server.node_id;
    if node_id.len() != 3 {
        errors.push(ValidationError::InvalidNodeId(node_id.len()));
    } else {
        let chars: Vec<char> = node_id.chars().collect();
        let valid = chars[0].is_ascii_digit()
            && (chars[1].is_ascii_uppercase() || chars[1].is_ascii_digit())
            && (chars[2].is_ascii_uppercase() || chars[2].is_ascii_digit());
        if !valid {
            errors.push(ValidationError::InvalidNodeIdFormat(node_id.clone()));
        }
    }

    let idle = &config.server.idle_timeouts;
    if idle.ping == 0 {
        errors.push(ValidationError::ZeroIdleTimeout("ping"));
    }
    if idle.timeout == 0 {
        errors.push(ValidationError::ZeroIdleTimeout("timeout"));
    }

    if let Some(ref tls) = config.tls {
        if !Path::new(&tls.cert_path).exists() {
            errors.push(ValidationError::TlsCertNotFound(tls.cert_path.clone()));
        }
        if !Path::new(&tls.key_path).exists() {
            errors.push(ValidationError::TlsKeyNotFound(tls.key_path.clone()));
        }
    }

    if let Some(ref http) = config.http
        && http.internal_token.as_deref().is_some_and(str::is_empty)
    {
        errors.push(ValidationError::EmptyInternalToken);
    }

    let limits = &config.limits;
    if limits.sendq == 0 {
        errors.push(ValidationError::ZeroLimit("sendq"));
    }
    if limits.write_timeout_ms == 0 {
        errors.push(ValidationError::ZeroLimit("write_timeout_ms"));
    }
    if limits.max_frame_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_frame_bytes"));
    }

    // Polling less than daily would skip dates.
    if !(1..=86_400).contains(&config.schedule.interval_secs) {
        errors.push(ValidationError::ScheduleInterval(config.schedule.interval_secs));
    }
    for (index, notice) in config.schedule.notices.iter().enumerate() {
        // 2024 is a leap year, so Feb 29 is accepted.
        if NaiveDate::from_ymd_opt(2024, notice.month, notice.day).is_none() {
            errors.push(ValidationError::InvalidNoticeDate {
                index,
                month: notice.month,
                day: notice.day,
            });
        }
        if notice.users.iter().all(|u| u.is_empty()) {
            errors.push(ValidationError::NoticeWithoutUsers(index));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    fn minimal_valid_config() -> String {
        r#"
[server]
name = "rt.test"
node_id = "0RT"

[listen]
address = "127.0.0.1:5000"
"#
        .to_string()
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(validate(&parse(&minimal_valid_config())).is_ok());
    }

    #[test]
    fn test_empty_server_name_fails() {
        let config = parse(
            r#"
[server]
name = ""

[listen]
address = "127.0.0.1:5000"
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::MissingServerName)));
    }

    #[test]
    fn test_invalid_node_id_fails() {
        let config = parse(
            r#"
[server]
name = "rt"
node_id = "rt1"

[listen]
address = "127.0.0.1:5000"
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(
            errors
                .iter()
                .any(|e| matches!(e, ValidationError::InvalidNodeIdFormat(_)))
        );
    }

    #[test]
    fn test_missing_tls_cert_fails() {
        let config = parse(
            r#"
[server]
name = "rt"

[listen]
address = "127.0.0.1:5000"

[tls]
address = "127.0.0.1:5443"
cert_path = "/nonexistent/cert.pem"
key_path = "/nonexistent/key.pem"
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsCertNotFound(_))));
        assert!(errors.iter().any(|e| matches!(e, ValidationError::TlsKeyNotFound(_))));
    }

    #[test]
    fn test_empty_token_fails() {
        let config = parse(
            r#"
[server]
name = "rt"

[listen]
address = "127.0.0.1:5000"

[http]
address = "127.0.0.1:5001"
internal_token = ""
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert!(errors.iter().any(|e| matches!(e, ValidationError::EmptyInternalToken)));
    }

    #[test]
    fn test_bad_notice_dates_fail() {
        let config = parse(
            r#"
[server]
name = "rt"

[listen]
address = "127.0.0.1:5000"

[[schedule.notices]]
month = 2
day = 30
users = ["u1"]
payload = {}

[[schedule.notices]]
month = 2
day = 29
users = []
payload = {}
"#,
        );
        let errors = validate(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(matches!(
            errors[0],
            ValidationError::InvalidNoticeDate { index: 0, month: 2, day: 30 }
        ));
        assert!(matches!(errors[1], ValidationError::NoticeWithoutUsers(1)));
    }

    #[test]
    fn test_schedule_interval_bounds() {
        for (interval, ok) in [(0, false), (1, true), (86_400, true), (90_000, false)] {
            let config = parse(&format!(
                "{}\n[schedule]\ninterval_secs = {interval}\n",
                minimal_valid_config()
            ));
            let result = validate(&config);
            assert_eq!(result.is_ok(), ok, "interval_secs = {interval}");
            if let Err(errors) = result {
                assert!(matches!(errors[0], ValidationError::ScheduleInterval(i) if i == interval));
            }
        }
    }
}
