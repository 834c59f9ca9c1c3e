//! Metric and label name rules of the Prometheus exposition format.

use crate::error::{MetricsError, Result};

/// `[a-zA-Z_:][a-zA-Z0-9_:]*`
pub fn validate_metric_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
        }
        _ => false,
    };
    if !ok {
        return Err(MetricsError::InvalidName(format!("invalid metric name: {name:?}")));
    }
    Ok(())
}

/// `[a-zA-Z_][a-zA-Z0-9_]*`, and `__` is reserved for internal use.
pub fn validate_label_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let ok = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if !ok {
        return Err(MetricsError::InvalidName(format!("invalid label name: {name:?}")));
    }
    if name.starts_with("__") {
        return Err(MetricsError::InvalidName(format!(
            "label name {name:?} is reserved (starts with __)"
        )));
    }
    Ok(())
}

/// Join `namespace`, `subsystem` and `name` with `_`, skipping empty parts.
pub fn full_name(namespace: &str, subsystem: &str, name: &str) -> String {
    [namespace, subsystem, name]
        .iter()
        .filter(|p| !p.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn metric_names() {
        assert!(validate_metric_name("http_requests_total").is_ok());
        assert!(validate_metric_name("job:rate5m").is_ok());
        assert!(validate_metric_name("_private").is_ok());
        assert!(validate_metric_name("").is_err());
        assert!(validate_metric_name("9lives").is_err());
        assert!(validate_metric_name("with-dash").is_err());
    }

    #[test]
    fn label_names() {
        assert!(validate_label_name("route").is_ok());
        assert!(validate_label_name("_x").is_ok());
        assert!(validate_label_name("a:b").is_err());
        let err = validate_label_name("__name__").unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_NAME");
    }

    #[test]
    fn full_name_skips_empty_parts() {
        assert_eq!(full_name("app", "http", "latency"), "app_http_latency");
        assert_eq!(full_name("", "http", "latency"), "http_latency");
        assert_eq!(full_name("", "", "latency"), "latency");
    }
}
