//! From trait implementations for SmileError conversions

use super::types::SmileError;

impl From<anyhow::Error> for SmileError {
    fn from(error: anyhow::Error) -> Self {
        Self::other(error.to_string())
    }
}

impl From<std::io::Error> for SmileError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<serde_json::Error> for SmileError {
    fn from(error: serde_json::Error) -> Self {
        Self::json(error.to_string())
    }
}

impl From<toml::de::Error> for SmileError {
    fn from(error: toml::de::Error) -> Self {
        Self::config_with_context(error.to_string(), "TOML parse")
    }
}

impl From<serde_yaml::Error> for SmileError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config_with_context(error.to_string(), "YAML parse")
    }
}

impl From<reqwest::Error> for SmileError {
    fn from(error: reqwest::Error) -> Self {
        let url = error.url().map(|u| u.to_string());
        if error.is_timeout() {
            return Self::Timeout {
                seconds: 0,
                context: url,
            };
        }
        if error.is_connect() {
            return Self::Network {
                message: error.to_string(),
                url,
                context: None,
            };
        }
        match error.status() {
            Some(status) => Self::Http {
                message: error.to_string(),
                url,
                status_code: Some(status.as_u16()),
                context: None,
            },
            // Body/decode failures mid-stream behave like a dropped connection
            None if error.is_body() || error.is_decode() || error.is_request() => Self::Network {
                message: error.to_string(),
                url,
                context: None,
            },
            None => Self::Http {
                message: error.to_string(),
                url,
                status_code: None,
                context: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts_to_io_variant() {
        let err: SmileError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, SmileError::Io { .. }));
    }

    #[test]
    fn json_error_converts_to_json_variant() {
        let err: SmileError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, SmileError::Json { .. }));
    }
}
