//! Error taxonomy shared by the store, the remote client and the location source.

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Message published for any transport/connectivity fault.
pub const NETWORK_FAILURE: &str = "Network Failure";

/// Fallback message when a failure carries no description.
pub const UNKNOWN_ERROR: &str = "Unknown Error";

#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Location permission not granted")]
    PermissionDenied,

    #[error("No location data available")]
    NoLocationData,

    /// Failure reported by the location platform itself, shown verbatim.
    #[error("{0}")]
    Location(String),

    #[error("Network Failure")]
    Network(#[source] BoxError),

    #[error("Error: {body}")]
    Http {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to parse {what} JSON: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Unknown(String),

    #[error("Storage error: {0}")]
    Storage(#[from] sqlx::Error),
}

pub type Result<T, E = WeatherError> = std::result::Result<T, E>;

impl WeatherError {
    pub fn unknown<S: Into<String>>(message: S) -> Self {
        Self::Unknown(message.into())
    }

    /// Split a `reqwest` failure into connectivity faults and everything else.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_connect()
            || err.is_timeout()
            || err.is_request()
            || err.is_body()
            || caused_by_io(&err)
        {
            Self::Network(Box::new(err))
        } else {
            Self::Unknown(err.to_string())
        }
    }

    /// A failure while reading a response body means the connection broke mid-transfer.
    pub fn from_body_read(err: reqwest::Error) -> Self {
        Self::Network(Box::new(err))
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// The text handed to the presentation layer for this failure.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Network(_) => NETWORK_FAILURE.to_string(),
            other => {
                let message = other.to_string();
                if message.trim().is_empty() {
                    UNKNOWN_ERROR.to_string()
                } else {
                    message
                }
            }
        }
    }
}

fn caused_by_io(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if cause.is::<std::io::Error>() {
            return true;
        }
        source = cause.source();
    }
    false
}

impl From<std::io::Error> for WeatherError {
    fn from(err: std::io::Error) -> Self {
        Self::Network(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn io_errors_are_network_failures() {
        let err: WeatherError =
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused").into();

        assert!(err.is_network());
        assert_eq!(err.user_message(), NETWORK_FAILURE);
    }

    #[rstest]
    #[case(WeatherError::PermissionDenied, "Location permission not granted")]
    #[case(WeatherError::NoLocationData, "No location data available")]
    #[case(WeatherError::Location("GPS offline".into()), "GPS offline")]
    #[case(WeatherError::unknown("boom"), "boom")]
    #[case(WeatherError::unknown(""), UNKNOWN_ERROR)]
    #[case(WeatherError::unknown("   "), UNKNOWN_ERROR)]
    fn user_message_uses_description(#[case] err: WeatherError, #[case] expected: &str) {
        assert_eq!(err.user_message(), expected);
    }

    #[test]
    fn http_errors_carry_body_text() {
        let err = WeatherError::Http {
            status: reqwest::StatusCode::UNAUTHORIZED,
            body: r#"{"cod":401,"message":"Invalid API key"}"#.to_string(),
        };

        assert_eq!(err.user_message(), r#"Error: {"cod":401,"message":"Invalid API key"}"#);
    }

    #[test]
    fn permission_and_no_data_messages_differ() {
        assert_ne!(
            WeatherError::PermissionDenied.user_message(),
            WeatherError::NoLocationData.user_message()
        );
    }
}
