//! Shared reqwest plumbing for the HTTP adapters.
//!
//! Adapters send through [`fetch_json`] and map the resulting
//! [`HttpFailure`] into their own port error.

use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;

/// Transport-level outcome of a failed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum HttpFailure {
    Transport(String),
    Timeout(String),
    Rejected { status: u16, message: String },
    Decode(String),
}

/// Send `request` and decode a successful JSON body into `T`.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: RequestBuilder,
) -> Result<T, HttpFailure> {
    let response = request
        .header(reqwest::header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(HttpFailure::from)?;

    let status = response.status();
    let body = response.bytes().await.map_err(HttpFailure::from)?;
    if !status.is_success() {
        return Err(map_status_error(status, body.as_ref()));
    }
    decode(body.as_ref())
}

pub(crate) fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, HttpFailure> {
    serde_json::from_slice(body)
        .map_err(|error| HttpFailure::Decode(format!("invalid JSON payload: {error}")))
}

impl From<reqwest::Error> for HttpFailure {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else {
            Self::Transport(error.to_string())
        }
    }
}

pub(crate) fn map_status_error(status: StatusCode, body: &[u8]) -> HttpFailure {
    let preview = body_preview(body);
    let message = if preview.is_empty() {
        format!("status {}", status.as_u16())
    } else {
        preview
    };

    match status {
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => HttpFailure::Timeout(message),
        _ => HttpFailure::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

fn body_preview(body: &[u8]) -> String {
    const PREVIEW_CHAR_LIMIT: usize = 160;

    let compact = String::from_utf8_lossy(body)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let preview = compact.chars().take(PREVIEW_CHAR_LIMIT).collect::<String>();
    if compact.chars().count() > PREVIEW_CHAR_LIMIT {
        format!("{preview}...")
    } else {
        preview
    }
}

/// Implement `From<HttpFailure>` for a port error with the shared variants.
macro_rules! impl_from_http_failure {
    ($error:ty) => {
        impl From<$crate::outbound::http_support::HttpFailure> for $error {
            fn from(failure: $crate::outbound::http_support::HttpFailure) -> Self {
                use $crate::outbound::http_support::HttpFailure;
                match failure {
                    HttpFailure::Transport(message) => Self::transport(message),
                    HttpFailure::Timeout(message) => Self::timeout(message),
                    HttpFailure::Rejected { status, message } => Self::rejected(status, message),
                    HttpFailure::Decode(message) => Self::decode(message),
                }
            }
        }
    };
}

pub(crate) use impl_from_http_failure;

#[cfg(test)]
mod tests {
    //! Status mapping and body previews.

    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::request_timeout(StatusCode::REQUEST_TIMEOUT)]
    #[case::gateway_timeout(StatusCode::GATEWAY_TIMEOUT)]
    fn timeout_statuses_map_to_timeout(#[case] status: StatusCode) {
        assert!(matches!(
            map_status_error(status, b""),
            HttpFailure::Timeout(message) if message == format!("status {}", status.as_u16())
        ));
    }

    #[rstest]
    #[case::bad_request(StatusCode::BAD_REQUEST)]
    #[case::server_error(StatusCode::INTERNAL_SERVER_ERROR)]
    fn other_statuses_are_rejections_carrying_the_body(#[case] status: StatusCode) {
        let failure = map_status_error(status, b"{\n  \"message\": \"backend down\"\n}");
        assert_eq!(
            failure,
            HttpFailure::Rejected {
                status: status.as_u16(),
                message: "{ \"message\": \"backend down\" }".to_owned(),
            }
        );
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(400);
        let HttpFailure::Rejected { message, .. } =
            map_status_error(StatusCode::BAD_GATEWAY, body.as_bytes())
        else {
            panic!("502 should be a rejection");
        };
        assert_eq!(message.chars().count(), 163);
        assert!(message.ends_with("..."));
    }

    #[test]
    fn invalid_json_is_a_decode_failure() {
        let failure = decode::<serde_json::Value>(b"not json").expect_err("invalid JSON");
        assert!(matches!(failure, HttpFailure::Decode(_)));
    }
}
