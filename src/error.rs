use thiserror::Error;

/// Transport-level failures.
///
/// These never carry a platform `errcode`; they describe why no usable
/// response came back from the wire.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HttpError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

impl From<reqwest::Error> for HttpError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            HttpError::Timeout
        } else if e.is_connect() {
            HttpError::Connect(e.to_string())
        } else if let Some(status) = e.status() {
            HttpError::Status(status.as_u16())
        } else {
            HttpError::Request(e.to_string())
        }
    }
}

/// WeChat SDK error types
#[derive(Debug, Clone, Error)]
pub enum WechatError {
    #[error("transport error: {0}")]
    Transport(#[from] HttpError),

    #[error("failed to decode response: {0}")]
    Decode(String),

    #[error("WeChat API error (code={code}): {message}")]
    Api { code: i32, message: String },

    #[error("access token request rejected (code={code}): {message}")]
    CredentialFetch { code: i32, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("credential store error: {0}")]
    Store(String),
}

impl From<reqwest::Error> for WechatError {
    fn from(e: reqwest::Error) -> Self {
        WechatError::Transport(e.into())
    }
}

impl From<serde_json::Error> for WechatError {
    fn from(e: serde_json::Error) -> Self {
        WechatError::Decode(e.to_string())
    }
}

impl WechatError {
    /// Turn an `errcode`/`errmsg` pair into `Err(Api)` when the code is non-zero.
    pub fn check_api(errcode: i32, errmsg: &str) -> Result<(), WechatError> {
        if errcode == 0 {
            Ok(())
        } else {
            Err(WechatError::Api {
                code: errcode,
                message: errmsg.to_string(),
            })
        }
    }

    /// Platform error code, if this error carries one.
    pub fn code(&self) -> Option<i32> {
        match self {
            WechatError::Api { code, .. } | WechatError::CredentialFetch { code, .. } => {
                Some(*code)
            }
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, WechatError::Transport(HttpError::Timeout))
    }

    /// Whether a caller-side retry has a reasonable chance of succeeding.
    ///
    /// Covers timeouts, connection failures, 5xx responses and the platform's
    /// "system busy" (-1) and rate-limit (45009) codes. The dispatcher itself
    /// never retries on these.
    pub fn is_transient(&self) -> bool {
        match self {
            WechatError::Transport(HttpError::Timeout)
            | WechatError::Transport(HttpError::Connect(_)) => true,
            WechatError::Transport(HttpError::Status(status)) => *status >= 500,
            WechatError::Api { code, .. } => matches!(code, -1 | 45009),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_api_zero_is_ok() {
        assert!(WechatError::check_api(0, "ok").is_ok());
    }

    #[test]
    fn test_check_api_nonzero_is_api_error() {
        let err = WechatError::check_api(40013, "invalid appid").unwrap_err();
        match err {
            WechatError::Api { code, message } => {
                assert_eq!(code, 40013);
                assert_eq!(message, "invalid appid");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_code_accessor() {
        let api = WechatError::Api {
            code: 45009,
            message: "reach max api daily quota limit".into(),
        };
        let fetch = WechatError::CredentialFetch {
            code: 40125,
            message: "invalid appsecret".into(),
        };
        assert_eq!(api.code(), Some(45009));
        assert_eq!(fetch.code(), Some(40125));
        assert_eq!(WechatError::Decode("eof".into()).code(), None);
    }

    #[test]
    fn test_transient_classification() {
        assert!(WechatError::Transport(HttpError::Timeout).is_transient());
        assert!(WechatError::Transport(HttpError::Connect("refused".into())).is_transient());
        assert!(WechatError::Transport(HttpError::Status(502)).is_transient());
        assert!(!WechatError::Transport(HttpError::Status(404)).is_transient());
        assert!(WechatError::Api {
            code: -1,
            message: "system error".into()
        }
        .is_transient());
        assert!(!WechatError::Api {
            code: 40001,
            message: "invalid credential".into()
        }
        .is_transient());
        assert!(!WechatError::Decode("bad".into()).is_transient());
    }

    #[test]
    fn test_timeout_is_distinct() {
        assert!(WechatError::Transport(HttpError::Timeout).is_timeout());
        assert!(!WechatError::Transport(HttpError::Status(504)).is_timeout());
    }

    #[test]
    fn test_display_keeps_code_and_message() {
        let err = WechatError::Api {
            code: 46003,
            message: "menu no exist".into(),
        };
        assert_eq!(err.to_string(), "WeChat API error (code=46003): menu no exist");
    }
}
