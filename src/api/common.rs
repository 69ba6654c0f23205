//! Common API primitives
//!
//! Shared request and response shapes used across the resource APIs.
//!
//! - [`ApiResponseBase`] for endpoints that answer with only `errcode` / `errmsg`
//! - [`DateRange`] and [`IntoDate`] for the statistics (datacube) endpoints
//!
//! ## Usage
//!
//! ```rust
//! use wechat_oa_sdk::api::common::ApiResponseBase;
//!
//! let json = r#"{"errcode": 0, "errmsg": "ok"}"#;
//! let resp: ApiResponseBase = serde_json::from_str(json).unwrap();
//! assert!(resp.is_success());
//! ```

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::error::WechatError;

/// Minimal API response carrying only `errcode` and `errmsg`.
///
/// Returned by action endpoints (menu create, message send, account
/// management). The dispatcher has already rejected non-zero codes, so a
/// value reaching the caller is always a success.
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiResponseBase {
    /// Error code (`0` = success)
    #[serde(default)]
    pub errcode: i32,
    /// Error message
    #[serde(default)]
    pub errmsg: String,
}

impl ApiResponseBase {
    pub fn success() -> Self {
        Self {
            errcode: 0,
            errmsg: "ok".to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.errcode == 0
    }
}

/// A date accepted by the statistics endpoints.
///
/// Strings are parsed as `YYYY-MM-DD` (or the compact `YYYYMMDD`) and
/// re-emitted in the canonical `YYYY-MM-DD` form the platform expects.
pub trait IntoDate {
    fn into_date(self) -> Result<NaiveDate, WechatError>;
}

impl IntoDate for NaiveDate {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        Ok(self)
    }
}

impl IntoDate for &NaiveDate {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        Ok(*self)
    }
}

/// Takes the calendar date; the time of day is dropped.
impl IntoDate for NaiveDateTime {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        Ok(self.date())
    }
}

/// Takes the calendar date in the value's own time zone.
impl<Tz: TimeZone> IntoDate for DateTime<Tz> {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        Ok(self.date_naive())
    }
}

impl IntoDate for &str {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        let trimmed = self.trim();
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .or_else(|_| NaiveDate::parse_from_str(trimmed, "%Y%m%d"))
            .map_err(|_| WechatError::InvalidArgument(format!("invalid date: {self:?}")))
    }
}

impl IntoDate for String {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        self.as_str().into_date()
    }
}

impl IntoDate for &String {
    fn into_date(self) -> Result<NaiveDate, WechatError> {
        self.as_str().into_date()
    }
}

/// `{begin_date, end_date}` body of the datacube endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    /// Start date (inclusive), `YYYY-MM-DD`
    pub begin_date: String,
    /// End date (inclusive), `YYYY-MM-DD`
    pub end_date: String,
}

impl DateRange {
    pub fn new(begin_date: impl IntoDate, end_date: impl IntoDate) -> Result<Self, WechatError> {
        Ok(Self {
            begin_date: format_date(begin_date.into_date()?),
            end_date: format_date(end_date.into_date()?),
        })
    }
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_response_base_defaults_on_missing_fields() {
        let resp: ApiResponseBase = serde_json::from_str("{}").unwrap();
        assert_eq!(resp.errcode, 0);
        assert!(resp.errmsg.is_empty());
        assert!(resp.is_success());
    }

    #[test]
    fn test_api_response_base_success() {
        let resp = ApiResponseBase::success();
        assert_eq!(resp.errmsg, "ok");
        assert!(resp.is_success());
    }

    #[test]
    fn test_date_range_from_strings() {
        let range = DateRange::new("2014-12-06", "2014-12-07").unwrap();
        assert_eq!(range.begin_date, "2014-12-06");
        assert_eq!(range.end_date, "2014-12-07");
    }

    #[test]
    fn test_date_range_normalizes_compact_and_typed_dates() {
        let begin = NaiveDate::from_ymd_opt(2014, 12, 6).unwrap();
        let range = DateRange::new(begin, "20141207").unwrap();
        assert_eq!(
            range,
            DateRange {
                begin_date: "2014-12-06".to_string(),
                end_date: "2014-12-07".to_string(),
            }
        );
    }

    #[test]
    fn test_date_range_mixed_owned_and_borrowed() {
        let end = String::from("2014-12-07");
        let range = DateRange::new(&end, end.clone()).unwrap();
        assert_eq!(range.begin_date, range.end_date);
    }

    #[test]
    fn test_date_range_from_datetimes() {
        let begin = NaiveDate::from_ymd_opt(2014, 12, 6)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        let end = chrono::Utc.with_ymd_and_hms(2014, 12, 7, 8, 30, 0).unwrap();
        let range = DateRange::new(begin, end).unwrap();
        assert_eq!(range.begin_date, "2014-12-06");
        assert_eq!(range.end_date, "2014-12-07");
    }

    #[test]
    fn test_zoned_datetime_uses_its_own_date() {
        let beijing = chrono::FixedOffset::east_opt(8 * 3600).unwrap();
        let early = beijing.with_ymd_and_hms(2014, 12, 7, 1, 0, 0).unwrap();
        assert_eq!(
            early.into_date().unwrap(),
            NaiveDate::from_ymd_opt(2014, 12, 7).unwrap()
        );
    }

    #[test]
    fn test_invalid_date_is_invalid_argument() {
        let err = DateRange::new("2014-13-40", "2014-12-07").unwrap_err();
        assert!(matches!(err, WechatError::InvalidArgument(_)));
    }

    #[test]
    fn test_serialize_body() {
        let range = DateRange::new("2014-12-06", "2014-12-07").unwrap();
        let value = serde_json::to_value(&range).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"begin_date": "2014-12-06", "end_date": "2014-12-07"})
        );
    }
}
