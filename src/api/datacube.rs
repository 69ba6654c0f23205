//! Statistics (datacube) API
//!
//! Every endpoint takes an inclusive `{begin_date, end_date}` range and
//! answers `{"list": [...]}`; the list is returned as-is since the row
//! shape differs per endpoint.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::common::{DateRange, IntoDate};
use super::{WechatApi, WechatContext};

#[derive(Debug, Deserialize)]
struct DatacubeList {
    #[serde(default)]
    list: Vec<Value>,
}

/// Statistics API
#[derive(Clone)]
pub struct DatacubeApi {
    context: Arc<WechatContext>,
}

impl DatacubeApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Follower gains and losses per day.
    ///
    /// POST /datacube/getusersummary
    pub async fn get_user_summary(
        &self,
        begin_date: impl IntoDate,
        end_date: impl IntoDate,
    ) -> Result<Vec<Value>, WechatError> {
        self.query("/datacube/getusersummary", begin_date, end_date)
            .await
    }

    /// Cumulative follower count per day.
    ///
    /// POST /datacube/getusercumulate
    pub async fn get_user_cumulate(
        &self,
        begin_date: impl IntoDate,
        end_date: impl IntoDate,
    ) -> Result<Vec<Value>, WechatError> {
        self.query("/datacube/getusercumulate", begin_date, end_date)
            .await
    }

    /// POST /datacube/getarticlesummary
    pub async fn get_article_summary(
        &self,
        begin_date: impl IntoDate,
        end_date: impl IntoDate,
    ) -> Result<Vec<Value>, WechatError> {
        self.query("/datacube/getarticlesummary", begin_date, end_date)
            .await
    }

    /// POST /datacube/getuserread
    pub async fn get_user_read(
        &self,
        begin_date: impl IntoDate,
        end_date: impl IntoDate,
    ) -> Result<Vec<Value>, WechatError> {
        self.query("/datacube/getuserread", begin_date, end_date)
            .await
    }

    async fn query(
        &self,
        path: &str,
        begin_date: impl IntoDate,
        end_date: impl IntoDate,
    ) -> Result<Vec<Value>, WechatError> {
        let range = DateRange::new(begin_date, end_date)?;
        let spec = RequestSpec::post(path).json(serde_json::to_value(&range)?);
        let response: DatacubeList = self.context.execute_as(spec).await?;
        Ok(response.list)
    }
}

impl WechatApi for DatacubeApi {
    fn api_name(&self) -> &'static str {
        "datacube"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::test_support::mock_context;

    async fn mount_range(server: &MockServer, endpoint: &str) {
        Mock::given(method("POST"))
            .and(path(endpoint))
            .and(body_json(
                json!({"begin_date": "2014-12-06", "end_date": "2014-12-07"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"list": [
                {"ref_date": "2014-12-07", "user_source": 0, "new_user": 0, "cancel_user": 0}
            ]})))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_user_summary_with_strings() {
        let server = MockServer::start().await;
        let api = DatacubeApi::new(mock_context(&server).await);
        mount_range(&server, "/datacube/getusersummary").await;

        let result = api
            .get_user_summary("2014-12-06", "2014-12-07")
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_user_cumulate_with_dates() {
        let server = MockServer::start().await;
        let api = DatacubeApi::new(mock_context(&server).await);
        mount_range(&server, "/datacube/getusercumulate").await;

        let result = api
            .get_user_cumulate(
                NaiveDate::from_ymd_opt(2014, 12, 6).unwrap(),
                NaiveDate::from_ymd_opt(2014, 12, 7).unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn test_article_endpoints() {
        let server = MockServer::start().await;
        let api = DatacubeApi::new(mock_context(&server).await);
        mount_range(&server, "/datacube/getarticlesummary").await;
        mount_range(&server, "/datacube/getuserread").await;

        assert_eq!(
            api.get_article_summary("20141206", "2014-12-07")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            api.get_user_read("2014-12-06", String::from("2014-12-07"))
                .await
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_bad_date_fails_before_request() {
        let server = MockServer::start().await;
        let api = DatacubeApi::new(mock_context(&server).await);

        let err = api
            .get_user_summary("yesterday", "2014-12-07")
            .await
            .unwrap_err();
        assert!(matches!(err, WechatError::InvalidArgument(_)));
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
