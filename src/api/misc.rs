//! Miscellaneous endpoints: short URLs and the callback server IP list.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::{WechatApi, WechatContext};

#[derive(Debug, Deserialize)]
struct ShortUrlResponse {
    short_url: String,
}

#[derive(Debug, Deserialize)]
struct IpListResponse {
    #[serde(default)]
    ip_list: Vec<String>,
}

#[derive(Clone)]
pub struct MiscApi {
    context: Arc<WechatContext>,
}

impl MiscApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Convert a long URL into a short one.
    ///
    /// POST /cgi-bin/shorturl
    pub async fn short_url(&self, long_url: &str) -> Result<String, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/shorturl")
            .json(json!({"action": "long2short", "long_url": long_url}));
        let response: ShortUrlResponse = self.context.execute_as(spec).await?;
        Ok(response.short_url)
    }

    /// IP addresses WeChat servers call back from.
    ///
    /// GET /cgi-bin/getcallbackip
    pub async fn get_wechat_ips(&self) -> Result<Vec<String>, WechatError> {
        let response: IpListResponse = self
            .context
            .execute_as(RequestSpec::get("/cgi-bin/getcallbackip"))
            .await?;
        Ok(response.ip_list)
    }
}

impl WechatApi for MiscApi {
    fn api_name(&self) -> &'static str {
        "misc"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::test_support::mock_context;

    #[tokio::test]
    async fn test_short_url() {
        let server = MockServer::start().await;
        let api = MiscApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/shorturl"))
            .and(body_json(
                json!({"action": "long2short", "long_url": "http://www.qq.com"}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_json(
                json!({"errcode": 0, "errmsg": "ok", "short_url": "http://qq.com"}),
            ))
            .mount(&server)
            .await;

        assert_eq!(
            api.short_url("http://www.qq.com").await.unwrap(),
            "http://qq.com"
        );
    }

    #[tokio::test]
    async fn test_get_wechat_ips() {
        let server = MockServer::start().await;
        let api = MiscApi::new(mock_context(&server).await);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/getcallbackip"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"ip_list": ["127.0.0.1"]})),
            )
            .mount(&server)
            .await;

        assert_eq!(api.get_wechat_ips().await.unwrap(), vec!["127.0.0.1"]);
    }
}
