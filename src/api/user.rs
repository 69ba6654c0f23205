use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::{ApiResponseBase, WechatApi, WechatContext};

/// Follower profile from `/cgi-bin/user/info`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserInfo {
    /// 0 when the user has unfollowed; the other fields are then absent
    #[serde(default)]
    pub subscribe: i32,
    pub openid: String,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Gender: 0=unknown, 1=male, 2=female
    #[serde(default)]
    pub sex: i32,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub province: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub headimgurl: Option<String>,
    #[serde(default)]
    pub subscribe_time: Option<i64>,
    #[serde(default)]
    pub unionid: Option<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub groupid: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct FollowerOpenIds {
    #[serde(default)]
    pub openid: Vec<String>,
}

/// One page of followers from `/cgi-bin/user/get`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FollowerList {
    /// Total number of followers
    pub total: u64,
    /// Number of openids in this page
    pub count: u64,
    #[serde(default)]
    pub data: FollowerOpenIds,
    /// Pass to the next call to continue; empty on the last page
    #[serde(default)]
    pub next_openid: String,
}

impl FollowerList {
    pub fn openids(&self) -> &[String] {
        &self.data.openid
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GroupIdResponse {
    pub(crate) groupid: i64,
}

/// User management API
#[derive(Clone)]
pub struct UserApi {
    context: Arc<WechatContext>,
}

impl UserApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// GET /cgi-bin/user/info
    ///
    /// `lang` defaults to `zh_CN`.
    pub async fn get(&self, openid: &str, lang: Option<&str>) -> Result<UserInfo, WechatError> {
        let spec = RequestSpec::get("/cgi-bin/user/info")
            .query("openid", openid)
            .query("lang", lang.unwrap_or("zh_CN"));
        self.context.execute_as(spec).await
    }

    /// GET /cgi-bin/user/get
    pub async fn get_followers(
        &self,
        next_openid: Option<&str>,
    ) -> Result<FollowerList, WechatError> {
        let mut spec = RequestSpec::get("/cgi-bin/user/get");
        if let Some(next) = next_openid {
            spec = spec.query("next_openid", next);
        }
        self.context.execute_as(spec).await
    }

    /// POST /cgi-bin/user/info/updateremark
    pub async fn update_remark(
        &self,
        openid: &str,
        remark: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/user/info/updateremark")
            .json(json!({"openid": openid, "remark": remark}));
        self.context.execute_as(spec).await
    }

    /// Group id of a follower (POST /cgi-bin/groups/getid)
    pub async fn get_group_id(&self, openid: &str) -> Result<i64, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/groups/getid").json(json!({"openid": openid}));
        let response: GroupIdResponse = self.context.execute_as(spec).await?;
        Ok(response.groupid)
    }
}

impl WechatApi for UserApi {
    fn api_name(&self) -> &'static str {
        "user"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::api::test_support::mock_context;

    #[tokio::test]
    async fn test_get_user_info() {
        let server = MockServer::start().await;
        let api = UserApi::new(mock_context(&server).await);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/user/info"))
            .and(query_param("openid", "o6_bmjrPTlm6_2sgVt7hMZOPfL2M"))
            .and(query_param("lang", "zh_CN"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "subscribe": 1,
                "openid": "o6_bmjrPTlm6_2sgVt7hMZOPfL2M",
                "nickname": "Band",
                "sex": 1,
                "language": "zh_CN",
                "city": "Guangzhou",
                "province": "Guangdong",
                "country": "China",
                "headimgurl": "http://wx.qlogo.cn/mmopen/0",
                "subscribe_time": 1382694957
            })))
            .mount(&server)
            .await;

        let user = api
            .get("o6_bmjrPTlm6_2sgVt7hMZOPfL2M", None)
            .await
            .unwrap();
        assert_eq!(user.nickname.as_deref(), Some("Band"));
        assert_eq!(user.sex, 1);
        assert!(user.unionid.is_none());
    }

    #[tokio::test]
    async fn test_get_followers() {
        let server = MockServer::start().await;
        let api = UserApi::new(mock_context(&server).await);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/user/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "total": 2,
                "count": 2,
                "data": {"openid": ["OPENID1", "OPENID2"]},
                "next_openid": "NEXT_OPENID"
            })))
            .mount(&server)
            .await;

        let result = api.get_followers(None).await.unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.count, 2);
        assert_eq!(result.openids(), ["OPENID1", "OPENID2"]);
        assert_eq!(result.next_openid, "NEXT_OPENID");
    }

    #[tokio::test]
    async fn test_get_followers_passes_cursor() {
        let server = MockServer::start().await;
        let api = UserApi::new(mock_context(&server).await);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/user/get"))
            .and(query_param("next_openid", "NEXT"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"total": 2, "count": 0})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let result = api.get_followers(Some("NEXT")).await.unwrap();
        assert!(result.openids().is_empty());
    }

    #[tokio::test]
    async fn test_update_remark() {
        let server = MockServer::start().await;
        let api = UserApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/user/info/updateremark"))
            .and(body_json(json!({"openid": "openid", "remark": "test"})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"errcode": 0, "errmsg": "ok"})),
            )
            .mount(&server)
            .await;

        let result = api.update_remark("openid", "test").await.unwrap();
        assert_eq!(result.errcode, 0);
    }

    #[tokio::test]
    async fn test_get_group_id() {
        let server = MockServer::start().await;
        let api = UserApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/groups/getid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"groupid": 102})))
            .mount(&server)
            .await;

        assert_eq!(api.get_group_id("openid").await.unwrap(), 102);
    }
}
