//! Follower Group API

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::user::GroupIdResponse;
use super::{ApiResponseBase, WechatApi, WechatContext};

/// A follower group
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Group {
    pub id: i64,
    pub name: String,
    /// Member count; only present in `list`
    #[serde(default)]
    pub count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GroupEnvelope {
    group: Group,
}

#[derive(Debug, Deserialize)]
struct GroupList {
    #[serde(default)]
    groups: Vec<Group>,
}

/// Follower group API
#[derive(Clone)]
pub struct GroupApi {
    context: Arc<WechatContext>,
}

impl GroupApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// POST /cgi-bin/groups/create
    pub async fn create(&self, name: &str) -> Result<Group, WechatError> {
        let spec =
            RequestSpec::post("/cgi-bin/groups/create").json(json!({"group": {"name": name}}));
        let envelope: GroupEnvelope = self.context.execute_as(spec).await?;
        Ok(envelope.group)
    }

    /// GET /cgi-bin/groups/get
    pub async fn list(&self) -> Result<Vec<Group>, WechatError> {
        let list: GroupList = self
            .context
            .execute_as(RequestSpec::get("/cgi-bin/groups/get"))
            .await?;
        Ok(list.groups)
    }

    /// POST /cgi-bin/groups/getid
    pub async fn get_user_group(&self, openid: &str) -> Result<i64, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/groups/getid").json(json!({"openid": openid}));
        let response: GroupIdResponse = self.context.execute_as(spec).await?;
        Ok(response.groupid)
    }

    /// POST /cgi-bin/groups/update
    pub async fn update(&self, group_id: i64, name: &str) -> Result<ApiResponseBase, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/groups/update")
            .json(json!({"group": {"id": group_id, "name": name}}));
        self.context.execute_as(spec).await
    }

    /// POST /cgi-bin/groups/members/update
    pub async fn move_user(
        &self,
        openid: &str,
        group_id: i64,
    ) -> Result<ApiResponseBase, WechatError> {
        let spec = RequestSpec::post("/cgi-bin/groups/members/update")
            .json(json!({"openid": openid, "to_groupid": group_id}));
        self.context.execute_as(spec).await
    }
}

impl WechatApi for GroupApi {
    fn api_name(&self) -> &'static str {
        "group"
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
    async fn test_create_group() {
        let server = MockServer::start().await;
        let api = GroupApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/groups/create"))
            .and(body_json(json!({"group": {"name": "test"}})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"group": {"id": 1, "name": "test"}})),
            )
            .mount(&server)
            .await;

        let group = api.create("test").await.unwrap();
        assert_eq!(group.id, 1);
        assert_eq!(group.name, "test");
        assert_eq!(group.count, None);
    }

    #[tokio::test]
    async fn test_list_groups() {
        let server = MockServer::start().await;
        let api = GroupApi::new(mock_context(&server).await);

        Mock::given(method("GET"))
            .and(path("/cgi-bin/groups/get"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"groups": [
                {"id": 0, "name": "unassigned", "count": 72596},
                {"id": 1, "name": "blacklist", "count": 36}
            ]})))
            .mount(&server)
            .await;

        let groups = api.list().await.unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[1].count, Some(36));
    }

    #[tokio::test]
    async fn test_move_user() {
        let server = MockServer::start().await;
        let api = GroupApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/groups/members/update"))
            .and(body_json(json!({"openid": "o_abc", "to_groupid": 108})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
            .expect(1)
            .mount(&server)
            .await;

        api.move_user("o_abc", 108).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_lookup() {
        let server = MockServer::start().await;
        let api = GroupApi::new(mock_context(&server).await);

        Mock::given(method("POST"))
            .and(path("/cgi-bin/groups/update"))
            .and(body_json(json!({"group": {"id": 108, "name": "renamed"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"errcode": 0})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cgi-bin/groups/getid"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"groupid": 108})))
            .mount(&server)
            .await;

        assert!(api.update(108, "renamed").await.unwrap().is_success());
        assert_eq!(api.get_user_group("o_abc").await.unwrap(), 108);
    }
}
