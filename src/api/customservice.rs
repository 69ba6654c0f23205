//! Customer Service Account API
//!
//! Account management lives under `/customservice/kfaccount/*` while the
//! listing endpoints stay under `/cgi-bin/customservice/*`.

use std::sync::Arc;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::client::RequestSpec;
use crate::error::WechatError;
use crate::transport::FilePart;

use super::{ApiResponseBase, WechatApi, WechatContext};

/// A customer service account from `getkflist`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KfAccount {
    /// `name@wechat_account`
    pub kf_account: String,
    #[serde(default)]
    pub kf_nick: String,
    #[serde(default)]
    pub kf_id: Option<String>,
    #[serde(default)]
    pub kf_headimgurl: Option<String>,
}

/// An online customer service account from `getonlinekflist`
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct KfOnlineAccount {
    pub kf_account: String,
    /// 1 = web client online
    #[serde(default)]
    pub status: i32,
    #[serde(default)]
    pub kf_id: Option<String>,
    #[serde(default)]
    pub auto_accept: u32,
    #[serde(default)]
    pub accepted_case: u32,
}

#[derive(Debug, Deserialize)]
struct KfList {
    #[serde(default)]
    kf_list: Vec<KfAccount>,
}

#[derive(Debug, Deserialize)]
struct KfOnlineList {
    #[serde(default)]
    kf_online_list: Vec<KfOnlineAccount>,
}

/// Customer service account API
#[derive(Clone)]
pub struct CustomServiceApi {
    context: Arc<WechatContext>,
}

impl CustomServiceApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// POST /customservice/kfaccount/add
    ///
    /// `password` is plain text; it is sent as its MD5 hex digest.
    pub async fn add_account(
        &self,
        account: &str,
        nickname: &str,
        password: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        self.manage_account("/customservice/kfaccount/add", account, nickname, password)
            .await
    }

    /// POST /customservice/kfaccount/update
    pub async fn update_account(
        &self,
        account: &str,
        nickname: &str,
        password: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        self.manage_account("/customservice/kfaccount/update", account, nickname, password)
            .await
    }

    /// POST /customservice/kfaccount/del
    pub async fn delete_account(
        &self,
        account: &str,
        nickname: &str,
        password: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        self.manage_account("/customservice/kfaccount/del", account, nickname, password)
            .await
    }

    async fn manage_account(
        &self,
        path: &str,
        account: &str,
        nickname: &str,
        password: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        let spec = RequestSpec::post(path).json(json!({
            "kf_account": account,
            "nickname": nickname,
            "password": md5_hex(password),
        }));
        self.context.execute_as(spec).await
    }

    /// POST /customservice/kfaccount/uploadheadimg?kf_account=ACCOUNT (multipart, field `media`)
    pub async fn upload_headimg(
        &self,
        account: &str,
        filename: &str,
        data: &[u8],
    ) -> Result<ApiResponseBase, WechatError> {
        let spec = RequestSpec::post("/customservice/kfaccount/uploadheadimg")
            .query("kf_account", account)
            .file(FilePart::new("media", filename, data));
        self.context.execute_as(spec).await
    }

    /// GET /cgi-bin/customservice/getkflist
    pub async fn get_accounts(&self) -> Result<Vec<KfAccount>, WechatError> {
        let list: KfList = self
            .context
            .execute_as(RequestSpec::get("/cgi-bin/customservice/getkflist"))
            .await?;
        Ok(list.kf_list)
    }

    /// GET /cgi-bin/customservice/getonlinekflist
    pub async fn get_online_accounts(&self) -> Result<Vec<KfOnlineAccount>, WechatError> {
        let list: KfOnlineList = self
            .context
            .execute_as(RequestSpec::get("/cgi-bin/customservice/getonlinekflist"))
            .await?;
        Ok(list.kf_online_list)
    }
}

impl WechatApi for CustomServiceApi {
    fn api_name(&self) -> &'static str {
        "customservice"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}
