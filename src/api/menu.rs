//! Custom Menu API
//!
//! The menu definition is free-form JSON (`{"button": [...]}`), so any
//! `Serialize` value is accepted.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::{ApiResponseBase, WechatApi, WechatContext};

/// errcode returned by `menu/get` when no menu is configured.
pub const MENU_NOT_EXIST: i32 = 46003;

/// Custom menu API
#[derive(Clone)]
pub struct MenuApi {
    context: Arc<WechatContext>,
}

impl MenuApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// POST /cgi-bin/menu/create
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        menu: &T,
    ) -> Result<ApiResponseBase, WechatError> {
        let body = serde_json::to_value(menu)?;
        self.context
            .execute_as(RequestSpec::post("/cgi-bin/menu/create").json(body))
            .await
    }

    /// GET /cgi-bin/menu/get
    ///
    /// Returns `None` when the account has no menu (errcode 46003).
    pub async fn get(&self) -> Result<Option<Value>, WechatError> {
        match self.context.execute(RequestSpec::get("/cgi-bin/menu/get")).await {
            Ok(menu) => Ok(Some(menu)),
            Err(WechatError::Api { code, .. }) if code == MENU_NOT_EXIST => {
                log::debug!("[{}] no menu configured", self.api_name());
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// GET /cgi-bin/menu/delete
    pub async fn delete(&self) -> Result<ApiResponseBase, WechatError> {
        self.context
            .execute_as(RequestSpec::get("/cgi-bin/menu/delete"))
            .await
    }

    /// Replace the current menu: delete, then create.
    pub async fn update<T: Serialize + ?Sized>(
        &self,
        menu: &T,
    ) -> Result<ApiResponseBase, WechatError> {
        self.delete().await?;
        self.create(menu).await
    }
}

impl WechatApi for MenuApi {
    fn api_name(&self) -> &'static str {
        "menu"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}
