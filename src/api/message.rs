//! Message API
//!
//! Customer service messages (`/cgi-bin/message/custom/send`) and template
//! messages (`/cgi-bin/message/template/send`).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::{ApiResponseBase, WechatApi, WechatContext};

/// Customer service message payloads, tagged by `msgtype`.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "msgtype", rename_all = "lowercase")]
pub enum CustomMessage {
    Text { text: TextContent },
    Image { image: MediaContent },
    Voice { voice: MediaContent },
    Video { video: VideoContent },
    Music { music: MusicContent },
    News { news: NewsContent },
}

#[derive(Debug, Clone, Serialize)]
pub struct TextContent {
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MediaContent {
    pub media_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct VideoContent {
    pub media_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MusicContent {
    pub musicurl: String,
    pub hqmusicurl: String,
    pub thumb_media_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsContent {
    pub articles: Vec<Article>,
}

/// One entry of a news (articles) message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub description: String,
    pub url: String,
    /// Cover image URL, sent as `picurl`
    #[serde(rename = "picurl")]
    pub image: String,
}

impl Article {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        url: impl Into<String>,
        image: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            url: url.into(),
            image: image.into(),
        }
    }
}

#[derive(Serialize)]
struct CustomMessageRequest<'a> {
    touser: &'a str,
    #[serde(flatten)]
    message: &'a CustomMessage,
}

/// One keyword of a template message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateField {
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// Template message, built field by field.
///
/// ```rust
/// use wechat_oa_sdk::api::TemplateMessage;
///
/// let msg = TemplateMessage::new("openid", "template-id")
///     .url("https://example.com/order/1")
///     .field("first", "Your order has shipped")
///     .colored_field("remark", "Thanks", "#173177");
/// assert_eq!(msg.data.len(), 2);
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct TemplateMessage {
    pub touser: String,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topcolor: Option<String>,
    pub data: BTreeMap<String, TemplateField>,
}

impl TemplateMessage {
    pub fn new(touser: impl Into<String>, template_id: impl Into<String>) -> Self {
        Self {
            touser: touser.into(),
            template_id: template_id.into(),
            url: None,
            topcolor: None,
            data: BTreeMap::new(),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn topcolor(mut self, color: impl Into<String>) -> Self {
        self.topcolor = Some(color.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.data.insert(
            name.into(),
            TemplateField {
                value: value.into(),
                color: None,
            },
        );
        self
    }

    pub fn colored_field(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        color: impl Into<String>,
    ) -> Self {
        self.data.insert(
            name.into(),
            TemplateField {
                value: value.into(),
                color: Some(color.into()),
            },
        );
        self
    }
}

#[derive(Debug, Deserialize)]
struct TemplateSendResponse {
    msgid: i64,
}

/// Message API
#[derive(Clone)]
pub struct MessageApi {
    context: Arc<WechatContext>,
}

impl MessageApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Send a customer service message to `touser`.
    ///
    /// POST /cgi-bin/message/custom/send
    pub async fn send(
        &self,
        touser: &str,
        message: &CustomMessage,
    ) -> Result<ApiResponseBase, WechatError> {
        let body = serde_json::to_value(CustomMessageRequest { touser, message })?;
        self.context
            .execute_as(RequestSpec::post("/cgi-bin/message/custom/send").json(body))
            .await
    }

    pub async fn send_text(
        &self,
        touser: &str,
        content: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::Text {
            text: TextContent {
                content: content.to_string(),
            },
        };
        self.send(touser, &message).await
    }

    pub async fn send_image(
        &self,
        touser: &str,
        media_id: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::Image {
            image: MediaContent {
                media_id: media_id.to_string(),
            },
        };
        self.send(touser, &message).await
    }

    pub async fn send_voice(
        &self,
        touser: &str,
        media_id: &str,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::Voice {
            voice: MediaContent {
                media_id: media_id.to_string(),
            },
        };
        self.send(touser, &message).await
    }

    pub async fn send_video(
        &self,
        touser: &str,
        media_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::Video {
            video: VideoContent {
                media_id: media_id.to_string(),
                title: title.map(str::to_string),
                description: description.map(str::to_string),
            },
        };
        self.send(touser, &message).await
    }

    pub async fn send_music(
        &self,
        touser: &str,
        url: &str,
        hq_url: &str,
        thumb_media_id: &str,
        title: Option<&str>,
        description: Option<&str>,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::Music {
            music: MusicContent {
                musicurl: url.to_string(),
                hqmusicurl: hq_url.to_string(),
                thumb_media_id: thumb_media_id.to_string(),
                title: title.map(str::to_string),
                description: description.map(str::to_string),
            },
        };
        self.send(touser, &message).await
    }

    pub async fn send_articles(
        &self,
        touser: &str,
        articles: Vec<Article>,
    ) -> Result<ApiResponseBase, WechatError> {
        let message = CustomMessage::News {
            news: NewsContent { articles },
        };
        self.send(touser, &message).await
    }

    /// Send a template message and return its `msgid`.
    ///
    /// POST /cgi-bin/message/template/send
    pub async fn send_template(&self, message: &TemplateMessage) -> Result<i64, WechatError> {
        let body = serde_json::to_value(message)?;
        let response: TemplateSendResponse = self
            .context
            .execute_as(RequestSpec::post("/cgi-bin/message/template/send").json(body))
            .await?;
        Ok(response.msgid)
    }
}

impl WechatApi for MessageApi {
    fn api_name(&self) -> &'static str {
        "message"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}
