//! Temporary Media Management API
//!
//! Uploads and downloads temporary media files. Uploaded media stays
//! available for 3 days.
//!
//! ## Supported Media Types
//!
//! - Image (image): jpg, png
//! - Voice (voice): mp3, amr
//! - Video (video): mp4
//! - Thumbnail (thumb): jpg
//!
//! ## Example
//!
//! ```ignore
//! use wechat_oa_sdk::api::MediaType;
//!
//! let image_data = std::fs::read("image.jpg")?;
//! let response = client.media().upload(MediaType::Image, "image.jpg", &image_data).await?;
//! let data = client.media().download(&response.media_id).await?;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::client::RequestSpec;
use crate::error::WechatError;
use crate::transport::FilePart;

use super::{WechatApi, WechatContext};

/// Uploads may be large; give them more room than the client default.
const UPLOAD_TIMEOUT: Duration = Duration::from_secs(120);

/// Media type for temporary media upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    /// Image file (jpg, png)
    Image,
    /// Voice file (mp3, amr)
    Voice,
    /// Video file (mp4)
    Video,
    /// Thumbnail file (jpg)
    Thumb,
}

impl MediaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Image => "image",
            MediaType::Voice => "voice",
            MediaType::Video => "video",
            MediaType::Thumb => "thumb",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response from temporary media upload
#[non_exhaustive]
#[derive(Debug, Clone, Deserialize)]
pub struct MediaUploadResponse {
    /// Type of the uploaded media
    #[serde(rename = "type")]
    pub media_type: String,
    /// Identifier for later download or message sending
    #[serde(default)]
    pub media_id: String,
    /// Thumbnail uploads answer with `thumb_media_id` instead of `media_id`
    #[serde(default)]
    pub thumb_media_id: Option<String>,
    /// Unix timestamp when the media was created
    pub created_at: i64,
}

/// Temporary media API
#[derive(Clone)]
pub struct MediaApi {
    context: Arc<WechatContext>,
}

impl MediaApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// Upload temporary media
    ///
    /// POST /cgi-bin/media/upload?type=TYPE (multipart, field `media`)
    pub async fn upload(
        &self,
        media_type: MediaType,
        filename: &str,
        data: &[u8],
    ) -> Result<MediaUploadResponse, WechatError> {
        log::debug!(
            "[{}] uploading {} ({} bytes) as {}",
            self.api_name(),
            filename,
            data.len(),
            media_type
        );
        let spec = RequestSpec::post("/cgi-bin/media/upload")
            .query("type", media_type.as_str())
            .file(FilePart::new("media", filename, data))
            .timeout(UPLOAD_TIMEOUT);
        self.context.execute_as(spec).await
    }

    /// Download temporary media
    ///
    /// GET /cgi-bin/media/get?media_id=MEDIA_ID
    ///
    /// Returns the raw file content. An unknown or expired `media_id` is
    /// answered with a JSON error body, surfaced as `WechatError::Api`.
    pub async fn download(&self, media_id: &str) -> Result<Vec<u8>, WechatError> {
        let spec = RequestSpec::get("/cgi-bin/media/get").query("media_id", media_id);
        self.context.execute_raw(spec).await
    }
}

impl WechatApi for MediaApi {
    fn api_name(&self) -> &'static str {
        "media"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}
