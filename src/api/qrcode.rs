//! Parametric QR Code API
//!
//! `create` registers a scene and returns a ticket; the image itself is
//! served by the mp host at `showqrcode?ticket=...` and needs no token.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::client::RequestSpec;
use crate::error::WechatError;

use super::{WechatApi, WechatContext};

const SHOW_QRCODE_PATH: &str = "/cgi-bin/showqrcode";

/// Characters escaped in the ticket query value.
/// Tickets are base64-like, so `+`, `/` and `=` must not leak through.
const TICKET_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b'/')
    .add(b'=')
    .add(b'?');

/// Result of `/cgi-bin/qrcode/create`
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct QrcodeTicket {
    pub ticket: String,
    /// Absent for permanent codes
    #[serde(default)]
    pub expire_seconds: Option<u64>,
    /// Content encoded in the QR image
    #[serde(default)]
    pub url: Option<String>,
}

/// Anything a showqrcode ticket can be taken from.
///
/// A bare ticket string, a [`QrcodeTicket`], or the raw JSON answer of
/// `create` (`{"ticket": ...}`) all resolve to the same ticket.
pub trait AsTicket {
    fn as_ticket(&self) -> Result<&str, WechatError>;
}

impl AsTicket for str {
    fn as_ticket(&self) -> Result<&str, WechatError> {
        Ok(self)
    }
}

impl AsTicket for String {
    fn as_ticket(&self) -> Result<&str, WechatError> {
        Ok(self)
    }
}

impl AsTicket for QrcodeTicket {
    fn as_ticket(&self) -> Result<&str, WechatError> {
        Ok(&self.ticket)
    }
}

impl AsTicket for Value {
    fn as_ticket(&self) -> Result<&str, WechatError> {
        match self {
            Value::String(ticket) => Ok(ticket),
            Value::Object(map) => map.get("ticket").and_then(Value::as_str).ok_or_else(|| {
                WechatError::InvalidArgument("ticket object has no string `ticket` field".into())
            }),
            other => Err(WechatError::InvalidArgument(format!(
                "cannot take a ticket from {other}"
            ))),
        }
    }
}

/// QR code API
#[derive(Clone)]
pub struct QrcodeApi {
    context: Arc<WechatContext>,
}

impl QrcodeApi {
    pub fn new(context: Arc<WechatContext>) -> Self {
        Self { context }
    }

    /// POST /cgi-bin/qrcode/create
    ///
    /// `data` is the scene definition, e.g.
    /// `{"expire_seconds": 1800, "action_name": "QR_SCENE", "action_info": {"scene": {"scene_id": 123}}}`.
    pub async fn create<T: Serialize + ?Sized>(
        &self,
        data: &T,
    ) -> Result<QrcodeTicket, WechatError> {
        let body = serde_json::to_value(data)?;
        self.context
            .execute_as(RequestSpec::post("/cgi-bin/qrcode/create").json(body))
            .await
    }

    /// Download the QR code image for `ticket`.
    ///
    /// GET {mp host}/cgi-bin/showqrcode, sent without access token.
    pub async fn show<T: AsTicket + ?Sized>(&self, ticket: &T) -> Result<Vec<u8>, WechatError> {
        let url = self.get_url(ticket)?;
        self.context
            .execute_raw(RequestSpec::get(url).without_credential())
            .await
    }

    /// Build the showqrcode URL locally; no request is made.
    pub fn get_url<T: AsTicket + ?Sized>(&self, ticket: &T) -> Result<String, WechatError> {
        Ok(showqrcode_url(
            self.context.mp_base_url(),
            ticket.as_ticket()?,
        ))
    }
}

impl WechatApi for QrcodeApi {
    fn api_name(&self) -> &'static str {
        "qrcode"
    }

    fn context(&self) -> &WechatContext {
        &self.context
    }
}

fn showqrcode_url(mp_base_url: &str, ticket: &str) -> String {
    format!(
        "{}{}?ticket={}",
        mp_base_url.trim_end_matches('/'),
        SHOW_QRCODE_PATH,
        utf8_percent_encode(ticket, TICKET_ENCODE_SET)
    )
}
