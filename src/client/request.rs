use std::time::Duration;

use http::Method;
use serde_json::Value;

use crate::transport::FilePart;

/// Declarative description of one API call.
///
/// Built by the resource APIs and handed to the
/// [`RequestDispatcher`](super::RequestDispatcher), which owns credential
/// injection, sending and error classification.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) json: Option<Value>,
    pub(crate) files: Vec<FilePart>,
    pub(crate) requires_credential: bool,
    pub(crate) timeout: Option<Duration>,
}

impl RequestSpec {
    /// `path` is relative to the API base URL, or an absolute `http(s)://` URL.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            json: None,
            files: Vec::new(),
            requires_credential: true,
            timeout: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    /// Attach a file; the request is then sent as `multipart/form-data`.
    pub fn file(mut self, file: FilePart) -> Self {
        self.files.push(file);
        self
    }

    /// Send without an `access_token`.
    pub fn without_credential(mut self) -> Self {
        self.requires_credential = false;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    pub(crate) fn is_absolute(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }
}
