//! Test doubles for the HTTP transport seam.
//!
//! Integration tests wire [`FakeTransport`] into [`ApClient`] so no test
//! ever touches the network: GET responses are canned per URL, POSTs are
//! recorded and answered with a scripted status sequence.
//!
//! [`ApClient`]: crate::client::ApClient

#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use starling_common::{AppError, AppResult};

use crate::client::{HttpResponse, HttpTransport};

/// A POST as the fake transport saw it.
#[derive(Debug, Clone)]
pub struct RecordedPost {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl RecordedPost {
    /// Value of a header, case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An in-memory [`HttpTransport`].
#[derive(Clone, Default)]
pub struct FakeTransport {
    inner: Arc<FakeTransportInner>,
}

#[derive(Default)]
struct FakeTransportInner {
    responses: Mutex<HashMap<String, Value>>,
    post_statuses: Mutex<VecDeque<u16>>,
    posts: Mutex<Vec<RecordedPost>>,
}

impl FakeTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` for GETs of `url`.
    pub fn insert_response(&self, url: &str, body: Value) {
        self.inner
            .responses
            .lock()
            .unwrap()
            .insert(url.to_string(), body);
    }

    /// Queue a status for the next POST; when the queue is empty POSTs
    /// answer 202.
    pub fn push_post_status(&self, status: u16) {
        self.inner.post_statuses.lock().unwrap().push_back(status);
    }

    /// Everything POSTed so far.
    #[must_use]
    pub fn posts(&self) -> Vec<RecordedPost> {
        self.inner.posts.lock().unwrap().clone()
    }

    /// Drop recorded posts.
    pub fn clear_posts(&self) {
        self.inner.posts.lock().unwrap().clear();
    }
}

#[async_trait]
impl HttpTransport for FakeTransport {
    async fn get(&self, url: &str, _accept: &str) -> AppResult<HttpResponse> {
        let responses = self.inner.responses.lock().unwrap();
        match responses.get(url) {
            Some(body) => Ok(HttpResponse {
                status: 200,
                body: body.clone(),
            }),
            None => Ok(HttpResponse {
                status: 404,
                body: Value::Null,
            }),
        }
    }

    async fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: Vec<u8>,
    ) -> AppResult<u16> {
        let parsed: Value = serde_json::from_slice(&body)
            .map_err(|e| AppError::Internal(format!("fake transport: non-JSON body: {e}")))?;
        self.inner.posts.lock().unwrap().push(RecordedPost {
            url: url.to_string(),
            headers: headers.to_vec(),
            body: parsed,
        });
        let status = self
            .inner
            .post_statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(202);
        Ok(status)
    }
}
