#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use account_feeds::bundle::{DELIMITER, SHIFT};
use account_feeds::error::TransportError;
use account_feeds::render::{RenderContext, RenderError, Renderer};
use account_feeds::source::{FetchResponse, RequestOptions, Transport};
use account_feeds::AccountRecord;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::StatusCode;

/// Forward transform of one obfuscation layer.
pub fn encode(plain: &str) -> String {
    let shifted: String = plain
        .chars()
        .rev()
        .map(|c| match c {
            'a'..='z' => ((c as u8 - b'a' + SHIFT) % 26 + b'a') as char,
            'A'..='Z' => ((c as u8 - b'A' + SHIFT) % 26 + b'A') as char,
            _ => c,
        })
        .collect();
    STANDARD.encode(shifted.as_bytes())
}

pub fn bundle(structured: &[&str], embedded: &[&str]) -> String {
    let first = encode(&structured.join("\n"));
    let second = encode(&embedded.join("\n"));
    encode(&format!("{first}{DELIMITER}{second}"))
}

pub enum Route {
    Ok(String),
    Status(u16),
    Hang,
}

/// Transport answering from a per-url table; unknown urls get a 404.
#[derive(Default)]
pub struct StubTransport {
    routes: HashMap<String, Route>,
    calls: Mutex<HashMap<String, u32>>,
    total: AtomicU32,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, route: Route) -> Self {
        self.routes.insert(url.to_owned(), route);
        self
    }

    pub fn calls(&self, url: &str) -> u32 {
        self.calls.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn fetch(
        &self,
        url: &str,
        _options: &RequestOptions,
    ) -> Result<FetchResponse, TransportError> {
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.calls.lock().unwrap().entry(url.to_owned()).or_default() += 1;

        match self.routes.get(url) {
            Some(Route::Ok(body)) => Ok(FetchResponse::new(StatusCode::OK, body.clone())),
            Some(Route::Status(code)) => Ok(FetchResponse::new(
                StatusCode::from_u16(*code).unwrap(),
                "",
            )),
            Some(Route::Hang) => std::future::pending().await,
            None => Ok(FetchResponse::new(StatusCode::NOT_FOUND, "")),
        }
    }
}

#[derive(Default)]
pub struct RecordingRenderer {
    pub rendered: Mutex<Vec<AccountRecord>>,
    pub promotion: Mutex<Option<String>>,
    pub starts: AtomicUsize,
    pub finishes: AtomicUsize,
}

impl RecordingRenderer {
    pub fn identifiers(&self) -> Vec<String> {
        self.rendered
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.identifier.clone())
            .collect()
    }
}

impl Renderer for RecordingRenderer {
    fn start(&self) {
        self.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn render(
        &self,
        records: &[AccountRecord],
        context: &RenderContext<'_>,
    ) -> Result<(), RenderError> {
        *self.promotion.lock().unwrap() = Some(context.promotion_link.to_owned());
        self.rendered.lock().unwrap().extend_from_slice(records);
        Ok(())
    }

    fn finish(&self) {
        self.finishes.fetch_add(1, Ordering::SeqCst);
    }
}
