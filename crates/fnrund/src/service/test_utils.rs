//! Test helpers for the HTTP binding.

use std::net::SocketAddr;
use std::time::Duration;

use fnrun_config::ListenEndpoint;
use reqwest::Method;
use reqwest::blocking::Client;
use tracing::level_filters::LevelFilter;

use super::{HttpService, InvocationSink, ServiceHandle};
use crate::handler::SharedHandler;
use crate::invoker::Invoker;

/// HTTP reply captured for assertions.
#[derive(Debug)]
pub(crate) struct HttpReply {
    pub(crate) status: u16,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl HttpReply {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub(crate) fn json(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).expect("response body should be JSON")
    }
}

/// Starts a service on an ephemeral loopback port.
pub(crate) fn start_service(handler: SharedHandler, workers: usize) -> ServiceHandle {
    let service =
        HttpService::bind(&ListenEndpoint::tcp("127.0.0.1", 0)).expect("bind http service");
    let sink = InvocationSink::new(Invoker::new(handler, LevelFilter::INFO), 1024 * 1024);
    service.start(sink, workers).expect("start http service")
}

/// Sends one request and reads the whole reply.
pub(crate) fn send(addr: SocketAddr, method: &str, path: &str, body: &[u8]) -> HttpReply {
    let verb = Method::from_bytes(method.as_bytes()).expect("valid HTTP method");
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .expect("build HTTP client");
    let response = client
        .request(verb, format!("http://{addr}{path}"))
        .body(body.to_vec())
        .send()
        .expect("send request");
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_owned(),
                value.to_str().unwrap_or_default().to_owned(),
            )
        })
        .collect();
    let text = response.text().expect("read response body");
    HttpReply {
        status,
        headers,
        body: text,
    }
}
