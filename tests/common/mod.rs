//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use cardscan_gateway::completion::{CompletionError, CompletionService};
use cardscan_gateway::config::{OutboundConfig, ServiceConfig};
use cardscan_gateway::http::AppState;
use cardscan_gateway::lifecycle::{Components, Shutdown};
use cardscan_gateway::outbound::{SafeFetcher, StaticResolver};
use cardscan_gateway::security::store::MemoryStore;
use cardscan_gateway::security::RateLimiter;
use cardscan_gateway::HttpServer;

/// Hostname the static resolver maps to loopback.
pub const FIXTURE_HOST: &str = "fixture.test";

/// A canned HTTP response.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Omit `Content-Length` and stream the body until close.
    pub chunked_close: bool,
}

impl MockResponse {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "text/html; charset=utf-8".into())],
            body: body.into(),
            chunked_close: false,
        }
    }

    pub fn json(body: &serde_json::Value) -> Self {
        Self {
            status: 200,
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: body.to_string().into_bytes(),
            chunked_close: false,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            chunked_close: false,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn unsized_body(mut self) -> Self {
        self.chunked_close = true;
        self
    }
}

/// A request as seen by the mock.
#[derive(Debug, Clone)]
pub struct SeenRequest {
    pub head: String,
    pub body: Vec<u8>,
}

impl SeenRequest {
    pub fn path(&self) -> &str {
        self.head.split_whitespace().nth(1).unwrap_or("")
    }
}

async fn read_request(socket: &mut TcpStream) -> Option<SeenRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    let header_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[header_end..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }

    Some(SeenRequest { head, body })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        302 => "Found",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

async fn write_response(socket: &mut TcpStream, response: MockResponse) {
    let mut head = format!("HTTP/1.1 {} {}\r\n", response.status, reason(response.status));
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    if !response.chunked_close {
        head.push_str(&format!("Content-Length: {}\r\n", response.body.len()));
    }
    head.push_str("Connection: close\r\n\r\n");

    let _ = socket.write_all(head.as_bytes()).await;
    for piece in response.body.chunks(64 * 1024) {
        if socket.write_all(piece).await.is_err() {
            break;
        }
    }
    let _ = socket.shutdown().await;
}

/// Start a programmable mock backend on an ephemeral loopback port.
///
/// Every request is recorded; the closure picks the reply.
pub async fn start_programmable_backend<F, Fut>(f: F) -> (SocketAddr, Arc<Mutex<Vec<SeenRequest>>>)
where
    F: Fn(SeenRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = MockResponse> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let f = Arc::new(f);

    let recorded = seen.clone();
    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let f = f.clone();
            let recorded = recorded.clone();
            tokio::spawn(async move {
                let Some(request) = read_request(&mut socket).await else {
                    return;
                };
                recorded.lock().unwrap().push(request.clone());
                let response = f(request).await;
                write_response(&mut socket, response).await;
            });
        }
    });

    (addr, seen)
}

/// Start a mock backend that always returns `response`.
pub async fn start_mock_backend(response: MockResponse) -> SocketAddr {
    let (addr, _) = start_programmable_backend(move |_| {
        let response = response.clone();
        async move { response }
    })
    .await;
    addr
}

/// Outbound policy that lets tests reach the loopback mock.
pub fn loopback_outbound() -> OutboundConfig {
    OutboundConfig {
        allow_http: true,
        allow_private_networks: true,
        timeout_ms: 2_000,
        ..OutboundConfig::default()
    }
}

pub fn loopback_fetcher(config: &OutboundConfig) -> SafeFetcher {
    let resolver = StaticResolver::new().with(FIXTURE_HOST, &[IpAddr::V4(Ipv4Addr::LOCALHOST)]);
    SafeFetcher::new(config, Arc::new(resolver))
}

/// Completion backend with a fixed reply; records every prompt.
pub struct StubCompletion {
    reply: Result<String, ()>,
    pub prompts: Mutex<Vec<String>>,
}

impl StubCompletion {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: Err(()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CompletionService for StubCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .map_err(|_| CompletionError::Status {
                status: 500,
                body: "stub failure: api key leaked? sk-test-123".into(),
            })
    }
}

/// A gateway running on an ephemeral port.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub completion: Arc<StubCompletion>,
    pub shutdown: Shutdown,
}

impl TestGateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// Start a gateway with a memory store, loopback fetcher and stub completion.
pub async fn start_gateway(config: ServiceConfig, completion: StubCompletion) -> TestGateway {
    let completion = Arc::new(completion);
    let limiter = RateLimiter::new(
        Arc::new(MemoryStore::new()),
        config.rate_limit.limit,
        config.rate_limit.window(),
        config.rate_limit.on_store_error,
    );
    let verifier = cardscan_gateway::attestation::build_verifier(&config.attestation).unwrap();

    let components = Components {
        state: AppState {
            verifier,
            limiter: Arc::new(limiter),
            fetcher: Arc::new(loopback_fetcher(&config.outbound)),
            completion: completion.clone(),
            max_body_bytes: config.security.max_body_bytes,
            max_page_text_chars: config.outbound.max_page_text_chars,
        },
        memory_store: None,
    };

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = HttpServer::with_components(config, components);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        addr,
        completion,
        shutdown,
    }
}
