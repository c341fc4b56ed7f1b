use http::HeaderMap;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Clone)]
pub struct StubReply {
    status: u16,
    content_type: &'static str,
    body: &'static str,
    delay_ms: u64,
}

impl StubReply {
    pub fn new(status: u16, content_type: &'static str, body: &'static str) -> Self {
        StubReply {
            status,
            content_type,
            body,
            delay_ms: 0,
        }
    }

    pub fn delayed(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

#[derive(Default)]
struct Recorded {
    hits: Vec<String>,
    last_headers: Option<HeaderMap>,
}

/// Static file server standing in for a sandbox. Paths without a reply get a 404.
pub struct StubUpstream {
    port: u16,
    recorded: Arc<Mutex<Recorded>>,
}

impl StubUpstream {
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base_url(), path_and_query)
    }

    /// Paths (with query) requested so far, in order.
    pub fn hits(&self) -> Vec<String> {
        self.recorded.lock().unwrap().hits.clone()
    }

    pub fn last_headers(&self) -> Option<HeaderMap> {
        self.recorded.lock().unwrap().last_headers.clone()
    }
}

pub async fn start_stub_upstream(replies: Vec<(&'static str, StubReply)>) -> StubUpstream {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to address");
    let port = listener.local_addr().unwrap().port();

    let replies: Arc<HashMap<&'static str, StubReply>> = Arc::new(replies.into_iter().collect());
    let recorded = Arc::new(Mutex::new(Recorded::default()));
    let server_recorded = recorded.clone();

    tokio::spawn(async move {
        loop {
            let (stream, _) = listener.accept().await.unwrap();
            let io = TokioIo::new(stream);
            let replies = replies.clone();
            let recorded = server_recorded.clone();

            tokio::spawn(async move {
                let handler = move |req: Request<Incoming>| {
                    let replies = replies.clone();
                    let recorded = recorded.clone();
                    async move { Ok::<_, Infallible>(reply(req, &replies, &recorded).await) }
                };
                if let Err(err) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                    .serve_connection(io, service_fn(handler))
                    .await
                {
                    eprintln!("Error serving connection: {:?}", err);
                }
            });
        }
    });

    StubUpstream { port, recorded }
}

async fn reply(
    req: Request<Incoming>,
    replies: &HashMap<&'static str, StubReply>,
    recorded: &Mutex<Recorded>,
) -> Response<Full<Bytes>> {
    let stub = replies.get(req.uri().path()).cloned();
    {
        let mut recorded = recorded.lock().unwrap();
        let path_and_query = req
            .uri()
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_default();
        recorded.hits.push(path_and_query);
        recorded.last_headers = Some(req.headers().clone());
    }

    let stub = stub.unwrap_or_else(|| StubReply::new(404, "text/plain", "not found"));
    if stub.delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(stub.delay_ms)).await;
    }

    Response::builder()
        .status(stub.status)
        .header("content-type", stub.content_type)
        .body(Full::new(Bytes::from_static(stub.body.as_bytes())))
        .unwrap()
}

/// A local port with nothing listening on it.
pub async fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}
