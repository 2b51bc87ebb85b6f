//! Shared fixtures for gateway behavior tests.
//!
//! `ScriptedHttpClient` answers by (method, path) and records every request;
//! `RecordingSigner` stands in for the external signer.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ferrogate_core::{
    BaseRequest, BinanceGateway, Credentials, ExchangeId, ExchangePolicy, GatewayError, HttpAuth,
    HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, RequestSigner, Signature,
    SigningPayload, Symbol, UpbitGateway,
};

type Reply = Result<HttpResponse, HttpError>;

struct Route {
    method: HttpMethod,
    path: String,
    /// The last reply repeats once the queue is down to one.
    replies: VecDeque<Reply>,
}

/// In-memory transport with scripted replies.
pub struct ScriptedHttpClient {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<HttpRequest>>,
    latency: Duration,
}

impl Default for ScriptedHttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedHttpClient {
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
            latency: Duration::ZERO,
        }
    }

    /// Queues a reply for `method path`; replies are served in order.
    pub fn on(self, method: HttpMethod, path: &str, response: HttpResponse) -> Self {
        self.push(method, path, Ok(response))
    }

    pub fn on_error(self, method: HttpMethod, path: &str, error: HttpError) -> Self {
        self.push(method, path, Err(error))
    }

    /// Simulated round-trip time, measured on the tokio clock.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn push(self, method: HttpMethod, path: &str, reply: Reply) -> Self {
        {
            let mut routes = self.routes.lock().expect("routes lock");
            match routes
                .iter_mut()
                .find(|route| route.method == method && route.path == path)
            {
                Some(route) => route.replies.push_back(reply),
                None => routes.push(Route {
                    method,
                    path: path.to_owned(),
                    replies: VecDeque::from([reply]),
                }),
            }
        }
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && path_of(&request.url) == path)
            .count()
    }

    fn reply(&self, request: &HttpRequest) -> Reply {
        let path = path_of(&request.url);
        let mut routes = self.routes.lock().expect("routes lock");
        let Some(route) = routes
            .iter_mut()
            .find(|route| route.method == request.method && route.path == path)
        else {
            return Ok(HttpResponse::new(
                404,
                format!("no scripted route for {} {path}", request.method),
            ));
        };

        if route.replies.len() > 1 {
            route.replies.pop_front().expect("non-empty queue")
        } else {
            route.replies.front().cloned().expect("non-empty queue")
        }
    }
}

impl HttpClient for ScriptedHttpClient {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests
                .lock()
                .expect("requests lock")
                .push(request.clone());
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            self.reply(&request)
        })
    }
}

/// Path component of a URL, without host or query.
pub fn path_of(url: &str) -> &str {
    let without_query = url.split('?').next().unwrap_or(url);
    let after_scheme = without_query
        .split_once("://")
        .map_or(without_query, |(_, rest)| rest);
    after_scheme
        .find('/')
        .map_or("/", |index| &after_scheme[index..])
}

/// Query component of a URL, if any.
pub fn query_of(url: &str) -> Option<&str> {
    url.split_once('?').map(|(_, query)| query)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedCall {
    pub exchange: ExchangeId,
    pub method: HttpMethod,
    pub path: String,
    pub query: String,
    pub body: Option<String>,
}

/// Signer that records its inputs and returns a fixed token.
#[derive(Default)]
pub struct RecordingSigner {
    calls: Mutex<Vec<SignedCall>>,
}

impl RecordingSigner {
    pub fn calls(&self) -> Vec<SignedCall> {
        self.calls.lock().expect("signer lock").clone()
    }
}

impl RequestSigner for RecordingSigner {
    fn sign(
        &self,
        credentials: &Credentials,
        payload: &SigningPayload<'_>,
    ) -> Result<Signature, GatewayError> {
        self.calls.lock().expect("signer lock").push(SignedCall {
            exchange: payload.exchange,
            method: payload.method,
            path: payload.path.to_owned(),
            query: payload.query.to_owned(),
            body: payload.body.map(str::to_owned),
        });

        Ok(match payload.exchange {
            ExchangeId::Binance => Signature::header(HttpAuth::Header {
                name: String::from("X-MBX-APIKEY"),
                value: credentials.get("API key").unwrap_or_default().to_owned(),
            })
            .with_query("signature", "deadbeef"),
            ExchangeId::Upbit => Signature::header(HttpAuth::BearerToken(String::from("jwt-token"))),
        })
    }
}

pub fn base(request_id: &str) -> BaseRequest {
    BaseRequest::new(request_id, "test-gateway").expect("valid request")
}

pub fn symbol(value: &str) -> Symbol {
    Symbol::parse(value).expect("valid symbol")
}

pub fn binance_credentials() -> Credentials {
    Credentials::new()
        .with("API key", "binance-key")
        .with("API secret", "binance-secret")
}

pub fn upbit_credentials() -> Credentials {
    Credentials::new()
        .with("Access key", "upbit-access")
        .with("Secret key", "upbit-secret")
}

pub fn binance_gateway(
    policy: ExchangePolicy,
    transport: Arc<ScriptedHttpClient>,
    signer: Arc<RecordingSigner>,
) -> BinanceGateway {
    BinanceGateway::with_policy(binance_credentials(), policy)
        .expect("valid gateway")
        .with_transport(transport)
        .with_signer(signer)
}

pub fn upbit_gateway(
    policy: ExchangePolicy,
    transport: Arc<ScriptedHttpClient>,
    signer: Arc<RecordingSigner>,
) -> UpbitGateway {
    UpbitGateway::with_policy(upbit_credentials(), policy)
        .expect("valid gateway")
        .with_transport(transport)
        .with_signer(signer)
}
