//! One exchange round trip.
//!
//! The worker looks up the endpoint's weight, waits for admission, signs
//! private calls, executes the request under the policy timeout and folds
//! every exchange or transport failure into a failed [`Response`]. Only
//! contract violations leave as `Err`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::adapters::{Converter, Parsed, Parser, WireCall};
use crate::auth::{Credentials, RequestSigner, SigningPayload};
use crate::domain::timestamp::now_millis;
use crate::gateway::Operation;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest, HttpResponse};
use crate::throttling::Throttler;
use crate::weights::{EndpointSpec, WeightTable};
use crate::{
    BaseRequest, BaseResponse, EpochMillis, ExchangeId, GatewayError, Response, ResponseTiming,
};

pub(crate) struct Worker {
    pub(crate) exchange: ExchangeId,
    pub(crate) base_url: String,
    pub(crate) request_timeout: Duration,
    pub(crate) weights: WeightTable,
    pub(crate) throttler: Throttler,
    pub(crate) credentials: Credentials,
    pub(crate) transport: Arc<dyn HttpClient>,
    pub(crate) signer: Arc<dyn RequestSigner>,
}

impl Worker {
    /// Runs one converted call and parses its successful body with `parse`.
    pub(crate) async fn run<T, C, P, F>(
        &self,
        converter: &C,
        parser: &P,
        operation: Operation,
        base: &BaseRequest,
        call: Result<WireCall, GatewayError>,
        parse: F,
    ) -> Result<Response<T>, GatewayError>
    where
        C: Converter + ?Sized,
        P: Parser + ?Sized,
        F: FnOnce(&P, &HttpResponse) -> Result<Parsed<T>, GatewayError>,
    {
        let mut call = match call {
            Ok(call) => call,
            Err(err) => return self.rejected(base, operation, err),
        };

        let spec = *self.weights.lookup(call.method, &call.path)?;
        let cost = spec.cost.cost(&call.params);

        if let Err(err) = self.admit(&spec, cost).await {
            return self.rejected(base, operation, err);
        }

        let send_when = now_millis();
        let request = match self.build_request(converter, &mut call, &spec, send_when) {
            Ok(request) => request,
            Err(err) => return self.rejected(base, operation, err),
        };

        debug!(
            exchange = %self.exchange,
            operation = %operation,
            request_id = %base.request_id,
            method = %call.method,
            path = %call.path,
            category = %spec.category,
            cost,
            "dispatching exchange call"
        );

        let outcome = tokio::time::timeout(self.request_timeout, self.transport.execute(request)).await;
        let timing = ResponseTiming::new(send_when, now_millis());

        let response = match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(http_error)) => {
                let err = GatewayError::network(format!(
                    "{} {} {}: {http_error}",
                    self.exchange, call.method, call.path
                ));
                return Ok(self.failed(base, operation, timing, err));
            }
            Err(_) => {
                let err = GatewayError::network(format!(
                    "{} {} {} timed out after {}ms",
                    self.exchange,
                    call.method,
                    call.path,
                    self.request_timeout.as_millis()
                ));
                return Ok(self.failed(base, operation, timing, err));
            }
        };

        if response.is_rate_limited() {
            self.throttler
                .report_rate_limited(spec.category, response.retry_after());
            let err = match parser.error(&response) {
                err @ GatewayError::RateLimitExceeded(_) => err,
                other => GatewayError::RateLimitExceeded(other.to_string()),
            };
            return Ok(self.failed(base, operation, timing, err));
        }

        if !response.is_success() {
            let err = parser.error(&response);
            return Ok(self.failed(base, operation, timing, err));
        }

        self.throttler.report_accepted(spec.category);

        match parse(parser, &response) {
            Ok(parsed) => {
                debug!(
                    exchange = %self.exchange,
                    operation = %operation,
                    request_id = %base.request_id,
                    status = response.status,
                    elapsed_ms = timing.timegaps(),
                    "exchange call completed"
                );
                let meta =
                    BaseResponse::success(base, self.exchange, operation, timing, parsed.server_time);
                Ok(Response::success(meta, parsed.value))
            }
            Err(err) if err.is_contract_violation() => Err(err),
            Err(err) => Ok(self.failed(base, operation, timing, err)),
        }
    }

    /// Weight is returned when the order-count limit turns the call away.
    async fn admit(&self, spec: &EndpointSpec, cost: u32) -> Result<(), GatewayError> {
        let permit = self.throttler.acquire(spec.category, cost).await?;
        if spec.counts_as_order {
            if let Err(err) = self.throttler.acquire_order_slot().await {
                self.throttler.refund(permit);
                return Err(err);
            }
        }
        Ok(())
    }

    fn build_request<C: Converter + ?Sized>(
        &self,
        converter: &C,
        call: &mut WireCall,
        spec: &EndpointSpec,
        timestamp: EpochMillis,
    ) -> Result<HttpRequest, GatewayError> {
        let mut auth = HttpAuth::None;
        let mut extra_query = Vec::new();

        if spec.signed {
            converter.prepare_signed(&mut call.params, timestamp);
            let query = call.params.encode();
            let body = call.has_json_body().then(|| call.json_params());
            let signature = self.signer.sign(
                &self.credentials,
                &SigningPayload {
                    exchange: self.exchange,
                    method: call.method,
                    path: &call.path,
                    query: &query,
                    body: body.as_deref(),
                    timestamp,
                },
            )?;
            auth = signature.auth;
            extra_query = signature.extra_query;
        }

        let mut query = if call.has_json_body() {
            String::new()
        } else {
            call.params.encode()
        };
        for (name, value) in &extra_query {
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&urlencoding::encode(name));
            query.push('=');
            query.push_str(&urlencoding::encode(value));
        }

        let mut url = format!("{}{}", self.base_url.trim_end_matches('/'), call.path);
        if !query.is_empty() {
            url.push('?');
            url.push_str(&query);
        }

        let mut request = HttpRequest::new(call.method, url)
            .with_header("accept", "application/json")
            .with_auth(&auth)
            .with_timeout(self.request_timeout);
        if call.has_json_body() {
            request = request
                .with_header("content-type", "application/json")
                .with_body(call.json_params());
        }
        Ok(request)
    }

    /// Folds a pre-dispatch failure into an instant failed response.
    fn rejected<T>(
        &self,
        base: &BaseRequest,
        operation: Operation,
        err: GatewayError,
    ) -> Result<Response<T>, GatewayError> {
        if err.is_contract_violation() {
            return Err(err);
        }
        Ok(self.failed(base, operation, ResponseTiming::instant(now_millis()), err))
    }

    pub(crate) fn failed<T>(
        &self,
        base: &BaseRequest,
        operation: Operation,
        timing: ResponseTiming,
        err: GatewayError,
    ) -> Response<T> {
        warn!(
            exchange = %self.exchange,
            operation = %operation,
            request_id = %base.request_id,
            code = %err.code(),
            error = %err,
            "exchange call failed"
        );
        Response::failure(BaseResponse::failure(
            base,
            self.exchange,
            operation,
            timing,
            &err,
        ))
    }
}
