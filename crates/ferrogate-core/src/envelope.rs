use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::timestamp::midpoint;
use crate::gateway::Operation;
use crate::{EpochMillis, ErrorCode, ExchangeId, GatewayError, ValidationError};

/// Caller-side correlation data attached to every operation request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BaseRequest {
    pub request_id: String,
    pub gateway_name: String,
}

impl BaseRequest {
    pub fn new(
        request_id: impl Into<String>,
        gateway_name: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let request_id = request_id.into();
        if request_id.trim().is_empty() {
            return Err(ValidationError::EmptyRequestId);
        }

        Ok(Self {
            request_id,
            gateway_name: gateway_name.into(),
        })
    }

    /// Creates a request with a random UUID v4 correlation id.
    pub fn generate(gateway_name: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            gateway_name: gateway_name.into(),
        }
    }
}

/// Send/receive instants of one exchange round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTiming {
    send_when: EpochMillis,
    receive_when: EpochMillis,
}

impl ResponseTiming {
    /// Clamps `receive_when` so it never precedes `send_when`, even if the
    /// wall clock stepped backwards mid-call.
    pub fn new(send_when: EpochMillis, receive_when: EpochMillis) -> Self {
        Self {
            send_when,
            receive_when: receive_when.max(send_when),
        }
    }

    /// Zero-length timing for outcomes decided before any dispatch.
    pub fn instant(at: EpochMillis) -> Self {
        Self::new(at, at)
    }

    pub const fn send_when(self) -> EpochMillis {
        self.send_when
    }

    pub const fn receive_when(self) -> EpochMillis {
        self.receive_when
    }

    pub const fn timegaps(self) -> i64 {
        self.receive_when - self.send_when
    }

    /// Server-reported time when available, otherwise the round-trip midpoint.
    pub fn processed_when(self, server_time: Option<EpochMillis>) -> EpochMillis {
        server_time.unwrap_or_else(|| midpoint(self.send_when, self.receive_when))
    }
}

/// Metadata embedded in every gateway response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseResponse {
    pub request_id: String,
    pub gateway_name: String,
    pub exchange: ExchangeId,
    pub operation: Operation,
    pub is_success: bool,
    pub send_when: EpochMillis,
    pub receive_when: EpochMillis,
    pub processed_when: EpochMillis,
    pub timegaps: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub is_permission_denied: bool,
    pub is_network_error: bool,
    pub is_rate_limit_exceeded: bool,
    pub is_system_error: bool,
}

impl BaseResponse {
    pub fn success(
        request: &BaseRequest,
        exchange: ExchangeId,
        operation: Operation,
        timing: ResponseTiming,
        server_time: Option<EpochMillis>,
    ) -> Self {
        Self {
            request_id: request.request_id.clone(),
            gateway_name: request.gateway_name.clone(),
            exchange,
            operation,
            is_success: true,
            send_when: timing.send_when(),
            receive_when: timing.receive_when(),
            processed_when: timing.processed_when(server_time),
            timegaps: timing.timegaps(),
            error_code: None,
            error_message: None,
            is_permission_denied: false,
            is_network_error: false,
            is_rate_limit_exceeded: false,
            is_system_error: false,
        }
    }

    pub fn failure(
        request: &BaseRequest,
        exchange: ExchangeId,
        operation: Operation,
        timing: ResponseTiming,
        error: &GatewayError,
    ) -> Self {
        let code = error.code();
        Self {
            is_success: false,
            processed_when: timing.processed_when(None),
            error_code: Some(code),
            error_message: Some(error.to_string()),
            is_permission_denied: matches!(
                code,
                ErrorCode::PermissionDenied | ErrorCode::AuthenticationFailed
            ),
            is_network_error: code == ErrorCode::Network,
            is_rate_limit_exceeded: code == ErrorCode::RateLimitExceeded,
            is_system_error: code == ErrorCode::System,
            ..Self::success(request, exchange, operation, timing, None)
        }
    }
}

/// Uniform operation response: metadata plus an optional payload.
///
/// `data` is always present on success. Failed responses usually carry no
/// data; the modify-or-replace composite keeps the cancelled order there
/// when only the replacement step failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response<T> {
    pub base: BaseResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> Response<T> {
    pub fn success(base: BaseResponse, data: T) -> Self {
        Self {
            base,
            data: Some(data),
        }
    }

    pub fn failure(base: BaseResponse) -> Self {
        Self { base, data: None }
    }

    pub const fn is_success(&self) -> bool {
        self.base.is_success
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.base.error_code
    }

    pub fn data(&self) -> Option<&T> {
        self.data.as_ref()
    }

    /// Converts into a `Result`, rebuilding the classified error on failure.
    pub fn into_result(self) -> Result<T, GatewayError> {
        match (self.base.is_success, self.data) {
            (true, Some(data)) => Ok(data),
            _ => Err(GatewayError::from_code(
                self.base.error_code.unwrap_or(ErrorCode::System),
                self.base
                    .error_message
                    .unwrap_or_else(|| String::from("response carried no data")),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> BaseRequest {
        BaseRequest::new("req-1", "upbit-main").expect("valid request")
    }

    #[test]
    fn rejects_blank_request_id() {
        let err = BaseRequest::new("  ", "gw").expect_err("must fail");
        assert_eq!(err, ValidationError::EmptyRequestId);
    }

    #[test]
    fn generated_request_ids_are_unique() {
        let a = BaseRequest::generate("gw");
        let b = BaseRequest::generate("gw");
        assert_ne!(a.request_id, b.request_id);
    }

    #[test]
    fn timing_clamps_backwards_clock() {
        let timing = ResponseTiming::new(1_000, 900);
        assert_eq!(timing.receive_when(), 1_000);
        assert_eq!(timing.timegaps(), 0);
    }

    #[test]
    fn success_prefers_server_time_over_midpoint() {
        let timing = ResponseTiming::new(1_000, 1_300);
        let with_server = BaseResponse::success(
            &request(),
            ExchangeId::Upbit,
            Operation::Ticker,
            timing,
            Some(1_234),
        );
        assert_eq!(with_server.processed_when, 1_234);
        assert_eq!(with_server.timegaps, 300);

        let without = BaseResponse::success(
            &request(),
            ExchangeId::Upbit,
            Operation::Ticker,
            timing,
            None,
        );
        assert_eq!(without.processed_when, 1_150);
    }

    #[test]
    fn failure_sets_category_flags() {
        let base = BaseResponse::failure(
            &request(),
            ExchangeId::Binance,
            Operation::Balance,
            ResponseTiming::new(10, 20),
            &GatewayError::RateLimitExceeded(String::from("429")),
        );
        assert!(!base.is_success);
        assert!(base.is_rate_limit_exceeded);
        assert!(!base.is_network_error);
        assert_eq!(base.error_code, Some(ErrorCode::RateLimitExceeded));
        assert_eq!(base.processed_when, 15);
    }

    #[test]
    fn into_result_rebuilds_error() {
        let base = BaseResponse::failure(
            &request(),
            ExchangeId::Upbit,
            Operation::Cancel,
            ResponseTiming::instant(5),
            &GatewayError::OrderNotFound(String::from("missing")),
        );
        let response: Response<()> = Response::failure(base);
        let err = response.into_result().expect_err("must fail");
        assert_eq!(err.code(), ErrorCode::OrderNotFound);
    }
}
