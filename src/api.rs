//! HTTP surface of the quote engine.

use std::sync::Arc;

use anyhow::Result;
use axum::{
    Json, Router,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::config::ServiceConfig;
use crate::engine::{FinancingResult, compute};
use crate::error::{FinancingError, InputField};
use crate::input::{Commission, FinancingDefaults, FinancingInput, TERM_PRESETS};

/// Decimal places of every amount returned over HTTP.
const RESPONSE_DP: u32 = 2;

/// Shared state of the router: the defaults applied to absent request fields.
#[derive(Clone)]
pub struct AppState {
    defaults: Arc<FinancingDefaults>,
}

impl AppState {
    /// Wraps the defaults for cheap cloning across handlers.
    pub fn new(defaults: FinancingDefaults) -> Self {
        Self {
            defaults: Arc::new(defaults),
        }
    }
}

/// Builds the financing routes: health, defaults, calculate and quick quote.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/financing/defaults", get(defaults))
        .route("/api/financing/calculate", post(calculate))
        .route("/api/financing/quote", get(quick_quote))
        .with_state(state)
}

/// Binds `config.bind_addr` and serves [`router`] until the process stops.
///
/// # Errors
///
/// Fails when the address cannot be bound or the server stops with an I/O error.
pub async fn serve(config: ServiceConfig) -> Result<()> {
    let app = router(AppState::new(config.defaults));

    info!("financing api listening on {}", config.bind_addr);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Body of `POST /api/financing/calculate`. Absent fields take the configured
/// defaults; `downPayment` wins over `downPaymentPercent` when both are sent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculateRequest {
    pub price: Decimal,
    pub down_payment: Option<Decimal>,
    pub down_payment_percent: Option<Decimal>,
    pub term_months: Option<i64>,
    pub annual_rate_percent: Option<Decimal>,
    pub commission: Option<Commission>,
    pub monthly_insurance: Option<Decimal>,
    pub balloon_percent: Option<Decimal>,
    pub itbis_on_commission: Option<bool>,
}

impl CalculateRequest {
    pub fn into_input(self, defaults: &FinancingDefaults) -> Result<FinancingInput, FinancingError> {
        let mut input = defaults.input_for(self.price);

        if let Some(term) = self.term_months {
            input.term_months = term_from_wire(term)?;
        }
        if let Some(percent) = self.down_payment_percent {
            input = input.with_down_payment_percent(percent);
        }
        if let Some(amount) = self.down_payment {
            input = input.with_down_payment_amount(amount);
        }
        if let Some(rate) = self.annual_rate_percent {
            input.annual_rate_percent = rate;
        }
        if let Some(commission) = self.commission {
            input.commission = commission;
        }
        if let Some(insurance) = self.monthly_insurance {
            input.monthly_insurance = insurance;
        }
        if let Some(balloon) = self.balloon_percent {
            input.balloon_percent = balloon;
        }
        if let Some(itbis) = self.itbis_on_commission {
            input.itbis_on_commission = itbis;
        }

        Ok(input)
    }
}

fn term_from_wire(term: i64) -> Result<u32, FinancingError> {
    u32::try_from(term).map_err(|_| {
        FinancingError::invalid(InputField::Term, "term must be a positive number of months")
    })
}

/// Query of the quick quote, `annualRate` given as a fraction (0.18 = 18%).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickQuoteQuery {
    pub vehicle_price: Decimal,
    pub down_payment: Decimal,
    pub term_months: i64,
    pub annual_rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickQuote {
    pub principal: Decimal,
    pub monthly_payment: Decimal,
    pub term_months: u32,
    pub annual_rate: Decimal,
}

impl QuickQuoteQuery {
    /// A bare loan: no commission, insurance or balloon.
    pub fn into_input(self) -> Result<FinancingInput, FinancingError> {
        let rate_percent = self.annual_rate.checked_mul(dec!(100)).ok_or_else(|| {
            FinancingError::invalid(InputField::Rate, "annual rate is out of range")
        })?;
        Ok(FinancingInput::for_price(self.vehicle_price)
            .with_down_payment_amount(self.down_payment)
            .with_term(term_from_wire(self.term_months)?)
            .with_annual_rate(rate_percent)
            .with_commission(Commission::Flat(Decimal::ZERO))
            .with_insurance(Decimal::ZERO)
            .with_balloon(Decimal::ZERO)
            .with_itbis(false))
    }
}

/// Rejection returned to HTTP clients as a 400 with `{kind, field, message}`.
#[derive(Debug)]
pub enum ApiError {
    /// A field failed validation; `kind` and `field` name it.
    Input(FinancingError),
    /// The body or query string could not be decoded. Reported as
    /// `invalid_request` with a null `field`.
    Malformed(String),
}

impl ApiError {
    /// Machine-readable error kind, e.g. `invalid_term` or `invalid_request`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Input(err) => err.kind(),
            Self::Malformed(_) => "invalid_request",
        }
    }
}

impl From<FinancingError> for ApiError {
    fn from(err: FinancingError) -> Self {
        Self::Input(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::Malformed(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let body = match self {
            Self::Input(err) => json!({
                "kind": kind,
                "field": err.field(),
                "message": err.to_string(),
            }),
            Self::Malformed(message) => json!({
                "kind": kind,
                "field": null,
                "message": message,
            }),
        };
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({"ok": true}))
}

async fn defaults(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "defaults": *state.defaults,
        "termPresets": TERM_PRESETS,
    }))
}

async fn calculate(
    State(state): State<AppState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<FinancingResult>, ApiError> {
    let Json(req) = payload.map_err(malformed)?;
    let input = req.into_input(&state.defaults).inspect_err(log_rejection)?;
    let result = compute(&input).inspect_err(log_rejection)?;

    info!(
        price = %input.price,
        principal = %result.principal_financed,
        term_months = input.term_months,
        "financing calculated"
    );
    Ok(Json(result.rounded(RESPONSE_DP)))
}

async fn quick_quote(
    query: Result<Query<QuickQuoteQuery>, QueryRejection>,
) -> Result<Json<QuickQuote>, ApiError> {
    let Query(query) = query.map_err(malformed)?;
    let annual_rate = query.annual_rate;
    let input = query.into_input().inspect_err(log_rejection)?;
    let result = compute(&input).inspect_err(log_rejection)?;

    info!(
        price = %input.price,
        principal = %result.principal_financed,
        term_months = input.term_months,
        "quick quote"
    );
    Ok(Json(QuickQuote {
        principal: result.principal_financed.round_dp(RESPONSE_DP),
        monthly_payment: result.monthly_payment.round_dp(RESPONSE_DP),
        term_months: input.term_months,
        annual_rate,
    }))
}

fn log_rejection(err: &FinancingError) {
    warn!(kind = err.kind(), "rejected financing request: {err}");
}

fn malformed<R>(rejection: R) -> ApiError
where
    R: Into<ApiError> + std::fmt::Display,
{
    warn!(kind = "invalid_request", "malformed financing request: {rejection}");
    rejection.into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn state() -> AppState {
        AppState::new(FinancingDefaults::default())
    }

    #[test]
    fn test_request_falls_back_to_defaults() {
        let req: CalculateRequest = serde_json::from_str(r#"{"price": 1000000}"#).unwrap();
        let input = req.into_input(&FinancingDefaults::default()).unwrap();

        assert_eq!(input, FinancingInput::for_price(dec!(1000000)));
    }

    #[test]
    fn test_request_amount_wins_over_percent() {
        let req: CalculateRequest = serde_json::from_str(
            r#"{
                "price": 500000,
                "downPayment": 50000,
                "downPaymentPercent": 40,
                "termMonths": 48,
                "commission": {"type": "flat", "value": 25000},
                "itbisOnCommission": true
            }"#,
        )
        .unwrap();
        let input = req.into_input(&FinancingDefaults::default()).unwrap();

        assert_eq!(input.down_payment_amount(), dec!(50000));
        assert_eq!(input.down_payment_percent(), dec!(10));
        assert_eq!(input.term_months, 48);
        assert_eq!(input.commission, Commission::Flat(dec!(25000)));
        assert!(input.itbis_on_commission);
    }

    #[test]
    fn test_negative_term_is_invalid_term() {
        let req = CalculateRequest {
            price: dec!(100000),
            term_months: Some(-12),
            ..Default::default()
        };
        let err = req.into_input(&FinancingDefaults::default()).unwrap_err();
        assert_eq!(err.kind(), "invalid_term");
    }

    #[tokio::test]
    async fn test_calculate_returns_rounded_quote() {
        let req = CalculateRequest {
            price: dec!(240000),
            down_payment: Some(Decimal::ZERO),
            term_months: Some(24),
            annual_rate_percent: Some(Decimal::ZERO),
            commission: Some(Commission::Flat(Decimal::ZERO)),
            monthly_insurance: Some(Decimal::ZERO),
            ..Default::default()
        };

        let Json(result) = calculate(State(state()), Ok(Json(req))).await.unwrap();

        assert_eq!(result.base_payment, dec!(10000));
        assert_eq!(result.monthly_payment, dec!(10000));
        assert_eq!(result.total_interest, Decimal::ZERO);
        assert_eq!(result.schedule.len(), 24);
    }

    #[tokio::test]
    async fn test_calculate_rejects_down_payment_over_price() {
        let req = CalculateRequest {
            price: dec!(100000),
            down_payment: Some(dec!(100000)),
            ..Default::default()
        };

        let err = calculate(State(state()), Ok(Json(req))).await.unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["kind"], "invalid_down_payment");
        assert_eq!(value["field"], "downPayment");
    }

    #[tokio::test]
    async fn test_quick_quote_uses_annuity_formula() {
        let query = QuickQuoteQuery {
            vehicle_price: dec!(25000),
            down_payment: dec!(5000),
            term_months: 60,
            annual_rate: dec!(0.18),
        };

        let Json(quote) = quick_quote(Ok(Query(query))).await.unwrap();

        assert_eq!(quote.principal, dec!(20000));
        assert_eq!(quote.monthly_payment, dec!(507.87));
        assert_eq!(quote.term_months, 60);
    }

    #[tokio::test]
    async fn test_quick_quote_rejects_zero_term() {
        let query = QuickQuoteQuery {
            vehicle_price: dec!(25000),
            down_payment: dec!(5000),
            term_months: 0,
            annual_rate: dec!(0.18),
        };

        let err = quick_quote(Ok(Query(query))).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_term");
    }

    #[tokio::test]
    async fn test_quick_quote_rejects_out_of_range_rate() {
        let query = QuickQuoteQuery {
            vehicle_price: dec!(25000),
            down_payment: dec!(5000),
            term_months: 60,
            annual_rate: Decimal::MAX,
        };

        let err = quick_quote(Ok(Query(query))).await.unwrap_err();
        assert_eq!(err.kind(), "invalid_rate");
    }

    async fn send(request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = router(state()).oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn amount(value: &serde_json::Value) -> Decimal {
        value.as_str().unwrap().parse().unwrap()
    }

    fn post_calculate(body: &'static str) -> Request<Body> {
        Request::post("/api/financing/calculate")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_route() {
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"ok": true}));
    }

    #[tokio::test]
    async fn test_calculate_route_returns_quote() {
        let (status, body) = send(post_calculate(r#"{"price": 1000000}"#)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(amount(&body["principalFinanced"]), dec!(800000));
        assert_eq!(body["schedule"].as_array().map(Vec::len), Some(24));
    }

    #[tokio::test]
    async fn test_calculate_route_without_price_is_invalid_request() {
        let (status, body) = send(post_calculate(r#"{"termMonths": 24}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
        assert_eq!(body["field"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_calculate_route_with_unparseable_price_is_invalid_request() {
        let (status, body) = send(post_calculate(r#"{"price": "abc"}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_calculate_route_without_json_content_type() {
        let request = Request::post("/api/financing/calculate")
            .body(Body::from(r#"{"price": 1000000}"#))
            .unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_calculate_route_reports_invalid_field() {
        let (status, body) = send(post_calculate(r#"{"price": 100000, "termMonths": 0}"#)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_term");
        assert_eq!(body["field"], "term");
    }

    #[tokio::test]
    async fn test_quote_route_with_missing_params_is_invalid_request() {
        let request = Request::get("/api/financing/quote?vehiclePrice=25000")
            .body(Body::empty())
            .unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "invalid_request");
    }

    #[tokio::test]
    async fn test_quote_route() {
        let request = Request::get(
            "/api/financing/quote?vehiclePrice=25000&downPayment=5000&termMonths=60&annualRate=0.18",
        )
        .body(Body::empty())
        .unwrap();
        let (status, body) = send(request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(amount(&body["monthlyPayment"]), dec!(507.87));
    }
}
