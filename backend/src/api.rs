//! REST API
//!
//! Thin HTTP surface over the price and rate services.

use std::sync::Arc;

use axum::{
    Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    cache::CacheStats,
    database::Database,
    error::{PriceError, Result},
    price_service::PriceService,
    rates::RateService,
    types::{DetailedPrice, PriceQuote, UsageStats},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub prices: PriceService,
    pub rates: Arc<RateService>,
    pub db: Option<Arc<Database>>,
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Price endpoints
        .route("/api/v1/prices", get(get_prices))
        .route("/api/v1/price/:symbol", get(get_price))
        .route("/api/v1/price/:symbol/detail", get(get_price_detail))
        // Conversion endpoints
        .route("/api/v1/rate", get(get_rate))
        .route("/api/v1/convert", get(convert))
        // Observability
        .route("/api/v1/usage", get(usage_stats))
        .route("/api/v1/health", get(health_check))
        // Admin endpoints
        .route("/api/v1/admin/cache/clear", post(clear_cache))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// PRICE ENDPOINTS
// ============================================================================

/// GET /api/v1/prices
///
/// Query params: ?symbols=BTC,ETH,GOLD (omit for all enabled assets)
async fn get_prices(
    State(state): State<AppState>,
    Query(params): Query<MultiPriceQuery>,
) -> Result<Json<MultiPriceResponse>> {
    let symbols: Option<Vec<String>> = params.symbols.map(|list| {
        list.split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    });

    info!(
        "Fetching prices for {}",
        symbols.as_ref().map_or("all symbols".to_string(), |s| s.join(","))
    );

    let quotes = state.prices.get_prices(symbols.as_deref()).await?;
    let data = quotes.as_ref().clone();

    Ok(Json(MultiPriceResponse {
        success: true,
        count: data.len(),
        data,
        timestamp: chrono::Utc::now().timestamp(),
    }))
}

/// GET /api/v1/price/:symbol
async fn get_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceResponse>> {
    let quote = state
        .prices
        .get_price(&symbol)
        .await?
        .ok_or(PriceError::UnknownSymbol(symbol))?;

    Ok(Json(PriceResponse {
        success: true,
        data: quote,
        timestamp: chrono::Utc::now().timestamp(),
    }))
}

/// GET /api/v1/price/:symbol/detail
async fn get_price_detail(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> Result<Json<DetailResponse>> {
    let detail = state
        .prices
        .get_detailed_price(&symbol)
        .await?
        .ok_or(PriceError::UnknownSymbol(symbol))?;

    Ok(Json(DetailResponse {
        success: true,
        data: detail,
        timestamp: chrono::Utc::now().timestamp(),
    }))
}

// ============================================================================
// CONVERSION ENDPOINTS
// ============================================================================

/// GET /api/v1/rate?from=BTC&to=USDT
async fn get_rate(
    State(state): State<AppState>,
    Query(params): Query<RateQuery>,
) -> Result<Json<RateResponse>> {
    let rate = state.rates.get_rate(&params.from, &params.to).await?;

    Ok(Json(RateResponse {
        success: true,
        from: params.from.to_ascii_uppercase(),
        to: params.to.to_ascii_uppercase(),
        rate,
        timestamp: chrono::Utc::now().timestamp(),
    }))
}

/// GET /api/v1/convert?amount=2&from=BTC&to=USDT
async fn convert(
    State(state): State<AppState>,
    Query(params): Query<ConvertQuery>,
) -> Result<Json<ConvertResponse>> {
    let result = state
        .rates
        .convert(params.amount, &params.from, &params.to)
        .await?;
    // Served from the rate cache populated by `convert`
    let rate = state.rates.get_rate(&params.from, &params.to).await?;

    Ok(Json(ConvertResponse {
        success: true,
        from: params.from.to_ascii_uppercase(),
        to: params.to.to_ascii_uppercase(),
        amount: params.amount,
        rate,
        result,
    }))
}

// ============================================================================
// OBSERVABILITY ENDPOINTS
// ============================================================================

/// GET /api/v1/usage
async fn usage_stats(State(state): State<AppState>) -> Json<UsageResponse> {
    Json(UsageResponse {
        success: true,
        data: state.prices.get_usage_stats(),
    })
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = match &state.db {
        Some(db) => Some(db.health_check().await),
        None => None,
    };

    Json(HealthResponse {
        success: database.unwrap_or(true),
        database,
        cache: state.prices.cache_stats().await,
        usage: state.prices.get_usage_stats(),
        timestamp: chrono::Utc::now().timestamp(),
    })
}

// ============================================================================
// ADMIN ENDPOINTS
// ============================================================================

/// POST /api/v1/admin/cache/clear
///
/// Clear cached prices (rates and usage history are kept)
async fn clear_cache(State(state): State<AppState>) -> Json<AdminResponse> {
    state.prices.clear_cache().await;

    Json(AdminResponse {
        success: true,
        message: "Price cache cleared".to_string(),
    })
}

// ============================================================================
// REQUEST/RESPONSE TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct MultiPriceQuery {
    pub symbols: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RateQuery {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub amount: f64,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize)]
pub struct PriceResponse {
    pub success: bool,
    pub data: PriceQuote,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct MultiPriceResponse {
    pub success: bool,
    pub data: Vec<PriceQuote>,
    pub count: usize,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub success: bool,
    pub data: DetailedPrice,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct RateResponse {
    pub success: bool,
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    pub success: bool,
    pub from: String,
    pub to: String,
    pub amount: f64,
    pub rate: f64,
    pub result: f64,
}

#[derive(Debug, Serialize)]
pub struct UsageResponse {
    pub success: bool,
    pub data: UsageStats,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub success: bool,
    /// `None` when running without a database
    pub database: Option<bool>,
    pub cache: CacheStats,
    pub usage: UsageStats,
    pub timestamp: i64,
}

#[derive(Debug, Serialize)]
pub struct AdminResponse {
    pub success: bool,
    pub message: String,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

impl IntoResponse for PriceError {
    fn into_response(self) -> Response {
        let status = match &self {
            PriceError::UnknownSymbol(_) | PriceError::CurrencyNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            PriceError::InvalidRate { .. } => StatusCode::BAD_GATEWAY,
            PriceError::Config(_) | PriceError::DatabaseError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::SERVICE_UNAVAILABLE,
        };

        let message = if status == StatusCode::SERVICE_UNAVAILABLE {
            format!("Prices temporarily unavailable, retry shortly ({})", self)
        } else {
            self.to_string()
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message,
            "retryable": self.is_retryable(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockProvider;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(provider: Arc<MockProvider>) -> Router {
        let prices = PriceService::builder(provider).build();
        let rates = Arc::new(RateService::new(prices.clone(), Duration::from_secs(60)));
        create_router(AppState {
            prices,
            rates,
            db: None,
        })
    }

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_get_prices_by_query() {
        let (status, body) = call(
            app(Arc::new(MockProvider::new())),
            "GET",
            "/api/v1/prices?symbols=BTC,USDT",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 2);
        assert_eq!(body["data"][0]["symbol"], "BTC");
        assert_eq!(body["data"][1]["currentPrice"], 1.0);
        assert_eq!(body["data"][0]["sparkline"].as_array().unwrap().len(), 24);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_404() {
        let (status, body) =
            call(app(Arc::new(MockProvider::new())), "GET", "/api/v1/price/FAKE").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["retryable"], false);
    }

    #[tokio::test]
    async fn test_upstream_outage_is_503_retryable() {
        let provider = Arc::new(MockProvider::new());
        provider.set_failing(true);

        let (status, body) = call(app(provider), "GET", "/api/v1/price/BTC").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["retryable"], true);
        assert!(body["error"].as_str().unwrap().contains("temporarily unavailable"));
    }

    #[tokio::test]
    async fn test_rate_and_convert() {
        let app = app(Arc::new(MockProvider::new()));

        let (status, body) = call(app.clone(), "GET", "/api/v1/rate?from=btc&to=usdt").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rate"], 60_000.0);
        assert_eq!(body["from"], "BTC");

        let (status, body) =
            call(app, "GET", "/api/v1/convert?amount=0.5&from=ETH&to=USDT").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"], 1_500.0);
        assert_eq!(body["rate"], 3_000.0);
    }

    #[tokio::test]
    async fn test_rate_with_unknown_side_is_404() {
        let (status, body) = call(
            app(Arc::new(MockProvider::new())),
            "GET",
            "/api/v1/rate?from=FAKE&to=USDT",
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("FAKE"));
    }

    #[tokio::test]
    async fn test_detail_and_health() {
        let app = app(Arc::new(MockProvider::new()));

        let (status, body) = call(app.clone(), "GET", "/api/v1/price/AAPL/detail").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["kind"], "equity");
        assert_eq!(body["data"]["companyName"], "Apple Inc.");

        let (status, body) = call(app.clone(), "POST", "/api/v1/admin/cache/clear").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = call(app, "GET", "/api/v1/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["cache"]["detailEntries"], 0);
        assert!(body["database"].is_null());
    }
}
