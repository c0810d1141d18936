//! Storefront Pricing - order quoting service
//!
//! Thin JSON surface over the pure pricing core: delivery-fee preview for the
//! (debounced) checkout address input, per-product discount resolution, and
//! full cart quotes. Product and discount data is read from Postgres.

use anyhow::Result;
use axum::{extract::{Query, State}, http::StatusCode, routing::{get, post}, Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use validator::Validate;

use storefront_pricing::domain::pricing::discount::DiscountRow;
use storefront_pricing::{
    aggregate, apply_discount, calculate_delivery_fee, effective_price, resolve_discount,
    DeliveryConfig, Discount, Money, OrderQuote, QuoteItem,
};

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: Uuid,
    pub category_id: Option<Uuid>,
    pub price: Decimal,
}

#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub delivery: Arc<DeliveryConfig>,
    pub currency: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();
    let db = PgPoolOptions::new().max_connections(10).connect(&std::env::var("DATABASE_URL")?).await?;
    sqlx::migrate!("./migrations").run(&db).await?;

    let delivery = match std::env::var("DELIVERY_CONFIG") {
        Ok(path) => serde_json::from_str::<DeliveryConfig>(&std::fs::read_to_string(&path)?)?,
        Err(_) => DeliveryConfig::default(),
    };
    delivery.validate()?;
    let currency = delivery.currency.clone();
    let state = AppState { db, delivery: Arc::new(delivery), currency };

    let app = Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "healthy", "service": "storefront-pricing"})) }))
        .route("/api/v1/delivery-fee", get(delivery_fee))
        .route("/api/v1/discounts/resolve", get(resolve_product_discount))
        .route("/api/v1/quote", post(quote_cart))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state);

    let port = std::env::var("PORT").unwrap_or_else(|_| "8084".to_string());
    tracing::info!("Storefront pricing listening on 0.0.0.0:{}", port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?, app).await?;
    Ok(())
}

// =============================================================================
// Delivery fee preview
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct DeliveryFeeParams { pub address: String, pub quantity: u32 }

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeliveryFeeResponse {
    Ok { fee: Money, zone: String },
    /// Address below the minimum meaningful length; the UI keeps showing a
    /// "calculating" state and must not add a fee line yet.
    Pending,
}

async fn delivery_fee(State(s): State<AppState>, Query(p): Query<DeliveryFeeParams>) -> Json<DeliveryFeeResponse> {
    match calculate_delivery_fee(&s.delivery, &p.address, p.quantity) {
        Some(fee) => {
            let zone = s.delivery.classify_zone(p.address.trim()).name.clone();
            Json(DeliveryFeeResponse::Ok { fee, zone })
        }
        None => Json(DeliveryFeeResponse::Pending),
    }
}

// =============================================================================
// Discount resolution
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ResolveParams { pub product_id: Uuid }

#[derive(Debug, Serialize)]
pub struct ResolveResponse {
    pub product_id: Uuid,
    pub base_price: Money,
    pub effective_price: Money,
    pub discount: Option<Discount>,
}

async fn resolve_product_discount(State(s): State<AppState>, Query(p): Query<ResolveParams>) -> Result<Json<ResolveResponse>, (StatusCode, String)> {
    let product = fetch_product(&s, p.product_id).await?;
    let category_id = product.category_id.unwrap_or(Uuid::nil());
    let base_price = Money::new(product.price, &s.currency);
    let candidates = fetch_discount_candidates(&s, product.id, category_id).await;
    let discount = resolve_discount(&candidates, product.id, category_id, &base_price, Utc::now());
    Ok(Json(ResolveResponse {
        product_id: product.id,
        effective_price: apply_discount(&base_price, discount),
        discount: discount.cloned(),
        base_price: base_price.rounded(),
    }))
}

// =============================================================================
// Cart quote
// =============================================================================

#[derive(Debug, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, message = "cart is empty"))]
    pub items: Vec<QuoteRequestItem>,
    /// Free-text destination; may still be mid-typing, in which case the
    /// quote comes back with the delivery fee pending.
    pub address: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct QuoteRequestItem {
    pub product_id: Uuid,
    /// Must be positive; zero is rejected during aggregation.
    pub quantity: u32,
}

#[derive(Debug, Serialize)]
pub struct QuoteResponse {
    pub items: Vec<QuotedLine>,
    pub subtotal: Money,
    pub delivery_fee: Option<Money>,
    pub delivery_fee_pending: bool,
    pub total: Money,
}

#[derive(Debug, Serialize)]
pub struct QuotedLine {
    pub product_id: Uuid,
    pub quantity: u32,
    pub unit_price: Money,
    pub discount: Option<Discount>,
}

async fn quote_cart(State(s): State<AppState>, Json(r): Json<QuoteRequest>) -> Result<Json<QuoteResponse>, (StatusCode, String)> {
    r.validate().map_err(|e| (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    let now = Utc::now();

    let mut lines = Vec::with_capacity(r.items.len());
    let mut priced = Vec::with_capacity(r.items.len());
    for item in &r.items {
        let product = fetch_product(&s, item.product_id).await?;
        let category_id = product.category_id.unwrap_or(Uuid::nil());
        let base_price = Money::new(product.price, &s.currency);
        let candidates = fetch_discount_candidates(&s, product.id, category_id).await;
        let discount = resolve_discount(&candidates, product.id, category_id, &base_price, now);
        priced.push(QuoteItem {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: effective_price(&base_price, discount),
        });
        lines.push(QuotedLine {
            product_id: product.id,
            quantity: item.quantity,
            unit_price: apply_discount(&base_price, discount),
            discount: discount.cloned(),
        });
    }

    let total_quantity: u32 = r.items.iter().map(|i| i.quantity).sum();
    let fee = r.address.as_deref().and_then(|addr| calculate_delivery_fee(&s.delivery, addr, total_quantity));
    let pending = fee.is_none();

    let OrderQuote { subtotal, delivery_fee, total } = aggregate(&priced, fee).map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    Ok(Json(QuoteResponse { items: lines, subtotal, delivery_fee, delivery_fee_pending: pending, total }))
}

// =============================================================================
// Store queries
// =============================================================================

async fn fetch_product(s: &AppState, id: Uuid) -> Result<ProductRow, (StatusCode, String)> {
    sqlx::query_as::<_, ProductRow>("SELECT id, category_id, price FROM products WHERE id = $1")
        .bind(id).fetch_optional(&s.db).await.map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?
        .ok_or((StatusCode::NOT_FOUND, format!("product {} not found", id)))
}

/// Candidate discounts for a product and its category. A failed lookup
/// degrades to "no discount" so checkout never blocks on the store, but the
/// degradation is logged rather than swallowed.
async fn fetch_discount_candidates(s: &AppState, product_id: Uuid, category_id: Uuid) -> Vec<Discount> {
    let rows = sqlx::query_as::<_, DiscountRow>(
        "SELECT id, name, description, discount_type, discount_value, target_type, target_id, is_active, starts_at, ends_at, created_at \
         FROM discounts WHERE (target_type = 'product' AND target_id = $1) OR (target_type = 'category' AND target_id = $2)",
    )
    .bind(product_id).bind(category_id).fetch_all(&s.db).await;

    let rows = match rows {
        Ok(rows) => rows,
        Err(e) => {
            tracing::warn!(%product_id, error = %e, "discount lookup failed, falling back to base price");
            return vec![];
        }
    };
    rows.into_iter()
        .filter_map(|row| match Discount::try_from(row) {
            Ok(d) => Some(d),
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed discount row");
                None
            }
        })
        .collect()
}
