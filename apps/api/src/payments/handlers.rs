//! Axum route handlers for the Payments API.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::payment::{PaymentRow, SubscriptionPlanRow};
use crate::models::profile::ProfileRow;
use crate::payments::signature::verify_signature;
use crate::payments::{new_expiry, receipt_for, OrderNotes, OrderRequest};
use crate::profiles::fetch_profile;
use crate::state::AppState;
use crate::tiers::{parse_tier, Tier};

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub user_id: Uuid,
    pub plan_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub key_id: String,
    pub plan: SubscriptionPlanRow,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPaymentRequest {
    pub user_id: Uuid,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub order_id: String,
    pub payment_status: String,
    pub tier: Tier,
    pub expires_at: Option<DateTime<Utc>>,
}

async fn fetch_active_plan(
    pool: &sqlx::PgPool,
    plan_id: Uuid,
) -> Result<SubscriptionPlanRow, AppError> {
    sqlx::query_as::<_, SubscriptionPlanRow>(
        "SELECT * FROM subscription_plans WHERE id = $1 AND is_active",
    )
    .bind(plan_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Plan {plan_id} not found")))
}

/// GET /api/v1/payments/plans
pub async fn handle_list_plans(
    State(state): State<AppState>,
) -> Result<Json<Vec<SubscriptionPlanRow>>, AppError> {
    let plans = sqlx::query_as::<_, SubscriptionPlanRow>(
        "SELECT * FROM subscription_plans WHERE is_active ORDER BY price_paise ASC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(plans))
}

/// POST /api/v1/payments/order
pub async fn handle_create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let plan = fetch_active_plan(&state.db, request.plan_id).await?;
    fetch_profile(&state.db, request.user_id).await?;

    let receipt = receipt_for(request.user_id, Utc::now());
    let order = state
        .razorpay
        .create_order(&OrderRequest {
            amount: plan.price_paise,
            currency: &plan.currency,
            receipt: &receipt,
            notes: OrderNotes {
                user_id: request.user_id.to_string(),
                plan_id: plan.id.to_string(),
            },
        })
        .await?;

    sqlx::query(
        r#"
        INSERT INTO payments (user_id, plan_id, razorpay_order_id, amount_paise, currency, status)
        VALUES ($1, $2, $3, $4, $5, 'created')
        "#,
    )
    .bind(request.user_id)
    .bind(plan.id)
    .bind(&order.id)
    .bind(order.amount)
    .bind(&order.currency)
    .execute(&state.db)
    .await?;

    Ok(Json(CreateOrderResponse {
        order_id: order.id,
        amount: order.amount,
        currency: order.currency,
        key_id: state.razorpay.key_id().to_string(),
        plan,
    }))
}

/// POST /api/v1/payments/verify
///
/// The signature is checked before anything is read from the database. A
/// repeated verification of a paid order returns the current subscription.
pub async fn handle_verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyPaymentRequest>,
) -> Result<Json<SubscriptionResponse>, AppError> {
    if !verify_signature(
        state.razorpay.key_secret(),
        &request.razorpay_order_id,
        &request.razorpay_payment_id,
        &request.razorpay_signature,
    ) {
        return Err(AppError::Validation("Invalid payment signature".to_string()));
    }

    let now = Utc::now();
    let mut tx = state.db.begin().await?;

    let payment = sqlx::query_as::<_, PaymentRow>(
        "SELECT * FROM payments WHERE razorpay_order_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(&request.razorpay_order_id)
    .bind(request.user_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Order {} not found", request.razorpay_order_id)))?;

    let profile = sqlx::query_as::<_, ProfileRow>("SELECT * FROM profiles WHERE id = $1 FOR UPDATE")
        .bind(request.user_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", request.user_id)))?;

    if payment.status == "paid" {
        tx.commit().await?;
        return Ok(Json(SubscriptionResponse {
            order_id: payment.razorpay_order_id,
            payment_status: payment.status,
            tier: profile.tier_at(now),
            expires_at: profile.subscription_expires_at,
        }));
    }

    let plan = sqlx::query_as::<_, SubscriptionPlanRow>("SELECT * FROM subscription_plans WHERE id = $1")
        .bind(payment.plan_id)
        .fetch_one(&mut *tx)
        .await?;
    let tier = parse_tier(&plan.tier);
    let expires_at = new_expiry(profile.subscription_expires_at, now, plan.duration_days)
        .ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!(
                "Plan {} has an unusable duration of {} days",
                plan.id,
                plan.duration_days
            ))
        })?;

    sqlx::query(
        "UPDATE payments SET status = 'paid', razorpay_payment_id = $2, paid_at = $3 WHERE id = $1",
    )
    .bind(payment.id)
    .bind(&request.razorpay_payment_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        "UPDATE profiles SET subscription_tier = $2, subscription_expires_at = $3 WHERE id = $1",
    )
    .bind(request.user_id)
    .bind(tier.as_str())
    .bind(expires_at)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(
        "Payment {} verified; user {} is {} until {}",
        request.razorpay_payment_id,
        request.user_id,
        tier.as_str(),
        expires_at
    );

    Ok(Json(SubscriptionResponse {
        order_id: payment.razorpay_order_id,
        payment_status: "paid".to_string(),
        tier,
        expires_at: Some(expires_at),
    }))
}
