use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::directory::{
    annotate, escape_like, group_domains, DomainWithSubdomains, RecruiterListing,
};
use crate::errors::AppError;
use crate::models::recruiter::{DomainRow, RecruiterRow, SubdomainRow};
use crate::outreach::cooldown::{active_blocks, load_active_cooldowns};
use crate::profiles::fetch_profile;
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct RecruiterQuery {
    pub user_id: Uuid,
    pub domain_id: Option<Uuid>,
    pub subdomain_id: Option<Uuid>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/recruiters?user_id=&domain_id=&subdomain_id=&search=
pub async fn handle_list_recruiters(
    State(state): State<AppState>,
    Query(params): Query<RecruiterQuery>,
) -> Result<Json<Vec<RecruiterListing>>, AppError> {
    let now = Utc::now();
    let profile = fetch_profile(&state.db, params.user_id).await?;

    let pattern = params
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("%{}%", escape_like(s)));
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = params.offset.unwrap_or(0).max(0);

    let recruiters = sqlx::query_as::<_, RecruiterRow>(
        r#"
        SELECT * FROM recruiters
        WHERE ($1::uuid IS NULL OR domain_id = $1)
          AND ($2::uuid IS NULL OR subdomain_id = $2)
          AND ($3::text IS NULL OR name ILIKE $3 OR company ILIKE $3)
        ORDER BY name ASC
        LIMIT $4 OFFSET $5
        "#,
    )
    .bind(params.domain_id)
    .bind(params.subdomain_id)
    .bind(pattern)
    .bind(limit)
    .bind(offset)
    .fetch_all(&state.db)
    .await?;

    let cooldowns = load_active_cooldowns(&state.db, params.user_id, now).await?;
    let blocks = active_blocks(&cooldowns, now);

    Ok(Json(annotate(recruiters, profile.tier_at(now), &blocks)))
}

/// GET /api/v1/domains
pub async fn handle_list_domains(
    State(state): State<AppState>,
) -> Result<Json<Vec<DomainWithSubdomains>>, AppError> {
    let domains = sqlx::query_as::<_, DomainRow>("SELECT * FROM domains ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;
    let subdomains = sqlx::query_as::<_, SubdomainRow>("SELECT * FROM subdomains ORDER BY name ASC")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(group_domains(domains, subdomains)))
}
