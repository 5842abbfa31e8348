// privacy-backend/src/features/compliance/handler.rs

use crate::api::AppState;
use crate::error::AppResult;
use crate::features::compliance::models::ComplianceReport;
use crate::middleware::RequestIdentity;
use crate::types::ApiResponse;
use crate::utils::time;
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;

const DEFAULT_REPORT_DAYS: i64 = 30;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportPeriodQuery {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

impl ReportPeriodQuery {
    /// 未指定なら直近30日
    pub fn resolve(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let end = self.end_date.unwrap_or(now);
        let start = self
            .start_date
            .unwrap_or(end - Duration::days(DEFAULT_REPORT_DAYS));
        (start, end)
    }
}

pub async fn compliance_report_handler(
    State(app_state): State<AppState>,
    identity: RequestIdentity,
    Query(query): Query<ReportPeriodQuery>,
) -> AppResult<Json<ApiResponse<ComplianceReport>>> {
    let (start, end) = query.resolve(time::now());
    let report = app_state
        .compliance_service
        .generate_report(start, end, &identity.audit_context())
        .await?;

    Ok(Json(ApiResponse::success(
        "Compliance report generated",
        report,
    )))
}

pub fn compliance_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/admin/privacy/compliance-report",
            get(compliance_report_handler),
        )
        .with_state(app_state)
}
