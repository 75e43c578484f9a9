//! Reporting endpoints (librarian only)

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::user::Capability, AppState};

use super::AuthenticatedUser;

#[derive(Serialize, ToSchema)]
pub struct ReportAccepted {
    pub message: String,
}

/// Library-wide activity aggregates
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    pub new_users_last_30_days: i64,
    pub total_requests: i64,
    pub rejected_requests: i64,
    pub total_issues: i64,
    pub books_per_section: Vec<SectionCount>,
    pub top_requested_books: Vec<BookRequestCount>,
}

#[derive(Serialize, ToSchema)]
pub struct SectionCount {
    pub section: String,
    pub books: i64,
}

#[derive(Serialize, ToSchema)]
pub struct BookRequestCount {
    pub title: String,
    pub requests: i64,
}

/// Trigger the issue-activity CSV export, emailed to the reports address
#[utoipa::path(
    post,
    path = "/reports/issues-csv",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 202, description = "Export accepted", body = ReportAccepted),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn export_issues_csv(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<(StatusCode, Json<ReportAccepted>)> {
    claims.authorize(Capability::RunReports)?;

    let reports = state.services.reports.clone();
    tokio::spawn(async move {
        if let Err(e) = reports.send_issues_csv().await {
            tracing::error!("Issue CSV export failed: {}", e);
        }
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(ReportAccepted {
            message: "Issue report export started".to_string(),
        }),
    ))
}

/// Current library activity statistics
#[utoipa::path(
    get,
    path = "/stats",
    tag = "reports",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Activity statistics", body = StatsResponse),
        (status = 403, description = "Librarian role required")
    )
)]
pub async fn get_stats(
    State(state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<StatsResponse>> {
    claims.authorize(Capability::RunReports)?;

    let stats = state.services.reports.monthly_stats().await?;
    Ok(Json(StatsResponse {
        new_users_last_30_days: stats.new_users,
        total_requests: stats.total_requests,
        rejected_requests: stats.rejected_requests,
        total_issues: stats.total_issues,
        books_per_section: stats
            .books_per_section
            .into_iter()
            .map(|(section, books)| SectionCount { section, books })
            .collect(),
        top_requested_books: stats
            .top_books
            .into_iter()
            .map(|(title, requests)| BookRequestCount { title, requests })
            .collect(),
    }))
}
