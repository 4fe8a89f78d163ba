use actix_web::{HttpResponse, web};

use crate::AppState;
use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::report::ReportScope;

/// Worked hours per employee and per client over a range
#[utoipa::path(
    get,
    path = "/api/reports/summary",
    params(ReportScope),
    responses(
        (status = 200, description = "Summary", body = Summary),
        (status = 403, description = "Employees may only report on themselves"),
        (status = 422, description = "Range start is not before its end"),
        (status = 503, description = "Report generation timed out")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn summary(
    auth: AuthUser,
    state: web::Data<AppState>,
    scope: web::Query<ReportScope>,
) -> AppResult<HttpResponse> {
    let summary = state
        .reporting
        .summarize(&auth.actor(), scope.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}

/// Fleet figures and the latest clock events
#[utoipa::path(
    get,
    path = "/api/reports/dashboard",
    responses(
        (status = 200, description = "HR dashboard", body = Dashboard),
        (status = 403, description = "HR manager only")
    ),
    security(("bearer_auth" = [])),
    tag = "Report"
)]
pub async fn dashboard(auth: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let dashboard = state.reporting.dashboard(&auth.actor()).await?;
    Ok(HttpResponse::Ok().json(dashboard))
}
