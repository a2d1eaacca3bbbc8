use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use serde_json::json;

use crate::backend::{BackendError, CaseBackend};
use crate::checks::CatalogState;
use crate::intake::SubmissionDraft;
use crate::review::ReviewError;

use super::domain::{
    draft_from_selections, BulkIntake, CaseIntakeRequest, CheckEdit, PortalSubmission,
    SendLinkIntake,
};
use super::service::{CaseDeskService, ServiceError};
use super::upload::{attach_uploads, bad_request, read_parts, UploadBody};

/// Router exposing the case desk. Intake and portal submissions take JSON or
/// multipart with files; reviewer files are multipart only.
pub fn case_router<B>(service: Arc<CaseDeskService<B>>) -> Router
where
    B: CaseBackend + 'static,
{
    Router::new()
        .route("/api/v1/checks", get(catalog_handler::<B>))
        .route("/api/v1/cases", post(create_case_handler::<B>))
        .route("/api/v1/cases/send-link", post(send_link_handler::<B>))
        .route("/api/v1/cases/bulk", post(bulk_handler::<B>))
        .route(
            "/api/v1/portal/:token",
            get(portal_handler::<B>).post(portal_submit_handler::<B>),
        )
        .route("/api/v1/cases/:case_id/review", get(review_handler::<B>))
        .route(
            "/api/v1/cases/:case_id/review/checks/:index",
            put(edit_check_handler::<B>),
        )
        .route(
            "/api/v1/cases/:case_id/review/checks/:index/files",
            post(stage_files_handler::<B>),
        )
        .route(
            "/api/v1/cases/:case_id/review/checks/:index/save",
            post(save_check_handler::<B>),
        )
        .route("/api/v1/cases/:case_id/review/save", post(save_all_handler::<B>))
        .route("/api/v1/cases/:case_id/report", get(report_handler::<B>))
        .with_state(service)
}

fn error_payload(status: StatusCode, error: &ServiceError) -> Response {
    let payload = json!({
        "error": error.user_message(),
    });
    (status, axum::Json(payload)).into_response()
}

pub(crate) fn service_error_response(error: ServiceError) -> Response {
    let status = match &error {
        ServiceError::Submission(_) | ServiceError::Bulk(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ServiceError::Review(ReviewError::UnknownCheck { .. }) | ServiceError::ReviewNotOpen(_) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::Review(_) => StatusCode::CONFLICT,
        ServiceError::CatalogUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Backend { source, .. } => match source {
            BackendError::NotFound => StatusCode::NOT_FOUND,
            BackendError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            BackendError::Rejected { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(StatusCode::is_client_error)
                .unwrap_or(StatusCode::BAD_GATEWAY),
            BackendError::Unavailable(_) => StatusCode::BAD_GATEWAY,
        },
        ServiceError::Encode(_) | ServiceError::ReviewsPoisoned => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    error_payload(status, &error)
}

pub(crate) async fn catalog_handler<B>(State(service): State<Arc<CaseDeskService<B>>>) -> Response
where
    B: CaseBackend + 'static,
{
    match service.load_catalog() {
        CatalogState::Loaded(registry) => {
            let payload = json!({
                "selectable": !registry.is_empty(),
                "categories": registry.grouped_by_category(),
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        CatalogState::Failed { message } => {
            let payload = json!({
                "error": message,
            });
            (StatusCode::SERVICE_UNAVAILABLE, axum::Json(payload)).into_response()
        }
    }
}

pub(crate) async fn create_case_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    upload: UploadBody<CaseIntakeRequest>,
) -> Response
where
    B: CaseBackend + 'static,
{
    let UploadBody {
        body: request,
        files,
    } = upload;
    let mut draft = request.to_draft();
    attach_uploads(&mut draft, &files);
    match service.create_case(request.candidate_info, request.client_organization, &draft) {
        Ok(record) => (StatusCode::CREATED, axum::Json(record)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn send_link_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    axum::Json(request): axum::Json<SendLinkIntake>,
) -> Response
where
    B: CaseBackend + 'static,
{
    let draft = SubmissionDraft::new();
    match service.send_link(
        request.candidate_info,
        request.client_organization.as_deref(),
        &request.checks,
        &draft,
    ) {
        Ok(reply) => (StatusCode::CREATED, axum::Json(reply)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn bulk_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    axum::Json(request): axum::Json<BulkIntake>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.bulk_send(
        &request.filename,
        request.csv.as_bytes(),
        &request.checks,
        request.client_organization.as_deref(),
    ) {
        Ok(outcome) => {
            let payload = json!({
                "message": outcome.message,
                "summary": outcome.summary(),
                "successful": outcome.successful,
                "failed": outcome.failed,
            });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn portal_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path(token): Path<String>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.portal_form(&token) {
        Ok(form) => (StatusCode::OK, axum::Json(form)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn portal_submit_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path(token): Path<String>,
    upload: UploadBody<PortalSubmission>,
) -> Response
where
    B: CaseBackend + 'static,
{
    let UploadBody {
        body: submission,
        files,
    } = upload;
    let mut draft = draft_from_selections(&submission.checks, &submission.education);
    attach_uploads(&mut draft, &files);
    match service.submit_candidate_upload(&token, &draft) {
        Ok(reply) => (StatusCode::OK, axum::Json(reply)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn review_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path(case_id): Path<String>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.open_review(&case_id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn edit_check_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path((case_id, index)): Path<(String, usize)>,
    axum::Json(edit): axum::Json<CheckEdit>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.edit_check(&case_id, index, &edit) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

/// Each file part is staged under the section its part name gives.
pub(crate) async fn stage_files_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path((case_id, index)): Path<(String, usize)>,
    multipart: Multipart,
) -> Response
where
    B: CaseBackend + 'static,
{
    let form = match read_parts(multipart).await {
        Ok(form) => form,
        Err(error) => return error.into_response(),
    };
    let files: Vec<_> = form
        .file_parts()
        .map(|(section, file)| (section.to_string(), file.clone()))
        .collect();
    if files.is_empty() {
        return bad_request("attach at least one file");
    }
    match service.stage_review_files(&case_id, index, files) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn save_check_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path((case_id, index)): Path<(String, usize)>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.save_check(&case_id, index) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn save_all_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path(case_id): Path<String>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.save_all(&case_id) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => service_error_response(error),
    }
}

pub(crate) async fn report_handler<B>(
    State(service): State<Arc<CaseDeskService<B>>>,
    Path(case_id): Path<String>,
) -> Response
where
    B: CaseBackend + 'static,
{
    match service.download_report(&case_id) {
        Ok(report) => {
            let disposition = format!("attachment; filename=\"{}\"", report.filename);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "application/pdf".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                report.bytes,
            )
                .into_response()
        }
        Err(error) => service_error_response(error),
    }
}
