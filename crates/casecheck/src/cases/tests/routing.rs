use super::common::*;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::cases::{CaseDeskService, CaseIntakeRequest, CheckSelection, UploadBody};
use crate::config::BackendConfig;

fn json_request(method: &str, uri: &str, body: Value) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(&body).expect("body encodes"),
        ))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn catalog_handler_returns_unavailable_on_backend_failure() {
    let service = Arc::new(CaseDeskService::new(
        Arc::new(UnavailableBackend),
        BackendConfig::default(),
    ));

    let response =
        crate::cases::router::catalog_handler::<UnavailableBackend>(State(service)).await;

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "Failed to load checks/clients. Try refreshing.");
}

#[tokio::test]
async fn catalog_route_groups_checks_by_category() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(empty_request("GET", "/api/v1/checks"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["selectable"], true);
    assert!(payload["categories"]
        .as_array()
        .is_some_and(|groups| !groups.is_empty()));
}

#[tokio::test]
async fn create_case_handler_returns_unprocessable_for_missing_national_id() {
    let (service, _) = build_service();
    let request = CaseIntakeRequest {
        candidate_info: candidate(),
        checks: vec![CheckSelection {
            slug: "national_id_verification".to_string(),
            ..CheckSelection::default()
        }],
        ..CaseIntakeRequest::default()
    };

    let response = crate::cases::router::create_case_handler::<MemoryBackend>(
        State(Arc::new(service)),
        UploadBody::json(request),
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .is_some_and(|message| message.starts_with("For National ID Verification")));
}

#[tokio::test]
async fn create_case_route_accepts_payloads() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/cases",
            json!({
                "candidateInfo": { "candidateName": "Asha Rao", "email": "asha@example.com" },
                "clientOrganization": "org-1",
                "checks": [
                    { "slug": "uan", "sections": { "_self": { "uanNumber": "100200300400" } } }
                ]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["checks"][0]["checkType"], "uan");
    assert_eq!(backend.forms_for("create").len(), 1);
}

#[tokio::test]
async fn create_case_route_links_uploaded_documents() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/cases",
            Some(json!({
                "candidateInfo": { "candidateName": "Asha Rao", "email": "asha@example.com" },
                "checks": [
                    { "slug": "uan", "sections": { "_self": { "uanNumber": "100200300400" } } }
                ]
            })),
            &[
                ("uan", "uan-card.pdf", "%PDF-uan"),
                ("general", "resume.pdf", "%PDF-cv"),
            ],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    let case_id = payload["_id"].as_str().expect("case id").to_string();
    let names: Vec<_> = payload["documents"]
        .as_array()
        .expect("documents listed")
        .iter()
        .filter_map(|document| document["originalFilename"].as_str())
        .collect();
    assert_eq!(names, ["uan-card.pdf", "resume.pdf"]);
    assert!(payload["uploads"][0]["fieldKey"]
        .as_str()
        .is_some_and(|key| key.starts_with("uan__")));

    let stored = backend
        .cases
        .lock()
        .expect("case mutex poisoned")
        .get(&case_id)
        .cloned()
        .expect("case stored");
    assert_eq!(stored.uploads.len(), 2);
    let forms = backend.forms_for("create");
    assert_eq!(forms[0].files("caseDocuments")[0].bytes, b"%PDF-uan".to_vec());
}

#[tokio::test]
async fn multipart_intake_without_a_payload_part_is_rejected() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            "/api/v1/cases",
            None,
            &[("uan", "uan-card.pdf", "%PDF")],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(backend.forms_for("create").is_empty());
}

#[tokio::test]
async fn send_link_route_rejects_missing_email() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/cases/send-link",
            json!({
                "candidateInfo": { "candidateName": "Asha Rao" },
                "clientOrganization": "org-1",
                "checks": ["uan"]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(backend.links.lock().expect("link mutex poisoned").is_empty());
}

#[tokio::test]
async fn bulk_route_reports_both_lists() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/cases/bulk",
            json!({
                "csv": "candidateName,email\nJohn Doe,john@example.com\nJane Smith,\n",
                "checks": ["uan", "gap_analysis"]
            }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json_body(response).await;
    assert_eq!(payload["summary"], "1 successful, 1 failed");
    assert_eq!(payload["successful"][0]["email"], "john@example.com");
    assert_eq!(payload["failed"][0]["candidate"], "Jane Smith");
}

#[tokio::test]
async fn portal_handler_maps_expired_links_to_not_found() {
    let (service, _) = build_service();

    let response = crate::cases::router::portal_handler::<MemoryBackend>(
        State(Arc::new(service)),
        Path("expired".to_string()),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let payload = read_json_body(response).await;
    assert_eq!(payload["error"], "This upload link is invalid or has expired.");
}

#[tokio::test]
async fn portal_route_forwards_candidate_files() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let response = router
        .oneshot(multipart_request(
            &format!("/api/v1/portal/{PORTAL_TOKEN}"),
            Some(json!({
                "checks": [
                    { "slug": "national_id_verification", "sections": { "_self": { "aadhaar": "1234" } } }
                ],
                "education": [{ "university": "IIT", "degree": "BTech", "year": "2019" }]
            })),
            &[
                ("national_id_verification", "aadhaar.pdf", "%PDF-id"),
                ("education_verification_0", "degree.pdf", "%PDF-degree"),
            ],
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let forms = backend.forms_for("upload");
    assert_eq!(forms.len(), 1);
    let parts: Vec<_> = forms[0]
        .file_parts()
        .map(|(name, file)| (name.to_string(), file.name.clone()))
        .collect();
    assert_eq!(
        parts,
        [
            ("national_id_verification".to_string(), "aadhaar.pdf".to_string()),
            ("education_verification_0".to_string(), "degree.pdf".to_string()),
        ]
    );
    let details = forms[0].json_value("checkDetails").expect("details sent");
    assert_eq!(details["national_id_verification"]["_self"]["aadhaar"], "1234");
}

#[tokio::test]
async fn review_files_route_stages_files_for_the_next_save() {
    let (service, backend) = build_service();
    let router = router_with_service(service);

    let opened = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/cases/case-7/review"))
        .await
        .expect("route executes");
    assert_eq!(opened.status(), StatusCode::OK);

    let staged = router
        .clone()
        .oneshot(multipart_request(
            "/api/v1/cases/case-7/review/checks/0/files",
            None,
            &[("_default", "court-extract.pdf", "%PDF-court")],
        ))
        .await
        .expect("route executes");
    assert_eq!(staged.status(), StatusCode::OK);
    let payload = read_json_body(staged).await;
    assert_eq!(payload["checks"][0]["pendingFiles"][0]["name"], "court-extract.pdf");
    assert_eq!(payload["checks"][0]["pendingFiles"][0]["section"], "_default");
    assert_eq!(payload["checks"][0]["state"]["state"], "staged");

    let saved = router
        .clone()
        .oneshot(empty_request("POST", "/api/v1/cases/case-7/review/checks/0/save"))
        .await
        .expect("route executes");
    assert_eq!(saved.status(), StatusCode::OK);
    let payload = read_json_body(saved).await;
    assert!(payload["checks"][0]["pendingFiles"].is_null());

    let stored = backend
        .cases
        .lock()
        .expect("case mutex poisoned")
        .get("case-7")
        .cloned()
        .expect("case stored");
    assert!(stored
        .documents
        .iter()
        .any(|document| document.original_filename.as_deref() == Some("[VERIFIED] court-extract.pdf")));
    let sent = backend.forms_for("update");
    assert_eq!(sent[0].files("verifiedFiles")[0].name, "court-extract.pdf");

    let empty = router
        .oneshot(multipart_request(
            "/api/v1/cases/case-7/review/checks/0/files",
            Some(json!({})),
            &[],
        ))
        .await
        .expect("route executes");
    assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn review_routes_stage_and_save_a_check() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let opened = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/cases/case-7/review"))
        .await
        .expect("route executes");
    assert_eq!(opened.status(), StatusCode::OK);

    let staged = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/api/v1/cases/case-7/review/checks/0",
            json!({ "status": "Clear" }),
        ))
        .await
        .expect("route executes");
    assert_eq!(staged.status(), StatusCode::OK);

    let saved = router
        .clone()
        .oneshot(empty_request("POST", "/api/v1/cases/case-7/review/checks/0/save"))
        .await
        .expect("route executes");
    assert_eq!(saved.status(), StatusCode::OK);
    let payload = read_json_body(saved).await;
    assert_eq!(payload["checks"][0]["status"], "Clear");
    assert_eq!(payload["checks"][0]["state"]["state"], "saved");

    let missing = router
        .oneshot(empty_request("POST", "/api/v1/cases/case-7/review/checks/9/save"))
        .await
        .expect("route executes");
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn report_route_names_the_attachment() {
    let (service, _) = build_service();
    let router = router_with_service(service);

    let response = router
        .clone()
        .oneshot(empty_request("GET", "/api/v1/cases/case-7/report"))
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"Case_case-7_Report.pdf\""
    );

    let slow = router
        .oneshot(empty_request("GET", "/api/v1/cases/slow-case/report"))
        .await
        .expect("route executes");
    assert_eq!(slow.status(), StatusCode::GATEWAY_TIMEOUT);
}
