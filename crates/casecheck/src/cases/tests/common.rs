use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::{json, Value};

use crate::backend::{
    BackendError, CaseBackend, CaseRecord, MultipartForm, ReportDownload, RequestDetails,
    RequestedCheck,
};
use crate::cases::{case_router, CaseDeskService, PAYLOAD_PART};
use crate::checks::{
    CandidateInfo, CheckInstance, CheckRegistry, DocumentLink, DocumentRecord, RawCheckEntry,
    UploadRecord,
};
use crate::config::BackendConfig;
use crate::intake::{BulkFailure, BulkOutcome, BulkSendRequest, BulkSuccess, SendLinkRequest};

pub(super) const PORTAL_TOKEN: &str = "tok-123";

pub(super) fn candidate() -> CandidateInfo {
    CandidateInfo {
        candidate_name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        contact_number: "9800000000".to_string(),
        ..CandidateInfo::default()
    }
}

/// Catalog entries for every built-in check, named but without schemas.
pub(super) fn catalog_entries() -> Vec<RawCheckEntry> {
    CheckRegistry::builtin()
        .definitions()
        .iter()
        .map(|definition| RawCheckEntry {
            name: Some(definition.display_name.clone()),
            slug: Some(definition.slug.clone()),
            category: Some(definition.category.clone()),
            ..RawCheckEntry::default()
        })
        .collect()
}

pub(super) fn review_case() -> CaseRecord {
    serde_json::from_value(json!({
        "_id": "case-7",
        "candidateInfo": { "candidateName": "Asha Rao", "email": "asha@example.com" },
        "checks": [
            { "checkType": "court_record_check", "status": "Pending" },
            {
                "checkType": "address_verification",
                "status": "Pending",
                "params": { "current": { "city": "Pune" }, "permanent": { "city": "Nagpur" } }
            }
        ],
        "uploads": [
            { "fieldKey": "court_record_check", "documentId": "doc-1" }
        ],
        "documents": [
            { "_id": "doc-1", "originalFilename": "court.pdf" }
        ]
    }))
    .expect("review case parses")
}

pub(super) fn portal_details() -> RequestDetails {
    RequestDetails {
        candidate_name: "Asha Rao".to_string(),
        client_name: "Acme".to_string(),
        requested_checks: vec![
            RequestedCheck {
                name: "National ID Verification".to_string(),
                slug: "national_id_verification".to_string(),
                schema: None,
            },
            RequestedCheck {
                name: "Education Verification".to_string(),
                slug: "education_verification".to_string(),
                schema: None,
            },
        ],
    }
}

pub(super) fn build_service() -> (CaseDeskService<MemoryBackend>, Arc<MemoryBackend>) {
    let backend = Arc::new(MemoryBackend::seeded());
    let service = CaseDeskService::new(backend.clone(), BackendConfig::default());
    (service, backend)
}

pub(super) fn router_with_service(service: CaseDeskService<MemoryBackend>) -> axum::Router {
    case_router(Arc::new(service))
}

/// Backend double keeping cases in memory and recording every request.
#[derive(Default, Clone)]
pub(super) struct MemoryBackend {
    pub(super) catalog: Arc<Mutex<Option<Vec<RawCheckEntry>>>>,
    pub(super) cases: Arc<Mutex<HashMap<String, CaseRecord>>>,
    pub(super) forms: Arc<Mutex<Vec<(String, MultipartForm)>>>,
    pub(super) links: Arc<Mutex<Vec<SendLinkRequest>>>,
    pub(super) portals: Arc<Mutex<HashMap<String, RequestDetails>>>,
    pub(super) reject_updates: Arc<Mutex<Option<String>>>,
}

impl MemoryBackend {
    pub(super) fn seeded() -> Self {
        let backend = Self::default();
        *backend.catalog.lock().expect("catalog mutex poisoned") = Some(catalog_entries());
        backend
            .cases
            .lock()
            .expect("case mutex poisoned")
            .insert("case-7".to_string(), review_case());
        backend
            .portals
            .lock()
            .expect("portal mutex poisoned")
            .insert(PORTAL_TOKEN.to_string(), portal_details());
        backend
    }

    pub(super) fn fail_catalog(&self) {
        *self.catalog.lock().expect("catalog mutex poisoned") = None;
    }

    pub(super) fn reject_updates_with(&self, message: &str) {
        *self.reject_updates.lock().expect("reject mutex poisoned") = Some(message.to_string());
    }

    pub(super) fn forms_for(&self, endpoint: &str) -> Vec<MultipartForm> {
        self.forms
            .lock()
            .expect("form mutex poisoned")
            .iter()
            .filter(|(name, _)| name == endpoint)
            .map(|(_, form)| form.clone())
            .collect()
    }

    fn record(&self, endpoint: &str, form: &MultipartForm) {
        self.forms
            .lock()
            .expect("form mutex poisoned")
            .push((endpoint.to_string(), form.clone()));
    }
}

fn checks_from(form: &MultipartForm) -> Vec<CheckInstance> {
    form.json_value("checks")
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

impl CaseBackend for MemoryBackend {
    fn list_checks(&self) -> Result<Vec<RawCheckEntry>, BackendError> {
        self.catalog
            .lock()
            .expect("catalog mutex poisoned")
            .clone()
            .ok_or_else(|| BackendError::Unavailable("catalog offline".to_string()))
    }

    fn create_case(&self, form: MultipartForm) -> Result<CaseRecord, BackendError> {
        self.record("create", &form);
        let mut cases = self.cases.lock().expect("case mutex poisoned");
        let id = format!("case-{}", cases.len() + 100);
        let mut record = CaseRecord {
            id: id.clone(),
            candidate_info: form
                .json_value("candidateInfo")
                .and_then(|value| serde_json::from_value(value).ok())
                .unwrap_or_default(),
            checks: checks_from(&form),
            ..CaseRecord::default()
        };
        let field_keys: Vec<String> = form
            .json_value("uploadFieldKeys")
            .and_then(|value| serde_json::from_value(value).ok())
            .unwrap_or_default();
        for (index, file) in form.files("caseDocuments").into_iter().enumerate() {
            let document_id = format!("{id}-doc-{index}");
            record.documents.push(DocumentRecord {
                id: Some(document_id.clone()),
                original_filename: Some(file.name.clone()),
                ..DocumentRecord::default()
            });
            record.uploads.push(UploadRecord {
                field_key: field_keys.get(index).cloned().unwrap_or_default(),
                document_id: Some(DocumentLink::Id(document_id)),
                ..UploadRecord::default()
            });
        }
        cases.insert(id, record.clone());
        Ok(record)
    }

    fn create_and_send_link(&self, request: &SendLinkRequest) -> Result<Value, BackendError> {
        self.links
            .lock()
            .expect("link mutex poisoned")
            .push(request.clone());
        Ok(json!({ "message": "Link sent", "caseId": "case-link-1" }))
    }

    fn bulk_send_links(&self, request: &BulkSendRequest) -> Result<BulkOutcome, BackendError> {
        let mut outcome = BulkOutcome {
            message: "Bulk processing complete".to_string(),
            ..BulkOutcome::default()
        };
        for (index, candidate) in request.candidates.iter().enumerate() {
            if candidate.email.trim().is_empty() {
                outcome.failed.push(BulkFailure {
                    candidate: candidate.candidate_name.clone(),
                    error: "Email is required".to_string(),
                });
            } else {
                outcome.successful.push(BulkSuccess {
                    candidate: candidate.candidate_name.clone(),
                    email: candidate.email.clone(),
                    case_id: format!("bulk-{index}"),
                });
            }
        }
        Ok(outcome)
    }

    fn fetch_case(&self, case_id: &str) -> Result<CaseRecord, BackendError> {
        self.cases
            .lock()
            .expect("case mutex poisoned")
            .get(case_id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    fn update_case(&self, case_id: &str, form: MultipartForm) -> Result<CaseRecord, BackendError> {
        self.record("update", &form);
        if let Some(message) = self.reject_updates.lock().expect("reject mutex poisoned").clone() {
            return Err(BackendError::Rejected {
                status: 400,
                message: Some(message),
            });
        }

        let mut cases = self.cases.lock().expect("case mutex poisoned");
        let record = cases.get_mut(case_id).ok_or(BackendError::NotFound)?;
        record.checks = checks_from(&form);
        for (index, (_, file)) in form.file_parts().enumerate() {
            let id = format!("verified-{}-{index}", record.documents.len());
            record.documents.push(DocumentRecord {
                id: Some(id.clone()),
                original_filename: Some(format!("[VERIFIED] {}", file.name)),
                ..DocumentRecord::default()
            });
            record.uploads.push(UploadRecord {
                field_key: "verified_court_record_check".to_string(),
                document_id: Some(DocumentLink::Id(id)),
                ..UploadRecord::default()
            });
        }
        Ok(record.clone())
    }

    fn request_details(&self, token: &str) -> Result<RequestDetails, BackendError> {
        self.portals
            .lock()
            .expect("portal mutex poisoned")
            .get(token)
            .cloned()
            .ok_or(BackendError::Rejected {
                status: 404,
                message: None,
            })
    }

    fn submit_candidate_upload(&self, token: &str, form: MultipartForm) -> Result<Value, BackendError> {
        self.record("upload", &form);
        Ok(json!({ "message": "Documents received", "token": token }))
    }

    fn download_report(&self, case_id: &str, timeout: Duration) -> Result<ReportDownload, BackendError> {
        if case_id == "slow-case" {
            return Err(BackendError::TimedOut {
                operation: "download report",
                seconds: timeout.as_secs(),
            });
        }
        Ok(ReportDownload {
            filename: format!("Case_{case_id}_Report.pdf"),
            bytes: b"%PDF-1.4".to_vec(),
        })
    }
}

/// Backend whose every call fails as if the network were down.
pub(super) struct UnavailableBackend;

impl CaseBackend for UnavailableBackend {
    fn list_checks(&self) -> Result<Vec<RawCheckEntry>, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn create_case(&self, _form: MultipartForm) -> Result<CaseRecord, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn create_and_send_link(&self, _request: &SendLinkRequest) -> Result<Value, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn bulk_send_links(&self, _request: &BulkSendRequest) -> Result<BulkOutcome, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn fetch_case(&self, _case_id: &str) -> Result<CaseRecord, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn update_case(&self, _case_id: &str, _form: MultipartForm) -> Result<CaseRecord, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn request_details(&self, _token: &str) -> Result<RequestDetails, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn submit_candidate_upload(&self, _token: &str, _form: MultipartForm) -> Result<Value, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }

    fn download_report(&self, _case_id: &str, _timeout: Duration) -> Result<ReportDownload, BackendError> {
        Err(BackendError::Unavailable("network down".to_string()))
    }
}

/// `multipart/form-data` POST with an optional JSON `payload` part and one
/// part per `(part name, filename, contents)`.
pub(super) fn multipart_request(
    uri: &str,
    payload: Option<Value>,
    files: &[(&str, &str, &str)],
) -> axum::http::Request<axum::body::Body> {
    const BOUNDARY: &str = "casecheck-test-boundary";
    let mut body = Vec::new();
    if let Some(payload) = payload {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{PAYLOAD_PART}\"\r\n\r\n{payload}\r\n"
            )
            .as_bytes(),
        );
    }
    for (part, filename, contents) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{part}\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(contents.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            axum::http::header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(axum::body::Body::from(body))
        .expect("request builds")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
