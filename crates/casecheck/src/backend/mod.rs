//! Contract of the case-management REST backend.
//!
//! The backend itself lives elsewhere; this module describes what is sent to
//! and received from it so the rest of the crate can be exercised against any
//! implementation of [`CaseBackend`].

mod form;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::checks::{CandidateInfo, CheckInstance, DocumentRecord, EducationEntry, RawCheckEntry, UploadRecord};
use crate::intake::{BulkOutcome, BulkSendRequest, SendLinkRequest};

pub use form::{FormPart, MultipartForm};

pub const DEFAULT_REPORT_FILENAME: &str = "Verification_Report.pdf";

/// A case as returned by `GET /cases/:id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseRecord {
    #[serde(rename = "_id", alias = "id", default)]
    pub id: String,
    #[serde(default)]
    pub candidate_info: CandidateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_organization: Option<Value>,
    #[serde(default)]
    pub checks: Vec<CheckInstance>,
    #[serde(default)]
    pub uploads: Vec<UploadRecord>,
    #[serde(default)]
    pub documents: Vec<DocumentRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<EducationEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Check requested through a candidate upload link.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestedCheck {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl RequestedCheck {
    pub fn as_raw_entry(&self) -> RawCheckEntry {
        RawCheckEntry {
            name: Some(self.name.clone()).filter(|name| !name.is_empty()),
            slug: Some(self.slug.clone()).filter(|slug| !slug.is_empty()),
            schema: self.schema.clone(),
            ..RawCheckEntry::default()
        }
    }
}

/// Payload of `GET /public/request-details/:token`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetails {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default)]
    pub client_name: String,
    #[serde(default)]
    pub requested_checks: Vec<RequestedCheck>,
}

/// Generated report bytes and the filename to save them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDownload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Extracts the filename from a `Content-Disposition` header value.
pub fn report_filename(content_disposition: Option<&str>) -> String {
    content_disposition
        .and_then(|header| {
            header.split(';').map(str::trim).find_map(|part| {
                let (key, value) = part.split_once('=')?;
                if !key.trim().eq_ignore_ascii_case("filename") {
                    return None;
                }
                let value = value.trim().trim_matches('"').trim();
                (!value.is_empty()).then(|| value.to_string())
            })
        })
        .unwrap_or_else(|| DEFAULT_REPORT_FILENAME.to_string())
}

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("{operation} timed out after {seconds}s")]
    TimedOut {
        operation: &'static str,
        seconds: u64,
    },
    #[error("backend rejected the request with status {status}")]
    Rejected {
        status: u16,
        message: Option<String>,
    },
    #[error("record not found")]
    NotFound,
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    /// Message supplied by the backend itself, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            BackendError::Rejected {
                message: Some(message),
                ..
            } if !message.trim().is_empty() => Some(message.as_str()),
            _ => None,
        }
    }
}

/// REST endpoints the case flows depend on.
pub trait CaseBackend: Send + Sync {
    /// `GET /checks`
    fn list_checks(&self) -> Result<Vec<RawCheckEntry>, BackendError>;
    /// `POST /cases`
    fn create_case(&self, form: MultipartForm) -> Result<CaseRecord, BackendError>;
    /// `POST /cases/create-and-send-link`
    fn create_and_send_link(&self, request: &SendLinkRequest) -> Result<Value, BackendError>;
    /// `POST /cases/bulk-create-and-send-links`
    fn bulk_send_links(&self, request: &BulkSendRequest) -> Result<BulkOutcome, BackendError>;
    /// `GET /cases/:id`
    fn fetch_case(&self, case_id: &str) -> Result<CaseRecord, BackendError>;
    /// `PUT /cases/:id`
    fn update_case(&self, case_id: &str, form: MultipartForm) -> Result<CaseRecord, BackendError>;
    /// `GET /public/request-details/:token`
    fn request_details(&self, token: &str) -> Result<RequestDetails, BackendError>;
    /// `POST /public/upload/:token`
    fn submit_candidate_upload(&self, token: &str, form: MultipartForm) -> Result<Value, BackendError>;
    /// `GET /cases/:id/report`
    fn download_report(&self, case_id: &str, timeout: Duration) -> Result<ReportDownload, BackendError>;
}
