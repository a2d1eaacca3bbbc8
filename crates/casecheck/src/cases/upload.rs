//! Request bodies that may carry files.
//!
//! Intake routes take either plain JSON or `multipart/form-data` with the
//! same JSON in a `payload` part next to the file parts.

use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::backend::MultipartForm;
use crate::checks::behavior::EDUCATION;
use crate::checks::{FileRef, SELF_SECTION};
use crate::intake::SubmissionDraft;

/// Multipart part holding the JSON body.
pub const PAYLOAD_PART: &str = "payload";
/// File part for documents not tied to a check.
pub const GENERAL_PART: &str = "general";

/// A JSON body plus whatever file parts came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadBody<T> {
    pub body: T,
    pub files: MultipartForm,
}

impl<T> UploadBody<T> {
    pub fn json(body: T) -> Self {
        Self {
            body,
            files: MultipartForm::new(),
        }
    }
}

pub(crate) fn bad_request(message: impl Into<String>) -> Response {
    let payload = json!({
        "error": message.into(),
    });
    (StatusCode::BAD_REQUEST, Json(payload)).into_response()
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("multipart/form-data"))
}

#[async_trait]
impl<S, T> FromRequest<S> for UploadBody<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = Response;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !is_multipart(&request) {
            let Json(body) = Json::<T>::from_request(request, state)
                .await
                .map_err(IntoResponse::into_response)?;
            return Ok(Self::json(body));
        }

        let multipart = Multipart::from_request(request, state)
            .await
            .map_err(IntoResponse::into_response)?;
        let files = read_parts(multipart)
            .await
            .map_err(IntoResponse::into_response)?;
        let raw = files
            .text_value(PAYLOAD_PART)
            .ok_or_else(|| bad_request(format!("multipart body needs a `{PAYLOAD_PART}` part")))?;
        let body = serde_json::from_str(raw)
            .map_err(|error| bad_request(format!("invalid `{PAYLOAD_PART}` part: {error}")))?;
        Ok(Self { body, files })
    }
}

/// Collects every part in arrival order. Parts with a filename become files.
pub async fn read_parts(mut multipart: Multipart) -> Result<MultipartForm, MultipartError> {
    let mut form = MultipartForm::new();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        let Some(filename) = field.file_name().map(str::to_string) else {
            let value = field.text().await?;
            form.text(&name, value);
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await?;
        let mut file = FileRef::new(&filename, bytes.to_vec());
        if let Some(content_type) = content_type {
            file = file.with_content_type(&content_type);
        }
        form.file(&name, file);
    }
    Ok(form)
}

/// Education row a part name points at: `education_verification`,
/// `education_verification_<n>` or `education_verification__document_<n>`.
fn education_row(name: &str) -> Option<usize> {
    let rest = name.strip_prefix(EDUCATION)?;
    let digits = rest.trim_start_matches('_').trim_start_matches("document_");
    if digits.is_empty() {
        return Some(0);
    }
    digits.parse().ok()
}

/// Places uploaded files in the draft by part name: `general`, an education
/// row, `<check>__<section>` or a bare `<check>` for its own section.
pub fn attach_uploads(draft: &mut SubmissionDraft, form: &MultipartForm) {
    for (name, file) in form.file_parts() {
        if name == GENERAL_PART {
            draft.add_general_file(file.clone());
            continue;
        }
        if let Some(row) = education_row(name) {
            while draft.education_rows().len() <= row {
                draft.add_education_row();
            }
            draft.attach_education_file(row, file.clone());
            continue;
        }
        match name.split_once("__") {
            Some((check, section)) => draft.attach_file(check, section, file.clone()),
            None => draft.attach_file(name, SELF_SECTION, file.clone()),
        };
    }
}
