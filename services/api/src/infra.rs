use casecheck::backend::{
    report_filename, BackendError, CaseBackend, CaseRecord, MultipartForm, ReportDownload,
    RequestDetails, RequestedCheck,
};
use casecheck::checks::behavior::EDUCATION;
use casecheck::checks::{
    humanize_key, CandidateInfo, CheckInstance, CheckRegistry, DocumentLink, DocumentRecord,
    EducationEntry, FileRef, RawCheckEntry, UploadRecord, SELF_SECTION,
};
use casecheck::intake::{BulkFailure, BulkOutcome, BulkSendRequest, BulkSuccess, SendLinkRequest};
use casecheck::review::{VERIFIED_FIELD_PREFIX, VERIFIED_FILENAME_PREFIX};
use chrono::Utc;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default)]
struct BackendState {
    catalog: Vec<RawCheckEntry>,
    cases: BTreeMap<String, CaseRecord>,
    links: HashMap<String, (String, RequestDetails)>,
    next_case: u64,
    next_document: u64,
    next_link: u64,
}

impl BackendState {
    fn open_case(
        &mut self,
        candidate_info: CandidateInfo,
        client_organization: Option<String>,
        checks: Vec<CheckInstance>,
    ) -> String {
        self.next_case += 1;
        let id = format!("case-{:04}", self.next_case);
        let mut extra = Map::new();
        extra.insert("createdAt".to_string(), json!(Utc::now().to_rfc3339()));
        self.cases.insert(
            id.clone(),
            CaseRecord {
                id: id.clone(),
                candidate_info,
                client_organization: client_organization.map(Value::String),
                checks,
                extra,
                ..CaseRecord::default()
            },
        );
        id
    }

    fn case_mut(&mut self, case_id: &str) -> Result<&mut CaseRecord, BackendError> {
        self.cases.get_mut(case_id).ok_or(BackendError::NotFound)
    }

    fn store_document(
        &mut self,
        case_id: &str,
        field_key: String,
        file: &FileRef,
        filename: String,
    ) -> Result<String, BackendError> {
        self.next_document += 1;
        let document_id = format!("doc-{:05}", self.next_document);
        let content_type = file.content_type.clone().unwrap_or_else(|| {
            mime_guess::from_path(&file.name)
                .first_or_octet_stream()
                .to_string()
        });
        let mut extra = Map::new();
        extra.insert("contentType".to_string(), json!(content_type));
        extra.insert("size".to_string(), json!(file.size));
        extra.insert("uploadedAt".to_string(), json!(Utc::now().to_rfc3339()));

        let case = self.case_mut(case_id)?;
        case.documents.push(DocumentRecord {
            id: Some(document_id.clone()),
            original_filename: Some(filename),
            filename: Some(file.name.clone()),
            url: Some(format!("/files/{document_id}")),
            extra,
            ..DocumentRecord::default()
        });
        case.uploads.push(UploadRecord {
            field_key,
            document_id: Some(DocumentLink::Id(document_id.clone())),
            ..UploadRecord::default()
        });
        Ok(document_id)
    }

    fn issue_link(&mut self, request: &SendLinkRequest) -> (String, String) {
        let checks = request
            .checks
            .iter()
            .map(|slug| CheckInstance::pending(slug, Map::new()))
            .collect();
        let case_id = self.open_case(
            request.candidate_info.clone(),
            Some(request.client_organization.clone()).filter(|client| !client.is_empty()),
            checks,
        );

        self.next_link += 1;
        let token = format!("link-{:04}", self.next_link);
        let details = RequestDetails {
            candidate_name: request.candidate_info.candidate_name.clone(),
            client_name: request.client_organization.clone(),
            requested_checks: request
                .checks
                .iter()
                .map(|slug| RequestedCheck {
                    name: humanize_key(slug),
                    slug: slug.clone(),
                    schema: None,
                })
                .collect(),
        };
        self.links.insert(token.clone(), (case_id.clone(), details));
        (case_id, token)
    }
}

/// Case backend kept in process memory for local runs and the demo.
#[derive(Default, Clone)]
pub(crate) struct InMemoryCaseBackend {
    state: Arc<Mutex<BackendState>>,
}

fn decode<T: serde::de::DeserializeOwned + Default>(form: &MultipartForm, name: &str) -> T {
    form.json_value(name)
        .and_then(|value| serde_json::from_value(value).ok())
        .unwrap_or_default()
}

impl InMemoryCaseBackend {
    /// Backend whose catalog lists every built-in check.
    pub(crate) fn seeded() -> Self {
        let catalog = CheckRegistry::builtin()
            .definitions()
            .iter()
            .map(|definition| RawCheckEntry {
                name: Some(definition.display_name.clone()),
                slug: Some(definition.slug.clone()),
                category: Some(definition.category.clone()),
                description: Some(definition.description.clone()),
                ..RawCheckEntry::default()
            })
            .collect();
        Self {
            state: Arc::new(Mutex::new(BackendState {
                catalog,
                ..BackendState::default()
            })),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, BackendState>, BackendError> {
        self.state
            .lock()
            .map_err(|_| BackendError::Unavailable("in-memory store poisoned".to_string()))
    }

    /// Token of the most recent upload link issued for `case_id`.
    pub(crate) fn link_for(&self, case_id: &str) -> Option<String> {
        let state = self.lock().ok()?;
        state
            .links
            .iter()
            .filter(|(_, (linked, _))| linked.as_str() == case_id)
            .map(|(token, _)| token.clone())
            .max()
    }
}

impl CaseBackend for InMemoryCaseBackend {
    fn list_checks(&self) -> Result<Vec<RawCheckEntry>, BackendError> {
        Ok(self.lock()?.catalog.clone())
    }

    fn create_case(&self, form: MultipartForm) -> Result<CaseRecord, BackendError> {
        let mut state = self.lock()?;
        let case_id = state.open_case(
            decode(&form, "candidateInfo"),
            form.text_value("clientOrganization").map(str::to_string),
            decode(&form, "checks"),
        );

        let field_keys: Vec<String> = decode(&form, "uploadFieldKeys");
        for (index, file) in form.files("caseDocuments").into_iter().enumerate() {
            let field_key = field_keys
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("general__{index}"));
            state.store_document(&case_id, field_key, file, file.name.clone())?;
        }

        let education: Vec<EducationEntry> = decode(&form, "educationDetails");
        let case = state.case_mut(&case_id)?;
        case.education = education
            .into_iter()
            .map(|entry| EducationEntry {
                provided_by: Some("admin".to_string()),
                provided_at: Some(Utc::now()),
                ..entry
            })
            .collect();
        if let Some(details) = form.json_value("checkDetails") {
            case.extra.insert("checkDetails".to_string(), details);
        }

        info!(case_id = %case.id, documents = case.documents.len(), "case stored");
        Ok(case.clone())
    }

    fn create_and_send_link(&self, request: &SendLinkRequest) -> Result<Value, BackendError> {
        let (case_id, token) = self.lock()?.issue_link(request);
        info!(%case_id, email = %request.candidate_info.email, "upload link issued");
        Ok(json!({
            "message": "Case created and upload link sent to the candidate",
            "caseId": case_id,
            "token": token,
        }))
    }

    fn bulk_send_links(&self, request: &BulkSendRequest) -> Result<BulkOutcome, BackendError> {
        let mut state = self.lock()?;
        let mut outcome = BulkOutcome::default();
        for candidate in &request.candidates {
            if candidate.email.trim().is_empty() {
                outcome.failed.push(BulkFailure {
                    candidate: candidate.candidate_name.clone(),
                    error: "Candidate email is required".to_string(),
                });
                continue;
            }
            let single = SendLinkRequest {
                candidate_info: candidate.clone(),
                checks: request.checks.clone(),
                client_organization: request.client_organization.clone().unwrap_or_default(),
            };
            let (case_id, _) = state.issue_link(&single);
            outcome.successful.push(BulkSuccess {
                candidate: candidate.candidate_name.clone(),
                email: candidate.email.clone(),
                case_id,
            });
        }
        outcome.message = format!("Processed {} candidates", request.candidates.len());
        Ok(outcome)
    }

    fn fetch_case(&self, case_id: &str) -> Result<CaseRecord, BackendError> {
        self.lock()?
            .cases
            .get(case_id)
            .cloned()
            .ok_or(BackendError::NotFound)
    }

    fn update_case(&self, case_id: &str, form: MultipartForm) -> Result<CaseRecord, BackendError> {
        let mut state = self.lock()?;
        let checks: Vec<CheckInstance> = decode(&form, "checks");
        if !checks.is_empty() {
            state.case_mut(case_id)?.checks = checks;
        }

        let descriptors: Vec<Value> = decode(&form, "verifiedFileKeys");
        for (index, file) in form.files("verifiedFiles").into_iter().enumerate() {
            let descriptor = descriptors.get(index);
            let check_type = descriptor
                .and_then(|value| value.get("checkType"))
                .and_then(Value::as_str)
                .unwrap_or("general");
            let section = descriptor
                .and_then(|value| value.get("subSectionKey"))
                .and_then(Value::as_str)
                .filter(|section| !section.is_empty() && !section.starts_with('_'));
            let field_key = match section {
                Some(section) => format!("{VERIFIED_FIELD_PREFIX}{check_type}__{section}"),
                None => format!("{VERIFIED_FIELD_PREFIX}{check_type}"),
            };
            let filename = format!("{VERIFIED_FILENAME_PREFIX} {}", file.name);
            state.store_document(case_id, field_key, file, filename)?;
        }

        Ok(state.case_mut(case_id)?.clone())
    }

    fn request_details(&self, token: &str) -> Result<RequestDetails, BackendError> {
        self.lock()?
            .links
            .get(token)
            .map(|(_, details)| details.clone())
            .ok_or(BackendError::Rejected {
                status: 404,
                message: None,
            })
    }

    fn submit_candidate_upload(&self, token: &str, form: MultipartForm) -> Result<Value, BackendError> {
        let mut state = self.lock()?;
        let (case_id, _) = state.links.remove(token).ok_or(BackendError::Rejected {
            status: 404,
            message: None,
        })?;

        let details: Map<String, Value> = decode(&form, "checkDetails");
        let mut education_documents: Vec<(usize, String)> = Vec::new();
        for (name, file) in form.file_parts() {
            let document_id =
                state.store_document(&case_id, name.to_string(), file, file.name.clone())?;
            if let Some(index) = name
                .strip_prefix(EDUCATION)
                .and_then(|rest| rest.strip_prefix('_'))
                .and_then(|index| index.parse::<usize>().ok())
            {
                education_documents.push((index, document_id));
            }
        }

        let case = state.case_mut(&case_id)?;
        for (slug, params) in &details {
            if slug == EDUCATION {
                let entries: Vec<EducationEntry> = params
                    .get(SELF_SECTION)
                    .cloned()
                    .and_then(|value| serde_json::from_value(value).ok())
                    .unwrap_or_default();
                case.education = entries
                    .into_iter()
                    .map(|entry| EducationEntry {
                        provided_by: Some("candidate".to_string()),
                        provided_at: Some(Utc::now()),
                        ..entry
                    })
                    .collect();
                continue;
            }
            if let (Some(check), Value::Object(params)) = (
                case.checks.iter_mut().find(|check| check.check_type == *slug),
                params,
            ) {
                check.params = params.clone();
            }
        }
        for (index, document_id) in education_documents {
            if let Some(entry) = case.education.get_mut(index) {
                entry.documents.push(document_id);
            }
        }

        info!(%case_id, documents = case.documents.len(), "candidate upload stored");
        Ok(json!({ "message": "Documents uploaded successfully", "caseId": case_id }))
    }

    fn download_report(&self, case_id: &str, _timeout: Duration) -> Result<ReportDownload, BackendError> {
        let state = self.lock()?;
        let case = state.cases.get(case_id).ok_or(BackendError::NotFound)?;
        let mut body = format!(
            "%PDF-1.4\n% Verification report for {}\n",
            case.candidate_info.candidate_name
        );
        for check in &case.checks {
            body.push_str(&format!("% {}: {}\n", check.check_type, check.status.label()));
        }
        let disposition = format!("attachment; filename=\"Case_{case_id}_Report.pdf\"");
        Ok(ReportDownload {
            filename: report_filename(Some(&disposition)),
            bytes: body.into_bytes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use casecheck::checks::CheckStatus;
    use casecheck::intake::{
        CaseCreationPayload, CandidateUpload, SubmissionDraft, VerificationUpdate,
    };

    fn candidate() -> CandidateInfo {
        CandidateInfo {
            candidate_name: "Ravi Kumar".to_string(),
            email: "ravi@example.com".to_string(),
            ..CandidateInfo::default()
        }
    }

    #[test]
    fn created_case_links_documents_by_field_key() {
        let backend = InMemoryCaseBackend::seeded();
        let registry = CheckRegistry::from_raw(backend.list_checks().expect("catalog"));
        let mut draft = SubmissionDraft::new();
        draft.select_check("court_record_check");
        draft.attach_file(
            "court_record_check",
            SELF_SECTION,
            FileRef::new("court.pdf", vec![1, 2]),
        );

        let payload = CaseCreationPayload::build(candidate(), None, &draft, &registry);
        let form = payload.into_form().expect("form encodes");
        let record = backend.create_case(form).expect("case stored");

        assert_eq!(record.documents.len(), 1);
        assert_eq!(
            record.documents[0].extra.get("contentType"),
            Some(&json!("application/pdf"))
        );
        assert!(record.uploads[0].field_key.starts_with("court_record_check"));
    }

    #[test]
    fn upload_link_is_consumed_by_candidate_submission() {
        let backend = InMemoryCaseBackend::seeded();
        let request = SendLinkRequest {
            candidate_info: candidate(),
            checks: vec!["uan".to_string(), EDUCATION.to_string()],
            client_organization: "Acme".to_string(),
        };
        let reply = backend.create_and_send_link(&request).expect("link issued");
        let token = reply["token"].as_str().expect("token").to_string();
        let case_id = reply["caseId"].as_str().expect("case id").to_string();
        assert_eq!(backend.link_for(&case_id).as_deref(), Some(token.as_str()));

        let mut draft = SubmissionDraft::new();
        draft.set_value("uan", SELF_SECTION, "uanNumber", "100200300400");
        draft.attach_file("uan", SELF_SECTION, FileRef::new("uan.pdf", vec![7]));
        draft.set_education_field(0, casecheck::intake::EducationField::University, "IIT");
        draft.attach_education_file(0, FileRef::new("degree.pdf", vec![8]));
        let requested = vec!["uan".to_string(), EDUCATION.to_string()];
        let form = CandidateUpload::build(&draft, &requested)
            .into_form()
            .expect("form encodes");
        backend
            .submit_candidate_upload(&token, form.clone())
            .expect("upload stored");

        let case = backend.fetch_case(&case_id).expect("case exists");
        assert_eq!(case.documents.len(), 2);
        assert_eq!(case.education[0].provided_by.as_deref(), Some("candidate"));
        assert_eq!(case.education[0].documents.len(), 1);
        assert!(backend.submit_candidate_upload(&token, form).is_err());
    }

    #[test]
    fn verified_files_are_keyed_by_check_and_section() {
        let backend = InMemoryCaseBackend::seeded();
        let record = backend
            .create_case(MultipartForm::new())
            .expect("empty case stored");
        let mut check = CheckInstance::pending("address_verification", Map::new());
        check.status = CheckStatus::Clear;

        let mut attachments = casecheck::intake::AttachmentList::default();
        attachments.push(
            FileRef::new("site.jpg", vec![1]),
            casecheck::intake::FileDescriptor {
                filename: "site.jpg".to_string(),
                check_index: Some(0),
                check_type: "address_verification".to_string(),
                sub_section_key: "current".to_string(),
                field_key: String::new(),
            },
        );
        let update = VerificationUpdate {
            checks: vec![check],
            attachments,
        };
        let updated = backend
            .update_case(&record.id, update.into_form().expect("form encodes"))
            .expect("case updated");

        assert_eq!(updated.checks[0].status, CheckStatus::Clear);
        assert_eq!(updated.uploads[0].field_key, "verified_address_verification__current");
        assert_eq!(
            updated.documents[0].display_filename(),
            "[VERIFIED] site.jpg"
        );
    }

    #[test]
    fn report_lists_check_statuses() {
        let backend = InMemoryCaseBackend::seeded();
        assert!(matches!(
            backend.download_report("missing", Duration::from_secs(1)),
            Err(BackendError::NotFound)
        ));
        let record = backend
            .create_case(MultipartForm::new())
            .expect("case stored");
        let report = backend
            .download_report(&record.id, Duration::from_secs(1))
            .expect("report renders");
        assert_eq!(report.filename, format!("Case_{}_Report.pdf", record.id));
        assert!(report.bytes.starts_with(b"%PDF"));
    }
}
