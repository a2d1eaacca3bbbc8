use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::backend::{BackendError, CaseBackend, CaseRecord, ReportDownload};
use crate::checks::behavior::DEFAULT_SECTION;
use crate::checks::registry::LOAD_FAILURE_MESSAGE;
use crate::checks::{interpret, CandidateInfo, CatalogState, CheckRegistry, FileRef, FormPlan};
use crate::config::BackendConfig;
use crate::intake::{
    parse_upload, validate_checks, validate_send_link, BulkIntakeError, BulkOutcome,
    BulkSendRequest, CandidateUpload, CaseCreationPayload, SendLinkRequest, SubmissionDraft,
    SubmissionError,
};
use crate::review::{ReviewError, ReviewSession, ReviewView, OBSERVATION_FIELDS};

use super::domain::{CheckEdit, PortalForm};

/// Backend call a [`ServiceError::Backend`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    LoadCatalog,
    CreateCase,
    SendLink,
    BulkSend,
    LoadPortal,
    CandidateUpload,
    LoadCase,
    SaveCheck,
    SaveAll,
    DownloadReport,
}

impl Operation {
    /// Shown when the backend gives no message of its own.
    pub const fn fallback_message(self) -> &'static str {
        match self {
            Operation::LoadCatalog => LOAD_FAILURE_MESSAGE,
            Operation::SendLink => "Failed to send upload link.",
            Operation::LoadPortal => "This upload link is invalid or has expired.",
            Operation::CandidateUpload => {
                "Submission failed. The link may be expired or files are too large."
            }
            Operation::LoadCase => "Failed to load case details. Please try again.",
            Operation::SaveCheck => "Failed to save check",
            Operation::SaveAll => "Failed to save changes",
            Operation::DownloadReport => "Sorry, the report could not be downloaded at this time.",
            Operation::CreateCase | Operation::BulkSend => "An error occurred.",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Operation::LoadCatalog => "load check catalog",
            Operation::CreateCase => "create case",
            Operation::SendLink => "send upload link",
            Operation::BulkSend => "bulk send links",
            Operation::LoadPortal => "load upload link",
            Operation::CandidateUpload => "candidate upload",
            Operation::LoadCase => "load case",
            Operation::SaveCheck => "save check",
            Operation::SaveAll => "save all checks",
            Operation::DownloadReport => "download report",
        };
        f.write_str(label)
    }
}

pub const REPORT_TIMEOUT_MESSAGE: &str =
    "Report generation timed out. Please try again or contact support if the issue persists.";

/// Error raised by the case desk service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Submission(#[from] SubmissionError),
    #[error(transparent)]
    Bulk(#[from] BulkIntakeError),
    #[error(transparent)]
    Review(#[from] ReviewError),
    #[error("{operation} failed: {source}")]
    Backend {
        operation: Operation,
        #[source]
        source: BackendError,
    },
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("{0}")]
    CatalogUnavailable(String),
    #[error("case {0} is not open for review")]
    ReviewNotOpen(String),
    #[error("review sessions are unavailable")]
    ReviewsPoisoned,
}

impl ServiceError {
    fn backend(operation: Operation) -> impl FnOnce(BackendError) -> ServiceError {
        move |source| ServiceError::Backend { operation, source }
    }

    /// Text for the person at the screen: the backend's own message when it
    /// sent one, else a fixed message for the failed operation.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Backend {
                operation: Operation::DownloadReport,
                source: BackendError::TimedOut { .. },
            } => REPORT_TIMEOUT_MESSAGE.to_string(),
            ServiceError::Backend { operation, source } => source
                .server_message()
                .unwrap_or(operation.fallback_message())
                .to_string(),
            ServiceError::Encode(_) | ServiceError::ReviewsPoisoned => {
                "An error occurred.".to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Case desk: catalog, intake, candidate portal, review and reports over one
/// backend.
pub struct CaseDeskService<B> {
    backend: Arc<B>,
    config: BackendConfig,
    reviews: Mutex<HashMap<String, ReviewSession>>,
}

impl<B> CaseDeskService<B>
where
    B: CaseBackend + 'static,
{
    pub fn new(backend: Arc<B>, config: BackendConfig) -> Self {
        Self {
            backend,
            config,
            reviews: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Loads the check catalog. A failed load disables check selection.
    pub fn load_catalog(&self) -> CatalogState {
        match self.backend.list_checks() {
            Ok(entries) => {
                let registry = CheckRegistry::from_raw(entries);
                info!(checks = registry.len(), "check catalog loaded");
                CatalogState::Loaded(registry)
            }
            Err(error) => {
                warn!(%error, "check catalog failed to load");
                CatalogState::failed()
            }
        }
    }

    /// Registry for a flow that selected `keys`. Without a catalog only a
    /// check-free submission can go ahead.
    fn registry_for(&self, keys: &[String]) -> Result<CheckRegistry, ServiceError> {
        match self.load_catalog() {
            CatalogState::Loaded(registry) => Ok(registry),
            CatalogState::Failed { .. } if keys.is_empty() => Ok(CheckRegistry::default()),
            CatalogState::Failed { message } => Err(ServiceError::CatalogUnavailable(message)),
        }
    }

    fn plans(registry: &CheckRegistry, slugs: &[String]) -> Vec<FormPlan> {
        slugs
            .iter()
            .map(|slug| interpret(slug, registry.find(slug), &Map::new()))
            .collect()
    }

    /// Validates the draft and posts `POST /cases`.
    pub fn create_case(
        &self,
        candidate_info: CandidateInfo,
        client_organization: Option<String>,
        draft: &SubmissionDraft,
    ) -> Result<CaseRecord, ServiceError> {
        let registry = self.registry_for(draft.selected_keys())?;
        let parents = draft.selected_parents(&registry);
        if let Err(error) = validate_checks(draft, &parents, &Self::plans(&registry, &parents)) {
            warn!(%error, "case creation blocked");
            return Err(error.into());
        }

        let payload = CaseCreationPayload::build(candidate_info, client_organization, draft, &registry);
        let files = payload.attachments.len();
        let record = self
            .backend
            .create_case(payload.into_form()?)
            .map_err(ServiceError::backend(Operation::CreateCase))?;

        info!(case_id = %record.id, checks = parents.len(), files, "case created");
        Ok(record)
    }

    /// Creates a case and e-mails the candidate an upload link.
    pub fn send_link(
        &self,
        candidate_info: CandidateInfo,
        client_organization: Option<&str>,
        checks: &[String],
        draft: &SubmissionDraft,
    ) -> Result<Value, ServiceError> {
        let registry = match self.load_catalog() {
            CatalogState::Loaded(registry) => registry,
            CatalogState::Failed { .. } => CheckRegistry::default(),
        };
        let request = SendLinkRequest::build(
            candidate_info,
            client_organization.unwrap_or_default(),
            checks,
            draft,
            &registry,
        );
        validate_send_link(
            &request.candidate_info,
            Some(request.client_organization.as_str()),
            &request.checks,
        )?;

        let reply = self
            .backend
            .create_and_send_link(&request)
            .map_err(ServiceError::backend(Operation::SendLink))?;
        info!(
            email = %request.candidate_info.email,
            checks = request.checks.len(),
            "upload link sent"
        );
        Ok(reply)
    }

    /// Parses an uploaded candidate sheet and sends one link per row.
    pub fn bulk_send(
        &self,
        filename: &str,
        contents: &[u8],
        checks: &[String],
        client_organization: Option<&str>,
    ) -> Result<BulkOutcome, ServiceError> {
        let candidates = parse_upload(filename, contents)?;
        let request = BulkSendRequest::new(candidates, checks, client_organization)?;
        let outcome = self
            .backend
            .bulk_send_links(&request)
            .map_err(ServiceError::backend(Operation::BulkSend))?;

        if outcome.failed.is_empty() {
            info!(successful = outcome.successful.len(), "bulk links sent");
        } else {
            warn!(
                successful = outcome.successful.len(),
                failed = outcome.failed.len(),
                "bulk links partially sent"
            );
        }
        Ok(outcome)
    }

    fn requested_registry(&self, token: &str) -> Result<(CheckRegistry, String, String), ServiceError> {
        let details = self
            .backend
            .request_details(token)
            .map_err(ServiceError::backend(Operation::LoadPortal))?;
        let entries = details
            .requested_checks
            .iter()
            .map(|check| check.as_raw_entry())
            .collect();
        Ok((
            CheckRegistry::from_raw(entries),
            details.candidate_name,
            details.client_name,
        ))
    }

    /// Form shown behind a candidate upload link.
    pub fn portal_form(&self, token: &str) -> Result<PortalForm, ServiceError> {
        let (registry, candidate_name, client_name) = self.requested_registry(token)?;
        let checks = registry
            .definitions()
            .iter()
            .map(|definition| interpret(&definition.slug, Some(definition), &Map::new()))
            .collect();
        Ok(PortalForm {
            candidate_name,
            client_name,
            checks,
        })
    }

    /// Validates and posts what the candidate filled in.
    pub fn submit_candidate_upload(
        &self,
        token: &str,
        draft: &SubmissionDraft,
    ) -> Result<Value, ServiceError> {
        let (registry, _, _) = self.requested_registry(token)?;
        let requested: Vec<String> = registry
            .definitions()
            .iter()
            .map(|definition| definition.slug.clone())
            .collect();
        validate_checks(draft, &requested, &Self::plans(&registry, &requested))?;

        let upload = CandidateUpload::build(draft, &requested);
        let files = upload.files.len();
        let reply = self
            .backend
            .submit_candidate_upload(token, upload.into_form()?)
            .map_err(ServiceError::backend(Operation::CandidateUpload))?;
        info!(checks = requested.len(), files, "candidate documents submitted");
        Ok(reply)
    }

    fn with_review<T>(
        &self,
        case_id: &str,
        apply: impl FnOnce(&mut ReviewSession) -> Result<T, ServiceError>,
    ) -> Result<T, ServiceError> {
        let mut reviews = self
            .reviews
            .lock()
            .map_err(|_| ServiceError::ReviewsPoisoned)?;
        let session = reviews
            .get_mut(case_id)
            .ok_or_else(|| ServiceError::ReviewNotOpen(case_id.to_string()))?;
        apply(session)
    }

    /// Fetches the case and (re)opens its review session.
    pub fn open_review(&self, case_id: &str) -> Result<ReviewView, ServiceError> {
        let record = self
            .backend
            .fetch_case(case_id)
            .map_err(ServiceError::backend(Operation::LoadCase))?;
        let registry = match self.load_catalog() {
            CatalogState::Loaded(registry) => registry,
            CatalogState::Failed { .. } => CheckRegistry::builtin(),
        };
        let session = ReviewSession::load(record, &registry);
        let view = session.view();

        self.reviews
            .lock()
            .map_err(|_| ServiceError::ReviewsPoisoned)?
            .insert(case_id.to_string(), session);
        info!(case_id, checks = view.checks.len(), "review opened");
        Ok(view)
    }

    pub fn review(&self, case_id: &str) -> Result<ReviewView, ServiceError> {
        self.with_review(case_id, |session| Ok(session.view()))
    }

    /// Stages reviewer edits on one check without saving them.
    pub fn edit_check(
        &self,
        case_id: &str,
        index: usize,
        edit: &CheckEdit,
    ) -> Result<ReviewView, ServiceError> {
        self.with_review(case_id, |session| {
            let check = session.check_mut(index)?;
            if let Some(status) = edit.status {
                check.set_status(status);
            }
            for (section, fields) in &edit.observations {
                let Value::Object(fields) = fields else {
                    continue;
                };
                for field in OBSERVATION_FIELDS {
                    if let Some(value) = fields.get(field).and_then(Value::as_str) {
                        check.set_observation(section, field, value);
                    }
                }
            }
            for (section, text) in &edit.comments {
                if let Some(text) = text.as_str() {
                    check.set_comment(section, text);
                }
            }
            Ok(session.view())
        })
    }

    /// Stages reviewer files on one check. A blank section name means the
    /// check's default section.
    pub fn stage_review_files(
        &self,
        case_id: &str,
        index: usize,
        files: Vec<(String, FileRef)>,
    ) -> Result<ReviewView, ServiceError> {
        let count = files.len();
        self.with_review(case_id, |session| {
            let check = session.check_mut(index)?;
            for (section, file) in files {
                let section = match section.trim() {
                    "" => DEFAULT_SECTION,
                    named => named,
                };
                check.stage_file(section, file);
            }
            info!(case_id, index, files = count, "review files staged");
            Ok(session.view())
        })
    }

    /// Saves one check. The session lock is released while the backend call
    /// is in flight; the check sits in the saving state meanwhile.
    pub fn save_check(&self, case_id: &str, index: usize) -> Result<ReviewView, ServiceError> {
        let update = self.with_review(case_id, |session| Ok(session.begin_save(index)?))?;
        let saved = update.into_form().map_err(ServiceError::from).and_then(|form| {
            self.backend
                .update_case(case_id, form)
                .map_err(ServiceError::backend(Operation::SaveCheck))
        });

        match saved {
            Ok(record) => self.with_review(case_id, |session| {
                session.complete_save(index, record)?;
                info!(case_id, index, "check saved");
                Ok(session.view())
            }),
            Err(error) => {
                let message = error.user_message();
                warn!(case_id, index, %error, "check save failed");
                self.with_review(case_id, |session| Ok(session.fail_save(index, &message)?))?;
                Err(error)
            }
        }
    }

    /// Saves every check with its staged edits in one request.
    pub fn save_all(&self, case_id: &str) -> Result<ReviewView, ServiceError> {
        let update = self.with_review(case_id, |session| Ok(session.begin_save_all()?))?;
        let checks = update.checks.len();
        let saved = update.into_form().map_err(ServiceError::from).and_then(|form| {
            self.backend
                .update_case(case_id, form)
                .map_err(ServiceError::backend(Operation::SaveAll))
        });

        match saved {
            Ok(record) => self.with_review(case_id, |session| {
                session.complete_save_all(record)?;
                info!(case_id, checks, "all checks saved");
                Ok(session.view())
            }),
            Err(error) => {
                let message = error.user_message();
                warn!(case_id, %error, "save all failed");
                self.with_review(case_id, |session| {
                    session.fail_save_all(&message);
                    Ok(())
                })?;
                Err(error)
            }
        }
    }

    /// Downloads the generated report with the report timeout.
    pub fn download_report(&self, case_id: &str) -> Result<ReportDownload, ServiceError> {
        let report = self
            .backend
            .download_report(case_id, self.config.report_timeout)
            .map_err(ServiceError::backend(Operation::DownloadReport))
            .map_err(|error| {
                warn!(case_id, %error, "report download failed");
                error
            })?;
        info!(case_id, filename = %report.filename, bytes = report.bytes.len(), "report downloaded");
        Ok(report)
    }
}
