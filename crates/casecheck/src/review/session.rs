//! Admin review of one case: staged edits per check and their save cycle.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::backend::CaseRecord;
use crate::checks::{
    behavior_for, humanize_key, CandidateInfo, CheckBehavior, CheckInstance, CheckKind,
    CheckRegistry, CheckStatus, CommentDraft, DocumentRecord, EducationEntry, FileRef,
};
use crate::intake::{AttachmentList, FileDescriptor, VerificationUpdate};

use super::documents::{DocumentIndex, ResolvedEducationEntry, VerifiedDocument};
use super::reconcile::{find_saved, merge_checks};

/// Observation fields recorded per review section.
pub const OBSERVATION_FIELDS: [&str; 3] = ["detail1", "detail2", "detail3"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum EditState {
    Pristine,
    Staged,
    Saving,
    Saved,
    SaveFailed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    #[error("check {index} is already being saved")]
    AlreadySaving { index: usize },
    #[error("no check at position {index}")]
    UnknownCheck { index: usize },
    #[error("another save is still in progress")]
    SaveInProgress,
    #[error("check {index} has no save in progress")]
    NotSaving { index: usize },
}

/// What one save request carried for a check.
#[derive(Debug, Clone, PartialEq)]
struct SentEdits {
    instance: CheckInstance,
    files: Vec<(String, FileRef)>,
}

/// One check under review: the last server-confirmed record plus staged edits.
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewCheck {
    confirmed: CheckInstance,
    status: CheckStatus,
    verified_data: Map<String, Value>,
    comments: CommentDraft,
    pending_files: Vec<(String, FileRef)>,
    persisted: Vec<VerifiedDocument>,
    state: EditState,
    in_flight: Option<SentEdits>,
}

impl ReviewCheck {
    fn from_confirmed(confirmed: CheckInstance, persisted: Vec<VerifiedDocument>) -> Self {
        let mut check = Self {
            status: confirmed.status,
            verified_data: Map::new(),
            comments: CommentDraft::default(),
            pending_files: Vec::new(),
            persisted,
            state: EditState::Pristine,
            in_flight: None,
            confirmed,
        };
        check.restage();
        check
    }

    fn restage(&mut self) {
        self.status = self.confirmed.status;
        self.verified_data = self.confirmed.verified_data.clone();
        self.comments = CommentDraft::expand(&self.confirmed.comments);
        self.pending_files.clear();
    }

    fn touch(&mut self) {
        if self.state != EditState::Saving {
            self.state = EditState::Staged;
        }
    }

    fn mark_saving(&mut self) {
        self.in_flight = Some(SentEdits {
            instance: self.to_instance(),
            files: self.pending_files.clone(),
        });
        self.state = EditState::Saving;
    }

    fn take_in_flight(&mut self) -> Option<SentEdits> {
        if self.state != EditState::Saving {
            return None;
        }
        self.in_flight.take()
    }

    fn staged_matches(&self, sent: &SentEdits) -> bool {
        self.status == sent.instance.status
            && self.verified_data == sent.instance.verified_data
            && self.comments.flatten(self.behavior().comments) == sent.instance.comments
            && self.pending_files == sent.files
    }

    /// Ends a save whose reply is already in `confirmed`. Edits staged while
    /// the request was out stay staged; only the files it carried are dropped.
    fn settle(&mut self, sent: SentEdits) {
        if self.staged_matches(&sent) {
            self.restage();
            self.state = EditState::Saved;
            return;
        }
        for file in &sent.files {
            if let Some(position) = self.pending_files.iter().position(|pending| pending == file) {
                self.pending_files.remove(position);
            }
        }
        self.state = EditState::Staged;
    }

    pub fn behavior(&self) -> &'static CheckBehavior {
        behavior_for(&self.confirmed.check_type)
    }

    pub fn check_type(&self) -> &str {
        &self.confirmed.check_type
    }

    pub fn display_name(&self) -> &str {
        self.confirmed
            .display_name
            .as_deref()
            .unwrap_or(&self.confirmed.check_type)
    }

    pub fn confirmed(&self) -> &CheckInstance {
        &self.confirmed
    }

    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn is_dirty(&self) -> bool {
        matches!(self.state, EditState::Staged | EditState::SaveFailed { .. })
    }

    /// Sections the reviewer records observations and comments for.
    pub fn sections(&self) -> Vec<String> {
        self.behavior().review_sections(&self.confirmed.params)
    }

    pub fn status(&self) -> CheckStatus {
        self.status
    }

    pub fn set_status(&mut self, status: CheckStatus) {
        self.status = status;
        self.touch();
    }

    pub fn observation(&self, section: &str, field: &str) -> Option<&str> {
        self.verified_data
            .get(section)
            .and_then(|fields| fields.get(field))
            .and_then(Value::as_str)
    }

    pub fn set_observation(&mut self, section: &str, field: &str, value: &str) {
        let entry = self
            .verified_data
            .entry(section.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        if let Value::Object(fields) = entry {
            fields.insert(field.to_string(), Value::String(value.to_string()));
        }
        self.touch();
    }

    pub fn comment(&self, section: &str) -> &str {
        self.comments.get(section)
    }

    pub fn set_comment(&mut self, section: &str, text: &str) {
        self.comments.set(section, text);
        self.touch();
    }

    pub fn stage_file(&mut self, section: &str, file: FileRef) {
        self.pending_files.push((section.to_string(), file));
        self.touch();
    }

    pub fn remove_pending_file(&mut self, section: &str, position: usize) -> Option<FileRef> {
        let index = self
            .pending_files
            .iter()
            .enumerate()
            .filter(|(_, (file_section, _))| file_section == section)
            .map(|(index, _)| index)
            .nth(position)?;
        let (_, file) = self.pending_files.remove(index);
        self.touch();
        Some(file)
    }

    pub fn pending_files(&self) -> impl Iterator<Item = (&str, &FileRef)> {
        self.pending_files
            .iter()
            .map(|(section, file)| (section.as_str(), file))
    }

    pub fn persisted_uploads(&self) -> &[VerifiedDocument] {
        &self.persisted
    }

    /// The confirmed record with staged status, observations and comments.
    pub fn to_instance(&self) -> CheckInstance {
        CheckInstance {
            status: self.status,
            verified_data: self.verified_data.clone(),
            comments: self.comments.flatten(self.behavior().comments),
            ..self.confirmed.clone()
        }
    }

    /// Drops staged edits and returns to the last confirmed record.
    pub fn reset(&mut self) {
        self.restage();
        self.state = EditState::Pristine;
    }
}

/// A reviewer file waiting for the next save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StagedFile {
    pub section: String,
    #[serde(flatten)]
    pub file: FileRef,
}

/// Everything the review screen shows for one check.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckView {
    pub index: usize,
    pub check_type: String,
    pub display_name: String,
    pub status: CheckStatus,
    pub state: EditState,
    pub sections: Vec<String>,
    pub params: Map<String, Value>,
    pub verified_data: Map<String, Value>,
    pub comments: CommentDraft,
    pub candidate_documents: Vec<DocumentRecord>,
    pub verified_documents: Vec<VerifiedDocument>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_files: Vec<StagedFile>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<ResolvedEducationEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub case_id: String,
    pub candidate_info: CandidateInfo,
    pub checks: Vec<CheckView>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewSession {
    case_id: String,
    candidate_info: CandidateInfo,
    legacy_education: Vec<EducationEntry>,
    documents: DocumentIndex,
    checks: Vec<ReviewCheck>,
}

impl ReviewSession {
    /// Display names come from the stored check, then the registry, then the
    /// check type itself.
    pub fn load(case: CaseRecord, registry: &CheckRegistry) -> Self {
        let documents = DocumentIndex::from_case(&case);
        let checks = case
            .checks
            .into_iter()
            .map(|mut check| {
                if check.display_name.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    let name = registry
                        .find(&check.check_type)
                        .map(|definition| definition.display_name.clone())
                        .unwrap_or_else(|| humanize_key(&check.check_type));
                    check.display_name = Some(name);
                }
                let persisted = documents.verified_documents(&check.check_type);
                ReviewCheck::from_confirmed(check, persisted)
            })
            .collect();

        Self {
            case_id: case.id,
            candidate_info: case.candidate_info,
            legacy_education: case.education,
            documents,
            checks,
        }
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn checks(&self) -> &[ReviewCheck] {
        &self.checks
    }

    pub fn documents(&self) -> &DocumentIndex {
        &self.documents
    }

    pub fn check(&self, index: usize) -> Result<&ReviewCheck, ReviewError> {
        self.checks.get(index).ok_or(ReviewError::UnknownCheck { index })
    }

    pub fn check_mut(&mut self, index: usize) -> Result<&mut ReviewCheck, ReviewError> {
        self.checks
            .get_mut(index)
            .ok_or(ReviewError::UnknownCheck { index })
    }

    fn confirmed_list(&self) -> Vec<CheckInstance> {
        self.checks
            .iter()
            .map(|check| check.confirmed.clone())
            .collect()
    }

    fn descriptor(&self, index: usize, section: &str, file: &FileRef) -> FileDescriptor {
        FileDescriptor {
            filename: file.name.clone(),
            check_index: Some(index),
            check_type: self.checks[index].confirmed.check_type.clone(),
            sub_section_key: section.to_string(),
            field_key: String::new(),
        }
    }

    /// Starts saving one check. Every other check is sent as last confirmed
    /// and only the target's pending files are attached.
    pub fn begin_save(&mut self, index: usize) -> Result<VerificationUpdate, ReviewError> {
        let target = self.check(index)?;
        if target.state == EditState::Saving {
            return Err(ReviewError::AlreadySaving { index });
        }

        let checks = self
            .checks
            .iter()
            .enumerate()
            .map(|(position, check)| {
                if position == index {
                    check.to_instance()
                } else {
                    check.confirmed.clone()
                }
            })
            .collect();

        let mut attachments = AttachmentList::default();
        for (section, file) in self.checks[index].pending_files() {
            attachments.push_unique(file.clone(), self.descriptor(index, section, file));
        }

        self.checks[index].mark_saving();
        Ok(VerificationUpdate {
            checks,
            attachments,
        })
    }

    /// Applies the server's reply to a single-check save.
    pub fn complete_save(&mut self, index: usize, updated: CaseRecord) -> Result<(), ReviewError> {
        let sent = self
            .check_mut(index)?
            .take_in_flight()
            .ok_or(ReviewError::NotSaving { index })?;
        let saved = find_saved(&sent.instance, &updated.checks).cloned();
        self.absorb(&updated);

        let target = &mut self.checks[index];
        let confirmed = saved.unwrap_or_else(|| sent.instance.clone());
        target.confirmed = CheckInstance {
            display_name: target.confirmed.display_name.clone(),
            ..confirmed
        };
        target.settle(sent);
        Ok(())
    }

    /// Staged edits survive a failed save and can be retried.
    pub fn fail_save(&mut self, index: usize, message: &str) -> Result<(), ReviewError> {
        let check = self.check_mut(index)?;
        check.in_flight = None;
        check.state = EditState::SaveFailed {
            message: message.to_string(),
        };
        Ok(())
    }

    /// Starts saving every check; pending files are deduplicated across checks.
    pub fn begin_save_all(&mut self) -> Result<VerificationUpdate, ReviewError> {
        if self
            .checks
            .iter()
            .any(|check| check.state == EditState::Saving)
        {
            return Err(ReviewError::SaveInProgress);
        }

        let checks = self.checks.iter().map(ReviewCheck::to_instance).collect();
        let mut attachments = AttachmentList::default();
        for (index, check) in self.checks.iter().enumerate() {
            for (section, file) in check.pending_files() {
                attachments.push_unique(file.clone(), self.descriptor(index, section, file));
            }
        }

        for check in &mut self.checks {
            check.mark_saving();
        }
        Ok(VerificationUpdate {
            checks,
            attachments,
        })
    }

    pub fn complete_save_all(&mut self, updated: CaseRecord) -> Result<(), ReviewError> {
        if let Some(index) = self
            .checks
            .iter()
            .position(|check| check.state != EditState::Saving || check.in_flight.is_none())
        {
            return Err(ReviewError::NotSaving { index });
        }
        let sent: Vec<SentEdits> = self
            .checks
            .iter_mut()
            .filter_map(ReviewCheck::take_in_flight)
            .collect();

        let echoed = !updated.checks.is_empty();
        self.absorb(&updated);
        for (check, sent) in self.checks.iter_mut().zip(sent) {
            if !echoed {
                check.confirmed = sent.instance.clone();
            }
            check.settle(sent);
        }
        Ok(())
    }

    pub fn fail_save_all(&mut self, message: &str) {
        for check in &mut self.checks {
            if check.state == EditState::Saving {
                check.in_flight = None;
                check.state = EditState::SaveFailed {
                    message: message.to_string(),
                };
            }
        }
    }

    /// Merges the server's copy of the case into the session. Checks keep
    /// their place and staged edits; server-only checks are appended.
    fn absorb(&mut self, updated: &CaseRecord) {
        if !updated.uploads.is_empty() || !updated.documents.is_empty() {
            self.documents = DocumentIndex::from_case(updated);
        }
        if updated.checks.is_empty() {
            return;
        }

        let merged = merge_checks(&self.confirmed_list(), &updated.checks);
        let known = self.checks.len();
        for (position, confirmed) in merged.into_iter().enumerate() {
            let persisted = self.documents.verified_documents(&confirmed.check_type);
            if position < known {
                let check = &mut self.checks[position];
                check.confirmed = confirmed;
                check.persisted = persisted;
                if check.state == EditState::Pristine {
                    check.restage();
                }
            } else {
                self.checks
                    .push(ReviewCheck::from_confirmed(confirmed, persisted));
            }
        }
    }

    pub fn view(&self) -> ReviewView {
        let checks = self
            .checks
            .iter()
            .enumerate()
            .map(|(index, check)| {
                let education = if check.behavior().kind == CheckKind::Education {
                    self.documents
                        .education_entries(&check.confirmed, &self.legacy_education)
                } else {
                    Vec::new()
                };
                CheckView {
                    index,
                    check_type: check.check_type().to_string(),
                    display_name: check.display_name().to_string(),
                    status: check.status,
                    state: check.state.clone(),
                    sections: check.sections(),
                    params: check.confirmed.params.clone(),
                    verified_data: check.verified_data.clone(),
                    comments: check.comments.clone(),
                    candidate_documents: self.documents.candidate_documents(check.check_type()),
                    verified_documents: check.persisted.clone(),
                    pending_files: check
                        .pending_files
                        .iter()
                        .map(|(section, file)| StagedFile {
                            section: section.clone(),
                            file: file.clone(),
                        })
                        .collect(),
                    education,
                }
            })
            .collect();

        ReviewView {
            case_id: self.case_id.clone(),
            candidate_info: self.candidate_info.clone(),
            checks,
        }
    }
}
