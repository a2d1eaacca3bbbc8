//! Wire payloads produced from a [`SubmissionDraft`].

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::backend::MultipartForm;
use crate::checks::behavior::{ADDRESS, EDUCATION, EMPLOYMENT, NATIONAL_ID};
use crate::checks::{normalize_key, CandidateInfo, CheckInstance, CheckRegistry, EducationEntry, FileRef, SELF_SECTION};

use super::draft::SubmissionDraft;

/// Older structured blobs still read by the backend, keyed by form field.
const LEGACY_SECTIONS: [(&str, &str); 6] = [
    ("employment", EMPLOYMENT),
    ("creditCheck", "credit_history_check"),
    ("globalDatabase", "global_database"),
    ("uan", "uan"),
    ("addressVerification", ADDRESS),
    ("nationalId", NATIONAL_ID),
];

/// Where an attached file belongs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDescriptor {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_index: Option<usize>,
    pub check_type: String,
    pub sub_section_key: String,
    /// Flat `slug__section` key used by case creation.
    #[serde(skip)]
    pub field_key: String,
}

/// Files paired with their descriptors so the two lists sent to the backend
/// cannot drift apart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentList {
    entries: Vec<(FileRef, FileDescriptor)>,
}

impl AttachmentList {
    pub fn push(&mut self, file: FileRef, descriptor: FileDescriptor) {
        self.entries.push((file, descriptor));
    }

    /// Skips files already present under the same name and size.
    pub fn push_unique(&mut self, file: FileRef, descriptor: FileDescriptor) -> bool {
        let key = file.dedupe_key();
        if self.entries.iter().any(|(existing, _)| existing.dedupe_key() == key) {
            return false;
        }
        self.push(file, descriptor);
        true
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn files(&self) -> impl Iterator<Item = &FileRef> {
        self.entries.iter().map(|(file, _)| file)
    }

    pub fn descriptors(&self) -> Vec<&FileDescriptor> {
        self.entries.iter().map(|(_, descriptor)| descriptor).collect()
    }

    pub fn field_keys(&self) -> Vec<&str> {
        self.entries
            .iter()
            .map(|(_, descriptor)| descriptor.field_key.as_str())
            .collect()
    }

    fn append_keyed(self, form: &mut MultipartForm, file_part: &str, keys_part: &str) -> Result<(), serde_json::Error> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let keys: Vec<String> = self
            .entries
            .iter()
            .map(|(_, descriptor)| descriptor.field_key.clone())
            .collect();
        for (file, _) in self.entries {
            form.file(file_part, file);
        }
        form.json(keys_part, &keys)
    }

    fn append_described(self, form: &mut MultipartForm, file_part: &str, keys_part: &str) -> Result<(), serde_json::Error> {
        if self.entries.is_empty() {
            return Ok(());
        }
        let mut descriptors = Vec::with_capacity(self.entries.len());
        for (file, descriptor) in self.entries {
            form.file(file_part, file);
            descriptors.push(descriptor);
        }
        form.json(keys_part, &descriptors)
    }
}

/// Multipart body of `POST /cases`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseCreationPayload {
    pub candidate_info: CandidateInfo,
    pub client_organization: Option<String>,
    pub checks: Vec<CheckInstance>,
    pub attachments: AttachmentList,
    pub legacy_sections: Vec<(&'static str, Value)>,
    pub check_details: Map<String, Value>,
    pub education_details: Vec<EducationEntry>,
}

impl CaseCreationPayload {
    /// Only selected parent checks known to the registry become `checks`;
    /// sub-option mirror keys never do.
    pub fn build(
        candidate_info: CandidateInfo,
        client_organization: Option<String>,
        draft: &SubmissionDraft,
        registry: &CheckRegistry,
    ) -> Self {
        let parents = draft.selected_parents(registry);
        let checks: Vec<CheckInstance> = parents
            .iter()
            .map(|parent| {
                let check_type = registry
                    .find(parent)
                    .map(|definition| definition.slug.clone())
                    .unwrap_or_else(|| normalize_key(parent));
                CheckInstance::pending(&check_type, draft.check_params(parent))
            })
            .collect();

        let mut attachments = AttachmentList::default();
        for (check_index, parent) in parents.iter().enumerate() {
            for (section, file) in draft.files_for(parent) {
                attachments.push(
                    file.clone(),
                    FileDescriptor {
                        filename: file.name.clone(),
                        check_index: Some(check_index),
                        check_type: parent.clone(),
                        sub_section_key: section.to_string(),
                        field_key: format!("{parent}__{}", normalize_key(section)),
                    },
                );
            }
        }

        let education_index = parents.iter().position(|parent| parent == EDUCATION);
        for (row_index, row) in draft.education_rows().iter().enumerate() {
            if let Some(file) = &row.file {
                attachments.push(
                    file.clone(),
                    FileDescriptor {
                        filename: file.name.clone(),
                        check_index: education_index,
                        check_type: EDUCATION.to_string(),
                        sub_section_key: SELF_SECTION.to_string(),
                        field_key: format!("{EDUCATION}__document_{row_index}"),
                    },
                );
            }
        }

        for (index, file) in draft.general_files().iter().enumerate() {
            attachments.push(
                file.clone(),
                FileDescriptor {
                    filename: file.name.clone(),
                    check_index: None,
                    check_type: "general".to_string(),
                    sub_section_key: "general".to_string(),
                    field_key: format!("general__{index}__{}", normalize_key(&file.name)),
                },
            );
        }

        let legacy_sections = LEGACY_SECTIONS
            .iter()
            .filter(|(_, slug)| parents.iter().any(|parent| parent == slug))
            .filter_map(|(field, slug)| {
                let values = draft.section_values(slug);
                let blob = if *slug == NATIONAL_ID {
                    values.get(SELF_SECTION).cloned()?
                } else {
                    Value::Object(values)
                };
                let empty = blob.as_object().map(Map::is_empty).unwrap_or(true);
                (!empty).then_some((*field, blob))
            })
            .collect();

        let check_details = draft
            .check_details()
            .into_iter()
            .filter(|(slug, _)| parents.contains(slug))
            .collect();

        let education_details = if education_index.is_some() {
            draft.valid_education_entries()
        } else {
            Vec::new()
        };

        Self {
            candidate_info,
            client_organization: client_organization.filter(|value| !value.trim().is_empty()),
            checks,
            attachments,
            legacy_sections,
            check_details,
            education_details,
        }
    }

    pub fn into_form(self) -> Result<MultipartForm, serde_json::Error> {
        let mut form = MultipartForm::new();
        form.json("candidateInfo", &self.candidate_info)?;
        if let Some(client) = &self.client_organization {
            form.text("clientOrganization", client.clone());
        }
        form.json("checks", &self.checks)?;
        for (field, blob) in &self.legacy_sections {
            form.json(field, blob)?;
        }
        self.attachments
            .append_keyed(&mut form, "caseDocuments", "uploadFieldKeys")?;
        if !self.check_details.is_empty() {
            form.json("checkDetails", &self.check_details)?;
        }
        if !self.education_details.is_empty() {
            let rows: Vec<Value> = self
                .education_details
                .iter()
                .map(|entry| {
                    json!({
                        "university": entry.university,
                        "degree": entry.degree,
                        "year": entry.year,
                    })
                })
                .collect();
            form.json("educationDetails", &rows)?;
        }
        Ok(form)
    }
}

/// JSON body of `POST /cases/create-and-send-link`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkRequest {
    pub candidate_info: CandidateInfo,
    pub checks: Vec<String>,
    pub client_organization: String,
}

impl SendLinkRequest {
    /// An explicit list wins over the draft selection; blanks are dropped.
    pub fn build(
        candidate_info: CandidateInfo,
        client_organization: &str,
        explicit_checks: &[String],
        draft: &SubmissionDraft,
        registry: &CheckRegistry,
    ) -> Self {
        let cleaned = |checks: Vec<String>| -> Vec<String> {
            checks
                .into_iter()
                .map(|check| check.trim().to_string())
                .filter(|check| !check.is_empty())
                .collect()
        };
        let mut checks = cleaned(explicit_checks.to_vec());
        if checks.is_empty() {
            checks = cleaned(draft.selected_parents(registry));
        }

        Self {
            candidate_info,
            checks,
            client_organization: client_organization.trim().to_string(),
        }
    }
}

/// Multipart body of `POST /public/upload/:token`.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateUpload {
    pub check_details: Map<String, Value>,
    pub files: Vec<(String, FileRef)>,
}

impl CandidateUpload {
    /// Regular checks send at most one file, named by slug. Education entries
    /// go under `education_verification._self` and each entry's file under
    /// `education_verification_<index>`, counting every row.
    pub fn build(draft: &SubmissionDraft, requested: &[String]) -> Self {
        let wants_education = requested.iter().any(|slug| slug == EDUCATION);
        let mut check_details: Map<String, Value> = draft
            .check_details()
            .into_iter()
            .filter(|(slug, _)| slug != EDUCATION && requested.contains(slug))
            .collect();

        let mut files = Vec::new();
        for slug in requested.iter().filter(|slug| slug.as_str() != EDUCATION) {
            if let Some((_, file)) = draft.files_for(slug).next() {
                files.push((slug.clone(), file.clone()));
            }
        }

        if wants_education {
            let entries: Vec<Value> = draft
                .valid_education_entries()
                .into_iter()
                .map(|entry| {
                    json!({
                        "university": entry.university,
                        "degree": entry.degree,
                        "year": entry.year,
                    })
                })
                .collect();
            if !entries.is_empty() {
                check_details.insert(EDUCATION.to_string(), json!({ SELF_SECTION: entries }));
            }
            for (index, row) in draft.education_rows().iter().enumerate() {
                if let Some(file) = &row.file {
                    files.push((format!("{EDUCATION}_{index}"), file.clone()));
                }
            }
        }

        Self {
            check_details,
            files,
        }
    }

    pub fn into_form(self) -> Result<MultipartForm, serde_json::Error> {
        let mut form = MultipartForm::new();
        form.json("checkDetails", &self.check_details)?;
        for (name, file) in self.files {
            form.file(&name, file);
        }
        Ok(form)
    }
}

/// Multipart body of `PUT /cases/:id`.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationUpdate {
    pub checks: Vec<CheckInstance>,
    pub attachments: AttachmentList,
}

impl VerificationUpdate {
    pub fn into_form(self) -> Result<MultipartForm, serde_json::Error> {
        let mut form = MultipartForm::new();
        form.json("checks", &self.checks)?;
        self.attachments
            .append_described(&mut form, "verifiedFiles", "verifiedFileKeys")?;
        Ok(form)
    }
}
