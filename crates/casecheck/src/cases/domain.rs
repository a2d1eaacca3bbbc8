//! JSON shapes accepted and returned by the case router.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::checks::{CandidateInfo, CheckStatus, FormPlan};
use crate::intake::draft::{EducationField, SubmissionDraft};

/// Values entered for one selected check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckSelection {
    pub slug: String,
    /// `section -> field -> value`; `_self` holds unsectioned fields.
    #[serde(default)]
    pub sections: Map<String, Value>,
    /// Inputs stored at the params root, such as the drug panel level.
    #[serde(default)]
    pub root: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub_option: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationInput {
    #[serde(default)]
    pub university: String,
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub year: String,
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Replays JSON selections into a draft the payload builders understand.
pub fn draft_from_selections(checks: &[CheckSelection], education: &[EducationInput]) -> SubmissionDraft {
    let mut draft = SubmissionDraft::new();
    for selection in checks {
        let slug = selection.slug.trim();
        if slug.is_empty() {
            continue;
        }
        draft.select_check(slug);
        if let Some(choice) = selection.sub_option.as_deref() {
            draft.choose_sub_option(slug, choice);
        }
        for choice in &selection.sub_options {
            draft.toggle_sub_option(slug, choice, true);
        }
        if let Some(notes) = selection.notes.as_deref() {
            draft.set_notes(slug, notes);
        }
        for (section, fields) in &selection.sections {
            let Value::Object(fields) = fields else {
                continue;
            };
            for (field, value) in fields {
                if let Some(text) = text_of(value) {
                    draft.set_value(slug, section, field, &text);
                }
            }
        }
        for (field, value) in &selection.root {
            if let Some(text) = text_of(value) {
                draft.set_root_value(slug, field, &text);
            }
        }
    }

    for (position, entry) in education.iter().enumerate() {
        let index = if position == 0 { 0 } else { draft.add_education_row() };
        draft.set_education_field(index, EducationField::University, &entry.university);
        draft.set_education_field(index, EducationField::Degree, &entry.degree);
        draft.set_education_field(index, EducationField::Year, &entry.year);
    }
    draft
}

/// Body of `POST /api/v1/cases`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseIntakeRequest {
    #[serde(default)]
    pub candidate_info: CandidateInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_organization: Option<String>,
    #[serde(default)]
    pub checks: Vec<CheckSelection>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub education: Vec<EducationInput>,
}

impl CaseIntakeRequest {
    pub fn to_draft(&self) -> SubmissionDraft {
        draft_from_selections(&self.checks, &self.education)
    }
}

/// Body of `POST /api/v1/cases/send-link`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendLinkIntake {
    #[serde(default)]
    pub candidate_info: CandidateInfo,
    #[serde(default)]
    pub client_organization: Option<String>,
    #[serde(default)]
    pub checks: Vec<String>,
}

/// Body of `POST /api/v1/cases/bulk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkIntake {
    #[serde(default = "default_bulk_filename")]
    pub filename: String,
    pub csv: String,
    #[serde(default)]
    pub checks: Vec<String>,
    #[serde(default)]
    pub client_organization: Option<String>,
}

fn default_bulk_filename() -> String {
    "candidates.csv".to_string()
}

/// Body of `POST /api/v1/portal/:token`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortalSubmission {
    #[serde(default)]
    pub checks: Vec<CheckSelection>,
    #[serde(default)]
    pub education: Vec<EducationInput>,
}

/// Form a candidate fills in through an upload link.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortalForm {
    pub candidate_name: String,
    pub client_name: String,
    pub checks: Vec<FormPlan>,
}

/// Staged reviewer edits for one check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckEdit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CheckStatus>,
    /// `section -> detail field -> value`
    #[serde(default)]
    pub observations: Map<String, Value>,
    /// `section -> comment`
    #[serde(default)]
    pub comments: Map<String, Value>,
}

impl CheckEdit {
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.observations.is_empty() && self.comments.is_empty()
    }
}
