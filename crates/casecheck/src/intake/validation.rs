use crate::checks::behavior::{behavior_for, SubmitRule, EDUCATION};
use crate::checks::{CandidateInfo, FormPlan, SELF_SECTION};

use super::draft::SubmissionDraft;

/// Reasons a submission is blocked before anything is sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("For National ID Verification, at least one ID number must be provided. Please fill in the required details.")]
    MissingNationalId,
    #[error("Please fill in all education details (University, Degree, Year)")]
    IncompleteEducation { index: usize },
    #[error("Candidate email is required to send an upload link. Please enter the candidate's email.")]
    MissingEmail,
    #[error("Client organization is required to send link. Please select one.")]
    MissingClientOrganization,
    #[error("Please select at least one verification check for which the candidate should upload documents.")]
    NoChecksSelected,
}

/// Rules applied to every check that carries data in the draft.
///
/// `plans` supplies the ID fields declared by the national ID schema, each
/// read from the section it was declared in. Without a plan the standard ID
/// numbers are read from `_self`.
pub fn validate_checks(
    draft: &SubmissionDraft,
    checks: &[String],
    plans: &[FormPlan],
) -> Result<(), SubmissionError> {
    for check in checks {
        match behavior_for(check).submit_rule {
            SubmitRule::None => {}
            SubmitRule::AnyOf(defaults) => {
                let declared: Vec<(&str, &str)> = plans
                    .iter()
                    .find(|plan| plan.slug == *check)
                    .map(|plan| {
                        plan.sections()
                            .into_iter()
                            .flat_map(|section| {
                                section
                                    .text_fields()
                                    .map(move |field| (section.key.as_str(), field.name.as_str()))
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                let fields: Vec<(&str, &str)> = if declared.is_empty() {
                    defaults.iter().map(|field| (SELF_SECTION, *field)).collect()
                } else {
                    declared
                };
                let filled = fields.iter().any(|(section, field)| {
                    draft
                        .value(check, section, field)
                        .map(|value| !value.trim().is_empty())
                        .unwrap_or(false)
                });
                if !filled {
                    return Err(SubmissionError::MissingNationalId);
                }
            }
            SubmitRule::CompleteEntries => validate_education(draft)?,
        }
    }
    Ok(())
}

/// Every started row (any field or a file) needs all three details.
pub fn validate_education(draft: &SubmissionDraft) -> Result<(), SubmissionError> {
    match draft
        .education_rows()
        .iter()
        .position(|row| row.is_started() && !row.is_complete())
    {
        Some(index) => Err(SubmissionError::IncompleteEducation { index }),
        None => Ok(()),
    }
}

/// Send-link needs an email, a client and at least one check. Direct case
/// creation accepts zero checks.
pub fn validate_send_link(
    candidate: &CandidateInfo,
    client_organization: Option<&str>,
    checks: &[String],
) -> Result<(), SubmissionError> {
    if candidate.email.trim().is_empty() {
        return Err(SubmissionError::MissingEmail);
    }
    if client_organization.map(str::trim).unwrap_or("").is_empty() {
        return Err(SubmissionError::MissingClientOrganization);
    }
    if checks.iter().all(|check| check.trim().is_empty()) {
        return Err(SubmissionError::NoChecksSelected);
    }
    Ok(())
}

/// Whether `check` is the repeatable education check.
pub fn is_education(check: &str) -> bool {
    behavior_for(check).slug == EDUCATION
}
