//! Case desk service composing catalog loading, intake, the candidate portal,
//! admin review and report download, plus its HTTP router.

pub mod domain;
pub mod router;
pub mod service;
pub mod upload;

#[cfg(test)]
mod tests;

pub use domain::{
    draft_from_selections, BulkIntake, CaseIntakeRequest, CheckEdit, CheckSelection,
    EducationInput, PortalForm, PortalSubmission, SendLinkIntake,
};
pub use router::case_router;
pub use service::{CaseDeskService, Operation, ServiceError, REPORT_TIMEOUT_MESSAGE};
pub use upload::{attach_uploads, UploadBody, GENERAL_PART, PAYLOAD_PART};
