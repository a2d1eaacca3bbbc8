//! Case intake: the draft store, submission rules and the payloads sent on
//! case creation, send-link, bulk send and candidate upload.

pub mod bulk;
pub mod draft;
pub mod payload;
pub mod validation;

pub use bulk::{
    parse_candidates, parse_upload, BulkFailure, BulkIntakeError, BulkOutcome, BulkSendRequest,
    BulkSuccess, IntakeFormat,
};
pub use draft::{EducationField, EducationRow, FieldPath, SlotKey, SubmissionDraft};
pub use payload::{
    AttachmentList, CandidateUpload, CaseCreationPayload, FileDescriptor, SendLinkRequest,
    VerificationUpdate,
};
pub use validation::{validate_checks, validate_education, validate_send_link, SubmissionError};
