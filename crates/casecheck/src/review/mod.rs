//! Admin review: documents per check, merging saved checks back into the
//! list and the per-check save cycle.

pub mod documents;
pub mod reconcile;
pub mod session;

pub use documents::{
    dedupe_documents, upload_prefixes, DocumentIndex, NormalizedUpload, ResolvedEducationEntry,
    VerifiedDocument, VERIFIED_FIELD_PREFIX, VERIFIED_FILENAME_PREFIX,
};
pub use reconcile::{find_saved, identity_key, merge_checks};
pub use session::{
    CheckView, EditState, ReviewCheck, ReviewError, ReviewSession, ReviewView, StagedFile,
    OBSERVATION_FIELDS,
};
