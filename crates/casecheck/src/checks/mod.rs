//! Check types: identifiers, the built-in catalog, registry merging and the
//! per-type form layout rules.

pub mod behavior;
pub mod catalog;
pub mod comments;
pub mod domain;
pub mod interpreter;
pub mod keys;
pub mod registry;

pub use behavior::{behavior_for, CheckBehavior, CheckKind, CommentsMode};
pub use comments::CommentDraft;
pub use domain::{
    CandidateInfo, CheckComments, CheckDefinition, CheckInstance, CheckSchema, CheckStatus,
    DocumentLink, DocumentRecord, EducationEntry, FieldKind, FieldSpec, FileRef, SchemaMeta,
    SchemaSection, UploadRecord, SELF_SECTION,
};
pub use interpreter::{interpret, FormLayout, FormPlan, PlannedField, PlannedSection};
pub use keys::{compact_key, humanize_key, normalize_key};
pub use registry::{CatalogState, CategoryGroup, CheckRegistry, RawCheckEntry, RegistryError};
