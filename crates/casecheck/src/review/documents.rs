//! Associates uploaded documents with the checks they support.
//!
//! Uploads reference documents through loosely formed `fieldKey` strings, so a
//! check's documents are found through a table of known key prefixes and a
//! three-tier match (exact, prefix, substring) where the first tier with any
//! hit wins.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use serde_json::Value;

use crate::backend::CaseRecord;
use crate::checks::{compact_key, normalize_key, CheckInstance, DocumentLink, DocumentRecord, EducationEntry, UploadRecord};

pub const VERIFIED_FIELD_PREFIX: &str = "verified_";
pub const VERIFIED_FILENAME_PREFIX: &str = "[VERIFIED]";

const UPLOAD_PREFIXES: &[(&str, &[&str])] = &[
    ("address_verification", &["address_verification", "address_proof"]),
    (
        "credit_history_check",
        &["credit_history_check", "credit_check", "credit_report"],
    ),
    ("directorship_check", &["directorship_check"]),
    ("drug_panel_tests", &["drug_panel_tests"]),
    ("court_record_check", &["court_record_check"]),
    (
        "education_verification",
        &["education_verification", "educationdocuments"],
    ),
    (
        "employment_verification",
        &["employment_verification", "employment_proof"],
    ),
    ("gap_analysis", &["gap_analysis"]),
    ("global_database", &["global_database"]),
    (
        "national_id_verification",
        &["national_id_verification", "national_id", "national_id_proof"],
    ),
    ("other_documents", &["other_documents", "general"]),
    ("police_verification", &["police_verification"]),
    ("reference_checks", &["reference_checks"]),
    ("social_media_screening", &["social_media_screening"]),
    ("uan", &["uan", "uan_proof"]),
];

#[derive(Debug, Clone, Copy)]
enum MatchTier {
    Exact,
    Prefix,
    Substring,
}

impl MatchTier {
    fn matches(self, key: &str, wanted: &str) -> bool {
        match self {
            MatchTier::Exact => key == wanted,
            MatchTier::Prefix => key.starts_with(wanted),
            MatchTier::Substring => key.contains(wanted),
        }
    }
}

/// An upload joined with its document record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUpload {
    pub field_key: String,
    pub document: Option<DocumentRecord>,
    pub original_document_id: Option<String>,
}

impl NormalizedUpload {
    fn is_verified(&self) -> bool {
        self.field_key.to_lowercase().starts_with(VERIFIED_FIELD_PREFIX)
    }

    fn dedupe_key(&self) -> String {
        let identity = self
            .document
            .as_ref()
            .and_then(|document| document.id.clone())
            .or_else(|| self.original_document_id.clone())
            .or_else(|| {
                self.document
                    .as_ref()
                    .map(|document| document.display_filename().to_string())
                    .filter(|name| !name.is_empty())
            })
            .unwrap_or_else(|| serde_json::to_string(self).unwrap_or_default());
        format!("{}::{identity}", self.field_key)
    }
}

/// A verifier-uploaded document and the section it was filed under.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifiedDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub document: DocumentRecord,
}

/// An education entry with its own documents resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedEducationEntry {
    #[serde(flatten)]
    pub entry: EducationEntry,
    pub candidate_provided: bool,
    pub resolved_documents: Vec<DocumentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentIndex {
    uploads: Vec<NormalizedUpload>,
    documents: Vec<DocumentRecord>,
}

impl DocumentIndex {
    /// Joins each upload's `documentId` with `documents` and drops repeated
    /// `(fieldKey, document)` pairs, keeping the first.
    pub fn new(uploads: &[UploadRecord], documents: &[DocumentRecord]) -> Self {
        let by_id: BTreeMap<&str, &DocumentRecord> = documents
            .iter()
            .filter_map(|document| document.id.as_deref().map(|id| (id, document)))
            .collect();

        let mut seen = HashSet::new();
        let uploads = uploads
            .iter()
            .map(|upload| {
                let (document, original_document_id) = match &upload.document_id {
                    Some(DocumentLink::Embedded(document)) => (
                        document.id.is_some().then(|| (**document).clone()),
                        document.id.clone(),
                    ),
                    Some(DocumentLink::Id(id)) => {
                        (by_id.get(id.as_str()).map(|doc| (*doc).clone()), Some(id.clone()))
                    }
                    None => (None, None),
                };
                NormalizedUpload {
                    field_key: upload.field_key.clone(),
                    document,
                    original_document_id,
                }
            })
            .filter(|upload| seen.insert(upload.dedupe_key()))
            .collect();

        Self {
            uploads,
            documents: documents.to_vec(),
        }
    }

    pub fn from_case(case: &CaseRecord) -> Self {
        Self::new(&case.uploads, &case.documents)
    }

    pub fn uploads(&self) -> &[NormalizedUpload] {
        &self.uploads
    }

    pub fn document(&self, id: &str) -> Option<&DocumentRecord> {
        self.documents
            .iter()
            .find(|document| document.id.as_deref() == Some(id))
    }

    /// Candidate documents filed under `field_key`.
    pub fn uploads_for_field(&self, field_key: &str) -> Vec<DocumentRecord> {
        let wanted = field_key.to_lowercase();
        if wanted.is_empty() {
            return Vec::new();
        }
        let candidates: Vec<(String, &NormalizedUpload)> = self
            .uploads
            .iter()
            .filter(|upload| !upload.is_verified())
            .map(|upload| (upload.field_key.to_lowercase(), upload))
            .collect();

        for tier in [MatchTier::Exact, MatchTier::Prefix, MatchTier::Substring] {
            let hits: Vec<DocumentRecord> = candidates
                .iter()
                .filter(|(key, _)| tier.matches(key, &wanted))
                .filter_map(|(_, upload)| upload.document.clone())
                .collect();
            if !hits.is_empty() {
                return dedupe_documents(hits);
            }
        }
        Vec::new()
    }

    /// Everything the candidate supplied for a check: uploads found through
    /// the prefix table plus documents tagged with the check type. Verifier
    /// files are left out.
    pub fn candidate_documents(&self, check_type: &str) -> Vec<DocumentRecord> {
        let key = compact_key(check_type);
        let mapped = upload_prefixes(check_type)
            .into_iter()
            .flat_map(|prefix| self.uploads_for_field(&prefix));
        let tagged = self.documents.iter().cloned().filter(|document| {
            document
                .check_type
                .as_deref()
                .map(|tag| compact_key(tag) == key)
                .unwrap_or(false)
        });
        dedupe_documents(
            mapped
                .chain(tagged)
                .filter(|document| !document.display_filename().starts_with(VERIFIED_FILENAME_PREFIX))
                .collect(),
        )
    }

    /// Persisted `verified_<checktype>[__<section>]` uploads for a check.
    pub fn verified_documents(&self, check_type: &str) -> Vec<VerifiedDocument> {
        let wanted = compact_key(check_type);
        if wanted.is_empty() {
            return Vec::new();
        }
        let mut seen = HashSet::new();
        self.uploads
            .iter()
            .filter(|upload| upload.is_verified())
            .filter_map(|upload| {
                let lowered = upload.field_key.to_lowercase();
                let rest = &lowered[VERIFIED_FIELD_PREFIX.len()..];
                let (check_part, section) = match rest.split_once("__") {
                    Some((check_part, section)) => (check_part, Some(section.to_string())),
                    None => (rest, None),
                };
                let found = compact_key(check_part);
                let related = !found.is_empty() && (found.contains(&wanted) || wanted.contains(&found));
                if !related {
                    return None;
                }
                let document = upload.document.clone()?;
                seen.insert(document_identity(&document)).then_some(VerifiedDocument {
                    section: section.filter(|section| !section.is_empty()),
                    document,
                })
            })
            .collect()
    }

    /// Education entries from `params.list`, else the case's legacy list,
    /// with each entry's document ids resolved against the case documents.
    pub fn education_entries(
        &self,
        check: &CheckInstance,
        legacy: &[EducationEntry],
    ) -> Vec<ResolvedEducationEntry> {
        let listed: Vec<EducationEntry> = match check.params.get("list") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect(),
            _ => Vec::new(),
        };
        let entries = if listed.is_empty() {
            legacy.to_vec()
        } else {
            listed
        };

        entries
            .into_iter()
            .map(|entry| {
                let resolved_documents = dedupe_documents(
                    entry
                        .documents
                        .iter()
                        .filter_map(|id| self.document(id).cloned())
                        .collect(),
                );
                ResolvedEducationEntry {
                    candidate_provided: entry.provided_by.as_deref() == Some("candidate"),
                    entry,
                    resolved_documents,
                }
            })
            .collect()
    }
}

/// Known upload key prefixes for a check type, matched on the compact key so
/// spacing and case don't matter. Unknown types map to their own slug.
pub fn upload_prefixes(check_type: &str) -> Vec<String> {
    let wanted = compact_key(check_type);
    if wanted.is_empty() {
        return Vec::new();
    }
    UPLOAD_PREFIXES
        .iter()
        .find(|(slug, _)| compact_key(slug) == wanted)
        .map(|(_, prefixes)| prefixes.iter().map(|prefix| prefix.to_string()).collect())
        .unwrap_or_else(|| vec![normalize_key(check_type)])
}

fn document_identity(document: &DocumentRecord) -> String {
    document
        .id
        .clone()
        .or_else(|| {
            [
                document.original_filename.as_ref(),
                document.filename.as_ref(),
                document.storage_url.as_ref(),
                document.url.as_ref(),
            ]
            .into_iter()
            .flatten()
            .find(|value| !value.is_empty())
            .cloned()
        })
        .unwrap_or_else(|| serde_json::to_string(document).unwrap_or_default())
}

/// Drops repeated documents, keeping the first of each identity.
pub fn dedupe_documents(documents: Vec<DocumentRecord>) -> Vec<DocumentRecord> {
    let mut seen = HashSet::new();
    documents
        .into_iter()
        .filter(|document| seen.insert(document_identity(document)))
        .collect()
}
