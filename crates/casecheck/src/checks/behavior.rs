//! Per-check-type overrides, kept as one table instead of scattered string
//! comparisons.

use serde::Serialize;
use serde_json::{Map, Value};

use super::domain::SELF_SECTION;
use super::keys::{compact_key, normalize_key};

pub const EDUCATION: &str = "education_verification";
pub const NATIONAL_ID: &str = "national_id_verification";
pub const DRUG_PANEL: &str = "drug_panel_tests";
pub const ADDRESS: &str = "address_verification";
pub const EMPLOYMENT: &str = "employment_verification";

/// Root-level params key holding the drug panel selection.
pub const LAB_TEST_LEVEL: &str = "labTestLevel";

/// Section used for single-section review data and comments.
pub const DEFAULT_SECTION: &str = "_default";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Generic,
    Education,
    NationalId,
    DrugPanel,
    Address,
    Employment,
}

/// How a check's comments are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommentsMode {
    Single,
    PerSection,
}

/// Validation applied when a check is submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRule {
    None,
    /// At least one of the listed fields must be filled.
    AnyOf(&'static [&'static str]),
    /// Every started entry needs university, degree and year.
    CompleteEntries,
}

#[derive(Debug)]
pub struct CheckBehavior {
    pub kind: CheckKind,
    pub slug: &'static str,
    pub comments: CommentsMode,
    /// `(label fragment, canonical key)` pairs for named sections.
    pub section_aliases: &'static [(&'static str, &'static str)],
    /// Field stored at the params root rather than inside a section.
    pub root_field: Option<&'static str>,
    pub single_file: bool,
    pub submit_rule: SubmitRule,
}

pub const NATIONAL_ID_FIELDS: &[&str] = &["aadhaar", "pan", "passport", "voter", "drivingLicence"];

static GENERIC: CheckBehavior = CheckBehavior {
    kind: CheckKind::Generic,
    slug: "",
    comments: CommentsMode::Single,
    section_aliases: &[],
    root_field: None,
    single_file: false,
    submit_rule: SubmitRule::None,
};

static BEHAVIORS: [CheckBehavior; 5] = [
    CheckBehavior {
        kind: CheckKind::Education,
        slug: EDUCATION,
        comments: CommentsMode::Single,
        section_aliases: &[],
        root_field: None,
        single_file: false,
        submit_rule: SubmitRule::CompleteEntries,
    },
    CheckBehavior {
        kind: CheckKind::NationalId,
        slug: NATIONAL_ID,
        comments: CommentsMode::Single,
        section_aliases: &[],
        root_field: None,
        single_file: true,
        submit_rule: SubmitRule::AnyOf(NATIONAL_ID_FIELDS),
    },
    CheckBehavior {
        kind: CheckKind::DrugPanel,
        slug: DRUG_PANEL,
        comments: CommentsMode::Single,
        section_aliases: &[],
        root_field: Some(LAB_TEST_LEVEL),
        single_file: false,
        submit_rule: SubmitRule::None,
    },
    CheckBehavior {
        kind: CheckKind::Address,
        slug: ADDRESS,
        comments: CommentsMode::PerSection,
        section_aliases: &[
            ("current", "current"),
            ("permanent", "permanent"),
            ("preference", "preferences"),
        ],
        root_field: None,
        single_file: false,
        submit_rule: SubmitRule::None,
    },
    CheckBehavior {
        kind: CheckKind::Employment,
        slug: EMPLOYMENT,
        comments: CommentsMode::PerSection,
        section_aliases: &[("current", "current"), ("previous", "previous")],
        root_field: None,
        single_file: false,
        submit_rule: SubmitRule::None,
    },
];

/// Behavior entry for a check type; unknown types get the generic entry.
pub fn behavior_for(check_type: &str) -> &'static CheckBehavior {
    let normalized = normalize_key(check_type);
    let compact = compact_key(check_type);
    BEHAVIORS
        .iter()
        .find(|behavior| behavior.slug == normalized)
        .or_else(|| {
            BEHAVIORS
                .iter()
                .find(|behavior| compact_key(behavior.slug) == compact)
        })
        .unwrap_or(&GENERIC)
}

impl CheckBehavior {
    pub fn is_multi_section(&self) -> bool {
        self.comments == CommentsMode::PerSection
    }

    /// Storage key of a schema section label.
    pub fn section_key(&self, label: &str) -> String {
        if label == SELF_SECTION {
            return SELF_SECTION.to_string();
        }
        let lowered = label.to_lowercase();
        self.section_aliases
            .iter()
            .find(|(fragment, _)| lowered.contains(fragment))
            .map(|(_, key)| key.to_string())
            .unwrap_or_else(|| normalize_key(label))
    }

    /// Sections an admin records observations for during review.
    pub fn review_sections(&self, params: &Map<String, Value>) -> Vec<String> {
        if !self.is_multi_section() {
            return vec![DEFAULT_SECTION.to_string()];
        }
        let sections: Vec<String> = params
            .iter()
            .filter(|(key, value)| {
                value.is_object() && key.as_str() != SELF_SECTION && key.as_str() != "preferences"
            })
            .map(|(key, _)| key.clone())
            .collect();
        if sections.is_empty() {
            vec![DEFAULT_SECTION.to_string()]
        } else {
            sections
        }
    }
}
