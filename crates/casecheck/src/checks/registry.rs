use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::catalog::builtin_definitions;
use super::domain::{CheckDefinition, CheckSchema};
use super::keys::{compact_key, normalize_key};

pub const DEFAULT_CATEGORY: &str = "Other";
pub const LOAD_FAILURE_MESSAGE: &str = "Failed to load checks/clients. Try refreshing.";

/// Check entry as returned by the catalog endpoint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCheckEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(
        default,
        alias = "_schema",
        alias = "formSchema",
        skip_serializing_if = "Option::is_none"
    )]
    pub schema: Option<Value>,
    #[serde(default, alias = "group", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, alias = "desc", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RawCheckEntry {
    fn display_name(&self) -> Option<&str> {
        [&self.name, &self.label, &self.display_name]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    fn identifier(&self) -> Option<&str> {
        [&self.slug, &self.key]
            .into_iter()
            .filter_map(|value| value.as_deref())
            .map(str::trim)
            .find(|value| !value.is_empty())
    }

    fn parsed_schema(&self) -> Option<CheckSchema> {
        match &self.schema {
            Some(value @ Value::Object(_)) => serde_json::from_value::<CheckSchema>(value.clone())
                .ok()
                .filter(|schema| !schema.is_empty()),
            _ => None,
        }
    }
}

/// Deduplicated set of check definitions offered to a case flow.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CheckRegistry {
    definitions: Vec<CheckDefinition>,
}

/// Checks of one category, in first-seen order.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryGroup {
    pub category: String,
    pub checks: Vec<CheckDefinition>,
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("check catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

impl CheckRegistry {
    /// Registry made of the built-in schemas only.
    pub fn builtin() -> Self {
        Self {
            definitions: builtin_definitions(),
        }
    }

    /// Normalizes and deduplicates raw catalog entries.
    ///
    /// Entries collide when their normalized names (or slugs) match. The
    /// entry carrying a schema wins; otherwise the first entry keeps its
    /// identity and only picks up missing category or description. Entries
    /// that still have no schema borrow the built-in one for the same check.
    pub fn from_raw(entries: Vec<RawCheckEntry>) -> Self {
        let mut definitions: Vec<CheckDefinition> = Vec::new();
        let mut by_name: HashMap<String, usize> = HashMap::new();
        let mut by_slug: HashMap<String, usize> = HashMap::new();

        for (index, raw) in entries.iter().enumerate() {
            let name = raw.display_name();
            let fallback = format!("check_{index}");
            let slug = normalize_key(raw.identifier().or(name).unwrap_or(&fallback));
            if slug.is_empty() {
                continue;
            }
            let group = normalize_key(name.unwrap_or(&slug));
            let candidate = CheckDefinition {
                display_name: name
                    .map(str::to_string)
                    .unwrap_or_else(|| slug.replace('_', " ")),
                category: raw
                    .category
                    .as_deref()
                    .map(str::trim)
                    .unwrap_or_default()
                    .to_string(),
                description: raw.description.clone().unwrap_or_default(),
                schema: raw.parsed_schema(),
                slug: slug.clone(),
            };

            let existing = by_name
                .get(&group)
                .or_else(|| by_slug.get(&slug))
                .copied();
            match existing {
                None => {
                    definitions.push(candidate);
                    let position = definitions.len() - 1;
                    by_name.insert(group, position);
                    by_slug.insert(slug, position);
                }
                Some(position) => {
                    let current = &mut definitions[position];
                    if current.schema.is_none() && candidate.schema.is_some() {
                        let previous = std::mem::replace(current, candidate);
                        enrich(current, &previous);
                    } else {
                        enrich(current, &candidate);
                    }
                    by_name.insert(group, position);
                    by_slug.insert(current.slug.clone(), position);
                }
            }
        }

        let builtin = builtin_definitions();
        for definition in &mut definitions {
            definition.slug = normalize_key(&definition.slug);
            if definition.category.is_empty() {
                definition.category = DEFAULT_CATEGORY.to_string();
            }
            if definition.schema.is_none() {
                definition.schema = builtin_schema_for(&builtin, definition);
            }
        }

        debug!(checks = definitions.len(), "check registry built");
        Self { definitions }
    }

    pub fn from_json(raw: &str) -> Result<Self, RegistryError> {
        let entries: Vec<RawCheckEntry> = serde_json::from_str(raw)?;
        Ok(Self::from_raw(entries))
    }

    pub fn definitions(&self) -> &[CheckDefinition] {
        &self.definitions
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn contains(&self, slug: &str) -> bool {
        self.definitions.iter().any(|definition| definition.slug == slug)
    }

    /// Looks a check up by slug, name or any loosely equal spelling.
    pub fn find(&self, key: &str) -> Option<&CheckDefinition> {
        let normalized = normalize_key(key);
        let compact = compact_key(key);
        self.definitions
            .iter()
            .find(|definition| definition.slug == normalized)
            .or_else(|| {
                self.definitions.iter().find(|definition| {
                    compact_key(&definition.slug) == compact
                        || compact_key(&definition.display_name) == compact
                })
            })
    }

    pub fn grouped_by_category(&self) -> Vec<CategoryGroup> {
        let mut groups: Vec<CategoryGroup> = Vec::new();
        for definition in &self.definitions {
            match groups
                .iter_mut()
                .find(|group| group.category == definition.category)
            {
                Some(group) => group.checks.push(definition.clone()),
                None => groups.push(CategoryGroup {
                    category: definition.category.clone(),
                    checks: vec![definition.clone()],
                }),
            }
        }
        groups
    }
}

fn enrich(target: &mut CheckDefinition, donor: &CheckDefinition) {
    if target.category.is_empty() && !donor.category.is_empty() {
        target.category = donor.category.clone();
    }
    if target.description.trim().is_empty() && !donor.description.trim().is_empty() {
        target.description = donor.description.clone();
    }
}

fn builtin_schema_for(builtin: &[CheckDefinition], definition: &CheckDefinition) -> Option<CheckSchema> {
    let slug = compact_key(&definition.slug);
    let name = compact_key(&definition.display_name);
    builtin
        .iter()
        .find(|candidate| {
            let candidate_slug = compact_key(&candidate.slug);
            candidate_slug == slug || candidate_slug == name
        })
        .and_then(|candidate| candidate.schema.clone())
}

/// Outcome of loading the catalog for a case flow.
#[derive(Debug, Clone)]
pub enum CatalogState {
    Loaded(CheckRegistry),
    Failed { message: String },
}

impl CatalogState {
    pub fn failed() -> Self {
        CatalogState::Failed {
            message: LOAD_FAILURE_MESSAGE.to_string(),
        }
    }

    /// Check selection is only offered once a catalog has loaded.
    pub fn selectable(&self) -> bool {
        matches!(self, CatalogState::Loaded(registry) if !registry.is_empty())
    }

    pub fn registry(&self) -> Option<&CheckRegistry> {
        match self {
            CatalogState::Loaded(registry) => Some(registry),
            CatalogState::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            CatalogState::Loaded(_) => None,
            CatalogState::Failed { message } => Some(message),
        }
    }
}
