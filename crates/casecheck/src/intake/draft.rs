//! In-progress input for one case, shared by admin creation and candidate
//! self-service.
//!
//! Values live in a flat map keyed by `(check, section, field)`. Writing one
//! path never touches another, and the nested `params` view is rebuilt on
//! demand with empty sections pruned.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::checks::behavior::{behavior_for, EDUCATION, LAB_TEST_LEVEL};
use crate::checks::{normalize_key, CheckRegistry, EducationEntry, FileRef, SELF_SECTION};

/// Section marker for values stored at the params root.
pub const ROOT_SECTION: &str = "";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FieldPath {
    pub check: String,
    pub section: String,
    pub field: String,
}

impl FieldPath {
    pub fn new(check: &str, section: &str, field: &str) -> Self {
        Self {
            check: check.to_string(),
            section: section.to_string(),
            field: field.to_string(),
        }
    }
}

/// Upload slot: one file per section per check.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SlotKey {
    pub check: String,
    pub section: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EducationField {
    University,
    Degree,
    Year,
}

/// One editable education row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EducationRow {
    pub university: String,
    pub degree: String,
    pub year: String,
    pub file: Option<FileRef>,
}

impl EducationRow {
    pub fn has_any_detail(&self) -> bool {
        [&self.university, &self.degree, &self.year]
            .iter()
            .any(|value| !value.trim().is_empty())
    }

    pub fn is_started(&self) -> bool {
        self.has_any_detail() || self.file.is_some()
    }

    pub fn is_complete(&self) -> bool {
        [&self.university, &self.degree, &self.year]
            .iter()
            .all(|value| !value.trim().is_empty())
    }

    pub fn to_entry(&self) -> EducationEntry {
        EducationEntry {
            university: self.university.clone(),
            degree: self.degree.clone(),
            year: self.year.clone(),
            ..EducationEntry::default()
        }
    }
}

/// Sub-option picked under a parent check.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SubOptions {
    Single(String),
    Multiple(BTreeSet<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionDraft {
    values: BTreeMap<FieldPath, String>,
    files: Vec<(SlotKey, FileRef)>,
    education: Vec<EducationRow>,
    general_files: Vec<FileRef>,
    dirty: BTreeSet<FieldPath>,
    selected: Vec<String>,
    sub_options: BTreeMap<String, SubOptions>,
    notes: BTreeMap<String, String>,
}

impl Default for SubmissionDraft {
    fn default() -> Self {
        Self {
            values: BTreeMap::new(),
            files: Vec::new(),
            education: vec![EducationRow::default()],
            general_files: Vec::new(),
            dirty: BTreeSet::new(),
            selected: Vec::new(),
            sub_options: BTreeMap::new(),
            notes: BTreeMap::new(),
        }
    }
}

impl SubmissionDraft {
    pub fn new() -> Self {
        Self::default()
    }

    // ---- selection ----

    pub fn select_check(&mut self, slug: &str) {
        if !self.selected.iter().any(|selected| selected == slug) {
            self.selected.push(slug.to_string());
        }
    }

    /// Unselecting a parent drops everything entered for it.
    pub fn deselect_check(&mut self, slug: &str) {
        let mirror_prefix = format!("{slug}__");
        self.selected
            .retain(|selected| selected != slug && !selected.starts_with(&mirror_prefix));
        self.values.retain(|path, _| path.check != slug);
        self.dirty.retain(|path| path.check != slug);
        self.files.retain(|(slot, _)| slot.check != slug);
        self.sub_options.remove(slug);
        self.notes.remove(slug);
        if slug == EDUCATION {
            self.education = vec![EducationRow::default()];
        }
    }

    pub fn is_selected(&self, slug: &str) -> bool {
        self.selected.iter().any(|selected| selected == slug)
    }

    /// Every selection key, including `parent__sub` mirror keys.
    pub fn selected_keys(&self) -> &[String] {
        &self.selected
    }

    /// Selected keys that name a real check in the registry.
    pub fn selected_parents(&self, registry: &CheckRegistry) -> Vec<String> {
        self.selected
            .iter()
            .filter(|key| registry.contains(key))
            .cloned()
            .collect()
    }

    pub fn choose_sub_option(&mut self, parent: &str, value: &str) {
        self.sub_options
            .insert(parent.to_string(), SubOptions::Single(value.to_string()));
    }

    /// Checkbox sub-options are mirrored into the selection as `parent__sub`.
    pub fn toggle_sub_option(&mut self, parent: &str, value: &str, checked: bool) {
        let normalized = normalize_key(value);
        let mirror = format!("{parent}__{normalized}");
        let entry = self
            .sub_options
            .entry(parent.to_string())
            .or_insert_with(|| SubOptions::Multiple(BTreeSet::new()));
        if let SubOptions::Single(_) = entry {
            *entry = SubOptions::Multiple(BTreeSet::new());
        }
        if let SubOptions::Multiple(set) = entry {
            if checked {
                set.insert(normalized);
            } else {
                set.remove(&normalized);
            }
        }
        if checked {
            self.select_check(&mirror);
        } else {
            self.selected.retain(|selected| selected != &mirror);
        }
    }

    pub fn set_notes(&mut self, slug: &str, notes: &str) {
        if notes.trim().is_empty() {
            self.notes.remove(slug);
        } else {
            self.notes.insert(slug.to_string(), notes.to_string());
        }
    }

    // ---- field values ----

    /// Stores one value; an empty value removes the path.
    pub fn set_value(&mut self, check: &str, section: &str, field: &str, value: &str) {
        let path = FieldPath::new(check, section, field);
        if value.is_empty() {
            self.values.remove(&path);
        } else {
            self.values.insert(path.clone(), value.to_string());
        }
        self.dirty.insert(path);
    }

    pub fn set_root_value(&mut self, check: &str, field: &str, value: &str) {
        self.set_value(check, ROOT_SECTION, field, value);
    }

    pub fn value(&self, check: &str, section: &str, field: &str) -> Option<&str> {
        self.values
            .get(&FieldPath::new(check, section, field))
            .map(String::as_str)
    }

    pub fn dirty_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.dirty.iter()
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    // ---- files ----

    /// Replaces whatever file was waiting in the slot. National ID keeps a
    /// single slot no matter which section asked.
    pub fn attach_file(&mut self, check: &str, section: &str, file: FileRef) -> Option<FileRef> {
        let section = if behavior_for(check).single_file {
            SELF_SECTION
        } else {
            section
        };
        let slot = SlotKey {
            check: check.to_string(),
            section: section.to_string(),
        };
        match self.files.iter_mut().find(|(existing, _)| *existing == slot) {
            Some((_, current)) => Some(std::mem::replace(current, file)),
            None => {
                self.files.push((slot, file));
                None
            }
        }
    }

    pub fn remove_file(&mut self, check: &str, section: &str) -> Option<FileRef> {
        let section = if behavior_for(check).single_file {
            SELF_SECTION
        } else {
            section
        };
        let position = self
            .files
            .iter()
            .position(|(slot, _)| slot.check == check && slot.section == section)?;
        Some(self.files.remove(position).1)
    }

    pub fn file(&self, check: &str, section: &str) -> Option<&FileRef> {
        self.files
            .iter()
            .find(|(slot, _)| slot.check == check && slot.section == section)
            .map(|(_, file)| file)
    }

    /// Files of one check in the order they were attached.
    pub fn files_for(&self, check: &str) -> impl Iterator<Item = (&str, &FileRef)> {
        let check = check.to_string();
        self.files
            .iter()
            .filter(move |(slot, _)| slot.check == check)
            .map(|(slot, file)| (slot.section.as_str(), file))
    }

    pub fn add_general_file(&mut self, file: FileRef) {
        self.general_files.push(file);
    }

    pub fn remove_general_file(&mut self, index: usize) -> Option<FileRef> {
        (index < self.general_files.len()).then(|| self.general_files.remove(index))
    }

    pub fn general_files(&self) -> &[FileRef] {
        &self.general_files
    }

    // ---- education ----

    pub fn education_rows(&self) -> &[EducationRow] {
        &self.education
    }

    pub fn add_education_row(&mut self) -> usize {
        self.education.push(EducationRow::default());
        self.education.len() - 1
    }

    /// The last remaining row is cleared rather than removed.
    pub fn remove_education_row(&mut self, index: usize) {
        if index >= self.education.len() {
            return;
        }
        if self.education.len() == 1 {
            self.education[0] = EducationRow::default();
        } else {
            self.education.remove(index);
        }
    }

    pub fn set_education_field(&mut self, index: usize, field: EducationField, value: &str) {
        if let Some(row) = self.education.get_mut(index) {
            let target = match field {
                EducationField::University => &mut row.university,
                EducationField::Degree => &mut row.degree,
                EducationField::Year => &mut row.year,
            };
            *target = value.to_string();
        }
    }

    pub fn attach_education_file(&mut self, index: usize, file: FileRef) -> Option<FileRef> {
        self.education
            .get_mut(index)
            .and_then(|row| row.file.replace(file))
    }

    pub fn remove_education_file(&mut self, index: usize) -> Option<FileRef> {
        self.education.get_mut(index).and_then(|row| row.file.take())
    }

    /// Rows with at least one of university, degree or year filled.
    pub fn valid_education_entries(&self) -> Vec<EducationEntry> {
        self.education
            .iter()
            .filter(|row| row.has_any_detail())
            .map(EducationRow::to_entry)
            .collect()
    }

    // ---- nested views ----

    /// `{section: {field: value}}` for one check, root values at the top.
    pub fn section_values(&self, check: &str) -> Map<String, Value> {
        let mut nested = Map::new();
        for (path, value) in self.values.iter().filter(|(path, _)| path.check == check) {
            if path.section == ROOT_SECTION {
                nested.insert(path.field.clone(), Value::String(value.clone()));
                continue;
            }
            let section = nested
                .entry(path.section.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(fields) = section {
                fields.insert(path.field.clone(), Value::String(value.clone()));
            }
        }
        nested
    }

    /// Params sent with a check on case creation.
    pub fn check_params(&self, check: &str) -> Map<String, Value> {
        let mut params = Map::new();
        match self.sub_options.get(check) {
            Some(SubOptions::Single(value)) => {
                params.insert("subOption".to_string(), Value::String(value.clone()));
            }
            Some(SubOptions::Multiple(values)) if !values.is_empty() => {
                let map = values
                    .iter()
                    .map(|value| (value.clone(), Value::Bool(true)))
                    .collect::<Map<String, Value>>();
                params.insert("subOptions".to_string(), Value::Object(map));
            }
            _ => {}
        }
        if let Some(notes) = self.notes.get(check) {
            params.insert("notes".to_string(), Value::String(notes.clone()));
        }
        params.extend(self.section_values(check));

        let behavior = behavior_for(check);
        if let Some(root_field) = behavior.root_field {
            if !params.contains_key(root_field) {
                if let Some(selected) = self.root_selection(check) {
                    params.insert(root_field.to_string(), Value::String(selected));
                }
            }
        }
        if check == EDUCATION {
            let entries = self.valid_education_entries();
            if !entries.is_empty() {
                let list = serde_json::to_value(entries).unwrap_or(Value::Null);
                params.insert("list".to_string(), list);
            }
        }
        params
    }

    fn root_selection(&self, check: &str) -> Option<String> {
        self.value(check, SELF_SECTION, LAB_TEST_LEVEL)
            .or_else(|| self.value(check, SELF_SECTION, "selected"))
            .map(str::to_string)
            .or_else(|| match self.sub_options.get(check) {
                Some(SubOptions::Single(value)) => Some(value.clone()),
                _ => None,
            })
    }

    /// Accumulated values of every check that has any, keyed by slug.
    pub fn check_details(&self) -> Map<String, Value> {
        let checks: BTreeSet<&str> = self.values.keys().map(|path| path.check.as_str()).collect();
        checks
            .into_iter()
            .map(|check| (check.to_string(), Value::Object(self.section_values(check))))
            .filter(|(_, value)| value.as_object().map(|map| !map.is_empty()).unwrap_or(false))
            .collect()
    }
}
