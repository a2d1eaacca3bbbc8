use serde::Serialize;
use serde_json::{Map, Value};

use super::behavior::{behavior_for, CheckKind, CommentsMode, LAB_TEST_LEVEL};
use super::catalog::DRUG_PANEL_LEVELS;
use super::domain::{CheckDefinition, CheckSchema, FieldKind, FieldSpec, SELF_SECTION};
use super::keys::humanize_key;

const EDUCATION_FIELDS: [(&str, &str); 3] = [
    ("university", "University"),
    ("degree", "Degree"),
    ("year", "Year of Passing"),
];

/// One rendered section: its storage key, heading and inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedSection {
    pub key: String,
    pub label: String,
    pub fields: Vec<PlannedField>,
}

impl PlannedSection {
    pub fn file_field(&self) -> Option<&PlannedField> {
        self.fields.iter().find(|field| field.kind == "file")
    }

    pub fn text_fields(&self) -> impl Iterator<Item = &PlannedField> {
        self.fields.iter().filter(|field| field.kind != "file")
    }
}

/// Serializable view of a [`FieldSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedField {
    pub name: String,
    pub label: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
}

impl From<&FieldSpec> for PlannedField {
    fn from(spec: &FieldSpec) -> Self {
        let options = match &spec.kind {
            FieldKind::Radio { options } => options.clone(),
            _ => Vec::new(),
        };
        Self {
            name: spec.name.clone(),
            label: spec.label.clone(),
            kind: spec.kind.label(),
            options,
            placeholder: spec.placeholder.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FormLayout {
    /// Named sections in declaration order, `_self` last.
    Sections { sections: Vec<PlannedSection> },
    /// One optional note and one optional file.
    OnlyUpload { section: PlannedSection },
    /// Education style list of entries, each with its own file.
    Repeatable {
        fields: Vec<PlannedField>,
        file: PlannedField,
        min_entries: usize,
    },
}

/// Everything a form needs to render one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormPlan {
    pub slug: String,
    pub display_name: String,
    pub kind: CheckKind,
    pub comments: CommentsMode,
    pub layout: FormLayout,
    /// Inputs whose values live at the params root.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub root_fields: Vec<PlannedField>,
}

impl FormPlan {
    pub fn sections(&self) -> Vec<&PlannedSection> {
        match &self.layout {
            FormLayout::Sections { sections } => sections.iter().collect(),
            FormLayout::OnlyUpload { section } => vec![section],
            FormLayout::Repeatable { .. } => Vec::new(),
        }
    }

    pub fn file_slot_count(&self) -> usize {
        self.sections()
            .iter()
            .filter(|section| section.file_field().is_some())
            .count()
    }
}

/// Lays out a check form. Never fails: checks without a schema get a single
/// `_self` section inferred from whatever values were already submitted.
pub fn interpret(
    slug: &str,
    definition: Option<&CheckDefinition>,
    existing: &Map<String, Value>,
) -> FormPlan {
    let behavior = behavior_for(slug);
    let display_name = definition
        .map(|definition| definition.display_name.clone())
        .unwrap_or_else(|| humanize_key(slug));
    let schema = definition.and_then(|definition| definition.schema.as_ref());

    let mut root_fields = Vec::new();
    let layout = match (behavior.kind, schema) {
        (CheckKind::Education, schema) => education_layout(schema),
        (_, Some(schema)) if schema.meta.only_upload => only_upload_layout(schema),
        (kind, Some(schema)) => {
            let mut sections = sectioned(schema, |label| behavior.section_key(label));
            match kind {
                CheckKind::NationalId => keep_single_file(&mut sections),
                CheckKind::DrugPanel => root_fields.push(lift_root_radio(&mut sections)),
                _ => {}
            }
            FormLayout::Sections { sections }
        }
        (kind, None) => {
            let mut sections = vec![inferred_section(existing)];
            match kind {
                CheckKind::NationalId => keep_single_file(&mut sections),
                CheckKind::DrugPanel => root_fields.push(lift_root_radio(&mut sections)),
                _ => {}
            }
            FormLayout::Sections { sections }
        }
    };

    FormPlan {
        slug: slug.to_string(),
        display_name,
        kind: behavior.kind,
        comments: behavior.comments,
        layout,
        root_fields,
    }
}

fn sectioned(schema: &CheckSchema, key_for: impl Fn(&str) -> String) -> Vec<PlannedSection> {
    let named = schema
        .sections
        .iter()
        .filter(|section| section.key != SELF_SECTION);
    let own = schema
        .sections
        .iter()
        .filter(|section| section.key == SELF_SECTION);

    named
        .chain(own)
        .map(|section| PlannedSection {
            key: key_for(&section.key),
            label: section_label(&section.key),
            fields: section.fields.iter().map(PlannedField::from).collect(),
        })
        .collect()
}

fn section_label(key: &str) -> String {
    if key == SELF_SECTION {
        "Details".to_string()
    } else {
        key.to_string()
    }
}

fn only_upload_layout(schema: &CheckSchema) -> FormLayout {
    let fields = schema.self_fields();
    let note = fields
        .iter()
        .find(|field| field.kind == FieldKind::Text)
        .map(PlannedField::from);
    let file = fields
        .iter()
        .find(|field| field.kind.is_file())
        .map(|field| {
            let mut planned = PlannedField::from(field);
            if let Some(label) = &schema.meta.upload_label {
                planned.label = label.clone();
            }
            planned
        });

    FormLayout::OnlyUpload {
        section: PlannedSection {
            key: SELF_SECTION.to_string(),
            label: section_label(SELF_SECTION),
            fields: note.into_iter().chain(file).collect(),
        },
    }
}

fn education_layout(schema: Option<&CheckSchema>) -> FormLayout {
    let declared = schema.map(CheckSchema::self_fields).unwrap_or(&[]);
    let fields = EDUCATION_FIELDS
        .iter()
        .map(|(name, label)| {
            declared
                .iter()
                .find(|field| field.name == *name)
                .map(PlannedField::from)
                .unwrap_or_else(|| PlannedField::from(&FieldSpec::text(name, label)))
        })
        .collect();
    let file = declared
        .iter()
        .find(|field| field.kind.is_file())
        .map(PlannedField::from)
        .unwrap_or_else(|| {
            PlannedField::from(&FieldSpec::file("_file", "Upload Certificate / Transcript"))
        });

    FormLayout::Repeatable {
        fields,
        file,
        min_entries: 1,
    }
}

/// ID numbers share one upload slot.
fn keep_single_file(sections: &mut [PlannedSection]) {
    let mut seen_file = false;
    for section in sections.iter_mut() {
        section.fields.retain(|field| {
            if field.kind != "file" {
                return true;
            }
            let keep = !seen_file;
            seen_file = true;
            keep
        });
    }
    if !seen_file {
        if let Some(section) = sections
            .iter_mut()
            .find(|section| section.key == SELF_SECTION)
        {
            section.fields.push(PlannedField::from(&FieldSpec::file(
                "_file",
                "Upload ID Document (Aadhaar/PAN/Any)",
            )));
        }
    }
}

/// Removes any section radio and returns the root-level panel selector.
fn lift_root_radio(sections: &mut [PlannedSection]) -> PlannedField {
    let mut lifted: Option<PlannedField> = None;
    for section in sections.iter_mut() {
        section.fields.retain(|field| {
            if field.kind == "radio" && lifted.is_none() {
                lifted = Some(field.clone());
                return false;
            }
            field.name != LAB_TEST_LEVEL
        });
    }

    let mut field = lifted.unwrap_or_else(|| {
        PlannedField::from(&FieldSpec::radio(
            LAB_TEST_LEVEL,
            "Panel (5/6/7/8/9/10/11/12)",
            &DRUG_PANEL_LEVELS,
        ))
    });
    field.name = LAB_TEST_LEVEL.to_string();
    if field.options.is_empty() {
        field.options = DRUG_PANEL_LEVELS.iter().map(|level| level.to_string()).collect();
    }
    field
}

fn inferred_section(existing: &Map<String, Value>) -> PlannedSection {
    let own = existing.get(SELF_SECTION).and_then(Value::as_object);
    let sources = own.into_iter().chain(std::iter::once(existing));

    let mut fields: Vec<PlannedField> = Vec::new();
    for source in sources {
        for (key, value) in source {
            let scalar = matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_));
            if !scalar || key.starts_with('_') || fields.iter().any(|field| field.name == *key) {
                continue;
            }
            fields.push(PlannedField::from(&FieldSpec::text(key, &humanize_key(key))));
        }
    }

    PlannedSection {
        key: SELF_SECTION.to_string(),
        label: section_label(SELF_SECTION),
        fields,
    }
}
