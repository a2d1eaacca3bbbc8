use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Section key holding fields that belong to the check itself rather than a
/// named sub-section.
pub const SELF_SECTION: &str = "_self";

/// How a single field is captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
    Radio { options: Vec<String> },
    File,
}

impl FieldKind {
    pub const fn label(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Date => "date",
            FieldKind::Radio { .. } => "radio",
            FieldKind::File => "file",
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, FieldKind::File)
    }
}

/// One input within a schema section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawFieldSpec", into = "RawFieldSpec")]
pub struct FieldSpec {
    pub name: String,
    pub label: String,
    pub kind: FieldKind,
    pub placeholder: Option<String>,
}

impl FieldSpec {
    pub fn text(name: &str, label: &str) -> Self {
        Self::with_kind(name, label, FieldKind::Text)
    }

    pub fn date(name: &str, label: &str) -> Self {
        Self::with_kind(name, label, FieldKind::Date)
    }

    pub fn file(name: &str, label: &str) -> Self {
        Self::with_kind(name, label, FieldKind::File)
    }

    pub fn radio(name: &str, label: &str, options: &[&str]) -> Self {
        let options = options.iter().map(|option| option.to_string()).collect();
        Self::with_kind(name, label, FieldKind::Radio { options })
    }

    fn with_kind(name: &str, label: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            kind,
            placeholder: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFieldSpec {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    placeholder: Option<String>,
}

impl From<RawFieldSpec> for FieldSpec {
    fn from(raw: RawFieldSpec) -> Self {
        let declared = raw
            .kind
            .as_deref()
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();
        let kind = match declared.as_str() {
            "file" => FieldKind::File,
            "date" => FieldKind::Date,
            "radio" => FieldKind::Radio {
                options: raw.options,
            },
            _ if raw.name.starts_with("_file") => FieldKind::File,
            _ if raw.name == "dob" => FieldKind::Date,
            _ => FieldKind::Text,
        };
        let label = raw
            .label
            .filter(|label| !label.trim().is_empty())
            .unwrap_or_else(|| raw.name.clone());

        Self {
            name: raw.name,
            label,
            kind,
            placeholder: raw.placeholder,
        }
    }
}

impl From<FieldSpec> for RawFieldSpec {
    fn from(spec: FieldSpec) -> Self {
        let kind = spec.kind.label().to_string();
        let options = match spec.kind {
            FieldKind::Radio { options } => options,
            _ => Vec::new(),
        };
        Self {
            name: spec.name,
            label: Some(spec.label),
            kind: Some(kind),
            options,
            placeholder: spec.placeholder,
        }
    }
}

/// Declared section of a schema, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSection {
    pub key: String,
    pub fields: Vec<FieldSpec>,
}

/// Check-level schema flags carried under `_meta` (or `meta`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMeta {
    #[serde(default)]
    pub only_upload: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_label: Option<String>,
}

/// Field layout of one check type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct CheckSchema {
    pub sections: Vec<SchemaSection>,
    pub meta: SchemaMeta,
}

impl CheckSchema {
    pub fn section(&self, key: &str) -> Option<&SchemaSection> {
        self.sections.iter().find(|section| section.key == key)
    }

    pub fn self_fields(&self) -> &[FieldSpec] {
        self.section(SELF_SECTION)
            .map(|section| section.fields.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty() && !self.meta.only_upload
    }
}

impl TryFrom<Map<String, Value>> for CheckSchema {
    type Error = serde_json::Error;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        let mut schema = CheckSchema::default();
        for (key, value) in map {
            match key.as_str() {
                "_meta" | "meta" => {
                    if value.is_object() {
                        schema.meta = serde_json::from_value(value)?;
                    }
                }
                _ => {
                    // Non-list entries are annotations the form never renders.
                    if let Value::Array(items) = value {
                        let fields = items
                            .into_iter()
                            .filter(Value::is_object)
                            .map(serde_json::from_value::<FieldSpec>)
                            .collect::<Result<Vec<_>, _>>()?;
                        schema.sections.push(SchemaSection { key, fields });
                    }
                }
            }
        }
        Ok(schema)
    }
}

impl From<CheckSchema> for Map<String, Value> {
    fn from(schema: CheckSchema) -> Self {
        let mut map = Map::new();
        if schema.meta != SchemaMeta::default() {
            map.insert(
                "_meta".to_string(),
                serde_json::to_value(&schema.meta).unwrap_or(Value::Null),
            );
        }
        for section in schema.sections {
            let fields = section
                .fields
                .into_iter()
                .map(|field| serde_json::to_value(field).unwrap_or(Value::Null))
                .collect();
            map.insert(section.key, Value::Array(fields));
        }
        map
    }
}

/// Canonical description of a verification check type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckDefinition {
    pub slug: String,
    pub display_name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<CheckSchema>,
}

impl CheckDefinition {
    pub fn only_upload(&self) -> bool {
        self.schema
            .as_ref()
            .map(|schema| schema.meta.only_upload)
            .unwrap_or(false)
    }
}

/// Review outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CheckStatus {
    #[default]
    Pending,
    Clear,
    Discrepant,
    Amber,
    Insufficiency,
    OnHold,
}

impl CheckStatus {
    pub const ALL: [CheckStatus; 6] = [
        CheckStatus::Pending,
        CheckStatus::Clear,
        CheckStatus::Discrepant,
        CheckStatus::Amber,
        CheckStatus::Insufficiency,
        CheckStatus::OnHold,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            CheckStatus::Pending => "Pending",
            CheckStatus::Clear => "Clear",
            CheckStatus::Discrepant => "Discrepant",
            CheckStatus::Amber => "Amber",
            CheckStatus::Insufficiency => "Insufficiency",
            CheckStatus::OnHold => "On Hold",
        }
    }

    /// Lenient label parsing used for stored records and dashboard filters.
    pub fn parse(value: &str) -> Option<Self> {
        let lowered = value.trim().to_lowercase();
        if lowered.is_empty() {
            return None;
        }
        if lowered.contains("clear") || lowered.contains("green") {
            Some(CheckStatus::Clear)
        } else if lowered.contains("discrep") || lowered == "red" {
            Some(CheckStatus::Discrepant)
        } else if lowered.contains("amber") {
            Some(CheckStatus::Amber)
        } else if lowered.contains("insuff") {
            Some(CheckStatus::Insufficiency)
        } else if lowered.contains("hold") {
            Some(CheckStatus::OnHold)
        } else if lowered.contains("pending") {
            Some(CheckStatus::Pending)
        } else {
            None
        }
    }
}

impl Serialize for CheckStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for CheckStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw
            .as_deref()
            .and_then(CheckStatus::parse)
            .unwrap_or_default())
    }
}

/// Stored comments of a check: a single note or one note per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckComments {
    Text(String),
    Sections(Map<String, Value>),
}

impl Default for CheckComments {
    fn default() -> Self {
        CheckComments::Text(String::new())
    }
}

/// One check attached to a case, as stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckInstance {
    #[serde(default)]
    pub check_type: String,
    #[serde(default)]
    pub status: CheckStatus,
    #[serde(default, deserialize_with = "lenient_object")]
    pub params: Map<String, Value>,
    #[serde(default, deserialize_with = "verified_data_object")]
    pub verified_data: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_comments")]
    pub comments: CheckComments,
    #[serde(
        default,
        alias = "_displayName",
        skip_serializing_if = "Option::is_none"
    )]
    pub display_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CheckInstance {
    pub fn pending(check_type: &str, params: Map<String, Value>) -> Self {
        Self {
            check_type: check_type.to_string(),
            status: CheckStatus::Pending,
            params,
            verified_data: Map::new(),
            comments: CheckComments::default(),
            display_name: None,
            extra: Map::new(),
        }
    }
}

/// Metadata of an uploaded file, owned by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    #[serde(
        rename = "_id",
        alias = "id",
        default,
        deserialize_with = "optional_identifier",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DocumentRecord {
    pub fn display_filename(&self) -> &str {
        self.original_filename
            .as_deref()
            .or(self.filename.as_deref())
            .unwrap_or("")
    }
}

/// Reference from an upload to its document: an id or the embedded record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DocumentLink {
    Id(String),
    Embedded(Box<DocumentRecord>),
}

/// Links a document to a check or section through a `fieldKey` string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    #[serde(default)]
    pub field_key: String,
    #[serde(
        default,
        deserialize_with = "optional_document_link",
        skip_serializing_if = "Option::is_none"
    )]
    pub document_id: Option<DocumentLink>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One repeatable education row stored on a case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    #[serde(default, deserialize_with = "lenient_string")]
    pub university: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: String,
    #[serde(default, deserialize_with = "identifier_list")]
    pub documents: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provided_by: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub provided_at: Option<DateTime<Utc>>,
}

impl EducationEntry {
    pub fn has_any_detail(&self) -> bool {
        [&self.university, &self.degree, &self.year]
            .iter()
            .any(|value| !value.trim().is_empty())
    }
}

/// Candidate details sent with every case.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateInfo {
    #[serde(default)]
    pub candidate_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub father_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub contact_number: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub designation: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A file selected locally and not yet sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
    pub name: String,
    pub size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(skip)]
    pub bytes: Vec<u8>,
}

impl FileRef {
    pub fn new(name: &str, bytes: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            size: bytes.len() as u64,
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: &str) -> Self {
        self.content_type = Some(content_type.to_string());
        self
    }

    /// Identity used to drop duplicate selections of the same file.
    pub fn dedupe_key(&self) -> String {
        format!("{}::{}", self.name, self.size)
    }
}

fn lenient_object<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Object(map) => Ok(map),
        _ => Ok(Map::new()),
    }
}

fn verified_data_object<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(verified_data_from_value(Value::deserialize(deserializer)?))
}

/// Verified data arrives as an object, a JSON-encoded string, or a plain note.
pub fn verified_data_from_value(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::String(raw) if raw.trim().is_empty() => Map::new(),
        Value::String(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                let mut map = Map::new();
                map.insert("value".to_string(), Value::String(raw));
                map
            }
        },
        _ => Map::new(),
    }
}

fn lenient_comments<'de, D>(deserializer: D) -> Result<CheckComments, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => CheckComments::Text(text),
        Value::Object(map) => CheckComments::Sections(map),
        Value::Null => CheckComments::default(),
        other => CheckComments::Text(other.to_string()),
    })
}

pub(crate) fn identifier_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(identifier_from_value),
        _ => None,
    }
}

fn optional_identifier<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(identifier_from_value(&Value::deserialize(deserializer)?))
}

fn identifier_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().filter_map(identifier_from_value).collect(),
        _ => Vec::new(),
    })
}

fn optional_document_link<'de, D>(deserializer: D) -> Result<Option<DocumentLink>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Object(map) => serde_json::from_value::<DocumentRecord>(Value::Object(map))
            .ok()
            .map(|record| DocumentLink::Embedded(Box::new(record))),
        Value::String(id) if !id.is_empty() => Some(DocumentLink::Id(id)),
        Value::Number(number) => Some(DocumentLink::Id(number.to_string())),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        _ => String::new(),
    })
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => DateTime::parse_from_rfc3339(value.trim())
            .ok()
            .map(|parsed| parsed.with_timezone(&Utc)),
        _ => None,
    })
}
