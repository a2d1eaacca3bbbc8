use serde::Serialize;
use serde_json::Value;

use crate::checks::FileRef;

/// One multipart part, in the order it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text { name: String, value: String },
    File { name: String, file: FileRef },
}

impl FormPart {
    pub fn name(&self) -> &str {
        match self {
            FormPart::Text { name, .. } | FormPart::File { name, .. } => name,
        }
    }
}

/// Ordered multipart body handed to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, name: &str, value: impl Into<String>) {
        self.parts.push(FormPart::Text {
            name: name.to_string(),
            value: value.into(),
        });
    }

    pub fn json<T: Serialize + ?Sized>(&mut self, name: &str, value: &T) -> Result<(), serde_json::Error> {
        let encoded = serde_json::to_string(value)?;
        self.text(name, encoded);
        Ok(())
    }

    pub fn file(&mut self, name: &str, file: FileRef) {
        self.parts.push(FormPart::File {
            name: name.to_string(),
            file,
        });
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }

    pub fn text_value(&self, name: &str) -> Option<&str> {
        self.parts.iter().find_map(|part| match part {
            FormPart::Text { name: part_name, value } if part_name == name => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn json_value(&self, name: &str) -> Option<Value> {
        self.text_value(name)
            .and_then(|raw| serde_json::from_str(raw).ok())
    }

    pub fn files(&self, name: &str) -> Vec<&FileRef> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                FormPart::File { name: part_name, file } if part_name == name => Some(file),
                _ => None,
            })
            .collect()
    }

    pub fn file_parts(&self) -> impl Iterator<Item = (&str, &FileRef)> {
        self.parts.iter().filter_map(|part| match part {
            FormPart::File { name, file } => Some((name.as_str(), file)),
            FormPart::Text { .. } => None,
        })
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.parts.iter().map(FormPart::name).collect()
    }
}
