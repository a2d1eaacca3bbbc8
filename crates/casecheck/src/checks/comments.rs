use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

use super::behavior::{CommentsMode, DEFAULT_SECTION};
use super::domain::CheckComments;

/// Working copy of a check's comments, always keyed by section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommentDraft {
    sections: BTreeMap<String, String>,
}

impl CommentDraft {
    /// A stored string becomes the `_default` section; objects map section by
    /// section.
    pub fn expand(comments: &CheckComments) -> Self {
        let mut sections = BTreeMap::new();
        match comments {
            CheckComments::Text(text) => {
                if !text.is_empty() {
                    sections.insert(DEFAULT_SECTION.to_string(), text.clone());
                }
            }
            CheckComments::Sections(map) => {
                for (section, value) in map {
                    let text = match value {
                        Value::String(text) => text.clone(),
                        Value::Null => continue,
                        other => other.to_string(),
                    };
                    sections.insert(section.clone(), text);
                }
            }
        }
        Self { sections }
    }

    pub fn get(&self, section: &str) -> &str {
        self.sections.get(section).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, section: &str, text: &str) {
        self.sections.insert(section.to_string(), text.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.sections.values().all(|text| text.is_empty())
    }

    /// Shape stored by the backend for the given check.
    pub fn flatten(&self, mode: CommentsMode) -> CheckComments {
        match mode {
            CommentsMode::PerSection => CheckComments::Sections(
                self.sections
                    .iter()
                    .map(|(section, text)| (section.clone(), Value::String(text.clone())))
                    .collect::<Map<String, Value>>(),
            ),
            CommentsMode::Single => {
                let text = [DEFAULT_SECTION, "value"]
                    .into_iter()
                    .map(|key| self.get(key))
                    .find(|text| !text.is_empty())
                    .unwrap_or("");
                CheckComments::Text(text.to_string())
            }
        }
    }
}
