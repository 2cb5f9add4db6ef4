//! Declared result shapes, one per generation task.
//!
//! Each contract is a static list of fields checked one by one against the
//! parsed model output. Unknown extra fields are ignored.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::CoercionError;

/// Upper bound on a meta description, in characters.
///
/// Looser than the 160 the prompt asks for: slightly long answers are kept
/// rather than sent back for repair.
pub const META_DESCRIPTION_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Faq,
    MetaDescription,
    ContentRefresh,
    SchemaInjection,
    AnomalyAnalysis,
}

impl TaskKind {
    pub fn contract(self) -> &'static StructuredOutputContract {
        match self {
            Self::Faq => &FAQ_CONTRACT,
            Self::MetaDescription => &META_DESCRIPTION_CONTRACT,
            Self::ContentRefresh => &CONTENT_REFRESH_CONTRACT,
            Self::SchemaInjection => &SCHEMA_INJECTION_CONTRACT,
            Self::AnomalyAnalysis => &ANOMALY_ANALYSIS_CONTRACT,
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Faq => write!(f, "faq"),
            Self::MetaDescription => write!(f, "meta_description"),
            Self::ContentRefresh => write!(f, "content_refresh"),
            Self::SchemaInjection => write!(f, "schema_injection"),
            Self::AnomalyAnalysis => write!(f, "anomaly_analysis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    StringList,
    /// Any JSON object; contents are not inspected.
    Object,
    ObjectList(&'static [FieldSpec]),
}

impl FieldKind {
    fn expected(self) -> &'static str {
        match self {
            Self::String => "a string",
            Self::StringList => "a list of strings",
            Self::Object => "an object",
            Self::ObjectList(_) => "a list of objects",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub max_chars: Option<usize>,
    pub min_items: Option<usize>,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            max_chars: None,
            min_items: None,
        }
    }

    pub const fn string(name: &'static str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub const fn string_list(name: &'static str) -> Self {
        Self::new(name, FieldKind::StringList)
    }

    pub const fn object(name: &'static str) -> Self {
        Self::new(name, FieldKind::Object)
    }

    pub const fn object_list(name: &'static str, fields: &'static [FieldSpec]) -> Self {
        Self::new(name, FieldKind::ObjectList(fields))
    }

    pub const fn max_chars(mut self, max: usize) -> Self {
        self.max_chars = Some(max);
        self
    }

    pub const fn min_items(mut self, min: usize) -> Self {
        self.min_items = Some(min);
        self
    }
}

/// The expected shape of one task's output.
#[derive(Debug, PartialEq, Eq)]
pub struct StructuredOutputContract {
    pub task: TaskKind,
    pub fields: &'static [FieldSpec],
}

impl StructuredOutputContract {
    /// Check every declared field of `value`.
    pub fn check(&self, value: &Value) -> Result<(), CoercionError> {
        let map = value.as_object().ok_or_else(|| CoercionError::NotAnObject {
            path: "$".to_string(),
        })?;
        check_fields(self.fields, map, "")
    }
}

fn check_fields(fields: &[FieldSpec], map: &Map<String, Value>, prefix: &str) -> Result<(), CoercionError> {
    for spec in fields {
        let path = format!("{prefix}{}", spec.name);
        let value = map
            .get(spec.name)
            .filter(|v| !v.is_null())
            .ok_or_else(|| CoercionError::MissingField { path: path.clone() })?;
        check_field(spec, value, &path)?;
    }
    Ok(())
}

fn check_field(spec: &FieldSpec, value: &Value, path: &str) -> Result<(), CoercionError> {
    let wrong_type = || CoercionError::WrongType {
        path: path.to_string(),
        expected: spec.kind.expected(),
    };

    match spec.kind {
        FieldKind::String => {
            let text = value.as_str().ok_or_else(wrong_type)?;
            if let Some(max) = spec.max_chars {
                let actual = text.chars().count();
                if actual > max {
                    return Err(CoercionError::TooLong {
                        path: path.to_string(),
                        max,
                        actual,
                    });
                }
            }
        }
        FieldKind::StringList => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            check_count(spec, items.len(), path)?;
            if !items.iter().all(Value::is_string) {
                return Err(wrong_type());
            }
        }
        FieldKind::Object => {
            value.as_object().ok_or_else(wrong_type)?;
        }
        FieldKind::ObjectList(item_fields) => {
            let items = value.as_array().ok_or_else(wrong_type)?;
            check_count(spec, items.len(), path)?;
            for (i, item) in items.iter().enumerate() {
                let item_path = format!("{path}[{i}]");
                let map = item.as_object().ok_or_else(|| CoercionError::NotAnObject {
                    path: item_path.clone(),
                })?;
                check_fields(item_fields, map, &format!("{item_path}."))?;
            }
        }
    }
    Ok(())
}

fn check_count(spec: &FieldSpec, actual: usize, path: &str) -> Result<(), CoercionError> {
    match spec.min_items {
        Some(min) if actual < min => Err(CoercionError::TooFewItems {
            path: path.to_string(),
            min,
            actual,
        }),
        _ => Ok(()),
    }
}

// =============================================================================
// Task contracts
// =============================================================================

const FAQ_ENTRY_FIELDS: &[FieldSpec] = &[FieldSpec::string("question"), FieldSpec::string("answer")];

pub static FAQ_CONTRACT: StructuredOutputContract = StructuredOutputContract {
    task: TaskKind::Faq,
    fields: &[FieldSpec::object_list("faqs", FAQ_ENTRY_FIELDS).min_items(1)],
};

pub static META_DESCRIPTION_CONTRACT: StructuredOutputContract = StructuredOutputContract {
    task: TaskKind::MetaDescription,
    fields: &[
        FieldSpec::string("meta_description").max_chars(META_DESCRIPTION_MAX_CHARS),
        FieldSpec::string("notes"),
    ],
};

pub static CONTENT_REFRESH_CONTRACT: StructuredOutputContract = StructuredOutputContract {
    task: TaskKind::ContentRefresh,
    fields: &[
        FieldSpec::string_list("sections_to_improve"),
        FieldSpec::string_list("suggested_updates"),
    ],
};

pub static SCHEMA_INJECTION_CONTRACT: StructuredOutputContract = StructuredOutputContract {
    task: TaskKind::SchemaInjection,
    fields: &[FieldSpec::object("schema_json")],
};

pub static ANOMALY_ANALYSIS_CONTRACT: StructuredOutputContract = StructuredOutputContract {
    task: TaskKind::AnomalyAnalysis,
    fields: &[
        FieldSpec::string_list("likely_causes"),
        FieldSpec::string_list("recommended_actions"),
    ],
};
