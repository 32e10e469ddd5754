//! Declarative field validation for stored collections.
//!
//! A [`Schema`] lists the fields a collection keeps, in order. Each
//! [`FieldSpec`] says how incoming JSON is cast to the stored type and which
//! checks it must pass:
//!
//! ```ignore
//! Schema::new("Department")
//!     .field(
//!         FieldSpec::string("code")
//!             .required("Code required")
//!             .unique("Code taken")
//!             .pattern(r"^[A-Z0-9]{1,20}$", "Code can be maximum 20 characters ...")?,
//!     )
//!     .timestamps()
//! ```
//!
//! Checks for one field run as cast, required, enum, pattern, reference; the
//! first failure is the only one reported for that field. Failures across
//! fields are collected in declaration order.

use chrono::{DateTime, NaiveDate, SecondsFormat, TimeZone, Utc};
use regex::Regex;
use serde_json::Value;

use crate::model::Fields;
use crate::object_id::ObjectId;
use crate::store::FieldError;

/// Stored type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Boolean,
    Date,
    ObjectId,
}

impl FieldKind {
    /// Type name as it appears in cast failure messages.
    pub fn cast_name(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Boolean => "Boolean",
            FieldKind::Date => "date",
            FieldKind::ObjectId => "ObjectId",
        }
    }
}

/// A regex the stored value must match, with its failure message.
#[derive(Debug, Clone)]
pub struct Pattern {
    pub regex: Regex,
    pub message: String,
}

/// Allowed values for a field, with the failure message.
#[derive(Debug, Clone)]
pub struct Enumeration {
    pub values: Vec<String>,
    pub message: String,
}

/// The value must be the identity of a document in another collection.
#[derive(Debug, Clone)]
pub struct Reference {
    pub collection: String,
    pub message: String,
}

/// How one field is cast and checked.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
    /// Message when the field is missing, null or an empty string
    pub required: Option<String>,
    /// Message when another document already holds the same value
    pub unique: Option<String>,
    pub pattern: Option<Pattern>,
    pub enumeration: Option<Enumeration>,
    pub reference: Option<Reference>,
    /// Applied on insert when the field is absent
    pub default: Option<Value>,
}

impl FieldSpec {
    fn new(name: &str, kind: FieldKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            required: None,
            unique: None,
            pattern: None,
            enumeration: None,
            reference: None,
            default: None,
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, FieldKind::String)
    }

    pub fn boolean(name: &str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn date(name: &str) -> Self {
        Self::new(name, FieldKind::Date)
    }

    pub fn object_id(name: &str) -> Self {
        Self::new(name, FieldKind::ObjectId)
    }

    pub fn required(mut self, message: &str) -> Self {
        self.required = Some(message.to_string());
        self
    }

    pub fn unique(mut self, message: &str) -> Self {
        self.unique = Some(message.to_string());
        self
    }

    /// Compiles `pattern`; fails only on an invalid regex.
    pub fn pattern(mut self, pattern: &str, message: &str) -> Result<Self, regex::Error> {
        self.pattern = Some(Pattern {
            regex: Regex::new(pattern)?,
            message: message.to_string(),
        });
        Ok(self)
    }

    pub fn one_of(mut self, values: &[&str], message: &str) -> Self {
        self.enumeration = Some(Enumeration {
            values: values.iter().map(|v| v.to_string()).collect(),
            message: message.to_string(),
        });
        self
    }

    pub fn references(mut self, collection: &str, message: &str) -> Self {
        self.reference = Some(Reference {
            collection: collection.to_string(),
            message: message.to_string(),
        });
        self
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Converts an incoming JSON value to the stored representation.
    ///
    /// `null` passes through untouched; whether it is acceptable is the
    /// required check's decision.
    pub fn cast(&self, value: &Value) -> Result<Value, FieldError> {
        if value.is_null() {
            return Ok(Value::Null);
        }

        let cast = match self.kind {
            FieldKind::String => cast_string(value),
            FieldKind::Boolean => cast_boolean(value),
            FieldKind::Date => cast_date(value),
            FieldKind::ObjectId => cast_object_id(value),
        };

        cast.ok_or_else(|| FieldError::new(&self.name, self.cast_failure(value)))
    }

    fn cast_failure(&self, value: &Value) -> String {
        let shown = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        format!(
            "Cast to {} failed for value \"{}\" (type {}) at path \"{}\"",
            self.kind.cast_name(),
            shown,
            json_type_name(value),
            self.name
        )
    }

    /// Checks a value that has already been cast, apart from reference
    /// existence.
    pub fn check(&self, value: &Value) -> Result<(), FieldError> {
        if is_blank(value) {
            return match &self.required {
                Some(message) => Err(FieldError::new(&self.name, message)),
                None => Ok(()),
            };
        }

        let Value::String(s) = value else {
            return Ok(());
        };

        if let Some(enumeration) = &self.enumeration {
            if !enumeration.values.iter().any(|v| v == s) {
                return Err(FieldError::new(&self.name, &enumeration.message));
            }
        }

        if let Some(pattern) = &self.pattern {
            if !pattern.regex.is_match(s) {
                return Err(FieldError::new(&self.name, &pattern.message));
            }
        }

        Ok(())
    }
}

/// Missing, null, and empty strings all count as absent for `required`.
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}

fn cast_string(value: &Value) -> Option<Value> {
    match value {
        Value::String(_) => Some(value.clone()),
        Value::Number(n) => Some(Value::String(n.to_string())),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        _ => None,
    }
}

fn cast_boolean(value: &Value) -> Option<Value> {
    let b = match value {
        Value::Bool(b) => *b,
        Value::Number(n) => match n.as_i64() {
            Some(1) => true,
            Some(0) => false,
            _ => return None,
        },
        Value::String(s) => match s.as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(Value::Bool(b))
}

fn cast_date(value: &Value) -> Option<Value> {
    let parsed = match value {
        Value::String(s) if s.is_empty() => return Some(Value::Null),
        Value::String(s) => parse_date(s)?,
        Value::Number(n) => Utc.timestamp_millis_opt(n.as_i64()?).single()?,
        _ => return None,
    };
    Some(Value::String(format_timestamp(parsed)))
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}

fn cast_object_id(value: &Value) -> Option<Value> {
    let Value::String(s) = value else {
        return None;
    };
    if s.is_empty() {
        return Some(Value::Null);
    }
    let id: ObjectId = s.parse().ok()?;
    Some(Value::String(id.to_string()))
}

/// Timestamps are stored as RFC 3339 UTC with millisecond precision.
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// The fields a collection keeps and how to validate them.
#[derive(Debug, Clone)]
pub struct Schema {
    pub model: String,
    pub fields: Vec<FieldSpec>,
    /// Maintain `createdAt` / `updatedAt`
    pub timestamps: bool,
}

impl Schema {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            fields: Vec::new(),
            timestamps: false,
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn timestamps(mut self) -> Self {
        self.timestamps = true;
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Keeps only declared fields from an incoming body, preserving
    /// declaration order.
    pub fn retain_known(&self, body: &Fields) -> Fields {
        self.fields
            .iter()
            .filter_map(|spec| {
                body.get(&spec.name)
                    .map(|value| (spec.name.clone(), value.clone()))
            })
            .collect()
    }

    /// Casts and checks the given fields.
    ///
    /// With `all_fields` every declared field is checked (inserts); otherwise
    /// only the fields present in `input` are (updates). `exists` answers
    /// whether a referenced identity is present in its collection. Returns
    /// the cast values on success, or every field failure in declaration
    /// order.
    pub fn validate<F>(
        &self,
        input: &Fields,
        all_fields: bool,
        exists: F,
    ) -> Result<Fields, Vec<FieldError>>
    where
        F: Fn(&Reference, &str) -> bool,
    {
        let missing = Value::Null;
        let mut cast = Fields::new();
        let mut errors = Vec::new();

        for spec in &self.fields {
            let value = match input.get(&spec.name) {
                Some(value) => value,
                None if all_fields => &missing,
                None => continue,
            };

            let result = spec
                .cast(value)
                .and_then(|v| spec.check(&v).map(|_| v))
                .and_then(|v| match (&spec.reference, &v) {
                    (Some(reference), Value::String(id)) if !exists(reference, id.as_str()) => {
                        Err(FieldError::new(&spec.name, &reference.message))
                    }
                    _ => Ok(v),
                });

            match result {
                Ok(v) => {
                    if input.contains_key(&spec.name) {
                        cast.insert(spec.name.clone(), v);
                    }
                }
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            Ok(cast)
        } else {
            Err(errors)
        }
    }

    /// Fills in declared defaults for fields absent from `fields`.
    pub fn apply_defaults(&self, fields: &mut Fields) {
        for spec in &self.fields {
            match &spec.default {
                Some(default) if !fields.contains_key(&spec.name) => {
                    fields.insert(spec.name.clone(), default.clone());
                }
                _ => {}
            }
        }
    }

    /// Re-orders `fields` to declaration order, timestamps and version last.
    pub fn ordered(&self, mut fields: Fields) -> Fields {
        let mut ordered = Fields::new();
        for spec in &self.fields {
            if let Some(value) = fields.shift_remove(&spec.name) {
                ordered.insert(spec.name.clone(), value);
            }
        }
        ordered.extend(fields);
        ordered
    }
}
