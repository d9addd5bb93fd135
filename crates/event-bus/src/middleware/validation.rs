//! # Validation Middleware
//!
//! [`SchemaValidator`] keeps one schema per event name. Events without a
//! schema pass (with a warning). [`JsonSchema`] checks the commonly used
//! JSON Schema keywords:
//!
//! | Applies to | Keywords |
//! |------------|----------|
//! | any | `type`, `enum`, `const` |
//! | object | `properties`, `required`, `additionalProperties` |
//! | array | `items`, `minItems`, `maxItems` |
//! | number | `minimum`, `maximum`, `exclusiveMinimum`, `exclusiveMaximum` |
//! | string | `minLength`, `maxLength`, `pattern` |
//!
//! Any other keyword fails compilation with
//! [`SchemaError::UnsupportedKeyword`]. Annotations (`title`, `description`
//! and the like) are accepted and ignored. Anything richer plugs in through
//! [`PayloadSchema`].

use parking_lot::RwLock;
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use tracing::{error, warn};

use crate::error::SchemaError;
use crate::ports::{PayloadSchema, PayloadValidator};

const ANNOTATIONS: &[&str] = &[
    "$schema",
    "$id",
    "$comment",
    "title",
    "description",
    "default",
    "examples",
];

/// JSON value kinds understood by [`JsonSchema`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonKind {
    Object,
    Array,
    String,
    Number,
    Integer,
    Boolean,
    Null,
}

impl JsonKind {
    fn parse(name: &str) -> Result<Self, SchemaError> {
        match name {
            "object" => Ok(Self::Object),
            "array" => Ok(Self::Array),
            "string" => Ok(Self::String),
            "number" => Ok(Self::Number),
            "integer" => Ok(Self::Integer),
            "boolean" => Ok(Self::Boolean),
            "null" => Ok(Self::Null),
            other => Err(SchemaError::UnsupportedType(other.to_string())),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Null => value.is_null(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Null => "null",
        }
    }
}

/// Treatment of object keys not listed under `properties`.
#[derive(Debug, Clone, Default)]
enum Additional {
    #[default]
    Allowed,
    Forbidden,
    Schema(Box<JsonSchema>),
}

/// Compiled schema. Absent keywords impose no constraint.
#[derive(Debug, Clone, Default)]
pub struct JsonSchema {
    types: Vec<JsonKind>,
    allowed: Option<Vec<Value>>,
    properties: Vec<(String, JsonSchema)>,
    required: Vec<String>,
    additional: Additional,
    items: Option<Box<JsonSchema>>,
    min_items: Option<usize>,
    max_items: Option<usize>,
    minimum: Option<f64>,
    maximum: Option<f64>,
    exclusive_minimum: Option<f64>,
    exclusive_maximum: Option<f64>,
    min_length: Option<usize>,
    max_length: Option<usize>,
    pattern: Option<Regex>,
}

fn invalid(keyword: &str, reason: impl Into<String>) -> SchemaError {
    SchemaError::InvalidKeyword {
        keyword: keyword.to_string(),
        reason: reason.into(),
    }
}

fn count(keyword: &str, value: &Value) -> Result<usize, SchemaError> {
    value
        .as_u64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| invalid(keyword, "expected a non-negative integer"))
}

fn number(keyword: &str, value: &Value) -> Result<f64, SchemaError> {
    value
        .as_f64()
        .ok_or_else(|| invalid(keyword, "expected a number"))
}

fn object<'a>(keyword: &str, value: &'a Value) -> Result<&'a Map<String, Value>, SchemaError> {
    value
        .as_object()
        .ok_or_else(|| invalid(keyword, "expected an object"))
}

impl JsonSchema {
    /// Compile a schema from its JSON form.
    pub fn from_value(schema: &Value) -> Result<Self, SchemaError> {
        let obj = schema.as_object().ok_or(SchemaError::NotAnObject)?;
        let mut compiled = Self::default();

        for (keyword, value) in obj {
            match keyword.as_str() {
                "type" => compiled.types = Self::parse_types(value)?,
                "enum" => {
                    let values = value
                        .as_array()
                        .ok_or_else(|| invalid(keyword, "expected an array"))?;
                    compiled.allowed = Some(values.clone());
                }
                "const" => compiled.allowed = Some(vec![value.clone()]),
                "properties" => {
                    compiled.properties = object(keyword, value)?
                        .iter()
                        .map(|(name, sub)| Ok::<_, SchemaError>((name.clone(), Self::from_value(sub)?)))
                        .collect::<Result<_, SchemaError>>()?;
                }
                "required" => {
                    compiled.required = value
                        .as_array()
                        .and_then(|keys| {
                            keys.iter()
                                .map(|key| key.as_str().map(str::to_string))
                                .collect::<Option<Vec<_>>>()
                        })
                        .ok_or_else(|| invalid(keyword, "expected an array of strings"))?;
                }
                "additionalProperties" => {
                    compiled.additional = match value {
                        Value::Bool(true) => Additional::Allowed,
                        Value::Bool(false) => Additional::Forbidden,
                        Value::Object(_) => Additional::Schema(Box::new(Self::from_value(value)?)),
                        _ => return Err(invalid(keyword, "expected a boolean or a schema")),
                    };
                }
                "items" => {
                    object(keyword, value)?;
                    compiled.items = Some(Box::new(Self::from_value(value)?));
                }
                "minItems" => compiled.min_items = Some(count(keyword, value)?),
                "maxItems" => compiled.max_items = Some(count(keyword, value)?),
                "minLength" => compiled.min_length = Some(count(keyword, value)?),
                "maxLength" => compiled.max_length = Some(count(keyword, value)?),
                "minimum" => compiled.minimum = Some(number(keyword, value)?),
                "maximum" => compiled.maximum = Some(number(keyword, value)?),
                "exclusiveMinimum" => compiled.exclusive_minimum = Some(number(keyword, value)?),
                "exclusiveMaximum" => compiled.exclusive_maximum = Some(number(keyword, value)?),
                "pattern" => {
                    let source = value
                        .as_str()
                        .ok_or_else(|| invalid(keyword, "expected a string"))?;
                    let regex = Regex::new(source).map_err(|e| invalid(keyword, e.to_string()))?;
                    compiled.pattern = Some(regex);
                }
                other if ANNOTATIONS.contains(&other) => {}
                other => return Err(SchemaError::UnsupportedKeyword(other.to_string())),
            }
        }

        Ok(compiled)
    }

    fn parse_types(value: &Value) -> Result<Vec<JsonKind>, SchemaError> {
        match value {
            Value::String(name) => Ok(vec![JsonKind::parse(name)?]),
            Value::Array(names) => names
                .iter()
                .map(|name| {
                    name.as_str()
                        .ok_or_else(|| invalid("type", "expected type names"))
                        .and_then(JsonKind::parse)
                })
                .collect(),
            _ => Err(invalid("type", "expected a string or an array of strings")),
        }
    }

    fn collect_violations(&self, path: &str, value: &Value, violations: &mut Vec<String>) {
        if !self.types.is_empty() && !self.types.iter().any(|kind| kind.matches(value)) {
            let expected: Vec<_> = self.types.iter().map(JsonKind::name).collect();
            violations.push(format!("{path}: expected {}", expected.join(" or ")));
            return;
        }

        if let Some(allowed) = &self.allowed {
            if !allowed.contains(value) {
                violations.push(format!("{path}: {value} is not an allowed value"));
            }
        }

        match value {
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    self.check_number(path, n, violations);
                }
            }
            Value::String(s) => self.check_string(path, s, violations),
            Value::Array(items) => self.check_array(path, items, violations),
            Value::Object(obj) => self.check_object(path, obj, violations),
            _ => {}
        }
    }

    fn check_number(&self, path: &str, n: f64, violations: &mut Vec<String>) {
        if let Some(min) = self.minimum.filter(|min| n < *min) {
            violations.push(format!("{path}: {n} is below the minimum {min}"));
        }
        if let Some(max) = self.maximum.filter(|max| n > *max) {
            violations.push(format!("{path}: {n} is above the maximum {max}"));
        }
        if let Some(min) = self.exclusive_minimum.filter(|min| n <= *min) {
            violations.push(format!("{path}: {n} must be greater than {min}"));
        }
        if let Some(max) = self.exclusive_maximum.filter(|max| n >= *max) {
            violations.push(format!("{path}: {n} must be less than {max}"));
        }
    }

    fn check_string(&self, path: &str, s: &str, violations: &mut Vec<String>) {
        let len = s.chars().count();
        if let Some(min) = self.min_length.filter(|min| len < *min) {
            violations.push(format!("{path}: shorter than {min} characters"));
        }
        if let Some(max) = self.max_length.filter(|max| len > *max) {
            violations.push(format!("{path}: longer than {max} characters"));
        }
        if let Some(pattern) = self.pattern.as_ref().filter(|re| !re.is_match(s)) {
            violations.push(format!("{path}: does not match '{}'", pattern.as_str()));
        }
    }

    fn check_array(&self, path: &str, items: &[Value], violations: &mut Vec<String>) {
        if let Some(min) = self.min_items.filter(|min| items.len() < *min) {
            violations.push(format!("{path}: fewer than {min} items"));
        }
        if let Some(max) = self.max_items.filter(|max| items.len() > *max) {
            violations.push(format!("{path}: more than {max} items"));
        }
        if let Some(schema) = &self.items {
            for (i, item) in items.iter().enumerate() {
                schema.collect_violations(&format!("{path}[{i}]"), item, violations);
            }
        }
    }

    fn check_object(&self, path: &str, obj: &Map<String, Value>, violations: &mut Vec<String>) {
        for key in &self.required {
            if !obj.contains_key(key) {
                violations.push(format!("{path}: missing required property '{key}'"));
            }
        }

        for (name, sub) in &self.properties {
            if let Some(child) = obj.get(name) {
                sub.collect_violations(&format!("{path}.{name}"), child, violations);
            }
        }

        let extra = obj
            .iter()
            .filter(|(key, _)| !self.properties.iter().any(|(name, _)| name == *key));
        for (key, child) in extra {
            match &self.additional {
                Additional::Allowed => {}
                Additional::Forbidden => {
                    violations.push(format!("{path}: unexpected property '{key}'"));
                }
                Additional::Schema(schema) => {
                    schema.collect_violations(&format!("{path}.{key}"), child, violations);
                }
            }
        }
    }
}

impl PayloadSchema for JsonSchema {
    fn check(&self, payload: &Value) -> Result<(), Vec<String>> {
        let mut violations = Vec::new();
        self.collect_violations("$", payload, &mut violations);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(violations)
        }
    }
}

/// Schema registry keyed by event name.
#[derive(Default)]
pub struct SchemaValidator {
    schemas: RwLock<HashMap<String, Box<dyn PayloadSchema>>>,
}

impl SchemaValidator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a JSON schema and register it for `event_name`.
    pub fn add_json_schema(&self, event_name: &str, schema: &Value) -> Result<(), SchemaError> {
        let compiled = JsonSchema::from_value(schema)?;
        self.add_schema(event_name, Box::new(compiled));
        Ok(())
    }

    #[must_use]
    pub fn has_schema(&self, event_name: &str) -> bool {
        self.schemas.read().contains_key(event_name)
    }
}

impl PayloadValidator for SchemaValidator {
    fn add_schema(&self, event_name: &str, schema: Box<dyn PayloadSchema>) {
        self.schemas.write().insert(event_name.to_string(), schema);
    }

    fn validate(&self, event_name: &str, payload: &Value) -> bool {
        let schemas = self.schemas.read();
        let Some(schema) = schemas.get(event_name) else {
            warn!(event = event_name, "No schema registered for event type");
            return true;
        };

        match schema.check(payload) {
            Ok(()) => true,
            Err(violations) => {
                error!(event = event_name, ?violations, "Validation failed for event");
                false
            }
        }
    }
}
