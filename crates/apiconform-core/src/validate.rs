//! Response body vs OpenAPI resource schema
//!
//! No I/O. Violations are collected rather than raised, so one run reports
//! every broken field. Unresolvable schema references become warnings and the
//! field is treated as unconstrained.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde_json::{Map, Value};
use url::Url;

use crate::openapi::Specification;
use crate::types::{Resolution, SemanticType, dereference, json_type_name, resolve_type};
use crate::violation::{Violation, ViolationKind};

/// Schema problem that does not fail validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaWarning {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for SchemaWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Everything found while checking one body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaOutcome {
    pub violations: Vec<Violation>,
    pub warnings: Vec<SchemaWarning>,
}

impl SchemaOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Drop warnings, keep violations.
    ///
    /// # Errors
    ///
    /// Returns the violations if there are any.
    pub fn into_result(self) -> Result<(), Vec<Violation>> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self.violations)
        }
    }

    fn violation(&mut self, kind: ViolationKind, path: &str, message: impl Into<String>) {
        self.violations.push(Violation::new(kind, path, message));
    }

    fn warn(&mut self, path: &str, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(path = %path, "{message}");
        self.warnings.push(SchemaWarning {
            path: path.to_string(),
            message,
        });
    }
}

/// Primary data of a successful JSON:API response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResponseData<'a> {
    Single(&'a Value),
    Many(&'a [Value]),
}

impl<'a> ResponseData<'a> {
    /// Pick `data` out of a body.
    ///
    /// # Errors
    ///
    /// `MissingKey` when the body has no `data`.
    pub fn from_body(body: &'a Value) -> Result<Self, Violation> {
        match lookup(body, &["data"], "")? {
            Value::Array(items) => Ok(Self::Many(items)),
            single => Ok(Self::Single(single)),
        }
    }

    /// Each resource with its location in the body.
    #[must_use]
    pub fn resources(&self) -> Vec<(String, &'a Value)> {
        match self {
            Self::Single(resource) => vec![("data".to_string(), *resource)],
            Self::Many(items) => items
                .iter()
                .enumerate()
                .map(|(i, r)| (format!("data[{i}]"), r))
                .collect(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Single(_) => 1,
            Self::Many(items) => items.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Checks bodies against resource schemas of one specification.
pub struct SchemaValidator<'a> {
    spec: &'a Specification,
    nullable_fields: &'a HashSet<String>,
}

impl<'a> SchemaValidator<'a> {
    #[must_use]
    pub fn new(spec: &'a Specification, nullable_fields: &'a HashSet<String>) -> Self {
        Self {
            spec,
            nullable_fields,
        }
    }

    /// Check a decoded body. The status code picks the branch:
    /// 2xx → `data` resources, ≥ 400 → `errors` objects, anything else → nothing.
    #[must_use]
    pub fn check_body(&self, status: u16, body: &Value, schema: &Value) -> SchemaOutcome {
        let mut out = SchemaOutcome::default();

        if (200..300).contains(&status) {
            match ResponseData::from_body(body) {
                Ok(data) => {
                    for (path, resource) in data.resources() {
                        self.check_resource(&path, resource, schema, &mut out);
                    }
                }
                Err(v) => out.violations.push(v),
            }
        } else if status >= 400 {
            match lookup(body, &["errors"], "") {
                Ok(Value::Array(errors)) => {
                    for (i, error) in errors.iter().enumerate() {
                        self.check_error(&format!("errors[{i}]"), error, schema, &mut out);
                    }
                }
                Ok(other) => out.violation(
                    ViolationKind::TypeMismatch,
                    "errors",
                    format!("expected array, got {}", json_type_name(other)),
                ),
                Err(v) => out.violations.push(v),
            }
        }

        out
    }

    fn check_resource(
        &self,
        path: &str,
        resource: &Value,
        schema: &Value,
        out: &mut SchemaOutcome,
    ) {
        if let Err(v) = self.check_resource_type(path, resource, schema) {
            out.violations.push(v);
        }

        let attributes_path = child(path, "attributes");
        let actual = match lookup(resource, &["attributes"], path)
            .and_then(|a| as_object(a, &attributes_path))
        {
            Ok(a) => a,
            Err(v) => {
                out.violations.push(v);
                return;
            }
        };
        let expected = match lookup(schema, &["attributes", "properties"], "schema")
            .and_then(|p| as_object(p, "schema.attributes.properties"))
        {
            Ok(p) => p,
            Err(v) => {
                out.violations.push(v);
                return;
            }
        };

        self.check_attributes(&attributes_path, actual, expected, out);
    }

    fn check_resource_type(
        &self,
        path: &str,
        resource: &Value,
        schema: &Value,
    ) -> Result<(), Violation> {
        let actual = lookup(resource, &["type"], path)?;
        let expected = lookup(schema, &["type", "enum"], "schema")?
            .get(0)
            .ok_or_else(|| {
                Violation::new(
                    ViolationKind::MissingKey,
                    "schema.type.enum[0]",
                    "Missing key 'enum[0]'",
                )
            })?;
        if actual == expected {
            Ok(())
        } else {
            Err(Violation::new(
                ViolationKind::ResourceTypeMismatch,
                child(path, "type"),
                format!("expected resource type {expected}, got {actual}"),
            ))
        }
    }

    /// Error objects are checked against the schema root; error schemas are flat.
    fn check_error(&self, path: &str, error: &Value, schema: &Value, out: &mut SchemaOutcome) {
        let checked = as_object(error, path)
            .and_then(|actual| as_object(schema, "schema").map(|expected| (actual, expected)));
        match checked {
            Ok((actual, expected)) => self.check_attributes(path, actual, expected, out),
            Err(v) => out.violations.push(v),
        }
    }

    fn check_attributes(
        &self,
        path: &str,
        actual: &Map<String, Value>,
        expected: &Map<String, Value>,
        out: &mut SchemaOutcome,
    ) {
        for (field, value) in actual {
            let field_path = child(path, field);
            let Some(definition) = expected.get(field) else {
                out.violation(
                    ViolationKind::UnexpectedField,
                    &field_path,
                    format!("Unexpected field '{field}'"),
                );
                continue;
            };
            self.check_field(&field_path, field, value, definition, out);
        }
    }

    fn check_field(
        &self,
        path: &str,
        field: &str,
        value: &Value,
        definition: &Value,
        out: &mut SchemaOutcome,
    ) {
        let expected_type = match resolve_type(definition, self.spec) {
            Resolution::Type(t) => Some(t),
            Resolution::Unresolved(reason) => {
                out.warn(path, reason.to_string());
                None
            }
        };

        match (expected_type, value) {
            (Some(SemanticType::Array), Value::Array(items)) => {
                if let Some(item_properties) = self.item_properties(path, definition, out) {
                    for (i, item) in items.iter().enumerate() {
                        let item_path = format!("{path}[{i}]");
                        match as_object(item, &item_path) {
                            Ok(obj) => self.check_attributes(&item_path, obj, item_properties, out),
                            Err(v) => out.violations.push(v),
                        }
                    }
                }
            }
            (Some(SemanticType::Object), Value::Object(obj)) => {
                if let Some(properties) = self.nested_properties(path, definition, out) {
                    self.check_attributes(path, obj, properties, out);
                }
            }
            _ => {}
        }

        if self.nullable_fields.contains(field) && is_empty_value(value) {
            return;
        }

        if let Some(t) = expected_type {
            if !t.accepts(value) {
                out.violation(
                    ViolationKind::TypeMismatch,
                    path,
                    format!("expected {t}, got {}", json_type_name(value)),
                );
                return;
            }
        }

        let constraints = dereference(definition, self.spec).unwrap_or(definition);
        check_string_constraints(path, value, constraints, out);
    }

    /// `properties` of the array's `items`, following `$ref` on both levels.
    fn item_properties<'v>(
        &'v self,
        path: &str,
        definition: &'v Value,
        out: &mut SchemaOutcome,
    ) -> Option<&'v Map<String, Value>> {
        let array = self.follow(path, definition, out)?;
        let items = self.follow(path, array.get("items")?, out)?;
        items.get("properties")?.as_object()
    }

    fn nested_properties<'v>(
        &'v self,
        path: &str,
        definition: &'v Value,
        out: &mut SchemaOutcome,
    ) -> Option<&'v Map<String, Value>> {
        self.follow(path, definition, out)?
            .get("properties")?
            .as_object()
    }

    fn follow<'v>(
        &'v self,
        path: &str,
        node: &'v Value,
        out: &mut SchemaOutcome,
    ) -> Option<&'v Value> {
        match dereference(node, self.spec) {
            Ok(target) => Some(target),
            Err(reason) => {
                out.warn(path, reason.to_string());
                None
            }
        }
    }
}

/// Validate one body and return only the verdict.
///
/// # Errors
///
/// Returns every violation found.
pub fn validate(
    spec: &Specification,
    status: u16,
    body: &Value,
    schema: &Value,
    nullable_fields: &HashSet<String>,
) -> Result<(), Vec<Violation>> {
    SchemaValidator::new(spec, nullable_fields)
        .check_body(status, body, schema)
        .into_result()
}

/// `pattern` wins over `format` when both are declared.
fn check_string_constraints(
    path: &str,
    value: &Value,
    definition: &Value,
    out: &mut SchemaOutcome,
) {
    let Some(text) = value.as_str() else {
        return;
    };

    if let Some(pattern) = definition.get("pattern").and_then(Value::as_str) {
        match Regex::new(pattern) {
            Ok(re) if re.is_match(text) => {}
            Ok(_) => out.violation(
                ViolationKind::PatternMismatch,
                path,
                format!("'{text}' does not match pattern '{pattern}'"),
            ),
            Err(e) => out.warn(path, format!("invalid pattern '{pattern}': {e}")),
        }
        return;
    }

    match definition.get("format").and_then(Value::as_str) {
        Some(format @ ("url" | "uri")) => {
            if Url::parse(text).is_err() {
                out.violation(
                    ViolationKind::FormatMismatch,
                    path,
                    format!("'{text}' is not a valid {format}"),
                );
            }
        }
        Some("email") => {
            if !is_valid_email(text) {
                out.violation(
                    ViolationKind::FormatMismatch,
                    path,
                    format!("'{text}' is not a valid email"),
                );
            }
        }
        _ => {}
    }
}

fn is_valid_email(text: &str) -> bool {
    static EMAIL: OnceLock<Option<jsonschema::Validator>> = OnceLock::new();
    let validator = EMAIL.get_or_init(|| {
        jsonschema::options()
            .should_validate_formats(true)
            .build(&serde_json::json!({"type": "string", "format": "email"}))
            .ok()
    });
    validator
        .as_ref()
        .is_some_and(|v| v.is_valid(&Value::String(text.to_string())))
}

/// Falsy values: `null`, `false`, `0`, `""`, `[]`, `{}`.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

fn child(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

/// Walk `keys` from `value`, naming the first missing one.
fn lookup<'v>(value: &'v Value, keys: &[&str], base: &str) -> Result<&'v Value, Violation> {
    let mut node = value;
    let mut path = base.to_string();
    for key in keys {
        let obj = as_object(node, &path)?;
        path = child(&path, key);
        node = obj.get(*key).ok_or_else(|| {
            Violation::new(ViolationKind::MissingKey, &path, format!("Missing key '{key}'"))
        })?;
    }
    Ok(node)
}

fn as_object<'v>(value: &'v Value, path: &str) -> Result<&'v Map<String, Value>, Violation> {
    value.as_object().ok_or_else(|| {
        Violation::new(
            ViolationKind::TypeMismatch,
            path,
            format!("expected object, got {}", json_type_name(value)),
        )
    })
}
