//! OpenAPI property definition → semantic type
//!
//! `format` and `type` spellings are reconciled into six semantic types.
//! `$ref` chains are followed with a visited set, so a cyclic chain ends in
//! [`Resolution::Unresolved`] instead of recursing forever.

use std::collections::HashSet;

use serde_json::Value;

use crate::openapi::Specification;

/// Type a JSON value is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType {
    String,
    Integer,
    /// Floating point; integral JSON numbers are accepted too
    Number,
    Boolean,
    Array,
    Object,
}

impl SemanticType {
    /// Map an OpenAPI `type` or `format` spelling.
    #[must_use]
    pub fn from_openapi_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "integer" | "int32" | "int64" => Some(Self::Integer),
            "number" | "float" | "double" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// Whether `value` is an instance of this type.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of the JSON type of `value`, for diagnostics.
#[must_use]
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why no type could be derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnresolvedReason {
    /// No `properties`, `format`, `type` or `$ref`
    NoTypeInformation,
    /// `type` present but not one of the known names
    UnknownType(String),
    /// `$ref` does not point at anything in the document
    DanglingReference(String),
    /// `$ref` chain revisits this path
    ReferenceCycle(String),
}

impl std::fmt::Display for UnresolvedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoTypeInformation => f.write_str("property contains no type or properties"),
            Self::UnknownType(name) => write!(f, "unknown type '{name}'"),
            Self::DanglingReference(path) => write!(f, "reference '{path}' does not resolve"),
            Self::ReferenceCycle(path) => write!(f, "reference cycle through '{path}'"),
        }
    }
}

/// Outcome of [`resolve_type`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Type(SemanticType),
    Unresolved(UnresolvedReason),
}

impl Resolution {
    #[must_use]
    pub fn semantic(&self) -> Option<SemanticType> {
        match self {
            Self::Type(t) => Some(*t),
            Self::Unresolved(_) => None,
        }
    }
}

/// Resolve the semantic type of a property definition.
///
/// Precedence: `properties` → `format` (known scalar names only) → `type` → `$ref`.
#[must_use]
pub fn resolve_type(property: &Value, spec: &Specification) -> Resolution {
    let mut visited = HashSet::new();
    resolve_inner(property, spec, &mut visited)
}

fn resolve_inner(property: &Value, spec: &Specification, visited: &mut HashSet<String>) -> Resolution {
    if property.get("properties").is_some() {
        return Resolution::Type(SemanticType::Object);
    }

    if let Some(t) = property
        .get("format")
        .and_then(Value::as_str)
        .and_then(SemanticType::from_openapi_name)
    {
        return Resolution::Type(t);
    }

    if let Some(name) = property.get("type").and_then(Value::as_str) {
        return match SemanticType::from_openapi_name(name) {
            Some(t) => Resolution::Type(t),
            None => Resolution::Unresolved(UnresolvedReason::UnknownType(name.to_string())),
        };
    }

    if let Some(reference) = property.get("$ref").and_then(Value::as_str) {
        if !visited.insert(reference.to_string()) {
            return Resolution::Unresolved(UnresolvedReason::ReferenceCycle(reference.to_string()));
        }
        return match spec.resolve_pointer(reference) {
            Some(target) => resolve_inner(target, spec, visited),
            None => {
                Resolution::Unresolved(UnresolvedReason::DanglingReference(reference.to_string()))
            }
        };
    }

    Resolution::Unresolved(UnresolvedReason::NoTypeInformation)
}

/// Follow a `$ref` chain to the first node that is not itself a reference.
///
/// # Errors
///
/// Dangling pointers and cycles.
pub fn dereference<'a>(
    node: &'a Value,
    spec: &'a Specification,
) -> Result<&'a Value, UnresolvedReason> {
    let mut visited = HashSet::new();
    let mut current = node;
    while let Some(reference) = current.get("$ref").and_then(Value::as_str) {
        if !visited.insert(reference) {
            return Err(UnresolvedReason::ReferenceCycle(reference.to_string()));
        }
        current = spec
            .resolve_pointer(reference)
            .ok_or_else(|| UnresolvedReason::DanglingReference(reference.to_string()))?;
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn spec() -> Specification {
        Specification::new(json!({
            "definitions": {
                "Id": {"type": "string"},
                "Count": {"$ref": "#/definitions/CountInner"},
                "CountInner": {"format": "int64"},
                "Owner": {"properties": {"name": {"type": "string"}}},
                "A": {"$ref": "#/definitions/B"},
                "B": {"$ref": "#/definitions/A"},
                "X": {"$ref": "#/definitions/Y"},
                "Y": {"$ref": "#/definitions/Z"},
                "Z": {"$ref": "#/definitions/X"},
                "Self": {"$ref": "#/definitions/Self"}
            }
        }))
    }

    fn resolve(def: Value) -> Resolution {
        resolve_type(&def, &spec())
    }

    #[test]
    fn properties_win_over_everything() {
        let r = resolve(json!({"type": "string", "properties": {}}));
        assert_eq!(r, Resolution::Type(SemanticType::Object));
    }

    #[test]
    fn known_format_overrides_type() {
        let r = resolve(json!({"type": "number", "format": "int32"}));
        assert_eq!(r, Resolution::Type(SemanticType::Integer));
    }

    #[test]
    fn string_format_falls_through_to_type() {
        for format in ["date-time", "email", "uri", "url"] {
            let r = resolve(json!({"type": "string", "format": format}));
            assert_eq!(r, Resolution::Type(SemanticType::String), "{format}");
        }
    }

    #[test]
    fn float_and_double_are_numbers() {
        assert_eq!(resolve(json!({"format": "float"})).semantic(), Some(SemanticType::Number));
        assert_eq!(resolve(json!({"format": "double"})).semantic(), Some(SemanticType::Number));
    }

    #[test]
    fn follows_reference_chain() {
        assert_eq!(
            resolve(json!({"$ref": "#/definitions/Id"})),
            Resolution::Type(SemanticType::String)
        );
        assert_eq!(
            resolve(json!({"$ref": "#/definitions/Count"})),
            Resolution::Type(SemanticType::Integer)
        );
        assert_eq!(
            resolve(json!({"$ref": "#/definitions/Owner"})),
            Resolution::Type(SemanticType::Object)
        );
    }

    #[test]
    fn two_node_cycle_is_unresolved() {
        let r = resolve(json!({"$ref": "#/definitions/A"}));
        assert!(matches!(
            r,
            Resolution::Unresolved(UnresolvedReason::ReferenceCycle(_))
        ));
    }

    #[test]
    fn three_node_cycle_is_unresolved() {
        let r = resolve(json!({"$ref": "#/definitions/X"}));
        assert_eq!(
            r,
            Resolution::Unresolved(UnresolvedReason::ReferenceCycle(
                "#/definitions/X".to_string()
            ))
        );
    }

    #[test]
    fn self_reference_is_unresolved() {
        let r = resolve(json!({"$ref": "#/definitions/Self"}));
        assert!(r.semantic().is_none());
    }

    #[test]
    fn dangling_and_empty_definitions() {
        assert_eq!(
            resolve(json!({"$ref": "#/definitions/Missing"})),
            Resolution::Unresolved(UnresolvedReason::DanglingReference(
                "#/definitions/Missing".to_string()
            ))
        );
        assert_eq!(
            resolve(json!({"description": "no type"})),
            Resolution::Unresolved(UnresolvedReason::NoTypeInformation)
        );
        assert_eq!(
            resolve(json!({"type": "file"})),
            Resolution::Unresolved(UnresolvedReason::UnknownType("file".to_string()))
        );
    }

    #[test]
    fn dereference_stops_at_first_concrete_node() {
        let spec = spec();
        let def = json!({"$ref": "#/definitions/Count"});
        let node = dereference(&def, &spec).unwrap();
        assert_eq!(node, &json!({"format": "int64"}));

        let cyclic = json!({"$ref": "#/definitions/X"});
        assert!(matches!(
            dereference(&cyclic, &spec),
            Err(UnresolvedReason::ReferenceCycle(_))
        ));
    }

    #[test]
    fn integer_rejects_fractional_values() {
        for format in ["int32", "int64", "integer"] {
            let t = resolve(json!({"format": format})).semantic().unwrap();
            assert!(t.accepts(&json!(5)));
            assert!(!t.accepts(&json!(5.5)), "{format} must reject 5.5");
        }
    }

    #[test]
    fn booleans_are_not_numbers() {
        assert!(!SemanticType::Integer.accepts(&json!(true)));
        assert!(!SemanticType::Number.accepts(&json!(false)));
    }

    proptest! {
        #[test]
        fn number_formats_accept_integers_and_floats(i in any::<i64>(), f in -1.0e12f64..1.0e12) {
            for format in ["float", "double", "number"] {
                let t = SemanticType::from_openapi_name(format).unwrap();
                prop_assert!(t.accepts(&json!(i)));
                prop_assert!(t.accepts(&json!(f)));
            }
        }

        #[test]
        fn integer_formats_reject_non_integral(i in -1_000_000i64..1_000_000, frac in 0.01f64..0.99) {
            let value = json!(i as f64 + frac);
            for format in ["int32", "int64", "integer"] {
                let t = SemanticType::from_openapi_name(format).unwrap();
                prop_assert!(!t.accepts(&value));
            }
        }

        #[test]
        fn reference_rings_always_terminate(len in 1usize..8) {
            let mut defs = serde_json::Map::new();
            for i in 0..len {
                let next = (i + 1) % len;
                defs.insert(format!("N{i}"), json!({"$ref": format!("#/definitions/N{next}")}));
            }
            let spec = Specification::new(json!({"definitions": defs}));
            let r = resolve_type(&json!({"$ref": "#/definitions/N0"}), &spec);
            prop_assert!(
                matches!(r, Resolution::Unresolved(UnresolvedReason::ReferenceCycle(_))),
                "expected cycle, got {:?}",
                r
            );
        }
    }
}
