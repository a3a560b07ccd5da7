//! OpenAPI document access: loading, JSON-pointer lookup, resource schemas
//!
//! The document is parsed once and never mutated. Everything downstream
//! borrows it.

use std::path::Path;

use serde_json::Value;

/// A parsed OpenAPI/Swagger document.
#[derive(Debug, Clone, PartialEq)]
pub struct Specification {
    root: Value,
}

impl Specification {
    #[must_use]
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    /// Read and parse a document from disk.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or is neither JSON nor YAML.
    pub fn load(path: &Path) -> Result<Self, SpecError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SpecError::Io(format!("{}: {e}", path.display())))?;
        parse_document(path, &content).map(Self::new)
    }

    #[must_use]
    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Swagger 2.0 (`swagger` key) or OpenAPI 3.x (`openapi` key).
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.root
            .get("swagger")
            .or_else(|| self.root.get("openapi"))
            .and_then(Value::as_str)
    }

    /// Dereference a local `$ref` such as `#/definitions/Pet/properties/id`.
    ///
    /// Returns `None` for external references and pointers that walk off the tree.
    #[must_use]
    pub fn resolve_pointer(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.root);
        }
        let pointer = pointer.strip_prefix('/')?;

        let mut node = &self.root;
        for raw in pointer.split('/') {
            let segment = decode_pointer_segment(raw);
            node = match node {
                Value::Object(map) => map.get(&segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Property mapping of a named resource definition.
    ///
    /// Looks in `definitions` (2.0) first, then `components/schemas` (3.x).
    #[must_use]
    pub fn resource_schema(&self, resource: &str) -> Option<&Value> {
        let definition = self
            .root
            .get("definitions")
            .and_then(|d| d.get(resource))
            .or_else(|| {
                self.root
                    .get("components")
                    .and_then(|c| c.get("schemas"))
                    .and_then(|s| s.get(resource))
            })?;
        definition.get("properties")
    }

    /// Names of every resource definition in the document.
    #[must_use]
    pub fn resource_names(&self) -> Vec<String> {
        let definitions = self.root.get("definitions").or_else(|| {
            self.root
                .get("components")
                .and_then(|c| c.get("schemas"))
        });
        definitions
            .and_then(Value::as_object)
            .map(|defs| defs.keys().cloned().collect())
            .unwrap_or_default()
    }
}

/// `~1` → `/`, `~0` → `~` (RFC 6901 order).
fn decode_pointer_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Parse an OpenAPI document from JSON or YAML.
///
/// Extension first (`.yaml`/`.yml`/`.json`), then content sniffing
/// (leading `{` → JSON, otherwise YAML).
pub fn parse_document(path: &Path, content: &str) -> Result<Value, SpecError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "yaml" | "yml" => parse_yaml(content),
        "json" => parse_json(content),
        _ => {
            if content.trim_start().starts_with('{') {
                parse_json(content)
            } else {
                parse_yaml(content)
            }
        }
    }
}

fn parse_json(content: &str) -> Result<Value, SpecError> {
    serde_json::from_str(content).map_err(|e| SpecError::Parse(format!("Invalid JSON: {e}")))
}

fn parse_yaml(content: &str) -> Result<Value, SpecError> {
    serde_yml::from_str(content).map_err(|e| SpecError::Parse(format!("Invalid YAML: {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum SpecError {
    #[error("IO error: {0}")]
    Io(String),
    #[error("Parse error: {0}")]
    Parse(String),
}
