//! Tool and resource descriptors.
//!
//! Descriptors are the declarative half of the registry: name, description,
//! and (for tools) a typed argument schema. They are created once at startup
//! and never mutated afterwards. [`ArgumentSchema::to_json_schema`] renders
//! the MCP `inputSchema` object served by `tools/list`.

use serde_json::{json, Map, Value};

/// The primitive type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// A UTF-8 string.
    String,
    /// A signed 64-bit integer.
    Integer,
    /// A floating-point number (integers accepted).
    Number,
    /// A boolean.
    Boolean,
}

impl FieldKind {
    /// JSON Schema type name.
    #[must_use]
    pub const fn type_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// One field of a tool's argument schema.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    /// Field name within the argument object.
    pub name: String,
    /// Expected primitive type.
    pub kind: FieldKind,
    /// Whether the field must be present.
    pub required: bool,
    /// Human-readable description for tool discovery.
    pub description: Option<String>,
    /// Allowed values for string fields. Empty means unconstrained.
    pub one_of: Vec<String>,
    /// Value substituted when an optional field is absent.
    pub default: Option<Value>,
}

impl FieldSpec {
    /// Creates a required field.
    #[must_use]
    pub fn required(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
            required: true,
            description: None,
            one_of: Vec::new(),
            default: None,
        }
    }

    /// Creates an optional field.
    #[must_use]
    pub fn optional(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind)
        }
    }

    /// Attaches a description.
    #[must_use]
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Constrains a string field to a fixed set of values.
    #[must_use]
    pub fn one_of<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.one_of = values.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the default substituted when the field is absent.
    #[must_use]
    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    fn to_json_schema(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".into(), json!(self.kind.type_name()));
        if let Some(ref description) = self.description {
            property.insert("description".into(), json!(description));
        }
        if !self.one_of.is_empty() {
            property.insert("enum".into(), json!(self.one_of));
        }
        if let Some(ref default) = self.default {
            property.insert("default".into(), default.clone());
        }
        Value::Object(property)
    }
}

/// An ordered set of field specifications.
#[derive(Debug, Clone, Default)]
pub struct ArgumentSchema {
    /// Fields in declaration order.
    pub fields: Vec<FieldSpec>,
}

impl ArgumentSchema {
    /// Creates an empty schema (tool takes no arguments).
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Creates a schema from a list of fields.
    #[must_use]
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Renders the schema as a JSON Schema object for `tools/list`.
    #[must_use]
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for field in &self.fields {
            properties.insert(field.name.clone(), field.to_json_schema());
            if field.required {
                required.push(json!(field.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

/// Describes a named, schema-checked operation a client may invoke.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    /// Unique tool name within one registry.
    pub name: String,
    /// Human-readable description for tool discovery.
    pub description: String,
    /// Argument schema enforced before the handler runs.
    pub schema: ArgumentSchema,
}

impl ToolDescriptor {
    /// Creates a tool descriptor.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        schema: ArgumentSchema,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            schema,
        }
    }

    /// Renders the descriptor as a `tools/list` entry.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "name": self.name,
            "description": self.description,
            "inputSchema": self.schema.to_json_schema(),
        })
    }
}

/// Describes a read-only, parameterless data source identified by a URI.
#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    /// Unique URI within one registry.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// MIME type of the content returned by reads.
    pub mime_type: String,
}

impl ResourceDescriptor {
    /// Creates a resource descriptor.
    #[must_use]
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        mime_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: description.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Renders the descriptor as a `resources/list` entry.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "uri": self.uri,
            "name": self.name,
            "description": self.description,
            "mimeType": self.mime_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn navigate_schema() -> ArgumentSchema {
        ArgumentSchema::new(vec![
            FieldSpec::required("url", FieldKind::String).describe("URL to navigate to"),
            FieldSpec::optional("headless", FieldKind::Boolean).with_default(json!(false)),
            FieldSpec::optional("engine", FieldKind::String)
                .one_of(["chromium", "firefox", "webkit"])
                .with_default(json!("chromium")),
        ])
    }

    #[test]
    fn json_schema_lists_required_fields() {
        let schema = navigate_schema().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["required"], json!(["url"]));
    }

    #[test]
    fn json_schema_carries_enum_and_default() {
        let schema = navigate_schema().to_json_schema();
        assert_eq!(
            schema["properties"]["engine"]["enum"],
            json!(["chromium", "firefox", "webkit"])
        );
        assert_eq!(schema["properties"]["engine"]["default"], json!("chromium"));
        assert_eq!(schema["properties"]["headless"]["default"], json!(false));
    }

    #[test]
    fn empty_schema_has_no_required_fields() {
        let schema = ArgumentSchema::empty().to_json_schema();
        assert_eq!(schema["required"], json!([]));
        assert_eq!(schema["properties"], json!({}));
    }

    #[test]
    fn tool_descriptor_wire_shape() {
        let tool = ToolDescriptor::new("navigate_to", "Navigate to a URL", navigate_schema());
        let wire = tool.to_wire();
        assert_eq!(wire["name"], "navigate_to");
        assert_eq!(wire["description"], "Navigate to a URL");
        assert_eq!(wire["inputSchema"]["type"], "object");
    }

    #[test]
    fn resource_descriptor_wire_shape() {
        let resource = ResourceDescriptor::new(
            "toolhost://status",
            "Server status",
            "Identity and session summary",
            "application/json",
        );
        let wire = resource.to_wire();
        assert_eq!(wire["uri"], "toolhost://status");
        assert_eq!(wire["mimeType"], "application/json");
    }

    #[test]
    fn field_lookup_by_name() {
        let schema = navigate_schema();
        assert!(schema.field("url").is_some_and(|field| field.required));
        assert!(schema.field("nope").is_none());
    }
}
