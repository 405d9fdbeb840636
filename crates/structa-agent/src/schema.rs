//! Tool Schema Registry — typed parameter descriptors and signature rendering.
//!
//! Tools declare their parameters explicitly through [`ParameterSpec`]; the
//! registry turns each tool into an immutable [`ToolSchema`] and renders the
//! one-line signatures the model reads in its system prompt.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::tools::Tool;

// ─────────────────────────────────────────────
// Type tags
// ─────────────────────────────────────────────

/// Declared type of a parameter or return value.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeTag {
    Str,
    Int,
    Float,
    Bool,
    /// Restricted choice among fixed values.
    Literal(Vec<Value>),
    List(Box<TypeTag>),
    Tuple(Vec<TypeTag>),
    Set(Box<TypeTag>),
    Dict(Box<TypeTag>, Box<TypeTag>),
    Any,
    /// Degraded tag for an undeclared return type.
    Unknown,
}

impl TypeTag {
    pub fn list(element: TypeTag) -> Self {
        TypeTag::List(Box::new(element))
    }

    pub fn set(element: TypeTag) -> Self {
        TypeTag::Set(Box::new(element))
    }

    pub fn dict(key: TypeTag, value: TypeTag) -> Self {
        TypeTag::Dict(Box::new(key), Box::new(value))
    }

    /// Literal over string choices.
    pub fn literal<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        TypeTag::Literal(values.into_iter().map(|v| Value::String(v.into())).collect())
    }

    /// Base name without type arguments (`"list"` for `list[str]`).
    pub fn base_name(&self) -> &'static str {
        match self {
            TypeTag::Str => "str",
            TypeTag::Int => "int",
            TypeTag::Float => "float",
            TypeTag::Bool => "bool",
            TypeTag::Literal(_) => "Literal",
            TypeTag::List(_) => "list",
            TypeTag::Tuple(_) => "tuple",
            TypeTag::Set(_) => "set",
            TypeTag::Dict(_, _) => "dict",
            TypeTag::Any => "Any",
            TypeTag::Unknown => "unknown",
        }
    }

    /// Descriptor fields for the schema JSON: `type` plus the nested
    /// element/key/value descriptors or literal values.
    fn describe_into(&self, out: &mut Map<String, Value>) {
        out.insert("type".to_string(), json!(self.base_name()));
        match self {
            TypeTag::Literal(values) => {
                out.insert("values".to_string(), Value::Array(values.clone()));
            }
            TypeTag::List(el) | TypeTag::Set(el) => {
                out.insert("elements".to_string(), json!([el.descriptor()]));
            }
            TypeTag::Tuple(items) => {
                let items: Vec<Value> = items.iter().map(TypeTag::descriptor).collect();
                out.insert("elements".to_string(), Value::Array(items));
            }
            TypeTag::Dict(key, value) => {
                out.insert("key_type".to_string(), key.descriptor());
                out.insert("value_type".to_string(), value.descriptor());
            }
            _ => {}
        }
    }

    fn descriptor(&self) -> Value {
        let mut out = Map::new();
        self.describe_into(&mut out);
        Value::Object(out)
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeTag::Literal(values) => {
                let values: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "Literal[{}]", values.join(" | "))
            }
            TypeTag::List(el) => write!(f, "list[{el}]"),
            TypeTag::Set(el) => write!(f, "set[{el}]"),
            TypeTag::Tuple(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "tuple[{}]", items.join(", "))
            }
            TypeTag::Dict(key, value) => write!(f, "dict[{key}, {value}]"),
            other => f.write_str(other.base_name()),
        }
    }
}

// ─────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────

/// One declared tool parameter.
#[derive(Clone, Debug, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    pub type_tag: TypeTag,
    /// `true` when no default was declared.
    pub required: bool,
    pub default: Option<Value>,
    /// Per-argument documentation shown to the model.
    pub description: Option<String>,
}

impl ParameterSpec {
    /// A parameter without a default.
    pub fn required(name: impl Into<String>, type_tag: TypeTag) -> Self {
        Self {
            name: name.into(),
            type_tag,
            required: true,
            default: None,
            description: None,
        }
    }

    /// A parameter with a default value.
    pub fn optional(name: impl Into<String>, type_tag: TypeTag, default: Value) -> Self {
        Self {
            name: name.into(),
            type_tag,
            required: false,
            default: Some(default),
            description: None,
        }
    }

    /// Attach argument documentation (builder pattern).
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn to_json(&self) -> Value {
        let mut out = Map::new();
        self.type_tag.describe_into(&mut out);
        out.insert("required".to_string(), json!(self.required));
        out.insert(
            "default".to_string(),
            self.default.clone().unwrap_or(Value::Null),
        );
        if let Some(ref description) = self.description {
            out.insert("description".to_string(), json!(description));
        }
        Value::Object(out)
    }
}

impl fmt::Display for ParameterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.type_tag)?;
        if let Some(ref default) = self.default {
            write!(f, " = {default}")?;
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────
// ToolSchema
// ─────────────────────────────────────────────

/// Immutable description of one callable tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    /// Parameters in declaration order.
    pub parameters: Vec<ParameterSpec>,
    pub return_type: TypeTag,
}

impl ToolSchema {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Vec<ParameterSpec>,
        return_type: TypeTag,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            return_type,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// `name(arg: type, opt: type = default) -> return`
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
        format!("{}({}) -> {}", self.name, params.join(", "), self.return_type)
    }

    /// Signature line followed by the indented description block and any
    /// per-argument documentation.
    pub fn render(&self) -> String {
        let mut out = format!("- {}", self.signature());
        if !self.description.is_empty() {
            out.push_str("\n  ");
            out.push_str(&self.description.trim().replace('\n', "\n  "));
        }
        for param in &self.parameters {
            if let Some(ref doc) = param.description {
                out.push_str(&format!("\n    {}: {}", param.name, doc));
            }
        }
        out
    }

    /// Full JSON form, parameters kept in declaration order.
    pub fn to_json(&self) -> Value {
        let mut arguments = Map::new();
        for param in &self.parameters {
            arguments.insert(param.name.clone(), param.to_json());
        }
        let mut ret = Map::new();
        self.return_type.describe_into(&mut ret);
        json!({
            "name": self.name,
            "description": self.description,
            "arguments": arguments,
            "return": ret,
        })
    }
}

// ─────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────

/// Ordered, fixed set of tool schemas for one agent.
#[derive(Clone, Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<ToolSchema>,
}

impl SchemaRegistry {
    /// Build schemas from tools. A later tool replaces an earlier one with
    /// the same name, keeping the earlier position.
    pub fn from_tools(tools: &[Arc<dyn Tool>]) -> Self {
        let mut registry = Self::default();
        for tool in tools {
            registry.insert(tool.schema());
        }
        registry
    }

    fn insert(&mut self, schema: ToolSchema) {
        match self.schemas.iter_mut().find(|s| s.name == schema.name) {
            Some(existing) => *existing = schema,
            None => self.schemas.push(schema),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.schemas.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.schemas.iter().map(|s| s.name.clone()).collect()
    }

    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// All rendered signature blocks, one per tool, blank-line separated.
    pub fn render_signatures(&self) -> String {
        self.schemas
            .iter()
            .map(ToolSchema::render)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Pretty JSON array of every schema.
    pub fn render_schemas(&self) -> String {
        let all: Vec<Value> = self.schemas.iter().map(ToolSchema::to_json).collect();
        serde_json::to_string_pretty(&all).unwrap_or_default()
    }
}
