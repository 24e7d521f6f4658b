//! Schema compiler: derives the JSON-schema parameter block of a tool from a
//! typed parameter list.
//!
//! Float parameters are emitted as `"integer"`, same as integers. Models and
//! existing prompts are tuned against that output.

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::types::ToolDefinition;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("parameter '{param}': Literal values must all share one type")]
    MixedLiteral { param: String },

    #[error("parameter '{param}': Literal needs at least one value")]
    EmptyLiteral { param: String },

    #[error("parameter '{param}': list parameters need an item type")]
    UntypedList { param: String },

    #[error("parameter '{param}': unsupported type {type_name} (supported: string, integer, float, boolean, null, literal, list, optional, object)")]
    Unsupported { param: String, type_name: String },

    #[error("parameter '{0}' declared twice")]
    DuplicateParam(String),

    #[error("tool '{0}' has no description")]
    MissingDescription(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    String,
    Integer,
    Float,
    Boolean,
    Null,
}

impl Primitive {
    fn json_type(self) -> &'static str {
        match self {
            Primitive::String => "string",
            Primitive::Integer | Primitive::Float => "integer",
            Primitive::Boolean => "boolean",
            Primitive::Null => "null",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Boolean(bool),
}

impl LiteralValue {
    fn kind(&self) -> Primitive {
        match self {
            LiteralValue::String(_) => Primitive::String,
            LiteralValue::Integer(_) => Primitive::Integer,
            LiteralValue::Boolean(_) => Primitive::Boolean,
        }
    }

    fn to_json(&self) -> Value {
        match self {
            LiteralValue::String(s) => json!(s),
            LiteralValue::Integer(i) => json!(i),
            LiteralValue::Boolean(b) => json!(b),
        }
    }
}

impl From<&str> for LiteralValue {
    fn from(s: &str) -> Self {
        LiteralValue::String(s.to_string())
    }
}

impl From<i64> for LiteralValue {
    fn from(i: i64) -> Self {
        LiteralValue::Integer(i)
    }
}

impl From<bool> for LiteralValue {
    fn from(b: bool) -> Self {
        LiteralValue::Boolean(b)
    }
}

/// Declared type of a parameter or object field.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Primitive(Primitive),
    Literal(Vec<LiteralValue>),
    /// `None` is a list without an item type, which is rejected.
    List(Option<Box<ParamType>>),
    Optional(Box<ParamType>),
    Object(Vec<Param>),
    /// Any type the compiler has no mapping for, by name.
    Named(String),
}

impl ParamType {
    pub fn string() -> Self {
        ParamType::Primitive(Primitive::String)
    }

    pub fn integer() -> Self {
        ParamType::Primitive(Primitive::Integer)
    }

    pub fn float() -> Self {
        ParamType::Primitive(Primitive::Float)
    }

    pub fn boolean() -> Self {
        ParamType::Primitive(Primitive::Boolean)
    }

    pub fn list_of(item: ParamType) -> Self {
        ParamType::List(Some(Box::new(item)))
    }

    pub fn optional(inner: ParamType) -> Self {
        ParamType::Optional(Box::new(inner))
    }

    pub fn literal<V: Into<LiteralValue>>(values: impl IntoIterator<Item = V>) -> Self {
        ParamType::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn object(fields: impl IntoIterator<Item = Param>) -> Self {
        ParamType::Object(fields.into_iter().collect())
    }
}

/// A named parameter (or object field).
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: ParamType,
    pub has_default: bool,
    pub description: Option<String>,
}

impl Param {
    pub fn new(name: &str, ty: ParamType) -> Self {
        Self {
            name: name.to_string(),
            ty,
            has_default: false,
            description: None,
        }
    }

    /// A parameter with a default value is never required.
    #[must_use]
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    #[must_use]
    pub fn describe(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    fn is_required(&self) -> bool {
        !self.has_default && !matches!(self.ty, ParamType::Optional(_))
    }
}

/// Compiled `properties` + `required` for one parameter list.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledSchema {
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl CompiledSchema {
    /// Attach (or replace) a description on a top-level property.
    /// Returns `false` when no property has that name.
    pub fn set_description(&mut self, name: &str, description: &str) -> bool {
        match self.properties.get_mut(name).and_then(Value::as_object_mut) {
            Some(prop) => {
                prop.insert("description".to_string(), json!(description));
                true
            }
            None => false,
        }
    }

    /// The `parameters` block of a function tool.
    pub fn to_parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": self.properties,
            "required": self.required,
            "additionalProperties": false,
        })
    }
}

/// Compile a parameter list.
pub fn compile(params: &[Param]) -> Result<CompiledSchema, SchemaError> {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for param in params {
        let mut schema = compile_type(&param.name, &param.ty)?;
        if let (Some(desc), Some(obj)) = (&param.description, schema.as_object_mut()) {
            obj.insert("description".to_string(), json!(desc));
        }
        if properties.insert(param.name.clone(), schema).is_some() {
            return Err(SchemaError::DuplicateParam(param.name.clone()));
        }
        if param.is_required() {
            required.push(param.name.clone());
        }
    }
    Ok(CompiledSchema {
        properties,
        required,
    })
}

fn compile_type(param: &str, ty: &ParamType) -> Result<Value, SchemaError> {
    match ty {
        ParamType::Primitive(p) => Ok(json!({ "type": p.json_type() })),
        ParamType::Literal(values) => {
            let first = values.first().ok_or_else(|| SchemaError::EmptyLiteral {
                param: param.to_string(),
            })?;
            let kind = first.kind();
            if values.iter().any(|v| v.kind() != kind) {
                return Err(SchemaError::MixedLiteral {
                    param: param.to_string(),
                });
            }
            let values: Vec<Value> = values.iter().map(LiteralValue::to_json).collect();
            Ok(json!({ "type": kind.json_type(), "enum": values }))
        }
        ParamType::List(None) => Err(SchemaError::UntypedList {
            param: param.to_string(),
        }),
        ParamType::List(Some(item)) => Ok(json!({
            "type": "array",
            "items": compile_type(param, item)?,
        })),
        ParamType::Optional(inner) => compile_type(param, inner),
        ParamType::Object(fields) => {
            let nested = compile(fields)?;
            Ok(json!({
                "type": "object",
                "properties": nested.properties,
                "required": nested.required,
            }))
        }
        ParamType::Named(type_name) => Err(SchemaError::Unsupported {
            param: param.to_string(),
            type_name: type_name.clone(),
        }),
    }
}

/// Full function tool schema:
/// `{type: "function", function: {name, description, parameters}}`.
pub fn function_schema(name: &str, description: &str, schema: &CompiledSchema) -> ToolDefinition {
    ToolDefinition::function(name, description, schema.to_parameters())
}
