//! Declarative parameter specs and argument validation.
//!
//! A tool declares its parameters as an ordered list of [`ParamSpec`]s. The
//! same list drives the advertised JSON `inputSchema` and [`validate`], so
//! the schema a caller sees and the checks it is held to never drift apart.

use serde_json::{json, Map, Value};

use crate::client::ChannelContext;
use crate::error::ToolError;

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    String,
    Integer { min: i64, max: i64 },
    Boolean,
    Enum(&'static [&'static str]),
    /// Array of objects, each checked against the nested field specs.
    ArrayOfObject(Vec<ParamSpec>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
    pub required: bool,
    pub default: Option<Value>,
    pub description: &'static str,
}

impl ParamSpec {
    fn new(name: &'static str, kind: ParamKind, description: &'static str) -> Self {
        Self {
            name,
            kind,
            required: false,
            default: None,
            description,
        }
    }

    pub fn string(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::String, description)
    }

    pub fn integer(name: &'static str, min: i64, max: i64, description: &'static str) -> Self {
        Self::new(name, ParamKind::Integer { min, max }, description)
    }

    pub fn boolean(name: &'static str, description: &'static str) -> Self {
        Self::new(name, ParamKind::Boolean, description)
    }

    pub fn one_of(
        name: &'static str,
        values: &'static [&'static str],
        description: &'static str,
    ) -> Self {
        Self::new(name, ParamKind::Enum(values), description)
    }

    pub fn objects(name: &'static str, fields: Vec<ParamSpec>, description: &'static str) -> Self {
        Self::new(name, ParamKind::ArrayOfObject(fields), description)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// JSON Schema fragment for this parameter.
    pub fn schema(&self) -> Value {
        let mut schema = match &self.kind {
            ParamKind::String => json!({ "type": "string" }),
            ParamKind::Integer { min, max } => {
                json!({ "type": "integer", "minimum": min, "maximum": max })
            }
            ParamKind::Boolean => json!({ "type": "boolean" }),
            ParamKind::Enum(values) => json!({ "type": "string", "enum": values }),
            ParamKind::ArrayOfObject(fields) => json!({
                "type": "array",
                "items": object_schema(fields),
            }),
        };
        if let Some(obj) = schema.as_object_mut() {
            if !self.description.is_empty() {
                obj.insert("description".into(), self.description.into());
            }
            if let Some(default) = &self.default {
                obj.insert("default".into(), default.clone());
            }
        }
        schema
    }

    fn expected(&self) -> String {
        match &self.kind {
            ParamKind::String => "a string".to_string(),
            ParamKind::Integer { min, max } => format!("an integer between {min} and {max}"),
            ParamKind::Boolean => "a boolean".to_string(),
            ParamKind::Enum(values) => format!("one of {}", values.join(", ")),
            ParamKind::ArrayOfObject(_) => "a non-empty array of objects".to_string(),
        }
    }
}

/// `{"type":"object","properties":{...},"required":[...]}` for `params`.
pub fn object_schema(params: &[ParamSpec]) -> Value {
    let properties: Map<String, Value> = params
        .iter()
        .map(|p| (p.name.to_string(), p.schema()))
        .collect();
    let required: Vec<&str> = params.iter().filter(|p| p.required).map(|p| p.name).collect();
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// `pool_name` → `poolName`.
pub fn camel_case(snake: &str) -> String {
    let mut out = String::with_capacity(snake.len());
    let mut upper = false;
    for c in snake.chars() {
        if c == '_' {
            upper = !out.is_empty();
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// Arguments that passed validation, keyed by canonical snake_case name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolArgs {
    values: Map<String, Value>,
}

impl ToolArgs {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn str(&self, name: &str) -> Result<&str, ToolError> {
        self.opt_str(name).ok_or_else(|| ToolError::missing(name))
    }

    pub fn opt_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(Value::as_str)
    }

    pub fn int(&self, name: &str) -> Result<i64, ToolError> {
        self.values
            .get(name)
            .and_then(Value::as_i64)
            .ok_or_else(|| ToolError::missing(name))
    }

    pub fn port(&self, name: &str) -> Result<u16, ToolError> {
        let raw = self.int(name)?;
        u16::try_from(raw).map_err(|_| {
            ToolError::validation(format!("parameter '{name}' must be a TCP/UDP port, got {raw}"))
        })
    }

    pub fn flag(&self, name: &str) -> bool {
        self.values
            .get(name)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Validated objects of an `ArrayOfObject` parameter.
    pub fn objects(&self, name: &str) -> Vec<ToolArgs> {
        self.values
            .get(name)
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_object)
                    .map(|obj| ToolArgs {
                        values: obj.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Device address and credentials for this call.
    pub fn channel(&self) -> Result<ChannelContext, ToolError> {
        Ok(ChannelContext::new(
            self.str("f5_url")?,
            self.str("f5_username")?,
            self.str("f5_password")?,
        ))
    }
}

/// Check `raw` against `params`, applying defaults and camelCase aliases.
pub fn validate(params: &[ParamSpec], raw: &Value) -> Result<ToolArgs, ToolError> {
    let empty = Map::new();
    let input = match raw {
        Value::Object(map) => map,
        Value::Null => &empty,
        _ => return Err(ToolError::validation("arguments must be a JSON object")),
    };
    validate_object(params, input, "").map(|values| ToolArgs { values })
}

fn validate_object(
    params: &[ParamSpec],
    input: &Map<String, Value>,
    prefix: &str,
) -> Result<Map<String, Value>, ToolError> {
    let mut out = Map::new();
    for spec in params {
        let label = format!("{prefix}{}", spec.name);
        let supplied = input
            .get(spec.name)
            .or_else(|| input.get(&camel_case(spec.name)))
            .filter(|v| !v.is_null());

        let value = match supplied {
            Some(v) => check(spec, v, &label)?,
            None if spec.required => return Err(ToolError::missing(&label)),
            None => match &spec.default {
                Some(d) => d.clone(),
                None => continue,
            },
        };
        out.insert(spec.name.to_string(), value);
    }
    Ok(out)
}

fn check(spec: &ParamSpec, value: &Value, label: &str) -> Result<Value, ToolError> {
    let wrong = || {
        ToolError::validation(format!(
            "parameter '{label}' must be {}, got {}",
            spec.expected(),
            short(value)
        ))
    };

    match &spec.kind {
        ParamKind::String => match value {
            Value::String(s) if s.trim().is_empty() && spec.required => {
                Err(ToolError::missing(label))
            }
            Value::String(_) => Ok(value.clone()),
            // Ports and ids arrive as numbers from some clients
            Value::Number(n) => Ok(Value::String(n.to_string())),
            _ => Err(wrong()),
        },
        ParamKind::Integer { min, max } => {
            let n = match value {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            }
            .ok_or_else(wrong)?;
            if (*min..=*max).contains(&n) {
                Ok(Value::from(n))
            } else {
                Err(wrong())
            }
        }
        ParamKind::Boolean => match value {
            Value::Bool(_) => Ok(value.clone()),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(Value::Bool(true)),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(Value::Bool(false)),
            _ => Err(wrong()),
        },
        ParamKind::Enum(values) => match value.as_str() {
            Some(s) if values.contains(&s) => Ok(value.clone()),
            _ => Err(wrong()),
        },
        ParamKind::ArrayOfObject(fields) => {
            let items = value.as_array().ok_or_else(wrong)?;
            if items.is_empty() && spec.required {
                return Err(wrong());
            }
            let mut checked = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                let obj = item.as_object().ok_or_else(|| {
                    ToolError::validation(format!("parameter '{label}[{i}]' must be an object"))
                })?;
                let prefix = format!("{label}[{i}].");
                checked.push(Value::Object(validate_object(fields, obj, &prefix)?));
            }
            Ok(Value::Array(checked))
        }
    }
}

fn short(value: &Value) -> String {
    let s = value.to_string();
    match s.char_indices().nth(40) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s,
    }
}

/// Lexical ISO-8601 check: `YYYY-MM-DDTHH:MM:SS`, optional fraction, optional
/// `Z` or `±HH:MM` zone.
pub fn check_timestamp(name: &str, value: &str) -> Result<(), ToolError> {
    if is_timestamp(value) {
        Ok(())
    } else {
        Err(ToolError::validation(format!(
            "parameter '{name}' must be an ISO-8601 timestamp like 2024-06-01T10:00:00, got '{value}'"
        )))
    }
}

fn is_timestamp(s: &str) -> bool {
    let b = s.as_bytes();
    if b.len() < 19 {
        return false;
    }
    let digits = |range: std::ops::Range<usize>| b[range].iter().all(u8::is_ascii_digit);
    let base_ok = digits(0..4)
        && b[4] == b'-'
        && digits(5..7)
        && b[7] == b'-'
        && digits(8..10)
        && (b[10] == b'T' || b[10] == b' ')
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19);
    if !base_ok {
        return false;
    }

    let mut rest = &b[19..];
    if let Some(frac) = rest.strip_prefix(b".") {
        let n = frac.iter().take_while(|c| c.is_ascii_digit()).count();
        if n == 0 {
            return false;
        }
        rest = &frac[n..];
    }
    match rest {
        [] | [b'Z'] => true,
        [sign, h1, h2, b':', m1, m2] if matches!(*sign, b'+' | b'-') => {
            [h1, h2, m1, m2].iter().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}
