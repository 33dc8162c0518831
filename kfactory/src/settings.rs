//! Polymorphic settings values and deterministic cell naming.
//!
//! [`Value`] is the tagged sum behind cell `settings` and `info` maps and
//! behind parametric-factory arguments. Canonicalization makes values that
//! differ only in map ordering compare (and hash) equal, which the factory
//! cache relies on.

use arcstr::ArcStr;
use geometry::polygon::{DPolygon, Polygon};
use geometry::rect::{DRect, Rect};
use geometry::transform::{DCplxTrans, Trans};
use indexmap::IndexMap;

/// A recursive settings value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The absence of a value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer, typically a dbu quantity.
    Int(i64),
    /// A float, typically a micron quantity.
    Float(f64),
    /// A string.
    String(ArcStr),
    /// An ordered list of values.
    List(Vec<Value>),
    /// A string-keyed map of values.
    Map(IndexMap<ArcStr, Value>),
    /// A backend geometry object.
    Geometry(GeomValue),
}

/// A backend geometry object carried inside a [`Value`].
///
/// The tag string of each variant is the serialization discriminant.
#[derive(Debug, Clone, PartialEq)]
pub enum GeomValue {
    /// A dbu rectangle; tag `"box"`.
    Box(Rect),
    /// A micron rectangle; tag `"dbox"`.
    DBox(DRect),
    /// A dbu polygon; tag `"polygon"`.
    Polygon(Polygon),
    /// A micron polygon; tag `"dpolygon"`.
    DPolygon(DPolygon),
    /// A simple transformation; tag `"trans"`.
    Trans(Trans),
    /// A complex transformation; tag `"dcplxtrans"`.
    DCplxTrans(DCplxTrans),
}

impl GeomValue {
    /// The serialization discriminant of this geometry kind.
    pub const fn tag(&self) -> &'static str {
        match self {
            GeomValue::Box(_) => "box",
            GeomValue::DBox(_) => "dbox",
            GeomValue::Polygon(_) => "polygon",
            GeomValue::DPolygon(_) => "dpolygon",
            GeomValue::Trans(_) => "trans",
            GeomValue::DCplxTrans(_) => "dcplxtrans",
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.into())
    }
}

impl From<ArcStr> for Value {
    fn from(value: ArcStr) -> Self {
        Value::String(value)
    }
}

impl Value {
    /// Creates a list value from anything iterable.
    pub fn list(values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    /// Recursively canonicalizes the value.
    ///
    /// Maps are sorted by key so that values differing only in insertion
    /// order canonicalize identically. Lists keep their order.
    pub fn canonical(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::canonical).collect()),
            Value::Map(map) => {
                let mut entries: Vec<(ArcStr, Value)> = map
                    .iter()
                    .map(|(k, v)| (k.clone(), v.canonical()))
                    .collect();
                entries.sort_by(|a, b| a.0.cmp(&b.0));
                Value::Map(entries.into_iter().collect())
            }
            other => other.clone(),
        }
    }

    /// Converts to a JSON value for persistence and cache keying.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Float(f) => serde_json::json!(f),
            Value::String(s) => serde_json::Value::String(s.to_string()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.to_string(), v.to_json()))
                    .collect(),
            ),
            Value::Geometry(geom) => {
                let payload = match geom {
                    GeomValue::Box(v) => serde_json::to_value(v),
                    GeomValue::DBox(v) => serde_json::to_value(v),
                    GeomValue::Polygon(v) => serde_json::to_value(v),
                    GeomValue::DPolygon(v) => serde_json::to_value(v),
                    GeomValue::Trans(v) => serde_json::to_value(v),
                    GeomValue::DCplxTrans(v) => serde_json::to_value(v),
                }
                .expect("geometry serializes");
                serde_json::json!({ "$geom": geom.tag(), "value": payload })
            }
        }
    }

    /// Reconstructs a value from its JSON form.
    pub fn from_json(json: &serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s.as_str().into()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                if let (Some(serde_json::Value::String(tag)), Some(payload)) =
                    (map.get("$geom"), map.get("value"))
                {
                    if let Some(geom) = geom_from_json(tag, payload) {
                        return Value::Geometry(geom);
                    }
                }
                Value::Map(
                    map.iter()
                        .map(|(k, v)| (ArcStr::from(k.as_str()), Value::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn geom_from_json(tag: &str, payload: &serde_json::Value) -> Option<GeomValue> {
    match tag {
        "box" => serde_json::from_value(payload.clone()).ok().map(GeomValue::Box),
        "dbox" => serde_json::from_value(payload.clone()).ok().map(GeomValue::DBox),
        "polygon" => serde_json::from_value(payload.clone())
            .ok()
            .map(GeomValue::Polygon),
        "dpolygon" => serde_json::from_value(payload.clone())
            .ok()
            .map(GeomValue::DPolygon),
        "trans" => serde_json::from_value(payload.clone()).ok().map(GeomValue::Trans),
        "dcplxtrans" => serde_json::from_value(payload.clone())
            .ok()
            .map(GeomValue::DCplxTrans),
        _ => None,
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "None"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, ")")
            }
            Value::Map(map) => {
                write!(f, "{{")?;
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
            Value::Geometry(geom) => write!(f, "{}", geom.tag()),
        }
    }
}

/// Builds a deterministic name fragment from a parameter map.
///
/// Every entry contributes the upper-cased initials of its key joined with
/// the cleaned value, e.g. `taper_length: 10.0` becomes `TL10`.
pub fn dict2name(prefix: Option<&str>, params: &IndexMap<ArcStr, Value>) -> String {
    let mut label: Vec<String> = prefix.map(|p| p.to_string()).into_iter().collect();
    for (key, value) in params {
        label.push(format!(
            "{}{}",
            join_first_letters(key).to_uppercase(),
            clean_value(value)
        ));
    }
    clean_name(&label.join("_"))
}

/// The auto-generated name of a parametric cell.
pub fn get_component_name(component_type: &str, params: &IndexMap<ArcStr, Value>) -> String {
    if params.is_empty() {
        component_type.to_string()
    } else {
        format!("{}_{}", component_type, dict2name(None, params))
    }
}

/// Joins the first letter of each underscore-separated word
/// (`taper_length` becomes `tl`).
fn join_first_letters(name: &str) -> String {
    name.split('_')
        .filter_map(|part| part.chars().next())
        .collect()
}

/// Renders a value into name-safe text.
///
/// Floats below 1 become their nanometer integer; larger floats render
/// with up to four decimals, `.` replaced by `p` and trailing zeros
/// stripped.
pub fn clean_value(value: &Value) -> String {
    match value {
        Value::Int(i) => i.to_string(),
        Value::Float(x) => {
            if x.abs() < 1. && *x != 0. {
                format!("{}", (x * 1000.).round() as i64)
            } else {
                let formatted = format!("{x:.4}").replace('.', "p");
                let trimmed = formatted.trim_end_matches('0').trim_end_matches('p');
                clean_name(trimmed)
            }
        }
        Value::List(items) => items
            .iter()
            .map(clean_value)
            .collect::<Vec<_>>()
            .join("_"),
        Value::Map(map) => dict2name(None, map),
        Value::String(s) => clean_name(s),
        Value::Bool(b) => b.to_string(),
        Value::Null => "None".to_string(),
        Value::Geometry(geom) => geom.tag().to_string(),
    }
}

/// Restricts a name to layout-safe characters via a fixed replacement
/// table.
pub fn clean_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '=' | '(' | ')' | '[' | ']' | '{' | '}' => None,
            ',' | ':' | ' ' => Some('_'),
            '-' => Some('m'),
            '.' => Some('p'),
            other => Some(other),
        })
        .collect()
}
