//! Typed reading and writing of JSON values.
//!
//! Every decode carries the field path it is reading, so a type error in a
//! large document points at the exact property, e.g.
//! `meshes[0].primitives[1].indices`.

use glaze_core::{CodecError, Extensions, NamedEnum, NumericEnum, Result, TypeMismatch, Unknown};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// JSON type name of a value, for error messages.
pub fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// `parent.key`, or `key` at the root.
pub fn field_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

/// `parent[index]`.
pub fn index_path(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

/// Build a type-mismatch error for `value` at `path`.
pub fn mismatch(path: &str, expected: &str, value: &Value) -> CodecError {
    CodecError::TypeMismatch(TypeMismatch {
        path: path.to_string(),
        expected: expected.to_string(),
        actual: kind_of(value).to_string(),
    })
}

/// Decoding from a JSON value.
pub trait FromJson: Sized {
    fn from_json(value: &Value, path: &str) -> Result<Self>;
}

/// Encoding into a JSON value.
pub trait ToJson {
    fn to_json(&self) -> Value;
}

impl FromJson for bool {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        value.as_bool().ok_or_else(|| mismatch(path, "boolean", value))
    }
}

impl FromJson for String {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| mismatch(path, "string", value))
    }
}

impl FromJson for Value {
    fn from_json(value: &Value, _path: &str) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromJson for f64 {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        value.as_f64().ok_or_else(|| mismatch(path, "number", value))
    }
}

impl FromJson for f32 {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        f64::from_json(value, path).map(|v| v as f32)
    }
}

impl FromJson for usize {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        if let Some(n) = value.as_u64() {
            return usize::try_from(n)
                .map_err(|_| CodecError::invalid(path, format!("{n} does not fit in usize")));
        }
        // Some writers emit integers as `3.0`.
        match value.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as usize),
            _ => Err(mismatch(path, "non-negative integer", value)),
        }
    }
}

impl FromJson for u32 {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        let n = usize::from_json(value, path)?;
        u32::try_from(n).map_err(|_| CodecError::invalid(path, format!("{n} does not fit in u32")))
    }
}

impl<T: FromJson> FromJson for Vec<T> {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        let items = value.as_array().ok_or_else(|| mismatch(path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| T::from_json(item, &index_path(path, i)))
            .collect()
    }
}

impl<const N: usize> FromJson for [f32; N] {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        let items = Vec::<f32>::from_json(value, path)?;
        let len = items.len();
        items
            .try_into()
            .map_err(|_| CodecError::invalid(path, format!("expected {N} numbers, found {len}")))
    }
}

impl<T: FromJson> FromJson for IndexMap<String, T> {
    fn from_json(value: &Value, path: &str) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| mismatch(path, "object", value))?;
        map.iter()
            .map(|(k, v)| Ok((k.clone(), T::from_json(v, &field_path(path, k))?)))
            .collect()
    }
}

impl ToJson for bool {
    fn to_json(&self) -> Value {
        Value::Bool(*self)
    }
}

impl ToJson for String {
    fn to_json(&self) -> Value {
        Value::String(self.clone())
    }
}

impl ToJson for str {
    fn to_json(&self) -> Value {
        Value::from(self)
    }
}

impl ToJson for Value {
    fn to_json(&self) -> Value {
        self.clone()
    }
}

impl ToJson for f64 {
    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl ToJson for f32 {
    /// Written with the shortest representation that reads back as the same
    /// `f32`, so `0.1` stays `0.1` instead of `0.10000000149011612`.
    fn to_json(&self) -> Value {
        self.to_string()
            .parse::<f64>()
            .map_or(Value::Null, Value::from)
    }
}

impl ToJson for usize {
    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl ToJson for u32 {
    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl<T: ToJson> ToJson for Vec<T> {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

impl<T: ToJson> ToJson for [T] {
    fn to_json(&self) -> Value {
        Value::Array(self.iter().map(ToJson::to_json).collect())
    }
}

impl<const N: usize> ToJson for [f32; N] {
    fn to_json(&self) -> Value {
        self.as_slice().to_json()
    }
}

impl<T: ToJson> ToJson for IndexMap<String, T> {
    fn to_json(&self) -> Value {
        Value::Object(self.iter().map(|(k, v)| (k.clone(), v.to_json())).collect())
    }
}

/// One decoder in a union: a label and the function that tries it.
pub type UnionArm<'d, T> = (&'static str, &'d dyn Fn(&Value, &str) -> Result<T>);

/// Try each decoder in order and return the first success.
///
/// When every arm fails the error lists each arm with its failure reason.
pub fn decode_union<T>(value: &Value, path: &str, arms: &[UnionArm<'_, T>]) -> Result<T> {
    let mut attempts = Vec::with_capacity(arms.len());
    for (label, decode) in arms {
        match decode(value, path) {
            Ok(decoded) => return Ok(decoded),
            Err(err) => attempts.push(format!("{label}: {err}")),
        }
    }
    Err(CodecError::UnionMismatch {
        path: path.to_string(),
        attempts,
    })
}

/// Accept only JSON `null`.
pub fn decode_null(value: &Value, path: &str) -> Result<()> {
    if value.is_null() {
        Ok(())
    } else {
        Err(mismatch(path, "null", value))
    }
}

/// Reads the fields of one JSON object and remembers which keys were used.
///
/// A `null` field is treated as absent, except for `extras`.
pub struct ObjectReader<'a> {
    map: &'a Map<String, Value>,
    path: String,
    consumed: Vec<&'static str>,
}

impl<'a> ObjectReader<'a> {
    pub fn new(value: &'a Value, path: &str) -> Result<Self> {
        let map = value.as_object().ok_or_else(|| mismatch(path, "object", value))?;
        Ok(Self {
            map,
            path: path.to_string(),
            consumed: Vec::new(),
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn field_path(&self, key: &str) -> String {
        field_path(&self.path, key)
    }

    /// Raw value of `key`, including `null`.
    pub fn raw(&mut self, key: &'static str) -> Option<&'a Value> {
        self.consumed.push(key);
        self.map.get(key)
    }

    fn take(&mut self, key: &'static str) -> Option<&'a Value> {
        self.raw(key).filter(|v| !v.is_null())
    }

    pub fn required<T: FromJson>(&mut self, key: &'static str) -> Result<T> {
        self.required_with(key, T::from_json)
    }

    pub fn optional<T: FromJson>(&mut self, key: &'static str) -> Result<Option<T>> {
        self.optional_with(key, T::from_json)
    }

    /// Field value, or `default` when absent.
    pub fn or<T: FromJson>(&mut self, key: &'static str, default: T) -> Result<T> {
        Ok(self.optional(key)?.unwrap_or(default))
    }

    /// Homogeneous array; absent means empty.
    pub fn list<T: FromJson>(&mut self, key: &'static str) -> Result<Vec<T>> {
        Ok(self.optional(key)?.unwrap_or_default())
    }

    pub fn required_with<T>(
        &mut self,
        key: &'static str,
        decode: impl FnOnce(&'a Value, &str) -> Result<T>,
    ) -> Result<T> {
        let path = self.field_path(key);
        match self.take(key) {
            Some(value) => decode(value, &path),
            None => Err(CodecError::MissingField { path }),
        }
    }

    pub fn optional_with<T>(
        &mut self,
        key: &'static str,
        decode: impl FnOnce(&'a Value, &str) -> Result<T>,
    ) -> Result<Option<T>> {
        let path = self.field_path(key);
        self.take(key).map(|value| decode(value, &path)).transpose()
    }

    /// Array whose items need a custom decoder; absent means empty.
    ///
    /// The decoder receives each item, its path and its index.
    pub fn list_with<T>(
        &mut self,
        key: &'static str,
        mut decode: impl FnMut(&'a Value, &str, usize) -> Result<T>,
    ) -> Result<Vec<T>> {
        let path = self.field_path(key);
        let Some(value) = self.take(key) else {
            return Ok(Vec::new());
        };
        let items = value.as_array().ok_or_else(|| mismatch(&path, "array", value))?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| decode(item, &index_path(&path, i), i))
            .collect()
    }

    pub fn numeric<T: NumericEnum>(&mut self, key: &'static str) -> Result<Option<T>> {
        self.optional_with(key, |value, path| {
            let code = u32::from_json(value, path)?;
            T::from_code(code)
                .ok_or_else(|| CodecError::invalid(path, format!("unknown {} {code}", T::KIND)))
        })
    }

    pub fn named<T: NamedEnum>(&mut self, key: &'static str) -> Result<Option<T>> {
        self.optional_with(key, |value, path| {
            let name = value.as_str().ok_or_else(|| mismatch(path, "string", value))?;
            T::from_name(name)
                .ok_or_else(|| CodecError::invalid(path, format!("unknown {} `{name}`", T::KIND)))
        })
    }

    pub fn extensions(&mut self) -> Result<Extensions> {
        Ok(self.optional::<Extensions>("extensions")?.unwrap_or_default())
    }

    /// `extras` as written, keeping an explicit `null`.
    pub fn extras(&mut self) -> Option<Value> {
        self.raw("extras").cloned()
    }

    /// Every key that was never read, in document order.
    pub fn finish(self) -> Unknown {
        self.map
            .iter()
            .filter(|(k, _)| !self.consumed.iter().any(|c| *c == k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

/// Builds one JSON object, skipping absent and default values.
#[derive(Debug, Default)]
pub struct ObjectWriter {
    map: Map<String, Value>,
}

impl ObjectWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put<T: ToJson + ?Sized>(&mut self, key: &str, value: &T) -> &mut Self {
        self.map.insert(key.to_string(), value.to_json());
        self
    }

    pub fn value(&mut self, key: &str, value: Value) -> &mut Self {
        self.map.insert(key.to_string(), value);
        self
    }

    pub fn opt<T: ToJson>(&mut self, key: &str, value: &Option<T>) -> &mut Self {
        if let Some(v) = value {
            self.put(key, v);
        }
        self
    }

    /// Array, omitted when empty.
    pub fn list<T: ToJson>(&mut self, key: &str, values: &[T]) -> &mut Self {
        if !values.is_empty() {
            self.put(key, values);
        }
        self
    }

    /// Pre-encoded array, omitted when empty.
    pub fn value_list(&mut self, key: &str, values: impl IntoIterator<Item = Value>) -> &mut Self {
        let items: Vec<Value> = values.into_iter().collect();
        if !items.is_empty() {
            self.value(key, Value::Array(items));
        }
        self
    }

    /// Value, omitted when equal to the schema default.
    pub fn non_default<T: ToJson + PartialEq>(&mut self, key: &str, value: &T, default: &T) -> &mut Self {
        if value != default {
            self.put(key, value);
        }
        self
    }

    pub fn numeric<T: NumericEnum>(&mut self, key: &str, value: T) -> &mut Self {
        self.value(key, Value::from(value.code()))
    }

    pub fn named<T: NamedEnum>(&mut self, key: &str, value: T) -> &mut Self {
        self.value(key, Value::from(value.name()))
    }

    pub fn extensions(&mut self, extensions: &Extensions) -> &mut Self {
        if !extensions.is_empty() {
            self.put("extensions", extensions);
        }
        self
    }

    pub fn extras(&mut self, extras: &Option<Value>) -> &mut Self {
        self.opt("extras", extras)
    }

    /// Re-emit keys outside the schema. Keys already written win.
    pub fn unknown(&mut self, unknown: &Unknown) -> &mut Self {
        for (k, v) in unknown {
            if !self.map.contains_key(k) {
                self.map.insert(k.clone(), v.clone());
            }
        }
        self
    }

    pub fn finish(&mut self) -> Value {
        Value::Object(std::mem::take(&mut self.map))
    }
}
