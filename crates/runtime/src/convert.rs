//! Conversion between Lua values and plain data.
//!
//! Arguments and results cross the runtime boundary as `serde_json::Value`.
//! Tables become arrays when they are proper sequences and maps otherwise;
//! map keys are always coerced to text.

use mlua::prelude::*;
use serde_json::{Map, Number, Value};

/// Nesting limit for tables; self-referencing tables hit this instead of
/// recursing forever.
const MAX_DEPTH: usize = 64;

/// Convert a Lua value to plain data, stringifying all table keys.
pub fn lua_to_json(value: &LuaValue) -> LuaResult<Value> {
  to_json(value, 0)
}

fn to_json(value: &LuaValue, depth: usize) -> LuaResult<Value> {
  match value {
    LuaValue::Nil => Ok(Value::Null),
    LuaValue::LightUserData(ud) if ud.0.is_null() => Ok(Value::Null),
    LuaValue::Boolean(b) => Ok(Value::Bool(*b)),
    LuaValue::Integer(n) => Ok(Value::Number((*n).into())),
    LuaValue::Number(n) => Ok(Number::from_f64(*n).map(Value::Number).unwrap_or(Value::Null)),
    LuaValue::String(s) => Ok(Value::String(s.to_string_lossy())),
    LuaValue::Table(t) => {
      if depth >= MAX_DEPTH {
        return Err(LuaError::runtime("table nesting too deep to convert"));
      }
      table_to_json(t, depth + 1)
    }
    other => Err(LuaError::runtime(format!(
      "cannot convert a {} to data",
      other.type_name()
    ))),
  }
}

fn table_to_json(table: &LuaTable, depth: usize) -> LuaResult<Value> {
  let len = table.raw_len();
  let mut entries = 0;
  for pair in table.pairs::<LuaValue, LuaValue>() {
    pair?;
    entries += 1;
  }

  if len > 0 && entries == len {
    let mut items = Vec::with_capacity(len);
    for i in 1..=len {
      let item: LuaValue = table.raw_get(i)?;
      items.push(to_json(&item, depth)?);
    }
    return Ok(Value::Array(items));
  }

  let mut map = Map::new();
  for pair in table.pairs::<LuaValue, LuaValue>() {
    let (key, item) = pair?;
    map.insert(key_to_string(&key)?, to_json(&item, depth)?);
  }
  Ok(Value::Object(map))
}

fn key_to_string(key: &LuaValue) -> LuaResult<String> {
  match key {
    LuaValue::String(s) => Ok(s.to_string_lossy()),
    LuaValue::Integer(n) => Ok(n.to_string()),
    LuaValue::Number(n) => Ok(n.to_string()),
    LuaValue::Boolean(b) => Ok(b.to_string()),
    other => Err(LuaError::runtime(format!(
      "cannot use a {} as a map key",
      other.type_name()
    ))),
  }
}

/// Convert plain data to a Lua value.
///
/// `null` becomes `nil`, so a `null` inside an array leaves a hole in the
/// resulting sequence.
pub fn json_to_lua(lua: &Lua, value: &Value) -> LuaResult<LuaValue> {
  match value {
    Value::Null => Ok(LuaValue::Nil),
    Value::Bool(b) => Ok(LuaValue::Boolean(*b)),
    Value::Number(n) => match n.as_i64() {
      Some(i) => Ok(LuaValue::Integer(i)),
      None => Ok(LuaValue::Number(n.as_f64().unwrap_or(f64::NAN))),
    },
    Value::String(s) => Ok(LuaValue::String(lua.create_string(s)?)),
    Value::Array(items) => {
      let table = lua.create_table_with_capacity(items.len(), 0)?;
      for (i, item) in items.iter().enumerate() {
        table.raw_set(i + 1, json_to_lua(lua, item)?)?;
      }
      Ok(LuaValue::Table(table))
    }
    Value::Object(map) => {
      let table = lua.create_table_with_capacity(0, map.len())?;
      for (key, item) in map {
        table.raw_set(key.as_str(), json_to_lua(lua, item)?)?;
      }
      Ok(LuaValue::Table(table))
    }
  }
}

/// Short description of a value's shape, for error messages.
pub fn describe(value: &Value) -> String {
  match value {
    Value::Null => "null".to_string(),
    Value::Bool(_) => "a boolean".to_string(),
    Value::Number(_) => "a number".to_string(),
    Value::String(_) => "a string".to_string(),
    Value::Array(items) => format!("an array of {}", items.len()),
    Value::Object(map) => format!("a map of {}", map.len()),
  }
}
