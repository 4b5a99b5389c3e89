//! Flattens a nested dynamically-typed value into flat `(key, f32)` pairs,
//! the way a streaming host's tuple would be converted into a sparse
//! feature vector before hitting any of the engines in this crate.

use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// A boundary value: either a numeric/string/bool leaf, a map keyed by
/// field name, or an ordered sequence. `Map` uses `BTreeMap` purely so
/// tests can assert on one fixed flattening; callers must still treat
/// flattening output order as unspecified.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Map(BTreeMap<String, Value>),
    Array(Vec<Value>),
}

const SEP: char = '\u{0}';

/// Flattens `value` into `(flat_key, f32)` pairs via `emit`. Map keys and
/// array indices are joined by a NUL separator. Leaves that cannot convert
/// to a number fail with [`Error::TypeError`] naming the offending path.
pub fn flatten(value: &Value, emit: &mut impl FnMut(String, f32)) -> Result<()> {
    flatten_impl(value, String::new(), emit)
}

fn flatten_impl(value: &Value, prefix: String, emit: &mut impl FnMut(String, f32)) -> Result<()> {
    match value {
        Value::Map(fields) => {
            for (key, v) in fields {
                let next = join(&prefix, key);
                flatten_impl(v, next, emit)?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                let next = join(&prefix, &i.to_string());
                flatten_impl(v, next, emit)?;
            }
            Ok(())
        }
        Value::Int(n) => {
            emit(prefix, *n as f32);
            Ok(())
        }
        Value::Float(f) => {
            emit(prefix, *f as f32);
            Ok(())
        }
        Value::Bool(b) => {
            emit(prefix, if *b { 1.0 } else { 0.0 });
            Ok(())
        }
        Value::String(_) => Err(Error::TypeError(prefix)),
    }
}

fn join(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        let mut s = String::with_capacity(prefix.len() + 1 + field.len());
        s.push_str(prefix);
        s.push(SEP);
        s.push_str(field);
        s
    }
}
