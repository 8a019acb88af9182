//! Flat named-option construction for materials and elements
//!
//! Parameter structs derive `Deserialize` with `#[serde(default,
//! deny_unknown_fields)]`, so a flat `name -> value` list can be turned into
//! a fully populated struct with documented defaults for anything missing.

use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};

use crate::error::{FEAError, FEAResult};

/// Build a typed parameter struct from `(name, value)` pairs
///
/// Integral values are passed as integers so that count-like fields
/// (e.g. number of layers) accept them. A repeated name keeps the last value.
///
/// ```
/// use fea_engine::materials::FiberParams;
/// use fea_engine::options::from_options;
///
/// let params: FiberParams = from_options(&[("E", 200.0e3), ("fy", 250.0)]).unwrap();
/// assert_eq!(params.fy, 250.0);
/// assert_eq!(params.hardening, 0.0);
/// ```
pub fn from_options<T: DeserializeOwned>(options: &[(&str, f64)]) -> FEAResult<T> {
    let mut map = Map::new();
    for &(name, value) in options {
        map.insert(name.to_string(), to_number(name, value)?);
    }
    serde_json::from_value(Value::Object(map))
        .map_err(|e| FEAError::InvalidInput(format!("option list: {}", e)))
}

fn to_number(name: &str, value: f64) -> FEAResult<Value> {
    if value.fract() == 0.0 && value >= 0.0 && value < 9.0e15 {
        return Ok(Value::Number(Number::from(value as u64)));
    }
    Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| FEAError::InvalidInput(format!("option {} has non-finite value", name)))
}
