//! Bidirectional translation between host values and the FEEL value model.
//!
//! The host domain is `serde_json::Value`. Mappers form an ordered chain:
//! each returns `Option` and the first `Some` wins, with [`DefaultMapper`]
//! sitting last to cover the primitive cases. Embedders prepend their own
//! mappers to add custom conversions.

use std::sync::Arc;

use rust_decimal::prelude::ToPrimitive;

use crate::eval::Value;

/// A pluggable host-value conversion.
///
/// Both directions receive the whole chain so that mappers can recurse
/// through it for nested lists and contexts. Returning `None` falls through
/// to the next mapper in the chain.
pub trait ValueMapper: Send + Sync {
    /// Convert a host value to an internal value.
    fn to_value(&self, chain: &MapperChain, host: &serde_json::Value) -> Option<Value>;

    /// Convert an internal value back to a host value.
    fn from_value(&self, chain: &MapperChain, value: &Value) -> Option<serde_json::Value>;
}

/// An ordered list of mappers; first `Some` wins.
#[derive(Clone)]
pub struct MapperChain {
    mappers: Vec<Arc<dyn ValueMapper>>,
}

impl Default for MapperChain {
    fn default() -> Self {
        Self {
            mappers: vec![Arc::new(DefaultMapper)],
        }
    }
}

impl MapperChain {
    /// Insert a mapper ahead of the existing ones.
    pub fn prepend(&mut self, mapper: Arc<dyn ValueMapper>) {
        self.mappers.insert(0, mapper);
    }

    /// Convert a host value, falling back to Null when no mapper answers.
    pub fn to_value(&self, host: &serde_json::Value) -> Value {
        self.mappers
            .iter()
            .find_map(|m| m.to_value(self, host))
            .unwrap_or(Value::Null)
    }

    /// Convert an internal value, falling back to JSON null when no mapper
    /// answers (ranges, functions, and errors have no host form).
    pub fn from_value(&self, value: &Value) -> serde_json::Value {
        self.mappers
            .iter()
            .find_map(|m| m.from_value(self, value))
            .unwrap_or(serde_json::Value::Null)
    }
}

/// The fallback mapper: booleans, numbers, strings, arrays, objects, and the
/// ISO string forms of the temporal kinds.
pub struct DefaultMapper;

impl ValueMapper for DefaultMapper {
    fn to_value(&self, chain: &MapperChain, host: &serde_json::Value) -> Option<Value> {
        Some(match host {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            // Going through the decimal string form keeps `0.1` exact instead
            // of inheriting the f64 representation.
            serde_json::Value::Number(n) => {
                let repr = n.to_string();
                let decimal = repr
                    .parse()
                    .or_else(|_| rust_decimal::Decimal::from_scientific(&repr))
                    .ok()?;
                Value::Number(decimal)
            }
            serde_json::Value::String(s) => Value::string(s.as_str()),
            serde_json::Value::Array(items) => {
                Value::list(items.iter().map(|item| chain.to_value(item)))
            }
            serde_json::Value::Object(entries) => Value::context(
                entries
                    .iter()
                    .map(|(name, value)| (name.clone(), chain.to_value(value))),
            ),
        })
    }

    fn from_value(&self, chain: &MapperChain, value: &Value) -> Option<serde_json::Value> {
        Some(match value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(d) => {
                if d.is_integer() {
                    match d.to_i64() {
                        Some(i) => serde_json::Value::Number(i.into()),
                        None => serde_json::Value::String(d.normalize().to_string()),
                    }
                } else {
                    match d.to_f64().and_then(serde_json::Number::from_f64) {
                        Some(n) => serde_json::Value::Number(n),
                        None => serde_json::Value::String(d.normalize().to_string()),
                    }
                }
            }
            Value::String(s) => serde_json::Value::String(s.to_string()),
            // Temporal kinds render to their ISO literal forms.
            v @ (Value::Date(_)
            | Value::LocalTime(_)
            | Value::ZonedTime(..)
            | Value::LocalDateTime(_)
            | Value::ZonedDateTime(_)
            | Value::YearMonthDuration(_)
            | Value::DayTimeDuration(_)) => serde_json::Value::String(v.to_string()),
            Value::List(items) => serde_json::Value::Array(
                items.iter().map(|item| chain.from_value(item)).collect(),
            ),
            Value::Context(ctx) => serde_json::Value::Object(
                ctx.iter()
                    .map(|(name, value)| (name.clone(), chain.from_value(value)))
                    .collect(),
            ),
            Value::Range(_) | Value::Function(_) | Value::Error(_) => return None,
        })
    }
}
