//! Named lambdas and the registry that resolves them
//!
//! A closure has no meaning outside the process that created it. Steps
//! therefore capture lambdas by name: the name is what travels with a job, and
//! every worker resolves it against a `LambdaRegistry` built from the same
//! code.

use serde_json::{Number, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Prefix of the parametric property accessor, e.g. `property:age`
pub const PROPERTY_PREFIX: &str = "property:";

/// Type alias for the function a lambda wraps
pub type LambdaFunction = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// A named, shareable function over JSON values
#[derive(Clone)]
pub struct Lambda {
    name: String,
    function: LambdaFunction,
}

impl Lambda {
    pub fn new<F>(name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&Value) -> Value + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, input: &Value) -> Value {
        (self.function)(input)
    }

    /// Whether both lambdas wrap the very same function
    pub fn same_function(&self, other: &Lambda) -> bool {
        Arc::ptr_eq(&self.function, &other.function)
    }
}

impl fmt::Debug for Lambda {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Lambda({})", self.name)
    }
}

/// Registry of lambdas shared by every execution context of a job
#[derive(Debug, Clone, Default)]
pub struct LambdaRegistry {
    lambdas: HashMap<String, Lambda>,
}

impl LambdaRegistry {
    /// An empty registry. `resolve` still understands `property:<name>`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-populated with the built-in lambdas
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Lambda::new("identity", |v| v.clone()));
        registry.register(Lambda::new("id", |v| v["id"].clone()));
        registry.register(Lambda::new("label", |v| v["label"].clone()));
        registry.register(Lambda::new("fold", |v| Value::Array(elements(v))));
        registry.register(Lambda::new("count", |v| Value::from(elements(v).len())));
        registry.register(Lambda::new("sum", sum));
        registry.register(Lambda::new("min", |v| extremum(v, |a, b| a < b)));
        registry.register(Lambda::new("max", |v| extremum(v, |a, b| a > b)));
        registry.register(Lambda::new("mean", mean));
        registry
    }

    /// Register a lambda, replacing any previous lambda of the same name
    pub fn register(&mut self, lambda: Lambda) {
        self.lambdas.insert(lambda.name().to_string(), lambda);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lambdas.contains_key(name) || name.starts_with(PROPERTY_PREFIX)
    }

    /// Look up a lambda by name
    pub fn resolve(&self, name: &str) -> Option<Lambda> {
        if let Some(lambda) = self.lambdas.get(name) {
            return Some(lambda.clone());
        }

        let property = name.strip_prefix(PROPERTY_PREFIX)?.to_string();
        Some(Lambda::new(name, move |v| {
            v["properties"][property.as_str()].clone()
        }))
    }
}

fn elements(value: &Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn sum(value: &Value) -> Value {
    let items = elements(value);
    let numbers: Vec<&Number> = items.iter().filter_map(Value::as_number).collect();

    let integers = numbers
        .iter()
        .try_fold(0i64, |total, n| n.as_i64().and_then(|n| total.checked_add(n)));

    // falls back to floating point for non-integers and on overflow
    if let Some(total) = integers {
        Value::from(total)
    } else {
        let total: f64 = numbers.iter().filter_map(|n| n.as_f64()).sum();
        Number::from_f64(total).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn mean(value: &Value) -> Value {
    let numbers: Vec<f64> = elements(value).iter().filter_map(Value::as_f64).collect();
    if numbers.is_empty() {
        return Value::Null;
    }
    let mean = numbers.iter().sum::<f64>() / numbers.len() as f64;
    Number::from_f64(mean).map(Value::Number).unwrap_or(Value::Null)
}

fn extremum(value: &Value, better: fn(f64, f64) -> bool) -> Value {
    elements(value)
        .into_iter()
        .filter(|v| v.is_number())
        .fold(None, |best: Option<Value>, candidate| match (&best, candidate.as_f64()) {
            (Some(current), Some(c)) if current.as_f64().is_some_and(|b| !better(c, b)) => best,
            (_, Some(_)) => Some(candidate),
            _ => best,
        })
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sum_keeps_integers() {
        let registry = LambdaRegistry::with_builtins();
        let sum = registry.resolve("sum").unwrap();

        assert_eq!(sum.apply(&json!([1, 2, 3])), json!(6));
        assert_eq!(sum.apply(&json!([1.5, 2])), json!(3.5));
        assert_eq!(sum.apply(&json!([])), json!(0));
    }

    #[test]
    fn test_sum_overflow_falls_back_to_float() {
        let registry = LambdaRegistry::with_builtins();
        let sum = registry.resolve("sum").unwrap();

        let total = sum.apply(&json!([i64::MAX, 1]));
        assert_eq!(total.as_f64(), Some(i64::MAX as f64 + 1.0));
        assert!(!total.is_i64());
        assert_eq!(sum.apply(&json!([i64::MIN, -1])).as_f64(), Some(i64::MIN as f64 - 1.0));
    }

    #[test]
    fn test_count_min_max_mean() {
        let registry = LambdaRegistry::with_builtins();
        let input = json!([4, 1, 9]);

        assert_eq!(registry.resolve("count").unwrap().apply(&input), json!(3));
        assert_eq!(registry.resolve("min").unwrap().apply(&input), json!(1));
        assert_eq!(registry.resolve("max").unwrap().apply(&input), json!(9));
        assert_eq!(
            registry.resolve("mean").unwrap().apply(&json!([1, 2])),
            json!(1.5)
        );
        assert_eq!(registry.resolve("max").unwrap().apply(&json!([])), Value::Null);
    }

    #[test]
    fn test_property_accessor() {
        let registry = LambdaRegistry::new();
        let age = registry.resolve("property:age").unwrap();
        let vertex = json!({"id": 1, "label": "person", "properties": {"age": 29}});

        assert_eq!(age.apply(&vertex), json!(29));
        assert_eq!(age.name(), "property:age");
        assert!(registry.contains("property:anything"));
    }

    #[test]
    fn test_unknown_lambda() {
        let registry = LambdaRegistry::with_builtins();
        assert!(registry.resolve("no-such-lambda").is_none());
    }

    #[test]
    fn test_resolve_returns_registered_function() {
        let mut registry = LambdaRegistry::new();
        let custom = Lambda::new("double", |v| json!(v.as_i64().unwrap_or(0) * 2));
        registry.register(custom.clone());

        let resolved = registry.resolve("double").unwrap();
        assert!(resolved.same_function(&custom));
        assert_eq!(resolved.apply(&json!(4)), json!(8));
    }
}
