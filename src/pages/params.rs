//! Path placeholders and parameter combinations.
//!
//! A page's file path may carry named placeholders in braces, e.g.
//! `/pages/blog/{slug}.rs`. Before rendering, every placeholder is resolved
//! to concrete string values by expanding the [`ParamSpec`] the page's
//! parameter hook returns. A spec maps each parameter name to either a flat
//! value list or a `{values, children}` record whose children may depend on
//! the parent value; expansion is the cartesian product across names.

use super::PageError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One concrete assignment of parameter names to values.
pub type ParamMap = BTreeMap<String, String>;

/// Child parameters of a nested spec entry: either a literal spec, or a
/// function of the parent value.
#[derive(Clone)]
pub enum ParamChildren {
    Spec(ParamSpec),
    Fn(Arc<dyn Fn(&str) -> ParamSpec + Send + Sync>),
}

/// Values for a single parameter name.
#[derive(Clone)]
pub enum ParamValues {
    /// A flat list of values.
    List(Vec<Value>),
    /// Values with dependent sub-parameters.
    Nested {
        values: Vec<Value>,
        children: ParamChildren,
    },
}

/// Declarative parameter specification returned by a page's parameter hook.
///
/// Entries keep insertion order so expansion is deterministic for a fixed
/// input.
#[derive(Clone, Default)]
pub struct ParamSpec {
    entries: Vec<(String, ParamValues)>,
}

impl ParamSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a flat value list for `name`.
    pub fn values<V>(mut self, name: impl Into<String>, values: V) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.entries.push((name.into(), ParamValues::List(values)));
        self
    }

    /// Add values with a dependent child spec.
    pub fn nested<V>(mut self, name: impl Into<String>, values: V, children: ParamChildren) -> Self
    where
        V: IntoIterator,
        V::Item: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.entries
            .push((name.into(), ParamValues::Nested { values, children }));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Extract placeholder names from a path segment, left to right.
///
/// `{a}-{b}` yields `["a", "b"]`. An opening brace without a closing brace
/// is a fatal parse error. Braces do not nest.
pub fn segment_params(basename: &str) -> Result<Vec<String>, PageError> {
    let mut params = Vec::new();
    let mut rest = basename;

    while let Some(left) = rest.find('{') {
        let Some(right) = rest[left..].find('}') else {
            return Err(PageError::UnmatchedBracket(basename.to_string()));
        };
        params.push(rest[left + 1..left + right].to_string());
        rest = &rest[left + right + 1..];
    }

    Ok(params)
}

/// Fill placeholders in a pathname from a parameter combination.
///
/// Each name replaces its first occurrence only, mirroring how segments are
/// filled one combination at a time.
pub fn fill_path_params(pathname: &str, params: &ParamMap) -> String {
    let mut result = pathname.to_string();
    for (name, value) in params {
        result = result.replacen(&format!("{{{name}}}"), value, 1);
    }
    result
}

/// Stable value-to-string conversion for path segments.
///
/// Strings are used verbatim; everything else renders as its JSON form
/// (integers without decimals).
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// One singleton combination per value.
fn split_values(name: &str, values: &[Value]) -> Vec<ParamMap> {
    values
        .iter()
        .map(|value| ParamMap::from([(name.to_string(), stringify(value))]))
        .collect()
}

/// Expand a spec into the full list of parameter combinations.
///
/// A spec with zero entries, or any entry expanding to nothing, produces an
/// empty list; callers decide whether that is fatal or a benign skip.
pub fn expand(spec: &ParamSpec) -> Vec<ParamMap> {
    let per_name: Vec<Vec<ParamMap>> = spec
        .entries
        .iter()
        .map(|(name, values)| match values {
            ParamValues::List(values) => split_values(name, values),
            ParamValues::Nested { values, children } => {
                let mut merged = Vec::new();
                for parent in split_values(name, values) {
                    let child_spec = match children {
                        ParamChildren::Spec(spec) => spec.clone(),
                        ParamChildren::Fn(f) => f(&parent[name]),
                    };
                    for child in expand(&child_spec) {
                        let mut combination = parent.clone();
                        combination.extend(child);
                        merged.push(combination);
                    }
                }
                merged
            }
        })
        .collect();

    per_name
        .into_iter()
        .reduce(|lhs, rhs| {
            let mut product = Vec::with_capacity(lhs.len() * rhs.len());
            for left in &lhs {
                for right in &rhs {
                    let mut combination = left.clone();
                    combination.extend(right.clone());
                    product.push(combination);
                }
            }
            product
        })
        .unwrap_or_default()
}
