use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Value of a configured environment variable.
///
/// A value of the exact form `${NAME}` is a placeholder for the process
/// environment variable `NAME`; anything else is used literally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentVariableValue {
    Literal(String),
    Placeholder { name: String },
}

impl EnvironmentVariableValue {
    pub fn parse(raw: &str) -> Self {
        match placeholder_name(raw) {
            Some(name) => EnvironmentVariableValue::Placeholder {
                name: name.to_string(),
            },
            None => EnvironmentVariableValue::Literal(raw.to_string()),
        }
    }

    /// Resolve against the current process environment.
    pub fn resolve(&self) -> Option<String> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    pub fn resolve_with<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self {
            EnvironmentVariableValue::Literal(value) => Some(value.clone()),
            EnvironmentVariableValue::Placeholder { name } => lookup(name),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, EnvironmentVariableValue::Placeholder { .. })
    }
}

fn placeholder_name(raw: &str) -> Option<&str> {
    let name = raw.strip_prefix("${")?.strip_suffix('}')?;
    if !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        Some(name)
    } else {
        None
    }
}

impl<'de> Deserialize<'de> for EnvironmentVariableValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<ScalarString>::deserialize(deserializer)?;
        Ok(EnvironmentVariableValue::parse(
            &raw.map(ScalarString::into_string).unwrap_or_default(),
        ))
    }
}

/// Outcome of resolving a whole environment mapping.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedEnvironment {
    pub variables: BTreeMap<String, String>,
    /// Keys whose placeholder named an unset process variable.
    pub unresolved: Vec<String>,
}

pub fn resolve_environment<F>(
    values: &BTreeMap<String, EnvironmentVariableValue>,
    lookup: F,
) -> ResolvedEnvironment
where
    F: Fn(&str) -> Option<String>,
{
    let mut resolved = ResolvedEnvironment::default();
    for (key, value) in values {
        match value.resolve_with(&lookup) {
            Some(v) => {
                resolved.variables.insert(key.clone(), v);
            }
            None => resolved.unresolved.push(key.clone()),
        }
    }
    resolved
}

/// YAML scalar accepted where the provider expects a string.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum ScalarString {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl ScalarString {
    pub(crate) fn into_string(self) -> String {
        match self {
            ScalarString::Str(s) => s,
            ScalarString::Int(i) => i.to_string(),
            ScalarString::Float(f) => f.to_string(),
            ScalarString::Bool(b) => b.to_string(),
        }
    }
}

pub(crate) fn deserialize_string_map<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Option<ScalarString>>>::deserialize(deserializer)?;
    Ok(raw.map(|map| {
        map.into_iter()
            .map(|(k, v)| (k, v.map(ScalarString::into_string).unwrap_or_default()))
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "DB_PASSWORD" => Some("hunter2".to_string()),
            "EMPTY" => Some(String::new()),
            _ => None,
        }
    }

    #[test]
    fn placeholder_resolves_to_process_value() {
        let value = EnvironmentVariableValue::parse("${DB_PASSWORD}");
        assert!(value.is_placeholder());
        assert_eq!(value.resolve_with(lookup), Some("hunter2".to_string()));
    }

    #[test]
    fn placeholder_for_unset_variable_is_absent() {
        let value = EnvironmentVariableValue::parse("${NOT_SET_ANYWHERE}");
        assert_eq!(value.resolve_with(lookup), None);
    }

    #[test]
    fn empty_process_value_is_kept() {
        let value = EnvironmentVariableValue::parse("${EMPTY}");
        assert_eq!(value.resolve_with(lookup), Some(String::new()));
    }

    #[test]
    fn literals_resolve_to_themselves() {
        for raw in ["plain", "$DB_PASSWORD", "${DB_PASSWORD", "x${DB_PASSWORD}", "${}", "${A-B}"] {
            let value = EnvironmentVariableValue::parse(raw);
            assert!(!value.is_placeholder(), "{raw} should be literal");
            assert_eq!(value.resolve_with(lookup), Some(raw.to_string()));
        }
    }

    #[test]
    fn resolve_uses_process_environment() {
        let value = EnvironmentVariableValue::parse("${CARGO_PKG_NAME}");
        assert_eq!(value.resolve(), std::env::var("CARGO_PKG_NAME").ok());
    }

    #[test]
    fn resolve_environment_reports_unresolved_keys() {
        let mut values = BTreeMap::new();
        values.insert("A".to_string(), EnvironmentVariableValue::parse("literal"));
        values.insert("B".to_string(), EnvironmentVariableValue::parse("${DB_PASSWORD}"));
        values.insert("C".to_string(), EnvironmentVariableValue::parse("${MISSING}"));

        let resolved = resolve_environment(&values, lookup);
        assert_eq!(resolved.variables.len(), 2);
        assert_eq!(resolved.variables["A"], "literal");
        assert_eq!(resolved.variables["B"], "hunter2");
        assert_eq!(resolved.unresolved, vec!["C".to_string()]);
    }

    #[test]
    fn yaml_scalars_become_strings() {
        let yaml = "a: 1\nb: true\nc: '${DB_PASSWORD}'\nd:\n";
        let values: BTreeMap<String, EnvironmentVariableValue> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(values["a"], EnvironmentVariableValue::Literal("1".into()));
        assert_eq!(values["b"], EnvironmentVariableValue::Literal("true".into()));
        assert!(values["c"].is_placeholder());
        assert_eq!(values["d"], EnvironmentVariableValue::Literal(String::new()));
    }
}
