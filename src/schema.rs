//! Option schema applied before the plugin registers any hook.

use regex::Regex;
use serde_json::Value;

use crate::config::{EntryPathSpec, PurifyOptions};
use crate::error::{PurifyError, Result};
use crate::host::EntryPoints;
use crate::paths::WILDCARD;

/// Options that passed validation, with `modulePathsTest` compiled.
#[derive(Debug, Clone)]
pub struct ValidatedOptions {
    /// Typed plugin options.
    pub options: PurifyOptions,
    /// Compiled `modulePathsTest`, when configured.
    pub module_pattern: Option<Regex>,
}

/// Schema for the plugin options, derived from the compiler's entry configuration.
#[derive(Debug, Clone, Default)]
pub struct OptionsSchema {
    entry_keys: Option<Vec<String>>,
}

impl OptionsSchema {
    /// Schema for a compiler configured with `entry`.
    ///
    /// With a keyed entry, per-chunk `paths` keys must name one of the entries or `*`.
    pub fn new(entry: Option<&EntryPoints>) -> Self {
        let entry_keys = entry
            .and_then(EntryPoints::keys)
            .map(|keys| keys.into_iter().map(str::to_string).collect());

        Self { entry_keys }
    }

    /// Validate raw options, failing closed on unknown keys and type mismatches.
    pub fn validate(&self, data: &Value) -> Result<ValidatedOptions> {
        if !data.is_object() {
            return Err(PurifyError::ConfigurationInvalid(
                "options must be an object".into(),
            ));
        }

        let options: PurifyOptions = serde_json::from_value(data.clone())
            .map_err(|err| PurifyError::ConfigurationInvalid(err.to_string()))?;

        self.check_path_keys(&options.paths)?;

        let module_pattern = options
            .module_paths_test
            .as_deref()
            .map(Regex::new)
            .transpose()
            .map_err(|err| PurifyError::ConfigurationInvalid(format!("modulePathsTest: {err}")))?;

        Ok(ValidatedOptions {
            options,
            module_pattern,
        })
    }

    fn check_path_keys(&self, paths: &EntryPathSpec) -> Result<()> {
        let Some(entry_keys) = &self.entry_keys else {
            return Ok(());
        };

        let unknown: Vec<&str> = paths
            .keys()
            .into_iter()
            .filter(|key| *key != WILDCARD && !entry_keys.iter().any(|entry| entry == key))
            .collect();

        if unknown.is_empty() {
            Ok(())
        } else {
            Err(PurifyError::ConfigurationInvalid(format!(
                "paths keys [{}] do not match entry keys [{}]",
                unknown.join(", "),
                entry_keys.join(", ")
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn keyed(value: Value) -> EntryPoints {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_empty_options() {
        let err = OptionsSchema::new(None).validate(&json!({})).unwrap_err();
        assert!(matches!(err, PurifyError::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("paths"));
    }

    #[test]
    fn accepts_paths_only() {
        let entry = keyed(json!({}));
        let validated = OptionsSchema::new(Some(&entry))
            .validate(&json!({ "paths": ["./foo"] }))
            .unwrap();
        assert!(validated.module_pattern.is_none());
        assert_eq!(validated.options.paths, EntryPathSpec::from(vec!["./foo".to_string()]));
    }

    #[test]
    fn rejects_unknown_properties() {
        let err = OptionsSchema::new(None)
            .validate(&json!({ "paths": ["./foo"], "foobar": ["./foo"] }))
            .unwrap_err();
        assert!(err.to_string().contains("foobar"));
    }

    #[test]
    fn rejects_path_keys_missing_from_entry() {
        let entry = keyed(json!({ "b": "./bar" }));
        let err = OptionsSchema::new(Some(&entry))
            .validate(&json!({ "paths": { "a": "./foo" } }))
            .unwrap_err();
        assert!(matches!(err, PurifyError::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("[a]"));
    }

    #[test]
    fn allows_wildcard_and_matching_keys() {
        let entry = keyed(json!({ "main": "./main.js", "admin": "./admin.js" }));
        let validated = OptionsSchema::new(Some(&entry))
            .validate(&json!({ "paths": { "main": ["./src"], "*": "./shared" } }))
            .unwrap();
        assert_eq!(validated.options.paths.keys(), vec!["main", "*"]);
    }

    #[test]
    fn rejects_type_mismatches() {
        let schema = OptionsSchema::new(None);
        assert!(schema.validate(&json!({ "paths": 3 })).is_err());
        assert!(schema.validate(&json!({ "paths": [], "verbose": "yes" })).is_err());
        assert!(schema.validate(&json!({ "paths": [], "purifyOptions": [] })).is_err());
        assert!(schema.validate(&json!(["./foo"])).is_err());
    }

    #[test]
    fn rejects_invalid_module_pattern() {
        let err = OptionsSchema::new(None)
            .validate(&json!({ "paths": [], "modulePathsTest": "(" }))
            .unwrap_err();
        assert!(matches!(err, PurifyError::ConfigurationInvalid(_)));
        assert!(err.to_string().contains("modulePathsTest"));
    }

    #[test]
    fn compiles_module_pattern_once() {
        let validated = OptionsSchema::new(None)
            .validate(&json!({ "paths": [], "modulePathsTest": "node_modules/(ui|forms)" }))
            .unwrap();

        let pattern = validated.module_pattern.unwrap();
        assert!(pattern.is_match("/app/node_modules/forms/input.js"));
        assert_eq!(
            validated.options.module_paths_test.as_deref(),
            Some("node_modules/(ui|forms)")
        );
    }
}
