use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use thiserror::Error;
use tracing::info;

use crate::transformation_rule::RuleSet;

/// Loads rule sets from YAML or JSON files and checks them before use
pub struct RuleRegistry {
    schema: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Failed to read rules file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Rules file is not valid YAML or JSON: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Rules file does not match the rule set schema:\n{0}")]
    SchemaViolation(String),

    #[error("Rule validation failed: {0}")]
    RuleValidationFailed(String),

    #[error("Schema definition error: {0}")]
    SchemaDefinitionError(String),
}

fn name_property() -> serde_json::Value {
    json!({ "type": "string", "minLength": 1 })
}

fn rule_set_schema() -> serde_json::Value {
    let sdk_version = json!({
        "type": "string",
        "pattern": "^hk_[0-9]+\\.[0-9]+\\.[0-9]+(-r[0-9]+)?$"
    });

    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "Tag file rule set",
        "type": "object",
        "additionalProperties": false,
        "properties": {
            "source_sdk": sdk_version.clone(),
            "target_sdk": sdk_version,
            "versions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["class_name", "version"],
                    "properties": {
                        "class_name": name_property(),
                        "version": { "type": "integer", "minimum": 0 }
                    }
                }
            },
            "removals": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["class_name", "member_name"],
                    "properties": {
                        "class_name": name_property(),
                        "member_name": name_property()
                    }
                }
            },
            "promotions": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["class_name", "member_name", "promoted_type"],
                    "properties": {
                        "class_name": name_property(),
                        "member_name": name_property(),
                        "promoted_type": name_property()
                    }
                }
            }
        }
    })
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            schema: rule_set_schema(),
        }
    }

    /// Load a rule set from a YAML or JSON file
    pub fn load_rules_from_file(&self, path: &Path) -> Result<RuleSet, RegistryError> {
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let rules = self.load_rules_from_str(&text)?;
        info!(path = %path.display(), rules = rules.rule_count(), "loaded rule set");
        Ok(rules)
    }

    /// Parse rule set text. YAML is a superset of JSON, so both are accepted.
    pub fn load_rules_from_str(&self, text: &str) -> Result<RuleSet, RegistryError> {
        let instance: serde_json::Value = serde_yaml::from_str(text)?;
        self.validate_against_schema(&instance)?;

        let rules: RuleSet = serde_json::from_value(instance)
            .map_err(|e| RegistryError::RuleValidationFailed(e.to_string()))?;
        self.validate_rules(&rules)?;
        Ok(rules)
    }

    fn validate_against_schema(&self, instance: &serde_json::Value) -> Result<(), RegistryError> {
        let compiled_schema = jsonschema::JSONSchema::compile(&self.schema)
            .map_err(|e| RegistryError::SchemaDefinitionError(e.to_string()))?;

        if let Err(errors) = compiled_schema.validate(instance) {
            let error_messages: Vec<String> = errors
                .map(|error| format!("  - {}: {}", error.instance_path, error))
                .collect();
            return Err(RegistryError::SchemaViolation(error_messages.join("\n")));
        }

        Ok(())
    }

    /// Checks the schema cannot express
    fn validate_rules(&self, rules: &RuleSet) -> Result<(), RegistryError> {
        for (index, promotion) in rules.promotions.iter().enumerate() {
            let duplicate = rules.promotions[..index].iter().any(|earlier| {
                earlier.class_name == promotion.class_name && earlier.member_name == promotion.member_name
            });
            if duplicate {
                return Err(RegistryError::RuleValidationFailed(format!(
                    "Promotion {} is declared more than once",
                    promotion.rule_id()
                )));
            }
        }

        let names = rules
            .versions
            .iter()
            .map(|stamp| (stamp.rule_id(), vec![&stamp.class_name]))
            .chain(rules.removals.iter().map(|removal| {
                (removal.rule_id(), vec![&removal.class_name, &removal.member_name])
            }))
            .chain(rules.promotions.iter().map(|promotion| {
                (
                    promotion.rule_id(),
                    vec![&promotion.class_name, &promotion.member_name, &promotion.promoted_type],
                )
            }));

        for (rule_id, fields) in names {
            if fields.iter().any(|field| field.trim().is_empty()) {
                return Err(RegistryError::RuleValidationFailed(format!(
                    "Rule {} contains a blank name",
                    rule_id
                )));
            }
        }

        Ok(())
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk_version::SdkVersion;
    use std::io::Write;

    #[test]
    fn test_load_yaml_rules() {
        let registry = RuleRegistry::new();
        let rules = registry
            .load_rules_from_str(
                r#"
                source_sdk: hk_2011.3.0-r1
                target_sdk: hk_2010.2.0-r1
                versions:
                  - class_name: hkaAnimation
                    version: 1
                removals:
                  - class_name: hkaMeshBinding
                    member_name: name
                promotions:
                  - class_name: hkaAnimation
                    member_name: annotationTracks
                    promoted_type: hkaAnnotationTrack
                "#,
            )
            .unwrap();

        assert_eq!(rules.target_sdk, Some(SdkVersion::new(2010, 2, 0).with_release(1)));
        assert_eq!(rules.rule_count(), 3);
    }

    #[test]
    fn test_load_json_rules() {
        let registry = RuleRegistry::new();
        let rules = registry
            .load_rules_from_str(r#"{"versions": [{"class_name": "hkxMaterial", "version": 1}]}"#)
            .unwrap();

        assert_eq!(rules.versions.len(), 1);
        assert!(rules.promotions.is_empty());
    }

    #[test]
    fn test_builtin_rules_survive_yaml_round_trip() {
        let yaml = serde_yaml::to_string(&RuleSet::builtin()).unwrap();
        let rules = RuleRegistry::new().load_rules_from_str(&yaml).unwrap();
        assert_eq!(rules, RuleSet::builtin());
    }

    #[test]
    fn test_promotion_without_type_violates_schema() {
        let result = RuleRegistry::new().load_rules_from_str(
            r#"
            promotions:
              - class_name: hkaMeshBinding
                member_name: mappings
            "#,
        );

        match result {
            Err(RegistryError::SchemaViolation(message)) => {
                assert!(message.contains("promoted_type"));
            }
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_table_violates_schema() {
        let result = RuleRegistry::new().load_rules_from_str("renames: []");
        assert!(matches!(result, Err(RegistryError::SchemaViolation(_))));
    }

    #[test]
    fn test_negative_version_violates_schema() {
        let result = RuleRegistry::new()
            .load_rules_from_str(r#"{"versions": [{"class_name": "a", "version": -1}]}"#);
        assert!(matches!(result, Err(RegistryError::SchemaViolation(_))));
    }

    #[test]
    fn test_duplicate_promotion_rejected() {
        let result = RuleRegistry::new().load_rules_from_str(
            r#"
            promotions:
              - { class_name: a, member_name: m, promoted_type: A }
              - { class_name: a, member_name: m, promoted_type: B }
            "#,
        );
        assert!(matches!(result, Err(RegistryError::RuleValidationFailed(_))));
    }

    #[test]
    fn test_blank_name_rejected() {
        let result = RuleRegistry::new()
            .load_rules_from_str(r#"{"removals": [{"class_name": "  ", "member_name": "name"}]}"#);
        assert!(matches!(result, Err(RegistryError::RuleValidationFailed(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let result = RuleRegistry::new().load_rules_from_str("versions: [unclosed");
        assert!(matches!(result, Err(RegistryError::Parse(_))));
    }

    #[test]
    fn test_load_rules_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "removals:\n  - class_name: hkaMeshBinding\n    member_name: name").unwrap();

        let rules = RuleRegistry::new().load_rules_from_file(file.path()).unwrap();
        assert_eq!(rules.removals[0].member_name, "name");

        let missing = RuleRegistry::new().load_rules_from_file(Path::new("/nonexistent/rules.yaml"));
        assert!(matches!(missing, Err(RegistryError::Io { .. })));
    }
}
