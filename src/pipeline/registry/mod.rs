pub mod types;

pub use types::*;

use std::collections::HashSet;
use std::path::Path;

use thiserror::Error;

/// Registry compiled into the binary, used when no external file is configured.
const EMBEDDED_REGISTRY: &str = include_str!("default_registry.json");

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Registry JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate pattern id in registry: {0}")]
    DuplicatePatternId(String),

    #[error("Pattern {0} has no keywords")]
    EmptyKeywords(String),
}

impl PatternRegistry {
    /// Parse and validate a registry from its JSON form.
    pub fn from_json_str(json: &str) -> Result<Self, RegistryError> {
        let registry: PatternRegistry = serde_json::from_str(json)?;
        registry.validate()?;
        Ok(registry)
    }

    /// Load a registry file from disk.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let json = std::fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let registry = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            version = %registry.version(),
            patterns = registry.pattern_definitions.len(),
            "Pattern registry loaded"
        );
        Ok(registry)
    }

    /// The default registry shipped with the crate.
    pub fn embedded() -> Result<Self, RegistryError> {
        Self::from_json_str(EMBEDDED_REGISTRY)
    }

    /// A registry with no patterns. Every document matched against it has zero coverage.
    pub fn empty() -> Self {
        Self {
            registry_metadata: RegistryMetadata {
                version: "0.0.0".into(),
                description: None,
            },
            pattern_definitions: Vec::new(),
            role_mapping: RoleMapping {
                default_role: "Document Verification Specialist".into(),
                priority_order: Vec::new(),
            },
            risk_level_mapping: RiskLevelMapping {
                default_level: "medium".into(),
                priority_order: Vec::new(),
            },
            tool_definitions: Vec::new(),
            decision_rules: DecisionRules::default(),
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        for pattern in &self.pattern_definitions {
            if !seen.insert(pattern.pattern_id.as_str()) {
                return Err(RegistryError::DuplicatePatternId(pattern.pattern_id.clone()));
            }
            if pattern.keywords.iter().all(|k| k.trim().is_empty()) {
                return Err(RegistryError::EmptyKeywords(pattern.pattern_id.clone()));
            }
        }
        Ok(())
    }
}

/// Small registry for unit tests across the pipeline.
#[cfg(test)]
pub(crate) fn sample_registry() -> PatternRegistry {
    PatternRegistry::from_json_str(
        r#"{
  "registry_metadata": { "version": "test-1" },
  "pattern_definitions": [
    { "pattern_id": "P-003", "category": "notarization", "keywords": ["notarized"],
      "priority": 2, "criticality": "high", "maps_to_tool": "T-NOTARY", "source_type": "document" },
    { "pattern_id": "P-001", "category": "issue_date", "keywords": ["issued within * days", "issued within"],
      "priority": 2, "criticality": "critical", "maps_to_tool": "T-DATE", "source_type": "document" },
    { "pattern_id": "P-002", "category": "business_registration", "keywords": ["business registration"],
      "priority": 1, "criticality": "critical", "maps_to_tool": "T-BIZ", "source_type": "government_registry",
      "is_prerequisite": true },
    { "pattern_id": "P-004", "category": "official_seal", "keywords": ["company seal", "seal"],
      "priority": 3, "criticality": "medium", "maps_to_tool": "T-MISSING", "source_type": "document" }
  ],
  "role_mapping": {
    "default_role": "Document Verification Specialist",
    "priority_order": [
      { "priority": 2, "keywords": ["loan"], "role": "Credit Underwriter" },
      { "priority": 1, "keywords": ["compliance", "audit"], "role": "Compliance Officer" }
    ]
  },
  "risk_level_mapping": {
    "default_level": "medium",
    "priority_order": [
      { "priority": 1, "keywords": ["fraud"], "level": "high" },
      { "priority": 3, "keywords": ["general"], "level": "low" }
    ]
  },
  "tool_definitions": [
    { "id": "T-DATE", "name": "check_date_window", "params": ["document_date", "max_age_days"] },
    { "id": "T-NOTARY", "name": "verify_notarization", "params": ["notary_name"] },
    { "id": "T-BIZ", "name": "verify_business_registration", "params": ["registration_number", "business_name"] }
  ],
  "decision_rules": {
    "critical_patterns": ["P-001", "P-002"],
    "review_patterns": ["P-003", "P-002"]
  }
}"#,
    )
    .unwrap()
}
