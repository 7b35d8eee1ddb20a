use serde::{Deserialize, Serialize};

/// Macro to generate enum with serde names + as_str pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }
    };
}

str_enum!(Criticality {
    Critical => "critical",
    High => "high",
    Medium => "medium",
    Low => "low",
});

/// Registry header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryMetadata {
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One keyword-triggered rule.
///
/// `keywords` are tried in list order. A `*` inside a keyword stands for
/// one-or-more digits ("valid for * days").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternDefinition {
    pub pattern_id: String,
    pub category: String,
    pub keywords: Vec<String>,
    /// Lower value = higher precedence.
    pub priority: u32,
    pub criticality: Criticality,
    #[serde(rename = "maps_to_tool")]
    pub tool_id: String,
    pub source_type: String,
    #[serde(default)]
    pub is_prerequisite: bool,
}

/// Role table entry: first keyword hit in ascending priority order wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMappingEntry {
    pub priority: u32,
    pub keywords: Vec<String>,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleMapping {
    pub default_role: String,
    #[serde(default)]
    pub priority_order: Vec<RoleMappingEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskMappingEntry {
    pub priority: u32,
    pub keywords: Vec<String>,
    pub level: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskLevelMapping {
    pub default_level: String,
    #[serde(default)]
    pub priority_order: Vec<RiskMappingEntry>,
}

/// Verification tool referenced by `PatternDefinition::tool_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub params: Vec<String>,
}

/// Pattern ids whose failure is escalated. A pattern in neither list is a plain fail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionRules {
    #[serde(default)]
    pub critical_patterns: Vec<String>,
    #[serde(default)]
    pub review_patterns: Vec<String>,
}

/// How a failed check is escalated in the logic flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureSeverity {
    Critical,
    Review,
    Fail,
}

impl FailureSeverity {
    /// Label attached to a failed check, e.g. `CRITICAL_FAIL_issue_date`.
    pub fn label(&self, category: &str) -> String {
        match self {
            Self::Critical => format!("CRITICAL_FAIL_{category}"),
            Self::Review => format!("REVIEW_{category}"),
            Self::Fail => format!("FAIL_{category}"),
        }
    }
}

impl DecisionRules {
    /// Critical wins over review when an id is listed in both sets.
    pub fn severity_of(&self, pattern_id: &str) -> FailureSeverity {
        if self.critical_patterns.iter().any(|id| id == pattern_id) {
            FailureSeverity::Critical
        } else if self.review_patterns.iter().any(|id| id == pattern_id) {
            FailureSeverity::Review
        } else {
            FailureSeverity::Fail
        }
    }
}

/// The complete, read-only rule catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternRegistry {
    pub registry_metadata: RegistryMetadata,
    #[serde(default)]
    pub pattern_definitions: Vec<PatternDefinition>,
    pub role_mapping: RoleMapping,
    pub risk_level_mapping: RiskLevelMapping,
    #[serde(default)]
    pub tool_definitions: Vec<ToolDefinition>,
    #[serde(default)]
    pub decision_rules: DecisionRules,
}

impl PatternRegistry {
    pub fn tool(&self, tool_id: &str) -> Option<&ToolDefinition> {
        self.tool_definitions.iter().find(|t| t.id == tool_id)
    }

    /// Pattern definitions sorted by identifier, the matcher's scan order.
    pub fn patterns_by_id(&self) -> Vec<&PatternDefinition> {
        let mut patterns: Vec<&PatternDefinition> = self.pattern_definitions.iter().collect();
        patterns.sort_by(|a, b| a.pattern_id.cmp(&b.pattern_id));
        patterns
    }

    pub fn version(&self) -> &str {
        &self.registry_metadata.version
    }
}
