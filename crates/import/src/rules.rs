use serde::{Deserialize, Serialize};

use crate::pipeline::{Categorizer, CategoryMatch};

/// A single description-matching rule. Categorization is a pluggable
/// collaborator of the pipeline; this rule set is the default
/// implementation, not the only one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub id: i64,
    pub category_id: i64,
    pub pattern: String,
    #[serde(default)]
    pub match_type: RuleMatchType,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleMatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

struct CompiledRule {
    rule: CategoryRule,
    compiled_regex: Option<regex::Regex>,
}

pub struct RuleCategorizer {
    rules: Vec<CompiledRule>,
}

#[derive(Deserialize)]
struct RuleFile {
    rules: Vec<CategoryRule>,
}

impl RuleCategorizer {
    pub fn new(rules: Vec<CategoryRule>) -> Self {
        let mut compiled: Vec<CompiledRule> = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = if rule.match_type == RuleMatchType::Regex {
                    regex::Regex::new(&rule.pattern).ok()
                } else {
                    None
                };
                CompiledRule {
                    rule,
                    compiled_regex,
                }
            })
            .collect();
        // Highest priority first.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Self { rules: compiled }
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, String> {
        let file: RuleFile =
            toml::from_str(toml_content).map_err(|e| format!("Failed to parse rules: {e}"))?;
        Ok(Self::new(file.rules))
    }

    fn rule_matches(cr: &CompiledRule, description: &str) -> bool {
        let text = description.to_lowercase();
        let pattern = cr.rule.pattern.to_lowercase();
        match cr.rule.match_type {
            RuleMatchType::Contains => text.contains(&pattern),
            RuleMatchType::Exact => text == pattern,
            RuleMatchType::Regex => cr
                .compiled_regex
                .as_ref()
                .is_some_and(|re| re.is_match(description)),
        }
    }
}

impl Categorizer for RuleCategorizer {
    fn categorize(&self, description: &str) -> Option<CategoryMatch> {
        self.rules
            .iter()
            .find(|cr| Self::rule_matches(cr, description))
            .map(|cr| CategoryMatch {
                category_id: cr.rule.category_id,
                rule_id: cr.rule.id,
                pattern: cr.rule.pattern.clone(),
            })
    }
}

/// Categorizer that matches nothing; imports still work uncategorized.
pub struct NullCategorizer;

impl Categorizer for NullCategorizer {
    fn categorize(&self, _description: &str) -> Option<CategoryMatch> {
        None
    }
}
