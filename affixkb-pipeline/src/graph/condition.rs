//! Prerequisite condition predicates
//!
//! Grammar:
//! ```text
//! condition := clause ( "&&" clause )*
//!            | clause ( "||" clause )*
//! clause    := key "==" value
//! ```
//!
//! `&&` and `||` in the same string have no defined precedence and are not
//! supported. Unsupported or malformed conditions evaluate as satisfied.

use crate::types::{BuildContext, ContextValue};
use tracing::warn;

/// Parsed condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    /// `key == value`
    Equals { key: String, value: String },
    /// Every clause holds
    All(Vec<Condition>),
    /// At least one clause holds
    Any(Vec<Condition>),
    /// Could not be parsed; always satisfied
    Unsupported(String),
}

impl Condition {
    pub fn parse(raw: &str) -> Condition {
        let text = raw.trim();
        let has_and = text.contains("&&");
        let has_or = text.contains("||");

        match (has_and, has_or) {
            (true, true) => Condition::Unsupported(text.to_string()),
            (true, false) => Condition::All(text.split("&&").map(Condition::parse).collect()),
            (false, true) => Condition::Any(text.split("||").map(Condition::parse).collect()),
            (false, false) => parse_clause(text),
        }
    }

    /// Evaluate against a build context
    pub fn evaluate(&self, context: &BuildContext) -> bool {
        match self {
            Condition::Equals { key, value } => clause_holds(key, value, context),
            Condition::All(parts) => parts.iter().all(|c| c.evaluate(context)),
            Condition::Any(parts) => parts.iter().any(|c| c.evaluate(context)),
            Condition::Unsupported(text) => {
                warn!(condition = %text, "Unsupported prerequisite condition, treating as satisfied");
                true
            }
        }
    }
}

fn parse_clause(text: &str) -> Condition {
    match text.split_once("==") {
        Some((key, value)) if !key.trim().is_empty() && !value.trim().is_empty() => {
            Condition::Equals {
                key: key.trim().to_string(),
                value: value.trim().to_string(),
            }
        }
        _ => Condition::Unsupported(text.to_string()),
    }
}

/// List values test membership; absent `foo` is retried as `foos`;
/// comparison is case-insensitive
fn clause_holds(key: &str, expected: &str, context: &BuildContext) -> bool {
    let expected = expected.to_lowercase();
    let actual = context
        .get(key)
        .or_else(|| context.get(&format!("{}s", key)));

    match actual {
        Some(ContextValue::List(items)) => items.iter().any(|v| v.to_lowercase() == expected),
        Some(ContextValue::Scalar(v)) => v.to_lowercase() == expected,
        None => expected.is_empty(),
    }
}

/// Evaluate an optional condition string; `None` or blank is satisfied
pub fn evaluate_condition(condition: Option<&str>, context: &BuildContext) -> bool {
    match condition.map(str::trim) {
        None | Some("") => true,
        Some(text) => Condition::parse(text).evaluate(context),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> BuildContext {
        BuildContext::from([
            ("attack_type".to_string(), ContextValue::Scalar("Bow".to_string())),
            ("uses_shield".to_string(), ContextValue::Scalar("true".to_string())),
            (
                "damage_types".to_string(),
                ContextValue::List(vec!["physical".to_string(), "poison".to_string()]),
            ),
        ])
    }

    #[test]
    fn test_scalar_equality_case_insensitive() {
        assert!(evaluate_condition(Some("attack_type == bow"), &context()));
        assert!(!evaluate_condition(Some("attack_type == melee"), &context()));
    }

    #[test]
    fn test_plural_list_membership() {
        assert!(evaluate_condition(Some("damage_type == Physical"), &context()));
        assert!(!evaluate_condition(Some("damage_type == fire"), &context()));
    }

    #[test]
    fn test_absent_key_compares_as_empty() {
        assert!(!evaluate_condition(Some("uses_minions == true"), &context()));
    }

    #[test]
    fn test_compound_conditions() {
        assert!(evaluate_condition(
            Some("attack_type == bow && uses_shield == true"),
            &context()
        ));
        assert!(!evaluate_condition(
            Some("attack_type == bow && uses_shield == false"),
            &context()
        ));
        assert!(evaluate_condition(
            Some("attack_type == melee || damage_type == poison"),
            &context()
        ));
        assert!(!evaluate_condition(
            Some("attack_type == melee || uses_ward == true"),
            &context()
        ));
    }

    #[test]
    fn test_mixed_operators_unsupported_and_satisfied() {
        let cond = Condition::parse("attack_type == melee && uses_ward == true || x == y");
        assert!(matches!(cond, Condition::Unsupported(_)));
        assert!(cond.evaluate(&context()));
    }

    #[test]
    fn test_unparseable_and_missing_satisfied() {
        assert!(evaluate_condition(None, &context()));
        assert!(evaluate_condition(Some("   "), &context()));
        assert!(evaluate_condition(Some("attack_type = melee"), &context()));
        assert!(evaluate_condition(Some("== melee"), &context()));
        assert_eq!(
            Condition::parse("a == b"),
            Condition::Equals {
                key: "a".into(),
                value: "b".into()
            }
        );
    }
}
