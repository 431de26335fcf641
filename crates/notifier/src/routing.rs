//! Routing-rule evaluation for notifications whose recipient is decided by
//! the submitted values.

use crate::forms::{Entry, Form, RoutingRule, RuleOperator};

/// Evaluate the ordered rules against the entry and comma-join the target
/// email of every rule that matches. All matches contribute, not just the
/// first; rules with no target email and rules bound to hidden fields are
/// skipped.
pub fn resolve_routing(rules: &[RoutingRule], form: &Form, entry: &Entry) -> String {
    let mut recipients = Vec::new();

    for rule in rules {
        if rule.email.is_empty() {
            continue;
        }

        let field = form.field(rule.field_id);
        if field.map(|f| f.hidden).unwrap_or(false) {
            continue;
        }

        let value = entry.field_value(rule.field_id).unwrap_or("");
        if rule_matches(rule.operator, value, &rule.value) {
            recipients.push(rule.email.as_str());
        }
    }

    recipients.join(",")
}

/// Comparisons are case-insensitive on trimmed values; the ordering
/// operators compare numerically and never match non-numeric input.
fn rule_matches(operator: RuleOperator, field_value: &str, target: &str) -> bool {
    let value = field_value.trim().to_lowercase();
    let target = target.trim().to_lowercase();

    match operator {
        RuleOperator::Is => value == target,
        RuleOperator::IsNot => value != target,
        RuleOperator::GreaterThan => match (value.parse::<f64>(), target.parse::<f64>()) {
            (Ok(v), Ok(t)) => v > t,
            _ => false,
        },
        RuleOperator::LessThan => match (value.parse::<f64>(), target.parse::<f64>()) {
            (Ok(v), Ok(t)) => v < t,
            _ => false,
        },
        RuleOperator::Contains => value.contains(&target),
        RuleOperator::StartsWith => value.starts_with(&target),
        RuleOperator::EndsWith => value.ends_with(&target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forms::FormField;

    fn rule(field_id: u64, operator: RuleOperator, value: &str, email: &str) -> RoutingRule {
        RoutingRule {
            field_id,
            operator,
            value: value.into(),
            email: email.into(),
        }
    }

    fn form_with_fields(hidden_ids: &[u64]) -> Form {
        Form {
            id: 1,
            title: "Quote".into(),
            fields: (1..=4)
                .map(|id| FormField {
                    id,
                    label: format!("Field {id}"),
                    hidden: hidden_ids.contains(&id),
                    ..Default::default()
                })
                .collect(),
        }
    }

    fn entry_with(values: &[(&str, &str)]) -> Entry {
        let mut entry = Entry {
            id: 10,
            form_id: 1,
            ..Default::default()
        };
        for (k, v) in values {
            entry.values.insert((*k).into(), (*v).into());
        }
        entry
    }

    #[test]
    fn all_matching_rules_join_in_order() {
        let rules = vec![
            rule(1, RuleOperator::Is, "sales", "sales@acme.test"),
            rule(1, RuleOperator::IsNot, "support", "backup@acme.test"),
            rule(2, RuleOperator::GreaterThan, "100", "priority@acme.test"),
            rule(1, RuleOperator::Is, "support", "support@acme.test"),
        ];
        let form = form_with_fields(&[]);
        let entry = entry_with(&[("1", "Sales"), ("2", "250")]);

        assert_eq!(
            resolve_routing(&rules, &form, &entry),
            "sales@acme.test,backup@acme.test,priority@acme.test"
        );
    }

    #[test]
    fn hidden_field_rules_are_excluded() {
        let rules = vec![
            rule(3, RuleOperator::Is, "x", "hidden@acme.test"),
            rule(1, RuleOperator::Is, "x", "visible@acme.test"),
        ];
        let form = form_with_fields(&[3]);
        let entry = entry_with(&[("1", "x"), ("3", "x")]);

        assert_eq!(resolve_routing(&rules, &form, &entry), "visible@acme.test");
    }

    #[test]
    fn rules_without_target_email_are_skipped() {
        let rules = vec![rule(1, RuleOperator::Is, "x", "")];
        let form = form_with_fields(&[]);
        let entry = entry_with(&[("1", "x")]);

        assert_eq!(resolve_routing(&rules, &form, &entry), "");
    }

    #[test]
    fn operator_semantics() {
        assert!(rule_matches(RuleOperator::Contains, "the quick fox", "QUICK"));
        assert!(rule_matches(RuleOperator::StartsWith, "Widget-42", "widget"));
        assert!(rule_matches(RuleOperator::EndsWith, "order.PDF", ".pdf"));
        assert!(rule_matches(RuleOperator::LessThan, "3", "10"));
        assert!(!rule_matches(RuleOperator::GreaterThan, "abc", "10"));
        assert!(rule_matches(RuleOperator::IsNot, "", "anything"));
    }
}
