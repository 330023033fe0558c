//! Output formatting for CLI

use crate::issue::{Issues, Level};
use crate::models::Model;

/// Format issues, one per line, followed by a summary
pub fn format_issues(title: &str, issues: &Issues) -> String {
    let mut output = String::new();

    if issues.is_empty() {
        output.push_str(&format!("{}: no issues\n", title));
        return output;
    }

    output.push_str(&format!("{}:\n", title));
    for issue in issues {
        let marker = match issue.level {
            Level::Error => "error",
            Level::Warning => "warning",
            Level::Message => "note",
        };
        output.push_str(&format!("  - {}: {} [{}]\n", marker, issue.description, issue.reference_rule));
        if let Some(item) = &issue.item {
            output.push_str(&format!("    at {}\n", item));
        }
    }
    output.push_str(&format!(
        "{} error(s), {} warning(s)\n",
        issues.error_count(),
        issues.warning_count()
    ));
    output
}

/// One-paragraph summary of a model's contents
pub fn format_model_summary(model: &Model) -> String {
    let mut output = format!("Model '{}'\n", model.name);
    output.push_str(&format!("  Components: {}\n", model.component_count()));
    output.push_str(&format!("  Units: {}\n", model.units().len()));
    output.push_str(&format!("  Variables: {}\n", model.variables().count()));
    output.push_str(&format!("  Equivalences: {}\n", model.equivalence_tuples().len()));
    if model.has_unresolved_imports() {
        output.push_str("  Unresolved imports remain\n");
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{Issue, IssueKind, ItemRef, ReferenceRule};

    #[test]
    fn test_format_issues_lists_items_and_counts() {
        let mut issues = Issues::new();
        issues.push(
            Issue::error(
                IssueKind::MissingReference,
                ReferenceRule::VariableUnits,
                "Variable 'v' has units 'u' which are not defined",
            )
            .with_item(ItemRef::Variable {
                component: "c".to_string(),
                name: "v".to_string(),
            }),
        );

        let text = format_issues("Validation", &issues);
        assert!(text.contains("error: Variable 'v' has units 'u' which are not defined [variable-units]"));
        assert!(text.contains("at variable 'v' in component 'c'"));
        assert!(text.ends_with("1 error(s), 0 warning(s)\n"));
    }

    #[test]
    fn test_format_empty_issues() {
        assert_eq!(format_issues("Validation", &Issues::new()), "Validation: no issues\n");
    }
}
