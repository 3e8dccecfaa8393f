//! SLO criteria to Splunk alert conditions
//!
//! A pass criterion states when an SLI is healthy (`<=600`). The alert has
//! to fire on the opposite, so the comparator is inverted and applied to
//! the aggregation field of the SLI query.

use super::naming::RuleName;

/// Aggregation command whose first result field feeds the alert condition
pub const AGGREGATION_KEYWORD: &str = "stats";

/// Identifies the service a rule is compiled for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTarget {
    pub project: String,
    pub stage: String,
    pub service: String,
}

/// A criterion compiled into an alert condition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledCriterion {
    /// Inverted, whitespace-free criterion
    pub criterion: String,
    /// `search <field> <criterion>`
    pub condition: String,
    pub name: RuleName,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileOutcome {
    Compiled(CompiledCriterion),
    /// Relative criteria and criteria without `<`/`>` are not compiled
    Unsupported,
}

/// Whether a criterion is an absolute comparison the alert engine can check
pub fn is_supported(criterion: &str) -> bool {
    if criterion.contains(['+', '-', '%']) {
        return false;
    }
    criterion.contains(['<', '>'])
}

/// Invert a comparison so the alert fires when the criterion is violated
pub fn invert_criterion(criterion: &str) -> String {
    let inverted = if criterion.contains("<=") {
        criterion.replace("<=", ">")
    } else if criterion.contains('<') {
        criterion.replace('<', ">=")
    } else if criterion.contains(">=") {
        criterion.replace(">=", "<")
    } else if criterion.contains('>') {
        criterion.replace('>', "<=")
    } else if criterion.contains("!=") {
        criterion.replace("!=", "=")
    } else if criterion.contains('=') {
        criterion.replace('=', "!=")
    } else {
        criterion.to_string()
    };

    inverted.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Name of the field produced by the query's aggregation.
///
/// Returns the word following the first `stats`, up to the next whitespace
/// (queries written as YAML block scalars span several lines). A word
/// boundary directly after an `s` does not end the field, which keeps
/// `statsx`-style prefixes from matching.
pub fn result_field_name(query: &str) -> Result<&str, CompileError> {
    let start = query
        .find(AGGREGATION_KEYWORD)
        .ok_or(CompileError::NoAggregationFound)?;
    let bytes = query.as_bytes();
    let last = start + AGGREGATION_KEYWORD.len() - 1;

    let mut end = last + 1;
    while end <= bytes.len() {
        let at_boundary = end == bytes.len() || bytes[end].is_ascii_whitespace();
        if at_boundary && bytes[end - 1] != b's' {
            return query
                .get(last + 2..end)
                .filter(|field| !field.is_empty())
                .ok_or(CompileError::NoAggregationFound);
        }
        end += 1;
    }

    Err(CompileError::NoAggregationFound)
}

/// `search <field> <criterion>`
pub fn build_alert_condition(result_field: &str, criterion: &str) -> String {
    format!("search {} {}", result_field, criterion)
}

/// Compile one pass criterion of an SLI into an alert condition and rule name
pub fn compile_criterion(
    criterion: &str,
    sli: &str,
    query: &str,
    target: &RuleTarget,
) -> Result<CompileOutcome, CompileError> {
    if !is_supported(criterion) {
        return Ok(CompileOutcome::Unsupported);
    }

    let result_field = result_field_name(query)?;
    let inverted = invert_criterion(criterion);

    Ok(CompileOutcome::Compiled(CompiledCriterion {
        condition: build_alert_condition(result_field, &inverted),
        name: RuleName::new(
            target.project.as_str(),
            target.stage.as_str(),
            target.service.as_str(),
            sli,
            inverted.as_str(),
        ),
        criterion: inverted,
    }))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("No aggregation function found in the search query")]
    NoAggregationFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> RuleTarget {
        RuleTarget {
            project: "proj".to_string(),
            stage: "stage".to_string(),
            service: "svc".to_string(),
        }
    }

    #[test]
    fn test_inversion() {
        assert_eq!(invert_criterion("<=600"), ">600");
        assert_eq!(invert_criterion("<400"), ">=400");
        assert_eq!(invert_criterion(">=10"), "<10");
        assert_eq!(invert_criterion(">0"), "<=0");
        assert_eq!(invert_criterion("=5"), "!=5");
        assert_eq!(invert_criterion("!=3"), "=3");
    }

    #[test]
    fn test_inversion_strips_whitespace() {
        assert_eq!(invert_criterion("<= 600"), ">600");
        assert_eq!(invert_criterion(" > 1 "), "<=1");
        assert!(!invert_criterion("\t>=\t2").contains(char::is_whitespace));
    }

    #[test]
    fn test_unsupported_criteria() {
        assert!(!is_supported("<=+10%"));
        assert!(!is_supported("<-5"));
        assert!(!is_supported("<10%"));
        assert!(!is_supported("=5"));
        assert!(!is_supported("!=3"));
        assert!(is_supported("<=600"));
        assert!(is_supported(">0"));
    }

    #[test]
    fn test_unsupported_criteria_are_not_compiled() {
        for criterion in ["<=+10%", "<-5", "<10%", "=5"] {
            let outcome =
                compile_criterion(criterion, "sli", "index=main | stats count", &target()).unwrap();
            assert_eq!(outcome, CompileOutcome::Unsupported, "{}", criterion);
        }
    }

    #[test]
    fn test_result_field_name() {
        assert_eq!(
            result_field_name("source=/var/log/secure.log | stats count").unwrap(),
            "count"
        );
        assert_eq!(
            result_field_name("index=main |stats avg(duration) by host").unwrap(),
            "avg(duration)"
        );
    }

    #[test]
    fn test_result_field_name_multiline_query() {
        assert_eq!(
            result_field_name("index=main | stats count\n| where count > 0"),
            Ok("count")
        );
        assert_eq!(result_field_name("index=main\n| stats count\n"), Ok("count"));
        assert_eq!(result_field_name("index=main | stats\tmax(bytes)"), Ok("max(bytes)"));

        let outcome = compile_criterion(
            "<=600",
            "number_of_logs",
            "index=main\n| stats count\n| where count > 0\n",
            &target(),
        )
        .unwrap();
        let CompileOutcome::Compiled(compiled) = outcome else {
            panic!("expected a compiled criterion");
        };
        assert_eq!(compiled.condition, "search count >600");
    }

    #[test]
    fn test_result_field_name_missing() {
        assert_eq!(
            result_field_name("index=main | table host"),
            Err(CompileError::NoAggregationFound)
        );
        assert_eq!(
            result_field_name("index=main | stats"),
            Err(CompileError::NoAggregationFound)
        );
    }

    #[test]
    fn test_compile_criterion() {
        let outcome =
            compile_criterion(">=100", "number_of_logs", "index=main | stats count", &target())
                .unwrap();

        let CompileOutcome::Compiled(compiled) = outcome else {
            panic!("expected a compiled criterion");
        };
        assert_eq!(compiled.criterion, "<100");
        assert_eq!(compiled.condition, "search count <100");
        assert_eq!(
            compiled.name.encode(),
            "proj,stage,svc,number_of_logs,<100,keptn"
        );
    }

    #[test]
    fn test_compile_without_aggregation() {
        let result = compile_criterion("<=600", "sli", "index=main", &target());
        assert_eq!(result, Err(CompileError::NoAggregationFound));
    }
}
