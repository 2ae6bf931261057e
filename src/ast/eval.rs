//! Expression evaluation against a record
//!
//! The load-bearing rule: every operator except `IS NULL` yields
//! `false` when the field path does not resolve. That includes the
//! negated operators; `verb != ''` must not vacuously succeed on a
//! record that has no `verb` field at all.

use serde_json::Value;

use crate::event::Record;

use super::{Expr, Literal, Op, Predicate};

impl Expr {
    /// Evaluate this expression against a record
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Expr::Atom(predicate) => predicate.matches(record),
            Expr::Not(inner) => !inner.matches(record),
            Expr::And(children) => children.iter().all(|c| c.matches(record)),
            Expr::Or(children) => children.iter().any(|c| c.matches(record)),
        }
    }
}

impl Predicate {
    /// Evaluate this predicate against a record
    pub fn matches(&self, record: &Record) -> bool {
        let value = record.resolve(&self.path);

        // IS NULL is the only operator where absence counts as truth
        match (&self.op, value) {
            (Op::IsNull, None) => true,
            (Op::IsNull, Some(v)) => v.is_null(),
            (Op::IsNotNull, None) => false,
            (Op::IsNotNull, Some(v)) => !v.is_null(),
            (_, None) => false,
            (op, Some(v)) => eval_present(op, v),
        }
    }
}

fn eval_present(op: &Op, value: &Value) -> bool {
    match op {
        Op::Eq(lit) => literal_equals(value, lit),
        Op::Neq(lit) => !literal_equals(value, lit),
        Op::Lt(lit) => compare_numeric(value, lit, |a, b| a < b),
        Op::Lte(lit) => compare_numeric(value, lit, |a, b| a <= b),
        Op::Gt(lit) => compare_numeric(value, lit, |a, b| a > b),
        Op::Gte(lit) => compare_numeric(value, lit, |a, b| a >= b),
        Op::In(list) => list.iter().any(|lit| literal_equals(value, lit)),
        Op::NotIn(list) => !list.iter().any(|lit| literal_equals(value, lit)),
        Op::Contains(needle) => scalar_str(value).is_some_and(|s| s.contains(needle)),
        Op::NotContains(needle) => scalar_str(value).is_some_and(|s| !s.contains(needle)),
        Op::StartsWith(prefix) => scalar_str(value).is_some_and(|s| s.starts_with(prefix)),
        Op::NotStartsWith(prefix) => scalar_str(value).is_some_and(|s| !s.starts_with(prefix)),
        Op::EndsWith(suffix) => scalar_str(value).is_some_and(|s| s.ends_with(suffix)),
        Op::NotEndsWith(suffix) => scalar_str(value).is_some_and(|s| !s.ends_with(suffix)),
        Op::Match(pattern) => scalar_str(value).is_some_and(|s| pattern.matches(&s)),
        Op::Like(pattern) => scalar_str(value).is_some_and(|s| pattern.matches(&s)),
        Op::IsNull | Op::IsNotNull => unreachable!("handled in Predicate::matches"),
    }
}

/// Scalar values compare by their natural type, with numeric strings
/// and stringified numbers bridged the way rule authors expect.
fn literal_equals(value: &Value, lit: &Literal) -> bool {
    match (value, lit) {
        (Value::String(s), Literal::Str(k)) => s == k,
        (Value::Number(n), Literal::Num(k)) => n.as_f64().is_some_and(|f| f == *k),
        (Value::Bool(b), Literal::Bool(k)) => b == k,
        (Value::Number(n), Literal::Str(k)) => n.to_string() == *k,
        (Value::String(s), Literal::Num(k)) => s.parse::<f64>().is_ok_and(|f| f == *k),
        (Value::Bool(b), Literal::Str(k)) => {
            k.eq_ignore_ascii_case(if *b { "true" } else { "false" })
        }
        _ => false,
    }
}

/// Both sides coerced to f64; anything non-numeric fails the comparison
fn compare_numeric(value: &Value, lit: &Literal, cmp: fn(f64, f64) -> bool) -> bool {
    let left = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    };
    match (left, lit.as_f64()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// String view for the text operators. Collections and null are a type
/// mismatch, not an empty string.
fn scalar_str(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse_condition;

    use super::*;
    use serde_json::json;

    fn eval(condition: &str, event: serde_json::Value) -> bool {
        let expr = parse_condition(condition).unwrap();
        expr.matches(&Record::new(event))
    }

    #[test]
    fn test_equality() {
        assert!(eval("eventName = 'AssumeRole'", json!({"eventName": "AssumeRole"})));
        assert!(!eval("eventName = 'AssumeRole'", json!({"eventName": "ConsoleLogin"})));
    }

    #[test]
    fn test_equality_numbers_and_bools() {
        assert!(eval("event_id = 4625", json!({"event_id": 4625})));
        assert!(eval("event_id = '4625'", json!({"event_id": 4625})));
        assert!(eval("readOnly = true", json!({"readOnly": true})));
        assert!(eval("readOnly = 'true'", json!({"readOnly": true})));
        assert!(!eval("readOnly = true", json!({"readOnly": false})));
    }

    #[test]
    fn test_absent_field_semantics() {
        let event = json!({"name": "test"});
        // Every operator except IS NULL is false on an absent field
        assert!(!eval("verb = 'create'", event.clone()));
        assert!(!eval("verb != 'create'", event.clone()));
        assert!(!eval("verb <> ''", event.clone()));
        assert!(!eval("verb < 5", event.clone()));
        assert!(!eval("verb >= 5", event.clone()));
        assert!(!eval("verb IN ('a', 'b')", event.clone()));
        assert!(!eval("verb NOT IN ('a', 'b')", event.clone()));
        assert!(!eval("verb CONTAINS 'x'", event.clone()));
        assert!(!eval("verb NOT CONTAINS 'x'", event.clone()));
        assert!(!eval("verb STARTSWITH 'x'", event.clone()));
        assert!(!eval("verb NOT STARTSWITH 'x'", event.clone()));
        assert!(!eval("verb ENDSWITH 'x'", event.clone()));
        assert!(!eval("verb NOT ENDSWITH 'x'", event.clone()));
        assert!(!eval("verb MATCH 'x*'", event.clone()));
        assert!(!eval("verb LIKE 'x%'", event.clone()));
        assert!(!eval("verb IS NOT NULL", event.clone()));
        assert!(eval("verb IS NULL", event));
    }

    #[test]
    fn test_null_vs_absent() {
        let event = json!({"errorCode": null});
        assert!(eval("errorCode IS NULL", event.clone()));
        assert!(!eval("errorCode IS NOT NULL", event.clone()));
        // Null is present but not a string: text operators mismatch
        assert!(!eval("errorCode CONTAINS 'x'", event));
    }

    #[test]
    fn test_nested_field() {
        let event = json!({"userIdentity": {"type": "AWSService"}});
        assert!(eval("userIdentity.type = 'AWSService'", event.clone()));
        assert!(!eval("userIdentity.type = 'IAMUser'", event));
    }

    #[test]
    fn test_in_and_not_in() {
        let event = json!({"eventName": "DeleteTrail"});
        assert!(eval("eventName IN ('StopLogging', 'DeleteTrail')", event.clone()));
        assert!(!eval("eventName NOT IN ('StopLogging', 'DeleteTrail')", event.clone()));
        assert!(eval("eventName NOT IN ('CreateUser', 'DeleteUser')", event));
    }

    #[test]
    fn test_contains_case_sensitive() {
        let event = json!({"userAgent": "aws-cli/2.0 Python/3.11"});
        assert!(eval("userAgent CONTAINS 'Python'", event.clone()));
        assert!(!eval("userAgent CONTAINS 'python'", event.clone()));
        assert!(eval("userAgent NOT CONTAINS 'curl'", event));
    }

    #[test]
    fn test_starts_ends_with() {
        let event = json!({"eventName": "AssumeRole"});
        assert!(eval("eventName STARTSWITH 'Assume'", event.clone()));
        assert!(eval("eventName ENDSWITH 'Role'", event.clone()));
        assert!(eval("eventName NOT STARTSWITH 'Console'", event.clone()));
        assert!(!eval("eventName NOT ENDSWITH 'Role'", event));
    }

    #[test]
    fn test_match_wildcard() {
        let event = json!({"eventName": "AssumeRoleWithSAML"});
        assert!(eval("eventName MATCH 'Assume*'", event.clone()));
        assert!(eval("eventName MATCH '*SAML'", event.clone()));
        assert!(!eval("eventName MATCH 'Role*'", event));
    }

    #[test]
    fn test_like() {
        let event = json!({"errorCode": "AccessDenied"});
        assert!(eval("errorCode LIKE '%Denied'", event.clone()));
        assert!(eval("errorCode LIKE 'Access_enied'", event.clone()));
        assert!(!eval("errorCode LIKE 'Denied%'", event));
    }

    #[test]
    fn test_numeric_comparison() {
        let event = json!({"bytes": 1500});
        assert!(eval("bytes > 1000", event.clone()));
        assert!(eval("bytes <= 1500", event.clone()));
        assert!(!eval("bytes < 1500", event.clone()));
        // Numeric string on the left coerces
        assert!(eval("bytes >= '1500'", event));
    }

    #[test]
    fn test_non_numeric_comparison_is_false() {
        let event = json!({"name": "abc"});
        assert!(!eval("name > 5", event.clone()));
        assert!(!eval("name < 5", event));
    }

    #[test]
    fn test_collection_values_are_type_mismatch() {
        let event = json!({"tags": ["a", "b"]});
        assert!(!eval("tags CONTAINS 'a'", event.clone()));
        assert!(!eval("tags = 'a'", event.clone()));
        assert!(eval("tags IS NOT NULL", event));
    }

    #[test]
    fn test_double_negation() {
        let event = json!({"eventName": "AssumeRole"});
        assert_eq!(
            eval("NOT NOT eventName = 'AssumeRole'", event.clone()),
            eval("eventName = 'AssumeRole'", event)
        );
    }

    #[test]
    fn test_not_flips_absent_contains() {
        // NOT (verb CONTAINS 'x') differs from verb NOT CONTAINS 'x' on
        // a record without the field: the former is vacuously true.
        let event = json!({"name": "test"});
        assert!(eval("NOT (verb CONTAINS 'x')", event.clone()));
        assert!(!eval("verb NOT CONTAINS 'x'", event));
    }

    #[test]
    fn test_parenthesized_grouping() {
        // No verb, no userAgent: the whole clause must be false
        let event = json!({"eventName": "AttachRolePolicy"});
        assert!(!eval(
            "verb != '' AND (userAgent CONTAINS 'python' OR userAgent CONTAINS 'curl')",
            event
        ));
    }

    #[test]
    fn test_or_across_groups() {
        let event = json!({"a": "1", "d": "4"});
        assert!(eval("(a = '1' AND b = '2') OR d = '4'", event.clone()));
        assert!(!eval("(a = '1' AND b = '2') OR d = '5'", event));
    }
}
