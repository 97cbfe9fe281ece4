//! Condition expression evaluation.
//!
//! Evaluates the minimal `<field> <operator> <value>` grammar used by
//! CONDITION steps. Supported operators: `equals`, `contains`, `exists`.
//! There is deliberately no boolean composition and no numeric comparison;
//! any expression that does not parse into the three-token shape evaluates
//! to false rather than raising an error.

use crate::context::StepContext;

/// Operator in a condition expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOp {
    /// Exact string match against the coerced field value.
    Equals,
    /// Substring match against the coerced field value.
    Contains,
    /// Field is present and non-null; the value token is ignored.
    Exists,
}

impl ConditionOp {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "equals" => Some(Self::Equals),
            "contains" => Some(Self::Contains),
            "exists" => Some(Self::Exists),
            _ => None,
        }
    }
}

/// Evaluator for condition expressions.
#[derive(Debug, Clone, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Create a new condition evaluator.
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an expression against the context.
    ///
    /// Malformed expressions evaluate to false and are logged at debug
    /// level; they are never surfaced as errors.
    pub fn evaluate(&self, expression: &str, ctx: &StepContext) -> bool {
        match parse_expression(expression) {
            Some((field, op, value)) => apply(field, op, value, ctx),
            None => {
                tracing::debug!(expression = %expression, "Malformed condition expression");
                false
            }
        }
    }
}

/// Parse `<field> <operator> <value>` into its parts.
///
/// The value may be quoted (single or double) and may contain spaces; the
/// quotes are stripped. Anything else is malformed.
fn parse_expression(expression: &str) -> Option<(&str, ConditionOp, &str)> {
    let mut parts = expression.trim().splitn(3, char::is_whitespace);
    let field = parts.next().filter(|s| !s.is_empty())?;
    let op = ConditionOp::parse(parts.next()?)?;
    let value = parts.next().map(str::trim).filter(|s| !s.is_empty())?;
    Some((field, op, strip_quotes(value)))
}

fn strip_quotes(value: &str) -> &str {
    let v = value.trim();
    for quote in ['\'', '"'] {
        if v.len() >= 2 && v.starts_with(quote) && v.ends_with(quote) {
            return &v[1..v.len() - 1];
        }
    }
    v
}

fn apply(field: &str, op: ConditionOp, value: &str, ctx: &StepContext) -> bool {
    match op {
        ConditionOp::Exists => ctx.has(field),
        ConditionOp::Equals => ctx
            .coerce_string(field)
            .map(|actual| actual == value)
            .unwrap_or(false),
        ConditionOp::Contains => ctx
            .coerce_string(field)
            .map(|actual| actual.contains(value))
            .unwrap_or(false),
    }
}
