//! Evaluates an [`Expr`] tree to a concrete CSS value.
//!
//! Unit-arithmetic rules are transcribed from
//! `examples/original_source/CHTL/CHTLEvaluator/ExpressionEvaluator.cpp`:
//! `+`/`-` require matching units (or one side unitless), `*` requires at
//! most one side to carry a unit, `/` has its own rule (matching units
//! cancel to unit-less, a unit on the left alone carries, a unit on the
//! right alone is an error), `%` keeps the left side's unit, `**` requires
//! the exponent to be unitless. Comparisons and boolean operators are
//! unit-blind and produce unitless numbers (`1.0`/`0.0`).

use super::{BinaryOp, Expr, UnaryOp};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatedValue {
    Number { value: f64, unit: Option<String> },
    Str(String),
}

impl EvaluatedValue {
    pub fn number(value: f64, unit: Option<String>) -> Self {
        Self::Number { value, unit }
    }

    fn truthy(&self) -> bool {
        match self {
            EvaluatedValue::Number { value, .. } => *value != 0.0,
            EvaluatedValue::Str(s) => !s.is_empty(),
        }
    }

    fn as_number(&self) -> Option<(f64, Option<&str>)> {
        match self {
            EvaluatedValue::Number { value, unit } => Some((*value, unit.as_deref())),
            EvaluatedValue::Str(_) => None,
        }
    }
}

impl fmt::Display for EvaluatedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvaluatedValue::Number { value, unit } => {
                if value.fract() == 0.0 {
                    write!(f, "{}", *value as i64)?;
                } else {
                    write!(f, "{}", value)?;
                }
                if let Some(u) = unit {
                    write!(f, "{}", u)?;
                }
                Ok(())
            }
            EvaluatedValue::Str(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EvalError {
    UnitMismatch { op: &'static str, left: String, right: String },
    UnresolvedProperty(String),
    UnresolvedVariable { template: String, var: String },
    NonNumericOperand { op: &'static str },
    DivisionByZero,
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::UnitMismatch { op, left, right } => {
                write!(f, "incompatible units for '{}': '{}' vs '{}'", op, left, right)
            }
            EvalError::UnresolvedProperty(name) => write!(f, "unresolved property reference '{}'", name),
            EvalError::UnresolvedVariable { template, var } => {
                write!(f, "unresolved variable '{}({})'", template, var)
            }
            EvalError::NonNumericOperand { op } => write!(f, "'{}' requires a numeric operand", op),
            EvalError::DivisionByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for EvalError {}

/// Resolves the two kinds of external reference an expression can make:
/// a bare sibling property name, and a `Template(var)` variable-group
/// lookup. The generator supplies the concrete implementation backed by the
/// symbol environment; tests use a small in-memory stand-in.
pub trait PropertyLookup {
    fn lookup_property(&self, name: &str) -> Option<EvaluatedValue>;
    fn lookup_variable(&self, template: &str, var: &str) -> Option<EvaluatedValue>;
}

pub struct Evaluator<'a, L: PropertyLookup> {
    lookup: &'a L,
}

impl<'a, L: PropertyLookup> Evaluator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup }
    }

    pub fn eval(&self, expr: &Expr) -> Result<EvaluatedValue, EvalError> {
        match expr {
            Expr::Number { value, unit } => Ok(EvaluatedValue::Number {
                value: *value,
                unit: unit.clone(),
            }),
            Expr::Str(s) => Ok(EvaluatedValue::Str(s.clone())),
            Expr::PropertyRef(name) => match self.lookup.lookup_property(name) {
                Some(v) => Ok(v),
                // An unresolved bare identifier falls back to being its own
                // string literal: `color: red;` has no sibling property
                // named `red`, so it just means the word "red".
                None => Ok(EvaluatedValue::Str(name.clone())),
            },
            Expr::VarAccess { template, var } => self
                .lookup
                .lookup_variable(template, var)
                .ok_or_else(|| EvalError::UnresolvedVariable {
                    template: template.clone(),
                    var: var.clone(),
                }),
            Expr::Group(inner) => self.eval(inner),
            Expr::Unary(op, inner) => self.eval_unary(*op, inner),
            Expr::Binary(op, left, right) => self.eval_binary(*op, left, right),
            Expr::Ternary { cond, then_branch, else_branch } => {
                if self.eval(cond)?.truthy() {
                    self.eval(then_branch)
                } else {
                    self.eval(else_branch)
                }
            }
        }
    }

    fn eval_unary(&self, op: UnaryOp, inner: &Expr) -> Result<EvaluatedValue, EvalError> {
        let value = self.eval(inner)?;
        match op {
            UnaryOp::Neg => {
                let (n, unit) = value
                    .as_number()
                    .ok_or(EvalError::NonNumericOperand { op: "-" })?;
                Ok(EvaluatedValue::number(-n, unit.map(str::to_string)))
            }
            UnaryOp::Not => Ok(EvaluatedValue::number(if value.truthy() { 0.0 } else { 1.0 }, None)),
        }
    }

    fn eval_binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<EvaluatedValue, EvalError> {
        use BinaryOp::*;

        if matches!(op, And | Or) {
            let l = self.eval(left)?.truthy();
            let result = match op {
                And => l && self.eval(right)?.truthy(),
                Or => l || self.eval(right)?.truthy(),
                _ => unreachable!(),
            };
            return Ok(EvaluatedValue::number(if result { 1.0 } else { 0.0 }, None));
        }

        let lv = self.eval(left)?;
        let rv = self.eval(right)?;

        if matches!(op, Eq | Ne) {
            let equal = lv == rv;
            let result = if op == Eq { equal } else { !equal };
            return Ok(EvaluatedValue::number(if result { 1.0 } else { 0.0 }, None));
        }

        let (lnum, lunit) = lv.as_number().ok_or(EvalError::NonNumericOperand { op: op_name(op) })?;
        let (rnum, runit) = rv.as_number().ok_or(EvalError::NonNumericOperand { op: op_name(op) })?;

        match op {
            Lt | Le | Gt | Ge => {
                let result = match op {
                    Lt => lnum < rnum,
                    Le => lnum <= rnum,
                    Gt => lnum > rnum,
                    Ge => lnum >= rnum,
                    _ => unreachable!(),
                };
                Ok(EvaluatedValue::number(if result { 1.0 } else { 0.0 }, None))
            }
            Add | Sub => {
                let unit = unify_additive_units(op_name(op), lunit, runit, &lv, &rv)?;
                let value = if op == Add { lnum + rnum } else { lnum - rnum };
                Ok(EvaluatedValue::number(value, unit))
            }
            Mul => {
                let unit = unify_multiplicative_units(op_name(op), lunit, runit, &lv, &rv)?;
                Ok(EvaluatedValue::number(lnum * rnum, unit))
            }
            Div => {
                if rnum == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                let unit = unify_division_units(lunit, runit, &lv, &rv)?;
                Ok(EvaluatedValue::number(lnum / rnum, unit))
            }
            Mod => {
                if rnum == 0.0 {
                    return Err(EvalError::DivisionByZero);
                }
                Ok(EvaluatedValue::number(lnum % rnum, lunit.map(str::to_string)))
            }
            Pow => {
                if runit.is_some() {
                    return Err(EvalError::UnitMismatch {
                        op: "**",
                        left: lv.to_string(),
                        right: rv.to_string(),
                    });
                }
                Ok(EvaluatedValue::number(lnum.powf(rnum), lunit.map(str::to_string)))
            }
            And | Or | Eq | Ne => unreachable!("handled above"),
        }
    }
}

fn op_name(op: BinaryOp) -> &'static str {
    use BinaryOp::*;
    match op {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        Pow => "**",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Eq => "==",
        Ne => "!=",
        And => "&&",
        Or => "||",
    }
}

/// `+`/`-`: either side may be unitless (binds to the other side's unit),
/// but two differing units never combine.
fn unify_additive_units(
    op: &'static str,
    lunit: Option<&str>,
    runit: Option<&str>,
    lv: &EvaluatedValue,
    rv: &EvaluatedValue,
) -> Result<Option<String>, EvalError> {
    match (lunit, runit) {
        (Some(l), Some(r)) if l == r => Ok(Some(l.to_string())),
        (Some(l), Some(_)) => Err(EvalError::UnitMismatch {
            op,
            left: lv.to_string(),
            right: rv.to_string(),
        }),
        (Some(l), None) => Ok(Some(l.to_string())),
        (None, Some(r)) => Ok(Some(r.to_string())),
        (None, None) => Ok(None),
    }
}

/// `*`: at most one side may carry a unit (you can scale a length by a
/// unitless factor, but multiplying two lengths has no CSS meaning).
fn unify_multiplicative_units(
    op: &'static str,
    lunit: Option<&str>,
    runit: Option<&str>,
    lv: &EvaluatedValue,
    rv: &EvaluatedValue,
) -> Result<Option<String>, EvalError> {
    match (lunit, runit) {
        (Some(_), Some(_)) => Err(EvalError::UnitMismatch {
            op,
            left: lv.to_string(),
            right: rv.to_string(),
        }),
        (Some(l), None) => Ok(Some(l.to_string())),
        (None, Some(r)) => Ok(Some(r.to_string())),
        (None, None) => Ok(None),
    }
}

/// `/` has its own rule, distinct from `*` (spec.md §4.2): same unit on
/// both sides cancels to unit-less; a unit on the left alone carries
/// through; a unit on the right alone is an error (there's no CSS meaning
/// to "unit-less divided by a length").
fn unify_division_units(
    lunit: Option<&str>,
    runit: Option<&str>,
    lv: &EvaluatedValue,
    rv: &EvaluatedValue,
) -> Result<Option<String>, EvalError> {
    match (lunit, runit) {
        (Some(l), Some(r)) if l == r => Ok(None),
        (Some(_), Some(_)) => Err(EvalError::UnitMismatch {
            op: "/",
            left: lv.to_string(),
            right: rv.to_string(),
        }),
        (Some(l), None) => Ok(Some(l.to_string())),
        (None, Some(_)) => Err(EvalError::UnitMismatch {
            op: "/",
            left: lv.to_string(),
            right: rv.to_string(),
        }),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::ExprParser;
    use crate::lexer::tokenize;
    use proptest::prelude::*;
    use rstest::rstest;
    use std::collections::HashMap;

    struct FakeEnv(HashMap<&'static str, EvaluatedValue>);

    impl PropertyLookup for FakeEnv {
        fn lookup_property(&self, name: &str) -> Option<EvaluatedValue> {
            self.0.get(name).cloned()
        }

        fn lookup_variable(&self, template: &str, var: &str) -> Option<EvaluatedValue> {
            if template == "ThemeVars" && var == "primary" {
                Some(EvaluatedValue::Str("#336699".into()))
            } else {
                None
            }
        }
    }

    fn eval_str(src: &str, env: &FakeEnv) -> EvaluatedValue {
        let tokens = tokenize(src);
        let expr = ExprParser::parse(&tokens).expect("parses");
        Evaluator::new(env).eval(&expr).expect("evaluates")
    }

    #[test]
    fn adds_matching_units() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("100px + 50px", &env);
        assert_eq!(result, EvaluatedValue::number(150.0, Some("px".into())));
    }

    #[test]
    fn mismatched_additive_units_error() {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize("100px + 50em");
        let expr = ExprParser::parse(&tokens).unwrap();
        let err = Evaluator::new(&env).eval(&expr).unwrap_err();
        assert!(matches!(err, EvalError::UnitMismatch { op: "+", .. }));
    }

    #[test]
    fn scales_by_unitless_factor() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("10px * 2", &env);
        assert_eq!(result, EvaluatedValue::number(20.0, Some("px".into())));
    }

    #[test]
    fn two_unit_multiplication_errors() {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize("10px * 2em");
        let expr = ExprParser::parse(&tokens).unwrap();
        assert!(Evaluator::new(&env).eval(&expr).is_err());
    }

    #[test]
    fn power_requires_unitless_exponent() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("2 ** 3", &env);
        assert_eq!(result, EvaluatedValue::number(8.0, None));
    }

    #[test]
    fn ternary_picks_branch_by_truthiness() {
        let mut map = HashMap::new();
        map.insert("enabled", EvaluatedValue::number(1.0, None));
        let env = FakeEnv(map);
        let result = eval_str(r#"enabled ? "on" : "off""#, &env);
        assert_eq!(result, EvaluatedValue::Str("on".into()));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize("10px / 0");
        let expr = ExprParser::parse(&tokens).unwrap();
        let err = Evaluator::new(&env).eval(&expr).unwrap_err();
        assert!(matches!(err, EvalError::DivisionByZero));
    }

    #[test]
    fn division_of_matching_units_cancels_to_unitless() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("100px / 50px", &env);
        assert_eq!(result, EvaluatedValue::number(2.0, None));
    }

    #[test]
    fn division_with_unit_on_left_only_carries_the_unit() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("100px / 50", &env);
        assert_eq!(result, EvaluatedValue::number(2.0, Some("px".into())));
    }

    #[test]
    fn division_with_unit_on_right_alone_is_an_error() {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize("100 / 50px");
        let expr = ExprParser::parse(&tokens).unwrap();
        let err = Evaluator::new(&env).eval(&expr).unwrap_err();
        assert!(matches!(err, EvalError::UnitMismatch { op: "/", .. }));
    }

    #[test]
    fn division_with_differing_units_is_an_error() {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize("100px / 50em");
        let expr = ExprParser::parse(&tokens).unwrap();
        let err = Evaluator::new(&env).eval(&expr).unwrap_err();
        assert!(matches!(err, EvalError::UnitMismatch { op: "/", .. }));
    }

    #[test]
    fn variable_access_resolves_from_template() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("ThemeVars(primary)", &env);
        assert_eq!(result, EvaluatedValue::Str("#336699".into()));
    }

    #[test]
    fn unresolved_bare_identifier_is_its_own_string() {
        let env = FakeEnv(HashMap::new());
        let result = eval_str("red", &env);
        assert_eq!(result, EvaluatedValue::Str("red".into()));
    }

    // One row per operator x unit-combination in the spec.md §4.2 rules
    // table — each operator has its own unit rule, so each gets its own
    // row rather than being inferred from a shared one.
    #[rstest]
    #[case::add_matching_units("100px + 50px", 150.0, Some("px"))]
    #[case::add_one_sided_unit("100px + 50", 150.0, Some("px"))]
    #[case::sub_matching_units("100px - 50px", 50.0, Some("px"))]
    #[case::mul_unitless_factor("100px * 2", 200.0, Some("px"))]
    #[case::mul_unit_on_either_side("2 * 100px", 200.0, Some("px"))]
    #[case::div_matching_units_cancel("100px / 50px", 2.0, None)]
    #[case::div_left_unit_carries("100px / 50", 2.0, Some("px"))]
    #[case::mod_keeps_left_unit("100px % 30", 10.0, Some("px"))]
    #[case::mod_unitless("100 % 30", 10.0, None)]
    #[case::pow_unitless_exponent("2 ** 10", 1024.0, None)]
    fn unit_arithmetic_table(#[case] src: &str, #[case] expected_value: f64, #[case] expected_unit: Option<&str>) {
        let env = FakeEnv(HashMap::new());
        let result = eval_str(src, &env);
        assert_eq!(result, EvaluatedValue::number(expected_value, expected_unit.map(str::to_string)));
    }

    #[rstest]
    #[case::add_mismatch("100px + 50em", "+")]
    #[case::mul_two_units("10px * 2em", "*")]
    #[case::div_right_unit_alone("100 / 50px", "/")]
    #[case::div_mismatched_units("100px / 50em", "/")]
    #[case::pow_unit_exponent("2 ** 3px", "**")]
    fn unit_arithmetic_error_table(#[case] src: &str, #[case] expected_op: &'static str) {
        let env = FakeEnv(HashMap::new());
        let tokens = tokenize(src);
        let expr = ExprParser::parse(&tokens).unwrap();
        let err = Evaluator::new(&env).eval(&expr).unwrap_err();
        match err {
            EvalError::UnitMismatch { op, .. } => assert_eq!(op, expected_op),
            other => panic!("expected UnitMismatch({}), got {:?}", expected_op, other),
        }
    }

    proptest! {
        /// spec.md §8: `(a+b)+c == a+(b+c)` within `1e-9`, for unitless
        /// operands (units are required to match at each `+`, so picking
        /// three different units would just test `unify_additive_units`
        /// rather than associativity).
        #[test]
        fn addition_is_associative(a in -1e6f64..1e6, b in -1e6f64..1e6, c in -1e6f64..1e6) {
            let env = FakeEnv(HashMap::new());
            let left_first = eval_str(&format!("({} + {}) + {}", a, b, c), &env);
            let right_first = eval_str(&format!("{} + ({} + {})", a, b, c), &env);
            let (lv, _) = left_first.as_number().unwrap();
            let (rv, _) = right_first.as_number().unwrap();
            prop_assert!((lv - rv).abs() < 1e-9 * (1.0 + lv.abs().max(rv.abs())));
        }
    }
}
