//! Profile-driven code emission
//!
//! Writes expression trees and the three routines (`initializeConstants`,
//! `computeRates`, `computeVariables`) using only the fragments of a
//! [`GeneratorProfile`].

use tracing::debug;

use super::ast::{ATOM_PRECEDENCE, BinaryOp, Expr, NamedConstant, UnaryOp};
use super::profile::GeneratorProfile;

/// Where an initial value comes from
#[derive(Debug, Clone, PartialEq)]
pub enum InitialSource {
    /// Literal text, already normalised
    Literal(String),
    /// Copy of another classified variable
    Variable(String),
}

/// One statement of the constants routine
#[derive(Debug, Clone, PartialEq)]
pub struct InitialAssignment {
    pub variable: String,
    pub value: InitialSource,
}

pub struct CodeEmitter<'a> {
    pub profile: &'a GeneratorProfile,
    pub interface_file_name: &'a str,
    pub voi: Option<&'a str>,
    pub states: &'a [String],
    pub algebraic: &'a [String],
}

impl CodeEmitter<'_> {
    /// Storage slot of a variable, or its bare name if it has none
    pub fn reference(&self, name: &str) -> String {
        if self.voi == Some(name) {
            return self.profile.voi.clone();
        }
        if let Some(index) = self.states.iter().position(|s| s == name) {
            return self.profile.element(&self.profile.states_array, index);
        }
        if let Some(index) = self.algebraic.iter().position(|a| a == name) {
            return self.profile.element(&self.profile.algebraic_alias, index);
        }
        name.to_string()
    }

    fn rate(&self, name: &str) -> String {
        match self.states.iter().position(|s| s == name) {
            Some(index) => self.profile.element(&self.profile.rates_array, index),
            None => name.to_string(),
        }
    }

    pub fn expression(&self, expr: &Expr) -> String {
        let p = self.profile;
        match expr {
            Expr::Constant(text) => text.clone(),
            Expr::Boolean(true) => p.true_value.clone(),
            Expr::Boolean(false) => p.false_value.clone(),
            Expr::NamedConstant(NamedConstant::Pi) => p.pi.clone(),
            Expr::NamedConstant(NamedConstant::E) => p.e.clone(),
            Expr::NamedConstant(NamedConstant::Infinity) => p.infinity.clone(),
            Expr::NamedConstant(NamedConstant::NaN) => p.nan.clone(),
            Expr::Variable(name) => self.reference(name),
            Expr::Derivative(name) => self.rate(name),
            Expr::Unary { op, operand } if op.is_function() => {
                p.call(self.function_name(*op), &[self.expression(operand)])
            }
            Expr::Unary { op, operand } => {
                let prefix = match op {
                    UnaryOp::Not => &p.not,
                    UnaryOp::Minus => &p.minus,
                    _ => &p.plus,
                };
                let inner = self.expression(operand);
                if operand.precedence() < ATOM_PRECEDENCE {
                    format!("{}({})", prefix, inner)
                } else {
                    format!("{}{}", prefix, inner)
                }
            }
            Expr::Binary {
                op: BinaryOp::Power,
                lhs,
                rhs,
            } => p.call(&p.power, &[self.expression(lhs), self.expression(rhs)]),
            Expr::Binary { op, lhs, rhs } => format!(
                "{}{}{}",
                self.operand(lhs, *op, true),
                self.operator(*op),
                self.operand(rhs, *op, false)
            ),
        }
    }

    fn operand(&self, child: &Expr, parent: BinaryOp, left: bool) -> String {
        let text = self.expression(child);
        let child_precedence = child.precedence();
        let parent_precedence = parent.precedence();

        let nested_comparison =
            parent.is_comparison() && matches!(child, Expr::Binary { op, .. } if op.is_comparison());

        let wrap = if nested_comparison {
            // Python would read `a < b == c` as a chain
            true
        } else if child_precedence != parent_precedence {
            child_precedence < parent_precedence
        } else if left {
            parent.is_comparison()
        } else {
            let same_op = matches!(child, Expr::Binary { op, .. } if *op == parent);
            !(same_op && parent.is_associative())
        };

        if wrap { format!("({})", text) } else { text }
    }

    fn operator(&self, op: BinaryOp) -> &str {
        let p = self.profile;
        match op {
            BinaryOp::Eq => &p.eq,
            BinaryOp::Neq => &p.neq,
            BinaryOp::Lt => &p.lt,
            BinaryOp::Leq => &p.leq,
            BinaryOp::Gt => &p.gt,
            BinaryOp::Geq => &p.geq,
            BinaryOp::And => &p.and,
            BinaryOp::Or => &p.or,
            BinaryOp::Plus => &p.plus,
            BinaryOp::Minus => &p.minus,
            BinaryOp::Times => &p.times,
            BinaryOp::Divide => &p.divide,
            BinaryOp::Power => &p.power,
        }
    }

    fn function_name(&self, op: UnaryOp) -> &str {
        let p = self.profile;
        match op {
            UnaryOp::Abs => &p.absolute_value,
            UnaryOp::Exp => &p.exponential,
            UnaryOp::Ln => &p.natural_logarithm,
            UnaryOp::Log10 => &p.common_logarithm,
            UnaryOp::Floor => &p.floor,
            UnaryOp::Ceiling => &p.ceiling,
            UnaryOp::Sqrt => &p.square_root,
            UnaryOp::Sin => &p.sin,
            UnaryOp::Cos => &p.cos,
            UnaryOp::Tan => &p.tan,
            UnaryOp::Sinh => &p.sinh,
            UnaryOp::Cosh => &p.cosh,
            UnaryOp::Tanh => &p.tanh,
            UnaryOp::Asin => &p.asin,
            UnaryOp::Acos => &p.acos,
            UnaryOp::Atan => &p.atan,
            UnaryOp::Plus => &p.plus,
            UnaryOp::Minus => &p.minus,
            UnaryOp::Not => &p.not,
        }
    }

    fn statement(&self, target: &str, value: &str, comment: Option<&str>) -> String {
        format!(
            "{}{}{}{}{}",
            target,
            self.profile.assignment,
            value,
            self.profile.statement_terminator,
            comment.map(|c| self.profile.comment_text(c)).unwrap_or_default()
        )
    }

    fn routine(&self, name: &str, begin: &str, statements: &[String]) -> String {
        debug!("Emitting routine {} with {} statements", name, statements.len());
        let p = self.profile;
        let mut out = begin.to_string();
        out.push_str(&p.indent);
        out.push_str(
            &p.alias_declaration
                .replace("[NAME]", &p.algebraic_alias)
                .replace("[CODE]", &p.variables_array),
        );
        out.push('\n');
        if !statements.is_empty() {
            out.push('\n');
            for statement in statements {
                out.push_str(&p.indent);
                out.push_str(statement);
                out.push('\n');
            }
        }
        out.push_str(&p.routine_end);
        out
    }

    /// Declarations blob; empty for profiles without one
    pub fn interface(&self) -> String {
        let p = self.profile;
        if !p.has_interface {
            return String::new();
        }
        let mut out = p.interface_header.clone();
        out.push('\n');
        out.push_str(&p.interface_state_count);
        out.push_str(&p.interface_variable_count);
        out.push('\n');
        out.push_str(&p.interface_initialize_constants);
        out.push_str(&p.interface_compute_rates);
        out.push_str(&p.interface_compute_variables);
        out
    }

    /// Definitions blob
    ///
    /// Equations whose left side is a derivative go to the rates routine,
    /// those with a plain variable to the variables routine, in source order.
    pub fn implementation(&self, initial_values: &[InitialAssignment], equations: &[Expr]) -> String {
        let p = self.profile;

        let constants: Vec<String> = initial_values
            .iter()
            .map(|assignment| {
                let value = match &assignment.value {
                    InitialSource::Literal(text) => text.clone(),
                    InitialSource::Variable(name) => self.reference(name),
                };
                self.statement(&self.reference(&assignment.variable), &value, Some(&assignment.variable))
            })
            .collect();

        let mut rates = Vec::new();
        let mut variables = Vec::new();
        for equation in equations {
            let Some((lhs, rhs)) = equation.equation_sides() else {
                continue;
            };
            match lhs {
                Expr::Derivative(name) => rates.push(self.statement(&self.rate(name), &self.expression(rhs), None)),
                Expr::Variable(name) => {
                    variables.push(self.statement(&self.reference(name), &self.expression(rhs), None))
                }
                _ => {}
            }
        }

        let mut out = p
            .implementation_header
            .replace("[INTERFACE_FILE_NAME]", self.interface_file_name);
        out.push('\n');
        out.push_str(&p.implementation_state_count.replace("[COUNT]", &self.states.len().to_string()));
        out.push_str(
            &p.implementation_variable_count
                .replace("[COUNT]", &self.algebraic.len().to_string()),
        );
        out.push_str(&p.routine_separator);
        out.push_str(&self.routine("initializeConstants", &p.initialize_constants_begin, &constants));
        out.push_str(&p.routine_separator);
        out.push_str(&self.routine("computeRates", &p.compute_rates_begin, &rates));
        out.push_str(&p.routine_separator);
        out.push_str(&self.routine("computeVariables", &p.compute_variables_begin, &variables));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Variable(name.to_string())
    }

    fn emit(profile: &GeneratorProfile, expr: &Expr) -> String {
        let states = vec!["y".to_string()];
        let algebraic = vec!["a".to_string(), "b".to_string()];
        let emitter = CodeEmitter {
            profile,
            interface_file_name: "model.h",
            voi: Some("t"),
            states: &states,
            algebraic: &algebraic,
        };
        emitter.expression(expr)
    }

    #[test]
    fn test_slots() {
        let c = GeneratorProfile::c();
        assert_eq!(emit(&c, &var("t")), "voi");
        assert_eq!(emit(&c, &var("y")), "states[0]");
        assert_eq!(emit(&c, &var("b")), "algebraic[1]");
        assert_eq!(emit(&c, &Expr::Derivative("y".into())), "rates[0]");
    }

    #[test]
    fn test_parentheses_follow_precedence() {
        let c = GeneratorProfile::c();
        let sum = Expr::binary(BinaryOp::Plus, var("a"), var("b"));
        let product = Expr::binary(BinaryOp::Times, sum.clone(), var("y"));
        assert_eq!(emit(&c, &product), "(algebraic[0]+algebraic[1])*states[0]");

        let difference = Expr::binary(BinaryOp::Minus, var("a"), sum.clone());
        assert_eq!(emit(&c, &difference), "algebraic[0]-(algebraic[0]+algebraic[1])");

        let chained = Expr::binary(BinaryOp::Plus, var("y"), sum);
        assert_eq!(emit(&c, &chained), "states[0]+algebraic[0]+algebraic[1]");

        let negated = Expr::binary(BinaryOp::Times, Expr::constant("-2"), Expr::unary(UnaryOp::Minus, var("a")));
        assert_eq!(emit(&c, &negated), "(-2.0)*(-algebraic[0])");
    }

    #[test]
    fn test_nested_comparison_is_never_chained() {
        let python = GeneratorProfile::python();
        let left = Expr::binary(BinaryOp::Eq, Expr::binary(BinaryOp::Lt, var("a"), var("b")), var("y"));
        assert_eq!(emit(&python, &left), "(algebraic[0] < algebraic[1]) == states[0]");

        let right = Expr::binary(BinaryOp::Lt, var("a"), Expr::binary(BinaryOp::Neq, var("b"), var("y")));
        assert_eq!(emit(&python, &right), "algebraic[0] < (algebraic[1] != states[0])");

        let same = Expr::binary(BinaryOp::Eq, Expr::binary(BinaryOp::Eq, var("a"), var("b")), var("y"));
        assert_eq!(emit(&GeneratorProfile::c(), &same), "(algebraic[0] == algebraic[1]) == states[0]");
    }

    #[test]
    fn test_logic_in_both_profiles() {
        let condition = Expr::unary(
            UnaryOp::Not,
            Expr::binary(
                BinaryOp::Or,
                Expr::binary(BinaryOp::Lt, var("a"), Expr::constant("1")),
                Expr::Boolean(true),
            ),
        );
        assert_eq!(emit(&GeneratorProfile::c(), &condition), "!(algebraic[0] < 1.0 || 1.0)");
        assert_eq!(
            emit(&GeneratorProfile::python(), &condition),
            "not (algebraic[0] < 1.0 or 1.0)"
        );
    }

    #[test]
    fn test_functions_and_power() {
        let c = GeneratorProfile::c();
        let expr = Expr::binary(
            BinaryOp::Power,
            Expr::unary(UnaryOp::Abs, var("a")),
            Expr::NamedConstant(NamedConstant::Pi),
        );
        assert_eq!(emit(&c, &expr), "pow(fabs(algebraic[0]), M_PI)");
    }
}
