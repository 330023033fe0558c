//! Expression tree produced from MathML

use std::fmt;

/// Named mathematical constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedConstant {
    Pi,
    E,
    Infinity,
    NaN,
}

/// Unary operators and one-argument functions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
    Abs,
    Exp,
    Ln,
    Log10,
    Floor,
    Ceiling,
    Sqrt,
    Sin,
    Cos,
    Tan,
    Sinh,
    Cosh,
    Tanh,
    Asin,
    Acos,
    Atan,
}

impl UnaryOp {
    /// Operators written as a function call rather than a prefix
    pub fn is_function(&self) -> bool {
        !matches!(self, UnaryOp::Plus | UnaryOp::Minus | UnaryOp::Not)
    }

    /// Function for a MathML element name
    pub fn from_element(name: &str) -> Option<Self> {
        let op = match name {
            "abs" => UnaryOp::Abs,
            "exp" => UnaryOp::Exp,
            "ln" => UnaryOp::Ln,
            "floor" => UnaryOp::Floor,
            "ceiling" => UnaryOp::Ceiling,
            "sin" => UnaryOp::Sin,
            "cos" => UnaryOp::Cos,
            "tan" => UnaryOp::Tan,
            "sinh" => UnaryOp::Sinh,
            "cosh" => UnaryOp::Cosh,
            "tanh" => UnaryOp::Tanh,
            "arcsin" => UnaryOp::Asin,
            "arccos" => UnaryOp::Acos,
            "arctan" => UnaryOp::Atan,
            _ => return None,
        };
        Some(op)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Eq,
    Neq,
    Lt,
    Leq,
    Gt,
    Geq,
    And,
    Or,
    Plus,
    Minus,
    Times,
    Divide,
    Power,
}

impl BinaryOp {
    pub fn from_element(name: &str) -> Option<Self> {
        let op = match name {
            "eq" => BinaryOp::Eq,
            "neq" => BinaryOp::Neq,
            "lt" => BinaryOp::Lt,
            "leq" => BinaryOp::Leq,
            "gt" => BinaryOp::Gt,
            "geq" => BinaryOp::Geq,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "plus" => BinaryOp::Plus,
            "minus" => BinaryOp::Minus,
            "times" => BinaryOp::Times,
            "divide" => BinaryOp::Divide,
            "power" => BinaryOp::Power,
            _ => return None,
        };
        Some(op)
    }

    /// Binding strength when written infix; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Eq | BinaryOp::Neq => 3,
            BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq => 4,
            BinaryOp::Plus | BinaryOp::Minus => 5,
            BinaryOp::Times | BinaryOp::Divide => 6,
            BinaryOp::Power => ATOM_PRECEDENCE,
        }
    }

    /// `a op (b op c)` may drop its parentheses
    pub fn is_associative(&self) -> bool {
        matches!(self, BinaryOp::Plus | BinaryOp::Times | BinaryOp::And | BinaryOp::Or)
    }

    /// Comparisons never chain
    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Neq | BinaryOp::Lt | BinaryOp::Leq | BinaryOp::Gt | BinaryOp::Geq
        )
    }
}

/// Precedence of leaves and function calls
pub const ATOM_PRECEDENCE: u8 = 9;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal text, always containing `.` or an exponent
    Constant(String),
    Boolean(bool),
    NamedConstant(NamedConstant),
    Variable(String),
    /// Rate of change of a state variable with respect to the VOI
    Derivative(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    pub fn zero() -> Self {
        Expr::Constant("0.0".to_string())
    }

    pub fn one() -> Self {
        Expr::Constant("1.0".to_string())
    }

    /// Constant from literal text, adding `.0` to plain integers
    pub fn constant(text: &str) -> Self {
        if text.contains(['.', 'e', 'E']) {
            Expr::Constant(text.to_string())
        } else {
            Expr::Constant(format!("{}.0", text))
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `a op (b op (c op d))`; `None` for no operands
    pub fn right_fold(op: BinaryOp, operands: Vec<Expr>) -> Option<Self> {
        let mut operands = operands.into_iter().rev();
        let last = operands.next()?;
        Some(operands.fold(last, |acc, e| Expr::binary(op, e, acc)))
    }

    pub fn precedence(&self) -> u8 {
        match self {
            Expr::Constant(text) if text.starts_with('-') => 0,
            Expr::Unary { op, .. } if !op.is_function() => 0,
            Expr::Binary { op, .. } => op.precedence(),
            _ => ATOM_PRECEDENCE,
        }
    }

    /// Left operand of an equation node
    pub fn equation_sides(&self) -> Option<(&Expr, &Expr)> {
        match self {
            Expr::Binary {
                op: BinaryOp::Eq,
                lhs,
                rhs,
            } => Some((lhs, rhs)),
            _ => None,
        }
    }
}

impl fmt::Display for NamedConstant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NamedConstant::Pi => "pi",
            NamedConstant::E => "exponentiale",
            NamedConstant::Infinity => "infinity",
            NamedConstant::NaN => "notanumber",
        };
        f.write_str(name)
    }
}
