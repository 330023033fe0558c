//! MathML to expression tree
//!
//! [`TreeBuilder`] translates content MathML into [`Expr`] nodes and, as it
//! goes, classifies the variables it meets into states (seen under a
//! derivative) and algebraic variables. Constructs it cannot translate are
//! reported and replaced by a zero constant so one pass surfaces every
//! problem.

use crate::generator::ast::{BinaryOp, Expr, NamedConstant, UnaryOp};
use crate::issue::{Issue, IssueKind, ItemRef, Issues, Level, ReferenceRule};
use crate::models::{ComponentId, Model};
use crate::validation::input::{is_integer_literal, is_real_literal};
use crate::xml::{XmlDocument, XmlNode, XmlNodeKind};

/// Element names the compiler understands
pub const SUPPORTED_ELEMENTS: &[&str] = &[
    "abs",
    "and",
    "apply",
    "arccos",
    "arcsin",
    "arctan",
    "bvar",
    "ceiling",
    "ci",
    "cn",
    "cos",
    "cosh",
    "cot",
    "csc",
    "degree",
    "diff",
    "divide",
    "eq",
    "exp",
    "exponentiale",
    "false",
    "floor",
    "geq",
    "gt",
    "infinity",
    "leq",
    "ln",
    "log",
    "logbase",
    "lt",
    "math",
    "minus",
    "neq",
    "not",
    "notanumber",
    "or",
    "otherwise",
    "pi",
    "piece",
    "piecewise",
    "plus",
    "power",
    "root",
    "sec",
    "sep",
    "sin",
    "sinh",
    "tan",
    "tanh",
    "times",
    "true",
    "xor",
];

/// Nesting beyond this is reported instead of translated
const MAX_DEPTH: usize = 256;

pub fn is_supported_element(name: &str) -> bool {
    SUPPORTED_ELEMENTS.binary_search(&name).is_ok()
}

/// Numeric text of a `cn` element
///
/// `e-notation` literals (`<cn type="e-notation">1<sep/>3</cn>`) come back
/// as `1e3`. The raw text is returned as the error for malformed values.
pub fn literal_text(node: XmlNode<'_>) -> Result<String, String> {
    let mut parts = vec![String::new()];
    for child in node.children() {
        match child.kind() {
            XmlNodeKind::Text => {
                if let Some(part) = parts.last_mut() {
                    part.push_str(child.value());
                }
            }
            XmlNodeKind::Element if child.name() == "sep" => parts.push(String::new()),
            _ => {}
        }
    }

    let e_notation = node.attribute("type") == Some("e-notation") || parts.len() > 1;
    if e_notation {
        let raw = parts.iter().map(|p| p.trim()).collect::<Vec<_>>().join(" ");
        return match parts.as_slice() {
            [mantissa, exponent] if is_real_literal(mantissa.trim()) && is_integer_literal(exponent.trim()) => {
                Ok(format!("{}e{}", mantissa.trim(), exponent.trim()))
            }
            _ => Err(raw),
        };
    }

    let text = parts[0].trim();
    if is_real_literal(text) {
        Ok(text.to_string())
    } else {
        Err(text.to_string())
    }
}

/// Name of the first `bvar` under a `diff`, searching depth-first
pub fn find_voi(doc: &XmlDocument) -> Option<String> {
    let mut stack: Vec<XmlNode<'_>> = doc.top_level().collect();
    stack.reverse();
    while let Some(node) = stack.pop() {
        if node.is_element("apply") {
            let mut children = node.element_children();
            if children.next().is_some_and(|op| op.name() == "diff") {
                let voi = children
                    .filter(|c| c.name() == "bvar")
                    .flat_map(|bvar| bvar.element_children())
                    .find(|c| c.name() == "ci")
                    .map(|ci| ci.text().trim().to_string());
                if voi.is_some() {
                    return voi;
                }
            }
        }
        let mut children: Vec<XmlNode<'_>> = node.element_children().collect();
        children.reverse();
        stack.extend(children);
    }
    None
}

/// Translates the math of one component
pub struct TreeBuilder<'m> {
    model: &'m Model,
    component: ComponentId,
    voi: Option<String>,
    literal_level: Level,
    depth: usize,
    pub states: Vec<String>,
    pub algebraic: Vec<String>,
    pub issues: Issues,
}

impl<'m> TreeBuilder<'m> {
    pub fn new(model: &'m Model, component: ComponentId, voi: Option<String>, literal_level: Level) -> Self {
        Self {
            model,
            component,
            voi,
            literal_level,
            depth: 0,
            states: Vec::new(),
            algebraic: Vec::new(),
            issues: Issues::new(),
        }
    }

    fn item(&self) -> ItemRef {
        ItemRef::Math {
            component: self.model.component(self.component).name.clone(),
        }
    }

    fn report(&mut self, level: Level, kind: IssueKind, rule: ReferenceRule, description: String) {
        let item = self.item();
        self.issues.push(Issue::new(level, kind, rule, description).with_item(item));
    }

    fn unsupported(&mut self, description: String) -> Expr {
        self.report(
            Level::Error,
            IssueKind::UnsupportedConstruct,
            ReferenceRule::MathUnsupportedElement,
            description,
        );
        Expr::zero()
    }

    /// Translate one MathML element
    pub fn build(&mut self, node: XmlNode<'_>) -> Expr {
        if self.depth >= MAX_DEPTH {
            return self.unsupported(format!("Math is nested more than {} levels deep", MAX_DEPTH));
        }
        self.depth += 1;
        let expr = self.build_node(node);
        self.depth -= 1;
        expr
    }

    fn build_node(&mut self, node: XmlNode<'_>) -> Expr {
        match node.name() {
            "apply" => self.apply(node),
            "ci" => self.variable(node),
            "cn" => self.number(node),
            "true" => Expr::Boolean(true),
            "false" => Expr::Boolean(false),
            "pi" => Expr::NamedConstant(NamedConstant::Pi),
            "exponentiale" => Expr::NamedConstant(NamedConstant::E),
            "infinity" => Expr::NamedConstant(NamedConstant::Infinity),
            "notanumber" => Expr::NamedConstant(NamedConstant::NaN),
            "piecewise" => self.piecewise(node),
            other => self.unsupported(format!("Math element '{}' is not supported here", other)),
        }
    }

    fn variable(&mut self, node: XmlNode<'_>) -> Expr {
        let name = node.text().trim().to_string();
        if self.model.component_variable(self.component, &name).is_none() {
            let component = self.model.component(self.component).name.clone();
            self.report(
                Level::Error,
                IssueKind::MissingReference,
                ReferenceRule::MathCiVariable,
                format!("Variable '{}' is not declared in component '{}'", name, component),
            );
            return Expr::Variable(name);
        }
        if self.voi.as_deref() != Some(name.as_str())
            && !self.states.contains(&name)
            && !self.algebraic.contains(&name)
        {
            self.algebraic.push(name.clone());
        }
        Expr::Variable(name)
    }

    fn number(&mut self, node: XmlNode<'_>) -> Expr {
        match literal_text(node) {
            Ok(text) => Expr::constant(&text),
            Err(raw) => {
                self.report(
                    self.literal_level,
                    IssueKind::MalformedNumericLiteral,
                    ReferenceRule::MathLiteral,
                    format!("Math cn element has the invalid value '{}'; 0.0 is used instead", raw),
                );
                Expr::zero()
            }
        }
    }

    fn apply(&mut self, node: XmlNode<'_>) -> Expr {
        let children: Vec<XmlNode<'_>> = node.element_children().collect();
        let Some((operator, arguments)) = children.split_first() else {
            return self.unsupported("Math has an apply element without an operator".to_string());
        };
        let (qualifiers, operands): (Vec<XmlNode<'_>>, Vec<XmlNode<'_>>) = arguments
            .iter()
            .partition(|a| matches!(a.name(), "bvar" | "degree" | "logbase"));

        let name = operator.name();
        match name {
            "diff" => self.derivative(&qualifiers, &operands),
            "minus" => match operands.as_slice() {
                [operand] => {
                    let operand = self.build(*operand);
                    Expr::unary(UnaryOp::Minus, operand)
                }
                [lhs, rhs] => {
                    let (lhs, rhs) = (self.build(*lhs), self.build(*rhs));
                    Expr::binary(BinaryOp::Minus, lhs, rhs)
                }
                _ => self.arity(name, "1 or 2", operands.len()),
            },
            "plus" if operands.len() == 1 => {
                let operand = self.build(operands[0]);
                Expr::unary(UnaryOp::Plus, operand)
            }
            "plus" | "times" | "and" | "or" => {
                let op = BinaryOp::from_element(name).unwrap_or(BinaryOp::Plus);
                let built = operands.iter().map(|o| self.build(*o)).collect();
                match Expr::right_fold(op, built) {
                    Some(expr) => expr,
                    None => self.arity(name, "at least 1", 0),
                }
            }
            "xor" => {
                let built: Vec<Expr> = operands.iter().map(|o| self.build(*o)).collect();
                if built.len() < 2 {
                    return self.arity(name, "at least 2", built.len());
                }
                let mut built = built.into_iter().rev();
                let last = built.next().unwrap_or_else(Expr::zero);
                built.fold(last, |acc, e| xor(e, acc))
            }
            "eq" | "neq" | "lt" | "leq" | "gt" | "geq" | "divide" | "power" => match operands.as_slice() {
                [lhs, rhs] => {
                    let op = BinaryOp::from_element(name).unwrap_or(BinaryOp::Eq);
                    let (lhs, rhs) = (self.build(*lhs), self.build(*rhs));
                    Expr::binary(op, lhs, rhs)
                }
                _ => self.arity(name, "2", operands.len()),
            },
            "not" => match operands.as_slice() {
                [operand] => {
                    let operand = self.build(*operand);
                    Expr::unary(UnaryOp::Not, operand)
                }
                _ => self.arity(name, "1", operands.len()),
            },
            "sec" | "csc" | "cot" => match operands.as_slice() {
                [operand] => {
                    let inner = match name {
                        "sec" => UnaryOp::Cos,
                        "csc" => UnaryOp::Sin,
                        _ => UnaryOp::Tan,
                    };
                    let operand = self.build(*operand);
                    Expr::binary(BinaryOp::Divide, Expr::one(), Expr::unary(inner, operand))
                }
                _ => self.arity(name, "1", operands.len()),
            },
            "root" => match operands.as_slice() {
                [operand] => {
                    let operand = self.build(*operand);
                    match self.qualifier(&qualifiers, "degree") {
                        Some(degree) => Expr::binary(
                            BinaryOp::Power,
                            operand,
                            Expr::binary(BinaryOp::Divide, Expr::one(), degree),
                        ),
                        None => Expr::unary(UnaryOp::Sqrt, operand),
                    }
                }
                _ => self.arity(name, "1", operands.len()),
            },
            "log" => match operands.as_slice() {
                [operand] => {
                    let operand = self.build(*operand);
                    match self.qualifier(&qualifiers, "logbase") {
                        Some(base) => Expr::binary(
                            BinaryOp::Divide,
                            Expr::unary(UnaryOp::Ln, operand),
                            Expr::unary(UnaryOp::Ln, base),
                        ),
                        None => Expr::unary(UnaryOp::Log10, operand),
                    }
                }
                _ => self.arity(name, "1", operands.len()),
            },
            _ => match UnaryOp::from_element(name) {
                Some(op) => match operands.as_slice() {
                    [operand] => {
                        let operand = self.build(*operand);
                        Expr::unary(op, operand)
                    }
                    _ => self.arity(name, "1", operands.len()),
                },
                None => self.unsupported(format!("Math operator '{}' is not supported", name)),
            },
        }
    }

    fn arity(&mut self, operator: &str, expected: &str, found: usize) -> Expr {
        self.unsupported(format!(
            "Math operator '{}' expects {} arguments but has {}",
            operator, expected, found
        ))
    }

    /// Content of a `degree` or `logbase` qualifier
    fn qualifier(&mut self, qualifiers: &[XmlNode<'_>], name: &str) -> Option<Expr> {
        let node = qualifiers.iter().find(|q| q.name() == name)?;
        let inner = node.element_children().next()?;
        Some(self.build(inner))
    }

    fn derivative(&mut self, qualifiers: &[XmlNode<'_>], operands: &[XmlNode<'_>]) -> Expr {
        let bvar = qualifiers
            .iter()
            .find(|q| q.name() == "bvar")
            .and_then(|b| b.element_children().find(|c| c.name() == "ci"))
            .map(|ci| ci.text().trim().to_string());

        let well_formed = match (&self.voi, &bvar) {
            (Some(voi), Some(bvar)) => voi == bvar,
            _ => false,
        };
        let target = match operands {
            [operand] if operand.name() == "ci" => Some(operand.text().trim().to_string()),
            _ => None,
        };

        match (well_formed, target) {
            (true, Some(name)) if self.model.component_variable(self.component, &name).is_some() => {
                self.algebraic.retain(|a| *a != name);
                if !self.states.contains(&name) {
                    self.states.push(name.clone());
                }
                Expr::Derivative(name)
            }
            (true, Some(name)) => {
                let component = self.model.component(self.component).name.clone();
                self.report(
                    Level::Error,
                    IssueKind::MissingReference,
                    ReferenceRule::MathCiVariable,
                    format!("Variable '{}' is not declared in component '{}'", name, component),
                );
                Expr::Derivative(name)
            }
            _ => {
                self.report(
                    Level::Error,
                    IssueKind::UnsupportedConstruct,
                    ReferenceRule::GeneratorVoi,
                    format!(
                        "Derivative with respect to '{}' is not a derivative of a variable with respect to the variable of integration '{}'",
                        bvar.unwrap_or_default(),
                        self.voi.clone().unwrap_or_default()
                    ),
                );
                Expr::zero()
            }
        }
    }

    fn piecewise(&mut self, node: XmlNode<'_>) -> Expr {
        let mut terms = Vec::new();
        let mut conditions = Vec::new();

        for child in node.element_children() {
            let parts: Vec<XmlNode<'_>> = child.element_children().collect();
            match (child.name(), parts.as_slice()) {
                ("piece", [value, condition]) => {
                    let value = self.build(*value);
                    let condition = self.build(*condition);
                    conditions.push(condition.clone());
                    terms.push(Expr::binary(BinaryOp::Times, value, condition));
                }
                ("otherwise", [value]) => {
                    let value = self.build(*value);
                    let term = match Expr::right_fold(BinaryOp::Or, conditions.clone()) {
                        Some(any) => Expr::binary(BinaryOp::Times, value, Expr::unary(UnaryOp::Not, any)),
                        None => value,
                    };
                    terms.push(term);
                }
                (name, _) => {
                    let replacement = self.unsupported(format!("Math piecewise has a malformed '{}' element", name));
                    terms.push(replacement);
                }
            }
        }

        match Expr::right_fold(BinaryOp::Plus, terms) {
            Some(sum) => sum,
            None => self.unsupported("Math piecewise has no pieces".to_string()),
        }
    }
}

fn xor(a: Expr, b: Expr) -> Expr {
    Expr::binary(
        BinaryOp::And,
        Expr::binary(BinaryOp::Or, a.clone(), b.clone()),
        Expr::unary(UnaryOp::Not, Expr::binary(BinaryOp::And, a, b)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Component, Variable};

    fn build(math: &str, variables: &[&str]) -> (Expr, TreeBuilder<'static>) {
        let mut model = Model::new("m");
        let c = model.add_component(Component::new("c"), None);
        for v in variables {
            model.add_variable(c, Variable::new(*v, "dimensionless"));
        }
        let model: &'static Model = Box::leak(Box::new(model));

        let doc = XmlDocument::parse(math).unwrap();
        let voi = find_voi(&doc);
        let mut builder = TreeBuilder::new(model, c, voi, Level::Warning);
        let root = doc.root().unwrap();
        let nodes: Vec<XmlNode<'_>> = if root.name() == "math" {
            root.element_children().collect()
        } else {
            vec![root]
        };
        let mut built: Vec<Expr> = nodes.into_iter().map(|n| builder.build(n)).collect();
        (built.remove(0), builder)
    }

    #[test]
    fn test_supported_elements_sorted() {
        assert!(SUPPORTED_ELEMENTS.windows(2).all(|w| w[0] < w[1]));
        assert!(is_supported_element("piecewise"));
        assert!(!is_supported_element("laplacian"));
    }

    #[test]
    fn test_e_notation_literal() {
        let doc = XmlDocument::parse(r#"<cn type="e-notation">1.5<sep/>-3</cn>"#).unwrap();
        assert_eq!(literal_text(doc.root().unwrap()), Ok("1.5e-3".to_string()));

        let doc = XmlDocument::parse("<cn>1.2.3</cn>").unwrap();
        assert_eq!(literal_text(doc.root().unwrap()), Err("1.2.3".to_string()));
    }

    #[test]
    fn test_derivative_promotes_to_state() {
        let (_, builder) = build(
            "<math><apply><eq/><ci>k</ci><ci>y</ci></apply>\
             <apply><eq/><apply><diff/><bvar><ci>t</ci></bvar><ci>y</ci></apply><ci>k</ci></apply></math>",
            &["t", "y", "k"],
        );
        assert_eq!(builder.states, vec!["y".to_string()]);
        assert_eq!(builder.algebraic, vec!["k".to_string()]);
        assert!(builder.issues.is_empty());
    }

    #[test]
    fn test_piecewise_lowers_to_sum_of_products() {
        let (expr, _) = build(
            "<piecewise><piece><cn>1</cn><ci>c</ci></piece><otherwise><cn>2</cn></otherwise></piecewise>",
            &["c"],
        );
        let condition = Expr::Variable("c".into());
        let expected = Expr::binary(
            BinaryOp::Plus,
            Expr::binary(BinaryOp::Times, Expr::constant("1"), condition.clone()),
            Expr::binary(
                BinaryOp::Times,
                Expr::constant("2"),
                Expr::unary(UnaryOp::Not, condition),
            ),
        );
        assert_eq!(expr, expected);
    }

    #[test]
    fn test_unsupported_element_becomes_zero() {
        let (expr, builder) = build("<apply><plus/><ci>a</ci><apply><laplacian/><ci>a</ci></apply></apply>", &["a"]);
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Plus, Expr::Variable("a".into()), Expr::zero())
        );
        assert_eq!(builder.issues.of_kind(IssueKind::UnsupportedConstruct).count(), 1);
    }

    #[test]
    fn test_reciprocal_trigonometry_and_log_base() {
        let (sec, _) = build("<apply><sec/><ci>a</ci></apply>", &["a"]);
        assert_eq!(
            sec,
            Expr::binary(
                BinaryOp::Divide,
                Expr::one(),
                Expr::unary(UnaryOp::Cos, Expr::Variable("a".into()))
            )
        );

        let (log, _) = build("<apply><log/><logbase><cn>2</cn></logbase><ci>a</ci></apply>", &["a"]);
        assert_eq!(
            log,
            Expr::binary(
                BinaryOp::Divide,
                Expr::unary(UnaryOp::Ln, Expr::Variable("a".into())),
                Expr::unary(UnaryOp::Ln, Expr::constant("2")),
            )
        );
    }
}
