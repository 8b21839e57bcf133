//! Syntax tree the analyzer searches.
//!
//! Only the shapes that matter for locating components and bindings get
//! their own nodes. Everything renders back to Python-like source through
//! `Display`, which is what unresolved values carry.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Parsed Python module: the root of the syntax tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    /// Top-level statements in document order.
    pub body: Vec<Stmt>,
}

/// A statement together with the (1-based) line it starts on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Source line of the first token.
    pub line: usize,
    /// Statement payload.
    pub kind: StmtKind,
}

/// Statement shapes kept after lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum StmtKind {
    /// `a = b = value`
    Assign {
        /// Assignment targets, left to right.
        targets: Vec<Expr>,
        /// Assigned expression.
        value: Expr,
    },
    /// `target: annotation [= value]`
    AnnAssign {
        /// Annotated target.
        target: Expr,
        /// Type annotation.
        annotation: Expr,
        /// Optional assigned expression.
        value: Option<Expr>,
    },
    /// `target op= value`
    AugAssign {
        /// Updated target.
        target: Expr,
        /// Operator without the trailing `=`.
        op: String,
        /// Right-hand side.
        value: Expr,
    },
    /// Bare expression statement.
    Expr {
        /// The evaluated expression.
        value: Expr,
    },
    /// `if` / `elif` / `else`; `elif` chains nest in `orelse`.
    If {
        /// Condition.
        test: Expr,
        /// Taken branch.
        body: Vec<Stmt>,
        /// `else` branch.
        orelse: Vec<Stmt>,
    },
    /// `for target in iter:`
    For {
        /// Loop target.
        target: Expr,
        /// Iterated expression.
        iter: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` block.
        orelse: Vec<Stmt>,
    },
    /// `while test:`
    While {
        /// Condition.
        test: Expr,
        /// Loop body.
        body: Vec<Stmt>,
        /// `else` block.
        orelse: Vec<Stmt>,
    },
    /// `with a as b, c:`
    With {
        /// Context managers.
        items: Vec<WithItem>,
        /// Managed block.
        body: Vec<Stmt>,
    },
    /// `def name(...):`
    FunctionDef {
        /// Function name.
        name: String,
        /// Parameters in declaration order.
        params: Vec<Param>,
        /// Decorator expressions.
        decorators: Vec<Expr>,
        /// Function body.
        body: Vec<Stmt>,
    },
    /// `class Name(bases):`
    ClassDef {
        /// Class name.
        name: String,
        /// Base classes and class keywords, rendered as expressions.
        bases: Vec<Expr>,
        /// Decorator expressions.
        decorators: Vec<Expr>,
        /// Class body.
        body: Vec<Stmt>,
    },
    /// `try` / `except` / `else` / `finally`
    Try {
        /// Protected block.
        body: Vec<Stmt>,
        /// `except` clauses.
        handlers: Vec<ExceptHandler>,
        /// `else` block.
        orelse: Vec<Stmt>,
        /// `finally` block.
        finalbody: Vec<Stmt>,
    },
    /// `return [value]`
    Return {
        /// Returned expression.
        value: Option<Expr>,
    },
    /// `import a.b as c` or `from m import x`
    Import {
        /// Source module for `from` imports.
        module: Option<String>,
        /// Imported names (`name` or `name as alias`).
        names: Vec<String>,
    },
    /// `pass`
    Pass,
    /// `break`
    Break,
    /// `continue`
    Continue,
    /// Statements without analyzable structure (`raise`, `del`, `match`,
    /// `type` aliases and the like), kept by keyword.
    Other {
        /// Leading keyword.
        keyword: String,
    },
}

/// One `expr [as target]` entry of a `with` statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithItem {
    /// Context manager expression.
    pub context: Expr,
    /// Optional `as` target.
    pub target: Option<Expr>,
}

/// One `except` clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptHandler {
    /// Caught exception type.
    pub kind: Option<Expr>,
    /// Bound name.
    pub name: Option<String>,
    /// Handler body.
    pub body: Vec<Stmt>,
}

/// Function or lambda parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    /// Parameter name, prefixed with `*`/`**` for variadics.
    pub name: String,
    /// Default value.
    pub default: Option<Expr>,
}

/// `name=value` (or `**value` when `arg` is `None`) inside a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyword {
    /// Keyword name; `None` for `**mapping` spreads.
    pub arg: Option<String>,
    /// Argument value.
    pub value: Expr,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Constant {
    /// `None`
    None,
    /// `True` / `False`
    Bool(bool),
    /// Integer literal.
    Int(i64),
    /// Finite float literal.
    Float(f64),
    /// String or bytes literal with escapes decoded.
    Str(String),
}

/// Which bracket produced a comprehension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComprehensionKind {
    /// `[x for ...]`
    List,
    /// `{x for ...}`
    Set,
    /// `{k: v for ...}`
    Dict,
    /// `(x for ...)`
    Generator,
}

/// `for target in iter if cond...` clause of a comprehension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    /// Loop target.
    pub target: Expr,
    /// Iterated expression.
    pub iter: Expr,
    /// Trailing `if` filters.
    pub conditions: Vec<Expr>,
}

/// Expression shapes kept after lowering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Expr {
    /// Identifier.
    Name {
        /// Identifier text.
        id: String,
    },
    /// Literal.
    Constant {
        /// Literal value.
        value: Constant,
    },
    /// `value.attr`
    Attribute {
        /// Base expression.
        value: Box<Expr>,
        /// Attribute identifier.
        attr: String,
    },
    /// `value[slice]`
    Subscript {
        /// Subscripted expression.
        value: Box<Expr>,
        /// Index or slice.
        slice: Box<Expr>,
    },
    /// `lower:upper:step` inside a subscript.
    Slice {
        /// Lower bound.
        lower: Option<Box<Expr>>,
        /// Upper bound.
        upper: Option<Box<Expr>>,
        /// Step.
        step: Option<Box<Expr>>,
    },
    /// `func(args, keywords)`
    Call {
        /// Callee.
        func: Box<Expr>,
        /// Positional arguments (including `*spread`).
        args: Vec<Expr>,
        /// Keyword arguments (including `**spread`).
        keywords: Vec<Keyword>,
    },
    /// `[a, b]`
    List {
        /// Elements.
        elts: Vec<Expr>,
    },
    /// `(a, b)` or a bare `a, b`
    Tuple {
        /// Elements.
        elts: Vec<Expr>,
    },
    /// `{k: v, **rest}`; a `None` key marks a `**` spread.
    Dict {
        /// Entries in source order.
        entries: Vec<(Option<Expr>, Expr)>,
    },
    /// `{a, b}`
    Set {
        /// Elements.
        elts: Vec<Expr>,
    },
    /// `*value`
    Starred {
        /// Spread expression.
        value: Box<Expr>,
    },
    /// Binary arithmetic or bitwise operation.
    BinOp {
        /// Left operand.
        left: Box<Expr>,
        /// Operator text.
        op: String,
        /// Right operand.
        right: Box<Expr>,
    },
    /// `not x`, `-x`, `+x`, `~x`
    UnaryOp {
        /// Operator text.
        op: String,
        /// Operand.
        operand: Box<Expr>,
    },
    /// `a and b and c` / `a or b`
    BoolOp {
        /// `and` or `or`.
        op: String,
        /// Operands.
        values: Vec<Expr>,
    },
    /// `a < b <= c`
    Compare {
        /// First operand.
        left: Box<Expr>,
        /// Operators (`<`, `in`, `not in`, `is not`, ...).
        ops: Vec<String>,
        /// Remaining operands.
        comparators: Vec<Expr>,
    },
    /// `body if test else orelse`
    IfExp {
        /// Condition.
        test: Box<Expr>,
        /// Value when true.
        body: Box<Expr>,
        /// Value when false.
        orelse: Box<Expr>,
    },
    /// `lambda params: body`
    Lambda {
        /// Parameters.
        params: Vec<Param>,
        /// Body expression.
        body: Box<Expr>,
    },
    /// List/set/dict/generator comprehension. Dict comprehensions store the
    /// key/value pair as a two-element tuple.
    Comprehension {
        /// Bracket kind.
        kind: ComprehensionKind,
        /// Produced element.
        element: Box<Expr>,
        /// `for` clauses.
        generators: Vec<Generator>,
    },
    /// f-string, kept as its raw template text.
    FormattedString {
        /// Template between the quotes.
        template: String,
    },
    /// `await value`
    Await {
        /// Awaited expression.
        value: Box<Expr>,
    },
    /// `yield [value]` / `yield from value`
    Yield {
        /// Yielded expression.
        value: Option<Box<Expr>>,
    },
    /// `target := value`
    NamedExpr {
        /// Bound name.
        target: Box<Expr>,
        /// Value.
        value: Box<Expr>,
    },
    /// Source kept verbatim: imaginary or out-of-range numbers, and
    /// expressions with no node of their own.
    Raw {
        /// Text as written.
        source: String,
    },
}

impl Expr {
    /// Shorthand for a [`Expr::Name`].
    pub fn name(id: impl Into<String>) -> Self {
        Expr::Name { id: id.into() }
    }

    /// Shorthand for a [`Expr::Constant`].
    pub fn constant(value: Constant) -> Self {
        Expr::Constant { value }
    }

    /// Identifier carried by a `Name` or `Attribute` node.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            Expr::Name { id } => Some(id),
            Expr::Attribute { attr, .. } => Some(attr),
            _ => None,
        }
    }
}

impl StmtKind {
    /// Nested statement blocks in document order.
    pub fn blocks(&self) -> Vec<&[Stmt]> {
        match self {
            StmtKind::If { body, orelse, .. }
            | StmtKind::For { body, orelse, .. }
            | StmtKind::While { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
            StmtKind::With { body, .. }
            | StmtKind::FunctionDef { body, .. }
            | StmtKind::ClassDef { body, .. } => vec![body.as_slice()],
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                let mut blocks: Vec<&[Stmt]> = vec![body.as_slice()];
                blocks.extend(handlers.iter().map(|handler| handler.body.as_slice()));
                blocks.push(orelse);
                blocks.push(finalbody);
                blocks
            }
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::None => f.write_str("None"),
            Constant::Bool(true) => f.write_str("True"),
            Constant::Bool(false) => f.write_str("False"),
            Constant::Int(value) => write!(f, "{value}"),
            Constant::Float(value) => write!(f, "{value:?}"),
            Constant::Str(value) => write!(f, "{value:?}"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, items: &[Expr], sep: &str) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

fn write_params(f: &mut fmt::Formatter<'_>, params: &[Param]) -> fmt::Result {
    for (idx, param) in params.iter().enumerate() {
        if idx > 0 {
            f.write_str(", ")?;
        }
        f.write_str(&param.name)?;
        if let Some(default) = &param.default {
            write!(f, "={default}")?;
        }
    }
    Ok(())
}

fn write_bound(f: &mut fmt::Formatter<'_>, bound: &Option<Box<Expr>>) -> fmt::Result {
    match bound {
        Some(expr) => write!(f, "{expr}"),
        None => Ok(()),
    }
}

/// Renders the expression back to Python-like source text.
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Name { id } => f.write_str(id),
            Expr::Constant { value } => write!(f, "{value}"),
            Expr::Attribute { value, attr } => write!(f, "{value}.{attr}"),
            Expr::Subscript { value, slice } => write!(f, "{value}[{slice}]"),
            Expr::Slice { lower, upper, step } => {
                write_bound(f, lower)?;
                f.write_str(":")?;
                write_bound(f, upper)?;
                if step.is_some() {
                    f.write_str(":")?;
                    write_bound(f, step)?;
                }
                Ok(())
            }
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                write!(f, "{func}(")?;
                write_joined(f, args, ", ")?;
                for (idx, keyword) in keywords.iter().enumerate() {
                    if idx > 0 || !args.is_empty() {
                        f.write_str(", ")?;
                    }
                    match &keyword.arg {
                        Some(arg) => write!(f, "{arg}={}", keyword.value)?,
                        None => write!(f, "**{}", keyword.value)?,
                    }
                }
                f.write_str(")")
            }
            Expr::List { elts } => {
                f.write_str("[")?;
                write_joined(f, elts, ", ")?;
                f.write_str("]")
            }
            Expr::Tuple { elts } => {
                f.write_str("(")?;
                write_joined(f, elts, ", ")?;
                if elts.len() == 1 {
                    f.write_str(",")?;
                }
                f.write_str(")")
            }
            Expr::Dict { entries } => {
                f.write_str("{")?;
                for (idx, (key, value)) in entries.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(", ")?;
                    }
                    match key {
                        Some(key) => write!(f, "{key}: {value}")?,
                        None => write!(f, "**{value}")?,
                    }
                }
                f.write_str("}")
            }
            Expr::Set { elts } => {
                f.write_str("{")?;
                write_joined(f, elts, ", ")?;
                f.write_str("}")
            }
            Expr::Starred { value } => write!(f, "*{value}"),
            Expr::BinOp { left, op, right } => write!(f, "{left} {op} {right}"),
            Expr::UnaryOp { op, operand } if op == "not" => write!(f, "not {operand}"),
            Expr::UnaryOp { op, operand } => write!(f, "{op}{operand}"),
            Expr::BoolOp { op, values } => write_joined(f, values, &format!(" {op} ")),
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                write!(f, "{left}")?;
                for (op, operand) in ops.iter().zip(comparators) {
                    write!(f, " {op} {operand}")?;
                }
                Ok(())
            }
            Expr::IfExp { test, body, orelse } => write!(f, "{body} if {test} else {orelse}"),
            Expr::Lambda { params, body } => {
                f.write_str("lambda")?;
                if !params.is_empty() {
                    f.write_str(" ")?;
                    write_params(f, params)?;
                }
                write!(f, ": {body}")
            }
            Expr::Comprehension {
                kind,
                element,
                generators,
            } => {
                let (open, close) = match kind {
                    ComprehensionKind::List => ("[", "]"),
                    ComprehensionKind::Set | ComprehensionKind::Dict => ("{", "}"),
                    ComprehensionKind::Generator => ("(", ")"),
                };
                f.write_str(open)?;
                match (kind, element.as_ref()) {
                    (ComprehensionKind::Dict, Expr::Tuple { elts }) if elts.len() == 2 => {
                        write!(f, "{}: {}", elts[0], elts[1])?;
                    }
                    _ => write!(f, "{element}")?,
                }
                for generator in generators {
                    write!(f, " for {} in {}", generator.target, generator.iter)?;
                    for condition in &generator.conditions {
                        write!(f, " if {condition}")?;
                    }
                }
                f.write_str(close)
            }
            Expr::FormattedString { template } => write!(f, "f{template:?}"),
            Expr::Await { value } => write!(f, "await {value}"),
            Expr::Yield { value } => {
                f.write_str("yield")?;
                match value {
                    Some(value) => write!(f, " {value}"),
                    None => Ok(()),
                }
            }
            Expr::NamedExpr { target, value } => write!(f, "({target} := {value})"),
            Expr::Raw { source } => f.write_str(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_calls_with_keywords() {
        let call = Expr::Call {
            func: Box::new(Expr::Attribute {
                value: Box::new(Expr::name("gr")),
                attr: "Textbox".into(),
            }),
            args: vec![Expr::constant(Constant::Str("x".into()))],
            keywords: vec![Keyword {
                arg: Some("visible".into()),
                value: Expr::constant(Constant::Bool(false)),
            }],
        };
        assert_eq!(call.to_string(), "gr.Textbox(\"x\", visible=False)");
    }

    #[test]
    fn try_blocks_are_listed_in_document_order() {
        let pass = Stmt {
            line: 1,
            kind: StmtKind::Pass,
        };
        let kind = StmtKind::Try {
            body: vec![pass.clone()],
            handlers: vec![ExceptHandler {
                kind: None,
                name: None,
                body: vec![pass.clone(), pass.clone()],
            }],
            orelse: Vec::new(),
            finalbody: vec![pass],
        };
        let sizes: Vec<usize> = kind.blocks().iter().map(|block| block.len()).collect();
        assert_eq!(sizes, vec![1, 2, 0, 1]);
    }
}
