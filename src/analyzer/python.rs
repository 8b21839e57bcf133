//! Python parsing on top of `tree-sitter-python`.
//!
//! The concrete syntax tree is lowered into [`super::ast`]. Statements the
//! analyzer never looks inside (`match`, `type` aliases, `raise`, ...) keep
//! only their keyword, and expressions without a dedicated node keep their
//! source text.

use tree_sitter::{Node, Parser, Tree};

use super::ast::{
    ComprehensionKind, Constant, ExceptHandler, Expr, Generator, Keyword, Module, Param, Stmt,
    StmtKind, WithItem,
};
use super::{AnalyzerError, Result};

/// Parse Python source text into a [`Module`].
///
/// Any `ERROR` or `MISSING` node in the tree is reported as
/// [`AnalyzerError::Syntax`] at the position of the first one.
pub fn parse_module(source: &str) -> Result<Module> {
    let tree = parse_tree(source)?;
    let root = tree.root_node();
    if let Some(node) = first_error(root) {
        return Err(syntax_error(node, source));
    }
    let lowering = Lowering { source };
    Ok(Module {
        body: lowering.block(root)?,
    })
}

fn parse_tree(source: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|err| AnalyzerError::Grammar(err.to_string()))?;
    parser
        .parse(source, None)
        .ok_or_else(|| AnalyzerError::Grammar("parser returned no tree".to_string()))
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

fn syntax_error(node: Node<'_>, source: &str) -> AnalyzerError {
    let message = if node.is_missing() {
        format!("expected `{}`", node.kind())
    } else {
        let text = source
            .get(node.byte_range())
            .and_then(|text| text.lines().map(str::trim).find(|line| !line.is_empty()))
            .unwrap_or_default();
        if text.is_empty() {
            "invalid syntax".to_string()
        } else {
            format!("invalid syntax near `{text}`")
        }
    };
    at(node, message)
}

fn at(node: Node<'_>, message: impl Into<String>) -> AnalyzerError {
    let point = node.start_position();
    AnalyzerError::Syntax {
        line: point.row + 1,
        column: point.column + 1,
        message: message.into(),
    }
}

fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

/// Named children, comments and line continuations excluded.
fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn all_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

fn field_children<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor)
        .filter(|child| !child.is_extra())
        .collect()
}

fn field<'t>(node: Node<'t>, name: &str) -> Result<Node<'t>> {
    node.child_by_field_name(name)
        .ok_or_else(|| at(node, format!("`{}` without {name}", node.kind())))
}

struct Lowering<'s> {
    source: &'s str,
}

impl<'s> Lowering<'s> {
    fn text(&self, node: Node<'_>) -> &'s str {
        self.source.get(node.byte_range()).unwrap_or_default()
    }

    fn block(&self, node: Node<'_>) -> Result<Vec<Stmt>> {
        named_children(node)
            .into_iter()
            .map(|child| self.statement(child))
            .collect()
    }

    /// Body of an optional `else` clause.
    fn else_block(&self, clause: Option<Node<'_>>) -> Result<Vec<Stmt>> {
        match clause {
            Some(clause) => self.block(field(clause, "body")?),
            None => Ok(Vec::new()),
        }
    }

    fn statement(&self, node: Node<'_>) -> Result<Stmt> {
        let line = line_of(node);
        let kind = match node.kind() {
            "expression_statement" => self.expression_statement(node)?,
            "if_statement" => self.if_statement(node)?,
            "for_statement" => StmtKind::For {
                target: self.expr(field(node, "left")?)?,
                iter: self.expressions(&field_children(node, "right"))?,
                body: self.block(field(node, "body")?)?,
                orelse: self.else_block(node.child_by_field_name("alternative"))?,
            },
            "while_statement" => StmtKind::While {
                test: self.expr(field(node, "condition")?)?,
                body: self.block(field(node, "body")?)?,
                orelse: self.else_block(node.child_by_field_name("alternative"))?,
            },
            "with_statement" => self.with_statement(node)?,
            "function_definition" => StmtKind::FunctionDef {
                name: self.text(field(node, "name")?).to_string(),
                params: self.params(field(node, "parameters")?)?,
                decorators: Vec::new(),
                body: self.block(field(node, "body")?)?,
            },
            "class_definition" => StmtKind::ClassDef {
                name: self.text(field(node, "name")?).to_string(),
                bases: match node.child_by_field_name("superclasses") {
                    Some(bases) => named_children(bases)
                        .into_iter()
                        .map(|base| self.expr(base))
                        .collect::<Result<_>>()?,
                    None => Vec::new(),
                },
                decorators: Vec::new(),
                body: self.block(field(node, "body")?)?,
            },
            "decorated_definition" => return self.decorated(node),
            "try_statement" => self.try_statement(node)?,
            "return_statement" => StmtKind::Return {
                value: named_children(node)
                    .first()
                    .map(|value| self.expr(*value))
                    .transpose()?,
            },
            "import_statement" => StmtKind::Import {
                module: None,
                names: self.imported_names(node),
            },
            "import_from_statement" => StmtKind::Import {
                module: Some(dotted(self.text(field(node, "module_name")?))),
                names: self.imported_names(node),
            },
            "future_import_statement" => StmtKind::Import {
                module: Some("__future__".to_string()),
                names: self.imported_names(node),
            },
            "pass_statement" => StmtKind::Pass,
            "break_statement" => StmtKind::Break,
            "continue_statement" => StmtKind::Continue,
            other => StmtKind::Other {
                keyword: all_children(node)
                    .first()
                    .map_or(other, |first| self.text(*first))
                    .to_string(),
            },
        };
        Ok(Stmt { line, kind })
    }

    fn expression_statement(&self, node: Node<'_>) -> Result<StmtKind> {
        let children = named_children(node);
        match children.as_slice() {
            [single] if single.kind() == "assignment" => self.assignment(*single),
            [single] if single.kind() == "augmented_assignment" => {
                let op = self.text(field(*single, "operator")?);
                Ok(StmtKind::AugAssign {
                    target: self.expr(field(*single, "left")?)?,
                    op: op.trim_end_matches('=').to_string(),
                    value: self.expr(field(*single, "right")?)?,
                })
            }
            _ => Ok(StmtKind::Expr {
                value: self.expressions(&children)?,
            }),
        }
    }

    /// `a = b = value` nests as `assignment(a, assignment(b, value))`.
    fn assignment(&self, node: Node<'_>) -> Result<StmtKind> {
        let target = self.expr(field(node, "left")?)?;
        if let Some(annotation) = node.child_by_field_name("type") {
            return Ok(StmtKind::AnnAssign {
                target,
                annotation: self.expr(annotation)?,
                value: node
                    .child_by_field_name("right")
                    .map(|value| self.expr(value))
                    .transpose()?,
            });
        }

        let mut targets = vec![target];
        let mut value = field(node, "right")?;
        while value.kind() == "assignment" {
            targets.push(self.expr(field(value, "left")?)?);
            value = field(value, "right")?;
        }
        Ok(StmtKind::Assign {
            targets,
            value: self.expr(value)?,
        })
    }

    /// `elif` clauses fold into nested `If` statements in `orelse`.
    fn if_statement(&self, node: Node<'_>) -> Result<StmtKind> {
        let mut orelse = Vec::new();
        for clause in field_children(node, "alternative").into_iter().rev() {
            orelse = match clause.kind() {
                "elif_clause" => vec![Stmt {
                    line: line_of(clause),
                    kind: StmtKind::If {
                        test: self.expr(field(clause, "condition")?)?,
                        body: self.block(field(clause, "consequence")?)?,
                        orelse,
                    },
                }],
                _ => self.else_block(Some(clause))?,
            };
        }
        Ok(StmtKind::If {
            test: self.expr(field(node, "condition")?)?,
            body: self.block(field(node, "consequence")?)?,
            orelse,
        })
    }

    fn with_statement(&self, node: Node<'_>) -> Result<StmtKind> {
        let mut items = Vec::new();
        for clause in named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "with_clause")
        {
            for item in named_children(clause) {
                let value = field(item, "value")?;
                items.push(if value.kind() == "as_pattern" {
                    let context = named_children(value)
                        .first()
                        .copied()
                        .ok_or_else(|| at(value, "`as` without a context manager"))?;
                    WithItem {
                        context: self.expr(context)?,
                        target: Some(self.pattern_target(field(value, "alias")?)?),
                    }
                } else {
                    WithItem {
                        context: self.expr(value)?,
                        target: None,
                    }
                });
            }
        }
        Ok(StmtKind::With {
            items,
            body: self.block(field(node, "body")?)?,
        })
    }

    fn pattern_target(&self, node: Node<'_>) -> Result<Expr> {
        if node.kind() != "as_pattern_target" {
            return self.expr(node);
        }
        let children = named_children(node);
        match children.as_slice() {
            [] => Ok(Expr::name(self.text(node).trim())),
            [single] => self.expr(*single),
            many => self.expressions(many),
        }
    }

    fn decorated(&self, node: Node<'_>) -> Result<Stmt> {
        let decorators = named_children(node)
            .into_iter()
            .filter(|child| child.kind() == "decorator")
            .map(|decorator| match named_children(decorator).first() {
                Some(expr) => self.expr(*expr),
                None => Err(at(decorator, "empty decorator")),
            })
            .collect::<Result<Vec<_>>>()?;

        let mut stmt = self.statement(field(node, "definition")?)?;
        match &mut stmt.kind {
            StmtKind::FunctionDef {
                decorators: slot, ..
            }
            | StmtKind::ClassDef {
                decorators: slot, ..
            } => *slot = decorators,
            _ => {}
        }
        Ok(stmt)
    }

    fn try_statement(&self, node: Node<'_>) -> Result<StmtKind> {
        let mut handlers = Vec::new();
        let mut orelse = Vec::new();
        let mut finalbody = Vec::new();
        for clause in named_children(node) {
            match clause.kind() {
                "except_clause" | "except_group_clause" => handlers.push(self.handler(clause)?),
                "else_clause" => orelse = self.else_block(Some(clause))?,
                "finally_clause" => {
                    for block in named_children(clause) {
                        finalbody.extend(self.block(block)?);
                    }
                }
                _ => {}
            }
        }
        Ok(StmtKind::Try {
            body: self.block(field(node, "body")?)?,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn handler(&self, clause: Node<'_>) -> Result<ExceptHandler> {
        let mut handler = ExceptHandler {
            kind: None,
            name: None,
            body: Vec::new(),
        };
        for child in named_children(clause) {
            match child.kind() {
                "block" => handler.body = self.block(child)?,
                "as_pattern" => {
                    if let Some(kind) = named_children(child).first() {
                        handler.kind = Some(self.expr(*kind)?);
                    }
                    handler.name = child
                        .child_by_field_name("alias")
                        .map(|alias| self.text(alias).trim().to_string());
                }
                _ if handler.kind.is_none() => handler.kind = Some(self.expr(child)?),
                _ => handler.name = Some(self.text(child).trim().to_string()),
            }
        }
        Ok(handler)
    }

    fn imported_names(&self, node: Node<'_>) -> Vec<String> {
        let mut names: Vec<String> = field_children(node, "name")
            .into_iter()
            .map(|name| match name.kind() {
                "aliased_import" => match (
                    name.child_by_field_name("name"),
                    name.child_by_field_name("alias"),
                ) {
                    (Some(original), Some(alias)) => format!(
                        "{} as {}",
                        dotted(self.text(original)),
                        self.text(alias)
                    ),
                    _ => dotted(self.text(name)),
                },
                _ => dotted(self.text(name)),
            })
            .collect();
        if named_children(node)
            .iter()
            .any(|child| child.kind() == "wildcard_import")
        {
            names.push("*".to_string());
        }
        names
    }

    fn params(&self, node: Node<'_>) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        for param in named_children(node) {
            let (name, default) = match param.kind() {
                "keyword_separator" | "positional_separator" => continue,
                "default_parameter" | "typed_default_parameter" => (
                    self.text(field(param, "name")?),
                    Some(self.expr(field(param, "value")?)?),
                ),
                "typed_parameter" => (
                    named_children(param)
                        .first()
                        .map_or_else(|| self.text(param), |name| self.text(*name)),
                    None,
                ),
                _ => (self.text(param), None),
            };
            params.push(Param {
                name: name.trim().to_string(),
                default,
            });
        }
        Ok(params)
    }

    /// One expression, or a tuple when there are several.
    fn expressions(&self, nodes: &[Node<'_>]) -> Result<Expr> {
        match nodes {
            [single] => self.expr(*single),
            many => Ok(Expr::Tuple {
                elts: self.each(many)?,
            }),
        }
    }

    fn each(&self, nodes: &[Node<'_>]) -> Result<Vec<Expr>> {
        nodes.iter().map(|node| self.expr(*node)).collect()
    }

    fn inner(&self, node: Node<'_>) -> Result<Expr> {
        match named_children(node).first() {
            Some(inner) => self.expr(*inner),
            None => Err(at(node, format!("empty `{}`", node.kind()))),
        }
    }

    fn expr(&self, node: Node<'_>) -> Result<Expr> {
        Ok(match node.kind() {
            "identifier" => Expr::name(self.text(node)),
            "true" => Expr::constant(Constant::Bool(true)),
            "false" => Expr::constant(Constant::Bool(false)),
            "none" => Expr::constant(Constant::None),
            "ellipsis" => Expr::name("Ellipsis"),
            "integer" | "float" => number(self.text(node)),
            "string" => self.strings(&[node]),
            "concatenated_string" => self.strings(&named_children(node)),
            "attribute" => Expr::Attribute {
                value: Box::new(self.expr(field(node, "object")?)?),
                attr: self.text(field(node, "attribute")?).to_string(),
            },
            "subscript" => Expr::Subscript {
                value: Box::new(self.expr(field(node, "value")?)?),
                slice: Box::new(self.expressions(&field_children(node, "subscript"))?),
            },
            "slice" => self.slice(node)?,
            "call" => self.call(node)?,
            "list" | "list_pattern" => Expr::List {
                elts: self.each(&named_children(node))?,
            },
            "tuple" | "tuple_pattern" | "expression_list" | "pattern_list" => Expr::Tuple {
                elts: self.each(&named_children(node))?,
            },
            "set" => Expr::Set {
                elts: self.each(&named_children(node))?,
            },
            "dictionary" => Expr::Dict {
                entries: named_children(node)
                    .into_iter()
                    .map(|entry| match entry.kind() {
                        "pair" => Ok((
                            Some(self.expr(field(entry, "key")?)?),
                            self.expr(field(entry, "value")?)?,
                        )),
                        "dictionary_splat" => Ok((None, self.inner(entry)?)),
                        _ => Ok((None, self.expr(entry)?)),
                    })
                    .collect::<Result<_>>()?,
            },
            "parenthesized_expression" | "type" => self.inner(node)?,
            "list_splat" | "list_splat_pattern" => Expr::Starred {
                value: Box::new(self.inner(node)?),
            },
            "binary_operator" => Expr::BinOp {
                left: Box::new(self.expr(field(node, "left")?)?),
                op: field(node, "operator")?.kind().to_string(),
                right: Box::new(self.expr(field(node, "right")?)?),
            },
            "unary_operator" => Expr::UnaryOp {
                op: field(node, "operator")?.kind().to_string(),
                operand: Box::new(self.expr(field(node, "argument")?)?),
            },
            "not_operator" => Expr::UnaryOp {
                op: "not".to_string(),
                operand: Box::new(self.expr(field(node, "argument")?)?),
            },
            "boolean_operator" => {
                let op = field(node, "operator")?.kind().to_string();
                let left = self.expr(field(node, "left")?)?;
                let right = self.expr(field(node, "right")?)?;
                let mut values = match left {
                    Expr::BoolOp { op: inner, values } if inner == op => values,
                    left => vec![left],
                };
                values.push(right);
                Expr::BoolOp { op, values }
            }
            "comparison_operator" => {
                let mut operands = self.each(&named_children(node))?.into_iter();
                let left = operands
                    .next()
                    .ok_or_else(|| at(node, "comparison without operands"))?;
                Expr::Compare {
                    left: Box::new(left),
                    ops: field_children(node, "operators")
                        .into_iter()
                        .map(|op| op.kind().to_string())
                        .collect(),
                    comparators: operands.collect(),
                }
            }
            "conditional_expression" => {
                match <[Expr; 3]>::try_from(self.each(&named_children(node))?) {
                    Ok([body, test, orelse]) => Expr::IfExp {
                        test: Box::new(test),
                        body: Box::new(body),
                        orelse: Box::new(orelse),
                    },
                    Err(_) => return Err(at(node, "malformed conditional expression")),
                }
            }
            "lambda" => Expr::Lambda {
                params: match node.child_by_field_name("parameters") {
                    Some(params) => self.params(params)?,
                    None => Vec::new(),
                },
                body: Box::new(self.expr(field(node, "body")?)?),
            },
            "list_comprehension" => self.comprehension(node, ComprehensionKind::List)?,
            "set_comprehension" => self.comprehension(node, ComprehensionKind::Set)?,
            "dictionary_comprehension" => self.comprehension(node, ComprehensionKind::Dict)?,
            "generator_expression" => self.comprehension(node, ComprehensionKind::Generator)?,
            "await" => Expr::Await {
                value: Box::new(self.inner(node)?),
            },
            "yield" => Expr::Yield {
                value: named_children(node)
                    .first()
                    .map(|value| self.expr(*value).map(Box::new))
                    .transpose()?,
            },
            "named_expression" => Expr::NamedExpr {
                target: Box::new(self.expr(field(node, "name")?)?),
                value: Box::new(self.expr(field(node, "value")?)?),
            },
            _ => Expr::Raw {
                source: self.text(node).to_string(),
            },
        })
    }

    fn call(&self, node: Node<'_>) -> Result<Expr> {
        let func = Box::new(self.expr(field(node, "function")?)?);
        let arguments = field(node, "arguments")?;
        if arguments.kind() == "generator_expression" {
            return Ok(Expr::Call {
                func,
                args: vec![self.expr(arguments)?],
                keywords: Vec::new(),
            });
        }

        let mut args = Vec::new();
        let mut keywords = Vec::new();
        for argument in named_children(arguments) {
            match argument.kind() {
                "keyword_argument" => keywords.push(Keyword {
                    arg: Some(self.text(field(argument, "name")?).to_string()),
                    value: self.expr(field(argument, "value")?)?,
                }),
                "dictionary_splat" => keywords.push(Keyword {
                    arg: None,
                    value: self.inner(argument)?,
                }),
                _ => args.push(self.expr(argument)?),
            }
        }
        Ok(Expr::Call {
            func,
            args,
            keywords,
        })
    }

    /// Bounds are placed by counting the `:` tokens before them.
    fn slice(&self, node: Node<'_>) -> Result<Expr> {
        let mut bounds: [Option<Box<Expr>>; 3] = [None, None, None];
        let mut colons = 0;
        for child in all_children(node) {
            if child.is_extra() {
                continue;
            }
            if !child.is_named() {
                if child.kind() == ":" {
                    colons += 1;
                }
                continue;
            }
            if let Some(slot) = bounds.get_mut(colons) {
                *slot = Some(Box::new(self.expr(child)?));
            }
        }
        let [lower, upper, step] = bounds;
        Ok(Expr::Slice { lower, upper, step })
    }

    fn comprehension(&self, node: Node<'_>, kind: ComprehensionKind) -> Result<Expr> {
        let body = field(node, "body")?;
        let element = match kind {
            ComprehensionKind::Dict if body.kind() == "pair" => Expr::Tuple {
                elts: vec![
                    self.expr(field(body, "key")?)?,
                    self.expr(field(body, "value")?)?,
                ],
            },
            _ => self.expr(body)?,
        };

        let mut generators: Vec<Generator> = Vec::new();
        for clause in named_children(node) {
            match clause.kind() {
                "for_in_clause" => generators.push(Generator {
                    target: self.expr(field(clause, "left")?)?,
                    iter: self.expressions(&field_children(clause, "right"))?,
                    conditions: Vec::new(),
                }),
                "if_clause" => {
                    let condition = self.inner(clause)?;
                    match generators.last_mut() {
                        Some(generator) => generator.conditions.push(condition),
                        None => return Err(at(clause, "`if` before any `for` clause")),
                    }
                }
                _ => {}
            }
        }
        Ok(Expr::Comprehension {
            kind,
            element: Box::new(element),
            generators,
        })
    }

    /// Adjacent literals concatenate. Any f-string part makes the whole
    /// literal a formatted string, kept as its template.
    fn strings(&self, parts: &[Node<'_>]) -> Expr {
        let mut text = String::new();
        let mut any_formatted = false;
        for part in parts {
            let (value, formatted) = self.string_part(*part);
            text.push_str(&value);
            any_formatted |= formatted;
        }
        if any_formatted {
            Expr::FormattedString { template: text }
        } else {
            Expr::constant(Constant::Str(text))
        }
    }

    fn string_part(&self, node: Node<'_>) -> (String, bool) {
        let children = all_children(node);
        let opener = children.first().filter(|child| child.kind() == "string_start");
        let closer = children.last().filter(|child| child.kind() == "string_end");
        let (Some(opener), Some(closer)) = (opener, closer) else {
            return (self.text(node).to_string(), false);
        };

        let prefix = self
            .text(*opener)
            .trim_end_matches(['"', '\''])
            .to_ascii_lowercase();
        let body = self
            .source
            .get(opener.end_byte()..closer.start_byte())
            .unwrap_or_default();
        let formatted = prefix.contains('f');
        if formatted || prefix.contains('r') {
            (body.to_string(), formatted)
        } else {
            (decode_escapes(body), false)
        }
    }
}

/// Dotted names with any interior whitespace removed.
fn dotted(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Numbers with no faithful [`Constant`] (imaginary literals, integers
/// beyond `i64`, floats that overflow) keep their source text.
fn number(text: &str) -> Expr {
    match parse_number(text) {
        Some(value) => Expr::constant(value),
        None => Expr::Raw {
            source: text.to_string(),
        },
    }
}

fn parse_number(text: &str) -> Option<Constant> {
    let cleaned: String = text
        .chars()
        .filter(|ch| *ch != '_')
        .collect::<String>()
        .to_ascii_lowercase();
    if cleaned.ends_with('j') {
        return None;
    }
    let radix = match cleaned.get(..2) {
        Some("0x") => Some(16),
        Some("0o") => Some(8),
        Some("0b") => Some(2),
        _ => None,
    };
    if let Some(radix) = radix {
        let digits = cleaned.get(2..).unwrap_or_default();
        return i64::from_str_radix(digits, radix).ok().map(Constant::Int);
    }
    if cleaned.contains(['.', 'e']) {
        return cleaned
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map(Constant::Float);
    }
    cleaned.parse::<i64>().ok().map(Constant::Int)
}

fn decode_escapes(body: &str) -> String {
    let mut value = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            value.push(ch);
            continue;
        }
        let Some(escaped) = chars.next() else {
            value.push('\\');
            break;
        };
        match escaped {
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            'a' => value.push('\x07'),
            'b' => value.push('\x08'),
            'f' => value.push('\x0c'),
            'v' => value.push('\x0b'),
            '\\' | '\'' | '"' => value.push(escaped),
            'x' | 'u' | 'U' => {
                let width = match escaped {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = (0..width)
                    .map_while(|_| chars.next_if(char::is_ascii_hexdigit))
                    .collect();
                let decoded = u32::from_str_radix(&digits, 16)
                    .ok()
                    .filter(|_| digits.len() == width)
                    .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => value.push(decoded),
                    None => {
                        value.push('\\');
                        value.push(escaped);
                        value.push_str(&digits);
                    }
                }
            }
            '0'..='7' => {
                let mut code = escaped.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.next_if(|ch| ch.is_digit(8)).and_then(|ch| ch.to_digit(8)) {
                        Some(digit) => code = code * 8 + digit,
                        None => break,
                    }
                }
                value.push(char::from_u32(code).unwrap_or('\u{fffd}'));
            }
            other => {
                value.push('\\');
                value.push(other);
            }
        }
    }
    value
}
