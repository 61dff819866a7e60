//! Expression compiler
//!
//! Turns source text into a typed [`Expr`] tree in a single top-down pass.
//!
//! # Pipeline
//!
//! 1. `parse`: text to untyped syntax tree ([`ParsedExpression`])
//! 2. `resolve`: syntax tree plus placeholder values to [`Expr`]
//!
//! A [`ParsedExpression`] is immutable and can be resolved against many
//! placeholder lists, from many threads.
//!
//! # Errors
//!
//! Every failure aborts compilation with one [`CompileError`]; there is no
//! partial output.

mod errors;
mod literals;
mod path;
mod placeholder;
mod types;

pub use errors::{CompileError, CompileErrorCode, CompileResult, SYNTAX_ERROR_MESSAGE};
pub use placeholder::PlaceholderValues;
pub use types::TypeHint;

use literals::{build_list, build_map, parse_float, parse_int};
use types::{check_arithmetic, expect_type, unify_comparison, Inference};

use crate::model::{
    Arity, BinaryOp, Definition, Expr, Function, Literal, LogicalOp, MetadataFunction,
    MetadataRef, OpCategory, UnaryOp, ValueType, WhenArm,
};
use crate::observability::ObservationScope;
use crate::parser::{self, Node};

/// A parsed, not yet typed expression
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedExpression {
    source: String,
    root: Node,
}

impl ParsedExpression {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Compiles the syntax tree with `values` bound to the placeholders
    pub fn resolve(&self, values: &PlaceholderValues) -> CompileResult<Expr> {
        let scope =
            ObservationScope::with_fields("DSL_COMPILE", &[("expression", self.source.as_str())]);
        match Compiler::new(values).compile_root(&self.root) {
            Ok(expr) => {
                scope.complete_with_fields(&[("type", expr.value_type().as_str())]);
                Ok(expr)
            }
            Err(err) => {
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }
}

/// Parses `source` without resolving placeholders
pub fn parse(source: &str) -> CompileResult<ParsedExpression> {
    let scope = ObservationScope::with_fields("DSL_PARSE", &[("expression", source)]);
    match parser::parse(source) {
        Ok(root) => {
            scope.complete();
            Ok(ParsedExpression {
                source: source.to_string(),
                root,
            })
        }
        Err(err) => {
            let err = CompileError::from(err);
            scope.fail(&err.to_string());
            Err(err)
        }
    }
}

/// Parses and resolves in one step; `None` means no placeholder values
pub fn compile(source: &str, values: Option<&PlaceholderValues>) -> CompileResult<Expr> {
    let parsed = parse(source)?;
    match values {
        Some(values) => parsed.resolve(values),
        None => parsed.resolve(&PlaceholderValues::empty()),
    }
}

/// Single-pass compiler state
struct Compiler<'a> {
    values: &'a PlaceholderValues,
    /// `with` bindings visible at the current node, innermost last
    scope: Vec<(String, ValueType)>,
}

impl<'a> Compiler<'a> {
    fn new(values: &'a PlaceholderValues) -> Self {
        Self {
            values,
            scope: Vec::new(),
        }
    }

    fn compile_root(&mut self, root: &Node) -> CompileResult<Expr> {
        self.compile_node(root, TypeHint::LOGICAL)
    }

    fn infer(&self, nodes: &[&Node]) -> Option<ValueType> {
        Inference::new(self.values, &self.scope).infer(nodes)
    }

    /// Numeric context: keeps the outer type or discovers one, defaults to INT
    fn numeric_hint(&self, hint: TypeHint, nodes: &[&Node]) -> TypeHint {
        TypeHint::numeric(hint.ambient.or_else(|| self.infer(nodes)))
    }

    fn compile_node(&mut self, node: &Node, hint: TypeHint) -> CompileResult<Expr> {
        match node {
            Node::Int(text) => Ok(Expr::int(parse_int(text, false)?)),
            Node::Float(text) => Ok(Expr::float(parse_float(text, false)?)),
            Node::Str(s) => Ok(Expr::string(s.clone())),
            Node::Bool(b) => Ok(Expr::bool(*b)),
            Node::List(items) => {
                let items = items
                    .iter()
                    .map(|item| self.constant(item))
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(Expr::literal(build_list(items)?))
            }
            Node::Map(entries) => {
                let entries = entries
                    .iter()
                    .map(|(k, v)| -> CompileResult<(Literal, Literal)> {
                        Ok((self.constant(k)?, self.constant(v)?))
                    })
                    .collect::<CompileResult<Vec<_>>>()?;
                Ok(Expr::literal(build_map(entries)?))
            }
            Node::Placeholder(index) => Ok(Expr::literal(self.values.get(*index)?.clone())),
            Node::Variable(name) => self.variable(name),
            Node::Path(syntax) => path::compile_path(syntax, hint),
            Node::Metadata { name, args } => self.metadata(name, args),
            Node::Binary { op, left, right } => match op.category() {
                OpCategory::Comparison if *op == BinaryOp::In => self.membership(left, right),
                OpCategory::Comparison => self.comparison(*op, left, right),
                OpCategory::Arithmetic | OpCategory::Bitwise => {
                    self.arithmetic(*op, left, right, hint)
                }
            },
            Node::Negate(operand) => self.negate(operand, hint),
            Node::BitNot(operand) => {
                let hint = self.numeric_hint(hint, &[&**operand]);
                let operand = self.compile_node(operand, hint)?;
                expect_type(&operand, ValueType::Int, "Operator '~'")?;
                Ok(Expr::Unary {
                    op: UnaryOp::BitNot,
                    operand: Box::new(operand),
                })
            }
            Node::And(operands) => self.logical(LogicalOp::And, operands),
            Node::Or(operands) => self.logical(LogicalOp::Or, operands),
            Node::Exclusive(operands) => {
                if operands.len() < 2 {
                    return Err(CompileError::arity(
                        "exclusive",
                        Arity::AtLeast(2),
                        operands.len(),
                    ));
                }
                self.logical(LogicalOp::Exclusive, operands)
            }
            Node::Not(operand) => {
                let operand = self.compile_node(operand, TypeHint::LOGICAL)?;
                expect_type(&operand, ValueType::Bool, "not()")?;
                Ok(Expr::not(operand))
            }
            Node::Call { name, args } => self.call(name, args, hint),
            Node::Cast { operand, target } => {
                let operand = self.compile_node(operand, TypeHint::NUMERIC)?;
                numeric_cast(operand, *target)
            }
            Node::When { arms, default } => self.when(arms, default, hint),
            Node::With { definitions, body } => {
                let mark = self.scope.len();
                let result = self.with(definitions, body, hint);
                self.scope.truncate(mark);
                result
            }
        }
    }

    /// Elements of LIST and MAP constants
    fn constant(&mut self, node: &Node) -> CompileResult<Literal> {
        match self.compile_node(node, TypeHint::NUMERIC)? {
            Expr::Literal { value } => Ok(value),
            other => Err(CompileError::type_mismatch(format!(
                "Collection constants may only contain literals, found {}",
                other
            ))),
        }
    }

    fn variable(&self, name: &str) -> CompileResult<Expr> {
        self.scope
            .iter()
            .rev()
            .find(|(bound, _)| bound == name)
            .map(|(_, value_type)| Expr::Variable {
                name: name.to_string(),
                value_type: *value_type,
            })
            .ok_or_else(|| CompileError::unresolved(format!("Undefined variable '${{{}}}'", name)))
    }

    fn metadata(&mut self, name: &str, args: &[Node]) -> CompileResult<Expr> {
        let function = MetadataFunction::from_name(name).ok_or_else(|| {
            CompileError::unresolved(format!("Unknown metadata function '{}'", name))
        })?;
        if args.len() != function.arity() {
            return Err(CompileError::arity(
                name,
                Arity::Exactly(function.arity()),
                args.len(),
            ));
        }

        let arg = match args.first() {
            Some(node) => match self.compile_node(node, TypeHint::NUMERIC)? {
                Expr::Literal {
                    value: Literal::Int(n),
                } => Some(n),
                other => {
                    return Err(CompileError::type_mismatch(format!(
                        "{}() requires an INT literal argument, got {}",
                        name, other
                    )))
                }
            },
            None => None,
        };
        Ok(Expr::Metadata(MetadataRef { function, arg }))
    }

    fn comparison(&mut self, op: BinaryOp, left: &Node, right: &Node) -> CompileResult<Expr> {
        let hint = TypeHint::numeric(self.infer(&[left, right]));
        let left = self.compile_node(left, hint)?;
        let right = self.compile_node(right, hint)?;
        let (left, right) = unify_comparison(left, right)?;
        Ok(Expr::binary(op, left, right))
    }

    /// `x in list`: the right side must be a LIST; the left side takes the
    /// list's element kind when it is known
    fn membership(&mut self, left: &Node, right: &Node) -> CompileResult<Expr> {
        let right = self.compile_node(right, TypeHint::exact(ValueType::List))?;
        if right.value_type() != ValueType::List {
            return Err(CompileError::type_mismatch(format!(
                "Operator 'in' requires a LIST right operand, got {}",
                right.value_type()
            )));
        }

        let element = right.as_literal().and_then(Literal::element_type);
        let hint = TypeHint::numeric(element.or_else(|| self.infer(&[left])));
        let left = self.compile_node(left, hint)?;
        if let Some(element) = element {
            if left.value_type() != element {
                return Err(CompileError::type_mismatch(format!(
                    "Cannot test {} membership in a list of {}",
                    left.value_type(),
                    element
                )));
            }
        }
        Ok(Expr::binary(BinaryOp::In, left, right))
    }

    fn arithmetic(
        &mut self,
        op: BinaryOp,
        left: &Node,
        right: &Node,
        hint: TypeHint,
    ) -> CompileResult<Expr> {
        let hint = self.numeric_hint(hint, &[left, right]);
        let left = self.compile_node(left, hint)?;
        let right = self.compile_node(right, hint)?;
        check_arithmetic(op, &left, &right)?;
        Ok(Expr::binary(op, left, right))
    }

    /// Literals are negated in place, so `-9223372036854775808` is valid
    fn negate(&mut self, operand: &Node, hint: TypeHint) -> CompileResult<Expr> {
        match operand {
            Node::Int(text) => return Ok(Expr::int(parse_int(text, true)?)),
            Node::Float(text) => return Ok(Expr::float(parse_float(text, true)?)),
            Node::Cast { operand, target } if is_number(operand) => {
                let negated = self.negate(operand, TypeHint::NUMERIC)?;
                return numeric_cast(negated, *target);
            }
            _ => {}
        }

        let hint = self.numeric_hint(hint, &[operand]);
        let operand = self.compile_node(operand, hint)?;
        match operand {
            Expr::Literal {
                value: Literal::Int(n),
            } => n.checked_neg().map(Expr::int).ok_or_else(|| {
                CompileError::syntax(format!("negation of {} is out of range", n))
            }),
            Expr::Literal {
                value: Literal::Float(f),
            } => Ok(Expr::float(-f)),
            operand => {
                let zero = match operand.value_type() {
                    ValueType::Int => Expr::int(0),
                    ValueType::Float => Expr::float(0.0),
                    other => {
                        return Err(CompileError::type_mismatch(format!(
                            "Unary '-' requires a numeric operand, got {}",
                            other
                        )))
                    }
                };
                Ok(Expr::sub(zero, operand))
            }
        }
    }

    fn logical(&mut self, op: LogicalOp, operands: &[Node]) -> CompileResult<Expr> {
        let context = format!("{}()", op.name());
        let operands = operands
            .iter()
            .map(|node| -> CompileResult<Expr> {
                let operand = self.compile_node(node, TypeHint::LOGICAL)?;
                expect_type(&operand, ValueType::Bool, &context)?;
                Ok(operand)
            })
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Expr::Logical { op, operands })
    }

    /// Arity is checked before any argument is compiled
    fn call(&mut self, name: &str, args: &[Node], hint: TypeHint) -> CompileResult<Expr> {
        let function = Function::from_name(name)
            .ok_or_else(|| CompileError::unresolved(format!("Unknown function '{}'", name)))?;
        if !function.arity().accepts(args.len()) {
            return Err(CompileError::arity(name, function.arity(), args.len()));
        }

        let compiled = if function.result_type().is_none() {
            // abs, min, max: all arguments share one numeric type
            let refs: Vec<&Node> = args.iter().collect();
            let hint = self.numeric_hint(hint, &refs);
            let compiled = args
                .iter()
                .map(|arg| self.compile_node(arg, hint))
                .collect::<CompileResult<Vec<_>>>()?;
            let first = compiled.first().map(Expr::value_type).unwrap_or(ValueType::Int);
            for arg in &compiled {
                let ty = arg.value_type();
                if !ty.is_numeric() || ty != first {
                    return Err(CompileError::type_mismatch(format!(
                        "{}() requires numeric arguments of one type, got {} and {}",
                        name, first, ty
                    )));
                }
            }
            compiled
        } else {
            let mut compiled = Vec::with_capacity(args.len());
            for (position, arg) in args.iter().enumerate() {
                let expected = function.parameter_type(position).unwrap_or(ValueType::Int);
                let arg = self.compile_node(arg, TypeHint::exact(expected))?;
                expect_type(&arg, expected, &format!("{}() argument {}", name, position + 1))?;
                compiled.push(arg);
            }
            compiled
        };

        Ok(Expr::Call {
            function,
            args: compiled,
        })
    }

    fn when(
        &mut self,
        arms: &[(Node, Node)],
        default: &Node,
        hint: TypeHint,
    ) -> CompileResult<Expr> {
        let results: Vec<&Node> = arms
            .iter()
            .map(|(_, result)| result)
            .chain(std::iter::once(default))
            .collect();
        let result_hint = hint.or_discovered(|| self.infer(&results));

        let mut compiled = Vec::with_capacity(arms.len());
        for (condition, result) in arms {
            let condition = self.compile_node(condition, TypeHint::LOGICAL)?;
            expect_type(&condition, ValueType::Bool, "when condition")?;
            let result = self.compile_node(result, result_hint)?;
            compiled.push(WhenArm { condition, result });
        }
        let default = self.compile_node(default, result_hint)?;

        let expected = default.value_type();
        if let Some(arm) = compiled
            .iter()
            .find(|arm| arm.result.value_type() != expected)
        {
            return Err(CompileError::type_mismatch(format!(
                "when() results must share one type, got {} and {}",
                arm.result.value_type(),
                expected
            )));
        }

        Ok(Expr::When {
            arms: compiled,
            default: Box::new(default),
        })
    }

    /// Each definition is visible to later ones and to the body
    fn with(
        &mut self,
        definitions: &[(String, Node)],
        body: &Node,
        hint: TypeHint,
    ) -> CompileResult<Expr> {
        let mut compiled = Vec::with_capacity(definitions.len());
        for (name, value) in definitions {
            let value_hint = TypeHint::numeric(self.infer(&[value]));
            let value = self.compile_node(value, value_hint)?;
            self.scope.push((name.clone(), value.value_type()));
            compiled.push(Definition {
                name: name.clone(),
                value,
            });
        }
        let body = self.compile_node(body, hint)?;
        Ok(Expr::With {
            definitions: compiled,
            body: Box::new(body),
        })
    }
}

fn is_number(node: &Node) -> bool {
    matches!(node, Node::Int(_) | Node::Float(_))
}

/// `asInt()` / `asFloat()` on a literal operand
fn numeric_cast(operand: Expr, target: ValueType) -> CompileResult<Expr> {
    if !operand.value_type().is_numeric() {
        return Err(CompileError::type_mismatch(format!(
            "Cannot convert {} to {}",
            operand.value_type(),
            target
        )));
    }
    Ok(Expr::cast(target, operand))
}
