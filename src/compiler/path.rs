//! Collection path resolution
//!
//! A path is parsed into a [`PathChain`] (bin, descriptor steps, terminal
//! function) and then folded into one accessor: every step but the last
//! becomes a context frame, the last step becomes the accessor.

use super::errors::{CompileError, CompileResult};
use super::literals::{parse_float, parse_int};
use super::types::TypeHint;
use crate::lexer::Token;
use crate::model::{
    Accessor, Arity, CdtStep, CollectionKind, ContextFrame, Expr, Literal, MapKey, PathChain,
    PathFunction, PathResult, ReturnType, ValueType,
};
use crate::parser::{Fragment, FunctionSyntax, PathSegment, PathSyntax};

/// Compiles a path expression using `hint` for untyped results
pub fn compile_path(syntax: &PathSyntax, hint: TypeHint) -> CompileResult<Expr> {
    let chain = parse_chain(syntax)?;
    fold_chain(chain, hint)
}

/// Result type fixed by the path's own shape, if any
pub fn declared_type(syntax: &PathSyntax) -> Option<ValueType> {
    parse_chain(syntax).ok().and_then(|chain| fixed_type(&chain))
}

pub fn parse_chain(syntax: &PathSyntax) -> CompileResult<PathChain> {
    let mut segments = syntax.segments.iter();
    let bin = match segments.next() {
        Some(PathSegment::Name(name)) => name.clone(),
        Some(PathSegment::List(fragment)) | Some(PathSegment::Map(fragment)) => {
            return Err(CompileError::invalid_path(format!(
                "Path must start with a bin name, found '{}'",
                fragment.text
            )))
        }
        None => return Err(CompileError::invalid_path("Path must start with a bin name")),
    };

    let steps = segments
        .map(|segment| match segment {
            PathSegment::Name(key) => Ok(CdtStep::Key(MapKey::String(key.clone()))),
            PathSegment::List(fragment) => parse_descriptor(fragment, CollectionKind::List),
            PathSegment::Map(fragment) => parse_descriptor(fragment, CollectionKind::Map),
        })
        .collect::<CompileResult<Vec<_>>>()?;

    let function = syntax.function.as_ref().map(parse_function).transpose()?;

    Ok(PathChain {
        bin,
        steps,
        function,
    })
}

fn parse_function(syntax: &FunctionSyntax) -> CompileResult<PathFunction> {
    let function = match syntax.name.as_str() {
        "get" => {
            let mut value_type = None;
            let mut return_type = None;
            for (key, value) in &syntax.params {
                match key.as_str() {
                    "type" => {
                        value_type = Some(ValueType::from_name(value).ok_or_else(|| {
                            CompileError::unresolved(format!("Unknown type '{}' in get()", value))
                        })?)
                    }
                    "return" => {
                        return_type = Some(ReturnType::from_name(value).ok_or_else(|| {
                            CompileError::unresolved(format!(
                                "Unknown return type '{}' in get()",
                                value
                            ))
                        })?)
                    }
                    other => {
                        return Err(CompileError::unresolved(format!(
                            "Unknown parameter '{}' in get()",
                            other
                        )))
                    }
                }
            }
            return Ok(PathFunction::Get {
                value_type,
                return_type,
            });
        }
        "asInt" => PathFunction::Cast(ValueType::Int),
        "asFloat" => PathFunction::Cast(ValueType::Float),
        "count" => PathFunction::Count,
        "size" => PathFunction::Size,
        "exists" => PathFunction::Exists,
        other => {
            return Err(CompileError::unresolved(format!(
                "Unknown path function '{}'",
                other
            )))
        }
    };

    if !syntax.params.is_empty() {
        return Err(CompileError::arity(
            &syntax.name,
            Arity::Exactly(0),
            syntax.params.len(),
        ));
    }
    Ok(function)
}

// === Descriptor fragments ===

/// Cursor over the tokens of one `[...]` or `{...}` descriptor
struct Descriptor<'a> {
    fragment: &'a Fragment,
    kind: CollectionKind,
    pos: usize,
}

impl<'a> Descriptor<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.fragment.tokens.get(self.pos)
    }

    fn peek_nth(&self, n: usize) -> Option<&'a Token> {
        self.fragment.tokens.get(self.pos + n)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.fragment.tokens.len()
    }

    fn unrecognized(&self) -> CompileError {
        CompileError::invalid_path(format!(
            "Unrecognized {} descriptor '{}'",
            self.kind.as_str(),
            self.fragment.text
        ))
    }

    fn int_ahead(&self) -> bool {
        match self.peek() {
            Some(Token::Int(_)) => true,
            Some(Token::Minus) => matches!(self.peek_nth(1), Some(Token::Int(_))),
            _ => false,
        }
    }

    fn int(&mut self) -> CompileResult<i64> {
        let negative = self.eat(&Token::Minus);
        match self.peek() {
            Some(Token::Int(text)) => {
                self.pos += 1;
                parse_int(text, negative)
            }
            _ => Err(self.unrecognized()),
        }
    }

    fn value(&mut self) -> CompileResult<Literal> {
        let negative = self.eat(&Token::Minus);
        let literal = match (self.peek(), negative) {
            (Some(Token::Int(text)), _) => Literal::Int(parse_int(text, negative)?),
            (Some(Token::Float(text)), _) => Literal::Float(parse_float(text, negative)?),
            (Some(Token::Str(s)), false) => Literal::String(s.clone()),
            (Some(Token::True), false) => Literal::Bool(true),
            (Some(Token::False), false) => Literal::Bool(false),
            (Some(token), false) => match token.as_name() {
                Some(name) => Literal::String(name),
                None => return Err(self.unrecognized()),
            },
            _ => return Err(self.unrecognized()),
        };
        self.pos += 1;
        Ok(literal)
    }

    fn key(&mut self) -> CompileResult<MapKey> {
        if self.int_ahead() {
            return Ok(MapKey::Int(self.int()?));
        }
        let key = match self.peek() {
            Some(Token::Str(s)) => MapKey::String(s.clone()),
            Some(token) => MapKey::String(token.as_name().ok_or_else(|| self.unrecognized())?),
            None => return Err(self.unrecognized()),
        };
        self.pos += 1;
        Ok(key)
    }

    fn values_after(&mut self, first: Literal) -> CompileResult<Vec<Literal>> {
        let mut values = vec![first];
        while self.eat(&Token::Comma) {
            values.push(self.value()?);
        }
        Ok(values)
    }

    fn keys_after(&mut self, first: MapKey) -> CompileResult<Vec<MapKey>> {
        let mut keys = vec![first];
        while self.eat(&Token::Comma) {
            keys.push(self.key()?);
        }
        Ok(keys)
    }

    /// `=v`, `=v1:v2`, `=v1,v2`
    fn value_forms(&mut self, inverted: bool) -> CompileResult<CdtStep> {
        let kind = self.kind;
        let first = self.value()?;
        if self.eat(&Token::Colon) {
            let end = if self.at_end() {
                None
            } else {
                Some(self.value()?)
            };
            return Ok(CdtStep::ValueRange {
                kind,
                begin: first,
                end,
                inverted,
            });
        }
        if self.peek() == Some(&Token::Comma) {
            let values = self.values_after(first)?;
            return Ok(CdtStep::ValueList {
                kind,
                values,
                inverted,
            });
        }
        self.single(inverted, CdtStep::Value { kind, value: first })
    }

    /// `#r`, `#r1:r2`, `#r1:`, `#r1:~v`, `#r1:r2~v`
    fn rank_forms(&mut self, inverted: bool) -> CompileResult<CdtStep> {
        let kind = self.kind;
        let start = self.int()?;
        if !self.eat(&Token::Colon) {
            return self.single(inverted, CdtStep::Rank { kind, rank: start });
        }
        if self.eat(&Token::Tilde) {
            let anchor = self.value()?;
            return Ok(CdtStep::RelativeRankRange {
                kind,
                start,
                end: None,
                anchor,
                inverted,
            });
        }
        if self.at_end() {
            return Ok(CdtStep::RankRange {
                kind,
                start,
                end: None,
                inverted,
            });
        }
        let end = self.int()?;
        if self.eat(&Token::Tilde) {
            let anchor = self.value()?;
            return Ok(CdtStep::RelativeRankRange {
                kind,
                start,
                end: Some(end),
                anchor,
                inverted,
            });
        }
        Ok(CdtStep::RankRange {
            kind,
            start,
            end: Some(end),
            inverted,
        })
    }

    /// `!` only applies to descriptors that select several elements
    fn single(&self, inverted: bool, step: CdtStep) -> CompileResult<CdtStep> {
        if inverted {
            return Err(CompileError::invalid_path(format!(
                "Inversion is only allowed on ranges and lists, not '{}'",
                self.fragment.text
            )));
        }
        Ok(step)
    }

    /// Leading `!`; `!=` lexes as one token and means `!` then `=`
    fn inversion(&mut self) -> (bool, bool) {
        if self.eat(&Token::NotEq) {
            return (true, true);
        }
        let inverted = self.eat(&Token::Bang);
        let value = self.eat(&Token::Assign);
        (inverted, value)
    }

    fn parse_list(&mut self) -> CompileResult<CdtStep> {
        let (inverted, value) = self.inversion();
        if value {
            return self.value_forms(inverted);
        }
        if self.eat(&Token::Hash) {
            return self.rank_forms(inverted);
        }
        if !self.int_ahead() {
            return Err(self.unrecognized());
        }

        let start = self.int()?;
        if !self.eat(&Token::Colon) {
            return self.single(
                inverted,
                CdtStep::Index {
                    kind: CollectionKind::List,
                    index: start,
                },
            );
        }
        let end = if self.at_end() {
            None
        } else {
            Some(self.int()?)
        };
        Ok(CdtStep::IndexRange {
            kind: CollectionKind::List,
            start,
            end,
            inverted,
        })
    }

    fn parse_map(&mut self) -> CompileResult<CdtStep> {
        let (inverted, value) = self.inversion();
        if value {
            return self.value_forms(inverted);
        }
        if self.eat(&Token::Hash) {
            return self.rank_forms(inverted);
        }

        if self.int_ahead() {
            let start = self.int()?;
            if self.eat(&Token::Colon) {
                return self.map_index_range(start, inverted);
            }
            return self.key_forms(MapKey::Int(start), Some(start), inverted);
        }

        if self.eat(&Token::Minus) {
            let end = self.key()?;
            return Ok(CdtStep::KeyRange {
                begin: None,
                end: Some(end),
                inverted,
            });
        }

        let key = self.key()?;
        self.key_forms(key, None, inverted)
    }

    /// `{i1:i2}`, `{i1:}`, `{i1:~k}`, `{i1:i2~k}`
    fn map_index_range(&mut self, start: i64, inverted: bool) -> CompileResult<CdtStep> {
        if self.eat(&Token::Tilde) {
            let anchor = self.key()?;
            return Ok(CdtStep::RelativeIndexRange {
                start,
                end: None,
                anchor,
                inverted,
            });
        }
        if self.at_end() {
            return Ok(CdtStep::IndexRange {
                kind: CollectionKind::Map,
                start,
                end: None,
                inverted,
            });
        }
        let end = self.int()?;
        if self.eat(&Token::Tilde) {
            let anchor = self.key()?;
            return Ok(CdtStep::RelativeIndexRange {
                start,
                end: Some(end),
                anchor,
                inverted,
            });
        }
        Ok(CdtStep::IndexRange {
            kind: CollectionKind::Map,
            start,
            end: Some(end),
            inverted,
        })
    }

    /// `{k}`, `{k1-k2}`, `{k1-}`, `{k1,k2}`; a bare integer is an index
    fn key_forms(
        &mut self,
        first: MapKey,
        index: Option<i64>,
        inverted: bool,
    ) -> CompileResult<CdtStep> {
        if self.eat(&Token::Minus) {
            let end = if self.at_end() {
                None
            } else {
                Some(self.key()?)
            };
            return Ok(CdtStep::KeyRange {
                begin: Some(first),
                end,
                inverted,
            });
        }
        if self.peek() == Some(&Token::Comma) {
            let keys = self.keys_after(first)?;
            return Ok(CdtStep::KeyList { keys, inverted });
        }
        let step = match index {
            Some(index) => CdtStep::Index {
                kind: CollectionKind::Map,
                index,
            },
            None => CdtStep::Key(first),
        };
        self.single(inverted, step)
    }
}

fn parse_descriptor(fragment: &Fragment, kind: CollectionKind) -> CompileResult<CdtStep> {
    if fragment.tokens.is_empty() {
        return Ok(CdtStep::TypeDesignator(kind));
    }

    let mut descriptor = Descriptor {
        fragment,
        kind,
        pos: 0,
    };
    let step = match kind {
        CollectionKind::List => descriptor.parse_list()?,
        CollectionKind::Map => descriptor.parse_map()?,
    };
    if !descriptor.at_end() {
        return Err(descriptor.unrecognized());
    }
    Ok(step)
}

// === Folding ===

fn fold_chain(chain: PathChain, hint: TypeHint) -> CompileResult<Expr> {
    let PathChain {
        bin,
        steps,
        function,
    } = chain;

    let Some((last, prefix)) = steps.split_last() else {
        return fold_bin(bin, function, hint);
    };
    let bin_type = steps[0].kind();

    match function {
        Some(PathFunction::Count) | Some(PathFunction::Size) => {
            if last.is_multi() {
                let (collection, accessor) = accessor_for(last)?;
                return Ok(Expr::path(PathResult {
                    bin,
                    bin_type,
                    context: context_frames(prefix)?,
                    collection,
                    accessor,
                    return_type: Some(ReturnType::Count),
                    inverted: last.is_inverted(),
                    value_type: ValueType::Int,
                }));
            }
            let (collection, context) = match last {
                CdtStep::TypeDesignator(kind) => (*kind, context_frames(prefix)?),
                _ => (CollectionKind::List, context_frames(&steps)?),
            };
            Ok(Expr::path(PathResult {
                bin,
                bin_type,
                context,
                collection,
                accessor: Accessor::Size,
                return_type: None,
                inverted: false,
                value_type: ValueType::Int,
            }))
        }
        Some(PathFunction::Exists) => {
            let result = element_accessor(
                bin,
                bin_type,
                &steps,
                ReturnType::Exists,
                ValueType::Bool,
                "exists()",
            )?;
            Ok(Expr::path(result))
        }
        Some(PathFunction::Cast(target)) => {
            if last.is_multi() {
                return Err(CompileError::invalid_path(format!(
                    "{} needs a single-element descriptor",
                    cast_name(target)
                )));
            }
            let source = match target {
                ValueType::Float => ValueType::Int,
                _ => ValueType::Float,
            };
            let result = element_accessor(
                bin,
                bin_type,
                &steps,
                ReturnType::Value,
                source,
                cast_name(target),
            )?;
            Ok(Expr::cast(target, Expr::path(result)))
        }
        Some(PathFunction::Get {
            value_type,
            return_type,
        }) => fold_get(bin, bin_type, &steps, value_type, return_type, hint),
        None => fold_get(bin, bin_type, &steps, None, None, hint),
    }
}

fn cast_name(target: ValueType) -> &'static str {
    match target {
        ValueType::Float => "asFloat()",
        _ => "asInt()",
    }
}

/// A path with no descriptors is a plain bin reference
fn fold_bin(bin: String, function: Option<PathFunction>, hint: TypeHint) -> CompileResult<Expr> {
    match function {
        None => Ok(Expr::bin(bin, hint.resolve())),
        Some(PathFunction::Get {
            return_type: Some(rt),
            ..
        }) => Err(CompileError::invalid_path(format!(
            "get(return: {}) needs a collection descriptor after bin '{}'",
            rt, bin
        ))),
        Some(PathFunction::Get {
            value_type: Some(ty),
            ..
        }) => Ok(Expr::explicit_bin(bin, ty)),
        Some(PathFunction::Get { .. }) => Ok(Expr::bin(bin, hint.resolve())),
        Some(PathFunction::Cast(ValueType::Float)) => Ok(Expr::cast(
            ValueType::Float,
            Expr::explicit_bin(bin, ValueType::Int),
        )),
        Some(PathFunction::Cast(target)) => Ok(Expr::cast(
            target,
            Expr::explicit_bin(bin, ValueType::Float),
        )),
        Some(PathFunction::Exists) => Ok(Expr::BinExists { name: bin }),
        Some(PathFunction::Count) | Some(PathFunction::Size) => Ok(Expr::path(PathResult {
            bin,
            bin_type: CollectionKind::List,
            context: Vec::new(),
            collection: CollectionKind::List,
            accessor: Accessor::Size,
            return_type: None,
            inverted: false,
            value_type: ValueType::Int,
        })),
    }
}

fn fold_get(
    bin: String,
    bin_type: CollectionKind,
    steps: &[CdtStep],
    value_type: Option<ValueType>,
    return_type: Option<ReturnType>,
    hint: TypeHint,
) -> CompileResult<Expr> {
    let Some(last) = steps.last() else {
        return fold_bin(bin, None, hint);
    };

    if let CdtStep::TypeDesignator(kind) = last {
        if let Some(rt) = return_type {
            return Err(CompileError::invalid_path(format!(
                "get(return: {}) needs an element descriptor, not a type designator",
                rt
            )));
        }
        let designated = kind.value_type();
        if let Some(ty) = value_type.filter(|ty| *ty != designated) {
            return Err(CompileError::type_mismatch(format!(
                "Path designated as {} cannot be read as {}",
                designated, ty
            )));
        }
        // The designator types the element addressed by the preceding step
        return match steps.iter().rposition(|s| !matches!(s, CdtStep::TypeDesignator(_))) {
            None => Ok(Expr::explicit_bin(bin, designated)),
            Some(element) => Ok(Expr::path(element_accessor(
                bin,
                bin_type,
                &steps[..=element],
                ReturnType::Value,
                designated,
                "type designator",
            )?)),
        };
    }

    let rt = return_type.unwrap_or(ReturnType::Value);
    let resolved = value_type
        .or_else(|| type_of_return(rt, last.is_multi()))
        .unwrap_or_else(|| hint.resolve());
    Ok(Expr::path(element_accessor(
        bin, bin_type, steps, rt, resolved, "get()",
    )?))
}

/// Builds the accessor for the last step, with all earlier steps as context
fn element_accessor(
    bin: String,
    bin_type: CollectionKind,
    steps: &[CdtStep],
    return_type: ReturnType,
    value_type: ValueType,
    function: &str,
) -> CompileResult<PathResult> {
    let Some((last, prefix)) = steps.split_last() else {
        return Err(CompileError::invalid_path(format!(
            "{} needs a collection descriptor",
            function
        )));
    };
    if let CdtStep::TypeDesignator(_) = last {
        return Err(CompileError::invalid_path(format!(
            "{} needs an element descriptor, not a type designator",
            function
        )));
    }

    let (collection, accessor) = accessor_for(last)?;
    if return_type.is_map_only() && collection != CollectionKind::Map {
        return Err(CompileError::invalid_path(format!(
            "Return type {} is only valid on maps",
            return_type
        )));
    }

    Ok(PathResult {
        bin,
        bin_type,
        context: context_frames(prefix)?,
        collection,
        accessor,
        return_type: Some(return_type),
        inverted: last.is_inverted(),
        value_type,
    })
}

/// Result type implied by a return selector
fn type_of_return(rt: ReturnType, multi: bool) -> Option<ValueType> {
    match rt {
        ReturnType::Count => Some(ValueType::Int),
        ReturnType::Exists => Some(ValueType::Bool),
        ReturnType::KeyValue | ReturnType::UnorderedMap | ReturnType::OrderedMap => {
            Some(ValueType::Map)
        }
        ReturnType::Index | ReturnType::ReverseIndex | ReturnType::Rank | ReturnType::ReverseRank => {
            if multi {
                Some(ValueType::List)
            } else {
                Some(ValueType::Int)
            }
        }
        ReturnType::Value | ReturnType::Key => {
            if multi {
                Some(ValueType::List)
            } else {
                None
            }
        }
    }
}

/// Mirrors the folding rules without building anything
fn fixed_type(chain: &PathChain) -> Option<ValueType> {
    match &chain.function {
        Some(PathFunction::Count) | Some(PathFunction::Size) => return Some(ValueType::Int),
        Some(PathFunction::Exists) => return Some(ValueType::Bool),
        Some(PathFunction::Cast(target)) => return Some(*target),
        Some(PathFunction::Get {
            value_type: Some(ty),
            ..
        }) => return Some(*ty),
        _ => {}
    }

    let last = chain.steps.last()?;
    if let CdtStep::TypeDesignator(kind) = last {
        return Some(kind.value_type());
    }
    let rt = match &chain.function {
        Some(PathFunction::Get {
            return_type: Some(rt),
            ..
        }) => *rt,
        _ => ReturnType::Value,
    };
    type_of_return(rt, last.is_multi())
}

fn context_frames(steps: &[CdtStep]) -> CompileResult<Vec<ContextFrame>> {
    let mut frames = Vec::with_capacity(steps.len());
    for step in steps {
        let frame = match step {
            CdtStep::TypeDesignator(_) => continue,
            CdtStep::Key(key) => ContextFrame::MapKey(key.clone()),
            CdtStep::Index {
                kind: CollectionKind::List,
                index,
            } => ContextFrame::ListIndex(*index),
            CdtStep::Index {
                kind: CollectionKind::Map,
                index,
            } => ContextFrame::MapIndex(*index),
            CdtStep::Rank {
                kind: CollectionKind::List,
                rank,
            } => ContextFrame::ListRank(*rank),
            CdtStep::Rank {
                kind: CollectionKind::Map,
                rank,
            } => ContextFrame::MapRank(*rank),
            CdtStep::Value {
                kind: CollectionKind::List,
                value,
            } => ContextFrame::ListValue(value.clone()),
            CdtStep::Value {
                kind: CollectionKind::Map,
                value,
            } => ContextFrame::MapValue(value.clone()),
            _ => {
                return Err(CompileError::invalid_path(
                    "Range and list descriptors are only allowed as the last path step",
                ))
            }
        };
        frames.push(frame);
    }
    Ok(frames)
}

/// `end - start`; a negative count is rejected
fn count_between(start: i64, end: Option<i64>) -> CompileResult<Option<i64>> {
    end.map(|end| {
        end.checked_sub(start)
            .filter(|count| *count >= 0)
            .ok_or_else(|| {
                CompileError::invalid_path(format!(
                    "Range end {} is before range start {}",
                    end, start
                ))
            })
    })
    .transpose()
}

fn accessor_for(step: &CdtStep) -> CompileResult<(CollectionKind, Accessor)> {
    let accessor = match step {
        CdtStep::TypeDesignator(kind) => {
            return Err(CompileError::invalid_path(format!(
                "Type designator '{}' does not select elements",
                match kind {
                    CollectionKind::List => "[]",
                    CollectionKind::Map => "{}",
                }
            )))
        }
        CdtStep::Key(key) => Accessor::ByKey { key: key.clone() },
        CdtStep::Index { index, .. } => Accessor::ByIndex { index: *index },
        CdtStep::Value { value, .. } => Accessor::ByValue {
            value: value.clone(),
        },
        CdtStep::Rank { rank, .. } => Accessor::ByRank { rank: *rank },
        CdtStep::IndexRange { start, end, .. } => Accessor::ByIndexRange {
            index: *start,
            count: count_between(*start, *end)?,
        },
        CdtStep::KeyRange { begin, end, .. } => Accessor::ByKeyRange {
            begin: begin.clone(),
            end: end.clone(),
        },
        CdtStep::ValueRange { begin, end, .. } => Accessor::ByValueRange {
            begin: begin.clone(),
            end: end.clone(),
        },
        CdtStep::RankRange { start, end, .. } => Accessor::ByRankRange {
            rank: *start,
            count: count_between(*start, *end)?,
        },
        CdtStep::RelativeRankRange {
            start, end, anchor, ..
        } => Accessor::ByValueRelativeRankRange {
            value: anchor.clone(),
            rank: *start,
            count: count_between(*start, *end)?,
        },
        CdtStep::RelativeIndexRange {
            start, end, anchor, ..
        } => Accessor::ByKeyRelativeIndexRange {
            key: anchor.clone(),
            index: *start,
            count: count_between(*start, *end)?,
        },
        CdtStep::ValueList { values, .. } => Accessor::ByValueList {
            values: values.clone(),
        },
        CdtStep::KeyList { keys, .. } => Accessor::ByKeyList { keys: keys.clone() },
    };
    Ok((step.kind(), accessor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::errors::CompileErrorCode;
    use crate::parser::{parse, Node};

    fn chain(source: &str) -> CompileResult<PathChain> {
        match parse(source).unwrap() {
            Node::Path(path) => parse_chain(&path),
            other => panic!("not a path: {:?}", other),
        }
    }

    fn step(source: &str) -> CdtStep {
        chain(source).unwrap().steps.pop().unwrap()
    }

    fn path(source: &str) -> CompileResult<Expr> {
        match parse(source).unwrap() {
            Node::Path(path) => compile_path(&path, TypeHint::NUMERIC),
            other => panic!("not a path: {:?}", other),
        }
    }

    #[test]
    fn test_list_descriptors() {
        assert_eq!(
            step("$.l.[-1]"),
            CdtStep::Index {
                kind: CollectionKind::List,
                index: -1
            }
        );
        assert_eq!(
            step("$.l.[=abc]"),
            CdtStep::Value {
                kind: CollectionKind::List,
                value: Literal::String("abc".into())
            }
        );
        assert_eq!(
            step("$.l.[!2:]"),
            CdtStep::IndexRange {
                kind: CollectionKind::List,
                start: 2,
                end: None,
                inverted: true
            }
        );
        assert_eq!(
            step("$.l.[#1:3~10]"),
            CdtStep::RelativeRankRange {
                kind: CollectionKind::List,
                start: 1,
                end: Some(3),
                anchor: Literal::Int(10),
                inverted: false
            }
        );
        assert_eq!(
            step("$.l.[!=1,2]"),
            CdtStep::ValueList {
                kind: CollectionKind::List,
                values: vec![Literal::Int(1), Literal::Int(2)],
                inverted: true
            }
        );
    }

    #[test]
    fn test_map_descriptors() {
        assert_eq!(step("$.m.{a}"), CdtStep::Key(MapKey::String("a".into())));
        assert_eq!(
            step("$.m.{2}"),
            CdtStep::Index {
                kind: CollectionKind::Map,
                index: 2
            }
        );
        assert_eq!(
            step("$.m.{a-c}"),
            CdtStep::KeyRange {
                begin: Some(MapKey::String("a".into())),
                end: Some(MapKey::String("c".into())),
                inverted: false
            }
        );
        assert_eq!(
            step("$.m.{-c}"),
            CdtStep::KeyRange {
                begin: None,
                end: Some(MapKey::String("c".into())),
                inverted: false
            }
        );
        assert_eq!(
            step("$.m.{!a,'b'}"),
            CdtStep::KeyList {
                keys: vec![MapKey::String("a".into()), MapKey::String("b".into())],
                inverted: true
            }
        );
        assert_eq!(
            step("$.m.{0:~k}"),
            CdtStep::RelativeIndexRange {
                start: 0,
                end: None,
                anchor: MapKey::String("k".into()),
                inverted: false
            }
        );
    }

    #[test]
    fn test_unrecognized_fragment_named() {
        let err = chain("$.l.[a:b]").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
        assert!(err.message().contains("[a:b]"));
    }

    #[test]
    fn test_inverted_single_rejected() {
        let err = chain("$.l.[!1]").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
    }

    #[test]
    fn test_path_must_start_with_bin() {
        let err = chain("$.[1]").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
    }

    #[test]
    fn test_unknown_get_parameter() {
        let err = chain("$.l.[0].get(kind: INT)").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::UnresolvedReference);
        let err = chain("$.l.[0].get(type: DOUBLE)").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::UnresolvedReference);
    }

    #[test]
    fn test_context_frames() {
        let Expr::Path(result) = path("$.m.a.[0].{#1}").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(result.bin_type, CollectionKind::Map);
        assert_eq!(
            result.context,
            vec![
                ContextFrame::MapKey(MapKey::String("a".into())),
                ContextFrame::ListIndex(0)
            ]
        );
        assert_eq!(result.accessor, Accessor::ByRank { rank: 1 });
        assert_eq!(result.collection, CollectionKind::Map);
        assert_eq!(result.value_type, ValueType::Int);
    }

    #[test]
    fn test_range_counts() {
        let Expr::Path(result) = path("$.l.[1:4]").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(
            result.accessor,
            Accessor::ByIndexRange {
                index: 1,
                count: Some(3)
            }
        );
        assert_eq!(result.value_type, ValueType::List);

        let err = path("$.l.[4:1]").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
    }

    #[test]
    fn test_non_terminal_range_rejected() {
        let err = path("$.l.[1:3].[0]").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
    }

    #[test]
    fn test_count_defaults_to_list_size() {
        let Expr::Path(result) = path("$.m.a.count()").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(result.accessor, Accessor::Size);
        assert_eq!(result.collection, CollectionKind::List);
        assert_eq!(
            result.context,
            vec![ContextFrame::MapKey(MapKey::String("a".into()))]
        );

        let Expr::Path(result) = path("$.m.a.{}.size()").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(result.collection, CollectionKind::Map);
    }

    #[test]
    fn test_count_on_range_sets_count_return() {
        let Expr::Path(result) = path("$.l.[=1:5].count()").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(result.return_type, Some(ReturnType::Count));
        assert_eq!(result.value_type, ValueType::Int);
    }

    #[test]
    fn test_key_return_only_on_maps() {
        let err = path("$.l.[0].get(return: KEY)").unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::InvalidPath);
        assert!(path("$.m.{0}.get(return: KEY, type: STRING)").is_ok());
    }

    #[test]
    fn test_bin_level_functions() {
        assert_eq!(
            path("$.a.get(type: STRING)").unwrap(),
            Expr::explicit_bin("a", ValueType::String)
        );
        assert_eq!(
            path("$.a.asInt()").unwrap(),
            Expr::cast(ValueType::Int, Expr::explicit_bin("a", ValueType::Float))
        );
        assert_eq!(
            path("$.a.exists()").unwrap(),
            Expr::BinExists { name: "a".into() }
        );
        assert_eq!(
            path("$.a.get(return: VALUE)").unwrap_err().code(),
            CompileErrorCode::InvalidPath
        );
    }

    #[test]
    fn test_designator_types_element() {
        assert_eq!(
            path("$.l.[]").unwrap(),
            Expr::explicit_bin("l", ValueType::List)
        );
        let Expr::Path(result) = path("$.m.a.[]").unwrap() else {
            panic!("expected path");
        };
        assert_eq!(
            result.accessor,
            Accessor::ByKey {
                key: MapKey::String("a".into())
            }
        );
        assert_eq!(result.value_type, ValueType::List);
        assert!(result.context.is_empty());
    }
}
