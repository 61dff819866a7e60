//! Literal parsing and collection-constant construction

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD, Engine as _};

use super::errors::{CompileError, CompileResult};
use crate::model::{Literal, MapKey, ValueType};

/// Parses decimal, `0x` and `0b` integer text. `negative` applies the sign
/// before the range check so that `i64::MIN` is representable.
pub fn parse_int(text: &str, negative: bool) -> CompileResult<i64> {
    let (digits, radix) = match text.get(..2) {
        Some("0x") | Some("0X") => (&text[2..], 16),
        Some("0b") | Some("0B") => (&text[2..], 2),
        _ => (text, 10),
    };

    let magnitude = i128::from_str_radix(digits, radix)
        .map_err(|_| CompileError::syntax(format!("integer literal '{}' is out of range", text)))?;
    let value = if negative { -magnitude } else { magnitude };

    i64::try_from(value)
        .map_err(|_| CompileError::syntax(format!("integer literal '{}' is out of range", text)))
}

pub fn parse_float(text: &str, negative: bool) -> CompileResult<f64> {
    let value: f64 = text
        .parse()
        .map_err(|_| CompileError::syntax(format!("invalid float literal '{}'", text)))?;
    Ok(if negative { -value } else { value })
}

/// Decodes standard base64 for a BLOB comparison
pub fn decode_blob(text: &str) -> CompileResult<Vec<u8>> {
    STANDARD.decode(text).map_err(|e| {
        CompileError::type_mismatch(format!(
            "Cannot use '{}' as a BLOB value: invalid base64 ({})",
            text, e
        ))
    })
}

/// Builds a LIST constant; every element must share one kind
pub fn build_list(items: Vec<Literal>) -> CompileResult<Literal> {
    if let Some(first) = items.first() {
        let kind = first.value_type();
        if let Some(other) = items.iter().find(|item| item.value_type() != kind) {
            return Err(CompileError::type_mismatch(format!(
                "List constant mixes {} and {} elements",
                kind,
                other.value_type()
            )));
        }
    }
    Ok(Literal::List(items))
}

/// Builds a MAP constant; keys are INT or STRING, keys and values each
/// share one kind
pub fn build_map(entries: Vec<(Literal, Literal)>) -> CompileResult<Literal> {
    let mut map = BTreeMap::new();
    let mut key_kind = None;
    let mut value_kind = None;

    for (key, value) in entries {
        let map_key = MapKey::from_literal(&key).ok_or_else(|| {
            CompileError::type_mismatch(format!(
                "Map keys must be INT or STRING, got {}",
                key.value_type()
            ))
        })?;

        check_same_kind(&mut key_kind, map_key.value_type(), "keys")?;
        check_same_kind(&mut value_kind, value.value_type(), "values")?;
        map.insert(map_key, value);
    }
    Ok(Literal::Map(map))
}

fn check_same_kind(seen: &mut Option<ValueType>, kind: ValueType, what: &str) -> CompileResult<()> {
    match seen {
        Some(expected) if *expected != kind => Err(CompileError::type_mismatch(format!(
            "Map constant mixes {} and {} {}",
            expected, kind, what
        ))),
        Some(_) => Ok(()),
        None => {
            *seen = Some(kind);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::errors::CompileErrorCode;

    #[test]
    fn test_int_prefixes() {
        assert_eq!(parse_int("255", false).unwrap(), 255);
        assert_eq!(parse_int("0xFF", false).unwrap(), 255);
        assert_eq!(parse_int("0XFF", false).unwrap(), 255);
        assert_eq!(parse_int("0b11111111", false).unwrap(), 255);
        assert_eq!(parse_int("0B1", true).unwrap(), -1);
    }

    #[test]
    fn test_int_bounds() {
        assert_eq!(parse_int("9223372036854775807", false).unwrap(), i64::MAX);
        assert_eq!(parse_int("9223372036854775808", true).unwrap(), i64::MIN);
        let err = parse_int("9223372036854775808", false).unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::Syntax);
    }

    #[test]
    fn test_leading_dot_float() {
        assert_eq!(parse_float(".5", false).unwrap(), 0.5);
        assert_eq!(parse_float("2.25", true).unwrap(), -2.25);
    }

    #[test]
    fn test_heterogeneous_list_rejected() {
        let err = build_list(vec![Literal::Int(1), Literal::String("a".into())]).unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::TypeMismatch);
        assert!(build_list(vec![]).is_ok());
    }

    #[test]
    fn test_map_key_kinds() {
        let err = build_map(vec![(Literal::Float(1.0), Literal::Int(1))]).unwrap_err();
        assert_eq!(err.code(), CompileErrorCode::TypeMismatch);

        let map = build_map(vec![
            (Literal::String("b".into()), Literal::Int(2)),
            (Literal::String("a".into()), Literal::Int(1)),
        ])
        .unwrap();
        assert_eq!(map.to_string(), "{\"a\": 1, \"b\": 2}");
    }

    #[test]
    fn test_blob_decode() {
        assert_eq!(decode_blob("AQID").unwrap(), vec![1, 2, 3]);
        assert_eq!(
            decode_blob("not base64!").unwrap_err().code(),
            CompileErrorCode::TypeMismatch
        );
    }
}
