//! Conversion of literal tokens into typed CFA literals.

use jcfa_error::error::CompileError;
use jcfa_ir::{Expression, ExpressionKind};
use jcfa_types::{JType, PrimitiveType, Span};

/// Parse an integer literal as written in the source, e.g. `0x1F`, `017`, `0b101` or `1_000L`.
///
/// `negated` is set when the literal is the operand of a unary minus, which is folded in before
/// the range check so that the smallest value of each type is representable.
pub(crate) fn parse_integer(
    text: &str,
    negated: bool,
    span: &Span,
) -> Result<Expression, CompileError> {
    let malformed = || CompileError::MalformedLiteral {
        literal: text.to_string(),
        span: span.clone(),
    };
    let cleaned = text.replace('_', "");
    let (digits, is_long) = match cleaned.strip_suffix(&['l', 'L'][..]) {
        Some(digits) => (digits, true),
        None => (cleaned.as_str(), false),
    };
    let (digits, radix) = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        (hex, 16)
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        (bin, 2)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (&digits[1..], 8)
    } else {
        (digits, 10)
    };
    if digits.is_empty() {
        return Err(malformed());
    }
    let magnitude = u128::from_str_radix(digits, radix).map_err(|_| malformed())?;

    let (min, max, ty, ty_name) = if is_long {
        (
            i64::MIN as i128,
            i64::MAX as i128,
            JType::long(),
            PrimitiveType::Long.as_str(),
        )
    } else {
        (
            i32::MIN as i128,
            i32::MAX as i128,
            JType::int(),
            PrimitiveType::Int.as_str(),
        )
    };
    let out_of_range = || CompileError::LiteralOutOfRange {
        literal: if negated {
            format!("-{text}")
        } else {
            text.to_string()
        },
        ty: ty_name,
        span: span.clone(),
    };
    let magnitude = i128::try_from(magnitude).map_err(|_| out_of_range())?;
    let value = if negated { -magnitude } else { magnitude };
    if value < min || value > max {
        return Err(out_of_range());
    }
    Ok(Expression::new(
        ExpressionKind::IntegerLiteral(value as i64),
        ty,
    ))
}

/// Parse a floating point literal, e.g. `1.5`, `2e10`, `3f` or `.5d`.
pub(crate) fn parse_floating(
    text: &str,
    negated: bool,
    span: &Span,
) -> Result<Expression, CompileError> {
    let cleaned = text.replace('_', "");
    let (digits, ty) = match cleaned.chars().last() {
        Some('f' | 'F') => (
            &cleaned[..cleaned.len() - 1],
            JType::Primitive(PrimitiveType::Float),
        ),
        Some('d' | 'D') => (
            &cleaned[..cleaned.len() - 1],
            JType::Primitive(PrimitiveType::Double),
        ),
        _ => (cleaned.as_str(), JType::Primitive(PrimitiveType::Double)),
    };
    let value = digits
        .parse::<f64>()
        .map_err(|_| CompileError::MalformedLiteral {
            literal: text.to_string(),
            span: span.clone(),
        })?;
    if !value.is_finite() {
        return Err(CompileError::LiteralOutOfRange {
            literal: text.to_string(),
            ty: if ty == JType::Primitive(PrimitiveType::Float) {
                PrimitiveType::Float.as_str()
            } else {
                PrimitiveType::Double.as_str()
            },
            span: span.clone(),
        });
    }
    let value = if negated { -value } else { value };
    Ok(Expression::new(ExpressionKind::FloatLiteral(value), ty))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(text: &str) -> Result<i64, CompileError> {
        parse_integer(text, false, &Span::dummy()).map(|expr| match expr.kind {
            ExpressionKind::IntegerLiteral(value) => value,
            _ => unreachable!(),
        })
    }

    #[test]
    fn radixes() {
        assert_eq!(int("42").unwrap(), 42);
        assert_eq!(int("0x1F").unwrap(), 31);
        assert_eq!(int("017").unwrap(), 15);
        assert_eq!(int("0b101").unwrap(), 5);
        assert_eq!(int("0").unwrap(), 0);
        assert_eq!(int("1_000_000").unwrap(), 1_000_000);
    }

    #[test]
    fn int_range_is_checked() {
        assert_eq!(int("2147483647").unwrap(), i32::MAX as i64);
        assert!(matches!(
            int("2147483648"),
            Err(CompileError::LiteralOutOfRange { ty: "int", .. })
        ));
        assert!(int("0xFFFFFFFF").is_err());
        let min = parse_integer("2147483648", true, &Span::dummy()).unwrap();
        assert_eq!(min.kind, ExpressionKind::IntegerLiteral(i32::MIN as i64));
    }

    #[test]
    fn long_literals() {
        let expr = parse_integer("2147483648L", false, &Span::dummy()).unwrap();
        assert_eq!(expr.ty, JType::long());
        assert_eq!(expr.kind, ExpressionKind::IntegerLiteral(2_147_483_648));
        assert!(parse_integer("9223372036854775808L", false, &Span::dummy()).is_err());
        assert!(parse_integer("9223372036854775808L", true, &Span::dummy()).is_ok());
    }

    #[test]
    fn malformed_literals() {
        assert!(matches!(
            int("0x"),
            Err(CompileError::MalformedLiteral { .. })
        ));
        assert!(matches!(
            int("09"),
            Err(CompileError::MalformedLiteral { .. })
        ));
    }

    #[test]
    fn floating_literals() {
        let expr = parse_floating("1.5f", false, &Span::dummy()).unwrap();
        assert_eq!(expr.ty, JType::Primitive(PrimitiveType::Float));
        assert_eq!(expr.kind, ExpressionKind::FloatLiteral(1.5));
        let expr = parse_floating("2e3", true, &Span::dummy()).unwrap();
        assert_eq!(expr.kind, ExpressionKind::FloatLiteral(-2000.0));
        assert!(parse_floating("1e999", false, &Span::dummy()).is_err());
    }
}
