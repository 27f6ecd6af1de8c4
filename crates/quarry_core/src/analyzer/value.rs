//! Compile-time JavaScript values.
//!
//! [`JsValue`] holds the values the evaluator can know statically, together
//! with the ECMAScript conversions needed to fold operators over them:
//! [`to_boolean`][JsValue::to_boolean] (§7.1.2),
//! [`to_number`][JsValue::to_number] (§7.1.4),
//! [`to_js_string`][JsValue::to_js_string] (§7.1.17), plus the equality,
//! relational and arithmetic operators of §13.

use std::cmp::Ordering;

use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};

use crate::error::{QuarryError, QuarryResult};
use crate::parser::ast::{BinaryOp, UnaryOp};

/// A value known at analysis time.
///
/// `RegExp` and `Array` stand for objects: every evaluation of the source
/// expression creates a fresh one, so two of them are never strictly equal.
#[derive(Debug, Clone, PartialEq)]
pub enum JsValue {
    /// The ECMAScript `undefined` primitive.
    Undefined,
    /// The ECMAScript `null` primitive.
    Null,
    /// A JavaScript boolean.
    Boolean(bool),
    /// A double-precision number.
    Number(f64),
    /// A JavaScript string value.
    String(String),
    /// A JavaScript `BigInt`.
    BigInt(BigInt),
    /// A regular expression object.
    RegExp { pattern: String, flags: String },
    /// An array object whose elements are all known.
    Array(Vec<JsValue>),
}

/// Result of `ToNumeric` (§7.1.3).
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    Number(f64),
    BigInt(BigInt),
}

/// Largest `BigInt` result, in bits, the folder computes.
const MAX_BIGINT_BITS: u64 = 1 << 16;

// ──────────────────────────────────────────────────────────────────────────────
// Type-checking predicates
// ──────────────────────────────────────────────────────────────────────────────

impl JsValue {
    /// Returns `true` if this value is `undefined`.
    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Returns `true` if this value is `null`.
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns `true` for `null` and `undefined`.
    #[inline]
    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Returns `true` for the object-valued variants.
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self, Self::RegExp { .. } | Self::Array(_))
    }

    /// The `typeof` string for this value.
    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null | Self::RegExp { .. } | Self::Array(_) => "object",
            Self::Boolean(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::BigInt(_) => "bigint",
        }
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Type conversions
// ──────────────────────────────────────────────────────────────────────────────

impl JsValue {
    /// ECMAScript `ToBoolean` (§7.1.2).
    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null => false,
            Self::Boolean(b) => *b,
            Self::Number(n) => !(*n == 0.0 || n.is_nan()),
            Self::String(s) => !s.is_empty(),
            Self::BigInt(n) => !n.is_zero(),
            Self::RegExp { .. } | Self::Array(_) => true,
        }
    }

    /// ECMAScript `ToNumber` (§7.1.4).
    ///
    /// # Errors
    /// Returns [`QuarryError::TypeError`] for `BigInt` values.
    pub fn to_number(&self) -> QuarryResult<f64> {
        match self {
            Self::Undefined => Ok(f64::NAN),
            Self::Null => Ok(0.0),
            Self::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Self::Number(n) => Ok(*n),
            Self::String(s) => Ok(string_to_number(s)),
            Self::BigInt(_) => Err(QuarryError::TypeError(
                "Cannot convert a BigInt value to a number".into(),
            )),
            Self::RegExp { .. } | Self::Array(_) => self.to_primitive().to_number(),
        }
    }

    /// ECMAScript `ToString` (§7.1.17).
    pub fn to_js_string(&self) -> String {
        match self {
            Self::Undefined => "undefined".into(),
            Self::Null => "null".into(),
            Self::Boolean(b) => b.to_string(),
            Self::Number(n) => number_to_js_string(*n),
            Self::String(s) => s.clone(),
            Self::BigInt(n) => n.to_string(),
            Self::RegExp { pattern, flags } => format!("/{pattern}/{flags}"),
            Self::Array(items) => items
                .iter()
                .map(|item| {
                    if item.is_nullish() {
                        String::new()
                    } else {
                        item.to_js_string()
                    }
                })
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// ECMAScript `ToPrimitive` (§7.1.1) with the default hint.
    ///
    /// Arrays and regular expressions convert through their `toString`.
    pub fn to_primitive(&self) -> JsValue {
        if self.is_object() {
            JsValue::String(self.to_js_string())
        } else {
            self.clone()
        }
    }

    /// ECMAScript `ToNumeric` (§7.1.3).
    pub fn to_numeric(&self) -> QuarryResult<Numeric> {
        match self.to_primitive() {
            JsValue::BigInt(n) => Ok(Numeric::BigInt(n)),
            primitive => primitive.to_number().map(Numeric::Number),
        }
    }
}

/// Format `n` the way `Number.prototype.toString()` does (§6.1.6.1.20).
pub fn number_to_js_string(n: f64) -> String {
    if n.is_nan() {
        return "NaN".into();
    }
    if n == 0.0 {
        return "0".into();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    if n < 0.0 {
        return format!("-{}", number_to_js_string(-n));
    }

    // `{:e}` yields the shortest round-tripping digits, e.g. "1.2345e4".
    let formatted = format!("{n:e}");
    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let k = digits.len() as i32;
    let point = exponent.parse::<i32>().unwrap_or(0) + 1;

    if k <= point && point <= 21 {
        format!("{digits}{}", "0".repeat((point - k) as usize))
    } else if 0 < point && point <= 21 {
        let (int, frac) = digits.split_at(point as usize);
        format!("{int}.{frac}")
    } else if -6 < point && point <= 0 {
        format!("0.{}{digits}", "0".repeat((-point) as usize))
    } else {
        let e = point - 1;
        let sign = if e >= 0 { '+' } else { '-' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{first}e{sign}{}", e.abs())
        } else {
            format!("{first}.{rest}e{sign}{}", e.abs())
        }
    }
}

fn trim_js_whitespace(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || c == '\u{FEFF}')
}

/// `StringToNumber` (§7.1.4.1.1).
pub fn string_to_number(s: &str) -> f64 {
    let trimmed = trim_js_whitespace(s);
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    if let Some(radix) = radix_prefix(trimmed) {
        let digits = &trimmed[2..];
        if digits.is_empty() {
            return f64::NAN;
        }
        return digits
            .chars()
            .try_fold(0.0_f64, |acc, c| {
                c.to_digit(radix).map(|d| acc * f64::from(radix) + f64::from(d))
            })
            .unwrap_or(f64::NAN);
    }
    let body = trimmed.trim_start_matches(['+', '-']);
    let well_formed = body.starts_with(|c: char| c.is_ascii_digit() || c == '.')
        && body.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-'));
    if !well_formed {
        return f64::NAN;
    }
    trimmed.parse::<f64>().unwrap_or(f64::NAN)
}

/// `StringToBigInt` (§7.1.14); `None` where JavaScript would produce a
/// `SyntaxError`.
pub fn string_to_bigint(s: &str) -> Option<BigInt> {
    let trimmed = trim_js_whitespace(s);
    if trimmed.is_empty() {
        return Some(BigInt::zero());
    }
    if let Some(radix) = radix_prefix(trimmed) {
        let digits = &trimmed[2..];
        if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
            return None;
        }
        return BigInt::parse_bytes(digits.as_bytes(), radix);
    }
    let body = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if body.is_empty() || !body.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    trimmed.parse().ok()
}

/// Order a `BigInt` against a number by exact mathematical value.
fn compare_bigint_number(a: &BigInt, b: f64) -> Option<Ordering> {
    if b.is_nan() {
        return None;
    }
    if b.is_infinite() {
        return Some(if b > 0.0 { Ordering::Less } else { Ordering::Greater });
    }
    let floor = BigInt::from_f64(b.floor())?;
    Some(match a.cmp(&floor) {
        Ordering::Equal if b.fract() != 0.0 => Ordering::Less,
        other => other,
    })
}

fn radix_prefix(s: &str) -> Option<u32> {
    match s.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    }
}

fn to_int32(n: f64) -> i32 {
    to_uint32(n) as i32
}

fn to_uint32(n: f64) -> u32 {
    if !n.is_finite() {
        return 0;
    }
    n.trunc().rem_euclid(4_294_967_296.0) as u32
}

fn js_pow(base: f64, exponent: f64) -> f64 {
    if exponent.is_nan() {
        return f64::NAN;
    }
    if exponent == 0.0 {
        return 1.0;
    }
    if base.abs() == 1.0 && exponent.is_infinite() {
        return f64::NAN;
    }
    base.powf(exponent)
}

// ──────────────────────────────────────────────────────────────────────────────
// Operators
// ──────────────────────────────────────────────────────────────────────────────

/// `IsStrictlyEqual` (§7.2.15).
pub fn strict_equals(left: &JsValue, right: &JsValue) -> bool {
    match (left, right) {
        (JsValue::Undefined, JsValue::Undefined) | (JsValue::Null, JsValue::Null) => true,
        (JsValue::Boolean(a), JsValue::Boolean(b)) => a == b,
        (JsValue::Number(a), JsValue::Number(b)) => a == b,
        (JsValue::String(a), JsValue::String(b)) => a == b,
        (JsValue::BigInt(a), JsValue::BigInt(b)) => a == b,
        _ => false,
    }
}

/// `IsLooselyEqual` (§7.2.14).
pub fn loose_equals(left: &JsValue, right: &JsValue) -> bool {
    use JsValue::*;
    match (left, right) {
        (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => strict_equals(a, b),
        (Null | Undefined, Null | Undefined) => true,
        (Null | Undefined, _) | (_, Null | Undefined) => false,
        (Number(n), String(s)) | (String(s), Number(n)) => *n == string_to_number(s),
        (BigInt(n), String(s)) | (String(s), BigInt(n)) => string_to_bigint(s).as_ref() == Some(n),
        (Boolean(b), other) | (other, Boolean(b)) => {
            loose_equals(&Number(if *b { 1.0 } else { 0.0 }), other)
        }
        (BigInt(a), Number(b)) | (Number(b), BigInt(a)) => {
            compare_bigint_number(a, *b) == Some(Ordering::Equal)
        }
        (object, primitive) | (primitive, object) if object.is_object() && !primitive.is_object() => {
            loose_equals(&object.to_primitive(), primitive)
        }
        _ => false,
    }
}

fn compare(left: &JsValue, right: &JsValue) -> QuarryResult<Option<Ordering>> {
    let (left, right) = (left.to_primitive(), right.to_primitive());
    if let (JsValue::String(a), JsValue::String(b)) = (&left, &right) {
        return Ok(Some(a.encode_utf16().cmp(b.encode_utf16())));
    }
    Ok(match (left.to_numeric()?, right.to_numeric()?) {
        (Numeric::Number(a), Numeric::Number(b)) => a.partial_cmp(&b),
        (Numeric::BigInt(a), Numeric::BigInt(b)) => Some(a.cmp(&b)),
        (Numeric::BigInt(a), Numeric::Number(b)) => compare_bigint_number(&a, b),
        (Numeric::Number(a), Numeric::BigInt(b)) => compare_bigint_number(&b, a).map(Ordering::reverse),
    })
}

/// Apply one of the foldable binary operators to two known values.
///
/// Covers `- * / **`, the bitwise and shift operators and the four
/// relational comparisons. `+` and equality are folded by the evaluator
/// itself.
///
/// # Errors
/// Returns [`QuarryError::TypeError`] where JavaScript would throw (mixing
/// `BigInt` with numbers, `BigInt` division by zero, `>>>` on `BigInt`) and
/// for operators outside that set.
pub fn binary_operation(op: BinaryOp, left: &JsValue, right: &JsValue) -> QuarryResult<JsValue> {
    match op {
        BinaryOp::Lt => return Ok(JsValue::Boolean(compare(left, right)? == Some(Ordering::Less))),
        BinaryOp::Gt => {
            return Ok(JsValue::Boolean(compare(left, right)? == Some(Ordering::Greater)));
        }
        BinaryOp::LtEq => {
            let ord = compare(left, right)?;
            return Ok(JsValue::Boolean(matches!(ord, Some(Ordering::Less | Ordering::Equal))));
        }
        BinaryOp::GtEq => {
            let ord = compare(left, right)?;
            return Ok(JsValue::Boolean(matches!(
                ord,
                Some(Ordering::Greater | Ordering::Equal)
            )));
        }
        _ => {}
    }

    match (left.to_numeric()?, right.to_numeric()?) {
        (Numeric::Number(a), Numeric::Number(b)) => number_operation(op, a, b).map(JsValue::Number),
        (Numeric::BigInt(a), Numeric::BigInt(b)) => bigint_operation(op, &a, &b).map(JsValue::BigInt),
        _ => Err(QuarryError::TypeError(
            "Cannot mix BigInt and other types, use explicit conversions".into(),
        )),
    }
}

fn number_operation(op: BinaryOp, a: f64, b: f64) -> QuarryResult<f64> {
    let shift = to_uint32(b) & 31;
    Ok(match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Exp => js_pow(a, b),
        BinaryOp::BitAnd => f64::from(to_int32(a) & to_int32(b)),
        BinaryOp::BitOr => f64::from(to_int32(a) | to_int32(b)),
        BinaryOp::BitXor => f64::from(to_int32(a) ^ to_int32(b)),
        BinaryOp::Shl => f64::from(to_int32(a).wrapping_shl(shift)),
        BinaryOp::Shr => f64::from(to_int32(a) >> shift),
        BinaryOp::UShr => f64::from(to_uint32(a) >> shift),
        other => return Err(unsupported(other)),
    })
}

fn bigint_operation(op: BinaryOp, a: &BigInt, b: &BigInt) -> QuarryResult<BigInt> {
    let too_large = || QuarryError::TypeError("BigInt result is too large to fold".into());
    match op {
        BinaryOp::Sub => Ok(a - b),
        BinaryOp::Mul if a.bits() + b.bits() > MAX_BIGINT_BITS => Err(too_large()),
        BinaryOp::Mul => Ok(a * b),
        BinaryOp::Div if b.is_zero() => Err(QuarryError::TypeError("Division by zero".into())),
        BinaryOp::Div => Ok(a / b),
        BinaryOp::Exp => {
            let exponent = b
                .to_u32()
                .ok_or_else(|| QuarryError::TypeError("Exponent must be non-negative".into()))?;
            if a.bits().saturating_mul(u64::from(exponent)) > MAX_BIGINT_BITS {
                return Err(too_large());
            }
            Ok(a.pow(exponent))
        }
        BinaryOp::BitAnd => Ok(a & b),
        BinaryOp::BitOr => Ok(a | b),
        BinaryOp::BitXor => Ok(a ^ b),
        BinaryOp::Shl => shift_bigint(a, b).ok_or_else(too_large),
        BinaryOp::Shr => shift_bigint(a, &-b).ok_or_else(too_large),
        BinaryOp::UShr => Err(QuarryError::TypeError(
            "BigInts have no unsigned right shift, use >> instead".into(),
        )),
        other => Err(unsupported(other)),
    }
}

/// `a * 2^by`, flooring for negative `by`.
fn shift_bigint(a: &BigInt, by: &BigInt) -> Option<BigInt> {
    let by = by.to_i64()?;
    if by >= 0 {
        let by = u64::try_from(by).ok()?;
        if a.bits().saturating_add(by) > MAX_BIGINT_BITS {
            return None;
        }
        Some(a << by)
    } else {
        Some(a >> by.unsigned_abs().min(a.bits() + 1))
    }
}

fn unsupported(op: BinaryOp) -> QuarryError {
    QuarryError::TypeError(format!("operator {op:?} is not folded"))
}

/// Apply `-`, `+` or `~` to a known value.
///
/// # Errors
/// Returns [`QuarryError::TypeError`] for unary `+` on a `BigInt` and for
/// operators other than those three.
pub fn unary_operation(op: UnaryOp, value: &JsValue) -> QuarryResult<JsValue> {
    match op {
        UnaryOp::Plus => value.to_number().map(JsValue::Number),
        UnaryOp::Minus => match value.to_numeric()? {
            Numeric::Number(n) => Ok(JsValue::Number(-n)),
            Numeric::BigInt(n) => Ok(JsValue::BigInt(-n)),
        },
        UnaryOp::BitNot => match value.to_numeric()? {
            Numeric::Number(n) => Ok(JsValue::Number(f64::from(!to_int32(n)))),
            Numeric::BigInt(n) => Ok(JsValue::BigInt(!n)),
        },
        other => Err(QuarryError::TypeError(format!("operator {other:?} is not folded"))),
    }
}

// ──────────────────────────────────────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────────────────────────────────────
