//! Type coercion between node-sets, strings, numbers and booleans.
//!
//! All functions are pure. Node-sets need the document to produce their
//! string-value (the text of the first node), so the string and number
//! conversions take a [`DocumentAccess`].

use super::value::XPathValue;
use crate::dom::{node_string_value, DocumentAccess};

/// Coerce two operands of `=`/`!=` to a common type.
///
/// Rules are applied in order:
/// 1. node-sets become strings (text of their first node, "" when empty);
/// 2. if either side is a number the other becomes a number;
/// 3. else if either side is a string the other becomes a string;
/// 4. else if either side is a boolean the other becomes a boolean.
pub fn to_compatible_types<D: DocumentAccess + ?Sized>(
    doc: &D,
    left: XPathValue,
    right: XPathValue,
) -> (XPathValue, XPathValue) {
    let left = if left.is_nodeset() {
        XPathValue::String(to_string(doc, &left))
    } else {
        left
    };
    let right = if right.is_nodeset() {
        XPathValue::String(to_string(doc, &right))
    } else {
        right
    };

    match (&left, &right) {
        (XPathValue::Number(_), XPathValue::Number(_))
        | (XPathValue::String(_), XPathValue::String(_))
        | (XPathValue::Boolean(_), XPathValue::Boolean(_)) => (left, right),
        (XPathValue::Number(_), _) | (_, XPathValue::Number(_)) => (
            XPathValue::Number(to_float(doc, &left)),
            XPathValue::Number(to_float(doc, &right)),
        ),
        (XPathValue::String(_), _) | (_, XPathValue::String(_)) => (
            XPathValue::String(to_string(doc, &left)),
            XPathValue::String(to_string(doc, &right)),
        ),
        _ => (
            XPathValue::Boolean(to_boolean(&left)),
            XPathValue::Boolean(to_boolean(&right)),
        ),
    }
}

/// Equality after [`to_compatible_types`].
pub fn values_equal<D: DocumentAccess + ?Sized>(
    doc: &D,
    left: XPathValue,
    right: XPathValue,
) -> bool {
    match to_compatible_types(doc, left, right) {
        (XPathValue::Number(a), XPathValue::Number(b)) => a == b,
        (XPathValue::String(a), XPathValue::String(b)) => a == b,
        (XPathValue::Boolean(a), XPathValue::Boolean(b)) => a == b,
        _ => false,
    }
}

/// String conversion (XPath `string()` semantics).
pub fn to_string<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> String {
    match value {
        XPathValue::NodeSet(nodes) => nodes
            .first()
            .map(|&first| node_string_value(doc, first))
            .unwrap_or_default(),
        XPathValue::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
        XPathValue::Number(n) => format_number(*n),
        XPathValue::String(s) => s.clone(),
    }
}

/// Number conversion. Text that is not a number yields NaN.
pub fn to_float<D: DocumentAccess + ?Sized>(doc: &D, value: &XPathValue) -> f64 {
    match value {
        XPathValue::NodeSet(_) => parse_number(&to_string(doc, value)),
        XPathValue::Boolean(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        XPathValue::Number(n) => *n,
        XPathValue::String(s) => parse_number(s),
    }
}

/// Truthiness: numbers unless zero or NaN, strings and node-sets unless empty.
pub fn to_boolean(value: &XPathValue) -> bool {
    match value {
        XPathValue::NodeSet(nodes) => !nodes.is_empty(),
        XPathValue::Boolean(b) => *b,
        XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
        XPathValue::String(s) => !s.is_empty(),
    }
}

/// True only for actual booleans.
pub fn is_boolean(value: &XPathValue) -> bool {
    matches!(value, XPathValue::Boolean(_))
}

/// Render a number the XPath way: integral values drop the fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse the XPath `Number` grammar (`-`? digits with optional fraction),
/// ignoring surrounding whitespace. Anything else is NaN.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);

    let mut seen_digit = false;
    let mut seen_dot = false;
    for b in digits.bytes() {
        match b {
            b'0'..=b'9' => seen_digit = true,
            b'.' if !seen_dot => seen_dot = true,
            _ => return f64::NAN,
        }
    }
    if !seen_digit {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}
