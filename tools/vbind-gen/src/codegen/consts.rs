// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Constant and enumerator value normalization.
//!
//! Values arrive as C source text (`0xFFFFFFFFull`, `( SteamAPICall_t ) 0`,
//! `1 << 3 | 1`, `1.5f`) and leave as Rust expressions of the target type.

use std::collections::BTreeSet;

use crate::descriptor::{EnumDescriptor, RawValue};
use crate::error::GenError;

use super::types::Primitive;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Number(&'a str),
    Ident(&'a str),
    Shl,
    Or,
    Minus,
    Tilde,
    Open,
    Close,
}

fn tokenize(text: &str) -> Option<Vec<Token<'_>>> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        match c {
            b' ' | b'\t' => i += 1,
            b'<' if bytes.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Shl);
                i += 2;
            }
            b'|' => {
                tokens.push(Token::Or);
                i += 1;
            }
            b'-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            b'~' => {
                tokens.push(Token::Tilde);
                i += 1;
            }
            b'(' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b')' => {
                tokens.push(Token::Close);
                i += 1;
            }
            c if c.is_ascii_alphanumeric() || c == b'_' || c == b':' => {
                let start = i;
                while i < bytes.len()
                    && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_' || bytes[i] == b':')
                {
                    i += 1;
                }
                let word = &text[start..i];
                if c.is_ascii_digit() {
                    tokens.push(Token::Number(word));
                } else {
                    tokens.push(Token::Ident(word));
                }
            }
            _ => return None,
        }
    }
    Some(tokens)
}

/// Integer literal with C suffixes (`u`, `l`, `ll`, `ull`) stripped.
fn parse_literal(word: &str) -> Option<i128> {
    let digits = word.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i128::from_str_radix(hex, 16).ok()
    } else if digits.len() > 1 && digits.starts_with('0') {
        i128::from_str_radix(&digits[1..], 8).ok()
    } else {
        digits.parse().ok()
    }
}

struct Parser<'a> {
    tokens: Vec<Token<'a>>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        self.pos += 1;
        token
    }

    fn or_expr(&mut self) -> Option<i128> {
        let mut value = self.shift_expr()?;
        while self.peek() == Some(Token::Or) {
            self.pos += 1;
            value |= self.shift_expr()?;
        }
        Some(value)
    }

    fn shift_expr(&mut self) -> Option<i128> {
        let value = self.unary()?;
        if self.peek() == Some(Token::Shl) {
            self.pos += 1;
            let amount = u32::try_from(self.unary()?).ok().filter(|n| *n < 64)?;
            return value.checked_shl(amount);
        }
        Some(value)
    }

    fn unary(&mut self) -> Option<i128> {
        match self.next()? {
            Token::Minus => self.unary()?.checked_neg(),
            Token::Tilde => Some(!self.unary()?),
            Token::Number(word) => parse_literal(word),
            Token::Open => {
                // `( type ) value` is a cast; the target type decides the range
                if let Some(Token::Ident(_)) = self.peek() {
                    while let Some(Token::Ident(_)) = self.peek() {
                        self.pos += 1;
                    }
                    if self.next()? != Token::Close {
                        return None;
                    }
                    return self.unary();
                }
                let value = self.or_expr()?;
                (self.next()? == Token::Close).then_some(value)
            }
            _ => None,
        }
    }
}

/// Evaluate an integer constant expression.
pub fn eval_integer(text: &str) -> Option<i128> {
    let mut parser = Parser {
        tokens: tokenize(text.trim())?,
        pos: 0,
    };
    let value = parser.or_expr()?;
    (parser.pos == parser.tokens.len()).then_some(value)
}

fn range(p: Primitive) -> (i128, i128) {
    match p {
        Primitive::Bool => (0, 1),
        Primitive::U8 => (0, u8::MAX.into()),
        Primitive::I8 => (i8::MIN.into(), i8::MAX.into()),
        Primitive::U16 => (0, u16::MAX.into()),
        Primitive::I16 => (i16::MIN.into(), i16::MAX.into()),
        Primitive::U32 => (0, u32::MAX.into()),
        Primitive::I32 => (i32::MIN.into(), i32::MAX.into()),
        Primitive::U64 | Primitive::Usize => (0, u64::MAX.into()),
        Primitive::I64 | Primitive::Isize | Primitive::F32 | Primitive::F64 => {
            (i64::MIN.into(), i64::MAX.into())
        }
    }
}

fn invalid(name: &str, value: &str) -> GenError {
    GenError::InvalidConstant {
        name: name.to_string(),
        value: value.to_string(),
    }
}

/// Integer constant of type `p`.
///
/// `-1` and `~0` on an unsigned type become `!0`; hex sources stay hex.
pub fn integer_const(name: &str, raw: &str, p: Primitive) -> Result<String, GenError> {
    let value = eval_integer(raw).ok_or_else(|| invalid(name, raw))?;
    let (min, max) = range(p);
    if value < min || value > max {
        if p.is_unsigned() && value == -1 {
            return Ok("!0".to_string());
        }
        return Err(invalid(name, raw));
    }
    if p == Primitive::Bool {
        return Ok((value != 0).to_string());
    }
    let hex = raw.contains("0x") || raw.contains("0X");
    Ok(if hex && value >= 0 {
        format!("0x{value:X}")
    } else {
        value.to_string()
    })
}

/// Float constant; `f` suffixes dropped, integers gain `.0`.
pub fn float_const(name: &str, raw: &str) -> Result<String, GenError> {
    let text = raw.trim();
    let text = text.strip_suffix(['f', 'F']).unwrap_or(text);
    if text.parse::<f64>().is_err() {
        return Err(invalid(name, raw));
    }
    if text.contains(['.', 'e', 'E']) {
        Ok(text.to_string())
    } else {
        Ok(format!("{text}.0"))
    }
}

/// String constant as a `&CStr` literal.
pub fn string_const(name: &str, raw: &str) -> Result<String, GenError> {
    let text = raw.trim();
    let inner = match text.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
        Some(inner) => inner,
        None if !text.contains('"') => text,
        None => return Err(invalid(name, raw)),
    };
    if inner.contains("\\0") {
        return Err(invalid(name, raw));
    }
    Ok(format!("c\"{inner}\""))
}

/// `i32` expression for an enumerator; values that only fit `u32` wrap.
pub fn enum_value_expr(value: i128) -> Option<String> {
    if let Ok(v) = i32::try_from(value) {
        Some(v.to_string())
    } else if let Ok(v) = u32::try_from(value) {
        Some(format!("{v}_u32 as i32"))
    } else {
        None
    }
}

/// Constant typed as a generated enum.
pub fn enum_const(name: &str, raw: &str, enum_name: &str) -> Result<String, GenError> {
    let expr = eval_integer(raw)
        .and_then(enum_value_expr)
        .ok_or_else(|| invalid(name, raw))?;
    Ok(format!("{enum_name}({expr})"))
}

/// One associated constant of a generated enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueSpec {
    pub name: String,
    pub expr: String,
}

/// Enumerators in declaration order, first occurrence of each value wins.
pub fn normalize_enum(owner: &str, e: &EnumDescriptor) -> (Vec<EnumValueSpec>, Vec<GenError>) {
    let mut seen = BTreeSet::new();
    let mut names = BTreeSet::new();
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for v in &e.values {
        let value = match &v.value {
            RawValue::Int(n) => Some(i128::from(*n)),
            RawValue::UInt(n) => Some(i128::from(*n)),
            RawValue::Text(text) => eval_integer(text),
        };
        let Some(expr) = value.and_then(enum_value_expr) else {
            errors.push(GenError::InvalidEnumValue {
                owner: owner.to_string(),
                name: v.name.clone(),
                value: v.value.to_string(),
            });
            continue;
        };
        if !seen.insert(expr.clone()) || !names.insert(v.name.clone()) {
            continue;
        }
        values.push(EnumValueSpec {
            name: v.name.clone(),
            expr,
        });
    }
    (values, errors)
}
