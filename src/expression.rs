// MXBridge - Managed attribute metrics bridge
// Copyright (c) 2025 David Martin Venti
//
// Dual-licensed under AGPL-3.0 and Commercial License.
// See LICENSE file for details.

//! Attribute expressions
//!
//! A dimension names the value it shows with one of three forms:
//!
//! | Form                          | Meaning                                  |
//! |-------------------------------|------------------------------------------|
//! | `Attr`                        | scalar attribute                         |
//! | `Attr.field`                  | one field of a structured attribute      |
//! | `Attr.num/Attr.den` (+ `-`)   | ratio of two fields, `-` for `1 - ratio` |

use std::fmt;

use crate::error::ConfigError;

/// Parsed attribute expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeExpression {
    raw: String,
    attribute: String,
    kind: ExpressionKind,
}

/// What an expression reads from its attribute
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    /// The attribute itself
    Scalar,
    /// One field of a structured attribute
    Field(String),
    /// Ratio of two fields of a structured attribute
    Ratio(RatioSpec),
}

/// Numerator and denominator of a ratio expression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioSpec {
    /// Field divided
    pub numerator: String,
    /// Field divided by
    pub denominator: String,
    /// Report `1 - ratio` instead of `ratio`
    pub complement: bool,
}

impl AttributeExpression {
    /// Parse an expression
    pub fn parse(expression: &str) -> Result<Self, ConfigError> {
        let raw = expression.trim();
        let invalid = |reason: String| ConfigError::InvalidExpression {
            expression: expression.to_string(),
            reason,
        };

        if raw.is_empty() {
            return Err(invalid("expression is empty".to_string()));
        }

        if raw.contains('/') {
            let (attribute, ratio) = parse_ratio(raw).map_err(invalid)?;
            return Ok(Self {
                raw: raw.to_string(),
                attribute,
                kind: ExpressionKind::Ratio(ratio),
            });
        }

        match raw.split_once('.') {
            Some((attribute, field)) => {
                if attribute.is_empty() || field.is_empty() {
                    return Err(invalid(
                        "expected format '<attribute>.<key>'".to_string(),
                    ));
                }
                Ok(Self {
                    raw: raw.to_string(),
                    attribute: attribute.to_string(),
                    kind: ExpressionKind::Field(field.to_string()),
                })
            }
            None => Ok(Self {
                raw: raw.to_string(),
                attribute: raw.to_string(),
                kind: ExpressionKind::Scalar,
            }),
        }
    }

    /// Name of the remote attribute to read
    pub fn attribute(&self) -> &str {
        &self.attribute
    }

    /// Decomposition of the expression
    pub fn kind(&self) -> &ExpressionKind {
        &self.kind
    }

    /// Whether the expression uses the ratio form
    pub fn is_ratio(&self) -> bool {
        matches!(self.kind, ExpressionKind::Ratio(_))
    }

    /// Expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

fn parse_ratio(raw: &str) -> Result<(String, RatioSpec), String> {
    let format_error = || {
        format!(
            "expected format '<attribute>.<key>/<attribute>.<key>', but was '{}'",
            raw
        )
    };

    let (body, complement) = match raw.strip_suffix('-') {
        Some(body) => (body, true),
        None => (raw, false),
    };

    let parts: Vec<&str> = body.split('/').collect();
    if parts.len() != 2 {
        return Err(format_error());
    }

    let (num_attr, numerator) = split_field(parts[0]).ok_or_else(format_error)?;
    let (den_attr, denominator) = split_field(parts[1]).ok_or_else(format_error)?;

    if num_attr != den_attr {
        return Err(format!(
            "numerator and denominator must read the same attribute, got '{}' and '{}'",
            num_attr, den_attr
        ));
    }

    Ok((
        num_attr.to_string(),
        RatioSpec {
            numerator: numerator.to_string(),
            denominator: denominator.to_string(),
            complement,
        },
    ))
}

/// Split `attribute.key` into exactly two non-empty parts
fn split_field(part: &str) -> Option<(&str, &str)> {
    let mut pieces = part.split('.');
    let attribute = pieces.next()?;
    let key = pieces.next()?;
    if pieces.next().is_some() || attribute.is_empty() || key.is_empty() {
        return None;
    }
    Some((attribute, key))
}

impl fmt::Display for AttributeExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
