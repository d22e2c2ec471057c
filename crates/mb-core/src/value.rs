//! CSS value helpers: lengths, box shorthands, number formatting, escaping.
//!
//! Built on `winnow` 0.7. Parsers are lenient entry points returning `Option`;
//! a value that does not parse is simply not a length.

use crate::style::{StyleMap, StyleValue};
use winnow::ascii::space1;
use winnow::combinator::{alt, opt, separated};
use winnow::prelude::*;
use winnow::token::{take_till, take_while};

// ─── Units & lengths ─────────────────────────────────────────────────────

/// The units the editor's size pickers offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Percent,
    Vw,
    Em,
    Auto,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::Px => "px",
            Unit::Percent => "%",
            Unit::Vw => "vw",
            Unit::Em => "em",
            Unit::Auto => "auto",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "px" => Some(Unit::Px),
            "%" => Some(Unit::Percent),
            "vw" => Some(Unit::Vw),
            "em" => Some(Unit::Em),
            "auto" => Some(Unit::Auto),
            _ => None,
        }
    }
}

/// A parsed CSS length. `auto` has value 0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Length {
    pub value: f64,
    pub unit: Unit,
}

impl Length {
    pub const AUTO: Length = Length {
        value: 0.0,
        unit: Unit::Auto,
    };

    pub fn px(value: f64) -> Self {
        Self {
            value,
            unit: Unit::Px,
        }
    }

    pub fn to_css(&self) -> String {
        match self.unit {
            Unit::Auto => "auto".to_string(),
            unit => format!("{}{}", format_num(self.value), unit.as_str()),
        }
    }
}

fn number(input: &mut &str) -> ModalResult<f64> {
    take_while(1.., |c: char| c.is_ascii_digit() || matches!(c, '.' | '-' | '+'))
        .try_map(str::parse::<f64>)
        .parse_next(input)
}

fn unit(input: &mut &str) -> ModalResult<Unit> {
    alt((
        "px".value(Unit::Px),
        "%".value(Unit::Percent),
        "vw".value(Unit::Vw),
        "em".value(Unit::Em),
    ))
    .parse_next(input)
}

fn length(input: &mut &str) -> ModalResult<Length> {
    alt((
        "auto".value(Length::AUTO),
        (number, opt(unit)).map(|(value, unit)| Length {
            value,
            unit: unit.unwrap_or(Unit::Px),
        }),
    ))
    .parse_next(input)
}

/// Parse `"12px"`, `"50%"`, `"1.5em"`, `"auto"`, or a unitless number (px).
pub fn parse_length(s: &str) -> Option<Length> {
    let mut rest = s.trim();
    let parsed = length.parse_next(&mut rest).ok()?;
    rest.is_empty().then_some(parsed)
}

/// Length view of a stored style value. Numbers are px.
pub fn length_of(value: &StyleValue) -> Option<Length> {
    match value {
        StyleValue::Number(n) => Some(Length::px(*n)),
        StyleValue::Text(s) => parse_length(s),
    }
}

/// True for strings that are a bare number (`"10"`, `"-2.5"`).
pub fn is_numeric(s: &str) -> bool {
    let s = s.trim();
    !s.is_empty() && s.parse::<f64>().is_ok()
}

// ─── Box shorthands ──────────────────────────────────────────────────────

fn box_tokens<'a>(input: &mut &'a str) -> ModalResult<Vec<&'a str>> {
    separated(1..=4, take_till(1.., char::is_whitespace), space1).parse_next(input)
}

/// Split a 1–4 token box shorthand into `[top, right, bottom, left]`.
pub fn parse_box(s: &str) -> Option<[String; 4]> {
    let mut rest = s.trim();
    let tokens = box_tokens.parse_next(&mut rest).ok()?;
    if !rest.trim().is_empty() {
        return None;
    }
    let t: Vec<String> = tokens.iter().map(|s| (*s).to_string()).collect();
    let sides = match t.as_slice() {
        [all] => [all.clone(), all.clone(), all.clone(), all.clone()],
        [v, h] => [v.clone(), h.clone(), v.clone(), h.clone()],
        [top, h, bottom] => [top.clone(), h.clone(), bottom.clone(), h.clone()],
        [top, right, bottom, left] => [top.clone(), right.clone(), bottom.clone(), left.clone()],
        _ => return None,
    };
    Some(sides)
}

/// Shortest shorthand that expresses `[top, right, bottom, left]`.
pub fn compact_box(sides: &[String; 4]) -> String {
    let [top, right, bottom, left] = sides;
    if top == right && right == bottom && bottom == left {
        top.clone()
    } else if top == bottom && right == left {
        format!("{top} {right}")
    } else if right == left {
        format!("{top} {right} {bottom}")
    } else {
        format!("{top} {right} {bottom} {left}")
    }
}

fn side_css(value: &StyleValue) -> String {
    match value {
        StyleValue::Number(n) => format!("{}px", format_num(*n)),
        StyleValue::Text(t) if is_numeric(t) => format!("{}px", t.trim()),
        StyleValue::Text(t) => t.trim().to_string(),
    }
}

/// Merge `<prop>` and its `<prop>Top/Right/Bottom/Left` longhands into one
/// shorthand. Longhands win over the shorthand; unset sides are `0`.
/// Returns `None` when neither form is present.
pub fn box_shorthand(style: &StyleMap, prop: &str) -> Option<String> {
    let base = style
        .get(prop)
        .filter(|v| !v.is_blank())
        .and_then(|v| match v {
            StyleValue::Number(_) => {
                let px = side_css(v);
                Some([px.clone(), px.clone(), px.clone(), px])
            }
            StyleValue::Text(t) => parse_box(t),
        });

    let mut found = base.is_some();
    let mut sides = base.unwrap_or_else(|| std::array::from_fn(|_| "0".to_string()));
    for (i, side) in ["Top", "Right", "Bottom", "Left"].iter().enumerate() {
        if let Some(v) = style.get(&format!("{prop}{side}")).filter(|v| !v.is_blank()) {
            sides[i] = side_css(v);
            found = true;
        }
    }
    found.then(|| compact_box(&sides))
}

// ─── Formatting & escaping ───────────────────────────────────────────────

/// Format a number without a trailing `.0`; at most 4 decimals.
pub fn format_num(n: f64) -> String {
    if !n.is_finite() {
        return "0".to_string();
    }
    if n == n.floor() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n:.4}")
            .trim_end_matches('0')
            .trim_end_matches('.')
            .to_string()
    }
}

/// Escape text for an HTML text node.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escape text for a double-quoted HTML/MJML attribute.
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
