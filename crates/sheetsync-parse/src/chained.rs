//! Chained special-value grammar.
//!
//! A special value is a list of property tokens separated by commas or
//! whitespace, optionally prefixed with the `/` sentinel:
//!
//! ```text
//! /hide
//! /#F00 50% 120w
//! /20xx, -4y, 45º
//! /font-size: 18, line-height:150%, text-align:center
//! ```
//!
//! Every token is tried against an ordered list of single-purpose
//! recognizers. Unknown tokens are skipped. A later token of the same kind
//! replaces an earlier one.

use once_cell::sync::Lazy;
use regex::Regex;
use sheetsync_common::Rgb;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Prefix that marks a cell value as a special value.
pub const SENTINEL: char = '/';

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    /// Width and height together.
    Size,
    Width,
    Height,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub value: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionMode {
    /// Offset from the current position (`x`, `y`).
    Relative,
    /// Coordinate within the parent (`xx`, `yy`).
    Absolute,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub mode: PositionMode,
    pub axis: Axis,
    pub value: f64,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
    Justified,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerticalAlign {
    Top,
    Center,
    Bottom,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LineHeight {
    Auto,
    Pixels(f64),
    Percent(f64),
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LetterSpacing {
    Pixels(f64),
    Percent(f64),
}

/// Sparse set of property changes decoded from one special value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpecialValue {
    pub visible: Option<bool>,
    pub color: Option<Rgb>,
    /// Opacity in `[0, 1]`.
    pub opacity: Option<f64>,
    pub dimension: Option<Dimension>,
    pub position: Option<Position>,
    /// Rotation in degrees.
    pub rotation: Option<f64>,
    pub text_align: Option<HorizontalAlign>,
    pub text_align_vertical: Option<VerticalAlign>,
    pub font_size: Option<f64>,
    pub line_height: Option<LineHeight>,
    pub letter_spacing: Option<LetterSpacing>,
}

impl SpecialValue {
    /// Decode a chained value. The leading sentinel is optional.
    pub fn parse(value: &str) -> Self {
        parse_chained(value)
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether any field needs a text layer (and therefore a loaded font).
    pub fn has_text_fields(&self) -> bool {
        self.text_align.is_some()
            || self.text_align_vertical.is_some()
            || self.font_size.is_some()
            || self.line_height.is_some()
            || self.letter_spacing.is_some()
    }
}

/// Whether a raw cell value opts into the special-value grammar.
pub fn has_sentinel(value: &str) -> bool {
    value.trim_start().starts_with(SENTINEL)
}

/// Split a chained value into property tokens.
///
/// `key:` followed by a separator is merged with the next token so that
/// `font-size: 12` reads the same as `font-size:12`.
pub fn tokenize(value: &str) -> Vec<String> {
    let body = value.trim_start();
    let body = body.strip_prefix(SENTINEL).unwrap_or(body);
    let mut tokens: Vec<String> = Vec::new();
    let mut pending_key: Option<String> = None;
    for raw in body.split(|c: char| c == ',' || c.is_whitespace()) {
        if raw.is_empty() {
            continue;
        }
        if let Some(key) = pending_key.take() {
            tokens.push(format!("{key}{raw}"));
            continue;
        }
        if raw.len() > 1 && raw.ends_with(':') && raw.matches(':').count() == 1 {
            pending_key = Some(raw.to_string());
        } else {
            tokens.push(raw.to_string());
        }
    }
    if let Some(key) = pending_key {
        tokens.push(key);
    }
    tokens
}

type Recognizer = fn(&str, &mut SpecialValue) -> bool;

/// Token recognizers in priority order.
const RECOGNIZERS: &[Recognizer] = &[
    visibility,
    hex_color,
    opacity,
    dimension,
    position,
    rotation,
    text_property,
];

pub fn parse_chained(value: &str) -> SpecialValue {
    let mut out = SpecialValue::default();
    for token in tokenize(value) {
        for recognize in RECOGNIZERS {
            if recognize(&token, &mut out) {
                break;
            }
        }
    }
    out
}

const NUMBER: &str = r"[-+]?(?:\d+(?:\.\d*)?|\.\d+)";

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("special value regex must compile")
}

static HEX_RE: Lazy<Regex> = Lazy::new(|| compile(r"^#([0-9a-fA-F]+)$"));
static OPACITY_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^({NUMBER})%$")));
static DIMENSION_RE: Lazy<Regex> =
    Lazy::new(|| compile(r"^(?i)(\d+(?:\.\d*)?|\.\d+)(s|w|h)$"));
static POSITION_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^(?i)({NUMBER})(xx|yy|x|y)$")));
static ROTATION_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^({NUMBER})(?:º|°|deg)$")));
static PROPERTY_RE: Lazy<Regex> = Lazy::new(|| compile(r"^([A-Za-z-]+):(.+)$"));
static PIXELS_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^(?i)({NUMBER})(?:px)?$")));
static PERCENT_RE: Lazy<Regex> = Lazy::new(|| compile(&format!(r"^({NUMBER})%$")));

fn number(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn visibility(token: &str, out: &mut SpecialValue) -> bool {
    let visible = match token.to_ascii_lowercase().as_str() {
        "show" | "visible" => true,
        "hide" | "hidden" => false,
        _ => return false,
    };
    out.visible = Some(visible);
    true
}

/// Expand 1, 2, 3 or 6 hex digits into a full color.
///
/// One digit is a gray level repeated six times (`#F` is white), two digits
/// repeat three times (`#AB` is `#ABABAB`), three digits double each digit.
pub fn parse_hex_color(digits: &str) -> Option<Rgb> {
    let full: String = match digits.len() {
        1 => digits.repeat(6),
        2 => digits.repeat(3),
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        6 => digits.to_string(),
        _ => return None,
    };
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(full.get(range)?, 16).ok();
    Some(Rgb::from_rgb8(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn hex_color(token: &str, out: &mut SpecialValue) -> bool {
    let Some(caps) = HEX_RE.captures(token) else {
        return false;
    };
    match parse_hex_color(&caps[1]) {
        Some(color) => {
            out.color = Some(color);
            true
        }
        None => false,
    }
}

fn opacity(token: &str, out: &mut SpecialValue) -> bool {
    let Some(value) = OPACITY_RE.captures(token).and_then(|c| number(&c[1])) else {
        return false;
    };
    out.opacity = Some((value / 100.0).clamp(0.0, 1.0));
    true
}

fn dimension(token: &str, out: &mut SpecialValue) -> bool {
    let Some(caps) = DIMENSION_RE.captures(token) else {
        return false;
    };
    let Some(value) = number(&caps[1]) else {
        return false;
    };
    let kind = match caps[2].to_ascii_lowercase().as_str() {
        "s" => DimensionKind::Size,
        "w" => DimensionKind::Width,
        _ => DimensionKind::Height,
    };
    out.dimension = Some(Dimension { kind, value });
    true
}

fn position(token: &str, out: &mut SpecialValue) -> bool {
    let Some(caps) = POSITION_RE.captures(token) else {
        return false;
    };
    let Some(value) = number(&caps[1]) else {
        return false;
    };
    let (mode, axis) = match caps[2].to_ascii_lowercase().as_str() {
        "xx" => (PositionMode::Absolute, Axis::X),
        "yy" => (PositionMode::Absolute, Axis::Y),
        "x" => (PositionMode::Relative, Axis::X),
        _ => (PositionMode::Relative, Axis::Y),
    };
    out.position = Some(Position { mode, axis, value });
    true
}

fn rotation(token: &str, out: &mut SpecialValue) -> bool {
    let Some(value) = ROTATION_RE.captures(token).and_then(|c| number(&c[1])) else {
        return false;
    };
    out.rotation = Some(value);
    true
}

fn pixels_or_percent(text: &str) -> Option<(f64, bool)> {
    if let Some(caps) = PERCENT_RE.captures(text) {
        return number(&caps[1]).map(|n| (n, true));
    }
    PIXELS_RE
        .captures(text)
        .and_then(|caps| number(&caps[1]))
        .map(|n| (n, false))
}

fn text_property(token: &str, out: &mut SpecialValue) -> bool {
    let Some(caps) = PROPERTY_RE.captures(token) else {
        return false;
    };
    let key = caps[1].to_ascii_lowercase();
    let value = caps[2].trim().to_ascii_lowercase();
    match key.as_str() {
        "text-align" => {
            let align = match value.as_str() {
                "left" => HorizontalAlign::Left,
                "center" => HorizontalAlign::Center,
                "right" => HorizontalAlign::Right,
                "justified" | "justify" => HorizontalAlign::Justified,
                _ => return false,
            };
            out.text_align = Some(align);
        }
        "text-align-vertical" => {
            let align = match value.as_str() {
                "top" => VerticalAlign::Top,
                "center" => VerticalAlign::Center,
                "bottom" => VerticalAlign::Bottom,
                _ => return false,
            };
            out.text_align_vertical = Some(align);
        }
        "font-size" => match pixels_or_percent(&value) {
            Some((size, false)) if size > 0.0 => out.font_size = Some(size),
            _ => return false,
        },
        "line-height" => {
            let height = if value == "auto" {
                LineHeight::Auto
            } else {
                match pixels_or_percent(&value) {
                    Some((n, true)) => LineHeight::Percent(n),
                    Some((n, false)) => LineHeight::Pixels(n),
                    None => return false,
                }
            };
            out.line_height = Some(height);
        }
        "letter-spacing" => {
            let spacing = match pixels_or_percent(&value) {
                Some((n, true)) => LetterSpacing::Percent(n),
                Some((n, false)) => LetterSpacing::Pixels(n),
                None => return false,
            };
            out.letter_spacing = Some(spacing);
        }
        _ => return false,
    }
    true
}
