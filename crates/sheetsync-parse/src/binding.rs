//! Binding grammar for layer names.
//!
//! A layer name carries its data binding inline:
//!
//! ```text
//! +@Card // Sheet2 #Name #Colour.3
//! │└ repeat marker    │      └ index suffix (`.3`, `.n`, `.i`, `.x`, `.r`)
//! └ force include     └ labels, in scan order
//!      worksheet ┘
//! ```
//!
//! A leading `-` marks the layer (and its subtree) as ignored and stops
//! parsing. Backslash escapes make marker characters literal, see
//! [`crate::scanner`].

use std::fmt;
use std::num::IntErrorKind;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::scanner::{Sym, scan, take_text};

/// Row selection policy requested by a binding.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexSpecifier {
    /// Fixed 1-based row.
    Specific(u32),
    Increment,
    IncrementNonBlank,
    Random,
    RandomNonBlank,
}

impl fmt::Display for IndexSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Specific(n) => write!(f, ".{n}"),
            Self::Increment => f.write_str(".n"),
            Self::IncrementNonBlank => f.write_str(".i"),
            Self::Random => f.write_str(".x"),
            Self::RandomNonBlank => f.write_str(".r"),
        }
    }
}

/// Decoded instruction carried by one layer name.
///
/// Bindings are immutable once parsed. Inherited fields are filled in on a
/// copy via [`Binding::inherit`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Binding {
    has_binding: bool,
    labels: Vec<String>,
    worksheet: Option<String>,
    index: Option<IndexSpecifier>,
    is_ignored: bool,
    force_include: bool,
    repeat: bool,
}

impl Binding {
    /// Parse a layer name. Never fails: text without markers yields a binding
    /// with `has_binding() == false`.
    pub fn parse(name: &str) -> Self {
        parse_name(name)
    }

    /// Whether the name carries any binding marker (label, worksheet, index or
    /// repeat marker).
    pub fn has_binding(&self) -> bool {
        self.has_binding
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// The label whose value drives the layer's main mutation.
    pub fn primary_label(&self) -> Option<&str> {
        self.labels.first().map(String::as_str)
    }

    pub fn has_labels(&self) -> bool {
        !self.labels.is_empty()
    }

    pub fn worksheet(&self) -> Option<&str> {
        self.worksheet.as_deref()
    }

    pub fn index(&self) -> Option<IndexSpecifier> {
        self.index
    }

    pub fn is_ignored(&self) -> bool {
        self.is_ignored
    }

    pub fn force_include(&self) -> bool {
        self.force_include
    }

    /// Whether the layer is a repeat container (`@` marker).
    pub fn is_repeat(&self) -> bool {
        self.repeat
    }

    /// Copy of this binding with unset worksheet/index filled from the given
    /// values. Fields already present are never replaced.
    pub fn inherit(&self, worksheet: Option<&str>, index: Option<IndexSpecifier>) -> Self {
        let mut resolved = self.clone();
        if resolved.worksheet.is_none() {
            resolved.worksheet = worksheet.map(str::to_string);
        }
        if resolved.index.is_none() {
            resolved.index = index;
        }
        resolved.has_binding = resolved.compute_has_binding();
        resolved
    }

    fn compute_has_binding(&self) -> bool {
        !self.labels.is_empty() || self.worksheet.is_some() || self.index.is_some() || self.repeat
    }
}

type SuffixRecognizer = fn(&[Sym]) -> Option<IndexSpecifier>;

/// Index suffix recognizers in priority order. The first match wins.
const INDEX_SUFFIXES: &[SuffixRecognizer] = &[
    specific_suffix,
    increment_suffix,
    increment_non_blank_suffix,
    random_suffix,
    random_non_blank_suffix,
];

fn specific_suffix(syms: &[Sym]) -> Option<IndexSpecifier> {
    let digits = syms
        .iter()
        .rev()
        .take_while(|s| !s.escaped && s.ch.is_ascii_digit())
        .count();
    if digits == 0 || digits == syms.len() {
        return None;
    }
    let dot = syms.len() - digits - 1;
    if !syms[dot].is('.') {
        return None;
    }
    let text: String = syms[dot + 1..].iter().map(|s| s.ch).collect();
    // Rows past `u32::MAX` clamp to the last row anyway.
    let n = match text.parse::<u32>() {
        Ok(n) => n,
        Err(err) if *err.kind() == IntErrorKind::PosOverflow => u32::MAX,
        Err(_) => return None,
    };
    (n >= 1).then_some(IndexSpecifier::Specific(n))
}

fn letter_suffix(syms: &[Sym], letter: char, spec: IndexSpecifier) -> Option<IndexSpecifier> {
    let [.., dot, last] = syms else {
        return None;
    };
    (dot.is('.') && !last.escaped && last.ch.eq_ignore_ascii_case(&letter)).then_some(spec)
}

fn increment_suffix(syms: &[Sym]) -> Option<IndexSpecifier> {
    letter_suffix(syms, 'n', IndexSpecifier::Increment)
}

fn increment_non_blank_suffix(syms: &[Sym]) -> Option<IndexSpecifier> {
    letter_suffix(syms, 'i', IndexSpecifier::IncrementNonBlank)
}

fn random_suffix(syms: &[Sym]) -> Option<IndexSpecifier> {
    letter_suffix(syms, 'x', IndexSpecifier::Random)
}

fn random_non_blank_suffix(syms: &[Sym]) -> Option<IndexSpecifier> {
    letter_suffix(syms, 'r', IndexSpecifier::RandomNonBlank)
}

fn scan_labels(syms: &[Sym]) -> Vec<String> {
    let mut labels = Vec::new();
    let mut pos = 0;
    while pos < syms.len() {
        if syms[pos].is('#') {
            let (label, end) = take_text(syms, pos + 1);
            if !label.is_empty() {
                labels.push(label);
            }
            pos = end;
        } else {
            pos += 1;
        }
    }
    labels
}

fn scan_worksheet(syms: &[Sym]) -> Option<String> {
    let start = syms.windows(2).position(|w| w[0].is('/') && w[1].is('/'))?;
    let (sheet, _) = take_text(syms, start + 2);
    (!sheet.is_empty()).then_some(sheet)
}

fn parse_name(name: &str) -> Binding {
    let mut binding = Binding::default();
    let mut syms = scan(name.trim_start());

    if syms.first().is_some_and(|s| s.is('-')) {
        binding.is_ignored = true;
        return binding;
    }
    if syms.first().is_some_and(|s| s.is('+')) {
        binding.force_include = true;
        syms.remove(0);
    }
    if let Some(pos) = syms.iter().position(|s| !s.is_space()) {
        if syms[pos].is('@') {
            binding.repeat = true;
            syms.drain(..=pos);
        }
    }

    let trailing = syms.iter().rev().take_while(|s| s.is_space()).count();
    let body = &syms[..syms.len() - trailing];

    binding.labels = scan_labels(body);
    binding.worksheet = scan_worksheet(body);
    binding.index = INDEX_SUFFIXES.iter().find_map(|recognize| recognize(body));
    binding.has_binding = binding.compute_has_binding();
    binding
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names_have_no_binding() {
        for name in ["Rectangle 12", "", "   ", "Frame / child", "v1.2 notes"] {
            let b = Binding::parse(name);
            assert!(!b.has_binding(), "{name:?} should not bind");
            assert!(!b.is_ignored());
        }
    }

    #[test]
    fn ignore_prefix_stops_parsing() {
        let b = Binding::parse("-#Name // Sheet.3");
        assert!(b.is_ignored());
        assert!(!b.has_binding());
        assert!(b.labels().is_empty());
        assert_eq!(b.worksheet(), None);
    }

    #[test]
    fn force_prefix_is_stripped() {
        let b = Binding::parse("+#Name");
        assert!(b.force_include());
        assert_eq!(b.labels(), ["Name"]);
    }

    #[test]
    fn duplicate_labels_are_kept() {
        let b = Binding::parse("#Name #Name");
        assert_eq!(b.labels(), ["Name", "Name"]);
    }

    #[test]
    fn index_suffix_variants() {
        let cases = [
            ("#A.n", IndexSpecifier::Increment),
            ("#A.N", IndexSpecifier::Increment),
            ("#A.i", IndexSpecifier::IncrementNonBlank),
            ("#A.X", IndexSpecifier::Random),
            ("#A.r", IndexSpecifier::RandomNonBlank),
            ("#A.12", IndexSpecifier::Specific(12)),
            ("#A.7  ", IndexSpecifier::Specific(7)),
        ];
        for (name, expected) in cases {
            assert_eq!(Binding::parse(name).index(), Some(expected), "{name}");
        }
    }

    #[test]
    fn oversized_specific_index_saturates() {
        assert_eq!(
            Binding::parse("#Name.99999999999").index(),
            Some(IndexSpecifier::Specific(u32::MAX))
        );
        assert_eq!(Binding::parse("#Name.00000000000").index(), None);
    }

    #[test]
    fn index_suffix_displays_as_written() {
        for suffix in [".7", ".n", ".i", ".x", ".r"] {
            let spec = Binding::parse(&format!("#A{suffix}")).index().unwrap();
            assert_eq!(spec.to_string(), suffix);
        }
    }

    #[test]
    fn index_must_be_trailing_and_positive() {
        assert_eq!(Binding::parse("#A.n extra").index(), None);
        assert_eq!(Binding::parse("#A.0").index(), None);
        assert_eq!(Binding::parse("#A.q").index(), None);
    }

    #[test]
    fn index_only_container_has_binding() {
        let b = Binding::parse("Cards.x");
        assert!(b.has_binding());
        assert!(!b.has_labels());
        assert_eq!(b.index(), Some(IndexSpecifier::Random));
    }

    #[test]
    fn worksheet_first_occurrence_only() {
        let b = Binding::parse("Group // Team // Other");
        assert_eq!(b.worksheet(), Some("Team"));
    }

    #[test]
    fn repeat_marker() {
        let b = Binding::parse("+ @Cards // People");
        assert!(b.force_include());
        assert!(b.is_repeat());
        assert!(b.has_binding());
        assert_eq!(b.worksheet(), Some("People"));
        assert!(!Binding::parse("Cards @ home").is_repeat());
    }

    #[test]
    fn escaped_markers_stay_in_label() {
        let b = Binding::parse(r"#Price\.USD");
        assert_eq!(b.labels(), ["Price.USD"]);
        assert_eq!(b.index(), None);

        let b = Binding::parse(r"#A\/B\#C");
        assert_eq!(b.labels(), ["A/B#C"]);

        let b = Binding::parse(r"\-#Kept");
        assert!(!b.is_ignored());
        assert_eq!(b.labels(), ["Kept"]);

        let b = Binding::parse(r"#Version\.2");
        assert_eq!(b.labels(), ["Version.2"]);
        assert_eq!(b.index(), None);
    }

    #[test]
    fn inherit_fills_only_gaps() {
        let b = Binding::parse("#Name.2");
        let r = b.inherit(Some("Sheet"), Some(IndexSpecifier::Random));
        assert_eq!(r.worksheet(), Some("Sheet"));
        assert_eq!(r.index(), Some(IndexSpecifier::Specific(2)));
        assert_eq!(b.worksheet(), None);
    }
}
