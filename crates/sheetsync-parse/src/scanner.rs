//! Escape-aware character stream shared by the name grammar.
//!
//! A backslash makes the following character literal. Literal characters
//! never act as markers (`#`, `//`, `.`, `@`, `+`, `-`) and are copied into
//! label and worksheet text without the backslash. A trailing lone backslash
//! is kept as a literal backslash.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Sym {
    pub ch: char,
    pub escaped: bool,
}

impl Sym {
    #[inline]
    pub fn is(&self, marker: char) -> bool {
        !self.escaped && self.ch == marker
    }

    /// Characters allowed inside label and worksheet text.
    #[inline]
    pub fn is_text(&self) -> bool {
        self.escaped || self.ch.is_alphanumeric() || matches!(self.ch, ' ' | '_' | '-')
    }

    #[inline]
    pub fn is_space(&self) -> bool {
        !self.escaped && self.ch.is_whitespace()
    }
}

pub(crate) fn scan(source: &str) -> Vec<Sym> {
    let mut out = Vec::with_capacity(source.len());
    let mut chars = source.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some(next) => out.push(Sym {
                    ch: next,
                    escaped: true,
                }),
                None => out.push(Sym { ch, escaped: true }),
            }
        } else {
            out.push(Sym { ch, escaped: false });
        }
    }
    out
}

/// Collect text characters starting at `start`, stopping at the first symbol
/// outside the text class. Returns the trimmed text and the stop position.
pub(crate) fn take_text(syms: &[Sym], start: usize) -> (String, usize) {
    let mut end = start;
    while end < syms.len() && syms[end].is_text() {
        end += 1;
    }
    let text: String = syms[start..end].iter().map(|s| s.ch).collect();
    (text.trim().to_string(), end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_mark_literal_chars() {
        let syms = scan(r"a\#b\\");
        assert_eq!(syms.len(), 4);
        assert!(!syms[1].is('#'));
        assert_eq!(syms[1].ch, '#');
        assert!(syms[3].escaped);
        assert_eq!(syms[3].ch, '\\');
    }

    #[test]
    fn trailing_backslash_is_literal() {
        let syms = scan("x\\");
        assert_eq!(
            syms[1],
            Sym {
                ch: '\\',
                escaped: true
            }
        );
    }

    #[test]
    fn text_stops_at_markers() {
        let syms = scan("First name.3");
        let (text, end) = take_text(&syms, 0);
        assert_eq!(text, "First name");
        assert_eq!(syms[end].ch, '.');
    }
}
