//! Deciding what a cell value means for a given layer.

use sheetsync_common::is_blank;
use sheetsync_parse::has_sentinel;

use crate::host::NodeKind;

/// How a value will be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueClass<'a> {
    /// Blank value: clears text layers, leaves everything else alone.
    Empty,
    /// Chained special value; the sentinel may or may not be present.
    Special,
    Text,
    /// Component name to swap an instance to.
    Component(&'a str),
    /// Image to fetch and use as the layer's fill.
    Image(&'a str),
}

/// Classify `value` for a layer of type `kind`.
///
/// Text and instance layers need the `/` sentinel to read a value as a
/// special value, since plain text and component names are their natural
/// contents. Every other layer reads non-URL values as special values.
pub fn classify(kind: NodeKind, value: &str) -> ValueClass<'_> {
    if is_blank(value) {
        return ValueClass::Empty;
    }
    if has_sentinel(value) {
        return ValueClass::Special;
    }
    let trimmed = value.trim();
    if kind.is_text() {
        ValueClass::Text
    } else if kind.is_instance() {
        ValueClass::Component(trimmed)
    } else if is_image_url(trimmed) {
        ValueClass::Image(trimmed)
    } else {
        ValueClass::Special
    }
}

fn is_image_url(value: &str) -> bool {
    let has_prefix = |prefix: &str| {
        value
            .as_bytes()
            .get(..prefix.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(prefix.as_bytes()))
    };
    (has_prefix("http://") || has_prefix("https://")) && !value.contains(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_layers() {
        assert_eq!(classify(NodeKind::Text, "Hello"), ValueClass::Text);
        assert_eq!(classify(NodeKind::Text, "/#f00"), ValueClass::Special);
        assert_eq!(classify(NodeKind::Text, "   "), ValueClass::Empty);
        assert_eq!(
            classify(NodeKind::Text, "https://example.com/a.png"),
            ValueClass::Text
        );
    }

    #[test]
    fn instance_layers() {
        assert_eq!(
            classify(NodeKind::Instance, " Icon/Star "),
            ValueClass::Component("Icon/Star")
        );
        assert_eq!(classify(NodeKind::Instance, "/hide"), ValueClass::Special);
    }

    #[test]
    fn shapes_read_urls_and_special_values() {
        assert_eq!(
            classify(NodeKind::Shape, "HTTPS://cdn.example.com/x.jpg"),
            ValueClass::Image("HTTPS://cdn.example.com/x.jpg")
        );
        assert_eq!(classify(NodeKind::Frame, "#f00 50%"), ValueClass::Special);
        assert_eq!(classify(NodeKind::Frame, "http://a b"), ValueClass::Special);
    }

    #[test]
    fn non_ascii_hosts_are_still_urls() {
        assert_eq!(
            classify(NodeKind::Shape, "http://ü.example/x.png"),
            ValueClass::Image("http://ü.example/x.png")
        );
        assert_eq!(classify(NodeKind::Shape, "ftp://ü"), ValueClass::Special);
        assert_eq!(classify(NodeKind::Shape, "ü"), ValueClass::Special);
    }
}
