//! Grammars for sheetsync layer names and cell values.
//!
//! - [`binding`] decodes a layer name such as `Card // Team #Name.2` into a
//!   [`Binding`] (labels, worksheet, index specifier, flags).
//! - [`chained`] decodes a special value such as `/#F00 50% 20º` into a sparse
//!   [`SpecialValue`] of property changes.
//!
//! Both parsers are total: malformed input never errors, it simply yields
//! fewer populated fields.

pub mod binding;
pub mod chained;
mod scanner;

pub use binding::{Binding, IndexSpecifier};
pub use chained::{
    Axis, Dimension, DimensionKind, HorizontalAlign, LetterSpacing, LineHeight, Position,
    PositionMode, SpecialValue, VerticalAlign, has_sentinel, parse_chained, parse_hex_color,
};

/// Parse a layer name into a [`Binding`].
pub fn parse(name: &str) -> Binding {
    Binding::parse(name)
}
