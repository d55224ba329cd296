//! Turning a [`SpecialValue`] into host mutations.

use rustc_hash::FxHashSet;
use sheetsync_parse::{DimensionKind, SpecialValue};

use crate::error::{FontError, SyncError};
use crate::host::{FontId, FontLoader, Mutation, NodeMutator, TextProperty};

/// Fonts requested during one run.
#[derive(Debug, Default)]
pub struct FontCache {
    loaded: FxHashSet<FontId>,
    failed: FxHashSet<FontId>,
}

/// Result of asking the cache for a font.
#[derive(Debug, Clone, PartialEq)]
pub enum FontStatus {
    Ready,
    /// Loading failed. `error` is only set the first time a font fails, so the
    /// caller warns once per font.
    Unavailable { error: Option<FontError> },
}

impl FontCache {
    pub fn ensure(&mut self, loader: &mut dyn FontLoader, font: &FontId) -> FontStatus {
        if self.loaded.contains(font) {
            return FontStatus::Ready;
        }
        if self.failed.contains(font) {
            return FontStatus::Unavailable { error: None };
        }
        match loader.load(font) {
            Ok(()) => {
                tracing::debug!(%font, "font loaded");
                self.loaded.insert(font.clone());
                FontStatus::Ready
            }
            Err(err) => {
                tracing::warn!(%font, error = %err, "font unavailable");
                self.failed.insert(font.clone());
                FontStatus::Unavailable { error: Some(err) }
            }
        }
    }

    pub fn is_loaded(&self, font: &FontId) -> bool {
        self.loaded.contains(font)
    }
}

/// What applying a special value did to one layer.
#[derive(Debug, Default)]
pub struct Applied {
    pub mutations: usize,
    pub errors: Vec<SyncError>,
    pub warnings: Vec<String>,
}

impl Applied {
    pub fn changed(&self) -> bool {
        self.mutations > 0
    }
}

/// Layout and paint mutations for `value`, in application order.
pub fn layout_mutations<Id>(value: &SpecialValue) -> Vec<Mutation<Id>> {
    let mut out = Vec::new();
    if let Some(visible) = value.visible {
        out.push(Mutation::SetVisible(visible));
    }
    if let Some(color) = value.color {
        out.push(Mutation::SetFill(color));
    }
    if let Some(opacity) = value.opacity {
        out.push(Mutation::SetOpacity(opacity));
    }
    if let Some(dimension) = value.dimension {
        let (width, height) = match dimension.kind {
            DimensionKind::Size => (Some(dimension.value), Some(dimension.value)),
            DimensionKind::Width => (Some(dimension.value), None),
            DimensionKind::Height => (None, Some(dimension.value)),
        };
        out.push(Mutation::Resize { width, height });
    }
    if let Some(position) = value.position {
        out.push(Mutation::Reposition {
            mode: position.mode,
            axis: position.axis,
            value: position.value,
        });
    }
    if let Some(rotation) = value.rotation {
        out.push(Mutation::Rotate(rotation));
    }
    out
}

/// Text formatting changes for `value`, in application order.
pub fn text_properties(value: &SpecialValue) -> Vec<TextProperty> {
    let mut out = Vec::new();
    if let Some(align) = value.text_align {
        out.push(TextProperty::Align(align));
    }
    if let Some(align) = value.text_align_vertical {
        out.push(TextProperty::VerticalAlign(align));
    }
    if let Some(size) = value.font_size {
        out.push(TextProperty::FontSize(size));
    }
    if let Some(height) = value.line_height {
        out.push(TextProperty::LineHeight(height));
    }
    if let Some(spacing) = value.letter_spacing {
        out.push(TextProperty::LetterSpacing(spacing));
    }
    out
}

/// Apply every populated field of `value` to `node`.
///
/// A rejected mutation is recorded and the remaining fields are still
/// applied. Text fields are skipped on non-text layers; on text layers the
/// layer's font is requested once before the first of them.
pub fn apply_chained<D>(
    doc: &mut D,
    node: D::NodeId,
    value: &SpecialValue,
    fonts: &mut FontCache,
    loader: &mut dyn FontLoader,
) -> Applied
where
    D: NodeMutator + ?Sized,
{
    let mut applied = Applied::default();
    for mutation in layout_mutations(value) {
        record(&mut applied, doc.apply(node, mutation));
    }

    let properties = text_properties(value);
    if properties.is_empty() {
        return applied;
    }
    if !doc.kind(node).is_text() {
        tracing::debug!(?node, "skipping text fields on non-text layer");
        return applied;
    }
    // A missing font is a warning; the host decides whether the edit sticks.
    if let Some(font) = doc.font(node) {
        if let FontStatus::Unavailable { error: Some(err) } = fonts.ensure(loader, &font) {
            applied.warnings.push(err.to_string());
        }
    }
    for property in properties {
        record(&mut applied, doc.apply(node, Mutation::SetTextProperty(property)));
    }
    applied
}

fn record(applied: &mut Applied, outcome: Result<(), crate::error::MutationError>) {
    match outcome {
        Ok(()) => applied.mutations += 1,
        Err(err) => applied.errors.push(err.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsync_common::Rgb;
    use sheetsync_parse::{Axis, HorizontalAlign, LineHeight, PositionMode, parse_chained};

    #[test]
    fn layout_order_is_fixed() {
        let value = parse_chained("/20º 10xx #fff 50% hide 120w");
        let mutations: Vec<Mutation<u32>> = layout_mutations(&value);
        assert_eq!(
            mutations,
            vec![
                Mutation::SetVisible(false),
                Mutation::SetFill(Rgb::WHITE),
                Mutation::SetOpacity(0.5),
                Mutation::Resize {
                    width: Some(120.0),
                    height: None
                },
                Mutation::Reposition {
                    mode: PositionMode::Absolute,
                    axis: Axis::X,
                    value: 10.0
                },
                Mutation::Rotate(20.0),
            ]
        );
    }

    #[test]
    fn size_sets_both_sides() {
        let value = parse_chained("/64s");
        let mutations: Vec<Mutation<u32>> = layout_mutations(&value);
        assert_eq!(
            mutations,
            vec![Mutation::Resize {
                width: Some(64.0),
                height: Some(64.0)
            }]
        );
    }

    #[test]
    fn text_fields_are_separate() {
        let value = parse_chained("/line-height:auto text-align:right #000");
        assert_eq!(
            text_properties(&value),
            vec![
                TextProperty::Align(HorizontalAlign::Right),
                TextProperty::LineHeight(LineHeight::Auto),
            ]
        );
        assert_eq!(layout_mutations::<u32>(&value).len(), 1);
    }

    struct CountingLoader {
        calls: usize,
        fail: bool,
    }

    impl FontLoader for CountingLoader {
        fn load(&mut self, font: &FontId) -> Result<(), FontError> {
            self.calls += 1;
            if self.fail {
                Err(FontError {
                    font: font.clone(),
                    reason: "missing".into(),
                })
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn font_cache_loads_once() {
        let mut cache = FontCache::default();
        let mut loader = CountingLoader { calls: 0, fail: false };
        let font = FontId::new("Inter", "Regular");
        assert_eq!(cache.ensure(&mut loader, &font), FontStatus::Ready);
        assert_eq!(cache.ensure(&mut loader, &font), FontStatus::Ready);
        assert_eq!(loader.calls, 1);
        assert!(cache.is_loaded(&font));
    }

    #[test]
    fn font_failure_reports_once() {
        let mut cache = FontCache::default();
        let mut loader = CountingLoader { calls: 0, fail: true };
        let font = FontId::new("Missing", "Bold");
        assert!(matches!(
            cache.ensure(&mut loader, &font),
            FontStatus::Unavailable { error: Some(_) }
        ));
        assert_eq!(
            cache.ensure(&mut loader, &font),
            FontStatus::Unavailable { error: None }
        );
        assert_eq!(loader.calls, 1);
    }
}
