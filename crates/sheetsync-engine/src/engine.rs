//! The sync run: acquire, index, expand, collect, bind, report.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rustc_hash::FxHashMap;
use sheetsync_common::{Table, Worksheet, is_blank};
use sheetsync_parse::{Binding, IndexSpecifier, SpecialValue};

use crate::apply::{FontCache, FontStatus, apply_chained};
use crate::dispatch::{ValueClass, classify};
use crate::error::{MutationError, SetupError, SyncError};
use crate::host::{
    FontLoader, ImageFetcher, Mutation, NoImages, NodeKind, NodeMutator, PreloadedFonts,
    ProgressSink, SceneTree, Scope, SilentProgress, TableSource,
};
use crate::inherit::resolve;
use crate::matcher::LabelIndex;
use crate::options::SyncOptions;
use crate::repeat::{expand, first_bound_descendant};
use crate::report::SyncResult;
use crate::tracker::IndexTracker;

/// Drives sync runs against one document.
///
/// ```ignore
/// let mut engine = SyncEngine::new(&mut document)
///     .with_options(SyncOptions::deterministic(7))
///     .with_font_loader(fonts);
/// let result = engine.run(&mut table, &Scope::Document);
/// ```
pub struct SyncEngine<'a, D: NodeMutator> {
    doc: &'a mut D,
    fonts: Box<dyn FontLoader + 'a>,
    images: Box<dyn ImageFetcher + 'a>,
    progress: Box<dyn ProgressSink + 'a>,
    cancel: Option<Arc<AtomicBool>>,
    options: SyncOptions,
}

impl<'a, D: NodeMutator> SyncEngine<'a, D> {
    pub fn new(doc: &'a mut D) -> Self {
        Self {
            doc,
            fonts: Box::new(PreloadedFonts),
            images: Box::new(NoImages),
            progress: Box::new(SilentProgress),
            cancel: None,
            options: SyncOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SyncOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_font_loader(mut self, loader: impl FontLoader + 'a) -> Self {
        self.fonts = Box::new(loader);
        self
    }

    pub fn with_image_fetcher(mut self, fetcher: impl ImageFetcher + 'a) -> Self {
        self.images = Box::new(fetcher);
        self
    }

    pub fn with_progress(mut self, sink: impl ProgressSink + 'a) -> Self {
        self.progress = Box::new(sink);
        self
    }

    /// Stop the run at the next layer boundary once `flag` is set.
    pub fn with_cancellation(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Sync `scope` against the table supplied by `source`.
    ///
    /// Setup failures return a failed result with a single error and leave
    /// the document untouched. Errors on individual layers are recorded and
    /// the run carries on.
    pub fn run(&mut self, source: &mut dyn TableSource, scope: &Scope<D::NodeId>) -> SyncResult {
        self.progress.report("Loading data", 0);
        let table = match acquire(source) {
            Ok(table) => table,
            Err(err) => {
                tracing::error!(error = %err, "sync setup failed");
                return SyncResult::failed(err.to_string());
            }
        };

        self.progress.report("Indexing labels", 10);
        let mut run = Run::new(&table, &*self.doc, self.options.resolved_seed());
        tracing::info!(
            worksheets = table.worksheets.len(),
            components = run.component_ids.len(),
            "indexes built"
        );

        self.progress.report("Expanding repeats", 20);
        let roots = self.doc.roots(scope);
        if self.expand_repeats(&mut run, &roots).is_err() {
            return run.cancel();
        }

        self.progress.report("Collecting layers", 30);
        let layers = self.collect(&mut run, &roots);
        tracing::info!(layers = layers.len(), "binding layers");

        let total = layers.len().max(1);
        let batch = self.options.batch_size.max(1);
        for (done, &node) in layers.iter().enumerate() {
            if self.is_cancelled() {
                return run.cancel();
            }
            if done > 0 && done % batch == 0 {
                let percent = 30 + (done * 65 / total) as u8;
                self.progress
                    .report(&format!("Synced {done} of {} layers", layers.len()), percent);
            }
            self.bind(&mut run, node);
        }

        self.progress.report("Done", 100);
        run.result.success = true;
        tracing::info!(
            processed = run.result.layers_processed,
            updated = run.result.layers_updated,
            errors = run.result.errors.len(),
            warnings = run.result.warnings.len(),
            "sync finished"
        );
        run.result
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Expand repeat containers in traversal order. Children are read after
    /// their parent has been expanded, so copies of nested containers are
    /// expanded too.
    fn expand_repeats(
        &mut self,
        run: &mut Run<'_, D::NodeId>,
        roots: &[D::NodeId],
    ) -> Result<(), Cancelled> {
        let mut stack: Vec<Visit<D::NodeId>> = roots
            .iter()
            .rev()
            .filter_map(|&root| run.root_visit(&*self.doc, root, self.options.max_depth))
            .collect();
        while let Some(visit) = stack.pop() {
            let Some(admitted) = run.admit(&*self.doc, visit, &self.options) else {
                continue;
            };
            if admitted.eligible && admitted.binding.is_repeat() {
                if self.is_cancelled() {
                    return Err(Cancelled);
                }
                self.expand_container(run, visit.node);
            }
            let children = admitted.descend(&*self.doc, visit, self.options.max_depth);
            stack.extend(children.into_iter().rev());
        }
        Ok(())
    }

    fn expand_container(&mut self, run: &mut Run<'_, D::NodeId>, container: D::NodeId) {
        let layer = layer_identity(&*self.doc, container);
        let max_depth = self.options.max_depth;

        let source = first_bound_descendant(&*self.doc, container, |name| run.parse(name));
        let Some(source) = source else {
            tracing::debug!(%layer, "repeat container has no bound descendant");
            return;
        };
        let Some(binding) = resolve(&*self.doc, source, |name| run.parse(name), max_depth) else {
            return;
        };
        let Some(label) = binding.primary_label() else {
            return;
        };
        let target = match run
            .worksheet(binding.worksheet())
            .and_then(|sheet| run.match_label(sheet, label).map(|matched| (sheet, matched)))
        {
            Some((sheet, matched)) => sheet.filled_row_count(matched),
            None => {
                run.result.warn(format!("{layer}: no data for repeat label `{label}`"));
                return;
            }
        };

        match expand(&mut *self.doc, container, target) {
            Ok(expansion) => {
                tracing::debug!(
                    %layer,
                    target,
                    added = expansion.added,
                    removed = expansion.removed,
                    "repeat expanded"
                );
            }
            Err(err) if err.is_skip() => run.result.warn(format!("{layer}: {err}")),
            Err(err) => run.result.error(layer, SyncError::from(err).to_string()),
        }
    }

    /// Layers that carry a label and take part in binding, in traversal order.
    fn collect(&self, run: &mut Run<'_, D::NodeId>, roots: &[D::NodeId]) -> Vec<D::NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<Visit<D::NodeId>> = roots
            .iter()
            .rev()
            .filter_map(|&root| run.root_visit(&*self.doc, root, self.options.max_depth))
            .collect();
        while let Some(visit) = stack.pop() {
            let Some(admitted) = run.admit(&*self.doc, visit, &self.options) else {
                continue;
            };
            if admitted.eligible && admitted.binding.has_labels() {
                out.push(visit.node);
            }
            let children = admitted.descend(&*self.doc, visit, self.options.max_depth);
            stack.extend(children.into_iter().rev());
        }
        out
    }

    fn bind(&mut self, run: &mut Run<'_, D::NodeId>, node: D::NodeId) {
        run.result.layers_processed += 1;
        let layer = layer_identity(&*self.doc, node);
        let mut errors = Vec::new();
        let updated = match self.bind_layer(run, node, &mut errors) {
            Ok(updated) => updated,
            Err(err) => {
                errors.push(err);
                false
            }
        };
        if updated {
            run.result.layers_updated += 1;
        }
        for err in errors {
            tracing::debug!(%layer, error = %err, "layer failed");
            run.result.error(layer.clone(), err.to_string());
        }
    }

    /// Bind one layer. Fatal problems for the layer come back as `Err`;
    /// problems with individual mutations are pushed onto `errors`.
    fn bind_layer(
        &mut self,
        run: &mut Run<'_, D::NodeId>,
        node: D::NodeId,
        errors: &mut Vec<SyncError>,
    ) -> Result<bool, SyncError> {
        let binding = resolve(&*self.doc, node, |name| run.parse(name), self.options.max_depth)
            .ok_or(SyncError::Mutation(MutationError::NodeNotFound))?;
        let table = run.table;
        let requested_sheet = binding
            .worksheet()
            .unwrap_or(table.active_worksheet.as_str());
        let sheet = run
            .worksheet(binding.worksheet())
            .ok_or_else(|| SyncError::MissingWorksheet(requested_sheet.to_string()))?;
        let spec = binding.index().unwrap_or(IndexSpecifier::Increment);
        tracing::trace!(?node, sheet = sheet.name(), index = %spec, "binding layer");

        let mut labels = binding.labels().iter();
        let Some(primary) = labels.next() else {
            return Ok(false);
        };
        let mut updated = false;
        if let Some(value) = run.next_value(sheet, primary, spec)? {
            updated |= self.apply_value(run, node, value, errors)?;
        }

        for extra in labels {
            match run.next_value(sheet, extra, spec) {
                Ok(Some(value)) if !is_blank(value) => {
                    let special = SpecialValue::parse(value);
                    updated |= self.apply_special(run, node, &special, errors);
                }
                Ok(_) => {}
                Err(err) => errors.push(err),
            }
        }
        Ok(updated)
    }

    fn apply_value(
        &mut self,
        run: &mut Run<'_, D::NodeId>,
        node: D::NodeId,
        value: &str,
        errors: &mut Vec<SyncError>,
    ) -> Result<bool, SyncError> {
        let kind = self.doc.kind(node);
        match classify(kind, value) {
            ValueClass::Empty if kind.is_text() => self.set_text(run, node, String::new()),
            ValueClass::Empty => Ok(false),
            ValueClass::Text => self.set_text(run, node, value.to_string()),
            ValueClass::Special => {
                let special = SpecialValue::parse(value);
                Ok(self.apply_special(run, node, &special, errors))
            }
            ValueClass::Component(name) => {
                let component = run
                    .component(name)
                    .ok_or_else(|| SyncError::UnknownComponent(name.to_string()))?;
                self.doc.apply(node, Mutation::SwapComponent(component))?;
                Ok(true)
            }
            ValueClass::Image(url) => {
                let bytes = match run.images.get(url) {
                    Some(bytes) => bytes.clone(),
                    None => {
                        let bytes = self.images.fetch(url)?;
                        run.images.insert(url.to_string(), bytes.clone());
                        bytes
                    }
                };
                self.doc.apply(node, Mutation::SetImageFill(bytes))?;
                Ok(true)
            }
        }
    }

    fn set_text(
        &mut self,
        run: &mut Run<'_, D::NodeId>,
        node: D::NodeId,
        text: String,
    ) -> Result<bool, SyncError> {
        if let Some(font) = self.doc.font(node) {
            let status = run.fonts.ensure(self.fonts.as_mut(), &font);
            if let FontStatus::Unavailable { error: Some(err) } = status {
                run.result.warn(err.to_string());
            }
        }
        self.doc.apply(node, Mutation::SetText(text))?;
        Ok(true)
    }

    fn apply_special(
        &mut self,
        run: &mut Run<'_, D::NodeId>,
        node: D::NodeId,
        value: &SpecialValue,
        errors: &mut Vec<SyncError>,
    ) -> bool {
        let applied = apply_chained(
            &mut *self.doc,
            node,
            value,
            &mut run.fonts,
            self.fonts.as_mut(),
        );
        for warning in applied.warnings.iter() {
            run.result.warn(warning.clone());
        }
        let changed = applied.changed();
        errors.extend(applied.errors);
        changed
    }
}

fn acquire(source: &mut dyn TableSource) -> Result<Table, SetupError> {
    let table = source.acquire()?;
    if table.worksheets.is_empty() {
        return Err(SetupError::EmptyTable);
    }
    if table.active().is_none() {
        return Err(SetupError::UnknownActiveWorksheet(table.active_worksheet.clone()));
    }
    Ok(table)
}

fn layer_identity<T: SceneTree + ?Sized>(doc: &T, node: T::NodeId) -> String {
    format!("{} ({node:?})", doc.name(node).unwrap_or("<removed>"))
}

struct Cancelled;

#[derive(Debug, Clone, Copy)]
struct Visit<Id> {
    node: Id,
    /// Inside a main component definition.
    in_definition: bool,
    /// The node or an ancestor carries `+`.
    forced: bool,
    depth: usize,
}

struct Admitted {
    binding: Binding,
    eligible: bool,
    in_definition: bool,
    forced: bool,
}

impl Admitted {
    fn descend<T: SceneTree + ?Sized>(
        &self,
        doc: &T,
        visit: Visit<T::NodeId>,
        max_depth: usize,
    ) -> Vec<Visit<T::NodeId>> {
        if visit.depth >= max_depth {
            tracing::warn!(node = ?visit.node, max_depth, "traversal depth limit reached");
            return Vec::new();
        }
        doc.children(visit.node)
            .into_iter()
            .map(|node| Visit {
                node,
                in_definition: self.in_definition,
                forced: self.forced,
                depth: visit.depth + 1,
            })
            .collect()
    }
}

/// State owned by one run and dropped with it.
struct Run<'t, Id> {
    table: &'t Table,
    sheet_names: LabelIndex,
    labels: FxHashMap<String, LabelIndex>,
    component_names: LabelIndex,
    component_ids: Vec<Id>,
    exact_components: FxHashMap<String, Id>,
    bindings: FxHashMap<String, Binding>,
    tracker: IndexTracker,
    fonts: FontCache,
    images: FxHashMap<String, Vec<u8>>,
    result: SyncResult,
}

impl<'t, Id: Copy> Run<'t, Id> {
    fn new<T>(table: &'t Table, doc: &T, seed: u64) -> Self
    where
        T: SceneTree<NodeId = Id> + ?Sized,
    {
        let labels = table
            .worksheets
            .iter()
            .map(|sheet| (sheet.name().to_string(), LabelIndex::new(sheet.labels())))
            .collect();
        let components = doc.components();
        let mut exact_components = FxHashMap::default();
        for (id, name) in &components {
            exact_components.entry(name.clone()).or_insert(*id);
        }
        Self {
            table,
            sheet_names: LabelIndex::new(table.worksheet_names()),
            labels,
            component_names: LabelIndex::new(components.iter().map(|(_, name)| name)),
            component_ids: components.iter().map(|(id, _)| *id).collect(),
            exact_components,
            bindings: FxHashMap::default(),
            tracker: IndexTracker::new(seed),
            fonts: FontCache::default(),
            images: FxHashMap::default(),
            result: SyncResult::default(),
        }
    }

    fn parse(&mut self, name: &str) -> Binding {
        if let Some(binding) = self.bindings.get(name) {
            return binding.clone();
        }
        let binding = Binding::parse(name);
        self.bindings.insert(name.to_string(), binding.clone());
        binding
    }

    /// Worksheet by exact name, then by normalized match. `None` selects
    /// the active worksheet.
    fn worksheet(&self, requested: Option<&str>) -> Option<&'t Worksheet> {
        let table = self.table;
        let Some(name) = requested else {
            return table.active();
        };
        table
            .worksheet(name)
            .or_else(|| self.sheet_names.find(name).and_then(|found| table.worksheet(found)))
    }

    fn match_label(&self, sheet: &'t Worksheet, requested: &str) -> Option<&'t str> {
        let position = self.labels.get(sheet.name())?.position(requested)?;
        sheet.labels().get(position).map(String::as_str)
    }

    /// Next value for `label`, or `None` when the tracker has nothing to show.
    fn next_value(
        &mut self,
        sheet: &'t Worksheet,
        label: &str,
        spec: IndexSpecifier,
    ) -> Result<Option<&'t str>, SyncError> {
        let matched = self
            .match_label(sheet, label)
            .ok_or_else(|| SyncError::UnmatchedLabel {
                label: label.to_string(),
                worksheet: sheet.name().to_string(),
            })?;
        let values = sheet.values(matched).unwrap_or_default();
        Ok(self
            .tracker
            .next(matched, sheet.name(), spec, values)
            .and_then(|row| values.get(row))
            .map(String::as_str))
    }

    fn component(&self, name: &str) -> Option<Id> {
        if let Some(&id) = self.exact_components.get(name) {
            return Some(id);
        }
        self.component_names
            .position(name)
            .and_then(|position| self.component_ids.get(position).copied())
    }

    /// Visit for a scope root, inheriting flags from its ancestors up to and
    /// including the enclosing page. `None` when an ancestor is ignored.
    fn root_visit<T>(&mut self, doc: &T, root: Id, max_depth: usize) -> Option<Visit<Id>>
    where
        T: SceneTree<NodeId = Id> + ?Sized,
    {
        let mut visit = Visit {
            node: root,
            in_definition: false,
            forced: false,
            depth: 0,
        };
        let mut current = doc.parent(root);
        let mut steps = 0;
        while let Some(ancestor) = current {
            let kind = doc.kind(ancestor);
            if steps >= max_depth || kind == NodeKind::Document {
                break;
            }
            steps += 1;
            visit.in_definition |= kind.is_component_definition();
            if let Some(name) = doc.name(ancestor) {
                let binding = self.parse(name);
                if binding.is_ignored() {
                    return None;
                }
                visit.forced |= binding.force_include();
            }
            if kind.is_page_like() {
                break;
            }
            current = doc.parent(ancestor);
        }
        Some(visit)
    }

    /// Parse a visited node and decide whether it is bound. `None` skips the
    /// node and its subtree.
    fn admit<T>(&mut self, doc: &T, visit: Visit<Id>, options: &SyncOptions) -> Option<Admitted>
    where
        T: SceneTree<NodeId = Id> + ?Sized,
    {
        let binding = self.parse(doc.name(visit.node)?);
        if binding.is_ignored() {
            return None;
        }
        let in_definition = visit.in_definition || doc.kind(visit.node).is_component_definition();
        let forced = visit.forced || binding.force_include();
        Some(Admitted {
            eligible: !in_definition || forced || options.include_component_definitions,
            binding,
            in_definition,
            forced,
        })
    }

    fn cancel(mut self) -> SyncResult {
        tracing::info!(processed = self.result.layers_processed, "sync cancelled");
        self.result.success = false;
        self.result.cancelled = true;
        self.result
    }
}
