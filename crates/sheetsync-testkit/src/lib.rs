//! Test fixtures for sheetsync: an in-memory layer tree with failure
//! injection, recording collaborators, and table builders.

use rustc_hash::{FxHashMap, FxHashSet};
use sheetsync_common::{Table, Worksheet};
use sheetsync_engine::{
    FetchError, FontError, FontId, FontLoader, ImageFetcher, Mutation, MutationError, NodeKind,
    NodeMutator, SceneTree, Scope,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    auto_layout: bool,
    font: Option<FontId>,
    text: String,
    alive: bool,
}

/// Arena-backed document. Node 0 is the document root.
#[derive(Debug, Clone)]
pub struct MemoryDocument {
    nodes: Vec<Node>,
    log: Vec<(NodeId, Mutation<NodeId>)>,
    rejected: FxHashSet<NodeId>,
    duplicate_budget: Option<usize>,
    remove_budget: Option<usize>,
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    pub const ROOT: NodeId = NodeId(0);

    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: "Document".into(),
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
                auto_layout: false,
                font: None,
                text: String::new(),
                alive: true,
            }],
            log: Vec::new(),
            rejected: FxHashSet::default(),
            duplicate_budget: None,
            remove_budget: None,
        }
    }

    pub fn add_page(&mut self, name: &str) -> NodeId {
        self.add(Self::ROOT, NodeKind::Page, name)
    }

    pub fn add(&mut self, parent: NodeId, kind: NodeKind, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            name: name.to_string(),
            kind,
            parent: Some(parent),
            children: Vec::new(),
            auto_layout: false,
            font: kind.is_text().then(|| FontId::new("Inter", "Regular")),
            text: String::new(),
            alive: true,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn add_frame(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, NodeKind::Frame, name)
    }

    /// Frame that arranges its children automatically, usable as a repeat
    /// container.
    pub fn add_auto_layout(&mut self, parent: NodeId, name: &str) -> NodeId {
        let id = self.add(parent, NodeKind::Frame, name);
        self.nodes[id.0].auto_layout = true;
        id
    }

    pub fn add_text(&mut self, parent: NodeId, name: &str) -> NodeId {
        self.add(parent, NodeKind::Text, name)
    }

    pub fn set_font(&mut self, node: NodeId, font: FontId) {
        self.nodes[node.0].font = Some(font);
    }

    pub fn rename(&mut self, node: NodeId, name: &str) {
        self.nodes[node.0].name = name.to_string();
    }

    /// Make `apply` fail for `node`.
    pub fn reject_mutations(&mut self, node: NodeId) {
        self.rejected.insert(node);
    }

    /// Allow `n` more successful duplicates, then fail.
    pub fn fail_duplicate_after(&mut self, n: usize) {
        self.duplicate_budget = Some(n);
    }

    /// Allow `n` more successful removals, then fail.
    pub fn fail_remove_after(&mut self, n: usize) {
        self.remove_budget = Some(n);
    }

    pub fn text(&self, node: NodeId) -> &str {
        &self.nodes[node.0].text
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.nodes.get(node.0).is_some_and(|n| n.alive)
    }

    /// Every applied mutation, in order.
    pub fn log(&self) -> &[(NodeId, Mutation<NodeId>)] {
        &self.log
    }

    /// Mutations applied to `node`, in order.
    pub fn mutations(&self, node: NodeId) -> Vec<Mutation<NodeId>> {
        self.log
            .iter()
            .filter(|(id, _)| *id == node)
            .map(|(_, mutation)| mutation.clone())
            .collect()
    }

    /// Live descendants of `node` in depth-first order.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[node.0].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id.0].children.iter().rev().copied());
        }
        out
    }

    /// First live node with exactly this name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| n.alive && n.name == name)
            .map(NodeId)
    }

    fn node(&self, id: NodeId) -> Result<&Node, MutationError> {
        self.nodes
            .get(id.0)
            .filter(|n| n.alive)
            .ok_or(MutationError::NodeNotFound)
    }

    fn clone_subtree(&mut self, source: NodeId, parent: NodeId) -> NodeId {
        let mut copy = self.nodes[source.0].clone();
        copy.parent = Some(parent);
        copy.children = Vec::new();
        let id = NodeId(self.nodes.len());
        self.nodes.push(copy);
        self.nodes[parent.0].children.push(id);
        for child in self.nodes[source.0].children.clone() {
            self.clone_subtree(child, id);
        }
        id
    }

    fn take_budget(budget: &mut Option<usize>) -> bool {
        match budget {
            Some(0) => false,
            Some(n) => {
                *n -= 1;
                true
            }
            None => true,
        }
    }
}

impl SceneTree for MemoryDocument {
    type NodeId = NodeId;

    fn roots(&self, scope: &Scope<NodeId>) -> Vec<NodeId> {
        match scope {
            Scope::Document => self.nodes[0].children.clone(),
            Scope::Page(page) => self.children(*page),
            Scope::Selection(nodes) => nodes
                .iter()
                .copied()
                .filter(|&n| self.is_alive(n))
                .collect(),
        }
    }

    fn name(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().map(|n| n.name.as_str())
    }

    fn kind(&self, node: NodeId) -> NodeKind {
        self.node(node).map_or(NodeKind::Other, |n| n.kind)
    }

    fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.node(node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok().and_then(|n| n.parent)
    }

    fn has_auto_layout(&self, node: NodeId) -> bool {
        self.node(node).is_ok_and(|n| n.auto_layout)
    }

    fn font(&self, node: NodeId) -> Option<FontId> {
        self.node(node).ok().and_then(|n| n.font.clone())
    }

    fn components(&self) -> Vec<(NodeId, String)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.alive && n.kind == NodeKind::Component)
            .map(|(idx, n)| (NodeId(idx), n.name.clone()))
            .collect()
    }
}

impl NodeMutator for MemoryDocument {
    fn apply(&mut self, node: NodeId, mutation: Mutation<NodeId>) -> Result<(), MutationError> {
        let kind = self.node(node)?.kind;
        if self.rejected.contains(&node) {
            return Err(MutationError::Rejected(format!("{node:?} is locked")));
        }
        match &mutation {
            Mutation::SetText(text) => {
                if !kind.is_text() {
                    return Err(MutationError::Unsupported(kind));
                }
                self.nodes[node.0].text = text.clone();
            }
            Mutation::SwapComponent(_) if !kind.is_instance() => {
                return Err(MutationError::Unsupported(kind));
            }
            _ => {}
        }
        self.log.push((node, mutation));
        Ok(())
    }

    fn duplicate(&mut self, container: NodeId, template: NodeId) -> Result<NodeId, MutationError> {
        self.node(container)?;
        self.node(template)?;
        if !Self::take_budget(&mut self.duplicate_budget) {
            return Err(MutationError::Rejected("duplicate failed".into()));
        }
        Ok(self.clone_subtree(template, container))
    }

    fn remove(&mut self, node: NodeId) -> Result<(), MutationError> {
        let parent = self.node(node)?.parent;
        if !Self::take_budget(&mut self.remove_budget) {
            return Err(MutationError::Rejected("remove failed".into()));
        }
        for id in std::iter::once(node).chain(self.descendants(node)) {
            self.nodes[id.0].alive = false;
        }
        if let Some(parent) = parent {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
        Ok(())
    }
}

/// Font loader that records requests and fails for listed families.
#[derive(Debug, Default)]
pub struct RecordingFonts {
    pub requests: Vec<FontId>,
    missing: FxHashSet<String>,
}

impl RecordingFonts {
    pub fn missing(families: &[&str]) -> Self {
        Self {
            requests: Vec::new(),
            missing: families.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl FontLoader for RecordingFonts {
    fn load(&mut self, font: &FontId) -> Result<(), FontError> {
        self.requests.push(font.clone());
        if self.missing.contains(&font.family) {
            return Err(FontError {
                font: font.clone(),
                reason: "not installed".into(),
            });
        }
        Ok(())
    }
}

/// Image fetcher serving fixed bytes per URL.
#[derive(Debug, Default)]
pub struct StaticImages {
    images: FxHashMap<String, Vec<u8>>,
    pub requests: Vec<String>,
}

impl StaticImages {
    pub fn with(mut self, url: &str, bytes: &[u8]) -> Self {
        self.images.insert(url.to_string(), bytes.to_vec());
        self
    }
}

impl ImageFetcher for StaticImages {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.push(url.to_string());
        self.images.get(url).cloned().ok_or_else(|| FetchError {
            url: url.to_string(),
            reason: "404".into(),
        })
    }
}

/// Column-oriented worksheet from `(label, values)` pairs.
pub fn sheet(name: &str, columns: &[(&str, &[&str])]) -> Worksheet {
    let mut sheet = Worksheet::new(name, Default::default());
    for (label, values) in columns {
        sheet
            .push_column(*label, values.iter().map(|v| v.to_string()).collect())
            .expect("fixture labels are unique");
    }
    sheet
}

/// Table whose first worksheet is active.
pub fn table(sheets: Vec<Worksheet>) -> Table {
    let active = sheets
        .first()
        .map(|s| s.name().to_string())
        .expect("fixture table needs a worksheet");
    Table::new(sheets, active).expect("fixture worksheets are unique")
}
