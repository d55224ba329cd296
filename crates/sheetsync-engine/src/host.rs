//! Contracts with the host application.
//!
//! The engine never touches a document directly. It reads the tree through
//! [`SceneTree`], requests changes through [`NodeMutator`], and reaches fonts,
//! images, table data and progress reporting through the small collaborator
//! traits below. Every call is synchronous; a host with an asynchronous API
//! blocks inside its implementation.

use std::fmt;
use std::hash::Hash;

use sheetsync_common::{Rgb, Table};
use sheetsync_parse::{
    Axis, HorizontalAlign, LetterSpacing, LineHeight, PositionMode, VerticalAlign,
};

use crate::error::{AcquireError, FetchError, FontError, MutationError};

/// Type tag of a document node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Page,
    Frame,
    Group,
    Text,
    /// Instance of a component; its value selects which component it shows.
    Instance,
    /// Main component definition.
    Component,
    ComponentSet,
    /// Vector, rectangle, ellipse and other fillable shapes.
    Shape,
    Other,
}

impl NodeKind {
    /// Boundary at which ancestor walks stop.
    pub fn is_page_like(self) -> bool {
        matches!(self, Self::Page | Self::Document)
    }

    pub fn is_text(self) -> bool {
        self == Self::Text
    }

    pub fn is_instance(self) -> bool {
        self == Self::Instance
    }

    pub fn is_component_definition(self) -> bool {
        matches!(self, Self::Component | Self::ComponentSet)
    }
}

/// Which part of the document a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope<Id> {
    /// Every page.
    Document,
    Page(Id),
    Selection(Vec<Id>),
}

/// Font identity as the host names it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontId {
    pub family: String,
    pub style: String,
}

impl FontId {
    pub fn new(family: impl Into<String>, style: impl Into<String>) -> Self {
        Self {
            family: family.into(),
            style: style.into(),
        }
    }
}

impl fmt::Display for FontId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.family, self.style)
    }
}

/// Text-only formatting change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextProperty {
    Align(HorizontalAlign),
    VerticalAlign(VerticalAlign),
    FontSize(f64),
    LineHeight(LineHeight),
    LetterSpacing(LetterSpacing),
}

/// A single property change requested from the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation<Id> {
    SetText(String),
    SetFill(Rgb),
    SetOpacity(f64),
    /// `None` keeps the current extent on that side.
    Resize {
        width: Option<f64>,
        height: Option<f64>,
    },
    Reposition {
        mode: PositionMode,
        axis: Axis,
        value: f64,
    },
    /// Degrees.
    Rotate(f64),
    SetVisible(bool),
    SetTextProperty(TextProperty),
    SwapComponent(Id),
    SetImageFill(Vec<u8>),
}

/// Read access to the document tree.
///
/// Lazily loaded containers must be materialized before a run starts.
pub trait SceneTree {
    type NodeId: Copy + Eq + Hash + fmt::Debug;

    /// Root nodes covered by `scope`, in document order.
    fn roots(&self, scope: &Scope<Self::NodeId>) -> Vec<Self::NodeId>;

    /// Display name, or `None` when the node no longer exists.
    fn name(&self, node: Self::NodeId) -> Option<&str>;

    fn kind(&self, node: Self::NodeId) -> NodeKind;

    /// Children in order.
    fn children(&self, node: Self::NodeId) -> Vec<Self::NodeId>;

    fn parent(&self, node: Self::NodeId) -> Option<Self::NodeId>;

    /// Whether the container arranges its children automatically.
    fn has_auto_layout(&self, node: Self::NodeId) -> bool;

    /// Font used by a text node.
    fn font(&self, node: Self::NodeId) -> Option<FontId>;

    /// Main components available as swap targets, with their names.
    fn components(&self) -> Vec<(Self::NodeId, String)>;
}

/// Write access to the document tree.
pub trait NodeMutator: SceneTree {
    fn apply(
        &mut self,
        node: Self::NodeId,
        mutation: Mutation<Self::NodeId>,
    ) -> Result<(), MutationError>;

    /// Clone `template` and append the copy as the last child of `container`.
    fn duplicate(
        &mut self,
        container: Self::NodeId,
        template: Self::NodeId,
    ) -> Result<Self::NodeId, MutationError>;

    /// Remove a node and its subtree.
    fn remove(&mut self, node: Self::NodeId) -> Result<(), MutationError>;
}

pub trait FontLoader {
    fn load(&mut self, font: &FontId) -> Result<(), FontError>;
}

pub trait ImageFetcher {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// One-way progress callback; `percent` is in `0..=100`.
pub trait ProgressSink {
    fn report(&mut self, message: &str, percent: u8);
}

impl<F: FnMut(&str, u8)> ProgressSink for F {
    fn report(&mut self, message: &str, percent: u8) {
        self(message, percent)
    }
}

/// Supplies the table for a run.
pub trait TableSource {
    fn acquire(&mut self) -> Result<Table, AcquireError>;
}

impl TableSource for Table {
    fn acquire(&mut self) -> Result<Table, AcquireError> {
        Ok(self.clone())
    }
}

/// Font loader for hosts that need no explicit loading.
#[derive(Debug, Default, Clone, Copy)]
pub struct PreloadedFonts;

impl FontLoader for PreloadedFonts {
    fn load(&mut self, _font: &FontId) -> Result<(), FontError> {
        Ok(())
    }
}

/// Image fetcher for hosts without network access.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoImages;

impl ImageFetcher for NoImages {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError {
            url: url.to_string(),
            reason: "image fetching is not available".to_string(),
        })
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentProgress;

impl ProgressSink for SilentProgress {
    fn report(&mut self, _message: &str, _percent: u8) {}
}

impl<T: FontLoader + ?Sized> FontLoader for &mut T {
    fn load(&mut self, font: &FontId) -> Result<(), FontError> {
        (**self).load(font)
    }
}

impl<T: ImageFetcher + ?Sized> ImageFetcher for &mut T {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        (**self).fetch(url)
    }
}
