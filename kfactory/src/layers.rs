//! Symbolic layer tables.

use arcstr::ArcStr;
use indexmap::IndexMap;
use laydb::LayerIndex;

/// A declarative mapping from symbolic layer names to `(layer, datatype)`
/// pairs, registered en bloc on a layout.
///
/// The names are display-only; identity remains the pair.
#[derive(Debug, Clone, Default)]
pub struct LayerInfos {
    pub(crate) entries: IndexMap<ArcStr, (u16, u16)>,
}

impl LayerInfos {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named layer, builder-style.
    pub fn add(mut self, name: impl Into<ArcStr>, layer: u16, datatype: u16) -> Self {
        self.entries.insert(name.into(), (layer, datatype));
        self
    }

    /// Iterates over `(name, (layer, datatype))` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&ArcStr, &(u16, u16))> {
        self.entries.iter()
    }
}

/// The enum-like namespace produced by registering a [`LayerInfos`] table:
/// each symbolic name resolved to its stable [`LayerIndex`].
#[derive(Debug, Clone, Default)]
pub struct LayerMap {
    map: IndexMap<ArcStr, LayerIndex>,
}

impl LayerMap {
    pub(crate) fn new(map: IndexMap<ArcStr, LayerIndex>) -> Self {
        Self { map }
    }

    /// Resolves a symbolic name.
    pub fn get(&self, name: &str) -> Option<LayerIndex> {
        self.map.get(name).copied()
    }
}

impl std::ops::Index<&str> for LayerMap {
    type Output = LayerIndex;
    fn index(&self, name: &str) -> &Self::Output {
        self.map
            .get(name)
            .unwrap_or_else(|| panic!("no layer named `{name}`"))
    }
}
