//! The raw layout database: layers, cells, shapes, and instances.

use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path as FsPath;

use arcstr::ArcStr;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use geometry::transform::{DCplxTrans, Trans};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// The current layout file format version.
///
/// Version 1 files predate per-cell metadata; they are readable, but their
/// metadata recovery is skipped with a warning.
pub const FORMAT_VERSION: u32 = 2;

/// An opaque index into a layout's layer table.
#[derive(
    Debug, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct LayerIndex(pub usize);

/// A `(layer, datatype)` pair, optionally carrying a symbolic name.
///
/// The name is display-only; identity is the pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct LayerInfo {
    /// The GDS layer number.
    pub layer: u16,
    /// The GDS datatype number.
    pub datatype: u16,
    /// An optional human-readable name.
    pub name: Option<ArcStr>,
}

impl LayerInfo {
    /// Creates an unnamed layer info.
    pub fn new(layer: u16, datatype: u16) -> Self {
        Self {
            layer,
            datatype,
            name: None,
        }
    }
}

impl std::fmt::Display for LayerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({}/{})", name, self.layer, self.datatype),
            None => write!(f, "{}/{}", self.layer, self.datatype),
        }
    }
}

/// An identifier of a cell within its [`Layout`].
#[derive(
    Debug, Copy, Clone, Hash, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct CellId(pub(crate) usize);

impl CellId {
    /// The position of the cell in the layout's cell list.
    pub const fn index(&self) -> usize {
        self.0
    }
}

/// The transformation of a cell instance: simple or complex.
#[derive(Debug, Copy, Clone, Serialize, Deserialize, PartialEq)]
pub enum InstTrans {
    /// A rigid 90-degree-increment transformation in dbu.
    Simple(Trans),
    /// A general similarity transformation in microns.
    Cplx(DCplxTrans),
}

impl InstTrans {
    /// Whether this is a complex transformation.
    pub const fn is_complex(&self) -> bool {
        matches!(self, InstTrans::Cplx(_))
    }

    /// The simple part, rounding complex transformations onto the grid.
    pub fn s_trans(&self, dbu: f64) -> Trans {
        match self {
            InstTrans::Simple(t) => *t,
            InstTrans::Cplx(t) => t.s_trans().to_itype(dbu),
        }
    }

    /// Promotes to a micron-based complex transformation.
    pub fn dcplx(&self, dbu: f64) -> DCplxTrans {
        match self {
            InstTrans::Simple(t) => t.to_dcplx(dbu),
            InstTrans::Cplx(t) => *t,
        }
    }
}

impl Default for InstTrans {
    fn default() -> Self {
        InstTrans::Simple(Trans::R0)
    }
}

/// A placed reference to another cell.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CellInst {
    /// The instantiated cell.
    pub child: CellId,
    /// The placement transformation.
    pub trans: InstTrans,
}

/// A text annotation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Text {
    /// The annotation string.
    pub text: ArcStr,
    /// The placement of the text.
    pub trans: Trans,
}

/// The shapes stored on one layer of a cell.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Shapes {
    /// Polygons on this layer.
    pub polygons: Vec<Polygon>,
    /// Text annotations on this layer.
    pub texts: Vec<Text>,
}

impl Shapes {
    /// Whether the layer holds no shapes at all.
    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty() && self.texts.is_empty()
    }
}

/// A raw cell: shapes per layer, child instances, properties, and metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawCell {
    name: ArcStr,
    shapes: IndexMap<LayerIndex, Shapes>,
    insts: Vec<CellInst>,
    properties: IndexMap<u32, ArcStr>,
    meta: IndexMap<ArcStr, serde_json::Value>,
}

impl RawCell {
    fn new(name: ArcStr) -> Self {
        Self {
            name,
            shapes: IndexMap::new(),
            insts: Vec::new(),
            properties: IndexMap::new(),
            meta: IndexMap::new(),
        }
    }

    /// The name of the cell.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// The shapes on the given layer, creating the store if absent.
    pub fn shapes_mut(&mut self, layer: LayerIndex) -> &mut Shapes {
        self.shapes.entry(layer).or_default()
    }

    /// The shapes on the given layer, if any have been created.
    pub fn shapes(&self, layer: LayerIndex) -> Option<&Shapes> {
        self.shapes.get(&layer)
    }

    /// Iterates over `(layer, shapes)` pairs in first-use order.
    pub fn all_shapes(&self) -> impl Iterator<Item = (LayerIndex, &Shapes)> {
        self.shapes.iter().map(|(l, s)| (*l, s))
    }

    /// Removes all shapes on the given layer.
    pub fn clear_layer(&mut self, layer: LayerIndex) {
        self.shapes.shift_remove(&layer);
    }

    /// The child instances of this cell, in insertion order.
    pub fn insts(&self) -> &[CellInst] {
        &self.insts
    }

    /// Replaces the transformation of the instance at `index`.
    pub fn set_inst_trans(&mut self, index: usize, trans: InstTrans) {
        self.insts[index].trans = trans;
    }

    /// A user property attached to the cell, keyed by index.
    pub fn property(&self, index: u32) -> Option<&ArcStr> {
        self.properties.get(&index)
    }

    /// Sets a user property.
    pub fn set_property(&mut self, index: u32, value: impl Into<ArcStr>) {
        self.properties.insert(index, value.into());
    }

    /// A metadata blob attached to the cell.
    pub fn meta(&self, key: &str) -> Option<&serde_json::Value> {
        self.meta.get(key)
    }

    /// Attaches a metadata blob to the cell.
    pub fn set_meta(&mut self, key: impl Into<ArcStr>, value: serde_json::Value) {
        self.meta.insert(key.into(), value);
    }
}

/// Options controlling [`Layout::write`].
#[derive(Debug, Clone)]
pub struct SaveOptions {
    /// Whether per-cell metadata (settings, info, ports) is embedded.
    pub write_context_info: bool,
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            write_context_info: true,
        }
    }
}

/// The root of the geometry database.
///
/// Owns the dbu, the layer table (first-seen index assignment), and all
/// raw cells. Cells are never removed, so a [`CellId`] stays valid for the
/// lifetime of the layout.
#[derive(Debug)]
pub struct Layout {
    dbu: f64,
    layers: IndexMap<(u16, u16), Option<ArcStr>>,
    cells: Vec<RawCell>,
    name_map: HashMap<ArcStr, CellId>,
}

impl Layout {
    /// Creates an empty layout with the given database unit (in microns).
    ///
    /// # Panics
    ///
    /// Panics if `dbu` is not positive.
    pub fn new(dbu: f64) -> Self {
        assert!(dbu > 0., "dbu must be positive");
        Self {
            dbu,
            layers: IndexMap::new(),
            cells: Vec::new(),
            name_map: HashMap::new(),
        }
    }

    /// The database unit in microns.
    pub fn dbu(&self) -> f64 {
        self.dbu
    }

    /// Converts a micron value to dbu, rounding to the nearest unit.
    pub fn to_dbu(&self, x: f64) -> i64 {
        (x / self.dbu).round() as i64
    }

    /// Converts a dbu value to microns.
    pub fn to_um(&self, n: i64) -> f64 {
        n as f64 * self.dbu
    }

    /// Registers `(layer, datatype)`, returning its stable index.
    ///
    /// Repeated registrations return the same index; indices are assigned
    /// in first-seen order.
    pub fn layer(&mut self, layer: u16, datatype: u16) -> LayerIndex {
        let entry = self.layers.entry((layer, datatype));
        let index = entry.index();
        entry.or_insert(None);
        LayerIndex(index)
    }

    /// Registers a layer with a symbolic name.
    ///
    /// The name never affects identity; re-registering with a name fills
    /// in the name of an existing entry.
    pub fn layer_named(&mut self, layer: u16, datatype: u16, name: impl Into<ArcStr>) -> LayerIndex {
        let idx = self.layer(layer, datatype);
        self.layers[idx.0] = Some(name.into());
        idx
    }

    /// Looks up an already-registered layer.
    pub fn find_layer(&self, layer: u16, datatype: u16) -> Option<LayerIndex> {
        self.layers.get_index_of(&(layer, datatype)).map(LayerIndex)
    }

    /// The `(layer, datatype, name)` triple behind an index.
    pub fn get_info(&self, index: LayerIndex) -> LayerInfo {
        let ((layer, datatype), name) = self.layers.get_index(index.0).expect("layer index");
        LayerInfo {
            layer: *layer,
            datatype: *datatype,
            name: name.clone(),
        }
    }

    /// All registered layer indices, in first-seen order.
    pub fn layer_indexes(&self) -> Vec<LayerIndex> {
        (0..self.layers.len()).map(LayerIndex).collect()
    }

    /// Creates a new, empty cell.
    ///
    /// Fails with [`Error::DuplicateCellName`] if the name is taken;
    /// collision-resolving suffix naming is the caller's policy.
    pub fn create_cell(&mut self, name: impl Into<ArcStr>) -> Result<CellId> {
        let name = name.into();
        if self.name_map.contains_key(&name) {
            return Err(Error::DuplicateCellName(name));
        }
        let id = CellId(self.cells.len());
        self.name_map.insert(name.clone(), id);
        self.cells.push(RawCell::new(name));
        Ok(id)
    }

    /// Whether a cell with the given name exists.
    pub fn has_cell(&self, name: &str) -> bool {
        self.name_map.contains_key(name)
    }

    /// The id of the cell with the given name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.name_map.get(name).copied()
    }

    /// The cell behind an id.
    pub fn cell(&self, id: CellId) -> &RawCell {
        &self.cells[id.0]
    }

    /// Mutable access to the cell behind an id.
    pub fn cell_mut(&mut self, id: CellId) -> &mut RawCell {
        &mut self.cells[id.0]
    }

    /// Renames a cell, keeping the name table consistent.
    pub fn rename_cell(&mut self, id: CellId, new_name: impl Into<ArcStr>) -> Result<()> {
        let new_name = new_name.into();
        if let Some(&existing) = self.name_map.get(&new_name) {
            if existing == id {
                return Ok(());
            }
            return Err(Error::DuplicateCellName(new_name));
        }
        let old = std::mem::replace(&mut self.cells[id.0].name, new_name.clone());
        self.name_map.remove(&old);
        self.name_map.insert(new_name, id);
        Ok(())
    }

    /// Iterates over all cell ids in creation order.
    pub fn cell_ids(&self) -> impl Iterator<Item = CellId> {
        (0..self.cells.len()).map(CellId)
    }

    /// Places an instance of `child` inside `parent`.
    ///
    /// Fails if the instantiation would create a cycle in the hierarchy.
    /// Returns the index of the new instance within the parent.
    pub fn insert_inst(&mut self, parent: CellId, child: CellId, trans: InstTrans) -> Result<usize> {
        if parent == child || self.cells_used_by(child).contains(&parent) {
            return Err(Error::CyclicHierarchy {
                child: self.cells[child.0].name.clone(),
                parent: self.cells[parent.0].name.clone(),
            });
        }
        let cell = &mut self.cells[parent.0];
        cell.insts.push(CellInst { child, trans });
        Ok(cell.insts.len() - 1)
    }

    /// The set of cells reachable from `root`, including `root` itself.
    pub fn cells_used_by(&self, root: CellId) -> HashSet<CellId> {
        let mut stack = VecDeque::new();
        let mut visited = HashSet::new();
        stack.push_back(root);
        while let Some(id) = stack.pop_front() {
            if !visited.insert(id) {
                continue;
            }
            for inst in &self.cells[id.0].insts {
                stack.push_back(inst.child);
            }
        }
        visited
    }

    /// The bounding box of a cell over all layers, instances included.
    pub fn cell_bbox(&self, id: CellId) -> Option<Rect> {
        let mut bbox: Option<Rect> = None;
        let mut join = |r: Rect| {
            bbox = Some(match bbox {
                Some(b) => b.union(r),
                None => r,
            })
        };
        for (_, shapes) in self.cells[id.0].all_shapes() {
            for poly in &shapes.polygons {
                if let Some(b) = poly.bbox() {
                    join(b);
                }
            }
        }
        for inst in &self.cells[id.0].insts {
            if let Some(b) = self.cell_bbox(inst.child) {
                join(self.transform_bbox(b, &inst.trans));
            }
        }
        bbox
    }

    /// The bounding box of a cell restricted to one layer.
    pub fn cell_layer_bbox(&self, id: CellId, layer: LayerIndex) -> Option<Rect> {
        let mut bbox: Option<Rect> = None;
        let mut join = |r: Rect| {
            bbox = Some(match bbox {
                Some(b) => b.union(r),
                None => r,
            })
        };
        if let Some(shapes) = self.cells[id.0].shapes(layer) {
            for poly in &shapes.polygons {
                if let Some(b) = poly.bbox() {
                    join(b);
                }
            }
        }
        for inst in &self.cells[id.0].insts {
            if let Some(b) = self.cell_layer_bbox(inst.child, layer) {
                join(self.transform_bbox(b, &inst.trans));
            }
        }
        bbox
    }

    fn transform_bbox(&self, b: Rect, trans: &InstTrans) -> Rect {
        match trans {
            InstTrans::Simple(t) => b.transformed(*t),
            InstTrans::Cplx(t) => {
                // transform all four corners and take their hull
                let corners = [
                    Point::new(b.left(), b.bot()),
                    Point::new(b.right(), b.bot()),
                    Point::new(b.right(), b.top()),
                    Point::new(b.left(), b.top()),
                ];
                let mut it = corners.iter().map(|p| {
                    t.apply(p.to_dtype(self.dbu)).to_itype(self.dbu)
                });
                let first = it.next().expect("corners");
                it.fold(Rect::from_point(first), |acc, p| {
                    acc.union(Rect::from_point(p))
                })
            }
        }
    }

    /// The polygons contributed by one instance of `parent` on `layer`,
    /// transformed into the parent's coordinate system.
    ///
    /// Descends the full subtree below the instance, so empty cells yield
    /// no polygons even when their bounding boxes are non-trivial.
    pub fn instance_shapes(&self, parent: CellId, inst: usize, layer: LayerIndex) -> Vec<Polygon> {
        let inst = &self.cells[parent.0].insts[inst];
        let mut out = Vec::new();
        self.collect_shapes(inst.child, layer, inst.trans.s_trans(self.dbu), &mut out);
        out
    }

    fn collect_shapes(&self, id: CellId, layer: LayerIndex, trans: Trans, out: &mut Vec<Polygon>) {
        if let Some(shapes) = self.cells[id.0].shapes(layer) {
            for poly in &shapes.polygons {
                out.push(poly.transformed(trans));
            }
        }
        for inst in &self.cells[id.0].insts {
            self.collect_shapes(inst.child, layer, trans * inst.trans.s_trans(self.dbu), out);
        }
    }

    /// Expands all instances of a cell inline, leaving a flat cell.
    ///
    /// When `merge` is set, axis-aligned rectangle shapes on each layer are
    /// coalesced through a [`Region`](crate::Region) merge.
    pub fn flatten_cell(&mut self, id: CellId, merge: bool) {
        let insts = std::mem::take(&mut self.cells[id.0].insts);
        for inst in insts {
            let trans = inst.trans.s_trans(self.dbu);
            for layer in self.layer_indexes() {
                let mut polys = Vec::new();
                self.collect_shapes(inst.child, layer, trans, &mut polys);
                if !polys.is_empty() {
                    self.cells[id.0].shapes_mut(layer).polygons.extend(polys);
                }
            }
        }
        if merge {
            for layer in self.layer_indexes() {
                let cell = &mut self.cells[id.0];
                let Some(shapes) = cell.shapes.get_mut(&layer) else {
                    continue;
                };
                let mut region = crate::Region::new();
                let mut kept = Vec::new();
                for poly in shapes.polygons.drain(..) {
                    match poly.bbox() {
                        Some(b) if Polygon::from_rect(b) == poly => region.insert_rect(b),
                        _ => kept.push(poly),
                    }
                }
                region.merge();
                shapes.polygons = region
                    .rects()
                    .iter()
                    .map(|&r| Polygon::from_rect(r))
                    .collect();
                shapes.polygons.extend(kept);
            }
        }
    }

    /// Serializes the layout to `path`.
    pub fn write(&self, path: impl AsRef<FsPath>, options: &SaveOptions) -> Result<()> {
        let doc = LayoutDoc {
            version: FORMAT_VERSION,
            dbu: self.dbu,
            layers: self
                .layers
                .iter()
                .map(|((l, d), name)| (*l, *d, name.clone()))
                .collect(),
            cells: self
                .cells
                .iter()
                .map(|cell| {
                    let mut cell = cell.clone();
                    if !options.write_context_info {
                        cell.meta.clear();
                    }
                    CellDoc {
                        insts: cell
                            .insts
                            .iter()
                            .map(|inst| (self.cells[inst.child.0].name.clone(), inst.trans))
                            .collect(),
                        name: cell.name,
                        shapes: cell.shapes.into_iter().collect(),
                        properties: cell.properties,
                        meta: cell.meta,
                    }
                })
                .collect(),
        };
        let file = std::fs::File::create(path)?;
        serde_json::to_writer(std::io::BufWriter::new(file), &doc)?;
        Ok(())
    }

    /// Reads a layout file, merging its cells into this layout.
    ///
    /// Returns the ids of the newly created cells, in file order. Files
    /// written by an older format version are accepted, but their cell
    /// metadata is discarded with a warning.
    pub fn read(&mut self, path: impl AsRef<FsPath>) -> Result<Vec<CellId>> {
        let file = std::fs::File::open(path)?;
        let doc: LayoutDoc = serde_json::from_reader(std::io::BufReader::new(file))?;
        if doc.version > FORMAT_VERSION {
            return Err(Error::UnsupportedVersion(doc.version));
        }
        let meta_supported = doc.version >= FORMAT_VERSION;
        if !meta_supported {
            tracing::warn!(
                version = doc.version,
                "layout file was written by an older format version; \
                 cell metadata recovery is skipped"
            );
        }
        let layer_map: Vec<LayerIndex> = doc
            .layers
            .iter()
            .map(|(l, d, name)| match name {
                Some(name) => self.layer_named(*l, *d, name.clone()),
                None => self.layer(*l, *d),
            })
            .collect();
        // two passes so instances can refer to any cell in the file
        let mut new_ids = Vec::new();
        for cell in &doc.cells {
            if self.has_cell(&cell.name) {
                continue;
            }
            new_ids.push(self.create_cell(cell.name.clone())?);
        }
        let mut created = new_ids.iter().copied().collect::<HashSet<_>>();
        for cell_doc in doc.cells {
            let Some(id) = self.cell_by_name(&cell_doc.name) else {
                continue;
            };
            if !created.remove(&id) {
                continue;
            }
            for (layer, shapes) in cell_doc.shapes {
                let mapped = layer_map
                    .get(layer.0)
                    .copied()
                    .unwrap_or(layer);
                *self.cells[id.0].shapes_mut(mapped) = shapes;
            }
            for (child_name, trans) in cell_doc.insts {
                let child = self
                    .cell_by_name(&child_name)
                    .ok_or_else(|| Error::CellNotFound(child_name.clone()))?;
                self.insert_inst(id, child, trans)?;
            }
            let cell = &mut self.cells[id.0];
            cell.properties = cell_doc.properties;
            if meta_supported {
                cell.meta = cell_doc.meta;
            }
        }
        Ok(new_ids)
    }

    /// Surfaces a report database to the user.
    ///
    /// There is no interactive viewer attached; the report is logged and
    /// left to the caller for persistence.
    pub fn show(&self, lyrdb: &crate::ReportDatabase) {
        tracing::error!(
            report = %lyrdb.name(),
            items = lyrdb.num_items(),
            "report database generated"
        );
        for (path, count) in lyrdb.category_summary() {
            tracing::error!("  {path}: {count} item(s)");
        }
    }
}

#[derive(Serialize, Deserialize)]
struct LayoutDoc {
    version: u32,
    dbu: f64,
    layers: Vec<(u16, u16, Option<ArcStr>)>,
    cells: Vec<CellDoc>,
}

#[derive(Serialize, Deserialize)]
struct CellDoc {
    name: ArcStr,
    shapes: Vec<(LayerIndex, Shapes)>,
    insts: Vec<(ArcStr, InstTrans)>,
    properties: IndexMap<u32, ArcStr>,
    #[serde(default)]
    meta: IndexMap<ArcStr, serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geometry::rect::Rect;

    #[test]
    fn layer_indices_are_idempotent_and_ordered() {
        let mut layout = Layout::new(0.001);
        let a = layout.layer(1, 0);
        let b = layout.layer(2, 0);
        assert_eq!(layout.layer(1, 0), a);
        assert_eq!((a, b), (LayerIndex(0), LayerIndex(1)));
        let named = layout.layer_named(1, 0, "WG");
        assert_eq!(named, a);
        assert_eq!(layout.get_info(a).name.as_deref(), Some("WG"));
    }

    #[test]
    fn cyclic_instantiation_is_rejected() {
        let mut layout = Layout::new(0.001);
        let a = layout.create_cell("a").unwrap();
        let b = layout.create_cell("b").unwrap();
        layout.insert_inst(a, b, InstTrans::default()).unwrap();
        assert!(matches!(
            layout.insert_inst(b, a, InstTrans::default()),
            Err(Error::CyclicHierarchy { .. })
        ));
        assert!(matches!(
            layout.insert_inst(a, a, InstTrans::default()),
            Err(Error::CyclicHierarchy { .. })
        ));
    }

    #[test]
    fn bbox_includes_transformed_instances() {
        let mut layout = Layout::new(0.001);
        let child = layout.create_cell("child").unwrap();
        let layer = layout.layer(1, 0);
        layout
            .cell_mut(child)
            .shapes_mut(layer)
            .polygons
            .push(Polygon::from_rect(Rect::from_sides(0, 0, 100, 50)));
        let parent = layout.create_cell("parent").unwrap();
        layout
            .insert_inst(
                parent,
                child,
                InstTrans::Simple(Trans::new(1, false, 0, 0)),
            )
            .unwrap();
        assert_eq!(
            layout.cell_bbox(parent),
            Some(Rect::from_sides(-50, 0, 0, 100))
        );
    }

    #[test]
    fn write_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test.lay");
        let mut layout = Layout::new(0.001);
        let cell = layout.create_cell("top").unwrap();
        let layer = layout.layer(1, 0);
        layout
            .cell_mut(cell)
            .shapes_mut(layer)
            .polygons
            .push(Polygon::from_rect(Rect::from_sides(0, 0, 10, 10)));
        layout
            .cell_mut(cell)
            .set_meta("settings", serde_json::json!({"length": 10}));
        layout.write(&path, &SaveOptions::default()).unwrap();

        let mut layout2 = Layout::new(0.001);
        let new = layout2.read(&path).unwrap();
        assert_eq!(new.len(), 1);
        let read = layout2.cell(new[0]);
        assert_eq!(read.name().as_str(), "top");
        assert_eq!(
            read.meta("settings"),
            Some(&serde_json::json!({"length": 10}))
        );
    }

    #[test]
    fn context_info_can_be_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nometa.lay");
        let mut layout = Layout::new(0.001);
        let cell = layout.create_cell("top").unwrap();
        layout
            .cell_mut(cell)
            .set_meta("settings", serde_json::json!({"a": 1}));
        layout
            .write(
                &path,
                &SaveOptions {
                    write_context_info: false,
                },
            )
            .unwrap();
        let mut layout2 = Layout::new(0.001);
        let new = layout2.read(&path).unwrap();
        assert_eq!(layout2.cell(new[0]).meta("settings"), None);
    }
}
