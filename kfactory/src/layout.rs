//! The cell registry: owns the backend layout and all cells.

use std::path::Path as FsPath;

use arcstr::ArcStr;
use geometry::point::Point;
use geometry::polygon::Polygon;
use geometry::rect::Rect;
use indexmap::IndexMap;
use laydb::{
    CellId, InstTrans, Layout, LayerIndex, LayerInfo, ReportDatabase, SaveOptions, Shapes, Text,
};
use sha3::{Digest, Sha3_512};

use crate::cross_section::{CrossSection, CrossSectionSpec};
use crate::error::{Error, Result};
use crate::kcell::KCell;
use crate::layers::{LayerInfos, LayerMap};
use crate::port::{rename_clockwise, Port, PortTrans};
use crate::settings::Value;

/// The function used to rename a cell's ports in place.
pub type RenameFunction = fn(&mut [Port], f64);

pub(crate) struct FactoryCache {
    pub(crate) entries: IndexMap<Vec<u8>, CellId>,
}

/// The cell registry.
///
/// Owns the backend [`Layout`] (dbu, layer table, raw cells), the table of
/// [`KCell`]s, the cross-section table, and the parametric-call caches. All
/// cell-creation and mutation paths funnel through this type; cells and
/// cache entries live for the registry's lifetime.
pub struct KCLayout {
    layout: Layout,
    kcells: Vec<KCell>,
    cross_sections: IndexMap<ArcStr, CrossSection>,
    pub(crate) caches: IndexMap<ArcStr, FactoryCache>,
    /// The port rename function applied by
    /// [`autorename_ports`](KCLayout::autorename_ports) by default.
    pub rename_function: RenameFunction,
}

impl Default for KCLayout {
    fn default() -> Self {
        Self::new(1e-3)
    }
}

impl KCLayout {
    /// Creates a registry over an empty layout with the given database
    /// unit (in microns).
    pub fn new(dbu: f64) -> Self {
        Self {
            layout: Layout::new(dbu),
            kcells: Vec::new(),
            cross_sections: IndexMap::new(),
            caches: IndexMap::new(),
            rename_function: rename_clockwise,
        }
    }

    /// The database unit in microns.
    pub fn dbu(&self) -> f64 {
        self.layout.dbu()
    }

    /// Converts a micron value to dbu, rounding to the nearest unit.
    pub fn to_dbu(&self, x: f64) -> i64 {
        self.layout.to_dbu(x)
    }

    /// Converts a dbu value to microns.
    pub fn to_um(&self, n: i64) -> f64 {
        self.layout.to_um(n)
    }

    /// Direct access to the backend layout.
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    // --- layers ----------------------------------------------------------

    /// Registers `(layer, datatype)`, returning its stable index.
    pub fn layer(&mut self, layer: u16, datatype: u16) -> LayerIndex {
        self.layout.layer(layer, datatype)
    }

    /// Registers a layer with a symbolic name.
    pub fn layer_named(
        &mut self,
        layer: u16,
        datatype: u16,
        name: impl Into<ArcStr>,
    ) -> LayerIndex {
        self.layout.layer_named(layer, datatype, name)
    }

    /// The `(layer, datatype, name)` triple behind an index.
    pub fn get_info(&self, index: LayerIndex) -> LayerInfo {
        self.layout.get_info(index)
    }

    /// Registers a whole [`LayerInfos`] table, returning the resolved
    /// namespace.
    pub fn register_layers(&mut self, infos: &LayerInfos) -> LayerMap {
        let map = infos
            .entries
            .iter()
            .map(|(name, (l, d))| (name.clone(), self.layout.layer_named(*l, *d, name.clone())))
            .collect();
        LayerMap::new(map)
    }

    // --- cells -----------------------------------------------------------

    /// Creates a new, empty cell.
    ///
    /// Without `allow_duplicate`, a name collision fails with
    /// [`Error::DuplicateName`]. With it, a fresh unique name is derived by
    /// appending `$1`, `$2`, ...
    pub fn create_cell(&mut self, name: impl Into<ArcStr>, allow_duplicate: bool) -> Result<CellId> {
        let name = name.into();
        let name = if self.layout.has_cell(&name) {
            if !allow_duplicate {
                return Err(Error::DuplicateName(name));
            }
            self.unique_cell_name(&name)
        } else {
            name
        };
        let id = self.layout.create_cell(name.clone())?;
        debug_assert_eq!(id.index(), self.kcells.len());
        self.kcells.push(KCell::new(id, name));
        Ok(id)
    }

    fn unique_cell_name(&self, base: &str) -> ArcStr {
        let mut n = 1;
        loop {
            let candidate = format!("{base}${n}");
            if !self.layout.has_cell(&candidate) {
                return candidate.into();
            }
            n += 1;
        }
    }

    /// The cell behind an id.
    pub fn kcell(&self, id: CellId) -> &KCell {
        &self.kcells[id.index()]
    }

    /// Mutable access to the cell behind an id.
    ///
    /// Mutators on the returned cell perform their own lock checks.
    pub fn kcell_mut(&mut self, id: CellId) -> &mut KCell {
        &mut self.kcells[id.index()]
    }

    /// The id of the cell with the given name.
    pub fn cell_by_name(&self, name: &str) -> Option<CellId> {
        self.layout.cell_by_name(name)
    }

    /// Iterates over all cells in creation order.
    pub fn kcells(&self) -> impl Iterator<Item = &KCell> {
        self.kcells.iter()
    }

    /// Renames a cell. A collision derives a unique `$n`-suffixed name.
    pub fn rename_cell(&mut self, id: CellId, new_name: impl Into<ArcStr>) -> Result<()> {
        let new_name = new_name.into();
        let new_name = if self.layout.has_cell(&new_name) && self.cell_by_name(&new_name) != Some(id)
        {
            self.unique_cell_name(&new_name)
        } else {
            new_name
        };
        self.layout.rename_cell(id, new_name.clone())?;
        self.kcells[id.index()].name = new_name;
        Ok(())
    }

    /// Locks a cell, making its shapes, ports, instances, and settings
    /// immutable.
    pub fn lock(&mut self, id: CellId) {
        self.kcells[id.index()].locked = true;
    }

    /// Copies a cell: duplicated shapes and properties, deep-copied ports,
    /// cloned instances of the same children with the same transforms.
    ///
    /// The copy is unlocked, whatever the state of the original.
    pub fn copy_cell(&mut self, id: CellId) -> Result<CellId> {
        let name = self.kcells[id.index()].name.clone();
        let copy = self.create_cell(name, true)?;
        for layer in self.layout.layer_indexes() {
            if let Some(shapes) = self.layout.cell(id).shapes(layer) {
                let shapes = shapes.clone();
                *self.layout.cell_mut(copy).shapes_mut(layer) = shapes;
            }
        }
        let insts: Vec<_> = self.layout.cell(id).insts().to_vec();
        for inst in insts {
            self.layout.insert_inst(copy, inst.child, inst.trans)?;
        }
        let original = &self.kcells[id.index()];
        let (ports, settings, units, info, function_name, basename) = (
            original.ports.clone(),
            original.settings.clone(),
            original.settings_units.clone(),
            original.info.clone(),
            original.function_name.clone(),
            original.basename.clone(),
        );
        let cell = &mut self.kcells[copy.index()];
        cell.ports = ports;
        cell.settings = settings;
        cell.settings_units = units;
        cell.info = info;
        cell.function_name = function_name;
        cell.basename = basename;
        Ok(copy)
    }

    // --- shapes ----------------------------------------------------------

    /// The shapes of a cell on a layer, if any have been created.
    pub fn shapes(&self, cell: CellId, layer: LayerIndex) -> Option<&Shapes> {
        self.layout.cell(cell).shapes(layer)
    }

    /// Mutable access to the shapes of a cell on a layer.
    ///
    /// Fails with [`Error::Frozen`] on a locked cell.
    pub fn shapes_mut(&mut self, cell: CellId, layer: LayerIndex) -> Result<&mut Shapes> {
        self.kcells[cell.index()].check_unlocked()?;
        Ok(self.layout.cell_mut(cell).shapes_mut(layer))
    }

    /// The bounding box of a cell over all layers.
    pub fn bbox(&self, cell: CellId) -> Option<Rect> {
        self.layout.cell_bbox(cell)
    }

    /// The bounding box of a cell restricted to one layer.
    pub fn layer_bbox(&self, cell: CellId, layer: LayerIndex) -> Option<Rect> {
        self.layout.cell_layer_bbox(cell, layer)
    }

    /// Expands all instances of a cell inline.
    ///
    /// When `merge` is set, rectangle shapes are coalesced per layer.
    pub fn flatten(&mut self, cell: CellId, merge: bool) -> Result<()> {
        self.kcells[cell.index()].check_unlocked()?;
        self.layout.flatten_cell(cell, merge);
        Ok(())
    }

    /// Draws a small arrow polygon and a text label at each port of the
    /// cell, on the port's layer. A debugging aid.
    pub fn draw_ports(&mut self, cell: CellId) -> Result<()> {
        self.kcells[cell.index()].check_unlocked()?;
        let dbu = self.dbu();
        let ports: Vec<Port> = self.kcells[cell.index()].ports.iter().cloned().collect();
        for port in ports {
            let w = port.width;
            let trans = port.trans.s_trans(dbu);
            let arrow = Polygon::new(vec![
                Point::new(0, -w / 2),
                Point::new(0, w / 2),
                Point::new(w / 2, 0),
            ])
            .transformed(trans);
            let shapes = self.layout.cell_mut(cell).shapes_mut(port.layer);
            shapes.polygons.push(arrow);
            shapes.texts.push(Text {
                text: port.name.clone(),
                trans,
            });
        }
        Ok(())
    }

    /// Applies the registry's rename function (or `rename_func`) to the
    /// ports of a cell.
    pub fn autorename_ports(&mut self, cell: CellId, rename_func: Option<RenameFunction>) -> Result<()> {
        self.kcells[cell.index()].check_unlocked()?;
        let dbu = self.dbu();
        let f = rename_func.unwrap_or(self.rename_function);
        f(self.kcells[cell.index()].ports.as_mut_slice(), dbu);
        Ok(())
    }

    // --- hashing ---------------------------------------------------------

    /// A SHA3-512 digest of a cell: name, per-layer shape hashes, sorted
    /// port hashes, sorted instance hashes.
    ///
    /// Stable across structurally equal cells.
    pub fn cell_hash(&self, cell: CellId) -> [u8; 64] {
        let mut h = Sha3_512::new();
        h.update(self.kcells[cell.index()].name.as_bytes());
        let raw = self.layout.cell(cell);
        for layer in self.layout.layer_indexes() {
            if let Some(shapes) = raw.shapes(layer) {
                for poly in &shapes.polygons {
                    h.update(poly.hash_bytes());
                }
                for text in &shapes.texts {
                    h.update(text.text.as_bytes());
                    h.update(text.trans.hash_bytes());
                }
            }
        }
        let mut port_hashes: Vec<[u8; 64]> = self.kcells[cell.index()]
            .ports
            .iter()
            .map(Port::hash)
            .collect();
        port_hashes.sort_unstable();
        for hash in port_hashes {
            h.update(hash);
        }
        let mut inst_hashes: Vec<[u8; 64]> = (0..raw.insts().len())
            .map(|i| self.instance_hash_raw(cell, i))
            .collect();
        inst_hashes.sort_unstable();
        for hash in inst_hashes {
            h.update(hash);
        }
        h.finalize().into()
    }

    pub(crate) fn instance_hash_raw(&self, parent: CellId, index: usize) -> [u8; 64] {
        let inst = &self.layout.cell(parent).insts()[index];
        let mut h = Sha3_512::new();
        h.update(self.cell_hash(inst.child));
        match inst.trans {
            InstTrans::Simple(t) => h.update(t.hash_bytes()),
            InstTrans::Cplx(t) => h.update(t.hash_bytes()),
        }
        h.finalize().into()
    }

    // --- instances (resolution helpers; see `instance` module) ----------

    pub(crate) fn raw_inst(&self, parent: CellId, index: usize) -> &laydb::CellInst {
        &self.layout.cell(parent).insts()[index]
    }

    pub(crate) fn set_inst_trans(&mut self, parent: CellId, index: usize, trans: InstTrans) {
        self.layout.cell_mut(parent).set_inst_trans(index, trans);
    }

    pub(crate) fn insert_inst(
        &mut self,
        parent: CellId,
        child: CellId,
        trans: InstTrans,
    ) -> Result<usize> {
        self.kcells[parent.index()].check_unlocked()?;
        Ok(self.layout.insert_inst(parent, child, trans)?)
    }

    /// The number of instances inside a cell.
    pub fn num_insts(&self, cell: CellId) -> usize {
        self.layout.cell(cell).insts().len()
    }

    /// The polygons one instance contributes on a layer, in parent
    /// coordinates.
    pub fn instance_shapes(&self, parent: CellId, index: usize, layer: LayerIndex) -> Vec<Polygon> {
        self.layout.instance_shapes(parent, index, layer)
    }

    // --- cross sections --------------------------------------------------

    /// Returns the registered cross section for `spec`, inserting it on
    /// first use. Specs resolving to the same name return the same entry.
    pub fn get_cross_section(&mut self, spec: CrossSectionSpec) -> Result<&CrossSection> {
        let xs = spec.validate(self.layout.dbu())?;
        let entry = self.cross_sections.entry(xs.name.clone());
        Ok(entry.or_insert(xs))
    }

    /// Looks up a cross section by name.
    pub fn cross_section(&self, name: &str) -> Option<&CrossSection> {
        self.cross_sections.get(name)
    }

    // --- persistence -----------------------------------------------------

    /// Serializes the layout to `path`.
    ///
    /// With `write_context_info`, each cell's settings, units, info,
    /// factory provenance, and ports are embedded as metadata.
    pub fn write(&mut self, path: impl AsRef<FsPath>, options: &SaveOptions) -> Result<()> {
        if options.write_context_info {
            for id in self.layout.cell_ids().collect::<Vec<_>>() {
                self.set_meta_data(id);
            }
        }
        self.layout.write(path, options)?;
        Ok(())
    }

    /// Adopts a backend cell into the registry, creating its [`KCell`]
    /// wrapper. Idempotent for cells that are already registered.
    pub fn register_cell(&mut self, id: CellId) {
        if id.index() < self.kcells.len() {
            return;
        }
        debug_assert_eq!(id.index(), self.kcells.len());
        self.kcells
            .push(KCell::new(id, self.layout.cell(id).name().clone()));
    }

    /// Reads a layout file, wrapping and registering every newly
    /// introduced backend cell.
    ///
    /// Metadata, where present, is rehydrated into settings, info, and
    /// ports; cells without metadata are registered with empty ports.
    pub fn read(&mut self, path: impl AsRef<FsPath>) -> Result<Vec<CellId>> {
        let new_cells = self.layout.read(path)?;
        for &id in &new_cells {
            self.register_cell(id);
            self.get_meta_data(id);
        }
        Ok(new_cells)
    }

    /// Copies a cell's settings, info, provenance, and ports into backend
    /// metadata blobs.
    pub fn set_meta_data(&mut self, id: CellId) {
        let kcell = &self.kcells[id.index()];
        let settings: serde_json::Value = kcell
            .settings
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>()
            .into();
        let units: serde_json::Value = kcell
            .settings_units
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::json!(v.as_str())))
            .collect::<serde_json::Map<_, _>>()
            .into();
        let info: serde_json::Value = kcell
            .info
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_json()))
            .collect::<serde_json::Map<_, _>>()
            .into();
        let ports: Vec<serde_json::Value> = kcell
            .ports
            .iter()
            .map(|p| {
                let layer = self.layout.get_info(p.layer);
                let (kind, trans) = p.trans.to_s();
                serde_json::json!({
                    "name": p.name.as_str(),
                    "width": p.width,
                    "layer": [layer.layer, layer.datatype],
                    "port_type": p.port_type.as_str(),
                    "trans_kind": kind,
                    "trans": trans,
                })
            })
            .collect();
        let function_name = kcell.function_name.as_ref().map(|s| s.to_string());
        let basename = kcell.basename.as_ref().map(|s| s.to_string());
        let raw = self.layout.cell_mut(id);
        raw.set_meta("settings", settings);
        raw.set_meta("settings_units", units);
        raw.set_meta("info", info);
        raw.set_meta("ports", serde_json::json!(ports));
        raw.set_meta("function_name", serde_json::json!(function_name));
        raw.set_meta("basename", serde_json::json!(basename));
    }

    /// Rehydrates settings, info, provenance, and ports from backend
    /// metadata. Missing metadata leaves the cell untouched.
    pub fn get_meta_data(&mut self, id: CellId) {
        let raw = self.layout.cell(id);
        let settings = raw.meta("settings").cloned();
        let units = raw.meta("settings_units").cloned();
        let info = raw.meta("info").cloned();
        let ports = raw.meta("ports").cloned();
        let function_name = raw.meta("function_name").cloned();
        let basename = raw.meta("basename").cloned();

        if let Some(serde_json::Value::Object(map)) = settings {
            self.kcells[id.index()].settings = map
                .iter()
                .map(|(k, v)| (ArcStr::from(k.as_str()), Value::from_json(v)))
                .collect();
        }
        if let Some(serde_json::Value::Object(map)) = units {
            self.kcells[id.index()].settings_units = map
                .iter()
                .filter_map(|(k, v)| {
                    v.as_str()
                        .map(|s| (ArcStr::from(k.as_str()), ArcStr::from(s)))
                })
                .collect();
        }
        if let Some(serde_json::Value::Object(map)) = info {
            self.kcells[id.index()].info = map
                .iter()
                .map(|(k, v)| (ArcStr::from(k.as_str()), Value::from_json(v)))
                .collect();
        }
        if let Some(serde_json::Value::String(name)) = function_name {
            self.kcells[id.index()].function_name = Some(name.as_str().into());
        }
        if let Some(serde_json::Value::String(name)) = basename {
            self.kcells[id.index()].basename = Some(name.as_str().into());
        }
        if let Some(serde_json::Value::Array(entries)) = ports {
            for entry in entries {
                match self.port_from_meta(&entry) {
                    Some(port) => {
                        if let Err(err) = self.kcells[id.index()].ports.create_port(port) {
                            tracing::warn!("skipping metadata port: {err}");
                        }
                    }
                    None => tracing::warn!("malformed port metadata entry; skipping"),
                }
            }
        }
    }

    fn port_from_meta(&mut self, entry: &serde_json::Value) -> Option<Port> {
        let name = entry.get("name")?.as_str()?;
        let width = entry.get("width")?.as_i64()?;
        let layer = entry.get("layer")?.as_array()?;
        let (l, d) = (layer.first()?.as_u64()? as u16, layer.get(1)?.as_u64()? as u16);
        let port_type = entry.get("port_type")?.as_str()?;
        let kind = entry.get("trans_kind")?.as_str()?;
        let trans = PortTrans::from_s(kind, entry.get("trans")?.as_str()?)?;
        let layer = self.layout.layer(l, d);
        Some(Port {
            name: name.into(),
            width,
            layer,
            port_type: port_type.into(),
            trans,
        })
    }

    /// Sets a user property on the backend cell.
    pub fn set_cell_property(&mut self, id: CellId, index: u32, value: impl Into<ArcStr>) {
        self.layout.cell_mut(id).set_property(index, value);
    }

    /// Surfaces a report database to the user via the backend.
    pub fn show(&self, lyrdb: &ReportDatabase) {
        self.layout.show(lyrdb);
    }
}

impl std::ops::Index<CellId> for KCLayout {
    type Output = KCell;
    fn index(&self, id: CellId) -> &Self::Output {
        self.kcell(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Port;

    #[test]
    fn cell_names_are_unique() {
        let mut kcl = KCLayout::default();
        kcl.create_cell("top", false).unwrap();
        assert!(matches!(
            kcl.create_cell("top", false),
            Err(Error::DuplicateName(_))
        ));
        let dup = kcl.create_cell("top", true).unwrap();
        assert_eq!(kcl[dup].name().as_str(), "top$1");
        let dup2 = kcl.create_cell("top", true).unwrap();
        assert_eq!(kcl[dup2].name().as_str(), "top$2");
    }

    #[test]
    fn locked_cells_reject_mutation() {
        let mut kcl = KCLayout::default();
        let cell = kcl.create_cell("wg", false).unwrap();
        let layer = kcl.layer(1, 0);
        kcl.lock(cell);
        assert!(matches!(
            kcl.shapes_mut(cell, layer),
            Err(Error::Frozen(_))
        ));
        assert!(matches!(
            kcl.kcell_mut(cell)
                .create_port(Port::at("o1", 0, (0, 0), 500, layer)),
            Err(Error::Frozen(_))
        ));
        assert!(matches!(kcl.flatten(cell, true), Err(Error::Frozen(_))));
    }

    #[test]
    fn copy_of_locked_cell_is_unlocked_and_hash_stable() {
        let mut kcl = KCLayout::default();
        let cell = kcl.create_cell("wg", false).unwrap();
        let layer = kcl.layer(1, 0);
        kcl.shapes_mut(cell, layer)
            .unwrap()
            .polygons
            .push(Polygon::from_rect(Rect::from_sides(0, 0, 1000, 500)));
        kcl.kcell_mut(cell)
            .create_port(Port::at("o1", 2, (0, 0), 500, layer))
            .unwrap();
        kcl.lock(cell);
        let copy = kcl.copy_cell(cell).unwrap();
        assert!(!kcl[copy].locked());
        assert_eq!(kcl[copy].ports().len(), 1);
        // the copy differs only in name; same name would give an equal hash
        assert_ne!(kcl.cell_hash(cell), kcl.cell_hash(copy));
    }

    #[test]
    fn hash_is_stable_across_structurally_equal_cells() {
        let mut hashes = Vec::new();
        for _ in 0..2 {
            let mut kcl = KCLayout::default();
            let cell = kcl.create_cell("wg", false).unwrap();
            let layer = kcl.layer(1, 0);
            kcl.shapes_mut(cell, layer)
                .unwrap()
                .polygons
                .push(Polygon::from_rect(Rect::from_sides(0, 0, 1000, 500)));
            kcl.kcell_mut(cell)
                .create_port(Port::at("o1", 2, (0, 0), 500, layer))
                .unwrap();
            hashes.push(kcl.cell_hash(cell));
        }
        assert_eq!(hashes[0], hashes[1]);
    }

    #[test]
    fn autorename_ports_follows_clockwise_rule() {
        let mut kcl = KCLayout::default();
        let cell = kcl.create_cell("wg", false).unwrap();
        let layer = kcl.layer(1, 0);
        kcl.kcell_mut(cell)
            .create_port(Port::at("west", 2, (0, 0), 500, layer))
            .unwrap();
        kcl.kcell_mut(cell)
            .create_port(Port::at("east", 0, (10_000, 0), 500, layer))
            .unwrap();
        kcl.autorename_ports(cell, None).unwrap();
        let names: Vec<_> = kcl[cell].ports().names();
        // the east-facing port lands in the first bucket
        assert_eq!(names[0].as_str(), "o2");
        assert_eq!(names[1].as_str(), "o1");
        assert_eq!(kcl[cell].port("o1").unwrap().angle(kcl.dbu()), 0);
        assert_eq!(kcl[cell].port("o2").unwrap().angle(kcl.dbu()), 2);
    }
}
