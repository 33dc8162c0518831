//! Cells: hierarchical containers of shapes, instances, and ports.

use arcstr::ArcStr;
use indexmap::IndexMap;
use laydb::CellId;

use crate::error::{Error, Result};
use crate::port::{Port, Ports};
use crate::settings::Value;

/// A cell in the registry.
///
/// Wraps a backend raw cell (shapes, child instances) with ports, settings,
/// info, and the lock state. Shapes and instances are reached through the
/// owning [`KCLayout`](crate::layout::KCLayout), which is the sole mutator
/// of the backend.
///
/// A cell starts out open; the parametric factory locks it on publication.
/// Once locked, its shapes, ports, instances, and settings are immutable;
/// `info` stays writable as user metadata.
#[derive(Debug, Clone)]
pub struct KCell {
    pub(crate) id: CellId,
    pub(crate) name: ArcStr,
    pub(crate) ports: Ports,
    pub(crate) settings: IndexMap<ArcStr, Value>,
    pub(crate) settings_units: IndexMap<ArcStr, ArcStr>,
    pub(crate) info: IndexMap<ArcStr, Value>,
    pub(crate) locked: bool,
    pub(crate) function_name: Option<ArcStr>,
    pub(crate) basename: Option<ArcStr>,
}

impl KCell {
    pub(crate) fn new(id: CellId, name: ArcStr) -> Self {
        Self {
            id,
            name,
            ports: Ports::new(),
            settings: IndexMap::new(),
            settings_units: IndexMap::new(),
            info: IndexMap::new(),
            locked: false,
            function_name: None,
            basename: None,
        }
    }

    /// The id of the cell in its registry.
    pub fn id(&self) -> CellId {
        self.id
    }

    /// The name of the cell.
    pub fn name(&self) -> &ArcStr {
        &self.name
    }

    /// Whether the cell has been locked.
    pub fn locked(&self) -> bool {
        self.locked
    }

    /// The ports of the cell.
    pub fn ports(&self) -> &Ports {
        &self.ports
    }

    /// A port of the cell, by name.
    pub fn port(&self, name: &str) -> Result<&Port> {
        self.ports.get(name).ok_or_else(|| Error::PortNotFound {
            cell: self.name.clone(),
            port: name.into(),
            available: self.ports.names(),
        })
    }

    /// The settings recorded by the parametric factory.
    pub fn settings(&self) -> &IndexMap<ArcStr, Value> {
        &self.settings
    }

    /// The units recorded alongside the settings.
    pub fn settings_units(&self) -> &IndexMap<ArcStr, ArcStr> {
        &self.settings_units
    }

    /// User metadata. Stays mutable after locking.
    pub fn info(&self) -> &IndexMap<ArcStr, Value> {
        &self.info
    }

    /// Mutable access to the user metadata.
    pub fn info_mut(&mut self) -> &mut IndexMap<ArcStr, Value> {
        &mut self.info
    }

    /// The name of the factory function that produced this cell, if any.
    pub fn function_name(&self) -> Option<&ArcStr> {
        self.function_name.as_ref()
    }

    /// The base name recorded by the factory, if any.
    pub fn basename(&self) -> Option<&ArcStr> {
        self.basename.as_ref()
    }

    /// Creates a new port on the cell.
    ///
    /// Fails with [`Error::Frozen`] on a locked cell and
    /// [`Error::DuplicateName`] if the name is taken.
    pub fn create_port(&mut self, port: Port) -> Result<&Port> {
        self.check_unlocked()?;
        self.ports.create_port(port)
    }

    /// Adds a copy of an existing port, optionally renaming it.
    ///
    /// Used to propagate instance ports onto the parent cell.
    pub fn add_port(&mut self, port: &Port, name: Option<ArcStr>) -> Result<&Port> {
        self.check_unlocked()?;
        self.ports.add_port(port, name)
    }

    pub(crate) fn check_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(Error::Frozen(self.name.clone()))
        } else {
            Ok(())
        }
    }
}
