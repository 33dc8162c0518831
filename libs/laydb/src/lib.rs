//! A minimal layout-primitives backend.
//!
//! `laydb` owns the raw geometry database: a [`Layout`] with a dbu, a layer
//! table, and a set of raw cells holding shapes, texts, and child instances.
//! It also provides the [`Region`](region::Region) boolean helpers and the
//! [`ReportDatabase`](rdb::ReportDatabase) used to surface per-layer issues.
//!
//! The cell/port framework built on top never touches files or shape
//! storage directly; any backend satisfying this crate's surface could be
//! substituted.

pub mod layout;
pub mod rdb;
pub mod region;

pub use layout::{
    CellId, CellInst, InstTrans, Layout, LayerIndex, LayerInfo, RawCell, SaveOptions, Shapes, Text,
};
pub use rdb::{RdbCategoryId, RdbCellId, RdbItemId, RdbValue, ReportDatabase};
pub use region::Region;

/// A result type returning backend errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for backend operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A cell with this name already exists in the layout.
    #[error("cell name `{0}` already exists in the layout")]
    DuplicateCellName(arcstr::ArcStr),
    /// No cell with the given name or id.
    #[error("no cell named `{0}`")]
    CellNotFound(arcstr::ArcStr),
    /// Instantiating the cell would create a cycle in the hierarchy.
    #[error("instantiating `{child}` inside `{parent}` would create a cycle")]
    CyclicHierarchy {
        /// The cell being instantiated.
        child: arcstr::ArcStr,
        /// The cell the instance was to be placed in.
        parent: arcstr::ArcStr,
    },
    /// An I/O error while reading or writing a layout file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A malformed layout file.
    #[error("layout format error: {0}")]
    Format(#[from] serde_json::Error),
    /// The file was produced by a newer, unsupported format version.
    #[error("unsupported layout format version {0}")]
    UnsupportedVersion(u32),
}
