//! Error types and error handling utilities.

use arcstr::ArcStr;

/// A result type returning framework errors.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for framework operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A cell or port name collision without `allow_duplicate`.
    #[error("name `{0}` already exists")]
    DuplicateName(ArcStr),
    /// A mutation was attempted on a locked cell.
    #[error("cell `{0}` is locked and can no longer be modified")]
    Frozen(ArcStr),
    /// Port widths differ at `connect`.
    #[error(
        "width mismatch between the ports {cell}[\"{port}\"] and {other_cell}[\"{other_port}\"] \
         ({width}/{other_width})"
    )]
    PortWidthMismatch {
        /// The cell owning the port being connected.
        cell: ArcStr,
        /// The port being connected.
        port: ArcStr,
        /// The cell (or `"Port"`) owning the target port.
        other_cell: ArcStr,
        /// The target port.
        other_port: ArcStr,
        /// Width of the port being connected, in dbu.
        width: i64,
        /// Width of the target port, in dbu.
        other_width: i64,
    },
    /// Port layers differ at `connect`.
    #[error(
        "layer mismatch between the ports {cell}[\"{port}\"] and {other_cell}[\"{other_port}\"] \
         ({layer}/{other_layer})"
    )]
    PortLayerMismatch {
        /// The cell owning the port being connected.
        cell: ArcStr,
        /// The port being connected.
        port: ArcStr,
        /// The cell (or `"Port"`) owning the target port.
        other_cell: ArcStr,
        /// The target port.
        other_port: ArcStr,
        /// Layer of the port being connected.
        layer: String,
        /// Layer of the target port.
        other_layer: String,
    },
    /// Port types differ at `connect`.
    #[error(
        "type mismatch between the ports {cell}[\"{port}\"] and {other_cell}[\"{other_port}\"] \
         ({port_type}/{other_port_type})"
    )]
    PortTypeMismatch {
        /// The cell owning the port being connected.
        cell: ArcStr,
        /// The port being connected.
        port: ArcStr,
        /// The cell (or `"Port"`) owning the target port.
        other_cell: ArcStr,
        /// The target port.
        other_port: ArcStr,
        /// Type of the port being connected.
        port_type: ArcStr,
        /// Type of the target port.
        other_port_type: ArcStr,
    },
    /// A port lookup failed.
    #[error("`{port}` is not a port of `{cell}`. Available ports: {available:?}")]
    PortNotFound {
        /// The cell searched.
        cell: ArcStr,
        /// The requested port name.
        port: ArcStr,
        /// The names of the ports that do exist.
        available: Vec<ArcStr>,
    },
    /// A cell lookup failed.
    #[error("no cell named `{0}`")]
    CellNotFound(ArcStr),
    /// A negative length or width where auto-flipping is not applicable.
    #[error("negative geometry: {0}")]
    NegativeGeometry(String),
    /// A step sequence or router input was invalid.
    #[error("invalid routing input: {0}")]
    Routing(String),
    /// One or more placers failed to realize their backbones.
    #[error(transparent)]
    Placer(#[from] crate::routing::generic::PlacerError),
    /// Routes collide; raised after report generation.
    #[error("routing collision in {0}")]
    RoutingCollision(ArcStr),
    /// A cross-section spec failed validation.
    #[error("invalid cross section: {0}")]
    CrossSection(String),
    /// An error from the layout backend.
    #[error(transparent)]
    Backend(#[from] laydb::Error),
}
