//! A programmatic layout framework for photonic and electronic circuits.
//!
//! The framework composes hierarchical cell-based geometries on layered
//! substrates. Its core is the cell/port/instance hierarchy owned by a
//! [`KCLayout`](layout::KCLayout) registry with deduplicating
//! parametric-cell caches, and the Manhattan bundle router with its
//! pluggable placer pipeline.
//!
//! Cells are created through the registry, populated with shapes, ports,
//! and instances, and locked on publication by a
//! [`CellFactory`](factory::CellFactory). Routing takes two equal-length
//! port sequences on a target cell, plans non-crossing axis-aligned
//! backbones, and materializes them as wire polygons or bend/straight
//! instance chains.

pub mod cells;
pub mod cross_section;
pub mod error;
pub mod factory;
pub mod instance;
pub mod kcell;
pub mod layers;
pub mod layout;
pub mod port;
pub mod routing;
pub mod settings;

pub use error::{Error, Result};
pub use factory::CellFactory;
pub use instance::{ConnectOptions, ConnectTarget, Instance};
pub use kcell::KCell;
pub use layers::{LayerInfos, LayerMap};
pub use layout::KCLayout;
pub use port::{rename_clockwise, Port, PortTrans, Ports};
pub use settings::Value;
