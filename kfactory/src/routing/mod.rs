//! The Manhattan router and placer pipeline.

pub mod collisions;
pub mod electrical;
pub mod generic;
pub mod manhattan;
pub mod steps;

pub use collisions::{check_collisions, collision_report};
pub use generic::{route_bundle, ManhattanRoute, Placer, PlacerError};
pub use manhattan::{get_radius, route_manhattan, route_smart, ManhattanRouter};
pub use steps::Step;
