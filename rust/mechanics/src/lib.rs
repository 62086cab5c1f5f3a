// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # GearTrain-Lite Mechanics
//!
//! Mechanical core of a 2D gear-train sandbox. Hosts own the scene and pass
//! snapshots in; every operation returns new values and keeps no state.
//!
//! - [`connections`] rebuilds the mesh adjacency from geometry.
//! - [`physics`] propagates speed, torque and direction from motors.
//! - [`placement`] snaps dropped parts and gates edits against obstacles.
//! - [`scene`] packages the edit, detect, propagate cycle for hosts.
//!
//! ## Example
//!
//! ```rust
//! use geartrain_lite_mechanics::{propagate_physics, recalculate_connections};
//! use geartrain_lite_mechanics::types::{Direction, Motor, Part};
//!
//! let parts = vec![
//!     Part::spur(1, 10, 0.0, 0.0).with_motor(Motor::new(60.0, 100.0, Direction::Forward)),
//!     Part::spur(2, 20, 60.0, 0.0),
//! ];
//! let parts = propagate_physics(&recalculate_connections(&parts), &[]);
//! assert_eq!(parts[1].state.rpm, 30.0);
//! ```

pub mod config;
pub mod connections;
pub mod error;
pub mod geometry;
pub mod physics;
pub mod placement;
pub mod scene;
pub mod types;

pub use config::{ConnectionTolerances, EngineConfig, PlacementConfig, PropagationConfig};
pub use connections::{
    classify_pair, recalculate_connections, recalculate_connections_with, ConnectionGraph,
    Coupling,
};
pub use error::{Error, Result};
pub use physics::{
    propagate, propagate_physics, propagate_physics_with, DrivetrainReport, Propagation,
};
pub use placement::{
    check_belt_obstruction, check_belt_obstruction_with, check_collision, check_collision_with,
    find_free_spot, find_free_spot_with, resolve_snap, snap_brick, snap_brick_with, snap_gear,
    snap_gear_with, Snap, SnapRule,
};
pub use scene::{Evaluation, Scene};
pub use types::{
    AxleGroupId, AxleOrientation, Belt, BevelFacing, Direction, Kinematics, LinkageShape, Motor,
    Part, PartId, PartKind, Point2D, StructuralKind, StructuralPart,
};
