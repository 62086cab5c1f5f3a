// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tunable tolerances for connection detection, propagation and placement.
//!
//! The defaults are the empirically tuned values the sandbox has always used.
//! Changing them changes simulated behaviour, so they are exposed for
//! experimentation rather than re-derived.

use serde::{Deserialize, Serialize};

/// Distance tolerances used to decide whether two parts engage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionTolerances {
    /// Spur-to-spur: max |distance - (r1 + r2)|. Default: 5.0
    pub spur: f64,
    /// Worm-to-flat: max |distance - (r_flat + r_worm)|. Default: 10.0
    pub worm: f64,
    /// Bevel-to-flat corner: max |distance - (r_flat + offset)|. Default: 12.0
    pub bevel_flat: f64,
    /// Radius a side-on bevel adds to a flat gear it drives. Default: 10.0
    pub bevel_flat_offset: f64,
    /// Lateral slack when checking a bevel's facing. Default: 10.0
    pub bevel_lateral: f64,
    /// Bevel-to-bevel corner: max |distance - sqrt(r1² + r2²)|. Default: 15.0
    pub bevel_pair: f64,
    /// Axle tip to bevel/worm centre. Default: 20.0
    pub axle_tip: f64,
}

impl Default for ConnectionTolerances {
    fn default() -> Self {
        Self {
            spur: 5.0,
            worm: 10.0,
            bevel_flat: 12.0,
            bevel_flat_offset: 10.0,
            bevel_lateral: 10.0,
            bevel_pair: 15.0,
            axle_tip: 20.0,
        }
    }
}

/// Configuration for the kinematic propagator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagationConfig {
    /// Two paths disagreeing on rpm by more than this jam the train. Default: 0.1
    pub rpm_tolerance: f64,
}

impl Default for PropagationConfig {
    fn default() -> Self {
        Self { rpm_tolerance: 0.1 }
    }
}

/// Configuration for snapping, free-spot search and obstacle gates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlacementConfig {
    /// Grid pitch for the fallback snap. Default: 20.0
    pub grid_size: f64,
    /// Distance at which a part stacks onto another centre. Default: 15.0
    pub stack_distance: f64,
    /// How close a gear must lie to a dragged axle's span to mount. Default: 20.0
    pub axle_overlap: f64,
    /// How close a dragged gear must lie to an axle's span to mount. Default: 30.0
    pub axle_span: f64,
    /// Tip docking distance. Default: 20.0
    pub tip_dock: f64,
    /// Mesh snap tolerance for flat pairs. Default: 15.0
    pub mesh_snap: f64,
    /// Mesh snap tolerance when a worm or side-on bevel is involved. Default: 20.0
    pub special_mesh_snap: f64,
    /// Radius a side-on bevel adds to the flat gear it meets. Default: 10.0
    pub bevel_mesh_offset: f64,
    /// Approach angles within this many degrees of an axis snap onto it. Default: 10.0
    pub angle_snap_degrees: f64,
    /// Initial hole snap tolerance. Default: 15.0
    pub hole_snap: f64,
    /// Clearance added around a part when testing obstacle holes. Default: 15.0
    pub collision_padding: f64,
    /// Radius of a hole treated as an obstacle. Default: 17.0
    pub hole_obstacle_radius: f64,
    /// Clearance between parts in the free-spot search. Default: 5.0
    pub free_spot_padding: f64,
    /// Angle increment of the spiral search (radians). Default: 0.5
    pub spiral_step: f64,
    /// Spiral radius gained per radian. Default: 5.0
    pub spiral_growth: f64,
    /// Maximum spiral steps. Default: 200
    pub spiral_max_iterations: usize,
    /// Half-width of the last-resort jitter. Default: 20.0
    pub jitter: f64,
    /// Padding around obstacle bodies for belt checks. Default: 4.0
    pub belt_padding: f64,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            grid_size: 20.0,
            stack_distance: 15.0,
            axle_overlap: 20.0,
            axle_span: 30.0,
            tip_dock: 20.0,
            mesh_snap: 15.0,
            special_mesh_snap: 20.0,
            bevel_mesh_offset: 10.0,
            angle_snap_degrees: 10.0,
            hole_snap: 15.0,
            collision_padding: 15.0,
            hole_obstacle_radius: 17.0,
            free_spot_padding: 5.0,
            spiral_step: 0.5,
            spiral_growth: 5.0,
            spiral_max_iterations: 200,
            jitter: 20.0,
            belt_padding: 4.0,
        }
    }
}

/// All engine settings in one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub connections: ConnectionTolerances,
    pub propagation: PropagationConfig,
    pub placement: PlacementConfig,
}

impl EngineConfig {
    /// Parses a (possibly partial) JSON override on top of the defaults.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
