// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Placement: where a dropped part settles, and whether it may go there.
//!
//! Snapping tries a fixed ladder of rules and the first one that matches
//! wins:
//!
//! 1. centre stacking onto another part
//! 2. mounting along a drive shaft
//! 3. docking onto a shaft tip
//! 4. meshing at the ideal distance from another gear
//! 5. aligning with a structural hole
//! 6. the 20-unit grid
//!
//! None of the functions here fail. The collision and belt gates are
//! predicates; hosts consult them and keep the previous snapshot on refusal.

use std::f64::consts::FRAC_PI_2;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::config::PlacementConfig;
use crate::geometry::{
    angle_between, axle_tips, project_onto_segment, round_to_grid, segments_intersect,
};
use crate::types::{Part, PartKind, Point2D, StructuralPart, HOLE_SPACING};

/// Which rule decided a snap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapRule {
    Stack,
    AxleMount,
    TipDock,
    Mesh,
    Hole,
    Grid,
}

/// Resting place chosen for a part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Snap {
    pub position: Point2D,
    pub rule: SnapRule,
}

impl Snap {
    /// Moves `part` here. Shafts and worms also get their rotation
    /// normalised to their orientation.
    pub fn apply(&self, part: &Part) -> Part {
        let mut snapped = part.clone();
        snapped.position = self.position;
        if let Some(orientation) = part.kind.orientation() {
            snapped.rotation = orientation.degrees();
        }
        snapped
    }
}

/// A candidate position and how far the part has to travel to reach it.
type Candidate = (Point2D, f64);

fn nearest(candidates: impl Iterator<Item = Candidate>) -> Option<Point2D> {
    candidates
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(point, _)| point)
}

/// Offset of the shaft hole nearest to `along`, measured from the shaft centre.
///
/// Holes sit every [`HOLE_SPACING`] units, symmetric about the centre.
fn nearest_hole_offset(length: u32, along: f64) -> f64 {
    let last = length.max(1) - 1;
    let first = -(last as f64) * HOLE_SPACING / 2.0;
    let k = ((along - first) / HOLE_SPACING)
        .round()
        .clamp(0.0, last as f64);
    first + k * HOLE_SPACING
}

fn shaft_length(part: &Part) -> u32 {
    match part.kind {
        PartKind::Axle { length, .. } => length,
        _ => 0,
    }
}

/// Where `point` lands on `axle`: signed offset from the centre and the
/// perpendicular distance, or `None` if it falls beyond either end.
fn position_along(axle: &Part, point: &Point2D) -> Option<(f64, f64)> {
    let [start, end] = axle_tips(axle)?;
    let projection = project_onto_segment(point, &start, &end);
    if !projection.is_within_span() {
        return None;
    }
    let along = (projection.t - 0.5) * axle.span_length();
    Some((along, projection.distance))
}

fn stack_target(part: &Part, others: &[&Part], config: &PlacementConfig) -> Option<Point2D> {
    nearest(
        others
            .iter()
            .map(|other| (other.position, part.position.distance_to(&other.position)))
            .filter(|(_, d)| *d < config.stack_distance),
    )
}

fn mount_target(part: &Part, others: &[&Part], config: &PlacementConfig) -> Option<Point2D> {
    if part.kind.is_axle() {
        // Slide the dragged shaft so one of its holes lands on a gear centre
        let (ax, ay) = part.kind.orientation()?.axis();
        let length = shaft_length(part);
        return nearest(others.iter().filter(|o| o.kind.is_mountable()).filter_map(|other| {
            let (along, off) = position_along(part, &other.position)?;
            if off >= config.axle_overlap {
                return None;
            }
            let hole = nearest_hole_offset(length, along);
            Some((other.position.offset(-ax * hole, -ay * hole), off))
        }));
    }

    if !part.kind.is_mountable() {
        return None;
    }
    nearest(others.iter().filter(|o| o.kind.is_axle()).filter_map(|axle| {
        let (along, off) = position_along(axle, &part.position)?;
        if off >= config.axle_span {
            return None;
        }
        let (ax, ay) = axle.kind.orientation()?.axis();
        let hole = nearest_hole_offset(shaft_length(axle), along);
        Some((axle.position.offset(ax * hole, ay * hole), off))
    }))
}

fn dock_target(part: &Part, others: &[&Part], config: &PlacementConfig) -> Option<Point2D> {
    if let Some(tips) = axle_tips(part) {
        return nearest(
            others
                .iter()
                .filter(|o| !o.kind.is_axle())
                .flat_map(|other| tips.iter().map(move |tip| (other, tip)))
                .filter_map(|(other, tip)| {
                    let d = tip.distance_to(&other.position);
                    (d < config.tip_dock).then(|| {
                        let shifted = part
                            .position
                            .offset(other.position.x - tip.x, other.position.y - tip.y);
                        (shifted, d)
                    })
                }),
        );
    }

    nearest(
        others
            .iter()
            .filter_map(|o| axle_tips(o))
            .flatten()
            .map(|tip| (tip, part.position.distance_to(&tip)))
            .filter(|(_, d)| *d < config.tip_dock),
    )
}

/// Ideal centre distance between two gears and the snap tolerance for it.
fn ideal_mesh(a: &PartKind, b: &PartKind, config: &PlacementConfig) -> Option<(f64, f64)> {
    let (ra, rb) = (a.mesh_radius(), b.mesh_radius());

    if a.is_flat() && b.is_flat() {
        return Some((ra + rb, config.mesh_snap));
    }
    if (a.is_worm() && b.is_flat()) || (b.is_worm() && a.is_flat()) {
        return Some((ra + rb, config.special_mesh_snap));
    }

    match (a.bevel_facing(), b.bevel_facing()) {
        (Some(fa), _) if !fa.is_flat() && b.is_flat() => {
            Some((rb + config.bevel_mesh_offset, config.special_mesh_snap))
        }
        (_, Some(fb)) if !fb.is_flat() && a.is_flat() => {
            Some((ra + config.bevel_mesh_offset, config.special_mesh_snap))
        }
        (Some(fa), Some(fb)) if fa.is_perpendicular_to(fb) => {
            Some(((ra * ra + rb * rb).sqrt(), config.special_mesh_snap))
        }
        _ => None,
    }
}

/// Unit approach direction, pulled onto the nearest axis when close enough.
///
/// Axis directions are exact so snapped positions carry no rounding residue.
fn approach_direction(from: &Point2D, to: &Point2D, config: &PlacementConfig) -> (f64, f64) {
    let (dx, dy) = (to.x - from.x, to.y - from.y);
    let len = (dx * dx + dy * dy).sqrt();
    if len < 1e-9 {
        return (1.0, 0.0);
    }
    let quarter = (dy.atan2(dx) / FRAC_PI_2).round() as i32;
    let axis = match quarter.rem_euclid(4) {
        0 => (1.0, 0.0),
        1 => (0.0, 1.0),
        2 => (-1.0, 0.0),
        _ => (0.0, -1.0),
    };
    if angle_between((dx, dy), axis).to_degrees() <= config.angle_snap_degrees {
        axis
    } else {
        (dx / len, dy / len)
    }
}

fn mesh_target(part: &Part, others: &[&Part], config: &PlacementConfig) -> Option<Point2D> {
    if !part.kind.is_gear() {
        return None;
    }
    others
        .iter()
        .filter(|o| o.kind.is_gear() && o.layer == part.layer)
        .filter_map(|other| {
            let (ideal, tolerance) = ideal_mesh(&part.kind, &other.kind, config)?;
            let d = part.position.distance_to(&other.position);
            ((d - ideal).abs() < tolerance).then_some((other, ideal, d))
        })
        .min_by(|a, b| a.2.total_cmp(&b.2))
        .map(|(other, ideal, _)| {
            let (ux, uy) = approach_direction(&other.position, &part.position, config);
            other.position.offset(ideal * ux, ideal * uy)
        })
}

fn hole_target(
    part: &Part,
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> Option<Point2D> {
    let mut tolerance = config.hole_snap;
    let mut best = None;
    for hole in structures.iter().flat_map(StructuralPart::hole_positions) {
        let d = part.position.distance_to(&hole);
        if d < tolerance {
            tolerance = d;
            best = Some(hole);
        }
    }
    best
}

/// Runs the snap ladder and reports which rule decided.
pub fn resolve_snap(
    part: &Part,
    others: &[Part],
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> Snap {
    let candidates: Vec<&Part> = others
        .iter()
        .filter(|o| o.id != part.id && o.axle_group != part.axle_group)
        .collect();

    let snap = |position, rule| Snap { position, rule };
    if let Some(p) = stack_target(part, &candidates, config) {
        return snap(p, SnapRule::Stack);
    }
    if let Some(p) = mount_target(part, &candidates, config) {
        return snap(p, SnapRule::AxleMount);
    }
    if let Some(p) = dock_target(part, &candidates, config) {
        return snap(p, SnapRule::TipDock);
    }
    if let Some(p) = mesh_target(part, &candidates, config) {
        return snap(p, SnapRule::Mesh);
    }
    if let Some(p) = hole_target(part, structures, config) {
        return snap(p, SnapRule::Hole);
    }
    snap(round_to_grid(&part.position, config.grid_size), SnapRule::Grid)
}

/// Snaps a dropped part with the default configuration.
pub fn snap_gear(part: &Part, others: &[Part], structures: &[StructuralPart]) -> Part {
    snap_gear_with(part, others, structures, &PlacementConfig::default())
}

/// Snaps a dropped part.
///
/// Shafts and worms come back with their rotation normalised to their
/// orientation.
pub fn snap_gear_with(
    part: &Part,
    others: &[Part],
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> Part {
    let snap = resolve_snap(part, others, structures, config);
    tracing::trace!(part = part.id, rule = ?snap.rule, "snapped");
    snap.apply(part)
}

/// Snaps a structural part with the default configuration.
pub fn snap_brick(part: &StructuralPart) -> StructuralPart {
    snap_brick_with(part, &PlacementConfig::default())
}

/// Rounds a structural part onto the grid.
pub fn snap_brick_with(part: &StructuralPart, config: &PlacementConfig) -> StructuralPart {
    StructuralPart {
        position: round_to_grid(&part.position, config.grid_size),
        ..part.clone()
    }
}

/// Whether a part placed at `(x, y)` would sit on an obstacle's holes.
pub fn check_collision(part: &Part, x: f64, y: f64, structures: &[StructuralPart]) -> bool {
    check_collision_with(part, x, y, structures, &PlacementConfig::default())
}

pub fn check_collision_with(
    part: &Part,
    x: f64,
    y: f64,
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> bool {
    let at = Point2D::new(x, y);
    let reach = part.radius() + config.collision_padding + config.hole_obstacle_radius;
    structures
        .iter()
        .filter(|s| s.obstacle)
        .flat_map(StructuralPart::hole_positions)
        .any(|hole| at.distance_to(&hole) < reach)
}

/// Whether a belt between `a` and `b` would cut through an obstacle.
pub fn check_belt_obstruction(a: &Part, b: &Part, structures: &[StructuralPart]) -> bool {
    check_belt_obstruction_with(a, b, structures, &PlacementConfig::default())
}

pub fn check_belt_obstruction_with(
    a: &Part,
    b: &Part,
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> bool {
    structures.iter().filter(|s| s.obstacle).any(|structure| {
        let corners = structure.body_corners(config.belt_padding);
        (0..corners.len()).any(|i| {
            let next = corners[(i + 1) % corners.len()];
            segments_intersect(&a.position, &b.position, &corners[i], &next)
        })
    })
}

/// Finds a spot near `(x, y)` where a part of `radius` fits, with the default configuration.
pub fn find_free_spot(
    x: f64,
    y: f64,
    radius: f64,
    parts: &[Part],
    structures: &[StructuralPart],
) -> Point2D {
    find_free_spot_with(x, y, radius, parts, structures, &PlacementConfig::default())
}

/// Finds a spot near `(x, y)` where a part of `radius` fits.
///
/// Tries the preferred point, then walks an outward spiral. If the spiral
/// finds nothing the result is a jitter around the preferred point, seeded
/// from the query so the same input always lands in the same place.
pub fn find_free_spot_with(
    x: f64,
    y: f64,
    radius: f64,
    parts: &[Part],
    structures: &[StructuralPart],
    config: &PlacementConfig,
) -> Point2D {
    let holes: Vec<Point2D> = structures
        .iter()
        .flat_map(StructuralPart::hole_positions)
        .collect();

    let is_clear = |p: &Point2D| {
        parts
            .iter()
            .all(|o| p.distance_to(&o.position) >= radius + o.radius() + config.free_spot_padding)
            && holes
                .iter()
                .all(|h| p.distance_to(h) >= radius + config.hole_obstacle_radius)
    };

    let preferred = Point2D::new(x, y);
    if is_clear(&preferred) {
        return preferred;
    }

    for i in 1..=config.spiral_max_iterations {
        let angle = i as f64 * config.spiral_step;
        let r = config.spiral_growth * angle;
        let candidate = preferred.offset(r * angle.cos(), r * angle.sin());
        if is_clear(&candidate) {
            return candidate;
        }
    }

    tracing::debug!(x, y, radius, "spiral search exhausted, jittering");
    let seed = x.to_bits() ^ y.to_bits().rotate_left(32) ^ radius.to_bits().rotate_left(16);
    let mut rng = StdRng::seed_from_u64(seed);
    let jitter = config.jitter.abs();
    preferred.offset(
        rng.random_range(-jitter..=jitter),
        rng.random_range(-jitter..=jitter),
    )
}
