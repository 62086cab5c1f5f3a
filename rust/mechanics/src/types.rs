// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Core types for gear-train scenes

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Part identity as assigned by the host application.
pub type PartId = u32;

/// Axle group identity. Parts sharing one are rigidly coupled.
pub type AxleGroupId = u32;

/// Distance between neighbouring holes on axles and beams (world units).
pub const HOLE_SPACING: f64 = 20.0;

/// Pitch radius contributed by each tooth of a spur or bevel gear.
pub const PITCH_RADIUS_PER_TOOTH: f64 = 2.0;

/// Mesh radius of a worm screw.
pub const WORM_RADIUS: f64 = 10.0;

/// Collision radius of a drive shaft.
pub const AXLE_RADIUS: f64 = 6.0;

/// Collision radius of a linkage hub.
pub const LINKAGE_RADIUS: f64 = 10.0;

/// Lowest and highest depth layer.
pub const MIN_LAYER: u8 = 1;
pub const MAX_LAYER: u8 = 3;

/// A 2D point (simplified for serialization)
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Point2D {
        Point2D::new(self.x + dx, self.y + dy)
    }
}

/// Rotation sense. Serialized as `1` / `-1` for the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Reverse,
            Direction::Reverse => Direction::Forward,
        }
    }

    pub fn sign(self) -> f64 {
        match self {
            Direction::Forward => 1.0,
            Direction::Reverse => -1.0,
        }
    }
}

impl From<Direction> for i8 {
    fn from(direction: Direction) -> i8 {
        match direction {
            Direction::Forward => 1,
            Direction::Reverse => -1,
        }
    }
}

impl TryFrom<i8> for Direction {
    type Error = Error;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Direction::Forward),
            -1 => Ok(Direction::Reverse),
            other => Err(Error::InvalidDirection(other)),
        }
    }
}

/// Facing of a bevel gear: lying flat, or turned on its side towards one screen edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BevelFacing {
    #[default]
    Flat,
    Up,
    Down,
    Left,
    Right,
}

impl BevelFacing {
    pub fn is_flat(self) -> bool {
        self == BevelFacing::Flat
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, BevelFacing::Left | BevelFacing::Right)
    }

    pub fn is_vertical(self) -> bool {
        matches!(self, BevelFacing::Up | BevelFacing::Down)
    }

    /// Side facings at right angles to each other.
    pub fn is_perpendicular_to(self, other: BevelFacing) -> bool {
        (self.is_horizontal() && other.is_vertical())
            || (self.is_vertical() && other.is_horizontal())
    }
}

/// Discrete lie of a shaft-like part in the plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxleOrientation {
    #[default]
    Horizontal,
    Vertical,
}

impl AxleOrientation {
    /// Placement rotation matching this orientation.
    pub fn degrees(self) -> f64 {
        match self {
            AxleOrientation::Horizontal => 0.0,
            AxleOrientation::Vertical => 90.0,
        }
    }

    /// Orientation for an arbitrary rotation, rounded to the nearer axis.
    pub fn from_degrees(degrees: f64) -> Self {
        let folded = degrees.rem_euclid(180.0);
        if (45.0..135.0).contains(&folded) {
            AxleOrientation::Vertical
        } else {
            AxleOrientation::Horizontal
        }
    }

    /// Unit vector along the shaft.
    pub fn axis(self) -> (f64, f64) {
        match self {
            AxleOrientation::Horizontal => (1.0, 0.0),
            AxleOrientation::Vertical => (0.0, 1.0),
        }
    }
}

/// Outline of a structural linkage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkageShape {
    #[default]
    Straight,
    Bent,
    Cross,
}

/// What a part is. Each variant carries only the attributes that make sense for it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartKind {
    Spur {
        teeth: u32,
    },
    Bevel {
        teeth: u32,
        #[serde(default)]
        facing: BevelFacing,
    },
    Worm {
        #[serde(default)]
        orientation: AxleOrientation,
    },
    Axle {
        /// Length in hole units
        length: u32,
        #[serde(default)]
        orientation: AxleOrientation,
    },
    Linkage {
        #[serde(default)]
        shape: LinkageShape,
    },
}

impl PartKind {
    /// Tooth count. Shafts and linkages have none; a worm is a single-start thread.
    pub fn teeth(&self) -> u32 {
        match *self {
            PartKind::Spur { teeth } | PartKind::Bevel { teeth, .. } => teeth,
            PartKind::Worm { .. } => 1,
            PartKind::Axle { .. } | PartKind::Linkage { .. } => 0,
        }
    }

    /// Radius at which this part engages its neighbours.
    pub fn mesh_radius(&self) -> f64 {
        match *self {
            PartKind::Spur { teeth } | PartKind::Bevel { teeth, .. } => {
                teeth as f64 * PITCH_RADIUS_PER_TOOTH
            }
            PartKind::Worm { .. } => WORM_RADIUS,
            PartKind::Axle { .. } => AXLE_RADIUS,
            PartKind::Linkage { .. } => LINKAGE_RADIUS,
        }
    }

    pub fn is_axle(&self) -> bool {
        matches!(self, PartKind::Axle { .. })
    }

    pub fn is_worm(&self) -> bool {
        matches!(self, PartKind::Worm { .. })
    }

    pub fn is_bevel(&self) -> bool {
        matches!(self, PartKind::Bevel { .. })
    }

    /// Spur gears and bevels lying flat.
    pub fn is_flat(&self) -> bool {
        match self {
            PartKind::Spur { .. } => true,
            PartKind::Bevel { facing, .. } => facing.is_flat(),
            _ => false,
        }
    }

    /// Bevel facing, if this is a bevel gear.
    pub fn bevel_facing(&self) -> Option<BevelFacing> {
        match self {
            PartKind::Bevel { facing, .. } => Some(*facing),
            _ => None,
        }
    }

    /// Toothed parts: spur, bevel and worm.
    pub fn is_gear(&self) -> bool {
        matches!(
            self,
            PartKind::Spur { .. } | PartKind::Bevel { .. } | PartKind::Worm { .. }
        )
    }

    /// Parts that slide onto a shaft through their centre hole.
    pub fn is_mountable(&self) -> bool {
        self.is_flat() || matches!(self, PartKind::Linkage { .. })
    }

    /// Shafts and linkages transmit motion one-to-one instead of through teeth.
    pub fn is_rigid_coupler(&self) -> bool {
        matches!(self, PartKind::Axle { .. } | PartKind::Linkage { .. })
    }

    /// Tooth count used for ratios (toothless parts count as one).
    pub fn ratio_teeth(&self) -> f64 {
        self.teeth().max(1) as f64
    }

    /// Shaft orientation for axles and worms.
    pub fn orientation(&self) -> Option<AxleOrientation> {
        match self {
            PartKind::Worm { orientation } | PartKind::Axle { orientation, .. } => {
                Some(*orientation)
            }
            _ => None,
        }
    }
}

/// Power-source attributes of a motorised part
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motor {
    pub speed: f64,
    pub rpm: f64,
    pub torque: f64,
    #[serde(default)]
    pub direction: Direction,
}

impl Motor {
    pub fn new(rpm: f64, torque: f64, direction: Direction) -> Self {
        Self {
            speed: rpm,
            rpm,
            torque,
            direction,
        }
    }
}

/// Computed motion of a part. Uniform across an axle group.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Kinematics {
    /// Speed ratio relative to the driving motor (0 when undriven)
    pub ratio: f64,
    pub rpm: f64,
    pub torque: f64,
    pub speed: f64,
    pub direction: Direction,
    pub jammed: bool,
    pub stalled: bool,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            ratio: 0.0,
            rpm: 0.0,
            torque: 0.0,
            speed: 0.0,
            direction: Direction::Forward,
            jammed: false,
            stalled: false,
        }
    }
}

impl Kinematics {
    /// State of a group driven directly by `motor`.
    pub fn from_motor(motor: &Motor) -> Self {
        Self {
            ratio: 1.0,
            rpm: motor.rpm,
            torque: motor.torque,
            speed: motor.speed,
            direction: motor.direction,
            jammed: false,
            stalled: false,
        }
    }

    pub fn is_turning(&self) -> bool {
        self.rpm != 0.0
    }
}

fn default_layer() -> u8 {
    MIN_LAYER
}

/// A gear, worm, drive shaft or linkage placed in the scene
///
/// Axles and worms read without an explicit `orientation` take it from
/// `rotation` (0 for horizontal, 90 for vertical).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PartRecord")]
pub struct Part {
    pub id: PartId,
    pub kind: PartKind,
    pub position: Point2D,
    /// Placement rotation in degrees
    #[serde(default)]
    pub rotation: f64,
    /// Depth layer (1..=3)
    #[serde(default = "default_layer")]
    pub layer: u8,
    pub axle_group: AxleGroupId,
    /// Mesh adjacency; rebuilt by the connection detector
    #[serde(default)]
    pub connected_to: Vec<PartId>,
    #[serde(default)]
    pub motor: Option<Motor>,
    /// Resistance in torque units
    #[serde(default)]
    pub load: f64,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub state: Kinematics,
}

impl Part {
    /// Creates a part on layer 1 in an axle group of its own.
    pub fn new(id: PartId, kind: PartKind, position: Point2D) -> Self {
        let rotation = kind.orientation().map_or(0.0, AxleOrientation::degrees);
        Self {
            id,
            kind,
            position,
            rotation,
            layer: MIN_LAYER,
            axle_group: id,
            connected_to: Vec::new(),
            motor: None,
            load: 0.0,
            fixed: false,
            state: Kinematics::default(),
        }
    }

    pub fn spur(id: PartId, teeth: u32, x: f64, y: f64) -> Self {
        Self::new(id, PartKind::Spur { teeth }, Point2D::new(x, y))
    }

    pub fn bevel(id: PartId, teeth: u32, facing: BevelFacing, x: f64, y: f64) -> Self {
        Self::new(id, PartKind::Bevel { teeth, facing }, Point2D::new(x, y))
    }

    pub fn worm(id: PartId, orientation: AxleOrientation, x: f64, y: f64) -> Self {
        Self::new(id, PartKind::Worm { orientation }, Point2D::new(x, y))
    }

    pub fn axle(id: PartId, length: u32, orientation: AxleOrientation, x: f64, y: f64) -> Self {
        Self::new(
            id,
            PartKind::Axle {
                length,
                orientation,
            },
            Point2D::new(x, y),
        )
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_axle_group(mut self, group: AxleGroupId) -> Self {
        self.axle_group = group;
        self
    }

    pub fn with_motor(mut self, motor: Motor) -> Self {
        self.motor = Some(motor);
        self
    }

    pub fn with_load(mut self, load: f64) -> Self {
        self.load = load;
        self
    }

    pub fn radius(&self) -> f64 {
        self.kind.mesh_radius()
    }

    /// Length of a shaft in world units (zero for everything else).
    pub fn span_length(&self) -> f64 {
        match self.kind {
            PartKind::Axle { length, .. } => length as f64 * HOLE_SPACING,
            _ => 0.0,
        }
    }
}

/// Wire form of [`PartKind`] where shaft orientation may be left out.
#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum KindRecord {
    Spur {
        teeth: u32,
    },
    Bevel {
        teeth: u32,
        #[serde(default)]
        facing: BevelFacing,
    },
    Worm {
        #[serde(default)]
        orientation: Option<AxleOrientation>,
    },
    Axle {
        length: u32,
        #[serde(default)]
        orientation: Option<AxleOrientation>,
    },
    Linkage {
        #[serde(default)]
        shape: LinkageShape,
    },
}

impl KindRecord {
    fn resolve(self, rotation: f64) -> PartKind {
        let from_rotation = || AxleOrientation::from_degrees(rotation);
        match self {
            KindRecord::Spur { teeth } => PartKind::Spur { teeth },
            KindRecord::Bevel { teeth, facing } => PartKind::Bevel { teeth, facing },
            KindRecord::Worm { orientation } => PartKind::Worm {
                orientation: orientation.unwrap_or_else(from_rotation),
            },
            KindRecord::Axle {
                length,
                orientation,
            } => PartKind::Axle {
                length,
                orientation: orientation.unwrap_or_else(from_rotation),
            },
            KindRecord::Linkage { shape } => PartKind::Linkage { shape },
        }
    }
}

#[derive(Deserialize)]
struct PartRecord {
    id: PartId,
    kind: KindRecord,
    position: Point2D,
    #[serde(default)]
    rotation: f64,
    #[serde(default = "default_layer")]
    layer: u8,
    axle_group: AxleGroupId,
    #[serde(default)]
    connected_to: Vec<PartId>,
    #[serde(default)]
    motor: Option<Motor>,
    #[serde(default)]
    load: f64,
    #[serde(default)]
    fixed: bool,
    #[serde(default)]
    state: Kinematics,
}

impl From<PartRecord> for Part {
    fn from(record: PartRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind.resolve(record.rotation),
            position: record.position,
            rotation: record.rotation,
            layer: record.layer,
            axle_group: record.axle_group,
            connected_to: record.connected_to,
            motor: record.motor,
            load: record.load,
            fixed: record.fixed,
            state: record.state,
        }
    }
}

/// A belt between two parts. Preserves rotation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Belt {
    pub source: PartId,
    pub target: PartId,
}

impl Belt {
    pub fn new(source: PartId, target: PartId) -> Self {
        Self { source, target }
    }

    pub fn touches(&self, id: PartId) -> bool {
        self.source == id || self.target == id
    }

    /// The far end of the belt as seen from `id`.
    pub fn other_end(&self, id: PartId) -> Option<PartId> {
        if self.source == id {
            Some(self.target)
        } else if self.target == id {
            Some(self.source)
        } else {
            None
        }
    }
}

/// Structural part sub-kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructuralKind {
    /// Flat beam with a hole at every position
    #[default]
    Beam,
    /// Tall brick with holes between its studs
    Brick,
}

impl StructuralKind {
    /// Half the body thickness across the long axis.
    pub fn half_height(self) -> f64 {
        match self {
            StructuralKind::Beam => 8.0,
            StructuralKind::Brick => 12.0,
        }
    }
}

/// Beam or brick. Does not mesh; may act as an obstacle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralPart {
    pub id: PartId,
    #[serde(default)]
    pub kind: StructuralKind,
    /// Hole count for beams, stud count for bricks
    pub length: u32,
    /// Centre of the first hole (beams) or first stud (bricks)
    pub position: Point2D,
    /// 0, 90, 180 or 270 degrees
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub fixed: bool,
    #[serde(default)]
    pub obstacle: bool,
}

impl StructuralPart {
    pub fn beam(id: PartId, length: u32, x: f64, y: f64) -> Self {
        Self {
            id,
            kind: StructuralKind::Beam,
            length,
            position: Point2D::new(x, y),
            rotation: 0.0,
            fixed: false,
            obstacle: false,
        }
    }

    pub fn brick(id: PartId, length: u32, x: f64, y: f64) -> Self {
        Self {
            kind: StructuralKind::Brick,
            ..Self::beam(id, length, x, y)
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_obstacle(mut self, obstacle: bool) -> Self {
        self.obstacle = obstacle;
        self
    }

    /// Hole offsets along the local long axis.
    fn local_hole_offsets(&self) -> Vec<f64> {
        match self.kind {
            StructuralKind::Beam => (0..self.length).map(|i| i as f64 * HOLE_SPACING).collect(),
            StructuralKind::Brick => (0..self.length.saturating_sub(1))
                .map(|i| HOLE_SPACING / 2.0 + i as f64 * HOLE_SPACING)
                .collect(),
        }
    }

    /// Hole centres in world coordinates.
    pub fn hole_positions(&self) -> Vec<Point2D> {
        self.local_hole_offsets()
            .into_iter()
            .map(|offset| {
                crate::geometry::rotate_about(
                    &Point2D::new(offset, 0.0),
                    &self.position,
                    self.rotation,
                )
            })
            .collect()
    }

    /// Corners of the body rectangle in world coordinates, inflated by `padding`.
    ///
    /// Corners are returned in winding order so consecutive pairs form the edges.
    pub fn body_corners(&self, padding: f64) -> [Point2D; 4] {
        let half_hole = HOLE_SPACING / 2.0;
        let min_x = -half_hole - padding;
        let max_x = self.length.saturating_sub(1) as f64 * HOLE_SPACING + half_hole + padding;
        let half_h = self.kind.half_height() + padding;

        [
            Point2D::new(min_x, -half_h),
            Point2D::new(max_x, -half_h),
            Point2D::new(max_x, half_h),
            Point2D::new(min_x, half_h),
        ]
        .map(|corner| crate::geometry::rotate_about(&corner, &self.position, self.rotation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn direction_serializes_as_sign() {
        let json = serde_json::to_string(&Direction::Reverse).unwrap();
        assert_eq!(json, "-1");
        let parsed: Direction = serde_json::from_str("1").unwrap();
        assert_eq!(parsed, Direction::Forward);
        assert!(serde_json::from_str::<Direction>("0").is_err());
    }

    #[test]
    fn derived_teeth_and_radius() {
        assert_eq!(PartKind::Spur { teeth: 10 }.teeth(), 10);
        assert_relative_eq!(PartKind::Spur { teeth: 10 }.mesh_radius(), 20.0);
        let axle = PartKind::Axle {
            length: 4,
            orientation: AxleOrientation::Horizontal,
        };
        assert_eq!(axle.teeth(), 0);
        assert_relative_eq!(axle.ratio_teeth(), 1.0);
        assert!(!axle.is_flat());
        assert!(PartKind::Bevel {
            teeth: 12,
            facing: BevelFacing::Flat
        }
        .is_flat());
        assert!(!PartKind::Bevel {
            teeth: 12,
            facing: BevelFacing::Up
        }
        .is_flat());
    }

    #[test]
    fn orientation_from_rotation() {
        assert_eq!(AxleOrientation::from_degrees(0.0), AxleOrientation::Horizontal);
        assert_eq!(AxleOrientation::from_degrees(90.0), AxleOrientation::Vertical);
        assert_eq!(AxleOrientation::from_degrees(270.0), AxleOrientation::Vertical);
        assert_eq!(AxleOrientation::from_degrees(-180.0), AxleOrientation::Horizontal);
    }

    #[test]
    fn new_axle_takes_orientation_rotation() {
        let axle = Part::axle(1, 3, AxleOrientation::Vertical, 0.0, 0.0);
        assert_relative_eq!(axle.rotation, 90.0);
        assert_eq!(axle.axle_group, 1);
        assert_relative_eq!(axle.span_length(), 60.0);
    }

    #[test]
    fn beam_and_brick_holes() {
        let beam = StructuralPart::beam(1, 3, 100.0, 50.0);
        let holes = beam.hole_positions();
        assert_eq!(holes.len(), 3);
        assert_relative_eq!(holes[2].x, 140.0, epsilon = 1e-9);
        assert_relative_eq!(holes[2].y, 50.0, epsilon = 1e-9);

        let brick = StructuralPart::brick(2, 4, 0.0, 0.0).with_rotation(90.0);
        let holes = brick.hole_positions();
        assert_eq!(holes.len(), 3);
        assert_relative_eq!(holes[0].x, 0.0, epsilon = 1e-9);
        assert_relative_eq!(holes[0].y, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn shaft_orientation_follows_rotation_when_omitted() {
        let json = r#"{"id":1,"kind":{"type":"axle","length":4},"position":{"x":0,"y":0},"rotation":90,"axle_group":1}"#;
        let axle: Part = serde_json::from_str(json).unwrap();
        assert_eq!(axle.kind.orientation(), Some(AxleOrientation::Vertical));

        let json = r#"{"id":2,"kind":{"type":"worm"},"position":{"x":0,"y":0},"rotation":270,"axle_group":2}"#;
        let worm: Part = serde_json::from_str(json).unwrap();
        assert_eq!(worm.kind.orientation(), Some(AxleOrientation::Vertical));

        let json = r#"{"id":3,"kind":{"type":"axle","length":2,"orientation":"horizontal"},"position":{"x":0,"y":0},"rotation":90,"axle_group":3}"#;
        let explicit: Part = serde_json::from_str(json).unwrap();
        assert_eq!(explicit.kind.orientation(), Some(AxleOrientation::Horizontal));
    }

    #[test]
    fn part_json_defaults() {
        let json = r#"{"id":7,"kind":{"type":"spur","teeth":20},"position":{"x":1.0,"y":2.0},"axle_group":7}"#;
        let part: Part = serde_json::from_str(json).unwrap();
        assert_eq!(part.layer, 1);
        assert!(part.motor.is_none());
        assert_eq!(part.state, Kinematics::default());
    }
}
