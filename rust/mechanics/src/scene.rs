// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Scene snapshots and the edit gates hosts run around them.
//!
//! Every edit takes `&self` and returns a new scene, so a refused edit leaves
//! the caller holding its previous snapshot.

use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::connections::recalculate_connections_with;
use crate::error::{Error, Result};
use crate::physics::{propagate, DrivetrainReport};
use crate::placement::{check_belt_obstruction_with, check_collision_with};
use crate::types::{Belt, Part, PartId, Point2D, StructuralPart, MAX_LAYER, MIN_LAYER};

/// A recomputed scene together with its drivetrain summary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scene: Scene,
    pub drivetrains: Vec<DrivetrainReport>,
}

/// Everything placed on the board
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(default)]
    pub belts: Vec<Belt>,
    #[serde(default)]
    pub structures: Vec<StructuralPart>,
}

impl Scene {
    pub fn new(parts: Vec<Part>, belts: Vec<Belt>, structures: Vec<StructuralPart>) -> Self {
        Self {
            parts,
            belts,
            structures,
        }
    }

    /// Parses and validates a scene.
    pub fn from_json(json: &str) -> Result<Self> {
        let scene: Scene = serde_json::from_str(json)?;
        scene.validate()?;
        Ok(scene)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    fn require(&self, id: PartId) -> Result<&Part> {
        self.part(id).ok_or(Error::UnknownPart(id))
    }

    /// Checks ids, layers and belt endpoints.
    pub fn validate(&self) -> Result<()> {
        let mut seen = FxHashSet::default();
        for part in &self.parts {
            if !seen.insert(part.id) {
                return Err(Error::DuplicatePartId(part.id));
            }
            if !(MIN_LAYER..=MAX_LAYER).contains(&part.layer) {
                return Err(Error::InvalidLayer {
                    id: part.id,
                    layer: part.layer,
                });
            }
        }

        for belt in &self.belts {
            if belt.source == belt.target {
                return Err(Error::SelfBelt(belt.source));
            }
            for end in [belt.source, belt.target] {
                if !seen.contains(&end) {
                    return Err(Error::UnknownPart(end));
                }
            }
        }
        Ok(())
    }

    /// Rebuilds adjacency and kinematics, keeping the drivetrain report.
    pub fn evaluate(&self, config: &EngineConfig) -> Evaluation {
        let connected = recalculate_connections_with(&self.parts, &config.connections);
        let result = propagate(&connected, &self.belts, &config.propagation);
        Evaluation {
            scene: Scene {
                parts: result.parts,
                belts: self.belts.clone(),
                structures: self.structures.clone(),
            },
            drivetrains: result.drivetrains,
        }
    }

    /// Rebuilds adjacency and kinematics.
    pub fn recompute(&self, config: &EngineConfig) -> Scene {
        self.evaluate(config).scene
    }

    /// Per-motor drivetrain summary of the current layout.
    pub fn drivetrains(&self, config: &EngineConfig) -> Vec<DrivetrainReport> {
        self.evaluate(config).drivetrains
    }

    /// Moves a part, dragging the rest of its axle group by the same delta.
    ///
    /// Refused when any member is fixed or would land on an obstacle.
    pub fn move_part(&self, id: PartId, to: Point2D, config: &EngineConfig) -> Result<Scene> {
        let part = self.require(id)?;
        let group = part.axle_group;
        let (dx, dy) = (to.x - part.position.x, to.y - part.position.y);

        let mut moved = self.clone();
        for member in moved.parts.iter_mut().filter(|p| p.axle_group == group) {
            if member.fixed {
                return Err(Error::FixedPart(member.id));
            }
            let target = member.position.offset(dx, dy);
            if check_collision_with(
                member,
                target.x,
                target.y,
                &self.structures,
                &config.placement,
            ) {
                tracing::debug!(part = member.id, x = target.x, y = target.y, "move blocked");
                return Err(Error::Blocked(member.id));
            }
            member.position = target;
        }
        Ok(moved.recompute(config))
    }

    /// Adds a belt unless it loops, dangles or crosses an obstacle.
    pub fn add_belt(&self, belt: Belt, config: &EngineConfig) -> Result<Scene> {
        if belt.source == belt.target {
            return Err(Error::SelfBelt(belt.source));
        }
        let source = self.require(belt.source)?;
        let target = self.require(belt.target)?;
        if check_belt_obstruction_with(source, target, &self.structures, &config.placement) {
            return Err(Error::BeltObstructed {
                source_id: belt.source,
                target_id: belt.target,
            });
        }

        let mut next = self.clone();
        let duplicate = self
            .belts
            .iter()
            .any(|b| b.touches(belt.source) && b.other_end(belt.source) == Some(belt.target));
        if !duplicate {
            next.belts.push(belt);
        }
        Ok(next.recompute(config))
    }

    /// Deletes a part and any belt attached to it.
    ///
    /// Adjacency lists are purged of the id; kinematics are left as they
    /// were until the next [`recompute`](Self::recompute).
    pub fn remove_part(&self, id: PartId) -> Result<Scene> {
        if self.require(id)?.fixed {
            return Err(Error::FixedPart(id));
        }

        let parts = self
            .parts
            .iter()
            .filter(|p| p.id != id)
            .cloned()
            .map(|mut p| {
                p.connected_to.retain(|&other| other != id);
                p
            })
            .collect();
        let belts = self.belts.iter().filter(|b| !b.touches(id)).copied().collect();

        Ok(Scene {
            parts,
            belts,
            structures: self.structures.clone(),
        })
    }
}
