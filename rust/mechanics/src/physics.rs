// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Kinematic propagation from motors through meshes, shafts and belts.
//!
//! The model is ratio based, not time stepped:
//!
//! - Axle groups are rigid: all members share one state.
//! - Each motor seeds its group and is the root of a drivetrain.
//! - A breadth-first walk carries speed, torque and direction across mesh
//!   edges (direction reverses) and belts (direction kept), scaled by the
//!   tooth ratio. Shafts and linkages couple one-to-one.
//! - A second path reaching an already driven group with a different rpm or
//!   direction jams both groups.
//! - Afterwards, a drivetrain whose load exceeds the available torque
//!   anywhere stalls as a whole.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::PropagationConfig;
use crate::types::{AxleGroupId, Belt, Kinematics, Part, PartId, PartKind};

/// Partition of parts into rigid axle groups.
///
/// Group indices follow the order in which each group id first appears.
#[derive(Debug, Clone)]
pub struct AxleGroups {
    keys: Vec<AxleGroupId>,
    members: Vec<Vec<usize>>,
    group_of: Vec<usize>,
}

impl AxleGroups {
    /// Groups parts by their axle group id.
    pub fn from_parts(parts: &[Part]) -> Self {
        let mut lookup: FxHashMap<AxleGroupId, usize> = FxHashMap::default();
        let mut keys = Vec::new();
        let mut members: Vec<Vec<usize>> = Vec::new();
        let mut group_of = Vec::with_capacity(parts.len());

        for (i, part) in parts.iter().enumerate() {
            let group = *lookup.entry(part.axle_group).or_insert_with(|| {
                keys.push(part.axle_group);
                members.push(Vec::new());
                keys.len() - 1
            });
            members[group].push(i);
            group_of.push(group);
        }

        Self {
            keys,
            members,
            group_of,
        }
    }

    /// Returns the number of groups.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Part indices belonging to a group.
    pub fn members(&self, group: usize) -> &[usize] {
        &self.members[group]
    }

    /// Group index of a part index.
    pub fn group_of(&self, part: usize) -> usize {
        self.group_of[part]
    }

    /// Axle group id of a group index.
    pub fn key(&self, group: usize) -> AxleGroupId {
        self.keys[group]
    }
}

/// How motion crosses an edge
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Link {
    Mesh,
    Belt,
}

/// Motion carried across one edge from `from` to `to`.
fn transfer(input: &Kinematics, from: &PartKind, to: &PartKind, link: Link) -> Kinematics {
    let (speed_ratio, torque_ratio) = if from.is_rigid_coupler() || to.is_rigid_coupler() {
        (1.0, 1.0)
    } else {
        let teeth_in = from.ratio_teeth();
        let teeth_out = to.ratio_teeth();
        (teeth_in / teeth_out, teeth_out / teeth_in)
    };

    let direction = match link {
        Link::Mesh => input.direction.reversed(),
        Link::Belt => input.direction,
    };

    Kinematics {
        ratio: input.ratio * speed_ratio,
        rpm: input.rpm * speed_ratio,
        torque: input.torque * torque_ratio,
        speed: input.speed * speed_ratio,
        direction,
        jammed: false,
        stalled: false,
    }
}

fn jam(state: &mut Kinematics) {
    state.jammed = true;
    state.rpm = 0.0;
    state.speed = 0.0;
}

/// One unit of pending work in the breadth-first walk
#[derive(Debug, Clone, Copy)]
struct Frontier {
    group: usize,
    drivetrain: usize,
}

/// Axle groups transitively driven by one motor
#[derive(Debug, Clone)]
struct Drivetrain {
    motor: PartId,
    reachable: Vec<usize>,
}

/// Summary of one motor's drivetrain after propagation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrivetrainReport {
    /// The motor part rooting this drivetrain
    pub motor: PartId,
    /// Axle groups it drives, starting with the motor's own
    pub axle_groups: Vec<AxleGroupId>,
    /// Any group in the drivetrain is jammed
    pub jammed: bool,
    /// The drivetrain stalled under load
    pub stalled: bool,
}

/// Result of a propagation pass
#[derive(Debug, Clone)]
pub struct Propagation {
    /// Parts with recomputed kinematics
    pub parts: Vec<Part>,
    /// One entry per motor group
    pub drivetrains: Vec<DrivetrainReport>,
}

/// Neighbours reachable over belts, keyed by part id.
fn belt_links(belts: &[Belt]) -> FxHashMap<PartId, SmallVec<[PartId; 2]>> {
    let mut links: FxHashMap<PartId, SmallVec<[PartId; 2]>> = FxHashMap::default();
    for belt in belts {
        if belt.source == belt.target {
            continue;
        }
        links.entry(belt.source).or_default().push(belt.target);
        links.entry(belt.target).or_default().push(belt.source);
    }
    links
}

/// Recomputes every part's kinematics with the default configuration.
///
/// `connected_to` must already be up to date (see
/// [`recalculate_connections`](crate::connections::recalculate_connections)).
pub fn propagate_physics(parts: &[Part], belts: &[Belt]) -> Vec<Part> {
    propagate(parts, belts, &PropagationConfig::default()).parts
}

/// Recomputes every part's kinematics.
pub fn propagate_physics_with(
    parts: &[Part],
    belts: &[Belt],
    config: &PropagationConfig,
) -> Vec<Part> {
    propagate(parts, belts, config).parts
}

/// Recomputes every part's kinematics and reports each drivetrain.
pub fn propagate(parts: &[Part], belts: &[Belt], config: &PropagationConfig) -> Propagation {
    let mut parts: Vec<Part> = parts.to_vec();
    for part in &mut parts {
        part.state = Kinematics::default();
    }

    let groups = AxleGroups::from_parts(&parts);
    let index: FxHashMap<PartId, usize> =
        parts.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
    let belt_links = belt_links(belts);

    let mut state = vec![Kinematics::default(); groups.len()];
    let mut visited = vec![false; groups.len()];
    let mut drivetrains: Vec<Drivetrain> = Vec::new();
    let mut worklist: VecDeque<Frontier> = VecDeque::new();

    // Seed every motor group
    for group in 0..groups.len() {
        let motor = groups
            .members(group)
            .iter()
            .find_map(|&i| parts[i].motor.map(|m| (parts[i].id, m)));
        if let Some((motor_id, motor)) = motor {
            state[group] = Kinematics::from_motor(&motor);
            visited[group] = true;
            drivetrains.push(Drivetrain {
                motor: motor_id,
                reachable: vec![group],
            });
            worklist.push_back(Frontier {
                group,
                drivetrain: drivetrains.len() - 1,
            });
        }
    }

    while let Some(Frontier { group, drivetrain }) = worklist.pop_front() {
        for &member in groups.members(group) {
            let source = &parts[member];
            let meshes = source.connected_to.iter().map(|&id| (id, Link::Mesh));
            let belted = belt_links
                .get(&source.id)
                .into_iter()
                .flatten()
                .map(|&id| (id, Link::Belt));

            for (neighbor_id, link) in meshes.chain(belted) {
                let Some(&target) = index.get(&neighbor_id) else {
                    tracing::trace!(part = source.id, neighbor_id, "skipping unknown neighbour");
                    continue;
                };
                let target_group = groups.group_of(target);
                if target_group == group {
                    continue;
                }

                let next = transfer(&state[group], &source.kind, &parts[target].kind, link);

                if !visited[target_group] {
                    state[target_group] = next;
                    visited[target_group] = true;
                    drivetrains[drivetrain].reachable.push(target_group);
                    worklist.push_back(Frontier {
                        group: target_group,
                        drivetrain,
                    });
                } else {
                    let recorded = &state[target_group];
                    if (next.rpm - recorded.rpm).abs() > config.rpm_tolerance
                        || next.direction != recorded.direction
                    {
                        tracing::debug!(
                            from = groups.key(group),
                            to = groups.key(target_group),
                            "conflicting paths jam the train"
                        );
                        jam(&mut state[group]);
                        jam(&mut state[target_group]);
                    }
                }
            }
        }
    }

    // Stall is decided per drivetrain, on the rpm values that survived jamming
    let stalled: Vec<bool> = drivetrains
        .iter()
        .map(|train| {
            train.reachable.iter().any(|&g| {
                state[g].is_turning()
                    && groups
                        .members(g)
                        .iter()
                        .any(|&i| parts[i].load > state[g].torque)
            })
        })
        .collect();

    for (train, _) in drivetrains.iter().zip(&stalled).filter(|(_, s)| **s) {
        tracing::debug!(motor = train.motor, groups = train.reachable.len(), "drivetrain stalled");
        for &g in &train.reachable {
            if !state[g].jammed {
                state[g].rpm = 0.0;
                state[g].speed = 0.0;
                state[g].stalled = true;
            }
        }
    }

    for (i, part) in parts.iter_mut().enumerate() {
        part.state = state[groups.group_of(i)];
    }

    let drivetrains = drivetrains
        .iter()
        .zip(stalled)
        .map(|(train, stalled)| DrivetrainReport {
            motor: train.motor,
            axle_groups: train.reachable.iter().map(|&g| groups.key(g)).collect(),
            jammed: train.reachable.iter().any(|&g| state[g].jammed),
            stalled,
        })
        .collect();

    tracing::debug!(
        parts = parts.len(),
        groups = groups.len(),
        driven = visited.iter().filter(|&&v| v).count(),
        "propagated kinematics"
    );

    Propagation { parts, drivetrains }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connections::recalculate_connections;
    use crate::types::{AxleOrientation, BevelFacing, Direction, Motor};
    use approx::assert_relative_eq;

    fn motor(rpm: f64, torque: f64) -> Motor {
        Motor::new(rpm, torque, Direction::Forward)
    }

    fn run(parts: Vec<Part>, belts: &[Belt]) -> Vec<Part> {
        propagate_physics(&recalculate_connections(&parts), belts)
    }

    fn by_id(parts: &[Part], id: PartId) -> &Part {
        parts.iter().find(|p| p.id == id).unwrap()
    }

    #[test]
    fn axle_groups_partition_in_first_seen_order() {
        let parts = vec![
            Part::spur(1, 10, 0.0, 0.0).with_axle_group(7),
            Part::spur(2, 10, 0.0, 0.0).with_axle_group(3),
            Part::spur(3, 10, 0.0, 0.0).with_axle_group(7),
        ];
        let groups = AxleGroups::from_parts(&parts);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups.key(0), 7);
        assert_eq!(groups.members(0), &[0, 2]);
        assert_eq!(groups.group_of(1), 1);
    }

    #[test]
    fn mesh_reduces_speed_and_reverses() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 20, 60.0, 0.0),
            ],
            &[],
        );
        let driven = by_id(&parts, 2);
        assert_relative_eq!(driven.state.rpm, 30.0);
        assert_relative_eq!(driven.state.ratio, 0.5);
        assert_relative_eq!(driven.state.torque, 200.0);
        assert_eq!(driven.state.direction, Direction::Reverse);
        assert_relative_eq!(by_id(&parts, 1).state.ratio, 1.0);
    }

    #[test]
    fn belt_keeps_direction() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 10, 300.0, 0.0),
            ],
            &[Belt::new(2, 1)],
        );
        let driven = by_id(&parts, 2);
        assert_relative_eq!(driven.state.rpm, 60.0);
        assert_eq!(driven.state.direction, Direction::Forward);
    }

    #[test]
    fn compound_gear_shares_axle() {
        // 1 (10t) → 2 (20t) ≡ 3 (10t, layer 2) → 4 (20t, layer 2)
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 20, 60.0, 0.0).with_axle_group(50),
                Part::spur(3, 10, 60.0, 0.0).with_axle_group(50).with_layer(2),
                Part::spur(4, 20, 120.0, 0.0).with_layer(2),
            ],
            &[],
        );
        assert_relative_eq!(by_id(&parts, 3).state.rpm, 30.0);
        assert_eq!(by_id(&parts, 3).state.direction, Direction::Reverse);
        assert_relative_eq!(by_id(&parts, 4).state.rpm, 15.0);
        assert_relative_eq!(by_id(&parts, 4).state.ratio, 0.25);
        assert_eq!(by_id(&parts, 4).state.direction, Direction::Forward);
    }

    #[test]
    fn axle_tip_couples_one_to_one() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0)
                    .with_layer(2)
                    .with_motor(motor(60.0, 100.0)),
                Part::spur(2, 20, 60.0, 0.0).with_layer(2).with_axle_group(9),
                Part::axle(3, 4, AxleOrientation::Horizontal, 60.0, 0.0).with_axle_group(9),
                Part::bevel(4, 12, BevelFacing::Right, 100.0, 0.0),
            ],
            &[],
        );
        let bevel = by_id(&parts, 4);
        assert_eq!(bevel.connected_to, vec![3]);
        assert_relative_eq!(bevel.state.rpm, 30.0);
        assert_relative_eq!(bevel.state.torque, 200.0);
        assert_eq!(bevel.state.direction, Direction::Forward);
    }

    #[test]
    fn worm_gives_large_reduction() {
        let parts = run(
            vec![
                Part::worm(1, AxleOrientation::Horizontal, 0.0, 0.0).with_motor(motor(200.0, 10.0)),
                Part::spur(2, 20, 0.0, 50.0),
            ],
            &[],
        );
        let wheel = by_id(&parts, 2);
        assert_relative_eq!(wheel.state.rpm, 10.0);
        assert_relative_eq!(wheel.state.torque, 200.0);
    }

    #[test]
    fn unpowered_parts_stay_neutral() {
        let mut stale = Part::spur(2, 10, 500.0, 0.0);
        stale.state.rpm = 99.0;
        stale.state.jammed = true;
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                stale,
            ],
            &[],
        );
        assert_eq!(by_id(&parts, 2).state, Kinematics::default());
    }

    #[test]
    fn opposing_motors_jam() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 10, 40.0, 0.0).with_motor(motor(60.0, 100.0)),
            ],
            &[],
        );
        for part in &parts {
            assert!(part.state.jammed);
            assert_eq!(part.state.rpm, 0.0);
        }
    }

    #[test]
    fn agreeing_paths_do_not_jam() {
        // 2 and 3 both mesh with 1 and turn the same way, so the belt between them agrees
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 10, 40.0, 0.0),
                Part::spur(3, 10, -40.0, 0.0),
            ],
            &[Belt::new(2, 3)],
        );
        for part in &parts {
            assert!(!part.state.jammed);
        }
        assert_relative_eq!(by_id(&parts, 3).state.rpm, 60.0);
    }

    #[test]
    fn overload_stalls_whole_drivetrain() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 20, 60.0, 0.0).with_load(250.0),
                Part::spur(3, 10, 120.0, 0.0),
                Part::spur(4, 10, 400.0, 0.0),
            ],
            &[],
        );
        for id in 1..=3 {
            let part = by_id(&parts, id);
            assert!(part.state.stalled, "part {id} should stall");
            assert_eq!(part.state.rpm, 0.0);
            assert!(!part.state.jammed);
        }
        assert!(!by_id(&parts, 4).state.stalled);
    }

    #[test]
    fn load_within_torque_keeps_running() {
        let parts = run(
            vec![
                Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
                Part::spur(2, 20, 60.0, 0.0).with_load(150.0),
            ],
            &[],
        );
        assert_relative_eq!(by_id(&parts, 2).state.rpm, 30.0);
        assert!(!by_id(&parts, 2).state.stalled);
    }

    #[test]
    fn report_lists_drivetrains() {
        let parts = recalculate_connections(&[
            Part::spur(1, 10, 0.0, 0.0).with_motor(motor(60.0, 100.0)),
            Part::spur(2, 20, 60.0, 0.0).with_axle_group(20),
            Part::spur(3, 10, 500.0, 0.0).with_motor(motor(30.0, 5.0)).with_load(10.0),
        ]);
        let result = propagate(&parts, &[], &PropagationConfig::default());
        assert_eq!(result.drivetrains.len(), 2);
        assert_eq!(result.drivetrains[0].motor, 1);
        assert_eq!(result.drivetrains[0].axle_groups, vec![1, 20]);
        assert!(!result.drivetrains[0].stalled);
        assert!(result.drivetrains[1].stalled);
    }
}
