// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Connection detection: which parts physically engage.
//!
//! The mesh graph is derived from geometry alone. Every call scans all pairs
//! (O(n²)) and rebuilds the adjacency from scratch, so it can never drift
//! from the current layout. Pairs are classified by these rules, in this
//! order, the first applicable one deciding:
//!
//! 1. Spur-to-spur (both flat)
//! 2. Worm-to-flat
//! 3. Side-on bevel to flat gear (corner drive)
//! 4. Side-on bevel to perpendicular side-on bevel
//! 5. Axle tip to bevel or worm
//!
//! Parts in the same axle group, or on different layers, never mesh.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::config::ConnectionTolerances;
use crate::geometry::axle_tips;
use crate::types::{BevelFacing, Part, PartId, Point2D};

/// How two parts engage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coupling {
    /// Two flat gears meshing side by side
    Spur,
    /// A worm screw driving a flat gear
    WormDrive,
    /// A side-on bevel meshing with a flat gear at a right angle
    BevelCorner,
    /// Two side-on bevels meshing at a right angle
    BevelPair,
    /// A drive shaft whose tip enters a bevel or worm
    AxleTip,
}

/// Classifies the relationship between two parts.
///
/// Returns `None` if they do not engage.
pub fn classify_pair(a: &Part, b: &Part, tol: &ConnectionTolerances) -> Option<Coupling> {
    if a.axle_group == b.axle_group || a.layer != b.layer {
        return None;
    }

    let d = a.position.distance_to(&b.position);
    let (ka, kb) = (&a.kind, &b.kind);

    // Rule 1: spur-to-spur
    if ka.is_flat() && kb.is_flat() {
        let ideal = a.radius() + b.radius();
        return ((d - ideal).abs() < tol.spur).then_some(Coupling::Spur);
    }

    // Rule 2: worm-to-flat
    if ka.is_worm() != kb.is_worm() {
        let (worm, other) = if ka.is_worm() { (a, b) } else { (b, a) };
        if other.kind.is_flat() {
            let ideal = other.radius() + worm.radius();
            return ((d - ideal).abs() < tol.worm).then_some(Coupling::WormDrive);
        }
    }

    // Rule 3: side-on bevel to flat gear
    let side_bevel = |p: &Part| p.kind.bevel_facing().filter(|f| !f.is_flat());
    let corner = match (side_bevel(a), side_bevel(b)) {
        (Some(facing), None) if kb.is_flat() => Some((a, facing, b)),
        (None, Some(facing)) if ka.is_flat() => Some((b, facing, a)),
        _ => None,
    };
    if let Some((bevel, facing, flat)) = corner {
        let ideal = flat.radius() + tol.bevel_flat_offset;
        let engaged = (d - ideal).abs() < tol.bevel_flat
            && facing_matches(facing, &bevel.position, &flat.position, tol.bevel_lateral);
        return engaged.then_some(Coupling::BevelCorner);
    }

    // Rule 4: bevel-to-bevel corner
    if let (Some(fa), Some(fb)) = (side_bevel(a), side_bevel(b)) {
        if fa.is_perpendicular_to(fb) {
            let ideal = (a.radius().powi(2) + b.radius().powi(2)).sqrt();
            return ((d - ideal).abs() < tol.bevel_pair).then_some(Coupling::BevelPair);
        }
    }

    // Rule 5: axle tip into a bevel or worm
    if ka.is_axle() != kb.is_axle() {
        let (axle, other) = if ka.is_axle() { (a, b) } else { (b, a) };
        if other.kind.is_bevel() || other.kind.is_worm() {
            let docked = axle_tips(axle).is_some_and(|tips| {
                tips.iter()
                    .any(|tip| tip.distance_to(&other.position) < tol.axle_tip)
            });
            return docked.then_some(Coupling::AxleTip);
        }
    }

    None
}

/// Whether a flat gear sits on the side a bevel faces.
///
/// A bevel facing up drives a gear below it (screen y grows downward), within
/// `lateral` units of its vertical centre line; the other facings mirror that.
fn facing_matches(facing: BevelFacing, bevel: &Point2D, flat: &Point2D, lateral: f64) -> bool {
    let dx = flat.x - bevel.x;
    let dy = flat.y - bevel.y;
    match facing {
        BevelFacing::Up => dy > 0.0 && dx.abs() <= lateral,
        BevelFacing::Down => dy < 0.0 && dx.abs() <= lateral,
        BevelFacing::Left => dx > 0.0 && dy.abs() <= lateral,
        BevelFacing::Right => dx < 0.0 && dy.abs() <= lateral,
        BevelFacing::Flat => false,
    }
}

/// Immutable mesh graph derived from one snapshot of parts.
///
/// Node indices follow the order of the input slice.
#[derive(Debug, Clone)]
pub struct ConnectionGraph {
    ids: Vec<PartId>,
    index: FxHashMap<PartId, usize>,
    adjacency: Vec<SmallVec<[(usize, Coupling); 4]>>,
    edge_count: usize,
}

impl ConnectionGraph {
    /// Scans every pair of parts and records the ones that engage.
    pub fn build(parts: &[Part], tol: &ConnectionTolerances) -> Self {
        let n = parts.len();
        let mut adjacency: Vec<SmallVec<[(usize, Coupling); 4]>> = vec![SmallVec::new(); n];
        let mut edge_count = 0;

        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(coupling) = classify_pair(&parts[i], &parts[j], tol) {
                    tracing::trace!(a = parts[i].id, b = parts[j].id, ?coupling, "parts engage");
                    adjacency[i].push((j, coupling));
                    adjacency[j].push((i, coupling));
                    edge_count += 1;
                }
            }
        }

        let ids: Vec<PartId> = parts.iter().map(|p| p.id).collect();
        let index = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        tracing::debug!(parts = n, edges = edge_count, "rebuilt connection graph");

        Self {
            ids,
            index,
            adjacency,
            edge_count,
        }
    }

    /// Returns the number of parts.
    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    /// Returns the number of engaged pairs.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    /// Returns the node index for a part id.
    pub fn node_index(&self, id: PartId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Returns adjacent node indices. Out-of-range nodes have none.
    pub fn neighbors(&self, node: usize) -> impl Iterator<Item = usize> + '_ {
        self.adjacency
            .get(node)
            .into_iter()
            .flatten()
            .map(|&(neighbor, _)| neighbor)
    }

    /// Returns the ids of the parts meshing with `node`.
    pub fn neighbor_ids(&self, node: usize) -> Vec<PartId> {
        self.neighbors(node).map(|n| self.ids[n]).collect()
    }

    /// Returns how two parts engage, if they do.
    pub fn coupling(&self, a: PartId, b: PartId) -> Option<Coupling> {
        let (ia, ib) = (self.node_index(a)?, self.node_index(b)?);
        self.adjacency[ia]
            .iter()
            .find(|&&(neighbor, _)| neighbor == ib)
            .map(|&(_, coupling)| coupling)
    }

    /// Returns the degree (number of meshing partners) of a node, 0 if out of range.
    pub fn degree(&self, node: usize) -> usize {
        self.adjacency.get(node).map_or(0, |edges| edges.len())
    }
}

/// Rebuilds every part's `connected_to` list with the default tolerances.
pub fn recalculate_connections(parts: &[Part]) -> Vec<Part> {
    recalculate_connections_with(parts, &ConnectionTolerances::default())
}

/// Rebuilds every part's `connected_to` list from scratch.
pub fn recalculate_connections_with(parts: &[Part], tol: &ConnectionTolerances) -> Vec<Part> {
    let graph = ConnectionGraph::build(parts, tol);
    parts
        .iter()
        .enumerate()
        .map(|(i, part)| Part {
            connected_to: graph.neighbor_ids(i),
            ..part.clone()
        })
        .collect()
}
