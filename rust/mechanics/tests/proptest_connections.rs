// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Property-based tests for connection detection and propagation.
//!
//! Run with: cargo test -p geartrain-lite-mechanics -- proptest

use geartrain_lite_mechanics::types::{AxleOrientation, BevelFacing, Kinematics};
use geartrain_lite_mechanics::{
    propagate_physics, recalculate_connections, Belt, Direction, Motor, Part, PartKind, Point2D,
};
use proptest::prelude::*;

// =============================================================================
// Strategies
// =============================================================================

fn arb_facing() -> impl Strategy<Value = BevelFacing> {
    prop_oneof![
        Just(BevelFacing::Flat),
        Just(BevelFacing::Up),
        Just(BevelFacing::Down),
        Just(BevelFacing::Left),
        Just(BevelFacing::Right),
    ]
}

fn arb_orientation() -> impl Strategy<Value = AxleOrientation> {
    prop_oneof![Just(AxleOrientation::Horizontal), Just(AxleOrientation::Vertical)]
}

fn arb_kind() -> impl Strategy<Value = PartKind> {
    prop_oneof![
        3 => (8u32..=40).prop_map(|teeth| PartKind::Spur { teeth }),
        1 => (8u32..=24, arb_facing()).prop_map(|(teeth, facing)| PartKind::Bevel { teeth, facing }),
        1 => arb_orientation().prop_map(|orientation| PartKind::Worm { orientation }),
        1 => (1u32..=6, arb_orientation())
            .prop_map(|(length, orientation)| PartKind::Axle { length, orientation }),
    ]
}

/// Parts packed into a small area so that plenty of them engage.
fn arb_parts(max: usize) -> impl Strategy<Value = Vec<Part>> {
    prop::collection::vec(
        (
            arb_kind(),
            -150.0..150.0f64,
            -150.0..150.0f64,
            1u8..=2,
            0u32..4,
            prop::bool::weighted(0.2),
            0.0..300.0f64,
        ),
        1..=max,
    )
    .prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (kind, x, y, layer, shared, powered, load))| {
                let id = i as u32 + 1;
                // Roughly a third of the parts share a shaft with another
                let group = if shared == 0 { 1000 + (id % 3) } else { id };
                let mut part = Part::new(id, kind, Point2D::new(x, y))
                    .with_layer(layer)
                    .with_axle_group(group)
                    .with_load(load);
                if powered {
                    part = part.with_motor(Motor::new(60.0, 150.0, Direction::Forward));
                }
                part
            })
            .collect()
    })
}

fn arb_belts(max_id: u32) -> impl Strategy<Value = Vec<Belt>> {
    prop::collection::vec((1..=max_id, 1..=max_id), 0..4).prop_map(|pairs| {
        pairs
            .into_iter()
            .filter(|(a, b)| a != b)
            .map(|(a, b)| Belt::new(a, b))
            .collect()
    })
}

// =============================================================================
// Property Tests: Connection detection
// =============================================================================

proptest! {
    /// Every mesh edge is recorded at both ends.
    #[test]
    fn adjacency_is_symmetric(parts in arb_parts(24)) {
        let parts = recalculate_connections(&parts);
        for p in &parts {
            for &q in &p.connected_to {
                let other = parts.iter().find(|o| o.id == q);
                prop_assert!(other.is_some());
                prop_assert!(other.unwrap().connected_to.contains(&p.id));
            }
        }
    }

    /// Running detection twice yields the same adjacency.
    #[test]
    fn adjacency_is_idempotent(parts in arb_parts(24)) {
        let once = recalculate_connections(&parts);
        let twice = recalculate_connections(&once);
        for (a, b) in once.iter().zip(&twice) {
            prop_assert_eq!(&a.connected_to, &b.connected_to);
        }
    }

    /// Parts never mesh with themselves, their shaft mates, or other layers.
    #[test]
    fn no_edges_within_group_or_across_layers(parts in arb_parts(24)) {
        let parts = recalculate_connections(&parts);
        for p in &parts {
            for &q in &p.connected_to {
                let other = parts.iter().find(|o| o.id == q).unwrap();
                prop_assert_ne!(other.id, p.id);
                prop_assert_ne!(other.axle_group, p.axle_group);
                prop_assert_eq!(other.layer, p.layer);
            }
        }
    }
}

// =============================================================================
// Property Tests: Propagation
// =============================================================================

proptest! {
    /// Members of one axle group always share one state.
    #[test]
    fn axle_groups_move_together(parts in arb_parts(20), belts in arb_belts(20)) {
        let parts = propagate_physics(&recalculate_connections(&parts), &belts);
        for a in &parts {
            for b in parts.iter().filter(|b| b.axle_group == a.axle_group) {
                prop_assert_eq!(a.state, b.state);
            }
        }
    }

    /// A group is never reported both jammed and stalled, and neither state turns.
    #[test]
    fn jam_and_stall_are_exclusive(parts in arb_parts(20), belts in arb_belts(20)) {
        let parts = propagate_physics(&recalculate_connections(&parts), &belts);
        for p in &parts {
            prop_assert!(!(p.state.jammed && p.state.stalled));
            if p.state.jammed || p.state.stalled {
                prop_assert_eq!(p.state.rpm, 0.0);
            }
        }
    }

    /// Without a motor nothing moves.
    #[test]
    fn unpowered_scene_is_neutral(parts in arb_parts(20), belts in arb_belts(20)) {
        let parts: Vec<Part> = parts
            .into_iter()
            .map(|mut p| {
                p.motor = None;
                p
            })
            .collect();
        let parts = propagate_physics(&recalculate_connections(&parts), &belts);
        for p in &parts {
            prop_assert_eq!(p.state, Kinematics::default());
        }
    }
}
