// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JSON-level entry points behind [`GearTrainAPI`](crate::GearTrainAPI).
//!
//! These take and return plain strings and the core `Result`, so they run
//! natively as well as under wasm.

use geartrain_lite_mechanics::{
    check_belt_obstruction_with, check_collision_with, find_free_spot_with,
    propagate_physics_with, recalculate_connections_with, snap_brick_with, snap_gear_with, Belt,
    EngineConfig, Part, Point2D, Result, Scene, StructuralPart,
};

fn parts_from(json: &str) -> Result<Vec<Part>> {
    Ok(serde_json::from_str(json)?)
}

fn belts_from(json: &str) -> Result<Vec<Belt>> {
    Ok(serde_json::from_str(json)?)
}

fn structures_from(json: &str) -> Result<Vec<StructuralPart>> {
    Ok(serde_json::from_str(json)?)
}

fn part_from(json: &str) -> Result<Part> {
    Ok(serde_json::from_str(json)?)
}

pub fn recalculate_connections(config: &EngineConfig, parts_json: &str) -> Result<String> {
    let parts = recalculate_connections_with(&parts_from(parts_json)?, &config.connections);
    Ok(serde_json::to_string(&parts)?)
}

pub fn propagate_physics(
    config: &EngineConfig,
    parts_json: &str,
    belts_json: &str,
) -> Result<String> {
    let parts = propagate_physics_with(
        &parts_from(parts_json)?,
        &belts_from(belts_json)?,
        &config.propagation,
    );
    Ok(serde_json::to_string(&parts)?)
}

/// Validates a scene, then runs detection and propagation on it.
pub fn evaluate_scene(config: &EngineConfig, scene_json: &str) -> Result<String> {
    let scene = Scene::from_json(scene_json)?;
    Ok(serde_json::to_string(&scene.evaluate(config))?)
}

pub fn find_free_spot(
    config: &EngineConfig,
    x: f64,
    y: f64,
    radius: f64,
    parts_json: &str,
    structures_json: &str,
) -> Result<Point2D> {
    Ok(find_free_spot_with(
        x,
        y,
        radius,
        &parts_from(parts_json)?,
        &structures_from(structures_json)?,
        &config.placement,
    ))
}

pub fn check_collision(
    config: &EngineConfig,
    part_json: &str,
    x: f64,
    y: f64,
    structures_json: &str,
) -> Result<bool> {
    Ok(check_collision_with(
        &part_from(part_json)?,
        x,
        y,
        &structures_from(structures_json)?,
        &config.placement,
    ))
}

pub fn check_belt_obstruction(
    config: &EngineConfig,
    a_json: &str,
    b_json: &str,
    structures_json: &str,
) -> Result<bool> {
    Ok(check_belt_obstruction_with(
        &part_from(a_json)?,
        &part_from(b_json)?,
        &structures_from(structures_json)?,
        &config.placement,
    ))
}

pub fn snap_gear(
    config: &EngineConfig,
    part_json: &str,
    others_json: &str,
    structures_json: &str,
) -> Result<String> {
    let snapped = snap_gear_with(
        &part_from(part_json)?,
        &parts_from(others_json)?,
        &structures_from(structures_json)?,
        &config.placement,
    );
    Ok(serde_json::to_string(&snapped)?)
}

pub fn snap_brick(config: &EngineConfig, part_json: &str) -> Result<String> {
    let part: StructuralPart = serde_json::from_str(part_json)?;
    Ok(serde_json::to_string(&snap_brick_with(&part, &config.placement))?)
}

/// Signed rpm per part, in input order (negative when turning in reverse).
pub fn rpms(parts_json: &str) -> Result<Vec<f64>> {
    Ok(parts_from(parts_json)?
        .iter()
        .map(|p| p.state.rpm * p.state.direction.sign())
        .collect())
}
