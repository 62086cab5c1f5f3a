// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! JavaScript API for the gear-train core
//!
//! Parts, belts and structural parts cross the boundary as JSON strings; the
//! host keeps the canonical collections and swaps in whatever comes back.

use geartrain_lite_mechanics::{EngineConfig, Error};
use wasm_bindgen::prelude::*;

use crate::bridge;

fn js_error(context: &str, e: Error) -> JsError {
    JsError::new(&format!("{}: {}", context, e))
}

/// Connection detection, propagation and placement for one sandbox
#[wasm_bindgen]
pub struct GearTrainAPI {
    config: EngineConfig,
}

impl Default for GearTrainAPI {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl GearTrainAPI {
    /// Create a new GearTrainAPI instance with default tolerances
    #[wasm_bindgen(constructor)]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    /// Override configuration from (possibly partial) JSON
    #[wasm_bindgen(js_name = setConfig)]
    pub fn set_config(&mut self, config_json: &str) -> Result<(), JsError> {
        self.config =
            EngineConfig::from_json(config_json).map_err(|e| js_error("Invalid config JSON", e))?;
        Ok(())
    }

    /// Get current configuration as JSON
    #[wasm_bindgen(js_name = getConfig)]
    pub fn get_config(&self) -> String {
        serde_json::to_string(&self.config).unwrap_or_else(|_| "{}".to_string())
    }

    /// Rebuild every part's mesh adjacency
    ///
    /// # Returns
    ///
    /// JSON array of parts with fresh `connected_to` lists
    #[wasm_bindgen(js_name = recalculateConnections)]
    pub fn recalculate_connections(&self, parts_json: &str) -> Result<String, JsError> {
        bridge::recalculate_connections(&self.config, parts_json)
            .map_err(|e| js_error("Connection detection failed", e))
    }

    /// Propagate motion from motors through meshes, shafts and belts
    ///
    /// Expects adjacency from `recalculateConnections`.
    #[wasm_bindgen(js_name = propagatePhysics)]
    pub fn propagate_physics(&self, parts_json: &str, belts_json: &str) -> Result<String, JsError> {
        bridge::propagate_physics(&self.config, parts_json, belts_json)
            .map_err(|e| js_error("Propagation failed", e))
    }

    /// Validate and recompute a whole scene
    ///
    /// # Returns
    ///
    /// JSON `{ scene, drivetrains }`
    #[wasm_bindgen(js_name = evaluateScene)]
    pub fn evaluate_scene(&self, scene_json: &str) -> Result<String, JsError> {
        bridge::evaluate_scene(&self.config, scene_json)
            .map_err(|e| js_error("Scene evaluation failed", e))
    }

    /// Find a spot near the preferred point where a part of `radius` fits
    ///
    /// # Returns
    ///
    /// `{ x, y }`
    #[wasm_bindgen(js_name = findFreeSpot)]
    pub fn find_free_spot(
        &self,
        x: f64,
        y: f64,
        radius: f64,
        parts_json: &str,
        structures_json: &str,
    ) -> Result<JsValue, JsError> {
        let spot = bridge::find_free_spot(&self.config, x, y, radius, parts_json, structures_json)
            .map_err(|e| js_error("Invalid input", e))?;
        serde_wasm_bindgen::to_value(&spot)
            .map_err(|e| JsError::new(&format!("Serialization error: {}", e)))
    }

    /// Whether the part placed at `(x, y)` would sit on an obstacle
    #[wasm_bindgen(js_name = checkCollision)]
    pub fn check_collision(
        &self,
        part_json: &str,
        x: f64,
        y: f64,
        structures_json: &str,
    ) -> Result<bool, JsError> {
        bridge::check_collision(&self.config, part_json, x, y, structures_json)
            .map_err(|e| js_error("Invalid input", e))
    }

    /// Whether a belt between the two parts would cross an obstacle
    #[wasm_bindgen(js_name = checkBeltObstruction)]
    pub fn check_belt_obstruction(
        &self,
        a_json: &str,
        b_json: &str,
        structures_json: &str,
    ) -> Result<bool, JsError> {
        bridge::check_belt_obstruction(&self.config, a_json, b_json, structures_json)
            .map_err(|e| js_error("Invalid input", e))
    }

    /// Resolve where a dropped part settles
    #[wasm_bindgen(js_name = snapGear)]
    pub fn snap_gear(
        &self,
        part_json: &str,
        others_json: &str,
        structures_json: &str,
    ) -> Result<String, JsError> {
        bridge::snap_gear(&self.config, part_json, others_json, structures_json)
            .map_err(|e| js_error("Snap failed", e))
    }

    /// Round a beam or brick onto the grid
    ///
    /// `others_json` is accepted so callers can pass the rest of the scene,
    /// but structural parts never mesh and it is not read.
    #[wasm_bindgen(js_name = snapBrick)]
    pub fn snap_brick(
        &self,
        part_json: &str,
        _others_json: Option<String>,
    ) -> Result<String, JsError> {
        bridge::snap_brick(&self.config, part_json).map_err(|e| js_error("Snap failed", e))
    }

    /// Signed rpm per part for the renderer (negative turns in reverse)
    #[wasm_bindgen(js_name = getRpms)]
    pub fn get_rpms(&self, parts_json: &str) -> Result<js_sys::Float64Array, JsError> {
        let rpms = bridge::rpms(parts_json).map_err(|e| js_error("Invalid parts JSON", e))?;
        Ok(js_sys::Float64Array::from(&rpms[..]))
    }
}
