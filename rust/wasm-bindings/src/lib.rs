// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! GearTrain-Lite WebAssembly Bindings
//!
//! JavaScript/TypeScript API for the gear-train core built with wasm-bindgen.

use wasm_bindgen::prelude::*;

mod api;
pub mod bridge;

pub use api::GearTrainAPI;

/// Routes panics to the browser console when the hook feature is on.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

/// Get the version of GearTrain-Lite
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
