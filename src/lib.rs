use wasm_bindgen::prelude::*;

pub mod board;
pub mod config;
pub mod error;
pub mod game;
pub mod registry;
pub mod snapshot;
pub mod types;
pub mod wasm;

pub use error::GameError;
pub use game::Game;
pub use registry::{GameId, GameRegistry};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    console_error_panic_hook::set_once();
    true
}
