//! Browser entry points over a process-wide [`GameRegistry`].
//!
//! Errors cross the boundary as `{ code, message }` objects so the UI can react
//! to the reason code without parsing text.

use once_cell::sync::Lazy;
use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::error::GameError;
use crate::registry::{GameRegistry, parse_game_id};
use crate::snapshot::GameSnapshot;

static REGISTRY: Lazy<GameRegistry> = Lazy::new(GameRegistry::default);

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

fn to_js_error(err: GameError) -> JsValue {
    let body = ErrorBody {
        code: err.code(),
        message: err.to_string(),
    };
    serde_wasm_bindgen::to_value(&body).unwrap_or_else(|_| JsValue::from_str(&body.message))
}

fn to_js<T: Serialize>(value: &T) -> Result<JsValue, JsValue> {
    serde_wasm_bindgen::to_value(value).map_err(JsValue::from)
}

#[wasm_bindgen]
pub fn create_game(player1: &str, player2: &str) -> Result<String, JsValue> {
    REGISTRY
        .create_game(player1, player2)
        .map(|id| id.to_string())
        .map_err(to_js_error)
}

#[wasm_bindgen]
pub fn get_game_state(game_id: &str) -> Result<JsValue, JsValue> {
    let id = parse_game_id(game_id).map_err(to_js_error)?;
    let state = REGISTRY.game_state(&id).map_err(to_js_error)?;
    to_js(&state)
}

#[wasm_bindgen]
pub fn make_move(game_id: &str, row: i32, col: i32) -> Result<JsValue, JsValue> {
    let id = parse_game_id(game_id).map_err(to_js_error)?;
    let state = REGISTRY.make_move(&id, row, col).map_err(to_js_error)?;
    to_js(&state)
}

#[wasm_bindgen]
pub fn remove_game(game_id: &str) -> Result<bool, JsValue> {
    let id = parse_game_id(game_id).map_err(to_js_error)?;
    REGISTRY.remove(&id).map_err(to_js_error)
}

/// Binary snapshot of a game, for saving in browser storage.
#[wasm_bindgen]
pub fn export_game(game_id: &str) -> Result<Vec<u8>, JsValue> {
    let id = parse_game_id(game_id).map_err(to_js_error)?;
    let snapshot = REGISTRY.snapshot(&id).map_err(to_js_error)?;
    snapshot
        .to_bytes()
        .map_err(|err| to_js_error(GameError::from(err)))
}

/// Registers a game saved with [`export_game`] and returns its new id.
#[wasm_bindgen]
pub fn import_game(bytes: &[u8]) -> Result<String, JsValue> {
    let snapshot = GameSnapshot::from_bytes(bytes).map_err(|err| to_js_error(err.into()))?;
    REGISTRY
        .restore(&snapshot)
        .map(|id| id.to_string())
        .map_err(to_js_error)
}
