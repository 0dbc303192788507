use wasm_bindgen::JsValue;
use web_sys::{Location, Window};

use syncboard_shared::BoardId;

pub fn websocket_url(window: &Window) -> Result<String, JsValue> {
    let location = window.location();
    let protocol = location.protocol()?;
    let host = location.host()?;
    let scheme = if protocol == "https:" { "wss" } else { "ws" };
    Ok(format!("{scheme}://{host}/ws"))
}

/// Board named by a `/b/{id}` path, if the id is well formed.
pub fn board_id_from_location(location: &Location) -> Option<BoardId> {
    let path = location.pathname().ok()?;
    board_id_from_path(&path)
}

pub fn board_id_from_path(path: &str) -> Option<BoardId> {
    let mut parts = path.trim_matches('/').split('/');
    if parts.next()? != "b" {
        return None;
    }
    let board_id = BoardId::parse(parts.next()?)?;
    if parts.next().is_some() {
        return None;
    }
    Some(board_id)
}

/// `?user=` override for the display name.
pub fn user_from_location(location: &Location) -> Option<String> {
    let search = location.search().ok()?;
    let params = web_sys::UrlSearchParams::new_with_str(&search).ok()?;
    params.get("user").filter(|user| !user.is_empty())
}
