/// QuickLinks - Chrome Extension for saving links
/// Built with Rust + WASM + Yew

pub mod api;
pub mod bridge;
pub mod config;
pub mod content;
pub mod error;
pub mod messages;
pub mod platform;
pub mod router;
pub mod session;
pub mod toast;
pub mod token;
pub mod ui;

#[cfg(test)]
mod testing;

use wasm_bindgen::prelude::*;

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Background service worker: context menu and message router.
// Messages that arrive before this runs are queued by extension.js.
#[wasm_bindgen]
pub fn start_background() {
    platform::install_background();
}

// Content script: long-press save button and toasts
#[wasm_bindgen]
pub fn start_content_script() -> Result<(), JsValue> {
    ui::affordance::install()
}

// Dashboard page script: forwards the signed-in session to the extension
#[wasm_bindgen]
pub fn start_web_auth_bridge() -> Result<(), JsValue> {
    platform::install_web_auth_bridge()
}

// Start the Yew app for the options page
#[wasm_bindgen]
pub fn start_options() {
    yew::Renderer::<ui::options::OptionsPage>::new().render();
}
