mod features;
mod gateway;
mod router;
mod session;
mod state;
mod ui;

pub use router::dispatch;
#[cfg(target_arch = "wasm32")]
pub use router::set_render_callback;

pub(crate) fn console_error(message: &str) {
    #[cfg(target_arch = "wasm32")]
    web_sys::console::error_1(&wasm_bindgen::JsValue::from_str(message));
    #[cfg(not(target_arch = "wasm32"))]
    eprintln!("{message}");
}
