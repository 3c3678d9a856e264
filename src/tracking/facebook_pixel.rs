use gloo_console::log;
use js_sys::{Array, Function, Reflect};
use log::warn;
use wasm_bindgen::{JsCast, JsValue};

use crate::config;
use crate::tracking::activator::TrackingIntegration;
use crate::tracking::google_analytics::inject_script;

const FBQ_STUB: &str = "\
window.fbq = function() {\
  window.fbq.callMethod ? window.fbq.callMethod.apply(window.fbq, arguments) : window.fbq.queue.push(arguments);\
};\
if (!window._fbq) window._fbq = window.fbq;\
window.fbq.push = window.fbq;\
window.fbq.loaded = true;\
window.fbq.version = '2.0';\
window.fbq.queue = [];";

/// Meta Pixel provider. Commands go through the standard `fbq` command
/// queue stub so anything issued before fbevents.js loads is replayed.
pub struct FacebookPixel {
    pixel_id: String,
    initialized: bool,
}

impl FacebookPixel {
    pub fn new() -> Self {
        Self {
            pixel_id: config::FB_PIXEL_ID.to_string(),
            initialized: false,
        }
    }
}

/// Tracks a standard pixel event. Queued by the `fbq` stub until
/// fbevents.js loads; dropped with a warning when no stub is installed.
pub fn track(event_name: &str) {
    call_fbq(&["track", event_name]);
}

impl Default for FacebookPixel {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingIntegration for FacebookPixel {
    fn update_consent_signal(&mut self, _analytics: bool, marketing: bool) {
        ensure_fbq_stub();
        let verb = if marketing { "grant" } else { "revoke" };
        call_fbq(&["consent", verb]);
        if config::debug_enabled() {
            log!(format!("[facebook pixel] consent {verb}ed"));
        }
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        ensure_fbq_stub();
        inject_script("https://connect.facebook.net/en_US/fbevents.js");
        call_fbq(&["init", &self.pixel_id]);
        call_fbq(&["track", "PageView"]);
        self.initialized = true;
        if config::debug_enabled() {
            log!(format!("[facebook pixel] initialized with {}", self.pixel_id));
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn ensure_fbq_stub() {
    let Some(window) = web_sys::window() else { return };
    let existing = Reflect::get(&window, &"fbq".into()).unwrap_or(JsValue::UNDEFINED);
    if existing.is_truthy() {
        return;
    }
    let install = Function::new_no_args(FBQ_STUB);
    if install.call0(&JsValue::NULL).is_err() {
        warn!("failed to install fbq command queue");
    }
}

fn call_fbq(args: &[&str]) {
    let Some(window) = web_sys::window() else {
        warn!("no window; dropping fbq command");
        return;
    };
    let fbq = match Reflect::get(&window, &"fbq".into()) {
        Ok(value) if value.is_truthy() => value.unchecked_into::<Function>(),
        _ => {
            warn!("fbq is not installed; dropping command");
            return;
        }
    };
    let arguments = Array::new();
    for arg in args {
        arguments.push(&JsValue::from_str(arg));
    }
    if fbq.apply(&JsValue::NULL, &arguments).is_err() {
        warn!("fbq command failed");
    }
}
