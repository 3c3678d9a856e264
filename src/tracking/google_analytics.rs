use gloo_console::log;
use js_sys::{Array, Function, Object, Reflect};
use log::warn;
use wasm_bindgen::{JsCast, JsValue};

use crate::config;
use crate::tracking::activator::TrackingIntegration;

// gtag.js only treats `arguments` objects on the dataLayer as commands;
// plain arrays are inert GTM data. Installing the standard bootstrap
// function and calling it is the only shape the library replays.
const GTAG_STUB: &str = "\
window.dataLayer = window.dataLayer || [];\
window.gtag = function() { window.dataLayer.push(arguments); };";

/// Google Analytics 4 provider using the gtag.js Consent Mode API.
///
/// Commands go through the standard `gtag` bootstrap function, so anything
/// issued before gtag.js finishes loading is queued on the dataLayer and
/// replayed by the library once it arrives.
pub struct GoogleAnalytics {
    measurement_id: String,
    initialized: bool,
}

impl GoogleAnalytics {
    pub fn new() -> Self {
        Self {
            measurement_id: config::GA_MEASUREMENT_ID.to_string(),
            initialized: false,
        }
    }
}

/// Tracks a custom event. Queued on the dataLayer until gtag.js loads;
/// dropped with a warning when the bootstrap was never installed.
pub fn track(event_name: &str, params: Option<&Object>) {
    let command = Array::new();
    command.push(&JsValue::from_str("event"));
    command.push(&JsValue::from_str(event_name));
    if let Some(params) = params {
        command.push(params);
    }
    call_gtag(&command);
}

/// Records a page view for the current location. Called from the router
/// switch so client-side navigations are counted.
pub fn track_page_view() {
    let Some(window) = web_sys::window() else { return };
    let path = window.location().pathname().unwrap_or_default();
    let params = Object::new();
    let _ = Reflect::set(&params, &"page_path".into(), &JsValue::from_str(&path));
    track("page_view", Some(&params));
}

impl Default for GoogleAnalytics {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingIntegration for GoogleAnalytics {
    fn update_consent_signal(&mut self, analytics: bool, marketing: bool) {
        ensure_gtag_stub();

        let state = Object::new();
        let grant = |granted: bool| JsValue::from_str(if granted { "granted" } else { "denied" });
        let _ = Reflect::set(&state, &"analytics_storage".into(), &grant(analytics));
        let _ = Reflect::set(&state, &"ad_storage".into(), &grant(marketing));
        let _ = Reflect::set(&state, &"ad_user_data".into(), &grant(marketing));
        let _ = Reflect::set(&state, &"ad_personalization".into(), &grant(marketing));

        let command = Array::new();
        command.push(&JsValue::from_str("consent"));
        command.push(&JsValue::from_str("update"));
        command.push(&state);
        call_gtag(&command);

        if config::debug_enabled() {
            log!(format!(
                "[google analytics] consent updated: analytics={analytics} marketing={marketing}"
            ));
        }
    }

    fn initialize(&mut self) {
        if self.initialized {
            return;
        }
        ensure_gtag_stub();

        // Denied-by-default consent state must be queued before gtag.js
        // loads.
        let defaults = Object::new();
        for key in ["analytics_storage", "ad_storage", "ad_user_data", "ad_personalization"] {
            let _ = Reflect::set(&defaults, &JsValue::from_str(key), &"denied".into());
        }
        let default_command = Array::new();
        default_command.push(&JsValue::from_str("consent"));
        default_command.push(&JsValue::from_str("default"));
        default_command.push(&defaults);
        call_gtag(&default_command);

        let src = format!(
            "https://www.googletagmanager.com/gtag/js?id={}",
            self.measurement_id
        );
        inject_script(&src);

        let js_command = Array::new();
        js_command.push(&JsValue::from_str("js"));
        js_command.push(&js_sys::Date::new_0());
        call_gtag(&js_command);

        let config_command = Array::new();
        config_command.push(&JsValue::from_str("config"));
        config_command.push(&JsValue::from_str(&self.measurement_id));
        call_gtag(&config_command);

        self.initialized = true;
        if config::debug_enabled() {
            log!(format!("[google analytics] initialized with {}", self.measurement_id));
        }
    }

    fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn ensure_gtag_stub() {
    let Some(window) = web_sys::window() else { return };
    let existing = Reflect::get(&window, &"gtag".into()).unwrap_or(JsValue::UNDEFINED);
    if existing.is_truthy() {
        return;
    }
    let install = Function::new_no_args(GTAG_STUB);
    if install.call0(&JsValue::NULL).is_err() {
        warn!("failed to install gtag bootstrap");
    }
}

/// Invokes `window.gtag` with the given argument list, so the command
/// lands on the dataLayer as an `arguments` object gtag.js will process.
fn call_gtag(args: &Array) {
    let Some(window) = web_sys::window() else {
        warn!("no window; dropping gtag command");
        return;
    };
    let gtag = match Reflect::get(&window, &"gtag".into()) {
        Ok(value) if value.is_truthy() => value.unchecked_into::<Function>(),
        _ => {
            warn!("gtag is not installed; dropping command");
            return;
        }
    };
    if gtag.apply(&JsValue::NULL, args).is_err() {
        warn!("gtag command failed");
    }
}

/// Appends an async `<script src=...>` tag to the document head.
pub(crate) fn inject_script(src: &str) {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        warn!("no document; cannot load {src}");
        return;
    };
    let Some(head) = document.head() else {
        warn!("document has no head; cannot load {src}");
        return;
    };
    match document.create_element("script") {
        Ok(script) => {
            let _ = script.set_attribute("async", "");
            let _ = script.set_attribute("src", src);
            if head.append_child(&script).is_err() {
                warn!("failed to append script tag for {src}");
            }
        }
        Err(_) => warn!("failed to create script element for {src}"),
    }
}

#[cfg(test)]
mod tests {
    use super::GTAG_STUB;

    #[test]
    fn gtag_bootstrap_queues_arguments_objects() {
        // The library skips plain arrays on the dataLayer; commands must
        // arrive as `arguments` via the bootstrap function.
        assert!(GTAG_STUB.contains("window.gtag = function()"));
        assert!(GTAG_STUB.contains("window.dataLayer.push(arguments)"));
        assert!(!GTAG_STUB.contains("push(["));
    }
}
