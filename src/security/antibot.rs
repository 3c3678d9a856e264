use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use chrono::Utc;
use log::warn;
use serde_json::{Map, Value};

use crate::config::FormType;

/// Input kind of a honeypot field. Text-like kinds must stay empty,
/// checkboxes must stay unchecked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoneypotKind {
    Text,
    Email,
    Url,
    Checkbox,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HoneypotField {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: HoneypotKind,
}

/// Per-form anti-bot heuristics: honeypot fields plus a minimum time a
/// human needs to fill the form.
#[derive(Clone, Debug, PartialEq)]
pub struct AntiBotSpec {
    pub honeypot_fields: Vec<HoneypotField>,
    pub min_fill_duration_secs: f64,
}

/// Static registry of anti-bot specs keyed by form type.
#[derive(Clone, Debug, Default)]
pub struct AntiBotRegistry {
    specs: HashMap<FormType, AntiBotSpec>,
}

impl AntiBotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The production form specs.
    pub fn with_defaults() -> Self {
        let mut specs = HashMap::new();
        specs.insert(
            FormType::B2b,
            AntiBotSpec {
                honeypot_fields: vec![
                    HoneypotField { name: "sa-id-number", label: "SA ID Number", kind: HoneypotKind::Text },
                    HoneypotField { name: "tnc-consent", label: "Terms & Conditions", kind: HoneypotKind::Checkbox },
                    HoneypotField { name: "company-size", label: "Company Size", kind: HoneypotKind::Text },
                    HoneypotField { name: "confirm-email", label: "Confirm Email", kind: HoneypotKind::Email },
                    HoneypotField { name: "zip-code", label: "Zip Code", kind: HoneypotKind::Text },
                    HoneypotField { name: "create-account", label: "Create Account", kind: HoneypotKind::Checkbox },
                    HoneypotField { name: "username", label: "Username", kind: HoneypotKind::Text },
                ],
                min_fill_duration_secs: 3.0,
            },
        );
        specs.insert(
            FormType::Waitlist,
            AntiBotSpec {
                honeypot_fields: vec![HoneypotField {
                    name: "reason_for_contact",
                    label: "Reason for contact",
                    kind: HoneypotKind::Text,
                }],
                min_fill_duration_secs: 3.0,
            },
        );
        specs.insert(
            FormType::ContactUs,
            AntiBotSpec {
                honeypot_fields: vec![HoneypotField {
                    name: "website_url",
                    label: "Website",
                    kind: HoneypotKind::Url,
                }],
                min_fill_duration_secs: 3.0,
            },
        );
        specs.insert(
            FormType::DcLead,
            AntiBotSpec {
                honeypot_fields: vec![HoneypotField {
                    name: "preferred_contact",
                    label: "Preferred Contact Method",
                    kind: HoneypotKind::Text,
                }],
                min_fill_duration_secs: 3.0,
            },
        );
        Self { specs }
    }

    pub fn insert(&mut self, form_type: FormType, spec: AntiBotSpec) {
        self.specs.insert(form_type, spec);
    }

    pub fn spec(&self, form_type: FormType) -> Option<&AntiBotSpec> {
        self.specs.get(&form_type)
    }
}

/// Stable identifier for a live form instance. Timing records are keyed by
/// this id and removed explicitly when the form resets or goes away.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FormInstanceId(u64);

/// Evaluates submissions against honeypot and fill-duration specs.
///
/// Both checks fail open: a missing spec or missing timing never blocks a
/// submission. These are UX deterrents, not a security boundary; anything
/// that matters must be re-validated server-side.
pub struct AntiBotGate {
    registry: AntiBotRegistry,
    start_times: RefCell<HashMap<FormInstanceId, i64>>,
    next_id: Cell<u64>,
}

impl AntiBotGate {
    pub fn new(registry: AntiBotRegistry) -> Self {
        Self {
            registry,
            start_times: RefCell::new(HashMap::new()),
            next_id: Cell::new(0),
        }
    }

    pub fn registry(&self) -> &AntiBotRegistry {
        &self.registry
    }

    /// Hands out an id for a newly rendered form.
    pub fn allocate_instance(&self) -> FormInstanceId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        FormInstanceId(id)
    }

    /// Records "now" as the moment the form became available. Safe to call
    /// again for the same form; the last call wins.
    pub fn initialize_timing(&self, form: FormInstanceId) {
        self.initialize_timing_at(form, Utc::now().timestamp_millis());
    }

    fn initialize_timing_at(&self, form: FormInstanceId, now_ms: i64) {
        self.start_times.borrow_mut().insert(form, now_ms);
    }

    /// True when enough time has passed since `initialize_timing`.
    pub fn validate_timing(&self, form: FormInstanceId, form_type: FormType) -> bool {
        self.validate_timing_at(form, form_type, Utc::now().timestamp_millis())
    }

    fn validate_timing_at(&self, form: FormInstanceId, form_type: FormType, now_ms: i64) -> bool {
        let Some(spec) = self.registry.spec(form_type) else {
            warn!("no anti-bot spec for form type {form_type}; skipping timing check");
            return true;
        };
        let Some(start_ms) = self.start_times.borrow().get(&form).copied() else {
            warn!("timing was never initialized for {form_type}; skipping timing check");
            return true;
        };
        let elapsed_secs = (now_ms - start_ms) as f64 / 1000.0;
        if elapsed_secs < spec.min_fill_duration_secs {
            warn!(
                "submission too fast: {elapsed_secs:.2}s (minimum {:.0}s)",
                spec.min_fill_duration_secs
            );
            return false;
        }
        true
    }

    /// Drops the timing record for a form.
    pub fn reset_timing(&self, form: FormInstanceId) {
        self.start_times.borrow_mut().remove(&form);
    }

    /// True when every configured honeypot field is untouched. A filled
    /// text-like field or a checked checkbox signals automation.
    pub fn validate_honeypot(&self, fields: &Map<String, Value>, form_type: FormType) -> bool {
        let Some(spec) = self.registry.spec(form_type) else {
            warn!("no anti-bot spec for form type {form_type}; skipping honeypot check");
            return true;
        };
        for field in &spec.honeypot_fields {
            let value = fields.get(field.name).unwrap_or(&Value::Null);
            if !honeypot_value_is_clean(field.kind, value) {
                warn!("honeypot field filled: {}", field.name);
                return false;
            }
        }
        true
    }
}

fn honeypot_value_is_clean(kind: HoneypotKind, value: &Value) -> bool {
    match kind {
        HoneypotKind::Checkbox => match value {
            Value::Null => true,
            Value::Bool(checked) => !checked,
            Value::String(s) => s.is_empty(),
            Value::Number(n) => n.as_f64() == Some(0.0),
            _ => false,
        },
        HoneypotKind::Text | HoneypotKind::Email | HoneypotKind::Url => match value {
            Value::Null => true,
            Value::String(s) => s.trim().is_empty(),
            Value::Bool(b) => !b,
            Value::Number(n) => n.as_f64() == Some(0.0),
            _ => false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn whitespace_only_url_honeypot_passes() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let submitted = fields(&[("website_url", json!("  "))]);
        assert!(gate.validate_honeypot(&submitted, FormType::ContactUs));
    }

    #[test]
    fn filled_text_honeypot_is_flagged() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let submitted = fields(&[("reason_for_contact", json!("hello"))]);
        assert!(!gate.validate_honeypot(&submitted, FormType::Waitlist));
    }

    #[test]
    fn checked_checkbox_honeypot_is_flagged() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let submitted = fields(&[("tnc-consent", json!(true))]);
        assert!(!gate.validate_honeypot(&submitted, FormType::B2b));
    }

    #[test]
    fn unchecked_checkbox_and_absent_fields_pass() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let submitted = fields(&[("tnc-consent", json!(false)), ("username", json!(""))]);
        assert!(gate.validate_honeypot(&submitted, FormType::B2b));
        assert!(gate.validate_honeypot(&Map::new(), FormType::B2b));
    }

    #[test]
    fn first_dirty_honeypot_field_flags_even_when_others_are_clean() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let submitted = fields(&[
            ("sa-id-number", json!("")),
            ("confirm-email", json!("bot@example.com")),
        ]);
        assert!(!gate.validate_honeypot(&submitted, FormType::B2b));
    }

    #[test]
    fn honeypot_fails_open_without_a_spec() {
        let gate = AntiBotGate::new(AntiBotRegistry::new());
        let submitted = fields(&[("website_url", json!("https://spam.example"))]);
        assert!(gate.validate_honeypot(&submitted, FormType::ContactUs));
    }

    #[test]
    fn immediate_submission_fails_timing() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let form = gate.allocate_instance();
        gate.initialize_timing_at(form, 10_000);
        assert!(!gate.validate_timing_at(form, FormType::B2b, 10_000));
    }

    #[test]
    fn timing_passes_at_and_after_the_minimum() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let form = gate.allocate_instance();
        gate.initialize_timing_at(form, 10_000);
        assert!(!gate.validate_timing_at(form, FormType::Waitlist, 12_999));
        assert!(gate.validate_timing_at(form, FormType::Waitlist, 13_000));
        assert!(gate.validate_timing_at(form, FormType::Waitlist, 60_000));
    }

    #[test]
    fn timing_fails_open_when_never_initialized() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let form = gate.allocate_instance();
        assert!(gate.validate_timing_at(form, FormType::B2b, 99_999));
    }

    #[test]
    fn reinitializing_timing_restarts_the_clock() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let form = gate.allocate_instance();
        gate.initialize_timing_at(form, 0);
        gate.initialize_timing_at(form, 50_000);
        assert!(!gate.validate_timing_at(form, FormType::B2b, 51_000));
        assert!(gate.validate_timing_at(form, FormType::B2b, 53_000));
    }

    #[test]
    fn reset_removes_the_record_and_later_checks_fail_open() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let form = gate.allocate_instance();
        gate.initialize_timing_at(form, 0);
        gate.reset_timing(form);
        assert!(gate.validate_timing_at(form, FormType::B2b, 1));
    }

    #[test]
    fn each_form_instance_gets_a_distinct_id() {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let a = gate.allocate_instance();
        let b = gate.allocate_instance();
        assert_ne!(a, b);
        gate.initialize_timing_at(a, 0);
        // b never started, so it fails open while a is still too fast
        assert!(!gate.validate_timing_at(a, FormType::B2b, 1_000));
        assert!(gate.validate_timing_at(b, FormType::B2b, 1_000));
    }
}
