use std::cell::Cell;

use serde_json::{Map, Value};

use crate::config::FormType;
use crate::security::antibot::{AntiBotGate, AntiBotRegistry, AntiBotSpec, FormInstanceId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Email,
    TextArea,
    Checkbox,
}

/// Validation rules for one visible form field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    pub name: String,
    pub message: String,
}

/// UI state of a form. Pending transitions (validating, bot evaluation)
/// resolve synchronously back to `Idle` or forward to `Submitting`.
#[derive(Clone, Debug, PartialEq)]
pub enum FormStatus {
    Idle,
    Submitting,
    Success,
    Error(String),
}

/// The user-visible failure text. Deliberately generic: validation detail
/// stays inline per field, everything else (bot detection included) must
/// not leak what went wrong.
pub const GENERIC_ERROR_MESSAGE: &str =
    "Something went wrong while sending your message. Please try again.";

/// Checks every field and reports every violation, so the user sees all
/// errors at once rather than fixing them one resubmit at a time.
pub fn validate_fields(specs: &[FieldSpec], values: &Map<String, Value>) -> Vec<FieldError> {
    let mut errors = Vec::new();
    for spec in specs {
        let value = values.get(spec.name).unwrap_or(&Value::Null);
        match spec.kind {
            FieldKind::Checkbox => {
                if spec.required && value != &Value::Bool(true) {
                    errors.push(FieldError {
                        name: spec.name.to_string(),
                        message: "This field is required".to_string(),
                    });
                }
            }
            FieldKind::Text | FieldKind::TextArea | FieldKind::Email => {
                let text = value.as_str().unwrap_or("").trim();
                if spec.required && text.is_empty() {
                    errors.push(FieldError {
                        name: spec.name.to_string(),
                        message: "This field is required".to_string(),
                    });
                } else if spec.kind == FieldKind::Email && !text.is_empty() && !is_valid_email(text)
                {
                    errors.push(FieldError {
                        name: spec.name.to_string(),
                        message: "Please enter a valid email address".to_string(),
                    });
                }
            }
        }
    }
    errors
}

/// Matches the shape local@domain.tld where no part is empty and nothing
/// contains whitespace or a second `@`.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let Some(domain) = parts.next() else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let Some(dot) = domain.rfind('.') else {
        return false;
    };
    let host = &domain[..dot];
    let tld = &domain[dot + 1..];
    !host.is_empty() && !tld.is_empty()
}

/// Blanks configured honeypot values before validation so browser
/// autofill cannot trip the bot check on a legitimate submission.
pub fn clear_honeypot_values(values: &mut Map<String, Value>, spec: &AntiBotSpec) {
    for field in &spec.honeypot_fields {
        if let Some(value) = values.get_mut(field.name) {
            *value = match value {
                Value::Bool(_) => Value::Bool(false),
                _ => Value::String(String::new()),
            };
        }
    }
}

/// Re-entrancy latch: a submit trigger while a submission is in flight is
/// a no-op.
#[derive(Default)]
pub struct SubmitGuard {
    submitting: Cell<bool>,
}

impl SubmitGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the in-flight slot. Returns false when a submission is
    /// already running.
    pub fn try_begin(&self) -> bool {
        if self.submitting.get() {
            return false;
        }
        self.submitting.set(true);
        true
    }

    pub fn finish(&self) {
        self.submitting.set(false);
    }
}

/// Everything one live form needs to gate a submission: its anti-bot gate
/// and timing slot plus the re-entrancy latch.
pub struct FormRuntime {
    pub form_type: FormType,
    gate: AntiBotGate,
    guard: SubmitGuard,
    instance: FormInstanceId,
}

impl FormRuntime {
    pub fn new(form_type: FormType) -> Self {
        let gate = AntiBotGate::new(AntiBotRegistry::with_defaults());
        let instance = gate.allocate_instance();
        Self {
            form_type,
            gate,
            guard: SubmitGuard::new(),
            instance,
        }
    }

    /// Starts (or restarts) the fill-duration clock.
    pub fn arm_timing(&self) {
        self.gate.initialize_timing(self.instance);
    }

    /// The honeypot fields this form should render.
    pub fn honeypot_fields(&self) -> Vec<crate::security::antibot::HoneypotField> {
        self.gate
            .registry()
            .spec(self.form_type)
            .map(|spec| spec.honeypot_fields.clone())
            .unwrap_or_default()
    }

    /// Releases the in-flight latch once a submission settles.
    pub fn finish_submission(&self) {
        self.guard.finish();
    }
}

/// Result of the synchronous part of the submit flow.
#[derive(Debug, PartialEq)]
pub enum PreflightOutcome {
    /// A submission is already in flight; ignore this trigger.
    AlreadySubmitting,
    /// Field validation failed; every violation is included.
    Invalid(Vec<FieldError>),
    /// Honeypot or timing tripped. Callers must present this as a
    /// generic failure, never as a bot verdict.
    BotSuspected,
    /// Ready to submit; honeypot values have been cleared from the map.
    Ready(Map<String, Value>),
}

/// Runs the submit-trigger pipeline up to the network call: re-entrancy
/// guard, honeypot clearing, field validation, anti-bot evaluation.
///
/// On `Ready` the in-flight latch stays claimed; the caller releases it
/// with `finish_submission` when the remote call settles.
pub fn preflight(
    runtime: &FormRuntime,
    specs: &[FieldSpec],
    mut values: Map<String, Value>,
) -> PreflightOutcome {
    if !runtime.guard.try_begin() {
        return PreflightOutcome::AlreadySubmitting;
    }

    // Multi-honeypot forms use realistic field names that browser
    // autofill loves to populate, so their values are blanked up front
    // and the timing check carries the bot detection for those forms.
    if let Some(spec) = runtime.gate.registry().spec(runtime.form_type) {
        if spec.honeypot_fields.len() > 1 {
            clear_honeypot_values(&mut values, spec);
        }
    }

    let errors = validate_fields(specs, &values);
    if !errors.is_empty() {
        runtime.guard.finish();
        return PreflightOutcome::Invalid(errors);
    }

    if !runtime.gate.validate_honeypot(&values, runtime.form_type)
        || !runtime.gate.validate_timing(runtime.instance, runtime.form_type)
    {
        runtime.guard.finish();
        return PreflightOutcome::BotSuspected;
    }

    PreflightOutcome::Ready(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec { name: "name", label: "Name", kind: FieldKind::Text, required: true },
            FieldSpec { name: "email", label: "Email", kind: FieldKind::Email, required: true },
            FieldSpec { name: "message", label: "Message", kind: FieldKind::TextArea, required: true },
            FieldSpec { name: "privacy", label: "Privacy policy", kind: FieldKind::Checkbox, required: true },
        ]
    }

    fn values(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn all_violations_are_reported_at_once() {
        let errors = validate_fields(&specs(), &Map::new());
        let names: Vec<&str> = errors.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["name", "email", "message", "privacy"]);
    }

    #[test]
    fn valid_submission_has_no_errors() {
        let submitted = values(&[
            ("name", json!("Thandi")),
            ("email", json!("thandi@example.co.za")),
            ("message", json!("Hello there")),
            ("privacy", json!(true)),
        ]);
        assert!(validate_fields(&specs(), &submitted).is_empty());
    }

    #[test]
    fn whitespace_only_counts_as_empty() {
        let submitted = values(&[("name", json!("   "))]);
        let errors = validate_fields(
            &[FieldSpec { name: "name", label: "Name", kind: FieldKind::Text, required: true }],
            &submitted,
        );
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn email_format_is_checked_only_when_present() {
        let spec = [FieldSpec {
            name: "email",
            label: "Email",
            kind: FieldKind::Email,
            required: false,
        }];
        assert!(validate_fields(&spec, &Map::new()).is_empty());

        let submitted = values(&[("email", json!("nonsense"))]);
        let errors = validate_fields(&spec, &submitted);
        assert_eq!(errors[0].message, "Please enter a valid email address");
    }

    #[test]
    fn required_checkbox_must_be_checked() {
        let spec = [FieldSpec {
            name: "privacy",
            label: "Privacy policy",
            kind: FieldKind::Checkbox,
            required: true,
        }];
        let unchecked = values(&[("privacy", json!(false))]);
        assert_eq!(validate_fields(&spec, &unchecked).len(), 1);
        let checked = values(&[("privacy", json!(true))]);
        assert!(validate_fields(&spec, &checked).is_empty());
    }

    #[test]
    fn email_pattern_accepts_and_rejects_the_usual_shapes() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last@mail.example.com"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("@b.co"));
        assert!(!is_valid_email("a@.co"));
        assert!(!is_valid_email("a@b."));
        assert!(!is_valid_email("a b@c.co"));
        assert!(!is_valid_email("a@b@c.co"));
        assert!(!is_valid_email("plain"));
    }

    #[test]
    fn honeypot_clearing_blanks_only_configured_fields() {
        let registry = AntiBotRegistry::with_defaults();
        let spec = registry.spec(FormType::B2b).unwrap();
        let mut submitted = values(&[
            ("username", json!("autofilled")),
            ("tnc-consent", json!(true)),
            ("email", json!("real@example.com")),
        ]);
        clear_honeypot_values(&mut submitted, spec);
        assert_eq!(submitted["username"], json!(""));
        assert_eq!(submitted["tnc-consent"], json!(false));
        assert_eq!(submitted["email"], json!("real@example.com"));
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let guard = SubmitGuard::new();
        assert!(guard.try_begin());
        assert!(!guard.try_begin());
        guard.finish();
        assert!(guard.try_begin());
    }

    fn waitlist_specs() -> Vec<FieldSpec> {
        vec![
            FieldSpec { name: "email", label: "Email", kind: FieldKind::Email, required: true },
        ]
    }

    #[test]
    fn preflight_reports_validation_errors_and_returns_to_idle() {
        let runtime = FormRuntime::new(FormType::Waitlist);
        let outcome = preflight(&runtime, &waitlist_specs(), Map::new());
        assert!(matches!(outcome, PreflightOutcome::Invalid(ref errors) if errors.len() == 1));
        // the latch was released, so the next trigger is accepted
        let submitted = values(&[("email", json!("a@b.co"))]);
        assert!(matches!(
            preflight(&runtime, &waitlist_specs(), submitted),
            PreflightOutcome::Ready(_)
        ));
    }

    #[test]
    fn preflight_flags_a_filled_single_honeypot_as_bot() {
        let runtime = FormRuntime::new(FormType::Waitlist);
        let submitted = values(&[
            ("email", json!("a@b.co")),
            ("reason_for_contact", json!("cheap pills")),
        ]);
        assert_eq!(
            preflight(&runtime, &waitlist_specs(), submitted),
            PreflightOutcome::BotSuspected
        );
    }

    #[test]
    fn preflight_clears_multi_variant_honeypots_instead_of_flagging() {
        let runtime = FormRuntime::new(FormType::B2b);
        let submitted = values(&[
            ("email", json!("a@b.co")),
            ("confirm-email", json!("a@b.co")),
            ("username", json!("autofilled")),
        ]);
        let specs = [FieldSpec { name: "email", label: "Email", kind: FieldKind::Email, required: true }];
        match preflight(&runtime, &specs, submitted) {
            PreflightOutcome::Ready(cleaned) => {
                assert_eq!(cleaned["confirm-email"], json!(""));
                assert_eq!(cleaned["username"], json!(""));
                assert_eq!(cleaned["email"], json!("a@b.co"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn preflight_ignores_triggers_while_a_submission_is_in_flight() {
        let runtime = FormRuntime::new(FormType::Waitlist);
        let submitted = values(&[("email", json!("a@b.co"))]);
        assert!(matches!(
            preflight(&runtime, &waitlist_specs(), submitted.clone()),
            PreflightOutcome::Ready(_)
        ));
        assert_eq!(
            preflight(&runtime, &waitlist_specs(), submitted.clone()),
            PreflightOutcome::AlreadySubmitting
        );
        runtime.finish_submission();
        assert!(matches!(
            preflight(&runtime, &waitlist_specs(), submitted),
            PreflightOutcome::Ready(_)
        ));
    }

    #[test]
    fn preflight_flags_a_too_fast_submission() {
        let runtime = FormRuntime::new(FormType::Waitlist);
        runtime.arm_timing();
        let submitted = values(&[("email", json!("a@b.co"))]);
        assert_eq!(
            preflight(&runtime, &waitlist_specs(), submitted),
            PreflightOutcome::BotSuspected
        );
    }
}
