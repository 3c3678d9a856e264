use gloo_console::log;
use gloo_timers::future::TimeoutFuture;
use serde_json::{Map, Value};
use wasm_bindgen_futures::spawn_local;
use web_sys::{Event, FocusEvent, HtmlInputElement, HtmlTextAreaElement, InputEvent, SubmitEvent};
use yew::prelude::*;

use crate::config::{self, FormType, WebhookConfig};
use crate::forms::submission::{
    preflight, validate_fields, FieldError, FieldKind, FieldSpec, FormRuntime, FormStatus,
    PreflightOutcome, GENERIC_ERROR_MESSAGE,
};
use crate::forms::webhook::{payload_from_browser, WebhookClient, WebhookError};
use crate::security::antibot::HoneypotKind;

const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: "name", label: "Full name", kind: FieldKind::Text, required: true },
    FieldSpec { name: "email", label: "Work email", kind: FieldKind::Email, required: true },
    FieldSpec { name: "company", label: "Company", kind: FieldKind::Text, required: true },
    FieldSpec { name: "message", label: "How can we help?", kind: FieldKind::TextArea, required: true },
    FieldSpec { name: "privacy", label: "Privacy policy", kind: FieldKind::Checkbox, required: true },
];

pub(crate) fn text_value(values: &Map<String, Value>, name: &str) -> String {
    values
        .get(name)
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string()
}

pub(crate) fn error_for<'a>(errors: &'a [FieldError], name: &str) -> Option<&'a str> {
    errors
        .iter()
        .find(|e| e.name == name)
        .map(|e| e.message.as_str())
}

/// B2B contact form: the multi-honeypot variant. Honeypot values are
/// blanked before validation, so bot detection for this form leans on the
/// fill-duration check.
#[function_component(ContactForm)]
pub fn contact_form() -> Html {
    let runtime = use_mut_ref(|| FormRuntime::new(FormType::B2b));
    let webhook_config = use_mut_ref(WebhookConfig::default);
    let values = use_state(Map::<String, Value>::new);
    let errors = use_state(Vec::<FieldError>::new);
    let status = use_state(|| FormStatus::Idle);

    {
        let runtime = runtime.clone();
        use_effect_with_deps(
            move |_| {
                runtime.borrow().arm_timing();
                || ()
            },
            (),
        );
    }

    let on_text_input = |name: &'static str| {
        let values = values.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let mut next = (*values).clone();
            next.insert(name.to_string(), Value::String(input.value()));
            values.set(next);
        })
    };

    let on_textarea_input = |name: &'static str| {
        let values = values.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlTextAreaElement = e.target_unchecked_into();
            let mut next = (*values).clone();
            next.insert(name.to_string(), Value::String(input.value()));
            values.set(next);
        })
    };

    let on_checkbox_change = |name: &'static str| {
        let values = values.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let mut next = (*values).clone();
            next.insert(name.to_string(), Value::Bool(input.checked()));
            values.set(next);
        })
    };

    // Blur re-validates just the touched field so the user gets feedback
    // before pressing submit.
    let on_blur = |name: &'static str| {
        let values = values.clone();
        let errors = errors.clone();
        Callback::from(move |_: FocusEvent| {
            let Some(spec) = FIELD_SPECS.iter().find(|s| s.name == name) else {
                return;
            };
            let field_errors = validate_fields(std::slice::from_ref(spec), &values);
            let mut next: Vec<FieldError> =
                errors.iter().filter(|e| e.name != name).cloned().collect();
            next.extend(field_errors);
            errors.set(next);
        })
    };

    let on_submit = {
        let runtime = runtime.clone();
        let webhook_config = webhook_config.clone();
        let values = values.clone();
        let errors = errors.clone();
        let status = status.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let outcome = preflight(&runtime.borrow(), FIELD_SPECS, (*values).clone());
            let clean = match outcome {
                PreflightOutcome::AlreadySubmitting => return,
                PreflightOutcome::Invalid(field_errors) => {
                    errors.set(field_errors);
                    return;
                }
                PreflightOutcome::BotSuspected => {
                    // presented exactly like any other failure
                    status.set(FormStatus::Error(GENERIC_ERROR_MESSAGE.to_string()));
                    return;
                }
                PreflightOutcome::Ready(clean) => clean,
            };

            errors.set(Vec::new());
            status.set(FormStatus::Submitting);

            let runtime = runtime.clone();
            let webhook_config = webhook_config.clone();
            let values = values.clone();
            let status = status.clone();
            spawn_local(async move {
                let payload = payload_from_browser(FormType::B2b, clean);
                let result = match WebhookClient::for_form(&webhook_config.borrow(), FormType::B2b)
                {
                    Ok(client) => client.submit(&payload).await.map(|_| ()),
                    Err(WebhookError::NotConfigured(_))
                        if config::simulate_unconfigured_submissions() =>
                    {
                        log!("no webhook configured; simulating submission");
                        TimeoutFuture::new(1_000).await;
                        Ok(())
                    }
                    Err(err) => Err(err),
                };

                match result {
                    Ok(()) => {
                        values.set(Map::new());
                        status.set(FormStatus::Success);
                        let runtime = runtime.borrow();
                        runtime.arm_timing();
                        runtime.finish_submission();
                    }
                    Err(err) => {
                        log!(format!("contact form submission failed: {err}"));
                        status.set(FormStatus::Error(GENERIC_ERROR_MESSAGE.to_string()));
                        runtime.borrow().finish_submission();
                    }
                }
            });
        })
    };

    let is_submitting = *status == FormStatus::Submitting;
    let honeypots = runtime.borrow().honeypot_fields();

    html! {
        <form class="contact-form" onsubmit={on_submit}>
            <style>
            {r#".contact-form {
                background: rgba(30, 30, 30, 0.7);
                border: 1px solid rgba(30, 144, 255, 0.1);
                border-radius: 16px;
                padding: 2rem;
                max-width: 560px;
                margin: 0 auto;
            }
            .form-field {
                margin-bottom: 1.25rem;
                display: flex;
                flex-direction: column;
            }
            .form-field label {
                color: rgba(255, 255, 255, 0.85);
                font-size: 0.9rem;
                margin-bottom: 0.4rem;
            }
            .form-field input, .form-field textarea {
                background: rgba(255, 255, 255, 0.05);
                border: 1px solid rgba(255, 255, 255, 0.2);
                border-radius: 8px;
                padding: 0.65rem;
                color: white;
            }
            .form-field input.invalid, .form-field textarea.invalid {
                border-color: #FF6B6B;
            }
            .field-error {
                color: #FF6B6B;
                font-size: 0.8rem;
                margin-top: 0.3rem;
            }
            .checkbox-field {
                flex-direction: row;
                align-items: center;
                gap: 0.5rem;
            }
            .form-submit {
                background: #1E90FF;
                color: white;
                border: none;
                border-radius: 8px;
                padding: 0.75rem 1.5rem;
                cursor: pointer;
            }
            .form-submit:disabled {
                opacity: 0.6;
                cursor: wait;
            }
            .form-banner {
                border-radius: 8px;
                padding: 0.75rem 1rem;
                margin-bottom: 1rem;
                font-size: 0.9rem;
            }
            .form-banner.success {
                background: rgba(76, 175, 80, 0.15);
                color: #81C784;
            }
            .form-banner.error {
                background: rgba(244, 67, 54, 0.15);
                color: #E57373;
            }
            .trap-fields {
                position: absolute;
                left: -9999px;
                top: auto;
                width: 1px;
                height: 1px;
                overflow: hidden;
            }"#}
            </style>

            {
                match &*status {
                    FormStatus::Success => html! {
                        <div class="form-banner success">
                            {"Thanks for reaching out. We'll get back to you within one business day."}
                        </div>
                    },
                    FormStatus::Error(message) => html! {
                        <div class="form-banner error">{message.clone()}</div>
                    },
                    _ => html! {},
                }
            }

            <div class="form-field">
                <label for="contact-name">{"Full name"}</label>
                <input
                    id="contact-name"
                    type="text"
                    class={classes!(error_for(&errors, "name").map(|_| "invalid"))}
                    value={text_value(&values, "name")}
                    oninput={on_text_input("name")}
                    onblur={on_blur("name")}
                />
                if let Some(message) = error_for(&errors, "name") {
                    <span class="field-error">{message}</span>
                }
            </div>

            <div class="form-field">
                <label for="contact-email">{"Work email"}</label>
                <input
                    id="contact-email"
                    type="email"
                    class={classes!(error_for(&errors, "email").map(|_| "invalid"))}
                    value={text_value(&values, "email")}
                    oninput={on_text_input("email")}
                    onblur={on_blur("email")}
                />
                if let Some(message) = error_for(&errors, "email") {
                    <span class="field-error">{message}</span>
                }
            </div>

            <div class="form-field">
                <label for="contact-company">{"Company"}</label>
                <input
                    id="contact-company"
                    type="text"
                    class={classes!(error_for(&errors, "company").map(|_| "invalid"))}
                    value={text_value(&values, "company")}
                    oninput={on_text_input("company")}
                    onblur={on_blur("company")}
                />
                if let Some(message) = error_for(&errors, "company") {
                    <span class="field-error">{message}</span>
                }
            </div>

            <div class="form-field">
                <label for="contact-message">{"How can we help?"}</label>
                <textarea
                    id="contact-message"
                    rows="5"
                    class={classes!(error_for(&errors, "message").map(|_| "invalid"))}
                    value={text_value(&values, "message")}
                    oninput={on_textarea_input("message")}
                    onblur={on_blur("message")}
                />
                if let Some(message) = error_for(&errors, "message") {
                    <span class="field-error">{message}</span>
                }
            </div>

            <div class="form-field checkbox-field">
                <input
                    id="contact-privacy"
                    type="checkbox"
                    checked={values.get("privacy").and_then(|v| v.as_bool()).unwrap_or(false)}
                    onchange={on_checkbox_change("privacy")}
                />
                <label for="contact-privacy">{"I agree to the privacy policy"}</label>
                if let Some(message) = error_for(&errors, "privacy") {
                    <span class="field-error">{message}</span>
                }
            </div>

            // invisible to humans; anything landing in here is automation
            <div class="trap-fields" aria-hidden="true">
                {
                    honeypots.iter().map(|field| {
                        match field.kind {
                            HoneypotKind::Checkbox => html! {
                                <input
                                    key={field.name}
                                    type="checkbox"
                                    name={field.name}
                                    tabindex="-1"
                                    autocomplete="off"
                                    onchange={on_checkbox_change(field.name)}
                                />
                            },
                            _ => html! {
                                <input
                                    key={field.name}
                                    type="text"
                                    name={field.name}
                                    tabindex="-1"
                                    autocomplete="off"
                                    oninput={on_text_input(field.name)}
                                />
                            },
                        }
                    }).collect::<Html>()
                }
            </div>

            <button type="submit" class="form-submit" disabled={is_submitting}>
                { if is_submitting { "Submitting..." } else { "Submit" } }
            </button>
        </form>
    }
}
