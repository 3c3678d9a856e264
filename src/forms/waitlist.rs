use gloo_console::log;
use gloo_timers::future::TimeoutFuture;
use serde_json::{Map, Value};
use wasm_bindgen_futures::spawn_local;
use web_sys::{HtmlInputElement, InputEvent, SubmitEvent};
use yew::prelude::*;

use crate::config::{self, FormType, WebhookConfig};
use crate::forms::contact::{error_for, text_value};
use crate::forms::submission::{
    preflight, FieldError, FieldKind, FieldSpec, FormRuntime, FormStatus, PreflightOutcome,
    GENERIC_ERROR_MESSAGE,
};
use crate::forms::webhook::{payload_from_browser, WebhookClient, WebhookError};

const FIELD_SPECS: &[FieldSpec] = &[
    FieldSpec { name: "email", label: "Email", kind: FieldKind::Email, required: true },
];

/// Waitlist signup: a single email field with one live honeypot
/// (`reason_for_contact`), the single-honeypot variant.
#[function_component(WaitlistForm)]
pub fn waitlist_form() -> Html {
    let runtime = use_mut_ref(|| FormRuntime::new(FormType::Waitlist));
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

    let on_input = |name: &'static str| {
        let values = values.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let mut next = (*values).clone();
            next.insert(name.to_string(), Value::String(input.value()));
            values.set(next);
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

            let clean = match preflight(&runtime.borrow(), FIELD_SPECS, (*values).clone()) {
                PreflightOutcome::AlreadySubmitting => return,
                PreflightOutcome::Invalid(field_errors) => {
                    errors.set(field_errors);
                    return;
                }
                PreflightOutcome::BotSuspected => {
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
                let payload = payload_from_browser(FormType::Waitlist, clean);
                let result =
                    match WebhookClient::for_form(&webhook_config.borrow(), FormType::Waitlist) {
                        Ok(client) => client.submit(&payload).await.map(|_| ()),
                        Err(WebhookError::NotConfigured(_))
                            if config::simulate_unconfigured_submissions() =>
                        {
                            log!("no webhook configured; simulating waitlist signup");
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
                        log!(format!("waitlist signup failed: {err}"));
                        status.set(FormStatus::Error(GENERIC_ERROR_MESSAGE.to_string()));
                        runtime.borrow().finish_submission();
                    }
                }
            });
        })
    };

    let is_submitting = *status == FormStatus::Submitting;

    html! {
        <form class="waitlist-form" onsubmit={on_submit}>
            <style>
            {r#".waitlist-form {
                display: flex;
                flex-direction: column;
                gap: 0.75rem;
                max-width: 420px;
                margin: 0 auto;
            }
            .waitlist-row {
                display: flex;
                gap: 0.5rem;
            }
            .waitlist-form input[type="email"] {
                flex: 1;
                background: rgba(255, 255, 255, 0.05);
                border: 1px solid rgba(255, 255, 255, 0.2);
                border-radius: 8px;
                padding: 0.65rem;
                color: white;
            }
            .waitlist-submit {
                background: #1E90FF;
                color: white;
                border: none;
                border-radius: 8px;
                padding: 0.65rem 1.25rem;
                cursor: pointer;
            }
            .waitlist-submit:disabled {
                opacity: 0.6;
                cursor: wait;
            }
            .waitlist-note {
                font-size: 0.85rem;
            }
            .waitlist-note.success { color: #81C784; }
            .waitlist-note.error { color: #E57373; }
            .trap-field {
                position: absolute;
                left: -9999px;
                width: 1px;
                height: 1px;
                overflow: hidden;
            }"#}
            </style>

            <div class="waitlist-row">
                <input
                    type="email"
                    placeholder="you@company.com"
                    value={text_value(&values, "email")}
                    oninput={on_input("email")}
                />
                <button type="submit" class="waitlist-submit" disabled={is_submitting}>
                    { if is_submitting { "Joining..." } else { "Join the waitlist" } }
                </button>
            </div>

            <div class="trap-field" aria-hidden="true">
                <input
                    type="text"
                    name="reason_for_contact"
                    tabindex="-1"
                    autocomplete="off"
                    oninput={on_input("reason_for_contact")}
                />
            </div>

            if let Some(message) = error_for(&errors, "email") {
                <span class="waitlist-note error">{message}</span>
            }
            {
                match &*status {
                    FormStatus::Success => html! {
                        <span class="waitlist-note success">{"You're on the list. We'll be in touch."}</span>
                    },
                    FormStatus::Error(message) => html! {
                        <span class="waitlist-note error">{message.clone()}</span>
                    },
                    _ => html! {},
                }
            }
        </form>
    }
}
