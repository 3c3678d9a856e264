use std::cell::RefCell;
use std::rc::Rc;

use gloo_console::log;
use web_sys::{Event, HtmlInputElement, MouseEvent};
use yew::prelude::*;
use yew_router::prelude::*;

use crate::config::ConsentConfig;
use crate::consent::store::{BrowserStorage, ConsentChoice, ConsentStore};
use crate::tracking::activator::TrackingActivator;
use crate::tracking::facebook_pixel::FacebookPixel;
use crate::tracking::google_analytics::GoogleAnalytics;
use crate::Route;

struct ConsentServices {
    store: Rc<ConsentStore>,
    activator: Rc<TrackingActivator>,
}

impl ConsentServices {
    fn new() -> Self {
        let store = Rc::new(ConsentStore::new(
            Rc::new(BrowserStorage),
            ConsentConfig::default(),
        ));
        let activator = Rc::new(TrackingActivator::new(
            Rc::new(RefCell::new(GoogleAnalytics::new())),
            Rc::new(RefCell::new(FacebookPixel::new())),
        ));
        Self { store, activator }
    }
}

#[function_component(CookieConsentBanner)]
pub fn cookie_consent_banner() -> Html {
    let services = use_mut_ref(ConsentServices::new);
    let visible = use_state(|| false);
    let modal_open = use_state(|| false);
    let analytics_checked = use_state(|| false);
    let marketing_checked = use_state(|| false);

    {
        let services = services.clone();
        let visible = visible.clone();
        use_effect_with_deps(
            move |_| {
                let guard = services.borrow();
                let store = guard.store.clone();
                let activator = guard.activator.clone();
                drop(guard);

                {
                    let visible = visible.clone();
                    let activator = activator.clone();
                    store.subscribe(Rc::new(move |preferences| match preferences {
                        Some(preferences) => {
                            visible.set(false);
                            activator.apply_consent(preferences);
                        }
                        None => visible.set(true),
                    }));
                }

                // Returning visitor with valid opt-in: restore tracking
                // without prompting. Everyone else gets the banner.
                if store.requires_prompt() {
                    visible.set(true);
                } else if let Some(preferences) = store.get_preferences() {
                    log!("restoring tracking consent from a previous visit");
                    activator.apply_consent(&preferences);
                }
                || ()
            },
            (),
        );
    }

    let accept_all = {
        let services = services.clone();
        Callback::from(move |_: MouseEvent| {
            services.borrow().store.set_consent(ConsentChoice::accept_all());
        })
    };

    let reject_non_essential = {
        let services = services.clone();
        Callback::from(move |_: MouseEvent| {
            // Stored as all-false now; the prompt policy clears it on the
            // next visit so the banner keeps re-asking until an opt-in.
            services
                .borrow()
                .store
                .set_consent(ConsentChoice::reject_non_essential());
        })
    };

    let open_settings = {
        let services = services.clone();
        let modal_open = modal_open.clone();
        let analytics_checked = analytics_checked.clone();
        let marketing_checked = marketing_checked.clone();
        Callback::from(move |_: MouseEvent| {
            let preferences = services.borrow().store.get_preferences();
            analytics_checked.set(preferences.as_ref().map(|p| p.analytics).unwrap_or(false));
            marketing_checked.set(preferences.as_ref().map(|p| p.marketing).unwrap_or(false));
            modal_open.set(true);
        })
    };

    let close_settings = {
        let modal_open = modal_open.clone();
        Callback::from(move |_: MouseEvent| modal_open.set(false))
    };

    let save_settings = {
        let services = services.clone();
        let modal_open = modal_open.clone();
        let analytics_checked = analytics_checked.clone();
        let marketing_checked = marketing_checked.clone();
        Callback::from(move |_: MouseEvent| {
            services.borrow().store.set_consent(ConsentChoice {
                analytics: *analytics_checked,
                marketing: *marketing_checked,
            });
            modal_open.set(false);
        })
    };

    let toggle_analytics = {
        let analytics_checked = analytics_checked.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            analytics_checked.set(input.checked());
        })
    };

    let toggle_marketing = {
        let marketing_checked = marketing_checked.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            marketing_checked.set(input.checked());
        })
    };

    if !*visible {
        return html! {};
    }

    let categories = services.borrow().store.config().categories.clone();

    html! {
        <div class="cookie-banner">
            <style>
            {r#".cookie-banner {
                position: fixed;
                bottom: 0;
                left: 0;
                right: 0;
                background: rgba(30, 30, 30, 0.97);
                border-top: 1px solid rgba(30, 144, 255, 0.2);
                padding: 1.5rem 2rem;
                z-index: 1000;
                backdrop-filter: blur(10px);
            }
            .cookie-banner-content {
                max-width: 1000px;
                margin: 0 auto;
                display: flex;
                flex-wrap: wrap;
                gap: 1rem;
                align-items: center;
                justify-content: space-between;
            }
            .cookie-banner-text {
                color: rgba(255, 255, 255, 0.85);
                font-size: 0.9rem;
                flex: 1;
                min-width: 260px;
            }
            .cookie-banner-text a {
                color: #7EB2FF;
            }
            .cookie-banner-actions {
                display: flex;
                gap: 0.75rem;
            }
            .cookie-button {
                border: none;
                border-radius: 8px;
                padding: 0.6rem 1.2rem;
                font-size: 0.9rem;
                cursor: pointer;
            }
            .cookie-button.accept {
                background: #1E90FF;
                color: white;
            }
            .cookie-button.reject, .cookie-button.customize {
                background: transparent;
                color: rgba(255, 255, 255, 0.8);
                border: 1px solid rgba(255, 255, 255, 0.3);
            }
            .cookie-modal-overlay {
                position: fixed;
                inset: 0;
                background: rgba(0, 0, 0, 0.6);
                z-index: 1001;
                display: flex;
                align-items: center;
                justify-content: center;
            }
            .cookie-modal {
                background: #1e1e1e;
                border: 1px solid rgba(30, 144, 255, 0.2);
                border-radius: 16px;
                padding: 2rem;
                width: 100%;
                max-width: 520px;
                max-height: 80vh;
                overflow-y: auto;
                color: rgba(255, 255, 255, 0.9);
            }
            .cookie-category {
                margin-bottom: 1.25rem;
            }
            .cookie-category-header {
                display: flex;
                justify-content: space-between;
                align-items: center;
                font-weight: bold;
            }
            .cookie-category p {
                font-size: 0.85rem;
                color: rgba(255, 255, 255, 0.6);
                margin: 0.4rem 0 0 0;
            }
            .cookie-modal-actions {
                display: flex;
                justify-content: flex-end;
                gap: 0.75rem;
                margin-top: 1.5rem;
            }"#}
            </style>
            <div class="cookie-banner-content">
                <p class="cookie-banner-text">
                    {"We use cookies to improve your experience and to understand how our site is used. \
                      Essential cookies are always on; everything else is up to you. "}
                    <Link<Route> to={Route::Privacy}>{"Privacy policy"}</Link<Route>>
                </p>
                <div class="cookie-banner-actions">
                    <button class="cookie-button customize" onclick={open_settings}>{"Customize"}</button>
                    <button class="cookie-button reject" onclick={reject_non_essential}>{"Reject non-essential"}</button>
                    <button class="cookie-button accept" onclick={accept_all}>{"Accept all"}</button>
                </div>
            </div>
            {
                if *modal_open {
                    html! {
                        <div class="cookie-modal-overlay" onclick={close_settings.clone()}>
                            <div class="cookie-modal" onclick={Callback::from(|e: MouseEvent| e.stop_propagation())}>
                                <h2>{"Cookie preferences"}</h2>
                                {
                                    categories.iter().map(|category| {
                                        let checkbox = match category.id {
                                            "analytics" => html! {
                                                <input
                                                    type="checkbox"
                                                    checked={*analytics_checked}
                                                    onchange={toggle_analytics.clone()}
                                                />
                                            },
                                            "marketing" => html! {
                                                <input
                                                    type="checkbox"
                                                    checked={*marketing_checked}
                                                    onchange={toggle_marketing.clone()}
                                                />
                                            },
                                            _ => html! {
                                                <input type="checkbox" checked={true} disabled={true} />
                                            },
                                        };
                                        html! {
                                            <div class="cookie-category" key={category.id}>
                                                <div class="cookie-category-header">
                                                    <span>{category.name}</span>
                                                    {checkbox}
                                                </div>
                                                <p>{category.description}</p>
                                            </div>
                                        }
                                    }).collect::<Html>()
                                }
                                <div class="cookie-modal-actions">
                                    <button class="cookie-button reject" onclick={close_settings}>{"Cancel"}</button>
                                    <button class="cookie-button accept" onclick={save_settings}>{"Save preferences"}</button>
                                </div>
                            </div>
                        </div>
                    }
                } else {
                    html! {}
                }
            }
        </div>
    }
}
