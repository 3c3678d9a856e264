use std::rc::Rc;

use yew::prelude::*;

use crate::config::ConsentConfig;
use crate::consent::store::{BrowserStorage, ConsentStore};

#[function_component(PrivacyPolicy)]
pub fn privacy_policy() -> Html {
    // Clearing consent broadcasts a null update; the banner re-prompts on
    // the next page load.
    let reopen_consent = Callback::from(move |_: web_sys::MouseEvent| {
        let store = ConsentStore::new(Rc::new(BrowserStorage), ConsentConfig::default());
        store.clear_consent();
        if let Some(window) = web_sys::window() {
            let _ = window.location().reload();
        }
    });

    html! {
        <div class="legal-page">
            <style>
            {r#".legal-page {
                max-width: 760px;
                margin: 0 auto;
                padding: 8rem 2rem 4rem;
                color: rgba(255, 255, 255, 0.85);
            }
            .legal-page h1 {
                margin-bottom: 1.5rem;
            }
            .legal-page h2 {
                margin: 2rem 0 0.75rem;
                font-size: 1.3rem;
            }
            .legal-page p {
                line-height: 1.6;
                margin-bottom: 1rem;
            }
            .manage-cookies {
                background: transparent;
                color: #7EB2FF;
                border: 1px solid rgba(30, 144, 255, 0.4);
                border-radius: 8px;
                padding: 0.6rem 1.2rem;
                cursor: pointer;
            }"#}
            </style>
            <h1>{"Privacy Policy"}</h1>
            <p>
                {"We collect only what we need to respond to your enquiries and, where you allow it, \
                  to understand how our site is used. Contact form submissions are forwarded to our \
                  CRM and are never sold."}
            </p>
            <h2>{"Cookies"}</h2>
            <p>
                {"Essential cookies keep the site working. Analytics and marketing cookies are only \
                  set after you opt in, and your choice expires after a year. You can change your \
                  mind at any time:"}
            </p>
            <button class="manage-cookies" onclick={reopen_consent}>
                {"Manage cookie preferences"}
            </button>
        </div>
    }
}
