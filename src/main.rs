use log::{info, Level};
use yew::prelude::*;
use yew_router::prelude::*;

mod config;
mod consent {
    pub mod banner;
    pub mod store;
}
mod security {
    pub mod antibot;
}
mod tracking {
    pub mod activator;
    pub mod facebook_pixel;
    pub mod google_analytics;
}
mod forms {
    pub mod contact;
    pub mod submission;
    pub mod waitlist;
    pub mod webhook;
}
mod pages {
    pub mod home;
    pub mod termsprivacy;
}

use consent::banner::CookieConsentBanner;
use pages::home::Home;
use pages::termsprivacy::PrivacyPolicy;

#[derive(Clone, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/privacy")]
    Privacy,
}

fn switch(routes: Route) -> Html {
    // Page views for client-side navigations. Both providers queue (or
    // drop, pre-consent) commands their scripts have not yet picked up.
    tracking::google_analytics::track_page_view();
    tracking::facebook_pixel::track("PageView");
    match routes {
        Route::Home => {
            info!("Rendering Home page");
            html! { <Home /> }
        }
        Route::Privacy => {
            info!("Rendering Privacy page");
            html! { <PrivacyPolicy /> }
        }
    }
}

#[function_component(Nav)]
pub fn nav() -> Html {
    html! {
        <nav class="top-nav">
            <style>
            {r#".top-nav {
                position: fixed;
                top: 0;
                left: 0;
                right: 0;
                background: rgba(26, 26, 26, 0.9);
                backdrop-filter: blur(10px);
                border-bottom: 1px solid rgba(30, 144, 255, 0.1);
                z-index: 100;
            }
            .nav-content {
                max-width: 1000px;
                margin: 0 auto;
                padding: 1.25rem 2rem;
                display: flex;
                align-items: center;
                justify-content: space-between;
            }
            .nav-logo {
                color: #fff;
                font-weight: bold;
                font-size: 1.2rem;
                text-decoration: none;
            }
            .nav-link {
                color: rgba(255, 255, 255, 0.8);
                text-decoration: none;
                font-size: 0.95rem;
            }"#}
            </style>
            <div class="nav-content">
                <Link<Route> to={Route::Home} classes="nav-logo">
                    {"meliorem"}
                </Link<Route>>
                <Link<Route> to={Route::Privacy} classes="nav-link">
                    {"Privacy"}
                </Link<Route>>
            </div>
        </nav>
    }
}

#[function_component]
fn App() -> Html {
    html! {
        <BrowserRouter>
            <Nav />
            <Switch<Route> render={switch} />
            <CookieConsentBanner />
        </BrowserRouter>
    }
}

fn main() {
    // Initialize console error panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging
    console_log::init_with_level(Level::Info).expect("error initializing log");

    info!("Starting application");
    yew::Renderer::<App>::new().render();
}
