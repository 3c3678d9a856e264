use yew::prelude::*;

use crate::forms::contact::ContactForm;
use crate::forms::waitlist::WaitlistForm;

#[function_component(Home)]
pub fn home() -> Html {
    html! {
        <div class="landing-page">
            <style>
            {r#".landing-page {
                min-height: 100vh;
                color: #fff;
                padding-top: 74px;
            }
            .hero {
                text-align: center;
                padding: 6rem 2rem 4rem;
            }
            .hero h1 {
                font-size: 3rem;
                margin-bottom: 1rem;
                background: linear-gradient(45deg, #fff, #7EB2FF);
                -webkit-background-clip: text;
                -webkit-text-fill-color: transparent;
            }
            .hero p {
                color: rgba(255, 255, 255, 0.7);
                max-width: 600px;
                margin: 0 auto 2rem;
                font-size: 1.1rem;
            }
            .section {
                padding: 3rem 2rem;
                max-width: 900px;
                margin: 0 auto;
            }
            .section h2 {
                text-align: center;
                font-size: 2rem;
                margin-bottom: 0.75rem;
            }
            .section .section-intro {
                text-align: center;
                color: rgba(255, 255, 255, 0.7);
                margin-bottom: 2rem;
            }"#}
            </style>

            <section class="hero">
                <h1>{"Financial clarity for growing teams"}</h1>
                <p>
                    {"Meliorem helps you plan, protect and grow what you've built. \
                      Join the waitlist for early access, or talk to us directly."}
                </p>
                <WaitlistForm />
            </section>

            <section class="section" id="contact">
                <h2>{"Talk to our team"}</h2>
                <p class="section-intro">
                    {"Tell us a bit about your company and we'll get back to you within one business day."}
                </p>
                <ContactForm />
            </section>
        </div>
    }
}
