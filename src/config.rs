use std::fmt;

/// Form identifiers used across anti-bot specs, webhook routing and payloads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FormType {
    B2b,
    Waitlist,
    ContactUs,
    DcLead,
}

impl FormType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::B2b => "b2b",
            FormType::Waitlist => "waitlist",
            FormType::ContactUs => "contact-us",
            FormType::DcLead => "dc-lead",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A cookie category shown in the consent settings modal.
#[derive(Clone, Debug, PartialEq)]
pub struct CategorySpec {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
    pub always_enabled: bool,
}

/// Consent storage key, expiration window and category table.
#[derive(Clone, Debug, PartialEq)]
pub struct ConsentConfig {
    pub storage_key: String,
    /// `None` means stored consent never expires.
    pub expiration_days: Option<i64>,
    pub categories: Vec<CategorySpec>,
}

impl Default for ConsentConfig {
    fn default() -> Self {
        Self {
            storage_key: "meliorem_cookie_consent".to_string(),
            expiration_days: Some(365),
            categories: vec![
                CategorySpec {
                    id: "essential",
                    name: "Essential",
                    description: "These cookies are necessary for the website to function and cannot be disabled. They are usually set in response to actions made by you such as setting privacy preferences or filling in forms.",
                    required: true,
                    always_enabled: true,
                },
                CategorySpec {
                    id: "analytics",
                    name: "Analytics",
                    description: "These cookies help us understand how visitors interact with our website by collecting and reporting information anonymously. This helps us improve our website.",
                    required: false,
                    always_enabled: false,
                },
                CategorySpec {
                    id: "marketing",
                    name: "Marketing",
                    description: "These cookies are used to track visitors across websites to display relevant advertisements and measure campaign effectiveness.",
                    required: false,
                    always_enabled: false,
                },
            ],
        }
    }
}

impl ConsentConfig {
    pub fn category(&self, id: &str) -> Option<&CategorySpec> {
        self.categories.iter().find(|c| c.id == id)
    }
}

/// Webhook endpoints and request tuning for the lead/contact submissions.
///
/// b2b, waitlist and contact-us share one endpoint ("webhook A"); the
/// dc-lead calculator form posts to its own ("webhook B").
#[derive(Clone, Debug, PartialEq)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub contact_request_url: String,
    pub dc_lead_url: String,
    pub timeout_ms: u32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u32,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            contact_request_url: String::new(),
            dc_lead_url: String::new(),
            timeout_ms: 10_000,
            retry_attempts: 1,
            retry_delay_ms: 1_000,
        }
    }
}

impl WebhookConfig {
    pub fn url_for(&self, form_type: FormType) -> &str {
        match form_type {
            FormType::B2b | FormType::Waitlist | FormType::ContactUs => &self.contact_request_url,
            FormType::DcLead => &self.dc_lead_url,
        }
    }
}

pub const GA_MEASUREMENT_ID: &str = "G-5M7RJPFF5V";
pub const FB_PIXEL_ID: &str = "1234567890";

#[cfg(debug_assertions)]
pub fn debug_enabled() -> bool {
    true
}

#[cfg(not(debug_assertions))]
pub fn debug_enabled() -> bool {
    false
}

/// Whether a missing webhook URL should fall open to a simulated success
/// instead of surfacing an error. Only in development builds.
pub fn simulate_unconfigured_submissions() -> bool {
    debug_enabled()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_request_forms_share_webhook_a() {
        let cfg = WebhookConfig {
            contact_request_url: "https://hook.example/a".into(),
            dc_lead_url: "https://hook.example/b".into(),
            ..WebhookConfig::default()
        };
        assert_eq!(cfg.url_for(FormType::B2b), "https://hook.example/a");
        assert_eq!(cfg.url_for(FormType::Waitlist), "https://hook.example/a");
        assert_eq!(cfg.url_for(FormType::ContactUs), "https://hook.example/a");
        assert_eq!(cfg.url_for(FormType::DcLead), "https://hook.example/b");
    }

    #[test]
    fn default_categories_cover_the_three_known_ids() {
        let cfg = ConsentConfig::default();
        assert!(cfg.category("essential").unwrap().always_enabled);
        assert!(!cfg.category("analytics").unwrap().required);
        assert!(!cfg.category("marketing").unwrap().required);
        assert!(cfg.category("preferences").is_none());
    }
}
