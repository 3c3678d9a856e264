use std::cell::RefCell;
use std::rc::Rc;

use chrono::{DateTime, SecondsFormat, Utc};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::ConsentConfig;

/// Persisted cookie-consent choices. `essential` is forced `true` on every
/// read and write; it is never negotiable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConsentPreferences {
    #[serde(default)]
    pub essential: bool,
    #[serde(default)]
    pub analytics: bool,
    #[serde(default)]
    pub marketing: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// The user's choice for the non-essential categories.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ConsentChoice {
    pub analytics: bool,
    pub marketing: bool,
}

impl ConsentChoice {
    pub fn accept_all() -> Self {
        Self { analytics: true, marketing: true }
    }

    pub fn reject_non_essential() -> Self {
        Self::default()
    }
}

/// Key-value persistence behind the consent store. Browser localStorage in
/// the app, an in-memory map in tests.
pub trait ConsentStorage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// localStorage-backed storage. Absent storage (disabled cookies, no
/// window) degrades to "nothing stored".
pub struct BrowserStorage;

impl ConsentStorage for BrowserStorage {
    fn get(&self, key: &str) -> Option<String> {
        let storage = web_sys::window()?.local_storage().ok()??;
        storage.get_item(key).ok()?
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(window) = web_sys::window() {
            if let Ok(Some(storage)) = window.local_storage() {
                if storage.set_item(key, value).is_err() {
                    warn!("failed to persist consent preferences");
                }
                return;
            }
        }
        warn!("localStorage unavailable; consent preferences not persisted");
    }

    fn remove(&self, key: &str) {
        if let Some(window) = web_sys::window() {
            if let Ok(Some(storage)) = window.local_storage() {
                let _ = storage.remove_item(key);
            }
        }
    }
}

pub type ConsentListener = Rc<dyn Fn(Option<&ConsentPreferences>)>;

/// Single source of truth for cookie-consent state. Consumers subscribe
/// for change notifications instead of watching DOM events.
pub struct ConsentStore {
    storage: Rc<dyn ConsentStorage>,
    config: ConsentConfig,
    listeners: RefCell<Vec<ConsentListener>>,
}

impl ConsentStore {
    pub fn new(storage: Rc<dyn ConsentStorage>, config: ConsentConfig) -> Self {
        Self {
            storage,
            config,
            listeners: RefCell::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &ConsentConfig {
        &self.config
    }

    pub fn subscribe(&self, listener: ConsentListener) {
        self.listeners.borrow_mut().push(listener);
    }

    fn notify(&self, preferences: Option<&ConsentPreferences>) {
        for listener in self.listeners.borrow().iter() {
            listener(preferences);
        }
    }

    /// Reads stored preferences. Returns `None` when nothing is stored or
    /// the stored value does not deserialize to a preferences object.
    pub fn get_preferences(&self) -> Option<ConsentPreferences> {
        let raw = self.storage.get(&self.config.storage_key)?;
        match serde_json::from_str::<ConsentPreferences>(&raw) {
            Ok(mut preferences) => {
                preferences.essential = true;
                Some(preferences)
            }
            Err(err) => {
                warn!("stored consent preferences are malformed: {err}");
                None
            }
        }
    }

    /// Persists a choice, stamping the current time, and notifies
    /// subscribers with the full new preferences.
    pub fn set_consent(&self, choice: ConsentChoice) {
        let preferences = ConsentPreferences {
            essential: true,
            analytics: choice.analytics,
            marketing: choice.marketing,
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)),
        };
        match serde_json::to_string(&preferences) {
            Ok(serialized) => {
                self.storage.set(&self.config.storage_key, &serialized);
                self.notify(Some(&preferences));
            }
            Err(err) => warn!("failed to serialize consent preferences: {err}"),
        }
    }

    /// Removes stored preferences and notifies subscribers with `None`.
    pub fn clear_consent(&self) {
        self.storage.remove(&self.config.storage_key);
        self.notify(None);
    }

    /// Consent state for one category. Essential is always granted;
    /// unknown categories are always denied.
    pub fn has_consent(&self, category: &str) -> bool {
        if category == "essential" {
            return true;
        }
        let Some(spec) = self.config.category(category) else {
            warn!("unknown cookie category: {category}");
            return false;
        };
        if spec.always_enabled {
            return true;
        }
        let Some(preferences) = self.get_preferences() else {
            return false;
        };
        match category {
            "analytics" => preferences.analytics,
            "marketing" => preferences.marketing,
            _ => false,
        }
    }

    pub fn has_made_choice(&self) -> bool {
        self.get_preferences()
            .map(|p| p.timestamp.is_some())
            .unwrap_or(false)
    }

    /// True when stored consent is older than the configured window, or
    /// when there is nothing (timestamped) stored at all.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        let Some(preferences) = self.get_preferences() else {
            return true;
        };
        let Some(timestamp) = preferences.timestamp else {
            return true;
        };
        let Some(expiration_days) = self.config.expiration_days else {
            return false;
        };
        match DateTime::parse_from_rfc3339(&timestamp) {
            Ok(stored) => {
                let age_days = (now - stored.with_timezone(&Utc)).num_seconds() as f64 / 86_400.0;
                age_days > expiration_days as f64
            }
            Err(err) => {
                warn!("unparseable consent timestamp {timestamp:?}: {err}");
                true
            }
        }
    }

    /// Banner policy: should the consent prompt be shown?
    ///
    /// A stored rejection of every non-essential category is cleared here
    /// and treated as "no choice yet", so the banner re-prompts on every
    /// visit until the user opts in to something. This is deliberate
    /// product policy, not an accident: only affirmative opt-ins persist.
    pub fn requires_prompt(&self) -> bool {
        if let Some(preferences) = self.get_preferences() {
            if !preferences.analytics && !preferences.marketing {
                self.clear_consent();
                return true;
            }
        }
        !self.has_made_choice() || self.is_expired()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CategorySpec;
    use chrono::Duration;
    use std::cell::Cell;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct MemoryStorage {
        entries: RefCell<HashMap<String, String>>,
    }

    impl ConsentStorage for MemoryStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.entries.borrow().get(key).cloned()
        }

        fn set(&self, key: &str, value: &str) {
            self.entries.borrow_mut().insert(key.to_string(), value.to_string());
        }

        fn remove(&self, key: &str) {
            self.entries.borrow_mut().remove(key);
        }
    }

    fn store() -> ConsentStore {
        ConsentStore::new(Rc::new(MemoryStorage::default()), ConsentConfig::default())
    }

    #[test]
    fn essential_is_true_after_every_round_trip() {
        let store = store();
        store.set_consent(ConsentChoice { analytics: true, marketing: false });
        assert!(store.get_preferences().unwrap().essential);
        store.set_consent(ConsentChoice::reject_non_essential());
        assert!(store.get_preferences().unwrap().essential);
    }

    #[test]
    fn essential_forced_true_even_if_stored_false() {
        let storage = Rc::new(MemoryStorage::default());
        let config = ConsentConfig::default();
        storage.set(
            &config.storage_key,
            r#"{"essential":false,"analytics":true,"marketing":false,"timestamp":"2025-01-01T00:00:00.000Z"}"#,
        );
        let store = ConsentStore::new(storage, config);
        assert!(store.get_preferences().unwrap().essential);
    }

    #[test]
    fn malformed_stored_value_reads_as_none() {
        let storage = Rc::new(MemoryStorage::default());
        let config = ConsentConfig::default();
        storage.set(&config.storage_key, "not json");
        let store = ConsentStore::new(storage.clone(), config.clone());
        assert!(store.get_preferences().is_none());

        storage.set(&config.storage_key, "42");
        assert!(store.get_preferences().is_none());
    }

    #[test]
    fn has_consent_contract() {
        let store = store();
        assert!(store.has_consent("essential"));
        assert!(!store.has_consent("analytics"));

        store.set_consent(ConsentChoice { analytics: true, marketing: false });
        assert!(store.has_consent("analytics"));
        assert!(!store.has_consent("marketing"));
        assert!(!store.has_consent("does-not-exist"));
    }

    #[test]
    fn category_table_is_consulted_before_stored_preferences() {
        let mut config = ConsentConfig::default();
        config.categories.push(CategorySpec {
            id: "functional",
            name: "Functional",
            description: "",
            required: true,
            always_enabled: true,
        });
        let store = ConsentStore::new(Rc::new(MemoryStorage::default()), config);

        // Nothing stored yet: unknown ids are denied, always-on ones are
        // granted anyway.
        assert!(!store.has_made_choice());
        assert!(!store.has_consent("does-not-exist"));
        assert!(store.has_consent("functional"));
    }

    #[test]
    fn made_choice_requires_a_timestamp() {
        let store = store();
        assert!(!store.has_made_choice());
        store.set_consent(ConsentChoice::accept_all());
        assert!(store.has_made_choice());
    }

    #[test]
    fn clear_consent_is_idempotent_and_notifies_each_time() {
        let store = store();
        let notifications = Rc::new(Cell::new(0u32));
        {
            let notifications = notifications.clone();
            store.subscribe(Rc::new(move |preferences| {
                assert!(preferences.is_none());
                notifications.set(notifications.get() + 1);
            }));
        }
        store.clear_consent();
        store.clear_consent();
        assert_eq!(notifications.get(), 2);
        assert!(store.get_preferences().is_none());
    }

    #[test]
    fn set_consent_notifies_with_the_new_preferences() {
        let store = store();
        let seen = Rc::new(RefCell::new(None::<ConsentPreferences>));
        {
            let seen = seen.clone();
            store.subscribe(Rc::new(move |preferences| {
                *seen.borrow_mut() = preferences.cloned();
            }));
        }
        store.set_consent(ConsentChoice { analytics: false, marketing: true });
        let seen = seen.borrow();
        let preferences = seen.as_ref().unwrap();
        assert!(preferences.essential);
        assert!(!preferences.analytics);
        assert!(preferences.marketing);
        assert!(preferences.timestamp.is_some());
    }

    #[test]
    fn reject_all_is_cleared_by_the_prompt_policy() {
        let store = store();
        store.set_consent(ConsentChoice::reject_non_essential());
        assert!(store.get_preferences().is_some());

        assert!(store.requires_prompt());
        assert!(!store.has_made_choice());
        assert!(store.get_preferences().is_none());
    }

    #[test]
    fn affirmative_opt_in_suppresses_the_prompt() {
        let store = store();
        store.set_consent(ConsentChoice { analytics: true, marketing: false });
        assert!(!store.requires_prompt());
        assert!(store.has_made_choice());
    }

    #[test]
    fn expiry_window() {
        let storage = Rc::new(MemoryStorage::default());
        let config = ConsentConfig { expiration_days: Some(30), ..ConsentConfig::default() };
        let store = ConsentStore::new(storage, config);
        store.set_consent(ConsentChoice::accept_all());

        assert!(!store.is_expired_at(Utc::now() + Duration::days(29)));
        assert!(store.is_expired_at(Utc::now() + Duration::days(31)));
    }

    #[test]
    fn no_expiration_configured_never_expires() {
        let storage = Rc::new(MemoryStorage::default());
        let config = ConsentConfig { expiration_days: None, ..ConsentConfig::default() };
        let store = ConsentStore::new(storage, config);
        store.set_consent(ConsentChoice::accept_all());
        assert!(!store.is_expired_at(Utc::now() + Duration::days(10_000)));
    }

    #[test]
    fn missing_or_untimestamped_preferences_count_as_expired() {
        let store = store();
        assert!(store.is_expired());

        let storage = Rc::new(MemoryStorage::default());
        let config = ConsentConfig::default();
        storage.set(&config.storage_key, r#"{"analytics":true,"marketing":true}"#);
        let store = ConsentStore::new(storage, config);
        assert!(store.is_expired());
        assert!(!store.has_made_choice());
    }
}
