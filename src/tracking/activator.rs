use std::cell::RefCell;
use std::rc::Rc;

use crate::consent::store::ConsentPreferences;

/// Capability set every tracking provider implements. The activator only
/// talks through this interface; it has no provider-specific branching.
pub trait TrackingIntegration {
    /// Pushes the current consent state to the provider. Called on every
    /// consent change, initialized or not.
    fn update_consent_signal(&mut self, analytics: bool, marketing: bool);

    /// Loads and configures the provider. Called at most once per page
    /// load, and only after a denied-by-default consent signal has been
    /// replaced with a grant.
    fn initialize(&mut self);

    fn is_initialized(&self) -> bool;
}

pub type SharedIntegration = Rc<RefCell<dyn TrackingIntegration>>;

/// Routes consent categories to providers: analytics consent gates the
/// analytics provider, marketing consent gates the marketing/ads provider.
pub struct TrackingActivator {
    analytics: SharedIntegration,
    marketing: SharedIntegration,
}

impl TrackingActivator {
    pub fn new(analytics: SharedIntegration, marketing: SharedIntegration) -> Self {
        Self { analytics, marketing }
    }

    /// Applies a consent decision to both providers.
    ///
    /// The consent signal is always updated first so a provider can never
    /// start collecting under a stale "denied" state; initialization then
    /// happens once per provider, and only for granted categories.
    pub fn apply_consent(&self, preferences: &ConsentPreferences) {
        for provider in [&self.analytics, &self.marketing] {
            provider
                .borrow_mut()
                .update_consent_signal(preferences.analytics, preferences.marketing);
        }

        if preferences.analytics && !self.analytics.borrow().is_initialized() {
            self.analytics.borrow_mut().initialize();
        }
        if preferences.marketing && !self.marketing.borrow().is_initialized() {
            self.marketing.borrow_mut().initialize();
        }
    }
}
