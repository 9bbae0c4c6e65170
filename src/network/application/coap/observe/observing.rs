//! The [`Observing`] facade.

use super::condition::Condition;
use super::policy::{ConditionalPolicy, NotificationPolicy};
use super::resource::ResourceHandle;
use super::store::{Observer, ObserverId, ObserverStore};
use super::{Config, DEFAULT_MAX_OBSERVERS, ObserveError};
use crate::network::application::coap::{Clock, Endpoint};

/// Server-side observe state: the observer registry plus the clock, policy
/// and configuration used to manage it.
///
/// Every operation takes `&mut self`. On a preemptive scheduler, keep the
/// whole value behind one mutex and hold it for the duration of each call.
///
/// # Type parameters
///
/// - `K`: seconds clock
/// - `P`: notification policy, [`ConditionalPolicy`] unless chosen otherwise
/// - `N`: observer capacity
#[derive(Debug)]
pub struct Observing<K: Clock, P: NotificationPolicy = ConditionalPolicy, const N: usize = DEFAULT_MAX_OBSERVERS>
{
    pub(super) store: ObserverStore<N>,
    pub(super) clock: K,
    pub(super) policy: P,
    pub(super) config: Config,
}

impl<K: Clock, P: NotificationPolicy + Default, const N: usize> Observing<K, P, N> {
    /// Create an instance with the default configuration.
    pub fn new(clock: K) -> Self {
        Self::with_config(clock, Config::default())
    }

    /// Create an instance with `config`.
    pub fn with_config(clock: K, config: Config) -> Self {
        Self::with_policy(clock, P::default(), config)
    }
}

impl<K: Clock, P: NotificationPolicy, const N: usize> Observing<K, P, N> {
    /// Create an instance with an explicit policy value.
    pub fn with_policy(clock: K, policy: P, config: Config) -> Self {
        Self {
            store: ObserverStore::new(),
            clock,
            policy,
            config,
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current time according to the clock.
    pub fn now(&self) -> u32 {
        self.clock.seconds()
    }

    /// Register `endpoint` as an observer of `resource`.
    ///
    /// Replaces an existing registration of the same client for the same
    /// resource. Conditions are dropped when the policy does not accept them.
    pub fn add_observer(
        &mut self,
        endpoint: &Endpoint,
        token: &[u8],
        resource: &ResourceHandle,
        condition: Option<Condition>,
    ) -> Result<ObserverId, ObserveError> {
        let condition = condition.filter(|_| P::ACCEPTS_CONDITIONS);
        let now = self.clock.seconds();
        let result = self.store.add(
            endpoint,
            token,
            resource,
            condition,
            now,
            self.config.refresh_interval,
        );
        if let Err(ObserveError::TooManyObservers) = result {
            warn!("observer pool full ({}), rejecting {}", N, endpoint);
        }
        result
    }

    /// Remove one observer. Returns `false` for a stale handle.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.store.remove(id)
    }

    /// Remove every observation held by `endpoint`.
    pub fn remove_observer_by_client(&mut self, endpoint: &Endpoint) -> usize {
        self.store.remove_by_client(endpoint)
    }

    /// Remove the observations of `endpoint` registered with `token`.
    pub fn remove_observer_by_token(&mut self, endpoint: &Endpoint, token: &[u8]) -> usize {
        self.store.remove_by_token(endpoint, token)
    }

    /// Remove the observers of `resource`; `None` matches every client.
    pub fn remove_observer_by_resource(
        &mut self,
        endpoint: Option<&Endpoint>,
        resource: &ResourceHandle,
    ) -> usize {
        self.store.remove_by_resource(endpoint, resource)
    }

    /// Remove the observer of `endpoint` last notified with `mid`.
    pub fn remove_observer_by_mid(&mut self, endpoint: &Endpoint, mid: u16) -> usize {
        self.store.remove_by_mid(endpoint, mid)
    }

    /// Handle a RST received from `endpoint` for message id `mid`.
    ///
    /// A client resetting a notification is no longer interested, so the
    /// observer that notification was sent to is removed.
    pub fn handle_reset(&mut self, endpoint: &Endpoint, mid: u16) -> usize {
        let removed = self.store.remove_by_mid(endpoint, mid);
        if removed > 0 {
            debug!("RST from {} for mid {=u16}, observer removed", endpoint, mid);
        }
        removed
    }

    /// Remove every observer, returning how many there were.
    pub fn reset_observations(&mut self) -> usize {
        self.store.reset_all()
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.store.len()
    }

    /// Maximum number of observers.
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Look up an observer.
    pub fn get(&self, id: ObserverId) -> Option<&Observer> {
        self.store.get(id)
    }

    /// Iterate over observers in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (ObserverId, &Observer)> + '_ {
        self.store.iter()
    }
}
