//! Fixed-capacity observer registry.
//!
//! Observers live in an arena of `N` slots. Callers refer to them through
//! [`ObserverId`] handles that carry the slot's generation, so a handle kept
//! past the removal of its observer is simply stale: lookups return `None`
//! and removals do nothing.
//!
//! A separate index vector keeps the insertion order, which is the order
//! notifications are dispatched and observers listed in.
//!
//! # Examples
//!
//! ```rust
//! use libobserve::network::application::coap::observe::{ObserverStore, ResourceHandle};
//! use libobserve::network::application::coap::Endpoint;
//!
//! let mut store: ObserverStore<2> = ObserverStore::new();
//! let temp = ResourceHandle::new("temp").unwrap();
//! let client = Endpoint::new([10, 0, 0, 1].into(), 5683);
//!
//! let id = store.add(&client, &[0x01], &temp, None, 0, 60).unwrap();
//! assert_eq!(store.get(id).unwrap().token(), &[0x01]);
//!
//! // Re-registering the same client for the same resource replaces it.
//! let again = store.add(&client, &[0x02], &temp, None, 0, 60).unwrap();
//! assert_eq!(store.len(), 1);
//! assert!(store.get(id).is_none());
//! assert!(store.get(again).is_some());
//! ```

use super::ObserveError;
use super::condition::Condition;
use super::resource::ResourceHandle;
use crate::network::application::coap::{Endpoint, MAX_TOKEN_LEN, Token};
use heapless::Vec;


/// Handle to an observer in an [`ObserverStore`].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ObserverId {
    index: u16,
    generation: u16,
}

impl ObserverId {
    /// Slot index inside the store.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ObserverId {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "#{=u16}.{=u16}", self.index, self.generation)
    }
}

/// A registered observer.
#[derive(Debug, Clone)]
pub struct Observer {
    endpoint: Endpoint,
    token: Token,
    resource: ResourceHandle,
    condition: Option<Condition>,
    last_mid: u16,
    refresh_start: u32,
    refresh_interval: u32,
    last_value: u32,
    last_time: u32,
}

impl Observer {
    /// Client endpoint notifications are sent to.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Token of the registering request, echoed in every notification.
    pub fn token(&self) -> &[u8] {
        &self.token
    }

    pub(crate) fn token_vec(&self) -> &Token {
        &self.token
    }

    /// Observed resource.
    pub fn resource(&self) -> &ResourceHandle {
        &self.resource
    }

    /// Notification condition, if the observer registered with one.
    pub fn condition(&self) -> Option<&Condition> {
        self.condition.as_ref()
    }

    /// Message id of the last notification sent.
    pub fn last_mid(&self) -> u16 {
        self.last_mid
    }

    /// Value carried by the last notification.
    pub fn last_notified_value(&self) -> u32 {
        self.last_value
    }

    /// Time of the last notification, or of registration.
    pub fn last_notification_time(&self) -> u32 {
        self.last_time
    }

    /// Seconds since the last notification.
    pub fn elapsed_since_notification(&self, now: u32) -> u32 {
        now.wrapping_sub(self.last_time)
    }

    /// Whether the next notification must be confirmable.
    pub fn refresh_expired(&self, now: u32) -> bool {
        now.wrapping_sub(self.refresh_start) >= self.refresh_interval
    }

    pub(crate) fn restart_refresh(&mut self, now: u32) {
        self.refresh_start = now;
    }

    pub(crate) fn record_notification(&mut self, value: u32, now: u32, mid: u16) {
        self.last_value = value;
        self.last_time = now;
        self.last_mid = mid;
    }

    fn belongs_to(&self, endpoint: &Endpoint) -> bool {
        self.endpoint == *endpoint
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u16,
    observer: Option<Observer>,
}

impl Slot {
    fn release(&mut self) -> Option<Observer> {
        let observer = self.observer.take();
        if observer.is_some() {
            self.generation = self.generation.wrapping_add(1);
        }
        observer
    }
}

/// Registry of at most `N` observers.
#[derive(Debug)]
pub struct ObserverStore<const N: usize> {
    slots: [Slot; N],
    order: Vec<u16, N>,
}

impl<const N: usize> Default for ObserverStore<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ObserverStore<N> {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            slots: core::array::from_fn(|_| Slot::default()),
            order: Vec::new(),
        }
    }

    /// Register an observer.
    ///
    /// An existing registration of `endpoint` for `resource` is removed
    /// first, so a client holds at most one observation per resource. The
    /// new observer starts with last value 0, last notification time `now`
    /// and a refresh timer of `refresh_interval` seconds started at `now`.
    pub fn add(
        &mut self,
        endpoint: &Endpoint,
        token: &[u8],
        resource: &ResourceHandle,
        condition: Option<Condition>,
        now: u32,
        refresh_interval: u32,
    ) -> Result<ObserverId, ObserveError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(ObserveError::TokenTooLong);
        }
        let token = Token::from_slice(token).map_err(|_| ObserveError::TokenTooLong)?;

        if self.remove_by_resource(Some(endpoint), resource) > 0 {
            debug!("replacing observer for {}", resource);
        }

        let index = self
            .slots
            .iter()
            .position(|slot| slot.observer.is_none())
            .ok_or(ObserveError::TooManyObservers)?;
        // A free slot implies room in the order index.
        self.order
            .push(index as u16)
            .map_err(|_| ObserveError::TooManyObservers)?;

        let slot = &mut self.slots[index];
        slot.observer = Some(Observer {
            endpoint: *endpoint,
            token,
            resource: resource.clone(),
            condition,
            last_mid: 0,
            refresh_start: now,
            refresh_interval,
            last_value: 0,
            last_time: now,
        });

        let id = ObserverId {
            index: index as u16,
            generation: slot.generation,
        };
        debug!("added observer {} for {} ({}/{})", id, resource, self.order.len(), N);
        Ok(id)
    }

    /// Remove one observer. Returns `false` for a stale handle.
    pub fn remove(&mut self, id: ObserverId) -> bool {
        if self.get(id).is_none() {
            return false;
        }
        self.order.retain(|&index| index != id.index);
        self.slots[id.index()].release().is_some()
    }

    /// Remove every observation held by `endpoint`.
    pub fn remove_by_client(&mut self, endpoint: &Endpoint) -> usize {
        self.remove_where(|observer| observer.belongs_to(endpoint))
    }

    /// Remove the observations of `endpoint` registered with `token`.
    pub fn remove_by_token(&mut self, endpoint: &Endpoint, token: &[u8]) -> usize {
        self.remove_where(|observer| observer.belongs_to(endpoint) && observer.token() == token)
    }

    /// Remove the observers of `resource`, of any client when `endpoint` is
    /// `None`.
    pub fn remove_by_resource(
        &mut self,
        endpoint: Option<&Endpoint>,
        resource: &ResourceHandle,
    ) -> usize {
        self.remove_where(|observer| {
            endpoint.is_none_or(|endpoint| observer.belongs_to(endpoint))
                && observer.resource == *resource
        })
    }

    /// Remove the observer of `endpoint` whose last notification used `mid`.
    pub fn remove_by_mid(&mut self, endpoint: &Endpoint, mid: u16) -> usize {
        self.remove_where(|observer| observer.belongs_to(endpoint) && observer.last_mid == mid)
    }

    /// Remove every observer.
    pub fn reset_all(&mut self) -> usize {
        self.remove_where(|_| true)
    }

    /// Look up an observer. Returns `None` for a stale handle.
    pub fn get(&self, id: ObserverId) -> Option<&Observer> {
        let slot = self.slots.get(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.observer.as_ref()
    }

    pub(crate) fn get_mut(&mut self, id: ObserverId) -> Option<&mut Observer> {
        let slot = self.slots.get_mut(id.index())?;
        if slot.generation != id.generation {
            return None;
        }
        slot.observer.as_mut()
    }

    /// Handles of all observers, in insertion order.
    pub fn ids(&self) -> Vec<ObserverId, N> {
        self.order
            .iter()
            .map(|&index| ObserverId {
                index,
                generation: self.slots[index as usize].generation,
            })
            .collect()
    }

    /// Iterate over observers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ObserverId, &Observer)> + '_ {
        self.order.iter().filter_map(move |&index| {
            let slot = &self.slots[index as usize];
            let observer = slot.observer.as_ref()?;
            Some((
                ObserverId {
                    index,
                    generation: slot.generation,
                },
                observer,
            ))
        })
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Maximum number of observers.
    pub const fn capacity(&self) -> usize {
        N
    }

    fn remove_where(&mut self, mut matches: impl FnMut(&Observer) -> bool) -> usize {
        let slots = &mut self.slots;
        let before = self.order.len();

        self.order.retain(|&index| {
            let slot = &mut slots[index as usize];
            if slot.observer.as_ref().is_some_and(&mut matches) {
                slot.release();
                false
            } else {
                true
            }
        });

        let removed = before - self.order.len();
        if removed > 0 {
            trace!("removed {} observer(s)", removed);
        }
        removed
    }
}
