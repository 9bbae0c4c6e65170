//! Notification strategies.
//!
//! A policy decides whether an observer gets a notification for a new value
//! and which message type it prefers. [`ConditionalPolicy`] honours the
//! Condition option; [`PlainPolicy`] is classic observe, where every change
//! is sent to every observer and Condition options are ignored.

use super::condition::satisfied;
use super::store::Observer;
use crate::network::application::coap::MessageType;

/// Strategy used by the notification dispatcher and the request handler.
///
/// # Examples
///
/// A policy that only notifies on even values:
///
/// ```rust
/// use libobserve::network::application::coap::observe::{NotificationPolicy, Observer};
///
/// #[derive(Debug, Default)]
/// struct EvenOnly;
///
/// impl NotificationPolicy for EvenOnly {
///     const ACCEPTS_CONDITIONS: bool = false;
///
///     fn should_notify(&self, _observer: &Observer, value: u32, _now: u32, _max_age: u32) -> bool {
///         value % 2 == 0
///     }
/// }
/// ```
pub trait NotificationPolicy {
    /// Whether registrations may carry a Condition option.
    const ACCEPTS_CONDITIONS: bool;

    /// Decide whether `observer` is notified of `value` at time `now`.
    ///
    /// `max_age` is the Max-Age of the notification template.
    fn should_notify(&self, observer: &Observer, value: u32, now: u32, max_age: u32) -> bool;

    /// Message type the observer prefers when no refresh is due.
    fn preferred_type(&self, observer: &Observer, template: MessageType) -> MessageType {
        let _ = observer;
        template
    }
}

/// Conditional observe.
///
/// Observers with a condition are notified when it is satisfied and prefer
/// the condition's reliability. Observers without one are notified when the
/// value changed, or when it did not change but the last notification is
/// older than Max-Age.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalPolicy;

impl NotificationPolicy for ConditionalPolicy {
    const ACCEPTS_CONDITIONS: bool = true;

    fn should_notify(&self, observer: &Observer, value: u32, now: u32, max_age: u32) -> bool {
        if observer.condition().is_some() {
            return satisfied(observer, value, now);
        }
        value != observer.last_notified_value()
            || observer.elapsed_since_notification(now) >= max_age
    }

    fn preferred_type(&self, observer: &Observer, template: MessageType) -> MessageType {
        observer
            .condition()
            .map_or(template, |condition| condition.reliability.message_type())
    }
}

/// Plain observe: notify every observer on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainPolicy;

impl NotificationPolicy for PlainPolicy {
    const ACCEPTS_CONDITIONS: bool = false;

    fn should_notify(&self, _observer: &Observer, _value: u32, _now: u32, _max_age: u32) -> bool {
        true
    }
}
