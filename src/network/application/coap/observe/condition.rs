//! Notification conditions and their evaluation.
//!
//! A condition lets an observer ask for notifications only when the new value
//! of a resource matters to it: when it crosses a threshold, moves by a step,
//! or when some amount of time has passed. Each observer carries at most one.
//!
//! Evaluation is pure. The dispatcher records the notified value and time
//! only after a notification was actually sent.

use super::ObserveError;
use super::store::Observer;
use crate::network::application::coap::MessageType;
use serde::{Deserialize, Serialize};

/// Highest condition code the 5-bit type field can carry.
pub const MAX_CONDITION_CODE: u8 = 0x1F;

/// Kind of condition, carried as a 5-bit code on the wire.
///
/// Codes without a known meaning are kept as [`ConditionType::Unknown`] and
/// are never satisfied. Codes above [`MAX_CONDITION_CODE`] are rejected.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ConditionType {
    /// Cancel the observation. Not evaluated; never satisfied.
    Cancellation,
    /// Notify on every change.
    TimeSeries,
    /// Notify on change, at most once per `value` seconds.
    MinResponseTime,
    /// Notify on change, and at least once per `value` seconds.
    MaxResponseTime,
    /// Notify when the value moved by at least `value`.
    Step,
    /// Notify on change while the value is below `value`.
    AllValuesLess,
    /// Notify on change while the value is above `value`.
    AllValuesGreater,
    /// Notify when the value equals `value`.
    ValueEqual,
    /// Notify when the value crossed `value`.
    ValueNotEqual,
    /// Notify every `value` seconds regardless of the value.
    Periodic,
    /// A code this implementation does not know.
    Unknown(UnknownCode),
}

/// A condition code in `10..=31` without a known meaning.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct UnknownCode(u8);

impl UnknownCode {
    /// The raw 5-bit code.
    pub fn get(self) -> u8 {
        self.0
    }
}

impl ConditionType {
    /// Wire code of this condition type.
    pub fn code(self) -> u8 {
        match self {
            ConditionType::Cancellation => 0,
            ConditionType::TimeSeries => 1,
            ConditionType::MinResponseTime => 2,
            ConditionType::MaxResponseTime => 3,
            ConditionType::Step => 4,
            ConditionType::AllValuesLess => 5,
            ConditionType::AllValuesGreater => 6,
            ConditionType::ValueEqual => 7,
            ConditionType::ValueNotEqual => 8,
            ConditionType::Periodic => 9,
            ConditionType::Unknown(code) => code.get(),
        }
    }

    /// Map a wire code to a condition type.
    ///
    /// Fails with [`ObserveError::MalformedCondition`] for codes that do not
    /// fit the 5-bit type field.
    pub fn from_code(code: u8) -> Result<Self, ObserveError> {
        let cond_type = match code {
            0 => ConditionType::Cancellation,
            1 => ConditionType::TimeSeries,
            2 => ConditionType::MinResponseTime,
            3 => ConditionType::MaxResponseTime,
            4 => ConditionType::Step,
            5 => ConditionType::AllValuesLess,
            6 => ConditionType::AllValuesGreater,
            7 => ConditionType::ValueEqual,
            8 => ConditionType::ValueNotEqual,
            9 => ConditionType::Periodic,
            other if other <= MAX_CONDITION_CODE => ConditionType::Unknown(UnknownCode(other)),
            _ => return Err(ObserveError::MalformedCondition),
        };
        Ok(cond_type)
    }
}

impl TryFrom<u8> for ConditionType {
    type Error = ObserveError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        ConditionType::from_code(code)
    }
}

impl From<ConditionType> for u8 {
    fn from(cond_type: ConditionType) -> Self {
        cond_type.code()
    }
}

/// Message type the observer wants its notifications sent with.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Reliability {
    /// Confirmable notifications.
    #[serde(rename = "CON")]
    Confirmable,
    /// Non-confirmable notifications.
    #[serde(rename = "NON")]
    NonConfirmable,
}

impl Reliability {
    /// Message type to stamp on a notification.
    pub fn message_type(self) -> MessageType {
        match self {
            Reliability::Confirmable => MessageType::Confirmable,
            Reliability::NonConfirmable => MessageType::NonConfirmable,
        }
    }

    /// Short name used in listings.
    pub fn as_str(self) -> &'static str {
        match self {
            Reliability::Confirmable => "CON",
            Reliability::NonConfirmable => "NON",
        }
    }
}

/// How the threshold value is to be interpreted.
///
/// Evaluation treats every kind as an unsigned integer; the tag is carried
/// so the client's intent survives a round trip.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Plain integer.
    Integer,
    /// Duration in seconds.
    Duration,
    /// Float, transported in its integer representation.
    Float,
}

/// A notification condition attached to one observer.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::observe::{
///     Condition, ConditionType, Reliability, ValueKind,
/// };
///
/// let step = Condition::new(ConditionType::Step, Reliability::Confirmable, ValueKind::Integer, 5);
///
/// // last notified 10, now 16: moved by 6
/// assert!(step.is_satisfied(10, 16, 0));
/// // last notified 10, now 14: moved by 4
/// assert!(!step.is_satisfied(10, 14, 0));
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub struct Condition {
    /// What to test.
    pub cond_type: ConditionType,
    /// Preferred notification message type.
    pub reliability: Reliability,
    /// Interpretation of `value`.
    pub value_kind: ValueKind,
    /// Threshold, step or period, depending on `cond_type`.
    pub value: u32,
}

impl Condition {
    /// Create a condition.
    pub const fn new(
        cond_type: ConditionType,
        reliability: Reliability,
        value_kind: ValueKind,
        value: u32,
    ) -> Self {
        Self {
            cond_type,
            reliability,
            value_kind,
            value,
        }
    }

    /// Decide whether `new` warrants a notification.
    ///
    /// `last` is the last value notified to the observer and `elapsed` the
    /// seconds since that notification.
    pub fn is_satisfied(&self, last: u32, new: u32, elapsed: u32) -> bool {
        let threshold = self.value;
        let changed = new != last;

        match self.cond_type {
            ConditionType::TimeSeries => changed,
            ConditionType::MinResponseTime => changed && elapsed >= threshold,
            ConditionType::MaxResponseTime => changed || elapsed >= threshold,
            ConditionType::Step => new.abs_diff(last) >= threshold,
            ConditionType::AllValuesLess => new < threshold && changed,
            ConditionType::AllValuesGreater => new > threshold && changed,
            ConditionType::ValueEqual => new == threshold,
            ConditionType::ValueNotEqual => {
                (last < threshold && threshold < new) || (last > threshold && threshold > new)
            }
            ConditionType::Periodic => elapsed >= threshold,
            ConditionType::Cancellation | ConditionType::Unknown(_) => false,
        }
    }
}

/// Evaluate an observer's condition against a new resource value.
///
/// Returns `false` for observers without a condition; those follow the
/// unconditional rules of the notification policy instead.
pub fn satisfied(observer: &Observer, new_value: u32, now: u32) -> bool {
    match observer.condition() {
        Some(condition) => condition.is_satisfied(
            observer.last_notified_value(),
            new_value,
            observer.elapsed_since_notification(now),
        ),
        None => false,
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ConditionType {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "T{=u8}", self.code())
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Condition {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "T={} V={=u32} R={=str}",
            self.cond_type,
            self.value,
            self.reliability.as_str()
        )
    }
}
