//! CoAP Observe with conditional observe.
//!
//! This module implements the server side of resource observation for
//! constrained devices:
//!
//! - [`store`]: a fixed-capacity registry of observers
//! - [`condition`]: the per-observer notification conditions and their evaluation
//! - [`codec`]: the Condition option wire format
//! - [`policy`]: plain versus conditional notification strategies
//! - [`Observing`]: the facade tying them together; it handles incoming GET
//!   requests, dispatches notifications and lists the current observers
//!
//! # Lifecycle
//!
//! ```text
//!  GET + Observe [+ Condition] ──▶ observe_handler ──▶ ObserverStore::add
//!  GET without Observe         ──▶ observe_handler ──▶ remove_by_resource
//!  RST for a notification      ──▶ handle_reset    ──▶ remove_by_mid
//!  resource changed            ──▶ notify_observers ─▶ policy ─▶ Transactions
//! ```
//!
//! # Example
//!
//! ```rust
//! use libobserve::network::application::coap::observe::{
//!     Condition, ConditionType, Observing, ObservableResource, Reliability, ValueKind,
//! };
//! use libobserve::network::application::coap::{Endpoint, ManualClock, Token};
//!
//! let clock = ManualClock::new(0);
//! let mut observing: Observing<_> = Observing::new(&clock);
//! let resource = ObservableResource::new("sensors/temp").unwrap();
//!
//! let client = Endpoint::new([192, 168, 1, 20].into(), 5683);
//! let token = Token::from_slice(&[0x01]).unwrap();
//! let step = Condition::new(ConditionType::Step, Reliability::NonConfirmable, ValueKind::Integer, 5);
//!
//! observing
//!     .add_observer(&client, &token, resource.handle(), Some(step))
//!     .unwrap();
//! assert_eq!(observing.observer_count(), 1);
//! ```

#![deny(unsafe_code)]

use serde::Deserialize;

pub mod codec;
pub mod condition;
mod handler;
mod listing;
mod notify;
mod observing;
pub mod policy;
mod resource;
pub mod store;

pub use codec::{CONDITION_CODEC_VERSION, EncodedCondition, decode_condition, encode_condition};
pub use condition::{
    Condition, ConditionType, MAX_CONDITION_CODE, Reliability, UnknownCode, ValueKind, satisfied,
};
pub use handler::Registration;
pub use listing::Block;
pub use observing::Observing;
pub use policy::{ConditionalPolicy, NotificationPolicy, PlainPolicy};
pub use resource::{MAX_URL_LEN, ObservableResource, ResourceHandle};
pub use store::{Observer, ObserverId, ObserverStore};

/// Number of transactions the transaction layer is expected to keep open.
pub const MAX_OPEN_TRANSACTIONS: usize = 4;

/// Default observer capacity, one below the transaction pool so a CON
/// notification can always be answered.
pub const DEFAULT_MAX_OBSERVERS: usize = MAX_OPEN_TRANSACTIONS - 1;

/// Seconds after which a notification is forced to CON to check the client
/// is still there.
pub const DEFAULT_REFRESH_INTERVAL: u32 = 60;

/// Payload of the 5.03 response sent when the observer pool is full.
pub const TOO_MANY_OBSERVERS: &[u8] = b"TooManyObservers";

/// Payload of the 4.02 response sent when a listing offset is past the end.
pub const BLOCK_OUT_OF_SCOPE: &[u8] = b"BlockOutOfScope";

/// Error types for observe operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ObserveError {
    /// The observer pool is exhausted.
    TooManyObservers,
    /// The Condition option could not be decoded.
    MalformedCondition,
    /// A token longer than [`MAX_TOKEN_LEN`](super::MAX_TOKEN_LEN) bytes.
    TokenTooLong,
    /// A resource path longer than [`MAX_URL_LEN`] bytes.
    UrlTooLong,
    /// A listing offset lies past the end of the listing.
    BlockOutOfScope,
    /// A caller-supplied buffer is too small.
    BufferOverflow,
}

impl core::fmt::Display for ObserveError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            ObserveError::TooManyObservers => "too many observers",
            ObserveError::MalformedCondition => "malformed condition option",
            ObserveError::TokenTooLong => "token too long",
            ObserveError::UrlTooLong => "resource path too long",
            ObserveError::BlockOutOfScope => "block out of scope",
            ObserveError::BufferOverflow => "buffer overflow",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ObserveError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ObserveError::TooManyObservers => defmt::write!(f, "TooManyObservers"),
            ObserveError::MalformedCondition => defmt::write!(f, "MalformedCondition"),
            ObserveError::TokenTooLong => defmt::write!(f, "TokenTooLong"),
            ObserveError::UrlTooLong => defmt::write!(f, "UrlTooLong"),
            ObserveError::BlockOutOfScope => defmt::write!(f, "BlockOutOfScope"),
            ObserveError::BufferOverflow => defmt::write!(f, "BufferOverflow"),
        }
    }
}

/// Runtime configuration of an [`Observing`] instance.
///
/// Capacity is a const generic on [`Observing`]; everything else lives here.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::observe::Config;
///
/// let config = Config::from_json(r#"{"refresh_interval": 30}"#).unwrap();
/// assert_eq!(config.refresh_interval, 30);
/// assert!(!config.echo_registration);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Seconds between forced CON notifications per observer.
    pub refresh_interval: u32,
    /// Put an `Added <n>/<max>` progress line in the payload of a successful
    /// registration response.
    pub echo_registration: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            echo_registration: false,
        }
    }
}

impl Config {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json_core::de::Error> {
        serde_json_core::from_str(json).map(|(config, _)| config)
    }
}
