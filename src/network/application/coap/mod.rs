//! CoAP building blocks shared by the observe implementation.
//!
//! The CoAP parser, serializer and retransmission engine are not part of this
//! crate. What the observe logic needs from them is captured here:
//!
//! - [`Message`]: option accessors on a parsed request or an outgoing response
//! - [`Transactions`]: message id allocation, transaction slots and sending
//! - [`Clock`]: a seconds counter used for refresh timers and conditions
//!
//! [`Packet`] is a small heapless message that implements [`Message`]; it is
//! good enough as a notification template and for tests, and platforms with
//! their own message type implement the trait for it instead.

#![deny(unsafe_code)]

use core::cell::Cell;
use core::net::IpAddr;

pub mod message;
pub mod observe;
pub mod transaction;

pub use message::Packet;
#[cfg(feature = "async")]
pub use transaction::AsyncTransactions;
pub use transaction::{Transaction, Transactions};

/// Maximum token length allowed by CoAP.
pub const MAX_TOKEN_LEN: usize = 8;

/// Max-Age assumed when a message does not carry the option (RFC 7252).
pub const DEFAULT_MAX_AGE: u32 = 60;

/// Option number of the Observe option.
pub const OPTION_OBSERVE: u16 = 6;

/// Option number used for the conditional-observe Condition option.
pub const OPTION_CONDITION: u16 = 18;

/// Content format `text/plain; charset=utf-8`.
pub const TEXT_PLAIN: u16 = 0;

/// Content format `application/link-format`.
pub const APPLICATION_LINK_FORMAT: u16 = 40;

/// A client token: opaque bytes chosen by the client to correlate exchanges.
pub type Token = heapless::Vec<u8, MAX_TOKEN_LEN>;

/// Reliability class of a CoAP message.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::MessageType;
///
/// assert_eq!(MessageType::Confirmable as u8, 0);
/// assert_eq!(MessageType::from_bits(1), MessageType::NonConfirmable);
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum MessageType {
    /// CON: requires an acknowledgement from the peer.
    Confirmable = 0,
    /// NON: fire and forget.
    NonConfirmable = 1,
    /// ACK: acknowledges a confirmable message.
    Acknowledgement = 2,
    /// RST: the peer could not process a message.
    Reset = 3,
}

impl MessageType {
    /// Decode the two-bit type field of the CoAP header.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }
}

/// A CoAP request method or response code (`class << 5 | detail`).
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Code(pub u8);

impl Code {
    /// 0.00 Empty message.
    pub const EMPTY: Code = Code(0x00);
    /// 0.01 GET.
    pub const GET: Code = Code(0x01);
    /// 0.02 POST.
    pub const POST: Code = Code(0x02);
    /// 0.03 PUT.
    pub const PUT: Code = Code(0x03);
    /// 0.04 DELETE.
    pub const DELETE: Code = Code(0x04);
    /// 2.05 Content.
    pub const CONTENT: Code = Code(0x45);
    /// 4.02 Bad Option.
    pub const BAD_OPTION: Code = Code(0x82);
    /// 5.03 Service Unavailable.
    pub const SERVICE_UNAVAILABLE: Code = Code(0xA3);

    /// Response class (the digit before the dot).
    pub fn class(self) -> u8 {
        self.0 >> 5
    }

    /// Whether this is a client or server error response (4.xx or 5.xx).
    pub fn is_error(self) -> bool {
        self.0 >= 0x80
    }
}

/// Network endpoint of a CoAP client.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct Endpoint {
    /// Client IP address.
    pub addr: IpAddr,
    /// Client UDP port.
    pub port: u16,
}

impl Endpoint {
    /// Create an endpoint from an address and port.
    pub const fn new(addr: IpAddr, port: u16) -> Self {
        Self { addr, port }
    }
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "[{}]:{}", self.addr, self.port)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Endpoint {
    fn format(&self, f: defmt::Formatter) {
        match self.addr {
            IpAddr::V4(v4) => {
                let [a, b, c, d] = v4.octets();
                defmt::write!(f, "{}.{}.{}.{}:{}", a, b, c, d, self.port)
            }
            IpAddr::V6(v6) => defmt::write!(f, "[{=[u8]:02x}]:{}", &v6.octets()[..], self.port),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for MessageType {
    fn format(&self, f: defmt::Formatter) {
        match self {
            MessageType::Confirmable => defmt::write!(f, "CON"),
            MessageType::NonConfirmable => defmt::write!(f, "NON"),
            MessageType::Acknowledgement => defmt::write!(f, "ACK"),
            MessageType::Reset => defmt::write!(f, "RST"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Code {
    fn format(&self, f: defmt::Formatter) {
        let detail = self.0 & 0x1F;
        defmt::write!(f, "{}.{}{}", self.class(), detail / 10, detail % 10)
    }
}

/// Access to the parts of a CoAP message the observe logic reads or stamps.
///
/// Implemented by the platform's message type. Serialization is not part of
/// this trait; it belongs to [`Transactions::serialize`].
pub trait Message {
    /// Request method or response code.
    fn code(&self) -> Code;
    /// Set the response code.
    fn set_code(&mut self, code: Code);
    /// Header message type.
    fn message_type(&self) -> MessageType;
    /// Set the header message type.
    fn set_message_type(&mut self, message_type: MessageType);
    /// Header message id.
    fn mid(&self) -> u16;
    /// Set the header message id.
    fn set_mid(&mut self, mid: u16);
    /// Token bytes.
    fn token(&self) -> &[u8];
    /// Replace the token.
    fn set_token(&mut self, token: &Token);
    /// Observe option value, `None` when the option is absent.
    fn observe(&self) -> Option<u32>;
    /// Set (`Some`) or remove (`None`) the Observe option.
    fn set_observe(&mut self, sequence: Option<u32>);
    /// Raw Condition option bytes, `None` when the option is absent.
    fn condition(&self) -> Option<&[u8]>;
    /// Set (`Some`) or remove (`None`) the Condition option.
    fn set_condition(&mut self, condition: Option<&[u8]>);
    /// Max-Age in seconds, [`DEFAULT_MAX_AGE`] when the option is absent.
    fn max_age(&self) -> u32;
    /// Set the Content-Format option.
    fn set_content_format(&mut self, format: u16);
    /// Replace the payload, returning the number of bytes stored.
    fn set_payload(&mut self, payload: &[u8]) -> usize;
}

/// Monotonic seconds counter.
pub trait Clock {
    /// Seconds since an arbitrary epoch; allowed to wrap.
    fn seconds(&self) -> u32;
}

impl<T: Clock + ?Sized> Clock for &T {
    fn seconds(&self) -> u32 {
        (**self).seconds()
    }
}

/// A clock advanced by hand, for simulations and tests.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::{Clock, ManualClock};
///
/// let clock = ManualClock::new(100);
/// clock.advance(5);
/// assert_eq!(clock.seconds(), 105);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    /// Create a clock reading `start` seconds.
    pub const fn new(start: u32) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Jump to an absolute time.
    pub fn set(&self, seconds: u32) {
        self.now.set(seconds);
    }

    /// Move the clock forward.
    pub fn advance(&self, seconds: u32) {
        self.now.set(self.now.get().wrapping_add(seconds));
    }
}

impl Clock for ManualClock {
    fn seconds(&self) -> u32 {
        self.now.get()
    }
}
