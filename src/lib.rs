//! # libobserve - CoAP Observe for constrained devices
//!
//! A `no_std` implementation of the server side of the CoAP "Observe"
//! extension, including the conditional-observe condition option. Clients
//! register interest in a resource with a GET carrying the Observe option and
//! receive notifications whenever the resource changes, or only when a
//! per-observer condition (threshold, step, periodic, ...) is met.
//!
//! ## Scope
//!
//! This crate decides *who* to notify, *when*, and *with which message type*.
//! Everything around it is supplied by the application through traits:
//!
//! - **Message layer**: [`Message`](network::application::coap::Message) gives
//!   access to the options the observe logic reads and stamps.
//! - **Transaction layer**: [`Transactions`](network::application::coap::Transactions)
//!   allocates message ids and transaction slots, serializes and sends.
//! - **Clock**: [`Clock`](network::application::coap::Clock) provides seconds.
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libobserve = "0.1.0"
//! ```
//!
//! ### Registering and notifying
//!
//! ```rust
//! use libobserve::network::application::coap::observe::{Observing, ObservableResource};
//! use libobserve::network::application::coap::{
//!     Code, Endpoint, ManualClock, Message, MessageType, Packet,
//! };
//!
//! let clock = ManualClock::new(0);
//! let mut observing: Observing<_> = Observing::new(&clock);
//! let temperature = ObservableResource::new("sensors/temp").unwrap();
//!
//! let client = Endpoint::new([10, 0, 0, 7].into(), 5683);
//! let mut request = Packet::new(MessageType::Confirmable, Code::GET, 0x1001);
//! request.set_token(&[0xCA, 0xFE]).unwrap();
//! request.set_observe(Some(0));
//! let mut response = Packet::new(MessageType::Acknowledgement, Code::CONTENT, 0x1001);
//!
//! observing.observe_handler(temperature.handle(), &client, &request, &mut response);
//! assert_eq!(response.observe(), Some(0));
//! assert_eq!(observing.observer_count(), 1);
//! ```
//!
//! ## Optional Features
//!
//! - `std`: Enable standard library support (default: disabled)
//! - `async`: Enable the async transaction trait and dispatcher
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]

#[macro_use]
mod fmt;

/// Network layer: the CoAP observe implementation lives under
/// [`network::application::coap`].
pub mod network;
