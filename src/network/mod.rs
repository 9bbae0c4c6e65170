//! Network protocol implementations for constrained devices.
//!
//! Only the application layer is implemented here. Sockets, retransmission
//! and message parsing are left to the platform and reached through the traits
//! in [`application::coap`].

#![deny(unsafe_code)]

/// Application layer protocols.
pub mod application;
