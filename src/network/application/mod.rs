//! # Application Layer Network Protocols
//!
//! This module contains application layer (OSI Layer 7) protocol logic used by
//! constrained IoT nodes.
//!
//! ## Available Protocols
//!
//! - **[`coap`]**: Constrained Application Protocol, server-side Observe
//!   registry and notification dispatch
//!
//! ## Design Principles
//!
//! - **Transport Agnostic**: Message encoding and delivery are supplied by the
//!   caller through traits
//! - **No-std Compatible**: No heap allocation, every collection is bounded
//! - **Resource Conscious**: One shared notification buffer per dispatch pass
//! - **Error Handling**: Plain error enums that are cheap to copy and log

/// CoAP (Constrained Application Protocol) observe support.
///
/// CoAP is a specialized web transfer protocol designed for use with constrained
/// nodes and constrained networks in the Internet of Things. The Observe
/// extension lets clients subscribe to resources and receive push updates.
pub mod coap;
