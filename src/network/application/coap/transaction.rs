//! Seam to the CoAP transaction layer.
//!
//! The transaction layer owns message id allocation, the pool of open
//! transactions and retransmission of confirmable messages. The observe
//! dispatcher only asks for a slot, has the message serialized into it and
//! hands it back for sending.

#![allow(async_fn_in_trait)]

use super::{Endpoint, Message};

/// An open transaction slot returned by [`Transactions::new_transaction`].
pub trait Transaction {
    /// Message id the slot was opened for.
    fn mid(&self) -> u16;
}

/// Synchronous transaction layer.
///
/// # Examples
///
/// ```rust
/// use libobserve::network::application::coap::{
///     Endpoint, Message, Packet, Transaction, Transactions,
/// };
///
/// struct Slot {
///     mid: u16,
///     len: usize,
/// }
///
/// impl Transaction for Slot {
///     fn mid(&self) -> u16 {
///         self.mid
///     }
/// }
///
/// struct Loopback {
///     next: u16,
///     sent: usize,
/// }
///
/// impl Transactions<Packet> for Loopback {
///     type Transaction = Slot;
///     type Error = ();
///
///     fn next_mid(&mut self) -> u16 {
///         self.next = self.next.wrapping_add(1);
///         self.next
///     }
///
///     fn new_transaction(&mut self, mid: u16, _remote: &Endpoint) -> Option<Slot> {
///         Some(Slot { mid, len: 0 })
///     }
///
///     fn serialize(&mut self, message: &Packet, slot: &mut Slot) -> Result<usize, ()> {
///         slot.len = 4 + message.token().len() + message.payload().len();
///         Ok(slot.len)
///     }
///
///     fn send(&mut self, _slot: Slot) -> Result<(), ()> {
///         self.sent += 1;
///         Ok(())
///     }
/// }
/// ```
pub trait Transactions<M: Message> {
    /// Open transaction slot.
    type Transaction: Transaction;
    /// Error reported by serialization or sending.
    type Error: core::fmt::Debug;

    /// Allocate a fresh message id.
    fn next_mid(&mut self) -> u16;

    /// Open a transaction for `mid` towards `remote`.
    ///
    /// Returns `None` when every slot is in use.
    fn new_transaction(&mut self, mid: u16, remote: &Endpoint) -> Option<Self::Transaction>;

    /// Serialize `message` into the transaction buffer, returning its length.
    fn serialize(
        &mut self,
        message: &M,
        transaction: &mut Self::Transaction,
    ) -> Result<usize, Self::Error>;

    /// Send the transaction. Confirmable messages stay owned by the layer
    /// until acknowledged or given up on.
    fn send(&mut self, transaction: Self::Transaction) -> Result<(), Self::Error>;
}

/// Asynchronous transaction layer.
///
/// Same contract as [`Transactions`], with sending awaited.
#[cfg(feature = "async")]
pub trait AsyncTransactions<M: Message> {
    /// Open transaction slot.
    type Transaction: Transaction;
    /// Error reported by serialization or sending.
    type Error: core::fmt::Debug;

    /// Allocate a fresh message id.
    fn next_mid(&mut self) -> u16;

    /// Open a transaction for `mid` towards `remote`.
    ///
    /// Returns `None` when every slot is in use.
    fn new_transaction(&mut self, mid: u16, remote: &Endpoint) -> Option<Self::Transaction>;

    /// Serialize `message` into the transaction buffer, returning its length.
    fn serialize(
        &mut self,
        message: &M,
        transaction: &mut Self::Transaction,
    ) -> Result<usize, Self::Error>;

    /// Send the transaction asynchronously.
    async fn send(&mut self, transaction: Self::Transaction) -> Result<(), Self::Error>;
}
