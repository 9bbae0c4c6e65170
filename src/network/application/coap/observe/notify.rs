//! Notification dispatch.
//!
//! One pass walks the observers of a resource in registration order. The
//! walk runs over a snapshot of handles, so observers removed while the pass
//! is running are skipped instead of invalidating it. A single template
//! message is re-stamped for each observer that qualifies.

use super::codec::encode_condition;
use super::observing::Observing;
use super::policy::NotificationPolicy;
use super::resource::{ObservableResource, ResourceHandle};
use super::store::ObserverId;
#[cfg(feature = "async")]
use crate::network::application::coap::AsyncTransactions;
use crate::network::application::coap::{Clock, Endpoint, Message, MessageType, Transactions};

/// Per-pass values that do not change between observers.
struct Pass<'a> {
    resource: &'a ResourceHandle,
    sequence: u32,
    value: u32,
    now: u32,
    max_age: u32,
    original_type: MessageType,
}

impl<K: Clock, P: NotificationPolicy, const N: usize> Observing<K, P, N> {
    /// Notify the observers of `resource` of a new `value`.
    ///
    /// `template` is the notification to send; its message id, Observe,
    /// token, Condition option and type are overwritten for each observer and
    /// its type is restored at the end. Returns the number of notifications
    /// handed to the transaction layer.
    ///
    /// An observer's last value, last notification time and last message id
    /// are updated only when its notification was sent. An observer for whom
    /// no transaction slot is available is skipped.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use libobserve::network::application::coap::observe::{Observing, ResourceHandle};
    /// use libobserve::network::application::coap::{
    ///     Code, Endpoint, ManualClock, Message, MessageType, Packet, Transaction, Transactions,
    /// };
    ///
    /// struct Slot(u16);
    /// impl Transaction for Slot {
    ///     fn mid(&self) -> u16 { self.0 }
    /// }
    ///
    /// #[derive(Default)]
    /// struct Counter { mid: u16, sent: usize }
    /// impl Transactions<Packet> for Counter {
    ///     type Transaction = Slot;
    ///     type Error = ();
    ///     fn next_mid(&mut self) -> u16 { self.mid += 1; self.mid }
    ///     fn new_transaction(&mut self, mid: u16, _: &Endpoint) -> Option<Slot> { Some(Slot(mid)) }
    ///     fn serialize(&mut self, _: &Packet, _: &mut Slot) -> Result<usize, ()> { Ok(0) }
    ///     fn send(&mut self, _: Slot) -> Result<(), ()> { self.sent += 1; Ok(()) }
    /// }
    ///
    /// let clock = ManualClock::new(0);
    /// let mut observing: Observing<_> = Observing::new(&clock);
    /// let temp = ResourceHandle::new("temp").unwrap();
    /// let client = Endpoint::new([10, 0, 0, 2].into(), 5683);
    /// observing.add_observer(&client, &[7], &temp, None).unwrap();
    ///
    /// let mut template = Packet::new(MessageType::NonConfirmable, Code::CONTENT, 0);
    /// template.set_payload(b"22");
    /// let mut transactions = Counter::default();
    ///
    /// assert_eq!(observing.notify_observers(&temp, 1, &mut template, 22, &mut transactions), 1);
    /// // Unchanged value within Max-Age: nothing to send.
    /// assert_eq!(observing.notify_observers(&temp, 2, &mut template, 22, &mut transactions), 0);
    /// assert_eq!(transactions.sent, 1);
    /// ```
    pub fn notify_observers<M, T>(
        &mut self,
        resource: &ResourceHandle,
        sequence: u32,
        template: &mut M,
        value: u32,
        transactions: &mut T,
    ) -> usize
    where
        M: Message,
        T: Transactions<M>,
    {
        let pass = self.begin_pass(resource, sequence, template, value);
        let mut sent = 0;

        for id in self.store.ids() {
            let Some(endpoint) = self.select(id, &pass) else {
                continue;
            };

            let mid = transactions.next_mid();
            let Some(mut transaction) = transactions.new_transaction(mid, &endpoint) else {
                debug!("no transaction slot for {}, skipped", endpoint);
                continue;
            };

            let refresh = self.stamp(id, &pass, template, mid);
            let result = transactions
                .serialize(template, &mut transaction)
                .and_then(|_| transactions.send(transaction));

            match result {
                Ok(()) => {
                    self.commit(id, &pass, mid, refresh);
                    sent += 1;
                }
                Err(_e) => warn!("notification to {} failed", endpoint),
            }
        }

        template.set_message_type(pass.original_type);
        sent
    }

    /// Advance the sequence of `resource` and notify its observers.
    pub fn notify_resource<M, T>(
        &mut self,
        resource: &mut ObservableResource,
        template: &mut M,
        value: u32,
        transactions: &mut T,
    ) -> usize
    where
        M: Message,
        T: Transactions<M>,
    {
        let sequence = resource.next_sequence();
        self.notify_observers(resource.handle(), sequence, template, value, transactions)
    }

    /// Asynchronous variant of [`notify_observers`](Self::notify_observers).
    #[cfg(feature = "async")]
    pub async fn notify_observers_async<M, T>(
        &mut self,
        resource: &ResourceHandle,
        sequence: u32,
        template: &mut M,
        value: u32,
        transactions: &mut T,
    ) -> usize
    where
        M: Message,
        T: AsyncTransactions<M>,
    {
        let pass = self.begin_pass(resource, sequence, template, value);
        let mut sent = 0;

        for id in self.store.ids() {
            let Some(endpoint) = self.select(id, &pass) else {
                continue;
            };

            let mid = transactions.next_mid();
            let Some(mut transaction) = transactions.new_transaction(mid, &endpoint) else {
                debug!("no transaction slot for {}, skipped", endpoint);
                continue;
            };

            let refresh = self.stamp(id, &pass, template, mid);
            if let Err(_e) = transactions.serialize(template, &mut transaction) {
                warn!("notification to {} could not be serialized", endpoint);
                continue;
            }

            match transactions.send(transaction).await {
                Ok(()) => {
                    self.commit(id, &pass, mid, refresh);
                    sent += 1;
                }
                Err(_e) => warn!("notification to {} failed", endpoint),
            }
        }

        template.set_message_type(pass.original_type);
        sent
    }

    /// Asynchronous variant of [`notify_resource`](Self::notify_resource).
    #[cfg(feature = "async")]
    pub async fn notify_resource_async<M, T>(
        &mut self,
        resource: &mut ObservableResource,
        template: &mut M,
        value: u32,
        transactions: &mut T,
    ) -> usize
    where
        M: Message,
        T: AsyncTransactions<M>,
    {
        let sequence = resource.next_sequence();
        self.notify_observers_async(resource.handle(), sequence, template, value, transactions)
            .await
    }

    fn begin_pass<'a, M: Message>(
        &self,
        resource: &'a ResourceHandle,
        sequence: u32,
        template: &M,
        value: u32,
    ) -> Pass<'a> {
        trace!("notifying observers of {}, value {=u32}", resource, value);
        Pass {
            resource,
            sequence,
            value,
            now: self.clock.seconds(),
            max_age: template.max_age(),
            original_type: template.message_type(),
        }
    }

    /// Endpoint to notify, if the observer is still registered, observes the
    /// resource and qualifies under the policy.
    fn select(&self, id: ObserverId, pass: &Pass<'_>) -> Option<Endpoint> {
        let observer = self.store.get(id)?;
        if observer.resource() != pass.resource {
            return None;
        }
        if !self
            .policy
            .should_notify(observer, pass.value, pass.now, pass.max_age)
        {
            trace!("observer {} does not qualify", id);
            return None;
        }
        Some(*observer.endpoint())
    }

    /// Stamp `template` for one observer. Returns whether this is the
    /// refresh CON; the timer restarts only once it was sent.
    fn stamp<M: Message>(
        &self,
        id: ObserverId,
        pass: &Pass<'_>,
        template: &mut M,
        mid: u16,
    ) -> bool {
        let Some(observer) = self.store.get(id) else {
            return false;
        };

        template.set_mid(mid);
        template.set_observe(Some(pass.sequence));
        template.set_token(observer.token_vec());

        match observer.condition() {
            Some(condition) if P::ACCEPTS_CONDITIONS => {
                template.set_condition(Some(encode_condition(condition).as_slice()))
            }
            _ => template.set_condition(None),
        }

        let refresh = observer.refresh_expired(pass.now);
        let message_type = if refresh {
            debug!("refresh due for {}, sending CON", observer.endpoint());
            MessageType::Confirmable
        } else {
            self.policy.preferred_type(observer, pass.original_type)
        };
        template.set_message_type(message_type);
        refresh
    }

    fn commit(&mut self, id: ObserverId, pass: &Pass<'_>, mid: u16, refresh: bool) {
        if let Some(observer) = self.store.get_mut(id) {
            observer.record_notification(pass.value, pass.now, mid);
            if refresh {
                observer.restart_refresh(pass.now);
            }
        }
    }
}
