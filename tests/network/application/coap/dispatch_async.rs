use super::mock::*;
use futures::executor::block_on;
use libobserve::network::application::coap::observe::{
    Condition, ConditionType, Config, ObservableResource, Observing, Reliability, ValueKind,
};
use libobserve::network::application::coap::{
    AsyncTransactions, Endpoint, ManualClock, Message, MessageType, Packet, Transactions,
};

/// Async adapter over the synchronous mock.
struct AsyncMock(MockTransactions);

impl AsyncTransactions<Packet> for AsyncMock {
    type Transaction = MockTransaction;
    type Error = MockError;

    fn next_mid(&mut self) -> u16 {
        self.0.next_mid()
    }

    fn new_transaction(&mut self, mid: u16, remote: &Endpoint) -> Option<MockTransaction> {
        self.0.new_transaction(mid, remote)
    }

    fn serialize(
        &mut self,
        message: &Packet,
        transaction: &mut MockTransaction,
    ) -> Result<usize, MockError> {
        self.0.serialize(message, transaction)
    }

    async fn send(&mut self, transaction: MockTransaction) -> Result<(), MockError> {
        self.0.send(transaction)
    }
}

#[test]
fn test_async_dispatch_matches_sync() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let mut temp = ObservableResource::new("temp").unwrap();
    let above = Condition::new(
        ConditionType::AllValuesGreater,
        Reliability::NonConfirmable,
        ValueKind::Integer,
        30,
    );
    let hot = observing
        .add_observer(&client(1), &[1], temp.handle(), Some(above))
        .unwrap();
    let all = observing.add_observer(&client(2), &[2], temp.handle(), None).unwrap();

    let mut transactions = AsyncMock(MockTransactions::new());
    let mut message = template(MessageType::Confirmable);

    let sent = block_on(observing.notify_resource_async(&mut temp, &mut message, 25, &mut transactions));
    assert_eq!(sent, 1);
    assert_eq!(observing.get(hot).unwrap().last_notified_value(), 0);
    assert_eq!(observing.get(all).unwrap().last_notified_value(), 25);

    let sent = block_on(observing.notify_resource_async(&mut temp, &mut message, 31, &mut transactions));
    assert_eq!(sent, 2);
    let to_hot = transactions.0.sent_to(&client(1));
    assert_eq!(to_hot.len(), 1);
    assert_eq!(to_hot[0].observe(), Some(2));
    assert_eq!(to_hot[0].message_type(), MessageType::NonConfirmable);
}

#[test]
fn test_async_exhaustion_and_failure() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = ObservableResource::new("temp").unwrap();
    for octet in 1..=3 {
        observing
            .add_observer(&client(octet), &[octet], temp.handle(), None)
            .unwrap();
    }

    let mut inner = MockTransactions::with_slots(2);
    inner.fail_for = Some(client(1));
    let mut transactions = AsyncMock(inner);
    let mut message = template(MessageType::NonConfirmable);

    let sent = block_on(observing.notify_observers_async(
        temp.handle(),
        1,
        &mut message,
        9,
        &mut transactions,
    ));
    // Client 1 fails, client 2 succeeds, client 3 finds no slot.
    assert_eq!(sent, 1);
    assert_eq!(transactions.0.sent.len(), 1);
    assert_eq!(transactions.0.sent[0].0, client(2));
}

#[test]
fn test_async_failed_refresh_keeps_the_refresh_due() {
    let clock = ManualClock::new(0);
    let config = Config {
        refresh_interval: 60,
        ..Config::default()
    };
    let mut observing: Observing<_> = Observing::with_config(&clock, config);
    let mut temp = ObservableResource::new("temp").unwrap();
    let every_change = Condition::new(
        ConditionType::TimeSeries,
        Reliability::NonConfirmable,
        ValueKind::Integer,
        0,
    );
    observing
        .add_observer(&client(1), &[1], temp.handle(), Some(every_change))
        .unwrap();
    let mut message = template(MessageType::NonConfirmable);

    let mut failing = MockTransactions::new();
    failing.fail_for = Some(client(1));
    let mut failing = AsyncMock(failing);
    clock.set(60);
    let sent = block_on(observing.notify_resource_async(&mut temp, &mut message, 1, &mut failing));
    assert_eq!(sent, 0);

    let mut transactions = AsyncMock(MockTransactions::new());
    clock.set(61);
    block_on(observing.notify_resource_async(&mut temp, &mut message, 2, &mut transactions));
    clock.set(62);
    block_on(observing.notify_resource_async(&mut temp, &mut message, 3, &mut transactions));

    let types: Vec<_> = transactions
        .0
        .sent
        .iter()
        .map(|(_, packet)| packet.message_type())
        .collect();
    assert_eq!(types, [MessageType::Confirmable, MessageType::NonConfirmable]);
}
