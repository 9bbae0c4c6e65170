use super::mock::*;
use libobserve::network::application::coap::observe::{
    Condition, ConditionType, ConditionalPolicy, Config, ObservableResource, Observing,
    PlainPolicy, Reliability, ValueKind, encode_condition,
};
use libobserve::network::application::coap::{ManualClock, Message, MessageType};

fn condition(cond_type: ConditionType, reliability: Reliability, value: u32) -> Condition {
    Condition::new(cond_type, reliability, ValueKind::Integer, value)
}

#[test]
fn test_only_qualifying_observers_are_notified() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_, ConditionalPolicy, 8> = Observing::new(&clock);
    let temp = resource("temp");

    let step_small = condition(ConditionType::Step, Reliability::NonConfirmable, 5);
    let step_large = condition(ConditionType::Step, Reliability::NonConfirmable, 50);
    let above = condition(ConditionType::AllValuesGreater, Reliability::Confirmable, 100);

    let a = observing.add_observer(&client(1), &[1], &temp, Some(step_small)).unwrap();
    let b = observing.add_observer(&client(2), &[2], &temp, Some(step_large)).unwrap();
    let c = observing.add_observer(&client(3), &[3], &temp, Some(above)).unwrap();
    let d = observing.add_observer(&client(4), &[4], &temp, None).unwrap();

    clock.advance(1);
    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::Confirmable);
    let sent = observing.notify_observers(&temp, 1, &mut message, 10, &mut transactions);

    assert_eq!(sent, 2);
    assert_eq!(transactions.sent.len(), 2);
    assert_eq!(observing.get(a).unwrap().last_notified_value(), 10);
    assert_eq!(observing.get(a).unwrap().last_notification_time(), 1);
    assert_eq!(observing.get(b).unwrap().last_notified_value(), 0);
    assert_eq!(observing.get(c).unwrap().last_notified_value(), 0);
    assert_eq!(observing.get(d).unwrap().last_notified_value(), 10);
    assert_eq!(observing.get(b).unwrap().last_notification_time(), 0);
}

#[test]
fn test_notification_is_stamped_per_observer() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    let time_series = condition(ConditionType::TimeSeries, Reliability::NonConfirmable, 0);

    let conditional = observing
        .add_observer(&client(1), &[0xA1], &temp, Some(time_series))
        .unwrap();
    let plain = observing.add_observer(&client(2), &[0xB2, 0xB3], &temp, None).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::Confirmable);
    assert_eq!(
        observing.notify_observers(&temp, 7, &mut message, 1, &mut transactions),
        2
    );

    let first = transactions.sent_to(&client(1))[0];
    assert_eq!(first.token(), &[0xA1]);
    assert_eq!(first.observe(), Some(7));
    assert_eq!(first.message_type(), MessageType::NonConfirmable);
    assert_eq!(first.condition(), Some(encode_condition(&time_series).as_slice()));
    assert_eq!(first.payload(), b"value");

    let second = transactions.sent_to(&client(2))[0];
    assert_eq!(second.token(), &[0xB2, 0xB3]);
    assert_eq!(second.message_type(), MessageType::Confirmable);
    assert_eq!(second.condition(), None);
    assert_ne!(first.mid(), second.mid());

    assert_eq!(observing.get(conditional).unwrap().last_mid(), first.mid());
    assert_eq!(observing.get(plain).unwrap().last_mid(), second.mid());
    // The template keeps its own type.
    assert_eq!(message.message_type(), MessageType::Confirmable);
}

#[test]
fn test_refresh_forces_confirmable_and_restarts() {
    let clock = ManualClock::new(0);
    let config = Config {
        refresh_interval: 60,
        ..Config::default()
    };
    let mut observing: Observing<_> = Observing::with_config(&clock, config);
    let temp = resource("temp");
    let every_change = condition(ConditionType::TimeSeries, Reliability::NonConfirmable, 0);
    observing.add_observer(&client(1), &[1], &temp, Some(every_change)).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::NonConfirmable);

    clock.set(10);
    observing.notify_observers(&temp, 1, &mut message, 1, &mut transactions);
    clock.set(60);
    observing.notify_observers(&temp, 2, &mut message, 2, &mut transactions);
    clock.set(70);
    observing.notify_observers(&temp, 3, &mut message, 3, &mut transactions);
    clock.set(119);
    observing.notify_observers(&temp, 4, &mut message, 4, &mut transactions);
    clock.set(120);
    observing.notify_observers(&temp, 5, &mut message, 5, &mut transactions);

    let types: Vec<_> = transactions
        .sent
        .iter()
        .map(|(_, packet)| packet.message_type())
        .collect();
    assert_eq!(
        types,
        [
            MessageType::NonConfirmable,
            MessageType::Confirmable,
            MessageType::NonConfirmable,
            MessageType::NonConfirmable,
            MessageType::Confirmable,
        ]
    );
    assert_eq!(message.message_type(), MessageType::NonConfirmable);
}

#[test]
fn test_unconditional_observer_follows_max_age() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    let id = observing.add_observer(&client(1), &[1], &temp, None).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::NonConfirmable);
    message.set_max_age(Some(30));

    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 5, &mut transactions), 1);
    clock.advance(29);
    assert_eq!(observing.notify_observers(&temp, 2, &mut message, 5, &mut transactions), 0);
    clock.advance(1);
    assert_eq!(observing.notify_observers(&temp, 3, &mut message, 5, &mut transactions), 1);
    assert_eq!(observing.get(id).unwrap().last_notification_time(), 30);
}

#[test]
fn test_other_resources_are_untouched() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    let humidity = resource("humidity");
    observing.add_observer(&client(1), &[1], &temp, None).unwrap();
    let other = observing.add_observer(&client(2), &[2], &humidity, None).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::NonConfirmable);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 9, &mut transactions), 1);
    assert!(transactions.sent_to(&client(2)).is_empty());
    assert_eq!(observing.get(other).unwrap().last_notified_value(), 0);
}

#[test]
fn test_transaction_exhaustion_skips_silently() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    let first = observing.add_observer(&client(1), &[1], &temp, None).unwrap();
    let second = observing.add_observer(&client(2), &[2], &temp, None).unwrap();

    let mut transactions = MockTransactions::with_slots(1);
    let mut message = template(MessageType::NonConfirmable);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 3, &mut transactions), 1);

    assert_eq!(observing.get(first).unwrap().last_notified_value(), 3);
    assert_eq!(observing.get(second).unwrap().last_notified_value(), 0);
    assert_eq!(observing.get(second).unwrap().last_mid(), 0);
    assert_eq!(observing.observer_count(), 2);
}

#[test]
fn test_failed_send_leaves_state_untouched() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    let failing = observing.add_observer(&client(1), &[1], &temp, None).unwrap();
    let working = observing.add_observer(&client(2), &[2], &temp, None).unwrap();

    let mut transactions = MockTransactions::new();
    transactions.fail_for = Some(client(1));
    let mut message = template(MessageType::NonConfirmable);

    clock.set(5);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 8, &mut transactions), 1);
    let observer = observing.get(failing).unwrap();
    assert_eq!(observer.last_notified_value(), 0);
    assert_eq!(observer.last_notification_time(), 0);
    assert_eq!(observer.last_mid(), 0);
    assert_eq!(observing.get(working).unwrap().last_notified_value(), 8);
}

#[test]
fn test_failed_refresh_keeps_the_refresh_due() {
    let clock = ManualClock::new(0);
    let config = Config {
        refresh_interval: 60,
        ..Config::default()
    };
    let mut observing: Observing<_> = Observing::with_config(&clock, config);
    let temp = resource("temp");
    let every_change = condition(ConditionType::TimeSeries, Reliability::NonConfirmable, 0);
    let id = observing.add_observer(&client(1), &[1], &temp, Some(every_change)).unwrap();
    let mut message = template(MessageType::NonConfirmable);

    let mut failing = MockTransactions::new();
    failing.fail_for = Some(client(1));
    clock.set(60);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 1, &mut failing), 0);
    assert!(observing.get(id).unwrap().refresh_expired(61));

    let mut transactions = MockTransactions::new();
    clock.set(61);
    assert_eq!(observing.notify_observers(&temp, 2, &mut message, 2, &mut transactions), 1);
    clock.set(62);
    assert_eq!(observing.notify_observers(&temp, 3, &mut message, 3, &mut transactions), 1);

    assert_eq!(transactions.sent[0].1.message_type(), MessageType::Confirmable);
    assert_eq!(transactions.sent[1].1.message_type(), MessageType::NonConfirmable);
    assert!(!observing.get(id).unwrap().refresh_expired(120));
    assert!(observing.get(id).unwrap().refresh_expired(121));
}

#[test]
fn test_periodic_condition_is_gated_by_last_send() {
    let clock = ManualClock::new(0);
    let config = Config {
        refresh_interval: 3600,
        ..Config::default()
    };
    let mut observing: Observing<_> = Observing::with_config(&clock, config);
    let temp = resource("temp");
    let every_30s = condition(ConditionType::Periodic, Reliability::NonConfirmable, 30);
    let id = observing.add_observer(&client(1), &[1], &temp, Some(every_30s)).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::NonConfirmable);

    clock.set(29);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 4, &mut transactions), 0);
    clock.set(30);
    assert_eq!(observing.notify_observers(&temp, 2, &mut message, 4, &mut transactions), 1);
    assert_eq!(observing.get(id).unwrap().last_notification_time(), 30);

    // The period now counts from the send at 30.
    clock.set(59);
    assert_eq!(observing.notify_observers(&temp, 3, &mut message, 4, &mut transactions), 0);
    clock.set(60);
    assert_eq!(observing.notify_observers(&temp, 4, &mut message, 4, &mut transactions), 1);
    assert_eq!(observing.get(id).unwrap().last_notification_time(), 60);

    // A failed send does not restart the period.
    let mut failing = MockTransactions::new();
    failing.fail_for = Some(client(1));
    clock.set(90);
    assert_eq!(observing.notify_observers(&temp, 5, &mut message, 4, &mut failing), 0);
    clock.set(91);
    assert_eq!(observing.notify_observers(&temp, 6, &mut message, 4, &mut transactions), 1);
    assert_eq!(observing.get(id).unwrap().last_notification_time(), 91);

    assert_eq!(transactions.sent.len(), 3);
    assert!(
        transactions
            .sent
            .iter()
            .all(|(_, packet)| packet.message_type() == MessageType::NonConfirmable)
    );
}

#[test]
fn test_reset_for_last_mid_removes_observer() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_> = Observing::new(&clock);
    let temp = resource("temp");
    observing.add_observer(&client(1), &[1], &temp, None).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::Confirmable);
    observing.notify_observers(&temp, 1, &mut message, 1, &mut transactions);
    let mid = transactions.sent[0].1.mid();

    assert_eq!(observing.handle_reset(&client(1), mid.wrapping_add(1)), 0);
    assert_eq!(observing.handle_reset(&client(1), mid), 1);
    assert_eq!(observing.observer_count(), 0);
}

#[test]
fn test_plain_policy_notifies_every_time() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_, PlainPolicy> = Observing::new(&clock);
    let temp = resource("temp");
    let never = condition(ConditionType::ValueEqual, Reliability::NonConfirmable, 1000);
    let id = observing.add_observer(&client(1), &[1], &temp, Some(never)).unwrap();
    assert!(observing.get(id).unwrap().condition().is_none());

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::Confirmable);
    assert_eq!(observing.notify_observers(&temp, 1, &mut message, 4, &mut transactions), 1);
    assert_eq!(observing.notify_observers(&temp, 2, &mut message, 4, &mut transactions), 1);
    assert_eq!(transactions.sent[1].1.condition(), None);
    assert_eq!(transactions.sent[1].1.message_type(), MessageType::Confirmable);
}

#[test]
fn test_resource_sequence_advances() {
    let clock = ManualClock::new(0);
    let mut observing: Observing<_, PlainPolicy> = Observing::new(&clock);
    let mut counter = ObservableResource::new("/counter").unwrap();
    observing.add_observer(&client(1), &[1], counter.handle(), None).unwrap();

    let mut transactions = MockTransactions::new();
    let mut message = template(MessageType::NonConfirmable);
    observing.notify_resource(&mut counter, &mut message, 1, &mut transactions);
    observing.notify_resource(&mut counter, &mut message, 2, &mut transactions);

    let sequences: Vec<_> = transactions
        .sent
        .iter()
        .map(|(_, packet)| packet.observe())
        .collect();
    assert_eq!(sequences, [Some(1), Some(2)]);
    assert_eq!(counter.sequence(), 2);
}
