use criterion::{criterion_group, criterion_main};


criterion_group!(
    benches,
    network::application::coap::observe::bench_notify_unconditional,
    network::application::coap::observe::bench_notify_conditional,
    network::application::coap::observe::bench_observe_handler,
    network::application::coap::observe::bench_list_observations
);
criterion_main!(benches);
