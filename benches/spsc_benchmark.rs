//! Single-producer single-consumer throughput over the full pipeline.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use ringbus::disruptor::{
    event_translator, BusySpinWaitStrategy, ClosureEventHandler, DefaultEventFactory, Disruptor,
    ProducerType,
};

#[derive(Debug, Default)]
struct BenchEvent {
    value: i64,
}

const BURST: i64 = 256;

fn spsc_throughput(c: &mut Criterion) {
    let consumed = Arc::new(AtomicI64::new(0));

    let factory = DefaultEventFactory::<BenchEvent>::new();
    let mut disruptor = Disruptor::new(
        &factory,
        1 << 14,
        ProducerType::Single,
        Box::new(BusySpinWaitStrategy::new()),
    )
    .unwrap()
    .handle_events_with(ClosureEventHandler::new({
        let consumed = Arc::clone(&consumed);
        move |_event: &mut BenchEvent, _sequence, _end_of_batch| {
            consumed.fetch_add(1, Ordering::Release);
            Ok(())
        }
    }))
    .build();

    disruptor.start().unwrap();

    let translator = event_translator(|event: &mut BenchEvent, sequence| event.value = sequence);

    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Elements(BURST as u64));
    group.bench_function("publish_burst", |b| {
        b.iter(|| {
            let target = consumed.load(Ordering::Acquire) + BURST;
            for _ in 0..BURST {
                disruptor.publish_event(&translator).unwrap();
            }
            while consumed.load(Ordering::Acquire) < target {
                std::hint::spin_loop();
            }
        });
    });
    group.finish();

    disruptor.shutdown();
}

criterion_group!(benches, spsc_throughput);
criterion_main!(benches);
