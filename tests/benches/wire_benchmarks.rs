//! # Telematics Client Benchmarks
//!
//! | Area | Operation |
//! |------|-----------|
//! | tc-02 Wire codec | encode / decode across payload sizes |
//! | tc-02 Channel | fire-and-forget send over a socket pair |
//! | tc-01 Coordinator | one tick over the full telematics topology |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::Rng;
use shared_types::{ComponentRole, Identity};
use std::os::unix::net::UnixStream;
use std::sync::Arc;
use tc_01_shutdown_coordinator::{
    CoordinatorConfig, ReceiverRegistry, ShutdownCoordinator, StagePlan,
};
use tc_02_message_channel::wire::{decode, encode};
use tc_02_message_channel::{
    ChannelConfig, Connection, Message, MessageChannel, MAX_MESSAGE_LENGTH,
};

// ============================================================================
// TC-02: Wire Codec
// ============================================================================

fn bench_wire_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-02-wire-codec");
    let mut rng = rand::thread_rng();

    for size in [0usize, 64, 1024, 16 * 1024, MAX_MESSAGE_LENGTH - 1] {
        let payload: Vec<u8> = (0..size).map(|_| rng.gen()).collect();
        let mut message = Message::new(7, 42).unwrap();
        message.set_payload(&payload).unwrap();
        let frame = encode(&message);

        group.throughput(Throughput::Bytes(frame.len() as u64));
        group.bench_with_input(BenchmarkId::new("encode", size), &message, |b, m| {
            b.iter(|| black_box(encode(m)))
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &frame, |b, f| {
            b.iter(|| black_box(decode(f).unwrap()))
        });
    }

    group.finish();
}

// ============================================================================
// TC-02: Channel Send
// ============================================================================

fn bench_channel_send(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-02-channel");
    let channel = MessageChannel::new(ChannelConfig::default());
    let (left, right) = UnixStream::pair().unwrap();
    let left = Arc::new(Connection::from_unix(left));
    let right = Arc::new(Connection::from_unix(right));

    group.bench_function("send_receive_1k", |b| {
        let payload = vec![0xA5u8; 1024];
        b.iter(|| {
            let mut message = channel.create_message(3, Arc::clone(&left)).unwrap();
            message.set_payload(&payload).unwrap();
            channel.send(&mut message, false).unwrap();
            black_box(channel.receive(&right).unwrap())
        })
    });

    group.finish();
}

// ============================================================================
// TC-01: Coordinator Tick
// ============================================================================

fn bench_coordinator_tick(c: &mut Criterion) {
    let mut group = c.benchmark_group("tc-01-coordinator");

    group.bench_function("tick_full_topology", |b| {
        b.iter_with_setup(
            || {
                let registry = Arc::new(ReceiverRegistry::new());
                for role in ComponentRole::all() {
                    let registry_for_role = Arc::clone(&registry);
                    registry.register(
                        Identity::Fixed(role),
                        Some(Arc::new(move || {
                            registry_for_role.mark_ready(&Identity::Fixed(role));
                        })),
                    );
                }
                ShutdownCoordinator::new(
                    registry,
                    StagePlan::default(),
                    CoordinatorConfig::default(),
                    Arc::new(|| {}),
                )
            },
            |coordinator| {
                // Receivers finish inline, so each tick clears one stage.
                while !coordinator.tick().complete {}
                black_box(coordinator.is_complete())
            },
        )
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_wire_codec,
    bench_channel_send,
    bench_coordinator_tick
);
criterion_main!(benches);
