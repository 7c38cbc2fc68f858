use chatter_proto::{DomainEvent, EventKind, GroupId, RawValue, Target, UserId};
use chatterd::router::EventRouter;
use chatterd::state::{Hub, Session};
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use std::sync::Arc;

// Measures encode-once fan-out to a room, draining every mailbox per
// iteration so queues never fill.

fn room(members: usize) -> (EventRouter, Vec<Session>) {
    let router = EventRouter::new(Arc::new(Hub::new("0BN", 64)));
    let group = GroupId::from("g1");
    let sessions: Vec<Session> = (0..members)
        .map(|i| {
            let session = router.hub().connect(Some(UserId::from(format!("u{i}"))));
            router.hub().join(group.clone(), &session.conn);
            session
        })
        .collect();
    (router, sessions)
}

fn group_fanout_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("group_fanout");
    let payload = RawValue::from_string(r#"{"groupId":"g1","text":"Hello world"}"#.to_string())
        .expect("valid payload");
    let event = DomainEvent::new(
        EventKind::GroupMessage,
        Target::Group(GroupId::from("g1")),
        payload,
    );

    for members in [10usize, 100, 1000] {
        let (router, mut sessions) = room(members);
        for s in &mut sessions {
            s.mailbox.drain();
        }
        group.throughput(Throughput::Elements(members as u64));
        group.bench_with_input(BenchmarkId::from_parameter(members), &members, |b, _| {
            b.iter(|| {
                router.publish(&event).expect("encodes");
                for s in &mut sessions {
                    s.mailbox.drain();
                }
            })
        });
    }

    group.finish();
}

criterion_group!(benches, group_fanout_benchmark);
criterion_main!(benches);
