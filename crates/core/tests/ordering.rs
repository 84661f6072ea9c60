use std::{sync::Arc, time::Duration};

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use test_log::test;
use usage_core::{
    BatchWindow, DeliveryPipeline, DeliveryWorker, Event, EventFactory, EventKind,
    InMemoryDecisionStore, Location, MemorySink, PipelineState,
};

fn accepted_pipeline(sink: Arc<MemorySink>) -> (DeliveryPipeline, Arc<InMemoryDecisionStore>) {
    let store = Arc::new(InMemoryDecisionStore::decided(true));
    (DeliveryPipeline::new(sink, store.clone(), None), store)
}

fn factory(store: Arc<InMemoryDecisionStore>) -> (EventFactory, Arc<BatchWindow>) {
    let window = Arc::new(BatchWindow::new(Duration::from_secs(2)));
    (EventFactory::new(window.clone(), store), window)
}

fn click(factory: &EventFactory, name: &str) -> Event {
    factory
        .create_event(EventKind::Click, name.to_string(), Location::GENERAL)
        .send()
}

#[test(tokio::test)]
async fn failure_on_middle_event_requeues_it_and_everything_after() {
    let sink = Arc::new(MemorySink::new());
    let (mut pipeline, store) = accepted_pipeline(sink.clone());
    let (factory, window) = factory(store);

    let seqs: Vec<u64> = ["a", "b", "c"]
        .iter()
        .map(|name| click(&factory, name).sequence())
        .collect();
    assert_eq!(seqs, vec![0, 1, 2]);
    sink.fail_once_on(1);

    let report = pipeline.process(window.drain().unwrap()).await;

    assert_eq!(sink.delivered_sequences(), vec![0]);
    assert_eq!(pipeline.held_back_sequences(), vec![1, 2]);
    assert_eq!(report.sent, 1);
    assert_eq!(report.requeued, 2);
}

#[test(tokio::test)]
async fn sent_events_are_never_presented_again() {
    let sink = Arc::new(MemorySink::new());
    let (mut pipeline, store) = accepted_pipeline(sink.clone());
    let (factory, window) = factory(store);

    for name in ["a", "b", "c", "d"] {
        click(&factory, name);
    }
    sink.fail_once_on(2);
    pipeline.process(window.drain().unwrap()).await;
    assert_eq!(sink.attempts(), 3);

    click(&factory, "e");
    pipeline.process(window.drain().unwrap()).await;

    assert_eq!(sink.delivered_sequences(), vec![0, 1, 2, 3, 4]);
    // {0, 1, 2} in the first pass, then {2, 3, 4} once each.
    assert_eq!(sink.attempts(), 6);
}

#[test(tokio::test)]
async fn declined_before_creation_never_reaches_the_window() {
    let store = Arc::new(InMemoryDecisionStore::decided(false));
    let (factory, window) = factory(store);

    let event = click(&factory, "a");

    assert_eq!(event.sequence(), 0);
    assert!(window.drain().is_none());
}

#[test(tokio::test)]
async fn declining_with_buffered_events_discards_them_all() {
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(InMemoryDecisionStore::new());
    let (factory, window) = factory(store.clone());
    let mut worker = DeliveryWorker::new(
        window.clone(),
        DeliveryPipeline::new(sink.clone(), store, None),
    );

    click(&factory, "held");
    worker.tick().await;
    click(&factory, "buffered");
    factory.set_decision(false).unwrap();

    let flow = worker.tick().await;

    assert!(flow.is_break());
    assert_eq!(worker.pipeline().state(), PipelineState::Terminated);
    assert_eq!(worker.pipeline().metrics().snapshot().discarded, 2);
    assert_eq!(sink.attempts(), 0);
}

#[test(tokio::test)]
async fn undecided_accumulates_across_windows_without_loss() {
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(InMemoryDecisionStore::new());
    let (factory, window) = factory(store.clone());
    let mut worker = DeliveryWorker::new(
        window.clone(),
        DeliveryPipeline::new(sink.clone(), store, Some(1_000)),
    );

    for round in 0..5 {
        for i in 0..10 {
            click(&factory, &format!("{round}-{i}"));
        }
        worker.tick().await;
    }

    assert_eq!(worker.pipeline().held_back_len(), 50);
    assert_eq!(sink.attempts(), 0);

    factory.set_decision(true).unwrap();
    worker.tick().await;
    assert_eq!(sink.delivered_sequences(), (0..50).collect::<Vec<_>>());
}

#[test(tokio::test)]
async fn empty_tick_calls_nothing() {
    let sink = Arc::new(MemorySink::new());
    let store = Arc::new(InMemoryDecisionStore::decided(true));
    let (_factory, window) = factory(store.clone());
    let mut worker = DeliveryWorker::new(window, DeliveryPipeline::new(sink.clone(), store, None));

    for _ in 0..3 {
        assert!(worker.tick().await.is_continue());
    }

    assert_eq!(sink.attempts(), 0);
    assert_eq!(worker.pipeline().metrics().snapshot().ticks, 0);
}

#[test]
fn events_created_back_to_back_have_distinct_increasing_sequences() {
    let store = Arc::new(InMemoryDecisionStore::new());
    let (factory, _window) = factory(store);

    let seqs: Vec<u64> = (0..1_000).map(|_| click(&factory, "x").sequence()).collect();

    assert!(seqs.windows(2).all(|w| w[0] < w[1]));
}

#[derive(Debug, Clone)]
enum Step {
    Emit(u8),
    FailOnce(u8),
    Disconnect,
    Reconnect,
    Tick,
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => (1u8..5).prop_map(Step::Emit),
        2 => (0u8..40).prop_map(Step::FailOnce),
        1 => Just(Step::Disconnect),
        1 => Just(Step::Reconnect),
        3 => Just(Step::Tick),
    ]
}

proptest! {
    #[test]
    fn delivery_is_ordered_and_exactly_once(steps in prop::collection::vec(step(), 1..60)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();

        runtime.block_on(async {
            let sink = Arc::new(MemorySink::new());
            let store = Arc::new(InMemoryDecisionStore::decided(true));
            let (factory, window) = factory(store.clone());
            let mut pipeline = DeliveryPipeline::new(sink.clone(), store, None);
            let mut emitted = 0u64;

            for step in steps {
                match step {
                    Step::Emit(n) => {
                        for _ in 0..n {
                            click(&factory, "e");
                            emitted += 1;
                        }
                    }
                    Step::FailOnce(seq) => sink.fail_once_on(u64::from(seq)),
                    Step::Disconnect => sink.set_connected(false),
                    Step::Reconnect => sink.set_connected(true),
                    Step::Tick => {
                        pipeline.process(window.drain().unwrap_or_default()).await;
                    }
                }

                let delivered = sink.delivered_sequences();
                prop_assert!(delivered.windows(2).all(|w| w[0] < w[1]));
                // Whatever went out is a gap-free prefix of what was emitted.
                prop_assert_eq!(delivered.clone(), (0..delivered.len() as u64).collect::<Vec<_>>());
            }

            sink.set_connected(true);
            for _ in 0..50 {
                pipeline.process(window.drain().unwrap_or_default()).await;
                if !pipeline.has_held_back() {
                    break;
                }
            }

            prop_assert_eq!(sink.delivered_sequences(), (0..emitted).collect::<Vec<_>>());
            Ok(())
        })?;
    }
}
