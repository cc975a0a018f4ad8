use proptest::prelude::*;
use quarry::{DataItem, Level, Observation, ObservationRef, Payload};
use std::sync::Arc;
use std::thread;

fn any_item() -> impl Strategy<Value = DataItem> {
    prop_oneof![
        Just(DataItem::sample("s")),
        Just(DataItem::event("e")),
        Just(DataItem::alarm("a")),
        Just(DataItem::condition("c")),
    ]
}

proptest! {
    #[test]
    fn test_inputs_read_back_unchanged(
        sequence in any::<u64>(),
        timestamp in "\\PC{0,40}",
        raw in "\\PC{0,60}",
        item in any_item(),
    ) {
        let obs = Observation::new(Arc::new(item), sequence, timestamp.clone(), raw.clone());

        prop_assert_eq!(obs.sequence(), sequence);
        prop_assert_eq!(obs.timestamp(), timestamp.as_str());
        prop_assert_eq!(obs.raw_value(), raw.as_str());
    }

    #[test]
    fn test_decoding_never_panics(raw in "[A-Za-z0-9| ]{0,50}", item in any_item()) {
        let obs = Observation::new(Arc::new(item), 1, "t", raw);

        let attrs = obs.attributes();
        prop_assert_eq!(attrs["level"].as_str(), obs.level_str());
        prop_assert_eq!(attrs["sequence"].as_str(), "1");
        if matches!(obs.payload(), Payload::Scalar(_)) {
            prop_assert_eq!(obs.level(), Level::Normal);
        }
    }

    #[test]
    fn test_numeric_samples_round_trip(v in -1.0e12f64..1.0e12) {
        let obs = Observation::new(Arc::new(DataItem::sample("s")), 1, "t", v.to_string());
        prop_assert_eq!(obs.value().as_float(), Some(v));
    }

    #[test]
    fn test_all_handles_release_record(clones in 1usize..32, threads in 1usize..4) {
        let handle = ObservationRef::new(Observation::new(
            Arc::new(DataItem::condition("c")),
            1,
            "t",
            "FAULT|X",
        ));
        let watcher = handle.downgrade();

        let mut handles: Vec<ObservationRef> = (0..clones).map(|_| handle.clone()).collect();
        prop_assert_eq!(handle.ref_count(), clones + 1);
        drop(handle);

        let per_thread = handles.len().div_ceil(threads);
        let workers: Vec<_> = (0..threads)
            .map(|_| {
                let take = per_thread.min(handles.len());
                let batch: Vec<ObservationRef> = handles.drain(..take).collect();
                thread::spawn(move || drop(batch))
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        prop_assert!(handles.is_empty());
        prop_assert!(watcher.is_released());
    }
}
