// tests/condition_chain.rs - Condition chains through the ingestion path

use quarry::*;

fn registry() -> SourceRegistry {
    let registry = SourceRegistry::default();
    registry
        .register(DataItem::condition("spindle_cond").with_kind("TEMPERATURE"))
        .unwrap();
    registry
        .register(DataItem::sample("spindle_temp").with_units("FAHRENHEIT", "CELSIUS"))
        .unwrap();
    registry
}

fn sequences(list: &[ObservationRef]) -> Vec<u64> {
    list.iter().map(|o| o.sequence()).collect()
}

#[test]
fn test_two_faults_remain_visible() {
    let registry = registry();
    let chain = registry.chain("spindle_cond").unwrap();

    let first = registry.ingest("spindle_cond", "2024-03-01T08:00:00Z", "FAULT|A").unwrap();
    let second = registry.ingest("spindle_cond", "2024-03-01T08:00:01Z", "FAULT|B").unwrap();
    assert_eq!(first.sequence(), 1);
    assert_eq!(second.sequence(), 2);

    let list = chain.list(&second).unwrap();
    assert_eq!(sequences(&list), vec![2, 1]);
    assert!(ObservationRef::ptr_eq(&list[1], &first));

    let active = chain.active(&second).unwrap();
    let codes: Vec<_> = active.iter().filter_map(|o| o.native_code()).collect();
    assert_eq!(codes, vec!["B", "A"]);

    assert!(ObservationRef::ptr_eq(&chain.first(&second).unwrap(), &first));
    assert!(ObservationRef::ptr_eq(&chain.previous(&second).unwrap().unwrap(), &first));
    assert!(chain.previous(&first).unwrap().is_none());
}

#[test]
fn test_clearing_one_code_keeps_the_other() {
    let registry = registry();
    let chain = registry.chain("spindle_cond").unwrap();

    registry.ingest("spindle_cond", "t1", "FAULT|A").unwrap();
    let warning = registry.ingest("spindle_cond", "t2", "WARNING|B").unwrap();
    let head = registry.ingest("spindle_cond", "t3", "NORMAL|A").unwrap();

    // The cleared fault is gone from the new head's history
    assert_eq!(sequences(&chain.list(&head).unwrap()), vec![3, 2]);
    assert_eq!(sequences(&warning.list().unwrap()), vec![2, 1]);

    let active = chain.active(&head).unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].native_code(), Some("B"));
    assert_eq!(active[0].level(), Level::Warning);
}

#[test]
fn test_clear_all_restarts_chain() {
    let registry = registry();
    let chain = registry.chain("spindle_cond").unwrap();

    let fault = registry.ingest("spindle_cond", "t1", "FAULT|A").unwrap();
    let clear = registry.ingest("spindle_cond", "t2", "NORMAL").unwrap();

    assert_eq!(sequences(&chain.list(&clear).unwrap()), vec![2]);
    assert!(chain.active(&clear).unwrap().is_empty());
    assert!(ObservationRef::ptr_eq(&registry.chain("spindle_cond").unwrap().head().unwrap(), &clear));

    // The older record still walks its own history
    assert_eq!(sequences(&chain.list(&fault).unwrap()), vec![1]);
}

#[test]
fn test_held_head_survives_reset() {
    let registry = registry();

    let watch_a = registry
        .ingest("spindle_cond", "t1", "FAULT|A")
        .unwrap()
        .downgrade();
    let b = registry.ingest("spindle_cond", "t2", "FAULT|B").unwrap();
    registry.ingest("spindle_cond", "t3", "NORMAL").unwrap();

    let chain = registry.chain("spindle_cond").unwrap();
    assert_eq!(sequences(&chain.list(&b).unwrap()), vec![2, 1]);
    assert_eq!(chain.first(&b).unwrap().sequence(), 1);
    assert_eq!(sequences(&b.list().unwrap()), vec![2, 1]);
    assert_eq!(b.first().unwrap().sequence(), 1);
    assert_eq!(b.previous().unwrap().map(|o| o.sequence()), Some(1));
    assert!(!watch_a.is_released());

    drop(b);
    assert!(watch_a.is_released());
}

#[test]
fn test_fault_clear_cycles_stay_bounded() {
    let registry = registry();
    let chain = registry.chain("spindle_cond").unwrap();

    for _ in 0..10_000 {
        registry.ingest("spindle_cond", "t", "FAULT|A").unwrap();
        registry.ingest("spindle_cond", "t", "NORMAL|A").unwrap();
    }

    assert_eq!(chain.len(), 1);
    let head = chain.head().unwrap();
    assert!(chain.active(&head).unwrap().is_empty());
}

#[test]
fn test_interleaved_sources_do_not_share_links() {
    let registry = registry();
    registry.register(DataItem::condition("coolant_cond")).unwrap();

    let a1 = registry.ingest("spindle_cond", "t", "FAULT|A").unwrap();
    let temp = registry.ingest("spindle_temp", "t", "212").unwrap();
    let c1 = registry.ingest("coolant_cond", "t", "WARNING|LOW").unwrap();
    let a2 = registry.ingest("spindle_cond", "t", "FAULT|B").unwrap();

    assert!(!temp.is_linked());
    assert!(registry.chain("spindle_temp").is_none());

    let spindle = registry.chain("spindle_cond").unwrap();
    let coolant = registry.chain("coolant_cond").unwrap();
    assert_eq!(sequences(&spindle.list(&a2).unwrap()), vec![4, 1]);
    assert_eq!(sequences(&coolant.list(&c1).unwrap()), vec![3]);
    assert!(spindle.contains(&a1));
    assert!(!spindle.contains(&c1));
    assert!(coolant.list(&a1).is_err());
}

#[test]
fn test_chain_outlives_caller_handles() {
    let registry = registry();
    let chain = registry.chain("spindle_cond").unwrap();

    let watcher = {
        let first = registry.ingest("spindle_cond", "t", "FAULT|A").unwrap();
        first.downgrade()
    };
    let head = registry.ingest("spindle_cond", "t", "FAULT|B").unwrap();

    assert!(!watcher.is_released());
    let root = chain.first(&head).unwrap();
    assert!(ObservationRef::ptr_eq(&root, &watcher.upgrade().unwrap()));

    drop(root);
    drop(head);
    drop(chain);
    drop(registry);
    assert!(watcher.is_released());
}

#[test]
fn test_second_append_is_rejected() {
    let item = std::sync::Arc::new(DataItem::condition("spindle_cond"));
    let chain = ConditionChain::new(item.clone()).unwrap();

    let root = ObservationRef::new(Observation::new(item.clone(), 1, "t", "FAULT|A"));
    let next = ObservationRef::new(Observation::new(item, 2, "t", "FAULT|B"));
    chain.append_to(&root, None).unwrap();
    chain.append_to(&next, Some(&root)).unwrap();

    assert!(matches!(
        chain.append_to(&next, Some(&root)),
        Err(QuarryError::AlreadyLinked { sequence: 2 })
    ));
    assert_eq!(chain.len(), 2);
    assert!(ObservationRef::ptr_eq(&chain.head().unwrap(), &next));
}

#[test]
fn test_unknown_and_non_condition_sources() {
    let registry = registry();
    assert!(matches!(
        registry.ingest("missing", "t", "1"),
        Err(QuarryError::DataItemNotFound(id)) if id == "missing"
    ));
    assert!(matches!(
        ConditionChain::new(std::sync::Arc::new(DataItem::sample("spindle_temp"))),
        Err(QuarryError::NotConditionSource(_))
    ));
}
