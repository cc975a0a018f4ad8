use proptest::prelude::*;
use std::sync::Arc;

use quarry::{ConditionChain, DataItem, Observation, ObservationRef, SourceRegistry};

fn severity() -> impl Strategy<Value = &'static str> {
    prop_oneo    #[test]
    fn test_walk_visits_every_link(
        links in prop::collection::vec((severity(), "[A-C]"), 1..64)
    ) {
        let item = Arc::new(DataItem::condition("c"));
        let chain = ConditionChain::new(item.clone()).unwrap();

        let mut heads = Vec::new();
        for (i, (severity, code)) in links.iter().enumerate() {
            let raw = format!("{}|{}", severity, code);
            let obs = ObservationRef::new(Observation::new(item.clone(), i as u64 + 1, "t", raw));
            chain.push(&obs).unwrap();
            heads.push(obs);
        }
        let head = heads.last().unwrap();

        let list = chain.list(head).unwrap();
        prop_assert_eq!(list.len(), links.len());
        prop_assert_eq!(chain.len(), links.len());
        for pair in list.windows(2) {
            prop_assert!(pair[0].sequence() > pair[1].sequence());
        }
        prop_assert_eq!(head.list().unwrap().len(), links.len());

        let root = chain.first(head).unwrap();
        prop_assert_eq!(root.sequence(), 1);
        prop_assert!(ObservationRef::ptr_eq(&root, &head.first().unwrap()));
    }

    #[test]
    fn test_chain_holds_one_record_per_code(
        links in prop::collection::vec((severity(), "[A-D]"), 1..128)
    ) {
        let registry = SourceRegistry::default();
        registry.register(DataItem::condition("c")).unwrap();
        let chain = registry.chain("c").unwrap();

        for (severity, code) in &links {
            registry.ingest("c", "t", &format!("{}|{}", severity, code)).unwrap();
        }

        let mut codes: Vec<_> = links.iter().map(|(_, c)| c.as_str()).collect();
        codes.sort_unstable();
        codes.dedup();
        prop_assert_eq!(chain.len(), codes.len());
    }

rt_eq!(root.sequence(), list[links.len() - 1].sequence());
    }

    #[test]
    fn test_active_has_one_entry_per_code(
        links in prop::collection::vec((severity(), "[A-D]"), 1..64)
    ) {
        let registry = SourceRegistry::default();
        registry.register(DataItem::condition("c")).unwrap();
        let chain = registry.chain("c").unwrap();

        let mut head = None;
        for (severity, code) in &links {
            head = Some(registry.ingest("c", "t", &format!("{}|{}", severity, code)).unwrap());
        }
        let head = head.unwrap();

        let active = chain.active(&head).unwrap();
        let mut codes: Vec<_> = active.iter().filter_map(|o| o.native_code()).collect();
        let before = codes.len();
        codes.sort_unstable();
        codes.dedup();
        prop_assert_eq!(codes.len(), before);

        for code in ["A", "B", "C", "D"] {
            let newest = links.iter().rev().find(|(_, c)| c == code);
            let outstanding = newest.map_or(false, |(severity, _)| *severity != "NORMAL");
            prop_assert_eq!(codes.contains(&code), outstanding);
        }
    }
}
