//! Validation of the shipped content pack
//!
//! Loads the JSON documents that ship in `content/` and checks the
//! invariants the runtime relies on: trigger coverage for every
//! detector, complete L1 contrast coverage, and the drills the coaching
//! scenarios expect.

use bgcoach_content::ContentStore;
use bgcoach_core::L1;

const DETECTOR_TRIGGERS: [&str; 6] = [
    "article_missing_definite",
    "modal_bare_present",
    "future_no_shte",
    "clitic_position",
    "agreement_adj_noun",
    "agreement_subject_verb",
];

fn shipped() -> ContentStore {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/../../content");
    ContentStore::load(dir).expect("shipped content pack must validate")
}

#[test]
fn pack_loads_and_reports_version() {
    let store = shipped();
    assert!(store.item_count() >= 6);
    assert!(store.scenario_count() >= 3);
    assert_eq!(store.version().len(), 32);
}

#[test]
fn every_detector_trigger_resolves() {
    let store = shipped();
    for trigger in DETECTOR_TRIGGERS {
        let items = store.find_triggers(trigger);
        assert!(!items.is_empty(), "no grammar item for trigger '{trigger}'");
    }
}

#[test]
fn every_item_covers_all_four_l1s() {
    let store = shipped();
    for trigger in DETECTOR_TRIGGERS {
        for item in store.find_triggers(trigger) {
            for l1 in L1::ALL {
                assert!(
                    store.contrast_for(item, l1).is_some(),
                    "item '{}' is missing a {} contrast note",
                    item.id,
                    l1.code()
                );
            }
        }
    }
}

#[test]
fn da_item_carries_the_expected_drill() {
    let store = shipped();
    let item = store
        .get_item("bg.no_infinitive.da_present")
        .expect("да-item present");
    assert!(
        item.drills.iter().any(|d| d.answer == "да поръчам"),
        "expected a drill with answer 'да поръчам'"
    );
    assert!(item.srs_intervals.iter().all(|&days| days > 0));
}

#[test]
fn scenario_bindings_resolve_and_order_is_stable() {
    let store = shipped();
    let summaries = store.list_scenarios();
    assert_eq!(summaries[0].id, "cafe_order");
    for summary in &summaries {
        for id in &summary.primary {
            assert!(store.get_item(id).is_some(), "dangling primary id '{id}'");
        }
    }
}
