mod common;
use common::*;

use screenflow::facts::FactResult;
use screenflow::progress::{
    first_incomplete_screen_of_loop, first_incomplete_screen_of_subcategory,
    has_incomplete_collection_item,
};

#[test]
fn resumes_at_the_first_unanswered_screen() {
    let graph = compiled();
    let basics = graph.subcategory("/flow/intake/basics").unwrap();

    let facts = FakeFacts::new();
    let point = first_incomplete_screen_of_subcategory(&graph, basics, &facts, None)
        .unwrap()
        .expect("an incomplete screen");
    assert_eq!(
        graph.screen(point.screen).unwrap().screen_route,
        "/flow/intake/basics/name"
    );
    assert_eq!(point.collection_item, None);

    let facts = facts
        .with_fact("/fullName", "Ada")
        .with_fact("/isMarried", true);
    let point = first_incomplete_screen_of_subcategory(&graph, basics, &facts, None)
        .unwrap()
        .expect("an incomplete screen");
    assert_eq!(
        graph.screen(point.screen).unwrap().screen_route,
        "/flow/intake/basics/spouse"
    );
}

#[test]
fn unavailable_screens_do_not_count_as_incomplete() {
    let graph = compiled();
    let basics = graph.subcategory("/flow/intake/basics").unwrap();

    // Unmarried: the spouse screen is out of the flow entirely.
    let facts = FakeFacts::new()
        .with_fact("/fullName", "Ada")
        .with_fact("/isMarried", false);
    assert_eq!(
        first_incomplete_screen_of_subcategory(&graph, basics, &facts, None).unwrap(),
        None
    );
}

#[test]
fn loop_progress_walks_items_in_collection_order() {
    let graph = compiled();
    let income = graph.subcategory("/flow/intake/income").unwrap();
    let income_loop = graph.collection_loop("income-loop").unwrap();

    let facts = FakeFacts::new()
        .with_collection("/incomeSources", &["src-1", "src-2"])
        .with_fact("/incomeSources/src-1/type", "w2")
        .with_fact("/incomeSources/src-1/amount", 1200)
        .with_fact("/incomeSources/src-2/type", "interest");
    assert!(has_incomplete_collection_item(income_loop, &facts).unwrap());

    let point = first_incomplete_screen_of_subcategory(&graph, income, &facts, None)
        .unwrap()
        .expect("an incomplete loop screen");
    assert_eq!(
        graph.screen(point.screen).unwrap().screen_route,
        "/flow/intake/income/source-amount"
    );
    assert_eq!(point.collection_item.as_deref(), Some("src-2"));

    // Completed items are skipped outright.
    assert_eq!(
        first_incomplete_screen_of_loop(&graph, income_loop, &facts, "src-1").unwrap(),
        None
    );
}

#[test]
fn abstract_inner_loop_does_not_fail_subcategory_progress() {
    // The inner loop's collection has no meaning without an enclosing
    // vehicle id; the section walk skips it instead of erroring.
    let graph = compiled_garage();
    let vehicles = graph.subcategory("/flow/garage/vehicles").unwrap();
    let parts_loop = graph.collection_loop("parts-loop").unwrap();

    let facts = FakeFacts::new();
    assert!(!has_incomplete_collection_item(parts_loop, &facts).unwrap());
    assert_eq!(
        first_incomplete_screen_of_subcategory(&graph, vehicles, &facts, None).unwrap(),
        None
    );
}

#[test]
fn unanswered_done_fact_points_back_at_the_hub() {
    let graph = compiled();
    let income = graph.subcategory("/flow/intake/income").unwrap();

    let mut facts = FakeFacts::new()
        .with_collection("/incomeSources", &["src-1"])
        .with_fact("/incomeSources/src-1/type", "w2")
        .with_fact("/incomeSources/src-1/amount", 1200);
    let point = first_incomplete_screen_of_subcategory(&graph, income, &facts, None)
        .unwrap()
        .expect("the hub screen");
    assert_eq!(
        graph.screen(point.screen).unwrap().screen_route,
        "/flow/intake/income/income-hub"
    );

    facts.set("/incomeSourcesDone", FactResult::complete(true));
    assert_eq!(
        first_incomplete_screen_of_subcategory(&graph, income, &facts, None).unwrap(),
        None
    );
}
