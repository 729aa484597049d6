//! Re-entry points: where to resume a partially answered subcategory.
//!
//! A screen counts as incomplete when any fact it requires an answer for is
//! still incomplete. Sections are checked in declaration order, loops item
//! by item, so the re-entry point is the first question the user has not
//! finished.

use crate::condition::ConditionError;
use crate::facts::FactStore;
use crate::flow::graph::{CollectionLoop, FlowGraph, Screen, ScreenId, SectionRef, Subcategory};

/// The screen (and collection item, if any) to resume at.
#[derive(Debug, Clone, PartialEq)]
pub struct ReentryPoint {
    pub screen: ScreenId,
    pub collection_item: Option<String>,
}

/// First incomplete, available screen of a subcategory, walking its
/// sub-subcategories and loops in declaration order.
pub fn first_incomplete_screen_of_subcategory(
    graph: &FlowGraph,
    subcategory: &Subcategory,
    facts: &dyn FactStore,
    item: Option<&str>,
) -> Result<Option<ReentryPoint>, ConditionError> {
    for section in &subcategory.sections {
        match section {
            SectionRef::Loop(name) => {
                let Some(collection_loop) = graph.collection_loop(name) else {
                    continue;
                };
                if has_incomplete_collection_item(collection_loop, facts)?
                    && let Some(collection) = collection_loop.collection_name.try_concrete(item)
                {
                    for candidate in facts.collection_items(&collection) {
                        if let Some(screen) = first_incomplete_screen_of_loop(
                            graph,
                            collection_loop,
                            facts,
                            &candidate,
                        )? {
                            return Ok(Some(ReentryPoint {
                                screen,
                                collection_item: Some(candidate),
                            }));
                        }
                    }
                }
                // Until the done fact is answered, the hub screen is where
                // the user left off.
                if let Some(done_path) = &collection_loop.done_path
                    && let Some(done_path) = done_path.try_concrete(item)
                {
                    let done = facts.get(&done_path);
                    if !(done.complete && done.is_truthy())
                        && let Some(hub) = loop_hub(graph, subcategory, collection_loop)
                        && hub.is_available(facts, item)?
                    {
                        return Ok(Some(ReentryPoint {
                            screen: hub.id,
                            collection_item: item.map(str::to_owned),
                        }));
                    }
                }
            }
            SectionRef::SubSubcategory(route) => {
                let Some(ssc) = graph.sub_subcategory(route) else {
                    continue;
                };
                for id in &ssc.screens {
                    let screen = &graph.screens()[id.index()];
                    if screen.is_available(facts, item)?
                        && screen_is_incomplete(screen, facts, item)?
                    {
                        return Ok(Some(ReentryPoint {
                            screen: *id,
                            collection_item: item.map(str::to_owned),
                        }));
                    }
                }
            }
        }
    }
    Ok(None)
}

/// First incomplete, available screen of a loop for one collection item.
/// Items passing the loop's completed condition are skipped outright.
pub fn first_incomplete_screen_of_loop(
    graph: &FlowGraph,
    collection_loop: &CollectionLoop,
    facts: &dyn FactStore,
    item: &str,
) -> Result<Option<ScreenId>, ConditionError> {
    if let Some(condition) = &collection_loop.item_completed_condition
        && condition.evaluate(facts, Some(item))?
    {
        return Ok(None);
    }
    for id in &collection_loop.screens {
        let screen = &graph.screens()[id.index()];
        if screen.is_available(facts, Some(item))?
            && screen_is_incomplete(screen, facts, Some(item))?
        {
            return Ok(Some(*id));
        }
    }
    Ok(None)
}

/// Whether any member of the loop's collection fails its completed
/// condition. Loops without one never report incomplete items, and an inner
/// loop whose collection is still abstract is checked per enclosing item,
/// not here.
pub fn has_incomplete_collection_item(
    collection_loop: &CollectionLoop,
    facts: &dyn FactStore,
) -> Result<bool, ConditionError> {
    let Some(condition) = &collection_loop.item_completed_condition else {
        return Ok(false);
    };
    let Some(collection) = collection_loop.collection_name.try_concrete(None) else {
        return Ok(false);
    };
    for item in facts.collection_items(&collection) {
        if !condition.evaluate(facts, Some(&item))? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The hub screen hosting a loop's collection item manager: inside the
/// owning sub-subcategory for inner loops, anywhere in the subcategory for
/// outer ones.
fn loop_hub<'a>(
    graph: &'a FlowGraph,
    subcategory: &Subcategory,
    collection_loop: &CollectionLoop,
) -> Option<&'a Screen> {
    graph.inner_loop_hub(collection_loop).or_else(|| {
        subcategory
            .screens
            .iter()
            .map(|id| &graph.screens()[id.index()])
            .find(|screen| screen.find_content("CollectionItemManager").is_some())
    })
}

fn screen_is_incomplete(
    screen: &Screen,
    facts: &dyn FactStore,
    item: Option<&str>,
) -> Result<bool, ConditionError> {
    for path in screen.required_fact_paths(facts, item)? {
        if !facts.get(&path.concrete(item)?).complete {
            return Ok(true);
        }
    }
    Ok(false)
}
