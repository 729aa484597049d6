//! Forward screen routing.
//!
//! [`next_screen`] answers the one question the UI asks after every screen
//! submit: where does the user go now? It walks the graph's global screen
//! order past the current screen, skipping manual and unavailable screens,
//! and translates section boundaries into data-view and checklist targets.
//!
//! Collection loops make the walk stateful: entering an auto-iterating loop
//! seeds the collection-item id from the first member of the backing
//! collection, finishing an item of an auto-iterating loop chains straight
//! into the next item, and finishing an item of a manual loop lands on that
//! item's data view.

use miette::Diagnostic;
use thiserror::Error;
use tracing::{instrument, trace};

use crate::condition::ConditionError;
use crate::facts::FactStore;
use crate::flow::graph::{FlowGraph, LoopRef, Screen, ScreenId};

/// Where the router decided to send the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Routable {
    /// A concrete screen in the flow.
    Screen(ScreenId),
    /// A subcategory's data view, optionally anchored at a sub-subcategory.
    DataView {
        subcategory: String,
        anchor: Option<String>,
    },
    /// The data view of a single collection item.
    CollectionItemDataView { loop_name: String },
    /// The top-level checklist.
    Checklist,
}

/// A routing decision plus the collection-item id it applies to.
#[derive(Debug, Clone, PartialEq)]
pub struct NextScreen {
    pub routable: Routable,
    pub collection_item: Option<String>,
}

impl NextScreen {
    /// Render the decision as a navigable route.
    pub fn route(&self, graph: &FlowGraph) -> String {
        match &self.routable {
            Routable::Screen(id) => {
                graph.screens()[id.index()].full_route(self.collection_item.as_deref())
            }
            Routable::DataView {
                subcategory,
                anchor,
            } => match anchor {
                Some(anchor) => format!("/data-view{subcategory}#{anchor}"),
                None => format!("/data-view{subcategory}"),
            },
            Routable::CollectionItemDataView { loop_name } => {
                let mut route = format!("/data-view/loop/{}", urlencoding::encode(loop_name));
                if let Some(item) = &self.collection_item {
                    route.push('/');
                    route.push_str(item);
                }
                route
            }
            Routable::Checklist => "/checklist".to_owned(),
        }
    }
}

/// Routing behavior toggles.
#[derive(Debug, Clone, Copy, Default)]
pub struct NextScreenOptions {
    /// Review mode: stop at the end of the current sub-subcategory and
    /// return to the data view, anchored where the user left it.
    pub stop_at_section_end: bool,
}

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum RouteError {
    #[error("screen {route} is not part of the compiled flow")]
    #[diagnostic(code(screenflow::router::unknown_screen))]
    UnknownScreen { route: String },

    #[error("subcategory {route} is not part of the compiled flow")]
    #[diagnostic(code(screenflow::router::unknown_subcategory))]
    UnknownSubcategory { route: String },

    #[error("collection loop {name} is not part of the compiled flow")]
    #[diagnostic(code(screenflow::router::unknown_loop))]
    UnknownLoop { name: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Condition(#[from] ConditionError),
}

/// Resolve the screen to show after `current_route`.
#[instrument(skip(graph, facts), fields(current = current_route))]
pub fn next_screen(
    graph: &FlowGraph,
    current_route: &str,
    facts: &dyn FactStore,
    collection_item: Option<&str>,
    options: NextScreenOptions,
) -> Result<NextScreen, RouteError> {
    let current = graph
        .screen_by_route(current_route)
        .ok_or_else(|| RouteError::UnknownScreen {
            route: current_route.to_owned(),
        })?;

    // Loop exhaustion: when the current screen is the last available one
    // for this item, the loop decides where to go before the global walk.
    if let (Some(loop_ref), Some(item)) = (&current.collection_loop, collection_item) {
        let collection_loop =
            graph
                .collection_loop(&loop_ref.name)
                .ok_or_else(|| RouteError::UnknownLoop {
                    name: loop_ref.name.clone(),
                })?;
        if collection_loop.last_available_screen(graph, facts, item)? == Some(current.id) {
            // A knocked-out flow leaves the loop through its declared
            // knockout screen instead of the normal exit.
            if let Some(route) = &collection_loop.knockout_route
                && let Some(knockout) = graph.screen_by_route(route)
                && knockout.is_available(facts, Some(item))?
            {
                return Ok(NextScreen {
                    routable: Routable::Screen(knockout.id),
                    collection_item: Some(item.to_owned()),
                });
            }
            if collection_loop.auto_iterate {
                let collection = collection_loop
                    .collection_name
                    .concrete(Some(item))
                    .map_err(ConditionError::from)?;
                let items = facts.collection_items(&collection);
                let following = items
                    .iter()
                    .position(|candidate| candidate == item)
                    .and_then(|position| items.get(position + 1));
                if let Some(next_item) = following
                    && let Some(first) =
                        collection_loop.first_available_screen(graph, facts, next_item)?
                {
                    trace!(item = %next_item, "advancing auto-iterating loop");
                    return Ok(NextScreen {
                        routable: Routable::Screen(first),
                        collection_item: Some(next_item.clone()),
                    });
                }
                // No further item: fall through to the global walk, which
                // leaves the loop.
            } else {
                return Ok(NextScreen {
                    routable: Routable::CollectionItemDataView {
                        loop_name: collection_loop.name.clone(),
                    },
                    collection_item: Some(item.to_owned()),
                });
            }
        }
    }

    let tail = graph.screens()[current.id.index() + 1..].iter();
    let (found, found_item) = scan(
        graph,
        tail,
        current.collection_loop.as_ref(),
        collection_item,
        facts,
    )?;
    let Some(next_id) = found else {
        // The global list is exhausted; treat it as leaving the current
        // subcategory.
        return end_of_subcategory(graph, current, collection_item);
    };
    let next = &graph.screens()[next_id.index()];

    if next.is_knockout {
        return Ok(NextScreen {
            routable: Routable::Screen(next_id),
            collection_item: found_item,
        });
    }

    if options.stop_at_section_end
        && current.sub_subcategory_route != next.sub_subcategory_route
    {
        return end_of_sub_subcategory(graph, current, collection_item, facts);
    }

    if current.subcategory_route == next.subcategory_route {
        return Ok(NextScreen {
            routable: Routable::Screen(next_id),
            collection_item: found_item,
        });
    }

    end_of_subcategory(graph, current, collection_item)
}

/// Walk candidate screens in order, tracking the collection-item id across
/// loop boundaries, and stop at the first available auto-routed screen.
fn scan<'a>(
    graph: &FlowGraph,
    candidates: impl Iterator<Item = &'a Screen>,
    start_loop: Option<&LoopRef>,
    start_item: Option<&str>,
    facts: &dyn FactStore,
) -> Result<(Option<ScreenId>, Option<String>), RouteError> {
    let mut previous_loop: Option<String> = start_loop.map(|l| l.name.clone());
    let mut previous_item: Option<String> = start_item.map(str::to_owned);

    for screen in candidates {
        let screen_loop = screen.collection_loop.as_ref().map(|l| l.name.clone());
        let mut item = previous_item.clone();
        if previous_loop != screen_loop {
            // The item id belongs to the loop it came from.
            item = None;
        }
        if item.is_none()
            && let Some(loop_ref) = &screen.collection_loop
            && loop_ref.auto_iterate
            && let Some(collection) = &screen.collection_context
            && let Some(collection) = collection.try_concrete(None)
        {
            // An inner loop's abstract context stays unseeded; the screen
            // reads as unavailable and the walk moves past the loop.
            item = facts.collection_items(&collection).first().cloned();
        }
        previous_loop = screen_loop;
        previous_item = item.clone();

        // Screens of a hidden subcategory are never routed into, whatever
        // their own conditions say.
        let displayed = match graph.subcategory(&screen.subcategory_route) {
            Some(subcategory) => subcategory.is_displayed(facts, item.as_deref())?,
            None => true,
        };
        if displayed && screen.route_automatically && screen.is_available(facts, item.as_deref())? {
            return Ok((Some(screen.id), item));
        }
    }
    Ok((None, None))
}

/// Review-mode boundary: look for a later continuation of the same
/// sub-subcategory (split declarations), otherwise return to the data view
/// anchored where the user was.
fn end_of_sub_subcategory(
    graph: &FlowGraph,
    current: &Screen,
    collection_item: Option<&str>,
    facts: &dyn FactStore,
) -> Result<NextScreen, RouteError> {
    if current.act_as_data_view {
        return Ok(NextScreen {
            routable: Routable::Checklist,
            collection_item: collection_item.map(str::to_owned),
        });
    }
    if let Some(ssc_route) = &current.sub_subcategory_route
        && let Some(ssc) = graph.sub_subcategory(ssc_route)
        && let Some(position) = ssc.screens.iter().position(|id| *id == current.id)
    {
        let rest = ssc.screens[position + 1..]
            .iter()
            .map(|id| &graph.screens()[id.index()]);
        let (found, found_item) = scan(
            graph,
            rest,
            current.collection_loop.as_ref(),
            collection_item,
            facts,
        )?;
        if let Some(id) = found {
            return Ok(NextScreen {
                routable: Routable::Screen(id),
                collection_item: found_item,
            });
        }
    }
    data_view_target(graph, current, collection_item, true)
}

/// Leaving a subcategory: hub subcategories and those with a screen acting
/// as their data view return to the checklist, the rest to their data view.
fn end_of_subcategory(
    graph: &FlowGraph,
    current: &Screen,
    collection_item: Option<&str>,
) -> Result<NextScreen, RouteError> {
    let subcategory = graph.subcategory(&current.subcategory_route).ok_or_else(|| {
        RouteError::UnknownSubcategory {
            route: current.subcategory_route.clone(),
        }
    })?;
    let acting_data_view = graph.has_screen_acting_as_data_view(subcategory);
    let collection_hub = subcategory.collection_name.is_some() && !subcategory.loops.is_empty();
    if acting_data_view || !subcategory.has_data_view || collection_hub {
        return Ok(NextScreen {
            routable: Routable::Checklist,
            collection_item: collection_item.map(str::to_owned),
        });
    }
    data_view_target(graph, current, collection_item, false)
}

fn data_view_target(
    graph: &FlowGraph,
    current: &Screen,
    collection_item: Option<&str>,
    anchored: bool,
) -> Result<NextScreen, RouteError> {
    // Inside a manual loop with an item in hand, the item's own data view
    // takes precedence over the subcategory's.
    if let (Some(loop_ref), Some(item)) = (&current.collection_loop, collection_item)
        && !loop_ref.auto_iterate
    {
        return Ok(NextScreen {
            routable: Routable::CollectionItemDataView {
                loop_name: loop_ref.name.clone(),
            },
            collection_item: Some(item.to_owned()),
        });
    }
    let anchor = if anchored {
        current
            .sub_subcategory_route
            .as_deref()
            .and_then(|route| graph.sub_subcategory(route))
            .map(|ssc| ssc.route_suffix.clone())
    } else {
        None
    };
    Ok(NextScreen {
        routable: Routable::DataView {
            subcategory: current.subcategory_route.clone(),
            anchor,
        },
        collection_item: collection_item.map(str::to_owned),
    })
}
