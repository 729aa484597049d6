//! Compiled flow graphs.
//!
//! [`FlowGraph`] is the immutable product of
//! [`compile`](crate::flow::compile): a globally ordered screen list plus
//! registries for subcategories, sub-subcategories, and collection loops,
//! all keyed by route or name. Everything downstream (routing, progress,
//! alerts) reads this structure and never mutates it.

use rustc_hash::FxHashMap;
use serde_json::Value;

use crate::condition::{Condition, ConditionError, evaluate_all};
use crate::facts::{FactPath, FactStore};
use crate::flow::declarations::{AssertionType, ContentDeclaration};

/// Index of a screen in the graph's global declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenId(pub(crate) usize);

impl ScreenId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// The loop a screen belongs to, denormalized onto the screen for the
/// router's benefit.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopRef {
    pub name: String,
    pub auto_iterate: bool,
}

#[derive(Debug, Clone)]
pub struct Screen {
    pub id: ScreenId,
    /// Trailing route segment as declared.
    pub route: String,
    /// Full route, `{subcategory_route}/{route}`.
    pub screen_route: String,
    pub category_route: String,
    pub subcategory_route: String,
    pub sub_subcategory_route: Option<String>,
    /// Inherited gate conditions plus the local condition, declaration order.
    pub conditions: Vec<Condition>,
    /// Collection backing this screen, possibly abstract for inner loops.
    pub collection_context: Option<FactPath>,
    pub collection_loop: Option<LoopRef>,
    pub route_automatically: bool,
    pub act_as_data_view: bool,
    pub is_knockout: bool,
    pub content: Vec<ContentDeclaration>,
}

impl Screen {
    /// Whether this screen would currently be shown.
    ///
    /// A screen in an auto-iterating loop additionally requires a nonempty
    /// backing collection; otherwise availability is the conjunction of its
    /// conditions.
    pub fn is_available(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<bool, ConditionError> {
        if let Some(loop_ref) = &self.collection_loop
            && loop_ref.auto_iterate
        {
            // An inner loop's context can stay abstract during a walk with
            // no enclosing item; an unresolvable collection has no members.
            let has_members = self
                .collection_context
                .as_ref()
                .and_then(|collection| collection.try_concrete(item))
                .is_some_and(|collection| !facts.collection_items(&collection).is_empty());
            if !has_members {
                return Ok(false);
            }
        }
        evaluate_all(&self.conditions, facts, item)
    }

    /// Full navigable route, carrying the collection item as a query
    /// parameter keyed by the url-encoded collection context.
    pub fn full_route(&self, item: Option<&str>) -> String {
        match (&self.collection_context, item) {
            (Some(collection), Some(id)) => format!(
                "{}?{}={}",
                self.screen_route,
                urlencoding::encode(collection.as_str()),
                id
            ),
            _ => self.screen_route.clone(),
        }
    }

    /// Fact paths this screen requires an answer for, honoring per-content
    /// conditions and skipping read-only and data-view-only content.
    pub fn required_fact_paths(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<Vec<FactPath>, ConditionError> {
        let mut paths = vec![];
        for content in &self.content {
            if content.is_read_only() || content.is_data_view_only() {
                continue;
            }
            let Some(path) = content.fact_path() else {
                continue;
            };
            let conditions: Vec<Condition> =
                content.conditions().iter().map(Condition::from).collect();
            if evaluate_all(&conditions, facts, item)? {
                paths.push(path);
            }
        }
        Ok(paths)
    }

    /// First content entry of a given component, by name.
    pub fn find_content(&self, component: &str) -> Option<&ContentDeclaration> {
        self.content.iter().find(|c| c.component == component)
    }
}

#[derive(Debug, Clone)]
pub struct Category {
    pub route: String,
    /// Subcategory routes in declaration order.
    pub subcategories: Vec<String>,
}

/// An ordered entry of a subcategory's body: either a plain sub-subcategory
/// or a collection loop, interleaved as declared.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionRef {
    SubSubcategory(String),
    Loop(String),
}

#[derive(Debug, Clone)]
pub struct Subcategory {
    pub route: String,
    pub category_route: String,
    pub complete_if: Vec<Condition>,
    pub display_only_if: Vec<Condition>,
    pub collection_name: Option<FactPath>,
    /// False for hub subcategories that route back to the checklist.
    pub has_data_view: bool,
    /// Every screen in the subcategory, declaration order.
    pub screens: Vec<ScreenId>,
    /// Sub-subcategory routes not nested inside a loop.
    pub sub_subcategories: Vec<String>,
    /// Loop names declared in this subcategory.
    pub loops: Vec<String>,
    /// Sub-subcategories and loops interleaved in declaration order.
    pub sections: Vec<SectionRef>,
    pub assertions: Vec<Assertion>,
    /// Root of the nested gate tree; the root itself carries no gates.
    pub gated_tree: GatedNode,
}

impl Subcategory {
    /// Display gate: every `display_only_if` condition must pass, the same
    /// conjunction gate trees use. Ungated subcategories are always shown.
    pub fn is_displayed(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<bool, ConditionError> {
        evaluate_all(&self.display_only_if, facts, item)
    }

    pub fn is_complete(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<bool, ConditionError> {
        evaluate_all(&self.complete_if, facts, item)
    }

    /// Screens currently visible in this subcategory: nothing when the
    /// display gate fails, otherwise the gate tree pruned by current facts.
    pub fn visible_screens(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<Vec<ScreenId>, ConditionError> {
        if !self.is_displayed(facts, item)? {
            return Ok(vec![]);
        }
        self.gated_tree.visible_screens(facts, item)
    }
}

#[derive(Debug, Clone)]
pub struct SubSubcategory {
    /// Full route, `{subcategory_route}/{suffix}`.
    pub full_route: String,
    /// Trailing segment, used as a data-view anchor.
    pub route_suffix: String,
    pub subcategory_route: String,
    pub complete_if: Vec<Condition>,
    pub collection_context: Option<FactPath>,
    pub editable: bool,
    pub hidden: bool,
    /// Name of the enclosing loop, if nested in one.
    pub loop_name: Option<String>,
    pub screens: Vec<ScreenId>,
}

#[derive(Debug, Clone)]
pub struct CompiledDataViewSection {
    pub i18n_key: String,
    pub conditions: Vec<Condition>,
}

#[derive(Debug, Clone)]
pub struct CollectionLoop {
    pub name: String,
    /// Subcategory route, or the enclosing sub-subcategory route for inner
    /// loops.
    pub full_route: String,
    pub subcategory_route: String,
    pub collection_name: FactPath,
    pub auto_iterate: bool,
    pub is_inner: bool,
    pub item_completed_condition: Option<Condition>,
    pub done_path: Option<FactPath>,
    pub knockout_route: Option<String>,
    pub data_view_sections: Vec<CompiledDataViewSection>,
    pub screens: Vec<ScreenId>,
    /// Sub-subcategories declared inside the loop body.
    pub sub_subcategories: Vec<String>,
}

impl CollectionLoop {
    /// First screen of the loop available for `item`, in declaration order.
    pub fn first_available_screen(
        &self,
        graph: &FlowGraph,
        facts: &dyn FactStore,
        item: &str,
    ) -> Result<Option<ScreenId>, ConditionError> {
        for id in &self.screens {
            if let Some(screen) = graph.screen(*id)
                && screen.is_available(facts, Some(item))?
            {
                return Ok(Some(*id));
            }
        }
        Ok(None)
    }

    /// Last screen of the loop available for `item`; the point at which the
    /// loop is exhausted for that item.
    pub fn last_available_screen(
        &self,
        graph: &FlowGraph,
        facts: &dyn FactStore,
        item: &str,
    ) -> Result<Option<ScreenId>, ConditionError> {
        let mut last = None;
        for id in &self.screens {
            if let Some(screen) = graph.screen(*id)
                && screen.is_available(facts, Some(item))?
            {
                last = Some(*id);
            }
        }
        Ok(last)
    }
}

#[derive(Debug, Clone)]
pub struct Assertion {
    pub assertion_type: AssertionType,
    pub i18n_key: String,
    pub subcategory_route: String,
    pub sub_subcategory_route: Option<String>,
    pub conditions: Vec<Condition>,
    pub edit_route: Option<String>,
}

impl Assertion {
    pub fn is_active(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<bool, ConditionError> {
        evaluate_all(&self.conditions, facts, item)
    }
}

/// A node of a subcategory's nested gate tree. Children are shown only when
/// every gate on the node passes; nesting accumulates gates.
#[derive(Debug, Clone, Default)]
pub struct GatedNode {
    pub gates: Vec<Condition>,
    pub children: Vec<GatedChild>,
}

#[derive(Debug, Clone)]
pub enum GatedChild {
    Screen(ScreenId),
    Node(GatedNode),
}

impl GatedNode {
    /// Screens visible under this node given current facts, in declaration
    /// order. A failing gate prunes its whole subtree.
    pub fn visible_screens(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
    ) -> Result<Vec<ScreenId>, ConditionError> {
        let mut screens = vec![];
        self.collect_visible(facts, item, &mut screens)?;
        Ok(screens)
    }

    fn collect_visible(
        &self,
        facts: &dyn FactStore,
        item: Option<&str>,
        out: &mut Vec<ScreenId>,
    ) -> Result<(), ConditionError> {
        if !evaluate_all(&self.gates, facts, item)? {
            return Ok(());
        }
        for child in &self.children {
            match child {
                GatedChild::Screen(id) => out.push(*id),
                GatedChild::Node(node) => node.collect_visible(facts, item, out)?,
            }
        }
        Ok(())
    }
}

/// Immutable compiled flow.
#[derive(Debug, Clone, Default)]
pub struct FlowGraph {
    pub(crate) screens: Vec<Screen>,
    pub(crate) screens_by_route: FxHashMap<String, ScreenId>,
    pub(crate) categories: Vec<Category>,
    pub(crate) subcategories_by_route: FxHashMap<String, Subcategory>,
    pub(crate) sub_subcategories_by_route: FxHashMap<String, SubSubcategory>,
    pub(crate) loops_by_name: FxHashMap<String, CollectionLoop>,
}

impl FlowGraph {
    /// All screens in global declaration order.
    pub fn screens(&self) -> &[Screen] {
        &self.screens
    }

    pub fn screen(&self, id: ScreenId) -> Option<&Screen> {
        self.screens.get(id.0)
    }

    pub fn screen_by_route(&self, route: &str) -> Option<&Screen> {
        self.screens_by_route
            .get(route)
            .and_then(|id| self.screens.get(id.0))
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn subcategory(&self, route: &str) -> Option<&Subcategory> {
        self.subcategories_by_route.get(route)
    }

    pub fn sub_subcategory(&self, route: &str) -> Option<&SubSubcategory> {
        self.sub_subcategories_by_route.get(route)
    }

    pub fn collection_loop(&self, name: &str) -> Option<&CollectionLoop> {
        self.loops_by_name.get(name)
    }

    pub fn collection_loops(&self) -> impl Iterator<Item = &CollectionLoop> {
        self.loops_by_name.values()
    }

    /// Whether a subcategory contains a screen standing in for its data
    /// view.
    pub fn has_screen_acting_as_data_view(&self, subcategory: &Subcategory) -> bool {
        subcategory
            .screens
            .iter()
            .filter_map(|id| self.screen(*id))
            .any(|screen| screen.act_as_data_view)
    }

    /// The hub screen of an inner loop: the screen in the owning
    /// sub-subcategory that hosts the collection item manager.
    pub fn inner_loop_hub(&self, inner: &CollectionLoop) -> Option<&Screen> {
        let hub = self.sub_subcategory(&inner.full_route)?;
        hub.screens
            .iter()
            .filter_map(|id| self.screen(*id))
            .find(|screen| {
                screen.content.iter().any(|content| {
                    content.component == "CollectionItemManager"
                        && content
                            .props
                            .get("loopName")
                            .and_then(Value::as_str)
                            .is_none_or(|name| name == inner.name)
                })
            })
    }
}
