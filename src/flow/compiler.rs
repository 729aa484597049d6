//! Single-pass flow compilation.
//!
//! [`compile`] walks a declarative [`FlowNode`] tree depth-first, carrying
//! an inherited context (accumulated gate conditions, collection context,
//! enclosing loop, ancestor routes) and registering what it finds into an
//! immutable [`FlowGraph`]. Structural mistakes in the tree surface as
//! [`CompileError`]s rather than producing a half-formed graph.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::condition::Condition;
use crate::facts::FactPath;
use crate::flow::declarations::{
    AssertionDecl, CategoryDecl, CollectionLoopDecl, FlowNode, GateDecl, ScreenDecl,
    SubSubcategoryDecl, SubcategoryDecl,
};
use crate::flow::graph::{
    Assertion, Category, CollectionLoop, CompiledDataViewSection, FlowGraph, GatedChild,
    GatedNode, LoopRef, Screen, ScreenId, SectionRef, SubSubcategory, Subcategory,
};

/// Route prefix for every category in the flow.
const ROUTE_PREFIX: &str = "/flow";

#[derive(Debug, Clone, Error, Diagnostic)]
pub enum CompileError {
    #[error("multiple declarations for route {route}")]
    #[diagnostic(
        code(screenflow::compile::duplicate_route),
        help("screen and subcategory routes must be unique across the whole flow")
    )]
    DuplicateRoute { route: String },

    #[error("collection loop {name} declared more than once")]
    #[diagnostic(code(screenflow::compile::duplicate_loop))]
    DuplicateLoop { name: String },

    #[error("{kind} `{route}` declared outside of a {parent}")]
    #[diagnostic(
        code(screenflow::compile::missing_parent),
        help("check the nesting of the flow tree; every node type has a required ancestor")
    )]
    MissingParent {
        kind: &'static str,
        route: String,
        parent: &'static str,
    },

    #[error("collection loop {name} has no collection and inherits no collection context")]
    #[diagnostic(
        code(screenflow::compile::missing_collection_context),
        help("give the loop a `collection`, or declare it under a subcategory with a collection context")
    )]
    MissingCollectionContext { name: String },

    #[error("inner loop {name} must be declared inside a sub-subcategory")]
    #[diagnostic(code(screenflow::compile::inner_loop_placement))]
    InnerLoopOutsideSubSubcategory { name: String },
}

/// Inherited state of the depth-first walk. Cloned at each branch so a
/// subtree's additions never leak back out.
#[derive(Debug, Clone, Default)]
struct Context {
    conditions: Vec<Condition>,
    category_route: Option<String>,
    subcategory_route: Option<String>,
    sub_subcategory_route: Option<String>,
    collection_context: Option<FactPath>,
    collection_loop: Option<LoopRef>,
    /// Arena index of the gate-tree node new screens attach under.
    tree_node: Option<usize>,
}

/// Gate-tree node under construction; children reference the arena by index
/// until the tree is frozen.
struct ArenaNode {
    gates: Vec<Condition>,
    children: Vec<ArenaChild>,
}

enum ArenaChild {
    Screen(ScreenId),
    Node(usize),
}

#[derive(Default)]
struct Builder {
    screens: Vec<Screen>,
    screens_by_route: FxHashMap<String, ScreenId>,
    categories: Vec<Category>,
    subcategories: FxHashMap<String, Subcategory>,
    sub_subcategories: FxHashMap<String, SubSubcategory>,
    loops: FxHashMap<String, CollectionLoop>,
    arena: Vec<ArenaNode>,
    tree_roots: FxHashMap<String, usize>,
}

/// Compile a declarative flow tree into an immutable [`FlowGraph`].
#[instrument(skip_all)]
pub fn compile(root: &FlowNode) -> Result<FlowGraph, CompileError> {
    let mut builder = Builder::default();
    builder.walk(root, &Context::default())?;
    let graph = builder.finish();
    debug!(
        screens = graph.screens().len(),
        categories = graph.categories().len(),
        "compiled flow graph"
    );
    Ok(graph)
}

impl Builder {
    fn walk(&mut self, node: &FlowNode, cx: &Context) -> Result<(), CompileError> {
        match node {
            FlowNode::Flow(flow) => {
                for child in &flow.children {
                    self.walk(child, cx)?;
                }
                Ok(())
            }
            FlowNode::Category(category) => self.walk_category(category, cx),
            FlowNode::Subcategory(subcategory) => self.walk_subcategory(subcategory, cx),
            FlowNode::SubSubcategory(ssc) => self.walk_sub_subcategory(ssc, cx),
            FlowNode::Gate(gate) => self.walk_gate(gate, cx),
            FlowNode::CollectionLoop(collection_loop) => self.walk_loop(collection_loop, cx),
            FlowNode::Screen(screen) => self.add_screen(screen, cx),
            FlowNode::Assertion(assertion) => self.add_assertion(assertion, cx),
        }
    }

    fn walk_category(&mut self, category: &CategoryDecl, cx: &Context) -> Result<(), CompileError> {
        let route = format!("{ROUTE_PREFIX}/{}", category.route);
        self.categories.push(Category {
            route: route.clone(),
            subcategories: vec![],
        });
        let child_cx = Context {
            category_route: Some(route),
            ..cx.clone()
        };
        for child in &category.children {
            self.walk(child, &child_cx)?;
        }
        Ok(())
    }

    fn walk_subcategory(
        &mut self,
        subcategory: &SubcategoryDecl,
        cx: &Context,
    ) -> Result<(), CompileError> {
        let Some(category_route) = &cx.category_route else {
            return Err(CompileError::MissingParent {
                kind: "subcategory",
                route: subcategory.route.clone(),
                parent: "category",
            });
        };
        let route = format!("{category_route}/{}", subcategory.route);
        if self.subcategories.contains_key(&route) {
            return Err(CompileError::DuplicateRoute { route });
        }

        let display_only_if: Vec<Condition> = subcategory
            .display_only_if
            .iter()
            .map(Condition::from)
            .collect();
        // The display gate is any-of and lives on the subcategory itself;
        // the tree root stays ungated.
        let root = self.arena.len();
        self.arena.push(ArenaNode {
            gates: vec![],
            children: vec![],
        });
        self.tree_roots.insert(route.clone(), root);

        let collection_context = subcategory
            .collection_context
            .clone()
            .or_else(|| cx.collection_context.clone());
        self.subcategories.insert(
            route.clone(),
            Subcategory {
                route: route.clone(),
                category_route: category_route.clone(),
                complete_if: subcategory.complete_if.iter().map(Condition::from).collect(),
                display_only_if,
                collection_name: collection_context.clone(),
                has_data_view: !subcategory.skip_data_view,
                screens: vec![],
                sub_subcategories: vec![],
                loops: vec![],
                sections: vec![],
                assertions: vec![],
                gated_tree: GatedNode::default(),
            },
        );
        if let Some(category) = self.categories.last_mut() {
            category.subcategories.push(route.clone());
        }

        let child_cx = Context {
            subcategory_route: Some(route),
            sub_subcategory_route: None,
            collection_context,
            tree_node: Some(root),
            ..cx.clone()
        };
        for child in &subcategory.children {
            self.walk(child, &child_cx)?;
        }
        Ok(())
    }

    fn walk_sub_subcategory(
        &mut self,
        ssc: &SubSubcategoryDecl,
        cx: &Context,
    ) -> Result<(), CompileError> {
        let Some(subcategory_route) = &cx.subcategory_route else {
            return Err(CompileError::MissingParent {
                kind: "sub-subcategory",
                route: ssc.route.clone(),
                parent: "subcategory",
            });
        };
        let full_route = format!("{subcategory_route}/{}", ssc.route);
        let collection_context = ssc
            .collection_context
            .clone()
            .or_else(|| cx.collection_context.clone());

        // Re-declaring a route resumes the existing sub-subcategory; later
        // screens append to it.
        if self.sub_subcategories.contains_key(&full_route) {
            debug!(route = %full_route, "sub-subcategory re-declared, resuming");
        } else {
            self.sub_subcategories.insert(
                full_route.clone(),
                SubSubcategory {
                    full_route: full_route.clone(),
                    route_suffix: ssc.route.clone(),
                    subcategory_route: subcategory_route.clone(),
                    complete_if: ssc.complete_if.iter().map(Condition::from).collect(),
                    collection_context: collection_context.clone(),
                    editable: ssc.editable,
                    hidden: ssc.hidden,
                    loop_name: cx.collection_loop.as_ref().map(|l| l.name.clone()),
                    screens: vec![],
                },
            );
            match &cx.collection_loop {
                Some(loop_ref) => {
                    if let Some(collection_loop) = self.loops.get_mut(&loop_ref.name) {
                        collection_loop.sub_subcategories.push(full_route.clone());
                    }
                }
                None => {
                    if let Some(subcategory) = self.subcategories.get_mut(subcategory_route) {
                        subcategory.sub_subcategories.push(full_route.clone());
                        subcategory
                            .sections
                            .push(SectionRef::SubSubcategory(full_route.clone()));
                    }
                }
            }
        }

        let child_cx = Context {
            sub_subcategory_route: Some(full_route),
            collection_context,
            ..cx.clone()
        };
        for child in &ssc.children {
            self.walk(child, &child_cx)?;
        }
        Ok(())
    }

    fn walk_gate(&mut self, gate: &GateDecl, cx: &Context) -> Result<(), CompileError> {
        let Some(parent) = cx.tree_node else {
            return Err(CompileError::MissingParent {
                kind: "gate",
                route: String::new(),
                parent: "subcategory",
            });
        };
        let condition: Condition = (&gate.condition).into();

        let node = self.arena.len();
        self.arena.push(ArenaNode {
            gates: vec![condition.clone()],
            children: vec![],
        });
        self.arena[parent].children.push(ArenaChild::Node(node));

        let mut child_cx = cx.clone();
        child_cx.conditions.push(condition);
        child_cx.tree_node = Some(node);
        for child in &gate.children {
            self.walk(child, &child_cx)?;
        }
        Ok(())
    }

    fn walk_loop(
        &mut self,
        collection_loop: &CollectionLoopDecl,
        cx: &Context,
    ) -> Result<(), CompileError> {
        let Some(subcategory_route) = &cx.subcategory_route else {
            return Err(CompileError::MissingParent {
                kind: "collection loop",
                route: collection_loop.loop_name.clone(),
                parent: "subcategory",
            });
        };
        let name = collection_loop.loop_name.clone();
        if self.loops.contains_key(&name) {
            return Err(CompileError::DuplicateLoop { name });
        }
        let collection = collection_loop
            .collection
            .clone()
            .or_else(|| cx.collection_context.clone())
            .ok_or_else(|| CompileError::MissingCollectionContext { name: name.clone() })?;
        let full_route = if collection_loop.is_inner {
            cx.sub_subcategory_route
                .clone()
                .ok_or_else(|| CompileError::InnerLoopOutsideSubSubcategory {
                    name: name.clone(),
                })?
        } else {
            subcategory_route.clone()
        };

        self.loops.insert(
            name.clone(),
            CollectionLoop {
                name: name.clone(),
                full_route,
                subcategory_route: subcategory_route.clone(),
                collection_name: collection.clone(),
                auto_iterate: collection_loop.auto_iterate,
                is_inner: collection_loop.is_inner,
                item_completed_condition: collection_loop
                    .collection_item_completed_condition
                    .as_ref()
                    .map(Condition::from),
                done_path: collection_loop.done_path.clone(),
                knockout_route: collection_loop.knockout_route.clone(),
                data_view_sections: collection_loop
                    .data_view_sections
                    .iter()
                    .map(|section| CompiledDataViewSection {
                        i18n_key: section.i18n_key.clone(),
                        conditions: section.conditions.iter().map(Condition::from).collect(),
                    })
                    .collect(),
                screens: vec![],
                sub_subcategories: vec![],
            },
        );
        if let Some(subcategory) = self.subcategories.get_mut(subcategory_route) {
            subcategory.loops.push(name.clone());
            subcategory.sections.push(SectionRef::Loop(name.clone()));
        }

        let child_cx = Context {
            collection_context: Some(collection),
            collection_loop: Some(LoopRef {
                name,
                auto_iterate: collection_loop.auto_iterate,
            }),
            ..cx.clone()
        };
        for child in &collection_loop.children {
            self.walk(child, &child_cx)?;
        }
        Ok(())
    }

    fn add_screen(&mut self, screen: &ScreenDecl, cx: &Context) -> Result<(), CompileError> {
        let Some(subcategory_route) = &cx.subcategory_route else {
            return Err(CompileError::MissingParent {
                kind: "screen",
                route: screen.route.clone(),
                parent: "subcategory",
            });
        };
        let screen_route = format!("{subcategory_route}/{}", screen.route);
        if self.screens_by_route.contains_key(&screen_route) {
            return Err(CompileError::DuplicateRoute {
                route: screen_route,
            });
        }

        let local_condition: Option<Condition> = screen.condition.as_ref().map(Condition::from);
        let mut conditions = cx.conditions.clone();
        if let Some(local) = &local_condition {
            conditions.push(local.clone());
        }

        let id = ScreenId(self.screens.len());
        // category_route is present whenever subcategory_route is.
        let category_route = cx.category_route.clone().unwrap_or_default();
        self.screens.push(Screen {
            id,
            route: screen.route.clone(),
            screen_route: screen_route.clone(),
            category_route,
            subcategory_route: subcategory_route.clone(),
            sub_subcategory_route: cx.sub_subcategory_route.clone(),
            conditions,
            collection_context: cx.collection_context.clone(),
            collection_loop: cx.collection_loop.clone(),
            route_automatically: screen.route_automatically,
            act_as_data_view: screen.act_as_data_view,
            is_knockout: screen.is_knockout,
            content: screen.content.clone(),
        });
        self.screens_by_route.insert(screen_route, id);

        if let Some(subcategory) = self.subcategories.get_mut(subcategory_route) {
            subcategory.screens.push(id);
        }
        if let Some(loop_ref) = &cx.collection_loop
            && let Some(collection_loop) = self.loops.get_mut(&loop_ref.name)
        {
            collection_loop.screens.push(id);
        }
        if let Some(ssc_route) = &cx.sub_subcategory_route
            && let Some(ssc) = self.sub_subcategories.get_mut(ssc_route)
        {
            ssc.screens.push(id);
        }

        // A local condition wraps the screen in its own single-gate node so
        // the gate tree mirrors effective visibility exactly.
        if let Some(parent) = cx.tree_node {
            match local_condition {
                Some(local) => {
                    let node = self.arena.len();
                    self.arena.push(ArenaNode {
                        gates: vec![local],
                        children: vec![ArenaChild::Screen(id)],
                    });
                    self.arena[parent].children.push(ArenaChild::Node(node));
                }
                None => self.arena[parent].children.push(ArenaChild::Screen(id)),
            }
        }
        Ok(())
    }

    fn add_assertion(
        &mut self,
        assertion: &AssertionDecl,
        cx: &Context,
    ) -> Result<(), CompileError> {
        let Some(subcategory_route) = &cx.subcategory_route else {
            return Err(CompileError::MissingParent {
                kind: "assertion",
                route: assertion.i18n_key.clone(),
                parent: "subcategory",
            });
        };
        let conditions = assertion
            .condition
            .iter()
            .chain(&assertion.conditions)
            .map(Condition::from)
            .collect();
        if let Some(subcategory) = self.subcategories.get_mut(subcategory_route) {
            subcategory.assertions.push(Assertion {
                assertion_type: assertion.assertion_type,
                i18n_key: assertion.i18n_key.clone(),
                subcategory_route: subcategory_route.clone(),
                sub_subcategory_route: cx.sub_subcategory_route.clone(),
                conditions,
                edit_route: assertion.edit_route.clone(),
            });
        }
        Ok(())
    }

    fn freeze(&self, index: usize) -> GatedNode {
        let node = &self.arena[index];
        GatedNode {
            gates: node.gates.clone(),
            children: node
                .children
                .iter()
                .map(|child| match child {
                    ArenaChild::Screen(id) => GatedChild::Screen(*id),
                    ArenaChild::Node(index) => GatedChild::Node(self.freeze(*index)),
                })
                .collect(),
        }
    }

    fn finish(mut self) -> FlowGraph {
        let roots: Vec<(String, usize)> = self
            .tree_roots
            .iter()
            .map(|(route, index)| (route.clone(), *index))
            .collect();
        for (route, index) in roots {
            let tree = self.freeze(index);
            if let Some(subcategory) = self.subcategories.get_mut(&route) {
                subcategory.gated_tree = tree;
            }
        }
        FlowGraph {
            screens: self.screens,
            screens_by_route: self.screens_by_route,
            categories: self.categories,
            subcategories_by_route: self.subcategories,
            sub_subcategories_by_route: self.sub_subcategories,
            loops_by_name: self.loops,
        }
    }
}
