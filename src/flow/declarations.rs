//! Declarative flow trees.
//!
//! A flow is authored (or deserialized) as a tree of [`FlowNode`]s: a `Flow`
//! root holding categories, which hold subcategories, which hold gates,
//! screens, sub-subcategories, collection loops, and assertions. The tree
//! carries no evaluated state; [`compile`](crate::flow::compile) turns it
//! into a [`FlowGraph`](crate::flow::FlowGraph).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::condition::RawCondition;
use crate::facts::FactPath;

/// One node of a declarative flow tree, tagged by `kind` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FlowNode {
    Flow(FlowDecl),
    Category(CategoryDecl),
    Subcategory(SubcategoryDecl),
    SubSubcategory(SubSubcategoryDecl),
    Gate(GateDecl),
    Screen(ScreenDecl),
    CollectionLoop(CollectionLoopDecl),
    Assertion(AssertionDecl),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlowDecl {
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl FlowDecl {
    pub fn new(children: Vec<FlowNode>) -> FlowNode {
        FlowNode::Flow(FlowDecl { children })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDecl {
    pub route: String,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl CategoryDecl {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> FlowNode {
        FlowNode::Category(CategoryDecl {
            route: route.into(),
            children,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubcategoryDecl {
    pub route: String,
    /// Conditions under which the whole subcategory counts as complete.
    #[serde(default, deserialize_with = "one_or_many")]
    pub complete_if: Vec<RawCondition>,
    /// Display gate: the subcategory is shown only while every condition
    /// passes.
    #[serde(default, deserialize_with = "one_or_many")]
    pub display_only_if: Vec<RawCondition>,
    /// Collection backing screens in this subcategory, inherited downward.
    #[serde(default)]
    pub collection_context: Option<FactPath>,
    /// Hub subcategories route to the checklist instead of a data view.
    #[serde(default)]
    pub skip_data_view: bool,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl SubcategoryDecl {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> Self {
        SubcategoryDecl {
            route: route.into(),
            complete_if: vec![],
            display_only_if: vec![],
            collection_context: None,
            skip_data_view: false,
            children,
        }
    }

    #[must_use]
    pub fn complete_if(mut self, condition: impl Into<RawCondition>) -> Self {
        self.complete_if.push(condition.into());
        self
    }

    #[must_use]
    pub fn display_only_if(mut self, condition: impl Into<RawCondition>) -> Self {
        self.display_only_if.push(condition.into());
        self
    }

    #[must_use]
    pub fn collection_context(mut self, path: impl Into<FactPath>) -> Self {
        self.collection_context = Some(path.into());
        self
    }

    #[must_use]
    pub fn skip_data_view(mut self) -> Self {
        self.skip_data_view = true;
        self
    }

    pub fn build(self) -> FlowNode {
        FlowNode::Subcategory(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubSubcategoryDecl {
    pub route: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub complete_if: Vec<RawCondition>,
    #[serde(default)]
    pub collection_context: Option<FactPath>,
    #[serde(default = "default_true")]
    pub editable: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl SubSubcategoryDecl {
    pub fn new(route: impl Into<String>, children: Vec<FlowNode>) -> Self {
        SubSubcategoryDecl {
            route: route.into(),
            complete_if: vec![],
            collection_context: None,
            editable: true,
            hidden: false,
            children,
        }
    }

    #[must_use]
    pub fn collection_context(mut self, path: impl Into<FactPath>) -> Self {
        self.collection_context = Some(path.into());
        self
    }

    #[must_use]
    pub fn not_editable(mut self) -> Self {
        self.editable = false;
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn build(self) -> FlowNode {
        FlowNode::SubSubcategory(self)
    }
}

/// Applies one condition to every screen in its subtree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDecl {
    pub condition: RawCondition,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl GateDecl {
    pub fn new(condition: impl Into<RawCondition>, children: Vec<FlowNode>) -> FlowNode {
        FlowNode::Gate(GateDecl {
            condition: condition.into(),
            children,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenDecl {
    pub route: String,
    /// Local availability condition, also a one-gate wrapper in the tree.
    #[serde(default)]
    pub condition: Option<RawCondition>,
    /// Manual screens are skipped by the router and reached by direct links.
    #[serde(default = "default_true")]
    pub route_automatically: bool,
    #[serde(default)]
    pub act_as_data_view: bool,
    #[serde(default)]
    pub is_knockout: bool,
    #[serde(default)]
    pub content: Vec<ContentDeclaration>,
}

impl ScreenDecl {
    pub fn new(route: impl Into<String>) -> Self {
        ScreenDecl {
            route: route.into(),
            condition: None,
            route_automatically: true,
            act_as_data_view: false,
            is_knockout: false,
            content: vec![],
        }
    }

    #[must_use]
    pub fn condition(mut self, condition: impl Into<RawCondition>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn manual(mut self) -> Self {
        self.route_automatically = false;
        self
    }

    #[must_use]
    pub fn act_as_data_view(mut self) -> Self {
        self.act_as_data_view = true;
        self
    }

    #[must_use]
    pub fn knockout(mut self) -> Self {
        self.is_knockout = true;
        self
    }

    #[must_use]
    pub fn content(mut self, content: ContentDeclaration) -> Self {
        self.content.push(content);
        self
    }

    pub fn build(self) -> FlowNode {
        FlowNode::Screen(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLoopDecl {
    pub loop_name: String,
    /// Collection fact; falls back to the inherited collection context.
    #[serde(default)]
    pub collection: Option<FactPath>,
    /// Auto-iterating loops chain the router from item to item.
    #[serde(default)]
    pub auto_iterate: bool,
    /// Inner loops nest inside a sub-subcategory of an outer loop hub.
    #[serde(default)]
    pub is_inner: bool,
    /// Marks an item done for progress purposes when it passes.
    #[serde(default)]
    pub collection_item_completed_condition: Option<RawCondition>,
    /// Boolean fact flipped when the user finishes iterating the loop.
    #[serde(default)]
    pub done_path: Option<FactPath>,
    /// Where an auto-iterating loop lands when an item knocks out.
    #[serde(default)]
    pub knockout_route: Option<String>,
    #[serde(default)]
    pub data_view_sections: Vec<DataViewSection>,
    #[serde(default)]
    pub children: Vec<FlowNode>,
}

impl CollectionLoopDecl {
    pub fn new(loop_name: impl Into<String>, children: Vec<FlowNode>) -> Self {
        CollectionLoopDecl {
            loop_name: loop_name.into(),
            collection: None,
            auto_iterate: false,
            is_inner: false,
            collection_item_completed_condition: None,
            done_path: None,
            knockout_route: None,
            data_view_sections: vec![],
            children,
        }
    }

    #[must_use]
    pub fn collection(mut self, path: impl Into<FactPath>) -> Self {
        self.collection = Some(path.into());
        self
    }

    #[must_use]
    pub fn auto_iterate(mut self) -> Self {
        self.auto_iterate = true;
        self
    }

    #[must_use]
    pub fn inner(mut self) -> Self {
        self.is_inner = true;
        self
    }

    #[must_use]
    pub fn item_completed_if(mut self, condition: impl Into<RawCondition>) -> Self {
        self.collection_item_completed_condition = Some(condition.into());
        self
    }

    #[must_use]
    pub fn done_path(mut self, path: impl Into<FactPath>) -> Self {
        self.done_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn knockout_route(mut self, route: impl Into<String>) -> Self {
        self.knockout_route = Some(route.into());
        self
    }

    pub fn build(self) -> FlowNode {
        FlowNode::CollectionLoop(self)
    }
}

/// A named slice of a collection data view, shown when its conditions pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataViewSection {
    pub i18n_key: String,
    #[serde(default, deserialize_with = "one_or_many")]
    pub conditions: Vec<RawCondition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssertionType {
    Info,
    Success,
    Warning,
    Inactive,
}

/// Checklist-level message attached to a subcategory, active when its
/// conditions all pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionDecl {
    #[serde(rename = "type")]
    pub assertion_type: AssertionType,
    pub i18n_key: String,
    #[serde(default)]
    pub condition: Option<RawCondition>,
    #[serde(default, deserialize_with = "one_or_many")]
    pub conditions: Vec<RawCondition>,
    #[serde(default)]
    pub edit_route: Option<String>,
}

impl AssertionDecl {
    pub fn new(assertion_type: AssertionType, i18n_key: impl Into<String>) -> Self {
        AssertionDecl {
            assertion_type,
            i18n_key: i18n_key.into(),
            condition: None,
            conditions: vec![],
            edit_route: None,
        }
    }

    #[must_use]
    pub fn condition(mut self, condition: impl Into<RawCondition>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    #[must_use]
    pub fn edit_route(mut self, route: impl Into<String>) -> Self {
        self.edit_route = Some(route.into());
        self
    }

    pub fn build(self) -> FlowNode {
        FlowNode::Assertion(self)
    }
}

/// An opaque piece of screen content.
///
/// The engine does not render content; it only inspects the handful of
/// props that drive routing and progress: fact paths, per-content
/// conditions, and alert fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentDeclaration {
    pub component: String,
    #[serde(default)]
    pub props: Value,
}

impl ContentDeclaration {
    pub fn new(component: impl Into<String>, props: Value) -> Self {
        ContentDeclaration {
            component: component.into(),
            props,
        }
    }

    /// The fact path this content writes, if any.
    pub fn fact_path(&self) -> Option<FactPath> {
        self.props
            .get("path")
            .and_then(Value::as_str)
            .map(FactPath::new)
    }

    /// Per-content conditions from either a `condition` or `conditions` prop.
    pub fn conditions(&self) -> Vec<RawCondition> {
        if let Some(single) = self.props.get("condition") {
            return serde_json::from_value(single.clone())
                .map(|c| vec![c])
                .unwrap_or_default();
        }
        self.props
            .get("conditions")
            .and_then(|list| serde_json::from_value(list.clone()).ok())
            .unwrap_or_default()
    }

    pub fn is_read_only(&self) -> bool {
        self.props
            .get("readOnly")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Content restricted to the data view never gates screen progress.
    pub fn is_data_view_only(&self) -> bool {
        self.props.get("displayOnlyOn").and_then(Value::as_str) == Some("data-view")
    }
}

fn default_true() -> bool {
    true
}

/// Accepts a single condition or a list where declarations allow either.
fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<RawCondition>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(RawCondition),
        Many(Vec<RawCondition>),
    }

    Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
        None => vec![],
        Some(OneOrMany::One(condition)) => vec![condition],
        Some(OneOrMany::Many(conditions)) => conditions,
    })
}
