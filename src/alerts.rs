//! Aggregated alerts and checklist assertions.
//!
//! Screens may carry `Alert` content whose conditions decide whether a
//! problem needs the user's attention. Alerts on loop screens are evaluated
//! once per collection item, so each offending item gets its own entry with
//! a route leading straight to it.

use serde::Serialize;
use serde_json::Value;

use crate::condition::{Condition, ConditionError, evaluate_all};
use crate::facts::FactStore;
use crate::flow::graph::{Assertion, FlowGraph, Subcategory};

/// Component name marking alert content on a screen.
pub const ALERT_COMPONENT: &str = "Alert";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AlertSeverity {
    Error,
    Warning,
}

/// One active alert, addressed to the screen (and item) that raised it.
#[derive(Debug, Clone, Serialize)]
pub struct AlertConfig {
    pub severity: AlertSeverity,
    pub i18n_key: String,
    /// Full route to the offending screen, item query param included.
    pub route: String,
    pub subcategory_route: String,
    pub sub_subcategory_route: Option<String>,
    pub loop_name: Option<String>,
    pub collection_item: Option<String>,
}

/// Active alerts grouped by severity, errors first.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AlertConfigs {
    pub errors: Vec<AlertConfig>,
    pub warnings: Vec<AlertConfig>,
}

impl AlertConfigs {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty() && self.warnings.is_empty()
    }

    /// Alerts raised within one sub-subcategory.
    pub fn filter_by_sub_subcategory(&self, route: &str) -> AlertConfigs {
        let keep = |alert: &&AlertConfig| alert.sub_subcategory_route.as_deref() == Some(route);
        AlertConfigs {
            errors: self.errors.iter().filter(keep).cloned().collect(),
            warnings: self.warnings.iter().filter(keep).cloned().collect(),
        }
    }
}

/// Collect every active alert across the flow's screens.
pub fn active_alerts(
    graph: &FlowGraph,
    facts: &dyn FactStore,
) -> Result<AlertConfigs, ConditionError> {
    let mut configs = AlertConfigs::default();
    for screen in graph.screens() {
        for content in &screen.content {
            if content.component != ALERT_COMPONENT {
                continue;
            }
            let Some(i18n_key) = content.props.get("i18nKey").and_then(Value::as_str) else {
                continue;
            };
            let severity = match content.props.get("type").and_then(Value::as_str) {
                Some("warning") => AlertSeverity::Warning,
                _ => AlertSeverity::Error,
            };
            let conditions: Vec<Condition> =
                content.conditions().iter().map(Condition::from).collect();

            let mut push = |item: Option<String>| {
                let config = AlertConfig {
                    severity,
                    i18n_key: i18n_key.to_owned(),
                    route: screen.full_route(item.as_deref()),
                    subcategory_route: screen.subcategory_route.clone(),
                    sub_subcategory_route: screen.sub_subcategory_route.clone(),
                    loop_name: screen.collection_loop.as_ref().map(|l| l.name.clone()),
                    collection_item: item,
                };
                match severity {
                    AlertSeverity::Error => configs.errors.push(config),
                    AlertSeverity::Warning => configs.warnings.push(config),
                }
            };
            // Loop screens raise one alert per offending collection item
            // and nothing otherwise; an inner loop's abstract collection is
            // out of reach here and contributes nothing.
            match (&screen.collection_loop, &screen.collection_context) {
                (Some(_), Some(collection)) => {
                    let Some(collection) = collection.try_concrete(None) else {
                        continue;
                    };
                    for item in facts.collection_items(&collection) {
                        if evaluate_all(&conditions, facts, Some(&item))? {
                            push(Some(item));
                        }
                    }
                }
                _ => {
                    if evaluate_all(&conditions, facts, None)? {
                        push(None);
                    }
                }
            }
        }
    }
    Ok(configs)
}

/// Assertions of a subcategory whose conditions currently pass, in
/// declaration order.
pub fn active_assertions<'a>(
    subcategory: &'a Subcategory,
    facts: &dyn FactStore,
    item: Option<&str>,
) -> Result<Vec<&'a Assertion>, ConditionError> {
    let mut active = vec![];
    for assertion in &subcategory.assertions {
        if assertion.is_active(facts, item)? {
            active.push(assertion);
        }
    }
    Ok(active)
}
