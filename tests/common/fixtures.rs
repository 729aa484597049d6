#![allow(dead_code)]
//! Shared declarative flow fixtures.

use screenflow::condition::{ConditionOperator, RawCondition};
use screenflow::flow::{
    AssertionDecl, AssertionType, CategoryDecl, CollectionLoopDecl, ContentDeclaration, FlowDecl,
    FlowGraph, FlowNode, GateDecl, ScreenDecl, SubSubcategoryDecl, SubcategoryDecl, compile,
};
use serde_json::json;

fn text_field(path: &str) -> ContentDeclaration {
    ContentDeclaration::new("GenericString", json!({ "path": path }))
}

fn complete_if(path: &str) -> RawCondition {
    RawCondition::Full {
        operator: ConditionOperator::IsComplete,
        condition: path.to_owned(),
    }
}

/// An intake questionnaire exercising gates, manual screens, collection
/// loops (manual and auto-iterating), split sub-subcategories, knockouts,
/// alerts, and assertions.
pub fn questionnaire() -> FlowNode {
    FlowDecl::new(vec![CategoryDecl::new(
        "intake",
        vec![
            basics(),
            household(),
            income(),
            deductions(),
            interest(),
            wrapup(),
        ],
    )])
}

pub fn compiled() -> FlowGraph {
    compile(&questionnaire()).expect("fixture flow compiles")
}

fn basics() -> FlowNode {
    SubcategoryDecl::new(
        "basics",
        vec![
            SubSubcategoryDecl::new(
                "profile",
                vec![
                    ScreenDecl::new("intro").build(),
                    ScreenDecl::new("name").content(text_field("/fullName")).build(),
                    ScreenDecl::new("spouse")
                        .condition("/isMarried")
                        .content(text_field("/spouseName"))
                        .build(),
                    ScreenDecl::new("summary").manual().build(),
                ],
            )
            .build(),
        ],
    )
    .build()
}

fn household() -> FlowNode {
    SubcategoryDecl::new(
        "household",
        vec![
            GateDecl::new(
                "/hasDependents",
                vec![
                    ScreenDecl::new("dependents-intro").build(),
                    ScreenDecl::new("custody-details")
                        .condition("/custodyShared")
                        .build(),
                ],
            ),
            ScreenDecl::new("household-wrapup").act_as_data_view().build(),
        ],
    )
    .display_only_if("/hasHousehold")
    .build()
}

fn income() -> FlowNode {
    SubcategoryDecl::new(
        "income",
        vec![
            ScreenDecl::new("income-hub")
                .content(ContentDeclaration::new(
                    "CollectionItemManager",
                    json!({ "loopName": "income-loop", "path": "/incomeSources" }),
                ))
                .build(),
            CollectionLoopDecl::new(
                "income-loop",
                vec![
                    SubSubcategoryDecl::new(
                        "source-details",
                        vec![
                            ScreenDecl::new("source-type")
                                .content(text_field("/incomeSources/*/type"))
                                .build(),
                            ScreenDecl::new("source-amount")
                                .content(text_field("/incomeSources/*/amount"))
                                .content(ContentDeclaration::new(
                                    "Alert",
                                    json!({
                                        "i18nKey": "alerts.missing-amount",
                                        "type": "warning",
                                        "conditions": [{
                                            "operator": "isIncomplete",
                                            "condition": "/incomeSources/*/amount"
                                        }]
                                    }),
                                ))
                                .build(),
                        ],
                    )
                    .build(),
                ],
            )
            .item_completed_if(complete_if("/incomeSources/*/amount"))
            .done_path("/incomeSourcesDone")
            .knockout_route("/flow/intake/wrapup/ko")
            .build(),
        ],
    )
    .collection_context("/incomeSources")
    .build()
}

fn deductions() -> FlowNode {
    SubcategoryDecl::new(
        "deductions",
        vec![
            SubSubcategoryDecl::new(
                "standard",
                vec![
                    ScreenDecl::new("ded-intro").build(),
                    ScreenDecl::new("ded-choice")
                        .content(text_field("/deductionChoice"))
                        .build(),
                ],
            )
            .build(),
            SubSubcategoryDecl::new(
                "credits",
                vec![
                    ScreenDecl::new("credit-one").build(),
                    ScreenDecl::new("credit-two").build(),
                ],
            )
            .build(),
            // A later continuation of the `standard` sub-subcategory.
            SubSubcategoryDecl::new("standard", vec![ScreenDecl::new("ded-extra").build()])
                .build(),
            AssertionDecl::new(AssertionType::Info, "assertions.deduction-chosen")
                .condition(complete_if("/deductionChoice"))
                .build(),
        ],
    )
    .build()
}

fn interest() -> FlowNode {
    SubcategoryDecl::new(
        "interest",
        vec![
            ScreenDecl::new("interest-intro").build(),
            CollectionLoopDecl::new(
                "interest-loop",
                vec![
                    ScreenDecl::new("interest-payer")
                        .content(text_field("/interestReports/*/payer"))
                        .build(),
                    ScreenDecl::new("interest-amount")
                        .content(text_field("/interestReports/*/amount"))
                        .build(),
                ],
            )
            .collection("/interestReports")
            .auto_iterate()
            .build(),
        ],
    )
    .build()
}

fn wrapup() -> FlowNode {
    SubcategoryDecl::new(
        "wrapup",
        vec![
            ScreenDecl::new("knockout-check")
                .content(ContentDeclaration::new(
                    "Alert",
                    json!({
                        "i18nKey": "alerts.knocked-out",
                        "type": "error",
                        "condition": "/flowIsKnockedOut"
                    }),
                ))
                .build(),
            ScreenDecl::new("ko")
                .condition("/flowIsKnockedOut")
                .knockout()
                .build(),
            ScreenDecl::new("done").build(),
        ],
    )
    .skip_data_view()
    .build()
}

/// A flow with an inner loop nested inside a sub-subcategory hub.
pub fn garage() -> FlowNode {
    FlowDecl::new(vec![CategoryDecl::new(
        "garage",
        vec![
            SubcategoryDecl::new(
                "vehicles",
                vec![
                    SubSubcategoryDecl::new(
                        "vehicle-hub",
                        vec![
                            ScreenDecl::new("manage")
                                .content(ContentDeclaration::new(
                                    "CollectionItemManager",
                                    json!({ "loopName": "parts-loop" }),
                                ))
                                .build(),
                            CollectionLoopDecl::new(
                                "parts-loop",
                                vec![
                                    SubSubcategoryDecl::new(
                                        "parts",
                                        vec![
                                            ScreenDecl::new("part-name")
                                                .content(text_field("/vehicles/*/parts"))
                                                .content(ContentDeclaration::new(
                                                    "Alert",
                                                    json!({
                                                        "i18nKey": "alerts.part-name-missing",
                                                        "type": "warning",
                                                        "condition": "/partNameMissing"
                                                    }),
                                                ))
                                                .build(),
                                        ],
                                    )
                                    .build(),
                                ],
                            )
                            .collection("/vehicles/*/parts")
                            .auto_iterate()
                            .inner()
                            .item_completed_if(complete_if("/vehicles/*/parts"))
                            .build(),
                        ],
                    )
                    .build(),
                    SubSubcategoryDecl::new(
                        "vehicle-extra",
                        vec![ScreenDecl::new("extra").build()],
                    )
                    .build(),
                ],
            )
            .build(),
        ],
    )])
}

pub fn compiled_garage() -> FlowGraph {
    compile(&garage()).expect("garage flow compiles")
}
