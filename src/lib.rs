//! # screenflow
//!
//! Flow-graph compiler and screen router for conditionally branching,
//! multi-section questionnaires.
//!
//! A questionnaire is declared as a tree of categories, subcategories,
//! gates, screens, and collection loops ([`flow::declarations`]), compiled
//! once into an immutable [`flow::FlowGraph`], and then queried:
//!
//! - [`router::next_screen`] decides where the user goes after a screen,
//!   honoring gate conditions, manual screens, loop iteration, knockouts,
//!   and section boundaries.
//! - [`progress`] finds the first incomplete screen of a subcategory or
//!   loop so a user can resume where they left off.
//! - [`alerts`] aggregates active alert content and checklist assertions.
//!
//! All evaluation reads user data through the [`facts::FactStore`] trait;
//! the engine holds no answer data of its own.
//!
//! ## Example
//!
//! ```
//! use screenflow::flow::{
//!     CategoryDecl, FlowDecl, ScreenDecl, SubcategoryDecl, compile,
//! };
//!
//! let tree = FlowDecl::new(vec![CategoryDecl::new(
//!     "you",
//!     vec![
//!         SubcategoryDecl::new(
//!             "about-you",
//!             vec![
//!                 ScreenDecl::new("intro").build(),
//!                 ScreenDecl::new("basic-info")
//!                     .condition("/wantsDetails")
//!                     .build(),
//!             ],
//!         )
//!         .build(),
//!     ],
//! )]);
//!
//! let graph = compile(&tree)?;
//! assert!(graph.screen_by_route("/flow/you/about-you/intro").is_some());
//! # Ok::<(), screenflow::flow::CompileError>(())
//! ```

pub mod alerts;
pub mod condition;
pub mod facts;
pub mod flow;
pub mod progress;
pub mod router;
pub mod telemetry;

pub use condition::{Condition, ConditionError, ConditionOperator, RawCondition};
pub use facts::{ConcretePath, FactPath, FactResult, FactStore};
pub use flow::{CompileError, FlowGraph, FlowNode, compile};
pub use router::{NextScreen, NextScreenOptions, Routable, RouteError, next_screen};
