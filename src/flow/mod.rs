//! Flow declaration, compilation, and the compiled graph.

pub mod compiler;
pub mod declarations;
pub mod graph;

pub use compiler::{CompileError, compile};
pub use declarations::{
    AssertionDecl, AssertionType, CategoryDecl, CollectionLoopDecl, ContentDeclaration,
    DataViewSection, FlowDecl, FlowNode, GateDecl, ScreenDecl, SubSubcategoryDecl,
    SubcategoryDecl,
};
pub use graph::{
    Assertion, Category, CollectionLoop, CompiledDataViewSection, FlowGraph, GatedChild,
    GatedNode, LoopRef, Screen, ScreenId, SectionRef, SubSubcategory, Subcategory,
};
