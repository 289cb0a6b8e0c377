//! # Graph IR core (C3, C4, C5)
//!
//! The data model of `spec.md` §3: types, node types, node instances,
//! graph functions, graph structs, modules, and the owning `Context`.

pub mod context;
pub mod graph_function;
pub mod graph_struct;
pub mod module;
pub mod node_instance;
pub mod node_type;
pub mod types;

pub use context::Context;
pub use graph_function::GraphFunction;
pub use graph_struct::GraphStruct;
pub use module::{CModule, GraphModule, LangModule, Module};
pub use node_instance::NodeInstance;
pub use node_type::{NodeBehavior, NodeType};
pub use types::{DataType, NamedDataType, Position};
