//! # Module (part of C5, Graph IR)
//!
//! `spec.md` §3: `Module` is abstract with three concrete variants.
//! `entry`/`exit` are intentionally not offered here — their shape depends
//! on a function's signature, so they live on
//! [`crate::core::graph_function::GraphFunction`] instead; `LangModule`
//! supplies the remaining built-ins (`if`, `const-*`, `strliteral`) plus
//! the primitive types.

use crate::backend::Backend;
use crate::core::graph_function::GraphFunction;
use crate::core::graph_struct::GraphStruct;
use crate::core::node_type::{ConstBoolBehavior, ConstFloatBehavior, ConstIntBehavior, IfBehavior, NodeType, StrLiteralBehavior};
use crate::core::types::{DataType, NamedDataType};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

/// Built-in primitives and node types that don't belong to any user module
/// (`spec.md` §3). One `LangModule` exists per [`crate::core::context::Context`].
pub struct LangModule<B: Backend> {
    types: HashMap<String, DataType<B>>,
}

impl<B: Backend> LangModule<B> {
    pub const PATH: &'static str = "lang";

    /// Builds the primitive type table: `i1`, `i8`, `i32`, `i64`, `float`,
    /// `double`, plus `*`-suffixed pointer forms (`spec.md` §3).
    pub fn new(ctx: &B::Context, backend_module: &mut B::Module) -> Self {
        let mut types = HashMap::new();
        let scalars: &[(&str, fn(&B::Context) -> B::Type)] =
            &[("i1", B::type_i1), ("i8", B::type_i8), ("i32", B::type_i32), ("i64", B::type_i64), ("float", B::type_float), ("double", B::type_double)];
        for (name, make) in scalars {
            let backend_type = make(ctx);
            let debug_type = B::create_debug_file(backend_module, name, Self::PATH);
            types.insert(name.to_string(), DataType::new(Self::PATH, *name, backend_type, debug_type));
        }

        let pointer_suffixes: &[&str] = &["i1", "i8", "i32", "i64", "float", "double"];
        for base in pointer_suffixes {
            let base_type = types[*base].backend_type.clone();
            let name = format!("{base}*");
            let debug_type = B::create_debug_file(backend_module, &name, Self::PATH);
            types.insert(name.clone(), DataType::new(Self::PATH, name.clone(), B::type_pointer(base_type), debug_type));
        }

        Self { types }
    }

    pub fn type_named(&self, name: &str) -> Option<DataType<B>> {
        self.types.get(name).cloned()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    pub fn if_node_type(&self) -> Option<NodeType<B>> {
        let i1 = self.type_named("i1")?;
        Some(NodeType {
            module_path: Self::PATH.to_string(),
            name: "if".to_string(),
            data_inputs: vec![NamedDataType::new("condition", i1)],
            data_outputs: Vec::new(),
            exec_inputs: vec!["in".to_string()],
            exec_outputs: vec!["true".to_string(), "false".to_string()],
            pure: false,
            data: serde_json::json!({}),
            behavior: Arc::new(IfBehavior),
        })
    }

    pub fn const_int_node_type(&self, value: i64) -> Option<NodeType<B>> {
        let i32_ty = self.type_named("i32")?;
        Some(NodeType {
            module_path: Self::PATH.to_string(),
            name: "const-int".to_string(),
            data_inputs: Vec::new(),
            data_outputs: vec![NamedDataType::new("value", i32_ty)],
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            pure: true,
            data: serde_json::json!({ "value": value }),
            behavior: Arc::new(ConstIntBehavior { value }),
        })
    }

    pub fn const_bool_node_type(&self, value: bool) -> Option<NodeType<B>> {
        let i1 = self.type_named("i1")?;
        Some(NodeType {
            module_path: Self::PATH.to_string(),
            name: "const-bool".to_string(),
            data_inputs: Vec::new(),
            data_outputs: vec![NamedDataType::new("value", i1)],
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            pure: true,
            data: serde_json::json!({ "value": value }),
            behavior: Arc::new(ConstBoolBehavior { value }),
        })
    }

    pub fn const_float_node_type(&self, value: f64) -> Option<NodeType<B>> {
        let double = self.type_named("double")?;
        Some(NodeType {
            module_path: Self::PATH.to_string(),
            name: "const-float".to_string(),
            data_inputs: Vec::new(),
            data_outputs: vec![NamedDataType::new("value", double)],
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            pure: true,
            data: serde_json::json!({ "value": value }),
            behavior: Arc::new(ConstFloatBehavior { value }),
        })
    }

    pub fn strliteral_node_type(&self, value: impl Into<String>) -> Option<NodeType<B>> {
        let value = value.into();
        let i64_ty = self.type_named("i64")?;
        Some(NodeType {
            module_path: Self::PATH.to_string(),
            name: "strliteral".to_string(),
            data_inputs: Vec::new(),
            data_outputs: vec![NamedDataType::new("value", i64_ty)],
            exec_inputs: Vec::new(),
            exec_outputs: Vec::new(),
            pure: true,
            data: serde_json::json!({ "value": value }),
            behavior: Arc::new(StrLiteralBehavior { value }),
        })
    }
}

/// User-authored module: an ordered set of functions and structs, a
/// dependency set, and a last-edit timestamp used by the module cache (C10).
#[derive(Clone)]
pub struct GraphModule<B: Backend> {
    pub path: String,
    pub functions: Vec<GraphFunction<B>>,
    pub structs: Vec<GraphStruct<B>>,
    pub dependencies: Vec<String>,
    pub last_edit_time: SystemTime,
}

impl<B: Backend> GraphModule<B> {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into(), functions: Vec::new(), structs: Vec::new(), dependencies: Vec::new(), last_edit_time: SystemTime::now() }
    }

    pub fn touch(&mut self) {
        self.last_edit_time = SystemTime::now();
    }

    pub fn function(&self, name: &str) -> Option<&GraphFunction<B>> {
        self.functions.iter().find(|f| f.name == name)
    }

    pub fn function_mut(&mut self, name: &str) -> Option<&mut GraphFunction<B>> {
        self.functions.iter_mut().find(|f| f.name == name)
    }

    pub fn struct_named(&self, name: &str) -> Option<&GraphStruct<B>> {
        self.structs.iter().find(|s| s.name == name)
    }

    pub fn struct_named_mut(&mut self, name: &str) -> Option<&mut GraphStruct<B>> {
        self.structs.iter_mut().find(|s| s.name == name)
    }

    /// Regenerate every `_make_<name>`/`_break_<name>` `NodeInstance` across
    /// every function of this module so it reflects `struct_name`'s current
    /// field list (`spec.md` §3: "renaming/retyping/removing a struct
    /// propagates to these synthesized node types **and to every
    /// `NodeInstance` of them**"). The struct's own backend type is left
    /// untouched — a field rename/removal changes port shape, not the
    /// already-resolved backend struct layout, which only a module compiler
    /// with a live backend context can rebuild — so each instance keeps
    /// whichever `DataType` it already carries for the struct value itself
    /// and only its per-field ports are regenerated. Mirrors
    /// `GraphFunction::rename_local`'s `_get_`/`_set_` regeneration.
    pub fn propagate_struct_change(&mut self, struct_name: &str) {
        let Some(s) = self.struct_named(struct_name).cloned() else { return };
        let make_name = format!("_make_{struct_name}");
        let break_name = format!("_break_{struct_name}");

        for function in &mut self.functions {
            let ids: Vec<Uuid> = function
                .nodes
                .iter()
                .filter(|(_, n)| n.node_type.module_path == s.module_path && (n.node_type.name == make_name || n.node_type.name == break_name))
                .map(|(id, _)| *id)
                .collect();

            for id in ids {
                let node = &function.nodes[&id];
                let is_make = node.node_type.name == make_name;
                let struct_ty =
                    if is_make { node.node_type.data_outputs[0].ty.clone() } else { node.node_type.data_inputs[0].ty.clone() };
                let new_type = if is_make { s.make_node_type(struct_ty) } else { s.break_node_type(struct_ty) };
                function.nodes.get_mut(&id).unwrap().node_type = new_type;
            }
        }
    }

    /// Rename a field on `struct_name` and regenerate every existing
    /// `_make_`/`_break_` instance of it across this module's functions.
    /// Returns `false` if the struct or field doesn't exist.
    pub fn rename_struct_field(&mut self, struct_name: &str, old_field: &str, new_field: impl Into<String>) -> bool {
        let Some(s) = self.struct_named_mut(struct_name) else { return false };
        if !s.rename_field(old_field, new_field) {
            return false;
        }
        self.propagate_struct_change(struct_name);
        true
    }

    /// Remove a field on `struct_name` and regenerate every existing
    /// `_make_`/`_break_` instance of it across this module's functions.
    /// Returns `false` if the struct or field doesn't exist.
    pub fn remove_struct_field(&mut self, struct_name: &str, field_name: &str) -> bool {
        let Some(s) = self.struct_named_mut(struct_name) else { return false };
        if !s.remove_field(field_name) {
            return false;
        }
        self.propagate_struct_change(struct_name);
        true
    }
}

/// A module wrapping a bitcode blob produced from C/C++ source. The core
/// treats it purely as "a module exposing a list of function-call node
/// types"; the front end that produces the bitcode (and the `clang`
/// subprocess invocation) is an external collaborator, not implemented here
/// (`spec.md` §1 Non-goals boundary, carried explicitly rather than dropped).
#[derive(Clone)]
pub struct CModule<B: Backend> {
    pub path: String,
    pub bitcode: Vec<u8>,
    pub exported_functions: Vec<NodeType<B>>,
}

impl<B: Backend> CModule<B> {
    pub fn new(path: impl Into<String>, bitcode: Vec<u8>) -> Self {
        Self { path: path.into(), bitcode, exported_functions: Vec::new() }
    }
}

/// The three concrete module variants (`spec.md` §3).
pub enum Module<B: Backend> {
    Lang(Arc<LangModule<B>>),
    Graph(GraphModule<B>),
    C(CModule<B>),
}

impl<B: Backend> Module<B> {
    pub fn path(&self) -> &str {
        match self {
            Module::Lang(_) => LangModule::<B>::PATH,
            Module::Graph(m) => &m.path,
            Module::C(m) => &m.path,
        }
    }

    pub fn dependencies(&self) -> &[String] {
        match self {
            Module::Graph(m) => &m.dependencies,
            _ => &[],
        }
    }
}
