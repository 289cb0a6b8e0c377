//! # Context (part of C5, Graph IR)
//!
//! `spec.md` §3: process-wide registry owning a set of modules keyed by
//! full path, plus a single backend context handle. Per `spec.md` §9
//! ("Global mutable state... re-architect by passing the Context... to
//! every operation that needs it"), there is no module-level singleton:
//! every operation that needs a `Context` receives `&Context`/`&mut Context`
//! explicitly.

use crate::backend::Backend;
use crate::core::module::{GraphModule, LangModule, Module};
use crate::core::node_type::NodeType;
use crate::core::types::DataType;
use crate::error::{GraphyError, Result};
use std::collections::HashMap;
use std::sync::Arc;

pub struct Context<B: Backend> {
    backend_context: B::Context,
    lang: Arc<LangModule<B>>,
    modules: HashMap<String, Module<B>>,
    /// Every struct type materialized so far, keyed by `"mod:name"`, so a
    /// dependent module can resolve a field/port referencing a struct
    /// defined elsewhere without recompiling it (`spec.md` §3 struct
    /// auto-generated node types; see `DESIGN.md` "cross-module struct
    /// resolution").
    struct_types: HashMap<String, DataType<B>>,
    /// `_make_<name>`/`_break_<name>` node types, keyed by `"mod:name"`.
    struct_node_types: HashMap<String, NodeType<B>>,
}

impl<B: Backend> Context<B> {
    /// Creates a context and its `LangModule` (built against a scratch
    /// backend module used only to mint primitive-type debug metadata).
    pub fn new() -> Self {
        let mut backend_context = B::create_context();
        let mut scratch = B::create_module(&mut backend_context, LangModule::<B>::PATH);
        let lang = Arc::new(LangModule::new(&backend_context, &mut scratch));
        Self { backend_context, lang, modules: HashMap::new(), struct_types: HashMap::new(), struct_node_types: HashMap::new() }
    }

    pub fn backend_context(&self) -> &B::Context {
        &self.backend_context
    }

    pub fn backend_context_mut(&mut self) -> &mut B::Context {
        &mut self.backend_context
    }

    pub fn lang(&self) -> &Arc<LangModule<B>> {
        &self.lang
    }

    /// Insert a constructed module. Errors if the path is already owned by
    /// this context ("a module's full path is unique within its Context",
    /// `spec.md` §3).
    pub fn add_module(&mut self, module: Module<B>) -> Result<()> {
        let path = module.path().to_string();
        if self.modules.contains_key(&path) {
            return Err(GraphyError::DuplicateModule(path));
        }
        self.modules.insert(path, module);
        Ok(())
    }

    pub fn module(&self, path: &str) -> Option<&Module<B>> {
        self.modules.get(path)
    }

    pub fn module_mut(&mut self, path: &str) -> Option<&mut Module<B>> {
        self.modules.get_mut(path)
    }

    pub fn graph_module(&self, path: &str) -> Result<&GraphModule<B>> {
        match self.modules.get(path) {
            Some(Module::Graph(m)) => Ok(m),
            Some(_) => Err(GraphyError::Custom(format!("module `{path}` is not a graph module"))),
            None => Err(GraphyError::ModuleNotFound(path.to_string())),
        }
    }

    pub fn graph_module_mut(&mut self, path: &str) -> Result<&mut GraphModule<B>> {
        match self.modules.get_mut(path) {
            Some(Module::Graph(m)) => Ok(m),
            Some(_) => Err(GraphyError::Custom(format!("module `{path}` is not a graph module"))),
            None => Err(GraphyError::ModuleNotFound(path.to_string())),
        }
    }

    /// Register a struct's materialized `DataType` plus its synthesized
    /// `_make_`/`_break_` node types, so later modules loaded into this
    /// `Context` can reference them as field/port types without rebuilding
    /// the backend aggregate type (`spec.md` §3).
    pub fn register_struct(&mut self, struct_type: DataType<B>, make: NodeType<B>, brk: NodeType<B>) {
        self.struct_types.insert(struct_type.qualified_name(), struct_type);
        self.struct_node_types.insert(make.qualified_name(), make);
        self.struct_node_types.insert(brk.qualified_name(), brk);
    }

    pub fn struct_type(&self, qualified_name: &str) -> Option<&DataType<B>> {
        self.struct_types.get(qualified_name)
    }

    pub fn struct_node_type(&self, qualified_name: &str) -> Option<&NodeType<B>> {
        self.struct_node_types.get(qualified_name)
    }

    pub fn struct_types(&self) -> impl Iterator<Item = &DataType<B>> {
        self.struct_types.values()
    }

    /// Enumerate module paths without loading them, supplementing the
    /// original's `chi list` support (`chi/main.cpp`); real discovery from a
    /// workspace's `src/` tree is `crate::workspace::Workspace::discover_modules`.
    pub fn loaded_module_paths(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }
}

impl<B: Backend> Default for Context<B> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::interpreter::Interpreter;

    #[test]
    fn lang_module_exposes_primitives() {
        let ctx: Context<Interpreter> = Context::new();
        assert!(ctx.lang().type_named("i32").is_some());
        assert!(ctx.lang().type_named("i32*").is_some());
    }

    #[test]
    fn add_module_rejects_duplicate_path() {
        let mut ctx: Context<Interpreter> = Context::new();
        ctx.add_module(Module::Graph(GraphModule::new("test/main"))).unwrap();
        let err = ctx.add_module(Module::Graph(GraphModule::new("test/main"))).unwrap_err();
        assert!(matches!(err, GraphyError::DuplicateModule(_)));
    }

    #[test]
    fn unknown_module_lookup_errors() {
        let ctx: Context<Interpreter> = Context::new();
        assert!(matches!(ctx.graph_module("nope"), Err(GraphyError::ModuleNotFound(_))));
    }
}
