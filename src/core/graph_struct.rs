//! # Graph struct (part of C5, Graph IR)
//!
//! `spec.md` §3: a named record with an ordered list of `(field_name,
//! DataType)` pairs. Each struct auto-generates `_make_<name>` /
//! `_break_<name>` node types in its module; renaming, retyping, or
//! removing a field regenerates both.

use crate::backend::Backend;
use crate::core::node_type::{BreakStructBehavior, MakeStructBehavior, NodeType};
use crate::core::types::{DataType, NamedDataType};
use std::sync::Arc;

#[derive(Clone)]
pub struct GraphStruct<B: Backend> {
    pub module_path: String,
    pub name: String,
    pub fields: Vec<NamedDataType<B>>,
    /// The struct's own backend-materialized `DataType`, filled in once a
    /// loader has built the aggregate backend type (`spec.md` §3: used as
    /// the value type of `_make_`/`_break_` and wherever this struct is
    /// referenced as a field/port type). `None` until then.
    pub resolved_type: Option<DataType<B>>,
}

impl<B: Backend> GraphStruct<B> {
    pub fn new(module_path: impl Into<String>, name: impl Into<String>) -> Self {
        Self { module_path: module_path.into(), name: name.into(), fields: Vec::new(), resolved_type: None }
    }

    pub fn with_field(mut self, name: impl Into<String>, ty: DataType<B>) -> Self {
        self.fields.push(NamedDataType::new(name, ty));
        self
    }

    /// The struct's own `DataType`, used as the value type of
    /// `make`'s output / `break`'s input. `backend_type`/`debug_type` are
    /// supplied by the caller (the module compiler owns the backend handle
    /// construction; this type alone cannot synthesize backend types).
    pub fn data_type(&self, backend_type: B::Type, debug_type: B::DebugMeta) -> DataType<B> {
        DataType::new(self.module_path.clone(), self.name.clone(), backend_type, debug_type)
    }

    /// Builds and caches this struct's own `DataType` from its fields'
    /// already-resolved backend types, via [`crate::backend::Backend::type_struct`].
    /// Idempotent: a second call just returns the cached value.
    pub fn resolve_type(&mut self, backend_ctx: &B::Context, module: &mut B::Module) -> DataType<B> {
        if let Some(ty) = &self.resolved_type {
            return ty.clone();
        }
        let field_types: Vec<B::Type> = self.fields.iter().map(|f| f.ty.backend_type.clone()).collect();
        let backend_type = B::type_struct(backend_ctx, &field_types);
        let debug_type = B::create_debug_file(module, &self.name, &self.module_path);
        let ty = self.data_type(backend_type, debug_type);
        self.resolved_type = Some(ty.clone());
        ty
    }

    /// `_make_<name>`: inputs are one per field, in field order; output is
    /// the struct value.
    pub fn make_node_type(&self, struct_ty: DataType<B>) -> NodeType<B> {
        NodeType {
            module_path: self.module_path.clone(),
            name: format!("_make_{}", self.name),
            data_inputs: self.fields.clone(),
            data_outputs: vec![NamedDataType::new("struct", struct_ty)],
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({}),
            behavior: Arc::new(MakeStructBehavior { field_count: self.fields.len() }),
        }
    }

    /// `_break_<name>`: inverse of `make_node_type`.
    pub fn break_node_type(&self, struct_ty: DataType<B>) -> NodeType<B> {
        NodeType {
            module_path: self.module_path.clone(),
            name: format!("_break_{}", self.name),
            data_inputs: vec![NamedDataType::new("struct", struct_ty)],
            data_outputs: self.fields.clone(),
            exec_inputs: vec![],
            exec_outputs: vec![],
            pure: true,
            data: serde_json::json!({}),
            behavior: Arc::new(BreakStructBehavior { field_count: self.fields.len() }),
        }
    }

    /// Rename a field on this struct alone. Does **not** touch any
    /// `NodeInstance` of `_make_<name>`/`_break_<name>` already placed in a
    /// `GraphFunction` — a `NodeInstance` owns its `NodeType` independently
    /// (`spec.md` §3), so renaming a field here would otherwise leave every
    /// existing instance's `node_type` stale. Callers that need the full
    /// `spec.md` §3 propagation ("renaming/retyping/removing a struct
    /// propagates to these synthesized node types and to every
    /// `NodeInstance` of them") must go through
    /// [`crate::core::module::GraphModule::rename_struct_field`], which
    /// calls this and then regenerates every affected instance across the
    /// owning module's functions — the exact parallel of
    /// `GraphFunction::rename_local`'s `_get_`/`_set_` regeneration.
    pub fn rename_field(&mut self, old_name: &str, new_name: impl Into<String>) -> bool {
        if let Some(f) = self.fields.iter_mut().find(|f| f.name == old_name) {
            f.name = new_name.into();
            true
        } else {
            false
        }
    }

    /// Remove a field on this struct alone. Same caveat as [`Self::rename_field`]:
    /// use [`crate::core::module::GraphModule::remove_struct_field`] to also
    /// regenerate existing `_make_`/`_break_` instances.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        self.fields.len() != before
    }
}

impl<B: Backend> std::fmt::Debug for GraphStruct<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphStruct")
            .field("module_path", &self.module_path)
            .field("name", &self.name)
            .field("fields", &self.fields.iter().map(|f| &f.name).collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::interpreter::{DebugMeta, Interpreter, Type};

    fn i32_type() -> DataType<Interpreter> {
        DataType::new("lang", "i32", Type::I32, DebugMeta("i32".into()))
    }

    #[test]
    fn make_and_break_mirror_field_order() {
        let s = GraphStruct::new("test/main", "Point").with_field("x", i32_type()).with_field("y", i32_type());
        let struct_ty = s.data_type(Type::Struct(vec![Type::I32, Type::I32]), DebugMeta("Point".into()));

        let make = s.make_node_type(struct_ty.clone());
        assert_eq!(make.data_inputs.len(), 2);
        assert_eq!(make.data_outputs.len(), 1);
        assert!(make.is_pure());

        let brk = s.break_node_type(struct_ty);
        assert_eq!(brk.data_inputs.len(), 1);
        assert_eq!(brk.data_outputs.len(), 2);
        assert_eq!(brk.data_outputs[0].name, "x");
        assert_eq!(brk.data_outputs[1].name, "y");
    }

    #[test]
    fn rename_field_propagates_to_existing_node_instances() {
        use crate::core::graph_function::GraphFunction;
        use crate::core::module::GraphModule;
        use crate::core::node_instance::NodeInstance;
        use crate::core::types::Position;

        let s = GraphStruct::new("test/main", "Point").with_field("x", i32_type());
        let struct_ty = s.data_type(Type::Struct(vec![Type::I32]), DebugMeta("Point".into()));

        let mut module = GraphModule::new("test/main");
        module.structs.push(s);

        let mut f: GraphFunction<Interpreter> = GraphFunction::new("test/main", "main");
        let make_ty = module.struct_named("Point").unwrap().make_node_type(struct_ty);
        let node = NodeInstance::new(make_ty, Position::zero());
        let node_id = node.id;
        f.add_node(node);
        module.functions.push(f);

        assert!(module.rename_struct_field("Point", "x", "x_coord"));

        let updated = &module.functions[0].nodes[&node_id].node_type;
        assert_eq!(updated.name, "_make_Point");
        assert_eq!(updated.data_inputs[0].name, "x_coord");
    }

    #[test]
    fn remove_field_shrinks_make_break() {
        let mut s = GraphStruct::new("test/main", "Point").with_field("x", i32_type()).with_field("y", i32_type());
        assert!(s.remove_field("x"));
        assert_eq!(s.fields.len(), 1);
    }

    #[test]
    fn resolve_type_is_idempotent_and_caches() {
        use crate::backend::Backend;
        let mut s = GraphStruct::new("test/main", "Point").with_field("x", i32_type()).with_field("y", i32_type());
        let mut backend_ctx = Interpreter::create_context();
        let mut module = Interpreter::create_module(&mut backend_ctx, "test");
        let first = s.resolve_type(&backend_ctx, &mut module);
        let second = s.resolve_type(&backend_ctx, &mut module);
        assert_eq!(first, second);
        assert!(matches!(first.backend_type, Type::Struct(ref fields) if fields.len() == 2));
    }
}
