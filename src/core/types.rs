//! # Type model (C3)
//!
//! `DataType` is a reference to the owning module plus an unqualified name
//! and the backend's opaque type/debug-type handles, per `spec.md` §3/§4.1.
//! It is a *value* — cheap to clone, comparable by `(module path,
//! unqualified name)` alone (matching `chi::DataType`'s `operator==` in
//! `examples/original_source/lib/core/include/chi/DataType.hpp`, which
//! compares module identity and name, not the backend handles).

use std::fmt;

/// A type, scoped to the module that defines it.
///
/// `backend_type`/`debug_type` are opaque handles into whatever backend
/// compiled this type (see [`crate::backend::Backend`]); the core never
/// interprets them, only threads them through to codegen calls.
#[derive(Debug, Clone)]
pub struct DataType<B: crate::backend::Backend> {
    /// Full path of the module that owns this type, e.g. `"lang"` or
    /// `"github.com/user/proj/util"`.
    pub module_path: String,
    /// Name of the type within that module, e.g. `"i32"`.
    pub name: String,
    /// The backend's representation of this type.
    pub backend_type: B::Type,
    /// The backend's debug-info representation of this type.
    pub debug_type: B::DebugMeta,
    /// Whether the type is reference/refcounted-semantics rather than a
    /// plain value. Carried from the original's `DataType::reference` for
    /// documentation and debug-info purposes; this core does not implement
    /// garbage collection or refcounting.
    pub reference: bool,
}

impl<B: crate::backend::Backend> DataType<B> {
    pub fn new(
        module_path: impl Into<String>,
        name: impl Into<String>,
        backend_type: B::Type,
        debug_type: B::DebugMeta,
    ) -> Self {
        Self {
            module_path: module_path.into(),
            name: name.into(),
            backend_type,
            debug_type,
            reference: false,
        }
    }

    pub fn with_reference(mut self, reference: bool) -> Self {
        self.reference = reference;
        self
    }

    /// `module_path:name`, used in the JSON schema (`spec.md` §6).
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module_path, self.name)
    }
}

impl<B: crate::backend::Backend> PartialEq for DataType<B> {
    fn eq(&self, other: &Self) -> bool {
        self.module_path == other.module_path && self.name == other.name
    }
}
impl<B: crate::backend::Backend> Eq for DataType<B> {}

impl<B: crate::backend::Backend> fmt::Display for DataType<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

/// A `(name, DataType)` pair, used for node-type ports, struct fields, and
/// function signatures. Mirrors `chi::NamedDataType` in
/// `examples/original_source/lib/core/include/chi/DataType.hpp`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedDataType<B: crate::backend::Backend> {
    pub name: String,
    pub ty: DataType<B>,
}

impl<B: crate::backend::Backend> NamedDataType<B> {
    pub fn new(name: impl Into<String>, ty: DataType<B>) -> Self {
        Self { name: name.into(), ty }
    }
}

/// 2-D position in the visual editor, carried through purely for fidelity
/// with the graph JSON schema; has no effect on compilation.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::zero()
    }
}
