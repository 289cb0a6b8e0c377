//! # Node-type registry and codegen contract (C4)
//!
//! A [`NodeType`] is the "polymorphic value" of `spec.md` §3: a qualified
//! name, port lists, a `pure` flag, and a single codegen capability. The
//! deep virtual-inheritance hierarchy of the original (`chi::NodeType` and
//! its many C++ subclasses in `examples/original_source/lib/core/include/chi/NodeType.hpp`)
//! is replaced per spec.md §9 with a sum-type-like design: `NodeType` owns
//! a `Arc<dyn NodeBehavior<B>>` trait object, and the built-in behaviors
//! below are its only implementors needed by this core.

use crate::backend::Backend;
use crate::core::types::{DataType, NamedDataType};
use crate::diagnostics::Diagnostics;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Everything a [`NodeBehavior`] needs to emit one node's code, per the
/// `codegen(exec_input_id, source_location, io_values, entry_block,
/// exit_blocks)` contract of `spec.md` §4.2.
///
/// Two additions beyond the distilled signature, both needed to actually
/// implement the built-in behaviors and noted in `DESIGN.md`:
/// - `io_types`, the pointee type of each `io_values` cell (the minimal
///   contract doesn't say how a behavior learns a cell's type; the node
///   compiler already knows it from the port's `DataType`, so it threads it
///   through here).
/// - `locals`, the function-local variables' storage addresses, needed by
///   `_get_<var>`/`_set_<var>`.
pub struct CodegenContext<'a, B: Backend> {
    pub module: &'a mut B::Module,
    pub function: B::Function,
    pub exec_input_id: usize,
    pub loc: Option<B::DebugMeta>,
    /// Inputs first, then outputs — pointers to this node's storage cells.
    pub io_values: &'a [B::Value],
    pub io_types: &'a [B::Type],
    pub entry_block: B::BasicBlock,
    pub exit_blocks: &'a [B::BasicBlock],
    pub locals: &'a HashMap<String, (B::Value, B::Type)>,
    /// `dataInputs(F).len()`, the offset of the first "out dataOutputs"
    /// parameter in the backend function signature (`spec.md` §4.5 point 1).
    /// Used only by `exit`.
    pub function_data_input_count: usize,
    /// `dataInputs(F).len() + dataOutputs(F).len()`, the offset of the
    /// runtime "in exec selector" parameter. `entry`'s own `io_values`
    /// only spans the function's data *inputs* (its own data outputs), so
    /// it cannot derive this offset from `io_values.len()` alone once the
    /// function also declares data outputs — used only by `entry`.
    pub selector_param_index: usize,
    /// The backend's `i32` type handle, used by `exit` to build the
    /// exec-output selector return value regardless of how many (if any)
    /// data outputs the function declares.
    pub selector_type: B::Type,
}

/// The codegen capability every node type carries (`spec.md` §4.2).
pub trait NodeBehavior<B: Backend>: fmt::Debug + Send + Sync {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics;
}

/// A node type: qualifying module, unqualified name, port lists, purity,
/// and a codegen capability (`spec.md` §3).
///
/// Comparable by qualified name plus JSON payload, matching the original's
/// `NodeType::operator==` (which never compares codegen function pointers).
#[derive(Clone)]
pub struct NodeType<B: Backend> {
    pub module_path: String,
    pub name: String,
    pub data_inputs: Vec<NamedDataType<B>>,
    pub data_outputs: Vec<NamedDataType<B>>,
    pub exec_inputs: Vec<String>,
    pub exec_outputs: Vec<String>,
    pub pure: bool,
    /// Node-type-defined JSON payload (`spec.md` §6 `data` field), e.g. the
    /// literal value for a `const-int` node.
    pub data: Json,
    pub behavior: Arc<dyn NodeBehavior<B>>,
}

impl<B: Backend> fmt::Debug for NodeType<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType")
            .field("qualified_name", &self.qualified_name())
            .field("pure", &self.pure)
            .finish()
    }
}

impl<B: Backend> PartialEq for NodeType<B> {
    fn eq(&self, other: &Self) -> bool {
        self.module_path == other.module_path && self.name == other.name && self.data == other.data
    }
}
impl<B: Backend> Eq for NodeType<B> {}

impl<B: Backend> NodeType<B> {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.module_path, self.name)
    }

    /// Pure iff it has zero exec inputs and zero exec outputs (`spec.md` §3).
    pub fn is_pure(&self) -> bool {
        self.exec_inputs.is_empty() && self.exec_outputs.is_empty()
    }
}

/// `entry` — no computation; its data outputs are the function's argument
/// values, and it dispatches to the exec-output matching the function's
/// runtime "exec selector" parameter (`spec.md` §4.2, §4.5 point 1).
///
/// Open question resolved here (see `DESIGN.md`): the distilled spec's
/// `codegen` signature doesn't say how entry learns *which* of its several
/// exec-outputs to take when a function has more than one exec input — it
/// can't come from `exec_input_id`, which is always `0` for entry (spec.md
/// §4.4). The backend function signature already carries a runtime "in exec
/// selector" parameter (§4.5 point 1) for exactly this purpose, so entry
/// reads it as the parameter immediately following its data outputs and
/// switches on it.
#[derive(Debug, Default)]
pub struct EntryBehavior;

impl<B: Backend> NodeBehavior<B> for EntryBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let diag = Diagnostics::new();
        for (i, cell) in ctx.io_values.iter().enumerate() {
            let param = B::function_param(ctx.module, ctx.function, i);
            B::build_store(ctx.module, ctx.entry_block, *cell, param);
        }

        match ctx.exit_blocks {
            // Boundary case (`spec.md` §8): a function whose entry has no
            // outgoing exec edges compiles to a function that immediately
            // returns 0, not a codegen error.
            [] => {
                let zero = B::build_const_int(ctx.module, ctx.selector_type.clone(), 0);
                B::build_ret(ctx.module, ctx.entry_block, zero);
            }
            [only] => B::build_br(ctx.module, ctx.entry_block, *only),
            many => {
                let selector = B::function_param(ctx.module, ctx.function, ctx.selector_param_index);
                let cases: Vec<(i64, B::BasicBlock)> = many.iter().enumerate().skip(1).map(|(i, b)| (i as i64, *b)).collect();
                B::build_switch(ctx.module, ctx.entry_block, selector, many[0], &cases);
            }
        }
        diag
    }
}

/// `exit` — writes its inputs into the function's out-parameters and
/// returns the exec-output selector index (`spec.md` §4.2).
#[derive(Debug, Default)]
pub struct ExitBehavior;

impl<B: Backend> NodeBehavior<B> for ExitBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let diag = Diagnostics::new();
        for (i, (cell, ty)) in ctx.io_values.iter().zip(ctx.io_types.iter()).enumerate() {
            let value = B::build_load(ctx.module, ctx.entry_block, *cell, ty.clone());
            let out_param = B::function_param(ctx.module, ctx.function, ctx.function_data_input_count + i);
            B::build_store(ctx.module, ctx.entry_block, out_param, value);
        }
        let selector = B::build_const_int(ctx.module, ctx.selector_type.clone(), ctx.exec_input_id as i64);
        B::build_ret(ctx.module, ctx.entry_block, selector);
        diag
    }
}

/// `if` — conditional branch on `io[0]` (`spec.md` §4.2).
#[derive(Debug, Default)]
pub struct IfBehavior;

impl<B: Backend> NodeBehavior<B> for IfBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let (Some(cond_cell), Some(cond_ty)) = (ctx.io_values.first(), ctx.io_types.first()) else {
            diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "`if` node requires one data input");
            return diag;
        };
        let cond = B::build_load(ctx.module, ctx.entry_block, *cond_cell, cond_ty.clone());
        match ctx.exit_blocks {
            [then_block, else_block] => B::build_cond_br(ctx.module, ctx.entry_block, cond, *then_block, *else_block),
            _ => diag.add(crate::codes::codegen::E43_WRONG_EXIT_BLOCK_COUNT, "`if` node requires exactly two exec outputs"),
        }
        diag
    }
}

/// `const-int` — pure; writes a constant integer into its single output.
#[derive(Debug)]
pub struct ConstIntBehavior {
    pub value: i64,
}

impl<B: Backend> NodeBehavior<B> for ConstIntBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        store_pure_output(ctx, |m, b, ty| B::build_const_int(m, ty, self.value))
    }
}

/// `const-bool` — pure; writes `0`/`1` into its single output.
#[derive(Debug)]
pub struct ConstBoolBehavior {
    pub value: bool,
}

impl<B: Backend> NodeBehavior<B> for ConstBoolBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let v = self.value;
        store_pure_output(ctx, move |m, b, ty| B::build_const_int(m, ty, v as i64))
    }
}

/// `const-float` — pure; writes a constant float into its single output.
#[derive(Debug)]
pub struct ConstFloatBehavior {
    pub value: f64,
}

impl<B: Backend> NodeBehavior<B> for ConstFloatBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let v = self.value;
        store_pure_output(ctx, move |m, b, ty| B::build_const_float(m, ty, v))
    }
}

/// `strliteral` — pure. The reference backend has no string/array type, so
/// this stores the literal's byte length as a placeholder integer; a real
/// backend would instead emit a global string constant and store its
/// address. Documented simplification, see `DESIGN.md`.
#[derive(Debug)]
pub struct StrLiteralBehavior {
    pub value: String,
}

impl<B: Backend> NodeBehavior<B> for StrLiteralBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let len = self.value.len() as i64;
        store_pure_output(ctx, move |m, b, ty| B::build_const_int(m, ty, len))
    }
}

fn store_pure_output<B: Backend>(
    ctx: &mut CodegenContext<'_, B>,
    make_value: impl FnOnce(&mut B::Module, B::BasicBlock, B::Type) -> B::Value,
) -> Diagnostics {
    let mut diag = Diagnostics::new();
    let (Some(out_cell), Some(out_ty)) = (ctx.io_values.first(), ctx.io_types.first()) else {
        diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "pure constant node requires one data output");
        return diag;
    };
    let value = make_value(ctx.module, ctx.entry_block, out_ty.clone());
    B::build_store(ctx.module, ctx.entry_block, *out_cell, value);
    diag
}

/// `_get_<var>` — pure; loads from the function-local allocation.
#[derive(Debug)]
pub struct LocalGetBehavior {
    pub var: String,
}

impl<B: Backend> NodeBehavior<B> for LocalGetBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let Some((addr, ty)) = ctx.locals.get(&self.var).cloned() else {
            diag.add(crate::codes::lookup::E14_UNKNOWN_LOCAL_VARIABLE, format!("unknown local variable `{}`", self.var));
            return diag;
        };
        let Some(out_cell) = ctx.io_values.first() else {
            diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "`_get_` node requires one data output");
            return diag;
        };
        let value = B::build_load(ctx.module, ctx.entry_block, addr, ty);
        B::build_store(ctx.module, ctx.entry_block, *out_cell, value);
        diag
    }
}

/// `_set_<var>` — non-pure; stores to the function-local allocation and
/// falls through its single exec output.
#[derive(Debug)]
pub struct LocalSetBehavior {
    pub var: String,
}

impl<B: Backend> NodeBehavior<B> for LocalSetBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        let Some((addr, ty)) = ctx.locals.get(&self.var).cloned() else {
            diag.add(crate::codes::lookup::E14_UNKNOWN_LOCAL_VARIABLE, format!("unknown local variable `{}`", self.var));
            return diag;
        };
        let (Some(in_cell), Some(in_ty)) = (ctx.io_values.first(), ctx.io_types.first()) else {
            diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "`_set_` node requires one data input");
            return diag;
        };
        let value = B::build_load(ctx.module, ctx.entry_block, *in_cell, in_ty.clone());
        B::build_store(ctx.module, ctx.entry_block, addr, value);
        match ctx.exit_blocks.first() {
            Some(target) => B::build_br(ctx.module, ctx.entry_block, *target),
            None => diag.add(crate::codes::codegen::E43_WRONG_EXIT_BLOCK_COUNT, "`_set_` node requires exactly one exec output"),
        }
        diag
    }
}

/// `_make_<struct>` — pure; assembles a struct value from its field inputs
/// via repeated `insertvalue` (`spec.md` §3, struct auto-generated node types).
#[derive(Debug)]
pub struct MakeStructBehavior {
    pub field_count: usize,
}

impl<B: Backend> NodeBehavior<B> for MakeStructBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        if ctx.io_values.len() != self.field_count + 1 {
            diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "`_make_` node has the wrong number of io cells");
            return diag;
        }
        let struct_ty = ctx.io_types[self.field_count].clone();
        let mut agg = B::build_undef(ctx.module, ctx.entry_block, struct_ty);
        for i in 0..self.field_count {
            let field = B::build_load(ctx.module, ctx.entry_block, ctx.io_values[i], ctx.io_types[i].clone());
            agg = B::build_insert_value(ctx.module, ctx.entry_block, agg, i, field);
        }
        B::build_store(ctx.module, ctx.entry_block, ctx.io_values[self.field_count], agg);
        diag
    }
}

/// `_break_<struct>` — pure; the inverse of `MakeStructBehavior`.
#[derive(Debug)]
pub struct BreakStructBehavior {
    pub field_count: usize,
}

impl<B: Backend> NodeBehavior<B> for BreakStructBehavior {
    fn codegen(&self, ctx: &mut CodegenContext<'_, B>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        if ctx.io_values.len() != self.field_count + 1 {
            diag.add(crate::codes::codegen::E42_WRONG_IO_COUNT, "`_break_` node has the wrong number of io cells");
            return diag;
        }
        let agg = B::build_load(ctx.module, ctx.entry_block, ctx.io_values[0], ctx.io_types[0].clone());
        for i in 0..self.field_count {
            let field = B::build_extract_value(ctx.module, ctx.entry_block, agg, i);
            B::build_store(ctx.module, ctx.entry_block, ctx.io_values[1 + i], field);
        }
        diag
    }
}
