//! # Backend facade (C11)
//!
//! The narrow interface the core needs from an LLVM-like code-generation
//! library, per `spec.md` §6. The real backend (IR builder, bitcode writer,
//! JIT engine) is an external collaborator and out of scope for this crate;
//! any implementation of [`Backend`] can be substituted without touching
//! `core`, `analysis`, or `codegen`.
//!
//! Following the original chigraph C API (`examples/original_source/lib/core`),
//! a single opaque metadata handle type (`DebugMeta`) stands in for every
//! debug-info object — compile unit, file, subroutine type, and line
//! location are all `LLVMMetadataRef` in the original; we keep that economy
//! here rather than inventing four distinct handle types the core never
//! needs to tell apart.
//!
//! [`interpreter::Interpreter`] is the one concrete implementation shipped
//! with this crate: a tree-of-basic-blocks interpreter used by the test
//! suite (`spec.md` §8 end-to-end scenarios) so the core is testable
//! without a dependency on `llvm-sys`, which is not part of this crate's
//! dependency stack.

pub mod interpreter;

/// The operations the core requires of a code-generation backend.
///
/// All methods are free functions taking `&mut Self::Module` rather than
/// methods on builder objects, matching the C-style `LLVMBuildXXX(builder,
/// ...)` shape of the operations listed in `spec.md` §6.
pub trait Backend {
    /// Process-wide backend context (one per [`crate::core::Context`]).
    type Context;
    /// A single compiled module (one per [`crate::core::Module`]).
    type Module;
    /// Handle to a function within a module.
    type Function: Copy + Eq + std::hash::Hash + std::fmt::Debug;
    /// Handle to a basic block within a function.
    type BasicBlock: Copy + Eq + std::hash::Hash + std::fmt::Debug;
    /// Handle to an SSA value.
    type Value: Copy + Eq + std::fmt::Debug;
    /// Handle to a backend type.
    type Type: Clone + std::fmt::Debug;
    /// Handle to any debug-info metadata object (compile unit, file,
    /// subroutine type, per-type debug type, or line location).
    type DebugMeta: Clone + std::fmt::Debug;

    fn create_context() -> Self::Context;

    fn create_module(ctx: &mut Self::Context, name: &str) -> Self::Module;

    // -- Primitive type constructors. Not in the distilled operation list of
    // `spec.md` §6 (which enumerates IR-building ops, not type
    // construction), but required to build `LangModule`'s primitives — a
    // real LLVM backend needs the equivalent of `LLVMInt32TypeInContext`.
    fn type_i1(ctx: &Self::Context) -> Self::Type;
    fn type_i8(ctx: &Self::Context) -> Self::Type;
    fn type_i32(ctx: &Self::Context) -> Self::Type;
    fn type_i64(ctx: &Self::Context) -> Self::Type;
    fn type_float(ctx: &Self::Context) -> Self::Type;
    fn type_double(ctx: &Self::Context) -> Self::Type;
    fn type_pointer(inner: Self::Type) -> Self::Type;
    /// An aggregate type over `fields`, in order. Needed to materialize a
    /// [`crate::core::GraphStruct`]'s own `DataType` (`spec.md` §3); not in
    /// the distilled operation list but implied by `build_undef`/
    /// `build_extract_value`/`build_insert_value`, which otherwise have
    /// nothing to name as their aggregate's type.
    fn type_struct(ctx: &Self::Context, fields: &[Self::Type]) -> Self::Type;

    /// Create a function with the given parameter types and return type.
    fn create_function(
        module: &mut Self::Module,
        name: &str,
        param_types: &[Self::Type],
        return_type: Self::Type,
    ) -> Self::Function;

    /// Look up a function previously declared/defined in `module` by name.
    fn get_function(module: &Self::Module, name: &str) -> Option<Self::Function>;

    /// Append a new basic block to `function`.
    fn append_basic_block(module: &mut Self::Module, function: Self::Function, name: &str) -> Self::BasicBlock;

    /// The value of the `index`-th parameter of `function`.
    fn function_param(module: &Self::Module, function: Self::Function, index: usize) -> Self::Value;

    fn build_alloca(module: &mut Self::Module, block: Self::BasicBlock, ty: Self::Type, name: &str) -> Self::Value;
    fn build_load(module: &mut Self::Module, block: Self::BasicBlock, ptr: Self::Value, ty: Self::Type) -> Self::Value;
    fn build_store(module: &mut Self::Module, block: Self::BasicBlock, ptr: Self::Value, value: Self::Value);
    fn build_br(module: &mut Self::Module, block: Self::BasicBlock, target: Self::BasicBlock);
    fn build_cond_br(
        module: &mut Self::Module,
        block: Self::BasicBlock,
        cond: Self::Value,
        then_block: Self::BasicBlock,
        else_block: Self::BasicBlock,
    );
    /// `cases` is `(case_value, target_block)`; unmatched values go to `default`.
    fn build_switch(
        module: &mut Self::Module,
        block: Self::BasicBlock,
        value: Self::Value,
        default: Self::BasicBlock,
        cases: &[(i64, Self::BasicBlock)],
    );
    fn build_call(module: &mut Self::Module, block: Self::BasicBlock, function: Self::Function, args: &[Self::Value]) -> Self::Value;
    /// Indirect branch to an address produced by [`Backend::block_address`],
    /// restricted to `possible_destinations` (the backend's verifier may use
    /// this list; the interpreter uses it directly to resolve the jump).
    fn build_indirect_br(
        module: &mut Self::Module,
        block: Self::BasicBlock,
        address: Self::Value,
        possible_destinations: &[Self::BasicBlock],
    );
    fn build_ret(module: &mut Self::Module, block: Self::BasicBlock, value: Self::Value);
    fn build_const_int(module: &mut Self::Module, ty: Self::Type, value: i64) -> Self::Value;
    fn build_const_float(module: &mut Self::Module, ty: Self::Type, value: f64) -> Self::Value;
    fn build_phi(
        module: &mut Self::Module,
        block: Self::BasicBlock,
        ty: Self::Type,
        incoming: &[(Self::Value, Self::BasicBlock)],
    ) -> Self::Value;
    /// The address of `block`, suitable as the operand of
    /// [`Backend::build_indirect_br`] (`jumpBackInst` in `spec.md` §4.4).
    fn block_address(module: &mut Self::Module, function: Self::Function, block: Self::BasicBlock) -> Self::Value;

    /// An undefined value of an aggregate (or scalar) type, the conventional
    /// LLVM starting point for building a struct value via repeated
    /// `insertvalue`. Needed for `GraphStruct` make/break codegen (`spec.md`
    /// §3); not in the distilled operation list but implied by it — a real
    /// LLVM backend has no other way to materialize an aggregate value.
    fn build_undef(module: &mut Self::Module, block: Self::BasicBlock, ty: Self::Type) -> Self::Value;
    /// LLVM `extractvalue`: read field `field_index` out of an aggregate value.
    fn build_extract_value(module: &mut Self::Module, block: Self::BasicBlock, aggregate: Self::Value, field_index: usize) -> Self::Value;
    /// LLVM `insertvalue`: return a new aggregate with field `field_index` replaced.
    fn build_insert_value(
        module: &mut Self::Module,
        block: Self::BasicBlock,
        aggregate: Self::Value,
        field_index: usize,
        value: Self::Value,
    ) -> Self::Value;

    fn print_module_to_string(module: &Self::Module) -> String;
    fn write_bitcode(module: &Self::Module) -> Vec<u8>;
    fn parse_bitcode(ctx: &mut Self::Context, bytes: &[u8]) -> Result<Self::Module, String>;
    /// Link `src` into `dest`, consuming `src`.
    fn link_modules(dest: &mut Self::Module, src: Self::Module) -> Result<(), String>;

    fn create_debug_compile_unit(module: &mut Self::Module, file_name: &str, directory: &str) -> Self::DebugMeta;
    fn create_debug_file(module: &mut Self::Module, file_name: &str, directory: &str) -> Self::DebugMeta;
    fn create_debug_subroutine_type(module: &mut Self::Module, param_debug_types: &[Self::DebugMeta]) -> Self::DebugMeta;
    fn create_debug_location(module: &mut Self::Module, line: u32, column: u32, scope: Self::DebugMeta) -> Self::DebugMeta;

    /// Run the backend's IR verifier over `module`.
    fn verify_module(module: &Self::Module) -> Result<(), String>;

    /// JIT-compile and run `function` in `module` as if it were `main`,
    /// returning the process-style integer result.
    fn jit_execute_main(module: Self::Module, function: Self::Function, argv: &[String], envp: &[String]) -> Result<i32, String>;
}
