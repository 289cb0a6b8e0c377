//! # Workspace (A3, `spec.md` §6 "Environment")
//!
//! Resolves a workspace root holding `src/<module-path>.chimod` source files
//! and `lib/<module-path>.bc` cache entries, mirroring the original's
//! `chi::Context::loadModule` resolution and `chi list` module discovery
//! (`examples/original_source/chi/main.cpp`, `chi/compile.cpp`). A workspace
//! is identified by a `.chigraphroot` marker file at its root, exactly as
//! the original looks for a recognizable marker directory (`spec.md` §6).
//!
//! This is the glue that turns the Graph JSON schema (C12, `crate::serialize`)
//! and the module cache (C10, `crate::cache`) into a loadable [`Context`].

use crate::backend::Backend;
use crate::cache::ModuleCache;
use crate::codes;
use crate::core::context::Context;
use crate::core::module::Module;
use crate::diagnostics::Diagnostics;
use crate::error::{GraphyError, Result};
use crate::serialize::{self, GraphModuleDto, NodeTypeTable, TypeTable};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Marker file identifying a directory as a chigraph workspace root.
pub const MARKER_FILE: &str = ".chigraphroot";

/// A resolved workspace: a root directory holding `src/` and `lib/`.
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Walks upward from `start` looking for [`MARKER_FILE`], per `spec.md`
    /// §6 ("a workspace is identified by containing a recognizable marker
    /// directory").
    pub fn discover(start: impl AsRef<Path>) -> Result<Self> {
        let mut dir = start.as_ref().to_path_buf();
        loop {
            if dir.join(MARKER_FILE).is_file() {
                return Ok(Self { root: dir });
            }
            if !dir.pop() {
                return Err(GraphyError::WorkspaceNotFound(start.as_ref().display().to_string()));
            }
        }
    }

    /// Creates a new workspace skeleton at `root` (the `init` CLI subcommand,
    /// `spec.md` §6): the marker file plus empty `src/`/`lib/` directories.
    pub fn init(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(root.join("src"))?;
        fs::create_dir_all(root.join("lib"))?;
        fs::write(root.join(MARKER_FILE), b"")?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `src/<module_path>.chimod`.
    pub fn source_path(&self, module_path: &str) -> PathBuf {
        self.root.join("src").join(format!("{module_path}.chimod"))
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    pub fn module_cache(&self) -> ModuleCache {
        ModuleCache::new(self.cache_dir())
    }

    /// Enumerate module paths under `src/` without loading them
    /// (`Context::listModulesInWorkspace` in `spec.md` §3, supplemented from
    /// the original's `chi list`).
    pub fn discover_modules(&self) -> Vec<String> {
        let src = self.root.join("src");
        let mut paths = Vec::new();
        for entry in WalkDir::new(&src).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(ext) = entry.path().extension() else { continue };
            if ext != "chimod" {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&src) else { continue };
            let without_ext = relative.with_extension("");
            let module_path = without_ext.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect::<Vec<_>>().join("/");
            paths.push(module_path);
        }
        paths.sort();
        paths
    }

    /// Loads `module_path` and its transitive dependencies (depth-first,
    /// dependency-first) into `ctx`, parsing each `.chimod` JSON file and
    /// resolving it against already-loaded modules' types (`spec.md` §6
    /// Graph JSON schema). Already-loaded modules (including `lang`, which
    /// is never loaded from disk) are skipped.
    pub fn load_module<B: Backend>(&self, ctx: &mut Context<B>, module_path: &str) -> Diagnostics {
        let mut visiting = HashSet::new();
        self.load_module_inner(ctx, module_path, &mut visiting)
    }

    fn load_module_inner<B: Backend>(&self, ctx: &mut Context<B>, module_path: &str, visiting: &mut HashSet<String>) -> Diagnostics {
        let mut diag = Diagnostics::new();
        if ctx.module(module_path).is_some() {
            return diag;
        }
        if !visiting.insert(module_path.to_string()) {
            // Dependency cycle; `ModuleCompiler::compile`'s topo-sort is the
            // authoritative place this is reported (`spec.md` §9 Open
            // Question 2), so loading just stops recursing here.
            return diag;
        }

        let path = self.source_path(module_path);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) => {
                diag.add_entry(codes::io::E01_FILE_NOT_FOUND, format!("module source not found: {}", path.display()), serde_json::json!({ "module": module_path, "error": e.to_string() }));
                return diag;
            }
        };
        let dto: GraphModuleDto = match serde_json::from_str(&text) {
            Ok(dto) => dto,
            Err(e) => {
                diag.add_entry(codes::io::E03_JSON_PARSE, format!("failed to parse `{}`: {e}", path.display()), serde_json::json!({ "module": module_path }));
                return diag;
            }
        };

        for dep in &dto.dependencies {
            diag += self.load_module_inner(ctx, dep, visiting);
        }
        if !diag.success() {
            return diag;
        }

        let (types, node_types) = self.type_tables(ctx, &dto);

        let lang = ctx.lang().clone();
        // Build the scratch module first so its `&mut` borrow of `ctx` ends
        // before `ctx.backend_context()` is borrowed immutably below.
        let mut scratch_module = build_scratch_module::<B>(ctx, module_path);
        let (module, build_diag) = serialize::from_dto(module_path, &dto, &lang, &types, &node_types, ctx.backend_context(), &mut scratch_module);
        diag += build_diag;

        for s in &module.structs {
            if let Some(ty) = &s.resolved_type {
                ctx.register_struct(ty.clone(), s.make_node_type(ty.clone()), s.break_node_type(ty.clone()));
            }
        }

        if let Err(e) = ctx.add_module(Module::Graph(module)) {
            diag.add_entry(codes::model::E26_DUPLICATE_MODULE_PATH, e.to_string(), serde_json::json!({ "module": module_path }));
        }

        diag
    }

    /// Seeds a [`TypeTable`] from `lang`'s primitives plus every struct type
    /// registered on `ctx` so far (by dependencies loaded earlier in this
    /// same call). Cross-module `_make_`/`_break_` node-type references
    /// are not supported by the generic `node_types` table — see
    /// `DESIGN.md` ("cross-module struct node types") — only a module's own
    /// structs (handled directly in [`Workspace::load_module_inner`] via
    /// `serialize::from_dto`'s local extension) resolve today.
    fn type_tables<B: Backend>(&self, ctx: &Context<B>, _dto: &GraphModuleDto) -> (TypeTable<B>, NodeTypeTable<B>) {
        let mut types = TypeTable::<B>::new();
        for name in ctx.lang().type_names() {
            if let Some(ty) = ctx.lang().type_named(name) {
                types.insert(format!("lang:{name}"), ty);
            }
        }
        for ty in ctx.struct_types() {
            types.insert(ty.qualified_name(), ty.clone());
        }

        (types, NodeTypeTable::<B>::new())
    }
}

/// A scratch backend module used only to mint struct debug-type handles
/// during loading (`GraphStruct::resolve_type`), mirroring how
/// `Context::new` builds `LangModule`'s primitives against a throwaway
/// module (`crate::core::context::Context::new`).
fn build_scratch_module<B: Backend>(ctx: &mut Context<B>, module_path: &str) -> B::Module {
    B::create_module(ctx.backend_context_mut(), &format!("{module_path}#load-scratch"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::interpreter::Interpreter;
    use std::fs;

    fn write_module(root: &Path, path: &str, json: &str) {
        let file = root.join("src").join(format!("{path}.chimod"));
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, json).unwrap();
    }

    #[test]
    fn discover_finds_marker_from_nested_dir() {
        let dir = tempfile::tempdir().unwrap();
        Workspace::init(dir.path()).unwrap();
        let nested = dir.path().join("src/a/b");
        fs::create_dir_all(&nested).unwrap();
        let ws = Workspace::discover(&nested).unwrap();
        assert_eq!(ws.root(), dir.path());
    }

    #[test]
    fn discover_fails_outside_any_workspace() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Workspace::discover(dir.path()).is_err());
    }

    #[test]
    fn discover_modules_lists_chimod_files() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();
        write_module(dir.path(), "a/b", r#"{"dependencies":[],"graphs":[]}"#);
        write_module(dir.path(), "c", r#"{"dependencies":[],"graphs":[]}"#);
        let mods = ws.discover_modules();
        assert_eq!(mods, vec!["a/b".to_string(), "c".to_string()]);
    }

    #[test]
    fn load_module_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();
        let mut ctx: Context<Interpreter> = Context::new();
        let diag = ws.load_module(&mut ctx, "nope");
        assert!(!diag.success());
        assert_eq!(diag.entries_with_prefix("E01").len(), 1);
    }

    #[test]
    fn load_module_with_no_nodes_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();
        write_module(dir.path(), "test/empty", r#"{"dependencies":[],"graphs":[]}"#);
        let mut ctx: Context<Interpreter> = Context::new();
        let diag = ws.load_module(&mut ctx, "test/empty");
        assert!(diag.success(), "{diag}");
        assert!(ctx.graph_module("test/empty").is_ok());
    }

    #[test]
    fn load_module_resolves_dependencies_first() {
        let dir = tempfile::tempdir().unwrap();
        let ws = Workspace::init(dir.path()).unwrap();
        write_module(dir.path(), "base", r#"{"dependencies":[],"graphs":[]}"#);
        write_module(dir.path(), "dependent", r#"{"dependencies":["base"],"graphs":[]}"#);
        let mut ctx: Context<Interpreter> = Context::new();
        let diag = ws.load_module(&mut ctx, "dependent");
        assert!(diag.success(), "{diag}");
        assert!(ctx.graph_module("base").is_ok());
        assert!(ctx.graph_module("dependent").is_ok());
    }
}
