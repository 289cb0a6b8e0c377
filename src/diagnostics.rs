//! # Diagnostics accumulator (C1)
//!
//! [`Diagnostics`] is the structured, exception-free error-reporting value
//! returned by every fallible core operation (`spec.md` §3, §7). It is an
//! append-only list of `{code, overview, data}` entries, where `code` is a
//! letter-prefixed severity (`E`/`W`/`I`, see [`crate::codes`]).
//!
//! Scoped [`ContextScope`] objects attach key-value pairs to every entry
//! added during their lifetime, so a deep call chain accumulates precise
//! provenance without needing to thread error context through every
//! intermediate return value. `+`/`+=` concatenate two `Diagnostics`,
//! applying each side's context to the other's entries — this mirrors
//! `chi::Result::operator+` in `examples/original_source/libchigraph/src/Result.cpp`.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// One diagnostic entry.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Entry {
    /// Letter-prefixed severity code, e.g. `"E30"`.
    pub code: String,
    /// Human-readable summary.
    pub overview: String,
    /// Structured payload merged with any active context.
    pub data: Value,
}

impl Entry {
    fn severity(&self) -> u8 {
        self.code.as_bytes().first().copied().unwrap_or(b'I')
    }
}

/// The append-only diagnostic list described in `spec.md` §3 under "Result".
///
/// Named `Diagnostics` (not `Result`) to avoid colliding with
/// `std::result::Result`; this is the type `spec.md` calls "Result"
/// throughout.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    entries: Vec<Entry>,
    success: bool,
    contexts: BTreeMap<u64, Value>,
}

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(0);

impl Diagnostics {
    /// An empty, successful diagnostics list.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            success: true,
            contexts: BTreeMap::new(),
        }
    }

    /// Construct a diagnostics list with a single entry.
    pub fn single(code: impl Into<String>, overview: impl Into<String>, data: Value) -> Self {
        let mut d = Self::new();
        d.add_entry(code, overview, data);
        d
    }

    /// Append a diagnostic entry. `code` must start with `'E'`, `'W'`, or `'I'`.
    ///
    /// Any active [`ContextScope`] data is merged into `data` conservatively:
    /// keys already present in `data` win over context keys.
    pub fn add_entry(&mut self, code: impl Into<String>, overview: impl Into<String>, mut data: Value) {
        let code = code.into();
        debug_assert!(
            matches!(code.as_bytes().first(), Some(b'E') | Some(b'W') | Some(b'I')),
            "diagnostic code must start with E, W, or I: {code}"
        );

        merge_conservative(&mut data, &self.context_json());

        if code.starts_with('E') {
            self.success = false;
        }

        self.entries.push(Entry {
            code,
            overview: overview.into(),
            data,
        });
    }

    /// Convenience for an entry with no structured payload.
    pub fn add(&mut self, code: impl Into<String>, overview: impl Into<String>) {
        self.add_entry(code, overview, json!({}));
    }

    /// `true` iff no `E`-severity entry has been added.
    pub fn success(&self) -> bool {
        self.success
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Open a context scope: every entry added while the returned
    /// [`ContextScope`] is alive (and merged in afterward via `+=`) picks up
    /// `data`'s keys. Dropping the scope removes it.
    pub fn push_context(&mut self, data: Value) -> ContextId {
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        self.contexts.insert(id, data);
        ContextId(id)
    }

    pub fn pop_context(&mut self, id: ContextId) {
        self.contexts.remove(&id.0);
    }

    /// A RAII scope: push on construction, pop on drop. Mirrors
    /// `chi::Result::addContext`/`removeContext` used via scope guards in
    /// the original implementation's call sites.
    pub fn scope<'a>(&'a mut self, data: Value) -> ContextScope<'a> {
        let id = self.push_context(data);
        ContextScope { diag: self, id }
    }

    fn context_json(&self) -> Value {
        let mut merged = json!({});
        for ctx in self.contexts.values() {
            merge_conservative(&mut merged, ctx);
        }
        merged
    }

    /// Render as the CLI's user-visible text: `code: overview\n<indented data>`.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for e in &self.entries {
            out.push_str(&e.code);
            out.push_str(": ");
            out.push_str(&e.overview);
            out.push('\n');
            if !e.data.as_object().map(|o| o.is_empty()).unwrap_or(false) {
                out.push_str(&pretty_print(&e.data, 1));
                out.push('\n');
            }
        }
        out
    }

    /// The conventional process exit code: `0` on success, `1` otherwise,
    /// per `spec.md` §6.
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Highest-severity entries of a given class (for tests that want to
    /// assert "exactly one E30-class entry").
    pub fn entries_with_prefix(&self, prefix: &str) -> Vec<&Entry> {
        self.entries.iter().filter(|e| e.code.starts_with(prefix)).collect()
    }
}

/// A RAII handle returned by [`Diagnostics::push_context`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextId(u64);

/// Scoped context guard; pops its context when dropped.
pub struct ContextScope<'a> {
    diag: &'a mut Diagnostics,
    id: ContextId,
}

impl<'a> Drop for ContextScope<'a> {
    fn drop(&mut self) {
        self.diag.pop_context(self.id);
    }
}

impl<'a> ContextScope<'a> {
    pub fn diagnostics(&mut self) -> &mut Diagnostics {
        self.diag
    }
}

fn merge_conservative(into: &mut Value, from: &Value) {
    let (Some(into_obj), Some(from_obj)) = (into.as_object_mut(), from.as_object()) else {
        return;
    };
    for (k, v) in from_obj {
        into_obj.entry(k.clone()).or_insert_with(|| v.clone());
    }
}

impl std::ops::Add for Diagnostics {
    type Output = Diagnostics;

    fn add(self, rhs: Diagnostics) -> Diagnostics {
        let mut ret = Diagnostics::new();
        ret.success = self.success() && rhs.success();

        let lhs_ctx = self.context_json();
        let rhs_ctx = rhs.context_json();

        for mut e in self.entries {
            merge_conservative(&mut e.data, &rhs_ctx);
            ret.entries.push(e);
        }
        for mut e in rhs.entries {
            merge_conservative(&mut e.data, &lhs_ctx);
            ret.entries.push(e);
        }

        ret
    }
}

impl std::ops::AddAssign for Diagnostics {
    fn add_assign(&mut self, rhs: Diagnostics) {
        self.success = self.success() && rhs.success();

        let rhs_ctx = rhs.context_json();
        for e in &mut self.entries {
            merge_conservative(&mut e.data, &rhs_ctx);
        }

        let lhs_ctx = self.context_json();
        for mut e in rhs.entries {
            merge_conservative(&mut e.data, &lhs_ctx);
            self.entries.push(e);
        }
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dump())
    }
}

fn pretty_print(value: &Value, indent_level: usize) -> String {
    let indent = "  ".repeat(indent_level);
    match value {
        Value::Array(items) => {
            let mut out = format!("{indent}[\n");
            for item in items {
                out.push_str(&pretty_print(item, indent_level + 1));
                out.push_str(",\n");
            }
            out.push_str(&indent);
            out.push(']');
            out
        }
        Value::Object(map) => {
            let mut out = String::new();
            for (k, v) in map {
                out.push_str(&indent);
                out.push_str(k);
                out.push('\n');
                out.push_str(&pretty_print(v, indent_level + 1));
                out.push('\n');
            }
            out
        }
        Value::String(s) => format!("{indent}{}", s.replace('\n', &format!("\n{indent}"))),
        other => format!("{indent}{other}"),
    }
}
