//! # Name Mangling
//!
//! Bijective encoding of `(module_path, symbol)` into a single linker-legal
//! identifier.
//!
//! The scheme is deliberately simple so it can be inverted exactly:
//!
//! - `.` in the module path becomes `_d`
//! - `/` in the module path becomes `_s`
//! - `_` in the module path becomes `__`
//! - the (already-escaped) path and the symbol are joined with `_m`
//!
//! `main` with an empty module path is special-cased to the bare string
//! `"main"` so the host runtime's entry point still resolves.

/// Mangle a `(module_path, symbol)` pair into a linker-legal identifier.
///
/// # Example
///
/// ```
/// use graphy::mangle::mangle;
///
/// assert_eq!(mangle("github.com/ab__cd/x", "foo"), "github_dcom_sab____cd_sx_mfoo");
/// assert_eq!(mangle("", "main"), "main");
/// ```
pub fn mangle(module_path: &str, symbol: &str) -> String {
    if module_path.is_empty() && symbol == "main" {
        return "main".to_string();
    }

    let mut escaped = String::with_capacity(module_path.len() * 2);
    for c in module_path.chars() {
        match c {
            '.' => escaped.push_str("_d"),
            '/' => escaped.push_str("_s"),
            '_' => escaped.push_str("__"),
            other => escaped.push(other),
        }
    }

    format!("{}_m{}", escaped, symbol)
}

/// Reverse [`mangle`], recovering the original `(module_path, symbol)` pair.
///
/// Returns `None` if `mangled` isn't a validly mangled identifier.
///
/// # Example
///
/// ```
/// use graphy::mangle::{mangle, unmangle};
///
/// let (path, symbol) = unmangle("github_dcom_sab____cd_sx_mfoo").unwrap();
/// assert_eq!(path, "github.com/ab__cd/x");
/// assert_eq!(symbol, "foo");
/// assert_eq!(mangle(&path, &symbol), "github_dcom_sab____cd_sx_mfoo");
/// ```
pub fn unmangle(mangled: &str) -> Option<(String, String)> {
    if mangled == "main" {
        return Some((String::new(), "main".to_string()));
    }

    // Walk the escaped path left to right, unescaping as we go, until we hit
    // an unescaped "_m" separator (i.e. a "_m" not immediately preceded by
    // consuming it as part of "__" or "_d"/"_s").
    let bytes = mangled.as_bytes();
    let mut path = String::new();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'_' {
            if i + 1 >= bytes.len() {
                return None;
            }
            match bytes[i + 1] {
                b'd' => {
                    path.push('.');
                    i += 2;
                }
                b's' => {
                    path.push('/');
                    i += 2;
                }
                b'_' => {
                    path.push('_');
                    i += 2;
                }
                b'm' => {
                    let symbol = mangled[i + 2..].to_string();
                    return Some((path, symbol));
                }
                _ => return None,
            }
        } else {
            // Safe: module paths and symbols are expected to be ASCII-safe
            // identifiers/paths; non-ASCII bytes pass through untouched.
            path.push(bytes[i] as char);
            i += 1;
        }
    }

    None
}
