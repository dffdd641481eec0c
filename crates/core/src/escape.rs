//! Case-encoding of module paths and versions.
//!
//! Module paths and versions end up as file names on disk, and many
//! filesystems are case-insensitive. The proxy protocol therefore never
//! transmits uppercase letters: each one is replaced by `!` followed by the
//! lowercase letter (`github.com/Azure` becomes `github.com/!azure`). The
//! mapping is a bijection between raw and encoded names because raw names
//! can never contain `!` themselves.

use crate::error::{Error, Result};

/// Escape a raw module path for use in a proxy URL.
pub fn escape_path(path: &str) -> Result<String> {
    check_path(path)?;
    Ok(escape_string(path))
}

/// Escape a raw version for use in a proxy URL.
pub fn escape_version(version: &str) -> Result<String> {
    check_version(version)?;
    Ok(escape_string(version))
}

/// Decode an escaped module path, rejecting malformed escapes.
pub fn unescape_path(escaped: &str) -> Result<String> {
    let path = unescape_string("module path", escaped)?;
    check_path(&path)?;
    Ok(path)
}

/// Decode an escaped version, rejecting malformed escapes.
pub fn unescape_version(escaped: &str) -> Result<String> {
    let version = unescape_string("version", escaped)?;
    check_version(&version)?;
    Ok(version)
}

/// File name stems that name devices on Windows, compared case-insensitively.
const WINDOWS_RESERVED: [&str; 22] = [
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

#[derive(Clone, Copy, PartialEq, Eq)]
enum ElemKind {
    ModulePath,
    Version,
}

/// Validate a raw (unescaped) module path.
///
/// Every element must be a portable file name. The first element is a
/// lowercase host-like name containing a dot, and a trailing `/vN` major
/// version suffix must be well formed.
pub fn check_path(path: &str) -> Result<()> {
    let fail = |reason: &str| {
        Err(Error::InvalidPath {
            path: path.to_string(),
            reason: reason.to_string(),
        })
    };

    if path.is_empty() {
        return fail("empty string");
    }
    if path.starts_with('/') {
        return fail("leading slash");
    }
    if path.ends_with('/') {
        return fail("trailing slash");
    }
    for elem in path.split('/') {
        if elem.is_empty() {
            return fail("double slash");
        }
        if let Err(reason) = check_elem(elem, ElemKind::ModulePath) {
            return fail(&reason);
        }
    }

    let first = path.split_once('/').map_or(path, |(first, _)| first);
    if !first.contains('.') {
        return fail("missing dot in first path element");
    }
    if first.starts_with('-') {
        return fail("leading dash in first path element");
    }
    if let Some(c) = first
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '-' | '.')))
    {
        return fail(&format!("invalid char {c:?} in first path element"));
    }
    if !major_suffix_ok(path) {
        return fail("invalid version suffix");
    }
    Ok(())
}

/// Validate a raw (unescaped) version or version query.
pub fn check_version(version: &str) -> Result<()> {
    check_elem(version, ElemKind::Version).map_err(|reason| Error::InvalidVersion {
        version: version.to_string(),
        reason,
    })
}

/// Check that `elem` is usable as a single file name on every platform.
fn check_elem(elem: &str, kind: ElemKind) -> std::result::Result<(), String> {
    if elem.is_empty() {
        return Err("empty string".to_string());
    }
    if elem.bytes().all(|b| b == b'.') {
        return Err(format!("{elem:?} is not a valid file name"));
    }
    if kind == ElemKind::ModulePath && elem.starts_with('.') {
        return Err("leading dot in path element".to_string());
    }
    if elem.ends_with('.') {
        return Err("trailing dot".to_string());
    }
    if let Some(c) = elem.chars().find(|&c| !elem_char_ok(c, kind)) {
        return Err(format!("invalid char {c:?}"));
    }

    let stem = elem.split_once('.').map_or(elem, |(stem, _)| stem);
    if WINDOWS_RESERVED
        .iter()
        .any(|reserved| stem.eq_ignore_ascii_case(reserved))
    {
        return Err(format!("{stem:?} is a reserved file name"));
    }
    // 8.3 short names such as PROGRA~1
    if let Some((_, suffix)) = stem.rsplit_once('~')
        && !suffix.is_empty()
        && suffix.bytes().all(|b| b.is_ascii_digit())
    {
        return Err("trailing tilde and digits in path element".to_string());
    }
    Ok(())
}

fn elem_char_ok(c: char, kind: ElemKind) -> bool {
    c.is_ascii_alphanumeric()
        || match kind {
            ElemKind::ModulePath => matches!(c, '-' | '.' | '_' | '~'),
            ElemKind::Version => matches!(c, '-' | '.' | '_' | '~' | '+'),
        }
}

/// Whether a trailing `/vN` element, if any, names a major version of 2 or
/// more without a minor part. `gopkg.in` paths use `.vN` instead.
fn major_suffix_ok(path: &str) -> bool {
    if path.starts_with("gopkg.in/") {
        return gopkg_in_suffix_ok(path);
    }

    let bytes = path.as_bytes();
    let mut i = bytes.len();
    let mut dot = false;
    while i > 0 && (bytes[i - 1].is_ascii_digit() || bytes[i - 1] == b'.') {
        dot |= bytes[i - 1] == b'.';
        i -= 1;
    }
    if i <= 1 || i == bytes.len() || bytes[i - 1] != b'v' || bytes[i - 2] != b'/' {
        return true;
    }
    let major = &path[i - 2..];
    !(dot || major.len() <= 2 || major.as_bytes()[2] == b'0' || major == "/v1")
}

fn gopkg_in_suffix_ok(path: &str) -> bool {
    let path = path.strip_suffix("-unstable").unwrap_or(path);
    let bytes = path.as_bytes();
    let mut i = bytes.len();
    while i > 0 && bytes[i - 1].is_ascii_digit() {
        i -= 1;
    }
    if i <= 1 || bytes[i - 1] != b'v' || bytes[i - 2] != b'.' {
        return false;
    }
    let major = &path[i - 2..];
    major.len() > 2 && (major.as_bytes()[2] != b'0' || major == ".v0")
}

/// Callers must have validated `raw` (no `!`, ASCII only).
fn escape_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c.is_ascii_uppercase() {
            out.push('!');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn unescape_string(kind: &'static str, escaped: &str) -> Result<String> {
    let fail = |reason: String| {
        Err(Error::InvalidEncoding {
            kind,
            input: escaped.to_string(),
            reason,
        })
    };

    let mut out = String::with_capacity(escaped.len());
    let mut bang = false;
    for c in escaped.chars() {
        if !c.is_ascii() {
            return fail(format!("non-ASCII character {c:?}"));
        }
        if bang {
            bang = false;
            if !c.is_ascii_lowercase() {
                return fail(format!("'!' followed by {c:?}, expected a lowercase letter"));
            }
            out.push(c.to_ascii_uppercase());
            continue;
        }
        if c == '!' {
            bang = true;
            continue;
        }
        if c.is_ascii_uppercase() {
            return fail(format!("unescaped uppercase letter {c:?}"));
        }
        out.push(c);
    }
    if bang {
        return fail("trailing '!'".to_string());
    }
    Ok(out)
}
