//! Utility functions for workspace-relative path handling
//!
//! Graph keys name files by their workspace-relative path with forward slashes,
//! whatever the host platform. Everything that turns user input or a
//! filesystem path into a key goes through here.

use std::path::{Component, Path};

/// Normalize a user-supplied workspace-relative path.
///
/// Strips `./` segments and duplicate or trailing separators, and converts
/// backslashes to forward slashes. Returns `None` for empty paths, absolute
/// paths, Windows drive paths and anything containing `..`.
///
/// `"."` (the workspace root itself) normalizes to the empty string.
pub fn normalize_relative_path(path: &str) -> Option<String> {
  let trimmed = path.trim();
  if trimmed.is_empty() {
    return None;
  }
  let unified = trimmed.replace('\\', "/");

  if unified.starts_with('/') {
    return None;
  }
  // Windows drive letter (C:/...)
  let bytes = unified.as_bytes();
  if bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':' {
    return None;
  }

  let mut parts = Vec::new();
  for part in unified.split('/') {
    match part {
      "" | "." => continue,
      ".." => return None,
      other => parts.push(other),
    }
  }
  Some(parts.join("/"))
}

/// Convert a path below `root` into the forward-slash form used in keys.
pub fn relative_key_path(root: &Path, path: &Path) -> Option<String> {
  let relative = path.strip_prefix(root).ok()?;
  let mut parts = Vec::new();
  for component in relative.components() {
    match component {
      Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
      Component::CurDir => continue,
      _ => return None,
    }
  }
  Some(parts.join("/"))
}

/// True if `path` equals `ancestor` or lies beneath it. Both are normalized
/// relative paths; the empty string is the workspace root and covers everything.
pub fn is_same_or_nested(path: &str, ancestor: &str) -> bool {
  if ancestor.is_empty() {
    return true;
  }
  path == ancestor || (path.starts_with(ancestor) && path.as_bytes().get(ancestor.len()) == Some(&b'/'))
}

/// Parent directory of a normalized relative path (`""` for top-level entries).
pub fn parent_path(path: &str) -> &str {
  path.rfind('/').map_or("", |idx| &path[..idx])
}

/// Split a comma-separated path list, dropping empty entries.
pub fn split_path_list(list: &str) -> Vec<String> {
  list
    .split(',')
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(String::from)
    .collect()
}
