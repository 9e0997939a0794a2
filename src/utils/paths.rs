use std::path::{Path, PathBuf};

// Normalize an untrusted relative name, rejecting absolute paths and attempts to climb above root.
pub fn normalize_rel(rel: &str) -> Option<PathBuf> {
    let p = Path::new(rel);
    if p.is_absolute() {
        return None;
    }
    let mut parts: Vec<&str> = Vec::new();
    let cleaned = rel.replace('\\', "/");
    if cleaned.starts_with('/') {
        return None;
    }
    for seg in cleaned.split('/') {
        if seg.is_empty() || seg == "." {
            continue;
        }
        if seg == ".." {
            parts.pop()?;
        } else {
            parts.push(seg);
        }
    }
    let mut out = PathBuf::new();
    for seg in parts {
        out.push(seg);
    }
    Some(out)
}

// Join base + relative and ensure the result stays strictly under base.
// The base itself is not a valid target.
pub fn secure_join(base: &Path, rel: &str) -> Option<PathBuf> {
    let base_abs = dunce::canonicalize(base).ok()?;
    let rel_norm = normalize_rel(rel)?;
    if rel_norm.as_os_str().is_empty() {
        return None;
    }
    let joined = base_abs.join(&rel_norm);
    let joined_can = dunce::canonicalize(&joined).unwrap_or(joined);
    if joined_can.starts_with(&base_abs) && joined_can != base_abs {
        Some(joined_can)
    } else {
        None
    }
}
