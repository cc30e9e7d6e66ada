//! Path string helpers tolerant of both `/` and `\` separators.
//!
//! Source paths come from a file picker on any platform, so they are handled
//! as plain strings rather than `std::path::Path`, which only understands the
//! host separator.

const SEPARATORS: [char; 2] = ['/', '\\'];

/// Final segment of a path, splitting on both `/` and `\`.
pub fn file_name(path: &str) -> &str {
    match path.rfind(SEPARATORS) {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}

/// Split a file name into stem and extension.
///
/// A leading dot (`.bashrc`) or a trailing dot (`name.`) does not start an
/// extension.
pub fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// File name with its final extension removed.
pub fn file_stem(name: &str) -> &str {
    split_extension(name).0
}

/// Replace the extension of the final path segment, appending one if the
/// segment has none.
pub fn replace_extension(path: &str, extension: &str) -> String {
    let name = file_name(path);
    let dir = &path[..path.len() - name.len()];
    format!("{}{}.{}", dir, file_stem(name), extension)
}

/// Make `name` safe to use as a single path segment by replacing both
/// separators with `_`.
pub fn sanitize_segment(name: &str) -> String {
    name.replace(SEPARATORS, "_")
}

/// Join an output directory and a file name with `/`, without doubling a
/// trailing separator on the directory.
pub fn join(dir: &str, name: &str) -> String {
    let trimmed = dir.trim_end_matches(SEPARATORS);
    if trimmed.is_empty() && !dir.is_empty() {
        // Root directory
        return format!("{}{}", &dir[..1], name);
    }
    format!("{}/{}", trimmed, name)
}
