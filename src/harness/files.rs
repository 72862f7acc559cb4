//! Sentinel and scratch file helpers.

use std::fs;
use std::io;
use std::path::Path;

use super::HarnessResult;

/// Remove `path`, treating a missing file as success.
pub fn remove_f(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Remove every regular file directly inside `dir` whose name matches `pattern`.
///
/// ## Returns
/// - The number of files removed. A missing `dir` removes nothing.
pub fn remove_files(dir: &Path, pattern: &str) -> HarnessResult<usize> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut removed = 0;
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if wildcard_match(pattern, name) {
            remove_f(&entry.path())?;
            removed += 1;
        }
    }
    if removed > 0 {
        tracing::debug!(dir = %dir.display(), pattern, removed, "removed files");
    }
    Ok(removed)
}

/// Read a sentinel file written by a test application.
///
/// ## Returns
/// - `0` if the file could be read (its content is not inspected), `1` otherwise.
pub fn test_result_file(path: &Path) -> i32 {
    match fs::read(path) {
        Ok(_) => 0,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "could not read result file");
            1
        }
    }
}

/// Shell-style wildcard match of a whole file name: `*` matches any run of characters, `?` one.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();

    let (mut p, mut n) = (0, 0);
    // Position of the last `*` seen and the name index it was tried against.
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
