//! Root module discovery from a `go.mod` manifest
//!
//! Only the `module` directive is interpreted; every other directive is
//! ignored.

use std::path::{Path, PathBuf};

/// Errors reading the module path out of a manifest
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("could not read manifest {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("manifest has no module directive")]
    MissingModule,

    #[error("invalid module directive on line {line_number}")]
    InvalidModule { line_number: usize },

    #[error("repeated module directive on line {line_number}")]
    DuplicateModule { line_number: usize },
}

/// Read a manifest from disk and return its module path
///
/// # Example
/// ```no_run
/// use modhound_core::manifest;
///
/// let root = manifest::read_module_path(std::path::Path::new("go.mod")).unwrap();
/// println!("analyzing {root}");
/// ```
pub fn read_module_path(path: &Path) -> Result<String, ManifestError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_module_path(&contents)
}

/// Extract the module path from manifest contents
///
/// Accepts bare, double-quoted and back-quoted paths, trailing `//`
/// comments, and the parenthesized block form. Exactly one module path
/// must be declared.
pub fn parse_module_path(contents: &str) -> Result<String, ManifestError> {
    let mut found = None;
    let mut in_block = false;

    for (idx, raw) in contents.lines().enumerate() {
        let line_number = idx + 1;
        let line = strip_comment(raw).trim();

        if in_block {
            match line {
                ")" => in_block = false,
                "" => {}
                path => record(&mut found, path, line_number)?,
            }
            continue;
        }

        let Some(rest) = line.strip_prefix("module") else {
            continue;
        };
        // "modulepath" is some other keyword, not a directive
        if !rest.is_empty() && !rest.starts_with(|c: char| c.is_whitespace() || "(\"`".contains(c)) {
            continue;
        }

        let rest = rest.trim();
        if rest == "(" {
            in_block = true;
        } else if let Some(inner) = rest.strip_prefix('(') {
            let inner = inner
                .strip_suffix(')')
                .ok_or(ManifestError::InvalidModule { line_number })?;
            record(&mut found, inner.trim(), line_number)?;
        } else {
            record(&mut found, rest, line_number)?;
        }
    }

    found.ok_or(ManifestError::MissingModule)
}

fn record(found: &mut Option<String>, arg: &str, line_number: usize) -> Result<(), ManifestError> {
    let path = unquote(arg).ok_or(ManifestError::InvalidModule { line_number })?;
    if found.is_some() {
        return Err(ManifestError::DuplicateModule { line_number });
    }
    *found = Some(path);
    Ok(())
}

/// Decode a directive argument into a module path
fn unquote(arg: &str) -> Option<String> {
    let path = if let Some(inner) = arg.strip_prefix('`') {
        inner.strip_suffix('`')?.to_string()
    } else if let Some(inner) = arg.strip_prefix('"') {
        unescape(inner.strip_suffix('"')?)?
    } else {
        arg.to_string()
    };

    if path.is_empty() || path.contains(char::is_whitespace) {
        return None;
    }
    Some(path)
}

fn unescape(quoted: &str) -> Option<String> {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next()? {
                escaped @ ('\\' | '"') => out.push(escaped),
                _ => return None,
            },
            '"' => return None,
            c => out.push(c),
        }
    }
    Some(out)
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}
