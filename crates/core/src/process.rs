//! Graph construction from a module dependency report
//!
//! The report is line oriented: every record holds exactly two
//! whitespace-separated endpoints, the requiring module first and the
//! required module second. Each endpoint is a bare module identity or a
//! `module@version` pair:
//!
//! ```text
//! example.com/app golang.org/x/mod@v0.17.0
//! golang.org/x/mod@v0.17.0 golang.org/x/tools@v0.13.0
//! ```
//!
//! Only the root module may appear without a version. A record with any
//! other unversioned endpoint is an artifact of a partially resolved graph
//! and is skipped.

use std::io::BufRead;
use tracing::{debug, trace};

use crate::graph::{Edge, Graph};

/// Errors that abort graph construction
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// A record did not split into exactly two fields
    #[error("expected 2 fields on line {line_number} (byte offset {offset}), found {fields}: {line:?}")]
    Format {
        /// Offending record without its line terminator
        line: String,
        /// 1-based line number
        line_number: usize,
        /// Byte offset of the start of the record in the stream
        offset: u64,
        /// Number of whitespace-separated fields found
        fields: usize,
    },

    /// The report could not be read
    #[error("failed to read dependency report")]
    Io(#[from] std::io::Error),
}

/// Errors constructing a [`RootIdentity`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RootError {
    #[error("root module identity is empty")]
    Empty,
}

/// Module identity of the project under analysis
///
/// The root is the only module allowed to appear without a version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RootIdentity(String);

impl RootIdentity {
    /// Create a root identity, refusing an empty or blank module path
    pub fn new(module: impl Into<String>) -> Result<Self, RootError> {
        let module = module.into();
        let trimmed = module.trim();
        if trimmed.is_empty() {
            return Err(RootError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RootIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One side of a report record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint<'a> {
    pub module: &'a str,
    /// Empty when the token carries no `@`
    pub version: &'a str,
}

impl<'a> Endpoint<'a> {
    /// Split a report token on its first `@`
    pub fn parse(token: &'a str) -> Self {
        match token.split_once('@') {
            Some((module, version)) => Self { module, version },
            None => Self {
                module: token,
                version: "",
            },
        }
    }

    /// Whether the endpoint is the root or pins a version
    pub fn is_accepted(&self, root: &RootIdentity) -> bool {
        self.module == root.as_str() || !self.version.is_empty()
    }
}

/// Build a dependency graph from a report
///
/// Records are consumed in order. For every accepted record both endpoints
/// are upserted and one edge is appended running from the required module
/// to the requiring module.
///
/// # Errors
///
/// Returns [`ProcessError::Format`] on the first record that does not hold
/// exactly two fields (blank lines included), and [`ProcessError::Io`] if
/// the reader fails. No partial graph is returned.
///
/// # Example
///
/// ```
/// use modhound_core::process::{process, RootIdentity};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = "example.com/app golang.org/x/mod@v0.17.0\n";
/// let root = RootIdentity::new("example.com/app")?;
/// let graph = process(report.as_bytes(), &root)?;
///
/// assert_eq!(graph.node_count(), 2);
/// assert_eq!(graph.edge_count(), 1);
/// # Ok(())
/// # }
/// ```
pub fn process<R: BufRead>(mut reader: R, root: &RootIdentity) -> Result<Graph, ProcessError> {
    let mut graph = Graph::new();
    let mut buf = String::new();
    let mut offset: u64 = 0;
    let mut line_number = 0;
    let mut skipped = 0;

    loop {
        buf.clear();
        let read = reader.read_line(&mut buf)?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let line = trim_line_ending(&buf);
        let fields: Vec<&str> = line.split_whitespace().collect();
        let &[parent, child] = fields.as_slice() else {
            return Err(ProcessError::Format {
                line: line.to_string(),
                line_number,
                offset,
                fields: fields.len(),
            });
        };

        let parent = Endpoint::parse(parent);
        let child = Endpoint::parse(child);

        if parent.is_accepted(root) && child.is_accepted(root) {
            let parent_idx = graph.upsert(parent.module, parent.version);
            let child_idx = graph.upsert(child.module, child.version);
            graph.add_edge(child_idx, parent_idx, Edge { line: line_number });
        } else {
            trace!(line_number, line, "skipping record with unversioned endpoint");
            skipped += 1;
        }

        offset += read as u64;
    }

    debug!(
        records = line_number,
        skipped,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "processed dependency report"
    );

    Ok(graph)
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
