//! modhound Core Library
//!
//! This library turns a Go module dependency report (`go mod graph`
//! output) into a version-reconciled module graph and maps that graph into
//! a BloodHound OpenGraph document.

pub mod graph;
pub mod manifest;
pub mod opengraph;
pub mod process;
pub mod report;
pub mod version;

// Re-export commonly used types
pub use graph::{Edge, Graph, Node};
pub use process::{process, ProcessError, RootIdentity};
pub use version::VersionToken;
