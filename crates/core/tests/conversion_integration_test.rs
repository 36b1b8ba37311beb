//! Integration test for report conversion
//!
//! Uses the fixture at `tests/test-fixtures/sample-project/`: a `go.mod`
//! and a captured `go mod graph` report for the same project.

use modhound_core::opengraph::{self, ExportOptions, IdScheme};
use modhound_core::{manifest, process, RootIdentity};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

const FIXTURE: &str = "tests/test-fixtures/sample-project";

fn load_fixture() -> (RootIdentity, modhound_core::Graph) {
    let fixture_path = Path::new(FIXTURE);
    assert!(fixture_path.exists(), "Fixture directory should exist");

    let module = manifest::read_module_path(&fixture_path.join("go.mod")).unwrap();
    let root = RootIdentity::new(module).unwrap();

    let report = File::open(fixture_path.join("mod-graph.txt")).unwrap();
    let graph = process(BufReader::new(report), &root).unwrap();

    (root, graph)
}

#[test]
fn test_integration_root_from_manifest() {
    let (root, _) = load_fixture();
    assert_eq!(root.as_str(), "example.com/inventory");
}

#[test]
fn test_integration_graph_counts() {
    let (_, graph) = load_fixture();

    // every record in the fixture pins its endpoints, so none are skipped
    assert_eq!(graph.edge_count(), 19);
    assert_eq!(graph.node_count(), 15);

    let root = graph.node("example.com/inventory").unwrap();
    assert!(root.version().is_empty());
}

#[test]
fn test_integration_version_reconciliation() {
    let (_, graph) = load_fixture();

    let x_mod = graph.node("golang.org/x/mod").unwrap();
    assert_eq!(x_mod.version().as_str(), "v0.17.0");
    let unpicked: Vec<&str> = x_mod.superseded().map(|v| v.as_str()).collect();
    assert_eq!(unpicked, vec!["v0.12.0"]);

    // v0.12.0 must beat v0.9.0 numerically
    let x_sys = graph.node("golang.org/x/sys").unwrap();
    assert_eq!(x_sys.version().as_str(), "v0.12.0");
    let unpicked: Vec<&str> = x_sys.superseded().map(|v| v.as_str()).collect();
    assert_eq!(unpicked, vec!["v0.9.0"]);

    // toolchain tokens are not semantic versions but are still kept
    let toolchain = graph.node("toolchain").unwrap();
    assert_eq!(toolchain.version().as_str(), "go1.22.0");
}

#[test]
fn test_integration_export() {
    let (root, graph) = load_fixture();
    let document = opengraph::export(&graph, &root, &ExportOptions::default());

    assert_eq!(document.graph.nodes.len(), 15);
    assert_eq!(document.graph.edges.len(), 19);

    // first record: cobra is required by the root
    let first = &document.graph.edges[0];
    assert_eq!(
        first.start.value,
        "modhound_example.com/inventory_github.com/spf13/cobra"
    );
    assert_eq!(
        first.end.value,
        "modhound_example.com/inventory_example.com/inventory"
    );

    // every edge endpoint refers to an exported node
    let ids: Vec<&str> = document.graph.nodes.iter().map(|n| n.id.as_str()).collect();
    for edge in &document.graph.edges {
        assert!(ids.contains(&edge.start.value.as_str()));
        assert!(ids.contains(&edge.end.value.as_str()));
    }
}

#[test]
fn test_integration_export_is_deterministic() {
    let (root, graph) = load_fixture();
    let options = ExportOptions {
        id_scheme: IdScheme::Module,
        ..ExportOptions::default()
    };

    let first = serde_json::to_string(&opengraph::export(&graph, &root, &options)).unwrap();
    let (root, graph) = load_fixture();
    let second = serde_json::to_string(&opengraph::export(&graph, &root, &options)).unwrap();

    assert_eq!(first, second);
}
