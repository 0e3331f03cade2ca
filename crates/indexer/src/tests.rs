use crate::bundle::BundleStore;
use crate::docs::sections::SectionValue;
use crate::docs::types::DocBlock;
use crate::execution::config::{IndexingConfig, IndexingConfigBuilder};
use crate::execution::executor::{BundleIndexer, IndexerError};
use crate::graph::{GraphBuilder, ObjectGraph};
use crate::testing::ScriptedOracles;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// Loads the namespace dump shared with the CLI tests.
fn load_fixture_graph() -> ObjectGraph {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("fixtures/demo-graph.json");
    ObjectGraph::from_file(fixture).expect("Failed to load fixture graph")
}

fn create_indexer(bundle_root: &Path) -> BundleIndexer {
    BundleIndexer::new(Arc::new(load_fixture_graph()), BundleStore::new(bundle_root))
}

fn config(infer: bool) -> IndexingConfig {
    IndexingConfigBuilder::new().threads(2).infer(infer).build()
}

/// Every artifact of a bundle, keyed by file name.
fn read_bundle(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    fs::read_dir(dir)
        .expect("Failed to read bundle directory")
        .map(|entry| {
            let path = entry.unwrap().path();
            let name = path.file_name().unwrap().to_string_lossy().to_string();
            (name, fs::read(&path).unwrap())
        })
        .collect()
}

#[test]
fn test_full_indexing_pipeline() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let indexer = create_indexer(temp_dir.path());

    let stats = indexer
        .run("demo", &config(true))
        .expect("Failed to index demo");

    assert_eq!(stats.symbols_crawled, 7);
    assert_eq!(stats.documented, 5);
    assert_eq!(stats.undocumented, 2);
    assert_eq!(stats.written, 4);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.failed_symbols, vec!["demo.broken"]);
    assert_eq!(stats.identity_conflicts, 0);
    assert_eq!(stats.aliases_dropped, 0);

    assert_eq!(
        indexer.store().list("demo").unwrap(),
        vec!["demo", "demo.A", "demo.A.foo", "demo.helper"]
    );
}

#[test]
fn test_reexported_class_is_written_once() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    indexer.run("demo", &config(true)).unwrap();

    let identities = indexer.store().list("demo").unwrap();
    assert!(identities.contains(&"demo.A".to_string()));
    assert!(!identities.iter().any(|identity| identity.starts_with("demo.B.")));
    assert!(!identities.iter().any(|identity| identity.starts_with("numpy")));
    assert!(!identities.iter().any(|identity| identity.starts_with("builtins")));
}

#[test]
fn test_example_references_are_normalised() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    indexer.run("demo", &config(true)).unwrap();

    let record = indexer.store().read("demo", "demo.A").unwrap();
    assert_eq!(record.refs, vec!["demo", "demo.A", "demo.B"]);
    assert!(record.backrefs.is_empty());

    let [DocBlock::Text { text }, DocBlock::Code { tokens, output }] = record.examples.as_slice()
    else {
        panic!("unexpected examples: {:?}", record.examples);
    };
    assert_eq!(text, "Build one through its re-export:");
    assert_eq!(output, "'foo'");
    let reexport = tokens
        .iter()
        .find(|token| token.text == "A")
        .expect("example mentions A");
    assert_eq!(reexport.reference.as_deref(), Some("demo.A"));
}

#[test]
fn test_see_also_passes_through_unresolvable_citation() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    indexer.run("demo", &config(true)).unwrap();

    let record = indexer.store().read("demo", "demo.helper").unwrap();
    assert_eq!(record.refs, vec!["othermod.helper"]);
    assert_eq!(
        record.signature.as_deref(),
        Some("helper(x, /, y=1, *args, flag, **kwargs)")
    );
}

#[test]
fn test_extra_bindings_seed_example_inference() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    let config = IndexingConfigBuilder::new()
        .threads(1)
        .bind("np", "numpy")
        .build();
    indexer.run("demo", &config).unwrap();

    let record = indexer.store().read("demo", "demo.helper").unwrap();
    assert_eq!(record.refs, vec!["numpy", "numpy.zeros", "othermod.helper"]);
}

#[test]
fn test_runs_without_inference_are_byte_identical() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    let bundle_dir = indexer.store().bundle_dir("demo");

    indexer.run("demo", &config(false)).unwrap();
    let first = read_bundle(&bundle_dir);
    indexer.run("demo", &config(false)).unwrap();
    let second = read_bundle(&bundle_dir);

    assert_eq!(first.len(), 4);
    assert_eq!(first, second);

    let record = indexer.store().read("demo", "demo.A").unwrap();
    assert!(record.refs.is_empty());
    assert!(
        record
            .examples
            .iter()
            .all(|block| !matches!(block, DocBlock::Code { tokens, .. }
                if tokens.iter().any(|token| token.reference.is_some())))
    );
}

#[test]
fn test_artifact_layout() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    indexer.run("demo", &config(true)).unwrap();

    let path = temp_dir.path().join("demo").join("demo.A.json");
    let artifact: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();

    let keys: Vec<&str> = artifact
        .as_object()
        .unwrap()
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(
        keys,
        vec!["backrefs", "examples", "refs", "sections", "signature", "signature_node"]
    );
    assert_eq!(artifact["examples"][0]["type"], "text");
    assert_eq!(artifact["examples"][1]["type"], "code");
    assert_eq!(artifact["examples"][1]["tokens"][0]["category"], "Keyword");
    assert_eq!(artifact["examples"][1]["tokens"][0]["offset"], 0);
    assert_eq!(artifact["sections"]["Summary"], "A demo class.");
    assert_eq!(artifact["backrefs"], serde_json::json!([]));
}

#[test]
fn test_rebuild_clears_stale_artifacts_of_its_namespace_only() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());
    let store = indexer.store();
    fs::create_dir_all(store.bundle_dir("demo")).unwrap();
    fs::create_dir_all(store.bundle_dir("numpy")).unwrap();
    fs::write(store.artifact_path("demo", "demo.removed"), "{}").unwrap();
    fs::write(store.artifact_path("numpy", "numpy.zeros"), "{}").unwrap();

    indexer.run("demo", &config(false)).unwrap();

    assert!(!store.artifact_path("demo", "demo.removed").exists());
    assert_eq!(store.list("numpy").unwrap(), vec!["numpy.zeros"]);
    assert_eq!(
        fs::read_to_string(store.artifact_path("numpy", "numpy.zeros")).unwrap(),
        "{}"
    );
}

#[test]
fn test_raising_oracle_never_aborts_the_run() {
    let temp_dir = TempDir::new().unwrap();
    let indexer =
        create_indexer(temp_dir.path()).with_oracles(Arc::new(ScriptedOracles::failing()));

    let stats = indexer.run("demo", &config(true)).unwrap();
    assert_eq!(stats.written, 4);

    let record = indexer.store().read("demo", "demo.A").unwrap();
    assert!(record.refs.is_empty());
    let helper = indexer.store().read("demo", "demo.helper").unwrap();
    assert_eq!(helper.refs, vec!["othermod.helper"]);
}

#[test]
fn test_root_must_be_a_namespace() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());

    let error = indexer.run("demo.A", &config(false)).unwrap_err();
    assert!(matches!(error, IndexerError::RootNotLoadable { .. }));
}

#[test]
fn test_nested_namespace_can_be_indexed_on_its_own() {
    let temp_dir = TempDir::new().unwrap();
    let indexer = create_indexer(temp_dir.path());

    let stats = indexer.run("demo.B", &config(false)).unwrap();
    // demo.A is reachable from demo.B but declared outside it.
    assert_eq!(stats.symbols_crawled, 1);
    assert_eq!(stats.undocumented, 1);
    assert!(indexer.store().list("demo.B").unwrap().is_empty());
}

#[test]
fn test_unicode_indented_doc_is_indexed_alongside_others() {
    let mut builder = GraphBuilder::new();
    let pkg = builder.namespace("pkg");
    let odd = builder.class("pkg", "Odd");
    let plain = builder.class("pkg", "Plain");
    builder
        .doc(pkg, "The pkg namespace.")
        .doc(odd, "Summary.\n x\n\u{a0}\u{a0}y\n")
        .doc(plain, "Plain docs.")
        .member(pkg, "Odd", odd)
        .member(pkg, "Plain", plain);
    let graph = builder.build().expect("Failed to build graph");

    let temp_dir = TempDir::new().unwrap();
    let indexer = BundleIndexer::new(Arc::new(graph), BundleStore::new(temp_dir.path()));
    let stats = indexer.run("pkg", &config(true)).unwrap();

    assert_eq!(stats.written, 3);
    assert_eq!(stats.failed, 0);
    let record = indexer.store().read("pkg", "pkg.Odd").unwrap();
    assert_eq!(
        record.sections["Summary"],
        SectionValue::Text("Summary.\nx\n\u{a0}y".to_string())
    );
}
