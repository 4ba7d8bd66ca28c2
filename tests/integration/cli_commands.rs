use crate::integration::support::read;
use clap::Parser;
use notestore::config::NotestoreConfig;
use notestore::confirm::OverwritePolicy;
use notestore::tooling::cli::{Cli, CliContext};
use notestore::ApiError;
use tempfile::tempdir;

fn run(context: &CliContext, args: &[&str]) -> Result<String, ApiError> {
    let mut argv = vec!["notestore"];
    argv.extend_from_slice(args);
    let cli = Cli::try_parse_from(argv).unwrap();
    context.execute(&cli.command)
}

fn source_dir(base: &std::path::Path) -> std::path::PathBuf {
    let source = base.join("source");
    std::fs::create_dir_all(source.join("notes")).unwrap();
    std::fs::write(source.join("notes").join("todo.txt"), "buy milk").unwrap();
    std::fs::write(source.join("readme.md"), "hello world").unwrap();
    source
}

#[test]
fn from_dir_then_tree_lists_nodes() {
    let dir = tempdir().unwrap();
    let source = source_dir(dir.path());
    let storage = dir.path().join("nb");
    let context = CliContext::with_config(NotestoreConfig::default(), true);

    let output = run(&context, &["from-dir", source.to_str().unwrap(), storage.to_str().unwrap()]).unwrap();
    assert!(output.contains("Wrote"));
    // notes=1, todo.txt=2, readme.md=3
    assert_eq!(read(&storage.join("subnodes.lst")), "1,3");
    assert_eq!(read(&storage.join("1/subnodes.lst")), "2");

    let json = run(&context, &["tree", storage.to_str().unwrap(), "--format", "json"]).unwrap();
    let nodes: serde_json::Value = serde_json::from_str(&json).unwrap();
    let names: Vec<&str> = nodes
        .as_array()
        .unwrap()
        .iter()
        .map(|node| node["properties"]["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["notes", "todo.txt", "readme.md"]);

    let text = run(&context, &["tree", storage.to_str().unwrap()]).unwrap();
    assert!(text.contains("todo.txt"));
}

#[test]
fn edits_are_synced_in_place() {
    let dir = tempdir().unwrap();
    let source = source_dir(dir.path());
    let storage = dir.path().join("nb");
    let storage_arg = storage.to_str().unwrap();
    let context = CliContext::with_config(NotestoreConfig::default(), true);
    run(&context, &["from-dir", source.to_str().unwrap(), storage_arg]).unwrap();

    let output = run(&context, &["rename", storage_arg, "3", "README"]).unwrap();
    assert!(output.contains("Synced"));
    assert!(read(&storage.join("3/node.xml")).contains("name=\"README\""));

    run(&context, &["bookmark", storage_arg, "2"]).unwrap();
    assert_eq!(read(&storage.join("bookmarks.lst")), "2");

    run(&context, &["delete", storage_arg, "1"]).unwrap();
    assert!(!storage.join("1").exists());
    assert_eq!(read(&storage.join("subnodes.lst")), "3");
    assert!(!storage.join("bookmarks.lst").exists());

    let err = run(&context, &["rename", storage_arg, "1", "gone"]).unwrap_err();
    assert!(matches!(err, ApiError::NodeNotFound(1)));
}

#[test]
fn export_selection_through_cli() {
    let dir = tempdir().unwrap();
    let source = source_dir(dir.path());
    let storage = dir.path().join("nb");
    let target = dir.path().join("out");
    let context = CliContext::with_config(NotestoreConfig::default(), true);
    run(&context, &["from-dir", source.to_str().unwrap(), storage.to_str().unwrap()]).unwrap();

    run(
        &context,
        &[
            "export",
            storage.to_str().unwrap(),
            target.to_str().unwrap(),
            "--node",
            "3",
            "--range",
            "6",
            "-1",
        ],
    )
    .unwrap();
    assert_eq!(read(&target.join("subnodes.lst")), "3");
    let document = read(&target.join("3/node.xml"));
    assert!(document.contains("<rich_text>world</rich_text>"));
}

#[test]
fn never_policy_declines_existing_target() {
    let dir = tempdir().unwrap();
    let source = source_dir(dir.path());
    let storage = dir.path().join("nb");
    std::fs::create_dir(&storage).unwrap();

    let mut config = NotestoreConfig::default();
    config.storage.overwrite = OverwritePolicy::Never;
    let context = CliContext::with_config(config, false);
    let output = run(&context, &["from-dir", source.to_str().unwrap(), storage.to_str().unwrap()]).unwrap();
    assert!(output.contains("declined"));
    assert!(!storage.join("subnodes.lst").exists());
}
