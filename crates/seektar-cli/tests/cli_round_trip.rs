#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
//! Round-trip tests for the seektar subcommands
//!
//! Commands are parsed with clap and run in-process against temporary
//! directories; their output is captured in a buffer.

use std::fs;
use std::path::Path;

use clap::Parser;
use pretty_assertions::assert_eq;
use seektar_cli::{CliConfig, default_index_path, run};
use seektar_format::{ArchiveIndex, ArchiveWriter};

fn seektar(args: &[&str]) -> anyhow::Result<Vec<u8>> {
    let config = CliConfig::try_parse_from(std::iter::once("seektar").chain(args.iter().copied()))
        .expect("arguments should parse");
    config.validate()?;
    let mut out = Vec::new();
    run(&config, &mut out)?;
    Ok(out)
}

fn path_str(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

fn write_inputs(dir: &Path) -> Vec<String> {
    let inputs = [
        ("alpha.txt", b"alpha contents".to_vec()),
        ("beta.bin", vec![0xab; 5000]),
        ("empty", Vec::new()),
    ];
    inputs
        .iter()
        .map(|(name, data)| {
            let path = dir.join(name);
            fs::write(&path, data).unwrap();
            path_str(&path).to_string()
        })
        .collect()
}

fn pack(dir: &Path) -> String {
    let archive = dir.join("bundle.tar.gz");
    let inputs = write_inputs(dir);
    let mut args = vec!["pack", path_str(&archive)];
    args.extend(inputs.iter().map(String::as_str));
    seektar(&args).unwrap();
    path_str(&archive).to_string()
}

#[test]
fn pack_writes_archive_and_index() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());

    let index = ArchiveIndex::load(default_index_path(Path::new(&archive))).unwrap();
    let names: Vec<&str> = index.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["alpha.txt", "beta.bin", "empty"]);
    assert_eq!(
        index.archive_len(),
        Some(fs::metadata(&archive).unwrap().len())
    );
}

#[test]
fn list_text_and_json() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());

    let text = String::from_utf8(seektar(&["list", &archive]).unwrap()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].ends_with("  alpha.txt"));
    assert!(lines[1].trim_start().starts_with("5000"));

    let json = seektar(&["--format", "json", "list", &archive]).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value[2]["name"], "empty");
    assert_eq!(value[2]["size"], 0);
}

#[test]
fn list_from_index_shows_offsets() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());
    let index = default_index_path(Path::new(&archive));

    let json = seektar(&[
        "list",
        &archive,
        "--index",
        path_str(&index),
        "--format",
        "json",
    ])
    .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();
    assert_eq!(value[0]["start"], 0);
    assert_eq!(value[1]["start"], value[0]["end"]);
}

#[test]
fn cat_by_scan_and_by_index() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());
    let index = default_index_path(Path::new(&archive));

    assert_eq!(
        seektar(&["cat", &archive, "alpha.txt"]).unwrap(),
        b"alpha contents"
    );
    assert_eq!(
        seektar(&["cat", &archive, "beta.bin", "--index", path_str(&index)]).unwrap(),
        vec![0xab; 5000]
    );
    assert!(seektar(&["cat", &archive, "missing"]).is_err());
}

#[test]
fn extract_restores_files() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());
    let output = dir.path().join("out");

    seektar(&["extract", &archive, "-o", path_str(&output)]).unwrap();

    assert_eq!(
        fs::read(output.join("alpha.txt")).unwrap(),
        b"alpha contents"
    );
    assert_eq!(fs::read(output.join("beta.bin")).unwrap(), vec![0xab; 5000]);
    assert!(fs::read(output.join("empty")).unwrap().is_empty());
}

#[test]
fn extract_refuses_path_traversal() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("evil.tar.gz");
    let output = dir.path().join("out");

    let mut writer = ArchiveWriter::create(&archive).unwrap();
    writer.append("../escaped", b"gotcha").unwrap();
    writer.finish().unwrap();

    let result = seektar(&["extract", path_str(&archive), "-o", path_str(&output)]);
    let error = result.expect_err("traversal must be refused");
    assert!(error.to_string().contains("../escaped"));
    assert!(!dir.path().join("escaped").exists());
}

#[test]
fn reindex_matches_pack_index() {
    let dir = tempfile::tempdir().unwrap();
    let archive = pack(dir.path());
    let packed = ArchiveIndex::load(default_index_path(Path::new(&archive))).unwrap();

    let rebuilt_path = dir.path().join("rebuilt.json");
    seektar(&["reindex", &archive, "--index", path_str(&rebuilt_path)]).unwrap();

    assert_eq!(ArchiveIndex::load(&rebuilt_path).unwrap(), packed);
}

#[test]
fn pack_rejects_bad_level_and_directories() {
    let dir = tempfile::tempdir().unwrap();
    let archive = dir.path().join("x.tar.gz");
    let input = dir.path().join("input");
    fs::write(&input, b"x").unwrap();

    assert!(
        seektar(&[
            "pack",
            "--level",
            "10",
            path_str(&archive),
            path_str(&input)
        ])
        .is_err()
    );
    assert!(seektar(&["pack", path_str(&archive), path_str(dir.path())]).is_err());
}

#[test]
fn pack_with_path_names() {
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("nested");
    fs::create_dir(&nested).unwrap();
    fs::write(nested.join("leaf.txt"), b"leaf").unwrap();

    let archive = dir.path().join("paths.tar.gz");
    let index_path = dir.path().join("paths.json");
    seektar(&[
        "pack",
        "--name-from",
        "path",
        "--index",
        path_str(&index_path),
        path_str(&archive),
        path_str(&nested.join("leaf.txt")),
    ])
    .unwrap();

    let index = ArchiveIndex::load(&index_path).unwrap();
    let name = &index.iter().next().unwrap().name;
    assert!(name.ends_with("nested/leaf.txt"));
    assert!(!name.starts_with('/'));
}
