//! End-to-end tests for the repository build.
//!
//! Each test lays out a small project (`pcm/metadata.base.json` plus a
//! `lib-content/` tree) in a scratch directory and checks the generated
//! `dist/` files against the archive and index contracts.

use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use chrono::{TimeZone, Utc};
use kicad_pcm_builder::config::Config;
use kicad_pcm_builder::pcm::checksum::sha256_file;
use kicad_pcm_builder::pcm::index::{PackagesIndex, RepositoryIndex};
use kicad_pcm_builder::pcm::{
    BuildError, BuildRequest, GithubRepo, ReleaseVersion, RepositoryBuilder, VersionStatus,
};
use tempfile::TempDir;

const IDENTIFIER: &str = "com.github.degesz.test-lib";

const METADATA: &str = r#"{
    "$schema": "https://go.kicad.org/pcm/schemas/v1",
    "name": "Test Library",
    "description": "Connector symbols and footprints",
    "description_full": "Connector symbols, footprints and 3D models for testing.",
    "identifier": "com.github.degesz.test-lib",
    "type": "library",
    "author": { "name": "degesz", "contact": { "github": "https://github.com/degesz" } },
    "license": "CC-BY-SA-4.0",
    "resources": { "homepage": "https://github.com/degesz/test-lib" },
    "kicad_version": "7.0"
}"#;

const SYMBOL: &str = "(kicad_symbol_lib (version 20231120))\n";
const ICON: &[u8] = b"\x89PNG\r\n\x1a\n fake icon";
const FOOTPRINT: &str = "(footprint \"J1\" (layer \"F.Cu\"))\n";

fn project() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = dir.path();
    fs::create_dir_all(root.join("pcm")).unwrap();
    fs::write(root.join("pcm/metadata.base.json"), METADATA).unwrap();
    fs::create_dir_all(root.join("lib-content/symbols")).unwrap();
    fs::create_dir_all(root.join("lib-content/footprints/Conn.pretty")).unwrap();
    fs::write(root.join("lib-content/symbols/Conn.kicad_sym"), SYMBOL).unwrap();
    fs::write(
        root.join("lib-content/footprints/Conn.pretty/J1.kicad_mod"),
        FOOTPRINT,
    )
    .unwrap();
    dir
}

fn request(root: &Path, version: &str) -> BuildRequest {
    BuildRequest {
        root: root.to_path_buf(),
        version: ReleaseVersion::parse(version).unwrap(),
        status: VersionStatus::Stable,
        github: GithubRepo::new("degesz", "test-lib", "main"),
        append: false,
    }
}

fn builder() -> RepositoryBuilder {
    RepositoryBuilder::new(Config::default()).unwrap()
}

fn read_entry_bytes(archive: &Path, name: &str) -> Vec<u8> {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut bytes = Vec::new();
    zip.by_name(name)
        .unwrap_or_else(|_| panic!("{name} missing from archive"))
        .read_to_end(&mut bytes)
        .unwrap();
    bytes
}

fn read_entry(archive: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut text = String::new();
    zip.by_name(name)
        .unwrap_or_else(|_| panic!("{name} missing from archive"))
        .read_to_string(&mut text)
        .unwrap();
    text
}

fn load_packages(root: &Path) -> PackagesIndex {
    serde_json::from_slice(&fs::read(root.join("dist/packages.json")).unwrap()).unwrap()
}

fn load_repository(root: &Path) -> RepositoryIndex {
    serde_json::from_slice(&fs::read(root.join("dist/repository.json")).unwrap()).unwrap()
}

// =============================================================================
// Output layout and checksums
// =============================================================================

#[test]
fn archive_is_named_by_identifier_and_version() {
    let dir = project();
    let report = builder().build(&request(dir.path(), "1.0.0")).unwrap();

    let expected = dir
        .path()
        .join("dist/releases/com.github.degesz.test-lib_v1.0.0_pcm.zip");
    assert_eq!(report.archive_path, expected);
    assert!(expected.is_file());
    assert!(dir.path().join("dist/packages.json").is_file());
    assert!(dir.path().join("dist/repository.json").is_file());
    assert!(dir.path().join("dist/resources.zip").is_file());
    assert_eq!(
        report.download_url,
        "https://github.com/degesz/test-lib/releases/download/v1.0.0/\
         com.github.degesz.test-lib_v1.0.0_pcm.zip"
    );
    assert_eq!(
        report.repository_url,
        "https://raw.githubusercontent.com/degesz/test-lib/main/dist/repository.json"
    );
}

#[test]
fn packages_checksum_matches_archive() {
    let dir = project();
    let report = builder().build(&request(dir.path(), "1.0.0")).unwrap();

    let actual = sha256_file(&report.archive_path).unwrap();
    let packages = load_packages(dir.path());
    assert_eq!(packages.packages.len(), 1);

    let release = &packages.packages[0].versions[0];
    assert_eq!(release.version.as_str(), "1.0.0");
    assert_eq!(release.download_sha256.as_deref(), Some(actual.sha256.as_str()));
    assert_eq!(release.download_size, Some(actual.size));
    assert_eq!(
        release.install_size,
        Some((SYMBOL.len() + FOOTPRINT.len()) as u64)
    );
    assert_eq!(release.kicad_version, "7.0");
    assert_eq!(release.status, VersionStatus::Stable);
}

#[test]
fn repository_checksums_match_published_files() {
    let dir = project();
    let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    builder().build_at(&request(dir.path(), "1.0.0"), now).unwrap();

    let repository = load_repository(dir.path());
    let packages_sha = sha256_file(&dir.path().join("dist/packages.json"))
        .unwrap()
        .sha256;
    let resources_sha = sha256_file(&dir.path().join("dist/resources.zip"))
        .unwrap()
        .sha256;

    assert_eq!(repository.packages.sha256, packages_sha);
    assert_eq!(
        repository.packages.url,
        "https://raw.githubusercontent.com/degesz/test-lib/main/dist/packages.json"
    );
    assert_eq!(repository.packages.update_time_utc, "2025-06-01 12:00:00");
    assert_eq!(repository.packages.update_timestamp, now.timestamp());
    assert_eq!(repository.resources.unwrap().sha256, resources_sha);
    assert_eq!(repository.name, "test-lib PCM repository");
    assert_eq!(repository.maintainer.name, "degesz");
}

#[test]
fn rebuilding_produces_identical_archives() {
    let dir = project();
    let first = builder().build(&request(dir.path(), "1.0.0")).unwrap();
    let first_bytes = fs::read(&first.archive_path).unwrap();
    let first_packages = fs::read(dir.path().join("dist/packages.json")).unwrap();

    let second = builder().build(&request(dir.path(), "1.0.0")).unwrap();
    let second_bytes = fs::read(&second.archive_path).unwrap();
    let second_packages = fs::read(dir.path().join("dist/packages.json")).unwrap();

    assert_eq!(first_bytes, second_bytes);
    assert_eq!(first.archive.sha256, second.archive.sha256);
    assert_eq!(first_packages, second_packages);
}

// =============================================================================
// Archive contents
// =============================================================================

#[test]
fn archive_holds_content_and_generated_metadata() {
    let dir = project();
    let report = builder().build(&request(dir.path(), "2.1")).unwrap();

    let zip = zip::ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
    let mut names: Vec<&str> = zip.file_names().collect();
    names.sort_unstable();
    assert_eq!(
        names,
        vec![
            "footprints/Conn.pretty/J1.kicad_mod",
            "metadata.json",
            "symbols/Conn.kicad_sym",
        ]
    );

    assert_eq!(read_entry(&report.archive_path, "symbols/Conn.kicad_sym"), SYMBOL);

    let metadata: serde_json::Value =
        serde_json::from_str(&read_entry(&report.archive_path, "metadata.json")).unwrap();
    assert_eq!(metadata["identifier"], IDENTIFIER);
    assert!(metadata.get("kicad_version").is_none());
    let versions = metadata["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0]["version"], "2.1");
    assert_eq!(versions[0]["kicad_version"], "7.0");
    assert!(versions[0].get("download_sha256").is_none());
}

#[test]
fn icon_is_packaged_and_published_as_resource() {
    let dir = project();
    fs::write(dir.path().join("pcm/icon.png"), ICON).unwrap();

    let report = builder().build(&request(dir.path(), "1.0.0")).unwrap();
    assert_eq!(
        read_entry_bytes(&report.archive_path, "resources/icon.png"),
        ICON
    );

    let resources = dir.path().join("dist/resources.zip");
    let zip = zip::ZipArchive::new(File::open(resources).unwrap()).unwrap();
    let names: Vec<&str> = zip.file_names().collect();
    assert_eq!(names, vec!["com.github.degesz.test-lib/icon.png"]);
}

#[test]
fn exclude_patterns_keep_files_out_of_the_archive() {
    let dir = project();
    fs::write(dir.path().join("lib-content/symbols/Conn.kicad_sym.bak"), "old").unwrap();
    let mut config = Config::default();
    config.exclude = vec!["**/*.bak".to_string()];

    let report = RepositoryBuilder::new(config)
        .unwrap()
        .build(&request(dir.path(), "1.0.0"))
        .unwrap();
    let zip = zip::ZipArchive::new(File::open(&report.archive_path).unwrap()).unwrap();
    assert!(zip.file_names().all(|n| !n.ends_with(".bak")));
    assert_eq!(report.install_size, (SYMBOL.len() + FOOTPRINT.len()) as u64);
}

// =============================================================================
// Appending releases
// =============================================================================

#[test]
fn append_keeps_previous_releases() {
    let dir = project();
    builder().build(&request(dir.path(), "1.0.0")).unwrap();

    let mut next = request(dir.path(), "1.1.0");
    next.append = true;
    let report = builder().build(&next).unwrap();
    assert_eq!(report.release_count, 2);

    let packages = load_packages(dir.path());
    let versions: Vec<&str> = packages.packages[0]
        .versions
        .iter()
        .map(|v| v.version.as_str())
        .collect();
    assert_eq!(versions, vec!["1.1.0", "1.0.0"]);
}

#[test]
fn append_replaces_same_version() {
    let dir = project();
    builder().build(&request(dir.path(), "1.0.0")).unwrap();

    let mut again = request(dir.path(), "1.0.0");
    again.append = true;
    again.status = VersionStatus::Deprecated;
    builder().build(&again).unwrap();

    let packages = load_packages(dir.path());
    assert_eq!(packages.packages[0].versions.len(), 1);
    assert_eq!(
        packages.packages[0].versions[0].status,
        VersionStatus::Deprecated
    );
}

#[test]
fn without_append_only_current_release_is_listed() {
    let dir = project();
    builder().build(&request(dir.path(), "1.0.0")).unwrap();
    builder().build(&request(dir.path(), "1.1.0")).unwrap();

    let packages = load_packages(dir.path());
    assert_eq!(packages.packages[0].versions.len(), 1);
    assert!(!dir
        .path()
        .join("dist/releases/com.github.degesz.test-lib_v1.0.0_pcm.zip")
        .exists());
}

// =============================================================================
// Failures leave no output
// =============================================================================

fn leftover_entries(root: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(root)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

#[test]
fn missing_content_writes_nothing() {
    let dir = project();
    fs::remove_dir_all(dir.path().join("lib-content")).unwrap();

    let err = builder().build(&request(dir.path(), "1.0.0")).unwrap_err();
    assert!(matches!(err, BuildError::ContentNotFound { .. }));
    assert!(err.is_input_error());
    assert!(!dir.path().join("dist").exists());
    assert_eq!(leftover_entries(dir.path()), vec!["pcm".to_string()]);
}

#[test]
fn failed_build_keeps_previous_output() {
    let dir = project();
    builder().build(&request(dir.path(), "1.0.0")).unwrap();
    let before = fs::read(dir.path().join("dist/packages.json")).unwrap();

    fs::write(dir.path().join("pcm/metadata.base.json"), "{ broken").unwrap();
    let err = builder().build(&request(dir.path(), "1.1.0")).unwrap_err();
    assert!(matches!(err, BuildError::MalformedMetadata { .. }));

    let after = fs::read(dir.path().join("dist/packages.json")).unwrap();
    assert_eq!(before, after);
    assert_eq!(
        leftover_entries(dir.path()),
        vec!["dist".to_string(), "lib-content".to_string(), "pcm".to_string()]
    );
}

fn snapshot(dir: &Path) -> Vec<(String, Vec<u8>)> {
    let mut files: Vec<(String, Vec<u8>)> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(dir).unwrap().to_string_lossy().into_owned();
            (relative, fs::read(e.path()).unwrap())
        })
        .collect();
    files.sort();
    files
}

#[test]
fn write_failure_after_staging_keeps_previous_output() {
    let dir = project();
    builder().build(&request(dir.path(), "1.0.0")).unwrap();
    let before = snapshot(&dir.path().join("dist"));

    // Valid version, but the archive file name exceeds the filesystem limit.
    let long_version = format!("1.{}", "0".repeat(300));
    let err = builder()
        .build(&request(dir.path(), &long_version))
        .unwrap_err();
    assert!(matches!(err, BuildError::FileWrite { .. }), "{err:?}");
    assert!(!err.is_input_error());

    assert_eq!(snapshot(&dir.path().join("dist")), before);
    assert_eq!(
        leftover_entries(dir.path()),
        vec!["dist".to_string(), "lib-content".to_string(), "pcm".to_string()]
    );
}

#[test]
fn empty_content_is_rejected() {
    let dir = project();
    fs::remove_dir_all(dir.path().join("lib-content")).unwrap();
    fs::create_dir_all(dir.path().join("lib-content/symbols")).unwrap();

    let err = builder().build(&request(dir.path(), "1.0.0")).unwrap_err();
    assert!(matches!(err, BuildError::ContentEmpty { .. }));
    assert!(!dir.path().join("dist").exists());
}

#[test]
fn missing_metadata_is_rejected() {
    let dir = project();
    fs::remove_file(dir.path().join("pcm/metadata.base.json")).unwrap();

    let err = builder().build(&request(dir.path(), "1.0.0")).unwrap_err();
    assert!(matches!(err, BuildError::MetadataNotFound { .. }));
    assert!(!dir.path().join("dist").exists());
}
