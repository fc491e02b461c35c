// src/backend/fingerprint.rs

//! Input fingerprints for no-op detection.
//!
//! A fingerprint is a blake3 hash over every file matching a project's
//! `inputs` globs. After a step succeeds its fingerprint is stored under
//! `<project>/<step>`; if the next submission of that step sees the same
//! fingerprint, the backend reports a no-op instead of starting anything.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use blake3::Hasher;
use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, info};

/// Relative path (from the backend root) to the fingerprints file.
pub const FINGERPRINT_FILE_PATH: &str = ".tierflow/fingerprints";

/// Directories never descended into when collecting inputs.
const SKIPPED_DIRS: &[&str] = &[".git", ".tierflow", "target"];

fn fingerprint_file_path(root: &Path) -> PathBuf {
    root.join(FINGERPRINT_FILE_PATH)
}

/// Key under which a step's fingerprint is stored.
pub fn fingerprint_key(project: &str, step: &str) -> String {
    format!("{project}/{step}")
}

/// Compute the hash of a single file.
pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = File::open(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Fingerprint the files under `root` matching `patterns`.
///
/// Returns `None` when there are no patterns or nothing matches: without
/// inputs there is no way to tell whether a step's output is current.
pub fn compute_fingerprint(root: &Path, patterns: &[String]) -> Result<Option<String>> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let globs = build_globset(patterns)?;
    let mut matched = Vec::new();
    collect_matching_files(root, root, &globs, &mut matched)?;

    if matched.is_empty() {
        debug!(?patterns, "no input files matched; fingerprint unavailable");
        return Ok(None);
    }

    // Sort so the hash is independent of directory iteration order.
    matched.sort();

    let mut hasher = Hasher::new();
    for (rel, path) in matched {
        let file_hash = compute_file_hash(&path)?;
        hasher.update(rel.as_bytes());
        hasher.update(file_hash.as_bytes());
    }

    let hash = hasher.finalize().to_hex().to_string();
    debug!(hash = %hash, "computed input fingerprint");
    Ok(Some(hash))
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid input glob pattern '{}'", pattern))?;
        builder.add(glob);
    }
    builder.build().context("building input globset")
}

fn collect_matching_files(
    root: &Path,
    dir: &Path,
    globs: &GlobSet,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("reading dir {:?}", dir))? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        let path = entry.path();

        // Symlinked directories are not followed; they can form cycles.
        if file_type.is_symlink() && path.is_dir() {
            continue;
        }

        if file_type.is_dir() {
            let skipped = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| SKIPPED_DIRS.contains(&n));
            if !skipped {
                collect_matching_files(root, &path, globs, out)?;
            }
            continue;
        }

        let Ok(rel) = path.strip_prefix(root) else {
            continue;
        };
        // Globs are written with forward slashes on every platform.
        let rel = rel.to_string_lossy().replace('\\', "/");
        if globs.is_match(&rel) {
            out.push((rel, path));
        }
    }
    Ok(())
}

/// Abstract storage for step fingerprints.
pub trait FingerprintStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>>;
    fn save(&mut self, key: &str, hash: &str) -> Result<()>;
}

/// Stores fingerprints in a file (`.tierflow/fingerprints`).
pub struct FileFingerprintStore {
    root: PathBuf,
}

impl FileFingerprintStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl FingerprintStore for FileFingerprintStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let map = load_all_fingerprints(&self.root)?;
        Ok(map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        let mut map = load_all_fingerprints(&self.root)?;
        map.insert(key.to_string(), hash.to_string());
        save_all_fingerprints(&self.root, &map)?;
        info!(key = %key, hash = %hash, "stored step fingerprint (file)");
        Ok(())
    }
}

/// Stores fingerprints in memory only.
#[derive(Default)]
pub struct MemoryFingerprintStore {
    map: HashMap<String, String>,
}

impl MemoryFingerprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FingerprintStore for MemoryFingerprintStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn save(&mut self, key: &str, hash: &str) -> Result<()> {
        self.map.insert(key.to_string(), hash.to_string());
        info!(key = %key, hash = %hash, "stored step fingerprint (memory)");
        Ok(())
    }
}

/// Load all stored fingerprints from `<root>/.tierflow/fingerprints`.
///
/// Each line is `<key> <hash>`; keys may contain spaces, hashes never do.
fn load_all_fingerprints(root: &Path) -> Result<HashMap<String, String>> {
    let path = fingerprint_file_path(root);

    if !path.exists() {
        return Ok(HashMap::new());
    }

    let file = File::open(&path)
        .with_context(|| format!("opening fingerprint file at {:?}", path))?;
    let reader = BufReader::new(file);

    let mut map = HashMap::new();

    for line_res in reader.lines() {
        let line = line_res?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some((key, hash)) = trimmed.rsplit_once(char::is_whitespace) {
            map.insert(key.trim().to_string(), hash.to_string());
        }
    }

    Ok(map)
}

/// Persist all fingerprints to `<root>/.tierflow/fingerprints`.
fn save_all_fingerprints(root: &Path, map: &HashMap<String, String>) -> Result<()> {
    let path = fingerprint_file_path(root);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("creating fingerprint directory at {:?}", parent)
        })?;
    }

    let file = File::create(&path)
        .with_context(|| format!("creating fingerprint file at {:?}", path))?;
    let mut writer = BufWriter::new(file);

    let mut entries: Vec<_> = map.iter().collect();
    entries.sort();
    for (key, hash) in entries {
        writeln!(writer, "{} {}", key, hash)?;
    }

    writer.flush()?;
    Ok(())
}
