//! Move.toml discovery and named-address rewriting.

use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::domain::error::{DeployError, Result};

/// Package manifest filename.
pub const MANIFEST_FILE: &str = "Move.toml";

/// Required source subdirectory next to the manifest.
pub const SOURCES_DIR: &str = "sources";

/// Locate the root-most `Move.toml` under `root`.
///
/// The traversal is iterative with an explicit queue so adversarially deep
/// archives cannot exhaust the stack. Each directory is checked for the
/// manifest before any of its children are enqueued, and shallower
/// directories drain first, so a manifest at the tree root always wins over
/// a nested duplicate.
pub fn locate_manifest(root: &Path) -> Result<PathBuf> {
    let mut queue = VecDeque::from([root.to_path_buf()]);
    while let Some(dir) = queue.pop_front() {
        let candidate = dir.join(MANIFEST_FILE);
        if candidate.is_file() {
            return Ok(candidate);
        }

        let mut children: Vec<PathBuf> = fs::read_dir(&dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_dir())
            .collect();
        children.sort();
        queue.extend(children);
    }
    Err(DeployError::ManifestNotFound)
}

/// Check the structural requirements of an extracted package and return the
/// package root (the directory containing the manifest).
///
/// Fails fast when no manifest exists or when the `sources/` directory is
/// missing next to it, before any external invocation happens.
pub fn validate_package(root: &Path) -> Result<PathBuf> {
    let manifest = locate_manifest(root)?;
    let package_root = manifest
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());
    if !package_root.join(SOURCES_DIR).is_dir() {
        return Err(DeployError::SourcesMissing(package_root));
    }
    Ok(package_root)
}

/// Async wrapper for [`validate_package`].
pub async fn validate_package_async(root: PathBuf) -> Result<PathBuf> {
    tokio::task::spawn_blocking(move || validate_package(&root))
        .await
        .map_err(|e| DeployError::Io(io::Error::other(e)))?
}

/// Merge `bindings` into the manifest's `[addresses]` table.
///
/// When the section exists its entire body is replaced with the union of
/// existing and new bindings, new bindings winning on name conflicts; when
/// it does not, a fresh section is appended. Applying the same binding set
/// twice yields the same resolved table.
pub fn merge_named_addresses(
    manifest_path: &Path,
    bindings: &BTreeMap<String, String>,
) -> Result<()> {
    if bindings.is_empty() {
        return Ok(());
    }

    let text = fs::read_to_string(manifest_path)?;
    let merged = merge_into_text(&text, bindings);

    // A rewrite that breaks the manifest must surface here, not as an opaque
    // compile failure later.
    toml::from_str::<toml::Value>(&merged).map_err(|e| {
        DeployError::InvalidNamedAddresses(format!("manifest rewrite produced invalid TOML: {e}"))
    })?;

    fs::write(manifest_path, merged)?;
    Ok(())
}

/// Async wrapper for [`merge_named_addresses`].
pub async fn merge_named_addresses_async(
    manifest_path: PathBuf,
    bindings: BTreeMap<String, String>,
) -> Result<()> {
    tokio::task::spawn_blocking(move || merge_named_addresses(&manifest_path, &bindings))
        .await
        .map_err(|e| DeployError::Io(io::Error::other(e)))?
}

/// Addresses already declared in the manifest text.
///
/// A manifest that does not parse contributes nothing; the rewrite then
/// degrades to a destructive replacement with just the caller's bindings.
fn existing_addresses(text: &str) -> BTreeMap<String, String> {
    let Ok(value) = toml::from_str::<toml::Value>(text) else {
        return BTreeMap::new();
    };
    let Some(table) = value.get("addresses").and_then(|v| v.as_table()) else {
        return BTreeMap::new();
    };
    table
        .iter()
        .filter_map(|(name, value)| value.as_str().map(|addr| (name.clone(), addr.to_string())))
        .collect()
}

fn merge_into_text(text: &str, bindings: &BTreeMap<String, String>) -> String {
    let mut union = existing_addresses(text);
    for (name, address) in bindings {
        union.insert(name.clone(), address.clone());
    }
    let body = union
        .iter()
        .map(|(name, address)| format!("{name} = \"{address}\""))
        .collect::<Vec<_>>()
        .join("\n");

    let mut out: Vec<String> = Vec::new();
    let mut lines = text.lines();
    let mut replaced = false;
    while let Some(line) = lines.next() {
        if line.trim() == "[addresses]" {
            replaced = true;
            out.push("[addresses]".to_string());
            out.push(body.clone());
            // Drop the old section body up to the next section header.
            for rest in lines.by_ref() {
                if rest.trim_start().starts_with('[') {
                    out.push(rest.to_string());
                    break;
                }
            }
        } else {
            out.push(line.to_string());
        }
    }

    if !replaced {
        if !out.last().map(|l| l.is_empty()).unwrap_or(true) {
            out.push(String::new());
        }
        out.push("[addresses]".to_string());
        out.push(body);
    }

    let mut merged = out.join("\n");
    merged.push('\n');
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bindings(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn resolved_addresses(text: &str) -> BTreeMap<String, String> {
        existing_addresses(text)
    }

    #[test]
    fn test_locate_manifest_prefers_tree_root() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("nested/deeper")).unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "[package]").unwrap();
        fs::write(dir.path().join("nested/deeper/Move.toml"), "[package]").unwrap();

        let found = locate_manifest(dir.path()).unwrap();
        assert_eq!(found, dir.path().join(MANIFEST_FILE));
    }

    #[test]
    fn test_locate_manifest_descends_when_root_is_bare() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("pkg/sources")).unwrap();
        fs::write(dir.path().join("pkg/Move.toml"), "[package]").unwrap();

        let found = locate_manifest(dir.path()).unwrap();
        assert_eq!(found, dir.path().join("pkg/Move.toml"));
    }

    #[test]
    fn test_locate_manifest_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            locate_manifest(dir.path()),
            Err(DeployError::ManifestNotFound)
        ));
    }

    #[test]
    fn test_validate_package_requires_sources() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "[package]").unwrap();
        assert!(matches!(
            validate_package(dir.path()),
            Err(DeployError::SourcesMissing(_))
        ));

        fs::create_dir_all(dir.path().join(SOURCES_DIR)).unwrap();
        let root = validate_package(dir.path()).unwrap();
        assert_eq!(root, dir.path());
    }

    #[test]
    fn test_merge_appends_missing_section() {
        let text = "[package]\nname = \"demo\"\nversion = \"1.0.0\"\n";
        let merged = merge_into_text(text, &bindings(&[("counter", "0xcafe")]));

        assert!(merged.contains("[addresses]"));
        let resolved = resolved_addresses(&merged);
        assert_eq!(resolved.get("counter").map(String::as_str), Some("0xcafe"));
        // The rest of the manifest is untouched.
        assert!(merged.contains("name = \"demo\""));
    }

    #[test]
    fn test_merge_replaces_section_body_with_union() {
        let text = concat!(
            "[package]\nname = \"demo\"\n\n",
            "[addresses]\ncounter = \"0x1\"\nkept = \"0x7\"\n\n",
            "[dependencies]\nAptosFramework = { local = \"../framework\" }\n",
        );
        let merged = merge_into_text(text, &bindings(&[("counter", "0xcafe")]));

        let resolved = resolved_addresses(&merged);
        // New binding overrides the conflict, the non-conflicting entry stays.
        assert_eq!(resolved.get("counter").map(String::as_str), Some("0xcafe"));
        assert_eq!(resolved.get("kept").map(String::as_str), Some("0x7"));
        // Following sections survive the splice.
        assert!(merged.contains("[dependencies]"));
        assert!(merged.contains("AptosFramework"));
    }

    #[test]
    fn test_merge_is_idempotent() {
        let text = "[package]\nname = \"demo\"\n\n[addresses]\nold = \"0x2\"\n";
        let set = bindings(&[("counter", "0xcafe"), ("admin", "0x9")]);

        let once = merge_into_text(text, &set);
        let twice = merge_into_text(&once, &set);

        assert_eq!(resolved_addresses(&once), resolved_addresses(&twice));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_writes_valid_toml_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "[package]\nname = \"demo\"\n").unwrap();

        merge_named_addresses(&path, &bindings(&[("counter", "0xcafe")])).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        let resolved = resolved_addresses(&written);
        assert_eq!(resolved.get("counter").map(String::as_str), Some("0xcafe"));
    }

    #[test]
    fn test_merge_with_empty_bindings_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "[package]\nname = \"demo\"\n").unwrap();

        merge_named_addresses(&path, &BTreeMap::new()).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "[package]\nname = \"demo\"\n"
        );
    }
}
