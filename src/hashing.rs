//! Rebuild gate: content fingerprints over every build input.
//!
//! Fingerprints are SHA-256 hex digests of the configuration files, the
//! user-data file, build metadata, and the previously written output files.
//! The stored map decides whether the pipeline runs at all.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::constants::compile_time::files;
use crate::log_debug;

/// Sentinel digest for inputs that do not exist.
pub const MISSING: &str = "missing";

/// Hex SHA-256 of a file's content, or None when it cannot be read.
pub fn hash_file(path: &Path) -> Option<String> {
    let bytes = std::fs::read(path).ok()?;
    Some(hash_bytes(&bytes))
}

/// Hex SHA-256 of a byte slice.
pub fn hash_bytes(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();

    let mut out = String::with_capacity(64);
    for byte in digest.as_slice() {
        let _ = write!(&mut out, "{:02x}", byte);
    }
    out
}

/// The rebuild gate for one build invocation.
#[derive(Debug, Clone)]
pub struct HashGate {
    pub shortcuts_dir: PathBuf,
    pub userdata_path: Option<PathBuf>,
    pub hash_path: PathBuf,
    pub output_paths: Vec<PathBuf>,
    pub metadata: BTreeMap<String, String>,
}

impl HashGate {
    pub fn new(
        shortcuts_dir: PathBuf,
        userdata_path: Option<PathBuf>,
        hash_path: PathBuf,
        output_paths: Vec<PathBuf>,
    ) -> Self {
        Self {
            shortcuts_dir,
            userdata_path,
            hash_path,
            output_paths,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    const CONFIG_FILES: [&'static str; 6] = [
        files::MENUS_FILE,
        files::WIDGETS_FILE,
        files::BACKGROUNDS_FILE,
        files::PROPERTIES_FILE,
        files::TEMPLATES_FILE,
        files::VIEWS_FILE,
    ];

    /// Fingerprint every input: config files by name, the user-data file,
    /// and each metadata key. Deterministic for equal inputs.
    pub fn generate_fingerprints(&self) -> BTreeMap<String, String> {
        let mut fingerprints = BTreeMap::new();

        for file_name in Self::CONFIG_FILES {
            let digest = hash_file(&self.shortcuts_dir.join(file_name))
                .unwrap_or_else(|| MISSING.to_string());
            fingerprints.insert(file_name.to_string(), digest);
        }

        if let Some(userdata_path) = &self.userdata_path {
            let digest = hash_file(userdata_path).unwrap_or_else(|| MISSING.to_string());
            fingerprints.insert("userdata".to_string(), digest);
        }

        for (key, value) in &self.metadata {
            fingerprints.insert(key.clone(), value.clone());
        }

        fingerprints
    }

    fn read_stored(&self) -> Option<BTreeMap<String, String>> {
        let content = std::fs::read_to_string(&self.hash_path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// True iff an output file is missing or changed, no stored fingerprints
    /// exist, or any current fingerprint differs from the stored one.
    pub fn needs_rebuild(&self) -> bool {
        let Some(stored) = self.read_stored() else {
            log_debug!("Rebuild needed: no stored fingerprints");
            return true;
        };
        if stored.is_empty() {
            log_debug!("Rebuild needed: empty fingerprint store");
            return true;
        }

        for output_path in &self.output_paths {
            let Some(current) = hash_file(output_path) else {
                log_debug!("Rebuild needed: output missing",
                    "path" => output_path.display()
                );
                return true;
            };
            let key = output_key(output_path);
            if stored.get(&key).map(String::as_str) != Some(current.as_str()) {
                log_debug!("Rebuild needed: output does not match stored digest",
                    "path" => output_path.display()
                );
                return true;
            }
        }

        let current = self.generate_fingerprints();
        for (key, value) in &current {
            if stored.get(key) != Some(value) {
                log_debug!("Rebuild needed: input changed", "input" => key);
                return true;
            }
        }

        log_debug!("No rebuild needed");
        false
    }

    /// Persist the current fingerprints plus digests of the just-written
    /// output files. Called only after a successful build.
    pub fn store(&self) -> std::io::Result<()> {
        let mut fingerprints = self.generate_fingerprints();

        for output_path in &self.output_paths {
            if let Some(digest) = hash_file(output_path) {
                fingerprints.insert(output_key(output_path), digest);
            }
        }

        let mut payload = serde_json::to_vec_pretty(&fingerprints)?;
        payload.push(b'\n');
        crate::utils::xml::atomic_write(&self.hash_path, &payload)
    }
}

fn output_key(path: &Path) -> String {
    format!("includes:{}", path.display())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::testutil::tempdir;

    fn gate(dir: &crate::loaders::testutil::TempDirGuard) -> HashGate {
        HashGate::new(
            dir.path().to_path_buf(),
            Some(dir.path().join("user.json")),
            dir.path().join("store.hashes"),
            vec![dir.path().join("out/includes.xml")],
        )
        .with_metadata("script_version", "0.3.0")
        .with_metadata("skin_dir", "skin.test")
    }

    #[test]
    fn test_hash_bytes_is_deterministic() {
        assert_eq!(hash_bytes(b"abc"), hash_bytes(b"abc"));
        assert_ne!(hash_bytes(b"abc"), hash_bytes(b"abd"));
        assert_eq!(hash_bytes(b"abc").len(), 64);
    }

    #[test]
    fn test_missing_sentinel() {
        let dir = tempdir("hash");
        let gate = gate(&dir);
        let fingerprints = gate.generate_fingerprints();
        assert_eq!(fingerprints["menus.xml"], MISSING);
        assert_eq!(fingerprints["userdata"], MISSING);
        assert_eq!(fingerprints["skin_dir"], "skin.test");
    }

    #[test]
    fn test_rebuild_cycle() {
        let dir = tempdir("hash");
        dir.write_file("menus.xml", "<menus/>");
        let gate = gate(&dir);

        // Nothing stored yet.
        assert!(gate.needs_rebuild());

        // Simulate a build: write the output, persist fingerprints.
        dir.write_file("out/includes.xml", "<includes/>");
        gate.store().unwrap();
        assert!(!gate.needs_rebuild());

        // Input change invalidates.
        dir.write_file("menus.xml", "<menus><menu name=\"m\"/></menus>");
        assert!(gate.needs_rebuild());

        gate.store().unwrap();
        assert!(!gate.needs_rebuild());

        // Output tampering invalidates.
        dir.write_file("out/includes.xml", "<includes><tampered/></includes>");
        assert!(gate.needs_rebuild());

        // Output removal invalidates.
        std::fs::remove_file(dir.path().join("out/includes.xml")).unwrap();
        assert!(gate.needs_rebuild());
    }

    #[test]
    fn test_metadata_change_invalidates() {
        let dir = tempdir("hash");
        dir.write_file("out/includes.xml", "<includes/>");
        let gate_a = gate(&dir);
        gate_a.store().unwrap();
        assert!(!gate_a.needs_rebuild());

        let gate_b = gate(&dir).with_metadata("script_version", "0.4.0");
        assert!(gate_b.needs_rebuild());
    }

    #[test]
    fn test_corrupt_store_degrades_to_rebuild() {
        let dir = tempdir("hash");
        dir.write_file("store.hashes", "{corrupt");
        dir.write_file("out/includes.xml", "<includes/>");
        assert!(gate(&dir).needs_rebuild());
    }
}
