//! XML loaders: one per declarative configuration file, plus shared
//! parse helpers and the suffix transformer.

pub mod background;
pub mod base;
pub mod error;
pub mod menu;
pub mod property;
pub mod template;
pub mod views;
pub mod widget;

pub use background::load_backgrounds;
pub use base::{apply_suffix_to_condition, apply_suffix_to_from, strip_nosuffix_markers};
pub use error::ConfigError;
pub use menu::load_menus;
pub use property::load_properties;
pub use template::load_templates;
pub use views::load_views;
pub use widget::load_widgets;

use std::path::Path;

/// Read a config file that is allowed to be absent.
///
/// `Ok(None)` means the file does not exist; read failures on an existing
/// file are configuration errors.
pub(crate) fn read_optional_file<F>(path: &Path, make_error: F) -> Result<Option<String>, ConfigError>
where
    F: FnOnce(String) -> ConfigError,
{
    if !path.exists() {
        return Ok(None);
    }
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) => Err(make_error(format!("Failed to read file: {}", e))),
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::io::Write;
    use std::path::{Path, PathBuf};

    /// Temp directory removed on drop. Unique per test thread.
    pub struct TempDirGuard(PathBuf);

    impl TempDirGuard {
        pub fn path(&self) -> &Path {
            &self.0
        }

        pub fn write_file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.0.join(name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            let mut handle = std::fs::File::create(&path).unwrap();
            handle.write_all(content.as_bytes()).unwrap();
            path
        }
    }

    impl Drop for TempDirGuard {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    pub fn tempdir(tag: &str) -> TempDirGuard {
        use std::sync::atomic::{AtomicUsize, Ordering};
        static COUNTER: AtomicUsize = AtomicUsize::new(0);

        let mut path = std::env::temp_dir();
        path.push(format!(
            "skinc-test-{}-{}-{}",
            tag,
            std::process::id(),
            COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        std::fs::create_dir_all(&path).unwrap();
        TempDirGuard(path)
    }
}
