//! Build pipeline entry points.
//!
//! A build invocation runs the hash gate, loads every configuration file,
//! overlays user data, assembles the output document, writes it atomically
//! to every output path, and persists the fingerprints.

mod error;

pub use error::BuildError;

use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::builders::{IncludesBuilder, TemplateError};
use crate::config::constants::compile_time::files;
use crate::hashing::HashGate;
use crate::loaders::{self, ConfigError};
use crate::logging::{self, codes};
use crate::models::{
    BackgroundConfig, MenuConfig, PropertySchema, TemplateSchema, ViewConfig, WidgetConfig,
};
use crate::userdata::{load_userdata, merge_menus, save_userdata, UserData};
use crate::utils::xml::{atomic_write, serialize_document};
use crate::{log_debug, log_error, log_info, log_success};

/// Every declarative configuration file, loaded and typed.
#[derive(Debug, Clone, Default)]
pub struct SkinConfig {
    pub menus: MenuConfig,
    pub widgets: WidgetConfig,
    pub backgrounds: BackgroundConfig,
    pub properties: PropertySchema,
    pub templates: TemplateSchema,
    pub views: ViewConfig,
}

impl SkinConfig {
    /// Load all configuration files from the shortcuts directory.
    /// Loader errors are fatal for the build.
    pub fn load(shortcuts_dir: &Path) -> Result<Self, ConfigError> {
        let menus = load_with_context(shortcuts_dir, files::MENUS_FILE, loaders::load_menus)?;
        let widgets = load_with_context(shortcuts_dir, files::WIDGETS_FILE, loaders::load_widgets)?;
        let backgrounds = load_with_context(
            shortcuts_dir,
            files::BACKGROUNDS_FILE,
            loaders::load_backgrounds,
        )?;
        let properties = load_with_context(
            shortcuts_dir,
            files::PROPERTIES_FILE,
            loaders::load_properties,
        )?;
        let templates = load_with_context(
            shortcuts_dir,
            files::TEMPLATES_FILE,
            loaders::load_templates,
        )?;
        let views = load_with_context(shortcuts_dir, files::VIEWS_FILE, loaders::load_views)?;

        log_success!(codes::success::CONFIG_LOADED, "Configuration loaded",
            "menus" => menus.menus.len(),
            "widgets" => widgets.widgets.len(),
            "backgrounds" => backgrounds.backgrounds.len(),
            "templates" => templates.templates.len(),
            "views" => views.views.len()
        );

        Ok(Self {
            menus,
            widgets,
            backgrounds,
            properties,
            templates,
            views,
        })
    }
}

fn load_with_context<T, F>(shortcuts_dir: &Path, file_name: &str, loader: F) -> Result<T, ConfigError>
where
    F: FnOnce(&Path) -> Result<T, ConfigError>,
{
    let path = shortcuts_dir.join(file_name);
    logging::with_file_context(path.clone(), || {
        loader(&path).inspect_err(|e| {
            log_error!(e.code(), &e.to_string());
        })
    })
}

/// What a build invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildOutcome {
    /// Output written and fingerprints stored.
    Built,
    /// Inputs unchanged; the existing output was left untouched.
    UpToDate,
}

/// Inputs of one build invocation.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub shortcuts_dir: PathBuf,
    /// Output file paths; at least one is required.
    pub output_paths: Vec<PathBuf>,
    pub userdata_path: Option<PathBuf>,
    pub hash_path: PathBuf,
    /// Skin identifier recorded in the fingerprints.
    pub skin_dir: String,
    /// Host major version recorded in the fingerprints.
    pub host_version: String,
    pub force: bool,
}

impl BuildOptions {
    pub fn new(shortcuts_dir: impl Into<PathBuf>, output_paths: Vec<PathBuf>) -> Self {
        let shortcuts_dir = shortcuts_dir.into();
        let hash_path = output_paths
            .first()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| shortcuts_dir.clone())
            .join(files::HASHES_FILE);
        Self {
            shortcuts_dir,
            output_paths,
            userdata_path: None,
            hash_path,
            skin_dir: String::new(),
            host_version: String::new(),
            force: false,
        }
    }

    fn hash_gate(&self) -> HashGate {
        HashGate::new(
            self.shortcuts_dir.clone(),
            self.userdata_path.clone(),
            self.hash_path.clone(),
            self.output_paths.clone(),
        )
        .with_metadata("script_version", env!("CARGO_PKG_VERSION"))
        .with_metadata("skin_dir", &self.skin_dir)
        .with_metadata("host_version", &self.host_version)
    }
}

/// Build the includes document.
///
/// Returns `UpToDate` without touching anything when the fingerprints match
/// and `force` is unset. The fingerprint store is only updated after every
/// output path was written.
pub fn build(options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    let start = Instant::now();

    if options.output_paths.is_empty() {
        log_error!(codes::build::NO_OUTPUT_PATHS, "No output paths configured");
        return Err(BuildError::NoOutputPaths);
    }

    let gate = options.hash_gate();
    if !options.force && !gate.needs_rebuild() {
        log_success!(codes::success::UP_TO_DATE, "Menu is up to date, skipping rebuild");
        return Ok(BuildOutcome::UpToDate);
    }

    log_info!("Starting include build",
        "shortcuts_dir" => options.shortcuts_dir.display(),
        "outputs" => options.output_paths.len(),
        "force" => options.force
    );

    let preferences = crate::config::runtime::BuildPreferences::default();

    let config = SkinConfig::load(&options.shortcuts_dir)?;

    let userdata = match &options.userdata_path {
        Some(path) => load_userdata(path),
        None => UserData::default(),
    };

    let menus = merge_menus(
        &config.menus.menus,
        &userdata,
        &config.menus.action_overrides,
    );
    if preferences.log_stage_metrics {
        log_success!(codes::success::MERGE_COMPLETE, "User data merged",
            "menus" => menus.len(),
            "overrides" => userdata.menus.len()
        );
    }

    let builder = IncludesBuilder::new(
        &menus,
        Some(&config.templates),
        Some(&config.properties),
        Some(&config.views),
        Some(&userdata),
    );
    let root = builder.build();
    if preferences.log_stage_metrics {
        log_success!(codes::success::TEMPLATES_BUILT, "Output document assembled",
            "root_children" => root.children.len()
        );
    }

    let bytes = serialize_document(&root)
        .map_err(|e| BuildError::Template(TemplateError::Serialize(e)))?;

    for output_path in &options.output_paths {
        atomic_write(output_path, &bytes).map_err(|e| {
            log_error!(codes::build::OUTPUT_WRITE_FAILED, "Failed to write output",
                "path" => output_path.display(),
                "error" => e
            );
            BuildError::OutputWrite {
                path: output_path.clone(),
                source: e,
            }
        })?;
        log_success!(codes::success::OUTPUT_WRITTEN, "Output written",
            "path" => output_path.display()
        );
    }

    // A failed fingerprint store only costs a spurious rebuild next time.
    match gate.store() {
        Ok(()) => log_success!(codes::success::FINGERPRINTS_STORED, "Fingerprints stored"),
        Err(e) => log_error!(codes::build::HASH_WRITE_FAILED,
            "Failed to store fingerprints",
            "path" => options.hash_path.display(),
            "error" => e
        ),
    }

    log_success!(codes::success::BUILD_COMPLETE, "Build complete",
        "duration_ms" => start.elapsed().as_secs_f64() * 1000.0
    );

    Ok(BuildOutcome::Built)
}

fn userdata_path_or_error(options: &BuildOptions) -> Result<&Path, BuildError> {
    options
        .userdata_path
        .as_deref()
        .ok_or(BuildError::NoUserDataPath)
}

fn save_and_rebuild(
    options: &BuildOptions,
    userdata: &UserData,
    path: &Path,
) -> Result<BuildOutcome, BuildError> {
    save_userdata(userdata, path).map_err(|e| BuildError::UserDataWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut forced = options.clone();
    forced.force = true;
    build(&forced)
}

/// Delete all user customizations and rebuild.
pub fn reset_all(options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    if let Some(path) = &options.userdata_path {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| BuildError::UserDataWrite {
                path: path.clone(),
                source: e,
            })?;
            log_info!("Deleted user data", "path" => path.display());
        }
    }

    let mut forced = options.clone();
    forced.force = true;
    build(&forced)
}

/// Reset menu customizations, keeping view selections, and rebuild.
pub fn reset_menus(options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    let path = userdata_path_or_error(options)?;
    let mut userdata = load_userdata(path);
    userdata.menus.clear();
    log_info!("Reset all menus (views preserved)");
    save_and_rebuild(options, &userdata, path)
}

/// Reset view selections, keeping menu customizations, and rebuild.
pub fn reset_views(options: &BuildOptions) -> Result<BuildOutcome, BuildError> {
    let path = userdata_path_or_error(options)?;
    let mut userdata = load_userdata(path);
    userdata.clear_all_views();
    log_info!("Reset all view selections");
    save_and_rebuild(options, &userdata, path)
}

/// Clear a custom widget slot: drop the widget menu override and the
/// associated widget properties from the item, then rebuild.
pub fn clear_custom_widget(
    options: &BuildOptions,
    menu_name: &str,
    item_name: &str,
    slot_suffix: &str,
    property_prefix: &str,
) -> Result<BuildOutcome, BuildError> {
    let path = userdata_path_or_error(options)?;
    let mut userdata = load_userdata(path);

    let widget_menu_name = format!(
        "{}.customwidget{}",
        item_name,
        slot_suffix.replace('.', "")
    );
    userdata.menus.shift_remove(&widget_menu_name);

    if let Some(menu_override) = userdata.menus.get_mut(menu_name) {
        if let Some(item_override) = menu_override
            .items
            .iter_mut()
            .find(|o| o.name == item_name)
        {
            item_override
                .properties
                .shift_remove(&format!("customWidget{}", slot_suffix));
            if !property_prefix.is_empty() {
                for key in ["", "Name", "Path", "Type", "Target", "Label"] {
                    item_override
                        .properties
                        .shift_remove(&format!("{}{}{}", property_prefix, key, slot_suffix));
                }
            }
        }
    }

    log_debug!("Cleared custom widget",
        "menu" => menu_name,
        "item" => item_name,
        "suffix" => slot_suffix
    );

    save_and_rebuild(options, &userdata, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loaders::testutil::tempdir;

    const MENUS: &str = r#"<menus>
        <menu name="mainmenu" container="9000">
            <item name="movies" label="Movies" icon="m.png">
                <onclick>ActivateWindow(Videos,videodb://movies/,return)</onclick>
                <property name="widgetPath">videodb://recentlyaddedmovies/</property>
            </item>
            <item name="settings" label="Settings">
                <onclick>ActivateWindow(Settings)</onclick>
            </item>
        </menu>
        <submenu name="movies">
            <item name="recent" label="Recent">
                <onclick>Go()</onclick>
            </item>
        </submenu>
    </menus>"#;

    const TEMPLATES: &str = r#"<templates>
        <template include="widget" idprefix="801">
            <condition>widgetPath</condition>
            <property name="content" from="widgetPath"/>
            <controls>
                <control type="list" id="$PROPERTY[id]">
                    <content>$PROPERTY[content]</content>
                    <skinshortcuts>visibility</skinshortcuts>
                </control>
            </controls>
        </template>
    </templates>"#;

    fn options(dir: &crate::loaders::testutil::TempDirGuard) -> BuildOptions {
        let mut options = BuildOptions::new(
            dir.path().to_path_buf(),
            vec![dir.path().join("out/includes.xml")],
        );
        options.userdata_path = Some(dir.path().join("user.json"));
        options.skin_dir = "skin.test".to_string();
        options.host_version = "21".to_string();
        options
    }

    #[test]
    fn test_end_to_end_build() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", MENUS);
        dir.write_file("templates.xml", TEMPLATES);

        let options = options(&dir);
        let outcome = build(&options).unwrap();
        assert_eq!(outcome, BuildOutcome::Built);

        let output = std::fs::read_to_string(dir.path().join("out/includes.xml")).unwrap();
        assert!(output.starts_with("<?xml"));
        assert!(output.contains("<include name=\"skinshortcuts-mainmenu\">"));
        assert!(output.contains("<include name=\"skinshortcuts-mainmenu-submenu\">"));
        assert!(output.contains("<include name=\"skinshortcuts-template-widget\">"));
        assert!(output.contains("<content>videodb://recentlyaddedmovies/</content>"));
        assert!(output.contains(
            "String.IsEqual(Container(9000).ListItem.Property(name),movies)"
        ));

        // Second build is gated away.
        let outcome = build(&options).unwrap();
        assert_eq!(outcome, BuildOutcome::UpToDate);

        // Force bypasses the gate.
        let mut forced = options.clone();
        forced.force = true;
        assert_eq!(build(&forced).unwrap(), BuildOutcome::Built);
    }

    #[test]
    fn test_determinism() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", MENUS);
        dir.write_file("templates.xml", TEMPLATES);

        let mut options = options(&dir);
        options.force = true;

        build(&options).unwrap();
        let first = std::fs::read(dir.path().join("out/includes.xml")).unwrap();
        let first_hashes = std::fs::read(&options.hash_path).unwrap();

        build(&options).unwrap();
        let second = std::fs::read(dir.path().join("out/includes.xml")).unwrap();
        let second_hashes = std::fs::read(&options.hash_path).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_hashes, second_hashes);
    }

    #[test]
    fn test_userdata_overlay_applies() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", MENUS);
        dir.write_file(
            "user.json",
            r#"{"menus": {"mainmenu": {"items": [{"name": "movies", "label": "Films"}], "removed": ["settings"]}}}"#,
        );

        let mut options = options(&dir);
        options.force = true;
        build(&options).unwrap();

        let output = std::fs::read_to_string(dir.path().join("out/includes.xml")).unwrap();
        assert!(output.contains("<label>Films</label>"));
        assert!(!output.contains("Settings"));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", "<menus><menu/></menus>");

        let mut options = options(&dir);
        options.force = true;
        let error = build(&options).unwrap_err();
        assert!(matches!(error, BuildError::Config(_)));
        // Failed builds leave no output behind.
        assert!(!dir.path().join("out/includes.xml").exists());
    }

    #[test]
    fn test_no_output_paths() {
        let dir = tempdir("pipeline");
        let mut options = options(&dir);
        options.output_paths.clear();
        assert!(matches!(build(&options), Err(BuildError::NoOutputPaths)));
    }

    #[test]
    fn test_reset_menus_keeps_views() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", MENUS);
        dir.write_file(
            "user.json",
            r#"{"menus": {"mainmenu": {"removed": ["settings"]}}, "views": {"library": {"movies": "51"}}}"#,
        );

        let options = options(&dir);
        reset_menus(&options).unwrap();

        let userdata = load_userdata(&dir.path().join("user.json"));
        assert!(userdata.menus.is_empty());
        assert_eq!(userdata.get_view("library", "movies"), Some("51"));
    }

    #[test]
    fn test_clear_custom_widget() {
        let dir = tempdir("pipeline");
        dir.write_file("menus.xml", MENUS);
        dir.write_file(
            "user.json",
            r#"{"menus": {
                "mainmenu": {"items": [{"name": "movies", "properties": {"customWidget": "movies.customwidget", "widget": "x", "widgetPath": "y"}}]},
                "movies.customwidget": {"items": [{"name": "cw", "label": "CW", "is_new": true}]}
            }}"#,
        );

        let options = options(&dir);
        clear_custom_widget(&options, "mainmenu", "movies", "", "widget").unwrap();

        let userdata = load_userdata(&dir.path().join("user.json"));
        assert!(!userdata.menus.contains_key("movies.customwidget"));
        let item = &userdata.menus["mainmenu"].items[0];
        assert!(!item.properties.contains_key("customWidget"));
        assert!(!item.properties.contains_key("widget"));
        assert!(!item.properties.contains_key("widgetPath"));
    }
}
