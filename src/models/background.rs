//! Background model.

use super::menu::Content;
use super::PropertyMap;

/// How a background resolves its image at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackgroundType {
    #[default]
    Static,
    Playlist,
    Browse,
    Multi,
    Property,
    Live,
    LivePlaylist,
}

impl BackgroundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundType::Static => "static",
            BackgroundType::Playlist => "playlist",
            BackgroundType::Browse => "browse",
            BackgroundType::Multi => "multi",
            BackgroundType::Property => "property",
            BackgroundType::Live => "live",
            BackgroundType::LivePlaylist => "live-playlist",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "static" => Some(BackgroundType::Static),
            "playlist" => Some(BackgroundType::Playlist),
            "browse" => Some(BackgroundType::Browse),
            "multi" => Some(BackgroundType::Multi),
            "property" => Some(BackgroundType::Property),
            "live" => Some(BackgroundType::Live),
            "live-playlist" => Some(BackgroundType::LivePlaylist),
            _ => None,
        }
    }

    /// Types for which a fixed <path> is optional.
    pub fn path_optional(&self) -> bool {
        matches!(
            self,
            BackgroundType::Browse
                | BackgroundType::Multi
                | BackgroundType::Playlist
                | BackgroundType::LivePlaylist
        )
    }
}

/// A source path for playlist scanning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistSource {
    pub label: String,
    pub path: String,
    pub icon: String,
}

/// A source path for browse dialogs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowseSource {
    pub label: String,
    pub path: String,
    pub condition: String,
    pub visible: String,
    pub icon: String,
}

/// A background that can be assigned to menu items.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Background {
    pub name: String,
    pub label: String,
    pub path: String,
    pub background_type: BackgroundType,
    pub icon: String,
    pub condition: String,
    pub visible: String,
    pub sources: Vec<PlaylistSource>,
    pub browse_sources: Vec<BrowseSource>,
}

impl Background {
    /// Convert to the fixed property map exposed to skins.
    pub fn to_properties(&self, prefix: &str) -> PropertyMap {
        let mut props = PropertyMap::new();
        props.insert(prefix.to_string(), self.path.clone());
        props.insert(format!("{}Label", prefix), self.label.clone());
        props.insert(
            format!("{}Type", prefix),
            self.background_type.as_str().to_string(),
        );
        props
    }
}

/// A grouping entry in the background picker.
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundGroupEntry {
    Background(Background),
    Group(BackgroundGroup),
    Content(Content),
}

/// A group/category of backgrounds in the picker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackgroundGroup {
    pub name: String,
    pub label: String,
    pub condition: String,
    pub visible: String,
    pub icon: String,
    pub items: Vec<BackgroundGroupEntry>,
}

/// Background configuration including backgrounds and groupings.
#[derive(Debug, Clone, Default)]
pub struct BackgroundConfig {
    pub backgrounds: Vec<Background>,
    pub groupings: Vec<BackgroundGroupEntry>,
}

impl BackgroundConfig {
    pub fn get_background(&self, name: &str) -> Option<&Background> {
        self.backgrounds.iter().find(|b| b.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_parse_round_trip() {
        for name in [
            "static",
            "playlist",
            "browse",
            "multi",
            "property",
            "live",
            "live-playlist",
        ] {
            let parsed = BackgroundType::parse(name).unwrap();
            assert_eq!(parsed.as_str(), name);
        }
        assert!(BackgroundType::parse("bogus").is_none());
    }

    #[test]
    fn test_path_optional() {
        assert!(BackgroundType::Browse.path_optional());
        assert!(!BackgroundType::Static.path_optional());
        assert!(!BackgroundType::Property.path_optional());
    }

    #[test]
    fn test_to_properties() {
        let bg = Background {
            name: "fanart".into(),
            label: "Fanart".into(),
            path: "special://fanart.jpg".into(),
            background_type: BackgroundType::Static,
            ..Default::default()
        };
        let props = bg.to_properties("background");
        assert_eq!(props.get("background").unwrap(), "special://fanart.jpg");
        assert_eq!(props.get("backgroundLabel").unwrap(), "Fanart");
        assert_eq!(props.get("backgroundType").unwrap(), "static");
    }
}
