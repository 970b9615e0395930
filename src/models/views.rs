//! View models.

/// A view definition that can be assigned to content types.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct View {
    pub id: String,
    pub label: String,
    pub icon: String,
}

/// A content type with detection rule and available views.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewContent {
    pub name: String,
    pub label: String,
    /// Host-runtime predicate detecting this content, passed through.
    pub visible: String,
    pub views: Vec<String>,
    pub library_default: String,
    pub plugin_default: String,
    pub icon: String,
}

impl ViewContent {
    pub fn get_default(&self, is_plugin: bool) -> &str {
        if is_plugin && !self.plugin_default.is_empty() {
            &self.plugin_default
        } else {
            &self.library_default
        }
    }
}

/// View configuration loaded from views.xml.
#[derive(Debug, Clone, Default)]
pub struct ViewConfig {
    pub views: Vec<View>,
    pub content_rules: Vec<ViewContent>,
    pub prefix: String,
}

impl ViewConfig {
    pub fn get_view(&self, view_id: &str) -> Option<&View> {
        self.views.iter().find(|v| v.id == view_id)
    }

    pub fn get_content(&self, name: &str) -> Option<&ViewContent> {
        self.content_rules.iter().find(|c| c.name == name)
    }

    pub fn get_views_for_content(&self, name: &str) -> Vec<&View> {
        let Some(content) = self.get_content(name) else {
            return Vec::new();
        };
        content
            .views
            .iter()
            .filter_map(|id| self.get_view(id))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ViewConfig {
        ViewConfig {
            views: vec![
                View {
                    id: "50".into(),
                    label: "List".into(),
                    icon: String::new(),
                },
                View {
                    id: "51".into(),
                    label: "Poster".into(),
                    icon: String::new(),
                },
            ],
            content_rules: vec![ViewContent {
                name: "movies".into(),
                label: "Movies".into(),
                visible: "Container.Content(movies)".into(),
                views: vec!["50".into(), "51".into()],
                library_default: "51".into(),
                plugin_default: "50".into(),
                icon: String::new(),
            }],
            prefix: "ShortcutView_".into(),
        }
    }

    #[test]
    fn test_get_default() {
        let config = config();
        let content = config.get_content("movies").unwrap();
        assert_eq!(content.get_default(false), "51");
        assert_eq!(content.get_default(true), "50");
    }

    #[test]
    fn test_views_for_content() {
        let config = config();
        let views = config.get_views_for_content("movies");
        assert_eq!(views.len(), 2);
        assert!(config.get_views_for_content("tvshows").is_empty());
    }
}
