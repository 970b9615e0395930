//! Typed configuration errors, one variant per config file.

use thiserror::Error;

fn fmt_line(line: &Option<u32>) -> String {
    match line {
        Some(line) => format!(":{}", line),
        None => String::new(),
    }
}

/// Error in a configuration file, carrying the file path and, when known,
/// the 1-based source line.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("{file}{}: {message}", fmt_line(.line))]
    Menu {
        file: String,
        line: Option<u32>,
        message: String,
    },

    #[error("{file}{}: {message}", fmt_line(.line))]
    Widget {
        file: String,
        line: Option<u32>,
        message: String,
    },

    #[error("{file}{}: {message}", fmt_line(.line))]
    Background {
        file: String,
        line: Option<u32>,
        message: String,
    },

    #[error("{file}{}: {message}", fmt_line(.line))]
    Property {
        file: String,
        line: Option<u32>,
        message: String,
    },

    #[error("{file}{}: {message}", fmt_line(.line))]
    Template {
        file: String,
        line: Option<u32>,
        message: String,
    },

    #[error("{file}{}: {message}", fmt_line(.line))]
    View {
        file: String,
        line: Option<u32>,
        message: String,
    },
}

impl ConfigError {
    pub fn menu(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Menu {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn widget(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Widget {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn background(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Background {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn property(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Property {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn template(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::Template {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn view(file: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::View {
            file: file.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn with_line(mut self, new_line: u32) -> Self {
        match &mut self {
            ConfigError::Menu { line, .. }
            | ConfigError::Widget { line, .. }
            | ConfigError::Background { line, .. }
            | ConfigError::Property { line, .. }
            | ConfigError::Template { line, .. }
            | ConfigError::View { line, .. } => *line = Some(new_line),
        }
        self
    }

    pub fn file(&self) -> &str {
        match self {
            ConfigError::Menu { file, .. }
            | ConfigError::Widget { file, .. }
            | ConfigError::Background { file, .. }
            | ConfigError::Property { file, .. }
            | ConfigError::Template { file, .. }
            | ConfigError::View { file, .. } => file,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::Menu { .. } => "menu",
            ConfigError::Widget { .. } => "widget",
            ConfigError::Background { .. } => "background",
            ConfigError::Property { .. } => "property",
            ConfigError::Template { .. } => "template",
            ConfigError::View { .. } => "view",
        }
    }

    /// Logging code matching this error's file kind.
    pub fn code(&self) -> crate::logging::Code {
        use crate::logging::codes::config;
        match self {
            ConfigError::Menu { .. } => config::MENU_CONFIG_ERROR,
            ConfigError::Widget { .. } => config::WIDGET_CONFIG_ERROR,
            ConfigError::Background { .. } => config::BACKGROUND_CONFIG_ERROR,
            ConfigError::Property { .. } => config::PROPERTY_CONFIG_ERROR,
            ConfigError::Template { .. } => config::TEMPLATE_CONFIG_ERROR,
            ConfigError::View { .. } => config::VIEW_CONFIG_ERROR,
        }
    }
}
