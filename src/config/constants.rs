pub mod compile_time {
    pub mod files {
        /// Config file names expected inside the skin's shortcuts folder.
        pub const MENUS_FILE: &str = "menus.xml";
        pub const WIDGETS_FILE: &str = "widgets.xml";
        pub const BACKGROUNDS_FILE: &str = "backgrounds.xml";
        pub const PROPERTIES_FILE: &str = "properties.xml";
        pub const TEMPLATES_FILE: &str = "templates.xml";
        pub const VIEWS_FILE: &str = "views.xml";

        /// Default output file name when the caller supplies a directory.
        pub const INCLUDES_FILE: &str = "script-skinshortcuts-includes.xml";

        /// Default fingerprint file name.
        pub const HASHES_FILE: &str = "skinshortcuts.hashes";
    }

    pub mod menus {
        /// Fallback icon for user-created items with no icon selected.
        pub const DEFAULT_ICON: &str = "DefaultShortcut.png";

        /// Action assigned to user-created items with no action selected.
        pub const DEFAULT_ACTION: &str = "noop";

        /// Container id used for visibility predicates when a menu does not
        /// declare one.
        pub const DEFAULT_CONTAINER: &str = "9000";

        /// Widget target used when a widget declares none.
        pub const DEFAULT_TARGET: &str = "videos";

        /// Number of custom widget slots probed per item
        /// (customWidget, customWidget.2 .. customWidget.N).
        pub const CUSTOM_WIDGET_SLOTS: usize = 10;
    }

    pub mod views {
        /// Expression name prefix when views.xml declares none.
        pub const DEFAULT_VIEW_PREFIX: &str = "ShortcutView_";
    }

    pub mod conditions {
        /// Maximum recursion depth while evaluating a condition.
        /// Deeper input is treated as unsatisfiable rather than recursed into.
        pub const MAX_CONDITION_DEPTH: usize = 64;
    }

    pub mod expressions {
        /// Maximum nesting depth for $EXP[...] expansion. Expansion beyond
        /// this leaves the reference untouched.
        pub const MAX_EXPRESSION_DEPTH: usize = 16;
    }

    pub mod templates {
        /// Maximum depth for <skinshortcuts include="..."/> splicing.
        pub const MAX_INCLUDE_DEPTH: usize = 16;

        /// Maximum depth for nested variableGroup references.
        pub const MAX_VARIABLE_GROUP_DEPTH: usize = 16;

        /// Maximum element-processing recursion depth per controls tree.
        pub const MAX_ELEMENT_DEPTH: usize = 128;
    }

    pub mod logging {
        /// Total in-memory log event buffer size.
        pub const LOG_BUFFER_SIZE: usize = 10_000;

        /// Per-file event cap inside the error collector.
        pub const MAX_LOG_EVENTS_PER_FILE: usize = 200;

        /// Log messages longer than this are truncated by the collector.
        pub const MAX_LOG_MESSAGE_LENGTH: usize = 4_096;
    }
}
