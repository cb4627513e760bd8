mod store;
mod theme;

pub use store::{FilePreferenceStore, MemoryPreferenceStore, PreferenceStore, PREFERENCES_ENV};
pub use theme::{
    ColorSchemeSignal, StaticColorScheme, TerminalColorScheme, Theme, ThemeContext, THEME_KEY,
};
