use std::fmt;
use std::str::FromStr;

use tracing::{debug, info};

use super::store::PreferenceStore;

pub const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(format!("unknown theme '{other}'")),
        }
    }
}

/// Ambient colour-scheme hint from the platform.
pub trait ColorSchemeSignal {
    /// `Some(true)` when the platform prefers dark, `None` when it says nothing.
    fn prefers_dark(&self) -> Option<bool>;
}

/// Reads the terminal's `COLORFGBG` hint (`fg;bg` or `fg;default;bg`).
#[derive(Debug, Clone, Default)]
pub struct TerminalColorScheme {
    colorfgbg: Option<String>,
}

impl TerminalColorScheme {
    pub fn new(colorfgbg: Option<String>) -> Self {
        Self { colorfgbg }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::var("COLORFGBG").ok())
    }
}

impl ColorSchemeSignal for TerminalColorScheme {
    fn prefers_dark(&self) -> Option<bool> {
        let raw = self.colorfgbg.as_deref()?;
        let background: u8 = raw.rsplit(';').next()?.trim().parse().ok()?;
        Some(matches!(background, 0..=6 | 8))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StaticColorScheme(pub Option<bool>);

impl ColorSchemeSignal for StaticColorScheme {
    fn prefers_dark(&self) -> Option<bool> {
        self.0
    }
}

/// Light/dark preference passed explicitly to whatever renders output.
///
/// Initialization order: persisted value, then the platform signal, then
/// light. Every toggle is persisted under [`THEME_KEY`].
pub struct ThemeContext {
    theme: Theme,
    root_class: &'static str,
    store: Box<dyn PreferenceStore>,
}

impl ThemeContext {
    pub fn initialize(store: Box<dyn PreferenceStore>, signal: &dyn ColorSchemeSignal) -> Self {
        let persisted = store
            .load(THEME_KEY)
            .and_then(|raw| raw.parse::<Theme>().ok());
        let theme = match persisted {
            Some(theme) => theme,
            None => match signal.prefers_dark() {
                Some(true) => Theme::Dark,
                _ => Theme::Light,
            },
        };
        debug!(theme = theme.as_str(), persisted = persisted.is_some(), "theme initialized");
        Self {
            theme,
            root_class: theme.as_str(),
            store,
        }
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Presentation attribute currently applied for the active theme.
    pub fn root_class(&self) -> &'static str {
        self.root_class
    }

    /// Flips the theme, applies it, then persists it.
    ///
    /// The in-memory theme stays flipped even if persistence fails.
    pub fn toggle(&mut self) -> anyhow::Result<Theme> {
        self.theme = self.theme.toggled();
        self.root_class = self.theme.as_str();
        self.store.save(THEME_KEY, self.theme.as_str())?;
        info!(theme = self.theme.as_str(), "theme toggled");
        Ok(self.theme)
    }
}

impl fmt::Debug for ThemeContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThemeContext")
            .field("theme", &self.theme)
            .field("root_class", &self.root_class)
            .finish_non_exhaustive()
    }
}
