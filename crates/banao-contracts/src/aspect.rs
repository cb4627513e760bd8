use std::fmt;
use std::str::FromStr;

/// Output aspect ratio requested for a composite.
///
/// The set is closed; `Original` defers to the person image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AspectRatio {
    #[default]
    Original,
    Portrait9x16,
    Landscape16x9,
    Classic3x2,
    Standard4x3,
}

impl AspectRatio {
    /// Display order, `Original` first.
    pub const ALL: [AspectRatio; 5] = [
        AspectRatio::Original,
        AspectRatio::Portrait9x16,
        AspectRatio::Landscape16x9,
        AspectRatio::Classic3x2,
        AspectRatio::Standard4x3,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AspectRatio::Original => "Original",
            AspectRatio::Portrait9x16 => "9:16",
            AspectRatio::Landscape16x9 => "16:9",
            AspectRatio::Classic3x2 => "3:2",
            AspectRatio::Standard4x3 => "4:3",
        }
    }

    pub fn is_original(self) -> bool {
        matches!(self, AspectRatio::Original)
    }

    pub fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|ratio| ratio.label()).collect()
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let normalized = raw.trim();
        if normalized.eq_ignore_ascii_case("original") {
            return Ok(AspectRatio::Original);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|ratio| ratio.label() == normalized)
            .ok_or_else(|| {
                format!(
                    "unsupported aspect ratio '{normalized}' (expected one of: {})",
                    Self::labels().join(", ")
                )
            })
    }
}
