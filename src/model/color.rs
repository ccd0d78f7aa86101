use serde::{Deserialize, Serialize};

use super::FeatureKind;

/// Canonical display color for rendering routes and tracks.
///
/// The variants are exactly the Garmin `DisplayColor_t` vocabulary, so the
/// mapping to and from the wire token is total in both directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DisplayColor {
    Black,
    DarkRed,
    DarkGreen,
    DarkYellow,
    DarkBlue,
    DarkMagenta,
    DarkCyan,
    LightGray,
    DarkGray,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    Transparent,
}

static GARMIN_COLORS: [(DisplayColor, &str); 17] = [
    (DisplayColor::Black, "Black"),
    (DisplayColor::DarkRed, "DarkRed"),
    (DisplayColor::DarkGreen, "DarkGreen"),
    (DisplayColor::DarkYellow, "DarkYellow"),
    (DisplayColor::DarkBlue, "DarkBlue"),
    (DisplayColor::DarkMagenta, "DarkMagenta"),
    (DisplayColor::DarkCyan, "DarkCyan"),
    (DisplayColor::LightGray, "LightGray"),
    (DisplayColor::DarkGray, "DarkGray"),
    (DisplayColor::Red, "Red"),
    (DisplayColor::Green, "Green"),
    (DisplayColor::Yellow, "Yellow"),
    (DisplayColor::Blue, "Blue"),
    (DisplayColor::Magenta, "Magenta"),
    (DisplayColor::Cyan, "Cyan"),
    (DisplayColor::White, "White"),
    (DisplayColor::Transparent, "Transparent"),
];

impl DisplayColor {
    /// The fallback color for each feature kind.
    pub fn default_for(kind: FeatureKind) -> Self {
        match kind {
            FeatureKind::Track => Self::DarkGray,
            FeatureKind::Route | FeatureKind::Waypoint | FeatureKind::RoutePoint => Self::Magenta,
        }
    }

    /// Look up a Garmin token, case-insensitively. Unknown or missing tokens
    /// yield `default`.
    pub fn from_garmin(token: Option<&str>, default: Self) -> Self {
        token
            .map(str::trim)
            .and_then(|t| {
                GARMIN_COLORS
                    .iter()
                    .find(|(_, name)| name.eq_ignore_ascii_case(t))
            })
            .map(|(color, _)| *color)
            .unwrap_or(default)
    }

    pub fn garmin_name(&self) -> &'static str {
        self.entry().1
    }

    fn entry(&self) -> &'static (DisplayColor, &'static str) {
        // the table lists every variant in declaration order
        &GARMIN_COLORS[*self as usize]
    }
}
