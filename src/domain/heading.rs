// Heading quadrant bucketing for the point layer and its legend
use serde::Serialize;

pub const DEFAULT_HEADING_COLOR: &str = "#ffffb2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HeadingQuadrant {
    NorthEast,
    NorthWest,
    SouthWest,
    SouthEast,
}

impl HeadingQuadrant {
    pub const ALL: [HeadingQuadrant; 4] = [
        HeadingQuadrant::NorthEast,
        HeadingQuadrant::NorthWest,
        HeadingQuadrant::SouthWest,
        HeadingQuadrant::SouthEast,
    ];

    /// `[0, 90]`, `(90, 180]`, `(180, 270]`, `(270, 360]`. Anything else,
    /// NaN included, has no quadrant.
    pub fn classify(heading: f64) -> Option<Self> {
        if !(0.0..=360.0).contains(&heading) {
            return None;
        }
        Some(if heading <= 90.0 {
            HeadingQuadrant::NorthEast
        } else if heading <= 180.0 {
            HeadingQuadrant::NorthWest
        } else if heading <= 270.0 {
            HeadingQuadrant::SouthWest
        } else {
            HeadingQuadrant::SouthEast
        })
    }

    pub fn color(self) -> &'static str {
        match self {
            HeadingQuadrant::NorthEast => "#DAF7A6",
            HeadingQuadrant::NorthWest => "#FFC300",
            HeadingQuadrant::SouthWest => "#FF5733",
            HeadingQuadrant::SouthEast => "#C70039",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            HeadingQuadrant::NorthEast => "0-90 North-East",
            HeadingQuadrant::NorthWest => "91-180 North-West",
            HeadingQuadrant::SouthWest => "181-270 South-West",
            HeadingQuadrant::SouthEast => "271-360 South-East",
        }
    }
}

pub fn heading_color(heading: f64) -> &'static str {
    HeadingQuadrant::classify(heading)
        .map(HeadingQuadrant::color)
        .unwrap_or(DEFAULT_HEADING_COLOR)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: &'static str,
}

/// Legend of the point layer. The default color is deliberately absent.
pub fn heading_legend() -> Vec<LegendEntry> {
    HeadingQuadrant::ALL
        .iter()
        .map(|q| LegendEntry {
            label: q.label(),
            color: q.color(),
        })
        .collect()
}
