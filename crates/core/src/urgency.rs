//! Collection urgency as reported by the prediction service, plus the
//! colour/label rules used wherever an urgency badge is shown.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Classification thresholds
// ---------------------------------------------------------------------------

/// Fill percentage at or above which a bin is critical.
pub const CRITICAL_FILL_PCT: f64 = 95.0;
/// Fill percentage at or above which a bin is high urgency.
pub const HIGH_FILL_PCT: f64 = 85.0;
/// Fill percentage at or above which a bin is medium urgency.
pub const MEDIUM_FILL_PCT: f64 = 70.0;

/// Hours-until-full at or below which a bin is critical.
pub const CRITICAL_HOURS: f64 = 2.0;
/// Hours-until-full at or below which a bin is high urgency.
pub const HIGH_HOURS: f64 = 12.0;
/// Hours-until-full at or below which a bin is medium urgency.
pub const MEDIUM_HOURS: f64 = 24.0;

// ---------------------------------------------------------------------------
// Indicator colours
// ---------------------------------------------------------------------------

/// Colour of a status indicator (badge, dot, marker).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorColor {
    Red,
    Orange,
    Yellow,
    Green,
}

impl IndicatorColor {
    /// Hex colour used for map markers and terminal output.
    pub fn hex(self) -> &'static str {
        match self {
            Self::Red => "#EF4444",
            Self::Orange => "#F97316",
            Self::Yellow => "#F59E0B",
            Self::Green => "#10B981",
        }
    }
}

// ---------------------------------------------------------------------------
// Urgency
// ---------------------------------------------------------------------------

/// How soon a bin needs collecting. Ordered from least to most urgent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl Urgency {
    /// Classify a bin from its fill percentage and projected hours until full.
    pub fn classify(fill_pct: f64, hours_until_full: f64) -> Self {
        if fill_pct >= CRITICAL_FILL_PCT || hours_until_full <= CRITICAL_HOURS {
            Self::Critical
        } else if fill_pct >= HIGH_FILL_PCT || hours_until_full <= HIGH_HOURS {
            Self::High
        } else if fill_pct >= MEDIUM_FILL_PCT || hours_until_full <= MEDIUM_HOURS {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Parse a wire value, treating anything unrecognized as [`Urgency::Low`].
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or(Self::Low)
    }

    /// Lowercase wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }

    /// Uppercase label shown on badges.
    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Badge colour.
    pub fn color(self) -> IndicatorColor {
        match self {
            Self::Critical => IndicatorColor::Red,
            Self::High => IndicatorColor::Orange,
            Self::Medium => IndicatorColor::Yellow,
            Self::Low => IndicatorColor::Green,
        }
    }

    /// Sort key used when ordering bins for collection (critical first).
    pub fn priority(self) -> u8 {
        match self {
            Self::Critical => 0,
            Self::High => 1,
            Self::Medium => 2,
            Self::Low => 3,
        }
    }

    /// The full badge (colour + label) for display.
    pub fn badge(self) -> UrgencyBadge {
        UrgencyBadge {
            color: self.color(),
            label: self.label(),
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Urgency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(CoreError::UnknownVariant {
                kind: "urgency",
                value: s.to_string(),
            }),
        }
    }
}

/// A rendered urgency indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UrgencyBadge {
    pub color: IndicatorColor,
    pub label: &'static str,
}

/// Human-readable time until a bin is full.
///
/// Under an hour shows minutes, under a day shows hours, otherwise days
/// plus remaining hours.
pub fn format_hours_until_full(hours: f64) -> String {
    if hours < 1.0 {
        format!("{} min", (hours * 60.0).round() as i64)
    } else if hours < 24.0 {
        format!("{} h", hours.round() as i64)
    } else {
        let days = (hours / 24.0).floor() as i64;
        let remaining = (hours % 24.0).round() as i64;
        format!("{days} d {remaining} h")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn critical_renders_red_uppercase() {
        let badge = Urgency::Critical.badge();
        assert_eq!(badge.color, IndicatorColor::Red);
        assert_eq!(badge.label, "CRITICAL");
    }

    #[test]
    fn each_level_has_distinct_colour() {
        assert_eq!(Urgency::High.color(), IndicatorColor::Orange);
        assert_eq!(Urgency::Medium.color(), IndicatorColor::Yellow);
        assert_eq!(Urgency::Low.color(), IndicatorColor::Green);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("CRITICAL".parse::<Urgency>().unwrap(), Urgency::Critical);
        assert_eq!(" medium ".parse::<Urgency>().unwrap(), Urgency::Medium);
    }

    #[test]
    fn parse_unknown_is_error_but_lenient_is_low() {
        assert!("urgent".parse::<Urgency>().is_err());
        assert_eq!(Urgency::parse_lenient("urgent"), Urgency::Low);
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&Urgency::High).unwrap();
        assert_eq!(json, "\"high\"");
        let parsed: Urgency = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(parsed, Urgency::Critical);
    }

    #[test]
    fn classify_by_fill_percentage() {
        assert_eq!(Urgency::classify(95.0, 100.0), Urgency::Critical);
        assert_eq!(Urgency::classify(85.0, 100.0), Urgency::High);
        assert_eq!(Urgency::classify(70.0, 100.0), Urgency::Medium);
        assert_eq!(Urgency::classify(40.0, 100.0), Urgency::Low);
    }

    #[test]
    fn classify_by_hours_until_full() {
        assert_eq!(Urgency::classify(10.0, 1.5), Urgency::Critical);
        assert_eq!(Urgency::classify(10.0, 12.0), Urgency::High);
        assert_eq!(Urgency::classify(10.0, 20.0), Urgency::Medium);
    }

    #[test]
    fn ordering_puts_critical_highest() {
        let mut levels = vec![Urgency::Medium, Urgency::Critical, Urgency::Low, Urgency::High];
        levels.sort_by_key(|u| u.priority());
        assert_eq!(
            levels,
            vec![Urgency::Critical, Urgency::High, Urgency::Medium, Urgency::Low]
        );
        assert!(Urgency::Critical > Urgency::Low);
    }

    #[test]
    fn duration_formatting() {
        assert_eq!(format_hours_until_full(0.5), "30 min");
        assert_eq!(format_hours_until_full(5.4), "5 h");
        assert_eq!(format_hours_until_full(50.0), "2 d 2 h");
    }
}
