//! Severity vocabularies and minimum-severity filtering.
//!
//! Weather alerts, disaster alerts and unsafe zones each grade severity with
//! their own vocabulary. The scales are separate types so a threshold from one
//! domain can never be applied to another.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An ordered severity vocabulary.
pub trait SeverityScale: Copy + Sized + 'static {
    /// Every level with its label and rank, lowest first.
    const LEVELS: &'static [(Self, &'static str, u8)];

    /// Ordinal rank of this level (1 = lowest).
    fn rank(self) -> u8;

    fn label(self) -> &'static str;

    /// Parse a label, ignoring surrounding whitespace and ASCII case.
    fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::LEVELS
            .iter()
            .find(|(_, name, _)| name.eq_ignore_ascii_case(label))
            .map(|(level, _, _)| *level)
    }

    /// Parse a label, falling back to the lowest level when unrecognized.
    fn from_label_lenient(label: &str) -> Self {
        Self::from_label(label).unwrap_or(Self::LEVELS[0].0)
    }

    /// Rank of a label; unrecognized labels rank as the lowest tier.
    fn rank_of(label: &str) -> u8 {
        Self::from_label(label).map(Self::rank).unwrap_or(1)
    }
}

macro_rules! severity_scale {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident = $rank:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl SeverityScale for $name {
            const LEVELS: &'static [(Self, &'static str, u8)] =
                &[$(($name::$variant, stringify!($variant), $rank)),+];

            fn rank(self) -> u8 {
                match self {
                    $($name::$variant => $rank),+
                }
            }

            fn label(self) -> &'static str {
                match self {
                    $($name::$variant => stringify!($variant)),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.label())
            }
        }
    };
}

severity_scale! {
    /// Severity of a weather alert.
    WeatherSeverity { Info = 1, Warning = 2, Severe = 3, Extreme = 4 }
}

severity_scale! {
    /// Severity of a disaster alert.
    DisasterSeverity { Low = 1, Moderate = 2, High = 3, Severe = 4, Extreme = 5 }
}

severity_scale! {
    /// Severity of a reported unsafe zone.
    ZoneSeverity { Low = 1, Medium = 2, High = 3, Critical = 4 }
}

/// Something graded on a severity scale.
pub trait Graded {
    type Scale: SeverityScale;

    fn severity(&self) -> Self::Scale;
}

/// Keep items at or above `minimum`.
///
/// A missing or blank minimum keeps everything in the original order. An
/// unrecognized minimum ranks as the lowest tier, so it keeps everything too.
pub fn filter_by_severity<T: Graded>(items: Vec<T>, minimum: Option<&str>) -> Vec<T> {
    let Some(minimum) = minimum.map(str::trim).filter(|m| !m.is_empty()) else {
        return items;
    };
    let threshold = T::Scale::rank_of(minimum);
    items
        .into_iter()
        .filter(|item| item.severity().rank() >= threshold)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Report {
        id: u32,
        severity: ZoneSeverity,
    }

    impl Graded for Report {
        type Scale = ZoneSeverity;

        fn severity(&self) -> ZoneSeverity {
            self.severity
        }
    }

    fn reports() -> Vec<Report> {
        use ZoneSeverity::*;
        [Medium, Critical, Low, High, Medium, Critical]
            .into_iter()
            .enumerate()
            .map(|(i, severity)| Report {
                id: i as u32,
                severity,
            })
            .collect()
    }

    #[test]
    fn rank_tables_are_domain_specific() {
        assert_eq!(WeatherSeverity::rank_of("Severe"), 3);
        assert_eq!(DisasterSeverity::rank_of("Severe"), 4);
        assert_eq!(ZoneSeverity::rank_of("Critical"), 4);
        assert_eq!(DisasterSeverity::rank_of("Extreme"), 5);
        assert_eq!(WeatherSeverity::rank_of("Extreme"), 4);
        // "Medium" only exists for zones, "Moderate" only for disasters.
        assert_eq!(ZoneSeverity::rank_of("Medium"), 2);
        assert_eq!(DisasterSeverity::rank_of("Medium"), 1);
        assert_eq!(DisasterSeverity::rank_of("Moderate"), 2);
    }

    #[test]
    fn unknown_labels_rank_lowest() {
        assert_eq!(WeatherSeverity::rank_of("Apocalyptic"), 1);
        assert_eq!(WeatherSeverity::from_label_lenient("??"), WeatherSeverity::Info);
        assert_eq!(DisasterSeverity::from_label_lenient(""), DisasterSeverity::Low);
        assert_eq!(ZoneSeverity::from_label(" high "), Some(ZoneSeverity::High));
    }

    #[test]
    fn empty_minimum_keeps_everything_in_order() {
        assert_eq!(filter_by_severity(reports(), None), reports());
        assert_eq!(filter_by_severity(reports(), Some("")), reports());
        assert_eq!(filter_by_severity(reports(), Some("   ")), reports());
    }

    #[test]
    fn high_minimum_keeps_only_high_and_critical() {
        let kept = filter_by_severity(reports(), Some("High"));
        let ids: Vec<u32> = kept.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3, 5]);
        assert!(kept
            .iter()
            .all(|r| matches!(r.severity, ZoneSeverity::High | ZoneSeverity::Critical)));
    }

    #[test]
    fn minimum_label_ignores_case() {
        assert_eq!(ZoneSeverity::rank_of("high"), 3);
        assert_eq!(ZoneSeverity::rank_of("CRITICAL"), 4);
        assert_eq!(WeatherSeverity::rank_of("eXtReMe"), 4);

        let lower = filter_by_severity(reports(), Some("high"));
        let exact = filter_by_severity(reports(), Some("High"));
        assert_eq!(lower, exact);
        assert_eq!(lower.len(), 3);
    }

    #[test]
    fn unknown_minimum_keeps_everything() {
        assert_eq!(filter_by_severity(reports(), Some("Whatever")).len(), 6);
    }

    #[test]
    fn display_uses_label() {
        assert_eq!(DisasterSeverity::Moderate.to_string(), "Moderate");
        assert_eq!(
            serde_json::to_string(&WeatherSeverity::Warning).unwrap(),
            "\"Warning\""
        );
    }
}
