use serde::{Serialize, Serializer};

/// Discrete choropleth bucket for a 0-100 score.
///
/// Buckets are half-open with the upper endpoint included: exactly 80 falls
/// in `(60,80]`, not the top bucket. `Unknown` is the distinguished token
/// for a region with no score; a score of 0.0 is a valid minimum and lands
/// in `[0,20]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorToken {
    VeryHigh, // (80, 100]
    High,     // (60, 80]
    Mid,      // (40, 60]
    Low,      // (20, 40]
    VeryLow,  // [0, 20]
    Unknown,
}

impl ColorToken {
    pub fn hex(self) -> &'static str {
        match self {
            ColorToken::VeryHigh => "#1a9850",
            ColorToken::High => "#66bd63",
            ColorToken::Mid => "#4575b4",
            ColorToken::Low => "#f46d43",
            ColorToken::VeryLow => "#d73027",
            ColorToken::Unknown => "#cccccc",
        }
    }
}

impl Serialize for ColorToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.hex())
    }
}

/// Pure, total mapping from an optional score to its bucket. Region fill and
/// legend both go through this function.
pub fn color_for(score: Option<f64>) -> ColorToken {
    match score {
        None => ColorToken::Unknown,
        Some(s) if s > 80.0 => ColorToken::VeryHigh,
        Some(s) if s > 60.0 => ColorToken::High,
        Some(s) if s > 40.0 => ColorToken::Mid,
        Some(s) if s > 20.0 => ColorToken::Low,
        Some(_) => ColorToken::VeryLow,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LegendEntry {
    pub label: &'static str,
    pub color: ColorToken,
}

/// Legend rows, derived from `color_for` on a representative score per
/// bucket so the legend can never disagree with region fill.
pub fn legend() -> Vec<LegendEntry> {
    [
        ("81\u{2013}100", 81.0),
        ("61\u{2013}80", 61.0),
        ("41\u{2013}60", 41.0),
        ("21\u{2013}40", 21.0),
        ("0\u{2013}20", 0.0),
    ]
    .into_iter()
    .map(|(label, repr)| LegendEntry {
        label,
        color: color_for(Some(repr)),
    })
    .chain(std::iter::once(LegendEntry {
        label: "No data",
        color: color_for(None),
    }))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_score_is_unknown_not_zero() {
        assert_eq!(color_for(None), ColorToken::Unknown);
        assert_eq!(color_for(Some(0.0)), ColorToken::VeryLow);
    }

    #[test]
    fn boundaries_fall_in_the_lower_bucket() {
        // upper endpoint inclusive: exactly 80 is High, not VeryHigh
        assert_eq!(color_for(Some(100.0)), ColorToken::VeryHigh);
        assert_eq!(color_for(Some(80.0)), ColorToken::High);
        assert_eq!(color_for(Some(60.0)), ColorToken::Mid);
        assert_eq!(color_for(Some(40.0)), ColorToken::Low);
        assert_eq!(color_for(Some(20.0)), ColorToken::VeryLow);
    }

    #[test]
    fn deterministic_and_distinct_across_buckets() {
        assert_eq!(color_for(Some(80.0)), color_for(Some(80.0)));
        let buckets = [10.0, 30.0, 50.0, 70.0, 90.0].map(|s| color_for(Some(s)));
        for i in 0..buckets.len() {
            for j in (i + 1)..buckets.len() {
                assert_ne!(buckets[i], buckets[j]);
            }
        }
    }

    #[test]
    fn legend_matches_fill_palette() {
        let rows = legend();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].color, color_for(Some(95.0)));
        assert_eq!(rows[4].color, color_for(Some(5.0)));
        assert_eq!(rows[5].color, ColorToken::Unknown);
    }
}
