use crate::color::ColorToken;
use crate::geokey::GeoId;
use geojson::Feature;
use serde::Serialize;

/// Per-county score entry as supplied by the score service.
#[derive(Debug, Clone)]
pub struct CountyScore {
    pub name: Option<String>,
    pub score: f64,
}

/// The small set of census facts attached to a county. Every field is
/// independently optional; a missing field renders as "N/A", never as 0.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CensusFacts {
    pub population: Option<u64>,
    pub median_earnings: Option<u64>,
    pub bachelors_population: Option<u64>,
}

/// Axis-aligned lon/lat bounding box for the presenter's initial extent.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn merge(self, other: Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }
}

/// One state in the nation view: feature plus everything the presenter needs
/// to style and label it, so it performs no joins of its own.
#[derive(Debug, Clone, Serialize)]
pub struct StateRegion {
    pub id: GeoId,
    pub name: String,
    pub score: Option<f64>,
    pub color: ColorToken,
    pub feature: Feature,
}

/// One county in a state view. `population` comes from the nation-wide
/// population dataset; the census facts are a separate per-state source and
/// each is independently optional.
#[derive(Debug, Clone, Serialize)]
pub struct CountyRegion {
    pub id: GeoId,
    pub name: String,
    pub score: Option<f64>,
    pub color: ColorToken,
    pub population: Option<u64>,
    pub census: CensusFacts,
    pub feature: Feature,
}

/// Sidebar ranking row; regions without a score are omitted from rankings.
#[derive(Debug, Clone, Serialize)]
pub struct RankEntry {
    pub id: GeoId,
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct NationViewModel {
    pub regions: Vec<StateRegion>,
    /// Score-descending; unscored states omitted.
    pub ranked: Vec<RankEntry>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateSummary {
    pub id: GeoId,
    pub name: String,
    /// Direct lookup in the state-score mapping, never an average of the
    /// state's counties.
    pub score: Option<f64>,
    pub color: ColorToken,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateViewModel {
    pub state: StateSummary,
    pub counties: Vec<CountyRegion>,
    pub ranked: Vec<RankEntry>,
    pub bounds: Option<Bounds>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CountyViewModel {
    pub id: GeoId,
    pub state_id: GeoId,
    pub name: String,
    pub score: Option<f64>,
    pub color: ColorToken,
    pub population: Option<u64>,
    pub census: CensusFacts,
}
