use crate::cache::{DatasetCache, Scope};
use crate::color::color_for;
use crate::error::DataError;
use crate::geokey::{self, GeoId, RawKey};
use crate::sources::DataSources;
use crate::types::{
    Bounds, CensusFacts, CountyRegion, CountyScore, CountyViewModel, NationViewModel, RankEntry,
    StateRegion, StateSummary, StateViewModel,
};
use geo::BoundingRect;
use geojson::{Feature, FeatureCollection};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Composes raw geometry, scores, population and census attributes into
/// per-level view models.
///
/// Every join is a left join anchored on geometry: a region with geometry but
/// no score or census entry still appears (unknown color, "N/A" facts), while
/// score or census entries without matching geometry are dropped. Geometry
/// features whose id cannot be normalized are logged and skipped.
pub struct DataAggregator {
    sources: Arc<dyn DataSources>,
    // Global scopes.
    nation_geometry: DatasetCache<FeatureCollection>,
    county_geometry: DatasetCache<FeatureCollection>,
    state_scores: DatasetCache<HashMap<GeoId, f64>>,
    county_scores: DatasetCache<HashMap<GeoId, CountyScore>>,
    population: DatasetCache<HashMap<GeoId, u64>>,
    // Per-state scopes. Geometry and score subsets are derived from the
    // cached masters; census is its own fetch.
    state_features: DatasetCache<Vec<Feature>>,
    state_county_scores: DatasetCache<HashMap<GeoId, CountyScore>>,
    state_census: DatasetCache<HashMap<GeoId, CensusFacts>>,
}

impl DataAggregator {
    pub fn new(sources: Arc<dyn DataSources>) -> Self {
        Self {
            sources,
            nation_geometry: DatasetCache::new("nation geometry"),
            county_geometry: DatasetCache::new("county geometry"),
            state_scores: DatasetCache::new("state scores"),
            county_scores: DatasetCache::new("county scores"),
            population: DatasetCache::new("population"),
            state_features: DatasetCache::new("state county geometry"),
            state_county_scores: DatasetCache::new("state county scores"),
            state_census: DatasetCache::new("state census"),
        }
    }

    /// Warm every global dataset concurrently, fail-fast: a failure in any
    /// one aborts the bootstrap and nothing renders.
    pub async fn bootstrap(&self) -> Result<(), DataError> {
        tokio::try_join!(
            self.nation_geometry(),
            self.county_geometry(),
            self.state_scores(),
            self.county_scores(),
            self.population(),
        )?;
        Ok(())
    }

    pub async fn build_nation_view(&self) -> Result<NationViewModel, DataError> {
        let (geometry, scores) = tokio::try_join!(self.nation_geometry(), self.state_scores())?;

        let mut regions = Vec::with_capacity(geometry.features.len());
        for feature in &geometry.features {
            let Some(id) = feature_id(feature, "STATEFP", |raw| geokey::normalize_state(raw)) else {
                continue;
            };
            let score = scores.get(&id).copied();
            regions.push(StateRegion {
                name: feature_name(feature),
                score,
                color: color_for(score),
                feature: feature.clone(),
                id,
            });
        }

        log_orphans(scores.keys(), &regions.iter().map(|r| &r.id).collect::<Vec<_>>(), "state scores");

        let ranked = rank(regions.iter().map(|r| (&r.id, &r.name, r.score)));
        let bounds = bounds_of(regions.iter().map(|r| &r.feature));
        Ok(NationViewModel {
            regions,
            ranked,
            bounds,
        })
    }

    pub async fn build_state_view(&self, state: &GeoId) -> Result<StateViewModel, DataError> {
        // Per-state loads fan out with no required ordering; the nation-level
        // datasets are cache hits after bootstrap.
        let (features, scores, census, population, nation_geometry, state_scores) = tokio::try_join!(
            self.state_features(state),
            self.state_county_scores(state),
            self.state_census(state),
            self.population(),
            self.nation_geometry(),
            self.state_scores(),
        )?;

        let name = nation_geometry
            .features
            .iter()
            .find(|f| feature_id(f, "STATEFP", |raw| geokey::normalize_state(raw)).as_ref() == Some(state))
            .map(feature_name)
            .ok_or_else(|| DataError::UnknownRegion(state.clone()))?;

        let mut counties = Vec::with_capacity(features.len());
        for feature in features.iter() {
            let Some(id) = feature_id(feature, "GEOID", |raw| geokey::normalize_county(raw)) else {
                continue;
            };
            let entry = scores.get(&id);
            let score = entry.map(|s| s.score);
            // Geometry's display name wins; the score service's name is a
            // fallback for features without one.
            let name = feature
                .property("NAME")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .or_else(|| entry.and_then(|s| s.name.clone()))
                .unwrap_or_else(|| "Unknown".to_string());
            counties.push(CountyRegion {
                name,
                score,
                color: color_for(score),
                population: population.get(&id).copied(),
                census: census.get(&id).cloned().unwrap_or_default(),
                feature: feature.clone(),
                id,
            });
        }

        log_orphans(scores.keys(), &counties.iter().map(|c| &c.id).collect::<Vec<_>>(), "county scores");
        log_orphans(census.keys(), &counties.iter().map(|c| &c.id).collect::<Vec<_>>(), "state census");

        // The state's own score is supplied precomputed; it is never an
        // average of the counties below it.
        let score = state_scores.get(state).copied();
        let ranked = rank(counties.iter().map(|c| (&c.id, &c.name, c.score)));
        let bounds = bounds_of(counties.iter().map(|c| &c.feature));
        Ok(StateViewModel {
            state: StateSummary {
                id: state.clone(),
                name,
                score,
                color: color_for(score),
            },
            counties,
            ranked,
            bounds,
        })
    }

    pub async fn build_county_view(
        &self,
        state: &GeoId,
        county: &GeoId,
    ) -> Result<CountyViewModel, DataError> {
        let view = self.build_state_view(state).await?;
        county_view_from_state(&view, county)
    }

    /// When the per-state data for `state` was cached, if it is resident.
    pub fn state_data_cached_since(&self, state: &GeoId) -> Option<Instant> {
        self.state_census.loaded_at(&Scope::PerState(state.clone()))
    }

    async fn nation_geometry(&self) -> Result<Arc<FeatureCollection>, DataError> {
        self.nation_geometry
            .get_or_load(Scope::Global, || self.sources.nation_geometry())
            .await
    }

    async fn county_geometry(&self) -> Result<Arc<FeatureCollection>, DataError> {
        self.county_geometry
            .get_or_load(Scope::Global, || self.sources.county_geometry())
            .await
    }

    async fn state_scores(&self) -> Result<Arc<HashMap<GeoId, f64>>, DataError> {
        self.state_scores
            .get_or_load(Scope::Global, || self.sources.state_scores())
            .await
    }

    async fn county_scores(&self) -> Result<Arc<HashMap<GeoId, CountyScore>>, DataError> {
        self.county_scores
            .get_or_load(Scope::Global, || self.sources.county_scores())
            .await
    }

    async fn population(&self) -> Result<Arc<HashMap<GeoId, u64>>, DataError> {
        self.population
            .get_or_load(Scope::Global, || self.sources.county_population())
            .await
    }

    /// County features of one state, filtered from the cached master by the
    /// 2-character parent-state prefix.
    async fn state_features(&self, state: &GeoId) -> Result<Arc<Vec<Feature>>, DataError> {
        self.state_features
            .get_or_load(Scope::PerState(state.clone()), || async {
                let master = self.county_geometry().await?;
                Ok(master
                    .features
                    .iter()
                    .filter(|f| {
                        feature_id(f, "GEOID", |raw| geokey::normalize_county(raw))
                            .is_some_and(|id| id.state_prefix() == state.as_str())
                    })
                    .cloned()
                    .collect())
            })
            .await
    }

    async fn state_county_scores(
        &self,
        state: &GeoId,
    ) -> Result<Arc<HashMap<GeoId, CountyScore>>, DataError> {
        self.state_county_scores
            .get_or_load(Scope::PerState(state.clone()), || async {
                let master = self.county_scores().await?;
                Ok(master
                    .iter()
                    .filter(|(id, _)| id.state_prefix() == state.as_str())
                    .map(|(id, score)| (id.clone(), score.clone()))
                    .collect())
            })
            .await
    }

    async fn state_census(
        &self,
        state: &GeoId,
    ) -> Result<Arc<HashMap<GeoId, CensusFacts>>, DataError> {
        self.state_census
            .get_or_load(Scope::PerState(state.clone()), || {
                self.sources.state_census(state.clone())
            })
            .await
    }
}

/// Resolve one county from an already-built state view. Synchronous: county
/// selection inside a state never touches the network.
pub fn county_view_from_state(
    view: &StateViewModel,
    county: &GeoId,
) -> Result<CountyViewModel, DataError> {
    let region = view
        .counties
        .iter()
        .find(|c| &c.id == county)
        .ok_or_else(|| DataError::UnknownRegion(county.clone()))?;
    Ok(CountyViewModel {
        id: region.id.clone(),
        state_id: view.state.id.clone(),
        name: region.name.clone(),
        score: region.score,
        color: region.color,
        population: region.population,
        census: region.census.clone(),
    })
}

fn feature_id(
    feature: &Feature,
    prop: &str,
    normalize: impl Fn(RawKey) -> Result<GeoId, DataError>,
) -> Option<GeoId> {
    let raw = match feature.property(prop) {
        Some(serde_json::Value::String(s)) => RawKey::from(s.as_str()),
        Some(serde_json::Value::Number(n)) => RawKey::from(n.as_i64()?),
        _ => {
            tracing::warn!(prop, "feature without usable id skipped");
            return None;
        }
    };
    match normalize(raw) {
        Ok(id) => Some(id),
        Err(err) => {
            tracing::warn!(prop, %err, "feature with invalid id skipped");
            None
        }
    }
}

fn feature_name(feature: &Feature) -> String {
    match feature.property("NAME") {
        Some(serde_json::Value::String(s)) => s.clone(),
        _ => "Unknown".to_string(),
    }
}

/// Score-descending ranking; regions without a score are omitted rather than
/// ranked as zero.
fn rank<'a>(regions: impl Iterator<Item = (&'a GeoId, &'a String, Option<f64>)>) -> Vec<RankEntry> {
    let mut ranked: Vec<RankEntry> = regions
        .filter_map(|(id, name, score)| {
            score.map(|score| RankEntry {
                id: id.clone(),
                name: name.clone(),
                score,
            })
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

fn bounds_of<'a>(features: impl Iterator<Item = &'a Feature>) -> Option<Bounds> {
    features
        .filter_map(feature_bounds)
        .reduce(|acc, b| acc.merge(b))
}

fn feature_bounds(feature: &Feature) -> Option<Bounds> {
    let geometry = feature.geometry.as_ref()?;
    let geo_geometry: geo::Geometry<f64> = geometry.value.clone().try_into().ok()?;
    let rect = geo_geometry.bounding_rect()?;
    Some(Bounds {
        min_x: rect.min().x,
        min_y: rect.min().y,
        max_x: rect.max().x,
        max_y: rect.max().y,
    })
}

fn log_orphans<'a>(
    entry_ids: impl Iterator<Item = &'a GeoId>,
    geometry_ids: &[&GeoId],
    dataset: &'static str,
) {
    for id in entry_ids {
        if !geometry_ids.contains(&id) {
            tracing::debug!(dataset, %id, "entry without geometry dropped");
        }
    }
}
