//! Shared mock `DataSources` for unit tests: fixture data for two scored
//! states plus one unscored, fetch counters, and failure injection.

use crate::error::DataError;
use crate::geokey::{self, GeoId};
use crate::sources::{BoxFuture, DataSources};
use crate::types::{CensusFacts, CountyScore};
use geojson::{Feature, FeatureCollection};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchCounts {
    pub nation_geometry: usize,
    pub county_geometry: usize,
    pub state_scores: usize,
    pub county_scores: usize,
    pub population: usize,
    pub census: usize,
}

#[derive(Default)]
struct Counters {
    nation_geometry: AtomicUsize,
    county_geometry: AtomicUsize,
    state_scores: AtomicUsize,
    county_scores: AtomicUsize,
    population: AtomicUsize,
    census: AtomicUsize,
}

pub struct MockSources {
    nation: FeatureCollection,
    counties: FeatureCollection,
    state_scores: HashMap<GeoId, f64>,
    county_scores: HashMap<GeoId, CountyScore>,
    population: HashMap<GeoId, u64>,
    census: HashMap<GeoId, HashMap<GeoId, CensusFacts>>,
    counters: Counters,
    pub fail_state_scores: AtomicBool,
    pub fail_county_scores: AtomicBool,
    pub fail_census: AtomicBool,
}

fn square_feature(props: serde_json::Value, x: f64, y: f64) -> Feature {
    let ring = vec![
        vec![x, y],
        vec![x + 1.0, y],
        vec![x + 1.0, y + 1.0],
        vec![x, y + 1.0],
        vec![x, y],
    ];
    Feature {
        bbox: None,
        geometry: Some(geojson::Geometry::new(geojson::Value::Polygon(vec![ring]))),
        id: None,
        properties: props.as_object().cloned(),
        foreign_members: None,
    }
}

fn state(raw: &str) -> GeoId {
    geokey::normalize_state(raw).unwrap()
}

fn county(raw: &str) -> GeoId {
    geokey::normalize_county(raw).unwrap()
}

impl MockSources {
    pub fn fixture() -> Self {
        // Ids are deliberately mixed-format (numbers, unpadded strings) to
        // exercise normalization at the ingestion boundary.
        let nation = FeatureCollection {
            bbox: None,
            foreign_members: None,
            features: vec![
                square_feature(json!({"STATEFP": "36", "NAME": "New York"}), -75.0, 42.0),
                square_feature(json!({"STATEFP": 6, "NAME": "California"}), -120.0, 36.0),
                square_feature(json!({"STATEFP": "48", "NAME": "Texas"}), -99.0, 31.0),
            ],
        };
        let counties = FeatureCollection {
            bbox: None,
            foreign_members: None,
            features: vec![
                square_feature(json!({"GEOID": "36001", "STATEFP": "36", "NAME": "Albany"}), -74.0, 42.6),
                square_feature(json!({"GEOID": "36005", "STATEFP": "36", "NAME": "Bronx"}), -73.9, 40.8),
                square_feature(json!({"GEOID": 6037, "STATEFP": 6, "NAME": "Los Angeles"}), -118.2, 34.0),
                square_feature(json!({"GEOID": "06001", "STATEFP": "06", "NAME": "Alameda"}), -122.0, 37.6),
            ],
        };

        // "99" and "36999" have no geometry: they must be dropped silently.
        let state_scores = HashMap::from([
            (state("36"), 72.5),
            (state("06"), 41.3),
            (state("99"), 12.0),
        ]);
        let county_scores = HashMap::from([
            (
                county("36001"),
                CountyScore {
                    name: Some("Albany".into()),
                    score: 55.0,
                },
            ),
            (
                county("06037"),
                CountyScore {
                    name: Some("Los Angeles".into()),
                    score: 88.0,
                },
            ),
            (
                county("06001"),
                CountyScore {
                    name: Some("Alameda".into()),
                    score: 15.0,
                },
            ),
            (
                county("36999"),
                CountyScore {
                    name: None,
                    score: 33.3,
                },
            ),
        ]);
        let population = HashMap::from([
            (county("36001"), 314848u64),
            (county("36005"), 1_472_654),
            (county("06037"), 10_014_009),
        ]);

        let census = HashMap::from([
            (
                state("36"),
                HashMap::from([
                    (
                        county("36001"),
                        CensusFacts {
                            population: Some(300000),
                            median_earnings: Some(45000),
                            bachelors_population: Some(90000),
                        },
                    ),
                    (
                        county("36005"),
                        CensusFacts {
                            population: None,
                            median_earnings: Some(39000),
                            bachelors_population: None,
                        },
                    ),
                ]),
            ),
            (
                state("06"),
                HashMap::from([(
                    county("06037"),
                    CensusFacts {
                        population: Some(10_014_009),
                        median_earnings: Some(50000),
                        bachelors_population: Some(2_500_000),
                    },
                )]),
            ),
        ]);

        Self {
            nation,
            counties,
            state_scores,
            county_scores,
            population,
            census,
            counters: Counters::default(),
            fail_state_scores: AtomicBool::new(false),
            fail_county_scores: AtomicBool::new(false),
            fail_census: AtomicBool::new(false),
        }
    }

    pub fn fetch_counts(&self) -> FetchCounts {
        FetchCounts {
            nation_geometry: self.counters.nation_geometry.load(Ordering::SeqCst),
            county_geometry: self.counters.county_geometry.load(Ordering::SeqCst),
            state_scores: self.counters.state_scores.load(Ordering::SeqCst),
            county_scores: self.counters.county_scores.load(Ordering::SeqCst),
            population: self.counters.population.load(Ordering::SeqCst),
            census: self.counters.census.load(Ordering::SeqCst),
        }
    }
}

impl DataSources for MockSources {
    fn nation_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>> {
        Box::pin(async move {
            self.counters.nation_geometry.fetch_add(1, Ordering::SeqCst);
            Ok(self.nation.clone())
        })
    }

    fn county_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>> {
        Box::pin(async move {
            self.counters.county_geometry.fetch_add(1, Ordering::SeqCst);
            Ok(self.counties.clone())
        })
    }

    fn state_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, f64>, DataError>> {
        Box::pin(async move {
            self.counters.state_scores.fetch_add(1, Ordering::SeqCst);
            if self.fail_state_scores.load(Ordering::SeqCst) {
                return Err(DataError::fetch("state scores", "injected failure"));
            }
            Ok(self.state_scores.clone())
        })
    }

    fn county_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, CountyScore>, DataError>> {
        Box::pin(async move {
            self.counters.county_scores.fetch_add(1, Ordering::SeqCst);
            if self.fail_county_scores.load(Ordering::SeqCst) {
                return Err(DataError::fetch("county scores", "injected failure"));
            }
            Ok(self.county_scores.clone())
        })
    }

    fn county_population(&self) -> BoxFuture<'_, Result<HashMap<GeoId, u64>, DataError>> {
        Box::pin(async move {
            self.counters.population.fetch_add(1, Ordering::SeqCst);
            Ok(self.population.clone())
        })
    }

    fn state_census(
        &self,
        state: GeoId,
    ) -> BoxFuture<'_, Result<HashMap<GeoId, CensusFacts>, DataError>> {
        Box::pin(async move {
            self.counters.census.fetch_add(1, Ordering::SeqCst);
            if self.fail_census.load(Ordering::SeqCst) {
                return Err(DataError::fetch("state census", "injected failure"));
            }
            Ok(self.census.get(&state).cloned().unwrap_or_default())
        })
    }
}
