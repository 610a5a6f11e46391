use crate::config::{FetchConfig, SourcesConfig};
use crate::error::DataError;
use crate::geokey::{self, GeoId};
use crate::types::{CensusFacts, CountyScore};
use anyhow::{Context, Result};
use geojson::{FeatureCollection, GeoJson};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Boxed future alias for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The five external datasets the aggregation layer consumes. Each endpoint
/// is unreliable, possibly slow, and fails independently; implementations
/// make exactly one attempt per call and surface failures as `FetchFailure`.
pub trait DataSources: Send + Sync {
    fn nation_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>>;
    fn county_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>>;
    fn state_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, f64>, DataError>>;
    fn county_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, CountyScore>, DataError>>;
    fn county_population(&self) -> BoxFuture<'_, Result<HashMap<GeoId, u64>, DataError>>;
    fn state_census(&self, state: GeoId) -> BoxFuture<'_, Result<HashMap<GeoId, CensusFacts>, DataError>>;
}

/// JSON-over-HTTP implementation. The only place in the crate that knows
/// about a transport; every request carries the configured timeout so a hung
/// endpoint becomes a `FetchFailure` instead of a stuck loading state.
pub struct HttpSources {
    client: reqwest::Client,
    endpoints: SourcesConfig,
}

impl HttpSources {
    pub fn new(endpoints: SourcesConfig, fetch: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, endpoints })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        dataset: &'static str,
        url: &str,
    ) -> Result<T, DataError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DataError::fetch(dataset, e))?
            .error_for_status()
            .map_err(|e| DataError::fetch(dataset, e))?;
        response.json().await.map_err(|e| DataError::fetch(dataset, e))
    }

    async fn get_feature_collection(
        &self,
        dataset: &'static str,
        url: &str,
    ) -> Result<FeatureCollection, DataError> {
        match self.get_json::<GeoJson>(dataset, url).await? {
            GeoJson::FeatureCollection(fc) => Ok(fc),
            _ => Err(DataError::fetch(dataset, "response is not a FeatureCollection")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreRow {
    score: f64,
}

#[derive(Debug, Deserialize)]
struct CountyScoreRow {
    name: Option<String>,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct CensusRow {
    #[serde(default)]
    data: serde_json::Map<String, Value>,
}

impl DataSources for HttpSources {
    fn nation_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>> {
        Box::pin(async move {
            self.get_feature_collection("nation geometry", &self.endpoints.nation_geometry_url)
                .await
        })
    }

    fn county_geometry(&self) -> BoxFuture<'_, Result<FeatureCollection, DataError>> {
        Box::pin(async move {
            self.get_feature_collection("county geometry", &self.endpoints.county_geometry_url)
                .await
        })
    }

    fn state_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, f64>, DataError>> {
        Box::pin(async move {
            let raw: HashMap<String, ScoreRow> = self
                .get_json("state scores", &self.endpoints.state_scores_url)
                .await?;
            let keyed = normalize_keyed(raw, |k| geokey::normalize_state(k), "state scores")?;
            Ok(keyed.into_iter().map(|(k, v)| (k, v.score)).collect())
        })
    }

    fn county_scores(&self) -> BoxFuture<'_, Result<HashMap<GeoId, CountyScore>, DataError>> {
        Box::pin(async move {
            let raw: HashMap<String, CountyScoreRow> = self
                .get_json("county scores", &self.endpoints.county_scores_url)
                .await?;
            let keyed = normalize_keyed(raw, |k| geokey::normalize_county(k), "county scores")?;
            Ok(keyed
                .into_iter()
                .map(|(k, row)| {
                    (
                        k,
                        CountyScore {
                            name: row.name,
                            score: row.score,
                        },
                    )
                })
                .collect())
        })
    }

    fn county_population(&self) -> BoxFuture<'_, Result<HashMap<GeoId, u64>, DataError>> {
        Box::pin(async move {
            let rows: Vec<Vec<String>> = self
                .get_json("population", &self.endpoints.population_url)
                .await?;
            Ok(parse_population_rows(rows))
        })
    }

    fn state_census(
        &self,
        state: GeoId,
    ) -> BoxFuture<'_, Result<HashMap<GeoId, CensusFacts>, DataError>> {
        Box::pin(async move {
            let url = self.endpoints.census_url.replace("{state}", state.as_str());
            let raw: HashMap<String, CensusRow> = self.get_json("state census", &url).await?;
            let keyed = normalize_keyed(raw, |k| geokey::normalize_county(k), "state census")?;
            Ok(keyed
                .into_iter()
                .map(|(k, row)| (k, census_facts_from_row(&row.data)))
                .collect())
        })
    }
}

/// Re-key a raw string-keyed mapping by canonical GeoId. Entries whose key
/// fails normalization are a data defect: logged and dropped, never surfaced
/// to the user.
fn normalize_keyed<V>(
    raw: HashMap<String, V>,
    normalize: impl Fn(String) -> Result<GeoId, DataError>,
    dataset: &'static str,
) -> Result<HashMap<GeoId, V>, DataError> {
    let mut out = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        match normalize(key.clone()) {
            Ok(id) => {
                out.insert(id, value);
            }
            Err(err) => {
                tracing::warn!(dataset, key = %key, %err, "dropping entry with invalid key");
            }
        }
    }
    Ok(out)
}

/// Census-API row arrays: a header row, then `[population, stateFP, countyFP]`.
fn parse_population_rows(rows: Vec<Vec<String>>) -> HashMap<GeoId, u64> {
    let mut out = HashMap::new();
    for row in rows.into_iter().skip(1) {
        if row.len() < 3 {
            tracing::warn!(?row, "short population row skipped");
            continue;
        }
        let population = match row[0].trim().parse::<u64>() {
            Ok(p) => p,
            Err(_) => {
                tracing::warn!(value = %row[0], "non-numeric population skipped");
                continue;
            }
        };
        match geokey::county_from_parts(row[1].as_str(), row[2].as_str()) {
            Ok(id) => {
                out.insert(id, population);
            }
            Err(err) => {
                tracing::warn!(state = %row[1], county = %row[2], %err, "dropping population row");
            }
        }
    }
    out
}

const POPULATION_VAR: &str = "Overall Population";
const EARNINGS_VAR: &str = "Overall median earnings";
const BACHELORS_VAR: &str = "Overall Bachelor's degree population";

fn census_facts_from_row(data: &serde_json::Map<String, Value>) -> CensusFacts {
    CensusFacts {
        population: numeric_fact(data.get(POPULATION_VAR)),
        median_earnings: numeric_fact(data.get(EARNINGS_VAR)),
        bachelors_population: numeric_fact(data.get(BACHELORS_VAR)),
    }
}

/// Census values arrive as numbers or numeric strings; anything else (null,
/// empty string, text) is a missing fact, never zero.
fn numeric_fact(value: Option<&Value>) -> Option<u64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        }
        _ => None,
    }?;
    if parsed.is_finite() && parsed >= 0.0 {
        Some(parsed.round() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn population_rows_skip_header_and_bad_rows() {
        let rows = vec![
            vec!["P1_001N".into(), "STATE".into(), "COUNTY".into()],
            vec!["12345".into(), "6".into(), "37".into()],
            vec!["oops".into(), "06".into(), "001".into()],
            vec!["99".into(), "36".into()],
        ];
        let map = parse_population_rows(rows);
        assert_eq!(map.len(), 1);
        let id = geokey::normalize_county("06037").unwrap();
        assert_eq!(map[&id], 12345);
    }

    #[test]
    fn invalid_keys_are_dropped_not_fatal() {
        let raw: HashMap<String, u32> =
            [("6".to_string(), 1u32), ("abc".to_string(), 2u32)].into();
        let keyed = normalize_keyed(raw, |k| geokey::normalize_state(k), "test").unwrap();
        assert_eq!(keyed.len(), 1);
        assert_eq!(keyed[&geokey::normalize_state("06").unwrap()], 1);
    }

    #[test]
    fn census_values_parse_from_numbers_and_strings() {
        let row: serde_json::Map<String, Value> = serde_json::from_value(json!({
            "Overall Population": "30923",
            "Overall median earnings": 41250,
            "Overall Bachelor's degree population": "",
        }))
        .unwrap();
        let facts = census_facts_from_row(&row);
        assert_eq!(facts.population, Some(30923));
        assert_eq!(facts.median_earnings, Some(41250));
        assert_eq!(facts.bachelors_population, None);
    }

    #[test]
    fn absent_facts_stay_absent() {
        let facts = census_facts_from_row(&serde_json::Map::new());
        assert_eq!(facts.population, None);
        assert_eq!(facts.median_earnings, None);
        assert_eq!(facts.bachelors_population, None);
    }
}
