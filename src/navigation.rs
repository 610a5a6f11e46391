use crate::aggregate::{county_view_from_state, DataAggregator};
use crate::error::{DataError, NavError};
use crate::geokey;
use crate::types::{CountyViewModel, NationViewModel, StateViewModel};
use serde::Serialize;
use std::sync::Arc;

/// Navigation level, carrying the view model that level renders. Keeping the
/// view inside the variant means a level can never be entered without its
/// data being resident.
pub enum Level {
    Nation,
    State {
        view: Arc<StateViewModel>,
    },
    County {
        parent: Arc<StateViewModel>,
        view: Arc<CountyViewModel>,
    },
}

impl Level {
    pub fn name(&self) -> &'static str {
        match self {
            Level::Nation => "nation",
            Level::State { .. } => "state",
            Level::County { .. } => "county",
        }
    }
}

/// Serializable snapshot of the active view for the presenter.
#[derive(Serialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum ActiveView<'a> {
    Nation { model: &'a NationViewModel },
    State { model: &'a StateViewModel },
    County { model: &'a CountyViewModel },
}

/// Finite state machine over Nation → State → County.
///
/// The controller owns the sole mutable navigation context. `select_state`
/// commits only after its data load succeeds: a failed load returns an error
/// with the level still at Nation, and dropping the pending future (a
/// superseded selection) abandons the transition without mutating anything,
/// so a stale response can never overwrite a newer view. Callers hold the
/// controller mutably across the load, which is what blocks navigation input
/// during the transient loading state.
pub struct NavigationController {
    aggregator: Arc<DataAggregator>,
    level: Level,
    nation: Option<Arc<NationViewModel>>,
}

impl NavigationController {
    pub fn new(aggregator: Arc<DataAggregator>) -> Self {
        Self {
            aggregator,
            level: Level::Nation,
            nation: None,
        }
    }

    /// Fetch every nation-level dataset concurrently and build the initial
    /// view. Fail-fast: any failure aborts, leaving no partial nation view.
    pub async fn bootstrap(&mut self) -> Result<Arc<NationViewModel>, DataError> {
        self.aggregator.bootstrap().await?;
        let view = Arc::new(self.aggregator.build_nation_view().await?);
        self.nation = Some(Arc::clone(&view));
        self.level = Level::Nation;
        Ok(view)
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    /// The view model for the current level, or `None` before bootstrap.
    pub fn active_view(&self) -> Option<ActiveView<'_>> {
        match &self.level {
            Level::Nation => self.nation.as_ref().map(|model| ActiveView::Nation { model }),
            Level::State { view } => Some(ActiveView::State { model: view }),
            Level::County { view, .. } => Some(ActiveView::County { model: view }),
        }
    }

    /// Nation → State. Requires the state view to build before the
    /// transition commits.
    pub async fn select_state(&mut self, raw: &str) -> Result<Arc<StateViewModel>, NavError> {
        if !matches!(self.level, Level::Nation) {
            return Err(NavError::InvalidTransition {
                from: self.level.name(),
                event: "select_state",
            });
        }
        let state = geokey::normalize_state(raw)?;
        if let Some(loaded_at) = self.aggregator.state_data_cached_since(&state) {
            tracing::debug!(
                state = %state,
                age_s = loaded_at.elapsed().as_secs(),
                "re-entering state with cached datasets"
            );
        }

        let view = Arc::new(self.aggregator.build_state_view(&state).await?);
        self.level = Level::State {
            view: Arc::clone(&view),
        };
        Ok(view)
    }

    /// State → County. Synchronous: the county's data is already resident in
    /// the state view built on entry.
    pub fn select_county(&mut self, raw: &str) -> Result<Arc<CountyViewModel>, NavError> {
        let Level::State { view } = &self.level else {
            return Err(NavError::InvalidTransition {
                from: self.level.name(),
                event: "select_county",
            });
        };
        let parent = Arc::clone(view);
        let county = geokey::normalize_county(raw)?;
        if county.state_prefix() != parent.state.id.as_str() {
            return Err(NavError::Data(DataError::UnknownRegion(county)));
        }
        let county_view = Arc::new(county_view_from_state(&parent, &county)?);
        self.level = Level::County {
            parent,
            view: Arc::clone(&county_view),
        };
        Ok(county_view)
    }

    /// County → State or State → Nation. Always succeeds without refetching:
    /// the state view is rebuilt from the per-state caches and the nation
    /// view has been resident since bootstrap.
    pub async fn back(&mut self) -> Result<(), NavError> {
        match &self.level {
            Level::County { parent, .. } => {
                let state = parent.state.id.clone();
                let view = Arc::new(self.aggregator.build_state_view(&state).await?);
                self.level = Level::State { view };
                Ok(())
            }
            Level::State { .. } => {
                self.level = Level::Nation;
                Ok(())
            }
            Level::Nation => Err(NavError::InvalidTransition {
                from: "nation",
                event: "back",
            }),
        }
    }
}
