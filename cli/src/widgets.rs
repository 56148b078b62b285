//! The demo feature areas: a widget catalogue and its load progress.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strata_state::StateTree;
use strata_store::{Action, NormalizedCache, Store, StoreError, WriteMode};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Widget {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub page: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub total: usize,
    pub loaded: usize,
}

/// Partial progress record, merged into the stored one.
#[derive(Serialize)]
struct LoadedPatch {
    loaded: usize,
}

#[derive(Debug)]
pub enum WidgetAction {
    /// A page of widgets arrived.
    List(Vec<Widget>),
}

#[derive(Debug)]
pub enum ProgressAction {
    Started { total: usize },
    PageLoaded,
}

/// Every action the host dispatches, one variant per feature area.
#[derive(Debug)]
pub enum AppAction {
    Widgets(WidgetAction),
    Progress(ProgressAction),
}

impl Action for AppAction {
    fn kind(&self) -> &'static str {
        match self {
            AppAction::Widgets(WidgetAction::List(_)) => "WIDGET_LIST",
            AppAction::Progress(ProgressAction::Started { .. }) => "PROGRESS_STARTED",
            AppAction::Progress(ProgressAction::PageLoaded) => "PROGRESS_PAGE_LOADED",
        }
    }
}

pub struct WidgetStore {
    cache: NormalizedCache<Widget>,
}

impl WidgetStore {
    pub fn new(tree: &StateTree) -> Arc<Self> {
        Arc::new(Self {
            cache: NormalizedCache::new(tree, "widgets"),
        })
    }
}

impl Store<AppAction> for WidgetStore {
    type Entity = Widget;

    fn cache(&self) -> &NormalizedCache<Widget> {
        &self.cache
    }

    fn act(&self, action: &AppAction) -> Result<(), StoreError> {
        match action {
            AppAction::Widgets(WidgetAction::List(widgets)) => {
                self.cache.receive_data(widgets, WriteMode::Replace)?;
            }
            AppAction::Progress(_) => {}
        }
        Ok(())
    }
}

pub struct ProgressStore {
    cache: NormalizedCache<Progress>,
}

impl ProgressStore {
    pub fn new(tree: &StateTree) -> Arc<Self> {
        Arc::new(Self {
            cache: NormalizedCache::singleton(tree, "progress"),
        })
    }

    pub fn current(&self) -> Result<Progress, StoreError> {
        Ok(self.cache.get()?.unwrap_or_default())
    }
}

impl Store<AppAction> for ProgressStore {
    type Entity = Progress;

    fn cache(&self) -> &NormalizedCache<Progress> {
        &self.cache
    }

    fn act(&self, action: &AppAction) -> Result<(), StoreError> {
        match action {
            AppAction::Progress(ProgressAction::Started { total }) => {
                self.cache.receive_data(
                    [Progress {
                        total: *total,
                        loaded: 0,
                    }],
                    WriteMode::Replace,
                )?;
            }
            AppAction::Progress(ProgressAction::PageLoaded) => {
                let loaded = self.current()?.loaded + 1;
                self.cache
                    .receive_data([LoadedPatch { loaded }], WriteMode::Merge)?;
            }
            AppAction::Widgets(_) => {}
        }
        Ok(())
    }
}
