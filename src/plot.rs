//! Plot handles: the group members a trending page is built from
//!
//! A [`TrendingPlot`] keeps its own copy of the group fields so it can tell
//! whether an incoming value is new. Changes coming from the group trigger
//! a reload or relabel through the plot's update hook; changes made on the
//! plot itself (zooming, picking a preset) are pushed to the group so every
//! other member follows.

use std::sync::{Arc, Weak};

use error_stack::Report;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::core::{ErrorBars, PlotId, SeriesSpec, TimeRange};
use crate::query::DataRequest;
use crate::range::{MINUTE_MS, Range, RangeToken, now_millis};
use crate::sync::{FanOut, GroupMember, GroupSetting, RangeGroup, RangeGroupState, SyncRegistry};
use crate::{Result, TrendingError};

/// Relative ranges are refetched this often
pub const AUTO_UPDATE_INTERVAL_MS: i64 = MINUTE_MS as i64;

pub const TIME_LABEL: &str = "time";

/// What a plot asks its host to do after a change
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotUpdate {
    /// Fetch data again with this request
    Reload(DataRequest),
    /// Redraw time labels in UTC or local time
    Relabel { use_utc: bool },
}

pub type UpdateHook = Box<dyn Fn(PlotId, &PlotUpdate) -> Result<()> + Send + Sync>;

pub fn plot(group: impl Into<String>) -> PlotBuilder {
    PlotBuilder {
        group: group.into(),
        title: String::new(),
        rest_url: String::new(),
        auto_update: true,
        series: vec![],
        overrides: vec![],
        hook: None,
        clock: now_millis,
    }
}

pub struct PlotBuilder {
    group: String,
    title: String,
    rest_url: String,
    auto_update: bool,
    series: Vec<SeriesSpec>,
    overrides: Vec<GroupSetting>,
    hook: Option<UpdateHook>,
    clock: fn() -> i64,
}

impl PlotBuilder {
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn rest_url(mut self, url: impl Into<String>) -> Self {
        self.rest_url = url.into();
        self
    }

    /// Refetch relative ranges on [`TrendingPlot::tick`] (default: on)
    pub fn auto_update(mut self, enabled: bool) -> Self {
        self.auto_update = enabled;
        self
    }

    pub fn series(mut self, series: Vec<SeriesSpec>) -> Self {
        self.series = series;
        self
    }

    /// Range written to the group once the plot has joined
    pub fn range(mut self, range: impl Into<RangeToken>) -> Self {
        self.overrides.push(GroupSetting::Range(range.into()));
        self
    }

    pub fn error_bars(mut self, error_bars: ErrorBars) -> Self {
        self.overrides.push(GroupSetting::ErrorBars(error_bars));
        self
    }

    pub fn use_utc(mut self, use_utc: bool) -> Self {
        self.overrides.push(GroupSetting::UseUtc(use_utc));
        self
    }

    pub fn n_bins(mut self, n_bins: u32) -> Self {
        self.overrides.push(GroupSetting::NBins(n_bins));
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.overrides.push(GroupSetting::Source(source.into()));
        self
    }

    pub fn on_update<F>(mut self, hook: F) -> Self
    where
        F: Fn(PlotId, &PlotUpdate) -> Result<()> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Source of "now" in epoch milliseconds
    pub fn clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Join the named group of `registry`, creating it if needed.
    ///
    /// The plot starts from the group's current state; any values set on
    /// the builder are then written to the group like a user change.
    pub fn attach(self, registry: &Arc<SyncRegistry>) -> Result<Arc<TrendingPlot>> {
        for setting in &self.overrides {
            setting.validate()?;
        }

        let group = registry.get_or_create(&self.group);
        let plot = Arc::new(TrendingPlot {
            id: PlotId::new(),
            registry: Arc::downgrade(registry),
            group: self.group,
            rest_url: self.rest_url,
            auto_update: self.auto_update,
            view: Mutex::new(PlotView {
                title: self.title,
                series: self.series,
                settings: group.state(),
                last_reload: None,
            }),
            hook: self.hook,
            clock: self.clock,
        });
        group.join(&plot);
        debug!(plot = %plot.id, group = %plot.group, "Plot attached");

        for setting in self.overrides {
            plot.push(setting)?;
        }
        Ok(plot)
    }
}

#[derive(Debug)]
struct PlotView {
    title: String,
    series: Vec<SeriesSpec>,
    settings: RangeGroupState,
    last_reload: Option<i64>,
}

pub struct TrendingPlot {
    id: PlotId,
    registry: Weak<SyncRegistry>,
    group: String,
    rest_url: String,
    auto_update: bool,
    view: Mutex<PlotView>,
    hook: Option<UpdateHook>,
    clock: fn() -> i64,
}

impl std::fmt::Debug for TrendingPlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrendingPlot")
            .field("id", &self.id)
            .field("group", &self.group)
            .field("view", &*self.view.lock())
            .finish()
    }
}

impl TrendingPlot {
    pub fn id(&self) -> PlotId {
        self.id
    }

    pub fn rest_url(&self) -> &str {
        &self.rest_url
    }

    pub fn group_name(&self) -> &str {
        &self.group
    }

    /// The plot's group, while the registry is alive
    pub fn group(&self) -> Option<Arc<RangeGroup>> {
        self.registry.upgrade()?.get(&self.group)
    }

    pub fn title(&self) -> String {
        self.view.lock().title.clone()
    }

    pub fn series(&self) -> Vec<SeriesSpec> {
        self.view.lock().series.clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.view.lock().series.iter().map(|s| s.key.clone()).collect()
    }

    /// Column labels: the time axis followed by one label per series
    pub fn labels(&self) -> Vec<String> {
        let view = self.view.lock();
        std::iter::once(TIME_LABEL.to_string())
            .chain(view.series.iter().map(|s| s.name.clone()))
            .collect()
    }

    /// The plot's copy of the group fields
    pub fn settings(&self) -> RangeGroupState {
        self.view.lock().settings.clone()
    }

    pub fn range(&self) -> RangeToken {
        self.view.lock().settings.range.clone()
    }

    /// Window the current range covers at `now`
    pub fn window(&self, now: i64) -> TimeRange {
        self.view.lock().settings.range.interpret().window(now)
    }

    /// Window at `now`, formatted for the plot's timezone setting
    pub fn describe_window(&self, now: i64) -> String {
        let use_utc = self.view.lock().settings.use_utc;
        self.window(now).describe(use_utc)
    }

    pub fn data_request(&self, now: i64) -> DataRequest {
        let view = self.view.lock();
        let keys: Vec<String> = view.series.iter().map(|s| s.key.clone()).collect();
        DataRequest::new(
            self.rest_url.clone(),
            &keys,
            view.settings.range.interpret().window(now),
            view.settings.n_bins,
            view.settings.error_bars,
            &view.settings.source,
        )
    }

    /// Replace title and series, then reload
    pub fn set_series(&self, title: impl Into<String>, series: Vec<SeriesSpec>) -> Result<()> {
        {
            let mut view = self.view.lock();
            view.title = title.into();
            view.series = series;
        }
        self.reload((self.clock)())
    }

    pub fn change_range(&self, range: impl Into<RangeToken>) -> Result<FanOut> {
        self.push(GroupSetting::Range(range.into()))
    }

    pub fn change_error_bars(&self, error_bars: ErrorBars) -> Result<FanOut> {
        self.push(GroupSetting::ErrorBars(error_bars))
    }

    pub fn change_use_utc(&self, use_utc: bool) -> Result<FanOut> {
        self.push(GroupSetting::UseUtc(use_utc))
    }

    pub fn change_n_bins(&self, n_bins: u32) -> Result<FanOut> {
        self.push(GroupSetting::NBins(n_bins))
    }

    pub fn change_source(&self, source: impl Into<String>) -> Result<FanOut> {
        self.push(GroupSetting::Source(source.into()))
    }

    /// Zoom or pan to `[min, max]` chart coordinates (epoch milliseconds)
    pub fn on_zoom(&self, min: f64, max: f64) -> Result<FanOut> {
        let window = TimeRange::new(min.round() as i64, max.round() as i64).validated()?;
        self.change_range(RangeToken::absolute(window))
    }

    /// Periodic refresh. Reloads when the range is relative and the last
    /// reload is at least [`AUTO_UPDATE_INTERVAL_MS`] old.
    pub fn tick(&self, now: i64) -> Result<bool> {
        if !self.auto_update {
            return Ok(false);
        }
        let due = {
            let view = self.view.lock();
            matches!(view.settings.range.interpret(), Range::Relative(_))
                && view
                    .last_reload
                    .is_none_or(|last| now.saturating_sub(last) >= AUTO_UPDATE_INTERVAL_MS)
        };
        if due {
            self.reload(now)?;
        }
        Ok(due)
    }

    /// Leave the group; the plot stops receiving updates
    pub fn detach(self: &Arc<Self>) -> bool {
        let left = self.group().is_some_and(|group| group.leave(self));
        debug!(plot = %self.id, group = %self.group, left, "Plot detached");
        left
    }

    /// Apply locally, then write to the group so the other members follow
    fn push(&self, setting: GroupSetting) -> Result<FanOut> {
        setting.validate()?;
        let local = self.receive(setting.clone());
        let fan_out = match self.group() {
            Some(group) => group.update(setting)?,
            None => FanOut::default(),
        };
        local.map(|()| fan_out)
    }

    fn receive(&self, setting: GroupSetting) -> Result<()> {
        if !self.view.lock().settings.apply(&setting) {
            return Ok(());
        }

        let now = (self.clock)();
        match setting {
            GroupSetting::UseUtc(use_utc) => self.emit(&PlotUpdate::Relabel { use_utc }),
            _ => self.reload(now),
        }
    }

    fn reload(&self, now: i64) -> Result<()> {
        let request = self.data_request(now);
        self.view.lock().last_reload = Some(now);
        self.emit(&PlotUpdate::Reload(request))
    }

    fn emit(&self, update: &PlotUpdate) -> Result<()> {
        match &self.hook {
            Some(hook) => hook(self.id, update),
            None => Ok(()),
        }
    }
}

impl GroupMember for TrendingPlot {
    fn set_range(&self, range: &RangeToken) -> Result<()> {
        self.receive(GroupSetting::Range(range.clone()))
    }

    fn set_error_bars(&self, error_bars: ErrorBars) -> Result<()> {
        self.receive(GroupSetting::ErrorBars(error_bars))
    }

    fn set_use_utc(&self, use_utc: bool) -> Result<()> {
        self.receive(GroupSetting::UseUtc(use_utc))
    }

    fn set_n_bins(&self, n_bins: u32) -> Result<()> {
        if n_bins == 0 {
            return Err(Report::new(TrendingError::InvalidBinCount));
        }
        self.receive(GroupSetting::NBins(n_bins))
    }

    fn set_source(&self, source: &str) -> Result<()> {
        self.receive(GroupSetting::Source(source.to_string()))
    }
}
