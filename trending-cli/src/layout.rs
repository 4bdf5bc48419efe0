//! Dashboard layout files and the session built from them

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use trending::prelude::*;

use crate::error::{CliError, Result};

/// A dashboard description: shared groups and the plots wired into them
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Layout {
    /// Data endpoint every plot fetches from
    #[serde(default)]
    pub rest_url: String,

    /// Seed values for groups created on first reference
    #[serde(default)]
    pub defaults: GroupDefaults,

    /// Per-group values written after creation
    #[serde(default)]
    pub groups: BTreeMap<String, GroupOverrides>,

    #[serde(default)]
    pub plots: Vec<PlotLayout>,
}

impl Layout {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }
}

/// Optional group fields; unset fields are left alone
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupOverrides {
    pub range: Option<RangeToken>,
    pub error_bars: Option<ErrorBars>,
    pub use_utc: Option<bool>,
    pub n_bins: Option<u32>,
    pub source: Option<String>,
}

impl GroupOverrides {
    pub fn settings(&self) -> Vec<GroupSetting> {
        let mut settings = vec![];
        if let Some(range) = &self.range {
            settings.push(GroupSetting::Range(range.clone()));
        }
        if let Some(error_bars) = self.error_bars {
            settings.push(GroupSetting::ErrorBars(error_bars));
        }
        if let Some(use_utc) = self.use_utc {
            settings.push(GroupSetting::UseUtc(use_utc));
        }
        if let Some(n_bins) = self.n_bins {
            settings.push(GroupSetting::NBins(n_bins));
        }
        if let Some(source) = &self.source {
            settings.push(GroupSetting::Source(source.clone()));
        }
        settings
    }

    pub fn is_empty(&self) -> bool {
        self.settings().is_empty()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlotLayout {
    #[serde(default = "default_group")]
    pub group: String,

    /// Title shown instead of the derived one
    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub series: Vec<SeriesLayout>,

    #[serde(default = "default_auto_update")]
    pub auto_update: bool,
}

fn default_group() -> String {
    "default".to_string()
}

fn default_auto_update() -> bool {
    true
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SeriesLayout {
    /// Slash-delimited channel path
    pub path: String,
    pub key: String,
    #[serde(default)]
    pub axis: Axis,
}

/// What gets printed for one plot
#[derive(Clone, Debug, Serialize)]
pub struct PlotReport {
    pub id: String,
    pub group: String,
    pub title: String,
    pub names: Vec<String>,
    pub markup: String,
    pub preset: String,
    pub window: String,
    pub url: String,
}

/// Plots from a layout, attached to a live registry
pub struct Session {
    registry: Arc<SyncRegistry>,
    plots: Vec<DropTargetPlot>,
    reloads: Arc<AtomicUsize>,
}

impl Session {
    pub fn build(layout: &Layout) -> Result<Self> {
        let registry = Arc::new(SyncRegistry::with_defaults(layout.defaults.clone()));
        for (name, overrides) in &layout.groups {
            let group = registry.get_or_create(name);
            for setting in overrides.settings() {
                group.update(setting)?;
            }
        }

        let reloads = Arc::new(AtomicUsize::new(0));
        let mut plots = Vec::with_capacity(layout.plots.len());
        for plot_layout in &layout.plots {
            let counter = Arc::clone(&reloads);
            let handle = plot(plot_layout.group.as_str())
                .rest_url(layout.rest_url.as_str())
                .auto_update(plot_layout.auto_update)
                .on_update(move |id, update| {
                    if let PlotUpdate::Reload(request) = update {
                        counter.fetch_add(1, Ordering::Relaxed);
                        debug!(plot = %id, url = %request.url(), "Reload requested");
                    }
                    Ok(())
                })
                .attach(&registry)?;

            let mut target = DropTargetPlot::new(handle);
            for (i, series) in plot_layout.series.iter().enumerate() {
                let zone = match (i, series.axis) {
                    (0, Axis::Y1) => DropZone::Add,
                    (_, Axis::Y1) => DropZone::OverlayY1,
                    (_, Axis::Y2) => DropZone::OverlayY2,
                };
                let node = DroppedNode::from_tree::<&str>(&series.path, &[], series.key.as_str());
                target.drop_nodes(zone, &[node])?;
            }
            let title = plot_layout
                .title
                .clone()
                .unwrap_or_else(|| target.names().title().to_string());
            target.plot().set_series(title, target.names().series())?;
            plots.push(target);
        }

        info!(
            groups = registry.len(),
            plots = plots.len(),
            "Layout attached"
        );
        Ok(Self {
            registry,
            plots,
            reloads,
        })
    }

    /// Write `overrides` to one group, or to every group when `group` is `None`
    pub fn apply(&self, group: Option<&str>, overrides: &GroupOverrides) -> Result<FanOut> {
        let groups = match group {
            Some(name) => vec![
                self.registry
                    .get(name)
                    .ok_or_else(|| CliError::UnknownGroup(name.to_string()))?,
            ],
            None => self
                .registry
                .group_names()
                .iter()
                .filter_map(|name| self.registry.get(name))
                .collect(),
        };

        let mut total = FanOut::default();
        for group in groups {
            for setting in overrides.settings() {
                let fan_out = group.update(setting)?;
                total.notified += fan_out.notified;
                total.failed += fan_out.failed;
            }
        }
        Ok(total)
    }

    pub fn reloads(&self) -> usize {
        self.reloads.load(Ordering::Relaxed)
    }

    pub fn report(&self, now: i64) -> Vec<PlotReport> {
        self.plots
            .iter()
            .map(|target| {
                let plot = target.plot();
                PlotReport {
                    id: plot.id().to_string(),
                    group: plot.group_name().to_string(),
                    title: plot.title(),
                    names: target.names().names().to_vec(),
                    markup: target.markup(),
                    preset: RangePreset::classify(&plot.range()).label().to_string(),
                    window: plot.describe_window(now),
                    url: plot.data_request(now).url(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LAYOUT: &str = r#"{
        "rest_url": "rest/data",
        "defaults": { "n_bins": 200 },
        "groups": { "focal": { "range": "1h" } },
        "plots": [
            {
                "group": "focal",
                "series": [
                    { "path": "cam/R22/temp", "key": "1" },
                    { "path": "cam/R10/temp", "key": "2", "axis": "y2" }
                ]
            },
            {
                "group": "focal",
                "title": "Vacuum",
                "series": [{ "path": "cam/vac/pressure", "key": "3" }]
            },
            { "series": [] }
        ]
    }"#;

    fn session() -> Session {
        let layout: Layout = serde_json::from_str(LAYOUT).unwrap();
        Session::build(&layout).unwrap()
    }

    #[test]
    fn test_layout_defaults() {
        let layout: Layout = serde_json::from_str(LAYOUT).unwrap();
        assert_eq!(layout.defaults.n_bins, 200);
        assert_eq!(layout.defaults.range, RangeToken::from("1d"));
        assert_eq!(layout.plots[2].group, "default");
        assert!(layout.plots[2].auto_update);
    }

    #[test]
    fn test_session_derives_names() {
        let reports = session().report(3_600_000);
        assert_eq!(reports.len(), 3);

        assert_eq!(reports[0].title, "cam/*/temp");
        assert_eq!(reports[0].names, vec!["R22", "R10"]);
        assert_eq!(
            reports[0].markup,
            concat!(
                r#"<trending-data key="1" axis="y1">R22</trending-data>"#,
                r#"<trending-data key="2" axis="y2">R10</trending-data>"#,
            )
        );
        assert_eq!(reports[0].preset, "hour");
        assert_eq!(
            reports[0].url,
            "rest/data?key=1&key=2&t1=0&t2=3600000&n=200&errorBars=NONE"
        );

        assert_eq!(reports[1].title, "Vacuum");
        assert_eq!(reports[2].title, "No data");
        assert_eq!(reports[2].group, "default");
        assert_eq!(reports[2].preset, "day");
    }

    #[test]
    fn test_overrides_fan_out_to_group() {
        let session = session();
        let before = session.reloads();
        let overrides = GroupOverrides {
            range: Some("6h".into()),
            error_bars: Some(ErrorBars::MinMax),
            ..Default::default()
        };

        let fan_out = session.apply(Some("focal"), &overrides).unwrap();
        assert_eq!(fan_out.notified, 4);
        assert_eq!(session.reloads(), before + 4);

        // Writing the same values again changes nothing
        let fan_out = session.apply(Some("focal"), &overrides).unwrap();
        assert!(fan_out.is_noop());

        let reports = session.report(0);
        assert_eq!(reports[0].preset, "6 hour");
        assert_eq!(reports[2].preset, "day");
    }

    #[test]
    fn test_unknown_group() {
        let err = session()
            .apply(Some("nope"), &GroupOverrides::default())
            .unwrap_err();
        assert!(matches!(err, CliError::UnknownGroup(name) if name == "nope"));
    }

    #[test]
    fn test_zero_bins_surface_as_trending_error() {
        let overrides = GroupOverrides {
            n_bins: Some(0),
            ..Default::default()
        };
        let err = session().apply(None, &overrides).unwrap_err();
        assert!(matches!(err, CliError::Trending(TrendingError::InvalidBinCount)));
    }
}
