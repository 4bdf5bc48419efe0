//! Drag-and-drop dashboard building
//!
//! Channels are dragged from the channel tree onto a plot. The drop zone
//! decides whether the plot starts over or gains an overlay series; the
//! plot's title and series names are then recomputed from the full path set.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use error_stack::Report;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::{Axis, ErrorBars};
use crate::naming::{SeriesNames, channel_path};
use crate::plot::{PlotBuilder, TrendingPlot, plot};
use crate::range::RangeToken;
use crate::sync::{FanOut, RangeGroup, SyncRegistry};
use crate::{Result, TrendingError};

/// Drop targets shown over a plot while dragging
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropZone {
    /// Replace the plot's contents
    #[serde(rename = "add")]
    Add,
    #[serde(rename = "overlayY1")]
    OverlayY1,
    #[serde(rename = "overlayY2")]
    OverlayY2,
}

impl DropZone {
    pub fn as_str(&self) -> &'static str {
        match self {
            DropZone::Add => "add",
            DropZone::OverlayY1 => "overlayY1",
            DropZone::OverlayY2 => "overlayY2",
        }
    }

    pub fn axis(&self) -> Axis {
        match self {
            DropZone::Add | DropZone::OverlayY1 => Axis::Y1,
            DropZone::OverlayY2 => Axis::Y2,
        }
    }
}

impl fmt::Display for DropZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DropZone {
    type Err = Report<TrendingError>;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "add" => Ok(DropZone::Add),
            "overlayY1" => Ok(DropZone::OverlayY1),
            "overlayY2" => Ok(DropZone::OverlayY2),
            _ => Err(Report::new(TrendingError::UnknownDropZone(s.to_string()))),
        }
    }
}

/// A channel dragged out of the tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedNode {
    pub path: Vec<String>,
    pub key: String,
}

impl DroppedNode {
    pub fn new(path: Vec<String>, key: impl Into<String>) -> Self {
        Self {
            path,
            key: key.into(),
        }
    }

    /// Build from a tree node's text and its ancestors' texts, root first
    pub fn from_tree<S: AsRef<str>>(text: &str, ancestors: &[S], key: impl Into<String>) -> Self {
        Self::new(channel_path(text, ancestors), key)
    }
}

/// A plot that accepts dropped channels
#[derive(Debug)]
pub struct DropTargetPlot {
    names: SeriesNames,
    plot: Arc<TrendingPlot>,
}

impl DropTargetPlot {
    pub fn new(plot: Arc<TrendingPlot>) -> Self {
        Self {
            names: SeriesNames::new(),
            plot,
        }
    }

    pub fn plot(&self) -> &Arc<TrendingPlot> {
        &self.plot
    }

    pub fn names(&self) -> &SeriesNames {
        &self.names
    }

    /// Add `nodes` through `zone`, then retitle and reload the plot
    pub fn drop_nodes(&mut self, zone: DropZone, nodes: &[DroppedNode]) -> Result<()> {
        for (i, node) in nodes.iter().enumerate() {
            if zone == DropZone::Add && i == 0 {
                self.names.clear();
            }
            self.names.add_data(node.path.clone(), node.key.clone(), zone.axis());
        }
        debug!(
            plot = %self.plot.id(),
            zone = %zone,
            dropped = nodes.len(),
            series = self.names.len(),
            "Dropped channels"
        );
        self.plot.set_series(self.names.title(), self.names.series())
    }

    /// `<trending-data>` markup for the plot's current series
    pub fn markup(&self) -> String {
        self.names.trending_data_markup()
    }

    /// `<trending-plot>` element for a saved page
    pub fn plot_markup(&self) -> String {
        let use_utc = if self.plot.settings().use_utc {
            " useUTC"
        } else {
            ""
        };
        format!(
            r#"<trending-plot restURL="{}"{} title="{}">{}</trending-plot>"#,
            self.plot.rest_url(),
            use_utc,
            self.names.title(),
            self.markup()
        )
    }
}

/// Grid of drop-target plots sharing one range group
pub struct Dashboard {
    registry: Arc<SyncRegistry>,
    group: String,
    columns: usize,
    plots: Vec<DropTargetPlot>,
    template: fn(String) -> PlotBuilder,
}

impl fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dashboard")
            .field("group", &self.group)
            .field("columns", &self.columns)
            .field("plots", &self.plots.len())
            .finish()
    }
}

impl Dashboard {
    /// A dashboard with one plot in one column
    pub fn new(registry: &Arc<SyncRegistry>, group: impl Into<String>) -> Result<Self> {
        Self::with_template(registry, group, |group| plot(group))
    }

    /// Like [`Dashboard::new`], building each plot from `template(group)`
    pub fn with_template(
        registry: &Arc<SyncRegistry>,
        group: impl Into<String>,
        template: fn(String) -> PlotBuilder,
    ) -> Result<Self> {
        let mut dash = Self {
            registry: Arc::clone(registry),
            group: group.into(),
            columns: 1,
            plots: vec![],
            template,
        };
        dash.add_plot()?;
        Ok(dash)
    }

    pub fn group(&self) -> Arc<RangeGroup> {
        self.registry.get_or_create(&self.group)
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn plots(&self) -> &[DropTargetPlot] {
        &self.plots
    }

    pub fn plot_mut(&mut self, index: usize) -> Option<&mut DropTargetPlot> {
        self.plots.get_mut(index)
    }

    pub fn add_plot(&mut self) -> Result<&mut DropTargetPlot> {
        let plot = (self.template)(self.group.clone()).attach(&self.registry)?;
        self.plots.push(DropTargetPlot::new(plot));
        let index = self.plots.len() - 1;
        Ok(&mut self.plots[index])
    }

    /// Remove the last plot; the grid always keeps one
    pub fn remove_plot(&mut self) -> bool {
        if self.plots.len() <= 1 {
            return false;
        }
        match self.plots.pop() {
            Some(target) => {
                target.plot.detach();
                true
            }
            None => false,
        }
    }

    pub fn add_column(&mut self) -> usize {
        self.columns += 1;
        self.columns
    }

    /// Remove a column; the grid always keeps one
    pub fn remove_column(&mut self) -> usize {
        self.columns = self.columns.saturating_sub(1).max(1);
        self.columns
    }

    pub fn set_range(&self, range: impl Into<RangeToken>) -> Result<FanOut> {
        self.group().set_range(range)
    }

    pub fn set_error_bars(&self, error_bars: ErrorBars) -> Result<FanOut> {
        self.group().set_error_bars(error_bars)
    }

    pub fn set_use_utc(&self, use_utc: bool) -> Result<FanOut> {
        self.group().set_use_utc(use_utc)
    }

    /// Markup for every plot that has series, one `<trending-plot>` each
    pub fn markup(&self) -> String {
        self.plots
            .iter()
            .filter(|target| !target.names.is_empty())
            .map(DropTargetPlot::plot_markup)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SeriesSpec;

    fn node(path: &str, key: &str) -> DroppedNode {
        DroppedNode::new(path.split('/').map(str::to_string).collect(), key)
    }

    fn dashboard() -> Dashboard {
        let registry = Arc::new(SyncRegistry::new());
        Dashboard::new(&registry, "dash").unwrap()
    }

    #[test]
    fn test_drop_zone_ids() {
        assert_eq!("add".parse::<DropZone>().unwrap(), DropZone::Add);
        assert_eq!("overlayY2".parse::<DropZone>().unwrap(), DropZone::OverlayY2);
        let err = "overlay".parse::<DropZone>().unwrap_err();
        assert_eq!(
            err.current_context(),
            &TrendingError::UnknownDropZone("overlay".into())
        );
        assert_eq!(DropZone::OverlayY1.to_string(), "overlayY1");
    }

    #[test]
    fn test_add_replaces_and_overlay_appends() {
        let mut dash = dashboard();
        let target = dash.plot_mut(0).unwrap();

        target
            .drop_nodes(DropZone::Add, &[node("a/b/x", "1"), node("a/c/x", "2")])
            .unwrap();
        assert_eq!(target.plot().title(), "a/*/x");

        target
            .drop_nodes(DropZone::OverlayY2, &[node("a/d/x", "3")])
            .unwrap();
        assert_eq!(
            target.plot().series(),
            vec![
                SeriesSpec::new("1", Axis::Y1, "b"),
                SeriesSpec::new("2", Axis::Y1, "c"),
                SeriesSpec::new("3", Axis::Y2, "d"),
            ]
        );

        target.drop_nodes(DropZone::Add, &[node("q/r", "9")]).unwrap();
        assert_eq!(target.plot().title(), "q");
        assert_eq!(target.plot().labels(), vec!["time", "r"]);
    }

    #[test]
    fn test_dropped_node_from_tree() {
        let node = DroppedNode::from_tree("Temp", &["cam", "R22/Reb0"], "55");
        assert_eq!(node.path, vec!["cam", "R22", "Reb0", "Temp"]);
        assert_eq!(node.key, "55");
    }

    #[test]
    fn test_grid_never_empties() {
        let mut dash = dashboard();
        assert!(!dash.remove_plot());
        assert_eq!(dash.plots().len(), 1);

        dash.add_plot().unwrap();
        assert_eq!(dash.group().member_count(), 2);
        assert!(dash.remove_plot());
        assert_eq!(dash.group().member_count(), 1);

        assert_eq!(dash.remove_column(), 1);
        assert_eq!(dash.add_column(), 2);
        assert_eq!(dash.remove_column(), 1);
    }

    #[test]
    fn test_dashboard_controls_drive_every_plot() {
        let mut dash = dashboard();
        dash.add_plot().unwrap();

        let fan_out = dash.set_range("1w").unwrap();
        assert_eq!(fan_out.notified, 2);
        for target in dash.plots() {
            assert_eq!(target.plot().range(), RangeToken::from("1w"));
        }

        dash.set_error_bars(ErrorBars::Rms).unwrap();
        dash.set_use_utc(true).unwrap();
        for target in dash.plots() {
            assert_eq!(target.plot().settings().error_bars, ErrorBars::Rms);
            assert!(target.plot().settings().use_utc);
        }
    }

    #[test]
    fn test_dashboard_markup_skips_empty_plots() {
        let mut dash = dashboard();
        dash.add_plot().unwrap();
        dash.plot_mut(1)
            .unwrap()
            .drop_nodes(DropZone::Add, &[node("a/b", "7")])
            .unwrap();

        assert_eq!(
            dash.markup(),
            concat!(
                r#"<trending-plot restURL="" title="a">"#,
                r#"<trending-data key="7" axis="y1">b</trending-data>"#,
                "</trending-plot>",
            )
        );
    }

    #[test]
    fn test_plot_markup_carries_endpoint_title_and_timezone() {
        let registry = Arc::new(SyncRegistry::new());
        let mut dash =
            Dashboard::with_template(&registry, "g", |group| plot(group).rest_url("rest/data"))
                .unwrap();
        dash.plot_mut(0)
            .unwrap()
            .drop_nodes(DropZone::Add, &[node("cam/R22/temp", "1"), node("cam/R10/temp", "2")])
            .unwrap();
        dash.set_use_utc(true).unwrap();

        assert_eq!(
            dash.plots()[0].plot_markup(),
            concat!(
                r#"<trending-plot restURL="rest/data" useUTC title="cam/*/temp">"#,
                r#"<trending-data key="1" axis="y1">R22</trending-data>"#,
                r#"<trending-data key="2" axis="y1">R10</trending-data>"#,
                "</trending-plot>",
            )
        );
    }

    #[test]
    fn test_template_configures_new_plots() {
        let registry = Arc::new(SyncRegistry::new());
        let dash = Dashboard::with_template(&registry, "g", |group| {
            plot(group).rest_url("rest").auto_update(false)
        })
        .unwrap();
        let request = dash.plots()[0].plot().data_request(0);
        assert_eq!(request.rest_url, "rest");
    }
}
