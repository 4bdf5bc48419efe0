use std::sync::Arc;

use ccs_trending::prelude::*;
use parking_lot::Mutex;

const NOW: i64 = 1_000 * DAY_MS as i64;

fn fixed_clock() -> i64 {
    NOW
}

fn node(path: &str, key: &str) -> DroppedNode {
    DroppedNode::new(path.split('/').map(str::to_string).collect(), key)
}

/// A page with two range groups and three plots
struct Page {
    registry: Arc<SyncRegistry>,
    plots: Vec<Arc<TrendingPlot>>,
    log: Arc<Mutex<Vec<(PlotId, PlotUpdate)>>>,
}

impl Page {
    fn new() -> Self {
        let registry = Arc::new(SyncRegistry::with_defaults(GroupDefaults::min_max()));
        let log = Arc::new(Mutex::new(vec![]));
        let plots = ["left", "left", "right"]
            .into_iter()
            .map(|group| {
                let sink = Arc::clone(&log);
                plot(group)
                    .rest_url("rest")
                    .clock(fixed_clock)
                    .on_update(move |id, update| {
                        sink.lock().push((id, update.clone()));
                        Ok(())
                    })
                    .attach(&registry)
                    .unwrap()
            })
            .collect();
        Self {
            registry,
            plots,
            log,
        }
    }

    fn updates_for(&self, index: usize) -> Vec<PlotUpdate> {
        let id = self.plots[index].id();
        self.log
            .lock()
            .iter()
            .filter(|(plot, _)| *plot == id)
            .map(|(_, update)| update.clone())
            .collect()
    }
}

#[test]
fn groups_are_independent() {
    let page = Page::new();
    let left = page.registry.get("left").unwrap();

    let fan_out = left.set_range("1w").unwrap();
    assert_eq!(fan_out, FanOut { notified: 2, failed: 0 });

    assert_eq!(page.plots[0].range(), RangeToken::from("1w"));
    assert_eq!(page.plots[1].range(), RangeToken::from("1w"));
    assert_eq!(page.plots[2].range(), RangeToken::from("1d"));
    assert!(page.updates_for(2).is_empty());
}

#[test]
fn zoom_on_one_plot_moves_its_siblings() {
    let page = Page::new();
    page.plots[1].on_zoom(5_000.0, 9_000.0).unwrap();

    let window = TimeRange::new(5_000, 9_000);
    for index in [0, 1] {
        let updates = page.updates_for(index);
        assert_eq!(updates.len(), 1, "plot {index}");
        let PlotUpdate::Reload(request) = &updates[0] else {
            panic!("expected a reload");
        };
        assert_eq!(request.window, window);
        assert!(request.query.contains("errorBars=MINMAX"));
    }
    assert_eq!(
        RangePreset::classify(&page.registry.get("left").unwrap().range()),
        RangePreset::Custom
    );
}

#[test]
fn preset_after_zoom_restores_auto_update() {
    let page = Page::new();
    let target = &page.plots[0];
    target.on_zoom(0.0, 1_000.0).unwrap();
    assert!(!target.tick(NOW).unwrap());

    target
        .change_range(RangePreset::ThreeHours.token().unwrap())
        .unwrap();
    assert!(target.tick(NOW + AUTO_UPDATE_INTERVAL_MS).unwrap());
    assert_eq!(
        target.window(NOW),
        TimeRange::new(NOW - 3 * HOUR_MS as i64, NOW)
    );
}

#[test]
fn dropped_plot_is_skipped() {
    let mut page = Page::new();
    let left = page.registry.get("left").unwrap();
    page.plots.remove(0);

    let fan_out = left.set_n_bins(500).unwrap();
    assert_eq!(fan_out.notified, 1);
    assert_eq!(left.member_count(), 1);
}

#[test]
fn dashboard_builder_flow() {
    let registry = Arc::new(SyncRegistry::new());
    let mut dash = Dashboard::new(&registry, "builder").unwrap();
    dash.add_plot().unwrap();

    let first = dash.plot_mut(0).unwrap();
    first
        .drop_nodes(
            DropZone::Add,
            &[
                DroppedNode::from_tree("temp", &["cam", "R22"], "10"),
                DroppedNode::from_tree("temp", &["cam", "R10"], "11"),
            ],
        )
        .unwrap();
    first
        .drop_nodes("overlayY2".parse().unwrap(), &[node("cam/R30/temp", "12")])
        .unwrap();
    assert_eq!(first.plot().title(), "cam/*/temp");
    assert_eq!(first.plot().labels(), vec!["time", "R22", "R10", "R30"]);

    dash.set_range(RangePreset::Week.token().unwrap()).unwrap();
    dash.set_use_utc(true).unwrap();
    for target in dash.plots() {
        assert_eq!(target.plot().range(), RangeToken::from("1w"));
        assert!(target.plot().settings().use_utc);
    }

    assert_eq!(
        dash.markup(),
        concat!(
            r#"<trending-plot restURL="" useUTC title="cam/*/temp">"#,
            r#"<trending-data key="10" axis="y1">R22</trending-data>"#,
            r#"<trending-data key="11" axis="y1">R10</trending-data>"#,
            r#"<trending-data key="12" axis="y2">R30</trending-data>"#,
            "</trending-plot>",
        )
    );
}

#[test]
fn query_encoding_for_custom_requests() {
    let mut params = Params::new();
    params.insert("key".into(), vec!["a", "b"].into());
    let mut options = Params::new();
    options.insert("flavor".into(), "stat".into());
    params.insert("options".into(), Param::Map(options));
    assert_eq!(encode_params(&params), "key=a&key=b&options[flavor]=stat");
}
