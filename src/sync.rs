//! Range groups: shared view state for plots that move together
//!
//! A [`SyncRegistry`] maps group names to [`RangeGroup`]s. Writing a field
//! on a group stores it and then calls the matching setter on every member,
//! in join order, before returning. Members are held weakly; a plot that
//! has been dropped is skipped and pruned on the next write.
//!
//! Writes are compare-before-set at both ends. A member that reacts to an
//! update by writing the same value back to its group stops the chain there.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use error_stack::Report;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::core::ErrorBars;
use crate::range::RangeToken;
use crate::{Result, TrendingError};

pub const DEFAULT_BINS: u32 = 100;

/// Receiver of group updates, implemented by plot widgets.
///
/// Implementations must ignore a value equal to the one they already hold.
pub trait GroupMember: Send + Sync {
    fn set_range(&self, range: &RangeToken) -> Result<()>;
    fn set_error_bars(&self, error_bars: ErrorBars) -> Result<()>;
    fn set_use_utc(&self, use_utc: bool) -> Result<()>;
    fn set_n_bins(&self, n_bins: u32) -> Result<()>;
    fn set_source(&self, source: &str) -> Result<()>;
}

/// A single field write on a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum GroupSetting {
    Range(RangeToken),
    ErrorBars(ErrorBars),
    UseUtc(bool),
    NBins(u32),
    Source(String),
}

impl GroupSetting {
    pub fn field(&self) -> &'static str {
        match self {
            GroupSetting::Range(_) => "range",
            GroupSetting::ErrorBars(_) => "error_bars",
            GroupSetting::UseUtc(_) => "use_utc",
            GroupSetting::NBins(_) => "n_bins",
            GroupSetting::Source(_) => "source",
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            GroupSetting::NBins(0) => Err(Report::new(TrendingError::InvalidBinCount)),
            _ => Ok(()),
        }
    }

    fn apply_to(&self, member: &dyn GroupMember) -> Result<()> {
        match self {
            GroupSetting::Range(range) => member.set_range(range),
            GroupSetting::ErrorBars(error_bars) => member.set_error_bars(*error_bars),
            GroupSetting::UseUtc(use_utc) => member.set_use_utc(*use_utc),
            GroupSetting::NBins(n_bins) => member.set_n_bins(*n_bins),
            GroupSetting::Source(source) => member.set_source(source),
        }
    }
}

/// View state shared by every member of a group
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RangeGroupState {
    pub range: RangeToken,
    pub error_bars: ErrorBars,
    pub use_utc: bool,
    pub n_bins: u32,
    pub source: String,
}

impl RangeGroupState {
    /// Store `setting`; false when the stored value already matched
    pub(crate) fn apply(&mut self, setting: &GroupSetting) -> bool {
        fn replace<T: PartialEq + Clone>(slot: &mut T, value: &T) -> bool {
            if slot == value {
                return false;
            }
            *slot = value.clone();
            true
        }

        match setting {
            GroupSetting::Range(range) => replace(&mut self.range, range),
            GroupSetting::ErrorBars(error_bars) => replace(&mut self.error_bars, error_bars),
            GroupSetting::UseUtc(use_utc) => replace(&mut self.use_utc, use_utc),
            GroupSetting::NBins(n_bins) => replace(&mut self.n_bins, n_bins),
            GroupSetting::Source(source) => replace(&mut self.source, source),
        }
    }
}

impl RangeGroupState {
    /// Whether the stored field already equals `setting`
    pub(crate) fn holds(&self, setting: &GroupSetting) -> bool {
        match setting {
            GroupSetting::Range(range) => self.range == *range,
            GroupSetting::ErrorBars(error_bars) => self.error_bars == *error_bars,
            GroupSetting::UseUtc(use_utc) => self.use_utc == *use_utc,
            GroupSetting::NBins(n_bins) => self.n_bins == *n_bins,
            GroupSetting::Source(source) => self.source == *source,
        }
    }
}

/// Seed values for groups created on first reference
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDefaults {
    pub range: RangeToken,
    pub error_bars: ErrorBars,
    pub use_utc: bool,
    pub n_bins: u32,
    pub source: String,
}

impl Default for GroupDefaults {
    fn default() -> Self {
        Self {
            range: RangeToken::default(),
            error_bars: ErrorBars::None,
            use_utc: false,
            n_bins: DEFAULT_BINS,
            source: String::new(),
        }
    }
}

impl GroupDefaults {
    /// Defaults used by pages that start with min/max error bars
    pub fn min_max() -> Self {
        Self {
            error_bars: ErrorBars::MinMax,
            ..Self::default()
        }
    }

    fn state(&self) -> RangeGroupState {
        RangeGroupState {
            range: self.range.clone(),
            error_bars: self.error_bars,
            use_utc: self.use_utc,
            n_bins: self.n_bins.max(1),
            source: self.source.clone(),
        }
    }
}

/// Outcome of one group write
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct FanOut {
    /// Members whose setter returned successfully
    pub notified: usize,
    /// Members whose setter returned an error
    pub failed: usize,
}

impl FanOut {
    pub fn is_noop(&self) -> bool {
        self.notified == 0 && self.failed == 0
    }
}

fn member_addr(member: &Weak<dyn GroupMember>) -> *const () {
    member.as_ptr() as *const ()
}

/// A named group of synchronized plots
pub struct RangeGroup {
    name: String,
    state: Mutex<RangeGroupState>,
    members: Mutex<Vec<Weak<dyn GroupMember>>>,
}

impl std::fmt::Debug for RangeGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RangeGroup")
            .field("name", &self.name)
            .field("state", &*self.state.lock())
            .field("members", &self.members.lock().len())
            .finish()
    }
}

impl RangeGroup {
    fn new(name: impl Into<String>, state: RangeGroupState) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(state),
            members: Mutex::new(vec![]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> RangeGroupState {
        self.state.lock().clone()
    }

    pub fn range(&self) -> RangeToken {
        self.state.lock().range.clone()
    }

    pub fn error_bars(&self) -> ErrorBars {
        self.state.lock().error_bars
    }

    pub fn use_utc(&self) -> bool {
        self.state.lock().use_utc
    }

    pub fn n_bins(&self) -> u32 {
        self.state.lock().n_bins
    }

    pub fn source(&self) -> String {
        self.state.lock().source.clone()
    }

    /// Append a member. Joining twice means being notified twice.
    pub fn join<M: GroupMember + 'static>(&self, member: &Arc<M>) {
        let weak = Arc::downgrade(member);
        let weak: Weak<dyn GroupMember> = weak;
        let mut members = self.members.lock();
        members.push(weak);
        debug!(group = %self.name, members = members.len(), "Member joined");
    }

    /// Remove one occurrence of `member`, matched by identity
    pub fn leave<M: GroupMember + 'static>(&self, member: &Arc<M>) -> bool {
        let target = Arc::as_ptr(member) as *const ();
        let mut members = self.members.lock();
        match members.iter().position(|m| member_addr(m) == target) {
            Some(index) => {
                members.remove(index);
                debug!(group = %self.name, members = members.len(), "Member left");
                true
            }
            None => false,
        }
    }

    /// Members whose handle is still alive
    pub fn member_count(&self) -> usize {
        self.members
            .lock()
            .iter()
            .filter(|m| m.strong_count() > 0)
            .count()
    }

    pub fn set_range(&self, range: impl Into<RangeToken>) -> Result<FanOut> {
        self.update(GroupSetting::Range(range.into()))
    }

    pub fn set_error_bars(&self, error_bars: ErrorBars) -> Result<FanOut> {
        self.update(GroupSetting::ErrorBars(error_bars))
    }

    pub fn set_use_utc(&self, use_utc: bool) -> Result<FanOut> {
        self.update(GroupSetting::UseUtc(use_utc))
    }

    pub fn set_n_bins(&self, n_bins: u32) -> Result<FanOut> {
        self.update(GroupSetting::NBins(n_bins))
    }

    pub fn set_source(&self, source: impl Into<String>) -> Result<FanOut> {
        self.update(GroupSetting::Source(source.into()))
    }

    /// Store `setting` and push it to every live member.
    ///
    /// A member error is logged and counted; the remaining members are
    /// still notified. A member may write a different value back while it
    /// is notified; that nested write reaches every member itself, so the
    /// older value is not sent any further.
    pub fn update(&self, setting: GroupSetting) -> Result<FanOut> {
        setting.validate()?;

        if !self.state.lock().apply(&setting) {
            debug!(group = %self.name, field = setting.field(), "Value unchanged, skipping fan-out");
            return Ok(FanOut::default());
        }

        let members = self.live_members();
        let mut fan_out = FanOut::default();
        for member in &members {
            match setting.apply_to(member.as_ref()) {
                Ok(()) => fan_out.notified += 1,
                Err(report) => {
                    fan_out.failed += 1;
                    warn!(
                        group = %self.name,
                        field = setting.field(),
                        "Member failed to apply update: {report:?}"
                    );
                }
            }
            if !self.state.lock().holds(&setting) {
                debug!(
                    group = %self.name,
                    field = setting.field(),
                    "Value superseded during fan-out"
                );
                break;
            }
        }

        debug!(
            group = %self.name,
            field = setting.field(),
            notified = fan_out.notified,
            failed = fan_out.failed,
            "Fanned out group update"
        );
        Ok(fan_out)
    }

    /// Snapshot of live members; the lock is released before they are called
    fn live_members(&self) -> Vec<Arc<dyn GroupMember>> {
        let mut members = self.members.lock();
        let before = members.len();
        members.retain(|m| m.strong_count() > 0);
        let pruned = before - members.len();
        if pruned > 0 {
            warn!(group = %self.name, pruned, "Pruned dropped group members");
        }
        members.iter().filter_map(Weak::upgrade).collect()
    }
}

/// Registry of range groups for one page session
#[derive(Debug, Default)]
pub struct SyncRegistry {
    groups: DashMap<String, Arc<RangeGroup>>,
    defaults: GroupDefaults,
}

impl SyncRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults(defaults: GroupDefaults) -> Self {
        Self {
            groups: DashMap::new(),
            defaults,
        }
    }

    pub fn defaults(&self) -> &GroupDefaults {
        &self.defaults
    }

    /// Get the named group, creating it from the defaults on first use
    pub fn get_or_create(&self, name: &str) -> Arc<RangeGroup> {
        if let Some(group) = self.groups.get(name) {
            return Arc::clone(group.value());
        }

        let entry = self.groups.entry(name.to_string()).or_insert_with(|| {
            info!(group = name, "Created range group");
            Arc::new(RangeGroup::new(name, self.defaults.state()))
        });
        Arc::clone(entry.value())
    }

    pub fn get(&self, name: &str) -> Option<Arc<RangeGroup>> {
        self.groups.get(name).map(|g| Arc::clone(g.value()))
    }

    /// Join `member` to the named group, creating the group if needed
    pub fn join<M: GroupMember + 'static>(&self, name: &str, member: &Arc<M>) -> Arc<RangeGroup> {
        let group = self.get_or_create(name);
        group.join(member);
        group
    }

    pub fn group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.groups.iter().map(|g| g.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
