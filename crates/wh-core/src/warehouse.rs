//! The warehouse facade.
//!
//! All mutations go through one mutex and run to completion before the next
//! starts. Events are emitted before the lock is released. The other side
//! effects a mutation records (feeds to re-check, timers to cancel) are
//! applied after.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use wh_fabric::{ChangeMessage, EventBus, EventFilter, EventPayload, EventStream};
use wh_ownership::{Collection, DanglingParent, Detached, OwnershipError, OwnershipUpdate, UpdateOutcome};
use wh_store::{StatePersistence, WarehouseState};
use wh_types::pattern::compile_all;
use wh_types::{project, BranchId, FeedId, Generation, StatePath, View};

use crate::changes::ChangeTracker;
use crate::config::WarehouseConfig;
use crate::diagnostics::DiagnosticReport;
use crate::error::{Result, WarehouseError};
use crate::graph::{render_dot, GraphStyle};
use crate::maintenance::{Maintenance, MaintenanceGate};
use crate::query::Query;
use crate::release::ReleaseQueue;
use crate::request::{AttachRequest, UpsertOutcome, UpsertRequest};
use crate::timers::{TimerKey, Timers};

// ---------------------------------------------------------------------------
// Core
// ---------------------------------------------------------------------------

struct Core {
    state: WarehouseState,
    changes: ChangeTracker,
    releases: ReleaseQueue,
    maintenance: MaintenanceGate,
}

/// Side effects of one mutation, applied once the lock is released.
#[derive(Default)]
struct Effects {
    events: Vec<EventPayload>,
    dirty: BTreeSet<FeedId>,
    disposed: BTreeSet<FeedId>,
    release: bool,
}

impl Core {
    fn new() -> Self {
        Self {
            state: WarehouseState::new(),
            changes: ChangeTracker::new(),
            releases: ReleaseQueue::new(),
            maintenance: MaintenanceGate::new(),
        }
    }

    fn mark(&mut self, branch: &BranchId, fx: &mut Effects) {
        fx.dirty
            .extend(self.changes.mark(branch, &self.state.subscriptions));
    }

    /// Drop a branch from storage. Returns `true` if a payload existed.
    fn purge(&mut self, branch: &BranchId, fx: &mut Effects) -> bool {
        let removed = self.state.store.remove(branch);
        self.state.store.clear_creator(branch);
        self.mark(branch, fx);
        removed
    }

    fn release(&mut self, branch: BranchId, fx: &mut Effects) {
        let generation = self.state.store.generation(&branch);
        if generation.is_none() {
            warn!(%branch, "generation is missing for a released branch");
        }
        self.releases.push(branch, generation);
        fx.release = true;
    }

    fn apply_collection(&mut self, collection: Collection, auto_release: bool, fx: &mut Effects) {
        for (feed, branch) in &collection.removed {
            if self.changes.mark_in(feed, branch) {
                fx.dirty.insert(feed.clone());
            }
        }
        for feed in collection.disposed {
            if self.changes.unregister(&feed) {
                debug!(%feed, "feed emptied, change detection stopped");
            }
            fx.dirty.remove(&feed);
            fx.disposed.insert(feed);
        }
        for branch in collection.unreferenced {
            self.release(branch.clone(), fx);
            if auto_release {
                debug!(%branch, "auto-released");
                self.purge(&branch, fx);
            }
        }
    }

    fn upsert(&mut self, request: &UpsertRequest, fx: &mut Effects) -> Result<UpsertOutcome> {
        let branch = &request.branch;

        if request.parents.is_empty() {
            if !self.state.store.contains(branch) {
                warn!(%branch, "upsert ignored, unknown branch without parents");
                return Ok(UpsertOutcome::Ignored);
            }
        } else {
            let feeds = request.target_feeds();
            let outcome = self.state.subscriptions.update_ownership(&OwnershipUpdate {
                branch,
                parents: &request.parents,
                feeds: &feeds,
                creating: request.is_creating,
                creator: request.creator.as_deref(),
            })?;
            if let UpdateOutcome::Collected(reason) = outcome {
                warn!(%branch, ?reason, "upsert discarded, no reachable parent");
                return Ok(UpsertOutcome::Collected);
            }
            match (request.is_creating, request.creator.as_deref()) {
                (Some(true), Some(creator)) => self.state.store.set_creator(branch, creator),
                (Some(false), _) => self.state.store.clear_creator(branch),
                _ => {}
            }
        }

        self.state.store.upsert(branch, request.data.clone());
        if let Some(generation) = request.generation {
            self.state.store.stamp_generation(branch, generation);
        }
        self.mark(branch, fx);
        Ok(UpsertOutcome::Stored)
    }
}

// ---------------------------------------------------------------------------
// Warehouse
// ---------------------------------------------------------------------------

struct Inner {
    config: WarehouseConfig,
    core: Mutex<Core>,
    timers: Timers,
    bus: EventBus,
    persistence: Option<Arc<dyn StatePersistence>>,
}

/// Counters reported by [`Warehouse::stats`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Stats {
    pub branches: usize,
    pub feeds: usize,
    pub watched_feeds: usize,
    pub pending_releases: usize,
    pub subscribers: usize,
    pub maintenance: Option<Maintenance>,
}

/// In-memory object warehouse with per-feed ownership graphs.
///
/// Cloning is cheap; clones share the same state.
#[derive(Clone)]
pub struct Warehouse {
    inner: Arc<Inner>,
}

impl Warehouse {
    /// Create an empty warehouse without persistence.
    pub fn new(config: WarehouseConfig) -> Self {
        Self::build(config, None)
    }

    /// Create an empty warehouse saving to and loading from `persistence`.
    pub fn with_persistence(config: WarehouseConfig, persistence: Arc<dyn StatePersistence>) -> Self {
        Self::build(config, Some(persistence))
    }

    fn build(config: WarehouseConfig, persistence: Option<Arc<dyn StatePersistence>>) -> Self {
        let bus = EventBus::new(config.event_capacity);
        Self {
            inner: Arc::new(Inner {
                config,
                core: Mutex::new(Core::new()),
                timers: Timers::default(),
                bus,
                persistence,
            }),
        }
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.inner.config
    }

    /// Subscribe to warehouse events.
    pub fn events(&self, filter: EventFilter) -> EventStream {
        self.inner.bus.subscribe(filter)
    }

    /// Abort every pending timer. Pending changes stay queued and can still
    /// be flushed with [`Self::sync_changes`] and [`Self::flush_released`].
    pub fn shutdown(&self) {
        self.inner.timers.cancel_all();
        info!("warehouse timers stopped");
    }

    // ---- Plumbing ----

    fn core(&self) -> Result<MutexGuard<'_, Core>> {
        self.inner.core.lock().map_err(|_| WarehouseError::LockPoisoned)
    }

    fn read<T>(&self, op: impl FnOnce(&Core) -> T) -> Result<T> {
        let core = self.core()?;
        Ok(op(&core))
    }

    fn mutate<T>(&self, op: impl FnOnce(&mut Core, &mut Effects) -> Result<T>) -> Result<T> {
        let mut fx = Effects::default();
        let value = {
            let mut core = self.core()?;
            let value = op(&mut core, &mut fx)?;
            // Events leave in the order their mutations ran; feed
            // generations must reach subscribers in sequence.
            for payload in fx.events.drain(..) {
                self.inner.bus.emit(payload);
            }
            value
        };
        self.apply(fx);
        Ok(value)
    }

    fn apply(&self, fx: Effects) {
        for feed in fx.disposed {
            self.inner.timers.cancel(&TimerKey::Feed(feed));
        }
        let window = self.inner.config.change_window();
        for feed in fx.dirty {
            self.arm(TimerKey::Feed(feed), window);
        }
        if fx.release {
            self.arm(TimerKey::Release, self.inner.config.release_window());
        }
    }

    fn arm(&self, key: TimerKey, delay: Duration) {
        let weak = Arc::downgrade(&self.inner);
        let fired = key.clone();
        self.inner.timers.arm(key, delay, move |seq| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            inner.timers.fired(&fired, seq);
            let warehouse = Warehouse { inner };
            let result = match &fired {
                TimerKey::Feed(feed) => warehouse.run_change_pass(feed).map(|_| ()),
                TimerKey::Release => warehouse.run_release_pass().map(|_| ()),
            };
            if let Err(e) = result {
                warn!(key = ?fired, error = %e, "timer pass failed");
            }
        });
    }

    fn persistence(&self) -> Result<Arc<dyn StatePersistence>> {
        self.inner
            .persistence
            .clone()
            .ok_or(WarehouseError::NoPersistence)
    }

    // ---- Ownership ----

    /// Create or update a branch and its parent edges.
    pub fn upsert(&self, request: UpsertRequest) -> Result<UpsertOutcome> {
        self.mutate(|core, fx| core.upsert(&request, fx))
    }

    /// Upsert every entry with the same parents and feeds. Returns the
    /// outcome per branch. If one entry fails, none of them is applied.
    pub fn upsert_in_batch(
        &self,
        branches: BTreeMap<BranchId, Value>,
        parents: &[BranchId],
        feeds: &[FeedId],
    ) -> Result<BTreeMap<BranchId, UpsertOutcome>> {
        self.mutate(|core, fx| {
            let checkpoint = core.state.clone();
            let mut outcomes = BTreeMap::new();
            for (branch, data) in branches {
                let request = UpsertRequest {
                    parents: parents.to_vec(),
                    feeds: feeds.to_vec(),
                    ..UpsertRequest::new(branch.clone()).data(data)
                };
                match core.upsert(&request, fx) {
                    Ok(outcome) => {
                        outcomes.insert(branch, outcome);
                    }
                    Err(e) => {
                        warn!(%branch, error = %e, "batch upsert rolled back");
                        core.state = checkpoint;
                        return Err(e);
                    }
                }
            }
            Ok(outcomes)
        })
    }

    /// Collect a branch from every feed, cascading to the children it
    /// leaves without parents. Returns `false` if no feed held it.
    pub fn delete_branch(&self, branch: &BranchId) -> Result<bool> {
        let auto_release = self.inner.config.is_auto_release(branch);
        self.mutate(|core, fx| {
            let collection = core.state.subscriptions.collect(branch, None);
            let found = !collection.is_empty();
            if !found
                && !branch.is_singleton()
                && core.state.store.contains(branch)
                && !core.state.subscriptions.is_referenced(branch)
            {
                debug!(%branch, "deleting an orphan payload");
                core.release(branch.clone(), fx);
            }
            core.apply_collection(collection, auto_release, fx);
            Ok(found)
        })
    }

    /// Add parent edges. Returns `true` if every feed accepted them.
    pub fn attach(&self, request: AttachRequest) -> Result<bool> {
        let config = &self.inner.config;
        self.mutate(|core, fx| {
            let branch = &request.branch;
            if request.parents.is_empty() {
                return Err(OwnershipError::OrphanBranch {
                    branch: branch.clone(),
                }
                .into());
            }
            let feeds = if request.feeds.is_empty() {
                let held = core.state.subscriptions.feeds_of(branch);
                if held.is_empty() {
                    vec![FeedId::system()]
                } else {
                    held
                }
            } else {
                request.feeds.clone()
            };

            let is_anchor = |parent: &BranchId| config.is_anchor(parent);
            let mut attached = true;
            for feed in &feeds {
                attached &= core.state.subscriptions.attach(
                    branch,
                    &request.parents,
                    feed,
                    request.view.as_ref(),
                    &is_anchor,
                );
            }
            if let Some(generation) = request.generation {
                core.state.store.refresh_generation(branch, generation);
            }
            core.mark(branch, fx);
            for parent in &request.parents {
                core.mark(parent, fx);
            }
            Ok(attached)
        })
    }

    /// Remove the parent edges of `branch` matching any of `parents`
    /// (shell-style wildcards allowed). Empty `feeds` means every feed
    /// holding the branch. A branch left without parents is collected from
    /// that feed.
    pub fn detach<S: AsRef<str>>(
        &self,
        branch: &BranchId,
        parents: &[S],
        feeds: &[FeedId],
    ) -> Result<Vec<Detached>> {
        let patterns = compile_all(parents)?;
        let auto_release = self.inner.config.is_auto_release(branch);
        self.mutate(|core, fx| {
            let feeds = if feeds.is_empty() {
                core.state.subscriptions.feeds_of(branch)
            } else {
                feeds.to_vec()
            };
            let mut results = Vec::with_capacity(feeds.len());
            for feed in &feeds {
                let detached = core.state.subscriptions.detach(branch, &patterns, feed);
                if detached.orphaned {
                    debug!(%branch, %feed, "detached branch has no parent left");
                    let collection = core.state.subscriptions.collect(branch, Some(feed));
                    core.apply_collection(collection, auto_release, fx);
                }
                results.push(detached);
            }
            Ok(results)
        })
    }

    /// Copy `branch` and its ancestry from one feed to another.
    pub fn graft(&self, branch: &BranchId, from: &FeedId, to: &FeedId) -> Result<Vec<BranchId>> {
        self.mutate(|core, fx| {
            let grafted = core.state.subscriptions.graft(branch, from, to)?;
            for id in &grafted {
                core.mark(id, fx);
            }
            Ok(grafted)
        })
    }

    /// Copy `branch` and its descendants from one feed to another. Parent
    /// edges leaving the subtree are not copied.
    pub fn graft_subtree(&self, branch: &BranchId, from: &FeedId, to: &FeedId) -> Result<Vec<BranchId>> {
        self.mutate(|core, fx| {
            let grafted = core.state.subscriptions.graft_subtree(branch, from, to)?;
            for id in &grafted {
                core.mark(id, fx);
            }
            Ok(grafted)
        })
    }

    /// Delete a branch if `generation` is still its generation. Returns
    /// `false` for a stale or repeated acknowledgement.
    pub fn acknowledge(&self, branch: &BranchId, generation: Generation) -> Result<bool> {
        self.mutate(|core, fx| {
            if core.state.store.generation(branch) != Some(generation) {
                debug!(%branch, generation, "stale acknowledge ignored");
                return Ok(false);
            }
            core.purge(branch, fx);
            Ok(true)
        })
    }

    /// Collect the branches from every feed and delete them from storage
    /// whatever their reachability. Returns the number of payloads deleted.
    pub fn remove_batch(&self, branches: &[BranchId]) -> Result<usize> {
        self.mutate(|core, fx| {
            let mut removed = 0;
            for branch in branches {
                let collection = core.state.subscriptions.collect(branch, None);
                core.apply_collection(collection, false, fx);
                if core.purge(branch, fx) {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }

    // ---- Feeds ----

    /// Make `branches` roots of `feed` and (re)install change detection.
    /// Missing branches are created empty.
    pub fn subscribe(&self, feed: &FeedId, branches: &[BranchId]) -> Result<()> {
        self.mutate(|core, fx| {
            for branch in branches {
                core.state.store.vivify(branch);
            }
            let existed = core.state.subscriptions.has_feed(feed);
            core.state.subscriptions.subscribe(feed, branches);
            core.changes.register(feed);
            for branch in branches {
                core.mark(branch, fx);
            }
            fx.dirty.insert(feed.clone());
            info!(%feed, branches = branches.len(), existed, "feed subscribed");
            fx.events.push(if existed {
                EventPayload::FeedSubscriptionsChanged {
                    feed: feed.clone(),
                    branches: branches.to_vec(),
                }
            } else {
                EventPayload::FeedSubscribed {
                    feed: feed.clone(),
                    branches: branches.to_vec(),
                }
            });
            Ok(())
        })
    }

    /// Stop change detection and collect every branch of the feed.
    /// Returns `false` if the feed was already gone.
    pub fn unsubscribe(&self, feed: &FeedId) -> Result<bool> {
        self.mutate(|core, fx| {
            let registered = core.changes.unregister(feed);
            if !registered && !core.state.subscriptions.has_feed(feed) {
                debug!(%feed, "already unsubscribed");
                return Ok(false);
            }
            let collection = core.state.subscriptions.collect_feed(feed);
            core.apply_collection(collection, false, fx);
            fx.dirty.remove(feed);
            fx.disposed.insert(feed.clone());
            info!(%feed, "feed unsubscribed");
            fx.events.push(EventPayload::FeedUnsubscribed { feed: feed.clone() });
            Ok(true)
        })
    }

    /// Add one branch to a feed as a root.
    pub fn feed_add(&self, feed: &FeedId, branch: &BranchId) -> Result<()> {
        self.mutate(|core, fx| {
            core.state.store.vivify(branch);
            core.state
                .subscriptions
                .subscribe(feed, std::slice::from_ref(branch));
            core.mark(branch, fx);
            Ok(())
        })
    }

    /// Collect one branch from one feed.
    pub fn feed_del(&self, feed: &FeedId, branch: &BranchId) -> Result<bool> {
        self.mutate(|core, fx| {
            let collection = core.state.subscriptions.collect(branch, Some(feed));
            let found = !collection.is_empty();
            core.apply_collection(collection, false, fx);
            Ok(found)
        })
    }

    /// Publish a full snapshot of `feed` now. `None` if the feed has no
    /// change detection.
    pub fn resend(&self, feed: &FeedId) -> Result<Option<ChangeMessage>> {
        self.inner.timers.cancel(&TimerKey::Feed(feed.clone()));
        self.mutate(|core, fx| {
            if !core.changes.request_snapshot(feed) {
                return Ok(None);
            }
            let message = core.changes.compute(feed, &core.state);
            if let Some(message) = &message {
                fx.events.push(EventPayload::Changed {
                    feed: feed.clone(),
                    message: message.clone(),
                });
            }
            Ok(message)
        })
    }

    /// Run the change pass of one feed, or of every watched feed, now.
    /// Returns what was published.
    pub fn sync_changes(&self, feed: Option<&FeedId>) -> Result<BTreeMap<FeedId, ChangeMessage>> {
        let feeds = match feed {
            Some(feed) => vec![feed.clone()],
            None => self.read(|core| core.changes.feeds())?,
        };
        let mut published = BTreeMap::new();
        for feed in feeds {
            if let Some(message) = self.run_change_pass(&feed)? {
                published.insert(feed, message);
            }
        }
        Ok(published)
    }

    fn run_change_pass(&self, feed: &FeedId) -> Result<Option<ChangeMessage>> {
        self.inner.timers.cancel(&TimerKey::Feed(feed.clone()));
        self.mutate(|core, fx| {
            let message = core.changes.compute(feed, &core.state);
            if let Some(message) = &message {
                fx.events.push(EventPayload::Changed {
                    feed: feed.clone(),
                    message: message.clone(),
                });
            }
            Ok(message)
        })
    }

    /// Announce the queued releases now. Returns the number of events sent.
    pub fn flush_released(&self) -> Result<usize> {
        self.inner.timers.cancel(&TimerKey::Release);
        self.run_release_pass()
    }

    fn run_release_pass(&self) -> Result<usize> {
        let batch_size = self.inner.config.release_batch_size;
        let auto_acknowledge = self.inner.config.auto_acknowledge;
        self.mutate(|core, fx| {
            let subscriptions = &core.state.subscriptions;
            let revived = core.releases.retain(|branch| !subscriptions.is_referenced(branch));
            if revived > 0 {
                debug!(revived, "released branches referenced again");
            }
            let batches = core.releases.drain_batches(batch_size);
            let sent = batches.len();
            for branches in batches {
                if auto_acknowledge {
                    for (branch, generation) in &branches {
                        if core.state.store.generation(branch) == *generation {
                            core.purge(branch, fx);
                        }
                    }
                }
                debug!(count = branches.len(), "branches released");
                fx.events.push(EventPayload::Released { branches });
            }
            Ok(sent)
        })
    }

    // ---- Reads ----

    /// Returns `true` if the dotted path resolves.
    pub fn has(&self, path: &str) -> Result<bool> {
        let path = StatePath::parse(path)?;
        self.read(|core| core.state.has(&path))
    }

    /// Read the value at a dotted path, projected through `view`.
    pub fn get(&self, path: &str, view: Option<&View>) -> Result<Option<Value>> {
        let path = StatePath::parse(path)?;
        self.read(|core| core.state.lookup(&path).map(|value| project(&value, view)))
    }

    pub fn query(&self, query: &Query) -> Result<Vec<Value>> {
        self.read(|core| query.run(&core.state))
    }

    /// The creator of an in-flight creation.
    pub fn get_creator(&self, branch: &BranchId) -> Result<Option<String>> {
        self.read(|core| core.state.store.creator(branch).map(str::to_string))
    }

    /// Forget the creator of a branch. Returns `true` if one was recorded.
    pub fn del_creator(&self, branch: &BranchId) -> Result<bool> {
        self.mutate(|core, _| {
            let had = core.state.store.creator(branch).is_some();
            core.state.store.clear_creator(branch);
            Ok(had)
        })
    }

    /// Every feed except the system feed.
    pub fn list_feeds(&self) -> Result<Vec<FeedId>> {
        self.read(|core| {
            core.state
                .subscriptions
                .feed_ids()
                .filter(|feed| !feed.is_system())
                .cloned()
                .collect()
        })
    }

    /// Feeds holding `branch`, minus those matching any `excluded` pattern.
    pub fn branch_subscriptions<S: AsRef<str>>(&self, branch: &BranchId, excluded: &[S]) -> Result<Vec<FeedId>> {
        let excluded = compile_all(excluded)?;
        self.read(|core| {
            core.state
                .subscriptions
                .feeds_of(branch)
                .into_iter()
                .filter(|feed| !excluded.iter().any(|p| p.matches(feed.as_str())))
                .collect()
        })
    }

    /// A copy of the whole state.
    pub fn snapshot(&self) -> Result<WarehouseState> {
        self.read(|core| core.state.clone())
    }

    pub fn stats(&self) -> Result<Stats> {
        let subscribers = self.inner.bus.subscriber_count();
        self.read(|core| Stats {
            branches: core.state.store.len(),
            feeds: core.state.subscriptions.len(),
            watched_feeds: core.changes.feeds().len(),
            pending_releases: core.releases.len(),
            subscribers,
            maintenance: core.maintenance.active().cloned(),
        })
    }

    // ---- Maintenance ----

    /// Take or lift maintenance on behalf of `holder`.
    pub fn maintenance(&self, enable: bool, holder: &str, description: Option<&str>) -> Result<()> {
        let mut core = self.core()?;
        if enable {
            core.maintenance.enable(holder, description)
        } else {
            core.maintenance.disable(holder)
        }
    }

    /// Fail with the maintenance description unless `caller` may mutate.
    pub fn admit(&self, caller: Option<&str>) -> Result<()> {
        self.core()?.maintenance.admit(caller)
    }

    // ---- Diagnostics ----

    pub fn check(&self) -> Result<DiagnosticReport> {
        self.read(|core| DiagnosticReport::collect(&core.state))
    }

    /// Payloads no feed holds.
    pub fn check_orphans(&self) -> Result<Vec<BranchId>> {
        self.read(|core| core.state.orphans())
    }

    /// Parents referenced but absent from their feed.
    pub fn check_dangling(&self) -> Result<Vec<DanglingParent>> {
        self.read(|core| core.state.subscriptions.dangling_parents())
    }

    pub fn render_graph(&self, style: GraphStyle) -> Result<String> {
        self.read(|core| render_dot(&core.state, style))
    }

    /// Write the DOT graph to `path`.
    pub async fn export_graph(&self, path: impl AsRef<Path>, style: GraphStyle) -> Result<()> {
        let dot = self.render_graph(style)?;
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(path.as_ref(), dot).await?;
        info!(path = %path.as_ref().display(), ?style, "graph exported");
        Ok(())
    }

    // ---- Persistence ----

    /// Save a snapshot of the state.
    pub async fn save(&self) -> Result<()> {
        let persistence = self.persistence()?;
        let snapshot = self.snapshot()?;
        persistence.save(&snapshot).await?;
        info!(
            branches = snapshot.store.len(),
            feeds = snapshot.subscriptions.len(),
            "state saved"
        );
        Ok(())
    }

    /// Replace the state with the saved snapshot. Every watched feed
    /// publishes a full snapshot on its next pass. Returns `false` if
    /// nothing was saved.
    pub async fn load(&self) -> Result<bool> {
        let persistence = self.persistence()?;
        let Some(state) = persistence.load().await? else {
            info!("no saved state");
            return Ok(false);
        };
        self.mutate(|core, fx| {
            info!(
                branches = state.store.len(),
                feeds = state.subscriptions.len(),
                "state loaded"
            );
            core.state = state;
            core.changes.request_all_snapshots();
            fx.dirty.extend(core.changes.feeds());
            Ok(())
        })?;
        Ok(true)
    }
}

impl Default for Warehouse {
    fn default() -> Self {
        Self::new(WarehouseConfig::default())
    }
}

impl std::fmt::Debug for Warehouse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Warehouse")
            .field("config", &self.inner.config)
            .field("persistent", &self.inner.persistence.is_some())
            .finish_non_exhaustive()
    }
}
