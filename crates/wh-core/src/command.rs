//! The command surface: one variant per warehouse verb.
//!
//! Commands are serialized as `{"command": "<verb>", ...args}`. Mutating
//! verbs pass through the maintenance gate before they run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use wh_fabric::ChangeMessage;
use wh_ownership::{DanglingParent, Detached};
use wh_types::{BranchId, FeedId, Generation, View};

use crate::diagnostics::DiagnosticReport;
use crate::error::{Result, WarehouseError};
use crate::graph::GraphStyle;
use crate::query::Query;
use crate::request::{one_or_many, AttachRequest, UpsertOutcome, UpsertRequest};
use crate::warehouse::{Stats, Warehouse};

/// A warehouse verb with its arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum Command {
    Upsert(UpsertRequest),
    UpsertInBatch {
        branches: BTreeMap<BranchId, Value>,
        #[serde(default, deserialize_with = "one_or_many")]
        parents: Vec<BranchId>,
        #[serde(default, deserialize_with = "one_or_many")]
        feeds: Vec<FeedId>,
    },
    DeleteBranch {
        branch: BranchId,
    },
    AttachToParents(AttachRequest),
    DetachFromParents {
        branch: BranchId,
        #[serde(default, deserialize_with = "one_or_many")]
        parents: Vec<String>,
        #[serde(default)]
        feed: Option<FeedId>,
        #[serde(default, deserialize_with = "one_or_many")]
        feeds: Vec<FeedId>,
    },
    Graft {
        branch: BranchId,
        #[serde(rename = "fromFeed")]
        from_feed: FeedId,
        #[serde(rename = "toFeed")]
        to_feed: FeedId,
        /// Copy the descendants instead of the ancestry.
        #[serde(default)]
        reverse: bool,
    },
    Acknowledge {
        branch: BranchId,
        generation: Generation,
    },
    RemoveBatch {
        branches: Vec<BranchId>,
    },
    Remove {
        branch: BranchId,
    },
    #[serde(rename = "feed.add")]
    FeedAdd {
        feed: FeedId,
        branch: BranchId,
    },
    #[serde(rename = "feed.del")]
    FeedDel {
        feed: FeedId,
        branch: BranchId,
    },
    Subscribe {
        feed: FeedId,
        #[serde(default, deserialize_with = "one_or_many")]
        branches: Vec<BranchId>,
    },
    Unsubscribe {
        feed: FeedId,
    },
    Resend {
        feed: FeedId,
    },
    SyncChanges {
        #[serde(default)]
        feed: Option<FeedId>,
    },
    Has {
        path: String,
    },
    Get {
        path: String,
        #[serde(default)]
        view: Option<View>,
    },
    Query(Query),
    GetCreator {
        branch: BranchId,
    },
    DelCreator {
        branch: BranchId,
    },
    ListFeeds,
    GetBranchSubscriptions {
        branch: BranchId,
        #[serde(default, deserialize_with = "one_or_many")]
        filters: Vec<String>,
    },
    Maintenance {
        enable: bool,
        #[serde(default)]
        description: Option<String>,
        #[serde(rename = "orcName")]
        orc_name: String,
    },
    Check,
    #[serde(rename = "checkOrphan", alias = "check-orphan")]
    CheckOrphan,
    #[serde(rename = "checkDangling", alias = "check-dangling")]
    CheckDangling,
    Stats,
    Save,
    Load,
    Graph {
        output: PathBuf,
        #[serde(default)]
        format: GraphStyle,
    },
}

impl Command {
    /// The verb as it appears on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upsert(_) => "upsert",
            Self::UpsertInBatch { .. } => "upsert-in-batch",
            Self::DeleteBranch { .. } => "delete-branch",
            Self::AttachToParents(_) => "attach-to-parents",
            Self::DetachFromParents { .. } => "detach-from-parents",
            Self::Graft { .. } => "graft",
            Self::Acknowledge { .. } => "acknowledge",
            Self::RemoveBatch { .. } => "remove-batch",
            Self::Remove { .. } => "remove",
            Self::FeedAdd { .. } => "feed.add",
            Self::FeedDel { .. } => "feed.del",
            Self::Subscribe { .. } => "subscribe",
            Self::Unsubscribe { .. } => "unsubscribe",
            Self::Resend { .. } => "resend",
            Self::SyncChanges { .. } => "sync-changes",
            Self::Has { .. } => "has",
            Self::Get { .. } => "get",
            Self::Query(_) => "query",
            Self::GetCreator { .. } => "get-creator",
            Self::DelCreator { .. } => "del-creator",
            Self::ListFeeds => "list-feeds",
            Self::GetBranchSubscriptions { .. } => "get-branch-subscriptions",
            Self::Maintenance { .. } => "maintenance",
            Self::Check => "check",
            Self::CheckOrphan => "checkOrphan",
            Self::CheckDangling => "checkDangling",
            Self::Stats => "stats",
            Self::Save => "save",
            Self::Load => "load",
            Self::Graph { .. } => "graph",
        }
    }

    /// Returns `true` for verbs that change the state.
    pub fn is_mutating(&self) -> bool {
        matches!(
            self,
            Self::Upsert(_)
                | Self::UpsertInBatch { .. }
                | Self::DeleteBranch { .. }
                | Self::AttachToParents(_)
                | Self::DetachFromParents { .. }
                | Self::Graft { .. }
                | Self::Acknowledge { .. }
                | Self::RemoveBatch { .. }
                | Self::Remove { .. }
                | Self::FeedAdd { .. }
                | Self::FeedDel { .. }
                | Self::Subscribe { .. }
                | Self::Unsubscribe { .. }
                | Self::DelCreator { .. }
                | Self::Load
        )
    }

    /// Decode a command from its JSON form.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| WarehouseError::InvalidCommand(e.to_string()))
    }
}

/// Result of a command.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Done,
    Flag(bool),
    Count(usize),
    Upserted(UpsertOutcome),
    Outcomes(BTreeMap<BranchId, UpsertOutcome>),
    Detached(Vec<Detached>),
    Branches(Vec<BranchId>),
    Feeds(Vec<FeedId>),
    Value(Option<Value>),
    Items(Vec<Value>),
    Creator(Option<String>),
    Change(Option<ChangeMessage>),
    Changes(BTreeMap<FeedId, ChangeMessage>),
    Report(DiagnosticReport),
    Dangling(Vec<DanglingParent>),
    Stats(Stats),
}

impl Warehouse {
    /// Run a command on behalf of `caller`.
    ///
    /// Mutating verbs are refused with the maintenance description while
    /// another caller holds maintenance. `maintenance` itself is always
    /// accepted and uses `orcName` as the holder.
    pub async fn dispatch(&self, caller: Option<&str>, command: Command) -> Result<Reply> {
        if command.is_mutating() {
            self.admit(caller)?;
        }
        debug!(command = command.name(), caller, "dispatch");

        let reply = match command {
            Command::Upsert(request) => Reply::Upserted(self.upsert(request)?),
            Command::UpsertInBatch {
                branches,
                parents,
                feeds,
            } => Reply::Outcomes(self.upsert_in_batch(branches, &parents, &feeds)?),
            Command::DeleteBranch { branch } => Reply::Flag(self.delete_branch(&branch)?),
            Command::AttachToParents(request) => Reply::Flag(self.attach(request)?),
            Command::DetachFromParents {
                branch,
                parents,
                feed,
                mut feeds,
            } => {
                feeds.extend(feed);
                Reply::Detached(self.detach(&branch, &parents, &feeds)?)
            }
            Command::Graft {
                branch,
                from_feed,
                to_feed,
                reverse: false,
            } => Reply::Branches(self.graft(&branch, &from_feed, &to_feed)?),
            Command::Graft {
                branch,
                from_feed,
                to_feed,
                reverse: true,
            } => Reply::Branches(self.graft_subtree(&branch, &from_feed, &to_feed)?),
            Command::Acknowledge { branch, generation } => {
                Reply::Flag(self.acknowledge(&branch, generation)?)
            }
            Command::RemoveBatch { branches } => Reply::Count(self.remove_batch(&branches)?),
            Command::Remove { branch } => Reply::Count(self.remove_batch(&[branch])?),
            Command::FeedAdd { feed, branch } => {
                self.feed_add(&feed, &branch)?;
                Reply::Done
            }
            Command::FeedDel { feed, branch } => Reply::Flag(self.feed_del(&feed, &branch)?),
            Command::Subscribe { feed, branches } => {
                self.subscribe(&feed, &branches)?;
                Reply::Done
            }
            Command::Unsubscribe { feed } => Reply::Flag(self.unsubscribe(&feed)?),
            Command::Resend { feed } => Reply::Change(self.resend(&feed)?),
            Command::SyncChanges { feed } => Reply::Changes(self.sync_changes(feed.as_ref())?),
            Command::Has { path } => Reply::Flag(self.has(&path)?),
            Command::Get { path, view } => Reply::Value(self.get(&path, view.as_ref())?),
            Command::Query(query) => Reply::Items(self.query(&query)?),
            Command::GetCreator { branch } => Reply::Creator(self.get_creator(&branch)?),
            Command::DelCreator { branch } => Reply::Flag(self.del_creator(&branch)?),
            Command::ListFeeds => Reply::Feeds(self.list_feeds()?),
            Command::GetBranchSubscriptions { branch, filters } => {
                Reply::Feeds(self.branch_subscriptions(&branch, &filters)?)
            }
            Command::Maintenance {
                enable,
                description,
                orc_name,
            } => {
                if enable {
                    self.maintenance(true, &orc_name, description.as_deref())?;
                } else {
                    // Only the caller holding the lease lifts it.
                    self.maintenance(false, caller.unwrap_or_default(), None)?;
                }
                Reply::Done
            }
            Command::Check => Reply::Report(self.check()?),
            Command::CheckOrphan => Reply::Branches(self.check_orphans()?),
            Command::CheckDangling => Reply::Dangling(self.check_dangling()?),
            Command::Stats => Reply::Stats(self.stats()?),
            Command::Save => {
                self.save().await?;
                Reply::Done
            }
            Command::Load => Reply::Flag(self.load().await?),
            Command::Graph { output, format } => {
                self.export_graph(&output, format).await?;
                Reply::Done
            }
        };
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn run(wh: &Warehouse, caller: Option<&str>, command: Value) -> Result<Value> {
        let reply = wh.dispatch(caller, Command::from_value(command)?).await?;
        Ok(serde_json::to_value(reply).unwrap())
    }

    #[test]
    fn wire_names() {
        let cases = [
            json!({"command": "upsert", "branch": "a@1", "parents": "a@1"}),
            json!({"command": "upsert-in-batch", "branches": {"a@1": {}}}),
            json!({"command": "detach-from-parents", "branch": "a@1", "parents": ["p@*"], "feed": "f"}),
            json!({"command": "graft", "branch": "a@1", "fromFeed": "f", "toFeed": "g"}),
            json!({"command": "feed.add", "feed": "f", "branch": "a@1"}),
            json!({"command": "checkOrphan"}),
            json!({"command": "check-dangling"}),
            json!({"command": "maintenance", "enable": true, "orcName": "orc@1"}),
            json!({"command": "graph", "output": "out.dot", "format": "complexe"}),
        ];
        for case in cases {
            let expected = case["command"].as_str().unwrap().to_string();
            let command = Command::from_value(case).unwrap();
            if expected != "check-dangling" {
                assert_eq!(command.name(), expected);
            }
        }
    }

    #[test]
    fn unknown_verbs_are_invalid() {
        let err = Command::from_value(json!({"command": "explode"})).unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidCommand(_)));
        let err = Command::from_value(json!({"command": "acknowledge", "branch": "a@1"})).unwrap_err();
        assert!(matches!(err, WarehouseError::InvalidCommand(_)));
    }

    #[test]
    fn mutating_verbs() {
        assert!(Command::Load.is_mutating());
        assert!(!Command::Save.is_mutating());
        assert!(!Command::Check.is_mutating());
        let maintenance = Command::from_value(
            json!({"command": "maintenance", "enable": false, "orcName": "orc@1"}),
        )
        .unwrap();
        assert!(!maintenance.is_mutating());
    }

    #[tokio::test]
    async fn graft_direction() {
        let wh = Warehouse::default();
        wh.subscribe(&FeedId::new("f"), &[BranchId::new("a@1")]).unwrap();
        wh.upsert(UpsertRequest::new("b@1").parent("a@1").feed("f")).unwrap();
        wh.upsert(UpsertRequest::new("c@1").parent("b@1").feed("f")).unwrap();

        let down = run(
            &wh,
            None,
            json!({"command": "graft", "branch": "b@1", "fromFeed": "f", "toFeed": "g", "reverse": true}),
        )
        .await
        .unwrap();
        assert_eq!(down, json!(["b@1", "c@1"]));

        let up = run(
            &wh,
            None,
            json!({"command": "graft", "branch": "b@1", "fromFeed": "f", "toFeed": "h"}),
        )
        .await
        .unwrap();
        assert_eq!(up, json!(["a@1", "b@1"]));
    }

    #[tokio::test]
    async fn dispatch_round() {
        let wh = Warehouse::default();
        run(&wh, None, json!({"command": "subscribe", "feed": "f", "branches": ["a@1"]}))
            .await
            .unwrap();
        let stored = run(
            &wh,
            None,
            json!({"command": "upsert", "branch": "b@1", "data": {"n": 1}, "parents": "a@1", "feeds": "f", "generation": 3}),
        )
        .await
        .unwrap();
        assert_eq!(stored, json!("stored"));
        assert_eq!(
            run(&wh, None, json!({"command": "get", "path": "b@1.n"})).await.unwrap(),
            json!(1)
        );
        assert_eq!(
            run(&wh, None, json!({"command": "list-feeds"})).await.unwrap(),
            json!(["f"])
        );
        let detached = run(
            &wh,
            None,
            json!({"command": "detach-from-parents", "branch": "b@1", "parents": "a@1", "feed": "f"}),
        )
        .await
        .unwrap();
        assert_eq!(detached[0]["orphaned"], json!(true));
        assert_eq!(
            run(&wh, None, json!({"command": "has", "path": "_subscriptions.f.branches.b@1"}))
                .await
                .unwrap(),
            json!(false)
        );
        assert_eq!(
            run(&wh, None, json!({"command": "get", "path": "nothing@1"})).await.unwrap(),
            Value::Null
        );
    }

    #[tokio::test]
    async fn maintenance_locks_out_other_callers() {
        let wh = Warehouse::default();
        run(
            &wh,
            Some("orc@admin"),
            json!({"command": "maintenance", "enable": true, "description": "migrating", "orcName": "orc@admin"}),
        )
        .await
        .unwrap();

        let subscribe = json!({"command": "subscribe", "feed": "f", "branches": ["a@1"]});
        let err = run(&wh, Some("orc@1"), subscribe.clone()).await.unwrap_err();
        assert!(matches!(err, WarehouseError::MaintenanceLockout { .. }));
        assert_eq!(err.to_string(), "migrating");
        assert!(run(&wh, None, subscribe.clone()).await.is_err());

        // Reads stay available.
        assert_eq!(
            run(&wh, Some("orc@1"), json!({"command": "has", "path": "a@1"})).await.unwrap(),
            json!(false)
        );

        run(&wh, Some("orc@admin"), subscribe.clone()).await.unwrap();
        let err = run(
            &wh,
            Some("orc@1"),
            json!({"command": "maintenance", "enable": false, "orcName": "orc@1"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WarehouseError::NotMaintainer { .. }));

        // Naming the holder in the body is not enough.
        let err = run(
            &wh,
            Some("orc@1"),
            json!({"command": "maintenance", "enable": false, "orcName": "orc@admin"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WarehouseError::NotMaintainer { .. }));
        let err = run(
            &wh,
            None,
            json!({"command": "maintenance", "enable": false, "orcName": "orc@admin"}),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, WarehouseError::NotMaintainer { .. }));
        assert!(wh.stats().unwrap().maintenance.is_some());

        run(
            &wh,
            Some("orc@admin"),
            json!({"command": "maintenance", "enable": false, "orcName": "orc@admin"}),
        )
        .await
        .unwrap();
        run(&wh, Some("orc@1"), subscribe).await.unwrap();
    }

    #[tokio::test]
    async fn single_branch_verbs() {
        let wh = Warehouse::default();
        run(&wh, None, json!({"command": "feed.add", "feed": "f", "branch": "a@1"}))
            .await
            .unwrap();
        assert_eq!(
            run(&wh, None, json!({"command": "get-branch-subscriptions", "branch": "a@1"}))
                .await
                .unwrap(),
            json!(["f"])
        );
        assert_eq!(
            run(&wh, None, json!({"command": "feed.del", "feed": "f", "branch": "a@1"}))
                .await
                .unwrap(),
            json!(true)
        );
        assert_eq!(
            run(&wh, None, json!({"command": "remove", "branch": "a@1"})).await.unwrap(),
            json!(1)
        );
        assert_eq!(
            run(&wh, None, json!({"command": "checkOrphan"})).await.unwrap(),
            json!([])
        );
    }
}
