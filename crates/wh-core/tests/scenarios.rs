//! End-to-end ownership scenarios driven through the public API.
//!
//! No tokio runtime is running here, so timers never arm and every pass is
//! flushed explicitly with `sync_changes` and `flush_released`.

use proptest::prelude::*;
use serde_json::json;
use wh_core::{
    project_feed, AttachRequest, ChangeBody, ChangeMessage, UpsertOutcome, UpsertRequest, Warehouse, WarehouseConfig,
};
use wh_diff::{apply_patch, Projection};
use wh_types::{BranchId, FeedId, View};

fn id(s: &str) -> BranchId {
    BranchId::new(s)
}

fn feed(s: &str) -> FeedId {
    FeedId::new(s)
}

fn has(wh: &Warehouse, path: &str) -> bool {
    wh.has(path).unwrap()
}

/// Remove the `parent` edge of `branch` in every feed.
fn kill(wh: &Warehouse, branch: &str, parent: &str) {
    wh.detach(&id(branch), &[parent], &[]).unwrap();
}

fn upsert(wh: &Warehouse, branch: &str, parent: &str, feeds: &[&str]) -> UpsertOutcome {
    let mut request = UpsertRequest::new(branch).data(json!({ "id": branch })).parent(parent);
    for f in feeds {
        request = request.feed(*f);
    }
    wh.upsert(request).unwrap()
}

// ---------------------------------------------------------------------------
// Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn self_owned_branch_lives_until_deleted() {
    let wh = Warehouse::default();
    assert!(!has(&wh, "a@1"));
    assert_eq!(upsert(&wh, "a@1", "a@1", &["f1"]), UpsertOutcome::Stored);
    assert!(has(&wh, "a@1"));

    assert!(wh.delete_branch(&id("a@1")).unwrap());
    wh.flush_released().unwrap();
    assert!(!has(&wh, "a@1"));
    assert!(!has(&wh, "_subscriptions.f1"));
}

#[test]
fn unknown_parent_discards_the_branch() {
    let wh = Warehouse::default();
    assert_eq!(upsert(&wh, "a@1", "nonexistent@1", &["f1"]), UpsertOutcome::Collected);
    assert!(!has(&wh, "a@1"));
    assert!(!has(&wh, "_subscriptions.f1"));

    // A singleton parent absent from the feed is no different.
    assert_eq!(upsert(&wh, "a@1", "tests", &["f1"]), UpsertOutcome::Collected);
    assert!(!has(&wh, "a@1"));
    wh.flush_released().unwrap();
    assert!(!has(&wh, "a@1"));
}

#[test]
fn deleting_the_root_cascades_down_the_chain() {
    let wh = Warehouse::default();
    for branch in ["a@1", "b@1", "c@1"] {
        upsert(&wh, branch, branch, &["f"]);
    }
    assert!(wh.attach(AttachRequest::new("b@1").parent("a@1")).unwrap());
    assert!(wh.attach(AttachRequest::new("c@1").parent("b@1")).unwrap());
    kill(&wh, "b@1", "b@1");
    kill(&wh, "c@1", "c@1");
    assert!(has(&wh, "_subscriptions.f.branches.c@1.parents.b@1"));
    assert!(!has(&wh, "_subscriptions.f.branches.c@1.parents.c@1"));

    wh.delete_branch(&id("a@1")).unwrap();
    for branch in ["a@1", "b@1", "c@1"] {
        assert!(!has(&wh, &format!("_subscriptions.f.branches.{branch}")));
    }
    assert_eq!(wh.stats().unwrap().pending_releases, 3);
    wh.flush_released().unwrap();
    for branch in ["a@1", "b@1", "c@1"] {
        assert!(!has(&wh, branch));
    }
}

#[test]
fn branch_owned_by_two_feeds_survives_until_both_let_go() {
    let wh = Warehouse::default();
    upsert(&wh, "p@1", "p@1", &["f1"]);
    upsert(&wh, "p@2", "p@2", &["f2"]);
    upsert(&wh, "x@1", "x@1", &["f1", "f2"]);
    upsert(&wh, "x@1", "p@1", &["f1"]);
    upsert(&wh, "x@1", "p@2", &["f2"]);

    kill(&wh, "x@1", "x@1");
    kill(&wh, "p@1", "p@1");
    wh.flush_released().unwrap();
    assert!(has(&wh, "x@1"));
    assert!(!has(&wh, "_subscriptions.f1"));
    assert!(has(&wh, "_subscriptions.f2.branches.x@1"));
    assert!(!has(&wh, "p@1"));

    kill(&wh, "p@2", "p@2");
    wh.flush_released().unwrap();
    assert!(!has(&wh, "x@1"));
    assert!(!has(&wh, "_subscriptions.f2"));
}

#[test]
fn unsubscribe_purges_what_no_other_feed_holds() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("f"), &[id("x@1"), id("y@1")]).unwrap();
    wh.subscribe(&feed("g"), &[id("y@1")]).unwrap();
    assert!(has(&wh, "_subscriptions.f.branches.x@1"));

    assert!(wh.unsubscribe(&feed("f")).unwrap());
    assert!(!has(&wh, "_subscriptions.f"));
    wh.flush_released().unwrap();
    assert!(!has(&wh, "x@1"));
    assert!(has(&wh, "y@1"));
    assert_eq!(wh.list_feeds().unwrap(), vec![feed("g")]);
}

// ---------------------------------------------------------------------------
// Collection
// ---------------------------------------------------------------------------

#[test]
fn multi_level_cascade_with_acknowledge() {
    // a@0
    // └── a@1
    //     ├── a@2
    //     │   └── a@4
    //     └── a@3
    //         └── a@5
    let config = WarehouseConfig {
        auto_acknowledge: false,
        ..WarehouseConfig::default()
    };
    let wh = Warehouse::new(config);
    let tree = [
        ("a@0", "a@0"),
        ("a@1", "a@0"),
        ("a@2", "a@1"),
        ("a@4", "a@2"),
        ("a@3", "a@1"),
        ("a@5", "a@3"),
    ];
    for (branch, parent) in tree {
        wh.upsert(
            UpsertRequest::new(branch)
                .data(json!({}))
                .parent(parent)
                .feed("tests1")
                .generation(1),
        )
        .unwrap();
    }
    for (branch, _) in tree {
        assert!(has(&wh, branch));
    }

    wh.delete_branch(&id("a@0")).unwrap();
    assert!(!has(&wh, "_subscriptions.tests1"));
    wh.flush_released().unwrap();
    for (branch, _) in tree {
        assert!(has(&wh, branch), "{branch} waits for its acknowledge");
        assert!(wh.acknowledge(&id(branch), 1).unwrap());
        assert!(!wh.acknowledge(&id(branch), 1).unwrap());
        assert!(!has(&wh, branch));
    }
}

#[test]
fn shared_child_keeps_its_other_parent() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("tests1"), &[id("t@1"), id("t@3")]).unwrap();
    wh.subscribe(&feed("tests2"), &[id("t@2"), id("t@3")]).unwrap();
    upsert(&wh, "t@3", "t@1", &["tests1"]);
    upsert(&wh, "t@3", "t@2", &["tests2"]);

    kill(&wh, "t@3", "t@3");
    assert!(has(&wh, "_subscriptions.tests1.branches.t@3"));
    assert!(has(&wh, "_subscriptions.tests2.branches.t@3"));
    assert!(!has(&wh, "_subscriptions.tests1.branches.t@2"));

    kill(&wh, "t@3", "t@1");
    wh.flush_released().unwrap();
    for branch in ["t@1", "t@2", "t@3"] {
        assert!(has(&wh, branch));
    }
    assert!(has(&wh, "_subscriptions.tests1.branches.t@1"));
    assert!(!has(&wh, "_subscriptions.tests1.branches.t@3"));
    assert!(has(&wh, "_subscriptions.tests2.branches.t@2"));
    assert!(has(&wh, "_subscriptions.tests2.branches.t@3"));
}

#[test]
fn deep_cascade_stops_at_surviving_parents() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("tests1"), &[id("t@1"), id("t@3"), id("t@4"), id("t@5")])
        .unwrap();
    wh.subscribe(&feed("tests2"), &[id("t@2"), id("t@3"), id("t@4"), id("t@5")])
        .unwrap();
    upsert(&wh, "t@3", "t@1", &["tests1"]);
    upsert(&wh, "t@3", "t@2", &["tests2"]);
    upsert(&wh, "t@4", "t@2", &["tests2"]);
    upsert(&wh, "t@4", "t@3", &["tests1"]);
    upsert(&wh, "t@5", "t@1", &["tests1"]);
    upsert(&wh, "t@5", "t@4", &["tests1", "tests2"]);
    for branch in ["t@3", "t@4", "t@5"] {
        kill(&wh, branch, branch);
    }

    kill(&wh, "t@3", "t@1");
    wh.flush_released().unwrap();
    for branch in ["t@1", "t@2", "t@3", "t@4", "t@5"] {
        assert!(has(&wh, branch));
    }
    for (path, expected) in [
        ("tests1.branches.t@1", true),
        ("tests1.branches.t@3", false),
        ("tests1.branches.t@4", false),
        ("tests1.branches.t@5", true),
        ("tests2.branches.t@2", true),
        ("tests2.branches.t@3", true),
        ("tests2.branches.t@4", true),
        ("tests2.branches.t@5", true),
    ] {
        assert_eq!(has(&wh, &format!("_subscriptions.{path}")), expected, "{path}");
    }
    assert!(wh.check().unwrap().is_clean());
}

#[test]
fn acknowledged_payload_of_a_referenced_branch() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("tests1"), &[id("t@1"), id("t@2")]).unwrap();
    wh.subscribe(&feed("tests2"), &[id("t@2")]).unwrap();
    wh.upsert(UpsertRequest::new("t@1").data(json!({"id": "t@1"})).generation(1))
        .unwrap();
    wh.upsert(
        UpsertRequest::new("t@2")
            .data(json!({"id": "t@2"}))
            .feed("tests1")
            .parent("t@1")
            .generation(1),
    )
    .unwrap();
    assert!(!has(&wh, "_subscriptions.tests2.branches.t@1"));

    kill(&wh, "t@2", "t@2");
    assert!(!has(&wh, "_subscriptions.tests2"));
    assert!(wh.acknowledge(&id("t@2"), 1).unwrap());
    kill(&wh, "t@2", "t@1");
    wh.flush_released().unwrap();

    assert!(has(&wh, "t@1"));
    assert!(!has(&wh, "t@2"));
    assert!(has(&wh, "_subscriptions.tests1.branches.t@1"));
    assert!(!has(&wh, "_subscriptions.tests1.branches.t@2"));
}

#[test]
fn attach_links_both_directions() {
    let wh = Warehouse::default();
    upsert(&wh, "t@1", "t@1", &["tests1"]);
    upsert(&wh, "t@2", "t@2", &["tests1"]);
    assert!(wh.attach(AttachRequest::new("t@1").parent("t@2")).unwrap());
    for path in [
        "t@1.parents.t@1",
        "t@1.parents.t@2",
        "t@2.children.t@1",
        "t@2.children.t@2",
    ] {
        assert!(has(&wh, &format!("_subscriptions.tests1.branches.{path}")), "{path}");
    }
}

// ---------------------------------------------------------------------------
// Graft
// ---------------------------------------------------------------------------

#[test]
fn graft_copies_the_ancestry_without_children() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("feedA"), &[id("t@1"), id("t@2")]).unwrap();
    wh.subscribe(&feed("feedB"), &[id("t@6")]).unwrap();
    upsert(&wh, "t@3", "t@1", &["feedA"]);
    upsert(&wh, "t@3", "t@2", &["feedA"]);
    upsert(&wh, "t@4", "t@2", &["feedA"]);
    upsert(&wh, "t@4", "t@3", &["feedA"]);
    upsert(&wh, "t@5", "t@1", &["feedA"]);
    upsert(&wh, "t@5", "t@4", &["feedA"]);

    let before = wh.get("_subscriptions.feedA.branches", None).unwrap();
    let grafted = wh.graft(&id("t@4"), &feed("feedA"), &feed("feedB")).unwrap();
    assert_eq!(grafted, vec![id("t@1"), id("t@2"), id("t@3"), id("t@4")]);

    assert_eq!(wh.get("_subscriptions.feedA.branches", None).unwrap(), before);
    assert_eq!(
        wh.get("_subscriptions.feedB.branches", None).unwrap(),
        Some(json!({
            "t@1": {"parents": {"t@1": true}, "children": {"t@1": true, "t@3": true}},
            "t@2": {"parents": {"t@2": true}, "children": {"t@2": true, "t@3": true, "t@4": true}},
            "t@3": {"parents": {"t@1": true, "t@2": true}, "children": {"t@4": true}},
            "t@4": {"parents": {"t@2": true, "t@3": true}, "children": {}},
            "t@6": {"parents": {"t@6": true}, "children": {"t@6": true}},
        }))
    );
    assert!(wh.check().unwrap().is_clean());
}

#[test]
fn graft_bottomup_copies_the_descendants() {
    let wh = Warehouse::default();
    wh.subscribe(&feed("feedA"), &[id("t@1"), id("t@2")]).unwrap();
    wh.subscribe(&feed("feedB"), &[id("t@6")]).unwrap();
    upsert(&wh, "t@3", "t@1", &["feedA"]);
    upsert(&wh, "t@3", "t@2", &["feedA"]);
    upsert(&wh, "t@4", "t@2", &["feedA"]);
    upsert(&wh, "t@4", "t@3", &["feedA"]);
    upsert(&wh, "t@5", "t@1", &["feedA"]);
    upsert(&wh, "t@5", "t@4", &["feedA"]);
    upsert(&wh, "t@6", "t@4", &["feedA"]);
    upsert(&wh, "t@7", "t@5", &["feedA"]);

    let before = wh.get("_subscriptions.feedA.branches", None).unwrap();
    let grafted = wh.graft_subtree(&id("t@4"), &feed("feedA"), &feed("feedB")).unwrap();
    assert_eq!(grafted, vec![id("t@4"), id("t@5"), id("t@6"), id("t@7")]);

    assert_eq!(wh.get("_subscriptions.feedA.branches", None).unwrap(), before);
    assert_eq!(
        wh.get("_subscriptions.feedB.branches", None).unwrap(),
        Some(json!({
            "t@4": {"parents": {}, "children": {"t@5": true, "t@6": true}},
            "t@5": {"parents": {"t@4": true}, "children": {"t@7": true}},
            "t@6": {"parents": {"t@4": true, "t@6": true}, "children": {"t@6": true}},
            "t@7": {"parents": {"t@5": true}, "children": {}},
        }))
    );
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
enum Op {
    Upsert(usize, u8),
    Detach(usize),
    Delete(usize),
    Narrow(usize),
    Flush,
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (1usize..5, any::<u8>()).prop_map(|(i, n)| Op::Upsert(i, n)),
        1 => (1usize..5).prop_map(Op::Detach),
        1 => (1usize..5).prop_map(Op::Delete),
        1 => (1usize..5).prop_map(Op::Narrow),
        1 => Just(Op::Flush),
    ]
}

fn apply(wh: &Warehouse, op: &Op) {
    match op {
        Op::Upsert(i, n) => {
            wh.upsert(
                UpsertRequest::new(format!("n@{i}"))
                    .data(json!({ "v": n, "w": i }))
                    .parent("root@0")
                    .feed("f"),
            )
            .unwrap();
        }
        Op::Detach(i) => {
            wh.detach(&id(&format!("n@{i}")), &["root@0"], &[]).unwrap();
        }
        Op::Delete(i) => {
            wh.delete_branch(&id(&format!("n@{i}"))).unwrap();
        }
        Op::Narrow(i) => {
            wh.attach(
                AttachRequest::new(format!("n@{i}"))
                    .parent("root@0")
                    .feed("f")
                    .view(View::With(vec!["v".into()])),
            )
            .unwrap();
        }
        Op::Flush => {
            wh.flush_released().unwrap();
        }
    }
}

fn replay(published: &mut Projection, message: &ChangeMessage) {
    match &message.body {
        ChangeBody::State(state) => *published = state.clone(),
        ChangeBody::Patch(patch) => apply_patch(published, patch).unwrap(),
    }
}

proptest! {
    #[test]
    fn patches_rebuild_the_projection(ops in proptest::collection::vec(op(), 1..40)) {
        let wh = Warehouse::default();
        let f = feed("f");
        wh.subscribe(&f, &[id("root@0")]).unwrap();

        let first = wh.sync_changes(Some(&f)).unwrap().remove(&f).unwrap();
        prop_assert!(!first.is_patch);
        prop_assert_eq!(first.generation, 0);
        let mut published = Projection::new();
        replay(&mut published, &first);
        let mut last = first.generation;

        for op in &ops {
            apply(&wh, op);
            if let Some(message) = wh.sync_changes(Some(&f)).unwrap().remove(&f) {
                prop_assert!(message.is_patch);
                prop_assert_eq!(message.generation, last + 1);
                last = message.generation;
                replay(&mut published, &message);
            }
            let expected = project_feed(&wh.snapshot().unwrap(), &f);
            prop_assert_eq!(&published, &expected);
        }
        prop_assert!(wh.check().unwrap().broken_edges.is_empty());
    }
}

#[test]
fn resend_after_patches_matches_the_replayed_state() {
    let wh = Warehouse::default();
    let f = feed("f");
    wh.subscribe(&f, &[id("root@0")]).unwrap();
    let mut published = Projection::new();
    replay(&mut published, &wh.sync_changes(None).unwrap()[&f]);

    for op in [Op::Upsert(1, 1), Op::Upsert(2, 2), Op::Narrow(1), Op::Detach(2)] {
        apply(&wh, &op);
        if let Some(message) = wh.sync_changes(None).unwrap().get(&f) {
            replay(&mut published, message);
        }
    }
    let resent = wh.resend(&f).unwrap().unwrap();
    let ChangeBody::State(state) = &resent.body else {
        panic!("resend publishes a snapshot");
    };
    assert_eq!(state, &published);
    assert_eq!(state[&id("n@1")], json!({"id": "n@1", "v": 1}));
    assert!(!state.contains_key("n@2"));
}
