//! Read-only selection over stored branches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use wh_store::WarehouseState;
use wh_types::{project, BranchId, FeedId, View};

use crate::changes::project_feed;

/// Selection criteria. Every criterion that is set must hold.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Query {
    /// Restrict to what this feed sees, through its views.
    pub feed: Option<FeedId>,
    /// Restrict to these ids.
    pub ids: Vec<BranchId>,
    /// Restrict to one namespace (`<type>@...`).
    #[serde(rename = "type")]
    pub kind: Option<String>,
    /// Exact field matches.
    pub filter: Map<String, Value>,
    /// Projection applied to each result.
    pub view: Option<View>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_feed(mut self, feed: FeedId) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = BranchId>) -> Self {
        self.ids.extend(ids);
        self
    }

    pub fn of_type(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, value: Value) -> Self {
        self.filter.insert(name.into(), value);
        self
    }

    pub fn view(mut self, view: View) -> Self {
        self.view = Some(view);
        self
    }

    fn accepts(&self, id: &BranchId, payload: &Value) -> bool {
        if !self.ids.is_empty() && !self.ids.contains(id) {
            return false;
        }
        if let Some(kind) = &self.kind {
            if !id.is_of_type(kind) {
                return false;
            }
        }
        self.filter
            .iter()
            .all(|(field, expected)| payload.get(field) == Some(expected))
    }

    /// Run against a state. Results are ordered by branch id.
    pub fn run(&self, state: &WarehouseState) -> Vec<Value> {
        let select = |id: &BranchId, payload: &Value| {
            self.accepts(id, payload)
                .then(|| project(payload, self.view.as_ref()))
        };
        match &self.feed {
            Some(feed) => project_feed(state, feed)
                .iter()
                .filter_map(|(id, payload)| select(id, payload))
                .collect(),
            None => state
                .store
                .iter()
                .filter_map(|(id, payload)| select(id, payload))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fixture() -> WarehouseState {
        let mut state = WarehouseState::new();
        for (id, payload) in [
            ("contact@1", json!({"name": "Ada", "city": "London"})),
            ("contact@2", json!({"name": "Alan", "city": "London"})),
            ("contact@3", json!({"name": "Grace", "city": "Arlington"})),
            ("invoice@1", json!({"city": "London"})),
        ] {
            state.store.upsert(&BranchId::new(id), payload);
        }
        state
            .subscriptions
            .subscribe(&FeedId::new("feedA"), &[BranchId::new("contact@2")]);
        state.subscriptions.set_view(
            &FeedId::new("feedA"),
            &BranchId::new("contact@2"),
            Some(View::With(vec!["name".into()])),
        );
        state
    }

    fn ids(results: &[Value]) -> Vec<&str> {
        results.iter().filter_map(|v| v["id"].as_str()).collect()
    }

    #[test]
    fn type_and_filter_combine() {
        let q = Query::new().of_type("contact").field("city", json!("London"));
        assert_eq!(ids(&q.run(&fixture())), vec!["contact@1", "contact@2"]);
    }

    #[test]
    fn ids_and_view() {
        let q = Query::new()
            .ids([BranchId::new("contact@3"), BranchId::new("missing@1")])
            .view(View::With(vec!["name".into()]));
        assert_eq!(q.run(&fixture()), vec![json!({"id": "contact@3", "name": "Grace"})]);
    }

    #[test]
    fn feed_scope_sees_the_feed_projection() {
        let state = fixture();
        let q = Query::new().in_feed(FeedId::new("feedA"));
        assert_eq!(q.run(&state), vec![json!({"id": "contact@2", "name": "Alan"})]);

        // The view hides `city`, so a city filter cannot match in the feed.
        let q = q.field("city", json!("London"));
        assert!(q.run(&state).is_empty());
    }

    #[test]
    fn deserializes_type_field() {
        let q: Query = serde_json::from_value(json!({"type": "invoice"})).unwrap();
        assert_eq!(ids(&q.run(&fixture())), vec!["invoice@1"]);
    }
}
