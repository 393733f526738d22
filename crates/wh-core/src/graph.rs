//! Graphviz rendering of the ownership graphs.
//!
//! Each feed becomes a `cluster_<feed>` subgraph. Node names carry the
//! cluster index (`"<branch>-<index>"`) so the same branch can appear in
//! several clusters. Edges point from child to parent.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use wh_store::WarehouseState;
use wh_types::BranchId;

/// Rendering style.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphStyle {
    /// Small dots with the namespace as an external label.
    Simple,
    /// Plaintext tables with namespace, id, state presence and generation.
    #[default]
    #[serde(alias = "complexe")]
    Complex,
}

impl std::str::FromStr for GraphStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "simple" => Ok(Self::Simple),
            "complex" | "complexe" => Ok(Self::Complex),
            other => Err(format!("unknown graph style: {other}")),
        }
    }
}

fn background(namespace: &str) -> &'static str {
    const COLORS: [(&str, &str); 5] = [
        ("-worker", "#ccffff"),
        ("-workitem", "#ffccff"),
        ("-feeder", "#ffffcc"),
        ("-updater", "#ccffcc"),
        ("-dispatcher", "#ccccff"),
    ];
    COLORS
        .iter()
        .find(|(suffix, _)| namespace.ends_with(suffix))
        .map_or("#eeeeee", |(_, color)| *color)
}

/// Darken each channel of `#rrggbb` by 16.
fn foreground(background: &str) -> String {
    let hex = background.trim_start_matches('#');
    let mut out = String::from("#");
    for i in (0..hex.len()).step_by(2) {
        let channel = hex
            .get(i..i + 2)
            .and_then(|c| u8::from_str_radix(c, 16).ok())
            .unwrap_or(0);
        let _ = write!(out, "{:02x}", channel.saturating_sub(16));
    }
    out
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn chunked(id: &str, width: usize) -> Vec<String> {
    let chars: Vec<char> = id.chars().collect();
    chars
        .chunks(width)
        .map(|chunk| escape(&chunk.iter().collect::<String>()))
        .collect()
}

fn simple_node(branch: &BranchId, index: usize) -> String {
    let bg = background(branch.namespace());
    format!(
        "\"{branch}-{index}\" [color=\"{fg}\" fillcolor=\"{bg}\" label=\"\" \
         xlabel=<<table bgcolor=\"white\" border=\"0\" cellpadding=\"1\" cellspacing=\"0\" style=\"rounded\">\
         <tr><td>{ns}</td></tr></table>>]",
        fg = foreground(bg),
        ns = escape(branch.namespace()),
    )
}

fn complex_node(state: &WarehouseState, branch: &BranchId, self_owned: bool, index: usize) -> String {
    let bg = background(branch.namespace());
    let red = |v: &str| format!("<font color=\"#b01717\">{v}</font>");
    let has_state = if state.store.contains(branch) {
        "true".to_string()
    } else {
        red("false")
    };
    let generation = match state.store.generation(branch) {
        Some(g) => g.to_string(),
        None => red("none"),
    };
    let marker = if self_owned {
        "<font point-size=\"12\" color=\"#222222\">↺</font>"
    } else {
        ""
    };
    format!(
        "\"{branch}-{index}\" [style=\"\" label=<<font color=\"#888888\">\
         <table bgcolor=\"{bg}\" color=\"{bg}\" border=\"5\" style=\"rounded\" cellpadding=\"0\" cellborder=\"0\">\
         <tr><td width=\"18\" align=\"left\">{marker}</td>\
         <td width=\"100\" align=\"left\"><font point-size=\"10\" color=\"#222222\">{ns}</font></td></tr>\
         <tr><td align=\"right\" valign=\"top\"><b>&nbsp;</b>id:</td>\
         <td align=\"left\" valign=\"top\">{id}<b>&nbsp;</b><br align=\"left\"/></td></tr>\
         <tr><td align=\"right\" valign=\"top\"><b>&nbsp;</b>meta:</td>\
         <td width=\"100\" align=\"left\" valign=\"top\">state={has_state}, gen={generation}<b>&nbsp;</b></td></tr>\
         </table></font>>]",
        ns = escape(branch.namespace()),
        id = chunked(branch.as_str(), 40).join("<br align=\"left\"/>"),
    )
}

/// Render every feed's ownership graph as a DOT document.
pub fn render_dot(state: &WarehouseState, style: GraphStyle) -> String {
    let mut out = String::new();
    out.push_str("digraph \"Warehouse - Ownerships\" {\n");
    out.push_str(
        "  graph [rankdir=\"LR\" splines=\"polyline\" fontname=\"Helvetica\" style=\"dashed\" \
         margin=\"50\" dpi=\"96\" outputorder=\"edgesfirst\"",
    );
    if style == GraphStyle::Simple {
        out.push_str(" overlap=\"scale\"");
    }
    out.push_str("];\n");

    for (index, (feed, table)) in state.subscriptions.feeds().enumerate() {
        let _ = writeln!(out, "  subgraph \"cluster_{feed}\" {{");
        let _ = writeln!(out, "    graph [label=\"{}\" fontname=\"Helvetica\"];", escape(feed.as_str()));
        match style {
            GraphStyle::Simple => {
                out.push_str(
                    "    node [fontname=\"Helvetica\" fontsize=\"6\" style=\"filled\" fillcolor=\"#ffcccc\" \
                     shape=\"circle\" width=\"0.15\" height=\"0.15\" fixedsize=\"true\"];\n",
                );
                out.push_str("    edge [fontname=\"Helvetica\" color=\"#888888\" arrowsize=\".2\" penwidth=\".3\"];\n");
            }
            GraphStyle::Complex => {
                out.push_str(
                    "    node [fontname=\"Helvetica\" fontsize=\"6\" style=\"filled\" fillcolor=\"#ffcccc\" \
                     shape=\"plaintext\"];\n",
                );
                out.push_str("    edge [fontname=\"Helvetica\" color=\"#888888\" arrowsize=\".6\"];\n");
            }
        }

        let mut statements: Vec<String> = Vec::new();
        let mut push = |statement: String| {
            if !statements.contains(&statement) {
                statements.push(statement);
            }
        };
        for (branch, ownership) in &table.branches {
            let edge = |from: &BranchId, to: &BranchId| format!("\"{from}-{index}\" -> \"{to}-{index}\"");
            for child in ownership.children.iter().filter(|c| *c != branch) {
                push(edge(child, branch));
            }
            for parent in ownership.parents.iter().filter(|p| *p != branch) {
                push(edge(branch, parent));
            }
            let self_owned = ownership.is_self_owned(branch);
            push(match style {
                GraphStyle::Simple => simple_node(branch, index),
                GraphStyle::Complex => complex_node(state, branch, self_owned, index),
            });
        }
        for statement in statements {
            let _ = writeln!(out, "    {statement};");
        }
        out.push_str("  }\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wh_ownership::OwnershipUpdate;
    use wh_types::FeedId;

    fn fixture() -> WarehouseState {
        let mut state = WarehouseState::new();
        let feed = FeedId::new("desktop");
        let root = BranchId::new("desk-worker@1");
        let child = BranchId::new("item-workitem@1");
        state.subscriptions.subscribe(&feed, &[root.clone()]);
        state
            .subscriptions
            .update_ownership(&OwnershipUpdate {
                branch: &child,
                parents: &[root.clone()],
                feeds: &[feed],
                creating: None,
                creator: None,
            })
            .unwrap();
        state.store.upsert(&root, json!({}));
        state.store.stamp_generation(&root, 3);
        state
    }

    #[test]
    fn colors_by_namespace_suffix() {
        assert_eq!(background("desk-worker"), "#ccffff");
        assert_eq!(background("item-workitem"), "#ffccff");
        assert_eq!(background("contact"), "#eeeeee");
        assert_eq!(foreground("#ccffff"), "#bcefef");
        assert_eq!(foreground("#100000"), "#000000");
    }

    #[test]
    fn complex_graph_has_clusters_edges_and_markers() {
        let dot = render_dot(&fixture(), GraphStyle::Complex);
        assert!(dot.starts_with("digraph"));
        assert!(dot.contains("subgraph \"cluster_desktop\""));
        assert!(dot.contains("\"item-workitem@1-0\" -> \"desk-worker@1-0\";"));
        assert_eq!(dot.matches("->").count(), 1);
        assert!(dot.contains('↺'));
        assert!(dot.contains("state=true, gen=3"));
        assert!(dot.contains("#b01717"));
    }

    #[test]
    fn simple_graph_uses_dots() {
        let dot = render_dot(&fixture(), GraphStyle::Simple);
        assert!(dot.contains("shape=\"circle\""));
        assert!(dot.contains("overlap=\"scale\""));
        assert!(!dot.contains('↺'));
    }

    #[test]
    fn style_parsing() {
        assert_eq!("simple".parse::<GraphStyle>(), Ok(GraphStyle::Simple));
        assert_eq!("complexe".parse::<GraphStyle>(), Ok(GraphStyle::Complex));
        assert!("fancy".parse::<GraphStyle>().is_err());
    }
}
