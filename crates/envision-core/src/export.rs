//! Text and JSON export of a session's tree.

use crate::Result;
use crate::model::{Candidate, EnvisionNode, NodeId, NodeKind, Tree};
use serde::Serialize;
use std::fmt::Write as _;

/// Markdown-ish report: the prompt, then one section per non-empty use case listing the
/// non-empty harms found under its stakeholders, in tree order.
pub fn export_text(tree: &Tree, prompt: &str) -> String {
    let mut out = String::new();
    let _ = write!(&mut out, "## Prompt\n\n{prompt}\n\n");

    let Some(root) = tree.node(tree.root()) else {
        return out;
    };
    let mut n = 1;
    for use_case in nodes(tree, &root.children) {
        if use_case.is_empty() {
            continue;
        }
        let _ = write!(&mut out, "### Use Case {n}: {}\n\n", use_case.text);
        n += 1;
        if !use_case.children.is_empty() {
            out.push_str("#### Harms\n\n");
        }
        for stakeholder in nodes(tree, &use_case.children) {
            for harm in nodes(tree, &stakeholder.children) {
                if !harm.is_empty() {
                    let _ = write!(&mut out, "- {}\n\n", harm.text.replace('\n', " "));
                }
            }
        }
        out.push('\n');
    }
    out
}

fn nodes<'a>(tree: &'a Tree, ids: &'a [NodeId]) -> impl Iterator<Item = &'a EnvisionNode> + 'a {
    ids.iter().filter_map(|id| tree.node(id))
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    prompt: &'a str,
    data: ExportNode<'a>,
}

#[derive(Debug, Serialize)]
struct ExportNode<'a> {
    id: &'a NodeId,
    text: &'a str,
    #[serde(flatten)]
    kind: &'a NodeKind,
    show_children: bool,
    children: Vec<ExportNode<'a>>,
    candidates: &'a [Candidate],
}

fn export_node<'a>(tree: &'a Tree, node: &'a EnvisionNode) -> ExportNode<'a> {
    ExportNode {
        id: &node.id,
        text: &node.text,
        kind: &node.kind,
        show_children: node.show_children,
        children: nodes(tree, &node.children)
            .map(|c| export_node(tree, c))
            .collect(),
        candidates: &node.candidates,
    }
}

/// `{ "prompt": ..., "data": <nested tree> }`, children and candidate pools included.
pub fn export_json(tree: &Tree, prompt: &str) -> Result<String> {
    let root = tree.get(tree.root())?;
    let doc = ExportDocument {
        prompt,
        data: export_node(tree, root),
    };
    Ok(serde_json::to_string_pretty(&doc)?)
}
