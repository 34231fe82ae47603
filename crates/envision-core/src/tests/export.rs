use crate::config::EnvisionConfig;
use crate::export::{export_json, export_text};
use crate::model::Tree;
use crate::{Dispatch, GenerationCoordinator, GenerationResponse, MemoryPromptCache};
use rand::SeedableRng;
use rand::rngs::StdRng;

fn respond(
    coord: &mut GenerationCoordinator,
    tree: &mut Tree,
    dispatch: Dispatch,
    text: &str,
) {
    let Dispatch::Send(req) = dispatch else {
        panic!("expected a network dispatch");
    };
    coord
        .handle_response(
            tree,
            GenerationResponse::Finished {
                request_id: req.request_id,
                result_text: text.to_string(),
                context_detail: req.context_detail,
            },
        )
        .unwrap();
}

fn grown_tree() -> Tree {
    let cfg = EnvisionConfig::default();
    let mut coord = GenerationCoordinator::new(cfg.generation, cfg.quotas, MemoryPromptCache::new());
    let mut rng = StdRng::seed_from_u64(9);
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();

    let d = coord.request_children(&mut tree, &root).unwrap();
    respond(
        &mut coord,
        &mut tree,
        d,
        "<intended>Answer triage questions</intended><misuse>Skip the queue</misuse>",
    );
    tree.ensure_placeholder(&root, &mut rng).unwrap();

    let uc = tree.get(&root).unwrap().children[0].clone();
    let d = coord.request_children(&mut tree, &uc).unwrap();
    respond(
        &mut coord,
        &mut tree,
        d,
        r#"<stakeholder type="direct" relevance="very relevant">Patient</stakeholder>"#,
    );

    let sh = tree.get(&uc).unwrap().children[0].clone();
    let d = coord.request_children(&mut tree, &sh).unwrap();
    respond(
        &mut coord,
        &mut tree,
        d,
        "<harm><type>Diminished health and well-being</type><severity>very severe</severity>\
<explain>Patients may receive\nwrong advice</explain></harm>",
    );
    tree.ensure_placeholder(&sh, &mut rng).unwrap();
    tree
}

#[test]
fn text_export_lists_harms_per_use_case() {
    let tree = grown_tree();
    let text = export_text(&tree, "Help nurses triage");
    let expected = "## Prompt\n\nHelp nurses triage\n\n\
### Use Case 1: Answer triage questions\n\n\
#### Harms\n\n\
- Patients may receive wrong advice\n\n\
\n\
### Use Case 2: Skip the queue\n\n\
\n";
    assert_eq!(text, expected);
}

#[test]
fn json_export_nests_children_and_candidates() {
    let tree = grown_tree();
    let json: serde_json::Value =
        serde_json::from_str(&export_json(&tree, "Help nurses triage").unwrap()).unwrap();
    assert_eq!(json["prompt"], "Help nurses triage");
    assert_eq!(json["data"]["type"], "summary");
    assert_eq!(json["data"]["children"].as_array().unwrap().len(), 3);
    let use_case = &json["data"]["children"][0];
    assert_eq!(use_case["type"], "use-case");
    assert_eq!(use_case["category"], "Intended");
    let harm = &use_case["children"][0]["children"][0];
    assert_eq!(harm["type"], "harm");
    assert_eq!(harm["severity"], 3);
    assert_eq!(harm["validated"], true);
    assert_eq!(json["data"]["candidates"].as_array().unwrap().len(), 2);
}
