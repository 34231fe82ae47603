use crate::config::EnvisionConfig;
use crate::model::{GenerationState, LayerType, Tree};
use crate::{
    Dispatch, Error, GenerationCoordinator, GenerationOutcome, GenerationResponse,
    MemoryPromptCache, PromptCache,
};
use std::time::Duration;

const USE_CASES: &str = "<intended>Answer triage questions</intended><misuse>Self-diagnose</misuse>";

fn coordinator() -> GenerationCoordinator {
    let cfg = EnvisionConfig::default();
    GenerationCoordinator::new(cfg.generation, cfg.quotas, MemoryPromptCache::new())
}

fn sent(dispatch: Dispatch) -> crate::GenerationRequest {
    match dispatch {
        Dispatch::Send(req) => req,
        other => panic!("expected a network dispatch, got {other:?}"),
    }
}

fn finished(request_id: &str, text: &str, detail: Option<String>) -> GenerationResponse {
    GenerationResponse::Finished {
        request_id: request_id.to_string(),
        result_text: text.to_string(),
        context_detail: detail,
    }
}

#[test]
fn request_ids_carry_namespace_layer_and_counter() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();

    let summary = sent(coord.request_summary("Help nurses triage"));
    assert_eq!(summary.request_id, "envision-summary-0");
    assert!(summary.compiled_prompt.contains("Help nurses triage"));

    let req = sent(coord.request_children(&mut tree, &root).unwrap());
    assert_eq!(req.request_id, "envision-use-case-1");
    assert_eq!(req.layer, LayerType::UseCase);
    assert_eq!(req.context_detail.as_deref(), Some("summary-0"));
    assert!(req.compiled_prompt.contains("A triage chatbot"));
    assert_eq!(
        tree.get(&root).unwrap().generation,
        GenerationState::Pending {
            request_id: req.request_id.clone()
        }
    );
}

#[test]
fn at_most_one_request_per_node() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    coord.request_children(&mut tree, &root).unwrap();
    let err = coord.request_children(&mut tree, &root).unwrap_err();
    assert!(matches!(err, Error::UnsupportedOperation { .. }));
    assert_eq!(coord.pending_count(), 1);
}

#[test]
fn finished_response_populates_children_and_cache() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let req = sent(coord.request_children(&mut tree, &root).unwrap());

    let outcome = coord
        .handle_response(&mut tree, finished(&req.request_id, USE_CASES, req.context_detail.clone()))
        .unwrap();
    let GenerationOutcome::Children { parent, layer, selected } = outcome else {
        panic!("expected children, got {outcome:?}");
    };
    assert_eq!(parent, root);
    assert_eq!(layer, LayerType::UseCase);
    assert_eq!(selected.len(), 2);

    let node = tree.get(&root).unwrap();
    assert_eq!(node.children, selected);
    assert_eq!(node.candidates.len(), 2);
    assert_eq!(node.generation, GenerationState::Idle);
    assert_eq!(coord.cache().get(&req.compiled_prompt).as_deref(), Some(USE_CASES));
}

#[test]
fn cache_hit_is_replayed_with_delay() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let req = sent(coord.request_children(&mut tree, &root).unwrap());
    coord
        .handle_response(&mut tree, finished(&req.request_id, USE_CASES, req.context_detail))
        .unwrap();

    let mut fresh = Tree::new("A triage chatbot");
    let fresh_root = fresh.root().clone();
    let Dispatch::Replay { response, delay } = coord.request_children(&mut fresh, &fresh_root).unwrap()
    else {
        panic!("expected a cache replay");
    };
    assert_eq!(delay, Duration::from_millis(500));
    let outcome = coord.handle_response(&mut fresh, response).unwrap();
    assert!(matches!(outcome, GenerationOutcome::Children { .. }));
    assert_eq!(fresh.get(&fresh_root).unwrap().candidates.len(), 2);
}

#[test]
fn failure_marks_node_and_allows_retry() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let req = sent(coord.request_children(&mut tree, &root).unwrap());

    let outcome = coord
        .handle_response(
            &mut tree,
            GenerationResponse::Failed {
                request_id: req.request_id.clone(),
                error_message: "quota exceeded".to_string(),
            },
        )
        .unwrap();
    assert_eq!(
        outcome,
        GenerationOutcome::Failed {
            target: Some(root.clone()),
            message: "quota exceeded".to_string()
        }
    );
    assert!(matches!(
        tree.get(&root).unwrap().generation,
        GenerationState::Failed { .. }
    ));
    assert!(tree.get(&root).unwrap().children.is_empty());
    assert_eq!(coord.pending_count(), 0);

    let retry = sent(coord.request_children(&mut tree, &root).unwrap());
    assert_ne!(retry.request_id, req.request_id);
}

#[test]
fn late_responses_after_reset_are_ignored() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let req = sent(coord.request_children(&mut tree, &root).unwrap());

    coord.reset();
    let mut tree = Tree::new("A different product");
    let outcome = coord
        .handle_response(&mut tree, finished(&req.request_id, USE_CASES, req.context_detail))
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Ignored);
    assert!(tree.get(tree.root()).unwrap().children.is_empty());
}

#[test]
fn responses_for_a_replaced_tree_are_ignored_without_reset() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let req = sent(coord.request_children(&mut tree, &root).unwrap());

    // Same root id, but the new root never issued this request.
    let mut tree = Tree::new("A different product");
    let outcome = coord
        .handle_response(&mut tree, finished(&req.request_id, USE_CASES, req.context_detail))
        .unwrap();
    assert_eq!(outcome, GenerationOutcome::Ignored);
}

#[test]
fn harms_cannot_request_children() {
    let mut coord = coordinator();
    let mut tree = Tree::new("A triage chatbot");
    let root = tree.root().clone();
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(2);
    let uc = tree.create_empty_child(&root, &mut rng).unwrap();
    let sh = tree.create_empty_child(&uc, &mut rng).unwrap();
    let harm = tree.create_empty_child(&sh, &mut rng).unwrap();
    assert!(matches!(
        coord.request_children(&mut tree, &harm),
        Err(Error::UnsupportedOperation { .. })
    ));
}

#[test]
fn summary_response_is_extracted_and_cached() {
    let mut coord = coordinator();
    let mut tree = Tree::new("");
    let req = sent(coord.request_summary("Help nurses triage"));

    let outcome = coord
        .handle_response(&mut tree, finished(&req.request_id, "<summary> Triage </summary>", None))
        .unwrap();
    assert_eq!(
        outcome,
        GenerationOutcome::Summary {
            text: "Triage".to_string()
        }
    );
    assert_eq!(
        coord.cache().get(&req.compiled_prompt).as_deref(),
        Some("<summary> Triage </summary>")
    );
}
