use envision_core::config::LayoutConfig;
use envision_core::taxonomy::{Relevance, Severity, StakeholderCategory, SubHarmCategory, UseCaseCategory};
use envision_core::{EnvisionNode, HarmDetail, LayerType, NodeId, NodeKind, Tree};
use envision_layout::{DeterministicNodeMeasurer, Error, NodeSize, layout_tree};

fn fixed(height: f64) -> impl Fn(&EnvisionNode, f64) -> NodeSize {
    move |_, width| NodeSize { width, height }
}

fn add(tree: &mut Tree, parent: &NodeId, text: &str) -> NodeId {
    let layer = tree.get(parent).unwrap().layer().child_layer().unwrap();
    let kind = match layer {
        LayerType::UseCase => NodeKind::UseCase {
            category: UseCaseCategory::Intended,
        },
        LayerType::Stakeholder => NodeKind::Stakeholder {
            category: StakeholderCategory::Direct,
            relevance: Relevance::VeryRelevant,
        },
        _ => NodeKind::Harm(HarmDetail {
            category: SubHarmCategory::DiminishedHealth,
            severity: Severity::Severe,
            user_rated_severity: 0,
            validated: true,
        }),
    };
    let id = tree.ids_mut().next(layer);
    tree.attach(parent, EnvisionNode::new(id.clone(), text, kind))
        .unwrap();
    tree.get_mut(parent).unwrap().show_children = true;
    id
}

fn y(tree: &Tree, id: &NodeId) -> f64 {
    tree.get(id).unwrap().geometry.y
}

#[test]
fn siblings_are_spaced_by_half_heights_plus_gap() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let a = add(&mut tree, &root, "Answer triage questions");
    let b = add(&mut tree, &root, "Skip the queue");

    let cfg = LayoutConfig::default();
    let layout = layout_tree(&mut tree, &fixed(40.0), &cfg).unwrap();

    assert_eq!(layout.nodes.len(), 3);
    assert_eq!(layout.height, 1);
    assert_eq!(y(&tree, &b) - y(&tree, &a), 40.0 + cfg.v_gap);
    assert_eq!(y(&tree, &root), 0.0);
    assert_eq!(y(&tree, &a) + y(&tree, &b), 0.0);

    let column = cfg.rect_width + cfg.h_gap;
    assert_eq!(tree.get(&a).unwrap().geometry.x, column);
    assert!(tree.get(&a).unwrap().geometry.measured);
}

#[test]
fn harm_siblings_pack_with_the_short_gap() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let uc = add(&mut tree, &root, "Answer triage questions");
    let s1 = add(&mut tree, &uc, "Patients");
    let s2 = add(&mut tree, &uc, "Nurses");
    let h1 = add(&mut tree, &s1, "Patients may be misdirected");
    let h2 = add(&mut tree, &s1, "Patients may wait longer");
    let h3 = add(&mut tree, &s2, "Nurses may lose oversight");

    let cfg = LayoutConfig::default();
    layout_tree(&mut tree, &fixed(40.0), &cfg).unwrap();

    assert_eq!(y(&tree, &h2) - y(&tree, &h1), 40.0 + cfg.short_v_gap);
    // Harms under different stakeholders keep the regular gap.
    assert!(y(&tree, &h3) - y(&tree, &h2) >= 40.0 + cfg.v_gap - 1e-9);
    assert!(y(&tree, &s2) - y(&tree, &s1) >= 40.0 + cfg.v_gap - 1e-9);
}

#[test]
fn unmeasured_nodes_fall_back_to_the_nominal_height() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let a = add(&mut tree, &root, "A");
    let b = add(&mut tree, &root, "B");

    let cfg = LayoutConfig::default();
    layout_tree(&mut tree, &fixed(0.0), &cfg).unwrap();

    assert_eq!(y(&tree, &b) - y(&tree, &a), cfg.rect_height + cfg.v_gap);
    let g = tree.get(&a).unwrap().geometry;
    assert!(!g.measured);
    assert_eq!(g.height, cfg.rect_height);
}

#[test]
fn hidden_subtrees_are_not_positioned() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let uc = add(&mut tree, &root, "Answer triage questions");
    let sh = add(&mut tree, &uc, "Patients");
    tree.get_mut(&uc).unwrap().show_children = false;

    let layout = layout_tree(&mut tree, &fixed(40.0), &LayoutConfig::default()).unwrap();
    assert!(layout.position(&sh).is_none());
    assert_eq!(layout.height, 1);
    assert!(layout.bounds(LayerType::Stakeholder).is_empty());
}

#[test]
fn harm_bounds_use_the_long_box() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let uc = add(&mut tree, &root, "Answer triage questions");
    let sh = add(&mut tree, &uc, "Patients");
    add(&mut tree, &sh, "Patients may be misdirected");

    let cfg = LayoutConfig::default();
    let layout = layout_tree(&mut tree, &fixed(40.0), &cfg).unwrap();
    let harms = layout.bounds(LayerType::Harm);
    let x = 3.0 * (cfg.rect_width + cfg.h_gap);
    assert_eq!(harms.x0, x - cfg.rect_width / 2.0);
    assert_eq!(harms.width(), cfg.rect_long_width);
    assert_eq!(harms.height(), 40.0);

    let stakeholders = layout.bounds(LayerType::Stakeholder);
    assert_eq!(stakeholders.width(), cfg.rect_width);
    assert_eq!(layout.height, 3);
}

#[test]
fn layout_is_idempotent() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    let uc = add(&mut tree, &root, "Answer triage questions about symptoms and urgency");
    add(&mut tree, &root, "Skip the queue");
    let sh = add(&mut tree, &uc, "Patients");
    add(&mut tree, &sh, "Patients may receive the wrong triage level");
    add(&mut tree, &sh, "");

    let measurer = DeterministicNodeMeasurer::default();
    let cfg = LayoutConfig::default();
    let first = layout_tree(&mut tree, &measurer, &cfg).unwrap();
    let second = layout_tree(&mut tree, &measurer, &cfg).unwrap();
    assert_eq!(first, second);
}

#[test]
fn deleted_root_reports_missing_root() {
    let mut tree = Tree::new("Triage chatbot");
    let root = tree.root().clone();
    tree.get_mut(&root).unwrap().deleted = true;
    assert!(tree.purge(&root));
    let err = layout_tree(&mut tree, &fixed(40.0), &LayoutConfig::default()).unwrap_err();
    assert!(matches!(err, Error::MissingRoot));
}
