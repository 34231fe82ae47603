use crate::config::QuotaConfig;
use crate::model::{IdGenerator, NodeKind};
use crate::parse::{parse_harms, parse_stakeholders, parse_use_cases};
use crate::taxonomy::{Relevance, StakeholderCategory, UseCaseCategory};

fn use_case_response(per_category: usize) -> String {
    let mut out = String::new();
    for (tag, label) in [("intended", "I"), ("highstakes", "H"), ("misuse", "M")] {
        for i in 0..per_category {
            out.push_str(&format!("<{tag}>{label}{i}</{tag}>\n"));
        }
    }
    out
}

#[test]
fn use_cases_two_per_category_are_all_selected() {
    let parsed = parse_use_cases(
        &use_case_response(2),
        &QuotaConfig::default(),
        &mut IdGenerator::new(),
    );
    assert_eq!(parsed.selected.len(), 6);
    assert_eq!(parsed.candidates.len(), 6);
    assert_eq!(parsed.selected, parsed.candidates);
}

#[test]
fn use_cases_over_quota_stay_in_candidates_only() {
    let parsed = parse_use_cases(
        &use_case_response(4),
        &QuotaConfig::default(),
        &mut IdGenerator::new(),
    );
    assert_eq!(parsed.candidates.len(), 12);
    assert_eq!(parsed.selected.len(), 6);
    for category in UseCaseCategory::ALL {
        let n = parsed
            .selected
            .iter()
            .filter(|c| c.kind == NodeKind::UseCase { category })
            .count();
        assert_eq!(n, 2, "{category}");
    }
    let texts: Vec<_> = parsed.selected.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["I0", "I1", "H0", "H1", "M0", "M1"]);
}

#[test]
fn use_case_quota_is_configurable() {
    let quotas = QuotaConfig {
        use_case_per_category: 1,
        ..QuotaConfig::default()
    };
    let parsed = parse_use_cases(&use_case_response(3), &quotas, &mut IdGenerator::new());
    assert_eq!(parsed.selected.len(), 3);
}

#[test]
fn use_case_nested_tags_are_stripped() {
    let parsed = parse_use_cases(
        "<intended><intended> Triage walk-in patients </intended>",
        &QuotaConfig::default(),
        &mut IdGenerator::new(),
    );
    assert_eq!(parsed.candidates.len(), 1);
    assert_eq!(parsed.candidates[0].text, "Triage walk-in patients");
}

#[test]
fn use_case_ids_follow_the_injected_generator() {
    let mut ids = IdGenerator::new();
    let parsed = parse_use_cases(&use_case_response(1), &QuotaConfig::default(), &mut ids);
    let got: Vec<_> = parsed.candidates.iter().map(|c| c.id.to_string()).collect();
    assert_eq!(got, vec!["use-case-0", "use-case-1", "use-case-2"]);
}

#[test]
fn stakeholder_tag_dialect_scenario() {
    let parsed = parse_stakeholders(
        r#"<direct relevance="relevant">Patient</direct><indirect relevance="very relevant">Family</indirect>"#,
        &QuotaConfig::default(),
        &mut IdGenerator::new(),
    );
    let got: Vec<_> = parsed
        .selected
        .iter()
        .map(|c| (c.text.as_str(), c.kind))
        .collect();
    assert_eq!(
        got,
        vec![
            (
                "Patient",
                NodeKind::Stakeholder {
                    category: StakeholderCategory::Direct,
                    relevance: Relevance::Relevant,
                }
            ),
            (
                "Family",
                NodeKind::Stakeholder {
                    category: StakeholderCategory::Indirect,
                    relevance: Relevance::VeryRelevant,
                }
            ),
        ]
    );
}

#[test]
fn unvalidated_harms_are_never_selected() {
    let response = "\
<harm><type>Economic loss</type><severity>very severe</severity><explain>Doctors may lose income</explain></harm>
<harm><type>Alienation</type><severity>severe</severity><explain>Hospitals may close</explain></harm>
<harm><type>Stereotyping</type><severity>not severe</severity><explain>This could mislabel people</explain></harm>";
    let parsed = parse_harms(
        response,
        "Patient",
        &QuotaConfig::default(),
        &mut IdGenerator::new(),
    );
    assert_eq!(parsed.candidates.len(), 3);
    assert!(parsed.selected.is_empty());
    for c in &parsed.candidates {
        let NodeKind::Harm(h) = c.kind else {
            panic!("expected a harm");
        };
        assert!(!h.validated);
    }
}

#[test]
fn selected_items_keep_pool_order() {
    let response = r#"
<stakeholder type="indirect" relevance="relevant">Insurers</stakeholder>
<stakeholder type="direct" relevance="very relevant">Patients</stakeholder>
<stakeholder type="indirect" relevance="very relevant">Families</stakeholder>
"#;
    let parsed = parse_stakeholders(response, &QuotaConfig::default(), &mut IdGenerator::new());
    let positions: Vec<_> = parsed
        .selected
        .iter()
        .map(|s| {
            parsed
                .candidates
                .iter()
                .position(|c| c.id == s.id)
                .unwrap()
        })
        .collect();
    let mut sorted = positions.clone();
    sorted.sort_unstable();
    assert_eq!(positions, sorted);
    assert_eq!(positions.len(), 3);
}
