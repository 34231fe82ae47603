use super::ParsedChildren;
use super::markup::{Element, Tag, clean_text, elements};
use crate::config::QuotaConfig;
use crate::model::{Candidate, IdGenerator, LayerType, NodeKind};
use crate::taxonomy::{Relevance, StakeholderCategory};

/// Parses stakeholders from either dialect the model produces:
///
/// - `<stakeholder type="direct|indirect" relevance="relevant|very relevant">name</stakeholder>`
/// - `<direct relevance="...">name</direct>` / `<indirect relevance="...">name</indirect>`
///
/// Attribute-dialect items come first in the pool. Selection takes the first
/// `direct_stakeholders` direct items regardless of relevance, then fills up to
/// `indirect_stakeholders` indirect items, very relevant ones first.
pub fn parse_stakeholders(
    response: &str,
    quotas: &QuotaConfig,
    ids: &mut IdGenerator,
) -> ParsedChildren {
    let mut candidates = Vec::new();

    for element in elements(response, Tag::Stakeholder) {
        let category = match element.attrs.get("type") {
            Some(t) => StakeholderCategory::from_tag(t),
            None => None,
        };
        let category = category.unwrap_or_else(|| {
            tracing::warn!(
                value = ?element.attrs.get("type"),
                "unknown stakeholder type, defaulting to Direct"
            );
            StakeholderCategory::Direct
        });
        if let Some(c) = candidate(&element, category, ids) {
            candidates.push(c);
        }
    }

    for category in StakeholderCategory::ALL {
        let tag = match category {
            StakeholderCategory::Direct => Tag::Direct,
            StakeholderCategory::Indirect => Tag::Indirect,
        };
        for element in elements(response, tag) {
            if let Some(c) = candidate(&element, category, ids) {
                candidates.push(c);
            }
        }
    }

    let mask = select(&candidates, quotas);
    ParsedChildren::from_mask(candidates, &mask)
}

fn candidate(
    element: &Element,
    category: StakeholderCategory,
    ids: &mut IdGenerator,
) -> Option<Candidate> {
    let text = clean_text(&element.body);
    if text.is_empty() {
        tracing::warn!("skipping stakeholder without a name");
        return None;
    }
    let relevance = element
        .attrs
        .get("relevance")
        .and_then(|r| Relevance::from_label(r))
        .unwrap_or_else(|| {
            tracing::warn!(
                stakeholder = %text,
                value = ?element.attrs.get("relevance"),
                "unknown stakeholder relevance, defaulting to 1"
            );
            Relevance::Relevant
        });
    Some(Candidate {
        id: ids.next(LayerType::Stakeholder),
        text,
        kind: NodeKind::Stakeholder {
            category,
            relevance,
        },
    })
}

fn select(candidates: &[Candidate], quotas: &QuotaConfig) -> Vec<bool> {
    let mut mask = vec![false; candidates.len()];
    let mut direct = 0usize;
    let mut indirect = 0usize;

    for (i, c) in candidates.iter().enumerate() {
        let is_direct = matches!(
            c.kind,
            NodeKind::Stakeholder {
                category: StakeholderCategory::Direct,
                ..
            }
        );
        if is_direct && direct < quotas.direct_stakeholders {
            mask[i] = true;
            direct += 1;
        }
    }

    for wanted in [Relevance::VeryRelevant, Relevance::Relevant] {
        for (i, c) in candidates.iter().enumerate() {
            if indirect >= quotas.indirect_stakeholders {
                break;
            }
            if c.kind
                == (NodeKind::Stakeholder {
                    category: StakeholderCategory::Indirect,
                    relevance: wanted,
                })
            {
                mask[i] = true;
                indirect += 1;
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(items: &[Candidate]) -> Vec<&str> {
        items.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn very_relevant_indirect_stakeholders_win_the_cap() {
        let response = r#"
<stakeholder type="indirect" relevance="relevant">Insurers</stakeholder>
<stakeholder type="indirect" relevance="very relevant">Families</stakeholder>
<stakeholder type="indirect" relevance="very relevant">Caregivers</stakeholder>
<stakeholder type="indirect" relevance="relevant">Regulators</stakeholder>
"#;
        let parsed = parse_stakeholders(response, &QuotaConfig::default(), &mut IdGenerator::new());
        assert_eq!(texts(&parsed.selected), vec!["Families", "Caregivers"]);
        assert_eq!(parsed.candidates.len(), 4);
    }

    #[test]
    fn relevant_indirect_stakeholders_backfill() {
        let response = r#"
<stakeholder type="indirect" relevance="relevant">Insurers</stakeholder>
<stakeholder type="indirect" relevance="very relevant">Families</stakeholder>
<stakeholder type="indirect" relevance="relevant">Regulators</stakeholder>
"#;
        let parsed = parse_stakeholders(response, &QuotaConfig::default(), &mut IdGenerator::new());
        assert_eq!(texts(&parsed.selected), vec!["Insurers", "Families"]);
    }

    #[test]
    fn direct_stakeholders_are_capped() {
        let response = (0..5)
            .map(|i| format!(r#"<stakeholder type="direct" relevance="relevant">D{i}</stakeholder>"#))
            .collect::<String>();
        let parsed = parse_stakeholders(&response, &QuotaConfig::default(), &mut IdGenerator::new());
        assert_eq!(texts(&parsed.selected), vec!["D0", "D1", "D2"]);
        assert_eq!(parsed.candidates.len(), 5);
    }

    #[test]
    fn malformed_attributes_fall_back_to_defaults() {
        let response = r#"<stakeholder type="neighbour" relevance="kind of">Landlords</stakeholder>"#;
        let parsed = parse_stakeholders(response, &QuotaConfig::default(), &mut IdGenerator::new());
        assert_eq!(
            parsed.candidates[0].kind,
            NodeKind::Stakeholder {
                category: StakeholderCategory::Direct,
                relevance: Relevance::Relevant,
            }
        );
        assert_eq!(parsed.selected.len(), 1);
    }
}
