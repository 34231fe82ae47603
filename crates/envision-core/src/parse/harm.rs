use super::ParsedChildren;
use super::markup::{Tag, child_text, elements};
use crate::config::QuotaConfig;
use crate::model::{Candidate, HarmDetail, IdGenerator, LayerType, NodeKind};
use crate::taxonomy::{Severity, SubHarmCategory};
use rustc_hash::FxHashSet;

/// Parses `<harm><type/><severity/><explain/></harm>` records for one stakeholder.
///
/// Unknown types resolve to the sub-harm sharing the most words; a missing or unknown
/// severity becomes [`Severity::Severe`]; records without an explanation are skipped.
/// Only validated harms are ever selected: up to `very_severe_harms` very severe ones,
/// else the first severe one, else the first not-severe one.
pub fn parse_harms(
    response: &str,
    stakeholder: &str,
    quotas: &QuotaConfig,
    ids: &mut IdGenerator,
) -> ParsedChildren {
    let mut candidates = Vec::new();

    for element in elements(response, Tag::Harm) {
        let Some(explain) = child_text(&element.body, Tag::Explain).filter(|e| !e.is_empty())
        else {
            tracing::warn!(record = %element.body, "skipping harm without an explanation");
            continue;
        };

        let type_label = child_text(&element.body, Tag::Type).unwrap_or_default();
        let category = SubHarmCategory::from_label(&type_label).unwrap_or_else(|| {
            let nearest = SubHarmCategory::nearest(&type_label);
            tracing::warn!(
                value = %type_label,
                replacement = %nearest,
                "unknown harm type, using the closest sub-harm"
            );
            nearest
        });

        let severity_label = child_text(&element.body, Tag::Severity);
        let severity = severity_label
            .as_deref()
            .and_then(Severity::from_label)
            .unwrap_or_else(|| {
                tracing::warn!(value = ?severity_label, "unknown harm severity, defaulting to 2");
                Severity::Severe
            });

        let validated = validate_harm(&explain, stakeholder);
        if !validated {
            tracing::warn!(%explain, %stakeholder, "harm failed stakeholder validation");
        }

        candidates.push(Candidate {
            id: ids.next(LayerType::Harm),
            text: explain,
            kind: NodeKind::Harm(HarmDetail {
                category,
                severity,
                user_rated_severity: 0,
                validated,
            }),
        });
    }

    let mask = select(&candidates, quotas);
    ParsedChildren::from_mask(candidates, &mask)
}

fn detail(c: &Candidate) -> Option<&HarmDetail> {
    match &c.kind {
        NodeKind::Harm(h) => Some(h),
        _ => None,
    }
}

fn select(candidates: &[Candidate], quotas: &QuotaConfig) -> Vec<bool> {
    let mut mask = vec![false; candidates.len()];
    let mut taken = 0usize;
    for (i, c) in candidates.iter().enumerate() {
        let Some(h) = detail(c) else { continue };
        if h.validated && h.severity == Severity::VerySevere && taken < quotas.very_severe_harms {
            mask[i] = true;
            taken += 1;
        }
    }
    if taken > 0 {
        return mask;
    }

    for fallback in [Severity::Severe, Severity::NotSevere] {
        let first = candidates
            .iter()
            .position(|c| detail(c).is_some_and(|h| h.validated && h.severity == fallback));
        if let Some(i) = first {
            mask[i] = true;
            break;
        }
    }
    mask
}

/// Stakeholder-overlap heuristic.
///
/// The explanation must contain "may", and one of its words before the first standalone
/// "may" must match a stakeholder word or a simple plural of one ("ies", "s", "es").
/// Words are split on single spaces, so punctuation stays attached. When "may" only
/// occurs inside a longer word, every word but the last is checked.
pub fn validate_harm(explain: &str, stakeholder: &str) -> bool {
    if !explain.contains("may") {
        return false;
    }

    let lowered = explain.to_lowercase();
    let words: Vec<&str> = lowered.split(' ').collect();
    let end = match words.iter().position(|w| *w == "may") {
        Some(i) => i,
        None => words.len().saturating_sub(1),
    };

    let mut variants = FxHashSet::default();
    for phrase in stakeholder.to_lowercase().split(' ') {
        let mut stem: Vec<char> = phrase.chars().collect();
        stem.pop();
        let stem: String = stem.into_iter().collect();
        variants.insert(phrase.to_string());
        variants.insert(format!("{stem}ies"));
        variants.insert(format!("{phrase}s"));
        variants.insert(format!("{phrase}es"));
    }

    words[..end].iter().any(|w| variants.contains(*w))
}
