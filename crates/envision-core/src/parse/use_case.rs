use super::ParsedChildren;
use super::markup::{Tag, clean_text, elements};
use crate::config::QuotaConfig;
use crate::model::{Candidate, IdGenerator, LayerType, NodeKind};
use crate::taxonomy::UseCaseCategory;

const TAGS: [(Tag, UseCaseCategory); 3] = [
    (Tag::Intended, UseCaseCategory::Intended),
    (Tag::HighStakes, UseCaseCategory::HighStakes),
    (Tag::Misuse, UseCaseCategory::Misuse),
];

/// Parses `<intended>`, `<highstakes>` and `<misuse>` sections. The pool is grouped by
/// category in that order; at most `use_case_per_category` items per category are selected.
pub fn parse_use_cases(
    response: &str,
    quotas: &QuotaConfig,
    ids: &mut IdGenerator,
) -> ParsedChildren {
    let mut candidates = Vec::new();
    let mut mask = Vec::new();

    for (tag, category) in TAGS {
        let mut taken = 0usize;
        for element in elements(response, tag) {
            let text = clean_text(&element.body);
            if text.is_empty() {
                tracing::warn!(tag = tag.name(), "skipping empty use case");
                continue;
            }
            candidates.push(Candidate {
                id: ids.next(LayerType::UseCase),
                text,
                kind: NodeKind::UseCase { category },
            });
            let keep = taken < quotas.use_case_per_category;
            if keep {
                taken += 1;
            }
            mask.push(keep);
        }
    }

    if candidates.is_empty() {
        tracing::warn!("use case response contained no recognizable sections");
    }
    ParsedChildren::from_mask(candidates, &mask)
}
