use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::info;

use crate::config::SuggestionConfig;
use crate::pipeline::processing::normalize::StringCanonicalizer;

/// A candidate employer alias for manual review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AliasSuggestion {
    pub raw: String,
    pub canonical: String,
    pub reason: String,
}

pub const EXACT_MATCH_REASON: &str = "exact_normalized_match";

/// Suggests employer aliases from the distinct raw employer strings of a run.
pub struct AliasSuggester {
    canonicalizer: StringCanonicalizer,
    config: SuggestionConfig,
}

impl AliasSuggester {
    pub fn new(config: SuggestionConfig) -> Self {
        Self {
            canonicalizer: StringCanonicalizer::employer(),
            config,
        }
    }

    /// Normalized words long enough to carry meaning.
    pub fn keywords(&self, raw: &str) -> BTreeSet<String> {
        self.canonicalizer
            .normalize(raw)
            .split_whitespace()
            .filter(|w| w.chars().count() >= self.config.min_keyword_len)
            .map(str::to_string)
            .collect()
    }

    /// Raw strings sharing one normalization; the longest (first on ties)
    /// becomes the canonical for the others.
    pub fn exact_matches(&self, employers: &[&str]) -> Vec<AliasSuggestion> {
        let mut group_order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<&str>> = HashMap::new();
        for employer in employers {
            let normalized = self.canonicalizer.normalize(employer);
            if normalized.is_empty() {
                continue;
            }
            let group = groups.entry(normalized.clone()).or_insert_with(|| {
                group_order.push(normalized);
                Vec::new()
            });
            group.push(*employer);
        }

        let mut suggestions = Vec::new();
        for key in &group_order {
            let variations = &groups[key];
            if variations.len() < 2 {
                continue;
            }
            let canonical = longest_first(variations);
            for variation in variations {
                if *variation != canonical {
                    suggestions.push(AliasSuggestion {
                        raw: variation.to_string(),
                        canonical: canonical.to_uppercase(),
                        reason: EXACT_MATCH_REASON.to_string(),
                    });
                }
            }
        }
        suggestions
    }

    /// Pairs of long names whose keyword sets have a Jaccard similarity at or
    /// above the configured overlap.
    pub fn keyword_matches(&self, employers: &[&str]) -> Vec<AliasSuggestion> {
        let candidates: Vec<(&str, BTreeSet<String>)> = employers
            .iter()
            .filter(|e| e.chars().count() > self.config.min_name_len)
            .map(|e| (*e, self.keywords(e)))
            .filter(|(_, keywords)| keywords.len() >= 2)
            .collect();

        let mut suggestions = Vec::new();
        for (i, (first, first_keywords)) in candidates.iter().enumerate() {
            for (second, second_keywords) in &candidates[i + 1..] {
                let intersection = first_keywords.intersection(second_keywords).count();
                let union = first_keywords.union(second_keywords).count();
                let similarity = intersection as f64 / union as f64;
                if similarity < self.config.min_keyword_overlap {
                    continue;
                }

                let (canonical, raw) = if first.chars().count() >= second.chars().count() {
                    (first, second)
                } else {
                    (second, first)
                };
                suggestions.push(AliasSuggestion {
                    raw: raw.to_string(),
                    canonical: canonical.to_uppercase(),
                    reason: format!("keyword_similarity_{:.2}", similarity),
                });
            }
        }
        suggestions
    }

    /// Exact and keyword suggestions, deduplicated on (raw, canonical) and
    /// stably ordered by canonical.
    pub fn suggest<'a, I>(&self, raw_employers: I) -> Vec<AliasSuggestion>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut seen = HashSet::new();
        let distinct: Vec<&str> = raw_employers
            .into_iter()
            .filter(|e| !e.is_empty() && seen.insert(*e))
            .collect();

        let mut keys = HashSet::new();
        let mut suggestions: Vec<AliasSuggestion> = self
            .exact_matches(&distinct)
            .into_iter()
            .chain(self.keyword_matches(&distinct))
            .filter(|s| keys.insert((s.raw.clone(), s.canonical.clone())))
            .collect();
        suggestions.sort_by(|a, b| a.canonical.cmp(&b.canonical));

        info!(
            "Suggested {} employer aliases from {} distinct raw names",
            suggestions.len(),
            distinct.len()
        );
        suggestions
    }
}

fn longest_first<'a>(variations: &[&'a str]) -> &'a str {
    let mut best = variations[0];
    for variation in &variations[1..] {
        if variation.chars().count() > best.chars().count() {
            best = *variation;
        }
    }
    best
}
