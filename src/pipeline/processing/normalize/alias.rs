use std::collections::HashMap;

use super::canonicalizer::StringCanonicalizer;

/// Operator-curated overrides keyed on the raw, unnormalized input string.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    entries: HashMap<String, String>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: pairs
                .into_iter()
                .map(|(raw, canonical)| (raw.into(), canonical.into()))
                .collect(),
        }
    }

    /// Later inserts for the same raw string replace earlier ones.
    pub fn insert(&mut self, raw: impl Into<String>, canonical: impl Into<String>) {
        self.entries.insert(raw.into(), canonical.into());
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.entries.get(raw).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of resolving one raw value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub canonical: String,
    pub aliased: bool,
}

/// Resolves raw values to canonical names: alias override first, then the
/// canonicalizer, with `normalize` applied to alias targets as a final pass.
#[derive(Debug, Clone)]
pub struct AliasResolver {
    canonicalizer: StringCanonicalizer,
    aliases: AliasTable,
}

impl AliasResolver {
    pub fn new(canonicalizer: StringCanonicalizer, aliases: AliasTable) -> Self {
        Self {
            canonicalizer,
            aliases,
        }
    }

    pub fn resolve(&self, raw: &str) -> String {
        self.resolve_detailed(raw).canonical
    }

    pub fn resolve_detailed(&self, raw: &str) -> Resolution {
        match self.aliases.get(raw) {
            Some(target) => Resolution {
                canonical: self.canonicalizer.normalize(target),
                aliased: true,
            },
            None => Resolution {
                canonical: self.canonicalizer.normalize(raw),
                aliased: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn employer_resolver() -> AliasResolver {
        AliasResolver::new(
            StringCanonicalizer::employer(),
            AliasTable::from_pairs([
                ("Toronto Police Services Board", "Toronto Police Service"),
                ("U of T", "  university   toronto!! "),
            ]),
        )
    }

    #[test]
    fn test_alias_takes_precedence_over_normalization() {
        let resolver = employer_resolver();
        let resolved = resolver.resolve_detailed("Toronto Police Services Board");
        assert!(resolved.aliased);
        assert_eq!(resolved.canonical, "TORONTO POLICE SERVICE");
        assert_ne!(
            resolved.canonical,
            StringCanonicalizer::employer().normalize("Toronto Police Services Board")
        );
    }

    #[test]
    fn test_alias_target_is_renormalized() {
        assert_eq!(employer_resolver().resolve("U of T"), "UNIVERSITY TORONTO");
    }

    #[test]
    fn test_alias_is_keyed_on_raw_string() {
        let resolver = employer_resolver();
        // Same normal form, different raw text: no override.
        let resolved = resolver.resolve_detailed("TORONTO POLICE SERVICES BOARD");
        assert!(!resolved.aliased);
        assert_eq!(resolved.canonical, "TORONTO POLICE SERVICES BOARD");
    }

    #[test]
    fn test_unmapped_falls_back_to_normalize() {
        let resolver = AliasResolver::new(StringCanonicalizer::job_title(), AliasTable::new());
        assert_eq!(resolver.resolve("Teacher, Secondary"), "TEACHER SECONDARY");
    }
}
