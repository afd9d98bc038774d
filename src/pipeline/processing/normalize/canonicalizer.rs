use once_cell::sync::Lazy;
use regex::Regex;

/// Legal-entity boilerplate removed from employer names as whole words.
static EMPLOYER_BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:INC|LTD|LIMITED|CORP|CORPORATION|THE|OF|AND)\b")
        .expect("employer boilerplate pattern is valid")
});

/// One named rule set for the shared normalization routine.
#[derive(Debug)]
pub struct NormalizationProfile {
    pub name: &'static str,
    /// Literal substitutions applied in order, after upper-casing.
    pub substitutions: &'static [(&'static str, &'static str)],
    /// Whole-word tokens removed before character filtering.
    pub boilerplate: Option<&'static Lazy<Regex>>,
    /// Characters kept in addition to A-Z, 0-9 and whitespace.
    pub keep: &'static [char],
}

pub static EMPLOYER_PROFILE: NormalizationProfile = NormalizationProfile {
    name: "employer",
    substitutions: &[],
    boilerplate: Some(&EMPLOYER_BOILERPLATE),
    keep: &[],
};

pub static JOB_TITLE_PROFILE: NormalizationProfile = NormalizationProfile {
    name: "job_title",
    substitutions: &[(" / ", "/"), (" - ", " "), (",", " ")],
    boilerplate: None,
    keep: &['/'],
};

/// Maps raw strings to their normal form under a profile.
///
/// `normalize` is total and idempotent: rule passes are repeated until the
/// output stops changing, so `normalize(normalize(x)) == normalize(x)` holds
/// even when one pass exposes a new match for an earlier rule.
#[derive(Debug, Clone, Copy)]
pub struct StringCanonicalizer {
    profile: &'static NormalizationProfile,
}

impl StringCanonicalizer {
    pub const fn new(profile: &'static NormalizationProfile) -> Self {
        Self { profile }
    }

    pub const fn employer() -> Self {
        Self::new(&EMPLOYER_PROFILE)
    }

    pub const fn job_title() -> Self {
        Self::new(&JOB_TITLE_PROFILE)
    }

    pub fn normalize(&self, raw: &str) -> String {
        let mut current = self.apply_rules(raw);
        loop {
            let next = self.apply_rules(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn apply_rules(&self, input: &str) -> String {
        let mut s = input.to_uppercase();

        for (from, to) in self.profile.substitutions {
            s = s.replace(from, to);
        }

        if let Some(boilerplate) = self.profile.boilerplate {
            s = boilerplate.replace_all(&s, " ").into_owned();
        }

        let filtered: String = s
            .chars()
            .filter(|c| {
                c.is_ascii_uppercase()
                    || c.is_ascii_digit()
                    || c.is_whitespace()
                    || self.profile.keep.contains(c)
            })
            .collect();

        filtered.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}
