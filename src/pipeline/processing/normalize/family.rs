use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse occupational category inferred from canonical job text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JobFamily {
    Academic,
    Education,
    Medical,
    Police,
    Fire,
    Engineering,
    Management,
    Other,
}

/// Keyword rules in precedence order; the first rule with a matching keyword wins.
const FAMILY_RULES: &[(&[&str], JobFamily)] = &[
    (&["professor"], JobFamily::Academic),
    (&["teacher", "principal"], JobFamily::Education),
    (&["nurse"], JobFamily::Medical),
    (&["physician", "doctor"], JobFamily::Medical),
    (&["police", "constable", "detective"], JobFamily::Police),
    (&["firefighter"], JobFamily::Fire),
    (&["engineer"], JobFamily::Engineering),
    (&["director"], JobFamily::Management),
    (&["manager"], JobFamily::Management),
];

impl JobFamily {
    /// Classify canonical job text. Keywords match as case-insensitive substrings.
    pub fn infer(canonical_title: &str) -> Self {
        let title = canonical_title.to_lowercase();
        FAMILY_RULES
            .iter()
            .find(|(keywords, _)| keywords.iter().any(|k| title.contains(k)))
            .map(|(_, family)| *family)
            .unwrap_or(JobFamily::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobFamily::Academic => "Academic",
            JobFamily::Education => "Education",
            JobFamily::Medical => "Medical",
            JobFamily::Police => "Police",
            JobFamily::Fire => "Fire",
            JobFamily::Engineering => "Engineering",
            JobFamily::Management => "Management",
            JobFamily::Other => "Other",
        }
    }
}

impl fmt::Display for JobFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
