// Pipeline processing: canonicalization, linkage, validation and analytics

pub mod alias_suggest;
pub mod analytics;
pub mod linkage;
pub mod normalize;
pub mod quality_gate;
pub mod search_index;
