pub mod alias_suggestion_use_case;
pub mod pipeline_use_case;
pub mod ports;
pub mod quality_gate_use_case;
