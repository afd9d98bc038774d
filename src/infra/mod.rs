pub mod alias_table_adapter;
pub mod artifact_output_adapter;
pub mod fact_table_adapter;
pub mod raw_batch_adapter;
