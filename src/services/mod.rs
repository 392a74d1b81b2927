pub mod advice_parser;
pub mod advice_prompts;
pub mod advice_service;
pub mod cached_fetch;
pub mod macro_data;
pub mod market_data_service;
pub mod portfolio_analyzer;
pub mod portfolio_metrics;
pub mod transaction_import;
