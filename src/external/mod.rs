pub mod llm;
pub mod market_data;
pub mod yahoo;
