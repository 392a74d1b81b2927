mod analysis;
mod portfolio;
mod transaction;
pub mod advice;
pub mod macro_data;
pub mod risk;

pub use analysis::{
    AnalysisParams, CustomAnalysisRequest, ItemAnalysis, PortfolioAnalysis, RiskToleranceQuery,
    SectorBreakdown, SectorBreakdownResponse, SymbolAnalysis, SymbolAnalysisRequest, UNKNOWN_SECTOR,
};
pub use advice::{AdviceOutcome, AdviceShape, MacroNarrative, PortfolioAdvice, SymbolAdvice, TransactionAdvice};
pub use macro_data::{MacroIndicators, MacroOutlook, MacroOverrides};
pub use portfolio::{Portfolio, PortfolioItem};
pub use risk::{RiskLevel, RiskTolerance};
pub use transaction::{AnalyzedTransaction, Transaction, TransactionsResponse};
