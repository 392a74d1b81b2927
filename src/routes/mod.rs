pub mod health;
pub mod market;
pub mod portfolios;
pub mod transactions;
