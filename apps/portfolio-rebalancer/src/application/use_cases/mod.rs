//! Use Cases
//!
//! Application operations orchestrating the domain and the driven ports.

mod get_portfolio;
mod list_transactions;
mod rebalance_portfolio;
mod register_portfolio;

pub use get_portfolio::GetPortfolioUseCase;
pub use list_transactions::ListTransactionsUseCase;
pub use rebalance_portfolio::{RebalanceError, RebalancePortfolioUseCase};
pub use register_portfolio::{PortfolioError, RegisterPortfolioUseCase};
