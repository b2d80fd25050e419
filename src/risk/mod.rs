// Risk management module
pub mod budget;
pub mod sizing;

pub use budget::{PortfolioRiskBudget, Reservation};
pub use sizing::{PositionSizer, SizingDecision};
