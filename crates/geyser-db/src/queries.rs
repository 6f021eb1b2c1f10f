//! Database query functions organized by domain.

pub mod balances;
pub mod pools;
pub mod schedules;
pub mod settlements;
pub mod vaults;
