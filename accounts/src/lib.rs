//! Chart-of-accounts records and where they come from.
//!
//! Records are fetched whole from an [`AccountSource`], then handed to
//! `coa_tree::build_forest`. Debit/credit rules, balances and persistence
//! are not handled here.

mod account;
mod chart;
mod reparent;
mod source;

pub use crate::account::{AccountId, AccountRecord, AccountType, AccountTypeError, NormalBalance};
pub use crate::chart::ChartOfAccounts;
pub use crate::reparent::reparent_candidates;
pub use crate::source::{AccountSource, JsonFileSource, MemorySource, SourceError};
