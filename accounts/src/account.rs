use std::fmt;
use std::str::FromStr;

use coa_tree::TreeRecord;
use coa_view::{Render, Searchable};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Opaque account identifier, as issued by the accounts API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for AccountId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    Asset,
    Liability,
    Equity,
    Revenue,
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Revenue,
        AccountType::Expense,
    ];

    pub fn label(self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Equity => "equity",
            AccountType::Revenue => "revenue",
            AccountType::Expense => "expense",
        }
    }

    /// Assets and expenses increase with debits; everything else with
    /// credits.
    pub fn normal_balance(self) -> NormalBalance {
        match self {
            AccountType::Asset | AccountType::Expense => NormalBalance::Debit,
            AccountType::Liability | AccountType::Equity | AccountType::Revenue => {
                NormalBalance::Credit
            }
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Display)]
pub enum AccountTypeError {
    /// unknown account type `{0}` (expected asset, liability, equity, revenue or expense)
    Unknown(String),
}

impl FromStr for AccountType {
    type Err = AccountTypeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim();
        AccountType::ALL
            .into_iter()
            .find(|typ| typ.label().eq_ignore_ascii_case(needle))
            .ok_or_else(|| AccountTypeError::Unknown(value.to_owned()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl fmt::Display for NormalBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NormalBalance::Debit => f.write_str("debit"),
            NormalBalance::Credit => f.write_str("credit"),
        }
    }
}

/// One row of a company's chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "AccountRecordJson", rename_all = "camelCase")]
pub struct AccountRecord {
    pub id: AccountId,
    pub parent_id: Option<AccountId>,
    pub number: String,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: AccountType,
    pub category: Option<String>,
    pub normal_balance: NormalBalance,
    pub is_postable: bool,
    pub is_active: bool,
}

impl AccountRecord {
    /// An active, postable account with the type's conventional balance.
    pub fn new(
        id: impl Into<AccountId>,
        parent_id: Option<AccountId>,
        number: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id: id.into(),
            parent_id,
            number: number.into(),
            name: name.into(),
            account_type,
            category: None,
            normal_balance: account_type.normal_balance(),
            is_postable: true,
            is_active: true,
        }
    }

    pub fn with_active(self, is_active: bool) -> Self {
        Self { is_active, ..self }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountRecordJson {
    id: AccountId,
    #[serde(default)]
    parent_id: Option<AccountId>,
    number: String,
    name: String,
    #[serde(rename = "type")]
    account_type: AccountType,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    normal_balance: Option<NormalBalance>,
    #[serde(default = "default_true")]
    is_postable: bool,
    #[serde(default = "default_true")]
    is_active: bool,
}

fn default_true() -> bool {
    true
}

impl From<AccountRecordJson> for AccountRecord {
    fn from(json: AccountRecordJson) -> Self {
        let AccountRecordJson {
            id,
            parent_id,
            number,
            name,
            account_type,
            category,
            normal_balance,
            is_postable,
            is_active,
        } = json;
        Self {
            id,
            parent_id,
            number,
            name,
            account_type,
            category,
            normal_balance: normal_balance.unwrap_or(account_type.normal_balance()),
            is_postable,
            is_active,
        }
    }
}

impl TreeRecord for AccountRecord {
    type Id = AccountId;

    fn id(&self) -> &AccountId {
        &self.id
    }

    fn parent_id(&self) -> Option<&AccountId> {
        self.parent_id.as_ref()
    }

    fn sort_key(&self) -> &str {
        &self.number
    }
}

impl Searchable for AccountRecord {
    type Kind = AccountType;

    fn search_fields(&self) -> Vec<&str> {
        vec![self.number.as_str(), self.name.as_str()]
    }

    fn kind(&self) -> &AccountType {
        &self.account_type
    }
}

impl Render for AccountRecord {
    fn render(&self) -> String {
        format!("{} {}", self.number, self.name)
    }
}
