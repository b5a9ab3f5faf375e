use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tokio::fs::read_to_string;
use tracing::{debug, info};

use crate::AccountRecord;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no account data for company: {company_id}")]
    UnknownCompany { company_id: String },

    #[error("failed to read accounts file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse accounts file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Supplies the flat account list for a company.
///
/// Any change to a company's accounts means fetching again and rebuilding
/// the forest from scratch.
#[async_trait]
pub trait AccountSource: Send + Sync {
    async fn fetch_accounts(&self, company_id: &str) -> Result<Vec<AccountRecord>, SourceError>;
}

/// Either a bare array of accounts or an API envelope `{ "accounts": [..] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountsDocument {
    List(Vec<AccountRecord>),
    Envelope { accounts: Vec<AccountRecord> },
}

impl From<AccountsDocument> for Vec<AccountRecord> {
    fn from(document: AccountsDocument) -> Self {
        match document {
            AccountsDocument::List(accounts) => accounts,
            AccountsDocument::Envelope { accounts } => accounts,
        }
    }
}

/// Reads each company's accounts from a JSON file.
#[derive(Debug, Clone, Default)]
pub struct JsonFileSource {
    files: BTreeMap<String, PathBuf>,
}

impl JsonFileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(mut self, company_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.insert(company_id, path);
        self
    }

    pub fn insert(&mut self, company_id: impl Into<String>, path: impl Into<PathBuf>) {
        self.files.insert(company_id.into(), path.into());
    }

    pub fn path(&self, company_id: &str) -> Option<&Path> {
        self.files.get(company_id).map(PathBuf::as_path)
    }

    pub async fn read_file(path: &Path) -> Result<Vec<AccountRecord>, SourceError> {
        let string = read_to_string(path)
            .await
            .map_err(|source| SourceError::Read {
                path: path.to_owned(),
                source,
            })?;
        let document: AccountsDocument =
            serde_json::from_str(&string).map_err(|source| SourceError::Parse {
                path: path.to_owned(),
                source,
            })?;
        Ok(document.into())
    }
}

#[async_trait]
impl AccountSource for JsonFileSource {
    async fn fetch_accounts(&self, company_id: &str) -> Result<Vec<AccountRecord>, SourceError> {
        let path = self
            .path(company_id)
            .ok_or_else(|| SourceError::UnknownCompany {
                company_id: company_id.to_owned(),
            })?;
        debug!(company_id, path = %path.display(), "reading accounts");
        let accounts = Self::read_file(path).await?;
        info!(company_id, count = accounts.len(), "fetched accounts");
        Ok(accounts)
    }
}

/// Accounts held in memory, e.g. already fetched elsewhere.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    companies: HashMap<String, Vec<AccountRecord>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_company(
        mut self,
        company_id: impl Into<String>,
        accounts: Vec<AccountRecord>,
    ) -> Self {
        self.companies.insert(company_id.into(), accounts);
        self
    }
}

#[async_trait]
impl AccountSource for MemorySource {
    async fn fetch_accounts(&self, company_id: &str) -> Result<Vec<AccountRecord>, SourceError> {
        self.companies
            .get(company_id)
            .cloned()
            .ok_or_else(|| SourceError::UnknownCompany {
                company_id: company_id.to_owned(),
            })
    }
}
