use coa_tree::{Forest, ForestDiagnostics, build_forest, diagnose};
use tracing::{info, warn};

use crate::{AccountId, AccountRecord, AccountSource, SourceError, reparent_candidates};

/// A company's accounts, fetched once and built into a forest.
#[derive(Debug, Clone)]
pub struct ChartOfAccounts {
    company_id: String,
    forest: Forest<AccountRecord>,
    diagnostics: ForestDiagnostics<AccountId>,
}

impl ChartOfAccounts {
    pub fn from_records(company_id: impl Into<String>, records: Vec<AccountRecord>) -> Self {
        let company_id = company_id.into();
        let diagnostics = diagnose(&records);
        if !diagnostics.is_clean() {
            warn!(
                company_id = %company_id,
                dangling = ?diagnostics.dangling_parents,
                cycles = ?diagnostics.cycle_roots,
                duplicates = ?diagnostics.duplicate_ids,
                "chart of accounts has hierarchy anomalies"
            );
        }
        let forest = build_forest(records);
        Self {
            company_id,
            forest,
            diagnostics,
        }
    }

    pub async fn load<Source>(source: &Source, company_id: &str) -> Result<Self, SourceError>
    where
        Source: AccountSource + ?Sized,
    {
        let records = source.fetch_accounts(company_id).await?;
        let chart = Self::from_records(company_id, records);
        info!(
            company_id,
            accounts = chart.forest.len(),
            roots = chart.forest.roots().len(),
            "loaded chart of accounts"
        );
        Ok(chart)
    }

    pub fn company_id(&self) -> &str {
        &self.company_id
    }

    pub fn forest(&self) -> &Forest<AccountRecord> {
        &self.forest
    }

    pub fn diagnostics(&self) -> &ForestDiagnostics<AccountId> {
        &self.diagnostics
    }

    pub fn find(&self, account_id: &AccountId) -> Option<&AccountRecord> {
        self.forest.find(account_id).map(|node| &node.record)
    }

    pub fn reparent_candidates(&self, account_id: &AccountId) -> Vec<&AccountRecord> {
        reparent_candidates(&self.forest, account_id)
    }
}
