use coa_tree::Forest;

use crate::{AccountId, AccountRecord};

/// Accounts that may become the new parent of `account_id`, in chart order.
///
/// Excludes the account itself, everything beneath it (choosing one of those
/// would close a cycle), and inactive accounts. Nothing checks this again
/// when the change is submitted; a bad parent that slips through is placed
/// as a root on the next rebuild.
pub fn reparent_candidates<'a>(
    forest: &'a Forest<AccountRecord>,
    account_id: &AccountId,
) -> Vec<&'a AccountRecord> {
    let excluded = forest.descendant_ids(account_id);
    forest
        .iter()
        .map(|(_, node)| &node.record)
        .filter(|record| record.is_active && !excluded.contains(&record.id))
        .collect()
}
