//! Storage key derivation.

use focuspond_types::{AccountId, ResourceKind};

/// Base key of the pending operation log.
pub const PENDING_OPERATIONS_KEY: &str = "pendingOperations";

/// Key recording the account the last session was attached to.
pub const CURRENT_ACCOUNT_KEY: &str = "currentAccount";

/// Value stored under [`CURRENT_ACCOUNT_KEY`] for the shared namespace.
pub const ANONYMOUS_ACCOUNT: &str = "anonymous";

/// Suffix appended to a snapshot key to form its timestamp key.
pub const TIMESTAMP_SUFFIX: &str = "_timestamp";

/// Namespaces a base key by account.
///
/// `None` selects the shared namespace and returns the base key unchanged.
pub fn namespaced(base: &str, account: Option<AccountId>) -> String {
    match account {
        Some(id) => format!("{base}_user{id}"),
        None => base.to_string(),
    }
}

/// Key holding a resource snapshot for an account.
pub fn snapshot_key(kind: ResourceKind, account: Option<AccountId>) -> String {
    namespaced(kind.base_key(), account)
}

/// Key holding the last-updated timestamp of a snapshot key.
pub fn timestamp_key(key: &str) -> String {
    format!("{key}{TIMESTAMP_SUFFIX}")
}

/// Key holding the pending operation log for an account.
pub fn pending_key(account: Option<AccountId>) -> String {
    namespaced(PENDING_OPERATIONS_KEY, account)
}

/// Every snapshot and timestamp key owned by an account.
pub fn snapshot_keys_for(account: Option<AccountId>) -> Vec<String> {
    ResourceKind::ALL
        .iter()
        .flat_map(|kind| {
            let key = snapshot_key(*kind, account);
            let ts = timestamp_key(&key);
            [key, ts]
        })
        .collect()
}
