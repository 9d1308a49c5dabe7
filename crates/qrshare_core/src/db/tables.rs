//! redb table definitions shared by storage modules.

use redb::TableDefinition;

/// Canonical share rows (`StoredShare`, bincode-encoded).
pub const SHARES: TableDefinition<&str, &[u8]> = TableDefinition::new("shares");

/// Expiry index ordered by expiry millis then id. Drives `purge_expired`.
pub const SHARES_BY_EXPIRY: TableDefinition<(u64, &str), ()> =
    TableDefinition::new("shares_by_expiry");
