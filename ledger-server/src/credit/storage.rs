//! redb-based storage layer for sales and receivables
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `sales` | `order_id` | `Sale` | Order records pushed by the POS |
//! | `store_credit_sales` | `(store_id, order_id)` | `()` | Credit sale index (scan order) |
//! | `receivables` | `ledger_id` | `AccountReceivable` | Ledger entities |
//! | `receivable_by_order` | `order_id` | `ledger_id` | Unique index, one receivable per sale |
//! | `store_receivables` | `(store_id, ledger_id)` | `()` | Per-store receivable index |
//!
//! # Concurrency
//!
//! redb serializes write transactions, so each commit (receivable, sale and
//! indexes together) is atomic. Receivables additionally carry a `version`
//! stamp: [`LedgerStorage::save_ledger`] only writes when the stored version
//! matches the version the caller read.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use shared::models::{AccountReceivable, ReceivableStatus, Sale};
use std::ops::Bound;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Table for sales: key = order_id, value = JSON-serialized Sale
const SALES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("sales");

/// Table for the credit sale index: key = (store_id, order_id), value = empty
const STORE_CREDIT_SALES_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("store_credit_sales");

/// Table for receivables: key = ledger_id, value = JSON-serialized AccountReceivable
const RECEIVABLES_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("receivables");

/// Table for the unique order index: key = order_id, value = ledger_id
const RECEIVABLE_BY_ORDER_TABLE: TableDefinition<&str, &str> =
    TableDefinition::new("receivable_by_order");

/// Table for the per-store receivable index: key = (store_id, ledger_id), value = empty
const STORE_RECEIVABLES_TABLE: TableDefinition<(&str, &str), ()> =
    TableDefinition::new("store_receivables");

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Receivable not found: {0}")]
    ReceivableNotFound(String),

    #[error("Receivable already exists for order {order_id}: {ledger_id}")]
    DuplicateOrder { order_id: String, ledger_id: String },

    #[error("Version mismatch on receivable {id}: expected {expected}, found {found}")]
    VersionMismatch { id: String, expected: u64, found: u64 },
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Sale and receivable storage backed by redb
#[derive(Clone)]
pub struct LedgerStorage {
    db: Arc<Database>,
}

impl LedgerStorage {
    /// Open or create the database at the given path
    ///
    /// redb uses `Durability::Immediate` by default: commits are persistent
    /// as soon as `commit()` returns.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        // Create all tables if they don't exist
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(SALES_TABLE)?;
            let _ = write_txn.open_table(STORE_CREDIT_SALES_TABLE)?;
            let _ = write_txn.open_table(RECEIVABLES_TABLE)?;
            let _ = write_txn.open_table(RECEIVABLE_BY_ORDER_TABLE)?;
            let _ = write_txn.open_table(STORE_RECEIVABLES_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    /// Begin a read transaction (consistent snapshot across several reads)
    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Sale Operations ==========

    /// Store a sale and keep the credit index in step with its transaction type
    pub fn put_sale(&self, txn: &WriteTransaction, sale: &Sale) -> StorageResult<()> {
        let mut table = txn.open_table(SALES_TABLE)?;
        let previous: Option<Sale> = match table.get(sale.id.as_str())? {
            Some(guard) => Some(serde_json::from_slice(guard.value())?),
            None => None,
        };
        let value = serde_json::to_vec(sale)?;
        table.insert(sale.id.as_str(), value.as_slice())?;

        let mut index = txn.open_table(STORE_CREDIT_SALES_TABLE)?;
        if let Some(prev) = previous
            && (prev.store_id != sale.store_id || !sale.is_credit())
        {
            index.remove((prev.store_id.as_str(), prev.id.as_str()))?;
        }
        if sale.is_credit() {
            index.insert((sale.store_id.as_str(), sale.id.as_str()), ())?;
        }
        Ok(())
    }

    /// Get a sale by order id
    pub fn get_sale(&self, order_id: &str) -> StorageResult<Option<Sale>> {
        let read_txn = self.db.begin_read()?;
        self.get_sale_read(&read_txn, order_id)
    }

    /// Get a sale within a read transaction
    pub fn get_sale_read(&self, txn: &ReadTransaction, order_id: &str) -> StorageResult<Option<Sale>> {
        let table = txn.open_table(SALES_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a sale within a write transaction
    pub fn get_sale_txn(&self, txn: &WriteTransaction, order_id: &str) -> StorageResult<Option<Sale>> {
        let table = txn.open_table(SALES_TABLE)?;
        match table.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Page through a store's credit sale ids in key order
    ///
    /// Returns up to `limit` ids strictly after `after`, plus whether more remain.
    pub fn credit_sale_ids_page(
        &self,
        store_id: &str,
        after: Option<&str>,
        limit: usize,
    ) -> StorageResult<(Vec<String>, bool)> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STORE_CREDIT_SALES_TABLE)?;

        let start = match after {
            Some(cursor) => Bound::Excluded((store_id, cursor)),
            None => Bound::Included((store_id, "")),
        };

        let mut ids = Vec::new();
        let mut has_more = false;
        for result in table.range((start, Bound::Unbounded))? {
            let (key, _value) = result?;
            let (key_store, order_id) = key.value();
            if key_store != store_id {
                break;
            }
            if ids.len() == limit {
                has_more = true;
                break;
            }
            ids.push(order_id.to_string());
        }
        Ok((ids, has_more))
    }

    /// All credit sale ids of a store
    pub fn credit_sale_ids(&self, store_id: &str) -> StorageResult<Vec<String>> {
        let (ids, _) = self.credit_sale_ids_page(store_id, None, usize::MAX)?;
        Ok(ids)
    }

    // ========== Receivable Operations ==========

    /// Get a receivable by id
    pub fn get_ledger(&self, ledger_id: &str) -> StorageResult<Option<AccountReceivable>> {
        let read_txn = self.db.begin_read()?;
        self.get_ledger_read(&read_txn, ledger_id)
    }

    /// Get a receivable within a read transaction
    pub fn get_ledger_read(
        &self,
        txn: &ReadTransaction,
        ledger_id: &str,
    ) -> StorageResult<Option<AccountReceivable>> {
        let table = txn.open_table(RECEIVABLES_TABLE)?;
        match table.get(ledger_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Get a receivable within a write transaction
    pub fn get_ledger_txn(
        &self,
        txn: &WriteTransaction,
        ledger_id: &str,
    ) -> StorageResult<Option<AccountReceivable>> {
        let table = txn.open_table(RECEIVABLES_TABLE)?;
        match table.get(ledger_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    /// Look up the receivable id for an order
    pub fn find_ledger_id(&self, order_id: &str) -> StorageResult<Option<String>> {
        let read_txn = self.db.begin_read()?;
        self.find_ledger_id_read(&read_txn, order_id)
    }

    /// Look up the receivable id for an order within a read transaction
    pub fn find_ledger_id_read(
        &self,
        txn: &ReadTransaction,
        order_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(RECEIVABLE_BY_ORDER_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    /// Look up the receivable id for an order within a write transaction
    pub fn find_ledger_id_txn(
        &self,
        txn: &WriteTransaction,
        order_id: &str,
    ) -> StorageResult<Option<String>> {
        let table = txn.open_table(RECEIVABLE_BY_ORDER_TABLE)?;
        Ok(table.get(order_id)?.map(|guard| guard.value().to_string()))
    }

    /// Insert a new receivable and its indexes
    ///
    /// Fails with `DuplicateOrder` if the order already has a receivable.
    pub fn insert_ledger(
        &self,
        txn: &WriteTransaction,
        ledger: &AccountReceivable,
    ) -> StorageResult<()> {
        let mut by_order = txn.open_table(RECEIVABLE_BY_ORDER_TABLE)?;
        if let Some(existing) = by_order.get(ledger.order_id.as_str())? {
            return Err(StorageError::DuplicateOrder {
                order_id: ledger.order_id.clone(),
                ledger_id: existing.value().to_string(),
            });
        }
        by_order.insert(ledger.order_id.as_str(), ledger.id.as_str())?;

        let mut table = txn.open_table(RECEIVABLES_TABLE)?;
        let value = serde_json::to_vec(ledger)?;
        table.insert(ledger.id.as_str(), value.as_slice())?;

        let mut by_store = txn.open_table(STORE_RECEIVABLES_TABLE)?;
        by_store.insert((ledger.store_id.as_str(), ledger.id.as_str()), ())?;
        Ok(())
    }

    /// Compare-and-swap write of an existing receivable
    ///
    /// Writes only if the stored version equals `expected_version`, then
    /// stamps `ledger.version = expected_version + 1`.
    pub fn save_ledger(
        &self,
        txn: &WriteTransaction,
        ledger: &mut AccountReceivable,
        expected_version: u64,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(RECEIVABLES_TABLE)?;
        let stored: AccountReceivable = match table.get(ledger.id.as_str())? {
            Some(guard) => serde_json::from_slice(guard.value())?,
            None => return Err(StorageError::ReceivableNotFound(ledger.id.clone())),
        };
        if stored.version != expected_version {
            return Err(StorageError::VersionMismatch {
                id: ledger.id.clone(),
                expected: expected_version,
                found: stored.version,
            });
        }

        ledger.version = expected_version + 1;
        let value = serde_json::to_vec(&*ledger)?;
        table.insert(ledger.id.as_str(), value.as_slice())?;
        Ok(())
    }

    /// All receivables of a store
    pub fn list_ledgers(&self, store_id: &str) -> StorageResult<Vec<AccountReceivable>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(STORE_RECEIVABLES_TABLE)?;
        let table = read_txn.open_table(RECEIVABLES_TABLE)?;

        let mut ledgers = Vec::new();
        let start = Bound::Included((store_id, ""));
        for result in index.range((start, Bound::Unbounded))? {
            let (key, _value) = result?;
            let (key_store, ledger_id) = key.value();
            if key_store != store_id {
                break;
            }
            if let Some(guard) = table.get(ledger_id)? {
                ledgers.push(serde_json::from_slice(guard.value())?);
            }
        }
        Ok(ledgers)
    }

    /// Pending receivables whose due date is before `now` (full scan)
    pub fn pending_past_due_txn(
        &self,
        txn: &WriteTransaction,
        now: i64,
    ) -> StorageResult<Vec<AccountReceivable>> {
        let table = txn.open_table(RECEIVABLES_TABLE)?;
        let mut ledgers = Vec::new();
        for result in table.iter()? {
            let (_key, value) = result?;
            let ledger: AccountReceivable = serde_json::from_slice(value.value())?;
            if ledger.status == ReceivableStatus::Pending && ledger.due_date < now {
                ledgers.push(ledger);
            }
        }
        Ok(ledgers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{ReceivableStatus, SaleStatus, TransactionType};

    fn sale(id: &str, store_id: &str, transaction_type: TransactionType) -> Sale {
        Sale {
            id: id.to_string(),
            store_id: store_id.to_string(),
            customer_id: "c-1".to_string(),
            customer_name: "Ana".to_string(),
            customer_phone: None,
            total: 100.0,
            paid_amount: 0.0,
            status: SaleStatus::Unpaid,
            transaction_type,
            date: 1_700_000_000_000,
            payments: vec![],
            credit_terms: None,
            ledger_id: None,
        }
    }

    fn receivable(id: &str, order_id: &str, store_id: &str) -> AccountReceivable {
        AccountReceivable {
            id: id.to_string(),
            order_id: order_id.to_string(),
            store_id: store_id.to_string(),
            customer_id: "c-1".to_string(),
            customer_name: "Ana".to_string(),
            customer_phone: None,
            original_amount: 100.0,
            paid_amount: 0.0,
            remaining_balance: 100.0,
            sale_date: 0,
            due_date: 0,
            last_payment_date: None,
            status: ReceivableStatus::Pending,
            payments: vec![],
            credit_days: 30,
            created_by: "u".to_string(),
            updated_by: None,
            created_at: 0,
            updated_at: 0,
            version: 1,
        }
    }

    fn put(storage: &LedgerStorage, sale: &Sale) {
        let txn = storage.begin_write().unwrap();
        storage.put_sale(&txn, sale).unwrap();
        txn.commit().unwrap();
    }

    #[test]
    fn test_sale_roundtrip() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let s = sale("S-1", "store-1", TransactionType::Credit);
        put(&storage, &s);

        assert_eq!(storage.get_sale("S-1").unwrap(), Some(s));
        assert!(storage.get_sale("S-404").unwrap().is_none());
    }

    #[test]
    fn test_credit_index_follows_transaction_type() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        put(&storage, &sale("S-1", "store-1", TransactionType::Credit));
        put(&storage, &sale("S-2", "store-1", TransactionType::Cash));
        put(&storage, &sale("S-3", "store-2", TransactionType::Credit));

        assert_eq!(storage.credit_sale_ids("store-1").unwrap(), vec!["S-1"]);

        // 改为现金后移出赊账索引
        put(&storage, &sale("S-1", "store-1", TransactionType::Cash));
        assert!(storage.credit_sale_ids("store-1").unwrap().is_empty());
        assert_eq!(storage.credit_sale_ids("store-2").unwrap(), vec!["S-3"]);
    }

    #[test]
    fn test_credit_sale_pagination() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        for i in 0..5 {
            put(&storage, &sale(&format!("S-{i}"), "store-1", TransactionType::Credit));
        }
        put(&storage, &sale("S-9", "store-10", TransactionType::Credit));

        let (first, more) = storage.credit_sale_ids_page("store-1", None, 2).unwrap();
        assert_eq!(first, vec!["S-0", "S-1"]);
        assert!(more);

        let (second, more) = storage
            .credit_sale_ids_page("store-1", Some("S-1"), 2)
            .unwrap();
        assert_eq!(second, vec!["S-2", "S-3"]);
        assert!(more);

        let (last, more) = storage
            .credit_sale_ids_page("store-1", Some("S-3"), 2)
            .unwrap();
        assert_eq!(last, vec!["S-4"]);
        assert!(!more);
    }

    #[test]
    fn test_insert_ledger_enforces_unique_order() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_ledger(&txn, &receivable("ar-1", "S-1", "store-1"))
            .unwrap();
        let err = storage
            .insert_ledger(&txn, &receivable("ar-2", "S-1", "store-1"))
            .unwrap_err();
        assert!(matches!(err, StorageError::DuplicateOrder { .. }));
        txn.commit().unwrap();

        assert_eq!(storage.find_ledger_id("S-1").unwrap().as_deref(), Some("ar-1"));
        assert!(storage.get_ledger("ar-2").unwrap().is_none());
        assert_eq!(storage.list_ledgers("store-1").unwrap().len(), 1);
        assert!(storage.list_ledgers("store-2").unwrap().is_empty());
    }

    #[test]
    fn test_save_ledger_compare_and_swap() {
        let storage = LedgerStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        storage
            .insert_ledger(&txn, &receivable("ar-1", "S-1", "store-1"))
            .unwrap();
        txn.commit().unwrap();

        let mut first = storage.get_ledger("ar-1").unwrap().unwrap();
        let mut stale = first.clone();

        let txn = storage.begin_write().unwrap();
        storage.save_ledger(&txn, &mut first, 1).unwrap();
        txn.commit().unwrap();
        assert_eq!(first.version, 2);

        // 基于旧版本的写入被拒绝
        let txn = storage.begin_write().unwrap();
        let err = storage.save_ledger(&txn, &mut stale, 1).unwrap_err();
        assert!(matches!(
            err,
            StorageError::VersionMismatch {
                expected: 1,
                found: 2,
                ..
            }
        ));
        drop(txn);

        assert_eq!(storage.get_ledger("ar-1").unwrap().unwrap().version, 2);
    }

    #[test]
    fn test_file_backed_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.redb");
        {
            let storage = LedgerStorage::open(&path).unwrap();
            put(&storage, &sale("S-1", "store-1", TransactionType::Credit));
        }
        let storage = LedgerStorage::open(&path).unwrap();
        assert!(storage.get_sale("S-1").unwrap().is_some());
        assert_eq!(storage.credit_sale_ids("store-1").unwrap(), vec!["S-1"]);
    }
}
