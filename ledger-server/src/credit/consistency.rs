//! Consistency Validator / Repairer - 对账与修复
//!
//! 按游标分页扫描门店的赊账销售单，比对销售单与台账：
//!
//! | 检查项 | 销售单 | 台账 | 自动修复 |
//! |--------|--------|------|----------|
//! | `missing_account` | 赊账但无台账 | - | 补建台账 |
//! | `amount_mismatch` | `total` | `original_amount` | 不修复，留给人工 |
//! | `payment_mismatch` | `paid_amount` | `paid_amount` | 以台账为准覆盖销售单 |
//! | `status_mismatch` | `status` | `status` 投影 | 以台账为准覆盖销售单 |
//!
//! 校验是纯读操作；修复逐条执行，单条失败记录为 `repair_failed` 后继续。
//! 修复动作可重复执行，已修复的门店再跑一遍不会产生新的写入。

use serde_json::json;
use shared::models::{
    AccountReceivable, Inconsistency, InconsistencyKind, RepairAction, RepairOutcome,
    RepairReport, Sale, SaleStatus, ValidationPage,
};

use super::error::LedgerResult;
use super::money::money_eq;
use super::sync::SyncOrchestrator;

/// Default page size for validation scans
pub const DEFAULT_BATCH_SIZE: usize = 200;

/// Upper bound for a single validation page
pub const MAX_BATCH_SIZE: usize = 1000;

/// Clamp a requested page size into `1..=MAX_BATCH_SIZE`
pub fn clamp_batch_size(size: usize) -> usize {
    size.clamp(1, MAX_BATCH_SIZE)
}

/// Compare one credit sale against its receivable
pub fn inspect(sale: &Sale, ledger: Option<&AccountReceivable>) -> Vec<Inconsistency> {
    let Some(ledger) = ledger else {
        return vec![Inconsistency {
            kind: InconsistencyKind::MissingAccount,
            order_id: sale.id.clone(),
            ledger_id: None,
            order_value: Some(json!(sale.total)),
            ledger_value: None,
            message: format!("Credit sale {} has no receivable", sale.id),
        }];
    };

    let mut issues = Vec::new();
    let mut push = |kind, order_value, ledger_value, message: String| {
        issues.push(Inconsistency {
            kind,
            order_id: sale.id.clone(),
            ledger_id: Some(ledger.id.clone()),
            order_value: Some(order_value),
            ledger_value: Some(ledger_value),
            message,
        });
    };

    if !money_eq(sale.total, ledger.original_amount) {
        push(
            InconsistencyKind::AmountMismatch,
            json!(sale.total),
            json!(ledger.original_amount),
            format!(
                "Sale total {} differs from receivable original amount {}",
                sale.total, ledger.original_amount
            ),
        );
    }
    if !money_eq(sale.paid_amount, ledger.paid_amount) {
        push(
            InconsistencyKind::PaymentMismatch,
            json!(sale.paid_amount),
            json!(ledger.paid_amount),
            format!(
                "Sale paid amount {} differs from receivable paid amount {}",
                sale.paid_amount, ledger.paid_amount
            ),
        );
    }
    let expected = SaleStatus::from_receivable(ledger.status);
    if sale.status != expected {
        push(
            InconsistencyKind::StatusMismatch,
            json!(sale.status.as_str()),
            json!(ledger.status.as_str()),
            format!(
                "Sale status {} does not match receivable status {}",
                sale.status.as_str(),
                ledger.status
            ),
        );
    }
    issues
}

/// Consistency Validator / Repairer
#[derive(Clone)]
pub struct ConsistencyChecker {
    sync: SyncOrchestrator,
    batch_size: usize,
}

impl ConsistencyChecker {
    pub fn new(sync: SyncOrchestrator, batch_size: usize) -> Self {
        Self {
            sync,
            batch_size: clamp_batch_size(batch_size),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Validate one page of a store's credit sales
    ///
    /// Pass the returned `next_cursor` back to continue the scan.
    pub fn validate_page(
        &self,
        store_id: &str,
        cursor: Option<&str>,
        limit: Option<usize>,
    ) -> LedgerResult<ValidationPage> {
        let limit = limit.map(clamp_batch_size).unwrap_or(self.batch_size);
        let storage = self.sync.storage();
        let (order_ids, has_more) = storage.credit_sale_ids_page(store_id, cursor, limit)?;

        let read_txn = storage.begin_read()?;
        let mut inconsistencies = Vec::new();
        let mut scanned = 0;
        for order_id in &order_ids {
            let Some(sale) = storage.get_sale_read(&read_txn, order_id)? else {
                continue;
            };
            let ledger = match storage.find_ledger_id_read(&read_txn, order_id)? {
                Some(ledger_id) => storage.get_ledger_read(&read_txn, &ledger_id)?,
                None => None,
            };
            scanned += 1;

            for issue in inspect(&sale, ledger.as_ref()) {
                tracing::warn!(
                    store_id,
                    order_id = %issue.order_id,
                    ledger_id = ?issue.ledger_id,
                    kind = ?issue.kind,
                    "Receivable drift detected"
                );
                inconsistencies.push(issue);
            }
        }

        let next_cursor = if has_more {
            order_ids.last().cloned()
        } else {
            None
        };
        Ok(ValidationPage {
            inconsistencies,
            next_cursor,
            scanned,
        })
    }

    /// Validate every credit sale of a store, page by page
    pub fn validate(&self, store_id: &str) -> LedgerResult<Vec<Inconsistency>> {
        let mut all = Vec::new();
        let mut cursor: Option<String> = None;
        let mut scanned = 0;
        loop {
            let page = self.validate_page(store_id, cursor.as_deref(), None)?;
            scanned += page.scanned;
            all.extend(page.inconsistencies);
            match page.next_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        tracing::info!(
            store_id,
            scanned,
            inconsistencies = all.len(),
            "Receivable validation finished"
        );
        Ok(all)
    }

    /// Validate a store and, when `auto_fix` is set, repair what can be repaired
    pub fn repair(
        &self,
        store_id: &str,
        auto_fix: bool,
        actor: &str,
        now: i64,
    ) -> LedgerResult<RepairReport> {
        let inconsistencies = self.validate(store_id)?;
        if !auto_fix {
            return Ok(RepairReport {
                inconsistencies,
                repairs: Vec::new(),
            });
        }

        let repairs: Vec<RepairOutcome> = inconsistencies
            .iter()
            .map(|issue| self.repair_one(issue, actor, now))
            .collect();

        let failed = repairs
            .iter()
            .filter(|r| r.action == RepairAction::RepairFailed)
            .count();
        tracing::info!(
            store_id,
            issues = inconsistencies.len(),
            failed,
            "Receivable repair finished"
        );
        Ok(RepairReport {
            inconsistencies,
            repairs,
        })
    }

    fn repair_one(&self, issue: &Inconsistency, actor: &str, now: i64) -> RepairOutcome {
        let result = match issue.kind {
            InconsistencyKind::MissingAccount => self
                .sync
                .create_from_order(&issue.order_id, actor, None, now)
                .map(|ledger| (RepairAction::CreatedAccount, Some(ledger.id))),
            // original_amount 建档后不可变，只能人工处理
            InconsistencyKind::AmountMismatch => Ok((RepairAction::Skipped, issue.ledger_id.clone())),
            InconsistencyKind::PaymentMismatch | InconsistencyKind::StatusMismatch => self
                .sync
                .refresh_order_summary(&issue.order_id)
                .map(|(sale, changed)| {
                    // 同一订单的第二条不一致在第一次回写后已无变化
                    let action = if changed {
                        RepairAction::OrderSynced
                    } else {
                        RepairAction::Skipped
                    };
                    (action, sale.ledger_id)
                }),
        };

        match result {
            Ok((action, ledger_id)) => RepairOutcome {
                action,
                issue: issue.clone(),
                ledger_id,
                error: None,
            },
            Err(e) => {
                tracing::warn!(
                    order_id = %issue.order_id,
                    kind = ?issue.kind,
                    error = %e,
                    "Repair failed"
                );
                RepairOutcome {
                    action: RepairAction::RepairFailed,
                    issue: issue.clone(),
                    ledger_id: issue.ledger_id.clone(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::storage::LedgerStorage;
    use crate::credit::sync::DEFAULT_CREDIT_DAYS;
    use shared::models::{CreditTerms, PaymentInput, PaymentType, ReceivableStatus, TransactionType};
    use shared::util::DAY_MS;

    const NOW: i64 = 1_750_000_000_000;

    fn setup(batch_size: usize) -> ConsistencyChecker {
        let storage = LedgerStorage::open_in_memory().unwrap();
        ConsistencyChecker::new(SyncOrchestrator::new(storage, DEFAULT_CREDIT_DAYS), batch_size)
    }

    fn credit_sale(id: &str, total: f64) -> Sale {
        Sale {
            id: id.to_string(),
            store_id: "store-1".to_string(),
            customer_id: "c-1".to_string(),
            customer_name: "Ana".to_string(),
            customer_phone: None,
            total,
            paid_amount: 0.0,
            status: SaleStatus::Unpaid,
            transaction_type: TransactionType::Credit,
            date: NOW - DAY_MS,
            payments: vec![],
            credit_terms: None,
            ledger_id: None,
        }
    }

    fn pay(checker: &ConsistencyChecker, ledger_id: &str, id: &str, amount: f64) {
        checker
            .sync
            .record_payment(
                ledger_id,
                PaymentInput {
                    id: Some(id.to_string()),
                    amount,
                    payment_method: "cash".to_string(),
                    reference: None,
                    payment_type: PaymentType::Payment,
                    notes: None,
                },
                "u",
                NOW,
            )
            .unwrap();
    }

    fn ledger_for(sale: &Sale, original_amount: f64) -> AccountReceivable {
        AccountReceivable {
            id: "ar-1".to_string(),
            order_id: sale.id.clone(),
            store_id: sale.store_id.clone(),
            customer_id: sale.customer_id.clone(),
            customer_name: sale.customer_name.clone(),
            customer_phone: None,
            original_amount,
            paid_amount: 0.0,
            remaining_balance: original_amount,
            sale_date: sale.date,
            due_date: sale.date + 30 * DAY_MS,
            last_payment_date: None,
            status: ReceivableStatus::Pending,
            payments: vec![],
            credit_days: 30,
            created_by: "u".to_string(),
            updated_by: None,
            created_at: NOW,
            updated_at: NOW,
            version: 1,
        }
    }

    #[test]
    fn test_inspect_amount_mismatch_only() {
        let sale = credit_sale("S-1", 100.0);
        let ledger = ledger_for(&sale, 90.0);

        let issues = inspect(&sale, Some(&ledger));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InconsistencyKind::AmountMismatch);
        assert_eq!(issues[0].order_id, "S-1");
        assert_eq!(issues[0].ledger_id.as_deref(), Some("ar-1"));
        assert_eq!(issues[0].order_value, Some(json!(100.0)));
        assert_eq!(issues[0].ledger_value, Some(json!(90.0)));
    }

    #[test]
    fn test_inspect_within_tolerance_is_clean() {
        let mut sale = credit_sale("S-1", 100.004);
        sale.paid_amount = 10.0;
        let mut ledger = ledger_for(&sale, 100.0);
        ledger.paid_amount = 10.009;
        ledger.status = ReceivableStatus::Partial;

        assert!(inspect(&sale, Some(&ledger)).is_empty());
    }

    #[test]
    fn test_inspect_missing_account() {
        let sale = credit_sale("S-1", 100.0);
        let issues = inspect(&sale, None);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, InconsistencyKind::MissingAccount);
        assert!(issues[0].ledger_id.is_none());
    }

    #[test]
    fn test_validate_reports_each_kind() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let sync = &checker.sync;
        sync.ingest_sale(credit_sale("S-1", 100.0)).unwrap();
        sync.ingest_sale(credit_sale("S-2", 100.0)).unwrap();
        let ledger = sync.create_from_order("S-2", "u", None, NOW).unwrap();
        pay(&checker, &ledger.id, "p-1", 100.0);

        // 只写了销售单一侧：paid_amount 和 status 都漂移
        let mut drifted = sync.storage().get_sale("S-2").unwrap().unwrap();
        drifted.paid_amount = 40.0;
        drifted.status = SaleStatus::Unpaid;
        sync.ingest_sale(drifted).unwrap();

        let issues = checker.validate("store-1").unwrap();
        let kinds: Vec<_> = issues.iter().map(|i| (i.order_id.as_str(), i.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                ("S-1", InconsistencyKind::MissingAccount),
                ("S-2", InconsistencyKind::PaymentMismatch),
                ("S-2", InconsistencyKind::StatusMismatch),
            ]
        );
    }

    #[test]
    fn test_validate_ignores_cash_sales_and_other_stores() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let mut cash = credit_sale("S-1", 100.0);
        cash.transaction_type = TransactionType::Cash;
        checker.sync.ingest_sale(cash).unwrap();
        let mut other = credit_sale("S-2", 100.0);
        other.store_id = "store-2".to_string();
        checker.sync.ingest_sale(other).unwrap();

        assert!(checker.validate("store-1").unwrap().is_empty());
        assert_eq!(checker.validate("store-2").unwrap().len(), 1);
    }

    #[test]
    fn test_validate_pages_with_cursor() {
        let checker = setup(2);
        for i in 0..5 {
            checker
                .sync
                .ingest_sale(credit_sale(&format!("S-{i}"), 10.0))
                .unwrap();
        }

        let first = checker.validate_page("store-1", None, None).unwrap();
        assert_eq!(first.scanned, 2);
        assert_eq!(first.next_cursor.as_deref(), Some("S-1"));

        let second = checker
            .validate_page("store-1", first.next_cursor.as_deref(), None)
            .unwrap();
        assert_eq!(second.inconsistencies[0].order_id, "S-2");

        let last = checker.validate_page("store-1", Some("S-3"), Some(10)).unwrap();
        assert_eq!(last.scanned, 1);
        assert!(last.next_cursor.is_none());

        // 整体扫描覆盖所有页
        assert_eq!(checker.validate("store-1").unwrap().len(), 5);
    }

    #[test]
    fn test_batch_size_is_clamped() {
        assert_eq!(setup(0).batch_size(), 1);
        assert_eq!(setup(5000).batch_size(), MAX_BATCH_SIZE);
        assert_eq!(setup(200).batch_size(), 200);
    }

    #[test]
    fn test_repair_without_auto_fix_is_read_only() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        checker.sync.ingest_sale(credit_sale("S-1", 100.0)).unwrap();

        let report = checker.repair("store-1", false, "u", NOW).unwrap();
        assert_eq!(report.inconsistencies.len(), 1);
        assert!(report.repairs.is_empty());
        assert!(checker.sync.storage().find_ledger_id("S-1").unwrap().is_none());
    }

    #[test]
    fn test_repair_fixes_and_is_idempotent() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let sync = &checker.sync;
        sync.ingest_sale(credit_sale("S-1", 100.0)).unwrap();
        sync.ingest_sale(credit_sale("S-2", 100.0)).unwrap();
        let ledger = sync.create_from_order("S-2", "u", None, NOW).unwrap();
        pay(&checker, &ledger.id, "p-1", 30.0);
        let mut drifted = sync.storage().get_sale("S-2").unwrap().unwrap();
        drifted.paid_amount = 0.0;
        sync.ingest_sale(drifted).unwrap();

        let report = checker.repair("store-1", true, "repairer", NOW).unwrap();
        let actions: Vec<_> = report.repairs.iter().map(|r| r.action).collect();
        assert_eq!(
            actions,
            vec![RepairAction::CreatedAccount, RepairAction::OrderSynced]
        );
        assert!(report.repairs[0].ledger_id.is_some());

        let repaired = sync.storage().get_sale("S-2").unwrap().unwrap();
        assert_eq!(repaired.paid_amount, 30.0);

        // 第二遍：无漂移，无写入
        let ledgers_before = sync.storage().list_ledgers("store-1").unwrap();
        let again = checker.repair("store-1", true, "repairer", NOW).unwrap();
        assert!(again.inconsistencies.is_empty());
        assert!(again.repairs.is_empty());
        assert_eq!(sync.storage().list_ledgers("store-1").unwrap(), ledgers_before);
    }

    #[test]
    fn test_repair_writes_order_once_per_sale() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let sync = &checker.sync;
        sync.ingest_sale(credit_sale("S-1", 100.0)).unwrap();
        let ledger = sync.create_from_order("S-1", "u", None, NOW).unwrap();
        pay(&checker, &ledger.id, "p-1", 100.0);
        let mut drifted = sync.storage().get_sale("S-1").unwrap().unwrap();
        drifted.paid_amount = 40.0;
        drifted.status = SaleStatus::Unpaid;
        sync.ingest_sale(drifted).unwrap();

        let report = checker.repair("store-1", true, "u", NOW).unwrap();
        let kinds: Vec<_> = report.repairs.iter().map(|r| (r.issue.kind, r.action)).collect();
        assert_eq!(
            kinds,
            vec![
                (InconsistencyKind::PaymentMismatch, RepairAction::OrderSynced),
                (InconsistencyKind::StatusMismatch, RepairAction::Skipped),
            ]
        );

        let repaired = sync.storage().get_sale("S-1").unwrap().unwrap();
        assert_eq!(repaired.paid_amount, 100.0);
        assert_eq!(repaired.status, SaleStatus::Paid);
    }

    #[test]
    fn test_repair_skips_amount_mismatch() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let sync = &checker.sync;
        sync.ingest_sale(credit_sale("S-1", 90.0)).unwrap();
        let ledger = sync.create_from_order("S-1", "u", None, NOW).unwrap();
        let mut changed = sync.storage().get_sale("S-1").unwrap().unwrap();
        changed.total = 100.0;
        sync.ingest_sale(changed).unwrap();

        let report = checker.repair("store-1", true, "u", NOW).unwrap();
        assert_eq!(report.repairs.len(), 1);
        assert_eq!(report.repairs[0].action, RepairAction::Skipped);
        assert_eq!(report.repairs[0].ledger_id.as_deref(), Some(ledger.id.as_str()));

        let stored = sync.storage().get_ledger(&ledger.id).unwrap().unwrap();
        assert_eq!(stored.original_amount, 90.0);
        assert_eq!(stored.version, 1);
    }

    #[test]
    fn test_repair_continues_after_failure() {
        let checker = setup(DEFAULT_BATCH_SIZE);
        let mut bad = credit_sale("S-1", 100.0);
        bad.credit_terms = Some(CreditTerms {
            credit_days: 99_999,
            due_date: 0,
        });
        checker.sync.ingest_sale(bad).unwrap();
        checker.sync.ingest_sale(credit_sale("S-2", 100.0)).unwrap();

        let report = checker.repair("store-1", true, "u", NOW).unwrap();
        assert_eq!(report.repairs.len(), 2);
        assert_eq!(report.repairs[0].action, RepairAction::RepairFailed);
        assert_eq!(report.repairs[0].issue.order_id, "S-1");
        assert!(report.repairs[0].error.is_some());
        assert_eq!(report.repairs[1].action, RepairAction::CreatedAccount);
    }
}
