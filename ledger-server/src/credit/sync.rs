//! Sync Orchestrator - 销售单与应收台账的双向同步
//!
//! 台账是赊账销售的权威数据源，销售单上的 `paid_amount` / `status` /
//! `payments` 只是投影，由这里的同步函数刷新。
//!
//! # 写入路径
//!
//! ```text
//! create_from_order      sale ──seed──▶ receivable (幂等，按 order_id 唯一)
//! sync_payment_to_ledger sale payment ──▶ receivable (CAS + 重试)
//! sync_payment_to_order  receivable payment ──▶ sale (投影)
//! record_payment         receivable payment ──▶ receivable + sale (同一事务)
//! migrate_existing       批量补建台账，单条失败不影响整批
//! ```

use serde::Serialize;
use shared::models::{
    AccountReceivable, MigrationResult, PaymentInput, PaymentType, ReceivablePayment,
    ReceivableStatus, Sale, SalePayment, SaleStatus,
};
use shared::util::{add_days, new_id};

use super::error::{LedgerError, LedgerResult};
use super::money;
use super::reducer;
use super::storage::LedgerStorage;

/// Default credit period when neither the caller nor the sale specifies one
pub const DEFAULT_CREDIT_DAYS: i64 = 30;

/// Upper bound for credit days (10 years)
pub const MAX_CREDIT_DAYS: i64 = 3650;

/// Attempts for a read-reduce-commit cycle before giving up with `Conflict`
pub const MAX_CAS_RETRIES: usize = 3;

/// Actor recorded when no user is attached to the operation
const SYSTEM_ACTOR: &str = "system";

/// Result of a ledger-originated payment: both sides after the write
#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub ledger: AccountReceivable,
    pub order: Sale,
}

/// Sync Orchestrator
#[derive(Clone)]
pub struct SyncOrchestrator {
    storage: LedgerStorage,
    default_credit_days: i64,
}

impl SyncOrchestrator {
    pub fn new(storage: LedgerStorage, default_credit_days: i64) -> Self {
        Self {
            storage,
            default_credit_days,
        }
    }

    pub fn storage(&self) -> &LedgerStorage {
        &self.storage
    }

    // ========== Boundary ==========

    /// Upsert a sale pushed by the POS
    ///
    /// The weak `ledger_id` back-reference is owned by this subsystem, so an
    /// incoming record without one keeps the stored reference.
    pub fn ingest_sale(&self, mut sale: Sale) -> LedgerResult<Sale> {
        if sale.id.trim().is_empty() || sale.store_id.trim().is_empty() {
            return Err(LedgerError::Validation(
                "sale id and store id are required".into(),
            ));
        }
        if sale.customer_id.trim().is_empty() {
            return Err(LedgerError::Validation("customer id is required".into()));
        }
        money::validate_sale_total(sale.total)?;

        let txn = self.storage.begin_write()?;
        if sale.ledger_id.is_none()
            && let Some(stored) = self.storage.get_sale_txn(&txn, &sale.id)?
        {
            sale.ledger_id = stored.ledger_id;
        }
        self.storage.put_sale(&txn, &sale)?;
        txn.commit()?;

        tracing::debug!(
            store_id = %sale.store_id,
            order_id = %sale.id,
            transaction_type = ?sale.transaction_type,
            "Sale ingested"
        );
        Ok(sale)
    }

    // ========== Ledger creation ==========

    /// Create the receivable for a credit sale, or return the existing one
    ///
    /// `credit_days` falls back to the sale's credit terms, then to the
    /// configured default.
    pub fn create_from_order(
        &self,
        order_id: &str,
        created_by: &str,
        credit_days: Option<i64>,
        now: i64,
    ) -> LedgerResult<AccountReceivable> {
        let txn = self.storage.begin_write()?;

        let mut sale = self
            .storage
            .get_sale_txn(&txn, order_id)?
            .ok_or_else(|| LedgerError::SaleNotFound(order_id.to_string()))?;
        if !sale.is_credit() {
            return Err(LedgerError::NotCreditSale(order_id.to_string()));
        }

        // 幂等：已有台账直接返回（补写缺失的反向引用）
        if let Some(ledger_id) = self.storage.find_ledger_id_txn(&txn, order_id)? {
            let existing = self
                .storage
                .get_ledger_txn(&txn, &ledger_id)?
                .ok_or_else(|| LedgerError::ReceivableNotFound(ledger_id.clone()))?;
            if existing.status == ReceivableStatus::Cancelled {
                return Err(LedgerError::ReceivableCancelled(existing.id));
            }
            if sale.ledger_id.as_deref() != Some(existing.id.as_str()) {
                sale.ledger_id = Some(existing.id.clone());
                self.storage.put_sale(&txn, &sale)?;
                txn.commit()?;
                tracing::info!(order_id, ledger_id = %existing.id, "Restored sale ledger reference");
            }
            return Ok(existing);
        }

        let credit_days = credit_days
            .or_else(|| sale.credit_terms.map(|t| t.credit_days))
            .unwrap_or(self.default_credit_days);
        let ledger = build_ledger(&sale, credit_days, created_by, now)?;

        self.storage.insert_ledger(&txn, &ledger)?;
        sale.ledger_id = Some(ledger.id.clone());
        self.storage.put_sale(&txn, &sale)?;
        txn.commit()?;

        tracing::info!(
            store_id = %ledger.store_id,
            order_id,
            ledger_id = %ledger.id,
            original_amount = ledger.original_amount,
            paid_amount = ledger.paid_amount,
            status = %ledger.status,
            seeded_payments = ledger.payments.len(),
            "Receivable created"
        );
        Ok(ledger)
    }

    // ========== Payment mirroring ==========

    /// Mirror a ledger-side payment onto the sale and refresh its summary
    pub fn sync_payment_to_order(
        &self,
        ledger_id: &str,
        payment: &ReceivablePayment,
    ) -> LedgerResult<Sale> {
        let txn = self.storage.begin_write()?;
        let ledger = self
            .storage
            .get_ledger_txn(&txn, ledger_id)?
            .ok_or_else(|| LedgerError::ReceivableNotFound(ledger_id.to_string()))?;
        let mut sale = self
            .storage
            .get_sale_txn(&txn, &ledger.order_id)?
            .ok_or_else(|| LedgerError::SaleNotFound(ledger.order_id.clone()))?;

        let appended = mirror_payment(&mut sale, payment);
        project_summary(&mut sale, &ledger);
        self.storage.put_sale(&txn, &sale)?;
        txn.commit()?;

        tracing::info!(
            order_id = %sale.id,
            ledger_id,
            payment_id = %payment.id,
            appended,
            paid_amount = sale.paid_amount,
            status = sale.status.as_str(),
            "Payment synced to sale"
        );
        Ok(sale)
    }

    /// Overwrite the sale's `paid_amount` / `status` from its receivable
    ///
    /// Returns the sale and whether anything was written.
    pub fn refresh_order_summary(&self, order_id: &str) -> LedgerResult<(Sale, bool)> {
        let txn = self.storage.begin_write()?;
        let mut sale = self
            .storage
            .get_sale_txn(&txn, order_id)?
            .ok_or_else(|| LedgerError::SaleNotFound(order_id.to_string()))?;
        let ledger_id = self
            .storage
            .find_ledger_id_txn(&txn, order_id)?
            .ok_or_else(|| LedgerError::ReceivableNotFound(format!("order {}", order_id)))?;
        let ledger = self
            .storage
            .get_ledger_txn(&txn, &ledger_id)?
            .ok_or(LedgerError::ReceivableNotFound(ledger_id))?;

        let before = sale.clone();
        project_summary(&mut sale, &ledger);
        if sale == before {
            return Ok((sale, false));
        }
        self.storage.put_sale(&txn, &sale)?;
        txn.commit()?;

        tracing::info!(
            order_id,
            ledger_id = %ledger.id,
            paid_amount = sale.paid_amount,
            status = sale.status.as_str(),
            "Sale summary refreshed from receivable"
        );
        Ok((sale, true))
    }

    /// Mirror a sale-side payment onto its receivable, creating it lazily
    pub fn sync_payment_to_ledger(
        &self,
        order_id: &str,
        payment: &SalePayment,
        now: i64,
    ) -> LedgerResult<AccountReceivable> {
        let mut payment = payment.clone();
        if payment.id.is_empty() {
            payment.id = new_id();
        }
        let record = payment_from_sale(&payment)?;
        let actor = payment
            .received_by
            .clone()
            .unwrap_or_else(|| SYSTEM_ACTOR.to_string());

        // 懒建档在写事务之外完成（create_from_order 自带事务且幂等）
        if self.storage.find_ledger_id(order_id)?.is_none() {
            self.create_from_order(order_id, &actor, None, now)?;
        }

        let ledger = self.with_cas_retry(order_id, || {
            // 读取与写入在同一个写事务内，redb 串行化写者
            let txn = self.storage.begin_write()?;
            let sale = self
                .storage
                .get_sale_txn(&txn, order_id)?
                .ok_or_else(|| LedgerError::SaleNotFound(order_id.to_string()))?;
            if !sale.is_credit() {
                return Err(LedgerError::NotCreditSale(order_id.to_string()));
            }
            let ledger_id = self
                .storage
                .find_ledger_id_txn(&txn, order_id)?
                .ok_or_else(|| LedgerError::ReceivableNotFound(format!("order {}", order_id)))?;
            let mut ledger = self
                .storage
                .get_ledger_txn(&txn, &ledger_id)?
                .ok_or(LedgerError::ReceivableNotFound(ledger_id))?;

            // 建档时可能已从销售单历史中带入
            if ledger.has_payment(&record.id) {
                return Ok(ledger);
            }

            let expected = ledger.version;
            reducer::append_payment(&mut ledger, record.clone(), now)?;
            ledger.updated_by = Some(actor.clone());
            self.storage.save_ledger(&txn, &mut ledger, expected)?;
            txn.commit()?;
            Ok(ledger)
        })?;

        tracing::info!(
            order_id,
            ledger_id = %ledger.id,
            payment_id = %record.id,
            paid_amount = ledger.paid_amount,
            status = %ledger.status,
            "Payment synced to receivable"
        );
        Ok(ledger)
    }

    /// Record a payment against a receivable and mirror it onto the sale
    ///
    /// Idempotent by payment id: replaying a recorded payment only refreshes
    /// the sale projection.
    pub fn record_payment(
        &self,
        ledger_id: &str,
        input: PaymentInput,
        processed_by: &str,
        now: i64,
    ) -> LedgerResult<PaymentReceipt> {
        money::validate_payment_amount(input.amount)?;
        if input.payment_method.trim().is_empty() {
            return Err(LedgerError::Validation("payment method is required".into()));
        }

        let record = ReceivablePayment {
            id: input.id.unwrap_or_else(new_id),
            amount: input.amount,
            payment_method: input.payment_method,
            reference: input.reference,
            payment_type: input.payment_type,
            notes: input.notes,
            processed_by: Some(processed_by.to_string()),
            processed_at: now,
        };

        let receipt = self.with_cas_retry(ledger_id, || {
            let txn = self.storage.begin_write()?;
            let mut ledger = self
                .storage
                .get_ledger_txn(&txn, ledger_id)?
                .ok_or_else(|| LedgerError::ReceivableNotFound(ledger_id.to_string()))?;
            let mut sale = self
                .storage
                .get_sale_txn(&txn, &ledger.order_id)?
                .ok_or_else(|| LedgerError::SaleNotFound(ledger.order_id.clone()))?;

            let mirrored = match ledger.payments.iter().find(|p| p.id == record.id) {
                Some(existing) => existing.clone(),
                None => {
                    let expected = ledger.version;
                    reducer::append_payment(&mut ledger, record.clone(), now)?;
                    ledger.updated_by = Some(processed_by.to_string());
                    self.storage.save_ledger(&txn, &mut ledger, expected)?;
                    record.clone()
                }
            };

            mirror_payment(&mut sale, &mirrored);
            project_summary(&mut sale, &ledger);
            self.storage.put_sale(&txn, &sale)?;
            txn.commit()?;

            Ok(PaymentReceipt {
                ledger,
                order: sale,
            })
        })?;

        tracing::info!(
            ledger_id,
            order_id = %receipt.order.id,
            payment_id = %record.id,
            payment_type = record.payment_type.as_str(),
            amount = record.amount,
            paid_amount = receipt.ledger.paid_amount,
            status = %receipt.ledger.status,
            "Payment recorded"
        );
        Ok(receipt)
    }

    // ========== Overdue sweep ==========

    /// Materialize `pending → overdue` for receivables past their due date
    ///
    /// One write transaction for the whole pass. Returns how many were updated.
    pub fn sweep_overdue(&self, now: i64) -> LedgerResult<usize> {
        let txn = self.storage.begin_write()?;
        let candidates = self.storage.pending_past_due_txn(&txn, now)?;

        let mut updated = 0;
        for mut ledger in candidates {
            let expected = ledger.version;
            reducer::recompute_derived(&mut ledger, now);
            if ledger.status != ReceivableStatus::Overdue {
                continue;
            }
            ledger.updated_at = now;
            ledger.updated_by = Some(SYSTEM_ACTOR.to_string());
            self.storage.save_ledger(&txn, &mut ledger, expected)?;
            updated += 1;
        }
        txn.commit()?;

        if updated > 0 {
            tracing::info!(updated, "Receivables marked overdue");
        }
        Ok(updated)
    }

    // ========== Backfill ==========

    /// Create receivables for a store's credit sales that lack a ledger reference
    ///
    /// Only a failure to enumerate the store aborts; per-sale failures are
    /// reported in the result list.
    pub fn migrate_existing(
        &self,
        store_id: &str,
        created_by: &str,
        now: i64,
    ) -> LedgerResult<Vec<MigrationResult>> {
        let order_ids = self.storage.credit_sale_ids(store_id)?;
        let mut results = Vec::new();

        for order_id in order_ids {
            let outcome = self
                .storage
                .get_sale(&order_id)
                .map_err(LedgerError::from)
                .and_then(|sale| match sale {
                    Some(sale) if sale.ledger_id.is_some() => Ok(None),
                    Some(_) => self
                        .create_from_order(&order_id, created_by, None, now)
                        .map(Some),
                    None => Err(LedgerError::SaleNotFound(order_id.clone())),
                });

            match outcome {
                Ok(None) => {}
                Ok(Some(ledger)) => results.push(MigrationResult::ok(&order_id, ledger.id)),
                Err(e) => {
                    tracing::warn!(store_id, order_id = %order_id, error = %e, "Migration failed for sale");
                    results.push(MigrationResult::failed(&order_id, e.to_string()));
                }
            }
        }

        let migrated = results.iter().filter(|r| r.success).count();
        tracing::info!(
            store_id,
            migrated,
            failed = results.len() - migrated,
            "Receivable migration finished"
        );
        Ok(results)
    }

    /// Run a read-reduce-commit cycle, retrying on version conflicts
    fn with_cas_retry<T>(
        &self,
        key: &str,
        mut attempt: impl FnMut() -> LedgerResult<T>,
    ) -> LedgerResult<T> {
        for n in 1..=MAX_CAS_RETRIES {
            match attempt() {
                Err(e) if e.is_retryable() => {
                    tracing::warn!(key, attempt = n, error = %e, "Receivable write conflict, retrying");
                }
                other => return other,
            }
        }
        Err(LedgerError::Conflict(format!(
            "{} was modified concurrently, gave up after {} attempts",
            key, MAX_CAS_RETRIES
        )))
    }
}

/// Build a new receivable from a credit sale, seeding its payment history
fn build_ledger(
    sale: &Sale,
    credit_days: i64,
    created_by: &str,
    now: i64,
) -> LedgerResult<AccountReceivable> {
    if !(0..=MAX_CREDIT_DAYS).contains(&credit_days) {
        return Err(LedgerError::Validation(format!(
            "credit days must be between 0 and {}, got {}",
            MAX_CREDIT_DAYS, credit_days
        )));
    }
    money::validate_sale_total(sale.total)?;

    let mut ledger = AccountReceivable {
        id: new_id(),
        order_id: sale.id.clone(),
        store_id: sale.store_id.clone(),
        customer_id: sale.customer_id.clone(),
        customer_name: sale.customer_name.clone(),
        customer_phone: sale.customer_phone.clone(),
        original_amount: sale.total,
        paid_amount: 0.0,
        remaining_balance: sale.total,
        sale_date: sale.date,
        due_date: add_days(sale.date, credit_days),
        last_payment_date: None,
        status: ReceivableStatus::Pending,
        payments: Vec::with_capacity(sale.payments.len()),
        credit_days,
        created_by: created_by.to_string(),
        updated_by: None,
        created_at: now,
        updated_at: now,
        version: 1,
    };

    for legacy in &sale.payments {
        if legacy.amount == 0.0 {
            tracing::warn!(order_id = %sale.id, payment_id = %legacy.id, "Skipping zero-amount legacy payment");
            continue;
        }
        let mut legacy = legacy.clone();
        if legacy.id.is_empty() {
            legacy.id = new_id();
        }
        reducer::append_payment(&mut ledger, payment_from_sale(&legacy)?, now)?;
    }
    reducer::recompute_derived(&mut ledger, now);
    ledger.updated_at = now;
    Ok(ledger)
}

/// Translate a legacy sale payment into a ledger entry
///
/// Negative legacy amounts are refunds.
fn payment_from_sale(payment: &SalePayment) -> LedgerResult<ReceivablePayment> {
    let (amount, payment_type) = if payment.amount < 0.0 {
        (-payment.amount, PaymentType::Refund)
    } else {
        (payment.amount, PaymentType::Payment)
    };
    money::validate_payment_amount(amount)?;

    Ok(ReceivablePayment {
        id: payment.id.clone(),
        amount,
        payment_method: payment.method.clone(),
        reference: payment.reference.clone(),
        payment_type,
        notes: None,
        processed_by: payment.received_by.clone(),
        processed_at: payment.date,
    })
}

/// Append a ledger entry to the sale's legacy history unless already present
fn mirror_payment(sale: &mut Sale, payment: &ReceivablePayment) -> bool {
    if sale.find_payment(&payment.id).is_some() {
        return false;
    }
    let amount = if payment.payment_type.is_refund() {
        -payment.amount
    } else {
        payment.amount
    };
    sale.payments.push(SalePayment {
        id: payment.id.clone(),
        amount,
        date: payment.processed_at,
        method: payment.payment_method.clone(),
        reference: payment.reference.clone(),
        received_by: payment.processed_by.clone(),
    });
    true
}

/// Overwrite the sale's cached summary from the receivable (ledger wins)
pub(crate) fn project_summary(sale: &mut Sale, ledger: &AccountReceivable) {
    sale.paid_amount = ledger.paid_amount;
    sale.status = SaleStatus::from_receivable(ledger.status);
    sale.ledger_id = Some(ledger.id.clone());
}
