//! Invoice number allocation.
//!
//! Numbers follow `INV-YYYYMM-NNNN`: a four-digit, zero-padded sequence
//! scoped to the issuing month. Allocation is serialized per month behind an
//! async mutex so concurrent invoice creation inside one process cannot hand
//! out the same number; the first allocation of a month seeds the counter
//! from the highest number already stored with that month's prefix, so
//! numbering continues across restarts.

use crate::store::InvoiceStore;
use chrono::Utc;
use dashmap::DashMap;
use service_core::error::AppError;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct MonthSequence {
    seeded: bool,
    last: u32,
}

#[derive(Default)]
pub struct InvoiceSequencer {
    months: DashMap<String, Arc<Mutex<MonthSequence>>>,
}

impl InvoiceSequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next invoice number for the current issuing month.
    pub async fn allocate(&self, store: &dyn InvoiceStore) -> Result<String, AppError> {
        let prefix = format!("INV-{}", Utc::now().format("%Y%m"));

        let cell = self
            .months
            .entry(prefix.clone())
            .or_default()
            .clone();

        let mut sequence = cell.lock().await;
        if !sequence.seeded {
            if let Some(max) = store.max_number_with_prefix(&prefix).await? {
                sequence.last = parse_sequence(&max, &prefix).unwrap_or(0);
            }
            sequence.seeded = true;
        }

        sequence.last += 1;
        Ok(format!("{}-{:04}", prefix, sequence.last))
    }
}

/// Numeric suffix of `number`, given its `INV-YYYYMM` prefix.
fn parse_sequence(number: &str, prefix: &str) -> Option<u32> {
    number
        .strip_prefix(prefix)?
        .strip_prefix('-')?
        .parse()
        .ok()
}
