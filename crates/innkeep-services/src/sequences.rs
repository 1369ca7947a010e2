//! Document number generation
//!
//! Formats the values issued by the locked sequence store into the
//! human-readable confirmation, invoice, and correction numbers shown on
//! documents. Uniqueness is guaranteed by the store's row lock; this
//! layer only names counters and formats values.

use innkeep_core::{config::BillingConfig, traits::SequenceStore, AppResult};
use std::sync::Arc;
use tracing::instrument;

use crate::constants::{
    CONFIRMATION_PREFIX, CONFIRMATION_SEQUENCE, CORRECTION_PREFIX, CORRECTION_SEQUENCE,
    INVOICE_PREFIX, INVOICE_SEQUENCE, SEQUENCE_PAD,
};

/// Generator for prefixed, zero-padded document numbers
pub struct SequenceGenerator<S: SequenceStore> {
    store: Arc<S>,
    config: BillingConfig,
}

impl<S: SequenceStore> SequenceGenerator<S> {
    /// Create a new generator
    pub fn new(store: Arc<S>, config: BillingConfig) -> Self {
        Self { store, config }
    }

    /// Format a raw counter value into a document number
    pub fn format_number(prefix: &str, value: i64) -> String {
        format!("{}-{:0width$}", prefix, value, width = SEQUENCE_PAD)
    }

    /// Next confirmation number (e.g., "RES-001001")
    #[instrument(skip(self))]
    pub async fn confirmation_number(&self) -> AppResult<String> {
        let value = self
            .store
            .next_value(CONFIRMATION_SEQUENCE, self.config.confirmation_sequence_floor)
            .await?;
        Ok(Self::format_number(CONFIRMATION_PREFIX, value))
    }

    /// Next invoice number (e.g., "INV-001001")
    #[instrument(skip(self))]
    pub async fn invoice_number(&self) -> AppResult<String> {
        let value = self
            .store
            .next_value(INVOICE_SEQUENCE, self.config.invoice_sequence_floor)
            .await?;
        Ok(Self::format_number(INVOICE_PREFIX, value))
    }

    /// Next correction number (e.g., "COR-001001")
    #[instrument(skip(self))]
    pub async fn correction_number(&self) -> AppResult<String> {
        let value = self
            .store
            .next_value(CORRECTION_SEQUENCE, self.config.correction_sequence_floor)
            .await?;
        Ok(Self::format_number(CORRECTION_PREFIX, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use innkeep_core::AppError;
    use std::sync::atomic::{AtomicI64, Ordering};

    struct MockSequenceStore {
        value: AtomicI64,
    }

    #[async_trait]
    impl SequenceStore for MockSequenceStore {
        async fn next_value(&self, _name: &str, floor: i64) -> Result<i64, AppError> {
            let mut current = self.value.load(Ordering::SeqCst);
            loop {
                let next = (current + 1).max(floor);
                match self.value.compare_exchange(
                    current,
                    next,
                    Ordering::SeqCst,
                    Ordering::SeqCst,
                ) {
                    Ok(_) => return Ok(next),
                    Err(actual) => current = actual,
                }
            }
        }
    }

    fn generator(start: i64) -> SequenceGenerator<MockSequenceStore> {
        SequenceGenerator::new(
            Arc::new(MockSequenceStore {
                value: AtomicI64::new(start),
            }),
            BillingConfig::default(),
        )
    }

    #[test]
    fn test_format_number() {
        assert_eq!(
            SequenceGenerator::<MockSequenceStore>::format_number("INV", 42),
            "INV-000042"
        );
        assert_eq!(
            SequenceGenerator::<MockSequenceStore>::format_number("RES", 1001),
            "RES-001001"
        );
        // Values wider than the pad are kept intact
        assert_eq!(
            SequenceGenerator::<MockSequenceStore>::format_number("COR", 12345678),
            "COR-12345678"
        );
    }

    #[tokio::test]
    async fn test_fresh_counter_starts_at_floor() {
        let gen = generator(0);
        assert_eq!(gen.confirmation_number().await.unwrap(), "RES-001000");
        assert_eq!(gen.confirmation_number().await.unwrap(), "RES-001001");
    }

    #[tokio::test]
    async fn test_counter_above_floor_keeps_counting() {
        let gen = generator(2500);
        assert_eq!(gen.invoice_number().await.unwrap(), "INV-002501");
    }

    #[tokio::test]
    async fn test_concurrent_values_are_distinct_and_contiguous() {
        let gen = Arc::new(generator(999));

        let mut handles = Vec::new();
        for _ in 0..32 {
            let gen = gen.clone();
            handles.push(tokio::spawn(
                async move { gen.confirmation_number().await.unwrap() },
            ));
        }

        let mut values = Vec::new();
        for handle in handles {
            values.push(handle.await.unwrap());
        }

        values.sort();
        values.dedup();
        assert_eq!(values.len(), 32);
        assert_eq!(values.first().unwrap(), "RES-001000");
        assert_eq!(values.last().unwrap(), "RES-001031");
    }
}
