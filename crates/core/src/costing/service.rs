//! Costing service for input validation and COGS posting.

use crate::ledger::{
    AccountCode, LineMetadata, MetadataKey, PostEntryInput, PostLineInput, SourceType,
};
use tally_shared::types::{Cents, Quantity};

use super::error::CostingError;
use super::types::{RecordPurchaseInput, RecordSaleInput, RecordWriteOffInput};

/// Maximum length of an order id, leaving room for the line id in the
/// composite journal source id.
pub const MAX_ORDER_ID_LEN: usize = 60;

/// Maximum length of an order line id.
pub const MAX_ORDER_LINE_ID_LEN: usize = 64;

/// Maximum length of a batch source id or write-off reason.
pub const MAX_REFERENCE_LEN: usize = 128;

/// Costing service for inventory input validation.
pub struct CostingService;

impl CostingService {
    /// Validate a purchase before a batch is created.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveQuantity`, `NegativeUnitCost` or `InvalidSourceId`.
    pub fn validate_purchase(input: &RecordPurchaseInput) -> Result<(), CostingError> {
        Self::validate_quantity(input.quantity)?;
        if input.unit_cost.is_negative() {
            return Err(CostingError::NegativeUnitCost(input.unit_cost.value()));
        }
        if !Self::reference_ok(&input.batch.source_id, MAX_REFERENCE_LEN) {
            return Err(CostingError::InvalidSourceId(input.batch.source_id.clone()));
        }
        Ok(())
    }

    /// Validate a sale before allocation.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveQuantity`, `InvalidOrderReference` or
    /// `NegativeUnitCost` for a negative wholesale price.
    pub fn validate_sale(input: &RecordSaleInput) -> Result<(), CostingError> {
        Self::validate_quantity(input.quantity)?;
        if !Self::reference_ok(&input.order_id, MAX_ORDER_ID_LEN) {
            return Err(CostingError::InvalidOrderReference(format!(
                "order id must be 1-{MAX_ORDER_ID_LEN} characters"
            )));
        }
        if !Self::reference_ok(&input.order_line_id, MAX_ORDER_LINE_ID_LEN) {
            return Err(CostingError::InvalidOrderReference(format!(
                "order line id must be 1-{MAX_ORDER_LINE_ID_LEN} characters"
            )));
        }
        if let Some(price) = input.wholesale_price.filter(|p| p.is_negative()) {
            return Err(CostingError::NegativeUnitCost(price.value()));
        }
        Ok(())
    }

    /// Validate a write-off before allocation.
    ///
    /// # Errors
    ///
    /// Returns `NonPositiveQuantity` or `InvalidSourceId` for a bad reason.
    pub fn validate_write_off(input: &RecordWriteOffInput) -> Result<(), CostingError> {
        Self::validate_quantity(input.quantity)?;
        if !Self::reference_ok(&input.reason, MAX_REFERENCE_LEN) {
            return Err(CostingError::InvalidSourceId(input.reason.clone()));
        }
        Ok(())
    }

    fn validate_quantity(quantity: Quantity) -> Result<(), CostingError> {
        if quantity.is_positive() {
            Ok(())
        } else {
            Err(CostingError::NonPositiveQuantity(quantity))
        }
    }

    fn reference_ok(value: &str, max: usize) -> bool {
        let len = value.chars().count();
        len > 0 && len <= max
    }

    /// Journal source id of a sale line's COGS entry.
    #[must_use]
    pub fn sale_source_id(order_id: &str, order_line_id: &str) -> String {
        format!("{order_id}-{order_line_id}")
    }

    /// Build the COGS posting for a sale: debit COGS, credit inventory,
    /// both lines tagged with the order and order line.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMetadata` (nested) if the order reference is not a
    /// valid tag value.
    pub fn cogs_entry(
        input: &RecordSaleInput,
        cogs: Cents,
        cogs_account: &AccountCode,
        inventory_account: &AccountCode,
    ) -> Result<PostEntryInput, CostingError> {
        let tags = LineMetadata::from_versioned(
            LineMetadata::CURRENT_VERSION,
            [
                (MetadataKey::OrderId.as_str(), input.order_id.as_str()),
                (MetadataKey::OrderLineId.as_str(), input.order_line_id.as_str()),
            ],
        )?;

        Ok(PostEntryInput {
            channel_id: input.channel_id,
            source_type: SourceType::Sale,
            source_id: Self::sale_source_id(&input.order_id, &input.order_line_id),
            occurred_at: input.sale_date,
            memo: None,
            posted_by: None,
            lines: vec![
                PostLineInput::new(cogs_account.clone(), cogs).with_metadata(tags.clone()),
                PostLineInput::new(inventory_account.clone(), -cogs).with_metadata(tags),
            ],
        })
    }

    /// Build the stock adjustment posting for a write-off.
    #[must_use]
    pub fn write_off_entry(
        input: &RecordWriteOffInput,
        cost: Cents,
        cogs_account: &AccountCode,
        inventory_account: &AccountCode,
    ) -> PostEntryInput {
        PostEntryInput {
            channel_id: input.channel_id,
            source_type: SourceType::StockAdjustment,
            source_id: input.reason.clone(),
            occurred_at: None,
            memo: Some(format!("write-off of {} units", input.quantity)),
            posted_by: None,
            lines: vec![
                PostLineInput::new(cogs_account.clone(), cost),
                PostLineInput::new(inventory_account.clone(), -cost),
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costing::types::{BatchMeta, BatchSource};
    use tally_shared::types::{ChannelId, StockLocationId, VariantId};

    fn sale(order_id: &str, line: &str, tenths: i64) -> RecordSaleInput {
        RecordSaleInput {
            channel_id: ChannelId::new(),
            variant_id: VariantId::new(),
            stock_location_id: StockLocationId::new(),
            quantity: Quantity::from_tenths(tenths),
            order_id: order_id.to_string(),
            order_line_id: line.to_string(),
            sale_date: None,
            wholesale_price: None,
        }
    }

    #[test]
    fn test_sale_validation() {
        assert!(CostingService::validate_sale(&sale("o-1", "l-1", 15)).is_ok());
        assert!(matches!(
            CostingService::validate_sale(&sale("o-1", "l-1", 0)),
            Err(CostingError::NonPositiveQuantity(_))
        ));
        assert!(matches!(
            CostingService::validate_sale(&sale("", "l-1", 10)),
            Err(CostingError::InvalidOrderReference(_))
        ));
        assert!(matches!(
            CostingService::validate_sale(&sale(&"o".repeat(61), "l-1", 10)),
            Err(CostingError::InvalidOrderReference(_))
        ));

        let mut negative_price = sale("o-1", "l-1", 10);
        negative_price.wholesale_price = Some(Cents::new(-1));
        assert_eq!(
            CostingService::validate_sale(&negative_price),
            Err(CostingError::NegativeUnitCost(-1))
        );
    }

    #[test]
    fn test_purchase_validation() {
        let mut input = RecordPurchaseInput {
            channel_id: ChannelId::new(),
            variant_id: VariantId::new(),
            stock_location_id: StockLocationId::new(),
            quantity: Quantity::units(10),
            unit_cost: Cents::new(250),
            batch: BatchMeta {
                source: BatchSource::Purchase,
                source_id: "PO-1".to_string(),
                expires_at: None,
            },
        };
        assert!(CostingService::validate_purchase(&input).is_ok());

        input.unit_cost = Cents::new(-5);
        assert_eq!(
            CostingService::validate_purchase(&input),
            Err(CostingError::NegativeUnitCost(-5))
        );
    }

    #[test]
    fn test_cogs_entry_shape() {
        let input = sale("o-7", "l-2", 10);
        let cogs = AccountCode::parse("COGS").unwrap();
        let inventory = AccountCode::parse("INVENTORY").unwrap();
        let entry = CostingService::cogs_entry(&input, Cents::new(200), &cogs, &inventory).unwrap();

        assert_eq!(entry.source_type, SourceType::Sale);
        assert_eq!(entry.source_id, "o-7-l-2");
        assert_eq!(entry.lines[0].amount, Cents::new(200));
        assert_eq!(entry.lines[1].amount, Cents::new(-200));
        assert_eq!(entry.lines[0].metadata.get(MetadataKey::OrderId), Some("o-7"));
        assert_eq!(
            entry.lines[1].metadata.get(MetadataKey::OrderLineId),
            Some("l-2")
        );
    }

    #[test]
    fn test_longest_references_fit_source_id() {
        let id = CostingService::sale_source_id(&"o".repeat(60), &"l".repeat(64));
        assert!(crate::ledger::LedgerService::validate_source_id(&id).is_ok());
    }
}
