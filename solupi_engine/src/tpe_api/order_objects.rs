use serde::{Deserialize, Serialize};

use crate::{db_types::Order, tpe_api::settlement_objects::SettlementReport};

/// The state of an order after its payment reference has been attached, and the outcome of the settlement run that
/// the attachment triggered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachReferenceResult {
    pub order: Order,
    pub settlement: SettlementReport,
}
