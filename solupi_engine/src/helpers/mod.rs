mod address;
mod email_parser;

pub use address::is_valid_wallet_address;
pub use email_parser::{extract_payment_fact, extract_payment_fact_at, BANK_TIMEZONE_OFFSET_SECS};
