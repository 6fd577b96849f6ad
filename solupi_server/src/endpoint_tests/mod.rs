mod helpers;
pub mod mocks;
mod orders;
mod prices;
mod webhooks;
