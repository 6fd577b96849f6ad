pub mod events;
pub mod maildir;
pub mod solana;
