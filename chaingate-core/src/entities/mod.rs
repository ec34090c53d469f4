pub mod address;
pub mod block;

pub use address::{Address, WithdrawalRequest};
pub use block::{Block, Entry, Transaction};
