pub mod context;

pub use context::{BindingContext, WalletEvent};
