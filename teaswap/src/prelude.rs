//! Common imports.

pub use crate::config::{ChainDescriptor, SwapConfig};
pub use crate::error::{Error, ProviderError, Result, SwapError};
pub use crate::events::EventSubscription;
pub use crate::provider::{Eip1193Provider, LocalWallet, ProviderEvent, WalletClient};
pub use crate::session::{ConnectionState, NetworkStatus, SessionSnapshot, WalletSession};
pub use crate::storage::{FileStore, FlagStore, MemoryStore};
pub use crate::swap::{SwapForm, SwapInterface, SwapOutcome};
pub use crate::token::{Token, TokenCatalog};
pub use crate::view::{Notice, NoticeBoard};
