#![cfg_attr(docsrs, feature(doc_cfg))]
//! Teaswap is the headless core of a two-token swap widget for TEA Sepolia.
//!
//! It connects to an EIP-1193 wallet, keeps it on the required chain
//! (adding the chain when the wallet does not know it), quotes a fixed-rate
//! TEA/SCID exchange and submits the swap transactions.
//!
//! ```ignore
//! use std::sync::Arc;
//! use teaswap::prelude::*;
//!
//! let wallet = LocalWallet::builder().private_key(key).build().await?;
//! let session = Arc::new(WalletSession::new(
//!     Some(Arc::new(wallet)),
//!     Arc::new(MemoryStore::new()),
//!     SwapConfig::default(),
//! ));
//! session.connect().await;
//!
//! let mut ui = SwapInterface::new(session);
//! ui.form_mut().set_amount_from("1");
//! let outcome = ui.execute_swap().await;
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod network;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod storage;
pub mod swap;
pub mod token;
pub mod view;

pub use error::{Error, Result};
