//! # Martingale Strategy - Digit Contract Execution Loop
//!
//! ## Purpose
//!
//! Buys short digit contracts in a loop, sizing each stake on a martingale
//! ladder (double after a loss, back to base after a win) and stopping on a
//! session stop-loss or take-profit. In auto mode the instrument and contract
//! type follow the top recommendation published by `digit_signals`.
//!
//! ## Integration Points
//!
//! - **Input**: `ContractBroker` for purchases and settlement updates
//! - **Selection**: fixed template, or a `watch` of the signal engine's top pick
//! - **Output**: `LoopStatus` broadcast events, state snapshots, loop metrics
//!
//! ## Architecture Role
//!
//! ```text
//! SignalEngine ──watch──► [TradeLoopController] ──purchase──► ContractBroker
//!                                ▲       │
//!                 on_win/on_loss │       └──spawn──► [monitor task per contract]
//!                                │                          │
//!                         [StakeController] ◄──settlement───┘
//! ```
//!
//! ## Examples
//!
//! ```rust
//! use digitbot_config::TradingConfig;
//! use martingale::StakeController;
//! use rust_decimal_macros::dec;
//!
//! let mut stake = StakeController::new(&TradingConfig::default()).unwrap();
//! stake.on_loss();
//! stake.on_loss();
//! assert_eq!(stake.next_stake(), dec!(4.00));
//! stake.on_win();
//! assert_eq!(stake.next_stake(), dec!(1.00));
//! ```

pub mod error;
pub mod paper;
pub mod stake;
pub mod status;
pub mod trade_loop;

pub use error::{Result, StrategyError};
pub use paper::{PaperBroker, PaperConfig};
pub use stake::{StakeController, StakePhase, StakeState};
pub use status::{LoopStatus, StopReason, TradeLoopState};
pub use trade_loop::{LoopHandle, StopHandle, TradeLoopController, TradeSelection, TradeTemplate};
