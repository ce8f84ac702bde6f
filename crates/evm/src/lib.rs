// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

pub mod contracts;
mod error;
mod ledger;

pub use contracts::{
    LotteryContract, LotteryContractFactory, LotteryReadContract, LotteryWriteContract, ReadOnly,
    ReadWrite,
};
pub use error::*;
pub use ledger::*;
