//! Pending operations and the ordered list that batches them into one
//! executor transaction.

pub mod build;
mod list;
mod submission;

use alloy::primitives::{Address, Bytes, I256, U256};

pub use list::{ActionList, ActionObserver, FlashLoanSlot, ReservationId};
pub use submission::{Allowances, Submission};

use crate::network::NATIVE_TOKEN;

// ── Action types ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    GravitaOpen,
    GravitaClose,
    GravitaAdjust,
    LiquityOpen,
    LiquityClose,
    LiquityAdjust,
    UniswapV3ExactInput,
    Flash,
    FlashReturn,
    Pull,
    Send,
    Wrap,
    Unwrap,
}

impl ActionType {
    /// Identifier the executor contract dispatches on.
    pub fn contract_id(&self) -> u8 {
        match self {
            ActionType::Send => 1,
            ActionType::Flash | ActionType::FlashReturn => 2,
            ActionType::Pull => 3,
            ActionType::UniswapV3ExactInput => 4,
            ActionType::GravitaOpen => 5,
            ActionType::GravitaAdjust => 6,
            ActionType::GravitaClose => 7,
            ActionType::LiquityOpen => 9,
            ActionType::LiquityAdjust => 10,
            ActionType::LiquityClose => 11,
            ActionType::Wrap => 14,
            ActionType::Unwrap => 15,
        }
    }

    pub fn is_flash(&self) -> bool {
        matches!(self, ActionType::Flash | ActionType::FlashReturn)
    }
}

// ── Balance changes ─────────────────────────────────────────────────

/// Where a projected balance change lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    ProxyWallet,
    UserWallet,
}

/// Projected effect of an action on one asset at one location, in base units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceChange {
    pub symbol: String,
    pub address: Address,
    pub decimals: u8,
    pub amount: I256,
    pub location: Location,
}

/// Minimal token descriptor the builders need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl Token {
    pub fn new(address: Address, symbol: impl Into<String>, decimals: u8) -> Self {
        Token {
            address,
            symbol: symbol.into(),
            decimals,
        }
    }

    /// The native currency, addressed by the sentinel.
    pub fn native() -> Self {
        Token::new(NATIVE_TOKEN, "ETH", 18)
    }

    pub fn is_native(&self) -> bool {
        self.address == NATIVE_TOKEN
    }

    pub fn change(&self, amount: I256, location: Location) -> BalanceChange {
        BalanceChange {
            symbol: self.symbol.clone(),
            address: self.address,
            decimals: self.decimals,
            amount,
            location,
        }
    }
}

// ── Structured side-channel data ────────────────────────────────────

/// Target vessel state after an open/adjust/close step. Absolute, not a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VesselTarget {
    pub collateral: Address,
    pub collateral_amount: U256,
    pub debt_amount: U256,
}

/// One borrowed asset of a flash loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLeg {
    pub token: Address,
    pub amount: U256,
}

/// A flash loan of up to two assets from `lender`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashLoan {
    pub lender: Address,
    pub legs: [Option<FlashLeg>; 2],
}

impl FlashLoan {
    /// Legs with a nonzero amount, in slot order.
    pub fn active_legs(&self) -> impl Iterator<Item = &FlashLeg> {
        self.legs.iter().flatten().filter(|l| !l.amount.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ActionData {
    #[default]
    None,
    /// Token movement (pull, send, wrap, unwrap).
    Token { token: Address, amount: U256 },
    Vessel(VesselTarget),
    Flash(FlashLoan),
}

// ── Action ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Action {
    pub action_type: ActionType,
    pub display_name: String,
    /// ABI-encoded arguments handed to the executor for this step.
    pub calldata: Bytes,
    /// Native currency attached to the transaction for this step.
    pub value: Option<U256>,
    pub balance_changes: Vec<BalanceChange>,
    pub data: ActionData,
    /// Resource held on behalf of this action, released on removal.
    pub reservation: Option<ReservationId>,
}

impl Action {
    pub fn new(action_type: ActionType, display_name: impl Into<String>, calldata: Bytes) -> Self {
        Action {
            action_type,
            display_name: display_name.into(),
            calldata,
            value: None,
            balance_changes: Vec::new(),
            data: ActionData::None,
            reservation: None,
        }
    }

    pub fn with_value(mut self, value: U256) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_changes(mut self, changes: Vec<BalanceChange>) -> Self {
        self.balance_changes = changes;
        self
    }

    pub fn with_data(mut self, data: ActionData) -> Self {
        self.data = data;
        self
    }

    pub fn with_reservation(mut self, reservation: ReservationId) -> Self {
        self.reservation = Some(reservation);
        self
    }

    /// A pull of the native currency, carried as transaction value instead of calldata.
    pub fn is_native_pull(&self) -> bool {
        self.action_type == ActionType::Pull
            && matches!(self.data, ActionData::Token { token, .. } if token == NATIVE_TOKEN)
    }

    pub fn vessel_target(&self) -> Option<&VesselTarget> {
        match &self.data {
            ActionData::Vessel(target) => Some(target),
            _ => None,
        }
    }

    pub fn flash_loan(&self) -> Option<&FlashLoan> {
        match &self.data {
            ActionData::Flash(loan) => Some(loan),
            _ => None,
        }
    }
}
