//! Gravita collateral snapshot and the pending-inclusive vessel view.

pub mod fetch;
pub mod hints;

use alloy::primitives::{Address, U256};

use crate::actions::{ActionList, ActionType, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VesselStatus {
    #[default]
    None,
    Active,
}

impl VesselStatus {
    /// Map the vessel manager's status code. Anything but 1 counts as no open vessel.
    pub fn from_code(code: U256) -> Self {
        if code == U256::from(1u8) {
            VesselStatus::Active
        } else {
            VesselStatus::None
        }
    }
}

/// Last confirmed on-chain vessel state, the baseline pending actions replay on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreData {
    pub status: VesselStatus,
    pub collateral: U256,
    pub debt: U256,
}

/// Per-collateral read model.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CollateralInfo {
    pub address: Address,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
    pub balance_of: U256,
    pub balance_of_proxy: U256,
    pub mint_cap: U256,
    pub min_net_debt: U256,
    pub total_asset_debt: U256,
    pub is_active: bool,
    pub min_collateral_ratio: U256,
    pub critical_collateral_ratio: U256,
    pub price_feed: Address,
    pub price: U256,
    pub price_decimals: u8,
    pub is_price_eth_indexed: bool,

    pub vessel_status: VesselStatus,
    pub vessel_collateral: U256,
    pub vessel_debt: U256,
    pub restore_data: RestoreData,
}

impl CollateralInfo {
    pub fn token(&self) -> Token {
        Token::new(self.address, self.symbol.clone(), self.decimals)
    }

    pub fn has_vessel(&self) -> bool {
        self.vessel_status == VesselStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveVessel {
    pub address: Address,
    pub has_vessel: bool,
}

/// The current Gravita snapshot. Replaced wholesale on refresh; only the
/// vessel fields are rewritten between refreshes.
#[derive(Debug, Clone, Default)]
pub struct GravitaState {
    collaterals: Vec<CollateralInfo>,
}

impl GravitaState {
    pub fn new(collaterals: Vec<CollateralInfo>) -> Self {
        GravitaState { collaterals }
    }

    pub fn collaterals(&self) -> &[CollateralInfo] {
        &self.collaterals
    }

    pub fn collateral(&self, address: Address) -> Option<&CollateralInfo> {
        self.collaterals.iter().find(|c| c.address == address)
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&CollateralInfo> {
        self.collaterals
            .iter()
            .find(|c| c.symbol.eq_ignore_ascii_case(symbol))
    }

    pub fn replace(&mut self, collaterals: Vec<CollateralInfo>) {
        self.collaterals = collaterals;
    }

    pub fn clear(&mut self) {
        self.collaterals.clear();
    }

    /// Preview an open/adjust: the vessel becomes active at the given absolute amounts.
    pub fn adjust_vessel(&mut self, collateral: Address, collateral_amount: U256, debt_amount: U256) {
        if let Some(info) = self.collaterals.iter_mut().find(|c| c.address == collateral) {
            info.vessel_status = VesselStatus::Active;
            info.vessel_collateral = collateral_amount;
            info.vessel_debt = debt_amount;
        }
    }

    pub fn close_vessel(&mut self, collateral: Address) {
        if let Some(info) = self.collaterals.iter_mut().find(|c| c.address == collateral) {
            info.vessel_status = VesselStatus::None;
            info.vessel_collateral = U256::ZERO;
            info.vessel_debt = U256::ZERO;
        }
    }

    /// Rebuild the vessel view from the last on-chain baseline plus pending
    /// actions: opens, then adjusts, then closes.
    pub fn recalculate(&mut self, actions: &ActionList) {
        for info in &mut self.collaterals {
            info.vessel_status = info.restore_data.status;
            info.vessel_collateral = info.restore_data.collateral;
            info.vessel_debt = info.restore_data.debt;
        }

        for kind in [ActionType::GravitaOpen, ActionType::GravitaAdjust] {
            for target in actions
                .iter()
                .filter(|a| a.action_type == kind)
                .filter_map(|a| a.vessel_target())
            {
                self.adjust_vessel(target.collateral, target.collateral_amount, target.debt_amount);
            }
        }

        for target in actions
            .iter()
            .filter(|a| a.action_type == ActionType::GravitaClose)
            .filter_map(|a| a.vessel_target())
        {
            self.close_vessel(target.collateral);
        }
    }

    /// Pending opens first, then every known collateral with its vessel flag.
    pub fn active_vessels(&self, actions: &ActionList) -> Vec<ActiveVessel> {
        actions
            .iter()
            .filter(|a| a.action_type == ActionType::GravitaOpen)
            .filter_map(|a| a.vessel_target())
            .map(|t| ActiveVessel {
                address: t.collateral,
                has_vessel: true,
            })
            .chain(self.collaterals.iter().map(|c| ActiveVessel {
                address: c.address,
                has_vessel: c.has_vessel(),
            }))
            .collect()
    }
}
