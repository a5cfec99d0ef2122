use std::collections::HashMap;

use alloy::primitives::{Address, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

use super::{Action, ActionData, ActionList, ActionType, BalanceChange};
use crate::abi::IActionExecutor;

/// Known ERC-20 allowances from the user wallet to the active proxy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowances {
    inner: HashMap<Address, U256>,
}

impl Allowances {
    pub fn get(&self, token: Address) -> U256 {
        self.inner.get(&token).copied().unwrap_or(U256::ZERO)
    }

    pub fn set(&mut self, token: Address, amount: U256) {
        self.inner.insert(token, amount);
    }

    pub fn replace(&mut self, entries: impl IntoIterator<Item = (Address, U256)>) {
        self.inner = entries.into_iter().collect();
    }
}

/// Final arguments for the executor call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub position_id: U256,
    pub action_ids: Vec<u8>,
    pub calldata: Vec<Bytes>,
    pub value: U256,
}

impl Submission {
    /// Encoded `executeActions` call for the executor contract.
    pub fn encode(&self) -> Bytes {
        IActionExecutor::executeActionsCall {
            tokenId: self.position_id,
            actionIds: self.action_ids.clone(),
            actionData: self.calldata.clone(),
        }
        .abi_encode()
        .into()
    }
}

impl ActionList {
    /// One entry per (symbol, location), summed across the list in first-seen order.
    pub fn aggregate_balances(&self) -> Vec<BalanceChange> {
        let mut out: Vec<BalanceChange> = Vec::new();
        for change in self.iter().flat_map(|a| a.balance_changes.iter()) {
            match out
                .iter_mut()
                .find(|c| c.symbol == change.symbol && c.location == change.location)
            {
                Some(existing) => existing.amount += change.amount,
                None => out.push(change.clone()),
            }
        }
        out
    }

    /// Requested amount per non-native pulled token, in first-seen order.
    pub fn pull_requirements(&self) -> Vec<(Address, U256)> {
        let mut out: Vec<(Address, U256)> = Vec::new();
        for action in self.iter() {
            if action.action_type != ActionType::Pull || action.is_native_pull() {
                continue;
            }
            let ActionData::Token { token, amount } = action.data else {
                continue;
            };
            match out.iter_mut().find(|(t, _)| *t == token) {
                Some((_, total)) => *total += amount,
                None => out.push((token, amount)),
            }
        }
        out
    }

    /// First pulled token whose requested amount exceeds the known allowance.
    pub fn next_unapproved_token(&self, allowances: &Allowances) -> Option<Address> {
        self.pull_requirements()
            .into_iter()
            .find(|(token, amount)| *amount > allowances.get(*token))
            .map(|(token, _)| token)
    }

    pub fn needs_approval(&self, allowances: &Allowances) -> bool {
        self.next_unapproved_token(allowances).is_some()
    }

    /// Whether anything would reach the executor as calldata.
    pub fn can_execute(&self) -> bool {
        self.iter().any(is_calldata_step)
    }

    /// Total native currency to attach to the transaction.
    pub fn total_value(&self) -> U256 {
        self.iter().filter_map(|a| a.value).fold(U256::ZERO, |acc, v| acc + v)
    }

    /// Build the executor arguments.
    ///
    /// Native pulls ride on the transaction value and the flash return is
    /// replaced by one `Send` back to the lender per borrowed asset, appended
    /// after every user step.
    pub fn assemble(&self, position_id: U256) -> Submission {
        let value = self.total_value();

        let mut steps: Vec<Action> = self.iter().filter(|a| is_calldata_step(a)).cloned().collect();
        if let Some(loan) = self.flash_return().and_then(|a| a.flash_loan()) {
            for leg in loan.active_legs() {
                let calldata = (leg.token, loan.lender, leg.amount).abi_encode_params();
                steps.push(Action::new(ActionType::Send, "Repay flash loan", calldata.into()));
            }
        }

        Submission {
            position_id,
            action_ids: steps.iter().map(|a| a.action_type.contract_id()).collect(),
            calldata: steps.into_iter().map(|a| a.calldata).collect(),
            value,
        }
    }
}

fn is_calldata_step(action: &Action) -> bool {
    !action.is_native_pull() && action.action_type != ActionType::FlashReturn
}
