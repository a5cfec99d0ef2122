//! Constructors for every step the executor understands.
//!
//! Each builder produces the executor calldata, the projected balance
//! changes and the structured data downstream consumers inspect.

use alloy::primitives::{Address, Bytes, I256, U256};
use alloy::sol_types::SolValue;

use crate::error::{Error, Result};

use super::{
    Action, ActionData, ActionType, BalanceChange, FlashLeg, FlashLoan, Location, ReservationId,
    Token, VesselTarget,
};

/// Neighbour positions in a sorted vessel/trove list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hints {
    pub upper: Address,
    pub lower: Address,
}

fn signed(amount: U256) -> I256 {
    I256::try_from(amount).unwrap_or(I256::MAX)
}

fn delta(from: U256, to: U256) -> I256 {
    signed(to) - signed(from)
}

// ── Token movement ──────────────────────────────────────────────────

/// Move tokens from the user wallet into the proxy. Native pulls travel as value.
pub fn pull(token: &Token, amount: U256) -> Action {
    let action = Action::new(
        ActionType::Pull,
        format!("Pull {}", token.symbol),
        (token.address, amount).abi_encode_params().into(),
    )
    .with_changes(vec![
        token.change(-signed(amount), Location::UserWallet),
        token.change(signed(amount), Location::ProxyWallet),
    ])
    .with_data(ActionData::Token {
        token: token.address,
        amount,
    });

    if token.is_native() {
        action.with_value(amount)
    } else {
        action
    }
}

/// Send tokens out of the proxy to `recipient`.
pub fn send(token: &Token, amount: U256, recipient: Address, user_wallet: Address) -> Action {
    let mut changes = vec![token.change(-signed(amount), Location::ProxyWallet)];
    if recipient == user_wallet {
        changes.push(token.change(signed(amount), Location::UserWallet));
    }
    Action::new(
        ActionType::Send,
        format!("Send {}", token.symbol),
        (token.address, recipient, amount).abi_encode_params().into(),
    )
    .with_changes(changes)
    .with_data(ActionData::Token {
        token: token.address,
        amount,
    })
}

pub fn wrap(weth: &Token, amount: U256) -> Action {
    Action::new(ActionType::Wrap, "Wrap ETH", amount.abi_encode().into())
        .with_changes(vec![
            Token::native().change(-signed(amount), Location::ProxyWallet),
            weth.change(signed(amount), Location::ProxyWallet),
        ])
        .with_data(ActionData::Token {
            token: weth.address,
            amount,
        })
}

pub fn unwrap(weth: &Token, amount: U256) -> Action {
    Action::new(ActionType::Unwrap, "Unwrap WETH", amount.abi_encode().into())
        .with_changes(vec![
            weth.change(-signed(amount), Location::ProxyWallet),
            Token::native().change(signed(amount), Location::ProxyWallet),
        ])
        .with_data(ActionData::Token {
            token: weth.address,
            amount,
        })
}

// ── Swaps ───────────────────────────────────────────────────────────

/// Uniswap V3 exact-input swap along a packed path. The projected output is
/// the minimum accepted.
pub fn swap_exact_input(
    token_in: &Token,
    token_out: &Token,
    path: Bytes,
    amount_in: U256,
    min_amount_out: U256,
) -> Action {
    Action::new(
        ActionType::UniswapV3ExactInput,
        format!("Swap {} for {}", token_in.symbol, token_out.symbol),
        (path, amount_in, min_amount_out).abi_encode_params().into(),
    )
    .with_changes(vec![
        token_in.change(-signed(amount_in), Location::ProxyWallet),
        token_out.change(signed(min_amount_out), Location::ProxyWallet),
    ])
}

// ── Flash loans ─────────────────────────────────────────────────────

/// Most assets a single flash loan can borrow.
pub const MAX_FLASH_LEGS: usize = 2;

/// Borrow and repayment steps for a flash loan of one or two assets.
/// Both halves carry `reservation` so removing either releases it.
pub fn flash_loan(
    lender: Address,
    legs: &[(Token, U256)],
    reservation: ReservationId,
) -> Result<(Action, Action)> {
    if legs.is_empty() || legs.len() > MAX_FLASH_LEGS {
        return Err(Error::FlashLoanLegs(legs.len()));
    }
    let mut slots: [Option<FlashLeg>; 2] = [None, None];
    for (slot, (token, amount)) in slots.iter_mut().zip(legs) {
        *slot = Some(FlashLeg {
            token: token.address,
            amount: *amount,
        });
    }
    let loan = FlashLoan { lender, legs: slots };

    let leg = |i: usize| slots[i].unwrap_or(FlashLeg {
        token: Address::ZERO,
        amount: U256::ZERO,
    });
    let calldata: Bytes = (lender, leg(0).token, leg(0).amount, leg(1).token, leg(1).amount)
        .abi_encode_params()
        .into();

    let symbols: Vec<&str> = legs.iter().map(|(t, _)| t.symbol.as_str()).collect();
    let borrow_changes: Vec<BalanceChange> = legs
        .iter()
        .map(|(t, a)| t.change(signed(*a), Location::ProxyWallet))
        .collect();
    let repay_changes: Vec<BalanceChange> = legs
        .iter()
        .map(|(t, a)| t.change(-signed(*a), Location::ProxyWallet))
        .collect();

    let borrow = Action::new(
        ActionType::Flash,
        format!("Flash loan {}", symbols.join(" + ")),
        calldata,
    )
    .with_changes(borrow_changes)
    .with_data(ActionData::Flash(loan))
    .with_reservation(reservation);

    let repay = Action::new(
        ActionType::FlashReturn,
        format!("Repay flash loan {}", symbols.join(" + ")),
        Bytes::new(),
    )
    .with_changes(repay_changes)
    .with_data(ActionData::Flash(loan))
    .with_reservation(reservation);

    Ok((borrow, repay))
}

// ── Gravita ─────────────────────────────────────────────────────────

pub fn gravita_open(
    collateral: &Token,
    debt_token: &Token,
    collateral_amount: U256,
    debt_amount: U256,
    hints: Hints,
) -> Action {
    Action::new(
        ActionType::GravitaOpen,
        format!("Open {} vessel", collateral.symbol),
        (collateral.address, collateral_amount, debt_amount, hints.upper, hints.lower)
            .abi_encode_params()
            .into(),
    )
    .with_changes(vec![
        collateral.change(-signed(collateral_amount), Location::ProxyWallet),
        debt_token.change(signed(debt_amount), Location::ProxyWallet),
    ])
    .with_data(ActionData::Vessel(VesselTarget {
        collateral: collateral.address,
        collateral_amount,
        debt_amount,
    }))
}

/// Move an existing vessel from `current` to `target` (collateral, debt).
pub fn gravita_adjust(
    collateral: &Token,
    debt_token: &Token,
    current: (U256, U256),
    target: (U256, U256),
    hints: Hints,
) -> Action {
    let (deposit, withdrawal) = split(current.0, target.0);
    let (debt_increase, debt_repay) = split(current.1, target.1);
    let is_debt_increase = !debt_increase.is_zero();
    let debt_change = if is_debt_increase { debt_increase } else { debt_repay };

    Action::new(
        ActionType::GravitaAdjust,
        format!("Adjust {} vessel", collateral.symbol),
        (
            collateral.address,
            deposit,
            withdrawal,
            debt_change,
            is_debt_increase,
            hints.upper,
            hints.lower,
        )
            .abi_encode_params()
            .into(),
    )
    .with_changes(vec![
        collateral.change(-delta(current.0, target.0), Location::ProxyWallet),
        debt_token.change(delta(current.1, target.1), Location::ProxyWallet),
    ])
    .with_data(ActionData::Vessel(VesselTarget {
        collateral: collateral.address,
        collateral_amount: target.0,
        debt_amount: target.1,
    }))
}

/// Close a vessel currently holding `collateral_amount` against `debt_amount`.
pub fn gravita_close(
    collateral: &Token,
    debt_token: &Token,
    collateral_amount: U256,
    debt_amount: U256,
) -> Action {
    Action::new(
        ActionType::GravitaClose,
        format!("Close {} vessel", collateral.symbol),
        collateral.address.abi_encode().into(),
    )
    .with_changes(vec![
        collateral.change(signed(collateral_amount), Location::ProxyWallet),
        debt_token.change(-signed(debt_amount), Location::ProxyWallet),
    ])
    .with_data(ActionData::Vessel(VesselTarget {
        collateral: collateral.address,
        collateral_amount: U256::ZERO,
        debt_amount: U256::ZERO,
    }))
}

// ── Liquity ─────────────────────────────────────────────────────────

pub fn liquity_open(
    debt_token: &Token,
    collateral_amount: U256,
    debt_amount: U256,
    max_fee: U256,
    hints: Hints,
) -> Action {
    let eth = Token::native();
    Action::new(
        ActionType::LiquityOpen,
        "Open Liquity trove",
        (max_fee, collateral_amount, debt_amount, hints.upper, hints.lower)
            .abi_encode_params()
            .into(),
    )
    .with_changes(vec![
        eth.change(-signed(collateral_amount), Location::ProxyWallet),
        debt_token.change(signed(debt_amount), Location::ProxyWallet),
    ])
    .with_data(ActionData::Vessel(VesselTarget {
        collateral: eth.address,
        collateral_amount,
        debt_amount,
    }))
}

pub fn liquity_adjust(
    debt_token: &Token,
    current: (U256, U256),
    target: (U256, U256),
    max_fee: U256,
    hints: Hints,
) -> Action {
    let eth = Token::native();
    let (deposit, withdrawal) = split(current.0, target.0);
    let (debt_increase, debt_repay) = split(current.1, target.1);
    let is_debt_increase = !debt_increase.is_zero();
    let debt_change = if is_debt_increase { debt_increase } else { debt_repay };

    Action::new(
        ActionType::LiquityAdjust,
        "Adjust Liquity trove",
        (
            max_fee,
            withdrawal,
            debt_change,
            is_debt_increase,
            deposit,
            hints.upper,
            hints.lower,
        )
            .abi_encode_params()
            .into(),
    )
    .with_changes(vec![
        eth.change(-delta(current.0, target.0), Location::ProxyWallet),
        debt_token.change(delta(current.1, target.1), Location::ProxyWallet),
    ])
    .with_data(ActionData::Vessel(VesselTarget {
        collateral: eth.address,
        collateral_amount: target.0,
        debt_amount: target.1,
    }))
}

pub fn liquity_close(debt_token: &Token, collateral_amount: U256, debt_amount: U256) -> Action {
    let eth = Token::native();
    Action::new(ActionType::LiquityClose, "Close Liquity trove", Bytes::new())
        .with_changes(vec![
            eth.change(signed(collateral_amount), Location::ProxyWallet),
            debt_token.change(-signed(debt_amount), Location::ProxyWallet),
        ])
        .with_data(ActionData::Vessel(VesselTarget {
            collateral: eth.address,
            collateral_amount: U256::ZERO,
            debt_amount: U256::ZERO,
        }))
}

/// (increase, decrease) needed to go from `from` to `to`; at most one is nonzero.
fn split(from: U256, to: U256) -> (U256, U256) {
    if to >= from {
        (to - from, U256::ZERO)
    } else {
        (U256::ZERO, from - to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::NATIVE_TOKEN;

    fn usdc() -> Token {
        Token::new(Address::repeat_byte(0x01), "USDC", 6)
    }

    #[test]
    fn native_pull_carries_value() {
        let a = pull(&Token::native(), U256::from(5u64));
        assert_eq!(a.value, Some(U256::from(5u64)));
        assert!(a.is_native_pull());

        let b = pull(&usdc(), U256::from(5u64));
        assert_eq!(b.value, None);
        assert!(!b.is_native_pull());
        assert_eq!(b.balance_changes[0].location, Location::UserWallet);
        assert_eq!(b.balance_changes[0].amount, I256::try_from(-5i64).unwrap());
    }

    #[test]
    fn send_to_user_credits_wallet() {
        let user = Address::repeat_byte(0x42);
        assert_eq!(send(&usdc(), U256::from(1u64), user, user).balance_changes.len(), 2);
        assert_eq!(
            send(&usdc(), U256::from(1u64), Address::repeat_byte(0x43), user)
                .balance_changes
                .len(),
            1
        );
    }

    #[test]
    fn adjust_encodes_direction() {
        let weth = Token::new(Address::repeat_byte(0x02), "WETH", 18);
        let grai = Token::new(Address::repeat_byte(0x03), "GRAI", 18);
        let a = gravita_adjust(
            &weth,
            &grai,
            (U256::from(10u64), U256::from(100u64)),
            (U256::from(7u64), U256::from(150u64)),
            Hints::default(),
        );
        let expected = (
            weth.address,
            U256::ZERO,
            U256::from(3u64),
            U256::from(50u64),
            true,
            Address::ZERO,
            Address::ZERO,
        )
            .abi_encode_params();
        assert_eq!(a.calldata.as_ref(), expected.as_slice());
        assert_eq!(a.balance_changes[0].amount, I256::try_from(3i64).unwrap());
        assert_eq!(a.balance_changes[1].amount, I256::try_from(50i64).unwrap());
        assert_eq!(a.vessel_target().unwrap().collateral_amount, U256::from(7u64));
    }

    #[test]
    fn flash_pair_shares_loan_and_reservation() {
        let weth = Token::new(Address::repeat_byte(0x02), "WETH", 18);
        let lender = Address::repeat_byte(0xba);
        let (borrow, repay) = flash_loan(
            lender,
            &[(weth.clone(), U256::from(9u64))],
            ReservationId(7),
        )
        .unwrap();
        assert_eq!(borrow.flash_loan(), repay.flash_loan());
        let loan = repay.flash_loan().unwrap();
        assert_eq!(loan.lender, lender);
        assert_eq!(loan.active_legs().count(), 1);
        assert_eq!(repay.reservation, Some(ReservationId(7)));
        assert_eq!(borrow.display_name, "Flash loan WETH");
        assert_ne!(weth.address, NATIVE_TOKEN);
    }

    #[test]
    fn flash_loan_takes_one_or_two_assets() {
        let token = |b: u8| Token::new(Address::repeat_byte(b), "T", 18);
        let lender = Address::repeat_byte(0xba);
        let three = [
            (token(1), U256::from(1u64)),
            (token(2), U256::from(2u64)),
            (token(3), U256::from(3u64)),
        ];
        assert!(matches!(
            flash_loan(lender, &three, ReservationId(1)),
            Err(Error::FlashLoanLegs(3))
        ));
        assert!(matches!(
            flash_loan(lender, &[], ReservationId(1)),
            Err(Error::FlashLoanLegs(0))
        ));

        let (borrow, _) = flash_loan(lender, &three[..2], ReservationId(1)).unwrap();
        assert_eq!(borrow.balance_changes.len(), 2);
        assert_eq!(borrow.flash_loan().unwrap().active_legs().count(), 2);
    }
}
