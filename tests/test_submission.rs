mod common;

use alloy::primitives::{Address, I256, U256};
use alloy::sol_types::{SolCall, SolValue};

use common::{addr, units};
use petalex::abi::IActionExecutor;
use petalex::actions::build;
use petalex::actions::{ActionList, ActionType, Allowances, FlashLoanSlot, Location, Token};

fn usdc() -> Token {
    Token::new(addr(0x0c), "USDC", 6)
}

fn weth() -> Token {
    Token::new(addr(0x0e), "WETH", 18)
}

fn lender() -> Address {
    addr(0xba)
}

// ── Assemble ────────────────────────────────────────────────────────

#[test]
fn assemble_repays_each_flash_leg_with_a_send() {
    let slot = FlashLoanSlot::new();
    let mut list = ActionList::new();
    list.subscribe(slot.clone());

    list.push(build::pull(&Token::native(), units(1, 18))).unwrap();
    list.push(build::wrap(&weth(), units(1, 18))).unwrap();
    list.push(build::pull(&usdc(), units(500, 6))).unwrap();

    let legs = [(weth(), units(3, 18)), (usdc(), units(1000, 6))];
    let (borrow, repay) = build::flash_loan(lender(), &legs, slot.reserve().unwrap()).unwrap();
    list.insert_flash_loan(borrow, repay).unwrap();

    let kinds: Vec<ActionType> = list.iter().map(|a| a.action_type).collect();
    assert_eq!(
        kinds,
        [
            ActionType::Flash,
            ActionType::Pull,
            ActionType::Wrap,
            ActionType::Pull,
            ActionType::FlashReturn
        ]
    );

    let sub = list.assemble(U256::from(42u64));
    // borrow, wrap, usdc pull, then one send per leg
    assert_eq!(sub.action_ids, vec![2, 14, 3, 1, 1]);
    assert_eq!(sub.calldata.len(), 5);
    assert_eq!(sub.value, units(1, 18));
    assert_eq!(sub.position_id, U256::from(42u64));

    let send_weth = (weth().address, lender(), units(3, 18)).abi_encode_params();
    let send_usdc = (usdc().address, lender(), units(1000, 6)).abi_encode_params();
    assert_eq!(sub.calldata[3].as_ref(), send_weth.as_slice());
    assert_eq!(sub.calldata[4].as_ref(), send_usdc.as_slice());
}

#[test]
fn assemble_skips_zero_flash_legs() {
    let slot = FlashLoanSlot::new();
    let mut list = ActionList::new();
    list.push(build::pull(&usdc(), units(5, 6))).unwrap();
    let legs = [(weth(), units(2, 18)), (usdc(), U256::ZERO)];
    let (borrow, repay) = build::flash_loan(lender(), &legs, slot.reserve().unwrap()).unwrap();
    list.insert_flash_loan(borrow, repay).unwrap();

    let sub = list.assemble(U256::from(1u64));
    assert_eq!(sub.action_ids, vec![2, 3, 1]);
}

#[test]
fn encoded_submission_round_trips_through_executor_abi() {
    let mut list = ActionList::new();
    list.push(build::pull(&usdc(), units(5, 6))).unwrap();
    let sub = list.assemble(U256::from(9u64));

    let decoded = IActionExecutor::executeActionsCall::abi_decode(&sub.encode()).unwrap();
    assert_eq!(decoded.tokenId, U256::from(9u64));
    assert_eq!(decoded.actionIds, vec![3u8]);
    assert_eq!(decoded.actionData, sub.calldata);
}

#[test]
fn only_native_pulls_cannot_execute() {
    let mut list = ActionList::new();
    assert!(!list.can_execute());
    list.push(build::pull(&Token::native(), units(1, 18))).unwrap();
    assert!(!list.can_execute());
    list.push(build::wrap(&weth(), units(1, 18))).unwrap();
    assert!(list.can_execute());
}

// ── Approvals ───────────────────────────────────────────────────────

#[test]
fn equal_allowance_does_not_need_approval() {
    let mut list = ActionList::new();
    list.push(build::pull(&usdc(), units(100, 6))).unwrap();

    let mut allowances = Allowances::default();
    assert_eq!(list.next_unapproved_token(&allowances), Some(usdc().address));

    allowances.set(usdc().address, units(100, 6) - U256::from(1u64));
    assert!(list.needs_approval(&allowances));

    allowances.set(usdc().address, units(100, 6));
    assert!(!list.needs_approval(&allowances));
}

#[test]
fn approval_considers_summed_pulls_and_ignores_native() {
    let mut list = ActionList::new();
    list.push(build::pull(&Token::native(), units(5, 18))).unwrap();
    list.push(build::pull(&usdc(), units(60, 6))).unwrap();
    list.push(build::pull(&weth(), units(1, 18))).unwrap();
    list.push(build::pull(&usdc(), units(60, 6))).unwrap();

    let mut allowances = Allowances::default();
    allowances.set(usdc().address, units(100, 6));
    // 120 USDC requested in total, only 100 approved
    assert_eq!(list.next_unapproved_token(&allowances), Some(usdc().address));

    allowances.set(usdc().address, units(120, 6));
    assert_eq!(list.next_unapproved_token(&allowances), Some(weth().address));

    allowances.set(weth().address, U256::MAX);
    assert_eq!(list.next_unapproved_token(&allowances), None);
}

// ── Aggregation ─────────────────────────────────────────────────────

#[test]
fn aggregate_totals_ignore_order_but_calldata_does_not() {
    let user = addr(0x11);
    let steps = || {
        vec![
            build::pull(&usdc(), units(100, 6)),
            build::send(&usdc(), units(40, 6), user, user),
            build::pull(&weth(), units(2, 18)),
        ]
    };

    let mut forward = ActionList::new();
    for a in steps() {
        forward.push(a).unwrap();
    }
    let mut reversed = ActionList::new();
    for a in steps().into_iter().rev() {
        reversed.push(a).unwrap();
    }

    let totals = |list: &ActionList| {
        let mut t: Vec<(String, Location, I256)> = list
            .aggregate_balances()
            .into_iter()
            .map(|c| (c.symbol, c.location, c.amount))
            .collect();
        t.sort_by(|a, b| (a.0.as_str(), a.1 as u8).cmp(&(b.0.as_str(), b.1 as u8)));
        t
    };
    assert_eq!(totals(&forward), totals(&reversed));

    let usdc_user = forward
        .aggregate_balances()
        .into_iter()
        .find(|c| c.symbol == "USDC" && c.location == Location::UserWallet)
        .unwrap();
    assert_eq!(usdc_user.amount, I256::try_from(-60_000_000i64).unwrap());

    assert_ne!(
        forward.assemble(U256::ZERO).calldata,
        reversed.assemble(U256::ZERO).calldata
    );
}
