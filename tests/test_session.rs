mod common;

use alloy::primitives::{Address, U256};
use alloy::sol_types::SolCall;

use common::{MockChain, addr, ret, units};
use petalex::Error;
use petalex::abi::{IActionExecutor, IERC20};
use petalex::actions::{ActionType, Token, build};
use petalex::network::{AddressBook, Contract, Network};
use petalex::session::Session;

const ACCOUNT: u8 = 0xa1;
const PROXY: u8 = 0xb2;

fn usdc() -> Token {
    Token::new(addr(0x0c), "USDC", 6)
}

fn dai() -> Token {
    Token::new(addr(0x0d), "DAI", 18)
}

fn book() -> AddressBook {
    let mut book = AddressBook::for_network(Network::Goerli);
    book.set(Contract::ActionExecutor, addr(0xee));
    book.set(Contract::FlashLender, addr(0xba));
    book
}

fn session(chain: MockChain) -> Session<MockChain> {
    let mut s = Session::connect(chain, book(), addr(ACCOUNT));
    s.select_position(U256::from(7u64), addr(PROXY));
    s
}

// ── Preconditions ───────────────────────────────────────────────────

#[tokio::test]
async fn no_position_means_no_approval_and_no_execution() {
    let mut s = Session::connect(MockChain::new(), book(), addr(ACCOUNT));
    s.push_action(build::pull(&usdc(), units(10, 6))).unwrap();

    assert!(!s.needs_approval());
    assert_eq!(s.next_unapproved_token(), None);
    assert!(s.assemble_submission().is_none());
    assert_eq!(s.execute().await.unwrap(), None);
    assert_eq!(s.approve_next_token().await.unwrap(), None);
    assert!(s.client().sent().is_empty());
}

#[tokio::test]
async fn disconnect_clears_everything() {
    let mut s = session(MockChain::new());
    s.push_action(build::pull(&usdc(), units(10, 6))).unwrap();
    s.add_flash_loan(&[(usdc(), units(1, 6))]).unwrap();
    assert_eq!(s.actions().len(), 3);

    s.disconnect();
    assert!(s.actions().is_empty());
    assert_eq!(s.account(), None);
    assert!(!s.needs_approval());
    assert_eq!(s.execute().await.unwrap(), None);
}

#[tokio::test]
async fn reconnect_resumes_with_a_fresh_flash_slot() {
    let mut s = session(MockChain::new());
    s.add_flash_loan(&[(usdc(), units(1, 6))]).unwrap();
    s.disconnect();

    s.reconnect(addr(ACCOUNT));
    assert_eq!(s.account(), Some(addr(ACCOUNT)));
    assert_eq!(s.position(), None);
    s.select_position(U256::from(7u64), addr(PROXY));

    s.push_action(build::pull(&usdc(), units(10, 6))).unwrap();
    s.add_flash_loan(&[(usdc(), units(1, 6))]).unwrap();
    assert!(s.assemble_submission().is_some());
    let tx = s.execute().await.unwrap();
    assert!(tx.is_some());
    assert_eq!(s.client().sent().len(), 1);
}

// ── Approvals ───────────────────────────────────────────────────────

#[tokio::test]
async fn refresh_reads_allowances_then_approves_in_order() {
    let mut chain = MockChain::new();
    chain
        .returns::<IERC20::allowanceCall>(usdc().address, ret(units(100, 6)))
        .on::<IERC20::allowanceCall, _>(dai().address, |call| {
            assert_eq!(call.owner, addr(ACCOUNT));
            assert_eq!(call.spender, addr(PROXY));
            Some(ret(U256::ZERO))
        });
    let mut s = session(chain);
    s.push_action(build::pull(&usdc(), units(100, 6))).unwrap();
    s.push_action(build::pull(&dai(), units(5, 18))).unwrap();

    // nothing known yet: first pulled token is unapproved
    assert_eq!(s.next_unapproved_token(), Some(usdc().address));

    s.refresh_allowances().await.unwrap();
    assert_eq!(s.allowances().get(usdc().address), units(100, 6));
    assert_eq!(s.next_unapproved_token(), Some(dai().address));

    let tx = s.approve_next_token().await.unwrap();
    assert!(tx.is_some());
    assert!(!s.needs_approval());
    assert_eq!(s.approve_next_token().await.unwrap(), None);

    let sent = s.client().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, dai().address);
    let approve = IERC20::approveCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(approve.spender, addr(PROXY));
    assert_eq!(approve.amount, U256::MAX);
}

#[tokio::test]
async fn failed_allowance_read_is_an_error() {
    let mut chain = MockChain::new();
    chain.fails::<IERC20::allowanceCall>(usdc().address);
    let mut s = session(chain);
    s.push_action(build::pull(&usdc(), units(1, 6))).unwrap();

    assert!(matches!(
        s.refresh_allowances().await,
        Err(Error::BatchReadFailure { .. })
    ));
}

// ── Execution ───────────────────────────────────────────────────────

#[tokio::test]
async fn execute_sends_assembled_batch_with_value() {
    let mut s = session(MockChain::new());
    s.push_action(build::pull(&Token::native(), units(2, 18))).unwrap();
    s.push_action(build::pull(&usdc(), units(10, 6))).unwrap();
    s.set_allowance(usdc().address, U256::MAX);

    assert!(s.can_execute());
    let tx = s.execute().await.unwrap();
    assert!(tx.is_some());

    let sent = s.client().sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, addr(0xee));
    assert_eq!(sent[0].value, units(2, 18));
    let call = IActionExecutor::executeActionsCall::abi_decode(&sent[0].data).unwrap();
    assert_eq!(call.tokenId, U256::from(7u64));
    assert_eq!(call.actionIds, vec![3u8]);
}

#[tokio::test]
async fn execute_requires_executor_address() {
    let mut s = Session::connect(
        MockChain::new(),
        AddressBook::for_network(Network::Goerli),
        addr(ACCOUNT),
    );
    s.select_position(U256::from(1u64), addr(PROXY));
    s.push_action(build::pull(&usdc(), units(1, 6))).unwrap();
    assert!(matches!(
        s.execute().await,
        Err(Error::UnknownAddress { .. })
    ));
}

// ── Flash loans ─────────────────────────────────────────────────────

#[test]
fn one_flash_loan_per_session_until_removed() {
    let mut s = session(MockChain::new());
    s.push_action(build::pull(&usdc(), units(10, 6))).unwrap();
    s.add_flash_loan(&[(usdc(), units(1000, 6))]).unwrap();
    assert!(matches!(
        s.add_flash_loan(&[(dai(), units(1, 18))]),
        Err(Error::FlashLoanActive)
    ));

    let last = s.actions().len() - 1;
    let removed = s.remove_action(last).unwrap();
    assert_eq!(removed.action_type, ActionType::FlashReturn);
    assert_eq!(s.actions().len(), 1);

    s.add_flash_loan(&[(dai(), units(1, 18))]).unwrap();
    assert_eq!(s.actions().get(0).unwrap().action_type, ActionType::Flash);
}

#[test]
fn flash_loan_rejects_bad_leg_counts_and_keeps_slot_free() {
    let mut s = session(MockChain::new());
    let three = [
        (usdc(), units(1, 6)),
        (dai(), units(1, 18)),
        (Token::new(addr(0x0e), "WETH", 18), units(1, 18)),
    ];
    assert!(matches!(s.add_flash_loan(&three), Err(Error::FlashLoanLegs(3))));
    assert!(matches!(s.add_flash_loan(&[]), Err(Error::FlashLoanLegs(0))));
    assert!(s.actions().is_empty());

    s.add_flash_loan(&three[..2]).unwrap();
    let loan = s.actions().get(0).unwrap().flash_loan().unwrap();
    assert_eq!(loan.active_legs().count(), 2);
}

#[test]
fn flash_loan_needs_lender_address() {
    let mut s = Session::connect(
        MockChain::new(),
        AddressBook::for_network(Network::Goerli),
        addr(ACCOUNT),
    );
    assert!(matches!(
        s.add_flash_loan(&[(usdc(), units(1, 6))]),
        Err(Error::UnknownAddress { .. })
    ));
    // the failed attempt left nothing reserved
    let mut book = AddressBook::for_network(Network::Goerli);
    book.set(Contract::FlashLender, Address::repeat_byte(0xba));
    let mut s = Session::connect(MockChain::new(), book, addr(ACCOUNT));
    s.add_flash_loan(&[(usdc(), units(1, 6))]).unwrap();
}
