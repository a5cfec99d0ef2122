//! Session-scoped state for one connected wallet.
//!
//! A [`Session`] is created when a wallet connects and owns everything that
//! must not outlive that connection: the pending action list, the Gravita
//! snapshot and the allowance read model.

use std::sync::Arc;

use alloy::primitives::{Address, TxHash, U256};
use alloy::sol_types::SolCall;

use crate::abi::IERC20;
use crate::actions::build::{self, Hints};
use crate::actions::{Action, ActionList, Allowances, FlashLoanSlot, Submission, Token};
use crate::chain::{ChainClient, TxRequest};
use crate::error::Result;
use crate::gravita::fetch::{FetchContext, fetch_collaterals};
use crate::gravita::{ActiveVessel, GravitaState, hints};
use crate::multicall::Batch;
use crate::network::{AddressBook, Contract};
use crate::prices::PriceSource;
use crate::swap::{self, FEE_TIERS, Quote, QuoteMode, QuoteRequest};

/// The position NFT selected for execution and its proxy wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub id: U256,
    pub proxy: Address,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwapEstimate {
    pub quote: Quote,
    /// Percent worse than the reference market rate; zero when unpriced.
    pub price_impact: f64,
}

pub struct Session<C> {
    client: C,
    addresses: AddressBook,
    account: Option<Address>,
    position: Option<Position>,
    actions: ActionList,
    flash_slot: Arc<FlashLoanSlot>,
    gravita: GravitaState,
    allowances: Allowances,
}

impl<C: ChainClient> Session<C> {
    pub fn connect(client: C, addresses: AddressBook, account: Address) -> Self {
        let flash_slot = FlashLoanSlot::new();
        let mut actions = ActionList::new();
        actions.subscribe(flash_slot.clone());
        tracing::info!(%account, network = %addresses.network(), "session connected");
        Session {
            client,
            addresses,
            account: Some(account),
            position: None,
            actions,
            flash_slot,
            gravita: GravitaState::default(),
            allowances: Allowances::default(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn addresses(&self) -> &AddressBook {
        &self.addresses
    }

    pub fn account(&self) -> Option<Address> {
        self.account
    }

    pub fn position(&self) -> Option<Position> {
        self.position
    }

    pub fn select_position(&mut self, id: U256, proxy: Address) {
        self.position = Some(Position { id, proxy });
        self.allowances = Allowances::default();
    }

    /// Account and position, or `None` when either is missing.
    fn ready(&self, op: &str) -> Option<(Address, Position)> {
        match (self.account, self.position) {
            (Some(account), Some(position)) => Some((account, position)),
            _ => {
                tracing::debug!(op, "skipped: wallet disconnected or no position selected");
                None
            }
        }
    }

    // ── Action list ──────────────────────────────────────────────────

    pub fn actions(&self) -> &ActionList {
        &self.actions
    }

    pub fn insert_action(&mut self, action: Action, index: usize) -> Result<usize> {
        let at = self.actions.insert(action, index)?;
        self.recalculate_vessels();
        Ok(at)
    }

    pub fn push_action(&mut self, action: Action) -> Result<usize> {
        self.insert_action(action, self.actions.len())
    }

    pub fn remove_action(&mut self, index: usize) -> Result<Action> {
        let removed = self.actions.remove(index)?;
        self.recalculate_vessels();
        Ok(removed)
    }

    /// Wrap the current list in a flash loan of one or two assets from the
    /// network's flash lender.
    pub fn add_flash_loan(&mut self, legs: &[(Token, U256)]) -> Result<()> {
        let lender = self.addresses.require(Contract::FlashLender)?;
        self.add_flash_loan_from(lender, legs)
    }

    pub fn add_flash_loan_from(&mut self, lender: Address, legs: &[(Token, U256)]) -> Result<()> {
        let reservation = self.flash_slot.reserve()?;
        let inserted = build::flash_loan(lender, legs, reservation)
            .and_then(|(borrow, repay)| self.actions.insert_flash_loan(borrow, repay));
        if let Err(e) = inserted {
            self.flash_slot.release(reservation);
            return Err(e);
        }
        Ok(())
    }

    pub fn can_execute(&self) -> bool {
        self.actions.can_execute()
    }

    pub fn assemble_submission(&self) -> Option<Submission> {
        let (_, position) = self.ready("assemble")?;
        Some(self.actions.assemble(position.id))
    }

    /// Submit the pending list through the executor.
    pub async fn execute(&self) -> Result<Option<TxHash>> {
        let Some(submission) = self.assemble_submission() else {
            return Ok(None);
        };
        let executor = self.addresses.require(Contract::ActionExecutor)?;
        tracing::info!(
            steps = submission.action_ids.len(),
            value = %submission.value,
            position = %submission.position_id,
            "submitting actions"
        );
        let tx = self
            .client
            .send(TxRequest {
                label: "executeActions".into(),
                to: executor,
                data: submission.encode(),
                value: submission.value,
            })
            .await?;
        Ok(Some(tx))
    }

    /// Drop all pending work and the account. [`Session::reconnect`] resumes it.
    pub fn disconnect(&mut self) {
        self.flash_slot = FlashLoanSlot::new();
        self.actions = ActionList::new();
        self.actions.subscribe(self.flash_slot.clone());
        self.account = None;
        self.position = None;
        self.allowances = Allowances::default();
        self.gravita.clear();
        tracing::info!("session disconnected");
    }

    /// Attach a wallet account after [`Session::disconnect`]. The position
    /// must be selected again.
    pub fn reconnect(&mut self, account: Address) {
        self.account = Some(account);
        tracing::info!(%account, "session reconnected");
    }

    // ── Approvals ────────────────────────────────────────────────────

    pub fn allowances(&self) -> &Allowances {
        &self.allowances
    }

    pub fn set_allowance(&mut self, token: Address, amount: U256) {
        self.allowances.set(token, amount);
    }

    /// Re-read the proxy allowance of every pulled token.
    pub async fn refresh_allowances(&mut self) -> Result<()> {
        let Some((account, position)) = self.ready("refresh_allowances") else {
            return Ok(());
        };
        let tokens: Vec<Address> = self
            .actions
            .pull_requirements()
            .into_iter()
            .map(|(t, _)| t)
            .collect();

        let mut batch = Batch::new();
        for &token in &tokens {
            batch.push(
                token,
                token,
                &IERC20::allowanceCall {
                    owner: account,
                    spender: position.proxy,
                },
            );
        }
        let results = batch.execute(&self.client).await?;
        let mut entries = Vec::with_capacity(tokens.len());
        for token in tokens {
            entries.push((token, results.required::<IERC20::allowanceCall>(&token)?));
        }
        self.allowances.replace(entries);
        Ok(())
    }

    pub fn next_unapproved_token(&self) -> Option<Address> {
        self.ready("next_unapproved_token")?;
        self.actions.next_unapproved_token(&self.allowances)
    }

    pub fn needs_approval(&self) -> bool {
        self.next_unapproved_token().is_some()
    }

    /// Grant the proxy an unlimited allowance for the next token that needs one.
    pub async fn approve_next_token(&mut self) -> Result<Option<TxHash>> {
        let Some((_, position)) = self.ready("approve_next_token") else {
            return Ok(None);
        };
        let Some(token) = self.actions.next_unapproved_token(&self.allowances) else {
            return Ok(None);
        };
        let call = IERC20::approveCall {
            spender: position.proxy,
            amount: U256::MAX,
        };
        tracing::info!(%token, proxy = %position.proxy, "approving token");
        let tx = self
            .client
            .send(TxRequest {
                label: "approve".into(),
                to: token,
                data: call.abi_encode().into(),
                value: U256::ZERO,
            })
            .await?;
        self.allowances.set(token, U256::MAX);
        Ok(Some(tx))
    }

    // ── Gravita ──────────────────────────────────────────────────────

    pub fn gravita(&self) -> &GravitaState {
        &self.gravita
    }

    /// Fetch a fresh snapshot and replay pending actions onto it. The old
    /// snapshot is kept if the fetch fails.
    pub async fn refresh_gravita(&mut self) -> Result<()> {
        let Some((account, position)) = self.ready("refresh_gravita") else {
            return Ok(());
        };
        let ctx = FetchContext {
            admin: self.addresses.require(Contract::GravitaAdmin)?,
            vessel_manager: self.addresses.require(Contract::GravitaVesselManager)?,
            account,
            proxy: position.proxy,
        };
        let collaterals = fetch_collaterals(&self.client, &ctx).await?;
        tracing::info!(collaterals = collaterals.len(), "gravita snapshot refreshed");
        self.gravita.replace(collaterals);
        self.recalculate_vessels();
        Ok(())
    }

    pub fn recalculate_vessels(&mut self) {
        self.gravita.recalculate(&self.actions);
    }

    pub fn active_vessels(&self) -> Vec<ActiveVessel> {
        self.gravita.active_vessels(&self.actions)
    }

    pub async fn gravita_hints(
        &self,
        collateral: Address,
        coll: U256,
        debt: U256,
        random_seed: U256,
    ) -> Result<Hints> {
        hints::calculate(
            &self.client,
            self.addresses.require(Contract::GravitaSortedVessels)?,
            self.addresses.require(Contract::GravitaVesselManagerOperations)?,
            collateral,
            coll,
            debt,
            random_seed,
        )
        .await
    }

    // ── Swaps ────────────────────────────────────────────────────────

    pub async fn quote_swap<P: PriceSource + ?Sized>(
        &self,
        prices: &P,
        token_in: &Token,
        token_out: &Token,
        hops: Vec<Address>,
        amount: U256,
        mode: QuoteMode,
    ) -> Result<SwapEstimate> {
        let quoter = self.addresses.require(Contract::UniswapQuoter)?;
        let request = QuoteRequest {
            token_in: token_in.address,
            token_out: token_out.address,
            hops,
            amount,
            mode,
        };
        let quote = swap::best_quote(&self.client, quoter, &FEE_TIERS, &request).await?;
        if quote.amount.is_zero() {
            return Ok(SwapEstimate {
                quote,
                price_impact: 0.0,
            });
        }

        let network = self.addresses.network();
        let key_in = network.price_key_for(token_in.address);
        let key_out = network.price_key_for(token_out.address);
        let quoted = prices.prices(&[key_in.clone(), key_out.clone()]).await?;
        let (Some(&price_in), Some(&price_out)) = (quoted.get(&key_in), quoted.get(&key_out)) else {
            tracing::warn!(%key_in, %key_out, "missing reference price; impact unknown");
            return Ok(SwapEstimate {
                quote,
                price_impact: 0.0,
            });
        };

        let (amount_in, amount_out) = match mode {
            QuoteMode::ExactInput => (amount, quote.amount),
            QuoteMode::ExactOutput => (quote.amount, amount),
        };
        let price_impact = swap::price_impact(
            amount_in,
            token_in.decimals,
            price_in,
            amount_out,
            token_out.decimals,
            price_out,
        );
        Ok(SwapEstimate { quote, price_impact })
    }
}
