//! JSON action plans: a declarative list of steps compiled into an
//! [`ActionList`], plus serializable reports of what the list will do.

use std::str::FromStr;

use alloy::primitives::{Address, U256};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::actions::build::{self, Hints};
use crate::actions::{Action, ActionList, BalanceChange, FlashLoanSlot, Location, Submission, Token};
use crate::chain::ChainClient;
use crate::error::{Error, Result};
use crate::network::{AddressBook, Contract, Network};
use crate::session::Session;
use crate::swap;
use crate::units;

// ── Plan document ───────────────────────────────────────────────────

/// A batch of position actions to run through the executor in one transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Plan {
    /// Network name: `homestead`, `goerli`, `arbitrum` or `optimism`. Defaults to `homestead`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// The user wallet. Sends without an explicit recipient go here.
    pub user: String,
    /// Position NFT id the batch executes against (decimal).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position_id: Option<String>,
    /// Proxy wallet owned by the position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Optional flash loan wrapped around every step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flash_loan: Option<FlashLoanSpec>,
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

/// ERC-20 descriptor. The zero address stands for the native currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TokenSpec {
    pub address: String,
    pub symbol: String,
    pub decimals: u8,
}

/// One borrowed asset. `amount` is in whole units, e.g. `"1.5"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlashLegSpec {
    pub token: TokenSpec,
    pub amount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FlashLoanSpec {
    /// Lender contract. Defaults to the network's flash lender.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lender: Option<String>,
    /// One or two assets.
    pub legs: Vec<FlashLegSpec>,
}

/// Sorted-list neighbours. Computed on-chain when omitted from a live run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HintSpec {
    pub upper: String,
    pub lower: String,
}

/// A single step. Amounts are decimal strings in whole token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Step {
    /// Move tokens from the user wallet into the proxy.
    Pull { token: TokenSpec, amount: String },
    /// Send tokens out of the proxy.
    Send {
        token: TokenSpec,
        amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        recipient: Option<String>,
    },
    /// Wrap native currency into WETH inside the proxy.
    Wrap { amount: String },
    /// Unwrap WETH inside the proxy.
    Unwrap { amount: String },
    /// Uniswap V3 exact-input swap. `hops` are intermediate tokens; `fees`
    /// has one tier per segment.
    Swap {
        token_in: TokenSpec,
        token_out: TokenSpec,
        #[serde(default)]
        hops: Vec<String>,
        fees: Vec<u32>,
        amount_in: String,
        min_amount_out: String,
    },
    GravitaOpen {
        collateral: TokenSpec,
        debt_token: TokenSpec,
        collateral_amount: String,
        debt_amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hints: Option<HintSpec>,
    },
    /// Move a vessel from its current amounts to the target amounts.
    GravitaAdjust {
        collateral: TokenSpec,
        debt_token: TokenSpec,
        current_collateral: String,
        current_debt: String,
        collateral_amount: String,
        debt_amount: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hints: Option<HintSpec>,
    },
    GravitaClose {
        collateral: TokenSpec,
        debt_token: TokenSpec,
        collateral_amount: String,
        debt_amount: String,
    },
    LiquityOpen {
        debt_token: TokenSpec,
        collateral_amount: String,
        debt_amount: String,
        /// Maximum borrowing fee as a fraction, e.g. `"0.005"`.
        max_fee: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hints: Option<HintSpec>,
    },
    LiquityAdjust {
        debt_token: TokenSpec,
        current_collateral: String,
        current_debt: String,
        collateral_amount: String,
        debt_amount: String,
        max_fee: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hints: Option<HintSpec>,
    },
    LiquityClose {
        debt_token: TokenSpec,
        collateral_amount: String,
        debt_amount: String,
    },
}

// ── Parsing helpers ─────────────────────────────────────────────────

pub fn parse_address(field: &str, value: &str) -> Result<Address> {
    Address::from_str(value.trim()).map_err(|e| Error::Plan(format!("{field}: invalid address '{value}': {e}")))
}

impl TokenSpec {
    pub fn token(&self) -> Result<Token> {
        Ok(Token::new(
            parse_address(&self.symbol, &self.address)?,
            self.symbol.clone(),
            self.decimals,
        ))
    }

    fn amount(&self, value: &str) -> Result<U256> {
        units::parse_units(value, self.decimals)
    }
}

impl HintSpec {
    fn hints(&self) -> Result<Hints> {
        Ok(Hints {
            upper: parse_address("hints.upper", &self.upper)?,
            lower: parse_address("hints.lower", &self.lower)?,
        })
    }
}

/// Fee fractions carry 18 decimals on-chain.
fn parse_fee(value: &str) -> Result<U256> {
    units::parse_units(value, 18)
}

fn weth(book: &AddressBook) -> Result<Token> {
    Ok(Token::new(book.require(Contract::Weth)?, "WETH", 18))
}

/// Where a Gravita step needs on-chain hints: the collateral and the
/// vessel's target amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HintRequest {
    pub collateral: Address,
    pub collateral_amount: U256,
    pub debt_amount: U256,
}

impl Step {
    /// Hints to compute before building, for Gravita steps that omit them.
    pub fn hint_request(&self) -> Result<Option<HintRequest>> {
        match self {
            Step::GravitaOpen {
                collateral,
                debt_token,
                collateral_amount,
                debt_amount,
                hints: None,
            }
            | Step::GravitaAdjust {
                collateral,
                debt_token,
                collateral_amount,
                debt_amount,
                hints: None,
                ..
            } => Ok(Some(HintRequest {
                collateral: collateral.token()?.address,
                collateral_amount: collateral.amount(collateral_amount)?,
                debt_amount: debt_token.amount(debt_amount)?,
            })),
            _ => Ok(None),
        }
    }

    /// Build the action. `computed` overrides missing hints; otherwise they
    /// default to the zero address and the contract walks the list itself.
    pub fn build(&self, book: &AddressBook, user: Address, computed: Option<Hints>) -> Result<Action> {
        let hints = |spec: &Option<HintSpec>| -> Result<Hints> {
            Ok(match spec {
                Some(spec) => spec.hints()?,
                None => computed.unwrap_or_default(),
            })
        };

        let action = match self {
            Step::Pull { token, amount } => build::pull(&token.token()?, token.amount(amount)?),
            Step::Send {
                token,
                amount,
                recipient,
            } => {
                let recipient = match recipient {
                    Some(r) => parse_address("recipient", r)?,
                    None => user,
                };
                build::send(&token.token()?, token.amount(amount)?, recipient, user)
            }
            Step::Wrap { amount } => build::wrap(&weth(book)?, units::parse_units(amount, 18)?),
            Step::Unwrap { amount } => build::unwrap(&weth(book)?, units::parse_units(amount, 18)?),
            Step::Swap {
                token_in,
                token_out,
                hops,
                fees,
                amount_in,
                min_amount_out,
            } => {
                let (token_in_t, token_out_t) = (token_in.token()?, token_out.token()?);
                let mut tokens = vec![token_in_t.address];
                for hop in hops {
                    tokens.push(parse_address("hops", hop)?);
                }
                tokens.push(token_out_t.address);
                let path = swap::encode_path(&tokens, fees).ok_or_else(|| {
                    Error::Plan(format!(
                        "swap path has {} segments but {} fee tiers",
                        tokens.len() - 1,
                        fees.len()
                    ))
                })?;
                build::swap_exact_input(
                    &token_in_t,
                    &token_out_t,
                    path,
                    token_in.amount(amount_in)?,
                    token_out.amount(min_amount_out)?,
                )
            }
            Step::GravitaOpen {
                collateral,
                debt_token,
                collateral_amount,
                debt_amount,
                hints: spec,
            } => build::gravita_open(
                &collateral.token()?,
                &debt_token.token()?,
                collateral.amount(collateral_amount)?,
                debt_token.amount(debt_amount)?,
                hints(spec)?,
            ),
            Step::GravitaAdjust {
                collateral,
                debt_token,
                current_collateral,
                current_debt,
                collateral_amount,
                debt_amount,
                hints: spec,
            } => build::gravita_adjust(
                &collateral.token()?,
                &debt_token.token()?,
                (
                    collateral.amount(current_collateral)?,
                    debt_token.amount(current_debt)?,
                ),
                (
                    collateral.amount(collateral_amount)?,
                    debt_token.amount(debt_amount)?,
                ),
                hints(spec)?,
            ),
            Step::GravitaClose {
                collateral,
                debt_token,
                collateral_amount,
                debt_amount,
            } => build::gravita_close(
                &collateral.token()?,
                &debt_token.token()?,
                collateral.amount(collateral_amount)?,
                debt_token.amount(debt_amount)?,
            ),
            Step::LiquityOpen {
                debt_token,
                collateral_amount,
                debt_amount,
                max_fee,
                hints: spec,
            } => build::liquity_open(
                &debt_token.token()?,
                units::parse_units(collateral_amount, 18)?,
                debt_token.amount(debt_amount)?,
                parse_fee(max_fee)?,
                hints(spec)?,
            ),
            Step::LiquityAdjust {
                debt_token,
                current_collateral,
                current_debt,
                collateral_amount,
                debt_amount,
                max_fee,
                hints: spec,
            } => build::liquity_adjust(
                &debt_token.token()?,
                (
                    units::parse_units(current_collateral, 18)?,
                    debt_token.amount(current_debt)?,
                ),
                (
                    units::parse_units(collateral_amount, 18)?,
                    debt_token.amount(debt_amount)?,
                ),
                parse_fee(max_fee)?,
                hints(spec)?,
            ),
            Step::LiquityClose {
                debt_token,
                collateral_amount,
                debt_amount,
            } => build::liquity_close(
                &debt_token.token()?,
                units::parse_units(collateral_amount, 18)?,
                debt_token.amount(debt_amount)?,
            ),
        };
        Ok(action)
    }
}

impl Plan {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::Plan(format!("parsing plan: {e}")))
    }

    pub fn network(&self) -> Result<Network> {
        match &self.network {
            Some(name) => name.parse(),
            None => Ok(Network::Homestead),
        }
    }

    pub fn address_book(&self) -> Result<AddressBook> {
        Ok(AddressBook::for_network(self.network()?))
    }

    pub fn user(&self) -> Result<Address> {
        parse_address("user", &self.user)
    }

    pub fn position_id(&self) -> Result<Option<U256>> {
        self.position_id
            .as_deref()
            .map(|id| U256::from_str(id.trim()).map_err(|e| Error::Plan(format!("position_id '{id}': {e}"))))
            .transpose()
    }

    pub fn proxy(&self) -> Result<Option<Address>> {
        self.proxy.as_deref().map(|p| parse_address("proxy", p)).transpose()
    }

    /// Lender and borrowed assets, if the plan takes a flash loan.
    pub fn flash_legs(&self, book: &AddressBook) -> Result<Option<(Address, Vec<(Token, U256)>)>> {
        let Some(spec) = &self.flash_loan else {
            return Ok(None);
        };
        if spec.legs.is_empty() || spec.legs.len() > 2 {
            return Err(Error::Plan(format!(
                "flash loan takes one or two assets, got {}",
                spec.legs.len()
            )));
        }
        let lender = match &spec.lender {
            Some(lender) => parse_address("flash_loan.lender", lender)?,
            None => book.require(Contract::FlashLender)?,
        };
        let legs = spec
            .legs
            .iter()
            .map(|leg| Ok((leg.token.token()?, leg.token.amount(&leg.amount)?)))
            .collect::<Result<Vec<_>>>()?;
        Ok(Some((lender, legs)))
    }

    /// Build the full list offline. Missing hints stay zero.
    pub fn compile(&self) -> Result<ActionList> {
        let book = self.address_book()?;
        let user = self.user()?;
        let slot = FlashLoanSlot::new();
        let mut list = ActionList::new();
        list.subscribe(slot.clone());

        for step in &self.steps {
            list.push(step.build(&book, user, None)?)?;
        }
        if let Some((lender, legs)) = self.flash_legs(&book)? {
            let (borrow, repay) = build::flash_loan(lender, &legs, slot.reserve()?)?;
            list.insert_flash_loan(borrow, repay)?;
        }
        Ok(list)
    }

    /// Executor arguments for a compiled list, or `None` when the plan
    /// names no position to act on.
    pub fn submission(&self, list: &ActionList) -> Result<Option<SubmissionReport>> {
        Ok(self
            .position_id()?
            .map(|position| SubmissionReport::from(&list.assemble(position))))
    }

    /// Load the plan into a live session, computing missing Gravita hints
    /// with `random_seed` seeding the hint walk.
    pub async fn apply<C: ChainClient>(&self, session: &mut Session<C>, random_seed: U256) -> Result<()> {
        let book = session.addresses().clone();
        let user = self.user()?;
        for step in &self.steps {
            let computed = match step.hint_request()? {
                Some(req) => Some(
                    session
                        .gravita_hints(req.collateral, req.collateral_amount, req.debt_amount, random_seed)
                        .await?,
                ),
                None => None,
            };
            session.push_action(step.build(&book, user, computed)?)?;
        }
        if let Some((lender, legs)) = self.flash_legs(&book)? {
            session.add_flash_loan_from(lender, &legs)?;
        }
        Ok(())
    }
}

// ── Reports ─────────────────────────────────────────────────────────

/// Net change of one asset at one location, formatted in whole units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BalanceReport {
    pub symbol: String,
    pub address: String,
    pub location: String,
    pub amount: String,
}

impl From<&BalanceChange> for BalanceReport {
    fn from(change: &BalanceChange) -> Self {
        let magnitude = units::format_units(change.amount.unsigned_abs(), change.decimals);
        BalanceReport {
            symbol: change.symbol.clone(),
            address: change.address.to_string(),
            location: match change.location {
                Location::ProxyWallet => "proxy".into(),
                Location::UserWallet => "user".into(),
            },
            amount: if change.amount.is_negative() {
                format!("-{magnitude}")
            } else {
                magnitude
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SubmissionReport {
    pub position_id: String,
    pub action_ids: Vec<u8>,
    pub calldata: Vec<String>,
    /// Native value in wei.
    pub value: String,
    /// Full `executeActions` calldata.
    pub transaction_data: String,
}

impl From<&Submission> for SubmissionReport {
    fn from(s: &Submission) -> Self {
        SubmissionReport {
            position_id: s.position_id.to_string(),
            action_ids: s.action_ids.clone(),
            calldata: s.calldata.iter().map(|c| c.to_string()).collect(),
            value: s.value.to_string(),
            transaction_data: s.encode().to_string(),
        }
    }
}

/// Pretty-printed JSON Schema for plan files.
pub fn schema_json() -> Result<String> {
    serde_json::to_string_pretty(&schemars::schema_for!(Plan))
        .map_err(|e| Error::Plan(format!("serializing schema: {e}")))
}

/// Aggregated balance changes of a list.
pub fn balance_report(list: &ActionList) -> Vec<BalanceReport> {
    list.aggregate_balances().iter().map(BalanceReport::from).collect()
}
