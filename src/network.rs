use std::fmt;
use std::str::FromStr;

use alloy::primitives::{Address, address};

use crate::error::{Error, Result};

/// Native-currency sentinel used for pulls carried as transaction value.
pub const NATIVE_TOKEN: Address = Address::ZERO;

// ── Networks ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Network {
    Goerli,
    Homestead,
    Arbitrum,
    Optimism,
}

impl Network {
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Goerli => 5,
            Network::Homestead => 1,
            Network::Arbitrum => 42161,
            Network::Optimism => 10,
        }
    }

    pub fn from_chain_id(id: u64) -> Option<Self> {
        match id {
            5 => Some(Network::Goerli),
            1 => Some(Network::Homestead),
            42161 => Some(Network::Arbitrum),
            10 => Some(Network::Optimism),
            _ => None,
        }
    }

    /// Chain prefix used by the price API for token keys.
    pub fn price_chain(&self) -> &'static str {
        match self {
            Network::Goerli => "goerli",
            Network::Homestead => "ethereum",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
        }
    }

    /// `"<network>:<address>"` key for a token on this network.
    pub fn price_key(&self, token: Address) -> String {
        format!("{}:{token:?}", self.price_chain())
    }

    /// Price key for the native currency. Every supported network settles in ETH.
    pub fn native_price_key(&self) -> String {
        "coingecko:ethereum".to_string()
    }

    /// Resolve a price key for a token, mapping the native sentinel to the coingecko key.
    pub fn price_key_for(&self, token: Address) -> String {
        if token == NATIVE_TOKEN {
            self.native_price_key()
        } else {
            self.price_key(token)
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Goerli => "goerli",
            Network::Homestead => "homestead",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
        };
        write!(f, "{name}")
    }
}

impl FromStr for Network {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "goerli" => Ok(Network::Goerli),
            "homestead" | "mainnet" | "ethereum" => Ok(Network::Homestead),
            "arbitrum" => Ok(Network::Arbitrum),
            "optimism" => Ok(Network::Optimism),
            other => Err(Error::Plan(format!(
                "Invalid network '{other}'. Use goerli, homestead, arbitrum or optimism."
            ))),
        }
    }
}

// ── Contract address book ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contract {
    PositionNft,
    ActionExecutor,
    Multicall3,
    FlashLender,
    Weth,
    GravitaAdmin,
    GravitaDebtToken,
    GravitaVesselManager,
    GravitaVesselManagerOperations,
    GravitaSortedVessels,
    UniswapQuoter,
}

impl fmt::Display for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Static per-network contract addresses. Zero means "not deployed".
#[derive(Debug, Clone)]
pub struct AddressBook {
    network: Network,
    entries: Vec<(Contract, Address)>,
}

impl AddressBook {
    pub fn for_network(network: Network) -> Self {
        let entries = match network {
            Network::Goerli => vec![
                (Contract::GravitaAdmin, address!("fe4d1a4616db87a669b9a5ea9e9092cb0ca36511")),
                (Contract::Weth, address!("b4fbf271143f4fbf7b91a5ded31805e42b2208d6")),
                (Contract::UniswapQuoter, address!("b27308f9f90d607463bb33ea1bebb41c27ce5ab6")),
            ],
            Network::Homestead => vec![
                (Contract::GravitaAdmin, address!("f7cc67326f9a1d057c1e4b110ef6c680b13a1f53")),
                (Contract::GravitaDebtToken, address!("15f74458ae0bfdaa1a96ca1aa779d715cc1eefe4")),
                (Contract::Weth, address!("c02aaa39b223fe8d0a0e5c4f27ead9083c756cc2")),
                (Contract::FlashLender, address!("ba12222222228d8ba445958a75a0704d566bf2c8")),
                (Contract::UniswapQuoter, address!("b27308f9f90d607463bb33ea1bebb41c27ce5ab6")),
            ],
            Network::Arbitrum => vec![
                (Contract::GravitaAdmin, address!("4928c8f8c20a1e3c295dddbe05095a9abbdb3d14")),
                (Contract::Weth, address!("82af49447d8a07e3bd95bd0d56f35241523fbab1")),
                (Contract::FlashLender, address!("ba12222222228d8ba445958a75a0704d566bf2c8")),
                (Contract::UniswapQuoter, address!("b27308f9f90d607463bb33ea1bebb41c27ce5ab6")),
            ],
            Network::Optimism => vec![
                (Contract::Weth, address!("4200000000000000000000000000000000000006")),
                (Contract::FlashLender, address!("ba12222222228d8ba445958a75a0704d566bf2c8")),
                (Contract::UniswapQuoter, address!("b27308f9f90d607463bb33ea1bebb41c27ce5ab6")),
            ],
        };
        let mut book = AddressBook { network, entries };
        book.set(Contract::Multicall3, address!("ca11bde05977b3631167028862be2a173976ca11"));
        book
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Override or add an address (deployments not yet in the static table).
    pub fn set(&mut self, contract: Contract, addr: Address) {
        match self.entries.iter_mut().find(|(c, _)| *c == contract) {
            Some(entry) => entry.1 = addr,
            None => self.entries.push((contract, addr)),
        }
    }

    pub fn get(&self, contract: Contract) -> Option<Address> {
        self.entries
            .iter()
            .find(|(c, a)| *c == contract && !a.is_zero())
            .map(|(_, a)| *a)
    }

    pub fn require(&self, contract: Contract) -> Result<Address> {
        self.get(contract).ok_or_else(|| Error::UnknownAddress {
            name: contract.to_string(),
            network: self.network.to_string(),
        })
    }

    pub fn entries(&self) -> impl Iterator<Item = (Contract, Address)> + '_ {
        self.entries.iter().copied()
    }
}
