use anyhow::Result;
use petalex::config::ContractOverrides;
use petalex::network::{AddressBook, Network};

pub fn run(network: &str, contracts: &ContractOverrides) -> Result<()> {
    let network: Network = network.parse()?;
    let mut book = AddressBook::for_network(network);
    contracts.apply(&mut book)?;

    println!("Network: {network} (chain {})", network.chain_id());
    for (contract, address) in book.entries() {
        println!("  {:<34} {address}", contract.to_string());
    }
    Ok(())
}
