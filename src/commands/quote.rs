use anyhow::{Context, Result};
use alloy::primitives::Address;
use petalex::actions::Token;
use petalex::config::ConnectionArgs;
use petalex::prices::DefiLlamaPrices;
use petalex::swap::QuoteMode;
use petalex::units;

use super::connect;

pub struct QuoteArgs {
    pub token_in: String,
    pub decimals_in: u8,
    pub token_out: String,
    pub decimals_out: u8,
    pub hops: Vec<String>,
    pub amount: String,
    pub exact_output: bool,
}

/// Entry point for the `quote` command.
pub fn run(conn: &ConnectionArgs, args: &QuoteArgs) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().context("creating tokio runtime")?;
    rt.block_on(run_async(conn, args))
}

fn token(address: &str, decimals: u8) -> Result<Token> {
    let address: Address = address
        .parse()
        .with_context(|| format!("invalid token address '{address}'"))?;
    let symbol = format!("{:.8}", address.to_string());
    Ok(Token::new(address, symbol, decimals))
}

async fn run_async(conn: &ConnectionArgs, args: &QuoteArgs) -> Result<()> {
    let (_, session) = connect(conn).await?;

    let token_in = token(&args.token_in, args.decimals_in)?;
    let token_out = token(&args.token_out, args.decimals_out)?;
    let hops = args
        .hops
        .iter()
        .map(|h| h.parse::<Address>().with_context(|| format!("invalid hop '{h}'")))
        .collect::<Result<Vec<_>>>()?;
    let (mode, fixed_decimals, quoted_decimals) = if args.exact_output {
        (QuoteMode::ExactOutput, token_out.decimals, token_in.decimals)
    } else {
        (QuoteMode::ExactInput, token_in.decimals, token_out.decimals)
    };
    let amount = units::parse_units(&args.amount, fixed_decimals)?;

    let prices = DefiLlamaPrices::default();
    let estimate = session
        .quote_swap(&prices, &token_in, &token_out, hops, amount, mode)
        .await
        .context("quoting swap")?;

    if estimate.quote.amount.is_zero() {
        println!("No route quoted for this pair.");
        return Ok(());
    }
    let fees: Vec<String> = estimate.quote.fees.iter().map(|f| f.to_string()).collect();
    match mode {
        QuoteMode::ExactInput => println!(
            "Out:    {}",
            units::format_units(estimate.quote.amount, quoted_decimals)
        ),
        QuoteMode::ExactOutput => println!(
            "In:     {}",
            units::format_units(estimate.quote.amount, quoted_decimals)
        ),
    }
    println!("Fees:   {}", fees.join(" / "));
    println!("Path:   {}", estimate.quote.path);
    println!("Impact: {:.2}%", estimate.price_impact);
    Ok(())
}
