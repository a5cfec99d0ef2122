use petalex::plan;

/// Generate and print the JSON Schema for plan files.
pub fn run() -> anyhow::Result<()> {
    println!("{}", plan::schema_json()?);
    Ok(())
}
