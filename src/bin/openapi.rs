use anyhow::Result;

fn main() -> Result<()> {
    let spec = cloudshield::api::openapi();
    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
