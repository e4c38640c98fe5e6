use clap::Parser;
use headless_textmod::{Args, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let output = run(Args::parse()).await?;
    println!("{}", output);
    Ok(())
}
