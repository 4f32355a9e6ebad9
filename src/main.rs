use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    aisearch_proxy_lib::run(aisearch_proxy_lib::Cli::parse()).await
}
