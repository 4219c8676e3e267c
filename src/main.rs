use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = se_bridge::cli::Cli::parse();
    let code = se_bridge::cli::run(cli).await;
    std::process::exit(code);
}
