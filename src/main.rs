use clap::Parser;

#[tokio::main]
async fn main() {
    let cli = forwarder::cli::Cli::parse();
    if let Err(e) = forwarder::cmd::dispatch(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
