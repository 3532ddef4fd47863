#[tokio::main]
async fn main() {
    if let Err(err) = hakkutsu::cli::run().await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
