#[tokio::main]
async fn main() -> std::io::Result<()> {
    vine_server::run_with_config().await
}
