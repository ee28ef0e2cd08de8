#[tokio::main]
async fn main() -> anyhow::Result<()> {
    datachat_server::start().await
}
