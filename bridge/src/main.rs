#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pifire_bridge::host::run().await
}
