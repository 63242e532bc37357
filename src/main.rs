#[tokio::main]
async fn main() -> anyhow::Result<()> {
    salon_booking::run().await
}
