use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    packpal::tui::run().await
}
