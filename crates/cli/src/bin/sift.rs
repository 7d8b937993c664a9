use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    sift_cli::main_entry().await
}
