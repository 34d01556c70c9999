//! HTTP intake process entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    jobqueue_api::run().await
}
