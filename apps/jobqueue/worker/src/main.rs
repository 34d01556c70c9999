//! Worker process entry point.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    jobqueue_worker::run().await
}
