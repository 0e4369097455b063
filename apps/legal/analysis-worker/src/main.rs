//! Legal Analysis Worker - Entry Point
//!
//! Serves the analysis trigger API and runs the embedding worker.

#[tokio::main]
async fn main() -> eyre::Result<()> {
    legal_analysis_worker::run().await
}
