//! Council run example
//!
//! Demonstrates wiring a canned agent port into the analysis service and
//! running one full council pass with a risk veto in place.
//!
//! To run this example:
//! ```bash
//! cargo run --example run_council
//! # Optional symbol argument
//! cargo run --example run_council NVDA
//! ```

use async_trait::async_trait;
use council_core::{
    AgentError, AgentPort, AgentReview, AgentRole, DataBundle, ReviewContent, StockSnapshot,
};
use council_engine::{AnalysisService, EngineConfig, InMemoryAnalysisRepository};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Canned analyst port with a fixed opinion per role
///
/// Real deployments back this trait with an LLM client or a remote
/// analyst service. The canned ratings below are deliberately bullish so
/// the risk veto in the config is visible in the output.
struct CannedPort;

#[async_trait]
impl AgentPort for CannedPort {
    async fn invoke(
        &self,
        role: AgentRole,
        _bundle: &DataBundle,
        _prior_context: &[AgentReview],
        _timeout: Duration,
    ) -> Result<AgentReview, AgentError> {
        // Simulate some network latency
        tokio::time::sleep(Duration::from_millis(50)).await;

        let content = match role {
            AgentRole::Technical => ReviewContent::new(0.85, 0.9, "strong uptrend, MACD golden cross"),
            AgentRole::Fundamental => ReviewContent::new(0.75, 0.8, "earnings beat, healthy margins"),
            AgentRole::FundFlow => ReviewContent::new(0.7, 0.7, "sustained institutional inflows"),
            AgentRole::Risk => ReviewContent::new(0.35, 0.85, "valuation stretched, drawdown risk"),
            AgentRole::Sentiment => ReviewContent::new(0.8, 0.6, "retail sentiment running hot"),
            AgentRole::News => ReviewContent::new(0.65, 0.5, "neutral-to-positive headline flow"),
        };
        Ok(AgentReview::success(role, content))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    council_utils::init_tracing();

    let args: Vec<String> = env::args().collect();
    let symbol = if args.len() > 1 { &args[1] } else { "AAPL" };

    println!("=== Council Analysis ===\n");
    println!("Analyzing: {symbol}\n");

    let config = EngineConfig::builder()
        .veto(AgentRole::Risk, 0.5)
        .role_weight(AgentRole::Fundamental, 1.5)
        .build()?;

    let repository = Arc::new(InMemoryAnalysisRepository::new());
    let service = AnalysisService::new(Arc::new(CannedPort), repository, config)?;

    let id = service
        .request_analysis(StockSnapshot::new(symbol, symbol))
        .await?;
    println!("Requested analysis {id}\n");

    let bundle = DataBundle::default()
        .with_entry("close", serde_json::json!(187.4))
        .with_entry("pe_ratio", serde_json::json!(31.2));

    let report = service
        .run_analysis(id, &AgentRole::ALL, bundle, CancellationToken::new())
        .await?;

    println!("Status: {:?}", report.status);
    println!("Rounds: {}", report.rounds);
    for outcome in &report.roles {
        println!("  - {outcome:?}");
    }

    if let Some(decision) = &report.decision {
        println!("\nFinal decision:");
        println!("  Rating:     {:.2}", decision.rating);
        println!("  Confidence: {:.2}", decision.confidence);
        println!("  Overridden: {}", decision.overridden);
        println!("  Summary:    {}", decision.summary);
    }

    Ok(())
}
