// 🌐 Close Accelerator - HTTP server
//
// Run with: cargo run --bin close-server --features server

use anyhow::Result;
use clap::Parser;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use close_accelerator::api::{self, AppState};
use close_accelerator::config::{
    AppConfig, AUTOMATION_DELAY_ENV, DEFAULT_AUTOMATION_DELAY_MS, DEFAULT_SESSION_TTL_MINUTES,
    HOST_ENV, PORT_ENV, SESSION_TTL_ENV, TASK_LIST_ENV,
};
use close_accelerator::seed::DEFAULT_TASK_LIST;

const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser, Debug)]
#[command(name = "close-server", version, about = "Close Accelerator HTTP API")]
struct Args {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[arg(long, env = HOST_ENV, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, env = PORT_ENV, default_value_t = 3000)]
    port: u16,

    /// Simulated automation latency
    #[arg(long, env = AUTOMATION_DELAY_ENV, default_value_t = DEFAULT_AUTOMATION_DELAY_MS)]
    automation_delay_ms: u64,

    #[arg(long, env = SESSION_TTL_ENV, default_value_t = DEFAULT_SESSION_TTL_MINUTES)]
    session_ttl_minutes: i64,

    /// Task list every new session starts on
    #[arg(long, env = TASK_LIST_ENV, default_value = DEFAULT_TASK_LIST)]
    task_list: String,
}

impl Args {
    fn config(&self) -> AppConfig {
        AppConfig::new(self.host.clone(), self.port)
            .with_automation_delay_ms(self.automation_delay_ms)
            .with_session_ttl_minutes(self.session_ttl_minutes)
            .with_default_task_list(self.task_list.clone())
    }

    fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::INFO,
            1 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));
    fmt().with_env_filter(filter).with_target(false).init();

    let config = args.config();
    // Unknown default task list is rejected at startup
    close_accelerator::snapshot_for(&config.default_task_list)?;

    println!("🌐 Close Accelerator - Web Server");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✓ Default task list: {}", config.default_task_list);
    println!("✓ Automation delay:  {} ms", config.automation_delay.as_millis());
    println!("✓ Session TTL:       {} min", config.session_ttl.num_minutes());

    let state = AppState::new(config);

    let purger = state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(PURGE_INTERVAL);
        loop {
            interval.tick().await;
            let purged = purger.purge_expired().await;
            if purged > 0 {
                info!(purged, "expired sessions dropped");
            }
        }
    });

    println!("\n🚀 Server running on http://{}", state.config.bind_address());
    println!("   Login: POST /api/login");
    println!("\n   Press Ctrl+C to stop\n");

    api::serve(state).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_build_config() {
        let args = Args::parse_from([
            "close-server",
            "--host",
            "0.0.0.0",
            "--port",
            "8080",
            "--automation-delay-ms",
            "0",
            "--task-list",
            "AFC-3",
        ]);
        let config = args.config();

        assert_eq!(config.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.automation_delay, Duration::ZERO);
        assert_eq!(config.default_task_list, "AFC-3");
    }
}
