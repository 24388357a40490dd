// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use close_accelerator::config::{
    AUTOMATION_DELAY_ENV, DEFAULT_AUTOMATION_DELAY_MS, DEFAULT_SESSION_TTL_MINUTES,
    SESSION_TTL_ENV, TASK_LIST_ENV,
};
use close_accelerator::{
    reduce, snapshot_for, task_lists, Action, AppConfig, AutomationKind, DashboardView, Entity,
    Outcome, Resolver,
};

#[derive(Parser, Debug)]
#[command(name = "close-accelerator")]
#[command(author, version, about = "Financial close accelerator for the TMH + Raymond merger")]
struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Dashboard settings used when no subcommand is given
    #[command(flatten)]
    tui: TuiArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
struct TuiArgs {
    /// Task list to open
    #[arg(long, env = TASK_LIST_ENV, default_value = close_accelerator::seed::DEFAULT_TASK_LIST)]
    task_list: String,

    /// Simulated automation latency
    #[arg(long, env = AUTOMATION_DELAY_ENV, default_value_t = DEFAULT_AUTOMATION_DELAY_MS)]
    automation_delay_ms: u64,

    /// Session lifetime
    #[arg(long, env = SESSION_TTL_ENV, default_value_t = DEFAULT_SESSION_TTL_MINUTES)]
    session_ttl_minutes: i64,
}

impl TuiArgs {
    fn config(&self) -> AppConfig {
        AppConfig::default()
            .with_default_task_list(self.task_list.clone())
            .with_automation_delay_ms(self.automation_delay_ms)
            .with_session_ttl_minutes(self.session_ttl_minutes)
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Open the terminal dashboard (default)
    Tui(TuiArgs),

    /// Print the KPI report for a task list
    Report {
        #[arg(long, env = TASK_LIST_ENV, default_value = close_accelerator::seed::DEFAULT_TASK_LIST)]
        task_list: String,

        /// TMH, Raymond or Both
        #[arg(long, default_value = "Both")]
        entity: Entity,

        /// Automations to run first (intercompany, vendor, costcenter, accruals)
        #[arg(long = "apply")]
        apply: Vec<AutomationKind>,

        /// Exceptions to resolve manually
        #[arg(long = "resolve")]
        resolve: Vec<String>,

        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },

    /// List available task lists
    TaskLists,
}

impl Cli {
    fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs on stderr, dashboard and reports on stdout
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        None => run_ui_mode(cli.tui.config()),
        Some(Command::Tui(args)) => run_ui_mode(args.config()),
        Some(Command::Report {
            task_list,
            entity,
            apply,
            resolve,
            json,
        }) => run_report(&task_list, entity, &apply, &resolve, json),
        Some(Command::TaskLists) => {
            println!("📋 Task lists");
            for list in task_lists() {
                println!("  {}  {}", list.id, list.label);
            }
            Ok(())
        }
    }
}

fn run_report(
    task_list: &str,
    entity: Entity,
    automations: &[AutomationKind],
    resolve: &[String],
    json: bool,
) -> Result<()> {
    let mut snapshot = snapshot_for(task_list)?;

    let actions = automations
        .iter()
        .map(|&kind| Action::Automation { kind })
        .chain(resolve.iter().map(|id| Action::ResolveException {
            id: id.clone(),
            resolver: Resolver::Manual,
        }));

    for action in actions {
        let reduction = reduce(&snapshot, &action);
        if reduction.outcome == Outcome::NotFound {
            warn!(?action, "no matching record");
        }
        snapshot = reduction.snapshot;
    }

    let view = DashboardView::build(&snapshot, entity);

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    print_report(&view);
    Ok(())
}

fn print_report(view: &DashboardView) {
    let kpis = &view.kpis;

    println!("📊 Close Report - {} ({})", kpis.task_list_id, view.entity);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "⏱️  Projected close:  {:.2} days (baseline {:.1}, {:.0}% faster)",
        kpis.projected_close_days, kpis.baseline_close_days, kpis.time_savings_percent
    );
    println!("🔗 Intercompany match: {}%", kpis.intercompany_match_rate);
    println!("✅ Close readiness:   {}%", kpis.close_readiness);
    println!("📈 Completion rate:   {}%", kpis.completion_rate);
    println!(
        "⚠️  Exceptions:        {} open, {} in progress, {} resolved ({} by automation)",
        kpis.exceptions.open,
        kpis.exceptions.in_progress,
        kpis.exceptions.resolved,
        kpis.exceptions.resolved_by_automation
    );
    println!("💰 Outstanding impact: ${:.0}", kpis.exceptions.outstanding_impact);

    let pl = &kpis.consolidated;
    println!("\n🏦 Consolidated P&L");
    println!("  Revenue                  ${:>12.0}", pl.total_revenue);
    println!("  COGS                     ${:>12.0}", pl.total_cogs);
    println!("  Operating expenses       ${:>12.0}", pl.total_opex);
    println!("  Intercompany elims       ${:>12.0}", pl.intercompany_eliminations);
    println!("  Net income               ${:>12.0}", pl.consolidated_net_income);
    println!(
        "  Open exceptions          {} (${:.0})",
        pl.open_exceptions, pl.open_exceptions_amount
    );

    println!("\n📝 Accrual suggestions (${:.0} booked)", kpis.booked_accruals);
    for accrual in &view.accruals {
        println!(
            "  {}  {:<28} ${:>10.0}  {:>3}%  {}",
            accrual.id,
            accrual.account,
            accrual.amount,
            accrual.confidence,
            if accrual.booked { "booked" } else { "suggested" }
        );
    }

    println!("\n🧾 Exceptions");
    for exc in &view.exceptions {
        println!(
            "  {}  {:<12} {:<8} {:<12} {}",
            exc.id,
            exc.status.as_str(),
            exc.entity.as_str(),
            exc.source_system.as_str(),
            exc.description
        );
    }

    println!("\n🚨 Errors by task list");
    for row in &view.error_rows {
        println!(
            "  {:<28} {:<20} {:>3}  {}",
            row.task_list, row.person_responsible, row.number_of_errors, row.entity
        );
    }

    if kpis.is_close_on_track() {
        println!("\n🎉 Close on track");
    }
}

#[cfg(feature = "tui")]
fn run_ui_mode(config: AppConfig) -> Result<()> {
    println!("🖥️  Loading Close Accelerator...\n");

    let mut app = ui::App::new(&config)?;
    ui::run_ui(&mut app)?;

    println!("\n✅ UI closed successfully");
    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_config: AppConfig) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available. Rebuild with `--features tui`, \
         or use `close-accelerator report` / the close-server binary"
    )
}
