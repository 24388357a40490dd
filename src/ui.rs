use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use std::time::Duration;

use close_accelerator::{
    filter_by_entity, lineage_catalog, task_lists, Action, AppConfig, AutomationKind,
    AutomationRunner, DashboardView, ExceptionRecord, ExceptionStatus, InFlight, LineageCatalog,
    Outcome, Resolver, Session, TaskRecord, Traceback,
};

/// Local dashboard user; the gate only needs non-blank credentials
const LOCAL_USER: &str = "controller";
const LOCAL_PASSWORD: &str = "local";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Overview,
    Exceptions,
    Tasks,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Overview => Page::Exceptions,
            Page::Exceptions => Page::Tasks,
            Page::Tasks => Page::Overview,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Overview => Page::Tasks,
            Page::Exceptions => Page::Overview,
            Page::Tasks => Page::Exceptions,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Overview => "Overview",
            Page::Exceptions => "Exceptions",
            Page::Tasks => "Close Checklist",
        }
    }
}

pub struct App {
    pub session: Session,
    pub runner: AutomationRunner,
    pub in_flight: InFlight,
    pub catalog: LineageCatalog,
    pub current_page: Page,
    pub exceptions_state: TableState,
    pub tasks_state: TableState,
    pub show_detail: bool,
    pub status_message: Option<String>,
}

impl App {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let session = Session::issue(
            LOCAL_USER,
            LOCAL_PASSWORD,
            config.session_ttl,
            &config.default_task_list,
        )?;

        let mut exceptions_state = TableState::default();
        exceptions_state.select(Some(0));
        let mut tasks_state = TableState::default();
        tasks_state.select(Some(0));

        Ok(Self {
            session,
            runner: AutomationRunner::from_config(config),
            in_flight: InFlight::new(),
            catalog: lineage_catalog(),
            current_page: Page::Overview,
            exceptions_state,
            tasks_state,
            show_detail: false,
            status_message: None,
        })
    }

    pub fn view(&self) -> DashboardView {
        self.session.view()
    }

    pub fn visible_exceptions(&self) -> Vec<ExceptionRecord> {
        filter_by_entity(&self.session.snapshot().exceptions, self.session.entity)
    }

    pub fn tasks(&self) -> &[TaskRecord] {
        &self.session.snapshot().tasks
    }

    pub fn selected_exception(&self) -> Option<ExceptionRecord> {
        self.exceptions_state
            .selected()
            .and_then(|i| self.visible_exceptions().get(i).cloned())
    }

    pub fn selected_traceback(&self) -> Option<Traceback> {
        let exc = self.selected_exception()?;
        self.catalog
            .trace_exception(self.session.snapshot(), &exc.id)
            .ok()
            .flatten()
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_rows(&self) -> (usize, Option<usize>) {
        match self.current_page {
            Page::Exceptions => (self.visible_exceptions().len(), self.exceptions_state.selected()),
            Page::Tasks => (self.tasks().len(), self.tasks_state.selected()),
            Page::Overview => (0, None),
        }
    }

    fn select_active(&mut self, index: Option<usize>) {
        match self.current_page {
            Page::Exceptions => self.exceptions_state.select(index),
            Page::Tasks => self.tasks_state.select(index),
            Page::Overview => {}
        }
    }

    pub fn next(&mut self) {
        let (len, selected) = self.active_rows();
        if len == 0 {
            return;
        }
        let i = match selected {
            Some(i) if i + 1 < len => i + 1,
            _ => 0,
        };
        self.select_active(Some(i));
    }

    pub fn previous(&mut self) {
        let (len, selected) = self.active_rows();
        if len == 0 {
            return;
        }
        let i = match selected {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        self.select_active(Some(i));
    }

    fn reset_selection(&mut self) {
        self.exceptions_state.select(Some(0));
        self.tasks_state.select(Some(0));
        self.show_detail = false;
    }

    /// Every write goes through here so an expired session stops accepting them
    fn apply(&mut self, action: Action) -> Option<Outcome> {
        if self.session.is_expired() {
            self.status_message = Some("⏱️  Session expired - restart to continue".to_string());
            return None;
        }
        Some(self.session.apply(&action))
    }

    pub fn resolve_selected(&mut self) {
        let Some(exc) = self.selected_exception() else { return };
        let outcome = self.apply(Action::ResolveException {
            id: exc.id.clone(),
            resolver: Resolver::Manual,
        });

        if let Some(outcome) = outcome {
            self.status_message = Some(match outcome {
                Outcome::Applied => format!("✅ {} resolved", exc.id),
                _ => format!("{} already resolved", exc.id),
            });
        }
    }

    pub fn start_selected(&mut self) {
        let Some(exc) = self.selected_exception() else { return };
        let outcome = self.apply(Action::StartException { id: exc.id.clone() });

        if let Some(outcome) = outcome {
            self.status_message = Some(match outcome {
                Outcome::Applied => format!("🔧 {} in progress", exc.id),
                _ => format!("{} is already {}", exc.id, exc.status.as_str()),
            });
        }
    }

    pub fn toggle_selected_task(&mut self) {
        let Some(task) = self
            .tasks_state
            .selected()
            .and_then(|i| self.tasks().get(i).cloned())
        else {
            return;
        };

        if self.apply(Action::ToggleTask { id: task.id.clone() }).is_some() {
            let state = if task.completed { "reopened" } else { "completed" };
            self.status_message = Some(format!("{} {}", task.title, state));
        }
    }

    pub fn run_automation(&mut self, kind: AutomationKind) {
        if self.session.is_expired() {
            self.status_message = Some("⏱️  Session expired - restart to continue".to_string());
            return;
        }

        let result = self.runner.run_blocking(&self.in_flight, kind, &mut self.session);
        self.status_message = Some(match result {
            Ok(Outcome::Applied) => format!("🤖 {} complete", kind.label()),
            Ok(_) => format!("{}: nothing left to automate", kind.label()),
            Err(e) => format!("❌ {}", e),
        });
    }

    pub fn cycle_entity(&mut self) {
        let next = self.session.entity.next();
        self.session.select_entity(next);
        self.reset_selection();
        self.status_message = Some(format!("Entity: {}", next));
    }

    pub fn cycle_task_list(&mut self) {
        let lists = task_lists();
        let current = lists
            .iter()
            .position(|l| l.id == self.session.task_list_id())
            .unwrap_or(0);
        let next = &lists[(current + 1) % lists.len()];

        self.status_message = Some(match self.session.select_task_list(&next.id) {
            Ok(()) => format!("📋 {}", next.label),
            Err(e) => format!("❌ {}", e),
        });
        self.reset_selection();
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn automation_for_key(c: char) -> Option<AutomationKind> {
    match c {
        '1' => Some(AutomationKind::IntercompanyMatch),
        '2' => Some(AutomationKind::GoldenVendorMapping),
        '3' => Some(AutomationKind::NormalizeCostCenters),
        '4' => Some(AutomationKind::AccrualGeneration),
        _ => None,
    }
}

/// Drops every event already queued, returning how many were thrown away.
fn discard_pending<E>(
    mut poll: impl FnMut() -> io::Result<bool>,
    mut read: impl FnMut() -> io::Result<E>,
) -> io::Result<usize> {
    let mut dropped = 0;
    while poll()? {
        read()?;
        dropped += 1;
    }
    Ok(dropped)
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter if app.current_page == Page::Exceptions => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char(c) if automation_for_key(c).is_some() => {
                    if let Some(kind) = automation_for_key(c) {
                        // Pending indicator is drawn before the blocking delay
                        app.status_message = Some(format!("⏳ Running {}...", kind.label()));
                        terminal.draw(|f| ui(f, app))?;
                        app.run_automation(kind);
                        // Keys typed during the delay must not queue more runs
                        discard_pending(|| event::poll(Duration::ZERO), event::read)?;
                    }
                }
                KeyCode::Char('r') if app.current_page == Page::Exceptions => app.resolve_selected(),
                KeyCode::Char('s') if app.current_page == Page::Exceptions => app.start_selected(),
                KeyCode::Char(' ') if app.current_page == Page::Tasks => app.toggle_selected_task(),
                KeyCode::Char('e') => app.cycle_entity(),
                KeyCode::Char('t') => app.cycle_task_list(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    let view = app.view();
    render_header(f, chunks[0], app, &view);

    match app.current_page {
        Page::Overview => render_overview(f, chunks[1], &view),
        Page::Exceptions if app.show_detail => {
            let content_chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
                .split(chunks[1]);

            render_exceptions(f, content_chunks[0], app);
            render_lineage_panel(f, content_chunks[1], app);
        }
        Page::Exceptions => render_exceptions(f, chunks[1], app),
        Page::Tasks => render_tasks(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App, view: &DashboardView) {
    let pages = [Page::Overview, Page::Exceptions, Page::Tasks];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title().to_string(), style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        view.kpis.task_list_id.clone(),
        Style::default().fg(Color::White),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Entity: {}", view.entity),
        Style::default().fg(Color::Cyan),
    ));
    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("⚠ {}", view.kpis.exceptions.open),
        Style::default().fg(Color::Red),
    ));
    tab_spans.push(Span::raw("  "));
    tab_spans.push(Span::styled(
        format!("✓ {}", view.kpis.exceptions.resolved),
        Style::default().fg(Color::Green),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn header_row(titles: &[&'static str]) -> Row<'static> {
    let cells = titles.iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn titled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::White))
        .title(title)
}

fn kpi_line(label: &str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("  {:<22}", label),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn render_overview(f: &mut Frame, area: Rect, view: &DashboardView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(13), Constraint::Min(0)])
        .split(area);

    let kpis = &view.kpis;
    let pl = &kpis.consolidated;
    let close_color = if kpis.is_close_on_track() { Color::Green } else { Color::Yellow };
    let match_color = if kpis.is_match_rate_healthy() { Color::Green } else { Color::Yellow };

    let content = vec![
        Line::from(""),
        kpi_line(
            "Projected close",
            format!(
                "{:.2} days (baseline {:.1}, {:.0}% faster)",
                kpis.projected_close_days, kpis.baseline_close_days, kpis.time_savings_percent
            ),
            close_color,
        ),
        kpi_line("Intercompany match", format!("{}%", kpis.intercompany_match_rate), match_color),
        kpi_line("Close readiness", format!("{}%", kpis.close_readiness), Color::White),
        kpi_line("Completion rate", format!("{}%", kpis.completion_rate), Color::White),
        kpi_line(
            "Exceptions",
            format!(
                "{} open · {} in progress · {} resolved ({} automated)",
                kpis.exceptions.open,
                kpis.exceptions.in_progress,
                kpis.exceptions.resolved,
                kpis.exceptions.resolved_by_automation
            ),
            Color::White,
        ),
        kpi_line(
            "Outstanding impact",
            format!("${:.0}", kpis.exceptions.outstanding_impact),
            Color::Red,
        ),
        kpi_line("Errors", format!("{}", kpis.total_errors), Color::Red),
        kpi_line(
            "Consolidated P&L",
            format!(
                "rev ${:.0} · cogs ${:.0} · opex ${:.0} · elims ${:.0}",
                pl.total_revenue, pl.total_cogs, pl.total_opex, pl.intercompany_eliminations
            ),
            Color::White,
        ),
        kpi_line(
            "Net income",
            format!(
                "${:.0} ({} open exceptions, ${:.0})",
                pl.consolidated_net_income, pl.open_exceptions, pl.open_exceptions_amount
            ),
            if pl.consolidated_net_income >= 0.0 { Color::Green } else { Color::Red },
        ),
        kpi_line(
            "Accruals",
            format!(
                "{} of {} booked (${:.0})",
                view.accruals.iter().filter(|a| a.booked).count(),
                view.accruals.len(),
                kpis.booked_accruals
            ),
            Color::White,
        ),
    ];

    f.render_widget(
        Paragraph::new(content).block(titled_block(" Close KPIs ")),
        chunks[0],
    );

    let tables = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(40),
            Constraint::Percentage(35),
            Constraint::Percentage(25),
        ])
        .split(chunks[1]);

    let error_rows = view.error_rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.task_list, 26)),
            Cell::from(truncate(&row.person_responsible, 18)),
            Cell::from(row.number_of_errors.to_string()).style(Style::default().fg(Color::Red)),
            Cell::from(row.company_code.clone()),
        ])
    });
    let errors = Table::new(
        error_rows,
        [
            Constraint::Length(27),
            Constraint::Length(19),
            Constraint::Length(7),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["Task List", "Responsible", "Errors", "Co."]))
    .block(titled_block(" Errors by Task List "));
    f.render_widget(errors, tables[0]);

    let open_rows = view.open_task_rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.task, 28)),
            Cell::from(truncate(&row.responsible, 16)),
            Cell::from(format!("{}d", row.days_overdue)).style(Style::default().fg(Color::Yellow)),
        ])
    });
    let open_tasks = Table::new(
        open_rows,
        [Constraint::Length(29), Constraint::Length(17), Constraint::Length(6)],
    )
    .header(header_row(&["Task", "Responsible", "Late"]))
    .block(titled_block(" Open Tasks "));
    f.render_widget(open_tasks, tables[1]);

    let delayed_rows = view.delayed_task_list_rows.iter().map(|row| {
        Row::new(vec![
            Cell::from(truncate(&row.task_list, 20)),
            Cell::from(format!("{}d", row.days_overdue)).style(Style::default().fg(Color::Red)),
        ])
    });
    let delayed = Table::new(delayed_rows, [Constraint::Length(21), Constraint::Length(6)])
        .header(header_row(&["Task List", "Late"]))
        .block(titled_block(" Delayed "));
    f.render_widget(delayed, tables[2]);
}

fn status_color(status: ExceptionStatus) -> Color {
    match status {
        ExceptionStatus::Open => Color::Red,
        ExceptionStatus::InProgress => Color::Yellow,
        ExceptionStatus::Resolved => Color::Green,
    }
}

fn render_exceptions(f: &mut Frame, area: Rect, app: &mut App) {
    let exceptions = app.visible_exceptions();

    let rows = exceptions.iter().map(|exc| {
        let color = status_color(exc.status);
        let resolved_by = exc
            .resolved_by
            .map(|r| match r {
                Resolver::Manual => "manual",
                Resolver::Automation => "automation",
            })
            .unwrap_or("");

        Row::new(vec![
            Cell::from(exc.id.clone()),
            Cell::from(truncate(exc.category.label(), 26)),
            Cell::from(truncate(&exc.description, 40)),
            Cell::from(exc.entity.as_str()),
            Cell::from(exc.source_system.as_str()),
            Cell::from(format!("{:.0}", exc.impact)),
            Cell::from(exc.status.as_str()).style(Style::default().fg(color)),
            Cell::from(resolved_by),
        ])
        .height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(8),
            Constraint::Length(27),
            Constraint::Length(41),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(9),
            Constraint::Length(12),
            Constraint::Length(11),
        ],
    )
    .header(header_row(&[
        "ID", "Category", "Description", "Entity", "System", "Impact", "Status", "By",
    ]))
    .block(titled_block(" Exceptions "))
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.exceptions_state);
}

fn render_tasks(f: &mut Frame, area: Rect, app: &mut App) {
    let rows = app.tasks().iter().map(|task| {
        let (mark, color) = if task.completed {
            ("[x]", Color::Green)
        } else {
            ("[ ]", Color::White)
        };

        Row::new(vec![
            Cell::from(mark).style(Style::default().fg(color)),
            Cell::from(task.order.to_string()),
            Cell::from(truncate(&task.title, 34)).style(Style::default().fg(color)),
            Cell::from(truncate(&task.description, 56)),
            Cell::from(format!("{:.0}h", task.time_savings)),
        ])
    });

    let readiness = app.view().kpis.close_readiness;
    let title = format!(" Close Checklist - {}% ready ", readiness);

    let table = Table::new(
        rows,
        [
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Length(35),
            Constraint::Length(57),
            Constraint::Length(7),
        ],
    )
    .header(header_row(&["", "#", "Task", "Description", "Saves"]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(title),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.tasks_state);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(
        format!("  {}: ", text),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn section(text: &str) -> Line<'static> {
    Line::from(vec![Span::styled(
        format!("  {}", text),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    )])
}

fn render_lineage_panel(f: &mut Frame, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(" Source Lineage ");

    let Some(exc) = app.selected_exception() else {
        f.render_widget(Paragraph::new("No exception selected").block(block), area);
        return;
    };

    let mut content = vec![
        Line::from(""),
        Line::from(vec![label("Exception"), Span::raw(exc.id.clone())]),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(
                wrap_text(&exc.description, 35),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            ),
        ]),
        Line::from(""),
    ];

    match app.selected_traceback() {
        None => content.push(Line::from(Span::styled(
            "  No source document linked",
            Style::default().fg(Color::DarkGray),
        ))),
        Some(trace) => {
            let doc = &trace.document;
            content.push(section("SOURCE DOCUMENT"));
            content.push(Line::from(""));
            content.push(Line::from(vec![label("Document"), Span::raw(doc.document_number.clone())]));
            content.push(Line::from(vec![label("Type"), Span::raw(doc.document_type.clone())]));
            content.push(Line::from(vec![
                label("System"),
                Span::styled(doc.source_system.as_str(), Style::default().fg(Color::Green)),
            ]));
            content.push(Line::from(vec![label("Date"), Span::raw(doc.date.to_string())]));
            content.push(Line::from(vec![
                label("Amount"),
                Span::styled(format!("{:.2}", doc.amount), Style::default().fg(Color::Green)),
            ]));
            content.push(Line::from(vec![label("GL"), Span::raw(doc.gl_account.clone())]));
            content.push(Line::from(""));
            content.push(Line::from("  ─────────────────────────────────────"));
            content.push(section("MAPPINGS"));
            content.push(Line::from(""));

            match &trace.cost_center {
                Some(cc) => content.push(Line::from(vec![
                    label("Cost center"),
                    Span::raw(format!("{} → {} ({})", cc.local_id, cc.enterprise_id, cc.enterprise_name)),
                ])),
                None => content.push(Line::from(vec![
                    label("Cost center"),
                    Span::styled(
                        format!("{} unmapped", doc.cost_center),
                        Style::default().fg(Color::Red),
                    ),
                ])),
            }

            if let Some(vendor) = &trace.vendor {
                content.push(Line::from(vec![
                    label("Vendor"),
                    Span::raw(format!("{} ({:?})", vendor.vendor_name, vendor.status)),
                ]));
            }
        }
    }

    content.push(Line::from(""));
    content.push(Line::from(Span::styled(
        "  Press Enter to close",
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
    )));

    f.render_widget(Paragraph::new(content).block(block), area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(message) = &app.status_message {
        status_spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Green),
        ));
        status_spans.push(Span::raw(" | "));
    }

    let mut hint = |key: &'static str, text: &'static str, color: Color| {
        status_spans.push(Span::styled(key, Style::default().fg(color)));
        status_spans.push(Span::raw(text));
    };

    hint("1-4", " Automate | ", Color::Yellow);
    match app.current_page {
        Page::Exceptions => {
            hint("r", " Resolve | ", Color::Yellow);
            hint("s", " Start | ", Color::Yellow);
            hint("Enter", " Lineage | ", Color::Yellow);
        }
        Page::Tasks => hint("Space", " Toggle | ", Color::Yellow),
        Page::Overview => {}
    }
    hint("e", " Entity | ", Color::Yellow);
    hint("t", " Task list | ", Color::Yellow);
    hint("Tab", " Page | ", Color::Yellow);
    hint("q", " Quit", Color::Red);

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.len() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = vec![];
    let mut current_line = String::new();

    for word in text.split_whitespace() {
        if !current_line.is_empty() && current_line.len() + word.len() + 1 > width {
            lines.push(std::mem::take(&mut current_line));
        }
        if !current_line.is_empty() {
            current_line.push(' ');
        }
        current_line.push_str(word);
    }

    if !current_line.is_empty() {
        lines.push(current_line);
    }

    lines.join("\n  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use close_accelerator::Entity;

    fn app() -> App {
        App::new(&AppConfig::default().with_automation_delay_ms(0)).unwrap()
    }

    #[test]
    fn test_page_cycle() {
        assert_eq!(Page::Overview.next().next().next(), Page::Overview);
        assert_eq!(Page::Overview.previous(), Page::Tasks);
    }

    #[test]
    fn test_resolve_selected_exception() {
        let mut app = app();
        app.current_page = Page::Exceptions;
        app.next();

        app.resolve_selected();
        let exc = app.selected_exception().unwrap();
        assert_eq!(exc.id, "EXC-002");
        assert_eq!(exc.status, ExceptionStatus::Resolved);
        assert_eq!(exc.resolved_by, Some(Resolver::Manual));
        assert_eq!(app.status_message.as_deref(), Some("✅ EXC-002 resolved"));
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = app();
        app.current_page = Page::Tasks;
        app.previous();
        assert_eq!(app.tasks_state.selected(), Some(7));
        app.next();
        assert_eq!(app.tasks_state.selected(), Some(0));
    }

    #[test]
    fn test_toggle_task_and_automation() {
        let mut app = app();
        app.current_page = Page::Tasks;
        app.toggle_selected_task();
        assert!(app.tasks()[0].completed);

        app.run_automation(AutomationKind::IntercompanyMatch);
        assert_eq!(app.view().kpis.intercompany_match_rate, 87);
        app.run_automation(AutomationKind::IntercompanyMatch);
        assert_eq!(app.view().kpis.intercompany_match_rate, 95);
    }

    #[test]
    fn test_keys_buffered_during_automation_are_dropped() {
        use crossterm::event::KeyEvent;
        use std::cell::RefCell;
        use std::collections::VecDeque;

        let press = || Event::Key(KeyEvent::new(KeyCode::Char('1'), KeyModifiers::NONE));
        let queue = RefCell::new(VecDeque::from(vec![press(), press()]));

        let mut app = app();
        app.run_automation(AutomationKind::IntercompanyMatch);
        let dropped = discard_pending(
            || Ok(!queue.borrow().is_empty()),
            || {
                queue
                    .borrow_mut()
                    .pop_front()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "empty"))
            },
        )
        .unwrap();

        assert_eq!(dropped, 2);
        assert!(queue.borrow().is_empty());
        assert_eq!(app.view().kpis.intercompany_match_rate, 87);
    }

    #[test]
    fn test_discard_pending_with_nothing_queued() {
        let dropped = discard_pending(|| Ok(false), || Ok::<_, io::Error>(())).unwrap();
        assert_eq!(dropped, 0);
    }

    #[test]
    fn test_cycle_entity_and_task_list() {
        let mut app = app();
        app.cycle_entity();
        assert_eq!(app.session.entity, Entity::Tmh);
        assert!(app.visible_exceptions().iter().all(|e| e.entity != Entity::Raymond));

        app.cycle_task_list();
        assert_eq!(app.session.task_list_id(), "AFC-2");
        app.cycle_task_list();
        app.cycle_task_list();
        assert_eq!(app.session.task_list_id(), "AFC-1");
    }

    #[test]
    fn test_lineage_for_selected() {
        let app = app();
        let trace = app.selected_traceback().unwrap();
        assert_eq!(trace.document.doc_id, "DOC-5001234");
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(truncate("Intercompany Recon", 10), "Interco...");
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(
            wrap_text("one two three four", 9),
            "one two\n  three\n  four"
        );
    }
}
