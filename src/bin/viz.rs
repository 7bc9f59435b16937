/// mtsim report viewer — shows the latest policy comparison.
///
/// Run in a separate terminal:
///   cargo run --bin viz
///
/// Polls /tmp/mtsim_report.json every 200ms and renders a TUI dashboard:
///
///     ┌ header: scenario / threads / latencies / switch penalty ───┐
///     │ Blocked: cycle breakdown    │ FineGrained: cycle breakdown │
///     │ Blocked: timeline strip     │ FineGrained: timeline strip  │
///     │ final registers, one row per thread and policy             │
///     │ q/esc: quit  …footer…                                      │
///
/// Press q or Esc to quit.
use crossterm::{
    event::{self, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use mtsim::metrics::{read_report, SimReport};
use mtsim::stats::{CycleEvent, RunStats};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use std::{io, time::Duration};

/// Colors cycled through for thread ids in the timeline.
const THREAD_COLORS: [Color; 6] = [
    Color::Green,
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Blue,
    Color::LightRed,
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
) -> Result<(), Box<dyn std::error::Error>> {
    loop {
        let report = read_report();
        terminal.draw(|f| render(f, report.as_ref()))?;

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                    break;
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Top-level layout
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, report: Option<&SimReport>) {
    let area = f.area();
    let threads = report.map(|r| r.config.threads).unwrap_or(0);
    let regs_height = (threads * 2 + 3).clamp(4, 20) as u16;

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),           // header
            Constraint::Length(9),           // cycle breakdown per policy
            Constraint::Min(4),              // timelines
            Constraint::Length(regs_height), // registers
            Constraint::Length(1),           // footer
        ])
        .split(area);

    render_header(f, rows[0], report);

    let runs: &[RunStats] = report.map(|r| r.runs.as_slice()).unwrap_or(&[]);
    if runs.is_empty() {
        render_empty(f, rows[1]);
    } else {
        let share = 100 / runs.len() as u16;
        let constraints: Vec<Constraint> = runs.iter().map(|_| Constraint::Percentage(share)).collect();
        let stat_cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints.clone())
            .split(rows[1]);
        let line_cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(rows[2]);
        for (i, stats) in runs.iter().enumerate() {
            render_breakdown(f, stat_cols[i], stats);
            render_timeline(f, line_cols[i], stats);
        }
    }

    render_registers(f, rows[3], runs);
    render_footer(f, rows[4]);
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

fn render_header(f: &mut Frame, area: Rect, report: Option<&SimReport>) {
    let block = Block::default()
        .title(Span::styled(
            " ⚙ mtsim policy comparison ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let spans = match report {
        None => vec![Span::styled("  no report yet", Style::default().fg(Color::DarkGray))],
        Some(r) => vec![
            Span::styled("  scenario: ", Style::default().fg(Color::DarkGray)),
            Span::styled(
                r.scenario.clone(),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            Span::styled("   threads: ", Style::default().fg(Color::DarkGray)),
            Span::raw(r.config.threads.to_string()),
            Span::styled("   load/store latency: ", Style::default().fg(Color::DarkGray)),
            Span::raw(format!("{}/{}", r.config.load_latency, r.config.store_latency)),
            Span::styled("   switch penalty: ", Style::default().fg(Color::DarkGray)),
            Span::raw(r.config.switch_cycles.to_string()),
        ],
    };
    f.render_widget(Paragraph::new(Line::from(spans)), inner);
}

fn render_empty(f: &mut Frame, area: Rect) {
    let msg = Paragraph::new(vec![
        Line::raw(""),
        Line::from(Span::styled(
            "  No report found.",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "  Run mtsim to produce one.",
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    f.render_widget(msg, area);
}

// ---------------------------------------------------------------------------
// Cycle breakdown panel
// ---------------------------------------------------------------------------

fn percent(part: u64, whole: u64) -> u16 {
    if whole == 0 {
        0
    } else {
        ((part as f64 / whole as f64) * 100.0).clamp(0.0, 100.0) as u16
    }
}

fn render_breakdown(f: &mut Frame, area: Rect, stats: &RunStats) {
    let title = format!(" {}  CPI {:.3} ", stats.policy, stats.cpi());
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2), // issue gauge
            Constraint::Length(2), // idle gauge
            Constraint::Length(2), // switch gauge
            Constraint::Min(0),    // text stats
        ])
        .split(inner);

    let gauges = [
        ("Issue", stats.instructions, Color::Green),
        ("Idle", stats.idle_cycles, Color::DarkGray),
        ("Switch", stats.switch_cycles, Color::Red),
    ];
    for (i, (label, count, color)) in gauges.into_iter().enumerate() {
        let gauge = Gauge::default()
            .block(Block::default().title(label))
            .gauge_style(Style::default().fg(color))
            .percent(percent(count, stats.cycles))
            .label(format!("{} / {}", count, stats.cycles));
        f.render_widget(gauge, rows[i]);
    }

    let text = Line::from(vec![
        Span::styled("Switches: ", Style::default().fg(Color::DarkGray)),
        Span::raw(stats.switches.to_string()),
    ]);
    f.render_widget(Paragraph::new(text), rows[3]);
}

// ---------------------------------------------------------------------------
// Timeline strip
// ---------------------------------------------------------------------------

fn render_timeline(f: &mut Frame, area: Rect, stats: &RunStats) {
    let block = Block::default()
        .title(format!(" {} timeline ", stats.policy))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(events) = stats.timeline.as_ref() else {
        f.render_widget(
            Paragraph::new(Span::styled("  no timeline recorded", Style::default().fg(Color::DarkGray))),
            inner,
        );
        return;
    };

    // One cell per cycle: thread id for issues, '·' idle, '×' switch.
    let per_row = (inner.width as usize).max(1);
    let max_rows = inner.height.saturating_sub(1) as usize;
    let mut lines: Vec<Line> = events
        .chunks(per_row)
        .take(max_rows)
        .map(|row| {
            let spans: Vec<Span> = row
                .iter()
                .map(|e| match e {
                    CycleEvent::Issue { tid, .. } => Span::styled(
                        (tid % 10).to_string(),
                        Style::default().fg(THREAD_COLORS[tid % THREAD_COLORS.len()]),
                    ),
                    CycleEvent::Idle => Span::styled("·", Style::default().fg(Color::DarkGray)),
                    CycleEvent::Switch { .. } => Span::styled("×", Style::default().fg(Color::Red)),
                })
                .collect();
            Line::from(spans)
        })
        .collect();

    lines.push(Line::from(Span::styled(
        format!("{} cycles   digit=issuing thread  ·=idle  ×=switch", events.len()),
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Registers
// ---------------------------------------------------------------------------

fn render_registers(f: &mut Frame, area: Rect, runs: &[RunStats]) {
    let block = Block::default().title(" Final registers ").borders(Borders::ALL);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    for stats in runs {
        for (tid, t) in stats.threads.iter().enumerate() {
            let regs: Vec<String> = t.regs.iter().map(|r| format!("{:>6}", r)).collect();
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {:<12} t{:<2} ", stats.policy, tid),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::raw(regs.join(" ")),
                Span::styled(
                    format!("   pc={} insts={}", t.pc, t.instructions),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }
    }
    f.render_widget(Paragraph::new(lines), inner);
}

// ---------------------------------------------------------------------------
// Footer
// ---------------------------------------------------------------------------

fn render_footer(f: &mut Frame, area: Rect) {
    let text = Paragraph::new(Span::styled(
        "  q / esc: quit    auto-refreshes every 200ms    reads /tmp/mtsim_report.json",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(text, area);
}
