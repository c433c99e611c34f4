//! UI rendering for the workbench.

use ratatui::{
    prelude::*,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use super::app::WorkbenchApp;
use crate::cpu::Register;
use crate::workbench::ExecPhase;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &WorkbenchApp) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(frame.area());

    // Left side: disassembly, registers, status
    let left_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(10),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(chunks[0]);

    draw_disassembly(frame, left_chunks[0], app);
    draw_registers(frame, left_chunks[1], app);
    draw_status(frame, left_chunks[2], app);

    // Right side: source text and help
    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(4)])
        .split(chunks[1]);

    draw_source(frame, right_chunks[0], app);
    draw_help(frame, right_chunks[1]);
}

/// Disassembly panel; shows the diagnostic instead when a stage failed.
fn draw_disassembly(frame: &mut Frame, area: Rect, app: &WorkbenchApp) {
    if let Some(diag) = app.bench.disassembly_diagnostic() {
        let paragraph = Paragraph::new(diag.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(diag_block(" Disassembly "));
        frame.render_widget(paragraph, area);
        return;
    }

    let current = app.current_line();
    let visible = (area.height as usize).saturating_sub(2);
    let items: Vec<ListItem> = app
        .bench
        .disassembly()
        .iter()
        .enumerate()
        .skip(app.disasm_scroll)
        .take(visible)
        .map(|(addr, line)| {
            let is_current = current == Some(addr);
            let prefix = if is_current { "▶ " } else { "  " };
            let style = if is_current {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{:04x}: {}", prefix, addr, line)).style(style)
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Disassembly ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(list, area);
}

/// Register panel with phase and stale markers.
fn draw_registers(frame: &mut Frame, area: Rect, app: &WorkbenchApp) {
    let regs = app.bench.registers();

    let phase = match app.bench.phase() {
        ExecPhase::Fresh => ("Fresh", Color::Green),
        ExecPhase::Running => ("Running", Color::Green),
        ExecPhase::Halted => ("Halted", Color::Red),
    };

    let mut state_line = vec![
        Span::raw("State: "),
        Span::styled(phase.0, Style::default().fg(phase.1)),
    ];
    if app.bench.is_stale() {
        state_line.push(Span::styled(
            "  (stale: showing the previous program)",
            Style::default().fg(Color::Magenta),
        ));
    }

    let reg_line = |pairs: &[(Register, u16)]| {
        let spans: Vec<Span> = pairs
            .iter()
            .flat_map(|(reg, val)| {
                vec![
                    Span::raw(format!("{}: ", reg)),
                    Span::styled(
                        format!("{:#06x}  ", val),
                        Style::default().fg(Color::White),
                    ),
                ]
            })
            .collect();
        Line::from(spans)
    };

    let content = vec![
        reg_line(&[
            (Register::PC, regs.pc),
            (Register::R2, regs.r2),
            (Register::R3, regs.r3),
            (Register::R4, regs.r4),
        ]),
        reg_line(&[
            (Register::R5, regs.r5),
            (Register::SP, regs.sp),
            (Register::LP, regs.lp),
        ]),
        Line::from(state_line),
    ];

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .title(" Registers ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );

    frame.render_widget(paragraph, area);
}

/// Source text panel, or the compile diagnostic when broken.
fn draw_source(frame: &mut Frame, area: Rect, app: &WorkbenchApp) {
    if let Some(diag) = app.bench.compile_diagnostic() {
        let paragraph = Paragraph::new(diag.to_string())
            .style(Style::default().fg(Color::Red))
            .wrap(ratatui::widgets::Wrap { trim: false })
            .block(diag_block(" Program (does not compile) "));
        frame.render_widget(paragraph, area);
        return;
    }

    let paragraph = Paragraph::new(app.bench.program().to_string()).block(
        Block::default()
            .title(" Program ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Blue)),
    );
    frame.render_widget(paragraph, area);
}

/// Status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &WorkbenchApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default().title(" Status ").borders(Borders::ALL));

    frame.render_widget(status, area);
}

/// Help panel.
fn draw_help(frame: &mut Frame, area: Rect) {
    let help = Paragraph::new(vec![
        Line::from("s: Step  x: Reset  e: Reload source"),
        Line::from("↑↓: Scroll disassembly  q: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default().title(" Help ").borders(Borders::ALL));

    frame.render_widget(help, area);
}

fn diag_block(title: &str) -> Block<'_> {
    Block::default()
        .title(title.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
}
