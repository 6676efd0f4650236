use crate::app::App;
use crate::braille;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 40;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;
const SAND_COLOR: Color = Color::Rgb(230, 196, 120);

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Status
            Constraint::Length(6), // Board
            Constraint::Min(6),    // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_board_box(frame, sections[1], app);
    render_controls_box(frame, sections[2]);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Hourglass ");
    let simulation = app.simulation();
    let threshold = simulation.detector().threshold();
    let settling = simulation.state().stable_ticks;

    // Settling bar fills as the probe window stays static
    let bar_width = area.width.saturating_sub(4) as usize;
    let filled = (settling as usize * bar_width) / (threshold as usize + 1).max(1);
    let empty = bar_width.saturating_sub(filled);

    let (status_text, status_color) = if app.is_paused() {
        ("PAUSED", HIGHLIGHT_COLOR)
    } else {
        ("RUNNING", BORDER_COLOR)
    };

    let text = |s: String| Line::from(Span::styled(s, Style::default().fg(TEXT_COLOR)));

    let mut content = vec![
        text(format!("Ticks: {}", simulation.ticks())),
        text(format!("Flips: {}", simulation.flips())),
        text(format!("Gravity: {}", simulation.gravity().name())),
        text(format!("Settle: {settling}/{threshold}")),
        Line::from(vec![
            Span::styled("█".repeat(filled), Style::default().fg(SAND_COLOR)),
            Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled(status_text, Style::default().fg(status_color)),
            Span::styled(
                format!(" {} fps", app.config.timing.fps),
                Style::default().fg(DIM_TEXT_COLOR),
            ),
        ]),
    ];
    if let Some(message) = &app.status_message {
        content.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    }

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_board_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Board ");
    let simulation = app.simulation();
    let grid = simulation.grid();
    let dim = Style::default().fg(DIM_TEXT_COLOR);
    let orientation = if app.config.portrait {
        "portrait"
    } else {
        "landscape"
    };

    let content = vec![
        Line::from(Span::styled(
            app.config.layout.name(),
            Style::default().fg(HIGHLIGHT_COLOR),
        )),
        Line::from(Span::styled(
            format!("{} grains", simulation.particles().len()),
            dim,
        )),
        Line::from(Span::styled(
            format!("{}x{} {}", grid.cols(), grid.rows(), orientation),
            dim,
        )),
        Line::from(Span::styled(format!("Seed {:#010x}", app.seed), dim)),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    // Helper to create a control line
    let make_control = |key: &'static str, desc: &'static str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume"),
        make_control("R", "reseed + reset"),
        make_control("L", "next layout"),
        make_control("G", "flip gravity"),
        make_control("+/-", "fps"),
        make_control("P", "portrait"),
        make_control("V", "fullscreen"),
        make_control("H/?", "help"),
        make_control("Q", "quit"),
    ];

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let Some(view) = app.animation.sink().view() else {
        frame.render_widget(styled_block(""), area);
        return;
    };

    // Flag downsampled output, which can hide single-cell detail
    let (native_width, native_height) = braille::native_size(&view, app.config.portrait);
    let scaled = area.width.saturating_sub(2) < native_width
        || area.height.saturating_sub(2) < native_height;
    let block = styled_block(if scaled { " scaled " } else { "" });

    let inner = block.inner(area);
    frame.render_widget(block, area);
    let cells = braille::render_to_braille(&view, inner.width, inner.height, app.config.portrait);

    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            let cell_rect = Rect {
                x,
                y,
                width: 1,
                height: 1,
            };
            let span = Span::styled(cell.char.to_string(), Style::default().fg(SAND_COLOR));
            let paragraph = Paragraph::new(Line::from(span));
            frame.render_widget(paragraph, cell_rect);
        }
    }
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    // Calculate the canvas area (exclude sidebar unless fullscreen)
    let canvas_x = if app.fullscreen_mode { 0 } else { SIDEBAR_WIDTH };
    let canvas_width = if app.fullscreen_mode {
        area.width
    } else {
        area.width.saturating_sub(SIDEBAR_WIDTH)
    };

    // Center the help dialog within the canvas
    let help_width = 56.min(canvas_width.saturating_sub(4));
    let help_height = area.height.saturating_sub(4).min(30);
    let x = canvas_x + (canvas_width.saturating_sub(help_width)) / 2;
    let y = (area.height.saturating_sub(help_height)) / 2;

    let help_area = Rect {
        x: area.x + x,
        y: area.y + y,
        width: help_width,
        height: help_height,
    };

    // Clear the background
    frame.render_widget(Clear, help_area);

    let heading = Style::default().fg(HIGHLIGHT_COLOR);
    let content = vec![
        Line::from(""),
        Line::from(Span::styled("FALLING-SAND HOURGLASS", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Every tick each grain tries to fall one cell along the gravity axis. A blocked grain spills sideways into a free neighbour, picking at random when both are free."),
        Line::from(""),
        Line::from(Span::styled("GRAVITY FLIPS:", heading)),
        Line::from("A probe window watches the hourglass neck. When it stays unchanged for more ticks than the threshold, gravity reverses and the sand flows back."),
        Line::from(""),
        Line::from(Span::styled("LAYOUTS:", heading)),
        Line::from("Hourglass: plain glass. Pegboard: staggered pegs in both bulbs. Custom boards load with --layout-file."),
        Line::from(""),
        Line::from(Span::styled("CONTROLS:", heading)),
        Line::from("Space=Pause, R=Reseed, L/Shift+L=Layout, G=Flip gravity, +/-=FPS, P=Portrait, V=Fullscreen, Q=Quit"),
        Line::from(""),
    ];

    let content_height = content.len() as u16;
    let visible_height = help_height.saturating_sub(2); // minus borders
    let max_scroll = content_height.saturating_sub(visible_height);
    let is_scrollable = max_scroll > 0;

    // Update title to show scroll hint if scrollable
    let title = if is_scrollable {
        " Help (J/K scroll, H to close) "
    } else {
        " Help (H to close) "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}
