use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset, GraphType, List,
        ListItem, Paragraph,
    },
    Frame,
};

use super::App;
use crate::engine::chart::{bucket_hour, bucket_label, BUCKET_COUNT};
use crate::engine::surface::{self, LineField};
use crate::engine::{MarkerColor, NoticeBody, NoticeLevel};
use crate::model::LineId;
use crate::scrap::FormField;

const HISTORY_ROWS: usize = 8;

pub(super) fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(11),
            Constraint::Min(10),
            Constraint::Length(12),
            Constraint::Length(3),
            Constraint::Length(1),
        ])
        .split(f.area());

    header(f, app, chunks[0]);

    let kpi_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(35),
            Constraint::Percentage(35),
            Constraint::Percentage(30),
        ])
        .split(chunks[1]);
    line_card(f, app, LineId::One, kpi_row[0]);
    line_card(f, app, LineId::Two, kpi_row[1]);
    totals_card(f, app, kpi_row[2]);

    let chart_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[2]);
    line_chart(f, app, LineId::One, chart_row[0]);
    line_chart(f, app, LineId::Two, chart_row[1]);

    let desk_row = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(30),
            Constraint::Percentage(40),
            Constraint::Percentage(30),
        ])
        .split(chunks[3]);
    scrap_form(f, app, desk_row[0]);
    scrap_history(f, app, desk_row[1]);
    class_tally(f, app, desk_row[2]);

    let input = Paragraph::new(app.input.as_str())
        .style(Style::default().fg(Color::Cyan))
        .block(Block::default().borders(Borders::ALL).title(" Command "));
    f.render_widget(input, chunks[4]);

    let footer = Paragraph::new(format!(" {} | ESC: Quit ", app.status))
        .style(Style::default().fg(Color::DarkGray));
    f.render_widget(footer, chunks[5]);

    notices(f, app);
}

fn header(f: &mut Frame, app: &App, area: Rect) {
    let (link, color) = if app.connected {
        ("LIVE", Color::Green)
    } else {
        ("POLLING", Color::Yellow)
    };
    let mut spans = vec![
        Span::styled(" Line Watch ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(format!("[{}] ", link), Style::default().fg(color)),
        Span::from(format!("{} ", app.config.server_url)),
    ];
    if let Some(url) = &app.preview_url {
        spans.push(Span::styled(format!("preview {}", url), Style::default().fg(Color::DarkGray)));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn labelled<'a>(label: &'a str, value: &'a str, style: Style) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("{:<12}", label), Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(value, style),
    ])
}

fn delta_style(app: &App, id: &str) -> Style {
    if app.dashboard.board().has_flag(id, surface::POSITIVE) {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    }
}

fn line_card(f: &mut Frame, app: &App, line: LineId, area: Rect) {
    let board = app.dashboard.board();
    let ids: Vec<String> = LineField::ALL.iter().map(|field| field.id(line)).collect();
    let plain = Style::default();
    let target = app.dashboard.line_state(line).current_target;
    let target_text = target.to_string();

    let lines = vec![
        labelled("Program", board.text_or_blank(&ids[0]), plain),
        labelled("Part", board.text_or_blank(&ids[1]), plain),
        labelled("Description", board.text_or_blank(&ids[2]), plain),
        labelled("Target/h", &target_text, plain),
        labelled("Quantity", board.text_or_blank(&ids[3]), Style::default().fg(Color::Cyan)),
        labelled("Delta", board.text_or_blank(&ids[4]), delta_style(app, &ids[4])),
        labelled("Scrap", board.text_or_blank(&ids[5]), plain),
        labelled("Scrap rate", board.text_or_blank(&ids[6]), Style::default().fg(Color::Magenta)),
    ];
    let card = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(format!(" {} ", line.label())));
    f.render_widget(card, area);
}

fn totals_card(f: &mut Frame, app: &App, area: Rect) {
    let board = app.dashboard.board();
    let plain = Style::default();
    let lines = vec![
        labelled("Quantity", board.text_or_blank(surface::TOTAL_QUANTITY), Style::default().fg(Color::Cyan)),
        labelled(
            "Delta",
            board.text_or_blank(surface::TOTAL_DELTA),
            delta_style(app, surface::TOTAL_DELTA),
        ),
        labelled("Scrap", board.text_or_blank(surface::TOTAL_SCRAP), plain),
        labelled("Scrap rate", board.text_or_blank(surface::AVERAGE_SCRAP_RATE), plain),
        labelled("Updated", board.text_or_blank(surface::LAST_REFRESH), Style::default().fg(Color::DarkGray)),
    ];
    let card = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Totals "));
    f.render_widget(card, area);
}

fn marker_color(marker: MarkerColor) -> Color {
    match marker {
        MarkerColor::Green => Color::Green,
        MarkerColor::Red => Color::Red,
        MarkerColor::Blue => Color::Blue,
    }
}

fn line_chart(f: &mut Frame, app: &App, line: LineId, area: Rect) {
    let chart = app.dashboard.chart(line);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!(" {} by hour (target / actual) ", line.label()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let parts = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(inner);

    let mut bars = BarChart::default()
        .bar_width(1)
        .bar_gap(0)
        .group_gap(1)
        .value_style(Style::default().fg(Color::DarkGray));
    for index in 0..BUCKET_COUNT {
        let group = BarGroup::default()
            .label(Line::from(format!("{:02}", bucket_hour(index))))
            .bars(&[
                Bar::default()
                    .value(chart.target_series()[index])
                    .style(Style::default().fg(Color::DarkGray)),
                Bar::default()
                    .value(chart.quantity_series()[index])
                    .style(Style::default().fg(Color::Cyan)),
            ]);
        bars = bars.data(group);
    }
    f.render_widget(bars, parts[0]);

    let points: Vec<(f64, f64)> = chart
        .rate_series()
        .iter()
        .enumerate()
        .filter_map(|(index, rate)| rate.map(|r| (index as f64, r as f64)))
        .collect();
    let y_max = points.iter().map(|(_, y)| *y).fold(0.0, f64::max).max(10.0);
    let color = marker_color(chart.marker());

    let rates = Chart::new(vec![Dataset::default()
        .name("parts/h")
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(color))
        .data(&points)])
    .x_axis(
        Axis::default()
            .bounds([0.0, (BUCKET_COUNT - 1) as f64])
            .labels(vec![
                Line::from(bucket_label(0)),
                Line::from(bucket_label(BUCKET_COUNT - 1)),
            ]),
    )
    .y_axis(
        Axis::default()
            .bounds([0.0, y_max])
            .labels(vec![Line::from("0"), Line::from(format!("{:.0}", y_max))]),
    );
    f.render_widget(rates, parts[1]);
}

fn scrap_form(f: &mut Frame, app: &App, area: Rect) {
    let form = app.desk.form();
    let style_for = |field: FormField| {
        if form.is_invalid(field) {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        }
    };
    let line_text = form.line().map(|l| l.label()).unwrap_or_default();
    let part_text = if form.part_enabled() {
        form.part_number().unwrap_or_default().to_string()
    } else {
        "(select a program)".to_string()
    };
    let options = |items: &[String]| -> String {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };
    let program_options = options(app.desk.programs());
    let part_options = options(app.desk.parts());

    let lines = vec![
        labelled("Line", &line_text, style_for(FormField::Line)),
        labelled("Program", form.program().unwrap_or_default(), style_for(FormField::Program)),
        labelled("Part Number", &part_text, style_for(FormField::PartNumber)),
        labelled("Defect Code", form.defect_code().unwrap_or_default(), style_for(FormField::DefectCode)),
        labelled(
            "Description",
            form.defect_description().unwrap_or_default(),
            style_for(FormField::DefectDescription),
        ),
        labelled("Comments", form.comments(), Style::default()),
        Line::from(""),
        labelled("Programs", &program_options, Style::default().fg(Color::DarkGray)),
        labelled("Parts", &part_options, Style::default().fg(Color::DarkGray)),
    ];
    let panel = Paragraph::new(lines).block(Block::default().borders(Borders::ALL).title(" Scrap Report "));
    f.render_widget(panel, area);
}

fn scrap_history(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .desk
        .history()
        .take(HISTORY_ROWS)
        .map(|r| {
            ListItem::new(format!(
                "{}  L{}  {} {}  {} {}",
                r.time, r.line, r.program, r.part_number, r.defect_code, r.defect_description
            ))
        })
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Scrap History "));
    f.render_widget(list, area);
}

fn class_tally(f: &mut Frame, app: &App, area: Rect) {
    let items: Vec<ListItem> = app
        .dashboard
        .tally()
        .iter()
        .map(|(class, entry)| ListItem::new(format!("{:>4}  {} ({})", entry.count, entry.description, class)))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" Parts Seen "));
    f.render_widget(list, area);
}

/// Stacked toasts in the top-right corner, newest at the bottom.
fn notices(f: &mut Frame, app: &App) {
    let area = f.area();
    let width = area.width.min(50);
    let mut y = area.y + 1;
    for notice in app.dashboard.notices().visible() {
        let (title, body, color) = match &notice.body {
            NoticeBody::PartDetected(part) => (
                format!(" New part on {} ", part.line.label()),
                vec![
                    Line::from(format!("{} / {}", part.program, part.part_number)),
                    Line::from(part.description.clone()),
                ],
                Color::Blue,
            ),
            NoticeBody::Message { level, text } => {
                let color = match level {
                    NoticeLevel::Success => Color::Green,
                    NoticeLevel::Error => Color::Red,
                };
                (" Notice ".to_string(), vec![Line::from(text.clone())], color)
            }
        };
        let height = body.len() as u16 + 2;
        if y + height > area.bottom() {
            break;
        }
        let rect = Rect::new(area.right().saturating_sub(width + 1), y, width, height);
        f.render_widget(Clear, rect);
        let toast = Paragraph::new(body).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(title),
        );
        f.render_widget(toast, rect);
        y += height;
    }
}
