use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Tabs, Wrap},
    Frame,
};
use visionary_core::{GeneratedImage, Tab, TEMPLATES};

use crate::app::{App, InputMode, SettingsField};

const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, tabs_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_tabs(app, frame, tabs_area);

    match app.state().active_tab {
        Tab::Generate => render_generate(app, frame, body_area),
        Tab::History => render_history(app, frame, body_area),
        Tab::Templates => render_templates(app, frame, body_area),
        Tab::Settings => render_settings(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let settings = &app.state().settings;
    let key_indicator = if app.gemini.is_some() {
        Span::styled(" ", Style::default())
    } else {
        Span::styled(" [no API key] ", Style::default().fg(Color::Red))
    };

    let title = Line::from(vec![
        Span::styled(" Visionary ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
        key_indicator,
        Span::styled(
            format!(
                " {} | {} | {} ",
                settings.style.as_str(),
                settings.aspect_ratio.as_str(),
                settings.model_id
            ),
            Style::default().fg(Color::White),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_tabs(app: &App, frame: &mut Frame, area: Rect) {
    let state = app.state();
    let titles: Vec<Line> = Tab::all()
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let label = match tab {
                Tab::History if !state.history.is_empty() => {
                    format!("{} {} ({})", i + 1, tab.title(), state.history.len())
                }
                _ => format!("{} {}", i + 1, tab.title()),
            };
            Line::from(label)
        })
        .collect();

    let tabs = Tabs::new(titles)
        .select(state.active_tab.index())
        .style(Style::default().fg(Color::Gray))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .divider("|");
    frame.render_widget(tabs, area);
}

fn render_generate(app: &mut App, frame: &mut Frame, area: Rect) {
    let [prompt_area, status_area, result_area] = Layout::vertical([
        Constraint::Length(7),
        Constraint::Length(2),
        Constraint::Min(0),
    ])
    .areas(area);

    let editing = app.input_mode == InputMode::Editing && app.editing_field.is_none();
    let state = app.state();

    let border_style = if editing {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let prompt_text = if state.prompt.is_empty() && !editing {
        Line::from(Span::styled(
            "Describe what you want to see...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Line::from(state.prompt.clone())
    };
    let prompt = Paragraph::new(prompt_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border_style)
                .title(if editing { " Prompt (editing) " } else { " Prompt " }),
        );
    frame.render_widget(prompt, prompt_area);

    if editing {
        if let Some(position) = wrapped_cursor(prompt_area, app.prompt_cursor) {
            frame.set_cursor_position(position);
        }
    }

    let spinner = SPINNER[app.animation_frame as usize % SPINNER.len()];
    let mut status_lines = Vec::new();
    let mut activity = Vec::new();
    if state.is_generating {
        activity.push(Span::styled(
            format!("{} Generating...", spinner),
            Style::default().fg(Color::Magenta),
        ));
    }
    if state.is_assistant_running {
        if !activity.is_empty() {
            activity.push(Span::raw("  "));
        }
        activity.push(Span::styled(
            format!("{} Expanding prompt...", spinner),
            Style::default().fg(Color::Blue),
        ));
    }
    status_lines.push(Line::from(activity));
    if let Some(error) = &state.error {
        status_lines.push(Line::from(Span::styled(
            format!("Error: {}", error),
            Style::default().fg(Color::Red),
        )));
    }
    frame.render_widget(Paragraph::new(status_lines), status_area);

    let result_block = Block::default()
        .borders(Borders::ALL)
        .title(" Latest result ");
    match state.latest_image() {
        Some(image) => {
            let details = Paragraph::new(image_details(image))
                .wrap(Wrap { trim: true })
                .block(result_block);
            frame.render_widget(details, result_area);
        }
        None => {
            let empty = Paragraph::new(Line::from(Span::styled(
                "Nothing generated yet. Press i to write a prompt, Enter to generate.",
                Style::default().fg(Color::DarkGray),
            )))
            .block(result_block);
            frame.render_widget(empty, result_area);
        }
    }
}

fn offset(origin: u16, n: usize) -> u16 {
    origin.saturating_add(u16::try_from(n).unwrap_or(u16::MAX))
}

/// Cursor cell inside a bordered block whose text wraps by character.
/// `None` once the cursor has scrolled past the last inner row.
fn wrapped_cursor(area: Rect, cursor: usize) -> Option<(u16, u16)> {
    let inner_width = usize::from(area.width.saturating_sub(2).max(1));
    let x = offset(area.x.saturating_add(1), cursor % inner_width);
    let y = offset(area.y.saturating_add(1), cursor / inner_width);
    (y < area.bottom().saturating_sub(1)).then_some((x, y))
}

fn image_details(image: &GeneratedImage) -> Vec<Line<'static>> {
    let label = Style::default().fg(Color::Gray);
    let favorite = if image.is_favorite { " ★" } else { "" };

    vec![
        Line::from(vec![
            Span::styled(image.prompt.clone(), Style::default().bold()),
            Span::styled(favorite.to_string(), Style::default().fg(Color::Yellow)),
        ]),
        Line::default(),
        Line::from(vec![
            Span::styled("Style: ", label),
            Span::raw(image.style.as_str().to_string()),
            Span::styled("   Ratio: ", label),
            Span::raw(image.aspect_ratio.as_str().to_string()),
        ]),
        Line::from(vec![
            Span::styled("Model: ", label),
            Span::raw(image.metadata.model.clone()),
        ]),
        Line::from(vec![
            Span::styled("Seed: ", label),
            Span::raw(image.metadata.seed.to_string()),
            Span::styled("   Guidance: ", label),
            Span::raw(format!("{}", image.metadata.guidance_scale)),
        ]),
        Line::from(vec![
            Span::styled("Created: ", label),
            Span::raw(image.created_label()),
        ]),
        Line::from(vec![
            Span::styled("Image: ", label),
            Span::raw(image.payload_summary()),
        ]),
    ]
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, detail_area] =
        Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)]).areas(area);

    let state = app.state();
    let title = format!(
        " History ({} images, {} favorites) ",
        state.history.len(),
        state.favorite_count()
    );

    if state.history.is_empty() {
        let empty = Paragraph::new("No images yet.")
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(title));
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = state
        .history
        .iter()
        .map(|image| {
            let star = if image.is_favorite { "★ " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(star, Style::default().fg(Color::Yellow)),
                Span::styled(
                    format!("{} ", image.created_label()),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(image.prompt.clone()),
            ]))
        })
        .collect();

    let detail = app
        .selected_image()
        .map(image_details)
        .unwrap_or_default();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut app.history_state);

    let details = Paragraph::new(detail)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Details "));
    frame.render_widget(details, detail_area);
}

fn render_templates(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)]).areas(area);

    let items: Vec<ListItem> = TEMPLATES
        .iter()
        .map(|t| ListItem::new(t.name))
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Templates "))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut app.templates_state);

    let preview = match app.templates_state.selected().and_then(|i| TEMPLATES.get(i)) {
        Some(template) => vec![
            Line::from(Span::styled(template.name, Style::default().bold())),
            Line::default(),
            Line::from(template.prompt),
            Line::default(),
            Line::from(vec![
                Span::styled("Style: ", Style::default().fg(Color::Gray)),
                Span::raw(template.style.as_str()),
            ]),
        ],
        None => Vec::new(),
    };
    let preview = Paragraph::new(preview)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title(" Preview "));
    frame.render_widget(preview, preview_area);
}

fn render_settings(app: &mut App, frame: &mut Frame, area: Rect) {
    let [list_area, edit_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(3)]).areas(area);

    let items: Vec<ListItem> = SettingsField::all()
        .into_iter()
        .map(|field| {
            let hint = if field.is_text() { "Enter" } else { "</>" };
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!("{:<16}", field.label()),
                    Style::default().fg(Color::Gray),
                ),
                Span::raw(app.field_value(field)),
                Span::styled(format!("  [{}]", hint), Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(" Generation settings "))
        .highlight_style(Style::default().bg(Color::Blue).fg(Color::White))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, list_area, &mut app.settings_state);

    if let Some(field) = app.editing_field {
        let input = Paragraph::new(app.field_input.as_str()).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" {} ", field.label())),
        );
        frame.render_widget(input, edit_area);
        let x = offset(edit_area.x.saturating_add(1), app.field_cursor);
        if x < edit_area.right().saturating_sub(1) {
            frame.set_cursor_position((x, edit_area.y + 1));
        }
    } else if let Some(error) = &app.state().error {
        let error = Paragraph::new(Span::styled(error.clone(), Style::default().fg(Color::Red)))
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(error, edit_area);
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let hint = |key: &'static str, label: &'static str| {
        [
            Span::styled(format!(" {} ", key), key_style),
            Span::styled(format!(" {} ", label), label_style),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style)];
    let pairs: Vec<(&'static str, &'static str)> = match (app.input_mode, app.state().active_tab) {
        (InputMode::Editing, _) if app.editing_field.is_some() => {
            vec![("Enter", "save"), ("Esc", "cancel")]
        }
        (InputMode::Editing, _) => vec![("Enter", "generate"), ("^E", "expand"), ("Esc", "done")],
        (InputMode::Normal, Tab::Generate) => vec![
            ("i", "edit"),
            ("g", "generate"),
            ("e", "expand"),
            ("x", "clear"),
        ],
        (InputMode::Normal, Tab::History) => {
            vec![("j/k", "nav"), ("f", "favorite"), ("p", "reuse prompt")]
        }
        (InputMode::Normal, Tab::Templates) => vec![("j/k", "nav"), ("Enter", "use")],
        (InputMode::Normal, Tab::Settings) => vec![
            ("j/k", "nav"),
            ("h/l", "change"),
            ("Enter", "edit"),
            ("r", "random seed"),
        ],
    };
    for (key, label) in pairs {
        spans.extend(hint(key, label));
    }
    if app.input_mode == InputMode::Normal {
        if app.has_running_tasks() {
            spans.extend(hint("Esc", "cancel"));
        }
        spans.extend(hint("1-4", "tabs"));
        spans.extend(hint("q", "quit"));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
