use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, QUICK_ACTIONS};
use crate::coordinator::RequestState;
use crate::nav::Section;
use crate::session::Role;
use crate::voice::VoiceState;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.char_indices().peekable();
    let mut current_text = String::new();

    while let Some((_, c)) = chars.next() {
        if c == '*' {
            // Check for ** (bold)
            if chars.peek().map(|(_, c)| *c) == Some('*') {
                chars.next();

                if !current_text.is_empty() {
                    spans.push(Span::raw(std::mem::take(&mut current_text)));
                }

                // Find closing **
                let mut bold_text = String::new();
                let mut found_close = false;

                while let Some((_, c)) = chars.next() {
                    if c == '*' && chars.peek().map(|(_, c)| *c) == Some('*') {
                        chars.next();
                        found_close = true;
                        break;
                    }
                    bold_text.push(c);
                }

                if found_close && !bold_text.is_empty() {
                    spans.push(Span::styled(
                        bold_text,
                        Style::default().add_modifier(Modifier::BOLD),
                    ));
                } else {
                    // No closing **, treat as literal
                    current_text.push_str("**");
                    current_text.push_str(&bold_text);
                }
            } else {
                current_text.push(c);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::raw(current_text));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    if app.widget_open {
        let [page_area, widget_area] =
            Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
                .areas(body_area);
        render_page(app, frame, page_area);
        render_widget(app, frame, widget_area);
    } else {
        render_page(app, frame, body_area);
    }

    render_footer(app, frame, footer_area);

    if let Some(notice) = app.notice.clone() {
        render_notice(frame, area, &notice);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![Span::styled(
        " concierge ",
        Style::default().fg(Color::Cyan).bold(),
    )];
    for section in Section::all() {
        let style = if section == app.current_section {
            Style::default().fg(Color::Yellow).bold()
        } else {
            Style::default().fg(Color::DarkGray)
        };
        spans.push(Span::styled(format!(" {} ", section.title()), style));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_page(app: &App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" {} ", app.current_section.title()));

    let body: Vec<Line> = section_body(app.current_section)
        .lines()
        .map(parse_markdown_line)
        .collect();

    let page = Paragraph::new(Text::from(body))
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(page, area);
}

fn section_body(section: Section) -> &'static str {
    match section {
        Section::Hero => {
            "**Hi, I'm Satyam.**\n\n\
             Software engineer building web things and the tools around them.\n\n\
             Use the arrow keys to walk through the page, or press 'a' and just \
             ask the assistant where to go."
        }
        Section::About => {
            "**About**\n\n\
             A few years of building products end to end: front ends, APIs, \
             infrastructure, and the glue in between. Most at home where a \
             product question turns into a systems question."
        }
        Section::Projects => {
            "**Projects**\n\n\
             - Portfolio concierge: the assistant you are talking to right now.\n\
             - Weather canvas: an ambient background that follows the local forecast.\n\
             - Mail relay: a small contact-form delivery service."
        }
        Section::Skills => {
            "**Skills**\n\n\
             TypeScript, React, Next.js, Rust, Node.js, SQL, a healthy respect \
             for boring technology."
        }
        Section::Contact => {
            "**Contact**\n\n\
             The contact form on the site reaches me directly, or ask the \
             assistant for the email address."
        }
    }
}

fn render_widget(app: &mut App, frame: &mut Frame, area: Rect) {
    let listening = app.voice.state() == VoiceState::Listening;
    let input_height = if listening { 4 } else { 3 };
    let quick_height = if app.show_quick_actions() {
        QUICK_ACTIONS.len() as u16 + 1
    } else {
        0
    };

    let [chat_area, quick_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(quick_height),
        Constraint::Length(input_height),
    ])
    .areas(area);

    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Assistant ");

    let mut lines: Vec<Line> = Vec::new();
    for msg in app.store.messages() {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.push(Line::from(msg.content.clone()));
                lines.push(Line::default());
            }
            Role::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Assistant:",
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line));
                }
                lines.push(Line::default());
            }
        }
    }

    if app.coordinator.state() == RequestState::Pending {
        lines.push(Line::from(Span::styled(
            "Assistant:",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if quick_height > 0 {
        let mut quick_lines = vec![Line::from(Span::styled(
            "Quick actions:",
            Style::default().fg(Color::DarkGray),
        ))];
        for (i, (label, _)) in QUICK_ACTIONS.iter().enumerate() {
            quick_lines.push(Line::from(format!("  F{}  {}", i + 1, label)));
        }
        frame.render_widget(Paragraph::new(Text::from(quick_lines)), quick_area);
    }

    render_input(app, frame, input_area, listening);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, listening: bool) {
    let (title, border_color) = if listening {
        (" Listening... ", Color::Red)
    } else if app.voice.is_supported() {
        (" Type, or Ctrl+R to speak ", Color::Yellow)
    } else {
        (" Type your message ", Color::Yellow)
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Horizontal scroll keeps the cursor visible in a narrow input
    let inner_width = area.width.saturating_sub(2) as usize;
    let scroll_offset = if inner_width == 0 {
        0
    } else if app.cursor >= inner_width {
        app.cursor - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let mut text = vec![Line::from(Span::styled(
        visible_text,
        Style::default().fg(Color::Cyan),
    ))];
    if listening {
        text.push(Line::from(Span::styled(
            "Speak now, Esc to cancel",
            Style::default().fg(Color::Red),
        )));
    }

    frame.render_widget(Paragraph::new(Text::from(text)).block(input_block), area);

    if !listening {
        let cursor_x = area.x + 1 + (app.cursor.saturating_sub(scroll_offset)) as u16;
        frame.set_cursor_position((cursor_x.min(area.x + area.width.saturating_sub(2)), area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let hint = if app.notice.is_some() {
        "press any key to dismiss"
    } else if app.widget_open {
        "Enter send | Ctrl+R voice | Ctrl+L clear | Esc close | Ctrl+C quit"
    } else {
        "←/→ sections | a assistant | q quit"
    };
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            format!(" {hint}"),
            Style::default().fg(Color::DarkGray),
        ))),
        area,
    );
}

fn render_notice(frame: &mut Frame, area: Rect, notice: &str) {
    let width = (notice.len() as u16 + 6).min(area.width.saturating_sub(4)).max(20);
    let popup = centered_rect(width, 5, area);

    frame.render_widget(Clear, popup);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice ");
    let text = Paragraph::new(notice.to_string())
        .block(block)
        .wrap(Wrap { trim: true });
    frame.render_widget(text, popup);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}
