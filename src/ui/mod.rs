use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs, Wrap};
use ratatui::Frame;
use regex::Regex;
use time::OffsetDateTime;
use unicode_width::UnicodeWidthStr;

use crate::app::state::{AppState, Engagement, FocusPane};
use crate::config::themes::ThemeRegistry;
use crate::config::DisplayOptions;
use crate::feed::format::{
    avatar_url, format_count, format_relative_time, post_count_label, score_badge,
    truncate_display, visible_images,
};
use crate::feed::Post;
use crate::highlight::split_matches;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Everything a frame needs besides the mutable list cursor.
pub struct ViewContext<'a> {
    pub state: &'a AppState,
    pub registry: &'a ThemeRegistry,
    pub display: &'a DisplayOptions,
    pub now: OffsetDateTime,
    pub tick: usize,
}

pub fn draw_app(frame: &mut Frame, ctx: &ViewContext<'_>, list_state: &mut ListState) {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(3),
        ])
        .split(frame.size());

    frame.render_widget(header(), vertical[0]);
    frame.render_widget(theme_picker(ctx), vertical[1]);
    frame.render_widget(Paragraph::new(feed_heading(ctx)), vertical[2]);

    let body = vertical[3];
    let state = ctx.state;
    if state.is_loading() {
        let spinner = SPINNER[ctx.tick % SPINNER.len()];
        let loading = Paragraph::new(Text::from(vec![
            Line::from(""),
            Line::from(format!("{spinner} Loading posts...")),
        ]))
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(loading, body);
    } else if state.is_empty() {
        frame.render_widget(empty_state(), body);
    } else {
        let highlight = state.query.highlight.as_ref();
        let width = body.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = state
            .posts()
            .iter()
            .enumerate()
            .map(|(idx, post)| {
                let engagement = state.engagement_for(post);
                let lines = post_lines(
                    post,
                    engagement,
                    ctx,
                    highlight,
                    width,
                    idx == state.cursor,
                );
                ListItem::new(lines)
            })
            .collect();
        list_state.select(Some(state.cursor));
        let border_style = if matches!(state.focus, FocusPane::Feed) {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default()
        };
        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border_style),
            )
            .highlight_style(Style::default().add_modifier(Modifier::BOLD))
            .highlight_symbol("▸ ");
        frame.render_stateful_widget(list, body, list_state);
    }

    render_footer(frame, state, vertical[4]);
}

fn header() -> Paragraph<'static> {
    Paragraph::new(Text::from(vec![
        Line::from(vec![
            Span::styled("𝕏 ", Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(
                "AI Feed",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from(Span::styled(
            "Personalized recommendations powered by AI",
            Style::default().fg(Color::Gray),
        )),
    ]))
}

fn theme_picker<'a>(ctx: &ViewContext<'a>) -> Tabs<'a> {
    let titles: Vec<Line> = ctx
        .registry
        .list_themes()
        .enumerate()
        .map(|(idx, theme)| {
            let label = if theme.icon.is_empty() {
                format!("{} {}", idx + 1, theme.display_name)
            } else {
                format!("{} {} {}", idx + 1, theme.icon, theme.display_name)
            };
            Line::from(label)
        })
        .collect();
    let selected = ctx
        .registry
        .position(ctx.state.selected_theme_id())
        .unwrap_or(0);
    let description = ctx
        .registry
        .get(ctx.state.selected_theme_id())
        .map(|theme| theme.description.clone())
        .unwrap_or_default();
    Tabs::new(titles)
        .select(selected)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Choose your feed: {description}")),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .divider("│")
}

fn feed_heading(ctx: &ViewContext<'_>) -> Line<'static> {
    let name = ctx
        .registry
        .get(ctx.state.selected_theme_id())
        .map(|theme| theme.display_name.clone())
        .unwrap_or_else(|_| ctx.state.selected_theme_id().to_string());
    Line::from(vec![
        Span::styled(name, Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(
            post_count_label(ctx.state.len()),
            Style::default().fg(Color::Gray),
        ),
    ])
}

fn empty_state() -> Paragraph<'static> {
    Paragraph::new(Text::from(vec![
        Line::from(""),
        Line::from("No posts found for this theme"),
        Line::from(Span::styled(
            "Try running the scoring script first!",
            Style::default()
                .fg(Color::Gray)
                .add_modifier(Modifier::ITALIC),
        )),
    ]))
    .alignment(Alignment::Center)
    .block(Block::default().borders(Borders::ALL))
}

fn post_lines<'a>(
    post: &'a Post,
    engagement: Engagement,
    ctx: &ViewContext<'_>,
    highlight: Option<&Regex>,
    width: usize,
    selected: bool,
) -> Vec<Line<'a>> {
    let muted = Style::default().fg(Color::Gray);
    let mut lines = Vec::new();

    lines.push(Line::from(vec![
        Span::styled(
            post.author.name.as_str(),
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" @{}", post.author.username), muted),
        Span::styled(" · ", muted),
        Span::styled(format_relative_time(post.created_at, ctx.now), muted),
        Span::raw("  "),
        Span::styled(
            score_badge(post),
            Style::default()
                .fg(Color::Black)
                .bg(Color::Green)
                .add_modifier(Modifier::BOLD),
        ),
    ]));

    let max_lines = usize::from(ctx.display.text_preview_lines.max(1));
    let mut text_lines = post.text.lines().filter(|line| !line.trim().is_empty());
    for line in text_lines.by_ref().take(max_lines) {
        let clipped = truncate_display(line, width);
        lines.push(highlighted_line(&clipped, highlight));
    }
    if text_lines.next().is_some() {
        lines.push(Line::from(Span::styled("…", muted)));
    }

    let images = visible_images(post, ctx.display.max_images);
    if !images.is_empty() {
        let label = if images.len() == 1 {
            "🖼 1 image".to_string()
        } else {
            format!("🖼 {} images", images.len())
        };
        lines.push(Line::from(Span::styled(label, muted)));
    }

    let like_style = if engagement.liked {
        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
    } else {
        muted
    };
    let heart = if engagement.liked { "♥" } else { "♡" };
    lines.push(Line::from(vec![
        Span::styled(format!("💬 {}", format_count(post.metrics.reply_count)), muted),
        Span::raw("   "),
        Span::styled(format!("🔁 {}", format_count(post.metrics.retweet_count)), muted),
        Span::raw("   "),
        Span::styled(
            format!("{heart} {}", format_count(engagement.displayed_like_count)),
            like_style,
        ),
    ]));

    if ctx.display.show_score_reason && !post.score_reason.trim().is_empty() {
        let reason = truncate_display(&format!("Why: {}", post.score_reason.trim()), width);
        lines.push(Line::from(Span::styled(
            reason,
            muted.add_modifier(Modifier::ITALIC),
        )));
    }

    if selected {
        let avatar = avatar_url(&post.author, &ctx.display.fallback_avatar_url);
        lines.push(Line::from(Span::styled(
            truncate_display(&format!("avatar {avatar}"), width),
            Style::default().fg(Color::DarkGray),
        )));
        for image in images {
            lines.push(Line::from(Span::styled(
                truncate_display(&format!("image {}", image.url), width),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines
}

fn highlighted_line(text: &str, highlight: Option<&Regex>) -> Line<'static> {
    let hit = Style::default()
        .fg(Color::Yellow)
        .add_modifier(Modifier::BOLD);
    let spans: Vec<Span<'static>> = split_matches(text, highlight)
        .into_iter()
        .map(|(segment, is_match)| {
            if is_match {
                Span::styled(segment.to_string(), hit)
            } else {
                Span::raw(segment.to_string())
            }
        })
        .collect();
    Line::from(spans)
}

fn render_footer(frame: &mut Frame, state: &AppState, area: Rect) {
    if state.query.active {
        let prompt = "Search: ";
        let input = Paragraph::new(Line::from(vec![
            Span::styled(prompt, Style::default().fg(Color::Cyan)),
            Span::raw(state.query.buffer.as_str()),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Find a feed (Enter submit • Esc cancel)")
                .border_style(Style::default().fg(Color::Cyan)),
        );
        frame.render_widget(input, area);
        let offset = (prompt.width() + state.query.buffer.width()) as u16;
        let max_x = area.x + area.width.saturating_sub(2);
        frame.set_cursor((area.x + 1 + offset).min(max_x), area.y + 1);
        return;
    }

    let hints = "Tab/1-9 theme • / search • j/k move • l like • q quit";
    let mut spans = vec![Span::styled(
        state.selection.phase.to_string(),
        Style::default().add_modifier(Modifier::BOLD),
    )];
    spans.push(Span::raw(" | "));
    match &state.status_message {
        Some(message) => spans.push(Span::styled(
            message.as_str(),
            Style::default().fg(Color::Yellow),
        )),
        None => spans.push(Span::raw(hints)),
    }
    let footer = Paragraph::new(Line::from(spans))
        .style(Style::default().fg(Color::Gray))
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(footer, area);
}
