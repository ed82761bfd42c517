use std::collections::HashMap;
use std::io::stdout;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use folio_core::{Host, ManualHost, Page, presets};
use folio_protocol::{InputEvent, PointerPhase, Property, TargetId};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Style},
    symbols::Marker,
    text::Line,
    widgets::{
        Block, Borders, Paragraph,
        canvas::{Canvas, Points, Rectangle},
    },
};

use crate::stage::{Mirror, visible_ratio};

/// Wheel delta per key press or mouse notch, in CSS pixels.
const WHEEL_STEP: f64 = 120.0;
const FRAME_BUDGET: Duration = Duration::from_millis(16);

/// Reveal observers the preview simulates: last reported ratio per target.
#[derive(Debug, Default)]
struct Observers {
    ratios: HashMap<TargetId, f64>,
}

impl Observers {
    /// Report every card whose visible fraction changed since last time.
    fn observe(&mut self, page: &mut Page<ManualHost>, scroll: f64, cards: usize) {
        let height = page.host().viewport().height;
        let card = TargetId::new(presets::PROJECT_CARD);
        for i in 0..cards {
            let target = card.nth(i);
            let Some(geometry) = page.host().measure(&target) else {
                continue;
            };
            let ratio = visible_ratio(geometry, height, scroll);
            if self.ratios.get(&target) == Some(&ratio) {
                continue;
            }
            self.ratios.insert(target.clone(), ratio);
            page.handle_input(InputEvent::Intersection { target, ratio });
        }
    }
}

pub fn run_preview(page: &mut Page<ManualHost>, cards: usize) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut mirror = Mirror::default();
    let mut observers = Observers::default();
    let mut hovered = false;
    let mut last = Instant::now();

    loop {
        let offset = page.scroll_state().virtual_offset;
        observers.observe(page, offset, cards);

        let elapsed = last.elapsed();
        last = Instant::now();
        if let Some((request, now)) = page.host_mut().advance(elapsed.as_secs_f64() * 1000.0) {
            mirror.apply(&page.frame(request, now));
        }

        terminal.draw(|frame| draw(frame, &*page, &mirror, hovered))?;

        if !event::poll(FRAME_BUDGET)? {
            continue;
        }
        let page_height = page.host().viewport().height;
        match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Down | KeyCode::Char('j') => {
                    page.handle_input(InputEvent::Wheel {
                        delta_y: WHEEL_STEP,
                    });
                }
                KeyCode::Up | KeyCode::Char('k') => {
                    page.handle_input(InputEvent::Wheel {
                        delta_y: -WHEEL_STEP,
                    });
                }
                KeyCode::PageDown => page.handle_input(InputEvent::Wheel {
                    delta_y: page_height,
                }),
                KeyCode::PageUp => page.handle_input(InputEvent::Wheel {
                    delta_y: -page_height,
                }),
                KeyCode::Char(c @ '1'..='4') => {
                    let index = c as usize - '1' as usize;
                    if let Some(section) = presets::NAV_SECTIONS.get(index) {
                        page.scroll_to_target(&TargetId::new(section));
                    }
                }
                KeyCode::Char('h') => {
                    hovered = !hovered;
                    let phase = if hovered {
                        PointerPhase::Enter
                    } else {
                        PointerPhase::Leave
                    };
                    page.handle_input(InputEvent::Pointer {
                        target: TargetId::new(presets::HERO_CTA).nth(0),
                        phase,
                    });
                }
                _ => {}
            },
            Event::Mouse(mouse) => match mouse.kind {
                MouseEventKind::ScrollDown => page.handle_input(InputEvent::Wheel {
                    delta_y: WHEEL_STEP,
                }),
                MouseEventKind::ScrollUp => page.handle_input(InputEvent::Wheel {
                    delta_y: -WHEEL_STEP,
                }),
                _ => {}
            },
            _ => {}
        }
    }

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(())
}

fn draw(frame: &mut Frame<'_>, page: &Page<ManualHost>, mirror: &Mirror, hovered: bool) {
    let area = frame.area();
    let header_area = Rect::new(0, 0, area.width, 1);
    let header = Block::default()
        .title(format!(
            " folio | {} | ↑↓ scroll | 1-4 sections | h hover | q quit ",
            page.profile().tier
        ))
        .style(Style::default().fg(Color::White).bg(Color::DarkGray));
    frame.render_widget(header, header_area);

    let body = Rect::new(0, 1, area.width, area.height.saturating_sub(1));
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(body);
    frame.render_widget(status(page, mirror, hovered), left);
    draw_scene(frame, page, mirror, right);
}

fn status<'a>(page: &Page<ManualHost>, mirror: &Mirror, hovered: bool) -> Paragraph<'a> {
    let scroll = page.scroll_state();
    let mut lines = vec![
        Line::from(format!(
            "scroll  raw {:>7.1}  virtual {:>7.1}",
            scroll.raw_offset, scroll.virtual_offset
        )),
        Line::from(format!(
            "        velocity {:>7.1}  {:?}",
            scroll.velocity, scroll.direction
        )),
        Line::from(format!(
            "frames  {}  commands {}  values {}",
            page.frames(),
            mirror.commands(),
            mirror.len()
        )),
        Line::from(format!(
            "cta     {}  scrolled to {:.0}",
            if hovered { "hovered" } else { "idle" },
            mirror.scroll()
        )),
        Line::from(""),
    ];

    for timeline in page.timelines().iter() {
        let filled = (timeline.progress() * 20.0).round() as usize;
        lines.push(Line::from(format!(
            "{:<16} [{:<20}] {:>3.0}%",
            timeline.id(),
            "=".repeat(filled.min(20)),
            timeline.progress() * 100.0
        )));
    }
    lines.push(Line::from(""));

    for target in mirror.targets() {
        let opacity = mirror.composed(&target, Property::Opacity).unwrap_or(1.0);
        let y = mirror.composed(&target, Property::Y).unwrap_or(0.0);
        let scale = mirror.composed(&target, Property::Scale).unwrap_or(1.0);
        lines.push(Line::from(format!(
            "{:<28} o {opacity:.2} y {y:>6.1} s {scale:.2}",
            target.as_str()
        )));
    }

    Paragraph::new(lines).block(Block::default().borders(Borders::RIGHT).title(" page "))
}

fn draw_scene(frame: &mut Frame<'_>, page: &Page<ManualHost>, mirror: &Mirror, area: Rect) {
    let title = format!(" scene: {:?} ", page.scene_status());
    let Some(scene) = mirror.scene() else {
        frame.render_widget(Block::default().title(title), area);
        return;
    };

    let canvas = Canvas::default()
        .block(Block::default().title(title))
        .marker(Marker::Braille)
        .x_bounds([-1.0, 1.0])
        .y_bounds([-1.0, 1.0])
        .paint(|ctx| {
            let shade = (f64::from(scene.opacity) * 255.0) as u8;
            let points: Vec<(f64, f64)> = scene
                .particles
                .iter()
                .filter_map(|p| scene.project(*p, true))
                .collect();
            let (r, g, b) = scene.tint();
            ctx.draw(&Points {
                coords: &points,
                color: Color::Rgb(r, g, b),
            });
            for index in 0..scene.cards.len() {
                let Some((x, y)) = scene.card_position(index).and_then(|p| scene.project(p, false))
                else {
                    continue;
                };
                ctx.draw(&Rectangle {
                    x: x - 0.05,
                    y: y - 0.08,
                    width: 0.1,
                    height: 0.16,
                    color: Color::Rgb(shade, shade, shade),
                });
            }
        });
    frame.render_widget(canvas, area);
}
