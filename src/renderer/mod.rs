//! Renderer: the deterministic rasterizer.
//!
//! Takes the retained `Presentation` (from the engine) and produces a cell
//! grid for the player. Given the same presentation, size and clock it always
//! produces the same grid. It knows nothing about scene semantics.

use tokio::time::Instant;

use crate::engine::source::Route;
use crate::engine::stage::{Presentation, Screen};
use crate::engine::surface::{Effect, Element, ElementId, Kind, Layout, Mark, PanelStatus, Surface};
use crate::map::MapModel;
use crate::progress::unlocks::NodeStatus;
use crate::types::{Cell, CellChange, Color, Grid, NamedColor, ORANGE, Style, TerminalContract, WIDE_TAIL};

type Row = Vec<Cell>;
type Styled = Vec<(char, Style)>;

/// Horizontal margin on each side of the content column.
const MARGIN: usize = 2;
const PANEL_HEIGHT: usize = 5;

pub struct Renderer;

impl Renderer {
    /// Rasterize the presentation onto a fixed-size cell grid.
    pub fn rasterize(pres: &Presentation, contract: TerminalContract, now: Instant) -> Grid {
        let w = contract.width as usize;
        let h = contract.height as usize;
        let mut grid = vec![vec![Cell::default(); w]; h];
        if w == 0 || h == 0 || pres.screen.opacity <= 0.0 {
            return grid;
        }

        let rows = match pres.screen.active {
            Screen::Map => map_rows(&pres.title, &pres.map, w),
            Screen::Intro | Screen::Chapter => surface_rows(&pres.surface, w),
        };

        // Keep the newest content on screen; otherwise sit a third of the way down.
        let skip = rows.len().saturating_sub(h);
        let top = (h.saturating_sub(rows.len())) / 3;
        for (i, row) in rows.into_iter().skip(skip).enumerate() {
            if let Some(dst) = grid.get_mut(top + i) {
                *dst = row;
            }
        }

        draw_bursts(&mut grid, &pres.surface, now);

        if pres.screen.opacity < 1.0 {
            for cell in grid.iter_mut().flatten() {
                cell.style.dim = true;
            }
        }
        grid
    }

    /// Compute a cell-level diff between two grids of the same size.
    pub fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
        let mut changes = Vec::new();
        for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
            for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
                if prev_cell != next_cell {
                    changes.push(CellChange {
                        x: x as u16,
                        y: y as u16,
                        cell: next_cell.clone(),
                    });
                }
            }
        }
        changes
    }
}

// ---------------------------------------------------------------------------
// Text shaping
// ---------------------------------------------------------------------------

fn is_zero_width(ch: char) -> bool {
    matches!(ch, '\u{FE0F}' | '\u{200D}' | '\u{20E3}')
}

/// BMP symbols that terminals draw double-width (emoji presentation).
const WIDE_SYMBOLS: &[char] = &['☕', '⚡', '⌛', '⏳', '⏰', '✅', '❌', '❓', '❗', '✨', '⭐'];

fn char_width(ch: char) -> usize {
    if ch as u32 >= 0x1F000 || WIDE_SYMBOLS.contains(&ch) { 2 } else { 1 }
}

fn styled_width(line: &[(char, Style)]) -> usize {
    line.iter().map(|(c, _)| char_width(*c)).sum()
}

fn mark_style(base: Style, mark: Mark) -> Style {
    match mark {
        Mark::Plain => base,
        Mark::Struck => Style {
            crossed: true,
            dim: true,
            ..base
        },
        Mark::Bounce => base.bold(),
        Mark::Highlight => Style {
            fg: Some(ORANGE),
            bold: true,
            ..base
        },
    }
}

fn element_style(el: &Element) -> Style {
    let mut style = el.style;
    for effect in &el.effects {
        match effect {
            Effect::Shake | Effect::MicroShake | Effect::HardShake | Effect::Thump | Effect::SlowZoom => {
                style.bold = true
            }
            Effect::Glitch => style.reverse = true,
            Effect::FadeInDry => style.italic = true,
            _ => {}
        }
    }
    style
}

fn styled_text(el: &Element) -> Styled {
    let base = element_style(el);
    let mut out: Styled = el
        .segments
        .iter()
        .flat_map(|seg| {
            let style = mark_style(base, seg.mark);
            seg.text.chars().map(move |c| (c, style))
        })
        .collect();
    out.retain(|(c, _)| !is_zero_width(*c));
    if el.has_effect(Effect::Caret) {
        out.push(('|', base));
    }
    out
}

/// Word-wrap styled text to `width` display columns. Breaks at spaces (the
/// space is consumed) and hard-breaks words longer than a row. `\n` always
/// starts a new row.
fn wrap(text: &[(char, Style)], width: usize) -> Vec<Styled> {
    let width = width.max(1);
    let mut rows = Vec::new();
    for logical in text.split(|(c, _)| *c == '\n') {
        if logical.is_empty() {
            rows.push(Vec::new());
            continue;
        }
        let mut pos = 0;
        while pos < logical.len() {
            // How many chars fit on this row.
            let mut used = 0;
            let mut fit = 0;
            for (c, _) in &logical[pos..] {
                let cw = char_width(*c);
                if used + cw > width {
                    break;
                }
                used += cw;
                fit += 1;
            }
            if pos + fit >= logical.len() {
                rows.push(logical[pos..].to_vec());
                break;
            }
            let chunk = &logical[pos..pos + fit];
            let (len, advance) = match chunk.iter().rposition(|(c, _)| *c == ' ') {
                Some(sp) if sp > 0 => (sp, sp + 1),
                _ => (fit.max(1), fit.max(1)),
            };
            rows.push(logical[pos..pos + len].to_vec());
            pos += advance;
            while pos < logical.len() && logical[pos].0 == ' ' {
                pos += 1;
            }
        }
    }
    rows
}

fn blank(width: usize) -> Row {
    vec![Cell::default(); width]
}

/// Place styled text in a row of `width` cells, centred.
fn centred(line: &[(char, Style)], width: usize) -> Row {
    let mut row = blank(width);
    let x = width.saturating_sub(styled_width(line)) / 2;
    put(&mut row, x, line);
    row
}

fn put(row: &mut Row, x: usize, line: &[(char, Style)]) {
    let mut col = x;
    for (ch, style) in line {
        let cw = char_width(*ch);
        if col + cw > row.len() {
            break;
        }
        row[col] = Cell { ch: *ch, style: *style };
        if cw == 2 {
            row[col + 1] = Cell {
                ch: WIDE_TAIL,
                style: *style,
            };
        }
        col += cw;
    }
}

fn paste(dst: &mut Row, x: usize, src: &Row) {
    for (i, cell) in src.iter().enumerate() {
        if let Some(d) = dst.get_mut(x + i) {
            *d = cell.clone();
        }
    }
}

fn plain(text: &str, style: Style) -> Styled {
    text.chars().filter(|c| !is_zero_width(*c)).map(|c| (c, style)).collect()
}

// ---------------------------------------------------------------------------
// Surface layout
// ---------------------------------------------------------------------------

fn surface_rows(surface: &Surface, w: usize) -> Vec<Row> {
    let inner = w.saturating_sub(2 * MARGIN).max(1);
    let mut rows: Vec<Row> = Vec::new();

    let mut prev_was_text = true;
    for (id, el) in surface.top_level() {
        let is_text = matches!(el.kind, Kind::Text);
        if !rows.is_empty() && (!is_text || !prev_was_text) {
            rows.push(blank(inner));
        }
        rows.extend(element_rows(surface, id, el, inner));
        prev_was_text = is_text;
    }

    if let Some(field) = surface.input().filter(|f| f.visible) {
        rows.push(blank(inner));
        let mut line = plain("> ", Style::default().bold());
        if field.value.is_empty() {
            line.extend(plain(&field.placeholder, Style::default().dim()));
        } else {
            line.extend(plain(&field.value, Style::default()));
        }
        if field.focused {
            line.push(('_', Style::default().bold()));
        }
        rows.extend(wrap(&line, inner).iter().map(|l| centred(l, inner)));
        if field.rejected {
            let hint = plain(
                "Too short, write a bit more",
                Style::fg(Color::Named(NamedColor::Red)),
            );
            rows.push(centred(&hint, inner));
        }
    }

    let mut buttons: Styled = Vec::new();
    for (i, control) in surface.controls().iter().enumerate() {
        if !control.visible {
            continue;
        }
        if !buttons.is_empty() {
            buttons.extend(plain("  ", Style::default()));
        }
        let mut style = if control.primary {
            Style::fg(ORANGE).bold()
        } else {
            Style::default()
        };
        if !control.enabled {
            style.dim = true;
        }
        if surface.focus() == Some(i) && control.enabled {
            style.reverse = true;
        }
        buttons.extend(plain(&format!("[ {} ]", control.label), style));
    }
    if !buttons.is_empty() {
        rows.push(blank(inner));
        rows.extend(wrap(&buttons, inner).iter().map(|l| centred(l, inner)));
    }

    rows.into_iter()
        .map(|r| {
            let mut full = blank(w);
            paste(&mut full, MARGIN.min(w.saturating_sub(1)), &r);
            full
        })
        .collect()
}

fn element_rows(surface: &Surface, id: ElementId, el: &Element, width: usize) -> Vec<Row> {
    let rows: Vec<Row> = match &el.kind {
        Kind::Text => wrap(&styled_text(el), width)
            .iter()
            .map(|l| centred(l, width))
            .collect(),
        Kind::Group(Layout::Stack) => surface
            .children(id)
            .flat_map(|(cid, child)| element_rows(surface, cid, child, width))
            .collect(),
        Kind::Group(Layout::Row) => {
            let children: Vec<_> = surface.children(id).collect();
            side_by_side(surface, &children, width)
        }
        Kind::Group(Layout::Grid { columns }) => {
            let children: Vec<_> = surface.children(id).collect();
            let mut rows = Vec::new();
            for chunk in children.chunks((*columns as usize).max(1)) {
                rows.extend(side_by_side(surface, chunk, width));
            }
            rows
        }
        Kind::Panel { number, tilt, border } => {
            let style = border.map(Style::fg).unwrap_or_default();
            let shift = (*tilt / 2.5).round() as isize;
            let box_w = width.saturating_sub(4).max(4);
            let content: Vec<Row> = surface
                .children(id)
                .flat_map(|(cid, child)| element_rows(surface, cid, child, box_w - 2))
                .collect();
            let framed = frame(&content, box_w, PANEL_HEIGHT, style, &format!(" {number} "));
            let x = (2 + shift).max(0) as usize;
            framed
                .into_iter()
                .map(|r| {
                    let mut row = blank(width);
                    paste(&mut row, x, &r);
                    row
                })
                .collect()
        }
        Kind::Image { src, alt } => {
            let label = if alt.is_empty() { src.as_str() } else { alt.as_str() };
            let line = plain(&format!("▣ {label}"), element_style(el));
            vec![centred(&line, width)]
        }
        Kind::Placeholder(status) => {
            let style = match status {
                PanelStatus::Loading => Style::default().dim(),
                PanelStatus::Failed => Style::fg(Color::Named(NamedColor::Red)),
                PanelStatus::TimedOut => Style::fg(Color::Named(NamedColor::Yellow)),
            };
            vec![centred(&plain(status.label(), style), width)]
        }
        Kind::Embed { url } => {
            let inner = wrap(&plain(&format!("▶ {url}"), Style::default()), width.saturating_sub(2))
                .iter()
                .map(|l| centred(l, width.saturating_sub(2)))
                .collect::<Vec<_>>();
            let h = inner.len() + 2;
            frame(&inner, width, h, Style::fg(Color::Named(NamedColor::Red)), " video ")
        }
        Kind::Link { url } => {
            let line = plain(&format!("{}: {url}", el.text()), element_style(el));
            wrap(&line, width).iter().map(|l| centred(l, width)).collect()
        }
    };

    if el.visible {
        rows
    } else {
        // Hidden elements keep their space so reveals do not shift the layout.
        rows.into_iter().map(|r| blank(r.len())).collect()
    }
}

fn side_by_side(surface: &Surface, children: &[(ElementId, &Element)], width: usize) -> Vec<Row> {
    if children.is_empty() {
        return Vec::new();
    }
    let col_w = width / children.len();
    let columns: Vec<Vec<Row>> = children
        .iter()
        .map(|(cid, child)| element_rows(surface, *cid, child, col_w))
        .collect();
    let height = columns.iter().map(Vec::len).max().unwrap_or(0);
    (0..height)
        .map(|y| {
            let mut row = blank(width);
            for (i, col) in columns.iter().enumerate() {
                if let Some(src) = col.get(y) {
                    paste(&mut row, i * col_w, src);
                }
            }
            row
        })
        .collect()
}

/// Draw a single-line box of `w`×`h` around `content`, with a title in the
/// top edge.
fn frame(content: &[Row], w: usize, h: usize, style: Style, title: &str) -> Vec<Row> {
    if w < 2 || h < 2 {
        return content.to_vec();
    }
    let mut rows = Vec::with_capacity(h);
    let mut top = blank(w);
    top[0] = Cell { ch: '┌', style };
    top[w - 1] = Cell { ch: '┐', style };
    for cell in &mut top[1..w - 1] {
        *cell = Cell { ch: '─', style };
    }
    put(&mut top, 2usize.min(w - 1), &plain(title, style));
    top[w - 1] = Cell { ch: '┐', style };
    rows.push(top);

    for y in 0..h - 2 {
        let mut row = blank(w);
        row[0] = Cell { ch: '│', style };
        row[w - 1] = Cell { ch: '│', style };
        if let Some(src) = content.get(y) {
            let inner: Row = src.iter().take(w - 2).cloned().collect();
            paste(&mut row, 1, &inner);
        }
        rows.push(row);
    }

    let mut bottom = blank(w);
    bottom[0] = Cell { ch: '└', style };
    bottom[w - 1] = Cell { ch: '┘', style };
    for cell in &mut bottom[1..w - 1] {
        *cell = Cell { ch: '─', style };
    }
    rows.push(bottom);
    rows
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

fn map_rows(title: &str, map: &MapModel, w: usize) -> Vec<Row> {
    let mut rows = vec![
        centred(&plain(title, Style::fg(ORANGE).bold()), w),
        blank(w),
    ];

    for (i, node) in map.nodes.iter().enumerate() {
        let (marker, mut style) = match node.status {
            NodeStatus::Completed => ("✓", Style::fg(Color::Named(NamedColor::Green))),
            NodeStatus::Available => ("●", Style::fg(Color::Named(NamedColor::Yellow)).bold()),
            NodeStatus::Locked => ("·", Style::default().dim()),
        };
        if i == map.selected {
            style.reverse = true;
        }
        let prefix = match node.route {
            Route::Main => "",
            Route::Bonus => "★ ",
        };
        let text = format!(" {marker} {prefix}{} ", node.name);
        rows.push(centred(&plain(&text, style), w));
    }

    let name_of = |id: &str| {
        map.nodes
            .iter()
            .find(|n| n.id == id)
            .map(|n| n.name.clone())
            .unwrap_or_else(|| id.to_string())
    };
    let mut quick: Styled = Vec::new();
    if let Some(main) = &map.quick.main {
        quick.extend(plain(&format!("[n] Next: {}", name_of(main)), Style::default().bold()));
    }
    if let Some(bonus) = &map.quick.bonus {
        if !quick.is_empty() {
            quick.extend(plain("    ", Style::default()));
        }
        quick.extend(plain(&format!("[b] Bonus: {}", name_of(bonus)), Style::fg(crate::types::PURPLE)));
    }
    if !quick.is_empty() {
        rows.push(blank(w));
        rows.push(centred(&quick, w));
    }
    if let Some(notice) = &map.notice {
        rows.push(blank(w));
        rows.push(centred(&plain(notice, Style::fg(Color::Named(NamedColor::Red))), w));
    }
    rows
}

// ---------------------------------------------------------------------------
// Particles
// ---------------------------------------------------------------------------

fn draw_bursts(grid: &mut Grid, surface: &Surface, now: Instant) {
    let h = grid.len();
    let w = grid.first().map_or(0, Vec::len);
    if h == 0 || w == 0 {
        return;
    }
    for burst in surface.bursts() {
        let progress = burst.age(now).as_secs_f32() / burst.ttl.as_secs_f32().max(f32::EPSILON);
        if progress >= 1.0 {
            continue;
        }
        for (i, piece) in burst.pieces.iter().enumerate() {
            // Stagger pieces so they do not fall as a single line.
            let lag = (i % 5) as f32 * 0.1;
            let fall = ((progress - lag).max(0.0) * h as f32) as usize;
            let x = ((piece.column.clamp(0.0, 1.0)) * (w - 1) as f32) as usize;
            let y = fall.min(h - 1);
            let cw = char_width(piece.glyph);
            if x + cw > w {
                continue;
            }
            let style = Style::fg(piece.color);
            grid[y][x] = Cell { ch: piece.glyph, style };
            if cw == 2 {
                grid[y][x + 1] = Cell { ch: WIDE_TAIL, style };
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::stage::ScreenState;
    use crate::engine::surface::{Control, ControlAction, Segment};

    fn contract() -> TerminalContract {
        TerminalContract { width: 40, height: 12 }
    }

    fn row_text(row: &[Cell]) -> String {
        row.iter().filter(|c| c.ch != WIDE_TAIL).map(|c| c.ch).collect::<String>().trim().to_string()
    }

    fn chapter(surface: Surface) -> Presentation {
        let mut pres = Presentation::new("Story");
        pres.screen = ScreenState { active: Screen::Chapter, opacity: 1.0 };
        pres.surface = surface;
        pres
    }

    #[test]
    fn wrap_breaks_at_spaces() {
        let text = plain("one two three", Style::default());
        let rows: Vec<String> = wrap(&text, 8).iter().map(|r| r.iter().map(|(c, _)| *c).collect()).collect();
        assert_eq!(rows, vec!["one two", "three"]);
    }

    #[test]
    fn wide_glyphs_take_two_cells() {
        let mut row = blank(6);
        put(&mut row, 0, &plain("a😋b", Style::default()));
        assert_eq!(row[1].ch, '😋');
        assert_eq!(row[2].ch, WIDE_TAIL);
        assert_eq!(row[3].ch, 'b');
    }

    #[test]
    fn hidden_text_keeps_its_row_blank() {
        let mut s = Surface::new();
        let a = s.push(Kind::Text, "shown", Style::default());
        s.show(a);
        s.push(Kind::Text, "hidden", Style::default());
        let grid = Renderer::rasterize(&chapter(s), contract(), Instant::now());
        let texts: Vec<String> = grid.iter().map(|r| row_text(r)).filter(|t| !t.is_empty()).collect();
        assert_eq!(texts, vec!["shown"]);
    }

    #[test]
    fn struck_segments_are_crossed() {
        let mut s = Surface::new();
        let id = s.push(Kind::Text, "", Style::default());
        s.set_segments(id, vec![Segment::plain("Moti"), Segment::marked("ce", Mark::Struck)]);
        s.show(id);
        let grid = Renderer::rasterize(&chapter(s), contract(), Instant::now());
        let crossed: String = grid.iter().flatten().filter(|c| c.style.crossed).map(|c| c.ch).collect();
        assert_eq!(crossed, "ce");
    }

    #[test]
    fn focused_control_is_reversed_and_disabled_is_dim() {
        let mut s = Surface::new();
        let a = s.push_control(Control::new("Yes", ControlAction::Choice(0)));
        let b = s.push_control(Control::new("No", ControlAction::Choice(1)));
        s.show_control(a);
        s.show_control(b);
        s.set_control_enabled(b, false);
        let grid = Renderer::rasterize(&chapter(s), contract(), Instant::now());
        let row = grid.iter().find(|r| row_text(r).contains("Yes")).unwrap();
        assert_eq!(row_text(row), "[ Yes ]  [ No ]");
        let y = row.iter().find(|c| c.ch == 'Y').unwrap();
        assert!(y.style.reverse);
        let n = row.iter().find(|c| c.ch == 'N').unwrap();
        assert!(n.style.dim && !n.style.reverse);
    }

    #[test]
    fn faded_out_screen_is_blank() {
        let mut s = Surface::new();
        let a = s.push(Kind::Text, "hello", Style::default());
        s.show(a);
        let mut pres = chapter(s);
        pres.screen.opacity = 0.0;
        let grid = Renderer::rasterize(&pres, contract(), Instant::now());
        assert!(grid.iter().flatten().all(|c| c.ch == ' '));
    }

    #[test]
    fn diff_reports_changed_cells_only() {
        let a = vec![vec![Cell::default(); 3]; 2];
        let mut b = a.clone();
        b[1][2].ch = 'x';
        let changes = Renderer::diff(&a, &b);
        assert_eq!(changes.len(), 1);
        assert_eq!((changes[0].x, changes[0].y), (2, 1));
    }
}
