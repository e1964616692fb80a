use std::io::Write;

use crossterm::{queue, style};

use crate::engine::stage::Screen;

/// Key hints shown above the canvas for each screen.
pub fn menu_items(screen: Screen) -> &'static [&'static str] {
    match screen {
        Screen::Intro => &["[Enter] continue", "[Ctrl-r] restart", "[Esc] quit", "[F11] full"],
        Screen::Map => &[
            "[←][→] select",
            "[Enter] play",
            "[n] next",
            "[b] bonus",
            "[Ctrl-r] restart",
            "[Esc] quit",
        ],
        Screen::Chapter => &[
            "[Tab] focus",
            "[Enter] choose",
            "[Space] +1",
            "[Ctrl-r] restart",
            "[Esc] quit",
            "[F11] full",
        ],
    }
}

/// Print a menu item string, bolding the key inside `[...]` brackets and
/// dimming the description around it.
pub fn print_menu_item(out: &mut impl Write, item: &str) -> std::io::Result<()> {
    let mut rest = item;
    while let Some(open) = rest.find('[') {
        if open > 0 {
            queue!(
                out,
                style::SetAttribute(style::Attribute::Dim),
                style::Print(&rest[..open]),
                style::SetAttribute(style::Attribute::Reset),
            )?;
        }
        rest = &rest[open..];
        let Some(close) = rest.find(']') else {
            return queue!(out, style::Print(rest));
        };
        queue!(
            out,
            style::SetAttribute(style::Attribute::Bold),
            style::Print(&rest[..=close]),
            style::SetAttribute(style::Attribute::Reset),
        )?;
        rest = &rest[close + 1..];
    }
    if !rest.is_empty() {
        queue!(
            out,
            style::SetAttribute(style::Attribute::Dim),
            style::Print(rest),
            style::SetAttribute(style::Attribute::Reset),
        )?;
    }
    Ok(())
}

/// Print the whole bar for `screen` on the current line.
pub fn print_menubar(out: &mut impl Write, screen: Screen) -> std::io::Result<()> {
    queue!(out, style::Print(" "))?;
    for (i, item) in menu_items(screen).iter().enumerate() {
        if i > 0 {
            queue!(out, style::Print("  "))?;
        }
        print_menu_item(out, item)?;
    }
    Ok(())
}
