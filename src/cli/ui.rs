use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rust_decimal::Decimal;
use std::time::Duration;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    Positive,
    Negative,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::Positive => style(text).green().bold(),
        StyleType::Negative => style(text).red().bold(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

/// Right aligned cell showing a rate at full precision.
pub fn rate_cell(rate: Decimal) -> Cell {
    Cell::new(rate.normalize().to_string()).set_alignment(CellAlignment::Right)
}

/// Creates a cell for displaying percentage change with color coding.
pub fn change_cell(change: Option<Decimal>) -> Cell {
    let Some(change) = change else {
        return Cell::new("N/A")
            .fg(Color::DarkGrey)
            .set_alignment(CellAlignment::Right);
    };
    let text = format!("{change:.2}%");
    let color = if change > Decimal::ZERO {
        Color::Green
    } else {
        Color::Red
    };
    Cell::new(text).fg(color).set_alignment(CellAlignment::Right)
}

/// Creates a ticking `indicatif` spinner with a message.
pub fn new_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg} [{elapsed_precise}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
