use ratatui::prelude::{Color, Rect};

/// Truncate a string to at most `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for the workflow status of a business document or lead
pub fn status_color(status: &str) -> Color {
  match status.to_lowercase().as_str() {
    "paid" | "delivered" | "completed" | "closed" | "converted" | "qualified" => Color::Green,
    "overdue" | "cancelled" | "lost" | "rejected" | "failed" => Color::Red,
    "open" | "pending" | "draft" | "in transit" | "shipped" | "contacted" => Color::Yellow,
    _ => Color::White,
  }
}

/// A `percent_x` wide, `height` tall rectangle centered in `area`
pub fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
  let width = (area.width * percent_x / 100).max(30).min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}
