/// Cuts `value` to at most `max_chars` characters, marking the cut with `...`.
pub fn preview(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((end, _)) => format!("{}...", &value[..end]),
        None => value.to_string(),
    }
}
