use cv_core::{LineItem, SlotResult};

/// One-line status strip for a sequential run, e.g. `✅ Mug | ⏳ Tote`.
pub fn render_strip(items: &[LineItem]) -> String {
    items
        .iter()
        .map(|item| format!("{} {}", item.result.icon(), item.instruction))
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Status strip for a concurrent batch, e.g. `[1 ✅] [2 ⏳]`.
pub fn render_slots<T>(slots: &[SlotResult<T>]) -> String {
    slots
        .iter()
        .enumerate()
        .map(|(index, slot)| format!("[{} {}]", index + 1, slot.icon()))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn failure_lines(items: &[LineItem]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| {
            item.result
                .failure()
                .map(|failure| format!("{}: {} ({})", item.instruction, failure.message, failure.kind))
        })
        .collect()
}
