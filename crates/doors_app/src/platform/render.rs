use doors_core::RunViewModel;

/// Lines to print when the view moves from `prev` to `next`.
pub fn render(prev: &RunViewModel, next: &RunViewModel) -> Vec<String> {
    let mut lines: Vec<String> = new_log_lines(&prev.log, &next.log)
        .iter()
        .map(|line| format!("  {line}"))
        .collect();

    let status = next.status_line();
    if status != prev.status_line() {
        lines.push(format!("[{status}]"));
    }
    if next.outputs.len() > prev.outputs.len() && next.outputs.starts_with(&prev.outputs) {
        for path in &next.outputs[prev.outputs.len()..] {
            lines.push(format!("  wrote {}", path.display()));
        }
    }
    lines
}

/// Lines of `next` that were not in `prev`.
///
/// Both are tails of the same log, so the new lines follow the longest
/// suffix of `prev` that is also a prefix of `next`.
fn new_log_lines<'a>(prev: &[String], next: &'a [String]) -> &'a [String] {
    let longest = prev.len().min(next.len());
    let overlap = (0..=longest)
        .rev()
        .find(|&k| prev[prev.len() - k..] == next[..k])
        .unwrap_or(0);
    &next[overlap..]
}

/// Keeps the last rendered view and prints the difference.
#[derive(Default)]
pub struct Renderer {
    last: RunViewModel,
}

impl Renderer {
    pub fn draw(&mut self, view: RunViewModel) {
        for line in render(&self.last, &view) {
            println!("{line}");
        }
        self.last = view;
    }
}
