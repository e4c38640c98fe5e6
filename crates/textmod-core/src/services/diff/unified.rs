use similar::TextDiff;

/// Git-style unified diff of one file with three lines of context.
pub fn unified_diff(path: &str, old: &str, new: &str) -> String {
    let path = path.replace('\\', "/");
    let diff = TextDiff::from_lines(old, new);
    let mut unified = diff.unified_diff();
    unified
        .context_radius(3)
        .header(&format!("a/{}", path), &format!("b/{}", path));
    unified.to_string()
}

/// Removed and added line counts of a unified diff, headers excluded.
pub fn changed_lines(diff: &str) -> (usize, usize) {
    diff.lines().fold((0, 0), |(removed, added), line| {
        if line.starts_with("---") || line.starts_with("+++") {
            (removed, added)
        } else if line.starts_with('-') {
            (removed + 1, added)
        } else if line.starts_with('+') {
            (removed, added + 1)
        } else {
            (removed, added)
        }
    })
}
