/// Default character budget per realtime synthesis request
pub const DEFAULT_CHUNK_SIZE: usize = 2500;

/// Split text into chunks of at most `budget` characters, cutting only
/// between lines
///
/// Line terminators stay attached to their line, so joining the chunks
/// reproduces the input exactly. A line longer than the budget is emitted
/// whole as its own chunk. Empty input yields a single empty chunk.
pub fn split_into_chunks(text: &str, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_chars = 0;

    for line in text.split_inclusive('\n') {
        let line_chars = line.chars().count();

        if !current.is_empty() && current_chars + line_chars > budget {
            chunks.push(std::mem::take(&mut current));
            current_chars = 0;
        }

        current.push_str(line);
        current_chars += line_chars;
    }

    if !current.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }

    chunks
}
