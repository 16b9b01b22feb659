use content_inspector::ContentType;

/// Looks at the first 1024 bytes to decide whether content is text.
/// UTF-8 and UTF-16 (with BOM) count as text.
pub fn is_text_content(bytes: &[u8]) -> bool {
    let sample = if bytes.len() > 1024 {
        &bytes[..1024]
    } else {
        bytes
    };

    !matches!(content_inspector::inspect(sample), ContentType::BINARY)
}

/// Number of lines as an editor would show them: an empty file has one line.
pub fn count_lines(content: &str) -> usize {
    content.matches('\n').count() + 1
}
