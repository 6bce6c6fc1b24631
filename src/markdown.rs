use std::ops::Range;
use std::path::Path;

use tree_sitter::{Language, Node, Parser, Tree};

use crate::anchors::Slugger;
use crate::error::LoadError;
use crate::model::{CodeBlock, Heading};

/// Maximum markdown body size (4 MiB).
const MAX_BODY_SIZE: u64 = 4 * 1024 * 1024;

/// Block structure of a markdown body.
#[derive(Debug, Default)]
pub struct Blocks {
    /// Code blocks in source order.
    pub code_blocks: Vec<CodeBlock>,
    /// Zero-based body rows covered by code blocks, for skipping link extraction.
    pub code_rows: Vec<Range<usize>>,
    /// Headings in source order with anchors assigned.
    pub headings: Vec<Heading>,
}

impl Blocks {
    /// Whether a zero-based body row falls inside a code block.
    pub fn in_code(&self, row: usize) -> bool {
        return self.code_rows.iter().any(|r| return r.contains(&row));
    }
}

/// Heading level from an ATX heading's marker child.
fn atx_level(heading: Node<'_>) -> Option<u8> {
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        let level = match child.kind() {
            "atx_h1_marker" => 1,
            "atx_h2_marker" => 2,
            "atx_h3_marker" => 3,
            "atx_h4_marker" => 4,
            "atx_h5_marker" => 5,
            "atx_h6_marker" => 6,
            _ => continue,
        };
        return Some(level);
    }
    return None;
}

/// Heading text with an optional closing `#` sequence removed.
fn clean_heading_text(raw: &str) -> String {
    let trimmed = raw.trim();
    let without_closing = trimmed.trim_end_matches('#');
    if without_closing.len() != trimmed.len()
        && (without_closing.is_empty() || without_closing.ends_with(char::is_whitespace))
    {
        return without_closing.trim_end().to_string();
    }
    return trimmed.to_string();
}

/// Build a code block from a `fenced_code_block` node.
fn fenced_code_block(node: Node<'_>, source: &str, line_offset: u32) -> CodeBlock {
    let mut language = None;
    let mut text = String::new();
    let mut line = source_line(node, line_offset).saturating_add(1);

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "code_fence_content" => {
                text = child.utf8_text(source.as_bytes()).unwrap_or("").to_string();
                line = source_line(child, line_offset);
            },
            "info_string" => language = info_string_language(child, source),
            _ => {},
        }
    }

    return CodeBlock { language, line, text };
}

/// Language tag from an info string: the `language` child, else the first word.
fn info_string_language(info: Node<'_>, source: &str) -> Option<String> {
    let mut cursor = info.walk();
    for child in info.children(&mut cursor) {
        if child.kind() == "language" {
            let tag = child.utf8_text(source.as_bytes()).ok()?.trim().to_lowercase();
            return if tag.is_empty() { None } else { Some(tag) };
        }
    }
    let text = info.utf8_text(source.as_bytes()).ok()?;
    return text.split_whitespace().next().map(str::to_lowercase);
}

/// Parse a markdown body into headings and code blocks.
///
/// `line_offset` is the number of source lines preceding the body (the
/// frontmatter), so reported lines match the file on disk.
///
/// # Errors
///
/// Returns `LoadError::ParseFailed` if the body is too large or tree-sitter
/// cannot parse it.
pub fn parse_blocks(file: &Path, body: &str, line_offset: u32) -> Result<Blocks, LoadError> {
    let body_len: u64 = body.len().try_into().unwrap_or(u64::MAX);
    if body_len > MAX_BODY_SIZE {
        return Err(LoadError::ParseFailed {
            file: file.to_path_buf(),
            reason: format!("body is {body_len} bytes (max {MAX_BODY_SIZE})"),
        });
    }

    let tree = parse_tree(file, body)?;
    let mut blocks = Blocks::default();
    let mut raw_headings: Vec<(u8, String, u32)> = Vec::new();
    walk_blocks(tree.root_node(), body, line_offset, &mut blocks, &mut raw_headings);

    let mut slugger = Slugger::default();
    for (level, text, line) in raw_headings {
        let Some(anchor) = slugger.anchor(&text) else {
            continue;
        };
        blocks.headings.push(Heading { anchor, level, line, text });
    }

    return Ok(blocks);
}

/// Parse a markdown body into a tree-sitter tree.
///
/// # Errors
///
/// Returns `LoadError::ParseFailed` if the language cannot be set or parsing fails.
fn parse_tree(file: &Path, body: &str) -> Result<Tree, LoadError> {
    let language: Language = tree_sitter_md::LANGUAGE.into();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| return LoadError::ParseFailed { file: file.to_path_buf(), reason: e.to_string() })?;

    return parser.parse(body, None).ok_or_else(|| {
        return LoadError::ParseFailed {
            file: file.to_path_buf(),
            reason: "tree-sitter returned None".to_string(),
        };
    });
}

/// Zero-based rows a block node covers. A node ending at column 0 stops on the
/// previous row.
fn row_span(node: Node<'_>) -> Range<usize> {
    let end = node.end_position();
    let last = if end.column == 0 { end.row } else { end.row.saturating_add(1) };
    return node.start_position().row..last.max(node.start_position().row.saturating_add(1));
}

/// Heading level from a setext heading's underline child.
fn setext_level(heading: Node<'_>) -> Option<u8> {
    let mut cursor = heading.walk();
    for child in heading.children(&mut cursor) {
        match child.kind() {
            "setext_h1_underline" => return Some(1),
            "setext_h2_underline" => return Some(2),
            _ => {},
        }
    }
    return None;
}

/// One-based source line of a node.
fn source_line(node: Node<'_>, line_offset: u32) -> u32 {
    let row = u32::try_from(node.start_position().row).unwrap_or(u32::MAX);
    return row.saturating_add(line_offset).saturating_add(1);
}

/// Recursively collect headings and code blocks. Sections nest, so the walk
/// descends into every non-leaf node except code blocks.
fn walk_blocks(
    node: Node<'_>,
    source: &str,
    line_offset: u32,
    blocks: &mut Blocks,
    headings: &mut Vec<(u8, String, u32)>,
) {
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        match child.kind() {
            "atx_heading" => {
                let Some(level) = atx_level(child) else { continue };
                let text = child
                    .child_by_field_name("heading_content")
                    .and_then(|c| return c.utf8_text(source.as_bytes()).ok())
                    .unwrap_or("");
                headings.push((level, clean_heading_text(text), source_line(child, line_offset)));
            },
            "fenced_code_block" => {
                blocks.code_rows.push(row_span(child));
                blocks.code_blocks.push(fenced_code_block(child, source, line_offset));
            },
            "indented_code_block" => {
                blocks.code_rows.push(row_span(child));
                blocks.code_blocks.push(CodeBlock {
                    language: None,
                    line: source_line(child, line_offset),
                    text: child.utf8_text(source.as_bytes()).unwrap_or("").to_string(),
                });
            },
            "setext_heading" => {
                let Some(level) = setext_level(child) else { continue };
                let text = child
                    .child_by_field_name("heading_content")
                    .and_then(|c| return c.utf8_text(source.as_bytes()).ok())
                    .unwrap_or("");
                headings.push((level, clean_heading_text(text), source_line(child, line_offset)));
            },
            _ => walk_blocks(child, source, line_offset, blocks, headings),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Blocks {
        return parse_blocks(Path::new("t.md"), body, 0).unwrap();
    }

    #[test]
    fn atx_headings_with_levels_and_anchors() {
        let blocks = parse("# Models\n\n## Chat Models\n\ntext\n\n### Limits ###\n");
        let found: Vec<(u8, &str, &str)> = blocks
            .headings
            .iter()
            .map(|h| (h.level, h.text.as_str(), h.anchor.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![(1, "Models", "models"), (2, "Chat Models", "chat-models"), (3, "Limits", "limits")]
        );
    }

    #[test]
    fn heading_lines_include_offset() {
        let blocks = parse_blocks(Path::new("t.md"), "intro\n\n## Setup\n", 4).unwrap();
        assert_eq!(blocks.headings[0].line, 7);
    }

    #[test]
    fn duplicate_headings_suffixed() {
        let blocks = parse("## Example\n\n## Example\n");
        let anchors: Vec<&str> = blocks.headings.iter().map(|h| h.anchor.as_str()).collect();
        assert_eq!(anchors, vec!["example", "example-1"]);
    }

    #[test]
    fn fenced_blocks_tagged_and_headings_inside_ignored() {
        let body = "## Usage\n\n```bash\n# not a heading\ncurl https://api.example.com/v1/models\n```\n";
        let blocks = parse(body);
        assert_eq!(blocks.headings.len(), 1);
        assert_eq!(blocks.code_blocks.len(), 1);
        let block = &blocks.code_blocks[0];
        assert_eq!(block.language.as_deref(), Some("bash"));
        assert_eq!(block.line, 4);
        assert!(block.text.contains("curl https://api.example.com/v1/models"));
        assert!(blocks.in_code(3));
        assert!(!blocks.in_code(0));
    }

    #[test]
    fn setext_heading_supported() {
        let blocks = parse("Overview\n========\n\nDetails\n-------\n");
        let levels: Vec<u8> = blocks.headings.iter().map(|h| h.level).collect();
        assert_eq!(levels, vec![1, 2]);
        assert_eq!(blocks.headings[1].anchor, "details");
    }

    #[test]
    fn closing_hashes_stripped() {
        assert_eq!(clean_heading_text(" Title ## "), "Title");
        assert_eq!(clean_heading_text("C#"), "C#");
    }
}
