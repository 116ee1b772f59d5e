use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{Argument, Choice, Format, MessageNode, Tag};

/// Deepest tag or plural/select nesting the parser accepts.
pub const MAX_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("maximum nesting depth of {0} exceeded")]
    MaxDepthExceeded(usize),
}

/// Parses `text` into a sequence of message nodes.
pub fn parse(text: &str) -> Result<Vec<MessageNode>, ParseError> {
    Parser::new(text).parse()
}

fn is_special(byte: u8) -> bool {
    matches!(byte, b'{' | b'}' | b'<' | b'#')
}

/// True when a backslash at `index` escapes the following special character.
fn is_escape(bytes: &[u8], index: usize) -> bool {
    bytes[index] == b'\\' && bytes.get(index + 1).is_some_and(|b| is_special(*b))
}

/// A recursive-descent parser for ICU-style message templates.
///
/// Malformed input never fails: anything that does not form a placeholder,
/// tag or pound marker is kept as literal text. The only error is nesting
/// deeper than [`MAX_DEPTH`].
pub struct Parser<'a> {
    input: &'a str,
    position: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Parser {
            input,
            position: 0,
            depth: 0,
        }
    }

    fn nested(input: &'a str, depth: usize) -> Self {
        Parser {
            input,
            position: 0,
            depth,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.position).copied()
    }

    pub fn parse(&mut self) -> Result<Vec<MessageNode>, ParseError> {
        if self.depth > MAX_DEPTH {
            return Err(ParseError::MaxDepthExceeded(MAX_DEPTH));
        }

        let mut nodes: Vec<MessageNode> = Vec::new();
        while self.position < self.input.len() {
            let special = match self.peek() {
                Some(b'{') => self.parse_brace()?,
                Some(b'<') => self.parse_tag()?,
                Some(b'#') => {
                    self.position += 1;
                    Some(MessageNode::Pound)
                }
                _ => None,
            };

            match special {
                Some(node) => nodes.push(node),
                None => {
                    let text = self.parse_text();
                    // Merge with a preceding literal, e.g. after an unmatched `{`.
                    if let Some(MessageNode::Literal(previous)) = nodes.last_mut() {
                        previous.push_str(text);
                    } else {
                        nodes.push(MessageNode::literal(text));
                    }
                }
            }
        }
        Ok(nodes)
    }

    /// Consumes one character, or an escape pair, of literal text.
    fn consume_text_char(&mut self) {
        let bytes = self.input.as_bytes();
        if is_escape(bytes, self.position) {
            self.position += 2;
            return;
        }
        let width = self.input[self.position..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
        self.position += width;
    }

    /// Collects literal text up to the next unescaped `{`, `<` or `#`.
    ///
    /// Always consumes at least one character so the scan makes progress even
    /// when the current special character could not be parsed.
    fn parse_text(&mut self) -> &'a str {
        let input = self.input;
        let start = self.position;
        self.consume_text_char();
        while let Some(c) = self.peek() {
            if matches!(c, b'{' | b'<' | b'#') {
                break;
            }
            self.consume_text_char();
        }
        &input[start..self.position]
    }

    fn parse_brace(&mut self) -> Result<Option<MessageNode>, ParseError> {
        let input = self.input;
        let open = self.position;
        let Some(close) = find_matching_brace(input, open) else {
            return Ok(None);
        };
        let span = &input[open..=close];
        let inner = &input[open + 1..close];

        let node = if let Some(node) = self.parse_choice(inner)? {
            Some(node)
        } else if span.len() >= 4 && span.starts_with("{{") && span.ends_with("}}") {
            parse_double_braced(&span[2..span.len() - 2])
        } else if !inner.contains(['{', '}']) {
            Some(parse_placeholder(inner))
        } else {
            None
        };

        if node.is_some() {
            self.position = close + 1;
        }
        Ok(node)
    }

    /// Parses `name, plural|select, key {...} key {...}`.
    fn parse_choice(&self, inner: &str) -> Result<Option<MessageNode>, ParseError> {
        let Some((name, rest)) = inner.split_once(',') else {
            return Ok(None);
        };
        let name = name.trim();
        if name.is_empty() || name.contains(['{', '}']) {
            return Ok(None);
        }
        let Some((keyword, options_text)) = rest.split_once(',') else {
            return Ok(None);
        };
        let keyword = keyword.trim();
        if keyword != "plural" && keyword != "select" {
            return Ok(None);
        }

        let Some(options) = self.parse_options(options_text)? else {
            return Ok(None);
        };
        let choice = Choice::new(name, options);
        Ok(Some(if keyword == "plural" {
            MessageNode::Plural(choice)
        } else {
            MessageNode::Select(choice)
        }))
    }

    /// Parses each option body one level deeper. Returns `None` when the
    /// option list is malformed, without parsing any body.
    fn parse_options(
        &self,
        text: &str,
    ) -> Result<Option<HashMap<String, Vec<MessageNode>>>, ParseError> {
        let Some(pairs) = scan_options(text) else {
            return Ok(None);
        };
        let mut options = HashMap::with_capacity(pairs.len());
        for (key, body) in pairs {
            let nodes = Parser::nested(body, self.depth + 1).parse()?;
            options.insert(key.to_string(), nodes);
        }
        Ok(Some(options))
    }

    /// Parses `<name>...</name>` at the current position.
    fn parse_tag(&mut self) -> Result<Option<MessageNode>, ParseError> {
        let input = self.input;
        let rest = &input[self.position + 1..];
        let Some(end) = rest.find('>') else {
            return Ok(None);
        };
        let name = &rest[..end];
        if name.is_empty()
            || name
                .chars()
                .any(|c| c == '<' || c == '/' || c.is_whitespace())
        {
            return Ok(None);
        }

        let content_start = self.position + 1 + end + 1;
        let Some((content_end, after_close)) = find_closing_tag(input, content_start, name) else {
            return Ok(None);
        };

        let content = &input[content_start..content_end];
        let children = Parser::nested(content, self.depth + 1).parse()?;
        self.position = after_close;
        Ok(Some(MessageNode::Tag(Tag::new(name, children))))
    }
}

/// Splits an option list into `key { body }` pairs in encounter order.
///
/// Only brace structure is checked here. `None` for a stray key, a missing
/// body or an empty list.
fn scan_options(text: &str) -> Option<Vec<(&str, &str)>> {
    let bytes = text.as_bytes();
    let mut pairs = Vec::new();
    let mut position = 0;

    loop {
        while position < bytes.len() && bytes[position].is_ascii_whitespace() {
            position += 1;
        }
        if position >= bytes.len() {
            break;
        }

        let key_start = position;
        while position < bytes.len() && bytes[position] != b'{' {
            if bytes[position] == b'}' {
                return None;
            }
            position += 1;
        }
        if position >= bytes.len() {
            return None;
        }
        let key = text[key_start..position].trim();
        if key.is_empty() {
            return None;
        }

        let close = find_matching_brace(text, position)?;
        pairs.push((key, &text[position + 1..close]));
        position = close + 1;
    }

    if pairs.is_empty() {
        return None;
    }
    Some(pairs)
}

/// Finds the `}` matching the `{` at `open`, skipping escaped braces.
fn find_matching_brace(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut index = open;
    while index < bytes.len() {
        if is_escape(bytes, index) {
            index += 2;
            continue;
        }
        match bytes[index] {
            b'{' => depth += 1,
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(index);
                }
            }
            _ => {}
        }
        index += 1;
    }
    None
}

/// Finds the close tag matching an already consumed `<name>`.
///
/// Further `<name>` opens push onto a counter and each `</name>` pops it; the
/// close that empties the counter is the match. Returns the start of the
/// close tag and the position just past it.
fn find_closing_tag(text: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);
    let bytes = text.as_bytes();
    let mut depth = 1usize;
    let mut index = from;
    while index < bytes.len() {
        if is_escape(bytes, index) {
            index += 2;
            continue;
        }
        let rest = &bytes[index..];
        if rest.starts_with(close.as_bytes()) {
            depth -= 1;
            if depth == 0 {
                return Some((index, index + close.len()));
            }
            index += close.len();
        } else if rest.starts_with(open.as_bytes()) {
            depth += 1;
            index += open.len();
        } else {
            index += 1;
        }
    }
    None
}

/// Parses the inside of `{{ ... }}`: everything after the first comma is the style.
fn parse_double_braced(inner: &str) -> Option<MessageNode> {
    if inner.contains(['{', '}']) {
        return None;
    }
    let parts: Vec<&str> = inner.trim().splitn(3, ',').map(str::trim).collect();
    let mut argument = Argument::new(parts[0]).double_braced();
    if parts.len() > 1 {
        argument = argument.with_style(&parts[1..].join(", "));
    }
    Some(MessageNode::Argument(argument))
}

/// Parses `name`, `name, format` or `name, format, style`.
fn parse_placeholder(inner: &str) -> MessageNode {
    let parts: Vec<&str> = inner.trim().splitn(3, ',').map(str::trim).collect();
    let name = parts[0];
    let Some(format) = parts.get(1) else {
        return MessageNode::Argument(Argument::new(name));
    };
    let style = parts.get(2).copied();

    match *format {
        "number" => MessageNode::Number(Format::new(name, style)),
        "date" => MessageNode::Date(Format::new(name, style)),
        "time" => MessageNode::Time(Format::new(name, style)),
        other => {
            let folded = match style {
                Some(style) => format!("{}, {}", other, style),
                None => other.to_string(),
            };
            MessageNode::Argument(Argument::new(name).with_style(&folded))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Bracing, NodeKind, render};

    fn lit(text: &str) -> MessageNode {
        MessageNode::literal(text)
    }

    #[test]
    fn test_plain_text() {
        let nodes = parse("Hello, World!").unwrap();
        assert_eq!(nodes, vec![lit("Hello, World!")]);
        assert_eq!(render(&nodes), "Hello, World!");
    }

    #[test]
    fn test_empty_message() {
        assert_eq!(parse("").unwrap(), vec![]);
    }

    #[test]
    fn test_simple_argument() {
        let nodes = parse("Hello, {name}!").unwrap();
        assert_eq!(
            nodes,
            vec![
                lit("Hello, "),
                MessageNode::Argument(Argument::new("name")),
                lit("!")
            ]
        );
    }

    #[test]
    fn test_double_braced_argument() {
        let nodes = parse("Hello, {{name}}!").unwrap();
        assert_eq!(nodes.len(), 3);
        match &nodes[1] {
            MessageNode::Argument(arg) => {
                assert_eq!(arg.name, "name");
                assert_eq!(arg.bracing, Bracing::Double);
                assert_eq!(arg.style, None);
            }
            other => panic!("Expected argument, got {:?}", other),
        }
        assert_eq!(render(&nodes), "Hello, {{name}}!");
    }

    #[test]
    fn test_double_braced_argument_with_style() {
        let nodes = parse("{{value, format}}").unwrap();
        assert_eq!(
            nodes,
            vec![MessageNode::Argument(
                Argument::new("value").with_style("format").double_braced()
            )]
        );
    }

    #[test]
    fn test_formatted_placeholders() {
        let cases = [
            ("{count, number}", NodeKind::Number, "count", None),
            ("{price, number, currency}", NodeKind::Number, "price", Some("currency")),
            ("{date, date, short}", NodeKind::Date, "date", Some("short")),
            ("{d, date}", NodeKind::Date, "d", None),
            ("{time, time, medium}", NodeKind::Time, "time", Some("medium")),
        ];
        for (input, kind, name, style) in cases {
            let nodes = parse(input).unwrap();
            assert_eq!(nodes.len(), 1, "input: {}", input);
            assert_eq!(nodes[0].kind(), kind, "input: {}", input);
            let format = match &nodes[0] {
                MessageNode::Number(f) | MessageNode::Date(f) | MessageNode::Time(f) => f,
                other => panic!("Expected format node, got {:?}", other),
            };
            assert_eq!(format.name, name);
            assert_eq!(format.style.as_deref(), style);
            assert_eq!(render(&nodes), input);
        }
    }

    #[test]
    fn test_unknown_format_folds_into_style() {
        let nodes = parse("{name, upper}").unwrap();
        assert_eq!(
            nodes,
            vec![MessageNode::Argument(Argument::new("name").with_style("upper"))]
        );

        let nodes = parse("{amount, spellout, ordinal}").unwrap();
        assert_eq!(
            nodes,
            vec![MessageNode::Argument(
                Argument::new("amount").with_style("spellout, ordinal")
            )]
        );
    }

    #[test]
    fn test_tag_with_content() {
        let nodes = parse("This is <b>bold</b> text").unwrap();
        assert_eq!(
            nodes,
            vec![
                lit("This is "),
                MessageNode::Tag(Tag::new("b", vec![lit("bold")])),
                lit(" text")
            ]
        );
    }

    #[test]
    fn test_nested_tags() {
        let nodes = parse("<b><i><u>Formatted</u></i></b>").unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(render(&nodes), "<b><i><u>Formatted</u></i></b>");
    }

    #[test]
    fn test_same_name_tags_match_by_stack() {
        let nodes = parse("<b>a <b>b</b> c</b>").unwrap();
        assert_eq!(
            nodes,
            vec![MessageNode::Tag(Tag::new(
                "b",
                vec![
                    lit("a "),
                    MessageNode::Tag(Tag::new("b", vec![lit("b")])),
                    lit(" c")
                ]
            ))]
        );
    }

    #[test]
    fn test_sibling_same_name_tags() {
        let nodes = parse("<b>one</b> and <b>two</b>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[0], MessageNode::Tag(Tag::new("b", vec![lit("one")])));
        assert_eq!(nodes[2], MessageNode::Tag(Tag::new("b", vec![lit("two")])));
    }

    #[test]
    fn test_empty_tags() {
        let nodes = parse("<b></b><i></i><u></u>").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.kind() == NodeKind::Tag));
    }

    #[test]
    fn test_nested_malformed_choices_stay_literal_in_linear_time() {
        let mut text = String::from("x");
        for _ in 0..40 {
            text = format!("{{n, plural, a {{{}}} stray}}", text);
        }

        let start = std::time::Instant::now();
        let nodes = parse(&text).unwrap();
        assert!(start.elapsed() < std::time::Duration::from_secs(2));

        // Only the innermost `{x}` forms a placeholder.
        assert_eq!(nodes.len(), 3);
        assert_eq!(nodes[1], MessageNode::Argument(Argument::new("x")));
        assert_eq!(render(&nodes), text);
    }

    #[test]
    fn test_well_formed_choice_inside_malformed_one() {
        let text = "{n, plural, one {{g, select, a {x} other {y}}} stray}";
        let nodes = parse(text).unwrap();
        assert_eq!(render(&nodes), "{n, plural, one {{g, select, other {y} a {x}}} stray}");
        assert!(
            nodes
                .iter()
                .any(|node| matches!(node, MessageNode::Select(_)))
        );
    }

    #[test]
    fn test_empty_braces_are_an_unnamed_argument() {
        let nodes = parse("a{}b").unwrap();
        assert_eq!(
            nodes,
            vec![lit("a"), MessageNode::Argument(Argument::new("")), lit("b")]
        );
        assert_eq!(render(&nodes), "a{}b");
    }

    #[test]
    fn test_mismatched_tags_stay_literal() {
        let nodes = parse("<b>Bold text</i>").unwrap();
        assert_eq!(nodes, vec![lit("<b>Bold text</i>")]);
    }

    #[test]
    fn test_comparison_is_not_a_tag() {
        let nodes = parse("a < b and c > d").unwrap();
        assert_eq!(nodes, vec![lit("a < b and c > d")]);
    }

    #[test]
    fn test_pound() {
        let nodes = parse("# items").unwrap();
        assert_eq!(nodes, vec![MessageNode::Pound, lit(" items")]);
    }

    #[test]
    fn test_plural() {
        let nodes =
            parse("{count, plural, one {# message} other {# messages}}").unwrap();
        assert_eq!(nodes.len(), 1);
        let MessageNode::Plural(choice) = &nodes[0] else {
            panic!("Expected plural, got {:?}", nodes[0]);
        };
        assert_eq!(choice.name, "count");
        assert_eq!(choice.options.len(), 2);
        assert_eq!(
            choice.options["one"],
            vec![MessageNode::Pound, lit(" message")]
        );
        assert_eq!(
            render(&nodes),
            "{count, plural, one {# message} other {# messages}}"
        );
    }

    #[test]
    fn test_select_with_nested_tags() {
        let nodes =
            parse("{gender, select, male {<b>He</b>} female {She} other {They}} replied").unwrap();
        assert_eq!(nodes.len(), 2);
        let MessageNode::Select(choice) = &nodes[0] else {
            panic!("Expected select, got {:?}", nodes[0]);
        };
        assert_eq!(
            choice.options["male"],
            vec![MessageNode::Tag(Tag::new("b", vec![lit("He")]))]
        );
        assert_eq!(nodes[1], lit(" replied"));
    }

    #[test]
    fn test_plural_with_exact_keys_renders_canonically() {
        let nodes =
            parse("{n, plural, other {many} =0 {none} one {single} =1 {exactly one}}").unwrap();
        assert_eq!(
            render(&nodes),
            "{n, plural, one {single} other {many} =0 {none} =1 {exactly one}}"
        );
    }

    #[test]
    fn test_choice_rendering_reparses_to_same_tree() {
        for input in [
            "{count, plural, one {You have # message} other {You have # messages}}",
            "{gender, select, male {He} female {She} other {They}}",
        ] {
            let first = parse(input).unwrap();
            let rendered = render(&first);
            let second = parse(&rendered).unwrap();
            assert_eq!(first, second);
            assert_eq!(first[0].kind(), second[0].kind());
        }
    }

    #[test]
    fn test_mixed_message() {
        let input = "Hello, {name}! You have {count, number} {count, plural, one {message} other {messages}}.";
        let nodes = parse(input).unwrap();
        let kinds: Vec<NodeKind> = nodes.iter().map(MessageNode::kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Literal,
                NodeKind::Argument,
                NodeKind::Literal,
                NodeKind::Number,
                NodeKind::Literal,
                NodeKind::Plural,
                NodeKind::Literal
            ]
        );
    }

    #[test]
    fn test_deep_nesting() {
        let input = "Hello, {name}! You have {count, plural, =0 {no messages} one {<b>1</b> message with <i>{priority, select, high {<u>high</u>} other {normal}}</i> priority} other {<b>{count}</b> messages}}";
        let nodes = parse(input).unwrap();
        assert!(nodes.iter().any(|n| n.kind() == NodeKind::Plural));
    }

    #[test]
    fn test_unmatched_brace_is_literal() {
        let nodes = parse("This has {mismatched braces").unwrap();
        assert_eq!(nodes, vec![lit("This has {mismatched braces")]);
    }

    #[test]
    fn test_escaped_braces_are_literal() {
        let input = "This has escaped \\{braces\\} that should be treated as text";
        let nodes = parse(input).unwrap();
        assert_eq!(nodes, vec![lit(input)]);
        assert_eq!(render(&nodes), input);
    }

    #[test]
    fn test_malformed_options_degrade_to_text() {
        let nodes = parse("{n, plural, one {x} stray}").unwrap();
        assert!(nodes.iter().all(|n| n.kind() != NodeKind::Plural));
        assert_eq!(render(&nodes), "{n, plural, one {x} stray}");
    }

    #[test]
    fn test_adjacent_placeholders() {
        let nodes = parse("{name}{count}{date}").unwrap();
        assert_eq!(nodes.len(), 3);
        assert!(nodes.iter().all(|n| n.kind() == NodeKind::Argument));
    }

    #[test]
    fn test_round_trip_for_lossless_kinds() {
        for input in [
            "Plain",
            "Hi {name}, <b>welcome</b> to {place, select-like}!",
            "{{count}} of {total, number, integer} on {d, date, long} at {t, time}",
            "Stray } brace and # pound",
            "Ünïcödé {名前} <em>テキスト</em>",
        ] {
            let nodes = parse(input).unwrap();
            assert_eq!(render(&nodes), input);
        }
    }

    #[test]
    fn test_max_depth_exceeded() {
        let depth = MAX_DEPTH + 50;
        let input = format!("{}x{}", "<b>".repeat(depth), "</b>".repeat(depth));
        assert_eq!(
            parse(&input),
            Err(ParseError::MaxDepthExceeded(MAX_DEPTH))
        );
    }

    #[test]
    fn test_nesting_within_limit() {
        let depth = 20;
        let input = format!("{}x{}", "<i>".repeat(depth), "</i>".repeat(depth));
        let nodes = parse(&input).unwrap();
        assert_eq!(render(&nodes), input);
    }
}
