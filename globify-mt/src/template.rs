//! Structured translation of a single template message.
//!
//! Only literal text is sent to the backend. Placeholders, `#` markers and
//! tag names are copied through unchanged, and plural/select branches are
//! translated one by one and written back in canonical category order.

use futures::future::BoxFuture;
use globify::{Choice, MessageNode, ParseError, parse};
use tracing::warn;

use crate::error::MtResult;
use crate::translator::MachineTranslator;

/// Translates a parsed message, returning the reassembled template string.
///
/// Adjacent literal segments separated by a placeholder are translated
/// independently, so `"Hello, {name}!"` becomes two backend calls.
pub fn translate_template<'a>(
    nodes: &'a [MessageNode],
    source_locale: &'a str,
    target_locale: &'a str,
    translator: &'a dyn MachineTranslator,
) -> BoxFuture<'a, MtResult<String>> {
    Box::pin(async move {
        let mut result = String::new();
        for node in nodes {
            let translated =
                translate_node(node, source_locale, target_locale, translator).await?;
            result.push_str(&translated);
        }
        Ok(result)
    })
}

async fn translate_node(
    node: &MessageNode,
    source_locale: &str,
    target_locale: &str,
    translator: &dyn MachineTranslator,
) -> MtResult<String> {
    match node {
        MessageNode::Literal(text) if text.is_empty() => Ok(String::new()),
        MessageNode::Literal(text) => {
            translator
                .translate(text, source_locale, target_locale)
                .await
        }
        MessageNode::Tag(tag) => {
            let content =
                translate_template(&tag.children, source_locale, target_locale, translator)
                    .await?;
            Ok(format!("<{}>{}</{}>", tag.name, content, tag.name))
        }
        MessageNode::Plural(choice) => {
            translate_choice(choice, "plural", source_locale, target_locale, translator).await
        }
        MessageNode::Select(choice) => {
            translate_choice(choice, "select", source_locale, target_locale, translator).await
        }
        MessageNode::Argument(_)
        | MessageNode::Number(_)
        | MessageNode::Date(_)
        | MessageNode::Time(_)
        | MessageNode::Pound => Ok(node.to_string()),
    }
}

async fn translate_choice(
    choice: &Choice,
    keyword: &str,
    source_locale: &str,
    target_locale: &str,
    translator: &dyn MachineTranslator,
) -> MtResult<String> {
    let mut branches = Vec::with_capacity(choice.options.len());
    for (key, nodes) in choice.ordered_options() {
        let translated =
            translate_template(nodes, source_locale, target_locale, translator).await?;
        branches.push(format!("{} {{{}}}", key, translated));
    }
    Ok(format!(
        "{{{}, {}, {}}}",
        choice.name,
        keyword,
        branches.join(" ")
    ))
}

/// Parses `text` and translates it structurally.
///
/// Messages nested too deeply to parse are sent to the backend whole instead.
pub async fn translate_message(
    text: &str,
    source_locale: &str,
    target_locale: &str,
    translator: &dyn MachineTranslator,
) -> MtResult<String> {
    match parse(text) {
        Ok(nodes) => translate_template(&nodes, source_locale, target_locale, translator).await,
        Err(ParseError::MaxDepthExceeded(limit)) => {
            warn!(
                "Message nests deeper than {} levels, translating it as plain text",
                limit
            );
            translator
                .translate(text, source_locale, target_locale)
                .await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MtError;
    use crate::mock::{MockMode, MockTranslator};
    use globify::MAX_DEPTH;

    async fn structured(text: &str, mock: &MockTranslator) -> MtResult<String> {
        translate_message(text, "en", "fr", mock).await
    }

    #[tokio::test]
    async fn test_literal_only_message() {
        let mock = MockTranslator::new(MockMode::Prefix);
        assert_eq!(
            structured("Hello, world!", &mock).await.unwrap(),
            "[fr] Hello, world!"
        );
        assert_eq!(mock.calls(), 1);
    }

    #[tokio::test]
    async fn test_segments_around_argument_are_translated_separately() {
        let mock = MockTranslator::new(MockMode::Prefix);
        assert_eq!(
            structured("Hello, {name}!", &mock).await.unwrap(),
            "[fr] Hello, {name}[fr] !"
        );
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_formatted_placeholders_never_reach_backend() {
        let mock = MockTranslator::new(MockMode::Prefix);
        let result = structured("You have {count, number} messages since {date, date, short}", &mock)
            .await
            .unwrap();
        assert_eq!(
            result,
            "[fr] You have {count, number}[fr]  messages since {date, date, short}"
        );
        // Two literal segments: "You have " and " messages since "
        assert_eq!(mock.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_makes_no_calls() {
        let mock = MockTranslator::new(MockMode::Prefix);
        assert_eq!(structured("", &mock).await.unwrap(), "");
        assert_eq!(
            translate_template(&[MessageNode::literal("")], "en", "fr", &mock)
                .await
                .unwrap(),
            ""
        );
        assert_eq!(mock.calls(), 0);
    }

    #[tokio::test]
    async fn test_tag_content_is_translated() {
        let mock = MockTranslator::new(MockMode::Suffix);
        assert_eq!(
            structured("Click <b>here</b>", &mock).await.unwrap(),
            "Click _fr<b>here_fr</b>"
        );
    }

    #[tokio::test]
    async fn test_plural_branches_translated_in_canonical_order() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let result = structured(
            "{count, plural, other {# items} =0 {nothing} one {# item}}",
            &mock,
        )
        .await
        .unwrap();
        assert_eq!(
            result,
            "{count, plural, one {# item_fr} other {# items_fr} =0 {nothing_fr}}"
        );
        assert_eq!(mock.calls(), 3);
    }

    #[tokio::test]
    async fn test_select_keeps_select_keyword() {
        let mock = MockTranslator::new(MockMode::Suffix);
        let result = structured("{gender, select, male {He} female {She} other {They}}", &mock)
            .await
            .unwrap();
        assert_eq!(
            result,
            "{gender, select, other {They_fr} female {She_fr} male {He_fr}}"
        );
    }

    #[tokio::test]
    async fn test_plural_output_reparses_as_plural() {
        let mock = MockTranslator::new(MockMode::NoOp);
        let source = "{n, plural, one {# file} other {# files}}";
        let result = structured(source, &mock).await.unwrap();
        assert_eq!(result, source);
        let reparsed = parse(&result).unwrap();
        assert!(matches!(reparsed.as_slice(), [MessageNode::Plural(_)]));
    }

    #[tokio::test]
    async fn test_backend_error_propagates() {
        let mock = MockTranslator::new(MockMode::Error("quota".to_string()));
        assert_eq!(
            structured("Hello, {name}!", &mock).await,
            Err(MtError::Translation("quota".to_string()))
        );
    }

    #[tokio::test]
    async fn test_too_deep_message_falls_back_to_whole_text() {
        let mock = MockTranslator::new(MockMode::Prefix);
        let depth = MAX_DEPTH + 10;
        let text = format!("{}deep{}", "<i>".repeat(depth), "</i>".repeat(depth));
        let result = structured(&text, &mock).await.unwrap();
        assert_eq!(result, format!("[fr] {}", text));
        assert_eq!(mock.calls(), 1);
    }
}
