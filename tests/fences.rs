//! End-to-end routing of fenced blocks through the default pipeline.

use fencelex::{PipelineConfig, PreTokenizerPipeline, Span, SpanKind, SyntaxClass};
use pretty_assertions::assert_eq;

/// The definition a training driver serialized into tokenizer.json.
const DRIVER_DEFINITION: &str = r#"{
    "version": "1.0",
    "pre_tokenizer": {
        "type": "Sequence",
        "pretokenizers": [
            {"type": "CodeLexer", "languages": ["python", "py"]},
            {"type": "ByteLevel", "add_prefix_space": false, "trim_offsets": true, "use_regex": false}
        ]
    }
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn pipeline(languages: &[&str]) -> PreTokenizerPipeline {
    init_tracing();
    PreTokenizerPipeline::new(PipelineConfig::new(
        languages.iter().copied(),
        false,
        true,
        true,
    ))
    .unwrap()
}

fn lexed<'a>(spans: &[Span], text: &'a str) -> Vec<(&'a str, SyntaxClass)> {
    spans
        .iter()
        .filter_map(|s| s.class.map(|c| (s.text(text), c)))
        .collect()
}

#[test]
fn test_python_block_is_lexed() {
    use SyntaxClass::*;
    let text = "```python\ndef f(x):\n    return x\n```";
    let spans = pipeline(&["python"]).run(text).unwrap();
    assert_eq!(
        lexed(&spans, text),
        vec![
            ("def", Keyword),
            (" ", Whitespace),
            ("f", Identifier),
            ("(", Delimiter),
            ("x", Identifier),
            (")", Delimiter),
            (":", Operator),
            ("\n", Newline),
            ("    ", Indent),
            ("return", Keyword),
            (" ", Whitespace),
            ("x", Identifier),
            ("\n", Newline),
        ]
    );
}

#[test]
fn test_mixed_document_offsets() {
    let text = "Here is code:\n```python\nx = 1\n```\nMore text.";
    let spans = pipeline(&["python"]).run(text).unwrap();

    let x = spans
        .iter()
        .find(|s| s.class == Some(SyntaxClass::Identifier))
        .unwrap();
    assert_eq!(x.range(), 24..25);
    assert_eq!(x.text(text), "x");
    assert_eq!(x.language.as_deref(), Some("python"));

    let last = spans.last().unwrap();
    assert_eq!(last.text(text), ".");
    assert_eq!(last.end, text.len());
}

#[test]
fn test_unterminated_fence_keeps_marker() {
    let text = "```python\nabc";
    let spans = pipeline(&["python"]).run(text).unwrap();
    assert_eq!(spans[0].range(), 0..3);
    assert_eq!(spans[0].text(text), "```");
    assert!(spans.iter().all(|s| s.kind != SpanKind::Code));
}

#[test]
fn test_unrecognized_tag_falls_back() {
    let text = "```ruby\nputs 1\n```";
    let spans = pipeline(&["python"]).run(text).unwrap();
    assert!(spans.iter().all(|s| s.class.is_none()));
    let covered: String = spans.iter().map(|s| s.text(text)).collect();
    assert_eq!(covered, text);
}

#[test]
fn test_rust_block() {
    use SyntaxClass::*;
    let text = "~~~rust\nlet r = &'a x;\n~~~\n";
    let spans = pipeline(&["rust"]).run(text).unwrap();
    assert_eq!(
        lexed(&spans, text),
        vec![
            ("let", Keyword),
            (" ", Whitespace),
            ("r", Identifier),
            (" ", Whitespace),
            ("=", Operator),
            (" ", Whitespace),
            ("&", Operator),
            ("'a", Identifier),
            (" ", Whitespace),
            ("x", Identifier),
            (";", Delimiter),
            ("\n", Newline),
        ]
    );
}

#[test]
fn test_only_configured_tags_are_lexed() {
    let text = "```py\npass\n```\n```python\npass\n```";
    let spans = pipeline(&["python"]).run(text).unwrap();
    let keywords: Vec<usize> = spans
        .iter()
        .filter(|s| s.class == Some(SyntaxClass::Keyword))
        .map(|s| s.start)
        .collect();
    // Only the second block, tagged `python`, is lexed.
    assert_eq!(keywords, vec![25]);
}

#[test]
fn test_tag_case_is_ignored() {
    let text = "```Python\npass\n```";
    let spans = pipeline(&["python"]).run(text).unwrap();
    assert_eq!(
        lexed(&spans, text),
        vec![("pass", SyntaxClass::Keyword), ("\n", SyntaxClass::Newline)]
    );
}

#[test]
fn test_driver_definition() {
    init_tracing();
    let p = PreTokenizerPipeline::from_json(DRIVER_DEFINITION).unwrap();
    assert_eq!(p.stage_names(), vec!["code_fence", "byte_level"]);
    assert!(!p.config().use_regex);

    let text = "Some text\n```py\nx=1\n```";
    let pieces = p.pieces(text).unwrap();
    let tokens: Vec<&str> = pieces.iter().map(|(t, _)| t.as_str()).collect();
    assert_eq!(
        tokens,
        vec!["Some", "Ġ", "text", "Ċ", "```", "py", "Ċ", "x", "=", "1", "Ċ", "```"]
    );
    assert_eq!(pieces[7].1, (16, 17));
}

#[test]
fn test_definition_file() {
    let path = std::env::temp_dir().join(format!("fencelex-{}.json", std::process::id()));
    std::fs::write(&path, DRIVER_DEFINITION).unwrap();
    let p = PreTokenizerPipeline::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(p.config().languages, vec!["python", "py"]);
}

#[test]
fn test_missing_definition_file() {
    let err = PreTokenizerPipeline::from_file("/nonexistent/fencelex.json").unwrap_err();
    assert!(matches!(err, fencelex::ConfigError::Io(_)));
}
