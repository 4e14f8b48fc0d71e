//! Property tests: every pipeline output tiles its input and concatenates
//! back to it, whatever the text and whatever the flags.

use fencelex::core::check_tiling;
use fencelex::{PipelineConfig, PreTokenizerPipeline};
use proptest::prelude::*;

fn configs() -> Vec<PipelineConfig> {
    vec![
        PipelineConfig::new(["python", "py"], false, true, true),
        PipelineConfig::new(["python", "py"], false, true, false),
        PipelineConfig::new(["python", "rust"], true, true, true),
        PipelineConfig::new(["rust"], true, true, false),
        PipelineConfig::new(["python"], true, false, true),
        PipelineConfig::new(["python"], true, false, false),
        PipelineConfig::new(Vec::<String>::new(), false, false, true),
    ]
}

fn assert_tiles(text: &str) -> Result<(), TestCaseError> {
    for config in configs() {
        let pipeline = PreTokenizerPipeline::new(config.clone()).unwrap();
        let spans = pipeline.run(text).unwrap();

        prop_assert!(
            check_tiling(&spans, 0..text.len()).is_ok(),
            "{:?} does not tile {:?}",
            config,
            text
        );
        let joined: String = spans.iter().map(|s| s.text(text)).collect();
        prop_assert_eq!(&joined, text);

        // Zero-width spans only ever stand for a synthetic space.
        for span in spans.iter().filter(|s| s.is_empty()) {
            prop_assert!(span.prefix_space && config.add_prefix_space);
        }
    }
    Ok(())
}

fn fenced_document() -> impl Strategy<Value = String> {
    (
        "\\PC{0,20}",
        prop_oneof![
            Just(""),
            Just("python"),
            Just("py"),
            Just("Rust"),
            Just("ruby"),
        ],
        "[ -~\n\t]{0,60}",
        prop::bool::ANY,
        "\\PC{0,20}",
    )
        .prop_map(|(before, tag, body, closed, after)| {
            let close = if closed { "```\n" } else { "" };
            format!("{}\n```{}\n{}\n{}{}", before, tag, body, close, after)
        })
}

proptest! {
    #[test]
    fn arbitrary_text_tiles(text in "\\PC*") {
        assert_tiles(&text)?;
    }

    #[test]
    fn any_unicode_tiles(text in any::<String>()) {
        assert_tiles(&text)?;
    }

    #[test]
    fn fenced_documents_tile(text in fenced_document()) {
        assert_tiles(&text)?;
    }

    #[test]
    fn runs_are_deterministic(text in fenced_document()) {
        let pipeline = PreTokenizerPipeline::new(PipelineConfig::default()).unwrap();
        prop_assert_eq!(pipeline.run(&text).unwrap(), pipeline.run(&text).unwrap());
    }
}
