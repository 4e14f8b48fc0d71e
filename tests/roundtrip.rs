//! Round-trip through the encode/decode boundary.

use fencelex::{ByteVocabulary, Encoder, PipelineConfig, PreTokenizerPipeline};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const ASSERTION_PROMPT: &str = r#"You are given a Python function and an assertion containing an input to the function. Complete the assertion with a literal (no unsimplified expressions, no function calls) containing the output when executing the provided code on the given input, even if the function is incorrect or incomplete. Do NOT output any extra information. Provide the full assertion with the correct output in [ANSWER] and [/ANSWER] tags, following the examples.

```python
def repeatNumber(number : int) -> int:
    return number
```
assert repeatNumber(number = 17) == ??

[ANSWER]
assert repeatNumber(number = 17) == 17
[/ANSWER]

```python
def addCharacterA(string : str) -> str:
    return string + "a"
```
assert addCharacterA(string = "x9j") == ??

[ANSWER]
assert addCharacterA(string = "x9j") == "x9ja"
[/ANSWER]
"#;

const FIBONACCI: &str = "
Here is Python code:
```python
def fibonacci(n):
    if n <= 1:
        return n

    return fibonacci(n - 1) + fibonacci(n - 2)

```
Done!

Another line of text.

```python
def fibonacci(n):
    if n <= 1:
        return n

    return fibonacci(n - 1) + fibonacci(n - 2)
```

Done!
";

fn identity_encoder(config: PipelineConfig) -> Encoder<ByteVocabulary> {
    Encoder::new(PreTokenizerPipeline::new(config).unwrap(), ByteVocabulary)
}

#[test]
fn test_identity_roundtrip_driver_texts() {
    let encoder = identity_encoder(PipelineConfig::new(["python", "py"], false, true, false));

    for text in [ASSERTION_PROMPT, FIBONACCI, "", "Unicode: こんにちは 世界 🦀"] {
        let result = encoder.encode(text).unwrap();
        assert_eq!(encoder.decode(&result.ids).unwrap(), text);
        assert_eq!(result.reconstruct().unwrap(), text);
    }
}

#[test]
fn test_prefix_space_is_the_only_difference() {
    let encoder = identity_encoder(PipelineConfig::new(["python"], true, true, true));
    let result = encoder.encode(ASSERTION_PROMPT).unwrap();

    let decoded = encoder.decode(&result.ids).unwrap();
    let markers = result.spans().filter(|s| s.prefix_space).count();
    assert!(markers > 0);
    assert_eq!(decoded.len(), ASSERTION_PROMPT.len() + markers);
    assert_eq!(result.reconstruct().unwrap(), ASSERTION_PROMPT);
}

#[test]
fn test_every_id_maps_back_to_its_bytes() {
    let encoder = identity_encoder(PipelineConfig::default());
    let result = encoder.encode(FIBONACCI).unwrap();
    for (id, (start, end)) in result.ids.iter().zip(result.offsets()) {
        assert!(FIBONACCI.as_bytes()[start..end].contains(&(*id as u8)));
    }
}

proptest! {
    #[test]
    fn identity_roundtrip(text in any::<String>(), regex in any::<bool>()) {
        let encoder = identity_encoder(PipelineConfig::new(["python", "rust"], false, true, regex));
        let ids = encoder.encode_ids(&text).unwrap();
        prop_assert_eq!(encoder.decode(&ids).unwrap(), text);
    }

    #[test]
    fn reconstruct_strips_markers(text in "\\PC*", trim_offsets in any::<bool>()) {
        let encoder = identity_encoder(PipelineConfig::new(["python"], true, trim_offsets, true));
        let result = encoder.encode(&text).unwrap();
        prop_assert_eq!(result.reconstruct().unwrap(), text);
    }
}
