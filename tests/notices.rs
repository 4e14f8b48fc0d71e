//! Recoverable fallbacks are logged, never returned.

use std::io;
use std::sync::{Arc, Mutex};

use fencelex::{PipelineConfig, PreTokenizerPipeline};
use tracing::Level;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

/// Run `f` with a debug-level subscriber and return everything it logged.
fn logged<F: FnOnce()>(f: F) -> String {
    let capture = Capture::default();
    let writer = capture.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.contents()
}

fn run(languages: &[&str], text: &str) {
    let pipeline = PreTokenizerPipeline::new(PipelineConfig::new(
        languages.iter().copied(),
        false,
        true,
        true,
    ))
    .unwrap();
    pipeline.run(text).unwrap();
}

#[test]
fn test_unrecognized_language_is_logged() {
    let log = logged(|| run(&["python"], "```ruby\nputs 1\n```"));
    assert!(
        log.contains("no lexer for language 'ruby', splitting block at 8 as text"),
        "{}",
        log
    );
    assert!(log.contains("DEBUG"), "{}", log);
}

#[test]
fn test_untagged_block_is_not_logged() {
    let log = logged(|| run(&["python"], "```\nplain\n```"));
    assert!(!log.contains("no lexer for language"), "{}", log);
}

#[test]
fn test_unterminated_fence_is_logged() {
    let log = logged(|| run(&["python"], "intro\n```python\nx = 1"));
    assert!(
        log.contains("fence at 6 is never closed, treating it as text"),
        "{}",
        log
    );
}

#[test]
fn test_unimplemented_language_is_warned() {
    let log = logged(|| run(&["python", "Haskell"], "x"));
    assert!(
        log.contains("language 'haskell' is configured but has no lexer implementation"),
        "{}",
        log
    );
    assert!(log.contains("WARN"), "{}", log);
}

#[test]
fn test_clean_input_logs_no_fallbacks() {
    let log = logged(|| run(&["python"], "text\n```python\nx = 1\n```\n"));
    for notice in ["no lexer", "never closed", "no lexer implementation"] {
        assert!(!log.contains(notice), "{}", log);
    }
}
