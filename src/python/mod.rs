mod bindings;

pub use bindings::PyPreTokenizer;
