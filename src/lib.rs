pub mod api;
pub mod bidi;
pub mod codemodel;
pub mod content_words;
pub mod document;
pub mod error;
pub mod highlighting;
pub mod isolates;
pub mod matchers;
pub mod parser;
pub mod settings;
pub mod state_spans;
pub mod stream;
pub mod tokenizer;
pub mod utils;

pub use api::{analyze, analyze_line, LineAnalysis};
pub use codemodel::{CodeModel, LineStore};
pub use document::Document;
pub use error::{SettingsError, TyplineError};
