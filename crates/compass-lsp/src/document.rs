use std::path::Path;
use std::sync::Arc;

use dashmap::DashMap;
use tower_lsp::lsp_types::Url;

use compass_core::{FsHost, Host};

#[derive(Debug, Clone)]
struct Document {
    text: String,
    version: u64,
}

/// Open editor documents with their edit versions. Versions come from the
/// client and increase monotonically on every change.
pub struct DocumentStore {
    documents: DashMap<Url, Document>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    pub fn open(&self, uri: Url, text: &str, version: u64) {
        self.documents.insert(
            uri,
            Document {
                text: text.to_string(),
                version,
            },
        );
    }

    pub fn update(&self, uri: &Url, text: &str, version: u64) {
        self.documents.insert(
            uri.clone(),
            Document {
                text: text.to_string(),
                version,
            },
        );
    }

    pub fn close(&self, uri: &Url) {
        self.documents.remove(uri);
    }

    pub fn snapshot(&self, uri: &Url) -> Option<(String, u64)> {
        self.documents
            .get(uri)
            .map(|doc| (doc.text.clone(), doc.version))
    }

    pub fn contains(&self, uri: &Url) -> bool {
        self.documents.contains_key(uri)
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Target-file acquisition for the core engine: open documents answer with
/// their live text and version, everything else comes from disk.
#[derive(Clone)]
pub struct StoreHost {
    documents: Arc<DocumentStore>,
    fs: FsHost,
}

impl StoreHost {
    pub fn new(documents: Arc<DocumentStore>) -> Self {
        Self {
            documents,
            fs: FsHost,
        }
    }
}

impl Host for StoreHost {
    fn fetch(&self, path: &Path) -> std::io::Result<(String, u64)> {
        if let Ok(uri) = Url::from_file_path(path) {
            if let Some(snapshot) = self.documents.snapshot(&uri) {
                return Ok(snapshot);
            }
        }
        self.fs.fetch(path)
    }
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

/// Start column of the identifier containing the caret on `line`
/// (0-based line and UTF-16 column, as the LSP sends them). `None` when the
/// caret does not sit on or immediately after a word character. The returned
/// column counts UTF-16 units too, so it feeds straight back into positions.
pub fn word_start_at(text: &str, line: u32, character: u32) -> Option<u32> {
    let line_text = text.lines().nth(line as usize)?;
    let chars: Vec<char> = line_text.chars().collect();

    // Caret as an index into `chars`, clamped to the end of the line.
    let mut caret = chars.len();
    let mut units = 0u32;
    for (index, c) in chars.iter().enumerate() {
        if units >= character {
            caret = index;
            break;
        }
        units += c.len_utf16() as u32;
    }

    let on_word = caret < chars.len() && is_word_char(chars[caret]);
    let after_word = caret > 0 && is_word_char(chars[caret - 1]);
    if !on_word && !after_word {
        return None;
    }

    let mut start = if on_word { caret } else { caret - 1 };
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    Some(chars[..start].iter().map(|c| c.len_utf16() as u32).sum())
}
