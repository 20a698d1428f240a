use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::{
    DidChangeConfigurationParams, DidChangeTextDocumentParams, DidCloseTextDocumentParams,
    DidOpenTextDocumentParams, GotoDefinitionParams, GotoDefinitionResponse, InitializeParams,
    InitializeResult, InitializedParams, Location, MessageType, Position as LspPosition, Range,
    Url,
};
use tower_lsp::{Client, LanguageServer};
use tracing::{debug, info, instrument, warn};

use compass_core::config::{ResolverConfig, find_config_file, load_config_with_warnings};
use compass_core::{DefinitionProvider, Position, ResolvedLocation, SourceRange};

use crate::capabilities::server_capabilities;
use crate::document::{DocumentStore, StoreHost, word_start_at};

pub struct CompassLanguageServer {
    client: Client,
    documents: Arc<DocumentStore>,
    provider: Arc<Mutex<DefinitionProvider<StoreHost>>>,
    workspace_root: Arc<RwLock<Option<PathBuf>>>,
}

impl CompassLanguageServer {
    pub fn new(client: Client) -> Self {
        let documents = Arc::new(DocumentStore::new());
        let host = StoreHost::new(Arc::clone(&documents));
        let provider = DefinitionProvider::new(host, ResolverConfig::default());
        Self {
            client,
            documents,
            provider: Arc::new(Mutex::new(provider)),
            workspace_root: Arc::new(RwLock::new(None)),
        }
    }

    /// Loads `compass.toml` from the workspace and swaps in a fresh
    /// provider, dropping all cached trees and tables.
    async fn load_configuration(&self) {
        let workspace_root = self.workspace_root.read().clone();

        let config = tokio::task::spawn_blocking(move || {
            let root = workspace_root?;
            let path = find_config_file(&root)?;
            match load_config_with_warnings(&path) {
                Ok(result) => {
                    for warning in &result.warnings {
                        warn!(config = %path.display(), "{warning}");
                    }
                    let mut config = result.config;
                    if config.module_root.is_relative() {
                        config.module_root = root.join(&config.module_root);
                    }
                    if let Some(require_config) = &config.require_config {
                        if require_config.is_relative() {
                            config.require_config = Some(root.join(require_config));
                        }
                    }
                    Some(config)
                }
                Err(error) => {
                    warn!(%error, "failed to load configuration, using defaults");
                    None
                }
            }
        })
        .await
        .ok()
        .flatten()
        .unwrap_or_default();

        info!(module_root = %config.module_root.display(), "configuration loaded");

        let host = StoreHost::new(Arc::clone(&self.documents));
        *self.provider.lock() = DefinitionProvider::new(host, config);
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for CompassLanguageServer {
    #[instrument(skip(self, params), name = "lsp/initialize")]
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        info!("initializing LSP server");

        if let Some(root_uri) = params.root_uri {
            if let Ok(path) = root_uri.to_file_path() {
                *self.workspace_root.write() = Some(path);
            }
        }

        Ok(InitializeResult {
            capabilities: server_capabilities(),
            ..Default::default()
        })
    }

    #[instrument(skip(self, _params), name = "lsp/initialized")]
    async fn initialized(&self, _params: InitializedParams) {
        info!("LSP server initialized");

        self.load_configuration().await;

        self.client
            .log_message(MessageType::INFO, "compass-lsp initialized")
            .await;
    }

    #[instrument(skip(self), name = "lsp/shutdown")]
    async fn shutdown(&self) -> Result<()> {
        info!("shutting down LSP server");
        Ok(())
    }

    #[instrument(skip(self, params), fields(uri = %params.text_document.uri), name = "lsp/textDocument/didOpen")]
    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        debug!(uri = %doc.uri, version = doc.version, "opening document");
        self.documents.open(doc.uri, &doc.text, doc.version as u64);
    }

    #[instrument(skip(self, params), fields(uri = %params.text_document.uri), name = "lsp/textDocument/didChange")]
    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version as u64;
        if let Some(change) = params.content_changes.into_iter().next() {
            debug!(uri = %uri, version, "document changed");
            self.documents.update(&uri, &change.text, version);
        }
    }

    #[instrument(skip(self, params), fields(uri = %params.text_document.uri), name = "lsp/textDocument/didClose")]
    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = params.text_document.uri;
        debug!(uri = %uri, "closing document");
        self.documents.close(&uri);
    }

    #[instrument(
        skip(self, params),
        fields(uri = %params.text_document_position_params.text_document.uri),
        name = "lsp/textDocument/definition"
    )]
    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let caret = params.text_document_position_params.position;

        let Some((text, version)) = self.documents.snapshot(&uri) else {
            return Ok(None);
        };
        let Ok(path) = uri.to_file_path() else {
            return Ok(None);
        };
        // No word under the caret means no query at all.
        let Some(start_column) = word_start_at(&text, caret.line, caret.character) else {
            return Ok(None);
        };
        let position = Position::new(caret.line + 1, start_column);

        let provider = Arc::clone(&self.provider);
        let resolved = tokio::task::spawn_blocking(move || {
            provider
                .lock()
                .provide_definition(&path, &text, version, position)
        })
        .await
        .map_err(|_| Error::internal_error())?;

        match resolved {
            Ok(Some(location)) => Ok(to_response(location)),
            Ok(None) => Ok(None),
            Err(error) => {
                warn!(%error, "definition query failed");
                Err(Error::internal_error())
            }
        }
    }

    #[instrument(skip(self, _params), name = "lsp/workspace/didChangeConfiguration")]
    async fn did_change_configuration(&self, _params: DidChangeConfigurationParams) {
        info!("configuration changed, reloading and invalidating caches");
        self.provider.lock().invalidate();
        self.load_configuration().await;
    }
}

fn to_response(location: ResolvedLocation) -> Option<GotoDefinitionResponse> {
    let uri = Url::from_file_path(&location.path).ok()?;
    let range = location.range.map(to_lsp_range).unwrap_or_default();
    Some(GotoDefinitionResponse::Scalar(Location { uri, range }))
}

fn to_lsp_range(range: SourceRange) -> Range {
    Range {
        start: to_lsp_position(range.start),
        end: to_lsp_position(range.end),
    }
}

// Core columns are already UTF-16 code units, only the line base differs.
fn to_lsp_position(position: Position) -> LspPosition {
    LspPosition {
        line: position.line.saturating_sub(1),
        character: position.column,
    }
}
