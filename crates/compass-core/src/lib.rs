//! Compass core: go-to-definition resolution for AMD/RequireJS modules.
//!
//! Given a caret position on an identifier inside a module, the engine
//! determines which declared dependency introduced that identifier,
//! resolves the logical module path to a file path, and locates the
//! matching exported identifier inside the target file. Purely static
//! analysis; the hosting application supplies documents, files and
//! configuration through the [`host::Host`] boundary.

pub mod cache;
pub mod config;
pub mod dependencies;
pub mod host;
pub mod locator;
pub mod parser;
pub mod paths;
pub mod provider;
pub mod resolver;

pub use config::{ConfigError, ResolverConfig};
pub use host::{FsHost, Host};
pub use parser::{ParseError, ParsedModule, Parser, Position, SourceRange};
pub use provider::{DefinitionError, DefinitionProvider, ResolvedLocation};
