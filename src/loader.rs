//! C5: the loader interface invoked by C3 when an `[Import]` statement is
//! encountered. The core never touches the filesystem directly (spec.md §5
//! "No I/O occurs inside C1-C4, C6, C7") — everything goes through this
//! trait so a caller can substitute an in-memory loader for tests or a
//! sandboxed embedding.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    NotFound { path: String },
    CircularDependency { path: String, chain: Vec<String> },
    ArchiveEntryNotFound { archive: String, entry: String },
    ArchiveUnsupported { path: String },
    Io { path: String, message: String },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadError::NotFound { path } => write!(f, "import not found: '{}'", path),
            LoadError::CircularDependency { path, chain } => {
                write!(f, "circular import at '{}' (chain: {})", path, chain.join(" -> "))
            }
            LoadError::ArchiveEntryNotFound { archive, entry } => {
                write!(f, "entry '{}' not found in archive '{}'", entry, archive)
            }
            LoadError::ArchiveUnsupported { path } => {
                write!(f, "'{}' looks like a module archive, but archive reading isn't wired up", path)
            }
            LoadError::Io { path, message } => write!(f, "failed to read '{}': {}", path, message),
        }
    }
}

impl std::error::Error for LoadError {}

/// Resolves an `[Import]`'s path to source text. Implementors decide what a
/// path means (filesystem, archive entry, in-memory map); the only contract
/// is "complete source bytes or an error" — streaming is not supported
/// (spec.md §5).
pub trait Loader {
    fn load(&mut self, relative_path: &str, importer_context: &str) -> Result<String, LoadError>;
}

/// Tracks the stack of currently-active imports so a cycle (`a -> b -> a`)
/// is caught before the loader is asked to re-enter a path that's still
/// being resolved, per spec.md §5/§7.
#[derive(Debug, Default)]
pub struct ImportStack {
    active: Vec<String>,
}

impl ImportStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pushes `path` onto the active-import stack, or returns a
    /// `CircularDependency` error if it's already being resolved.
    pub fn enter(&mut self, path: &str) -> Result<(), LoadError> {
        if let Some(pos) = self.active.iter().position(|p| p == path) {
            let mut chain: Vec<String> = self.active[pos..].to_vec();
            chain.push(path.to_string());
            return Err(LoadError::CircularDependency {
                path: path.to_string(),
                chain,
            });
        }
        self.active.push(path.to_string());
        Ok(())
    }

    pub fn exit(&mut self, path: &str) {
        if let Some(pos) = self.active.iter().rposition(|p| p == path) {
            self.active.remove(pos);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_a_direct_cycle() {
        let mut stack = ImportStack::new();
        stack.enter("a.chtl").unwrap();
        let err = stack.enter("a.chtl").unwrap_err();
        assert!(matches!(err, LoadError::CircularDependency { .. }));
    }

    #[test]
    fn detects_an_indirect_cycle_and_reports_the_chain() {
        let mut stack = ImportStack::new();
        stack.enter("a.chtl").unwrap();
        stack.enter("b.chtl").unwrap();
        let err = stack.enter("a.chtl").unwrap_err();
        match err {
            LoadError::CircularDependency { chain, .. } => {
                assert_eq!(chain, vec!["a.chtl".to_string(), "b.chtl".to_string(), "a.chtl".to_string()]);
            }
            _ => panic!("expected circular dependency"),
        }
    }

    #[test]
    fn exiting_allows_re_entry_after_completion() {
        let mut stack = ImportStack::new();
        stack.enter("a.chtl").unwrap();
        stack.exit("a.chtl");
        assert!(stack.enter("a.chtl").is_ok());
    }
}
