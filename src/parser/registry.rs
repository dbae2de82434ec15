use super::MetadataParser;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Normalize an extension to lowercase with exactly one leading dot
///
/// `"JPG"`, `".jpg"` and `"..jpg"` all become `".jpg"`.
pub fn normalize_extension(extension: &str) -> String {
    format!(".{}", extension.trim_start_matches('.').to_lowercase())
}

/// Dispatch table from file extension to metadata parser
///
/// Filled during setup and read-only once a handler is built from it.
/// Cloning is cheap: parsers are shared behind `Arc`.
#[derive(Clone, Default)]
pub struct ParserRegistry {
    /// Normalized extension (".jpg") -> parser
    map: HashMap<String, Arc<dyn MetadataParser>>,
}

impl ParserRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a parser for a file extension
    ///
    /// The extension is normalized first, so `"PNG"` and `".png"` name the
    /// same slot. Registering an extension again replaces the earlier parser.
    ///
    /// # Example
    /// ```ignore
    /// registry.register("png", ImageParser);
    /// registry.register(".JPG", ImageParser);
    /// ```
    pub fn register(&mut self, extension: &str, parser: impl MetadataParser + 'static) {
        self.insert(extension, Arc::new(parser));
    }

    /// Register one parser instance under several extensions
    pub fn register_many<I, S>(&mut self, extensions: I, parser: impl MetadataParser + 'static)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parser: Arc<dyn MetadataParser> = Arc::new(parser);
        for extension in extensions {
            self.insert(extension.as_ref(), Arc::clone(&parser));
        }
    }

    fn insert(&mut self, extension: &str, parser: Arc<dyn MetadataParser>) {
        self.map.insert(normalize_extension(extension), parser);
    }

    /// Find the parser registered for an extension
    pub fn lookup(&self, extension: &str) -> Option<Arc<dyn MetadataParser>> {
        self.map.get(&normalize_extension(extension)).cloned()
    }

    /// Whether a parser is registered for the extension
    pub fn contains(&self, extension: &str) -> bool {
        self.map.contains_key(&normalize_extension(extension))
    }

    /// Number of registered extensions
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether no parser has been registered
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// List all registered extensions, sorted
    pub fn registered_extensions(&self) -> Vec<&str> {
        let mut extensions: Vec<&str> = self.map.keys().map(|s| s.as_str()).collect();
        extensions.sort_unstable();
        extensions
    }
}

impl fmt::Debug for ParserRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserRegistry")
            .field("extensions", &self.registered_extensions())
            .finish()
    }
}
