use std::time::Duration;

/// Default parser deadline in milliseconds
pub const DEFAULT_PARSER_TIMEOUT_MS: u64 = 1500;
/// Default size ceiling: 200 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 200 * 1024 * 1024;

/// Per-instance settings, fixed once a handler is built
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Log rejections, resolution errors and parser failures
    pub debug: bool,
    /// Deadline applied to every parser invocation
    pub parser_timeout: Duration,
    /// Files larger than this are refused before any parser runs
    pub max_file_size: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            debug: false,
            parser_timeout: Duration::from_millis(DEFAULT_PARSER_TIMEOUT_MS),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable diagnostic logging
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the parser deadline
    pub fn parser_timeout(mut self, timeout: Duration) -> Self {
        self.parser_timeout = timeout;
        self
    }

    /// Set the parser deadline in milliseconds (0 keeps the default)
    pub fn parser_timeout_ms(self, millis: u64) -> Self {
        let millis = if millis == 0 {
            DEFAULT_PARSER_TIMEOUT_MS
        } else {
            millis
        };
        self.parser_timeout(Duration::from_millis(millis))
    }

    /// Set the maximum file size in bytes (0 keeps the default)
    pub fn max_file_size(mut self, size: u64) -> Self {
        self.max_file_size = if size == 0 { DEFAULT_MAX_FILE_SIZE } else { size };
        self
    }
}
