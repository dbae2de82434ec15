mod path;


pub use path::{is_inside, normalize_lexically, PathResolver, ResolvedPath};
