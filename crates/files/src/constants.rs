/// Marker file that keeps empty category directories in version control.
pub const KEEP_FILE_NAME: &str = ".gitkeep";
