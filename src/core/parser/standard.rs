use super::ResultParser;

/// Judges a run by its exit code alone.
///
/// This is the fallback for commands no framework parser recognizes.
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardParser;

impl ResultParser for StandardParser {
    fn name(&self) -> &str {
        "standard"
    }
}
