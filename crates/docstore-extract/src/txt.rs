use std::path::Path;

use tracing::debug;

use docstore_core::error::Result;
use docstore_core::types::TextUnit;

/// The whole file is one unit, unmodified. Invalid UTF-8 is decoded lossily.
pub fn extract(path: &Path, bytes: &[u8]) -> Result<Vec<TextUnit>> {
    let text = match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            debug!(path = %path.display(), "txt is not valid UTF-8, decoding lossily");
            String::from_utf8_lossy(bytes).into_owned()
        }
    };
    Ok(vec![TextUnit::new(text)])
}
