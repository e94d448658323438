use crate::error::{AppError, AppResult};
use std::path::{Path, PathBuf};
use tracing::debug;

const INPUT_EXTENSION: &str = "txt";

/// Resolve the input argument into the list of text files to process
///
/// A file is taken as is. A directory contributes every `*.txt` file
/// directly inside it, sorted by path. The extension match is
/// case-sensitive.
pub fn collect_input_files(input: &Path) -> AppResult<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }

    if !input.is_dir() {
        return Err(AppError::InputNotFound(input.to_path_buf()));
    }

    debug!(?input, "scanning input directory");

    let mut files = Vec::new();
    for entry in std::fs::read_dir(input)? {
        let path = entry?.path();

        if path.is_dir() {
            continue;
        }

        if path.extension().is_some_and(|ext| ext == INPUT_EXTENSION) {
            files.push(path);
        }
    }

    files.sort();
    debug!("found {} input file(s)", files.len());
    Ok(files)
}
