use crate::domain::synthesis::SynthesisError;
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

const OUTPUT_SUFFIX: &str = "_voice_synthesis";
const ARCHIVE_EXTENSION: &str = "zip";
const SCRATCH_PREFIX: &str = ".extract-";

/// Extension of the artifact behind a URI, with its leading dot
///
/// Query strings and fragments are ignored. Returns an empty string when
/// the path has no extension.
pub fn uri_extension(uri: &str) -> String {
    let path = match url::Url::parse(uri) {
        Ok(url) => url.path().to_string(),
        Err(_) => uri
            .split(&['?', '#'][..])
            .next()
            .unwrap_or_default()
            .to_string(),
    };

    Path::new(&path)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

/// `<basename>_voice_synthesis<ext>`, `ext` including its dot
pub fn output_file_name(basename: &str, ext: &str) -> String {
    format!("{}{}{}", basename, OUTPUT_SUFFIX, ext)
}

/// Writes downloaded artifacts into the output directory
///
/// Archives are unpacked in a private scratch directory inside the output
/// directory, so concurrent downloads never see each other's entries.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    output_dir: PathBuf,
    entry_extension: String,
}

impl ArtifactStore {
    pub fn new(output_dir: impl Into<PathBuf>, entry_extension: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            entry_extension: entry_extension.trim_start_matches('.').to_lowercase(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Store the artifact fetched from `uri` for the input named `basename`
    ///
    /// Returns the final paths written.
    pub async fn save(
        &self,
        basename: &str,
        uri: &str,
        bytes: Vec<u8>,
    ) -> Result<Vec<PathBuf>, SynthesisError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        let ext = uri_extension(uri);
        if ext.trim_start_matches('.').eq_ignore_ascii_case(ARCHIVE_EXTENSION) {
            let output_dir = self.output_dir.clone();
            let entry_extension = self.entry_extension.clone();
            let basename = basename.to_string();
            return spawn_blocking(move || {
                extract_archive(&bytes, &output_dir, &basename, &entry_extension)
            })
            .await
            .map_err(|e| SynthesisError::Archive(format!("extraction task panicked: {}", e)))?;
        }

        let path = self.output_dir.join(output_file_name(basename, &ext));
        tokio::fs::write(&path, &bytes).await?;
        debug!(?path, size = bytes.len(), "Artifact written");
        Ok(vec![path])
    }
}

/// Unpack matching entries of a ZIP archive into `output_dir`
///
/// Entries are renamed to the output convention. The first match keeps
/// the plain name; later ones get a `_2`, `_3`, ... suffix. Non-matching entries
/// and the archive itself are dropped with the scratch directory.
fn extract_archive(
    bytes: &[u8],
    output_dir: &Path,
    basename: &str,
    entry_extension: &str,
) -> Result<Vec<PathBuf>, SynthesisError> {
    let scratch = tempfile::Builder::new()
        .prefix(SCRATCH_PREFIX)
        .tempdir_in(output_dir)?;

    let archive_path = scratch.path().join(format!("{}.{}", basename, ARCHIVE_EXTENSION));
    {
        let mut file = std::fs::File::create(&archive_path)?;
        file.write_all(bytes)?;
    }

    let file = std::fs::File::open(&archive_path)?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| {
        SynthesisError::Archive(format!("failed to read ZIP archive: {}", e))
    })?;

    let mut staged = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|e| {
            SynthesisError::Archive(format!("failed to read ZIP entry {}: {}", index, e))
        })?;

        if entry.is_dir() {
            continue;
        }

        let matches = match entry.enclosed_name() {
            Some(name) => name
                .extension()
                .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(entry_extension))
                .unwrap_or(false),
            None => {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                false
            }
        };
        if !matches {
            debug!(entry = entry.name(), "discarding archive entry");
            continue;
        }

        let staged_path = scratch.path().join(format!("entry-{}", staged.len()));
        let mut outfile = std::fs::File::create(&staged_path)?;
        std::io::copy(&mut entry, &mut outfile).map_err(|e| {
            SynthesisError::Archive(format!("failed to extract {}: {}", entry.name(), e))
        })?;
        staged.push(staged_path);
    }

    if staged.is_empty() {
        return Err(SynthesisError::Archive(format!(
            "archive contained no .{} entries",
            entry_extension
        )));
    }

    let ext = format!(".{}", entry_extension);
    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for (n, staged_path) in staged.iter().enumerate() {
        let name = if n == 0 {
            output_file_name(basename, &ext)
        } else {
            output_file_name(basename, &format!("_{}{}", n + 1, ext))
        };
        let target = output_dir.join(name);
        if let Err(e) = std::fs::rename(staged_path, &target) {
            for path in &written {
                if let Err(cleanup) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %cleanup, "failed to remove partial output");
                }
            }
            return Err(e.into());
        }
        written.push(target);
    }

    info!(
        archive = %archive_path.display(),
        extracted_count = written.len(),
        "Archive extracted"
    );

    scratch.close()?;
    Ok(written)
}
