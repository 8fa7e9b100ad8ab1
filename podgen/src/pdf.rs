// PDF text extraction

use lopdf::Document;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PdfError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Error reading PDF file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: lopdf::Error,
    },
}

/// Extract the text of every page, in page order.
///
/// Pages whose text cannot be decoded are skipped with a warning; a missing or
/// unparsable file is an error.
pub fn extract_text(path: &Path) -> Result<String, PdfError> {
    if !path.exists() {
        return Err(PdfError::NotFound(path.to_path_buf()));
    }

    log::info!("Opening PDF: {}", path.display());
    let doc = Document::load(path).map_err(|source| PdfError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let pages = doc
        .get_pages()
        .into_keys()
        .map(|page| (page, doc.extract_text(&[page])));

    Ok(join_pages(pages))
}

/// Concatenate page texts, each followed by a newline, skipping failures.
fn join_pages<I, E>(pages: I) -> String
where
    I: IntoIterator<Item = (u32, Result<String, E>)>,
    E: std::fmt::Display,
{
    let mut text = String::new();

    for (page, result) in pages {
        match result {
            Ok(page_text) if page_text.trim().is_empty() => {
                log::debug!("Page {} has no text", page);
            }
            Ok(page_text) => {
                text.push_str(&page_text);
                text.push('\n');
            }
            Err(e) => log::warn!("Could not extract text from page {}: {}", page, e),
        }
    }

    text
}
