use std::path::PathBuf;

use crate::error::AppError;

const DEFAULT_STEM: &str = "output";

/// Output path derived from the playlist URL: the last path segment with its
/// extension swapped for `.mp4`, truncated to 30 characters.
pub fn default_output_path(url_str: &str) -> Result<PathBuf, AppError> {
    let url = url_str
        .parse::<reqwest::Url>()
        .map_err(|e| AppError::InvalidInput(e.to_string()))?;

    let file_name = url
        .path_segments()
        .and_then(|mut s| s.next_back())
        .filter(|s| !s.is_empty())
        .unwrap_or(DEFAULT_STEM);

    let stem = match file_name.rfind('.') {
        Some(0) => DEFAULT_STEM,
        Some(pos) => &file_name[..pos],
        None => file_name,
    };

    // we dont want large filenames
    let stem: String = stem.chars().take(30).collect();
    Ok(PathBuf::from(format!("{stem}.mp4")))
}
