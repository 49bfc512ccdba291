use url::Url;

use super::HlsError;

/// Resolves a playlist reference against the URL of the playlist that contains it.
///
/// References that already carry an `http`/`https` scheme are taken as-is;
/// everything else is joined onto `base` with standard URL resolution.
pub fn resolve(base: &Url, reference: &str) -> Result<Url, HlsError> {
    let invalid = |reason: String| HlsError::InvalidReference {
        reference: reference.to_string(),
        reason,
    };

    let reference = reference.trim();
    if reference.is_empty() {
        return Err(invalid("empty reference".to_string()));
    }

    if reference.starts_with("http") {
        Url::parse(reference).map_err(|e| invalid(e.to_string()))
    } else {
        base.join(reference)
            .map_err(|e| invalid(format!("cannot join with {base}: {e}")))
    }
}

/// Parses the caller-supplied entry URL, which must be absolute.
pub fn parse_absolute(url: &str) -> Result<Url, HlsError> {
    Url::parse(url.trim()).map_err(|e| HlsError::InvalidReference {
        reference: url.to_string(),
        reason: e.to_string(),
    })
}
