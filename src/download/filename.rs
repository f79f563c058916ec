//! Local file names for downloaded images

use crate::MirrorError;
use url::Url;

/// Suffix appended to the broken names the site produces for untitled uploads
const UNNAMED_SUFFIX: &str = ".unnamedimage.jpg";

/// Derives the local file name for an image URL
///
/// The name is the percent-decoded final path segment. A segment that would
/// escape the download directory is rejected. Untitled uploads show up as
/// `<10 digits>.` and are rewritten to `<10 digits><artist>.unnamedimage.jpg`.
///
/// # Example
///
/// ```
/// use gallery_mirror::download::target_filename;
/// use url::Url;
///
/// let url = Url::parse("https://cdn.example.com/art/foo/1420070400.foo_sketch%20one.png").unwrap();
/// assert_eq!(target_filename(&url, "foo").unwrap(), "1420070400.foo_sketch one.png");
///
/// let broken = Url::parse("https://cdn.example.com/art/foo/1420070400.").unwrap();
/// assert_eq!(target_filename(&broken, "foo").unwrap(), "1420070400foo.unnamedimage.jpg");
/// ```
pub fn target_filename(image_url: &Url, artist: &str) -> Result<String, MirrorError> {
    let invalid = || MirrorError::InvalidFilename {
        url: image_url.to_string(),
    };

    let segment = image_url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or_default();
    let decoded = urlencoding::decode(segment).map_err(|_| invalid())?;

    let name = if is_broken_name(&decoded) {
        tracing::debug!("Fixing broken file name {}", decoded);
        format!("{}{}{}", &decoded[..10], artist, UNNAMED_SUFFIX)
    } else {
        decoded.into_owned()
    };

    if !is_safe_name(&name) {
        return Err(invalid());
    }
    Ok(name)
}

/// Returns true for names made of exactly 10 digits and a trailing dot
pub fn is_broken_name(name: &str) -> bool {
    name.len() == 11 && name.ends_with('.') && name[..10].bytes().all(|b| b.is_ascii_digit())
}

fn is_safe_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
