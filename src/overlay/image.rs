//! Image source resolution

use url::Url;

/// Path of the framework's image optimisation proxy
const IMAGE_PROXY_PATH: &str = "/_next/image";

/// Resolve `input` against the page origin
pub fn resolve_image_src(input: &str, origin: Option<&Url>) -> Option<Url> {
    match origin {
        Some(base) => base.join(input).ok(),
        None => Url::parse(input).ok(),
    }
}

/// Comparable form of an image source
///
/// Relative sources are resolved against the page origin, and proxy URLs
/// (`/_next/image?url=...`) collapse to the proxied URL, decoded once and
/// resolved the same way. Unparseable input is returned as is.
pub fn normalize_image_src(input: &str, origin: Option<&Url>) -> String {
    if input.is_empty() {
        return String::new();
    }
    let Some(url) = resolve_image_src(input, origin) else {
        return input.to_string();
    };
    if url.path() == IMAGE_PROXY_PATH {
        if let Some((_, real)) = url.query_pairs().find(|(key, _)| key == "url") {
            if !real.is_empty() {
                return match resolve_image_src(&real, origin) {
                    Some(resolved) => resolved.to_string(),
                    None => real.into_owned(),
                };
            }
        }
    }
    url.to_string()
}
