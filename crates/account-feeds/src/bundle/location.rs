/// Scheme prepended to every compact token.
pub const SCHEME: &str = "https://";

/// Expands a compact token (`-` for `/`, `_` for `.`) into a full URL.
pub fn format_location(token: &str) -> String {
    let mut url = String::with_capacity(SCHEME.len() + token.len());
    url.push_str(SCHEME);
    url.extend(token.chars().map(|c| match c {
        '-' => '/',
        '_' => '.',
        other => other,
    }));
    url
}
