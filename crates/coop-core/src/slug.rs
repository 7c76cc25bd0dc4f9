//! Slug derivation for labelled reference records.

use unicode_normalization::UnicodeNormalization as _;

/// Placeholder slug for labels without a single ASCII alphanumeric character.
pub const EMPTY_SLUG: &str = "n-a";

/// Derive a URL-safe slug from a human label, the way the peer directory
/// application does.
///
/// The label is NFKD-decomposed and anything outside ASCII is dropped, so
/// accented letters fold to their base letter. Letters, digits, `_` and `-`
/// survive (lowercased); other punctuation is removed without leaving a gap.
/// Runs of whitespace and `-` become a single `-`, and leading or trailing
/// `-`/`_` are trimmed.
pub fn slugify(label: &str) -> String {
  let mut slug = String::with_capacity(label.len());
  let mut pending_dash = false;

  for c in label.nfkd().filter(char::is_ascii) {
    if c.is_ascii_alphanumeric() || c == '_' {
      if pending_dash {
        slug.push('-');
      }
      pending_dash = false;
      slug.push(c.to_ascii_lowercase());
    } else if c == '-' || c.is_ascii_whitespace() {
      pending_dash = true;
    }
  }

  let slug = slug.trim_matches(|c| c == '-' || c == '_');
  if slug.is_empty() { EMPTY_SLUG.to_string() } else { slug.to_string() }
}

/// The `n`th candidate for a slug that collided with an existing one.
/// `n = 1` is the bare slug; later attempts get `-2`, `-3`, ….
pub fn with_suffix(slug: &str, n: u32) -> String {
  if n <= 1 { slug.to_string() } else { format!("{slug}-{n}") }
}
