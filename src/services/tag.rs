//! Tag parsing helpers
//!
//! The admin client submits a post's tags as one comma-separated string.
//! `parse_tag_list` turns that string into tag drafts ready for
//! find-or-insert; `generate_slug` is the minimal slugifier used for
//! tags and user names. Neither checks the database for collisions;
//! uniqueness stays the calling layer's concern.

use crate::models::TagDraft;

/// Generate a URL-friendly slug from a name.
///
/// Lowercases, maps separators and ASCII punctuation to hyphens, keeps
/// non-ASCII characters as-is, and collapses hyphen runs.
pub fn generate_slug(name: &str) -> String {
    let slug: String = name
        .to_lowercase()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || !c.is_ascii() {
                c
            } else {
                '-'
            }
        })
        .collect();

    // Remove consecutive hyphens and trim hyphens from both ends
    let mut result = String::new();
    let mut prev_hyphen = false;
    for c in slug.chars() {
        if c == '-' {
            if !prev_hyphen && !result.is_empty() {
                result.push(c);
                prev_hyphen = true;
            }
        } else {
            result.push(c);
            prev_hyphen = false;
        }
    }

    result.trim_end_matches('-').to_string()
}

/// Parse a comma-separated tag string into drafts.
///
/// Whitespace around each entry is trimmed, empty entries are skipped,
/// and entries that slugify to the same value are deduplicated so a post
/// never links the same tag twice.
pub fn parse_tag_list(input: &str) -> Vec<TagDraft> {
    let mut drafts: Vec<TagDraft> = Vec::new();

    for raw in input.split(',') {
        let name = raw.trim();
        if name.is_empty() {
            continue;
        }
        let slug = generate_slug(name);
        if slug.is_empty() || drafts.iter().any(|d| d.slug == slug) {
            continue;
        }
        drafts.push(TagDraft {
            name: name.to_string(),
            slug,
        });
    }

    drafts
}
