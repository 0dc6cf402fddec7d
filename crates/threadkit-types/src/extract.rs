//! Mention and link extraction.
//!
//! Both scanners are pure and must be rerun over the whole body on every
//! create or edit. Offsets are byte offsets into the original body, so
//! `&body[m.start..m.end]` is always the matched token.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{Link, Mention};

lazy_static! {
    static ref MENTION_REGEX: Regex = Regex::new(r"@([\p{L}\p{Nd}_:-]+)").expect("valid regex");
    static ref LINK_REGEX: Regex = Regex::new(r"https?://\S+").expect("valid regex");
}

/// Characters dropped from the tail of a link token.
const LINK_TRAILING_PUNCTUATION: &[char] = &['.', ',', ':', ';', '"', '\'', ')', ']'];

/// Every `@user` token in left-to-right order. The span includes the `@`.
pub fn extract_mentions(body: &str) -> Vec<Mention> {
    MENTION_REGEX
        .captures_iter(body)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let user = caps.get(1)?;
            Some(Mention {
                user_id: user.as_str().to_string(),
                start: whole.start(),
                end: whole.end(),
            })
        })
        .collect()
}

/// Every `http://` or `https://` token. A token ends at whitespace; closing
/// punctuation at its tail is not part of the url.
pub fn extract_links(body: &str) -> Vec<Link> {
    LINK_REGEX
        .find_iter(body)
        .filter_map(|m| {
            let url = m.as_str().trim_end_matches(LINK_TRAILING_PUNCTUATION);
            if url.ends_with("://") {
                return None;
            }
            Some(Link {
                url: url.to_string(),
                start: m.start(),
                end: m.start() + url.len(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_mention_offsets() {
        let body = "Hey @user_2, check this out!";
        let mentions = extract_mentions(body);
        assert_eq!(
            mentions,
            vec![Mention {
                user_id: "user_2".into(),
                start: 4,
                end: 11
            }]
        );
        assert_eq!(&body[4..11], "@user_2");
    }

    #[test]
    fn mentions_allow_colon_and_dash() {
        let mentions = extract_mentions("cc @org:team-lead and @bob");
        let ids: Vec<_> = mentions.iter().map(|m| m.user_id.as_str()).collect();
        assert_eq!(ids, vec!["org:team-lead", "bob"]);
    }

    #[test]
    fn bare_at_sign_is_not_a_mention() {
        assert!(extract_mentions("meet @ noon").is_empty());
        assert!(extract_mentions("").is_empty());
    }

    #[test]
    fn mention_offsets_after_multibyte_text() {
        let body = "héllo @ana";
        let mentions = extract_mentions(body);
        assert_eq!(mentions.len(), 1);
        assert_eq!(&body[mentions[0].start..mentions[0].end], "@ana");
    }

    #[test]
    fn single_link() {
        let links = extract_links("Check out https://convex.dev for more info");
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url, "https://convex.dev");
        assert_eq!(links[0].start, 10);
        assert_eq!(links[0].end, 28);
    }

    #[test]
    fn link_drops_trailing_punctuation() {
        let body = "see (http://example.com/a?b=1), and https://x.io.";
        let links = extract_links(body);
        let urls: Vec<_> = links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["http://example.com/a?b=1", "https://x.io"]);
        for link in &links {
            assert_eq!(&body[link.start..link.end], link.url);
        }
    }

    #[test]
    fn scheme_only_is_ignored() {
        assert!(extract_links("just https:// here").is_empty());
        assert!(extract_links("ftp://nope.example").is_empty());
    }
}
