//! Opaque keyset cursors.
//!
//! A cursor names the last row a page returned by its ordering timestamp and
//! id. Rows are ordered by `(timestamp, id)`, so rows sharing a millisecond
//! are neither skipped nor repeated across pages.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

use crate::error::{Result, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub at: i64,
    pub id: Uuid,
}

impl Cursor {
    pub fn new(at: i64, id: Uuid) -> Self {
        Self { at, id }
    }

    pub fn encode(&self) -> String {
        URL_SAFE_NO_PAD.encode(format!("{}:{}", self.at, self.id))
    }

    pub fn decode(s: &str) -> Result<Self> {
        let bytes = URL_SAFE_NO_PAD
            .decode(s)
            .map_err(|_| StoreError::InvalidCursor("not valid base64".into()))?;
        let text = String::from_utf8(bytes)
            .map_err(|_| StoreError::InvalidCursor("not valid utf-8".into()))?;
        let (at, id) = text
            .split_once(':')
            .ok_or_else(|| StoreError::InvalidCursor("missing separator".into()))?;
        let at = at
            .parse::<i64>()
            .map_err(|_| StoreError::InvalidCursor("bad timestamp".into()))?;
        let id = id
            .parse::<Uuid>()
            .map_err(|_| StoreError::InvalidCursor("bad id".into()))?;
        Ok(Self { at, id })
    }

    /// Decode an optional cursor argument.
    pub fn parse_opt(s: Option<&str>) -> Result<Option<Self>> {
        s.map(Self::decode).transpose()
    }
}

/// Split a `limit + 1` fetch into the page and its continuation cursor.
pub(crate) fn finish_page<T>(
    mut rows: Vec<T>,
    limit: usize,
    key: impl Fn(&T) -> Cursor,
) -> (Vec<T>, Option<String>, bool) {
    if rows.len() > limit {
        rows.truncate(limit);
        let next = rows.last().map(|r| key(r).encode());
        (rows, next, true)
    } else {
        (rows, None, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_what_was_encoded() {
        let c = Cursor::new(1_700_000_000_123, Uuid::now_v7());
        assert_eq!(Cursor::decode(&c.encode()).unwrap(), c);
    }

    #[test]
    fn garbage_is_rejected() {
        let err = Cursor::decode("!!!").unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor(_)));

        let no_sep = URL_SAFE_NO_PAD.encode("12345");
        assert!(Cursor::decode(&no_sep).is_err());
    }

    #[test]
    fn finish_page_reports_last_returned_row() {
        let rows = vec![1i64, 2, 3, 4];
        let id = Uuid::nil();
        let (page, next, more) = finish_page(rows, 3, |r| Cursor::new(*r, id));
        assert_eq!(page, vec![1, 2, 3]);
        assert!(more);
        assert_eq!(Cursor::decode(&next.unwrap()).unwrap().at, 3);

        let (page, next, more) = finish_page(vec![1i64, 2], 3, |r| Cursor::new(*r, id));
        assert_eq!(page.len(), 2);
        assert!(next.is_none());
        assert!(!more);
    }
}
