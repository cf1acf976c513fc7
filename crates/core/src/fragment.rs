use serde::{Deserialize, Serialize};

use crate::ids::{EntryId, OverlayId};
use crate::payload::{Payload, PayloadValue};
use crate::CoreError;

pub const DEFAULT_MENU_FRAGMENT: &str = "menu-open";
pub const MENU_OVERLAY: &str = "menu";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OverlayKind {
    /// Lightweight hamburger menu, addressed by a single fixed fragment.
    Menu,
    /// Full-screen module addressed by `#ACTION?params`.
    Module,
}

impl OverlayKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Menu => "menu",
            Self::Module => "module",
        }
    }
}

/// State object stored alongside every history entry the navigator pushes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub entry: EntryId,
    pub kind: OverlayKind,
    pub overlay: OverlayId,
    pub payload: Payload,
}

impl HistoryRecord {
    pub fn to_msgpack(&self) -> Result<Vec<u8>, CoreError> {
        rmp_serde::to_vec(self).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, CoreError> {
        rmp_serde::from_slice(bytes).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}

/// A parsed location hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub kind: OverlayKind,
    pub overlay: OverlayId,
    pub payload: Payload,
}

impl Fragment {
    /// Format the hash (with leading `#`) for an overlay.
    pub fn format(kind: OverlayKind, overlay: &OverlayId, payload: &Payload, menu_fragment: &str) -> String {
        match kind {
            OverlayKind::Menu => format!("#{menu_fragment}"),
            OverlayKind::Module if payload.is_empty() => format!("#{}", encode_component(overlay.as_str())),
            OverlayKind::Module => {
                let query = payload
                    .iter()
                    .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(&v.to_query_value())))
                    .collect::<Vec<_>>()
                    .join("&");
                format!("#{}?{query}", encode_component(overlay.as_str()))
            }
        }
    }

    /// Parse a location hash. Returns `Ok(None)` for an empty hash.
    /// Query values come back as text; the typed payload lives in the
    /// `HistoryRecord`, not the URL.
    pub fn parse(hash: &str, menu_fragment: &str) -> Result<Option<Self>, CoreError> {
        let hash = hash.strip_prefix('#').unwrap_or(hash);
        if hash.is_empty() {
            return Ok(None);
        }
        if hash == menu_fragment {
            return Ok(Some(Self {
                kind: OverlayKind::Menu,
                overlay: OverlayId::new(MENU_OVERLAY),
                payload: Payload::new(),
            }));
        }

        let (id, query) = match hash.split_once('?') {
            Some((id, query)) => (id, Some(query)),
            None => (hash, None),
        };
        let id = decode_component(id)?;
        if id.is_empty() {
            return Err(CoreError::InvalidFragment(format!("#{hash}")));
        }

        let mut payload = Payload::new();
        for pair in query.into_iter().flat_map(|q| q.split('&')).filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            payload.insert(decode_component(key)?, PayloadValue::Text(decode_component(value)?));
        }

        Ok(Some(Self {
            kind: OverlayKind::Module,
            overlay: OverlayId::new(id),
            payload,
        }))
    }
}

/// Overlay identity (without query) of a hash, used for Back detection.
pub fn hash_overlay_id(hash: &str, menu_fragment: &str) -> Option<OverlayId> {
    Fragment::parse(hash, menu_fragment).ok().flatten().map(|f| f.overlay)
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~')
}

pub fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

pub fn decode_component(s: &str) -> Result<String, CoreError> {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let hex = bytes
                    .get(i + 1..i + 3)
                    .and_then(|h| std::str::from_utf8(h).ok())
                    .and_then(|h| u8::from_str_radix(h, 16).ok())
                    .ok_or_else(|| CoreError::InvalidFragment(format!("bad escape in {s}")))?;
                out.push(hex);
                i += 3;
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    String::from_utf8(out).map_err(|_| CoreError::InvalidFragment(format!("non-utf8 escape in {s}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::payload;

    #[test]
    fn module_fragment_without_payload() {
        let hash = Fragment::format(OverlayKind::Module, &"cart".into(), &Payload::new(), DEFAULT_MENU_FRAGMENT);
        assert_eq!(hash, "#cart");
    }

    #[test]
    fn module_fragment_encodes_sorted_query() {
        let p = payload([("section", "prints & cards"), ("page", "2")]);
        let hash = Fragment::format(OverlayKind::Module, &"products".into(), &p, DEFAULT_MENU_FRAGMENT);
        assert_eq!(hash, "#products?page=2&section=prints%20%26%20cards");

        let parsed = Fragment::parse(&hash, DEFAULT_MENU_FRAGMENT).unwrap().unwrap();
        assert_eq!(parsed.kind, OverlayKind::Module);
        assert_eq!(parsed.overlay.as_str(), "products");
        assert_eq!(parsed.payload, p);
    }

    #[test]
    fn menu_uses_fixed_fragment() {
        let hash = Fragment::format(OverlayKind::Menu, &"menu".into(), &payload([("x", "y")]), DEFAULT_MENU_FRAGMENT);
        assert_eq!(hash, "#menu-open");
        let parsed = Fragment::parse("#menu-open", DEFAULT_MENU_FRAGMENT).unwrap().unwrap();
        assert_eq!(parsed.kind, OverlayKind::Menu);
        assert!(parsed.payload.is_empty());
    }

    #[test]
    fn empty_hash_is_none() {
        assert_eq!(Fragment::parse("", DEFAULT_MENU_FRAGMENT).unwrap(), None);
        assert_eq!(Fragment::parse("#", DEFAULT_MENU_FRAGMENT).unwrap(), None);
    }

    #[test]
    fn malformed_escape_is_rejected() {
        let result = Fragment::parse("#cart?x=%G1", DEFAULT_MENU_FRAGMENT);
        assert!(matches!(result, Err(CoreError::InvalidFragment(_))));
        assert_eq!(hash_overlay_id("#cart?x=%G1", DEFAULT_MENU_FRAGMENT), None);
    }

    #[test]
    fn overlay_id_ignores_query() {
        assert_eq!(
            hash_overlay_id("#products?section=prints", DEFAULT_MENU_FRAGMENT),
            Some(OverlayId::new("products"))
        );
    }

    #[test]
    fn record_msgpack_roundtrip() {
        let record = HistoryRecord {
            entry: EntryId::new(),
            kind: OverlayKind::Module,
            overlay: "cart".into(),
            payload: payload([("qty", 2.0)]),
        };
        let bytes = record.to_msgpack().unwrap();
        assert_eq!(HistoryRecord::from_msgpack(&bytes).unwrap(), record);
    }
}
