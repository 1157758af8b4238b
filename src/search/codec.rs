//! Decoding file bytes to text before searching.

/// Turns file bytes into searchable text.
///
/// Decoding never fails; undecodable input is replaced, so one odd file never
/// aborts a search.
pub trait TextCodec: Send + Sync {
    /// Canonical name, e.g. `"UTF-8"`.
    fn name(&self) -> &'static str;

    /// Decode `bytes`.
    fn decode(&self, bytes: &[u8]) -> String;
}

/// UTF-8 with lossy replacement. A leading byte order mark is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct Utf8Codec;

impl TextCodec for Utf8Codec {
    fn name(&self) -> &'static str {
        "UTF-8"
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        String::from_utf8_lossy(bytes).into_owned()
    }
}

/// ISO-8859-1: every byte is the code point of the same value.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latin1Codec;

impl TextCodec for Latin1Codec {
    fn name(&self) -> &'static str {
        "ISO-8859-1"
    }

    fn decode(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| char::from(b)).collect()
    }
}

/// UTF-16 in the given byte order; a matching byte order mark is dropped.
#[derive(Debug, Clone, Copy)]
pub struct Utf16Codec {
    big_endian: bool,
}

impl Utf16Codec {
    /// Little-endian UTF-16.
    pub const LE: Utf16Codec = Utf16Codec { big_endian: false };
    /// Big-endian UTF-16.
    pub const BE: Utf16Codec = Utf16Codec { big_endian: true };
}

impl TextCodec for Utf16Codec {
    fn name(&self) -> &'static str {
        if self.big_endian { "UTF-16BE" } else { "UTF-16LE" }
    }

    fn decode(&self, bytes: &[u8]) -> String {
        let units = bytes.chunks_exact(2).map(|pair| {
            let pair = [pair[0], pair[1]];
            if self.big_endian {
                u16::from_be_bytes(pair)
            } else {
                u16::from_le_bytes(pair)
            }
        });
        let mut text: String = char::decode_utf16(units)
            .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect();
        if text.starts_with('\u{FEFF}') {
            text.remove(0);
        }
        text
    }
}

static UTF8: Utf8Codec = Utf8Codec;
static LATIN1: Latin1Codec = Latin1Codec;
static UTF16LE: Utf16Codec = Utf16Codec::LE;
static UTF16BE: Utf16Codec = Utf16Codec::BE;

/// Look up a codec by name, ignoring case and punctuation (`"utf8"`, `"latin-1"`).
pub fn codec_for_name(name: &str) -> Option<&'static dyn TextCodec> {
    let key: String = name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .map(|c| c.to_ascii_lowercase())
        .collect();
    match key.as_str() {
        "utf8" | "" => Some(&UTF8),
        "latin1" | "iso88591" | "l1" => Some(&LATIN1),
        "utf16" | "utf16le" => Some(&UTF16LE),
        "utf16be" => Some(&UTF16BE),
        _ => None,
    }
}

/// Codec for an optional encoding hint, falling back to UTF-8 for unknown names.
pub(crate) fn codec_or_default(name: Option<&str>) -> &'static dyn TextCodec {
    match name.and_then(codec_for_name) {
        Some(codec) => codec,
        None => {
            if let Some(name) = name {
                tracing::debug!(encoding = name, "unknown encoding, decoding as UTF-8");
            }
            &UTF8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_strips_bom_and_replaces_garbage() {
        assert_eq!(Utf8Codec.decode(b"\xEF\xBB\xBFhi"), "hi");
        assert_eq!(Utf8Codec.decode(b"a\xFFb"), "a\u{FFFD}b");
    }

    #[test]
    fn latin1_maps_bytes() {
        assert_eq!(Latin1Codec.decode(b"caf\xE9"), "café");
    }

    #[test]
    fn utf16_both_orders() {
        assert_eq!(Utf16Codec::LE.decode(b"\xFF\xFEh\0i\0"), "hi");
        assert_eq!(Utf16Codec::BE.decode(b"\0h\0i"), "hi");
    }

    #[test]
    fn names_are_normalized() {
        assert_eq!(codec_for_name("UTF-8").unwrap().name(), "UTF-8");
        assert_eq!(codec_for_name("Latin-1").unwrap().name(), "ISO-8859-1");
        assert_eq!(codec_for_name("utf-16be").unwrap().name(), "UTF-16BE");
        assert!(codec_for_name("klingon").is_none());
        assert_eq!(codec_or_default(Some("klingon")).name(), "UTF-8");
        assert_eq!(codec_or_default(None).name(), "UTF-8");
    }
}
