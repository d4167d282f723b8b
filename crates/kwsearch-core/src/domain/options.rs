//! Enumerations stored by name in the settings files.
//!
//! Every value here is persisted as its upper-case name (`AVG`, `LATIN_1`,
//! `EXTRACT_UTF16`), so renaming a variant's name string is a breaking change
//! for existing files.  Parsing is exact and case-sensitive: a value that does
//! not match a known name is an invalid configuration value, not a default.

use std::time::Duration;

use thiserror::Error;

/// A stored name did not match any member of the expected enumeration.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} name: {value:?}")]
pub struct ParseEnumError {
    /// Name of the enumeration that was being parsed.
    pub kind: &'static str,
    /// The rejected text.
    pub value: String,
}

/// Declares a fieldless enum whose members map one-to-one to stored names.
///
/// Generates `ALL`, `name()`, `Display`, `FromStr`, and string-based serde
/// impls so the same name is used in properties files and TOML.
macro_rules! named_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        $vis enum $name {
            $($(#[$vmeta])* $variant),+
        }

        impl $name {
            /// Every member, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// The stored name of this member.
            pub fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = $crate::domain::options::ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err($crate::domain::options::ParseEnumError {
                        kind: stringify!($name),
                        value: s.to_string(),
                    }),
                }
            }
        }

        impl ::serde::Serialize for $name {
            fn serialize<S: ::serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.name())
            }
        }

        impl<'de> ::serde::Deserialize<'de> for $name {
            fn deserialize<D: ::serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = <String as ::serde::Deserialize>::deserialize(deserializer)?;
                text.parse().map_err(<D::Error as ::serde::de::Error>::custom)
            }
        }
    };
}

pub(crate) use named_enum;

named_enum! {
    /// How often a running ingest job commits its index and re-runs keyword
    /// searches.
    pub enum UpdateFrequency {
        Fast => "FAST",
        Avg => "AVG",
        Slow => "SLOW",
        Slowest => "SLOWEST",
        /// Search only once, at the end of ingest.
        Never => "NONE",
    }
}

impl UpdateFrequency {
    /// Interval between periodic searches, or `None` when periodic searching
    /// is disabled.
    pub fn interval(self) -> Option<Duration> {
        let minutes = match self {
            UpdateFrequency::Fast => 1,
            UpdateFrequency::Avg => 5,
            UpdateFrequency::Slow => 10,
            UpdateFrequency::Slowest => 20,
            UpdateFrequency::Never => return None,
        };
        Some(Duration::from_secs(minutes * 60))
    }
}

impl Default for UpdateFrequency {
    fn default() -> Self {
        UpdateFrequency::Avg
    }
}

named_enum! {
    /// A Unicode script whose character ranges may be extracted as candidate
    /// text from files that have no text extractor.
    pub enum Script {
        None => "NONE",
        Common => "COMMON",
        Latin1 => "LATIN_1",
        Greek => "GREEK",
        Cyrillic => "CYRILLIC",
        Armenian => "ARMENIAN",
        Hebrew => "HEBREW",
        Arabic => "ARABIC",
        Syriac => "SYRIAC",
        Thaana => "THAANA",
        Devanagari => "DEVANAGARI",
        Bengali => "BENGALI",
        Gurmukhi => "GURMUKHI",
        Gujarati => "GUJARATI",
        Oriya => "ORIYA",
        Tamil => "TAMIL",
        Telugu => "TELUGU",
        Kannada => "KANNADA",
        Malayalam => "MALAYALAM",
        Sinhala => "SINHALA",
        Thai => "THAI",
        Lao => "LAO",
        Tibetan => "TIBETAN",
        Myanmar => "MYANMAR",
        Georgian => "GEORGIAN",
        Hangul => "HANGUL",
        Ethiopic => "ETHIOPIC",
        Cherokee => "CHEROKEE",
        CanadianAboriginal => "CANADIAN_ABORIGINAL",
        Ogham => "OGHAM",
        Runic => "RUNIC",
        Khmer => "KHMER",
        Mongolian => "MONGOLIAN",
        Hiragana => "HIRAGANA",
        Katakana => "KATAKANA",
        Bopomofo => "BOPOMOFO",
        Han => "HAN",
        Yi => "YI",
        OldItalic => "OLD_ITALIC",
        Gothic => "GOTHIC",
        Deseret => "DESERET",
        Inherited => "INHERITED",
        Tagalog => "TAGALOG",
        Hanunoo => "HANUNOO",
        Buhid => "BUHID",
        Tagbanwa => "TAGBANWA",
        Limbu => "LIMBU",
        TaiLe => "TAI_LE",
        LinearB => "LINEAR_B",
        Ugaritic => "UGARITIC",
        Shavian => "SHAVIAN",
        Osmanya => "OSMANYA",
        Cypriot => "CYPRIOT",
        Braille => "BRAILLE",
        Buginese => "BUGINESE",
        Coptic => "COPTIC",
        NewTaiLue => "NEW_TAI_LUE",
        Glagolitic => "GLAGOLITIC",
        Tifinagh => "TIFINAGH",
        SylotiNagri => "SYLOTI_NAGRI",
        OldPersian => "OLD_PERSIAN",
        Kharoshthi => "KHAROSHTHI",
        Balinese => "BALINESE",
        Cuneiform => "CUNEIFORM",
        Phoenician => "PHOENICIAN",
        PhagsPa => "PHAGS_PA",
        Nko => "NKO",
        Control => "CONTROL",
        Latin2 => "LATIN_2",
    }
}

impl Script {
    /// Human-readable label for pickers and CLI output.
    pub fn label(self) -> String {
        match self {
            Script::Latin1 => "Latin - Basic".to_string(),
            Script::Latin2 => "Latin - Extended".to_string(),
            other => other
                .name()
                .split('_')
                .map(|word| {
                    let mut chars = word.chars();
                    match chars.next() {
                        Some(first) => first.to_string() + &chars.as_str().to_lowercase(),
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

named_enum! {
    /// A boolean extraction feature toggled in the general options file.
    pub enum ExtractOption {
        /// Also extract UTF-16 encoded strings.
        ExtractUtf16 => "EXTRACT_UTF16",
        /// Also extract UTF-8 encoded strings.
        ExtractUtf8 => "EXTRACT_UTF8",
    }
}
