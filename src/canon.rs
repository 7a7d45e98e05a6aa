//! The symbol canon: a fixed bijection between named narrative symbols and
//! byte codes.
//!
//! Every glyph may appear in four rotations. A glyph at index `g` with
//! rotation `r` quarter turns is encoded as `g * 4 + r`. The standard canon
//! registers 32 glyphs, so codes `0..=127` are valid and `128..=255` are
//! unused; unused codes are rejected, never wrapped.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fmt;

/// Rotations a glyph can be placed in
pub const CODES_PER_GLYPH: usize = 4;

/// (name, gloss) for every glyph in the standard canon, in code order
const STANDARD_GLYPHS: [(&str, &str); 32] = [
    ("glyph_marrow", "what endures beneath the surface"),
    ("glyph_ember", "a warmth that outlives its fire"),
    ("glyph_tide", "the return of what was carried away"),
    ("glyph_lantern", "guidance offered without demand"),
    ("glyph_thorn", "a boundary that protects by wounding"),
    ("glyph_hollow", "space made ready to be filled"),
    ("glyph_root", "an origin holding fast"),
    ("glyph_veil", "truth kept at a distance"),
    ("glyph_key", "permission to pass"),
    ("glyph_mirror", "the self seen from outside"),
    ("glyph_spiral", "growth through repetition"),
    ("glyph_crown", "authority granted by others"),
    ("glyph_seed", "potential not yet spent"),
    ("glyph_ash", "what remains after change"),
    ("glyph_bridge", "a crossing between two states"),
    ("glyph_well", "depth that answers when asked"),
    ("VALIDATE", "confirm that the story holds"),
    ("INVERT", "turn a meaning against itself"),
    ("ANCHOR", "fix a moment in place"),
    ("RELEASE", "let a thread go"),
    ("BIND", "join two threads into one"),
    ("SEVER", "cut a thread cleanly"),
    ("ECHO", "repeat what came before"),
    ("SILENCE", "withhold the next word"),
    ("WITNESS", "observe without acting"),
    ("KINDLE", "begin something that spreads"),
    ("MEND", "repair what was broken"),
    ("FORGET", "remove from the telling"),
    ("SEEK", "move toward the unknown"),
    ("GUARD", "hold a threshold"),
    ("YIELD", "give way to another"),
    ("RETURN", "come back changed"),
];

/// Orientation of a placed glyph
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    /// Only exact multiples of 90 below 360 are rotations
    pub fn from_degrees(degrees: u16) -> Option<Self> {
        match degrees {
            0 => Some(Rotation::Deg0),
            90 => Some(Rotation::Deg90),
            180 => Some(Rotation::Deg180),
            270 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }

    pub fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    fn from_quarter_turns(turns: u8) -> Self {
        Rotation::ALL[(turns % 4) as usize]
    }

    /// How the rotation colours a glyph's gloss
    pub fn aspect(self) -> &'static str {
        match self {
            Rotation::Deg0 => "upright",
            Rotation::Deg90 => "turning",
            Rotation::Deg180 => "inverted",
            Rotation::Deg270 => "returning",
        }
    }
}

impl fmt::Display for Rotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// A named symbol in a given rotation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SymbolEntry {
    pub name: String,
    pub rotation: Rotation,
}

impl SymbolEntry {
    pub fn new(name: impl Into<String>, rotation: Rotation) -> Self {
        Self {
            name: name.into(),
            rotation,
        }
    }

    /// Build an entry from a raw degree value as it arrives from callers
    ///
    /// # Errors
    /// `UnknownSymbol` if `degrees` is not 0, 90, 180 or 270
    pub fn from_degrees(name: impl Into<String>, degrees: u16) -> Result<Self> {
        let name = name.into();
        match Rotation::from_degrees(degrees) {
            Some(rotation) => Ok(Self { name, rotation }),
            None => Err(Error::UnknownSymbol {
                name,
                rotation: degrees,
            }),
        }
    }
}

impl fmt::Display for SymbolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.rotation)
    }
}

/// A canon entry together with its code and gloss
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSymbol {
    pub entry: SymbolEntry,
    pub code: u8,
    pub meaning: String,
}

/// Read-only bijection between [`SymbolEntry`] and byte codes
#[derive(Debug, Clone)]
pub struct CanonRegistry {
    glyphs: Vec<(&'static str, &'static str)>,
    index: HashMap<&'static str, u8>,
}

impl CanonRegistry {
    /// The standard 32-glyph canon
    pub fn standard() -> Self {
        let glyphs = STANDARD_GLYPHS.to_vec();
        let index = glyphs
            .iter()
            .enumerate()
            .map(|(i, &(name, _))| (name, i as u8))
            .collect();
        Self { glyphs, index }
    }

    /// Number of valid codes
    pub fn len(&self) -> usize {
        self.glyphs.len() * CODES_PER_GLYPH
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Whether `code` maps to a registered entry
    pub fn is_valid_code(&self, code: u8) -> bool {
        (code as usize) < self.len()
    }

    /// Code for a (name, rotation-in-degrees) pair
    pub fn encode_entry(&self, name: &str, degrees: u16) -> Result<u8> {
        let unknown = || Error::UnknownSymbol {
            name: name.to_string(),
            rotation: degrees,
        };
        let rotation = Rotation::from_degrees(degrees).ok_or_else(unknown)?;
        let glyph = *self.index.get(name).ok_or_else(unknown)?;
        Ok(glyph * CODES_PER_GLYPH as u8 + rotation.quarter_turns())
    }

    pub fn encode_symbol(&self, entry: &SymbolEntry) -> Result<u8> {
        self.encode_entry(&entry.name, entry.rotation.degrees())
    }

    /// Entry for a code
    ///
    /// # Errors
    /// `UnknownCode` for codes outside the registered range
    pub fn decode_entry(&self, code: u8) -> Result<SymbolEntry> {
        let (name, _) = self
            .glyphs
            .get(code as usize / CODES_PER_GLYPH)
            .ok_or(Error::UnknownCode(code))?;
        Ok(SymbolEntry::new(
            *name,
            Rotation::from_quarter_turns(code % CODES_PER_GLYPH as u8),
        ))
    }

    /// Human-readable gloss; display only
    pub fn meaning(&self, name: &str, degrees: u16) -> Result<String> {
        let code = self.encode_entry(name, degrees)?;
        let (_, gloss) = self.glyphs[code as usize / CODES_PER_GLYPH];
        let aspect = Rotation::from_quarter_turns(code % CODES_PER_GLYPH as u8).aspect();
        Ok(format!("{} ({})", gloss, aspect))
    }

    /// Resolve an entry to its code and gloss in one lookup
    pub fn resolve(&self, entry: &SymbolEntry) -> Result<ResolvedSymbol> {
        let code = self.encode_symbol(entry)?;
        let meaning = self.meaning(&entry.name, entry.rotation.degrees())?;
        Ok(ResolvedSymbol {
            entry: entry.clone(),
            code,
            meaning,
        })
    }

    /// Every registered entry in code order
    pub fn iter(&self) -> impl Iterator<Item = SymbolEntry> + Clone + '_ {
        self.glyphs.iter().flat_map(|&(name, _)| {
            Rotation::ALL
                .into_iter()
                .map(move |rotation| SymbolEntry::new(name, rotation))
        })
    }
}

impl Default for CanonRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
