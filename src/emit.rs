//! C asset table generation.
//!
//! [`build_tables`] turns the ordered frame names and the duplicate map into
//! a small intermediate representation ([`CHeader`], [`CSource`]). Rendering
//! to text lives in their `Display` impls so the table logic never deals with
//! layout. The rendered text is consumed by the GBDK toolchain and must stay
//! byte-exact.

use std::collections::HashSet;
use std::fmt;

use crate::dedup::DuplicateMap;

pub const FRAME_TYPE: &str = "frame_desc_t";
pub const FRAME_ARRAY: &str = "frames";
pub const FRAME_COUNT_CONST: &str = "ANIMATION_FRAME_COUNT";

const INDENT: &str = "    ";

/// A `#define NAME value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: String,
}

impl Define {
    pub fn new(name: &str, value: impl ToString) -> Self {
        Self { name: name.to_string(), value: value.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub ty: String,
    pub name: String,
}

/// `typedef struct name { ... } name;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDecl {
    pub name: String,
    pub fields: Vec<Field>,
}

/// `const ty name[len]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDecl {
    pub ty: String,
    pub name: String,
    pub len: String,
}

impl ArrayDecl {
    fn signature(&self) -> String {
        format!("const {} {}[{}]", self.ty, self.name, self.len)
    }
}

/// One slot of the frame table; points at the canonical frame's tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub symbol: String,
}

impl FrameDescriptor {
    pub fn tiles_symbol(&self) -> String {
        format!("{}_tiles", self.symbol)
    }
}

/// Dimensions written into the header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDims {
    pub map_width: u32,
    pub map_height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CHeader {
    pub guard: String,
    pub system_includes: Vec<String>,
    pub defines: Vec<Define>,
    pub record: StructDecl,
    pub extern_array: ArrayDecl,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CSource {
    pub bank: u8,
    pub system_includes: Vec<String>,
    pub own_header: String,
    pub frame_includes: Vec<String>,
    pub array: ArrayDecl,
    pub entries: Vec<FrameDescriptor>,
}

/// Include guard for a header file name, `data.h` -> `__DATA_H_INCLUDE__`
pub fn include_guard(header_file_name: &str) -> String {
    let ident: String = header_file_name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    format!("__{}_INCLUDE__", ident)
}

/// Build the header and source IR.
///
/// Emits one include per canonical frame in first-use order and one
/// descriptor per output position, duplicates included.
pub fn build_tables(names: &[String], map: &DuplicateMap, dims: TableDims, header_file_name: &str, bank: u8) -> (CHeader, CSource) {
    let mut included: HashSet<&str> = HashSet::new();
    let mut frame_includes = Vec::new();
    for name in names {
        let original = map.resolve(name);
        if included.insert(original) {
            frame_includes.push(format!("{}.h", original));
        }
    }

    let entries = names
        .iter()
        .map(|name| FrameDescriptor { symbol: map.resolve(name).to_string() })
        .collect();

    let array = ArrayDecl {
        ty: FRAME_TYPE.to_string(),
        name: FRAME_ARRAY.to_string(),
        len: FRAME_COUNT_CONST.to_string(),
    };

    let header = CHeader {
        guard: include_guard(header_file_name),
        system_includes: vec!["stdint.h".to_string()],
        defines: vec![
            Define::new("MAP_WIDTH", dims.map_width),
            Define::new("MAP_HEIGHT", dims.map_height),
            Define::new(FRAME_COUNT_CONST, names.len()),
        ],
        record: StructDecl {
            name: FRAME_TYPE.to_string(),
            fields: vec![
                Field { ty: "const uint8_t *".to_string(), name: "tiles".to_string() },
                Field { ty: "uint8_t".to_string(), name: "bank".to_string() },
            ],
        },
        extern_array: array.clone(),
    };

    let source = CSource {
        bank,
        system_includes: vec!["gbdk/platform.h".to_string(), "stdint.h".to_string()],
        own_header: header_file_name.to_string(),
        frame_includes,
        array,
        entries,
    };

    (header, source)
}

impl CHeader {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#ifndef {}", self.guard)?;
        writeln!(f, "#define {}", self.guard)?;
        for inc in &self.system_includes {
            writeln!(f, "#include <{}>", inc)?;
        }
        writeln!(f)?;

        for def in &self.defines {
            writeln!(f, "#define {} {}", def.name, def.value)?;
        }
        writeln!(f)?;

        writeln!(f, "typedef struct {} {{", self.record.name)?;
        for field in &self.record.fields {
            writeln!(f, "{}{} {};", INDENT, field.ty, field.name)?;
        }
        writeln!(f, "}} {};", self.record.name)?;
        writeln!(f)?;

        writeln!(f, "extern {};", self.extern_array.signature())?;
        writeln!(f, "#endif")
    }
}

impl CSource {
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#pragma bank {}", self.bank)?;
        for inc in &self.system_includes {
            writeln!(f, "#include <{}>", inc)?;
        }
        writeln!(f)?;

        writeln!(f, "#include \"{}\"", self.own_header)?;
        writeln!(f)?;

        for inc in &self.frame_includes {
            writeln!(f, "#include \"{}\"", inc)?;
        }

        writeln!(f, "\n{} = {{", self.array.signature())?;
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f, ",")?;
            }
            let tiles = entry.tiles_symbol();
            write!(f, "{}{{.tiles = {}, .bank = BANK({})}}", INDENT, tiles, tiles)?;
        }
        write!(f, "\n}};\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(crate::writer::frame_name).collect()
    }

    fn alternating() -> DuplicateMap {
        DuplicateMap::from_digests(vec![
            ("f0001", "black".to_string()),
            ("f0002", "white".to_string()),
            ("f0003", "black".to_string()),
            ("f0004", "white".to_string()),
        ])
    }

    const DIMS: TableDims = TableDims { map_width: 14, map_height: 9 };

    #[test]
    fn guard_from_file_name() {
        assert_eq!(include_guard("data.h"), "__DATA_H_INCLUDE__");
        assert_eq!(include_guard("bad-apple.h"), "__BAD_APPLE_H_INCLUDE__");
    }

    #[test]
    fn one_include_per_canonical_frame() {
        let (_, source) = build_tables(&names(4), &alternating(), DIMS, "data.h", 0);
        assert_eq!(source.frame_includes, vec!["f0001.h", "f0002.h"]);
    }

    #[test]
    fn one_descriptor_per_position() {
        let (_, source) = build_tables(&names(4), &alternating(), DIMS, "data.h", 0);
        let symbols: Vec<&str> = source.entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["f0001", "f0002", "f0001", "f0002"]);
    }

    #[test]
    fn header_renders_exactly() {
        let (header, _) = build_tables(&names(4), &alternating(), DIMS, "data.h", 0);
        let expected = "#ifndef __DATA_H_INCLUDE__\n\
#define __DATA_H_INCLUDE__\n\
#include <stdint.h>\n\
\n\
#define MAP_WIDTH 14\n\
#define MAP_HEIGHT 9\n\
#define ANIMATION_FRAME_COUNT 4\n\
\n\
typedef struct frame_desc_t {\n\
\x20   const uint8_t * tiles;\n\
\x20   uint8_t bank;\n\
} frame_desc_t;\n\
\n\
extern const frame_desc_t frames[ANIMATION_FRAME_COUNT];\n\
#endif\n";
        assert_eq!(header.render(), expected);
    }

    #[test]
    fn source_renders_exactly() {
        let (_, source) = build_tables(&names(4), &alternating(), DIMS, "data.h", 0);
        let expected = "#pragma bank 0\n\
#include <gbdk/platform.h>\n\
#include <stdint.h>\n\
\n\
#include \"data.h\"\n\
\n\
#include \"f0001.h\"\n\
#include \"f0002.h\"\n\
\n\
const frame_desc_t frames[ANIMATION_FRAME_COUNT] = {\n\
\x20   {.tiles = f0001_tiles, .bank = BANK(f0001_tiles)},\n\
\x20   {.tiles = f0002_tiles, .bank = BANK(f0002_tiles)},\n\
\x20   {.tiles = f0001_tiles, .bank = BANK(f0001_tiles)},\n\
\x20   {.tiles = f0002_tiles, .bank = BANK(f0002_tiles)}\n\
};\n";
        assert_eq!(source.render(), expected);
    }

    #[test]
    fn no_dedup_includes_every_frame() {
        let all = names(3);
        let (header, source) = build_tables(&all, &DuplicateMap::identity(&all), DIMS, "data.h", 2);
        assert_eq!(source.frame_includes.len(), 3);
        assert!(source.render().starts_with("#pragma bank 2\n"));
        assert!(header.render().contains("#define ANIMATION_FRAME_COUNT 3\n"));
    }

    #[test]
    fn empty_table_still_renders() {
        let (header, source) = build_tables(&[], &DuplicateMap::default(), DIMS, "data.h", 0);
        assert!(header.render().contains("#define ANIMATION_FRAME_COUNT 0\n"));
        assert!(source
            .render()
            .ends_with("\n\nconst frame_desc_t frames[ANIMATION_FRAME_COUNT] = {\n\n};\n"));
    }
}
