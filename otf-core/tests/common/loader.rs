//! Fixture loading from YAML files
//!
//! A fixture holds the schema tokens, an optional header schema, the buffer
//! as hex, and the expected event log.

use serde::Deserialize;

use std::path::Path;

use otf_core::{ByteOrder, Ir, PrimitiveType, Signal, Token, INVALID_ID};

/// One token in fixture form. Omitted fields take the container defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenDef {
    pub signal: String,
    pub name: String,
    #[serde(default = "default_id")]
    pub id: u16,
    #[serde(default, rename = "type")]
    pub primitive_type: Option<String>,
    #[serde(default)]
    pub offset: u32,
    #[serde(default)]
    pub size: u32,
    #[serde(default)]
    pub order: Option<String>,
}

fn default_id() -> u16 {
    INVALID_ID
}

impl TokenDef {
    pub fn to_token(&self) -> Token {
        let signal = Signal::from_name(&self.signal)
            .unwrap_or_else(|| panic!("unknown signal {:?} in fixture", self.signal));
        let primitive_type = match &self.primitive_type {
            Some(name) => name.parse().unwrap_or_else(|e| panic!("{}", e)),
            None => PrimitiveType::None,
        };
        let order = match &self.order {
            Some(name) => name.parse().unwrap_or_else(|e| panic!("{}", e)),
            None => ByteOrder::LittleEndian,
        };
        Token::new(self.offset, self.size, signal, order, primitive_type, self.id, self.name.as_str())
    }
}

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    /// Header schema; when present the case dispatches by header.
    #[serde(default)]
    pub header: Vec<TokenDef>,
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Template id for direct dispatch.
    #[serde(default)]
    pub template: Option<u16>,
    pub tokens: Vec<TokenDef>,
    /// Space separated hex bytes.
    pub buffer: String,
    /// Declared buffer length, if shorter than the buffer.
    #[serde(default)]
    pub length: Option<usize>,
    pub events: Vec<String>,
}

impl TestCase {
    pub fn ir(&self) -> Ir {
        self.tokens.iter().map(TokenDef::to_token).collect()
    }

    pub fn header_ir(&self) -> Ir {
        self.header.iter().map(TokenDef::to_token).collect()
    }

    pub fn bytes(&self) -> Vec<u8> {
        parse_hex(&self.buffer)
    }

    pub fn expects_completion(&self) -> bool {
        self.events.last().map(String::as_str) == Some("Completed")
    }
}

/// Parse `"01 ff 0a"` into bytes.
pub fn parse_hex(hex: &str) -> Vec<u8> {
    hex.split_whitespace()
        .map(|b| u8::from_str_radix(b, 16).unwrap_or_else(|e| panic!("bad hex byte {:?}: {}", b, e)))
        .collect()
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}
