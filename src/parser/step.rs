use std::collections::BTreeMap;
use std::fmt::{self, Write as _};

use crate::error::ParseError;

const DEFAULT_SCHEMA: &str = "IFC4";

#[derive(Debug, Clone, PartialEq)]
pub enum StepValue {
    String(String),
    Real(f64),
    Integer(i64),
    Boolean(bool),
    Enum(String),
    Reference(u64),
    List(Vec<StepValue>),
    /// Typed value such as `IFCREAL(1.5)` or `IFCLABEL('Volume')`.
    Typed(String, Box<StepValue>),
    Null,
    Derived,
}

impl StepValue {
    /// String content, looking through typed wrappers.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            StepValue::String(s) => Some(s),
            StepValue::Typed(_, inner) => inner.as_str(),
            _ => None,
        }
    }

    /// Numeric content, accepting integers and typed measures.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            StepValue::Real(f) => Some(*f),
            StepValue::Integer(i) => Some(*i as f64),
            StepValue::Typed(_, inner) => inner.as_f64(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_reference(&self) -> Option<u64> {
        match self {
            StepValue::Reference(id) => Some(*id),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StepValue::Boolean(b) => Some(*b),
            StepValue::Typed(_, inner) => inner.as_bool(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[StepValue]> {
        match self {
            StepValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// All entity references in a list value, in order.
    #[must_use]
    pub fn references(&self) -> Vec<u64> {
        self.as_list()
            .map(|items| items.iter().filter_map(StepValue::as_reference).collect())
            .unwrap_or_default()
    }
}

impl fmt::Display for StepValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepValue::String(s) => write!(f, "'{}'", encode_step_string(s)),
            StepValue::Real(r) => f.write_str(&format_real(*r)),
            StepValue::Integer(i) => write!(f, "{i}"),
            StepValue::Boolean(true) => f.write_str(".T."),
            StepValue::Boolean(false) => f.write_str(".F."),
            StepValue::Enum(e) => write!(f, ".{e}."),
            StepValue::Reference(id) => write!(f, "#{id}"),
            StepValue::List(items) => {
                f.write_str("(")?;
                write_values(f, items)?;
                f.write_str(")")
            }
            StepValue::Typed(name, inner) => write!(f, "{name}({inner})"),
            StepValue::Null => f.write_str("$"),
            StepValue::Derived => f.write_str("*"),
        }
    }
}

fn write_values(f: &mut fmt::Formatter<'_>, values: &[StepValue]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{value}")?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct StepEntity {
    pub id: u64,
    pub entity_type: String,
    pub values: Vec<StepValue>,
    /// Argument text as read from the file; cleared once the entity changes.
    pub source: Option<String>,
}

impl StepEntity {
    #[must_use]
    pub fn new(id: u64, entity_type: impl Into<String>, values: Vec<StepValue>) -> Self {
        Self {
            id,
            entity_type: entity_type.into(),
            values,
            source: None,
        }
    }

    #[must_use]
    pub fn value(&self, index: usize) -> Option<&StepValue> {
        self.values.get(index)
    }

    #[must_use]
    pub fn str_at(&self, index: usize) -> Option<&str> {
        self.value(index).and_then(StepValue::as_str)
    }

    #[must_use]
    pub fn f64_at(&self, index: usize) -> Option<f64> {
        self.value(index).and_then(StepValue::as_f64)
    }

    #[must_use]
    pub fn reference_at(&self, index: usize) -> Option<u64> {
        self.value(index).and_then(StepValue::as_reference)
    }

    #[must_use]
    pub fn references_at(&self, index: usize) -> Vec<u64> {
        self.value(index).map(StepValue::references).unwrap_or_default()
    }

    /// Drops the original argument text so the writer re-encodes `values`.
    pub fn mark_modified(&mut self) {
        self.source = None;
    }

    /// The entity as a DATA section statement: `#12=IFCWALL(...);`
    #[must_use]
    pub fn to_step_line(&self) -> String {
        let mut line = format!("#{}={}(", self.id, self.entity_type);
        match &self.source {
            Some(args) => line.push_str(args),
            None => {
                let joined: Vec<String> = self.values.iter().map(ToString::to_string).collect();
                line.push_str(&joined.join(","));
            }
        }
        line.push_str(");");
        line
    }
}

#[derive(Debug, Default, Clone)]
pub struct StepFile {
    pub entities: BTreeMap<u64, StepEntity>,
    pub schema: String,
    /// Header statements without their terminating `;`.
    pub header: Vec<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Header,
    Data,
}

impl StepFile {
    pub fn parse(content: &str) -> Result<Self, ParseError> {
        let mut file = StepFile::default();
        let mut section = Section::None;

        for statement in split_statements(content)? {
            let upper = statement.to_ascii_uppercase();

            if upper == "ISO-10303-21" || upper == "END-ISO-10303-21" {
                continue;
            }
            if upper == "HEADER" {
                section = Section::Header;
                continue;
            }
            if upper == "ENDSEC" {
                section = Section::None;
                continue;
            }
            // Edition 3 files may carry parameters after DATA
            if upper == "DATA" || upper.starts_with("DATA(") {
                section = Section::Data;
                continue;
            }

            if statement.starts_with('#') {
                match Self::parse_entity(&statement) {
                    Some(entity) => {
                        file.entities.insert(entity.id, entity);
                    }
                    None => tracing::debug!(%statement, "skipping unreadable entity"),
                }
                continue;
            }

            if section == Section::Header {
                if upper.starts_with("FILE_SCHEMA") {
                    if let Some(schema) = parse_schema(&statement) {
                        file.schema = schema;
                    }
                }
                file.header.push(statement);
            } else if section == Section::Data {
                tracing::debug!(%statement, "ignoring non-entity statement in DATA");
            }
        }

        Ok(file)
    }

    /// Parses raw file bytes. STEP files are 7-bit text, so anything that is
    /// not UTF-8 is rejected.
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, ParseError> {
        let content = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidStep {
            message: format!("content is not valid text: {e}"),
        })?;
        Self::parse(content)
    }

    fn parse_entity(statement: &str) -> Option<StepEntity> {
        // Format: #123= IFCWALL('guid',#ref,'name',...)
        let eq_pos = statement.find('=')?;
        let id: u64 = statement[1..eq_pos].trim().parse().ok()?;

        let rest = statement[eq_pos + 1..].trim();
        let open = rest.find('(')?;
        let close = rest.rfind(')')?;
        if close < open {
            return None;
        }

        let entity_type = rest[..open].trim().to_ascii_uppercase();
        if entity_type.is_empty() {
            return None;
        }
        let args = &rest[open + 1..close];

        Some(StepEntity {
            id,
            entity_type,
            values: parse_values(args),
            source: Some(args.to_string()),
        })
    }

    #[must_use]
    pub fn get_entity(&self, id: u64) -> Option<&StepEntity> {
        self.entities.get(&id)
    }

    pub fn get_entity_mut(&mut self, id: u64) -> Option<&mut StepEntity> {
        self.entities.get_mut(&id)
    }

    /// Entities of one type in id order.
    #[must_use]
    pub fn get_entities_by_type(&self, entity_type: &str) -> Vec<&StepEntity> {
        self.entities
            .values()
            .filter(|e| e.entity_type == entity_type)
            .collect()
    }

    pub fn insert(&mut self, entity: StepEntity) {
        self.entities.insert(entity.id, entity);
    }

    #[must_use]
    pub fn max_id(&self) -> u64 {
        self.entities.keys().next_back().copied().unwrap_or(0)
    }

    #[must_use]
    pub fn schema_or_default(&self) -> &str {
        if self.schema.is_empty() {
            DEFAULT_SCHEMA
        } else {
            &self.schema
        }
    }

    /// Writes a complete ISO-10303-21 exchange file.
    #[must_use]
    pub fn to_step_string(&self) -> String {
        let mut out = String::from("ISO-10303-21;\nHEADER;\n");

        if self.header.is_empty() {
            out.push_str("FILE_DESCRIPTION(('ViewDefinition [CoordinationView]'),'2;1');\n");
            out.push_str("FILE_NAME('','',(''),(''),'ifc-quantities','ifc-quantities','');\n");
            let _ = writeln!(out, "FILE_SCHEMA(('{}'));", self.schema_or_default());
        } else {
            for statement in &self.header {
                let _ = writeln!(out, "{statement};");
            }
        }

        out.push_str("ENDSEC;\nDATA;\n");
        for entity in self.entities.values() {
            out.push_str(&entity.to_step_line());
            out.push('\n');
        }
        out.push_str("ENDSEC;\nEND-ISO-10303-21;\n");
        out
    }
}

/// Splits content into `;`-terminated statements, honouring string literals
/// and dropping `/* */` comments.
fn split_statements(content: &str) -> Result<Vec<String>, ParseError> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut chars = content.chars().peekable();

    while let Some(ch) = chars.next() {
        if in_string {
            current.push(ch);
            if ch == '\'' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '\'' => {
                in_string = true;
                current.push(ch);
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                let mut closed = false;
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        closed = true;
                        break;
                    }
                    prev = c;
                }
                if !closed {
                    return Err(ParseError::InvalidStep {
                        message: "unterminated comment".to_string(),
                    });
                }
            }
            ';' => {
                let statement = current.trim();
                if !statement.is_empty() {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if in_string {
        return Err(ParseError::InvalidStep {
            message: "unterminated string literal".to_string(),
        });
    }

    Ok(statements)
}

fn parse_schema(statement: &str) -> Option<String> {
    let start = statement.find("('")?;
    let end = statement[start + 2..].find('\'')?;
    Some(statement[start + 2..start + 2 + end].to_string())
}

fn parse_values(s: &str) -> Vec<StepValue> {
    let mut values = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    let mut paren_depth = 0i32;

    for ch in s.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            '(' if !in_string => {
                paren_depth += 1;
                current.push(ch);
            }
            ')' if !in_string => {
                paren_depth -= 1;
                current.push(ch);
            }
            ',' if !in_string && paren_depth == 0 => {
                values.push(parse_single_value(current.trim()));
                current.clear();
            }
            _ => current.push(ch),
        }
    }

    if !current.trim().is_empty() {
        values.push(parse_single_value(current.trim()));
    }

    values
}

fn parse_single_value(s: &str) -> StepValue {
    let s = s.trim();

    if s == "$" {
        return StepValue::Null;
    }
    if s == "*" {
        return StepValue::Derived;
    }
    if let Some(stripped) = s.strip_prefix('#') {
        if let Ok(id) = stripped.parse::<u64>() {
            return StepValue::Reference(id);
        }
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return StepValue::String(decode_step_string(&s[1..s.len() - 1]));
    }
    if s.len() >= 2 && s.starts_with('.') && s.ends_with('.') {
        return match &s[1..s.len() - 1] {
            "T" => StepValue::Boolean(true),
            "F" => StepValue::Boolean(false),
            inner => StepValue::Enum(inner.to_string()),
        };
    }
    if s.starts_with('(') && s.ends_with(')') {
        return StepValue::List(parse_values(&s[1..s.len() - 1]));
    }
    if let Ok(i) = s.parse::<i64>() {
        return StepValue::Integer(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        return StepValue::Real(f);
    }
    if let Some(paren_pos) = s.find('(') {
        let name = s[..paren_pos].trim();
        if s.ends_with(')')
            && !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            let inner = &s[paren_pos + 1..s.len() - 1];
            return StepValue::Typed(
                name.to_ascii_uppercase(),
                Box::new(parse_single_value(inner)),
            );
        }
    }

    StepValue::String(s.to_string())
}

/// Writes reals so they always carry a decimal point (`3.`, `0.25`).
fn format_real(value: f64) -> String {
    let mut s = value.to_string();
    if value.is_finite() && !s.contains('.') {
        s.push('.');
    }
    s
}

/// Encodes a string body for a STEP literal. Non-ASCII text uses `\X2\`.
fn encode_step_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut wide: Vec<u16> = Vec::new();

    let flush = |out: &mut String, wide: &mut Vec<u16>| {
        if !wide.is_empty() {
            out.push_str("\\X2\\");
            for unit in wide.drain(..) {
                let _ = write!(out, "{unit:04X}");
            }
            out.push_str("\\X0\\");
        }
    };

    for ch in s.chars() {
        if ch.is_ascii() && !ch.is_ascii_control() {
            flush(&mut out, &mut wide);
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                c => out.push(c),
            }
        } else {
            let mut buf = [0u16; 2];
            wide.extend_from_slice(ch.encode_utf16(&mut buf));
        }
    }
    flush(&mut out, &mut wide);

    out
}

/// Decode STEP/IFC encoded strings with Unicode escape sequences.
/// Supports:
/// - `\X2\XXXX\X0\` - UTF-16 code units, can have multiple 4-char hex codes
/// - `\X\XX` - 1-byte ISO 8859-1
/// - `\S\c` - single char shift (ISO 8859-1 high half)
/// - `\\` - escaped backslash
/// - `''` - escaped apostrophe
fn decode_step_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.peek() {
                Some('X') => {
                    chars.next();
                    match chars.peek() {
                        Some('2') => {
                            chars.next(); // '2'
                            chars.next(); // '\'

                            let mut hex = String::new();
                            while let Some(&c) = chars.peek() {
                                if c == '\\' {
                                    break;
                                }
                                hex.push(c);
                                chars.next();
                            }
                            // Skip \X0\
                            if chars.peek() == Some(&'\\') {
                                for _ in 0..4 {
                                    chars.next();
                                }
                            }
                            let units: Vec<u16> = hex
                                .as_bytes()
                                .chunks(4)
                                .filter_map(|chunk| std::str::from_utf8(chunk).ok())
                                .filter_map(|h| u16::from_str_radix(h, 16).ok())
                                .collect();
                            result.extend(
                                char::decode_utf16(units)
                                    .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER)),
                            );
                        }
                        Some('\\') => {
                            chars.next();
                            let hex: String = chars.by_ref().take(2).collect();
                            if let Ok(code) = u8::from_str_radix(&hex, 16) {
                                result.push(char::from(code));
                            }
                        }
                        _ => result.push_str("\\X"),
                    }
                }
                Some('\\') => {
                    chars.next();
                    result.push('\\');
                }
                Some('S') => {
                    chars.next(); // 'S'
                    chars.next(); // '\'
                    if let Some(c) = chars.next() {
                        if let Some(shifted) = char::from_u32(u32::from(c) + 128) {
                            result.push(shifted);
                        }
                    }
                }
                _ => result.push('\\'),
            }
        } else if ch == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
            }
            result.push('\'');
        } else {
            result.push(ch);
        }
    }

    result
}
