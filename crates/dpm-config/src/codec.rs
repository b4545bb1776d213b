//! Sectioned backup files.
//!
//! ```text
//! [PAR1]
//! #memory
//! init_mem = 4096
//! max_mem = 8192
//! #partition
//! par_desc = web tier
//! ```
//!
//! Writing is deterministic: sections sorted by name, keys sorted bytewise,
//! a category comment whenever the category changes, flattened per-item
//! maps, `None` values skipped and a blank line after every section.
//! Reading keeps the raw text of every value, whitespace included, so text
//! written out reads back unchanged; coercion is the schema's job.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::schema::{FieldKind, Schema};
use crate::value::ConfigValue;

/// Attribute map of one entity, keyed by config key.
pub type EntityConfig = BTreeMap<String, ConfigValue>;

/// One line inside a section.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    /// Comment text without its leading `#` or `;`
    Comment(String),
    /// `key = value`, or a bare key with no value
    Entry { key: String, value: Option<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub name: String,
    pub lines: Vec<Line>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Section {
            name: name.into(),
            lines: Vec::new(),
        }
    }

    pub fn push_comment(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Comment(text.into()));
    }

    pub fn push_entry(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.lines.push(Line::Entry {
            key: key.into(),
            value: Some(value.into()),
        });
    }

    /// Raw key/value pairs. Comments and valueless keys are dropped; a key
    /// repeated in the section keeps its last value.
    pub fn flat(&self) -> BTreeMap<String, String> {
        self.lines
            .iter()
            .filter_map(|line| match line {
                Line::Entry {
                    key,
                    value: Some(value),
                } => Some((key.clone(), value.clone())),
                _ => None,
            })
            .collect()
    }

    /// Value of `key`, compared without regard to ASCII case.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.lines.iter().rev().find_map(|line| match line {
            Line::Entry {
                key: k,
                value: Some(value),
            } if k.eq_ignore_ascii_case(key) => Some(value.as_str()),
            _ => None,
        })
    }

    pub fn comments(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().filter_map(|line| match line {
            Line::Comment(text) => Some(text.as_str()),
            _ => None,
        })
    }
}

/// Ordered sequence of uniquely named sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    pub sections: Vec<Section>,
}

impl ConfigDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lay out `entities` the way backup files are written.
    pub fn from_entities(entities: &BTreeMap<String, EntityConfig>, schema: &Schema) -> Self {
        let sections = entities
            .iter()
            .map(|(name, attributes)| entity_section(name, attributes, schema))
            .collect();
        ConfigDocument { sections }
    }

    /// Add a section; names must be unique.
    pub fn push(&mut self, section: Section) -> Result<()> {
        if self.section(&section.name).is_some() {
            return Err(ConfigError::DuplicateSection {
                name: section.name,
                line: 0,
            });
        }
        self.sections.push(section);
        Ok(())
    }

    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Read a sectioned document.
    pub fn parse(text: &str) -> Result<Self> {
        let mut document = ConfigDocument::new();
        let mut current: Option<Section> = None;
        // Index of the entry a continuation line extends.
        let mut open_entry: Option<usize> = None;
        // Blank lines seen since the open entry's last line.
        let mut pending_blanks = 0usize;

        for (index, raw) in text.lines().enumerate() {
            let line_no = index + 1;
            let continues = raw.starts_with('\t') && open_entry.is_some();

            if raw.trim().is_empty() && !continues {
                pending_blanks += 1;
                continue;
            }

            if raw.starts_with(char::is_whitespace) {
                let (Some(section), Some(entry)) = (current.as_mut(), open_entry) else {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: "continuation line without a preceding key".to_string(),
                    });
                };
                if let Some(Line::Entry {
                    value: Some(value), ..
                }) = section.lines.get_mut(entry)
                {
                    for _ in 0..pending_blanks {
                        value.push('\n');
                    }
                    value.push('\n');
                    value.push_str(continuation_text(raw));
                }
                pending_blanks = 0;
                continue;
            }
            pending_blanks = 0;

            if let Some(comment) = raw.strip_prefix('#').or_else(|| raw.strip_prefix(';')) {
                if let Some(section) = current.as_mut() {
                    section.push_comment(comment.trim_end());
                }
                open_entry = None;
                continue;
            }

            if raw.starts_with('[') {
                let Some(end) = raw.find(']') else {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: format!("unterminated section header '{raw}'"),
                    });
                };
                let name = &raw[1..end];
                if name.is_empty() {
                    return Err(ConfigError::Syntax {
                        line: line_no,
                        message: "empty section name".to_string(),
                    });
                }
                if let Some(done) = current.take() {
                    document.sections.push(done);
                }
                if document.section(name).is_some() {
                    return Err(ConfigError::DuplicateSection {
                        name: name.to_string(),
                        line: line_no,
                    });
                }
                current = Some(Section::new(name));
                open_entry = None;
                continue;
            }

            let Some(section) = current.as_mut() else {
                return Err(ConfigError::Syntax {
                    line: line_no,
                    message: format!("entry before any section header: '{raw}'"),
                });
            };
            let entry = parse_entry(raw);
            open_entry = match &entry {
                Line::Entry { value: Some(_), .. } => Some(section.lines.len()),
                _ => None,
            };
            section.lines.push(entry);
        }

        if let Some(done) = current.take() {
            document.sections.push(done);
        }
        debug!(sections = document.sections.len(), "parsed config document");
        Ok(document)
    }

    pub fn read_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    /// Write the document, creating parent directories as needed.
    pub fn write_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for ConfigDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for section in &self.sections {
            writeln!(f, "[{}]", section.name)?;
            for line in &section.lines {
                match line {
                    Line::Comment(text) => writeln!(f, "#{text}")?,
                    Line::Entry { key, value: None } => writeln!(f, "{key}")?,
                    Line::Entry {
                        key,
                        value: Some(value),
                    } => writeln!(f, "{key} = {}", value.replace('\n', "\n\t"))?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Serialize `entities` into backup file text.
pub fn serialize(entities: &BTreeMap<String, EntityConfig>, schema: &Schema) -> String {
    ConfigDocument::from_entities(entities, schema).to_string()
}

/// Text of a continuation line. The writer indents with one tab, which is
/// the only indentation removed; other indentation is hand-written.
fn continuation_text(raw: &str) -> &str {
    match raw.strip_prefix('\t') {
        Some(rest) => rest,
        None => raw.trim_start(),
    }
}

fn parse_entry(raw: &str) -> Line {
    let separator = raw.find(['=', ':']);
    match separator {
        Some(at) => {
            // `key = value` puts one space after the separator; the rest is
            // the value as written.
            let rest = &raw[at + 1..];
            let value = rest.strip_prefix(' ').unwrap_or(rest);
            Line::Entry {
                key: raw[..at].trim().to_string(),
                value: Some(value.to_string()),
            }
        }
        None => Line::Entry {
            key: raw.trim().to_string(),
            value: None,
        },
    }
}

fn entity_section(name: &str, attributes: &EntityConfig, schema: &Schema) -> Section {
    let mut section = Section::new(name);
    let mut last_label: Option<&'static str> = None;

    for (key, value) in attributes {
        if value.is_none() {
            continue;
        }
        let label = schema.category_of(key).map(|c| c.label());
        if label.is_some() && label != last_label {
            if let Some(label) = label {
                section.push_comment(label);
            }
            last_label = label;
        }

        let flatten = matches!(schema.field(key).map(|f| f.kind), Some(FieldKind::Flatten(_)));
        match (flatten, value) {
            (true, ConfigValue::Map(items)) => {
                for (item, fields) in items {
                    match fields {
                        ConfigValue::Map(fields) => {
                            for (field, v) in fields {
                                if !v.is_none() {
                                    section.push_entry(format!("{item}_{field}"), v.render());
                                }
                            }
                        }
                        other => section.push_entry(item.clone(), other.render()),
                    }
                }
            }
            _ => section.push_entry(key.clone(), value.render()),
        }
    }
    section
}
