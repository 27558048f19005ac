/*
 * tag.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Field annotation parsing for struct conversion.
//!
//! ## Tag Syntax
//!
//! Annotations use a comma-separated syntax: `name[,option]*`, where the
//! first component renames the field (empty keeps the declared name) and the
//! remaining components are options:
//!
//! - `omitempty` - skip the field when it holds the empty value of its kind
//! - `flatten` - store the field's leaves under dotted keys at this level
//! - `inline` - merge the field's map entries into this level
//!
//! The literal tag `-` excludes the field entirely.

use std::fmt;

/// Parsed form of a field annotation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldTag {
    /// Replacement name; empty means "use the declared field name".
    pub name: String,

    /// The field is excluded from conversion. Takes precedence over
    /// everything else.
    pub omit: bool,

    /// Skip the field when its value is empty.
    pub omit_empty: bool,

    /// Store the field's leaves under `name.key` / `name[i]` keys.
    pub flatten: bool,

    /// Merge the field's entries into the enclosing level.
    pub inline: bool,

    /// Every option component in the order written, including ones this
    /// parser does not recognize.
    pub raw_options: Vec<String>,
}

impl FieldTag {
    /// True if `option` appears among the tag's options.
    pub fn has_option(&self, option: &str) -> bool {
        self.raw_options.iter().any(|o| o == option)
    }

    /// The name to store the field under: the tag's name if set, otherwise
    /// `declared`.
    pub fn effective_name<'a>(&'a self, declared: &'a str) -> &'a str {
        if self.name.is_empty() { declared } else { &self.name }
    }
}

/// Parse a field annotation.
///
/// # Examples
///
/// - `"-"` → omitted field
/// - `"title"` → renamed to `title`
/// - `",omitempty"` → declared name, omitted when empty
/// - `"user,flatten,omitempty"` → renamed, flattened, omitted when empty
///
/// Unknown options are kept in [`FieldTag::raw_options`] and otherwise
/// ignored. Repeating an option has no further effect.
pub fn parse_tag(raw: &str) -> FieldTag {
    if raw == "-" {
        return FieldTag {
            omit: true,
            ..FieldTag::default()
        };
    }

    let mut components = raw.split(',');
    let mut tag = FieldTag {
        name: components.next().unwrap_or_default().trim().to_string(),
        ..FieldTag::default()
    };

    for option in components.map(str::trim).filter(|o| !o.is_empty()) {
        match option {
            "omitempty" => tag.omit_empty = true,
            "flatten" => tag.flatten = true,
            "inline" => tag.inline = true,
            unknown => {
                tracing::trace!(option = unknown, tag = raw, "ignoring unknown field tag option");
            }
        }
        tag.raw_options.push(option.to_string());
    }

    tag
}

impl fmt::Display for FieldTag {
    /// Renders the tag back to annotation syntax; parsing the output yields
    /// an equivalent tag.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.omit {
            return f.write_str("-");
        }
        f.write_str(&self.name)?;

        let mut options: Vec<&str> = self.raw_options.iter().map(String::as_str).collect();
        for (set, option) in [
            (self.omit_empty, "omitempty"),
            (self.flatten, "flatten"),
            (self.inline, "inline"),
        ] {
            if set && !options.contains(&option) {
                options.push(option);
            }
        }

        if self.name == "-" && options.is_empty() {
            // A bare "-" would read back as an omitted field.
            return f.write_str(",");
        }
        for option in options {
            write!(f, ",{}", option)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_omit() {
        let tag = parse_tag("-");
        assert!(tag.omit);
        assert_eq!(tag.name, "");
        assert!(!tag.omit_empty);
    }

    #[test]
    fn test_parse_name_only() {
        let tag = parse_tag("title");
        assert_eq!(tag.name, "title");
        assert!(!tag.omit && !tag.omit_empty && !tag.flatten && !tag.inline);
        assert!(tag.raw_options.is_empty());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(parse_tag(""), FieldTag::default());
    }

    #[test]
    fn test_parse_options_without_name() {
        let tag = parse_tag(",omitempty");
        assert_eq!(tag.name, "");
        assert!(tag.omit_empty);
        assert_eq!(tag.effective_name("Declared"), "Declared");
    }

    #[test]
    fn test_parse_all_options() {
        let tag = parse_tag("user,flatten,inline,omitempty");
        assert_eq!(tag.name, "user");
        assert!(tag.flatten);
        assert!(tag.inline);
        assert!(tag.omit_empty);
        assert_eq!(tag.raw_options, vec!["flatten", "inline", "omitempty"]);
        assert_eq!(tag.effective_name("Declared"), "user");
    }

    #[test]
    fn test_unknown_options_are_preserved() {
        let tag = parse_tag("name,string,omitempty");
        assert!(tag.omit_empty);
        assert!(tag.has_option("string"));
        assert!(!tag.flatten);
    }

    #[test]
    fn test_repeated_option_is_idempotent() {
        let once = parse_tag("a,omitempty");
        let twice = parse_tag("a,omitempty,omitempty");
        assert_eq!(once.omit_empty, twice.omit_empty);
        assert_eq!(once.name, twice.name);
    }

    #[test]
    fn test_dash_with_comma_is_a_name() {
        let tag = parse_tag("-,");
        assert!(!tag.omit);
        assert_eq!(tag.name, "-");
        assert_eq!(parse_tag(&tag.to_string()), tag);
    }

    #[test]
    fn test_display_round_trip() {
        for raw in ["-", "", "a", ",omitempty", "a,flatten,x", "b,inline,omitempty"] {
            let tag = parse_tag(raw);
            assert_eq!(parse_tag(&tag.to_string()), tag, "round trip of {:?}", raw);
        }
    }

    #[test]
    fn test_display_includes_flags_set_directly() {
        let tag = FieldTag {
            name: "x".to_string(),
            flatten: true,
            ..FieldTag::default()
        };
        assert_eq!(tag.to_string(), "x,flatten");
    }
}
