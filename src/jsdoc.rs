//! A small JSDoc parser.
//!
//! Understands just enough structure for the scanners: a leading description
//! followed by block tags, where a tag is `@title`, an optional
//! brace-balanced `{type}`, an optional name, and a trailing description
//! that may continue over following lines.

use once_cell::sync::Lazy;
use regex::Regex;

static TAG_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^@([A-Za-z][A-Za-z0-9_-]*)\s*").unwrap());

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Annotation {
    pub description: String,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tag {
    pub title: String,
    pub type_: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

impl Annotation {
    /// Parses the raw text of a `/** ... */` comment.
    pub fn parse(comment: &str) -> Annotation {
        let interior = comment
            .trim()
            .trim_start_matches("/**")
            .trim_end_matches("*/");

        let mut description_lines: Vec<&str> = Vec::new();
        let mut tags: Vec<Tag> = Vec::new();
        let mut current: Option<Tag> = None;

        for raw_line in interior.lines() {
            let line = strip_leading_star(raw_line);
            if let Some(captures) = TAG_LINE.captures(line) {
                if let Some(tag) = current.take() {
                    tags.push(tag);
                }
                let title = captures[1].to_string();
                let rest = &line[captures.get(0).unwrap().end()..];
                current = Some(parse_tag_body(title, rest));
            } else if let Some(tag) = current.as_mut() {
                // Continuation line of the previous tag's description.
                let trimmed = line.trim();
                if !trimmed.is_empty() {
                    let description = tag.description.get_or_insert_with(String::new);
                    if !description.is_empty() {
                        description.push(' ');
                    }
                    description.push_str(trimmed);
                }
            } else {
                description_lines.push(line.trim_end());
            }
        }
        if let Some(tag) = current.take() {
            tags.push(tag);
        }

        Annotation {
            description: description_lines.join("\n").trim().to_string(),
            tags,
        }
    }

    pub fn tag(&self, title: &str) -> Option<&Tag> {
        self.tags.iter().find(|tag| tag.title == title)
    }

    pub fn has_tag(&self, title: &str) -> bool {
        self.tag(title).is_some()
    }

    pub fn tags_named<'a>(&'a self, title: &str) -> impl Iterator<Item = &'a Tag> + 'a {
        let title = title.to_string();
        self.tags.iter().filter(move |tag| tag.title == title)
    }

    /// The value of a single-argument tag, e.g. `@memberof Polymer`.
    pub fn tag_value(&self, title: &str) -> Option<&str> {
        self.tag(title).and_then(|tag| tag.name.as_deref())
    }
}

fn strip_leading_star(line: &str) -> &str {
    let trimmed = line.trim_start();
    let stripped = trimmed.strip_prefix('*').unwrap_or(trimmed);
    stripped.strip_prefix(' ').unwrap_or(stripped)
}

fn parse_tag_body(title: String, rest: &str) -> Tag {
    let mut rest = rest.trim_start();
    let mut type_ = None;

    if rest.starts_with('{') {
        let mut depth = 0usize;
        let mut end = None;
        for (index, ch) in rest.char_indices() {
            match ch {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = Some(index);
                        break;
                    }
                }
                _ => {}
            }
        }
        if let Some(end) = end {
            type_ = Some(rest[1..end].trim().to_string());
            rest = rest[end + 1..].trim_start();
        }
    }

    let wants_name = matches!(
        title.as_str(),
        "param"
            | "arg"
            | "argument"
            | "property"
            | "prop"
            | "attribute"
            | "event"
            | "fires"
            | "customElement"
            | "memberof"
            | "namespace"
            | "polymerBehavior"
            | "mixes"
            | "appliesMixin"
            | "extends"
            | "demo"
            | "alias"
            | "name"
    );

    let (name, description) = if wants_name && !rest.is_empty() {
        match rest.split_once(char::is_whitespace) {
            Some((name, tail)) => (Some(name.to_string()), tail.trim()),
            None => (Some(rest.to_string()), ""),
        }
    } else {
        (None, rest.trim())
    };

    Tag {
        title,
        type_,
        name,
        description: if description.is_empty() {
            None
        } else {
            Some(description.to_string())
        },
    }
}

#[cfg(test)]
mod tests {
    use super::Annotation;

    #[test]
    fn parses_description_and_tags() {
        let annotation = Annotation::parse(
            "/**\n * A fancy element.\n * Second line.\n *\n * @customElement\n * @memberof Polymer\n */",
        );
        assert_eq!(annotation.description, "A fancy element.\nSecond line.");
        assert!(annotation.has_tag("customElement"));
        assert_eq!(annotation.tag_value("memberof"), Some("Polymer"));
    }

    #[test]
    fn parses_param_with_type_name_and_description() {
        let annotation =
            Annotation::parse("/** @param {function(new:HTMLElement)} base the base class */");
        let tag = annotation.tag("param").unwrap();
        assert_eq!(tag.type_.as_deref(), Some("function(new:HTMLElement)"));
        assert_eq!(tag.name.as_deref(), Some("base"));
        assert_eq!(tag.description.as_deref(), Some("the base class"));
    }

    #[test]
    fn returns_tag_keeps_description_without_name() {
        let annotation = Annotation::parse("/** @returns {boolean} whether it worked */");
        let tag = annotation.tag("returns").unwrap();
        assert_eq!(tag.type_.as_deref(), Some("boolean"));
        assert_eq!(tag.name, None);
        assert_eq!(tag.description.as_deref(), Some("whether it worked"));
    }

    #[test]
    fn tag_descriptions_continue_across_lines() {
        let annotation = Annotation::parse(
            "/**\n * @event config-changed fired when the\n *   configuration changes\n */",
        );
        let tag = annotation.tag("event").unwrap();
        assert_eq!(tag.name.as_deref(), Some("config-changed"));
        assert_eq!(
            tag.description.as_deref(),
            Some("fired when the configuration changes")
        );
    }

    #[test]
    fn polymer_behavior_tag_may_name_the_behavior() {
        let annotation = Annotation::parse("/** @polymerBehavior My.Behavior */");
        assert_eq!(annotation.tag_value("polymerBehavior"), Some("My.Behavior"));
        let bare = Annotation::parse("/** @polymerBehavior */");
        assert!(bare.has_tag("polymerBehavior"));
        assert_eq!(bare.tag_value("polymerBehavior"), None);
    }
}
