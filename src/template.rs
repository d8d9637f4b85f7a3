//! Line templates for listing messages.
//!
//! A template is plain text with `{field}` placeholders; `{{` and `}}` stand
//! for literal braces. Known fields are `id`, `date` (RFC 3339), `size`,
//! `subject` and `from`.

use std::str::FromStr;

use mailparse::{MailHeader, MailHeaderMap};
use thiserror::Error;

use crate::file::Message;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown field {0:?}")]
    UnknownField(String),
    #[error("unclosed '{{' at offset {0}")]
    UnclosedBrace(usize),
    #[error("unmatched '}}' at offset {0}")]
    UnmatchedBrace(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Id,
    Date,
    Size,
    Subject,
    From,
}

impl FromStr for Field {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Field, TemplateError> {
        match s {
            "id" => Ok(Field::Id),
            "date" => Ok(Field::Date),
            "size" => Ok(Field::Size),
            "subject" => Ok(Field::Subject),
            "from" => Ok(Field::From),
            _ => Err(TemplateError::UnknownField(s.to_owned())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(s: &str) -> Result<Template, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = s.char_indices().peekable();

        while let Some((offset, c)) = chars.next() {
            match c {
                '{' if chars.peek().map(|&(_, c)| c) == Some('{') => {
                    chars.next();
                    literal.push('{');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some((_, '}')) => break,
                            Some((_, c)) => name.push(c),
                            None => return Err(TemplateError::UnclosedBrace(offset)),
                        }
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name.trim().parse()?));
                }
                '}' if chars.peek().map(|&(_, c)| c) == Some('}') => {
                    chars.next();
                    literal.push('}');
                }
                '}' => return Err(TemplateError::UnmatchedBrace(offset)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Template { segments })
    }

    /// Renders one line for `msg`. Missing headers render as empty strings.
    pub fn render(&self, msg: &Message, headers: &[MailHeader]) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Field(Field::Id) => out.push_str(msg.id()),
                Segment::Field(Field::Date) => out.push_str(&msg.date().to_rfc3339()),
                Segment::Field(Field::Size) => out.push_str(&msg.len().to_string()),
                Segment::Field(Field::Subject) => {
                    out.push_str(&headers.get_first_value("Subject").unwrap_or_default())
                }
                Segment::Field(Field::From) => {
                    out.push_str(&headers.get_first_value("From").unwrap_or_default())
                }
            }
        }
        out
    }
}

/// `{id} {date} {subject}`
impl Default for Template {
    fn default() -> Template {
        Template {
            segments: vec![
                Segment::Field(Field::Id),
                Segment::Literal(" ".to_owned()),
                Segment::Field(Field::Date),
                Segment::Literal(" ".to_owned()),
                Segment::Field(Field::Subject),
            ],
        }
    }
}

impl FromStr for Template {
    type Err = TemplateError;

    fn from_str(s: &str) -> Result<Template, TemplateError> {
        Template::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn message() -> Message {
        let date = DateTime::parse_from_rfc3339("2006-01-02T15:04:05-07:00").unwrap();
        let data = b"From: Alice <alice@example.com>\r\nSubject: Hello\r\n\r\nbody\r\n";
        Message::new("abc".to_owned(), date, data.to_vec())
    }

    fn render(template: &str) -> String {
        let msg = message();
        let (headers, _) = mailparse::parse_headers(msg.data()).unwrap();
        Template::parse(template).unwrap().render(&msg, &headers)
    }

    #[test]
    fn default_template() {
        let msg = message();
        let (headers, _) = mailparse::parse_headers(msg.data()).unwrap();
        assert_eq!(
            Template::parse("{id} {date} {subject}").unwrap(),
            Template::default()
        );
        assert_eq!(
            Template::default().render(&msg, &headers),
            "abc 2006-01-02T15:04:05-07:00 Hello"
        );
    }

    #[test]
    fn all_fields() {
        assert_eq!(
            render("[{size}] {from}: { subject }"),
            "[57] Alice <alice@example.com>: Hello"
        );
    }

    #[test]
    fn escaped_braces() {
        assert_eq!(render("{{{id}}}"), "{abc}");
        assert_eq!(render("no fields"), "no fields");
    }

    #[test]
    fn missing_header_is_empty() {
        let msg = message();
        let template = Template::parse("<{subject}>").unwrap();
        assert_eq!(template.render(&msg, &[]), "<>");
    }

    #[test]
    fn invalid_templates() {
        assert_eq!(
            Template::parse("{nope}"),
            Err(TemplateError::UnknownField("nope".to_owned()))
        );
        assert_eq!(
            Template::parse("ab {id"),
            Err(TemplateError::UnclosedBrace(3))
        );
        assert_eq!(
            Template::parse("id}"),
            Err(TemplateError::UnmatchedBrace(2))
        );
    }
}
