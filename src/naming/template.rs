use serde_json::Value;

use crate::document::{RunStart, StreamDescriptor};
use crate::error::TemplateError;

/// Default file-name prefix: the run uid, which is guaranteed present
/// and unique.
pub const DEFAULT_FILE_PREFIX: &str = "{start[uid]}-";

// =============================================================================
// Template Model
// =============================================================================

/// One parsed segment of a template string.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(Placeholder),
}

/// Recognized placeholder forms.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Placeholder {
    /// `{start[KEY]}`: field of the start document
    Start(String),

    /// `{descriptor[KEY]}`: field of the current descriptor document
    Descriptor(String),

    /// `{event[KEY]}`: field of the current event
    Event(String),

    /// `{stream_name}`: current stream's name
    StreamName,

    /// `{field}`: current field's name
    Field,
}

impl Placeholder {
    fn display(&self) -> String {
        match self {
            Placeholder::Start(key) => format!("{{start[{key}]}}"),
            Placeholder::Descriptor(key) => format!("{{descriptor[{key}]}}"),
            Placeholder::Event(key) => format!("{{event[{key}]}}"),
            Placeholder::StreamName => "{stream_name}".to_string(),
            Placeholder::Field => "{field}".to_string(),
        }
    }
}

/// A parsed file-name prefix template.
///
/// Syntax follows the original exporter's conventions: literal text with
/// `{start[KEY]}`, `{descriptor[KEY]}`, `{event[KEY]}`, `{stream_name}`
/// and `{field}` placeholders; `{{` and `}}` escape literal braces.
///
/// Unknown placeholder names and malformed syntax are rejected at parse
/// time (a configuration error). Missing fields and out-of-scope
/// documents are only detected when the template is resolved, at first
/// artifact open.
#[derive(Debug, Clone)]
pub struct FileNameTemplate {
    raw: String,
    segments: Vec<Segment>,
}

impl FileNameTemplate {
    /// Parse a template string.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices().peekable();

        while let Some((position, ch)) = chars.next() {
            match ch {
                '{' => {
                    if matches!(chars.peek(), Some((_, '{'))) {
                        chars.next();
                        literal.push('{');
                        continue;
                    }

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }

                    let mut body = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        body.push(inner);
                    }
                    if !closed {
                        return Err(TemplateError::Unterminated {
                            template: raw.to_string(),
                            position,
                        });
                    }

                    segments.push(Segment::Placeholder(parse_placeholder(raw, &body)?));
                }
                '}' => {
                    if matches!(chars.peek(), Some((_, '}'))) {
                        chars.next();
                        literal.push('}');
                    } else {
                        return Err(TemplateError::InvalidSyntax {
                            template: raw.to_string(),
                            text: "}".to_string(),
                        });
                    }
                }
                other => literal.push(other),
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The template string as given.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Whether the template needs a per-event context to resolve.
    pub fn references_event_scope(&self) -> bool {
        self.segments.iter().any(|segment| {
            matches!(
                segment,
                Segment::Placeholder(
                    Placeholder::Descriptor(_)
                        | Placeholder::Event(_)
                        | Placeholder::StreamName
                        | Placeholder::Field
                )
            )
        })
    }

    /// Resolve the template against the given context.
    ///
    /// # Errors
    ///
    /// Fails when a placeholder's document is not in scope or the
    /// referenced field is absent.
    pub fn resolve(&self, cx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(placeholder) => {
                    out.push_str(&resolve_placeholder(placeholder, cx)?)
                }
            }
        }
        Ok(out)
    }
}

fn parse_placeholder(template: &str, body: &str) -> Result<Placeholder, TemplateError> {
    let invalid = || TemplateError::InvalidSyntax {
        template: template.to_string(),
        text: format!("{{{body}}}"),
    };

    match body {
        "stream_name" => return Ok(Placeholder::StreamName),
        "field" => return Ok(Placeholder::Field),
        _ => {}
    }

    let Some((name, rest)) = body.split_once('[') else {
        // Bare name: either a document placeholder missing its key, or
        // something unrecognized altogether.
        return match body {
            "start" | "descriptor" | "event" => Err(invalid()),
            other => Err(TemplateError::UnknownPlaceholder {
                template: template.to_string(),
                name: other.to_string(),
            }),
        };
    };

    let key = rest.strip_suffix(']').ok_or_else(invalid)?;
    if key.is_empty() || key.contains('[') {
        return Err(invalid());
    }

    match name {
        "start" => Ok(Placeholder::Start(key.to_string())),
        "descriptor" => Ok(Placeholder::Descriptor(key.to_string())),
        "event" => Ok(Placeholder::Event(key.to_string())),
        other => Err(TemplateError::UnknownPlaceholder {
            template: template.to_string(),
            name: other.to_string(),
        }),
    }
}

// =============================================================================
// Resolution Context
// =============================================================================

/// Per-event fields available to `{event[...]}` placeholders.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EventScope<'a> {
    pub uid: &'a str,
    pub seq_num: u64,
    pub time: f64,
}

/// The documents in scope when a template is resolved.
///
/// The start document is always present (no artifact exists before it);
/// descriptor, event, stream and field are only in scope while routing
/// image frames.
#[derive(Debug, Clone)]
pub struct TemplateContext<'a> {
    start: &'a RunStart,
    descriptor: Option<&'a StreamDescriptor>,
    event: Option<EventScope<'a>>,
    stream_name: Option<&'a str>,
    field: Option<&'a str>,
}

impl<'a> TemplateContext<'a> {
    /// Context with only the start document in scope (run-wide names,
    /// e.g. the metadata sidecar).
    pub fn run_scope(start: &'a RunStart) -> Self {
        Self {
            start,
            descriptor: None,
            event: None,
            stream_name: None,
            field: None,
        }
    }

    /// Bring a descriptor and its stream/field names into scope.
    pub fn with_stream(mut self, descriptor: &'a StreamDescriptor, field: &'a str) -> Self {
        self.descriptor = Some(descriptor);
        self.stream_name = Some(&descriptor.name);
        self.field = Some(field);
        self
    }

    /// Bring one event's identity fields into scope.
    pub fn with_event(mut self, uid: &'a str, seq_num: u64, time: f64) -> Self {
        self.event = Some(EventScope { uid, seq_num, time });
        self
    }
}

fn resolve_placeholder(
    placeholder: &Placeholder,
    cx: &TemplateContext<'_>,
) -> Result<String, TemplateError> {
    let out_of_scope = || TemplateError::OutOfScope {
        placeholder: placeholder.display(),
    };
    let missing = |key: &str| TemplateError::MissingField {
        placeholder: placeholder.display(),
        key: key.to_string(),
    };

    match placeholder {
        Placeholder::Start(key) => cx
            .start
            .field(key)
            .map(|value| render(&value))
            .ok_or_else(|| missing(key)),
        Placeholder::Descriptor(key) => {
            let descriptor = cx.descriptor.ok_or_else(out_of_scope)?;
            descriptor
                .field(key)
                .map(|value| render(&value))
                .ok_or_else(|| missing(key))
        }
        Placeholder::Event(key) => {
            let event = cx.event.ok_or_else(out_of_scope)?;
            match key.as_str() {
                "uid" => Ok(event.uid.to_string()),
                "seq_num" => Ok(event.seq_num.to_string()),
                "time" => Ok(format_f64(event.time)),
                other => Err(missing(other)),
            }
        }
        Placeholder::StreamName => cx
            .stream_name
            .map(str::to_string)
            .ok_or_else(out_of_scope),
        Placeholder::Field => cx.field.map(str::to_string).ok_or_else(out_of_scope),
    }
}

/// Render a metadata value as a file-name fragment: strings bare,
/// everything else as compact JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn format_f64(value: f64) -> String {
    if value.fract() == 0.0 && value.is_finite() {
        format!("{value:.1}")
    } else {
        value.to_string()
    }
}

// =============================================================================
// Tests
// =============================================================================
