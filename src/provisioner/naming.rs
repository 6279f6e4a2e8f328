//! Bucket Name Templates
//!
//! Renders the external bucket name for a claim from a configurable template.
//! Templates are a closed substitution over [`TemplateField`]: they are parsed
//! once at startup so syntax errors surface before any claim is handled.
//!
//! Two placeholder spellings are accepted:
//!
//! ```text
//! {namespace}-{volumeName}                                  short form
//! {{ .PVC.ObjectMeta.Namespace }}-{{ .PVName }}             legacy form
//! ```

use crate::domain::ports::ProvisionRequest;
use crate::error::{Error, Result};
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Template used when none is configured
pub const DEFAULT_NAME_TEMPLATE: &str = "{namespace}-{volumeName}";

// =============================================================================
// Template Fields
// =============================================================================

/// Request field a placeholder can reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateField {
    /// Namespace of the claim
    Namespace,
    /// Name of the claim
    ClaimName,
    /// Volume name proposed by the controller
    VolumeName,
}

impl TemplateField {
    /// Short-form placeholder name
    pub fn placeholder(&self) -> &'static str {
        match self {
            TemplateField::Namespace => "namespace",
            TemplateField::ClaimName => "claimName",
            TemplateField::VolumeName => "volumeName",
        }
    }

    fn from_placeholder(name: &str) -> Option<Self> {
        match name {
            "namespace" => Some(TemplateField::Namespace),
            "claimName" => Some(TemplateField::ClaimName),
            "volumeName" => Some(TemplateField::VolumeName),
            _ => None,
        }
    }

    fn from_legacy_path(path: &str) -> Option<Self> {
        match path {
            ".PVC.ObjectMeta.Namespace" => Some(TemplateField::Namespace),
            ".PVC.ObjectMeta.Name" => Some(TemplateField::ClaimName),
            ".PVName" => Some(TemplateField::VolumeName),
            _ => None,
        }
    }

    fn value<'a>(&self, request: &'a ProvisionRequest) -> &'a str {
        match self {
            TemplateField::Namespace => &request.namespace,
            TemplateField::ClaimName => &request.claim_name,
            TemplateField::VolumeName => &request.volume_name,
        }
    }
}

impl std::fmt::Display for TemplateField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.placeholder())
    }
}

// =============================================================================
// Name Template
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(TemplateField),
}

/// A parsed bucket name template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NameTemplate {
    /// Parse a template, rejecting malformed syntax and unknown fields
    pub fn parse(source: &str) -> Result<Self> {
        let syntax = |position: usize, reason: String| Error::TemplateSyntax {
            template: source.to_string(),
            position,
            reason,
        };

        if source.is_empty() {
            return Err(syntax(0, "template is empty".into()));
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut pos = 0;

        while pos < source.len() {
            let rest = &source[pos..];

            let (field, consumed) = if let Some(after) = rest.strip_prefix("{{") {
                let close = after
                    .find("}}")
                    .ok_or_else(|| syntax(pos, "unterminated expression, expected '}}'".into()))?;
                let path = after[..close].trim();
                let field = TemplateField::from_legacy_path(path)
                    .ok_or_else(|| syntax(pos, format!("unknown field {:?}", path)))?;
                (field, close + 4)
            } else if let Some(after) = rest.strip_prefix('{') {
                let close = after
                    .find('}')
                    .ok_or_else(|| syntax(pos, "unterminated placeholder, expected '}'".into()))?;
                let raw = &after[..close];
                if raw.contains('{') {
                    return Err(syntax(pos, "nested '{' in placeholder".into()));
                }
                let name = raw.trim();
                if name.is_empty() {
                    return Err(syntax(pos, "empty placeholder".into()));
                }
                let field = TemplateField::from_placeholder(name)
                    .ok_or_else(|| syntax(pos, format!("unknown field {:?}", name)))?;
                (field, close + 2)
            } else if rest.starts_with('}') {
                return Err(syntax(pos, "unmatched '}'".into()));
            } else {
                match rest.chars().next() {
                    Some(ch) => {
                        literal.push(ch);
                        pos += ch.len_utf8();
                        continue;
                    }
                    None => break,
                }
            };

            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Field(field));
            pos += consumed;
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The template as configured
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Fields referenced by the template, in order of appearance
    pub fn fields(&self) -> impl Iterator<Item = TemplateField> + '_ {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(f) => Some(*f),
            Segment::Literal(_) => None,
        })
    }

    /// Render the bucket name for a request
    ///
    /// A referenced field with an empty value is an error rather than being
    /// rendered as an empty string.
    pub fn render(&self, request: &ProvisionRequest) -> Result<String> {
        let mut name = String::with_capacity(self.source.len() + 32);

        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => name.push_str(text),
                Segment::Field(field) => {
                    let value = field.value(request);
                    if value.is_empty() {
                        return Err(Error::TemplateExecution {
                            field: field.placeholder().to_string(),
                            reason: "request has no value for this field".into(),
                        });
                    }
                    name.push_str(value);
                }
            }
        }

        Ok(name)
    }
}

impl Default for NameTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_NAME_TEMPLATE.to_string(),
            segments: vec![
                Segment::Field(TemplateField::Namespace),
                Segment::Literal("-".to_string()),
                Segment::Field(TemplateField::VolumeName),
            ],
        }
    }
}

impl FromStr for NameTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl std::fmt::Display for NameTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

// =============================================================================
// Bucket Name Rules
// =============================================================================

/// Validate a rendered name against S3 bucket naming rules
pub fn validate_bucket_name(name: &str) -> Result<()> {
    let invalid = |reason: String| {
        Err(Error::InvalidBucketName {
            name: name.to_string(),
            reason,
        })
    };

    if name.len() < 3 || name.len() > 63 {
        return invalid("must be between 3 and 63 characters long".into());
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '.'))
    {
        return invalid(format!("character {:?} is not allowed", c));
    }

    // Only ASCII remains past this point
    let bytes = name.as_bytes();
    let alnum = |b: u8| b.is_ascii_lowercase() || b.is_ascii_digit();
    if !alnum(bytes[0]) || !alnum(bytes[bytes.len() - 1]) {
        return invalid("must begin and end with a letter or digit".into());
    }

    if name.contains("..") {
        return invalid("must not contain consecutive periods".into());
    }

    if name.parse::<Ipv4Addr>().is_ok() {
        return invalid("must not be formatted as an IP address".into());
    }

    if name.starts_with("xn--") {
        return invalid("must not start with the reserved prefix xn--".into());
    }

    if name.ends_with("-s3alias") {
        return invalid("must not end with the reserved suffix -s3alias".into());
    }

    Ok(())
}
