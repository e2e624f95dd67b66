//! Output naming for unpacked files.
//!
//! A pattern carries exactly one printf-style integer placeholder that is
//! replaced by the file's index: `%d`, `%4d`, `%-4d`, `%03d` and `%003d`
//! (repeated zero flags collapse into one) are all accepted.  `%%` is a
//! literal percent sign.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Widest accepted placeholder; one path component rarely exceeds this.
pub const MAX_WIDTH: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatternError {
    #[error("Pattern '{0}' has no %d placeholder")]
    MissingPlaceholder(String),
    #[error("Pattern '{0}' has more than one placeholder")]
    MultiplePlaceholders(String),
    #[error("Unsupported conversion '%{verb}' in pattern '{pattern}'")]
    UnsupportedVerb { pattern: String, verb: char },
    #[error("Pattern '{0}' ends inside a placeholder")]
    Dangling(String),
    #[error("Placeholder width {width} in pattern '{pattern}' exceeds {max}", max = MAX_WIDTH)]
    WidthTooLarge { pattern: String, width: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pad {
    Spaces,
    Zeros,
    Left,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPattern {
    prefix: String,
    suffix: String,
    width:  usize,
    pad:    Pad,
}

impl OutputPattern {
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let mut prefix = String::new();
        let mut suffix = String::new();
        let mut spec: Option<(usize, Pad)> = None;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            let out = if spec.is_some() { &mut suffix } else { &mut prefix };
            if c != '%' {
                out.push(c);
                continue;
            }
            if chars.peek() == Some(&'%') {
                chars.next();
                out.push('%');
                continue;
            }
            if spec.is_some() {
                return Err(PatternError::MultiplePlaceholders(pattern.to_owned()));
            }

            let (mut zero, mut left) = (false, false);
            while let Some(&flag) = chars.peek() {
                match flag {
                    '0' => zero = true,
                    '-' => left = true,
                    _   => break,
                }
                chars.next();
            }
            let mut width = 0usize;
            while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
                width = width.saturating_mul(10).saturating_add(d as usize);
                chars.next();
            }
            if width > MAX_WIDTH {
                return Err(PatternError::WidthTooLarge { pattern: pattern.to_owned(), width });
            }
            match chars.next() {
                Some('d') => {}
                Some(verb) => {
                    return Err(PatternError::UnsupportedVerb { pattern: pattern.to_owned(), verb })
                }
                None => return Err(PatternError::Dangling(pattern.to_owned())),
            }
            // '-' wins over '0', as in C printf.
            let pad = if left { Pad::Left } else if zero { Pad::Zeros } else { Pad::Spaces };
            spec = Some((width, pad));
        }

        let (width, pad) = spec.ok_or_else(|| PatternError::MissingPlaceholder(pattern.to_owned()))?;
        Ok(Self { prefix, suffix, width, pad })
    }

    pub fn render(&self, index: usize) -> String {
        let w = self.width;
        let number = match self.pad {
            Pad::Spaces => format!("{index:>w$}"),
            Pad::Zeros  => format!("{index:0w$}"),
            Pad::Left   => format!("{index:<w$}"),
        };
        format!("{}{}{}", self.prefix, number, self.suffix)
    }
}

impl Default for OutputPattern {
    /// `%03d`
    fn default() -> Self {
        Self { prefix: String::new(), suffix: String::new(), width: 3, pad: Pad::Zeros }
    }
}

impl FromStr for OutputPattern {
    type Err = PatternError;
    fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl fmt::Display for OutputPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = match self.pad {
            Pad::Spaces => "",
            Pad::Zeros  => "0",
            Pad::Left   => "-",
        };
        let width = if self.width > 0 { self.width.to_string() } else { String::new() };
        write!(f, "{}%{flag}{width}d{}",
            self.prefix.replace('%', "%%"), self.suffix.replace('%', "%%"))
    }
}
