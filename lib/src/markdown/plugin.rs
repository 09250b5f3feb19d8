use std::borrow::Cow;

use crate::error::Result;

/// A stage of the markdown pipeline that rewrites the raw source before it is
/// parsed. Plugins run in the order they were added.
pub trait Plugin: Send + Sync {
    #[inline(always)]
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        Ok(Cow::Borrowed(input))
    }
}

/// Translates `\r\n` and lone `\r` line endings to `\n`.
#[derive(Debug, Default, Copy, Clone)]
pub struct LineEndings;

impl Plugin for LineEndings {
    fn preprocess<'a>(&self, input: &'a str) -> Result<Cow<'a, str>> {
        if memchr::memchr(b'\r', input.as_bytes()).is_none() {
            return Ok(Cow::Borrowed(input));
        }

        Ok(Cow::Owned(input.replace("\r\n", "\n").replace('\r', "\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_endings_are_unix() {
        let out = LineEndings.preprocess("a\r\nb\rc\n").unwrap();
        assert_eq!(out, "a\nb\nc\n");
        assert!(matches!(LineEndings.preprocess("a\nb").unwrap(), Cow::Borrowed(_)));
    }
}
