//! The ordered list of command-line tokens handed to the engine.
use crate::error::OptionError;

/// Where a flag sits in the token list, and where its value sits if it has
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlagSlot {
    at: usize,
    value: Option<usize>,
}

/// Append-only argument list with lookups over the flags already present.
///
/// Only tokens appended in flag position are seen by the lookups; option
/// values (a note reading `--rate`, say) never count as flags. Argument lists
/// stay short, so every lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    tokens: Vec<String>,
    flags: Vec<FlagSlot>,
}

impl Arguments {
    pub const fn new() -> Self {
        Self {
            tokens: Vec::new(),
            flags: Vec::new(),
        }
    }

    fn slots<'a>(&'a self, flag: &'a str) -> impl Iterator<Item = &'a FlagSlot> + 'a {
        self.flags
            .iter()
            .filter(move |slot| self.tokens[slot.at] == flag)
    }

    /// Whether `flag` was appended as a flag.
    pub fn contains(&self, flag: &str) -> bool {
        self.slots(flag).next().is_some()
    }

    /// Fails with [`OptionError::Duplicate`] when `flag` is already present.
    pub fn ensure_absent(&self, flag: &'static str) -> Result<(), OptionError> {
        if self.contains(flag) {
            return Err(OptionError::Duplicate(flag));
        }
        Ok(())
    }

    /// The value of the first occurrence of `flag`.
    ///
    /// Returns `None` when the flag was never added and `Some("")` when it
    /// was added without a value.
    pub fn value_of(&self, flag: &str) -> Option<&str> {
        let slot = self.slots(flag).next()?;
        Some(slot.value.map_or("", |at| self.tokens[at].as_str()))
    }

    pub(crate) fn push_flag(&mut self, flag: &str) {
        self.flags.push(FlagSlot {
            at: self.tokens.len(),
            value: None,
        });
        self.tokens.push(flag.to_owned());
    }

    pub(crate) fn push_pair(&mut self, flag: &str, value: impl Into<String>) {
        let at = self.tokens.len();
        self.flags.push(FlagSlot {
            at,
            value: Some(at + 1),
        });
        self.tokens.push(flag.to_owned());
        self.tokens.push(value.into());
    }

    /// Appends raw tokens. A `--` token is a flag; a following token that is
    /// not itself a `--` token is its value.
    pub(crate) fn extend<I, S>(&mut self, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let start = self.tokens.len();
        self.tokens.extend(values.into_iter().map(Into::into));

        let is_flag = |token: &String| token.starts_with("--");
        let mut at = start;
        while at < self.tokens.len() {
            if is_flag(&self.tokens[at]) {
                let value = self
                    .tokens
                    .get(at + 1)
                    .filter(|next| !is_flag(*next))
                    .map(|_| at + 1);
                self.flags.push(FlagSlot { at, value });
                at = value.map_or(at + 1, |value| value + 1);
            } else {
                at += 1;
            }
        }
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// How many times `flag` was appended as a flag.
    pub fn count(&self, flag: &str) -> usize {
        self.slots(flag).count()
    }
}

impl<'a> IntoIterator for &'a Arguments {
    type Item = &'a String;
    type IntoIter = std::slice::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
