//! Species assignment from feature identifiers.
//!
//! Multi-species benchmark samples (e.g. human/yeast/E. coli mixes) encode
//! the organism in the protein identifier, such as `P12345_YEAST`. Each
//! feature must match exactly one species pattern to be benchmarked.

use crate::error::{DiaError, Result};
use regex::Regex;

/// Outcome of matching one identifier against the species patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeciesAssignment {
    /// Exactly one pattern matched.
    Tagged(String),
    /// Zero or several patterns matched.
    Ambiguous,
}

impl SpeciesAssignment {
    /// The species tag, if unambiguous.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tagged(tag) => Some(tag),
            Self::Ambiguous => None,
        }
    }
}

/// Ordered set of (species tag, pattern) pairs.
#[derive(Debug, Clone)]
pub struct SpeciesMatcher {
    patterns: Vec<(String, Regex)>,
}

impl SpeciesMatcher {
    /// Match each tag as a literal, case-sensitive substring of the identifier.
    pub fn from_tags<I, S>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns = tags
            .into_iter()
            .map(|tag| {
                let tag = tag.as_ref();
                Ok((tag.to_string(), Regex::new(&regex::escape(tag))?))
            })
            .collect::<Result<Vec<_>>>()?;
        Self::checked(patterns)
    }

    /// Use explicit regular expressions per tag.
    pub fn with_patterns<I, S, P>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, P)>,
        S: AsRef<str>,
        P: AsRef<str>,
    {
        let patterns = patterns
            .into_iter()
            .map(|(tag, pattern)| Ok((tag.as_ref().to_string(), Regex::new(pattern.as_ref())?)))
            .collect::<Result<Vec<_>>>()?;
        Self::checked(patterns)
    }

    fn checked(patterns: Vec<(String, Regex)>) -> Result<Self> {
        if patterns.is_empty() {
            return Err(DiaError::Config(
                "Species matcher needs at least one pattern".to_string(),
            ));
        }
        Ok(Self { patterns })
    }

    /// Species tags in order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(tag, _)| tag.as_str())
    }

    /// Assign a species to one identifier.
    pub fn assign(&self, identifier: &str) -> SpeciesAssignment {
        let mut matched = self
            .patterns
            .iter()
            .filter(|(_, re)| re.is_match(identifier))
            .map(|(tag, _)| tag);
        match (matched.next(), matched.next()) {
            (Some(tag), None) => SpeciesAssignment::Tagged(tag.clone()),
            _ => SpeciesAssignment::Ambiguous,
        }
    }
}

/// Assign species to every identifier, in order.
pub fn assign_species(identifiers: &[String], matcher: &SpeciesMatcher) -> Vec<SpeciesAssignment> {
    identifiers.iter().map(|id| matcher.assign(id)).collect()
}
