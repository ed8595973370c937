//! Sample/show/movie classification from path heuristics
//!
//! Classification is a pure function of the full path string (directory
//! components included) and the pattern set compiled from
//! [`ClassificationConfig`]:
//! - a path is a **sample** when a sample token appears with no ASCII letter
//!   immediately before or after it (adjacent digits are allowed)
//! - a path is a **show** when a show pattern appears with no ASCII letter or
//!   digit immediately before or after it
//! - everything else is a **movie**

use crate::config::ClassificationConfig;
use crate::error::{Error, Result};
use crate::types::Classification;
use regex::{Regex, RegexBuilder};
use std::path::Path;

/// Compiled classification heuristics
#[derive(Debug)]
pub struct Classifier {
    sample: Regex,
    show: Regex,
    /// Lowercased suffixes including the leading dot (".mkv")
    video_suffixes: Vec<String>,
    /// Lowercased suffixes including the leading dot (".tar.gz")
    archive_suffixes: Vec<String>,
}

impl Classifier {
    /// Compile the configured patterns
    ///
    /// # Errors
    /// Returns `Error::Config` if a pattern list is empty or does not compile.
    pub fn new(config: &ClassificationConfig) -> Result<Self> {
        Ok(Self {
            sample: build_pattern(&config.sample_tokens, "sample_tokens")?,
            show: build_pattern(&config.show_patterns, "show_patterns")?,
            video_suffixes: suffixes(&config.video_extensions),
            archive_suffixes: suffixes(&config.archive_extensions),
        })
    }

    /// Whether the path names a sample or reference clip
    #[must_use]
    pub fn is_sample(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        matches_bounded(&self.sample, &text, |c| c.is_ascii_alphabetic())
    }

    /// Whether the path names show content ("season", "S01E02", ...)
    #[must_use]
    pub fn is_show(&self, path: &Path) -> bool {
        let text = path.to_string_lossy();
        matches_bounded(&self.show, &text, |c| c.is_ascii_alphanumeric())
    }

    /// Classify a path; `forced_show` comes from an enclosing archive that was
    /// itself classified as a show and overrides the show/movie decision.
    /// Sample detection still applies to forced content.
    #[must_use]
    pub fn classify(&self, path: &Path, forced_show: bool) -> Classification {
        if self.is_sample(path) {
            Classification::Sample
        } else if forced_show || self.is_show(path) {
            Classification::Show
        } else {
            Classification::Movie
        }
    }

    /// Whether the file has a recognized video extension
    #[must_use]
    pub fn is_video(&self, path: &Path) -> bool {
        has_suffix(path, &self.video_suffixes)
    }

    /// Whether the file has a recognized archive extension
    #[must_use]
    pub fn is_archive(&self, path: &Path) -> bool {
        has_suffix(path, &self.archive_suffixes)
    }
}

fn build_pattern(alternatives: &[String], key: &str) -> Result<Regex> {
    if alternatives.is_empty() {
        return Err(Error::Config {
            message: format!("{} must contain at least one pattern", key),
            key: Some(key.to_string()),
        });
    }

    RegexBuilder::new(&format!("(?:{})", alternatives.join("|")))
        .case_insensitive(true)
        .build()
        .map_err(|e| Error::Config {
            message: format!("invalid {} pattern: {}", key, e),
            key: Some(key.to_string()),
        })
}

/// Search for a match of `re` whose neighbouring characters are not word
/// characters as defined by `is_word_char`.
///
/// Every candidate start position is tried, so a rejected match never hides
/// an acceptable one that begins inside it.
fn matches_bounded(re: &Regex, text: &str, is_word_char: impl Fn(char) -> bool) -> bool {
    let mut start = 0;

    while let Some(m) = re.find_at(text, start) {
        let before = text[..m.start()].chars().next_back();
        let after = text[m.end()..].chars().next();

        if !before.is_some_and(&is_word_char) && !after.is_some_and(&is_word_char) {
            return true;
        }

        start = m.start()
            + text[m.start()..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
        if start > text.len() {
            break;
        }
    }

    false
}

fn suffixes(extensions: &[String]) -> Vec<String> {
    extensions
        .iter()
        .map(|ext| format!(".{}", ext.trim_start_matches('.').to_lowercase()))
        .collect()
}

fn has_suffix(path: &Path, suffixes: &[String]) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let name = name.to_lowercase();

    suffixes.iter().any(|suffix| {
        name.strip_suffix(suffix.as_str())
            .is_some_and(|stem| !stem.is_empty())
    })
}
