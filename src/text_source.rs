use crate::session::Mode;
use include_dir::{include_dir, Dir};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::from_str;
use std::error::Error;

static TEXT_DIR: Dir = include_dir!("src/text");

/// A target passage handed to a new session. The text is matched
/// character for character, whitespace and newlines included.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Passage {
    pub text: String,
    pub title: Option<String>,
}

impl Passage {
    pub fn plain(text: String) -> Self {
        Self { text, title: None }
    }

    pub fn titled(text: String, title: String) -> Self {
        Self {
            text,
            title: Some(title),
        }
    }
}

/// Supplies the target passage for a session reset.
pub trait TextSource {
    fn passage(&self, mode: Mode) -> Passage;
}

#[allow(dead_code)]
#[derive(Deserialize, Clone, Debug)]
struct WordBank {
    name: String,
    size: u32,
    words: Vec<String>,
}

#[derive(Deserialize, Clone, Debug)]
struct Snippet {
    title: String,
    language: String,
    code: String,
}

/// Text source backed by the embedded word bank and snippet catalog.
pub struct Catalog {
    word_bank: WordBank,
    snippets: Vec<Snippet>,
    number_of_words: usize,
}

impl Catalog {
    pub fn new(number_of_words: usize) -> Self {
        let word_bank = read_embedded("words.json").expect("word bank should deserialize");
        let snippets = read_embedded("snippets.json").expect("snippet catalog should deserialize");
        Self {
            word_bank,
            snippets,
            number_of_words,
        }
    }

    fn random_words(&self) -> Passage {
        let mut rng = rand::thread_rng();
        let words: Vec<String> = self
            .word_bank
            .words
            .choose_multiple(&mut rng, self.number_of_words)
            .cloned()
            .collect();
        Passage::plain(words.join(" "))
    }

    fn random_snippet(&self) -> Passage {
        let mut rng = rand::thread_rng();
        let snippet = &self.snippets[rng.gen_range(0..self.snippets.len())];
        Passage::titled(snippet.code.clone(), snippet.title.clone())
    }
}

impl TextSource for Catalog {
    fn passage(&self, mode: Mode) -> Passage {
        match mode {
            Mode::Plain => self.random_words(),
            Mode::Code => self.random_snippet(),
        }
    }
}

/// Fixed passage, used for the `-p` flag and in tests.
pub struct FixedSource {
    passage: Passage,
}

impl FixedSource {
    pub fn new(text: String) -> Self {
        Self {
            passage: Passage::plain(text),
        }
    }
}

impl TextSource for FixedSource {
    fn passage(&self, _mode: Mode) -> Passage {
        self.passage.clone()
    }
}

fn read_embedded<T: for<'de> Deserialize<'de>>(file_name: &str) -> Result<T, Box<dyn Error>> {
    let file = TEXT_DIR
        .get_file(file_name)
        .ok_or_else(|| format!("embedded text file not found: {}", file_name))?;
    let contents = file
        .contents_utf8()
        .ok_or_else(|| format!("embedded text file not utf-8: {}", file_name))?;
    Ok(from_str(contents)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_passage_has_requested_word_count() {
        let catalog = Catalog::new(12);
        let passage = catalog.passage(Mode::Plain);

        assert!(passage.title.is_none());
        assert_eq!(passage.text.split(' ').count(), 12);
    }

    #[test]
    fn plain_words_come_from_the_bank() {
        let catalog = Catalog::new(8);
        let passage = catalog.passage(Mode::Plain);

        for word in passage.text.split(' ') {
            assert!(catalog.word_bank.words.contains(&word.to_string()));
        }
    }

    #[test]
    fn plain_passages_are_randomized() {
        let catalog = Catalog::new(30);
        let a = catalog.passage(Mode::Plain);
        let b = catalog.passage(Mode::Plain);
        // not guaranteed distinct, but thirty shuffled words colliding
        // twice in a row would be astronomically unlikely
        assert!(a.text != b.text || catalog.word_bank.words.len() <= 30);
    }

    #[test]
    fn code_passage_is_a_titled_catalog_entry() {
        let catalog = Catalog::new(10);
        let passage = catalog.passage(Mode::Code);

        let title = passage.title.expect("code passages carry a title");
        let entry = catalog
            .snippets
            .iter()
            .find(|s| s.title == title)
            .expect("title should exist in the catalog");
        assert_eq!(entry.code, passage.text);
    }

    #[test]
    fn code_passages_keep_literal_whitespace() {
        let catalog = Catalog::new(10);
        let passage = catalog.passage(Mode::Code);
        assert!(passage.text.contains('\n'));
    }

    #[test]
    fn word_bank_matches_its_declared_size() {
        let catalog = Catalog::new(1);
        assert_eq!(catalog.word_bank.size as usize, catalog.word_bank.words.len());
        assert_eq!(catalog.word_bank.name, "common");
    }

    #[test]
    fn snippet_catalog_is_nonempty_and_cpp() {
        let catalog = Catalog::new(1);
        assert!(!catalog.snippets.is_empty());
        for snippet in &catalog.snippets {
            assert_eq!(snippet.language, "cpp");
            assert!(!snippet.code.is_empty());
        }
    }

    #[test]
    fn fixed_source_ignores_mode() {
        let source = FixedSource::new("hello there".to_string());
        assert_eq!(source.passage(Mode::Plain), source.passage(Mode::Code));
        assert_eq!(source.passage(Mode::Plain).text, "hello there");
    }
}
