//! Title canonicalization and attribute extraction

use std::collections::{BTreeMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref STOP_WORDS: HashSet<&'static str> = [
        "o", "a", "os", "as", "um", "uma", "de", "do", "da", "dos", "das",
        "em", "no", "na", "nos", "nas", "para", "com", "por", "e",
        "novo", "nova", "original", "oficial", "nacional", "importado",
        "preto", "branco", "azul", "vermelho", "verde", "amarelo",
        "gratis", "frete", "entrega", "rapida", "envio",
    ]
    .into_iter()
    .collect();
    static ref RAM_PATTERN: Regex = Regex::new(r"(\d+)\s*gb(\s+ram)?").unwrap();
    static ref STORAGE_PATTERN: Regex = Regex::new(r"(\d+)\s*(gb|tb)(\s+(?:ssd|hdd))?").unwrap();
    static ref PROCESSOR_PATTERN: Regex =
        Regex::new(r"\b(i[3579]|ryzen\s*[3579]|core\s*[3579])\b").unwrap();
    static ref SCREEN_PATTERN: Regex =
        Regex::new(r#"(\d+(?:[.,]\d+)?)\s*(?:polegadas|pol\b|"|''|”)"#).unwrap();
}

/// Alias → canonical brand, checked in order.
const BRAND_ALIASES: &[(&str, &str)] = &[
    ("hp", "hewlett packard"),
    ("dell", "dell"),
    ("asus", "asus"),
    ("acer", "acer"),
    ("lenovo", "lenovo"),
    ("samsung", "samsung"),
    ("lg", "lg"),
    ("apple", "apple"),
    ("iphone", "iphone"),
    ("xiaomi", "xiaomi"),
    ("motorola", "motorola"),
    ("moto", "motorola"),
];

pub const DEFAULT_MIN_KEYWORD_LENGTH: usize = 2;

/// Lower-case and drop combining marks ("Computação" → "computacao").
/// Punctuation is left in place.
pub fn strip_accents(text: &str) -> String {
    text.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// Canonical form used for every comparison: `[a-z0-9]` tokens separated by
/// single spaces. Idempotent.
pub fn normalize(text: &str) -> String {
    let cleaned: String = strip_accents(text)
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { ' ' })
        .collect();

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn extract_keywords(text: &str, min_length: usize) -> Vec<String> {
    normalize(text)
        .split_whitespace()
        .filter(|word| word.chars().count() >= min_length && !STOP_WORDS.contains(word))
        .map(String::from)
        .collect()
}

pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(word)
}

/// Structured attributes found in a product title. Keys are only present when
/// the attribute was found: `ram`, `storage`, `processor`, `screen`.
pub fn extract_specs(text: &str) -> BTreeMap<&'static str, String> {
    let mut specs = BTreeMap::new();
    let normalized = normalize(text);

    // A size explicitly labelled "ram" (or "ssd"/"hdd" below) beats the first
    // bare size, so "512GB SSD 8GB RAM" does not report 512gb of memory.
    let ram_matches: Vec<_> = RAM_PATTERN.captures_iter(&normalized).collect();
    if let Some(cap) = ram_matches
        .iter()
        .find(|cap| cap.get(2).is_some())
        .or_else(|| ram_matches.first())
    {
        specs.insert("ram", format!("{}gb", &cap[1]));
    }

    let storage_matches: Vec<_> = STORAGE_PATTERN.captures_iter(&normalized).collect();
    if let Some(cap) = storage_matches
        .iter()
        .find(|cap| cap.get(3).is_some())
        .or_else(|| storage_matches.first())
    {
        specs.insert("storage", format!("{}{}", &cap[1], &cap[2]));
    }

    if let Some(cap) = PROCESSOR_PATTERN.captures(&normalized) {
        let processor: String = cap[1].chars().filter(|c| !c.is_whitespace()).collect();
        specs.insert("processor", processor);
    }

    // Decimal points and quote marks do not survive `normalize`.
    if let Some(cap) = SCREEN_PATTERN.captures(&strip_accents(text)) {
        specs.insert("screen", format!("{}in", cap[1].replace(',', ".")));
    }

    specs
}

/// Canonical brand for the first known alias among the title's tokens, or the
/// normalized text itself when no alias is present.
pub fn normalize_brand(text: &str) -> String {
    let normalized = normalize(text);
    let tokens: HashSet<&str> = normalized.split_whitespace().collect();

    BRAND_ALIASES
        .iter()
        .find(|(alias, _)| tokens.contains(alias))
        .map(|(_, brand)| brand.to_string())
        .unwrap_or(normalized)
}
