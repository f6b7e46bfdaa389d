//! Synthetic marketplace that produces plausible Brazilian e-commerce listings
//! without network access. Used for development and by the default binary.

use std::ops::Range;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use tokio::time::sleep;
use tracing::debug;

use super::SourceFetcher;
use crate::error::SourceError;
use crate::models::RawListing;

/// Category keyword → typical BRL price range, checked in order against the
/// lower-cased query.
const PRICE_BANDS: &[(&str, f64, f64)] = &[
    ("notebook", 2000.0, 8000.0),
    ("laptop", 2000.0, 8000.0),
    ("computador", 1500.0, 6000.0),
    ("iphone", 3000.0, 8000.0),
    ("smartphone", 800.0, 5000.0),
    ("celular", 800.0, 5000.0),
    ("tablet", 800.0, 3000.0),
    ("monitor", 500.0, 3000.0),
    ("teclado", 50.0, 500.0),
    ("mouse", 30.0, 300.0),
    ("headset", 100.0, 800.0),
    ("fone", 50.0, 1000.0),
    // first match wins, so longer keywords go before their substrings
    ("smart tv", 1500.0, 10000.0),
    ("tv", 1000.0, 8000.0),
    ("console", 2000.0, 4000.0),
    ("playstation", 2500.0, 4500.0),
    ("xbox", 2000.0, 4000.0),
    ("camera", 800.0, 5000.0),
    ("impressora", 300.0, 2000.0),
    ("roteador", 100.0, 800.0),
    ("ssd", 200.0, 1500.0),
    ("hd", 200.0, 1000.0),
    ("memoria", 150.0, 800.0),
    ("placa", 500.0, 3000.0),
];

const DEFAULT_BASE_PRICE: f64 = 500.0;
const DISCOUNT_CHANCE: f64 = 0.3;

const BRANDS: &[(&str, &[&str])] = &[
    ("notebook", &["Dell", "Lenovo", "Acer", "Asus", "HP", "Samsung"]),
    ("smartphone", &["Samsung", "Xiaomi", "Motorola", "Apple", "Realme"]),
    ("smart tv", &["Samsung", "LG", "Sony", "TCL", "Philips"]),
    ("tv", &["Samsung", "LG", "Sony", "TCL", "Philips"]),
    ("monitor", &["Dell", "LG", "Samsung", "AOC", "Asus"]),
];

const RAM: &[&str] = &["4GB", "8GB", "16GB", "32GB"];
const STORAGE: &[&str] = &["128GB", "256GB", "512GB", "1TB", "2TB"];
const PHONE_STORAGE: &[&str] = &["64GB", "128GB", "256GB", "512GB"];
const PROCESSORS: &[&str] = &["i3", "i5", "i7", "i9", "Ryzen 5", "Ryzen 7"];
const SCREENS: &[&str] = &[
    "13.3\"", "14\"", "15.6\"", "17\"", "24\"", "27\"", "32\"", "43\"", "50\"", "55\"", "65\"",
];

/// Price multiplier range per marketplace.
fn variation_band(marketplace: &str) -> (f64, f64) {
    match marketplace {
        "Amazon" => (0.95, 1.15),
        "Mercado Livre" => (0.90, 1.10),
        "Shopee" => (0.85, 1.05),
        "AliExpress" => (0.70, 0.95),
        _ => (0.90, 1.10),
    }
}

fn product_url(marketplace: &str, id: &str) -> String {
    match marketplace {
        "Amazon" => format!("https://amazon.com.br/dp/{}", id),
        "Mercado Livre" => format!("https://produto.mercadolivre.com.br/{}", id),
        "Shopee" => format!("https://shopee.com.br/product/{}", id),
        "AliExpress" => format!("https://pt.aliexpress.com/item/{}.html", id),
        other => format!(
            "https://{}.example.com/item/{}",
            other.to_lowercase().replace(' ', "-"),
            id
        ),
    }
}

fn category_of(query: &str) -> Option<&'static str> {
    let query = query.to_lowercase();
    PRICE_BANDS
        .iter()
        .find(|(keyword, _, _)| query.contains(keyword))
        .map(|(keyword, _, _)| *keyword)
}

/// Midpoint of the query's category band.
pub fn base_price(query: &str) -> f64 {
    let query = query.to_lowercase();
    PRICE_BANDS
        .iter()
        .find(|(keyword, _, _)| query.contains(keyword))
        .map(|(_, low, high)| (low + high) / 2.0)
        .unwrap_or(DEFAULT_BASE_PRICE)
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub struct MockSource {
    name: String,
    count: usize,
    latency: Option<Range<Duration>>,
    rng: Mutex<StdRng>,
}

impl MockSource {
    pub fn new(name: impl Into<String>, count: usize) -> Self {
        Self {
            name: name.into(),
            count,
            latency: None,
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Fixed seed for reproducible listings.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Sleep for a random duration in `range` before answering.
    pub fn with_latency(mut self, range: Range<Duration>) -> Self {
        self.latency = if range.is_empty() { None } else { Some(range) };
        self
    }

    fn generate(&self, query: &str) -> (Vec<RawListing>, Option<Duration>) {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let delay = self.latency.clone().map(|range| rng.gen_range(range));
        let base = base_price(query);
        let category = category_of(query);
        let prefix: String = self.name.chars().take(3).collect::<String>().to_uppercase();

        let listings = (0..self.count)
            .map(|index| {
                let id = format!("{}{}", prefix, rng.gen_range(100_000..1_000_000));
                let title = self.product_name(&mut *rng, query, category, index);
                let price = self.price(&mut *rng, base);

                let mut raw = RawListing::new(id.clone(), title, price);
                if rng.gen_bool(DISCOUNT_CHANCE) {
                    let pct: f64 = rng.gen_range(5.0..=40.0_f64).round();
                    raw.original_price = Some(round2(price / (1.0 - pct / 100.0)));
                }
                raw.image_url = Some(format!(
                    "https://via.placeholder.com/300x300.png?text={}+Product",
                    self.name.replace(' ', "+")
                ));
                raw.url = Some(product_url(&self.name, &id));
                raw
            })
            .collect();

        (listings, delay)
    }

    fn product_name<R: Rng>(&self, rng: &mut R, query: &str, category: Option<&str>, index: usize) -> String {
        let mut parts: Vec<String> = Vec::new();

        if let Some(brands) = category.and_then(|c| BRANDS.iter().find(|(k, _)| *k == c)) {
            if let Some(brand) = brands.1.choose(&mut *rng) {
                parts.push(brand.to_string());
            }
        }

        parts.push(title_case(query));

        match category {
            Some("notebook" | "laptop" | "computador") => {
                let processor = PROCESSORS.choose(&mut *rng).copied().unwrap_or_default();
                let ram = RAM.choose(&mut *rng).copied().unwrap_or_default();
                let storage = STORAGE.choose(&mut *rng).copied().unwrap_or_default();
                parts.push(format!("{} {} {}", processor, ram, storage));
            }
            Some("smartphone" | "celular" | "iphone") => {
                if let Some(storage) = PHONE_STORAGE.choose(&mut *rng) {
                    parts.push(storage.to_string());
                }
            }
            Some("tv" | "smart tv" | "monitor") => {
                if let Some(screen) = SCREENS.choose(&mut *rng) {
                    parts.push(screen.to_string());
                }
            }
            _ => {}
        }

        if index > 0 {
            parts.push(format!("- Modelo {}", index + 1));
        }

        parts.join(" ")
    }

    /// Base price scaled by the marketplace band, ending in .90 or .99.
    fn price<R: Rng>(&self, rng: &mut R, base: f64) -> f64 {
        let (low, high) = variation_band(&self.name);
        let scaled = base * rng.gen_range(low..high);
        let cents = if rng.gen_bool(0.5) { 0.90 } else { 0.99 };
        round2(scaled.trunc() + cents)
    }
}

#[async_trait]
impl SourceFetcher for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(&self, query: &str) -> Result<Vec<RawListing>, SourceError> {
        // Generated before awaiting so the RNG guard never crosses a suspension point.
        let (listings, delay) = self.generate(query);

        if let Some(delay) = delay {
            sleep(delay).await;
        }

        debug!("Generated {} mock listings for {}", listings.len(), self.name);
        Ok(listings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_price_by_category() {
        assert_eq!(base_price("notebook dell"), 5000.0);
        assert_eq!(base_price("iPhone 13"), 5500.0);
        assert_eq!(base_price("cadeira gamer"), 500.0);
    }

    #[test]
    fn test_smart_tv_has_its_own_band() {
        assert_eq!(base_price("Smart TV 55 4K"), 5750.0);
        assert_eq!(base_price("tv box"), 4500.0);
        assert_eq!(category_of("smart tv samsung"), Some("smart tv"));
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("notebook DELL  inspiron"), "Notebook Dell Inspiron");
    }

    #[tokio::test]
    async fn test_generates_requested_count() {
        let source = MockSource::new("Amazon", 5).with_seed(7);
        let listings = source.search("notebook").await.unwrap();
        assert_eq!(listings.len(), 5);

        for raw in &listings {
            assert!(raw.external_id.starts_with("AMA"));
            assert!(raw.title.contains("Notebook"));
            assert!(raw.url.as_deref().unwrap_or_default().starts_with("https://amazon.com.br/dp/"));
            if let Some(original) = raw.original_price {
                assert!(original > raw.price);
            }
        }
        assert!(listings[1].title.ends_with("- Modelo 2"));
    }

    #[tokio::test]
    async fn test_prices_follow_marketplace_band() {
        let source = MockSource::new("AliExpress", 20).with_seed(1);
        for raw in source.search("mouse").await.unwrap() {
            // base 165, band 0.70..0.95
            assert!(raw.price >= 115.0 && raw.price < 158.0, "price {}", raw.price);
            let cents = round2(raw.price - raw.price.trunc());
            assert!(cents == 0.90 || cents == 0.99, "cents {}", cents);
        }
    }

    #[tokio::test]
    async fn test_seed_is_reproducible() {
        let a = MockSource::new("Shopee", 4).with_seed(42);
        let b = MockSource::new("Shopee", 4).with_seed(42);
        assert_eq!(a.search("smartphone").await.unwrap(), b.search("smartphone").await.unwrap());
    }

    #[tokio::test]
    async fn test_latency_is_applied() {
        let source = MockSource::new("Amazon", 1)
            .with_seed(3)
            .with_latency(Duration::from_millis(20)..Duration::from_millis(30));
        let started = std::time::Instant::now();
        source.search("tablet").await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(20));
    }
}
