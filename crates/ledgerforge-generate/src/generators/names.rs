use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use fake::Fake;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use ledgerforge_core::AssetClass;

/// A seedable asset definition from the fixed pool.
#[derive(Debug, Clone, Copy)]
pub struct AssetSpec {
    pub code: &'static str,
    pub name: &'static str,
    pub class: AssetClass,
}

const ASSET_POOL: [AssetSpec; 12] = [
    AssetSpec { code: "USD", name: "US Dollar", class: AssetClass::Currency },
    AssetSpec { code: "EUR", name: "Euro", class: AssetClass::Currency },
    AssetSpec { code: "BRL", name: "Brazilian Real", class: AssetClass::Currency },
    AssetSpec { code: "GBP", name: "British Pound", class: AssetClass::Currency },
    AssetSpec { code: "JPY", name: "Japanese Yen", class: AssetClass::Currency },
    AssetSpec { code: "BTC", name: "Bitcoin", class: AssetClass::Crypto },
    AssetSpec { code: "ETH", name: "Ether", class: AssetClass::Crypto },
    AssetSpec { code: "SOL", name: "Solana", class: AssetClass::Crypto },
    AssetSpec { code: "USDT", name: "Tether", class: AssetClass::Crypto },
    AssetSpec { code: "XAU", name: "Gold", class: AssetClass::Commodity },
    AssetSpec { code: "XAG", name: "Silver", class: AssetClass::Commodity },
    AssetSpec { code: "OIL", name: "Crude Oil", class: AssetClass::Commodity },
];

/// Seeded source of entity names, aliases, and randomized picks.
///
/// All randomness for a run flows through one ChaCha8 stream so a fixed seed
/// reproduces the same data.
#[derive(Debug)]
pub struct NameFactory {
    rng: Mutex<ChaCha8Rng>,
    counter: AtomicU64,
}

impl NameFactory {
    pub fn new(seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            rng: Mutex::new(ChaCha8Rng::seed_from_u64(seed)),
            counter: AtomicU64::new(0),
        }
    }

    fn rng(&self) -> std::sync::MutexGuard<'_, ChaCha8Rng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn next_seq(&self) -> u64 {
        self.counter.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn company_name(&self) -> String {
        CompanyName().fake_with_rng(&mut *self.rng())
    }

    pub fn person_name(&self) -> String {
        Name().fake_with_rng(&mut *self.rng())
    }

    /// 14-digit legal document number.
    pub fn legal_document(&self) -> String {
        let mut rng = self.rng();
        (0..14).map(|_| char::from(b'0' + rng.random_range(0..10))).collect()
    }

    pub fn ledger_name(&self) -> String {
        let seq = self.next_seq();
        format!("{} Ledger {seq}", self.company_name())
    }

    pub fn portfolio_name(&self) -> String {
        format!("{} Portfolio {}", self.person_name(), self.next_seq())
    }

    pub fn segment_name(&self) -> String {
        const SEGMENTS: [&str; 6] = [
            "Retail", "Corporate", "Private", "Institutional", "Treasury", "Partners",
        ];
        let pick = self.rng().random_range(0..SEGMENTS.len());
        format!("{} Segment {}", SEGMENTS[pick], self.next_seq())
    }

    pub fn account_alias(&self) -> String {
        let suffix: u32 = self.rng().random_range(0x1000..=0xFFFF_FFFF);
        format!("acct-{}-{suffix:x}", self.next_seq())
    }

    /// Distinct asset specs for one ledger, capped by the pool size.
    pub fn asset_specs(&self, count: usize) -> Vec<AssetSpec> {
        let mut pool = ASSET_POOL.to_vec();
        let mut rng = self.rng();
        // Keep USD first so every ledger has the fallback currency.
        for i in (2..pool.len()).rev() {
            let j = rng.random_range(1..=i);
            pool.swap(i, j);
        }
        pool.truncate(count.min(pool.len()).max(1));
        pool
    }

    pub fn pick<'a, T>(&self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        let index = self.rng().random_range(0..items.len());
        items.get(index)
    }

    /// Random index in `0..len` distinct from `not`. Needs `len >= 2`.
    pub fn pick_other(&self, len: usize, not: usize) -> Option<usize> {
        if len < 2 {
            return None;
        }
        let mut rng = self.rng();
        loop {
            let index = rng.random_range(0..len);
            if index != not {
                return Some(index);
            }
        }
    }

    pub fn amount_in(&self, min: i64, max: i64) -> i64 {
        self.rng().random_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_factory_is_deterministic() {
        let a = NameFactory::new(Some(42));
        let b = NameFactory::new(Some(42));
        assert_eq!(a.company_name(), b.company_name());
        assert_eq!(a.account_alias(), b.account_alias());
    }

    #[test]
    fn asset_specs_are_distinct_and_include_usd() {
        let names = NameFactory::new(Some(7));
        let specs = names.asset_specs(5);
        assert_eq!(specs.len(), 5);
        assert_eq!(specs[0].code, "USD");
        let mut codes: Vec<_> = specs.iter().map(|s| s.code).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), 5);
    }

    #[test]
    fn pick_other_avoids_self() {
        let names = NameFactory::new(Some(3));
        for _ in 0..50 {
            let other = names.pick_other(4, 2);
            assert_ne!(other, Some(2));
        }
        assert_eq!(names.pick_other(1, 0), None);
    }
}
