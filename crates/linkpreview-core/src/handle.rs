use rand::Rng;
use std::fmt;

pub const DEFAULT_PLACEHOLDER_PREFIX: &str = "onebox-";

/// Class name tying a pending preview fetch to its placeholder element(s).
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceholderHandle(String);

impl PlaceholderHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlaceholderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Pending placeholder handles and the links they were minted for.
///
/// A handle stays registered until its preview resolves, and no two pending
/// handles share an identifier. Handles are kept in the order they were
/// minted, which is document order for a single render.
#[derive(Debug)]
pub struct HandleRegistry {
    prefix: String,
    pending: Vec<(PlaceholderHandle, String)>,
}

impl HandleRegistry {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            pending: Vec::new(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn mint(&mut self, link: &str) -> PlaceholderHandle {
        self.mint_with(link, &mut rand::thread_rng())
    }

    pub fn mint_with<R: Rng>(&mut self, link: &str, rng: &mut R) -> PlaceholderHandle {
        loop {
            let suffix = base36(rng.r#gen::<u64>());
            let handle = PlaceholderHandle(format!("{}{}", self.prefix, suffix));
            if !self.contains(&handle) {
                self.pending.push((handle.clone(), link.to_string()));
                return handle;
            }
            log::trace!("placeholder {} already pending, minting again", handle);
        }
    }

    /// Forgets `handle`, returning the link it was minted for.
    pub fn release(&mut self, handle: &PlaceholderHandle) -> Option<String> {
        let idx = self.pending.iter().position(|(pending, _)| pending == handle)?;
        Some(self.pending.remove(idx).1)
    }

    pub fn contains(&self, handle: &PlaceholderHandle) -> bool {
        self.pending.iter().any(|(pending, _)| pending == handle)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlaceholderHandle, &str)> {
        self.pending
            .iter()
            .map(|(handle, link)| (handle, link.as_str()))
    }
}

fn base36(mut value: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::{DEFAULT_PLACEHOLDER_PREFIX, HandleRegistry, base36};
    use rand::rngs::mock::StepRng;
    use std::collections::HashSet;

    #[test]
    fn base36_digits() {
        assert_eq!(base36(0), "0");
        assert_eq!(base36(35), "z");
        assert_eq!(base36(36), "10");
        assert_eq!(base36(u64::MAX), "3w5e11264sgsf");
    }

    #[test]
    fn minted_handles_are_prefixed_and_distinct() {
        let mut registry = HandleRegistry::new(DEFAULT_PLACEHOLDER_PREFIX);
        let mut seen = HashSet::new();
        for idx in 0..500 {
            let handle = registry.mint(&format!("https://example.com/{}", idx));
            assert!(handle.as_str().starts_with("onebox-"));
            assert!(seen.insert(handle));
        }
        assert_eq!(registry.len(), 500);
    }

    #[test]
    fn colliding_draw_is_rerolled() {
        let mut registry = HandleRegistry::new("p-");
        let first = registry.mint_with("https://a.com", &mut StepRng::new(7, 0));
        assert_eq!(first.as_str(), "p-7");

        // Draws 7 (taken) and then 8.
        let second = registry.mint_with("https://b.com", &mut StepRng::new(7, 1));
        assert_eq!(second.as_str(), "p-8");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn release_forgets_the_handle() {
        let mut registry = HandleRegistry::new("p-");
        let handle = registry.mint("https://a.com");
        assert!(registry.contains(&handle));
        assert_eq!(registry.release(&handle).as_deref(), Some("https://a.com"));
        assert_eq!(registry.release(&handle), None);
        assert!(registry.is_empty());
    }

    #[test]
    fn iteration_follows_mint_order() {
        let mut registry = HandleRegistry::new("p-");
        let links = ["https://c.com", "https://a.com", "https://b.com"];
        let handles: Vec<_> = links.iter().map(|link| registry.mint(link)).collect();
        registry.release(&handles[1]);

        let pending: Vec<_> = registry
            .iter()
            .map(|(handle, link)| (handle.clone(), link.to_string()))
            .collect();
        assert_eq!(
            pending,
            vec![
                (handles[0].clone(), "https://c.com".to_string()),
                (handles[2].clone(), "https://b.com".to_string()),
            ]
        );
    }
}
