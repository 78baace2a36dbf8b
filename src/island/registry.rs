use crate::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An island is identified by its base URL; its position in the registry is
/// fixed for the whole run and defines the ring.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Island {
    address: String,
    position: usize,
}

impl Island {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.address, path)
    }
}

impl fmt::Display for Island {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.address)
    }
}

/// Ordered, non-empty, immutable list of islands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IslandRegistry {
    islands: Vec<Island>,
}

impl IslandRegistry {
    pub fn new<I, S>(addresses: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let islands = addresses
            .into_iter()
            .enumerate()
            .map(|(position, raw)| {
                let address = raw.as_ref().trim().trim_end_matches('/').to_string();
                match reqwest::Url::parse(&address) {
                    Ok(url) if url.has_host() => Ok(Island { address, position }),
                    _ => Err(ConfigError::InvalidAddress(raw.as_ref().to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if islands.is_empty() {
            return Err(ConfigError::NoIslands);
        }
        Ok(IslandRegistry { islands })
    }

    pub fn len(&self) -> usize {
        self.islands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.islands.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Island> {
        self.islands.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Island> {
        self.islands.get(position)
    }

    /// The island that receives migrants from `island`: position `(i + 1) mod N`.
    pub fn successor(&self, island: &Island) -> &Island {
        &self.islands[(island.position + 1) % self.islands.len()]
    }

    /// Every `(source, destination)` pair of one ring round, in registry order.
    pub fn ring_pairs(&self) -> impl Iterator<Item = (&Island, &Island)> + '_ {
        self.islands
            .iter()
            .map(move |island| (island, self.successor(island)))
    }
}

impl<'a> IntoIterator for &'a IslandRegistry {
    type Item = &'a Island;
    type IntoIter = std::slice::Iter<'a, Island>;

    fn into_iter(self) -> Self::IntoIter {
        self.islands.iter()
    }
}
