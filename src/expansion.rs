//! Expansion levels parsed from a client's `expand[]` list.
//!
//! `["charge.customer", "customer"]` becomes a tree where `charge` expands
//! with `customer` expanded inside it, and `customer` expands at the top
//! level with nothing beneath it.

use std::collections::BTreeMap;

/// Segment that expands every field at its level.
pub const WILDCARD: &str = "*";

/// One level of the expansion tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionLevel {
    /// Fields to expand. `None` expands the field but nothing beneath it.
    pub expansions: BTreeMap<String, Option<ExpansionLevel>>,
    /// Expand every field at this level. `expansions` is empty when set.
    pub wildcard: bool,
}

impl ExpansionLevel {
    /// Build a tree from dotted expansion paths.
    ///
    /// A bare `*` anywhere short-circuits to a wildcard level. When a field
    /// is listed both bare and with deeper paths, the deeper tree is kept
    /// regardless of order.
    pub fn parse<S: AsRef<str>>(paths: &[S]) -> Self {
        if paths.iter().any(|p| p.as_ref() == WILDCARD) {
            return Self {
                expansions: BTreeMap::new(),
                wildcard: true,
            };
        }

        let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for path in paths {
            let path = path.as_ref();
            if path.is_empty() {
                continue;
            }
            match path.split_once('.') {
                Some((head, rest)) => {
                    let remainders = groups.entry(head).or_default();
                    if !rest.is_empty() {
                        remainders.push(rest);
                    }
                }
                None => {
                    groups.entry(path).or_default();
                }
            }
        }

        let expansions = groups
            .into_iter()
            .map(|(field, remainders)| {
                let child = if remainders.is_empty() {
                    None
                } else {
                    Some(Self::parse(&remainders))
                };
                (field.to_string(), child)
            })
            .collect();

        Self {
            expansions,
            wildcard: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.wildcard && self.expansions.is_empty()
    }

    /// Whether `field` should be expanded at this level.
    pub fn expands(&self, field: &str) -> bool {
        self.wildcard || self.expansions.contains_key(field)
    }

    /// The level to apply inside an expanded `field`, if any.
    pub fn child(&self, field: &str) -> Option<&ExpansionLevel> {
        self.expansions.get(field).and_then(Option::as_ref)
    }
}
