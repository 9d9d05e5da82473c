//! The physical property lattice.
//!
//! A [`PropertySet`] is a canonical sorted vector holding at most one
//! atomic [`Property`] per kind. Subsumption is checked per kind: a sort
//! order subsumes any prefix of itself, a distribution subsumes only an
//! equal distribution. The empty set requires nothing and is subsumed by
//! every set.

use std::fmt::Display;

/// One sort column with direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SortKey {
    pub column: usize,
    pub desc: bool,
}

impl SortKey {
    pub fn asc(column: usize) -> Self {
        Self {
            column,
            desc: false,
        }
    }

    pub fn desc(column: usize) -> Self {
        Self { column, desc: true }
    }
}

impl Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.desc {
            write!(f, "#{} desc", self.column)
        } else {
            write!(f, "#{}", self.column)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Distribution {
    Singleton,
    Broadcast,
    Hashed(Vec<usize>),
}

impl Display for Distribution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Distribution::Singleton => write!(f, "single"),
            Distribution::Broadcast => write!(f, "broadcast"),
            Distribution::Hashed(cols) => {
                write!(f, "hash(")?;
                for (i, col) in cols.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "#{}", col)?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Discriminant used for canonical ordering inside a [`PropertySet`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PropertyKind {
    SortOrder,
    Distribution,
}

/// An atomic physical property.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Property {
    SortOrder(Vec<SortKey>),
    Distribution(Distribution),
}

impl Property {
    pub fn kind(&self) -> PropertyKind {
        match self {
            Property::SortOrder(_) => PropertyKind::SortOrder,
            Property::Distribution(_) => PropertyKind::Distribution,
        }
    }

    /// Per-kind partial order. `(a, b)` sorted output satisfies a
    /// requirement for `(a)`; distributions must match exactly.
    pub fn subsumes(&self, other: &Property) -> bool {
        match (self, other) {
            (Property::SortOrder(derived), Property::SortOrder(required)) => {
                derived.len() >= required.len() && derived[..required.len()] == required[..]
            }
            (Property::Distribution(derived), Property::Distribution(required)) => {
                derived == required
            }
            _ => false,
        }
    }
}

impl Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Property::SortOrder(keys) => {
                write!(f, "sort[")?;
                for (i, key) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", key)?;
                }
                write!(f, "]")
            }
            Property::Distribution(dist) => write!(f, "dist:{}", dist),
        }
    }
}

/// A canonical set of atomic properties: sorted by kind, at most one entry
/// per kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct PropertySet(Vec<Property>);

impl PropertySet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn with_property(property: Property) -> Self {
        Self(vec![property])
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn properties(&self) -> &[Property] {
        &self.0
    }

    pub fn get(&self, kind: PropertyKind) -> Option<&Property> {
        self.0.iter().find(|p| p.kind() == kind)
    }

    pub fn sort_order(&self) -> Option<&[SortKey]> {
        match self.get(PropertyKind::SortOrder) {
            Some(Property::SortOrder(keys)) => Some(keys),
            _ => None,
        }
    }

    /// Insert `property`, replacing any existing entry of the same kind.
    pub fn add(&mut self, property: Property) {
        self.0.retain(|p| p.kind() != property.kind());
        self.0.push(property);
        self.0.sort_by_key(|p| p.kind());
    }

    /// Drop the entry of `kind`, if any.
    pub fn without(&self, kind: PropertyKind) -> PropertySet {
        Self(self.0.iter().filter(|p| p.kind() != kind).cloned().collect())
    }

    /// `self` satisfies every requirement in `required`.
    pub fn subsumes(&self, required: &PropertySet) -> bool {
        required
            .0
            .iter()
            .all(|req| self.0.iter().any(|have| have.subsumes(req)))
    }

    /// Vector merge. On a same-kind conflict the stronger entry wins; if
    /// neither subsumes the other, `self`'s entry is kept.
    pub fn union(&self, other: &PropertySet) -> PropertySet {
        let mut merged = self.clone();
        for prop in &other.0 {
            let replace = match merged.get(prop.kind()) {
                Some(existing) => !existing.subsumes(prop) && prop.subsumes(existing),
                None => true,
            };
            if replace {
                merged.add(prop.clone());
            }
        }
        merged
    }
}

impl Display for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, prop) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", prop)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for prop in iter {
            set.add(prop);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sort(keys: &[usize]) -> Property {
        Property::SortOrder(keys.iter().map(|&c| SortKey::asc(c)).collect())
    }

    #[test]
    fn sort_prefix_subsumption() {
        assert!(sort(&[1, 2]).subsumes(&sort(&[1])));
        assert!(sort(&[1, 2]).subsumes(&sort(&[1, 2])));
        assert!(!sort(&[1]).subsumes(&sort(&[1, 2])));
        assert!(!sort(&[2, 1]).subsumes(&sort(&[1])));
    }

    #[test]
    fn direction_matters() {
        let asc = Property::SortOrder(vec![SortKey::asc(1)]);
        let desc = Property::SortOrder(vec![SortKey::desc(1)]);
        assert!(!asc.subsumes(&desc));
    }

    #[test]
    fn empty_set_is_subsumed_by_everything() {
        let empty = PropertySet::new();
        let sorted = PropertySet::with_property(sort(&[1]));
        assert!(sorted.subsumes(&empty));
        assert!(empty.subsumes(&empty));
        assert!(!empty.subsumes(&sorted));
    }

    #[test]
    fn union_keeps_stronger_sort() {
        let a = PropertySet::with_property(sort(&[1, 2]));
        let b = PropertySet::with_property(sort(&[1]));
        assert_eq!(a.union(&b), a);
        assert_eq!(b.union(&a), a);
    }

    #[test]
    fn union_merges_kinds() {
        let a = PropertySet::with_property(sort(&[1]));
        let b =
            PropertySet::with_property(Property::Distribution(Distribution::Singleton));
        let merged = a.union(&b);
        assert!(merged.subsumes(&a));
        assert!(merged.subsumes(&b));
        assert_eq!(merged.properties().len(), 2);
    }

    #[test]
    fn canonical_order_ignores_insertion_order() {
        let mut a = PropertySet::new();
        a.add(sort(&[1]));
        a.add(Property::Distribution(Distribution::Broadcast));
        let mut b = PropertySet::new();
        b.add(Property::Distribution(Distribution::Broadcast));
        b.add(sort(&[1]));
        assert_eq!(a, b);
    }
}
