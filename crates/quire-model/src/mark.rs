//! Marks: inline annotations such as emphasis or links.

use std::fmt;
use std::sync::Arc;

use crate::attrs::Attrs;
use crate::schema::MarkType;

/// A mark instance. Mark sets are slices kept sorted by type rank.
#[derive(Clone, Debug)]
pub struct Mark {
    pub ty: Arc<MarkType>,
    pub attrs: Attrs,
}

impl PartialEq for Mark {
    fn eq(&self, other: &Self) -> bool {
        self.ty.id == other.ty.id && self.attrs == other.attrs
    }
}

impl Mark {
    pub fn name(&self) -> &str {
        &self.ty.name
    }

    /// Add this mark to `set`, dropping marks it excludes and keeping rank
    /// order. Returns `set` unchanged when a mark in it excludes this one.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.ty.excludes(&other.ty) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.ty.excludes(&self.ty) {
                return set.to_vec();
            } else {
                if !placed && other.ty.rank() > self.ty.rank() {
                    let c = copy.get_or_insert_with(|| set[..i].to_vec());
                    c.push(self.clone());
                    placed = true;
                }
                if let Some(c) = copy.as_mut() {
                    c.push(other.clone());
                }
            }
        }
        let mut out = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            out.push(self.clone());
        }
        out
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.iter().any(|m| m == self)
    }
}

/// Whether two mark sets are equal.
pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x == y)
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.ty.name)?;
        if !self.attrs.is_empty() {
            let parts: Vec<String> = self.attrs.iter().map(|(k, v)| format!("{k}={v}")).collect();
            write!(f, "[{}]", parts.join(" "))?;
        }
        Ok(())
    }
}
