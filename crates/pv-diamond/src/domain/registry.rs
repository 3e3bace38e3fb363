//! # Facet Registry
//!
//! Selector-to-facet routing table with two reverse indices:
//!
//! - per facet, the dense list of its selectors, each binding recording its
//!   position in that list;
//! - the dense global list of facet addresses, each facet recording its
//!   position in that list.
//!
//! Removal compacts both levels with swap-and-truncate, so every recorded
//! position always points at the entry claiming it. A batch of cuts either
//! applies completely or leaves the table untouched.

use crate::domain::cut::{FacetCut, FacetCutAction};
use crate::domain::value_objects::{Address, Selector};
use crate::errors::RoutingError;
use shared_types::swap_remove_reindex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Answers whether an address carries deployed facet code.
pub trait CodeOracle {
    /// Returns true if `address` has executable code.
    fn has_code(&self, address: Address) -> bool;
}

/// Where a selector is routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorBinding {
    /// Facet executing the selector.
    pub facet: Address,
    /// Index of the selector in the facet's selector list.
    pub position: usize,
}

/// Reverse index entry of one facet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetRecord {
    /// Selectors routed to this facet, dense.
    pub selectors: Vec<Selector>,
    /// Index of the facet in the global facet list.
    pub position: usize,
}

/// The routing table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetRegistry {
    bindings: HashMap<Selector, SelectorBinding>,
    facets: HashMap<Address, FacetRecord>,
    facet_addresses: Vec<Address>,
}

impl FacetRegistry {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Facet bound to `selector`, if any.
    #[must_use]
    pub fn resolve(&self, selector: Selector) -> Option<Address> {
        self.bindings.get(&selector).map(|binding| binding.facet)
    }

    /// Full binding of `selector`, if any.
    #[must_use]
    pub fn binding(&self, selector: Selector) -> Option<SelectorBinding> {
        self.bindings.get(&selector).copied()
    }

    /// Global facet list.
    #[must_use]
    pub fn facet_addresses(&self) -> &[Address] {
        &self.facet_addresses
    }

    /// Selectors of `facet` in list order; empty if the facet is unknown.
    #[must_use]
    pub fn selectors_of(&self, facet: Address) -> &[Selector] {
        self.facets
            .get(&facet)
            .map_or(&[], |record| record.selectors.as_slice())
    }

    /// Position of `facet` in the global list.
    #[must_use]
    pub fn facet_position(&self, facet: Address) -> Option<usize> {
        self.facets.get(&facet).map(|record| record.position)
    }

    /// Every facet with its selectors, in global-list order.
    #[must_use]
    pub fn facets(&self) -> Vec<(Address, Vec<Selector>)> {
        self.facet_addresses
            .iter()
            .map(|facet| (*facet, self.selectors_of(*facet).to_vec()))
            .collect()
    }

    /// Number of routed selectors.
    #[must_use]
    pub fn selector_count(&self) -> usize {
        self.bindings.len()
    }

    // =========================================================================
    // CUTS
    // =========================================================================

    /// Apply a batch of cuts atomically.
    ///
    /// # Errors
    ///
    /// Returns the first [`RoutingError`]; the table is unchanged in that case.
    pub fn apply(&mut self, cuts: &[FacetCut], code: &impl CodeOracle) -> Result<(), RoutingError> {
        let mut next = self.clone();
        for cut in cuts {
            next.apply_one(cut, code)?;
        }
        next.verify_indices()?;
        *self = next;
        Ok(())
    }

    fn apply_one(&mut self, cut: &FacetCut, code: &impl CodeOracle) -> Result<(), RoutingError> {
        match cut.action {
            FacetCutAction::Add => self.add_selectors(cut.facet_address, &cut.selectors, code),
            FacetCutAction::Replace => {
                self.replace_selectors(cut.facet_address, &cut.selectors, code)
            }
            FacetCutAction::Remove => self.remove_selectors(cut.facet_address, &cut.selectors),
        }
    }

    /// Bind unbound `selectors` to `facet`.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch, a zero or code-less facet, or any selector
    /// that is already bound. Nothing is bound on failure.
    pub fn add_selectors(
        &mut self,
        facet: Address,
        selectors: &[Selector],
        code: &impl CodeOracle,
    ) -> Result<(), RoutingError> {
        Self::check_target(facet, selectors, code)?;

        let mut seen = HashSet::with_capacity(selectors.len());
        for selector in selectors {
            let existing = self.resolve(*selector);
            if let Some(bound) = existing {
                return Err(RoutingError::SelectorAlreadyBound {
                    selector: *selector,
                    facet: bound,
                });
            }
            if !seen.insert(*selector) {
                return Err(RoutingError::SelectorAlreadyBound {
                    selector: *selector,
                    facet,
                });
            }
        }

        for selector in selectors {
            self.bind(*selector, facet);
        }
        debug!(%facet, count = selectors.len(), "Selectors added");
        Ok(())
    }

    /// Rebind bound `selectors` to `facet`, which may be their current facet.
    ///
    /// Each selector is unbound from its old facet (with compaction) and then
    /// bound to `facet`.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch, a zero or code-less facet, or any selector
    /// that is not bound. Nothing is rebound on failure.
    pub fn replace_selectors(
        &mut self,
        facet: Address,
        selectors: &[Selector],
        code: &impl CodeOracle,
    ) -> Result<(), RoutingError> {
        Self::check_target(facet, selectors, code)?;
        if let Some(unbound) = selectors.iter().find(|s| !self.bindings.contains_key(*s)) {
            return Err(RoutingError::SelectorNotBound(*unbound));
        }

        for selector in selectors {
            self.unbind(*selector)?;
            self.bind(*selector, facet);
        }
        debug!(%facet, count = selectors.len(), "Selectors replaced");
        Ok(())
    }

    /// Unbind `selectors`. `facet` must be the zero sentinel.
    ///
    /// # Errors
    ///
    /// Fails on an empty batch, a non-zero facet, or any selector that is not
    /// bound (including a selector listed twice). Nothing is unbound on failure.
    pub fn remove_selectors(
        &mut self,
        facet: Address,
        selectors: &[Selector],
    ) -> Result<(), RoutingError> {
        if selectors.is_empty() {
            return Err(RoutingError::EmptySelectorBatch { facet });
        }
        if !facet.is_zero() {
            return Err(RoutingError::NonZeroRemoveAddress { facet });
        }

        let mut seen = HashSet::with_capacity(selectors.len());
        for selector in selectors {
            if !self.bindings.contains_key(selector) || !seen.insert(*selector) {
                return Err(RoutingError::SelectorNotBound(*selector));
            }
        }

        for selector in selectors {
            self.unbind(*selector)?;
        }
        debug!(count = selectors.len(), "Selectors removed");
        Ok(())
    }

    fn check_target(
        facet: Address,
        selectors: &[Selector],
        code: &impl CodeOracle,
    ) -> Result<(), RoutingError> {
        if selectors.is_empty() {
            return Err(RoutingError::EmptySelectorBatch { facet });
        }
        if facet.is_zero() {
            return Err(RoutingError::ZeroFacetAddress);
        }
        if !code.has_code(facet) {
            return Err(RoutingError::NoFacetCode { facet });
        }
        Ok(())
    }

    fn bind(&mut self, selector: Selector, facet: Address) {
        let next_facet_position = self.facet_addresses.len();
        let record = match self.facets.entry(facet) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                self.facet_addresses.push(facet);
                entry.insert(FacetRecord {
                    selectors: Vec::new(),
                    position: next_facet_position,
                })
            }
        };

        let position = record.selectors.len();
        record.selectors.push(selector);
        self.bindings
            .insert(selector, SelectorBinding { facet, position });
    }

    /// Two-level swap-and-truncate removal.
    fn unbind(&mut self, selector: Selector) -> Result<Address, RoutingError> {
        let binding = self
            .bindings
            .remove(&selector)
            .ok_or(RoutingError::SelectorNotBound(selector))?;
        let record = self
            .facets
            .get_mut(&binding.facet)
            .ok_or(RoutingError::SelectorIndexInconsistent(selector))?;

        let removal = swap_remove_reindex(&mut record.selectors, binding.position)
            .map_err(|_| RoutingError::SelectorIndexInconsistent(selector))?;
        if removal.removed != selector {
            return Err(RoutingError::SelectorIndexInconsistent(selector));
        }
        if let Some(moved) = removal.moved {
            let moved_binding = self
                .bindings
                .get_mut(&moved)
                .ok_or(RoutingError::SelectorIndexInconsistent(moved))?;
            moved_binding.position = binding.position;
        }

        if record.selectors.is_empty() {
            let facet_position = record.position;
            self.facets.remove(&binding.facet);

            let removal = swap_remove_reindex(&mut self.facet_addresses, facet_position)
                .map_err(|_| RoutingError::FacetIndexInconsistent(binding.facet))?;
            if removal.removed != binding.facet {
                return Err(RoutingError::FacetIndexInconsistent(binding.facet));
            }
            if let Some(moved) = removal.moved {
                let moved_record = self
                    .facets
                    .get_mut(&moved)
                    .ok_or(RoutingError::FacetIndexInconsistent(moved))?;
                moved_record.position = facet_position;
            }
        }

        Ok(binding.facet)
    }

    // =========================================================================
    // CONSISTENCY
    // =========================================================================

    /// Check that every recorded position points at the entry claiming it.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn verify_indices(&self) -> Result<(), RoutingError> {
        for (selector, binding) in &self.bindings {
            let claimed = self
                .facets
                .get(&binding.facet)
                .and_then(|record| record.selectors.get(binding.position));
            if claimed != Some(selector) {
                return Err(RoutingError::SelectorIndexInconsistent(*selector));
            }
        }

        if self.facets.len() != self.facet_addresses.len() {
            let stray = self
                .facet_addresses
                .iter()
                .find(|facet| !self.facets.contains_key(facet))
                .copied()
                .unwrap_or(Address::ZERO);
            return Err(RoutingError::FacetIndexInconsistent(stray));
        }

        for (facet, record) in &self.facets {
            if record.selectors.is_empty()
                || self.facet_addresses.get(record.position) != Some(facet)
            {
                return Err(RoutingError::FacetIndexInconsistent(*facet));
            }
            for (position, selector) in record.selectors.iter().enumerate() {
                let expected = SelectorBinding {
                    facet: *facet,
                    position,
                };
                if self.bindings.get(selector) != Some(&expected) {
                    return Err(RoutingError::SelectorIndexInconsistent(*selector));
                }
            }
        }

        Ok(())
    }
}
