//! Fixed circuit topologies: a list of two-terminal branches between nodes.

use crate::math::{CScalar, Scalar};

use super::component::{BuildError, Capacitor, Component, Inductor, Resistor, SeriesRl};

/// Node index (0-based). The ground node is represented by `None`.
pub type Node = Option<usize>;

/// A lumped element that can sit on a branch.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    /// Resistor, `Y = 1/R`.
    Resistor(Resistor),
    /// Capacitor, `Y = s·C`.
    Capacitor(Capacitor),
    /// Inductor, `Y = 1/(s·L)`.
    Inductor(Inductor),
    /// Series R-L, `Y = 1/(R + s·L)`.
    SeriesRl(SeriesRl),
}

impl Element {
    fn as_component(&self) -> &dyn Component {
        match self {
            Self::Resistor(r) => r,
            Self::Capacitor(c) => c,
            Self::Inductor(l) => l,
            Self::SeriesRl(z) => z,
        }
    }
}

impl Component for Element {
    fn admittance(&self, s: CScalar) -> Result<CScalar, BuildError> {
        self.as_component().admittance(s)
    }

    fn name(&self) -> &str {
        self.as_component().name()
    }

    fn validate(&self) -> Result<(), BuildError> {
        self.as_component().validate()
    }
}

/// An element connected between nodes `a` and `b`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// First terminal.
    pub a: Node,
    /// Second terminal.
    pub b: Node,
    /// Element on the branch.
    pub element: Element,
}

/// Immutable-once-built circuit topology with component values.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Netlist {
    name: String,
    node_count: usize,
    branches: Vec<Branch>,
}

impl Netlist {
    /// Creates an empty netlist with `node_count` non-ground nodes.
    #[must_use]
    pub fn new(name: impl Into<String>, node_count: usize) -> Self {
        Self { name: name.into(), node_count, branches: Vec::new() }
    }

    /// Adds an arbitrary element between `a` and `b`.
    pub fn add(&mut self, a: Node, b: Node, element: Element) -> &mut Self {
        self.branches.push(Branch { a, b, element });
        self
    }

    /// Adds a resistor between `a` and `b`.
    pub fn resistor(&mut self, name: &str, a: Node, b: Node, ohms: Scalar) -> &mut Self {
        self.add(a, b, Element::Resistor(Resistor::new(name, ohms)))
    }

    /// Adds a capacitor between `a` and `b`.
    pub fn capacitor(&mut self, name: &str, a: Node, b: Node, farads: Scalar) -> &mut Self {
        self.add(a, b, Element::Capacitor(Capacitor::new(name, farads)))
    }

    /// Adds an inductor between `a` and `b`.
    pub fn inductor(&mut self, name: &str, a: Node, b: Node, henries: Scalar) -> &mut Self {
        self.add(a, b, Element::Inductor(Inductor::new(name, henries)))
    }

    /// Adds a series R-L branch between `a` and `b`.
    pub fn series_rl(&mut self, name: &str, a: Node, b: Node, ohms: Scalar, henries: Scalar) -> &mut Self {
        self.add(a, b, Element::SeriesRl(SeriesRl::new(name, ohms, henries)))
    }

    /// Checks every branch: node indices in range and component values usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`BuildError`] found, in branch order.
    pub fn validate(&self) -> Result<(), BuildError> {
        for branch in &self.branches {
            for node in [branch.a, branch.b].into_iter().flatten() {
                if node >= self.node_count {
                    return Err(BuildError::NodeOutOfRange {
                        component: branch.element.name().to_owned(),
                        node,
                        node_count: self.node_count,
                    });
                }
            }
            branch.element.validate()?;
        }
        Ok(())
    }

    /// Name of the netlist.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-ground nodes.
    #[must_use]
    pub const fn node_count(&self) -> usize {
        self.node_count
    }

    /// Branches in insertion order.
    #[must_use]
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// True if no branches have been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_rejects_out_of_range_node() {
        let mut net = Netlist::new("bad", 2);
        net.resistor("R1", Some(0), Some(2), 10.0);
        let err = net.validate().unwrap_err();
        assert!(matches!(err, BuildError::NodeOutOfRange { node: 2, node_count: 2, .. }));
    }

    #[test]
    fn validate_rejects_zero_inductance() {
        let mut net = Netlist::new("bad", 1);
        net.resistor("R1", Some(0), None, 10.0).inductor("L1", Some(0), None, 0.0);
        assert!(matches!(net.validate(), Err(BuildError::SingularConfiguration { .. })));
    }

    #[test]
    fn builder_chains_branches() {
        let mut net = Netlist::new("pi", 2);
        net.capacitor("C1", Some(0), None, 1e-9)
            .inductor("L1", Some(0), Some(1), 1e-6)
            .capacitor("C2", Some(1), None, 1e-9);
        assert_eq!(net.len(), 3);
        assert!(net.validate().is_ok());
    }
}
