//! The cell hierarchy handed to the layout pass.

use std::collections::BTreeMap;

use arcstr::ArcStr;
use serde::{Deserialize, Serialize};

use crate::error::{ErrorSource, Result};
use crate::stack::{CellStacks, Netlist};

/// A placement of one cell inside another.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub name: ArcStr,
    /// The name of the instantiated cell.
    pub cell: ArcStr,
}

impl Instance {
    pub fn new(name: impl Into<ArcStr>, cell: impl Into<ArcStr>) -> Self {
        Self {
            name: name.into(),
            cell: cell.into(),
        }
    }
}

/// One cell of a design: its transistors, their stacks and its sub-cells.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Circuit {
    pub name: ArcStr,
    pub netlist: Netlist,
    pub stacks: CellStacks,
    pub instances: Vec<Instance>,
}

impl Circuit {
    pub fn new(name: impl Into<ArcStr>, netlist: Netlist, stacks: CellStacks) -> Self {
        Self {
            name: name.into(),
            netlist,
            stacks,
            instances: Vec::new(),
        }
    }

    pub fn add_instance(&mut self, instance: Instance) {
        self.instances.push(instance);
    }
}

/// A set of cells and the name of the top cell.
///
/// Cells are kept sorted by name, so every walk over them is deterministic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    cells: BTreeMap<ArcStr, Circuit>,
    top: ArcStr,
}

impl Design {
    pub fn new(top: impl Into<ArcStr>) -> Self {
        Self {
            cells: BTreeMap::new(),
            top: top.into(),
        }
    }

    /// Adds a cell, returning the cell it replaced, if any.
    pub fn add_cell(&mut self, circuit: Circuit) -> Option<Circuit> {
        self.cells.insert(circuit.name.clone(), circuit)
    }

    #[inline]
    pub fn top(&self) -> &ArcStr {
        &self.top
    }

    #[inline]
    pub fn cell(&self, name: &str) -> Option<&Circuit> {
        self.cells.get(name)
    }

    /// All cells, in name order.
    pub fn cells(&self) -> impl Iterator<Item = &Circuit> {
        self.cells.values()
    }

    fn try_cell(&self, name: &ArcStr) -> Result<&Circuit> {
        self.cells
            .get(name)
            .ok_or_else(|| ErrorSource::CellNotFound(name.clone()).into())
    }

    /// Calls `f` once per instance of the tree rooted at the top cell,
    /// including once for the top cell itself.
    pub fn for_each_instance<'a>(&'a self, mut f: impl FnMut(&'a Circuit)) -> Result<()> {
        let mut path = Vec::new();
        self.visit(&self.top, &mut path, &mut f)
    }

    fn visit<'a>(
        &'a self,
        name: &ArcStr,
        path: &mut Vec<ArcStr>,
        f: &mut dyn FnMut(&'a Circuit),
    ) -> Result<()> {
        if path.contains(name) {
            return Err(ErrorSource::RecursiveCell(name.clone()).into());
        }
        let circuit = self.try_cell(name)?;
        f(circuit);
        path.push(name.clone());
        for inst in circuit.instances.iter() {
            self.visit(&inst.cell, path, f)?;
        }
        path.pop();
        Ok(())
    }

    /// The distinct cells reachable from the top cell, in name order.
    pub fn reachable(&self) -> Result<Vec<&Circuit>> {
        let mut seen = BTreeMap::new();
        let mut stack = vec![self.try_cell(&self.top)?];
        while let Some(circuit) = stack.pop() {
            if seen.insert(circuit.name.clone(), circuit).is_some() {
                continue;
            }
            for inst in circuit.instances.iter() {
                stack.push(self.try_cell(&inst.cell)?);
            }
        }
        Ok(seen.into_values().collect())
    }
}
