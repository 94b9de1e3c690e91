//! Verifies that every stack of a cell is a connected diffusion chain.

use std::fmt::Display;

use super::{CellStacks, EdgeKey, GatePair, Netlist, NodeKey, SingleStack};
use crate::log::Log;
use crate::tech::MosKind;
use crate::validation::{Empty, ValidatorOutput};

pub type StackValidatorOutput = ValidatorOutput<Empty, Error, Empty>;

/// Validates the stacks of one cell against its netlist.
pub fn validate_stacks(netlist: &Netlist, stacks: &CellStacks) -> StackValidatorOutput {
    StackValidator {
        netlist,
        output: ValidatorOutput::default(),
    }
    .validate(stacks)
}

struct StackValidator<'a> {
    netlist: &'a Netlist,
    output: StackValidatorOutput,
}

/// Where in a cell's stacks an error was found.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Location {
    Dual { stack: usize, pair: usize },
    Single { kind: MosKind, stack: usize, link: usize },
}

/// Data for an error.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Error {
    loc: Location,
    cause: ErrorCause,
}

/// An enumeration of causes for an error.
#[non_exhaustive]
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum ErrorCause {
    /// The edge key is not present in the netlist.
    DanglingEdge,
    /// The node key is not present in the netlist.
    DanglingNode,
    /// The edge does not have the polarity of the row it was placed in.
    WrongKind { expected: MosKind, found: MosKind },
    /// The edge does not touch the node to its left.
    BrokenChain,
    /// A dual-stack row has edges but no left node.
    MissingLeftNode(MosKind),
    /// A dual-stack row has a gap between populated positions.
    NonContiguousRow(MosKind),
    /// The fold index exceeds the number of folds of the edge.
    FoldOutOfRange { fold: usize, folds: usize },
}

impl Error {
    pub fn new(loc: Location, cause: ErrorCause) -> Self {
        Self { loc, cause }
    }

    #[inline]
    pub fn cause(&self) -> &ErrorCause {
        &self.cause
    }
}

impl Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Dual { stack, pair } => write!(f, "dual stack {stack}, gate position {pair}"),
            Self::Single { kind, stack, link } => {
                write!(f, "{kind} stack {stack}, position {link}")
            }
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.cause {
            ErrorCause::DanglingEdge => write!(f, "unknown transistor at {}", self.loc),
            ErrorCause::DanglingNode => write!(f, "unknown node at {}", self.loc),
            ErrorCause::WrongKind { expected, found } => write!(
                f,
                "{found} transistor placed in a {expected} row at {}",
                self.loc
            ),
            ErrorCause::BrokenChain => {
                write!(f, "diffusion chain is not connected at {}", self.loc)
            }
            ErrorCause::MissingLeftNode(kind) => {
                write!(f, "{kind} row has no left node at {}", self.loc)
            }
            ErrorCause::NonContiguousRow(kind) => {
                write!(f, "{kind} row resumes after a gap at {}", self.loc)
            }
            ErrorCause::FoldOutOfRange { fold, folds } => write!(
                f,
                "fold {fold} requested from a transistor with {folds} folds at {}",
                self.loc
            ),
        }
    }
}

impl Log for Error {
    fn log(&self) {
        use crate::log::error;
        error!("{self}");
    }
}

impl<'a> StackValidator<'a> {
    fn validate(mut self, stacks: &CellStacks) -> StackValidatorOutput {
        for (i, gp) in stacks.dual.iter().enumerate() {
            self.validate_dual(i, gp);
        }
        for (kind, list) in [(MosKind::Nmos, &stacks.n), (MosKind::Pmos, &stacks.p)] {
            for (i, stack) in list.iter().enumerate() {
                self.validate_single(kind, i, stack);
            }
        }
        self.output
    }

    fn error(&mut self, loc: Location, cause: ErrorCause) {
        self.output.errors.push(Error::new(loc, cause));
    }

    /// Checks that `edge` exists, has polarity `kind` and touches `left`.
    ///
    /// Returns the node on the other side of the edge.
    fn check_step(
        &mut self,
        loc: Location,
        kind: MosKind,
        left: NodeKey,
        edge: EdgeKey,
        fold: usize,
    ) -> Option<NodeKey> {
        if self.netlist.node(left).is_none() {
            self.error(loc, ErrorCause::DanglingNode);
            return None;
        }
        let Some(e) = self.netlist.edge(edge) else {
            self.error(loc, ErrorCause::DanglingEdge);
            return None;
        };
        if e.kind != kind {
            self.error(
                loc,
                ErrorCause::WrongKind {
                    expected: kind,
                    found: e.kind,
                },
            );
        }
        if !e.widths.is_empty() && fold >= e.widths.len() {
            self.error(
                loc,
                ErrorCause::FoldOutOfRange {
                    fold,
                    folds: e.widths.len(),
                },
            );
        }
        let right = e.other(left);
        if right.is_none() {
            self.error(loc, ErrorCause::BrokenChain);
        }
        right
    }

    fn validate_dual(&mut self, stack: usize, gp: &GatePair) {
        for kind in MosKind::ALL {
            let mut left = gp.left(kind);
            let mut seen = false;
            let mut ended = false;
            for (i, pair) in gp.pairs().iter().enumerate() {
                let loc = Location::Dual { stack, pair: i };
                let Some(pe) = pair.get(kind) else {
                    ended |= seen;
                    continue;
                };
                if ended {
                    self.error(loc, ErrorCause::NonContiguousRow(kind));
                    break;
                }
                seen = true;
                let Some(node) = left else {
                    self.error(loc, ErrorCause::MissingLeftNode(kind));
                    break;
                };
                left = self.check_step(loc, kind, node, pe.edge, pe.fold);
                if left.is_none() {
                    break;
                }
            }
        }
    }

    fn validate_single(&mut self, kind: MosKind, stack: usize, s: &SingleStack) {
        for (i, link) in s.links.iter().enumerate() {
            let loc = Location::Single {
                kind,
                stack,
                link: i,
            };
            let Some(right) = self.check_step(loc, kind, link.node, link.edge, link.fold) else {
                return;
            };
            if right != s.right_of(i) {
                self.error(loc, ErrorCause::BrokenChain);
                return;
            }
        }
    }
}
