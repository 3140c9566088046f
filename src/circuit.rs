//! Boolean circuits consisting of AND, XOR and NOT gates.
//!
//! A [`Circuit`] is a list of nodes in topological order. Every node defines exactly one wire,
//! identified by its index: a primary input owned by one of the two parties, a constant, or a
//! gate whose inputs are wires defined earlier in the list.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a wire by the index of the node that defines it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WireId(pub(crate) u32);

impl WireId {
    /// The wire defined by the node at `index`.
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The index of the defining node.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// The two logical roles of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Party {
    /// Garbles the circuit and contributes its own inputs as labels.
    Garbler,
    /// Evaluates the garbled circuit.
    Evaluator,
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Party::Garbler => f.write_str("garbler"),
            Party::Evaluator => f.write_str("evaluator"),
        }
    }
}

/// Which roles learn the plaintext output of a circuit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RevealPolicy {
    /// Only the evaluator decodes the output.
    #[default]
    EvaluatorOnly,
    /// Both roles decode the output.
    Both,
}

impl RevealPolicy {
    /// Whether the output is disclosed to the given party.
    pub fn reveals_to(self, party: Party) -> bool {
        match self {
            RevealPolicy::EvaluatorOnly => party == Party::Evaluator,
            RevealPolicy::Both => true,
        }
    }
}

/// The primitive gate kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateKind {
    /// Conjunction of two wires.
    And,
    /// Exclusive or of two wires.
    Xor,
    /// Negation of a single wire.
    Not,
}

impl GateKind {
    /// The number of input wires of the gate.
    pub fn arity(self) -> usize {
        match self {
            GateKind::And | GateKind::Xor => 2,
            GateKind::Not => 1,
        }
    }
}

/// A gate together with its input wires. The output wire is the wire of the node itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gate {
    /// `x & y`
    And(WireId, WireId),
    /// `x ^ y`
    Xor(WireId, WireId),
    /// `!x`
    Not(WireId),
}

impl Gate {
    /// The kind of the gate.
    pub fn kind(&self) -> GateKind {
        match self {
            Gate::And(..) => GateKind::And,
            Gate::Xor(..) => GateKind::Xor,
            Gate::Not(_) => GateKind::Not,
        }
    }

    /// The input wires, exactly [`GateKind::arity`] many.
    pub fn inputs(&self) -> Vec<WireId> {
        match *self {
            Gate::And(x, y) | Gate::Xor(x, y) => vec![x, y],
            Gate::Not(x) => vec![x],
        }
    }

    /// Computes the gate on plaintext bits. `y` is ignored for unary gates.
    pub fn apply(&self, x: bool, y: bool) -> bool {
        match self {
            Gate::And(..) => x & y,
            Gate::Xor(..) => x ^ y,
            Gate::Not(_) => !x,
        }
    }
}

/// A node of the circuit, defining exactly one wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Node {
    /// A primary input bit provided by a party.
    Input(Party),
    /// A bit fixed at compile time.
    Const(bool),
    /// A gate over previously defined wires.
    Gate(Gate),
}

/// Errors caused by ill-formed circuits or mismatched plaintext inputs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
    /// A gate references a wire that is not defined before it.
    #[error("gate {gate} references wire {input}, which is not defined before it")]
    InvalidGateInput {
        /// The wire defined by the offending gate.
        gate: WireId,
        /// The referenced wire.
        input: WireId,
    },
    /// The primary input list does not match the input nodes.
    #[error("the primary input list does not match the input nodes of the circuit")]
    InvalidInputList,
    /// An output references a wire that does not exist.
    #[error("output references the undefined wire {0}")]
    InvalidOutput(WireId),
    /// The circuit has no outputs.
    #[error("the circuit has no outputs")]
    EmptyOutput,
    /// The circuit is too large to be addressed by 32-bit wire ids.
    #[error("the circuit exceeds the maximum number of wires")]
    MaxCircuitSizeExceeded,
    /// The number of input bits does not match the circuit.
    #[error("expected {expected} input bits from the {party}, found {actual}")]
    WrongInputSize {
        /// The party whose inputs were checked.
        party: Party,
        /// The number of input bits expected by the circuit.
        expected: usize,
        /// The number of input bits provided.
        actual: usize,
    },
}

/// An immutable boolean circuit in topological order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    pub(crate) nodes: Vec<Node>,
    pub(crate) inputs: Vec<WireId>,
    pub(crate) outputs: Vec<WireId>,
    pub(crate) reveal: RevealPolicy,
}

impl Circuit {
    /// Creates a circuit from nodes in topological order, listing the input nodes as the primary
    /// inputs.
    pub fn new(
        nodes: Vec<Node>,
        outputs: Vec<WireId>,
        reveal: RevealPolicy,
    ) -> Result<Self, CircuitError> {
        let inputs = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| matches!(n, Node::Input(_)))
            .map(|(w, _)| WireId(w as u32))
            .collect();
        let circuit = Self {
            nodes,
            inputs,
            outputs,
            reveal,
        };
        circuit.validate()?;
        Ok(circuit)
    }

    /// Checks that every gate only references wires defined before it, that the input list
    /// enumerates all input nodes in order and that all outputs exist.
    ///
    /// Circuits produced by the [`crate::builder::Builder`] are valid by construction, but a
    /// deserialized circuit may come from anywhere.
    pub fn validate(&self) -> Result<(), CircuitError> {
        if self.nodes.len() > u32::MAX as usize {
            return Err(CircuitError::MaxCircuitSizeExceeded);
        }
        let mut inputs = self.inputs.iter();
        for (w, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Input(_) => {
                    if inputs.next().map(|i| i.index()) != Some(w) {
                        return Err(CircuitError::InvalidInputList);
                    }
                }
                Node::Const(_) => {}
                Node::Gate(gate) => {
                    for input in gate.inputs() {
                        if input.index() >= w {
                            return Err(CircuitError::InvalidGateInput {
                                gate: WireId(w as u32),
                                input,
                            });
                        }
                    }
                }
            }
        }
        if inputs.next().is_some() {
            return Err(CircuitError::InvalidInputList);
        }
        if self.outputs.is_empty() {
            return Err(CircuitError::EmptyOutput);
        }
        for output in &self.outputs {
            if output.index() >= self.nodes.len() {
                return Err(CircuitError::InvalidOutput(*output));
            }
        }
        Ok(())
    }

    /// All nodes in topological order; the index of a node is its [`WireId`].
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// The total number of wires.
    pub fn wires(&self) -> usize {
        self.nodes.len()
    }

    /// The primary input wires, in input order.
    pub fn inputs(&self) -> &[WireId] {
        &self.inputs
    }

    /// The primary input wires owned by `party`, in input order.
    pub fn inputs_of(&self, party: Party) -> Vec<WireId> {
        self.inputs
            .iter()
            .copied()
            .filter(|w| matches!(self.nodes[w.index()], Node::Input(p) if p == party))
            .collect()
    }

    /// The number of input bits the party has to provide.
    pub fn input_len(&self, party: Party) -> usize {
        self.inputs_of(party).len()
    }

    /// Fails with [`CircuitError::WrongInputSize`] unless `party` provides exactly `len` bits.
    pub fn check_input_len(&self, party: Party, len: usize) -> Result<(), CircuitError> {
        let expected = self.input_len(party);
        if expected == len {
            Ok(())
        } else {
            Err(CircuitError::WrongInputSize {
                party,
                expected,
                actual: len,
            })
        }
    }

    /// The output wires, in output order.
    pub fn outputs(&self) -> &[WireId] {
        &self.outputs
    }

    /// Which roles learn the output.
    pub fn reveal_policy(&self) -> RevealPolicy {
        self.reveal
    }

    /// The number of gates (excluding inputs and constants).
    pub fn gates(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Gate(_)))
            .count()
    }

    /// The number of AND gates.
    pub fn and_gates(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Gate(Gate::And(..))))
            .count()
    }

    /// Evaluates the circuit on plaintext inputs, bypassing the protocol.
    pub fn eval(
        &self,
        garbler_inputs: &[bool],
        evaluator_inputs: &[bool],
    ) -> Result<Vec<bool>, CircuitError> {
        self.validate()?;
        self.check_input_len(Party::Garbler, garbler_inputs.len())?;
        self.check_input_len(Party::Evaluator, evaluator_inputs.len())?;
        let mut garbler_inputs = garbler_inputs.iter().copied();
        let mut evaluator_inputs = evaluator_inputs.iter().copied();
        let mut values: Vec<bool> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let value = match node {
                Node::Input(Party::Garbler) => garbler_inputs.next().unwrap_or_default(),
                Node::Input(Party::Evaluator) => evaluator_inputs.next().unwrap_or_default(),
                Node::Const(b) => *b,
                Node::Gate(gate @ (Gate::And(x, y) | Gate::Xor(x, y))) => {
                    gate.apply(values[x.index()], values[y.index()])
                }
                Node::Gate(gate @ Gate::Not(x)) => gate.apply(values[x.index()], false),
            };
            values.push(value);
        }
        Ok(self.outputs.iter().map(|w| values[w.index()]).collect())
    }
}
