//! The evaluator role.

use subtle::ConstantTimeEq;
use tracing::{debug, info};

use crate::{
    circuit::{Circuit, Gate, Node, Party, WireId},
    data_types::{ActiveLabel, GarbledGate, Label, SessionId, Tag},
    garble::{self, GarblingKey, decrypt},
    message::{
        GarbledMaterial, MaterialBody, Payload, ProtocolMessage, ROUND_EVALUATED, ROUND_GARBLED,
        ROUND_REVEAL,
    },
    ot::LabelDelivery,
    protocol::{
        AuthenticationError, Error, Phase, ProtocolError, Session, expect_round, log_failure,
    },
};

/// The state of the evaluator: evaluates the garbled circuit, then decodes the output.
#[derive(Debug)]
pub struct EvaluatorSession<D> {
    circuit: Circuit,
    inputs: Vec<bool>,
    delivery: D,
    state: State,
}

#[derive(Debug)]
enum State {
    AwaitingMaterial,
    AwaitingReveal {
        session: SessionId,
        output_labels: Vec<ActiveLabel>,
        commitments: Vec<Tag>,
    },
    Complete { output: Vec<bool> },
    Failed,
}

impl<D: LabelDelivery> EvaluatorSession<D> {
    pub(crate) fn start(circuit: Circuit, inputs: &[bool], delivery: D) -> Result<Self, Error> {
        circuit.validate()?;
        circuit.check_input_len(Party::Evaluator, inputs.len())?;
        Ok(Self {
            circuit,
            inputs: inputs.to_vec(),
            delivery,
            state: State::AwaitingMaterial,
        })
    }

    /// The output, once complete.
    pub fn output(&self) -> Option<&[bool]> {
        match &self.state {
            State::Complete { output } => Some(output),
            _ => None,
        }
    }

    fn evaluate(&mut self, msg: &ProtocolMessage) -> Result<(State, ProtocolMessage), Error> {
        let Payload::Garbled(material) = expect_round(msg, ROUND_GARBLED)? else {
            return Err(
                ProtocolError::MalformedMessage("expected garbled material".into()).into(),
            );
        };
        let body = open(&material)?;
        self.check_structure(&body)?;

        let session = &body.session;
        let verify = |w: WireId, active: &ActiveLabel| {
            let tags = &body.tags[w.index()];
            garble::tag(session, w, active.label).matches(&tags[active.color as usize])
        };

        let mut active: Vec<ActiveLabel> = Vec::with_capacity(self.circuit.wires());
        let mut tables = body.tables.iter();
        let mut garbler_inputs = body.garbler_inputs.iter();
        let mut consts = body.consts.iter();
        let mut evaluator_input = 0;
        for (w, node) in self.circuit.nodes().iter().enumerate() {
            let w = WireId(w as u32);
            let label = match node {
                Node::Input(Party::Garbler) => {
                    let label = *garbler_inputs.next().ok_or_else(|| missing("input labels"))?;
                    if !verify(w, &label) {
                        return Err(AuthenticationError::InvalidInputLabel(w).into());
                    }
                    label
                }
                Node::Input(Party::Evaluator) => {
                    let bit = self.inputs[evaluator_input];
                    let label = self.delivery.request_label(evaluator_input, bit)?;
                    evaluator_input += 1;
                    if !verify(w, &label) {
                        return Err(AuthenticationError::InvalidInputLabel(w).into());
                    }
                    label
                }
                Node::Const(b) => {
                    let label = *consts.next().ok_or_else(|| missing("constant labels"))?;
                    if label.color != *b || !verify(w, &label) {
                        return Err(AuthenticationError::InvalidConstant(w).into());
                    }
                    label
                }
                Node::Gate(gate) => {
                    let table = tables.next().ok_or_else(|| missing("garbled gates"))?;
                    let label = eval_gate(gate, w, table, &active)?;
                    if !verify(w, &label) {
                        return Err(AuthenticationError::InvalidLabelTag(w).into());
                    }
                    label
                }
            };
            active.push(label);
        }
        debug!(gates = body.tables.len(), "evaluated the garbled circuit");

        let output_labels: Vec<ActiveLabel> = self
            .circuit
            .outputs()
            .iter()
            .map(|w| active[w.index()])
            .collect();
        let revealed = if self.circuit.reveal_policy().reveals_to(Party::Garbler) {
            output_labels.clone()
        } else {
            vec![]
        };
        let reply = ProtocolMessage::encode(ROUND_EVALUATED, &Payload::OutputLabels(revealed))?;
        let state = State::AwaitingReveal {
            session: body.session,
            output_labels,
            commitments: body.reveal_commitments,
        };
        Ok((state, reply))
    }

    fn check_structure(&self, body: &MaterialBody) -> Result<(), ProtocolError> {
        let consts = self
            .circuit
            .nodes()
            .iter()
            .filter(|n| matches!(n, Node::Const(_)))
            .count();
        let expected = [
            ("tags", self.circuit.wires(), body.tags.len()),
            ("garbled gates", self.circuit.gates(), body.tables.len()),
            (
                "garbler input labels",
                self.circuit.input_len(Party::Garbler),
                body.garbler_inputs.len(),
            ),
            ("constant labels", consts, body.consts.len()),
            (
                "reveal commitments",
                self.circuit.outputs().len(),
                body.reveal_commitments.len(),
            ),
        ];
        for (what, expected, actual) in expected {
            if expected != actual {
                return Err(ProtocolError::MalformedMessage(format!(
                    "expected {expected} {what}, found {actual}"
                )));
            }
        }
        Ok(())
    }
}

/// Checks the digest of the garbled material before decoding it.
fn open(material: &GarbledMaterial) -> Result<MaterialBody, Error> {
    let digest = garble::digest(&material.body);
    if !bool::from(digest.ct_eq(&material.digest)) {
        return Err(AuthenticationError::MaterialDigest.into());
    }
    let body = bincode::deserialize(&material.body)
        .map_err(|e| ProtocolError::MalformedMessage(format!("{e:?}")))?;
    Ok(body)
}

fn missing(what: &str) -> ProtocolError {
    ProtocolError::MalformedMessage(format!("missing {what}"))
}

/// Decrypts the row selected by the colors of the active input labels.
fn eval_gate(
    gate: &Gate,
    w: WireId,
    table: &GarbledGate,
    active: &[ActiveLabel],
) -> Result<ActiveLabel, Error> {
    let (key, row) = match *gate {
        Gate::And(x, y) | Gate::Xor(x, y) => {
            let (x, y) = (active[x.index()], active[y.index()]);
            let row = 2 * x.color as u8 + y.color as u8;
            (GarblingKey::new(x.label, y.label, w, row), row)
        }
        Gate::Not(x) => {
            let x = active[x.index()];
            let row = x.color as u8;
            (GarblingKey::new(x.label, Label(0), w, row), row)
        }
    };
    let rows = 1usize << gate.kind().arity();
    if table.0.len() != rows {
        return Err(ProtocolError::MalformedMessage(format!(
            "gate {w} has {} rows instead of {rows}",
            table.0.len()
        ))
        .into());
    }
    decrypt(&key, &table.0[row as usize])
        .map_err(|_| AuthenticationError::GateDecryption(w).into())
}

impl<D: LabelDelivery> Session for EvaluatorSession<D> {
    fn role(&self) -> Party {
        Party::Evaluator
    }

    fn phase(&self) -> Phase {
        match self.state {
            State::AwaitingMaterial => Phase::Init,
            State::AwaitingReveal { .. } => Phase::Revealing,
            State::Complete { .. } => Phase::Complete,
            State::Failed => Phase::Failed,
        }
    }

    fn round(&self) -> Option<u32> {
        match self.state {
            State::AwaitingMaterial => Some(ROUND_GARBLED),
            State::AwaitingReveal { .. } => Some(ROUND_REVEAL),
            _ => None,
        }
    }

    fn advance(&mut self, msg: &ProtocolMessage) -> Result<Option<ProtocolMessage>, Error> {
        let result = if let State::AwaitingReveal {
            session,
            output_labels,
            commitments,
        } = &self.state
        {
            let outputs = self.circuit.outputs();
            reveal(session, outputs, output_labels, commitments, msg)
                .map(|output| (State::Complete { output }, None))
        } else if matches!(self.state, State::AwaitingMaterial) {
            self.evaluate(msg).map(|(state, reply)| (state, Some(reply)))
        } else {
            return Err(ProtocolError::SessionTerminated.into());
        };
        match result {
            Ok((state, reply)) => {
                if matches!(state, State::Complete { .. }) {
                    info!("evaluator session complete");
                }
                self.state = state;
                Ok(reply)
            }
            Err(e) => {
                log_failure(Party::Evaluator, &e);
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn abort(&mut self, reason: &str) -> Option<ProtocolMessage> {
        let round = self.round()?;
        debug!(reason, "evaluator aborts the session");
        self.state = State::Failed;
        Some(ProtocolMessage::abort(round, reason))
    }
}

/// Checks the reveal shares of the garbler against their commitments and combines them with
/// the output labels.
fn reveal(
    session: &SessionId,
    outputs: &[WireId],
    output_labels: &[ActiveLabel],
    commitments: &[Tag],
    msg: &ProtocolMessage,
) -> Result<Vec<bool>, Error> {
    let Payload::RevealShares(shares) = expect_round(msg, ROUND_REVEAL)? else {
        return Err(ProtocolError::MalformedMessage("expected reveal shares".into()).into());
    };
    if shares.len() != output_labels.len() {
        return Err(ProtocolError::MalformedMessage(format!(
            "expected {} reveal shares, found {}",
            output_labels.len(),
            shares.len()
        ))
        .into());
    }
    let mut output = Vec::with_capacity(shares.len());
    for (((w, label), commitment), share) in outputs
        .iter()
        .zip(output_labels)
        .zip(commitments)
        .zip(&shares)
    {
        if !garble::reveal_commitment(session, *w, share).matches(commitment) {
            return Err(AuthenticationError::InvalidRevealShare(*w).into());
        }
        output.push(label.color ^ share.permute);
    }
    Ok(output)
}
