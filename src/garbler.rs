//! The garbler role.

use tracing::{debug, info};

use crate::{
    circuit::{Circuit, Gate, Node, Party, WireId},
    data_types::{GarbledGate, Label, RevealShare, SessionId, Tag, WireSecrets},
    garble::{self, GarblingKey, encrypt},
    message::{
        GarbledMaterial, MaterialBody, Payload, ProtocolMessage, ROUND_EVALUATED, ROUND_GARBLED,
        ROUND_REVEAL,
    },
    ot::LabelOffer,
    protocol::{
        AuthenticationError, Error, Phase, ProtocolError, Session, expect_round, log_failure,
    },
};

/// The state of the garbler: garbles the circuit, then reveals the output wires.
#[derive(Debug)]
pub struct GarblerSession {
    circuit: Circuit,
    state: State,
}

#[derive(Debug)]
enum State {
    AwaitingEvaluation {
        wires: Vec<WireSecrets>,
        shares: Vec<RevealShare>,
    },
    Complete { output: Option<Vec<bool>> },
    Failed,
}

impl GarblerSession {
    pub(crate) fn start(
        circuit: Circuit,
        inputs: &[bool],
        rng: &mut (impl rand::Rng + rand::CryptoRng),
    ) -> Result<(Self, ProtocolMessage), Error> {
        circuit.validate()?;
        circuit.check_input_len(Party::Garbler, inputs.len())?;

        let session = SessionId::random(rng);
        let mut wires: Vec<WireSecrets> = Vec::with_capacity(circuit.wires());
        let mut tables = Vec::with_capacity(circuit.gates());
        let mut tags = Vec::with_capacity(circuit.wires());
        let mut garbler_inputs = Vec::with_capacity(inputs.len());
        let mut consts = vec![];
        let mut inputs = inputs.iter().copied();
        for (w, node) in circuit.nodes().iter().enumerate() {
            let w = WireId(w as u32);
            let secrets = match node {
                Node::Const(_) => WireSecrets::random_const(rng),
                _ => WireSecrets::random(rng),
            };
            match node {
                Node::Input(Party::Garbler) => {
                    let bit = inputs.next().unwrap_or_default();
                    garbler_inputs.push(secrets.active(bit));
                }
                Node::Input(Party::Evaluator) => {}
                Node::Const(b) => consts.push(secrets.active(*b)),
                Node::Gate(gate) => tables.push(garble_gate(gate, w, &wires, &secrets)?),
            }
            tags.push(tags_by_color(&session, w, &secrets));
            wires.push(secrets);
        }
        debug!(wires = wires.len(), gates = tables.len(), "garbled the circuit");

        let outputs = circuit.outputs();
        let shares: Vec<RevealShare> = outputs
            .iter()
            .map(|w| RevealShare::new(wires[w.index()].permute(), &mut *rng))
            .collect();
        let reveal_commitments = outputs
            .iter()
            .zip(shares.iter())
            .map(|(w, share)| garble::reveal_commitment(&session, *w, share))
            .collect();

        let body = MaterialBody {
            session,
            tables,
            tags,
            garbler_inputs,
            consts,
            reveal_commitments,
        };
        let material = GarbledMaterial::seal(&body)?;
        let msg = ProtocolMessage::encode(ROUND_GARBLED, &Payload::Garbled(material))?;
        let session = Self {
            circuit,
            state: State::AwaitingEvaluation { wires, shares },
        };
        Ok((session, msg))
    }

    /// Both labels of every evaluator input, to be fed into the label delivery.
    ///
    /// Only available until the evaluator has answered.
    pub fn label_offer(&self) -> Option<LabelOffer> {
        match &self.state {
            State::AwaitingEvaluation { wires, .. } => Some(LabelOffer::new(
                self.circuit
                    .inputs_of(Party::Evaluator)
                    .into_iter()
                    .map(|w| &wires[w.index()]),
            )),
            _ => None,
        }
    }

    /// The output, once complete and if the circuit reveals it to the garbler.
    pub fn output(&self) -> Option<&[bool]> {
        match &self.state {
            State::Complete {
                output: Some(output),
            } => Some(output),
            _ => None,
        }
    }

    /// Decodes the evaluator's output labels (if any) and opens the committed reveal shares.
    fn reveal(
        &self,
        wires: &[WireSecrets],
        shares: &[RevealShare],
        msg: &ProtocolMessage,
    ) -> Result<(Option<Vec<bool>>, ProtocolMessage), Error> {
        let Payload::OutputLabels(labels) = expect_round(msg, ROUND_EVALUATED)? else {
            return Err(ProtocolError::MalformedMessage("expected output labels".into()).into());
        };
        let outputs = self.circuit.outputs();
        let output = if self.circuit.reveal_policy().reveals_to(Party::Garbler) {
            if labels.len() != outputs.len() {
                return Err(ProtocolError::MalformedMessage(format!(
                    "expected {} output labels, found {}",
                    outputs.len(),
                    labels.len()
                ))
                .into());
            }
            let mut output = Vec::with_capacity(outputs.len());
            for (w, label) in outputs.iter().zip(labels.iter()) {
                let bit = wires[w.index()]
                    .decode(label)
                    .ok_or(AuthenticationError::InvalidOutputLabel(*w))?;
                output.push(bit);
            }
            Some(output)
        } else {
            if !labels.is_empty() {
                return Err(ProtocolError::MalformedMessage(
                    "output labels sent although the output is not revealed to the garbler".into(),
                )
                .into());
            }
            None
        };
        let reply =
            ProtocolMessage::encode(ROUND_REVEAL, &Payload::RevealShares(shares.to_vec()))?;
        Ok((output, reply))
    }
}

impl Session for GarblerSession {
    fn role(&self) -> Party {
        Party::Garbler
    }

    fn phase(&self) -> Phase {
        match self.state {
            State::AwaitingEvaluation { .. } => Phase::Exchanging {
                round: ROUND_EVALUATED,
            },
            State::Complete { .. } => Phase::Complete,
            State::Failed => Phase::Failed,
        }
    }

    fn round(&self) -> Option<u32> {
        match self.state {
            State::AwaitingEvaluation { .. } => Some(ROUND_EVALUATED),
            _ => None,
        }
    }

    fn advance(&mut self, msg: &ProtocolMessage) -> Result<Option<ProtocolMessage>, Error> {
        let State::AwaitingEvaluation { wires, shares } = &self.state else {
            return Err(ProtocolError::SessionTerminated.into());
        };
        match self.reveal(wires, shares, msg) {
            Ok((output, reply)) => {
                info!(revealed = output.is_some(), "garbler session complete");
                self.state = State::Complete { output };
                Ok(Some(reply))
            }
            Err(e) => {
                log_failure(Party::Garbler, &e);
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    fn abort(&mut self, reason: &str) -> Option<ProtocolMessage> {
        let round = self.round()?;
        debug!(reason, "garbler aborts the session");
        self.state = State::Failed;
        Some(ProtocolMessage::abort(round, reason))
    }
}

/// The tags of both labels of a wire, in color order.
fn tags_by_color(session: &SessionId, w: WireId, secrets: &WireSecrets) -> [Tag; 2] {
    let color0 = secrets.active(secrets.permute());
    let color1 = secrets.active(!secrets.permute());
    [
        garble::tag(session, w, color0.label),
        garble::tag(session, w, color1.label),
    ]
}

/// Encrypts the output label for every combination of input labels, in color order.
fn garble_gate(
    gate: &Gate,
    w: WireId,
    wires: &[WireSecrets],
    out: &WireSecrets,
) -> Result<GarbledGate, garble::Error> {
    match *gate {
        Gate::And(x, y) | Gate::Xor(x, y) => {
            let (x, y) = (&wires[x.index()], &wires[y.index()]);
            let mut rows = vec![vec![]; 4];
            for vx in [false, true] {
                for vy in [false, true] {
                    let (ax, ay) = (x.active(vx), y.active(vy));
                    let row = 2 * ax.color as u8 + ay.color as u8;
                    let key = GarblingKey::new(ax.label, ay.label, w, row);
                    rows[row as usize] = encrypt(&key, out.active(gate.apply(vx, vy)))?;
                }
            }
            Ok(GarbledGate(rows))
        }
        Gate::Not(x) => {
            let x = &wires[x.index()];
            let mut rows = vec![vec![]; 2];
            for vx in [false, true] {
                let ax = x.active(vx);
                let row = ax.color as u8;
                let key = GarblingKey::new(ax.label, Label(0), w, row);
                rows[row as usize] = encrypt(&key, out.active(!vx))?;
            }
            Ok(GarbledGate(rows))
        }
    }
}
