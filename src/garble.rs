//! The cryptographic building blocks used to garble (= encrypt/decrypt) gate tables and to
//! authenticate labels.

use blake3::Hasher;
use chacha20poly1305::{
    ChaCha20Poly1305, Key, Nonce,
    aead::{Aead, KeyInit},
};

use crate::{
    circuit::WireId,
    data_types::{ActiveLabel, Label, RevealShare, SessionId, Tag},
};

/// Errors occurring during the encryption or decryption of garbled rows.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The row plaintext could not be (de-)serialized.
    #[error("could not (de-)serialize a garbled row: {0}")]
    Serde(String),
    /// The row could not be encrypted.
    #[error("a garbled row could not be encrypted")]
    EncryptionFailed,
    /// The row was not encrypted under the given key or was modified.
    #[error("a garbled row could not be decrypted")]
    DecryptionFailed,
}

/// The key of a single row, derived from the input labels, the output wire and the row index.
#[derive(Debug)]
pub(crate) struct GarblingKey {
    label_x: Label,
    label_y: Label,
    w: WireId,
    row: u8,
}

impl GarblingKey {
    pub(crate) fn new(label_x: Label, label_y: Label, w: WireId, row: u8) -> Self {
        Self {
            label_x,
            label_y,
            w,
            row,
        }
    }
}

/// Derive a key from the garbling key components using BLAKE3 for key commitment.
fn derive_commitment_key(key: &Key, nonce: &Nonce) -> Key {
    let mut hasher = Hasher::new();
    hasher.update(key);
    hasher.update(nonce);
    let derived_key = hasher.finalize();
    Key::from_slice(&derived_key.as_bytes()[..32]).to_owned()
}

/// Add a commitment to the plaintext using BLAKE3.
fn add_commitment(plaintext: &[u8], nonce: &Nonce) -> [u8; 16] {
    let mut hasher = Hasher::new();
    hasher.update(plaintext);
    hasher.update(nonce);
    let hash = hasher.finalize();
    let mut commitment = [0u8; 16];
    commitment.copy_from_slice(&hash.as_bytes()[..16]);
    commitment
}

/// Encrypt the output label of a row using ChaCha20Poly1305.
pub(crate) fn encrypt(garbling_key: &GarblingKey, output: ActiveLabel) -> Result<Vec<u8>, Error> {
    let (key, nonce) = key_and_nonce(garbling_key);
    let commitment_key = derive_commitment_key(&key, &nonce);
    let cipher = ChaCha20Poly1305::new(&commitment_key);

    let mut bytes = bincode::serialize(&output).map_err(|e| Error::Serde(format!("{e:?}")))?;
    let commitment = add_commitment(&bytes, &nonce);
    bytes.extend_from_slice(&commitment);

    cipher
        .encrypt(&nonce, bytes.as_ref())
        .map_err(|_| Error::EncryptionFailed)
}

/// Decrypt the output label of a row, failing if the row was not encrypted under this key.
pub(crate) fn decrypt(garbling_key: &GarblingKey, bytes: &[u8]) -> Result<ActiveLabel, Error> {
    let (key, nonce) = key_and_nonce(garbling_key);
    let commitment_key = derive_commitment_key(&key, &nonce);
    let cipher = ChaCha20Poly1305::new(&commitment_key);

    let plaintext = cipher
        .decrypt(&nonce, bytes)
        .map_err(|_| Error::DecryptionFailed)?;

    if plaintext.len() < 16 {
        return Err(Error::DecryptionFailed);
    }
    let (original_plaintext, commitment) = plaintext.split_at(plaintext.len() - 16);
    let expected_commitment = add_commitment(original_plaintext, &nonce);

    if commitment != expected_commitment {
        return Err(Error::DecryptionFailed);
    }

    bincode::deserialize(original_plaintext).map_err(|e| Error::Serde(format!("{e:?}")))
}

fn key_and_nonce(
    GarblingKey {
        label_x,
        label_y,
        w,
        row,
    }: &GarblingKey,
) -> (Key, Nonce) {
    let mut key = [0; 32];
    key[..16].copy_from_slice(&label_x.0.to_be_bytes());
    key[16..].copy_from_slice(&label_y.0.to_be_bytes());
    let mut nonce = [0; 12];
    nonce[..8].copy_from_slice(&(w.index() as u64).to_be_bytes());
    nonce[8] = *row;
    (key.into(), nonce.into())
}

/// The tag of `label` on wire `w`, bound to the session.
pub(crate) fn tag(session: &SessionId, w: WireId, label: Label) -> Tag {
    let mut hasher = Hasher::new();
    hasher.update(b"gatevm label tag");
    hasher.update(&session.0);
    hasher.update(&(w.index() as u64).to_le_bytes());
    hasher.update(&label.0.to_le_bytes());
    let mut tag = [0; 16];
    tag.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
    Tag(tag)
}

/// Hiding commitment to the reveal share of output wire `w`, published with the garbled material.
pub(crate) fn reveal_commitment(session: &SessionId, w: WireId, share: &RevealShare) -> Tag {
    let mut hasher = Hasher::new();
    hasher.update(b"gatevm reveal commitment");
    hasher.update(&session.0);
    hasher.update(&(w.index() as u64).to_le_bytes());
    hasher.update(&[share.permute as u8]);
    hasher.update(&share.nonce);
    let mut commitment = [0; 16];
    commitment.copy_from_slice(&hasher.finalize().as_bytes()[..16]);
    Tag(commitment)
}

/// Digest over the serialized garbled material, checked as a whole before evaluation.
pub(crate) fn digest(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}

#[cfg(test)]
mod tests {
    use rand::random;

    use super::*;

    fn random_key() -> GarblingKey {
        GarblingKey::new(Label(random()), Label(random()), WireId(random()), random())
    }

    #[test]
    fn encrypt_decrypt() {
        let key = random_key();
        let output = ActiveLabel {
            label: Label(random()),
            color: random(),
        };
        let encrypted = encrypt(&key, output).unwrap();
        let decrypted = decrypt(&key, &encrypted).unwrap();
        assert_eq!(output, decrypted);
    }

    #[test]
    fn wrong_key_or_tampering_fails() {
        let key = random_key();
        let output = ActiveLabel {
            label: Label(random()),
            color: false,
        };
        let encrypted = encrypt(&key, output).unwrap();

        let other = GarblingKey::new(key.label_x, Label(key.label_y.0 ^ 1), key.w, key.row);
        assert_eq!(decrypt(&other, &encrypted), Err(Error::DecryptionFailed));

        for i in 0..encrypted.len() {
            let mut tampered = encrypted.clone();
            tampered[i] ^= 0x80;
            assert_eq!(decrypt(&key, &tampered), Err(Error::DecryptionFailed));
        }
    }

    #[test]
    fn tags_are_bound_to_session_and_wire() {
        let label = Label(random());
        let s1 = SessionId(random());
        let s2 = SessionId(random());
        assert_eq!(tag(&s1, WireId(3), label), tag(&s1, WireId(3), label));
        assert_ne!(tag(&s1, WireId(3), label), tag(&s2, WireId(3), label));
        assert_ne!(tag(&s1, WireId(3), label), tag(&s1, WireId(4), label));
    }

    #[test]
    fn reveal_commitments_bind_the_permute_bit() {
        let session = SessionId(random());
        let share = RevealShare {
            permute: true,
            nonce: random(),
        };
        let commitment = reveal_commitment(&session, WireId(5), &share);
        assert_eq!(commitment, reveal_commitment(&session, WireId(5), &share));

        let flipped = RevealShare {
            permute: false,
            ..share
        };
        assert_ne!(commitment, reveal_commitment(&session, WireId(5), &flipped));
        let mut other_nonce = share;
        other_nonce.nonce[0] ^= 1;
        assert_ne!(commitment, reveal_commitment(&session, WireId(5), &other_nonce));
        assert_ne!(commitment, reveal_commitment(&session, WireId(6), &share));
    }
}
