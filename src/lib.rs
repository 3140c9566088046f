//! A secure two-party computation engine based on authenticated garbled circuits.
//!
//! Two mutually distrusting parties, the garbler and the evaluator, jointly compute a function
//! over their private integer inputs. Neither learns anything beyond the output, and any
//! tampering with the garbled circuit or its labels is detected before an output is produced.
//!
//! ## Main Components
//!
//! The crate is structured into several modules:
//!
//! * [`types`]: Fixed-width integer types, plaintext literals and encrypted values.
//! * [`circuit`]: Boolean circuits of AND, XOR and NOT gates, with plaintext evaluation.
//! * [`builder`]: Incremental, always topologically ordered construction of circuits, including
//!   arithmetic, comparisons, shifts and multiplexers over encrypted values.
//! * [`ast`] and [`compile`]: Typed expression trees and their compilation into circuits.
//! * [`protocol`]: The garbler and evaluator state machines and drivers that run them over a
//!   [`channel::Channel`].
//! * [`ot`]: Delivery of the evaluator's input labels.
//!
//! ## Example
//!
//! ```
//! use gatevm::{
//!     ast::{var, Param, Program},
//!     circuit::{Party, RevealPolicy},
//!     protocol::simulate,
//!     types::{IntType, Literal},
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let program = Program {
//!     params: vec![
//!         Param::new("a", IntType::U8, Party::Garbler),
//!         Param::new("b", IntType::U8, Party::Evaluator),
//!     ],
//!     ret: IntType::U8,
//!     reveal: RevealPolicy::EvaluatorOnly,
//!     body: var("a") + var("b"),
//! };
//! let compiled = gatevm::compile(&program)?;
//! let a = compiled.encode_inputs(Party::Garbler, &[Literal::u8(200)])?;
//! let b = compiled.encode_inputs(Party::Evaluator, &[Literal::u8(100)])?;
//!
//! let (_, output) = simulate(&compiled.circuit, &a, &b).await?;
//! assert_eq!(compiled.decode_output(&output)?, Literal::u8(44));
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Properties
//!
//! Every wire carries two independent random labels per session, every label is committed to by
//! a tag and every garbled row is authenticated. The evaluator verifies a digest over all garbled
//! material, the tag of every input label and the output of every gate, and only accepts
//! reveal shares that open the commitments sent along with the garbled material. The garbler
//! verifies the output labels returned to it. Secure delivery of the evaluator's input labels
//! (oblivious transfer) and transport security are provided from outside through the
//! [`ot::LabelDelivery`] and [`channel::Channel`] traits.
#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod ast;
pub mod builder;
pub mod channel;
pub mod circuit;
pub mod compile;
pub mod ot;
pub mod protocol;
pub mod types;

mod data_types;
mod evaluator;
mod garble;
mod garbler;
mod message;

pub use compile::compile;
