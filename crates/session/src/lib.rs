//! # curalink-session
//!
//! The in-session experience of a consultation, with every collaborator
//! passed in explicitly:
//!
//! - [`IntakeForm`]: patient information gathered before a session
//! - [`PaymentDesk`]: mock fee payment on an injected clock
//! - [`ChatSession`]: patient/doctor chat with a pluggable [`DoctorResponder`]
//! - [`TranscriptionPipeline`]: recorded audio → transcript → debrief

pub mod chat;
pub mod error;
pub mod intake;
pub mod payment;
pub mod transcription;

pub use chat::{ChatSession, DoctorResponder, FlowResponder, SimulatedResponder};
pub use error::SessionError;
pub use intake::{ConsultationIntake, IntakeForm};
pub use payment::{PaymentDesk, PaymentDetails, Receipt};
pub use transcription::{ConsultationNotes, TranscriptionPipeline};
