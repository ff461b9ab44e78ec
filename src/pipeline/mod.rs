//! Alert pipeline.
//!
//! Every poll cycle runs the same stages:
//! 1. `DeviationFeed::fetch()`: pull the current batch of reports
//! 2. Ledger filter: drop identities that were already relayed
//! 3. `Summarizer` then `Classifier`: bilingual text, criticality, route group
//! 4. `digest::build()`: one grouped message, or `digest::render_single()` per
//!    report when the grouped path fails
//! 5. Record each identity only after its message went out

pub mod digest;
pub mod poller;
pub mod processor;
pub mod rules;
pub mod summarize;
pub mod types;

pub use digest::{DigestRenderer, RenderError};
pub use poller::spawn_poller;
pub use processor::PollCycle;
pub use rules::{Classifier, CriticalityRules};
pub use summarize::Summarizer;
pub use types::{ClassifiedReport, CycleOutcome, CyclePhase, CycleReport, Delivery, RouteGroup};
