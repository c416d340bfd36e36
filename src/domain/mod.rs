//! Exchange-agnostic value types: identifiers, bars, instruments and the
//! completion signal.

pub mod account;
pub mod bar;
pub mod id;
pub mod instrument;
pub mod signal;

pub use account::AccountType;
pub use bar::{AggregationSource, Bar, BarAggregation, BarSpecification, BarType, PriceType};
pub use id::{ActorId, ClientId, InstrumentId, TraderId, Venue};
pub use instrument::Instrument;
pub use signal::{Completion, CompletionSignal};
