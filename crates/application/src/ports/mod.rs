//! Port definitions for application layer
//!
//! Ports are interfaces that define how the application interacts with
//! external systems. Adapters in the infrastructure layer implement these ports.

mod clock_port;
mod extraction_port;
mod inference_port;
mod transit_port;

#[cfg(test)]
pub use clock_port::MockClockPort;
pub use clock_port::ClockPort;
#[cfg(test)]
pub use extraction_port::MockExtractionPort;
pub use extraction_port::{ExtractedFields, ExtractionPort};
#[cfg(test)]
pub use inference_port::MockInferencePort;
pub use inference_port::{InferencePort, LlmReply};
#[cfg(test)]
pub use transit_port::MockTransitPort;
pub use transit_port::{DepartureQuery, Fetched, TransitPort, TripQuery};
