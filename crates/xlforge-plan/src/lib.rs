//! Plan application engine for XL-Forge.
//!
//! An AI provider answers a natural-language instruction with a [`Plan`]: an
//! ordered list of structured edit steps. This crate decodes each step,
//! applies it to an immutable [`Grid`](xlforge_core::Grid), isolates failing
//! steps, and commits the result as a single undo unit.

pub mod error;
pub mod executor;
pub mod interpreter;
pub mod plan;
pub mod prompt;
pub mod response;
pub mod session;
pub mod step;

pub use error::{PlanParseError, StepError};
pub use executor::{apply_plan, execute_steps, PlanOutcome, PlanReport, StepFailure};
pub use interpreter::apply_step;
pub use plan::Plan;
pub use prompt::{build_system_prompt, MessagesRequest, PromptOptions};
pub use response::{parse_plan_response, response_text};
pub use session::{EditorSession, FileInfo, PlanContext};
pub use step::Step;
