//! Effect interpreter trait.
//!
//! The trait-based design enables:
//! - Mock interpreters for testing
//! - Logging/tracing interpreters

use std::future::Future;

use super::Effect;

/// Executes [`Effect`] values against the outside world.
///
/// Implementations are constructed with a repository scope, so all effects
/// executed through a single interpreter instance apply to that repository.
///
/// # Example (mock for testing)
///
/// ```ignore
/// struct RecordingInterpreter {
///     executed: Mutex<Vec<Effect>>,
/// }
///
/// impl EffectInterpreter for RecordingInterpreter {
///     type Error = std::convert::Infallible;
///
///     async fn interpret(&self, effect: Effect) -> Result<(), Self::Error> {
///         self.executed.lock().unwrap().push(effect);
///         Ok(())
///     }
/// }
/// ```
pub trait EffectInterpreter {
    /// The error type returned by this interpreter.
    type Error;

    /// Execute one effect.
    fn interpret(&self, effect: Effect) -> impl Future<Output = Result<(), Self::Error>> + Send;
}
