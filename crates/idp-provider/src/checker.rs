//! Ordered step sequencing for request handlers.
//!
//! Handlers compose their validation and IO into an ordered list of steps
//! over a handler-local context. The first failing step produces the HTTP
//! response via its error callback and stops the sequence; later steps never
//! run. This keeps handler bodies linear and the failure responses explicit.

use std::future::Future;
use std::pin::Pin;

use axum::response::Response as HttpResponse;

use crate::error::ProviderError;

/// The future returned by a logic step.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = Result<(), ProviderError>> + Send + 'a>>;

/// A logic step: fallible, may perform IO against storage.
pub type LogicFn<C> = for<'a> fn(&'a mut C) -> StepFuture<'a>;

/// A predicate guarding a conditional step.
pub type CondFn<C> = fn(&C) -> bool;

/// Produces the failure response for a failed step.
pub type FailFn<C> = fn(&C, &ProviderError) -> HttpResponse;

/// A value step: infallible, always runs.
pub type ValueFn<C> = fn(&mut C);

/// Reads a single value out of the context.
pub type StringFn<C> = fn(&C) -> String;

/// Reads a list of values out of the context.
pub type StringsFn<C> = fn(&C) -> Vec<String>;

enum Step<C> {
    Logic {
        run: LogicFn<C>,
        on_error: FailFn<C>,
    },
    ConditionalLogic {
        cond: CondFn<C>,
        run: LogicFn<C>,
        on_error: FailFn<C>,
    },
    Value {
        run: ValueFn<C>,
    },
    ValueNotEmpty {
        name: &'static str,
        value: StringFn<C>,
        on_error: FailFn<C>,
    },
    ConditionalValueNotEmpty {
        cond: CondFn<C>,
        name: &'static str,
        value: StringFn<C>,
        on_error: FailFn<C>,
    },
    ValuesNotEmpty {
        name: &'static str,
        values: StringsFn<C>,
        on_error: FailFn<C>,
    },
}

/// An ordered sequence of steps over a handler context `C`.
pub struct Checker<C> {
    steps: Vec<Step<C>>,
}

impl<C> Default for Checker<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> Checker<C> {
    /// Creates an empty sequence.
    #[must_use]
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    /// Appends an unconditional logic step.
    #[must_use]
    pub fn with_logic_step(mut self, run: LogicFn<C>, on_error: FailFn<C>) -> Self {
        self.steps.push(Step::Logic { run, on_error });
        self
    }

    /// Appends a logic step that only runs when `cond` holds.
    #[must_use]
    pub fn with_conditional_logic_step(
        mut self,
        cond: CondFn<C>,
        run: LogicFn<C>,
        on_error: FailFn<C>,
    ) -> Self {
        self.steps.push(Step::ConditionalLogic {
            cond,
            run,
            on_error,
        });
        self
    }

    /// Appends an infallible value step.
    #[must_use]
    pub fn with_value_step(mut self, run: ValueFn<C>) -> Self {
        self.steps.push(Step::Value { run });
        self
    }

    /// Appends an assertion that a value is non-empty.
    #[must_use]
    pub fn with_value_not_empty_check(
        mut self,
        name: &'static str,
        value: StringFn<C>,
        on_error: FailFn<C>,
    ) -> Self {
        self.steps.push(Step::ValueNotEmpty {
            name,
            value,
            on_error,
        });
        self
    }

    /// Appends a non-empty assertion that only applies when `cond` holds.
    #[must_use]
    pub fn with_conditional_value_not_empty(
        mut self,
        cond: CondFn<C>,
        name: &'static str,
        value: StringFn<C>,
        on_error: FailFn<C>,
    ) -> Self {
        self.steps.push(Step::ConditionalValueNotEmpty {
            cond,
            name,
            value,
            on_error,
        });
        self
    }

    /// Appends an assertion that every value in a list is non-empty.
    #[must_use]
    pub fn with_values_not_empty_check(
        mut self,
        name: &'static str,
        values: StringsFn<C>,
        on_error: FailFn<C>,
    ) -> Self {
        self.steps.push(Step::ValuesNotEmpty {
            name,
            values,
            on_error,
        });
        self
    }

    /// Number of registered steps.
    #[must_use]
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Runs the steps in insertion order.
    ///
    /// Returns the failure response of the first failing step, or `None`
    /// when every step passed.
    pub async fn run(self, ctx: &mut C) -> Option<HttpResponse> {
        for step in self.steps {
            match step {
                Step::Logic { run, on_error } => {
                    if let Err(err) = run(ctx).await {
                        tracing::error!(error = %err, "step failed");
                        return Some(on_error(ctx, &err));
                    }
                }
                Step::ConditionalLogic {
                    cond,
                    run,
                    on_error,
                } => {
                    if cond(ctx) {
                        if let Err(err) = run(ctx).await {
                            tracing::error!(error = %err, "conditional step failed");
                            return Some(on_error(ctx, &err));
                        }
                    }
                }
                Step::Value { run } => run(ctx),
                Step::ValueNotEmpty {
                    name,
                    value,
                    on_error,
                } => {
                    if value(ctx).is_empty() {
                        tracing::error!("empty value {name}");
                        let err = ProviderError::InvalidRequest(format!("missing {name}"));
                        return Some(on_error(ctx, &err));
                    }
                }
                Step::ConditionalValueNotEmpty {
                    cond,
                    name,
                    value,
                    on_error,
                } => {
                    if cond(ctx) && value(ctx).is_empty() {
                        tracing::error!("empty value {name}");
                        let err = ProviderError::InvalidRequest(format!("missing {name}"));
                        return Some(on_error(ctx, &err));
                    }
                }
                Step::ValuesNotEmpty {
                    name,
                    values,
                    on_error,
                } => {
                    if values(ctx).iter().any(String::is_empty) {
                        tracing::error!("empty value in {name}");
                        let err = ProviderError::InvalidRequest(format!("missing {name}"));
                        return Some(on_error(ctx, &err));
                    }
                }
            }
        }
        None
    }
}
