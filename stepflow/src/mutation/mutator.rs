//! Named step wrappers.

use std::fmt;
use std::sync::Arc;

/// Where a mutator goes in a step's list when it is added.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum AddingMode {
    /// Insert by ascending `order`; equal orders keep registration order.
    #[default]
    Ordered,
    /// Insert after every existing mutator.
    Append,
    /// Insert before every existing mutator.
    Prepend,
    /// Replace the mutator with the same name in place, or append if none.
    Replace,
}

/// A named wrapper around a step's function of shape `F`.
///
/// The wrap receives the core function (or the result of earlier
/// mutators) and returns a function of the same shape. It can pass
/// through, transform the input or outcome, change which branch is taken,
/// or ignore the core entirely.
pub struct Mutator<F> {
    pub(crate) name: String,
    pub(crate) order: i32,
    pub(crate) wrap: Arc<dyn Fn(F) -> F + Send + Sync>,
}

impl<F: 'static> Mutator<F> {
    /// Creates a mutator with order 0.
    pub fn new<W>(name: impl Into<String>, wrap: W) -> Self
    where
        W: Fn(F) -> F + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            order: 0,
            wrap: Arc::new(wrap),
        }
    }

    /// A mutator that returns the function unchanged.
    pub fn identity(name: impl Into<String>) -> Self {
        Self::new(name, |f| f)
    }

    /// A mutator that swaps the step's function for `replacement`.
    pub fn replace(name: impl Into<String>, replacement: F) -> Self
    where
        F: Clone + Send + Sync,
    {
        Self::new(name, move |_| replacement.clone())
    }

    /// Sets the order used by [`AddingMode::Ordered`].
    #[must_use]
    pub fn with_order(mut self, order: i32) -> Self {
        self.order = order;
        self
    }

    /// Returns the mutator name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the mutator order.
    #[must_use]
    pub fn order(&self) -> i32 {
        self.order
    }

    /// Applies the wrap to `f`.
    pub fn wrap(&self, f: F) -> F {
        (self.wrap)(f)
    }
}

impl<F> Clone for Mutator<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            order: self.order,
            wrap: Arc::clone(&self.wrap),
        }
    }
}

impl<F> fmt::Debug for Mutator<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutator")
            .field("name", &self.name)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    type F = Arc<dyn Fn(i32) -> i32 + Send + Sync>;

    #[test]
    fn test_wrap_composes_with_core() {
        let core: F = Arc::new(|x| x + 1);
        let doubled = Mutator::<F>::new("double", |f: F| -> F { Arc::new(move |x| f(x) * 2) });
        assert_eq!(doubled.wrap(core)(3), 8);
    }

    #[test]
    fn test_identity_and_replace() {
        let core: F = Arc::new(|x| x + 1);
        assert_eq!(Mutator::identity("noop").wrap(Arc::clone(&core))(1), 2);

        let stub: F = Arc::new(|_| 42);
        assert_eq!(Mutator::replace("stub", stub).wrap(core)(1), 42);
    }

    #[test]
    fn test_order_defaults_to_zero() {
        let m = Mutator::<F>::identity("m");
        assert_eq!(m.order(), 0);
        assert_eq!(m.with_order(-5).order(), -5);
        assert_eq!(AddingMode::default(), AddingMode::Ordered);
    }
}
