//! Effect contracts.
//!
//! Effects are named side-effects declared from inside a subscription while
//! it renders a snapshot. The runtime mounts an effect the first refresh
//! cycle its name is declared, keeps it mounted while the name keeps being
//! declared, and runs its cleanup exactly once in the first cycle the name
//! goes undeclared.

/// Teardown closure returned by an effect setup.
///
/// Invoked exactly once, when the effect is unmounted. Failures are logged
/// and contained by the runtime.
pub type Cleanup = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Box a closure as a [`Cleanup`].
///
/// # Example
///
/// ```
/// use coalesce_core::effect::cleanup;
///
/// let teardown = cleanup(|| {
///     println!("unmounted");
///     Ok(())
/// });
/// teardown().unwrap();
/// ```
pub fn cleanup<F>(f: F) -> Cleanup
where
    F: FnOnce() -> anyhow::Result<()> + 'static,
{
    Box::new(f)
}

/// Options controlling how an effect is mounted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectOptions {
    /// Defer the setup until after the current cycle's notification and
    /// callback drain, instead of running it inline.
    pub delay: bool,
}

impl EffectOptions {
    /// Run the setup inline, while the declaring subscription executes.
    #[must_use]
    pub const fn immediate() -> Self {
        Self { delay: false }
    }

    /// Defer the setup to the end of the current refresh cycle.
    #[must_use]
    pub const fn deferred() -> Self {
        Self { delay: true }
    }
}
