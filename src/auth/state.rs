//! Authentication state traits and macro.

use crate::validator::TokenValidator;

/// Trait for state types that can validate tokens for the auth extractors.
pub trait HasAuthBackend {
    fn validator(&self) -> &TokenValidator;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard field.
///
/// The struct must have a `validator: Arc<TokenValidator>` field.
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub validator: Arc<TokenValidator>,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn validator(&self) -> &$crate::validator::TokenValidator {
                &self.validator
            }
        }
    };
}
